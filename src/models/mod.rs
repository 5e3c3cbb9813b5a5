pub mod product;
pub mod query;
pub mod view;
