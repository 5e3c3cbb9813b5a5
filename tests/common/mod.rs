use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

/// How the fake API answers the next requests
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Normal,
    ServerError,
    Malformed,
}

#[derive(Debug, Deserialize)]
struct ListingQuery {
    q: Option<String>,
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(rename = "sortBy")]
    sort_by: Option<String>,
    order: Option<String>,
}

fn default_limit() -> usize {
    30
}

struct ApiState {
    products: Vec<Value>,
    behaviour: Mutex<Behaviour>,
    requests: Mutex<Vec<String>>,
}

/// In-process products API on an ephemeral port
///
/// Serves 30 products across three categories (smartphones, laptops,
/// fragrances) with the same routes and response shape as the public API.
pub struct FakeApi {
    pub base_url: String,
    state: Arc<ApiState>,
}

#[allow(dead_code)]
impl FakeApi {
    pub async fn start() -> Self {
        let state = Arc::new(ApiState {
            products: seed_products(),
            behaviour: Mutex::new(Behaviour::Normal),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/products", get(list_products))
            .route("/products/search", get(search_products))
            .route("/products/category/{slug}", get(category_products))
            .route("/products/categories", get(list_categories))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake api");
        let addr = listener.local_addr().expect("fake api address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake api server");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn set_behaviour(&self, behaviour: Behaviour) {
        *self.state.behaviour.lock() = behaviour;
    }

    /// Path and query of every request served so far
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().len()
    }
}

fn seed_products() -> Vec<Value> {
    let groups = [
        ("smartphones", "iPhone"),
        ("laptops", "Laptop"),
        ("fragrances", "Perfume"),
    ];

    (1..=30u64)
        .map(|id| {
            let (category, name) = groups[((id - 1) / 10) as usize];
            json!({
                "id": id,
                "title": format!("{} {:02}", name, id),
                "description": format!("{} number {}", name, id),
                "category": category,
                "price": id * 10,
                "discountPercentage": 12.5,
                "rating": (id % 5) as f64 + 0.5,
                "stock": 100 - id,
                "thumbnail": format!("https://cdn.example.com/{}.webp", id),
                "images": [],
            })
        })
        .collect()
}

fn record(state: &ApiState, uri: &Uri) -> Option<Response> {
    state.requests.lock().push(uri.to_string());
    match *state.behaviour.lock() {
        Behaviour::Normal => None,
        Behaviour::ServerError => Some(
            (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response(),
        ),
        Behaviour::Malformed => Some(
            (
                StatusCode::OK,
                [("content-type", "application/json")],
                r#"{"products": "not a list"}"#,
            )
                .into_response(),
        ),
    }
}

fn listing(state: &ApiState, query: &ListingQuery, filter: impl Fn(&Value) -> bool) -> Response {
    let mut matching: Vec<Value> = state.products.iter().filter(|p| filter(p)).cloned().collect();

    if let Some(field) = query.sort_by.as_deref() {
        matching.sort_by(|a, b| {
            let (a, b) = (&a[field], &b[field]);
            match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.as_str().unwrap_or("").cmp(b.as_str().unwrap_or("")),
            }
        });
    }
    if query.order.as_deref() == Some("desc") {
        matching.reverse();
    }

    let total = matching.len();
    let products: Vec<Value> = matching
        .into_iter()
        .skip(query.skip)
        .take(query.limit)
        .collect();

    Json(json!({
        "products": products,
        "total": total,
        "skip": query.skip,
        "limit": query.limit,
    }))
    .into_response()
}

async fn list_products(
    State(state): State<Arc<ApiState>>,
    uri: Uri,
    Query(query): Query<ListingQuery>,
) -> Response {
    if let Some(response) = record(&state, &uri) {
        return response;
    }
    listing(&state, &query, |_| true)
}

async fn search_products(
    State(state): State<Arc<ApiState>>,
    uri: Uri,
    Query(query): Query<ListingQuery>,
) -> Response {
    if let Some(response) = record(&state, &uri) {
        return response;
    }
    // The search route matches titles only and has no category filter
    let needle = query.q.clone().unwrap_or_default().to_lowercase();
    listing(&state, &query, |p| {
        p["title"]
            .as_str()
            .unwrap_or("")
            .to_lowercase()
            .contains(&needle)
    })
}

async fn category_products(
    State(state): State<Arc<ApiState>>,
    uri: Uri,
    Path(slug): Path<String>,
    Query(query): Query<ListingQuery>,
) -> Response {
    if let Some(response) = record(&state, &uri) {
        return response;
    }
    listing(&state, &query, |p| p["category"].as_str() == Some(slug.as_str()))
}

async fn list_categories(State(state): State<Arc<ApiState>>, uri: Uri) -> Response {
    if let Some(response) = record(&state, &uri) {
        return response;
    }
    let categories: Vec<Value> = ["smartphones", "laptops", "fragrances"]
        .iter()
        .map(|slug| {
            json!({
                "slug": slug,
                "name": slug[..1].to_uppercase() + &slug[1..],
                "url": format!("/products/category/{}", slug),
            })
        })
        .collect();
    Json(categories).into_response()
}
