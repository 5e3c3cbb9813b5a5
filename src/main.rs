use salona_catalog::{CatalogConfig, CatalogController, CatalogError, SortField, SortOrder};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// One line of driver input
#[derive(Debug, PartialEq)]
enum Command {
    Search(String),
    Sort(SortField),
    Order(SortOrder),
    Category(Option<String>),
    Page(u32),
    Next,
    Prev,
    Retry,
    Refresh,
    Categories,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, CatalogError> {
    let line = line.trim();
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match verb {
        "search" => Command::Search(rest.to_string()),
        "sort" => Command::Sort(rest.parse()?),
        "order" => Command::Order(rest.parse()?),
        "category" if rest.is_empty() => Command::Category(None),
        "category" => Command::Category(Some(rest.to_string())),
        "page" => Command::Page(rest.parse().map_err(|_| {
            CatalogError::InvalidParams(format!("page must be a number, got {:?}", rest))
        })?),
        "next" => Command::Next,
        "prev" => Command::Prev,
        "retry" => Command::Retry,
        "refresh" => Command::Refresh,
        "categories" => Command::Categories,
        "quit" | "exit" => Command::Quit,
        other => {
            return Err(CatalogError::InvalidParams(format!(
                "unknown command {:?}",
                other
            )));
        }
    };
    Ok(command)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Logs go to stderr, stdout carries the views
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,salona_catalog=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let config = CatalogConfig::from_env()?;
    info!(
        base_url = %config.api_base_url,
        page_size = config.page_size,
        "Starting catalog browser"
    );

    let controller = CatalogController::from_config(&config)?;

    let mut views = controller.subscribe();
    tokio::spawn(async move {
        while views.changed().await.is_ok() {
            let view = views.borrow_and_update().clone();
            match serde_json::to_string(&view) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to encode view: {}", e),
            }
        }
    });

    controller.start();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        match command {
            Command::Search(text) => controller.on_search_change(&text),
            Command::Sort(field) => controller.on_sort_change(field),
            Command::Order(order) => controller.on_order_change(order),
            Command::Category(slug) => controller.on_category_change(slug),
            Command::Page(_) | Command::Next | Command::Prev => {
                let moved = match command {
                    Command::Page(n) => controller.on_page_change(n),
                    Command::Next => controller.on_next_page(),
                    _ => controller.on_prev_page(),
                };
                if !moved {
                    warn!(
                        page = controller.current_page(),
                        "{}",
                        rejected_move(&command, controller.total_pages())
                    );
                }
            }
            Command::Retry => controller.retry(),
            Command::Refresh => controller.refresh(),
            Command::Categories => match controller.categories().await {
                Ok(categories) => println!("{}", serde_json::to_string(&categories)?),
                Err(e) => warn!("Failed to load categories: {}", e),
            },
            Command::Quit => break,
        }
    }

    controller.shutdown();
    info!("Catalog browser stopped");
    Ok(())
}

/// Why a page move left the current page unchanged
fn rejected_move(command: &Command, total_pages: Option<u32>) -> String {
    match (command, total_pages) {
        (Command::Next, _) => "Already on the last page".to_string(),
        (Command::Prev, _) => "Already on the first page".to_string(),
        (Command::Page(n), Some(total)) => format!("Page {} is outside 1..={}", n, total),
        (Command::Page(n), None) => format!("Page {} is not a valid page", n),
        _ => "Page change rejected".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command("search  red lipstick ").unwrap(),
            Command::Search("red lipstick".to_string())
        );
        assert_eq!(parse_command("search").unwrap(), Command::Search(String::new()));
        assert_eq!(parse_command("sort price").unwrap(), Command::Sort(SortField::Price));
        assert_eq!(parse_command("sort name").unwrap(), Command::Sort(SortField::Title));
        assert_eq!(parse_command("order desc").unwrap(), Command::Order(SortOrder::Desc));
        assert_eq!(parse_command("category").unwrap(), Command::Category(None));
        assert_eq!(
            parse_command("category laptops").unwrap(),
            Command::Category(Some("laptops".to_string()))
        );
        assert_eq!(parse_command("page 4").unwrap(), Command::Page(4));
        assert_eq!(parse_command("next").unwrap(), Command::Next);
        assert_eq!(parse_command("quit").unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_command_errors() {
        assert!(parse_command("page four").is_err());
        assert!(parse_command("sort colour").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn test_rejected_move_message() {
        assert_eq!(rejected_move(&Command::Next, Some(3)), "Already on the last page");
        assert_eq!(rejected_move(&Command::Prev, None), "Already on the first page");
        assert_eq!(rejected_move(&Command::Page(9), Some(3)), "Page 9 is outside 1..=3");
        assert_eq!(rejected_move(&Command::Page(0), None), "Page 0 is not a valid page");
    }
}
