use std::env;
use std::sync::Arc;

use food_rescue::{ClientConfig, MemoryStore, PantryClient, RecordId, SearchArea, ViewState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if it exists
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "food_rescue=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env()?;
    let user_id = RecordId::parse(&env::var("PANTRY_USER_ID").unwrap_or_else(|_| "1".to_string()));
    let region = env::var("PANTRY_REGION").unwrap_or_else(|_| "PA".to_string());

    // PANTRY_STORE=memory runs against the built-in sample inventory
    let client = if env::var("PANTRY_STORE").map(|v| v.eq_ignore_ascii_case("memory")).unwrap_or(false) {
        tracing::info!("Using in-memory donation store");
        PantryClient::with_store(Arc::new(MemoryStore::seeded()), config)
    } else {
        PantryClient::connect(config)?
    };

    let mut home = client.home_feed(user_id.clone());
    home.load(&SearchArea::region(region.as_str())).await;
    println!("Donations near {}:", region);
    print_state(home.available(), |item| {
        format!(
            "  {} - {}",
            item.donation_id.as_ref().map(|id| id.to_string()).unwrap_or_default(),
            item.title.as_deref().unwrap_or("(untitled)")
        )
    });
    match home.active_count() {
        Some(n) => println!(
            "Active orders: {} of {} ({})",
            n,
            home.max_orders(),
            if home.can_request_more() { "can request more" } else { "at capacity" }
        ),
        None => println!("Active orders: unknown, requests disabled"),
    }

    let mut board = client.order_board(user_id.clone());
    board.refresh().await;
    println!("Orders:");
    print_state(board.state(), |order| {
        format!("  #{} {} ({}, {})", order.order_id, order.item_title, order.item_quantity, order.address)
    });

    println!("History:");
    let history = ViewState::from_result(client.history().build_timeline(&user_id).await);
    print_state(&history, |entry| {
        format!(
            "  {} requested {} picked up {}",
            entry.donation_name,
            entry.requested_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".into()),
            entry.picked_up_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".into())
        )
    });

    Ok(())
}

fn print_state<T>(state: &ViewState<T>, line: impl Fn(&T) -> String) {
    match state {
        ViewState::Loading => println!("  (loading)"),
        ViewState::Failed(e) => println!("  failed: {}", e),
        ViewState::Empty => println!("  (none)"),
        ViewState::Ready(items) => {
            for item in items {
                println!("{}", line(item));
            }
        }
    }
}
