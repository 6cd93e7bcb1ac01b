//! Debounced search box.
//!
//! Simulates a user typing a query one keystroke at a time. The search runs
//! once, 300ms after the last keystroke, with the full query.

use call_limiter::{Limiter, Policy};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Debounced Search Example ===\n");
    println!("Policy: run the search 300ms after the last keystroke\n");

    let start = Instant::now();
    let search = Limiter::create(
        move |query: String| {
            info!(elapsed_ms = start.elapsed().as_millis() as u64, %query, "searching");
        },
        300.0,
        Policy::debounce(),
    )
    .expect("valid interval inside a Tokio runtime");

    // Typing bursts: "rust", a pause, then " debounce"
    for prefix in ["r", "ru", "rus", "rust"] {
        let outcome = search.call(prefix.to_string()).expect("limiter is live");
        println!("typed {:<16} -> {:?}", format!("{:?}", prefix), outcome);
        sleep(Duration::from_millis(80)).await;
    }

    sleep(Duration::from_millis(500)).await;

    for query in ["rust d", "rust deb", "rust debounce"] {
        let outcome = search.call(query.to_string()).expect("limiter is live");
        println!("typed {:<16} -> {:?}", format!("{:?}", query), outcome);
        sleep(Duration::from_millis(120)).await;
    }

    sleep(Duration::from_millis(500)).await;

    let snapshot = search.metrics().snapshot();
    println!("\n=== Metrics ===");
    println!("Keystrokes: {}", snapshot.calls);
    println!("Searches run: {}", snapshot.fired);
    println!("Discard rate: {:.1}%", snapshot.discard_rate() * 100.0);

    search.dispose();
}
