//! One debounced autosave per document.
//!
//! Edits to several documents interleave. Each document gets its own
//! limiter from the registry, so a burst of edits to one never delays the
//! save of another. Idle limiters are evicted to keep memory bounded.

use call_limiter::LimiterBuilder;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Keyed Autosave Example ===\n");

    let autosave = LimiterBuilder::debounce()
        .with_interval(Duration::from_millis(200))
        .build_keyed(|document: &String, contents: String| {
            info!(%document, bytes = contents.len(), "saved");
        })
        .expect("valid configuration inside a Tokio runtime");

    let edits = [
        ("notes.md", "# Notes"),
        ("todo.txt", "- buy milk"),
        ("notes.md", "# Notes\n\nDebounce"),
        ("todo.txt", "- buy milk\n- call bob"),
        ("notes.md", "# Notes\n\nDebounce per key"),
    ];

    for (document, contents) in edits {
        autosave
            .call(document.to_string(), contents.to_string())
            .expect("registry limiters are live");
        sleep(Duration::from_millis(50)).await;
    }
    println!("tracked documents: {}", autosave.len());

    sleep(Duration::from_millis(400)).await;

    let evicted = autosave.evict_idle(Duration::from_millis(300));
    println!("evicted idle documents: {}", evicted);
    println!("tracked documents: {}", autosave.len());

    autosave
        .call("draft.md".to_string(), "unsaved work".to_string())
        .expect("registry limiters are live");
    println!("flushed on shutdown: {}", autosave.flush_all());
    autosave.dispose_all();
}
