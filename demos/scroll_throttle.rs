//! Throttled scroll handler, with and without a trailing edge.
//!
//! Scroll events arrive every 16ms. A plain throttle handles at most one per
//! 100ms window and drops the rest, so the final position can be lost. The
//! trailing variant replays the latest dropped event when the window closes.

use call_limiter::{CallOutcome, LimiterBuilder};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    println!("=== Throttled Scroll Example ===\n");

    for trailing in [false, true] {
        println!("--- trailing edge: {} ---", trailing);

        let start = Instant::now();
        let handler = LimiterBuilder::throttle()
            .with_interval(Duration::from_millis(100))
            .with_trailing(trailing)
            .build(move |offset: u32| {
                info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    offset, "handling scroll"
                );
            })
            .expect("valid configuration inside a Tokio runtime");

        let mut fired = 0;
        let mut dropped = 0;
        for offset in (0..=600).step_by(40) {
            match handler.call(offset).expect("limiter is live") {
                CallOutcome::Fired => fired += 1,
                CallOutcome::Scheduled => {}
                CallOutcome::Dropped => dropped += 1,
            }
            sleep(Duration::from_millis(16)).await;
        }

        sleep(Duration::from_millis(200)).await;

        let snapshot = handler.metrics().snapshot();
        println!(
            "events: {}, handled immediately: {}, dropped: {}, total runs: {}\n",
            snapshot.calls, fired, dropped, snapshot.fired
        );
    }
}
