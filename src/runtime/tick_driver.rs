//! Tokio interval driver for periodic generation ticks.

use std::sync::Arc;
use std::time::Duration;

use crate::core::engine::SchedulerEngine;

/// Drive [`SchedulerEngine::run_tick`] on a fixed interval until `shutdown`
/// flips to `true`.
///
/// A slow tick delays the next interval firing rather than stacking; ticks
/// triggered elsewhere (another driver, a user-requested refresh) may still
/// overlap this one, which is safe because occurrence uniqueness lives at
/// the data layer.
pub async fn run_periodic(
    engine: Arc<SchedulerEngine>,
    every: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = engine.run_tick(None).await;
                if report.has_errors() {
                    tracing::warn!(
                        generated = report.generated,
                        errors = report.errors.len(),
                        "tick completed with failures"
                    );
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::info!("tick driver shutting down");
                    break;
                }
            }
        }
    }
}
