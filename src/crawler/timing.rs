//! Duration reporting for long-running phases

use std::future::Future;
use std::time::Instant;

/// Awaits `future` and logs how long it took under `label`
pub async fn timed<F: Future>(label: &str, future: F) -> F::Output {
    let start = Instant::now();
    let output = future.await;
    tracing::info!("Time taken by [{}]: {:.4} seconds", label, start.elapsed().as_secs_f64());
    output
}
