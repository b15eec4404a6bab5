use async_trait::async_trait;
use std::time::Duration;

use crate::http::HttpResponse;

/// Exponent cap, keeps the delay from overflowing on absurd attempt budgets.
const MAX_EXPONENT: u32 = 16;

/// `base_ms * 2^attempt`, no jitter.
pub fn exponential_backoff(base_ms: u64, attempt: u32) -> Duration {
    let exponent = attempt.min(MAX_EXPONENT);
    Duration::from_millis(base_ms.saturating_mul(1u64 << exponent))
}

/// Server-provided `retry-after` hint in seconds, clamped to at least one second.
pub fn retry_after(response: &HttpResponse) -> Option<Duration> {
    let seconds = response.header("retry-after")?.trim().parse::<f64>().ok()?;
    if !seconds.is_finite() {
        return None;
    }
    Some(Duration::from_millis((seconds.max(1.0) * 1000.0) as u64))
}

/// Suspension point between attempts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
