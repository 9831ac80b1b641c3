//! Delay enforcement (spec §4.7): after rendering, sleeps the remainder of
//! a configured delay, cooperatively cancellable via a `CancellationToken`.

use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Resolve the effective delay for a request: the `?delay=` query override
/// if present, else the operation's `defaultDelay`.
pub fn effective_delay_ms(request_delay: Option<u64>, default_delay: Option<u64>) -> Option<u64> {
    request_delay.or(default_delay)
}

/// Sleep for whatever remains of `delay_ms` after `elapsed` since
/// `start`, racing against `cancellation` so a disconnected client aborts
/// the sleep instead of holding the task alive.
pub async fn enforce(start: Instant, delay_ms: Option<u64>, cancellation: &CancellationToken) {
    let Some(delay_ms) = delay_ms else { return };
    let target = Duration::from_millis(delay_ms);
    let elapsed = start.elapsed();
    if elapsed >= target {
        return;
    }
    let remaining = target - elapsed;
    tokio::select! {
        _ = tokio::time::sleep(remaining) => {}
        _ = cancellation.cancelled() => {
            tracing::debug!("delay sleep cancelled by client disconnect");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_delay_overrides_default() {
        assert_eq!(effective_delay_ms(Some(10), Some(200)), Some(10));
    }

    #[test]
    fn falls_back_to_operation_default() {
        assert_eq!(effective_delay_ms(None, Some(200)), Some(200));
    }

    #[test]
    fn no_delay_configured_is_none() {
        assert_eq!(effective_delay_ms(None, None), None);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_for_the_remaining_duration() {
        let start = Instant::now();
        tokio::time::advance(Duration::from_millis(30)).await;
        let token = CancellationToken::new();
        let before = Instant::now();
        enforce(start, Some(200), &token).await;
        assert!(Instant::now() >= before);
    }

    #[tokio::test]
    async fn cancellation_aborts_the_sleep() {
        let start = Instant::now();
        let token = CancellationToken::new();
        token.cancel();
        enforce(start, Some(60_000), &token).await;
    }

    #[tokio::test]
    async fn already_elapsed_delay_does_not_sleep() {
        let start = Instant::now() - Duration::from_millis(500);
        let token = CancellationToken::new();
        enforce(start, Some(10), &token).await;
    }
}
