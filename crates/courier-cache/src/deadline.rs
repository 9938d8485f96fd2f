//! Overflow-safe deadlines.

use std::time::Duration;

use tokio::time::Instant;

/// Roughly 30 years; stands in for windows the clock cannot represent.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Returns `now + window`, clamped to a far-future instant instead of overflowing.
pub(crate) fn deadline_after(now: Instant, window: Duration) -> Instant {
    now.checked_add(window)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}
