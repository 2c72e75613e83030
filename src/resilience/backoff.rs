//! Linear backoff between retry attempts.

use std::time::Duration;

/// Default backoff unit.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(3000);

/// Delay before retry attempt `attempt` (1-indexed): `base * (1 + attempt)`.
///
/// Grows linearly, so attempt 1 waits two units, attempt 2 three units.
pub fn calculate_backoff(attempt: u32, base: Duration) -> Duration {
    base.saturating_mul(attempt.saturating_add(1))
}
