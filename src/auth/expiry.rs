//! Challenge expiry computation

use chrono::{DateTime, Duration, SubsecRound, Utc};

/// Absolute expiry of a challenge issued at `now`
///
/// The result is truncated to milliseconds, the precision used for message
/// timestamps. Validity durations are whole milliseconds (enforced by
/// [`SiweOptions`](crate::config::SiweOptions)), so the expiry stays strictly
/// after `now`.
pub fn compute_expiry(now: DateTime<Utc>, validity: Duration) -> DateTime<Utc> {
    now.checked_add_signed(validity)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
        .trunc_subsecs(3)
}
