//! Time source and display formatting.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Source of the current instant.
///
/// Registry operations take `now` explicitly; this trait supplies it at the
/// edges that run on wall-clock time (the expiry sweep, command handling).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Format an instant as local wall-clock time in the given zone,
/// e.g. `18:25 (Europe/Paris)`.
pub fn format_wall_time(instant: DateTime<Utc>, tz: Tz) -> String {
    format!("{} ({})", instant.with_timezone(&tz).format("%H:%M"), tz.name())
}
