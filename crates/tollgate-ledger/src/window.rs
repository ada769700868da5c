use std::time::Duration;

use jiff::Timestamp;

const SECONDS_PER_HOUR: i64 = 3_600;

/// Fixed-length accounting window aligned to a UTC hour
///
/// Window boundaries are `anchor + n * length` for integer `n`, so
/// every instance built from the same config agrees on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    length: i64,
    anchor: i64,
}

impl Window {
    /// A window of `length` whose boundaries fall on `reset_hour_utc`
    ///
    /// Sub-second lengths are rounded up to one second.
    pub fn new(length: Duration, reset_hour_utc: u8) -> Self {
        Self {
            length: i64::try_from(length.as_secs()).unwrap_or(i64::MAX).max(1),
            anchor: i64::from(reset_hour_utc) * SECONDS_PER_HOUR,
        }
    }

    /// Unix second at which the window containing `now` started
    pub fn start_of(&self, now: Timestamp) -> i64 {
        let offset = now.as_second() - self.anchor;
        self.anchor + offset.div_euclid(self.length) * self.length
    }

    /// Unix second at which the window containing `now` ends
    pub fn end_of(&self, now: Timestamp) -> i64 {
        self.start_of(now).saturating_add(self.length)
    }

    pub const fn length(&self) -> Duration {
        Duration::from_secs(self.length.unsigned_abs())
    }

    pub(crate) const fn seconds(&self) -> i64 {
        self.length
    }
}

pub(crate) fn timestamp(second: i64) -> Timestamp {
    Timestamp::from_second(second).unwrap_or(Timestamp::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> Timestamp {
        raw.parse().unwrap()
    }

    #[test]
    fn daily_window_starts_at_midnight() {
        let window = Window::new(Duration::from_secs(86_400), 0);
        let now = at("2026-03-10T17:45:00Z");

        assert_eq!(timestamp(window.start_of(now)), at("2026-03-10T00:00:00Z"));
        assert_eq!(timestamp(window.end_of(now)), at("2026-03-11T00:00:00Z"));
    }

    #[test]
    fn reset_hour_shifts_the_boundary() {
        let window = Window::new(Duration::from_secs(86_400), 6);

        assert_eq!(
            timestamp(window.start_of(at("2026-03-10T05:59:59Z"))),
            at("2026-03-09T06:00:00Z")
        );
        assert_eq!(
            timestamp(window.start_of(at("2026-03-10T06:00:00Z"))),
            at("2026-03-10T06:00:00Z")
        );
    }

    #[test]
    fn short_windows_tile_the_day() {
        let window = Window::new(Duration::from_secs(3_600), 0);
        assert_eq!(
            timestamp(window.start_of(at("2026-03-10T17:45:00Z"))),
            at("2026-03-10T17:00:00Z")
        );
    }
}
