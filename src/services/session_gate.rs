use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Utc, Weekday};

/// A trading window in market-local time, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SessionWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Decides whether the market is open at a given instant.
///
/// The market's clock is a fixed UTC offset so the answer never depends on
/// the host timezone.
#[derive(Debug, Clone)]
pub struct SessionGate {
    offset: FixedOffset,
    windows: Vec<SessionWindow>,
    trading_days: Vec<Weekday>,
}

impl SessionGate {
    pub fn new(offset: FixedOffset, windows: Vec<SessionWindow>, trading_days: Vec<Weekday>) -> Self {
        Self {
            offset,
            windows,
            trading_days,
        }
    }

    pub fn local_time(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.offset)
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let local = self.local_time(now);

        if !self.trading_days.contains(&local.weekday()) {
            return false;
        }

        let t = local.time();
        self.windows.iter().any(|w| w.contains(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn vn_gate() -> SessionGate {
        SessionGate::new(
            FixedOffset::east_opt(7 * 3600).unwrap(),
            vec![
                SessionWindow::new(hm(9, 0), hm(11, 30)),
                SessionWindow::new(hm(13, 0), hm(15, 0)),
            ],
            vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
        )
    }

    // 2024-06-03 is a Monday.
    fn local(day: u32, h: u32, m: u32, s: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, day, h, m, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn open_inside_morning_and_afternoon() {
        let gate = vn_gate();
        assert!(gate.is_open(local(3, 10, 15, 0)));
        assert!(gate.is_open(local(3, 14, 0, 0)));
    }

    #[test]
    fn window_endpoints_are_inclusive() {
        let gate = vn_gate();
        assert!(gate.is_open(local(3, 9, 0, 0)));
        assert!(gate.is_open(local(3, 11, 30, 0)));
        assert!(gate.is_open(local(3, 13, 0, 0)));
        assert!(gate.is_open(local(3, 15, 0, 0)));
        assert!(!gate.is_open(local(3, 11, 30, 1)));
        assert!(!gate.is_open(local(3, 8, 59, 59)));
    }

    #[test]
    fn closed_in_lunch_gap_and_after_hours() {
        let gate = vn_gate();
        assert!(!gate.is_open(local(3, 12, 0, 0)));
        assert!(!gate.is_open(local(3, 15, 0, 1)));
        assert!(!gate.is_open(local(3, 20, 0, 0)));
    }

    #[test]
    fn closed_on_weekend() {
        let gate = vn_gate();
        // 2024-06-08 Saturday, 2024-06-09 Sunday
        assert!(!gate.is_open(local(8, 10, 0, 0)));
        assert!(!gate.is_open(local(9, 14, 0, 0)));
    }

    #[test]
    fn evaluates_in_market_offset_not_utc() {
        let gate = vn_gate();
        // 03:00 UTC Monday is 10:00 in UTC+7
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 3, 0, 0).unwrap();
        assert!(gate.is_open(now));
        // 23:00 UTC Friday is already Saturday 06:00 locally
        let now = Utc.with_ymd_and_hms(2024, 6, 7, 23, 0, 0).unwrap();
        assert!(!gate.is_open(now));
    }
}
