//! Time source used for timestamps and rotation decisions

use std::time::SystemTime;

use chrono::{DateTime, Datelike, Local};

/// Source of the current local time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Calendar month, used to decide month rollover
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn of(time: &DateTime<Local>) -> Self {
        Self {
            year: time.year(),
            month: time.month(),
        }
    }

    pub fn of_system_time(time: SystemTime) -> Self {
        Self::of(&DateTime::<Local>::from(time))
    }

    /// `yyyy-MM` stamp used in month archive names
    pub fn stamp(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use chrono::{DateTime, Local, TimeZone};

    use super::Clock;

    /// Clock whose time is set by the test
    pub struct ManualClock(Mutex<DateTime<Local>>);

    impl ManualClock {
        /// Starts at the current wall-clock time and only moves when told to
        pub fn from_now() -> Self {
            Self(Mutex::new(Local::now()))
        }

        pub fn set(&self, time: DateTime<Local>) {
            *self.0.lock().unwrap() = time;
        }

        pub fn advance_secs(&self, secs: i64) {
            let mut now = self.0.lock().unwrap();
            *now += chrono::Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Local> {
            *self.0.lock().unwrap()
        }
    }

    pub fn local(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::local;
    use super::*;

    #[test]
    fn test_month_stamp() {
        let m = Month::of(&local(2026, 3, 9, 12, 0, 0));
        assert_eq!(m.stamp(), "2026-03");
    }

    #[test]
    fn test_month_ordering() {
        let jan = Month::of(&local(2026, 1, 31, 23, 59, 59));
        let feb = Month::of(&local(2026, 2, 1, 0, 0, 0));
        assert!(jan < feb);
        assert_ne!(jan, feb);
    }

    #[test]
    fn test_month_of_system_time_roundtrips_local() {
        let t = local(2025, 12, 15, 8, 30, 0);
        let st: SystemTime = t.into();
        assert_eq!(Month::of_system_time(st), Month::of(&t));
    }
}
