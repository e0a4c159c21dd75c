//! Wall-clock source for save file names

use chrono::{DateTime, Local};

/// Supplies the local time used to stamp save file names
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The system's local clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Filename suffix for `time`: a space followed by `HH-mm-ss_MM-dd-yyyy`
///
/// Saves stamped within the same second get the same suffix and overwrite
/// each other.
pub fn timestamp_suffix(time: &DateTime<Local>) -> String {
    time.format(" %H-%M-%S_%m-%d-%Y").to_string()
}

/// Test clock that hands out a new second on every call, so file names never collide
#[cfg(test)]
pub(crate) struct StepClock {
    next: std::sync::Mutex<DateTime<Local>>,
}

#[cfg(test)]
impl StepClock {
    pub(crate) fn new() -> Self {
        use chrono::TimeZone;
        StepClock {
            next: std::sync::Mutex::new(Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
        }
    }
}

#[cfg(test)]
impl Clock for StepClock {
    fn now(&self) -> DateTime<Local> {
        let mut next = self.next.lock().unwrap();
        let now = *next;
        *next = now + chrono::Duration::seconds(1);
        now
    }
}
