//! System clock adapter.
//!
//! Implements [`ClockPort`] for the run loop.
//!
//! - **`target_os = "espidf"`**: uptime from `esp_timer_get_time()`;
//!   time of day from `gettimeofday()` + `localtime_r()` (set by SNTP or
//!   an RTC, honours the `TZ` environment variable).
//! - **`not(target_os = "espidf")`**: uptime from `std::time::Instant`;
//!   time of day from `SystemTime`, interpreted as UTC.
//!
//! Wall-clock values before 2020-01-01 are treated as "not synced".

use crate::app::ports::{ClockPort, TimeOfDay};

/// Anything earlier is an unset RTC, not a real date.
const EPOCH_2020: i64 = 1_577_836_800;

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

/// Split Unix seconds (UTC) into a [`TimeOfDay`].  1970-01-01 was a
/// Thursday, so day 0 has weekday 3 (Monday = 0).
pub fn time_of_day_from_unix(secs: i64) -> Option<TimeOfDay> {
    if secs < EPOCH_2020 {
        return None;
    }
    let days = secs.div_euclid(86_400);
    let rem = secs.rem_euclid(86_400);
    Some(TimeOfDay {
        hour: (rem / 3600) as u8,
        minute: ((rem % 3600) / 60) as u8,
        weekday: ((days + 3) % 7) as u8,
    })
}

impl ClockPort for SystemClock {
    #[cfg(target_os = "espidf")]
    fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1000
    }

    #[cfg(not(target_os = "espidf"))]
    fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    #[cfg(target_os = "espidf")]
    fn time_of_day(&self) -> Option<TimeOfDay> {
        use core::ptr;
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return None;
        }
        if (tv.tv_sec as i64) < EPOCH_2020 {
            return None;
        }
        let secs = tv.tv_sec as esp_idf_svc::sys::time_t;
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        if !(0..=23).contains(&tm.tm_hour) || !(0..=59).contains(&tm.tm_min) {
            return None;
        }
        Some(TimeOfDay {
            hour: tm.tm_hour as u8,
            minute: tm.tm_min as u8,
            // tm_wday counts from Sunday.
            weekday: ((tm.tm_wday + 6) % 7) as u8,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn time_of_day(&self) -> Option<TimeOfDay> {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()?
            .as_secs();
        time_of_day_from_unix(i64::try_from(secs).ok()?)
    }
}
