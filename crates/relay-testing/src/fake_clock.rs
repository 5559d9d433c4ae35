//! A manually-advanceable `Clock`, so retry/backoff/reaper scenarios can
//! be driven deterministically instead of sleeping in real time.

use chrono::{DateTime, Duration, Utc};
use relay_core::Clock;
use std::sync::Mutex;

pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
}

impl FakeClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("fake clock mutex poisoned");
        *now += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().expect("fake clock mutex poisoned") = at;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("fake clock mutex poisoned")
    }
}
