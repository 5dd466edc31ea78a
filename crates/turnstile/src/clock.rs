//! Time-of-day sources for the admission gate.
//!
//! The gate never reads the wall clock directly. Production wiring hands it a
//! [`SystemClock`], simulations a [`RandomClock`], and tests a [`FixedClock`]
//! or [`ScriptedClock`] so gate decisions are deterministic.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{NaiveTime, Timelike};
use rand::Rng;

const SECONDS_PER_MINUTE: u32 = 60;
const MINUTES_PER_DAY: u32 = 24 * 60;

/// Supplies the time of day used for one admission decision.
pub trait Clock: Send + Sync {
    fn time_of_day(&self) -> NaiveTime;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn time_of_day(&self) -> NaiveTime {
        chrono::Local::now().time()
    }
}

/// Always reports the same time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(NaiveTime);

impl FixedClock {
    pub fn new(time: NaiveTime) -> Self {
        Self(time)
    }

    /// Fixed clock at `hour:minute`, or `None` if either is out of range.
    pub fn at(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }
}

impl Clock for FixedClock {
    fn time_of_day(&self) -> NaiveTime {
        self.0
    }
}

/// Uniformly random minute of the day on every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomClock;

impl Clock for RandomClock {
    fn time_of_day(&self) -> NaiveTime {
        let minute = rand::thread_rng().gen_range(0..MINUTES_PER_DAY);
        NaiveTime::from_num_seconds_from_midnight_opt(minute * SECONDS_PER_MINUTE, 0)
            .unwrap_or_default()
    }
}

/// Replays a fixed sequence of times, repeating the last one once exhausted.
#[derive(Debug)]
pub struct ScriptedClock {
    /// Times still to replay, and the most recent time handed out.
    script: Mutex<(VecDeque<NaiveTime>, NaiveTime)>,
}

impl ScriptedClock {
    pub fn new(times: impl IntoIterator<Item = NaiveTime>) -> Self {
        let remaining: VecDeque<NaiveTime> = times.into_iter().collect();
        let last = remaining.back().copied().unwrap_or_default();
        Self {
            script: Mutex::new((remaining, last)),
        }
    }
}

impl Clock for ScriptedClock {
    fn time_of_day(&self) -> NaiveTime {
        let mut script = match self.script.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let (remaining, last) = &mut *script;
        if let Some(time) = remaining.pop_front() {
            *last = time;
        }
        *last
    }
}

/// Render a time of day the way the gate reports it (`HH:MM`).
pub fn format_hh_mm(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}
