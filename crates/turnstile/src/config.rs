//! Simulation configuration with environment overrides.
//!
//! Defaults reproduce the classic run: 10 tickets, 15 clients, a 200ms
//! confirmation step, arrivals jittered over [100ms, 600ms), and bookings
//! forbidden from 00:00 to 06:00 against a random clock.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveTime;

use crate::client::ArrivalDelay;
use crate::clock::{Clock, FixedClock, RandomClock, SystemClock, format_hh_mm};
use crate::gate::ForbiddenWindow;

pub const DEFAULT_CAPACITY: usize = 10;
pub const DEFAULT_CLIENTS: usize = 15;
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_millis(200);
pub const DEFAULT_ARRIVAL_MIN: Duration = Duration::from_millis(100);
pub const DEFAULT_ARRIVAL_MAX: Duration = Duration::from_millis(600);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("capacity must be at least 1")]
    ZeroCapacity,
    #[error("invalid time of day '{0}' (expected HH:MM)")]
    InvalidTime(String),
    #[error("unknown clock mode '{0}' (expected random, system or fixed=HH:MM)")]
    UnknownClockMode(String),
    #[error("arrival delay range is inverted: min {min:?} > max {max:?}")]
    InvertedArrivalRange { min: Duration, max: Duration },
}

/// Parse `HH:MM` on a 24-hour clock.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| ConfigError::InvalidTime(s.to_string()))
}

/// Where the gate gets its time of day from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClockMode {
    /// Uniformly random minute on every attempt.
    #[default]
    Random,
    /// Local wall clock.
    System,
    /// Always the given time.
    Fixed(NaiveTime),
}

impl ClockMode {
    pub fn into_clock(self) -> Arc<dyn Clock> {
        match self {
            ClockMode::Random => Arc::new(RandomClock),
            ClockMode::System => Arc::new(SystemClock),
            ClockMode::Fixed(time) => Arc::new(FixedClock::new(time)),
        }
    }
}

impl FromStr for ClockMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "random" => Ok(ClockMode::Random),
            "system" => Ok(ClockMode::System),
            other => match other.strip_prefix("fixed=") {
                Some(time) => Ok(ClockMode::Fixed(parse_time_of_day(time)?)),
                None => Err(ConfigError::UnknownClockMode(other.to_string())),
            },
        }
    }
}

impl std::fmt::Display for ClockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClockMode::Random => f.write_str("random"),
            ClockMode::System => f.write_str("system"),
            ClockMode::Fixed(time) => write!(f, "fixed={}", format_hh_mm(*time)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub capacity: usize,
    pub clients: usize,
    pub processing_delay: Duration,
    pub arrival: ArrivalDelay,
    pub window: ForbiddenWindow,
    pub clock: ClockMode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            clients: DEFAULT_CLIENTS,
            processing_delay: DEFAULT_PROCESSING_DELAY,
            arrival: ArrivalDelay::new(DEFAULT_ARRIVAL_MIN, DEFAULT_ARRIVAL_MAX),
            window: ForbiddenWindow::default(),
            clock: ClockMode::default(),
        }
    }
}

impl SimulationConfig {
    /// Defaults overridden by `TURNSTILE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `TURNSTILE_*` key.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(capacity) = parse_var(&lookup, "TURNSTILE_CAPACITY") {
            config.capacity = capacity;
        }
        if let Some(clients) = parse_var(&lookup, "TURNSTILE_CLIENTS") {
            config.clients = clients;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "TURNSTILE_PROCESSING_MS") {
            config.processing_delay = Duration::from_millis(ms);
        }
        if let Some(mode) = parse_var(&lookup, "TURNSTILE_CLOCK") {
            config.clock = mode;
        }

        let start = lookup("TURNSTILE_FORBIDDEN_START")
            .and_then(|s| time_var("TURNSTILE_FORBIDDEN_START", &s));
        let end = lookup("TURNSTILE_FORBIDDEN_END")
            .and_then(|s| time_var("TURNSTILE_FORBIDDEN_END", &s));
        if start.is_some() || end.is_some() {
            config.window = ForbiddenWindow::new(
                start.unwrap_or(config.window.start()),
                end.unwrap_or(config.window.end()),
            );
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.arrival.min() > self.arrival.max() {
            return Err(ConfigError::InvertedArrivalRange {
                min: self.arrival.min(),
                max: self.arrival.max(),
            });
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable config value");
            None
        }
    }
}

fn time_var(key: &str, raw: &str) -> Option<NaiveTime> {
    match parse_time_of_day(raw) {
        Ok(time) => Some(time),
        Err(e) => {
            tracing::warn!(key, error = %e, "Ignoring unparseable config value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_match_classic_run() {
        let config = SimulationConfig::default();
        assert_eq!(config.capacity, 10);
        assert_eq!(config.clients, 15);
        assert_eq!(config.processing_delay, Duration::from_millis(200));
        assert_eq!(config.arrival.min(), Duration::from_millis(100));
        assert_eq!(config.arrival.max(), Duration::from_millis(600));
        assert_eq!(config.window, ForbiddenWindow::default());
        assert_eq!(config.clock, ClockMode::Random);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = SimulationConfig::from_lookup(lookup_from(&[
            ("TURNSTILE_CAPACITY", "3"),
            ("TURNSTILE_CLIENTS", "8"),
            ("TURNSTILE_PROCESSING_MS", "5"),
            ("TURNSTILE_CLOCK", "fixed=07:30"),
            ("TURNSTILE_FORBIDDEN_END", "08:00"),
        ]));

        assert_eq!(config.capacity, 3);
        assert_eq!(config.clients, 8);
        assert_eq!(config.processing_delay, Duration::from_millis(5));
        assert_eq!(config.clock, ClockMode::Fixed(parse_time_of_day("07:30").unwrap()));
        assert_eq!(config.window.start(), NaiveTime::default());
        assert_eq!(config.window.end(), parse_time_of_day("08:00").unwrap());
    }

    #[test]
    fn unparseable_values_fall_back_to_defaults() {
        let config = SimulationConfig::from_lookup(lookup_from(&[
            ("TURNSTILE_CAPACITY", "lots"),
            ("TURNSTILE_CLOCK", "sundial"),
            ("TURNSTILE_FORBIDDEN_START", "25:99"),
        ]));

        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.clock, ClockMode::Random);
        assert_eq!(config.window, ForbiddenWindow::default());
    }

    #[test]
    fn clock_mode_parses_and_displays() {
        assert_eq!("random".parse::<ClockMode>().unwrap(), ClockMode::Random);
        assert_eq!("system".parse::<ClockMode>().unwrap(), ClockMode::System);

        let fixed: ClockMode = "fixed=03:00".parse().unwrap();
        assert_eq!(fixed.to_string(), "fixed=03:00");

        assert!(matches!(
            "fixed=3pm".parse::<ClockMode>(),
            Err(ConfigError::InvalidTime(_))
        ));
        assert!(matches!(
            "atomic".parse::<ClockMode>(),
            Err(ConfigError::UnknownClockMode(_))
        ));
    }

    #[test]
    fn fixed_mode_builds_fixed_clock() {
        let clock = ClockMode::Fixed(parse_time_of_day("03:00").unwrap()).into_clock();
        assert_eq!(format_hh_mm(clock.time_of_day()), "03:00");
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let config = SimulationConfig {
            capacity: 0,
            ..SimulationConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroCapacity)));
    }

    #[test]
    fn validate_rejects_inverted_arrival_range() {
        let config = SimulationConfig {
            arrival: ArrivalDelay::new(Duration::from_millis(500), Duration::from_millis(10)),
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedArrivalRange { .. })
        ));
    }
}
