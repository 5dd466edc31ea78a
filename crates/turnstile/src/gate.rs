//! Admission gate: the time-window rule checked before any pool interaction.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveTime;
use serde::Serialize;

use crate::clock::{Clock, format_hh_mm};

/// Half-open interval `[start, end)` on a 24-hour clock during which booking is refused.
///
/// A window whose start is after its end wraps past midnight. A window with
/// `start == end` is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForbiddenWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl ForbiddenWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

impl Default for ForbiddenWindow {
    /// 00:00 to 06:00.
    fn default() -> Self {
        Self {
            start: NaiveTime::default(),
            end: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or_default(),
        }
    }
}

impl fmt::Display for ForbiddenWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            format_hh_mm(self.start),
            format_hh_mm(self.end)
        )
    }
}

/// Result of one gate evaluation, kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    pub sampled: NaiveTime,
    pub allowed: bool,
}

/// Decides whether booking is permitted at the moment of an attempt.
#[derive(Clone)]
pub struct AdmissionGate {
    window: ForbiddenWindow,
    clock: Arc<dyn Clock>,
}

impl AdmissionGate {
    pub fn new(window: ForbiddenWindow, clock: Arc<dyn Clock>) -> Self {
        Self { window, clock }
    }

    pub fn window(&self) -> ForbiddenWindow {
        self.window
    }

    /// Sample the clock once and evaluate the window.
    pub fn check(&self) -> GateDecision {
        let sampled = self.clock.time_of_day();
        let allowed = !self.window.contains(sampled);
        tracing::trace!(time = %format_hh_mm(sampled), allowed, "Gate check");
        GateDecision { sampled, allowed }
    }

    pub fn is_allowed(&self) -> bool {
        self.check().allowed
    }
}

impl fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    fn t(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn gate_at(hour: u32, minute: u32) -> AdmissionGate {
        AdmissionGate::new(
            ForbiddenWindow::default(),
            Arc::new(FixedClock::at(hour, minute).unwrap()),
        )
    }

    #[test]
    fn default_window_is_midnight_to_six() {
        let window = ForbiddenWindow::default();
        assert_eq!(window.start(), t(0, 0));
        assert_eq!(window.end(), t(6, 0));
        assert_eq!(window.to_string(), "00:00 to 06:00");
    }

    #[test]
    fn start_boundary_is_forbidden_end_boundary_is_allowed() {
        assert!(!gate_at(0, 0).is_allowed());
        assert!(!gate_at(5, 59).is_allowed());
        assert!(gate_at(6, 0).is_allowed());
    }

    #[test]
    fn inside_window_is_forbidden() {
        assert!(!gate_at(3, 0).is_allowed());
    }

    #[test]
    fn outside_window_is_allowed() {
        assert!(gate_at(12, 0).is_allowed());
        assert!(gate_at(23, 59).is_allowed());
    }

    #[test]
    fn wrapping_window_spans_midnight() {
        let window = ForbiddenWindow::new(t(22, 0), t(2, 0));
        assert!(window.contains(t(22, 0)));
        assert!(window.contains(t(23, 30)));
        assert!(window.contains(t(1, 59)));
        assert!(!window.contains(t(2, 0)));
        assert!(!window.contains(t(12, 0)));
    }

    #[test]
    fn empty_window_never_forbids() {
        let window = ForbiddenWindow::new(t(4, 0), t(4, 0));
        assert!(!window.contains(t(4, 0)));
        assert!(!window.contains(t(0, 0)));
    }

    #[test]
    fn check_reports_sampled_time() {
        let decision = gate_at(3, 0).check();
        assert_eq!(decision.sampled, t(3, 0));
        assert!(!decision.allowed);
    }
}
