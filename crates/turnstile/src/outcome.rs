//! Booking outcomes.

use std::fmt;

use serde::Serialize;

/// Sequential ticket number handed out on confirmation, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TicketSerial(u64);

impl TicketSerial {
    pub fn new(serial: u64) -> Self {
        Self(serial)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TicketSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The gate refused the attempt; the pool was not touched.
    TimeForbidden,
    /// No permit was available at the moment of the attempt.
    SoldOut,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimeForbidden => "time_forbidden",
            Self::SoldOut => "sold_out",
        }
    }
}

/// Result of exactly one booking attempt. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingOutcome {
    Success(TicketSerial),
    Rejected(RejectReason),
    Cancelled,
}

impl BookingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn serial(&self) -> Option<TicketSerial> {
        match self {
            Self::Success(serial) => Some(*serial),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Rejected(reason) => reason.as_str(),
            Self::Cancelled => "cancelled",
        }
    }

    pub fn into_result(self) -> Result<TicketSerial, BookingError> {
        match self {
            Self::Success(serial) => Ok(serial),
            Self::Rejected(RejectReason::TimeForbidden) => Err(BookingError::TimeForbidden),
            Self::Rejected(RejectReason::SoldOut) => Err(BookingError::SoldOut),
            Self::Cancelled => Err(BookingError::Cancelled),
        }
    }
}

/// Recoverable booking failures, for callers that want `?` instead of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("Booking is not available during the forbidden window")]
    TimeForbidden,
    #[error("All tickets are currently sold out or being processed")]
    SoldOut,
    #[error("Booking was cancelled")]
    Cancelled,
}
