//! turnstile: bounded-resource admission control.
//!
//! A fixed pool of interchangeable tickets is contested by many concurrent
//! clients. Each attempt passes a time-window gate, then makes one
//! non-blocking claim on the pool. Claimed permits are scoped: they return to
//! the pool on every path except a completed booking.

pub mod client;
pub mod clock;
pub mod config;
pub mod gate;
mod ledger;
mod outcome;
pub mod permit;
pub mod service;
pub mod simulation;

pub use client::{ArrivalDelay, ClientReport, ClientState, ClientTask};
pub use clock::{Clock, FixedClock, RandomClock, ScriptedClock, SystemClock};
pub use config::{ClockMode, ConfigError, SimulationConfig};
pub use gate::{AdmissionGate, ForbiddenWindow};
pub use ledger::BookingLedger;
pub use outcome::{BookingError, BookingOutcome, RejectReason, TicketSerial};
pub use permit::TicketPool;
pub use service::{BookingService, ServiceSnapshot};
pub use simulation::{Simulation, SimulationReport, SimulationSummary};
pub use tokio_util::sync::CancellationToken;
