//! ClientTask: one concurrent booking attempt.
//!
//! Lifecycle: `Created → AttemptDelay → Booking → terminal → Finished`, where
//! the terminal state is one of `Succeeded`, `RejectedTime`, `RejectedSoldOut`
//! or `Cancelled` and is set exactly once. A task never retries.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::outcome::{BookingOutcome, RejectReason};
use crate::service::BookingService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientState {
    Created,
    AttemptDelay,
    Booking,
    Succeeded,
    RejectedTime,
    RejectedSoldOut,
    Cancelled,
    Finished,
}

impl ClientState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::RejectedTime | Self::RejectedSoldOut | Self::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AttemptDelay => "attempt_delay",
            Self::Booking => "booking",
            Self::Succeeded => "succeeded",
            Self::RejectedTime => "rejected_time",
            Self::RejectedSoldOut => "rejected_sold_out",
            Self::Cancelled => "cancelled",
            Self::Finished => "finished",
        }
    }

    fn terminal_for(outcome: &BookingOutcome) -> Self {
        match outcome {
            BookingOutcome::Success(_) => Self::Succeeded,
            BookingOutcome::Rejected(RejectReason::TimeForbidden) => Self::RejectedTime,
            BookingOutcome::Rejected(RejectReason::SoldOut) => Self::RejectedSoldOut,
            BookingOutcome::Cancelled => Self::Cancelled,
        }
    }

    fn can_transition_to(&self, next: ClientState) -> bool {
        use ClientState::*;
        match (self, next) {
            (Created, AttemptDelay) => true,
            (AttemptDelay, Booking | Cancelled) => true,
            (Booking, s) if s.is_terminal() => true,
            (s, Finished) if s.is_terminal() => true,
            _ => false,
        }
    }
}

/// Bounded random wait before a client attempts to book, in `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrivalDelay {
    min: Duration,
    max: Duration,
}

impl ArrivalDelay {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Attempt immediately.
    pub fn none() -> Self {
        Self::fixed(Duration::ZERO)
    }

    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay)
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let span = u64::try_from((self.max - self.min).as_nanos()).unwrap_or(u64::MAX);
        let offset = rand::thread_rng().gen_range(0..span);
        self.min + Duration::from_nanos(offset)
    }
}

/// Final record of a client task, handed to the driver.
#[derive(Debug, Clone, Serialize)]
pub struct ClientReport {
    pub name: String,
    pub outcome: BookingOutcome,
    pub terminal: ClientState,
    pub history: Vec<ClientState>,
}

pub struct ClientTask {
    name: String,
    arrival: ArrivalDelay,
    state: ClientState,
    history: Vec<ClientState>,
}

impl ClientTask {
    pub fn new(name: impl Into<String>, arrival: ArrivalDelay) -> Self {
        Self {
            name: name.into(),
            arrival,
            state: ClientState::Created,
            history: vec![ClientState::Created],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    fn transition(&mut self, next: ClientState) {
        if !self.state.can_transition_to(next) {
            debug_assert!(false, "invalid client transition {:?} -> {:?}", self.state, next);
            tracing::error!(
                client = %self.name,
                from = self.state.as_str(),
                to = next.as_str(),
                "Bug: invalid client state transition"
            );
            return;
        }
        tracing::trace!(
            client = %self.name,
            from = self.state.as_str(),
            to = next.as_str(),
            "Client transition"
        );
        self.state = next;
        self.history.push(next);
    }

    /// Wait for the arrival delay, attempt one booking, and report the result.
    ///
    /// Cancellation during the wait never touches the pool. Cancellation during
    /// the booking is handled by the service, which returns the permit first.
    pub async fn run(
        mut self,
        service: Arc<BookingService>,
        cancel: CancellationToken,
    ) -> ClientReport {
        tracing::debug!(client = %self.name, "Client simulating booking attempt");
        self.transition(ClientState::AttemptDelay);

        let delay = self.arrival.sample();
        let arrived = tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        };

        let outcome = if arrived {
            self.transition(ClientState::Booking);
            service.book_ticket_cancellable(&self.name, &cancel).await
        } else {
            tracing::warn!(client = %self.name, "Client cancelled while waiting to book");
            BookingOutcome::Cancelled
        };

        if let BookingOutcome::Rejected(reason) = outcome {
            tracing::debug!(
                client = %self.name,
                reason = %service.explain(reason),
                "Client could not book a ticket"
            );
        }

        self.finish(outcome)
    }

    fn finish(mut self, outcome: BookingOutcome) -> ClientReport {
        let terminal = ClientState::terminal_for(&outcome);
        self.transition(terminal);
        self.transition(ClientState::Finished);
        tracing::debug!(
            client = %self.name,
            outcome = outcome.as_str(),
            "Client finished attempt"
        );

        ClientReport {
            name: self.name,
            outcome,
            terminal,
            history: self.history,
        }
    }
}
