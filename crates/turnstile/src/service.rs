//! BookingService: composes the admission gate and the ticket pool.
//!
//! This service owns:
//! - The ticket pool (the only place permits are claimed)
//! - The booked counter and the serials it hands out
//! - The booking ledger
//!
//! Every call to `book_ticket` yields exactly one `BookingOutcome`. It never
//! waits for capacity; the only suspension is the fixed processing delay
//! after a permit has been claimed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, format_hh_mm};
use crate::config::DEFAULT_PROCESSING_DELAY;
use crate::gate::{AdmissionGate, ForbiddenWindow};
use crate::ledger::BookingLedger;
use crate::outcome::{BookingOutcome, RejectReason, TicketSerial};
use crate::permit::{PermitHeld, TicketPool};

/// Snapshot of pool and counter state for reporting.
///
/// Best-effort: values may be stale immediately under concurrent activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceSnapshot {
    pub capacity: usize,
    pub available_permits: usize,
    pub booked_count: u64,
}

impl ServiceSnapshot {
    pub fn is_sold_out(&self) -> bool {
        self.available_permits == 0
    }

    /// Permits claimed but neither confirmed nor returned.
    pub fn in_flight(&self) -> usize {
        let booked = usize::try_from(self.booked_count).unwrap_or(usize::MAX);
        self.capacity
            .saturating_sub(self.available_permits)
            .saturating_sub(booked)
    }
}

pub struct BookingService {
    pool: TicketPool,
    gate: AdmissionGate,
    booked: AtomicU64,
    ledger: BookingLedger,
    processing_delay: Duration,
}

impl BookingService {
    pub fn new(capacity: usize, window: ForbiddenWindow, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool: TicketPool::new(capacity),
            gate: AdmissionGate::new(window, clock),
            booked: AtomicU64::new(0),
            ledger: BookingLedger::new(),
            processing_delay: DEFAULT_PROCESSING_DELAY,
        }
    }

    /// Duration of the confirmation step that runs while a permit is held.
    pub fn with_processing_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = delay;
        self
    }

    pub fn processing_delay(&self) -> Duration {
        self.processing_delay
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Book one ticket for `client_id`.
    ///
    /// Dropping the returned future mid-processing releases the held permit.
    pub async fn book_ticket(&self, client_id: &str) -> BookingOutcome {
        self.book_ticket_cancellable(client_id, &CancellationToken::new())
            .await
    }

    /// Book one ticket, aborting the processing step if `cancel` fires.
    ///
    /// On cancellation the permit is back in the pool before `Cancelled` is returned.
    pub async fn book_ticket_cancellable(
        &self,
        client_id: &str,
        cancel: &CancellationToken,
    ) -> BookingOutcome {
        let decision = self.gate.check();
        if !decision.allowed {
            tracing::debug!(
                client = %client_id,
                time = %format_hh_mm(decision.sampled),
                window = %self.gate.window(),
                "Booking refused - forbidden window"
            );
            return BookingOutcome::Rejected(RejectReason::TimeForbidden);
        }

        if cancel.is_cancelled() {
            tracing::debug!(client = %client_id, "Booking cancelled before claiming a permit");
            return BookingOutcome::Cancelled;
        }

        let Some(permit) = self.pool.try_acquire() else {
            tracing::debug!(client = %client_id, "Booking refused - sold out");
            return BookingOutcome::Rejected(RejectReason::SoldOut);
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let available = permit.release();
                tracing::warn!(client = %client_id, available, "Booking cancelled during processing - permit released");
                return BookingOutcome::Cancelled;
            }
            _ = tokio::time::sleep(self.processing_delay) => {}
        }

        let serial = self.confirm(client_id, permit);
        tracing::info!(
            client = %client_id,
            %serial,
            remaining = self.pool.available_permits(),
            "Ticket booked"
        );
        BookingOutcome::Success(serial)
    }

    fn confirm(&self, client_id: &str, permit: PermitHeld) -> TicketSerial {
        let _consumed = permit.into_consumed();
        let serial = TicketSerial::new(self.booked.fetch_add(1, Ordering::AcqRel) + 1);
        self.ledger.record(serial, client_id);
        serial
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn available_permits(&self) -> usize {
        self.pool.available_permits()
    }

    pub fn booked_count(&self) -> u64 {
        self.booked.load(Ordering::Acquire)
    }

    pub fn ledger(&self) -> &BookingLedger {
        &self.ledger
    }

    pub fn snapshot(&self) -> ServiceSnapshot {
        ServiceSnapshot {
            capacity: self.capacity(),
            available_permits: self.available_permits(),
            booked_count: self.booked_count(),
        }
    }

    /// Human-readable reason for a rejection.
    pub fn explain(&self, reason: RejectReason) -> String {
        match reason {
            RejectReason::TimeForbidden => format!(
                "We're sorry, but booking is not available from {}.",
                self.gate.window()
            ),
            RejectReason::SoldOut => format!(
                "All {} tickets are currently sold out or being processed.",
                self.capacity()
            ),
        }
    }
}

impl std::fmt::Debug for BookingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingService")
            .field("pool", &self.pool)
            .field("gate", &self.gate)
            .field("booked", &self.booked_count())
            .field("processing_delay", &self.processing_delay)
            .finish()
    }
}
