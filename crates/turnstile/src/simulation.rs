//! Simulation driver: many concurrent clients against one booking service.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::client::{ArrivalDelay, ClientReport, ClientTask};
use crate::config::{ConfigError, SimulationConfig};
use crate::outcome::{BookingOutcome, RejectReason};
use crate::service::BookingService;

/// Aggregate counts once every client has finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimulationSummary {
    pub clients: usize,
    pub succeeded: usize,
    pub rejected_time: usize,
    pub sold_out: usize,
    pub cancelled: usize,
    pub booked_count: u64,
    pub available_permits: usize,
    pub capacity: usize,
}

impl SimulationSummary {
    fn record(&mut self, outcome: &BookingOutcome) {
        self.clients += 1;
        match outcome {
            BookingOutcome::Success(_) => self.succeeded += 1,
            BookingOutcome::Rejected(RejectReason::TimeForbidden) => self.rejected_time += 1,
            BookingOutcome::Rejected(RejectReason::SoldOut) => self.sold_out += 1,
            BookingOutcome::Cancelled => self.cancelled += 1,
        }
    }

    /// Pool and counters agree with the outcomes the clients observed.
    pub fn is_consistent(&self) -> bool {
        let booked = usize::try_from(self.booked_count).unwrap_or(usize::MAX);
        booked == self.succeeded
            && self.succeeded <= self.capacity
            && self.available_permits + booked == self.capacity
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub summary: SimulationSummary,
    /// Client reports in completion order.
    pub clients: Vec<ClientReport>,
}

pub struct Simulation {
    service: Arc<BookingService>,
    clients: usize,
    arrival: ArrivalDelay,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let service =
            BookingService::new(config.capacity, config.window, config.clock.into_clock())
                .with_processing_delay(config.processing_delay);
        Ok(Self::with_service(
            Arc::new(service),
            config.clients,
            config.arrival,
        ))
    }

    /// Drive clients against an already-built service (e.g. one with an injected clock).
    pub fn with_service(
        service: Arc<BookingService>,
        clients: usize,
        arrival: ArrivalDelay,
    ) -> Self {
        Self {
            service,
            clients,
            arrival,
        }
    }

    pub fn service(&self) -> &Arc<BookingService> {
        &self.service
    }

    /// Spawn every client, wait for all of them, and aggregate.
    ///
    /// Cancelling `cancel` aborts waiting and in-flight clients; the call still
    /// returns only after every client has reached a terminal state.
    pub async fn run(&self, cancel: CancellationToken) -> SimulationReport {
        let mut tasks = JoinSet::new();
        for i in 0..self.clients {
            let task = ClientTask::new(format!("Client-{}", i + 1), self.arrival);
            tracing::debug!(client = %task.name(), state = task.state().as_str(), "Created client");
            tasks.spawn(task.run(Arc::clone(&self.service), cancel.child_token()));
        }

        tracing::info!(
            clients = self.clients,
            capacity = self.service.capacity(),
            "Starting booking simulation"
        );

        let mut summary = SimulationSummary::default();
        let mut reports = Vec::with_capacity(self.clients);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => {
                    summary.record(&report.outcome);
                    reports.push(report);
                }
                Err(e) => {
                    // The task's future was dropped, which releases any held permit.
                    tracing::error!(error = %e, "Client task did not complete");
                    summary.record(&BookingOutcome::Cancelled);
                }
            }
        }

        let snapshot = self.service.snapshot();
        summary.booked_count = snapshot.booked_count;
        summary.available_permits = snapshot.available_permits;
        summary.capacity = snapshot.capacity;

        tracing::info!(
            booked = summary.booked_count,
            capacity = summary.capacity,
            "Simulation completed"
        );
        if !summary.is_consistent() {
            tracing::error!(?summary, "Bug: pool state disagrees with client outcomes");
        }

        SimulationReport {
            summary,
            clients: reports,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::gate::ForbiddenWindow;
    use std::time::Duration;

    fn open_simulation(capacity: usize, clients: usize) -> Simulation {
        let service = BookingService::new(
            capacity,
            ForbiddenWindow::default(),
            Arc::new(FixedClock::at(12, 0).unwrap()),
        );
        Simulation::with_service(
            Arc::new(service),
            clients,
            ArrivalDelay::new(Duration::from_millis(100), Duration::from_millis(600)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn every_client_is_accounted_for() {
        let report = open_simulation(10, 15).run(CancellationToken::new()).await;
        let s = report.summary;

        assert_eq!(s.clients, 15);
        assert_eq!(report.clients.len(), 15);
        assert_eq!(s.succeeded, 10);
        assert_eq!(s.sold_out, 5);
        assert_eq!(s.rejected_time + s.cancelled, 0);
        assert!(s.is_consistent());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_run_leaks_no_permits() {
        let sim = open_simulation(4, 12);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = sim.run(cancel).await;

        assert_eq!(report.summary.cancelled, 12);
        assert_eq!(report.summary.available_permits, 4);
        assert!(report.summary.is_consistent());
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = SimulationConfig {
            capacity: 0,
            ..SimulationConfig::default()
        };
        assert!(matches!(Simulation::new(config), Err(ConfigError::ZeroCapacity)));
    }

    #[test]
    fn summary_serializes() {
        let summary = SimulationSummary {
            clients: 15,
            succeeded: 10,
            rejected_time: 0,
            sold_out: 5,
            cancelled: 0,
            booked_count: 10,
            available_permits: 0,
            capacity: 10,
        };
        assert!(summary.is_consistent());
        insta::assert_json_snapshot!(summary, @r#"
        {
          "clients": 15,
          "succeeded": 10,
          "rejected_time": 0,
          "sold_out": 5,
          "cancelled": 0,
          "booked_count": 10,
          "available_permits": 0,
          "capacity": 10
        }
        "#);
    }
}
