//! In-memory record of confirmed bookings (serial → client).

use dashmap::DashMap;

use crate::outcome::TicketSerial;

/// Who holds which ticket. Lock-free concurrent inserts via DashMap.
#[derive(Debug, Default)]
pub struct BookingLedger {
    holders: DashMap<TicketSerial, String>,
}

impl BookingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a confirmed booking. Serials are unique, so a duplicate is a bug.
    pub fn record(&self, serial: TicketSerial, client_id: &str) {
        if let Some(previous) = self.holders.insert(serial, client_id.to_string()) {
            debug_assert!(false, "serial {serial} issued twice");
            tracing::error!(%serial, previous = %previous, client = %client_id, "Bug: ticket serial issued twice");
        }
    }

    pub fn holder(&self, serial: TicketSerial) -> Option<String> {
        self.holders.get(&serial).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    /// All bookings ordered by serial.
    pub fn bookings(&self) -> Vec<(TicketSerial, String)> {
        let mut bookings: Vec<_> = self
            .holders
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        bookings.sort_by_key(|(serial, _)| *serial);
        bookings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_looks_up_holders() {
        let ledger = BookingLedger::new();
        assert!(ledger.is_empty());

        ledger.record(TicketSerial::new(2), "Client-2");
        ledger.record(TicketSerial::new(1), "Client-9");

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.holder(TicketSerial::new(1)).as_deref(), Some("Client-9"));
        assert!(ledger.holder(TicketSerial::new(3)).is_none());
    }

    #[test]
    fn bookings_are_sorted_by_serial() {
        let ledger = BookingLedger::new();
        ledger.record(TicketSerial::new(3), "c");
        ledger.record(TicketSerial::new(1), "a");
        ledger.record(TicketSerial::new(2), "b");

        let serials: Vec<u64> = ledger.bookings().iter().map(|(s, _)| s.get()).collect();
        assert_eq!(serials, vec![1, 2, 3]);
    }
}
