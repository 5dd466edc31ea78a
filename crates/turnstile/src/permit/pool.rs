//! Counting pool implementation with typestate for scoped acquisition.
//!
//! The available count is a single atomic. `try_acquire` and `release` are
//! linearizable compare-and-swap updates bounded to `[0, capacity]`, so at
//! most `available` callers can win and the count can never go negative.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared handle to the pool's counter, carried by every held permit.
struct PoolConnection {
    available: Arc<AtomicUsize>,
    capacity: usize,
}

impl PoolConnection {
    fn release(&self) -> usize {
        let capacity = self.capacity;
        match self
            .available
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < capacity).then_some(n + 1)
            }) {
            Ok(prev) => prev + 1,
            Err(_) => {
                tracing::error!(capacity, "Bug: permit released above pool capacity");
                panic!("ticket pool invariant violated: release above capacity {capacity}");
            }
        }
    }
}

/// A permit claimed from the pool but not yet turned into a booking.
///
/// Dropping it returns the permit to the pool, on every exit path.
#[must_use = "dropping a held permit immediately returns it to the pool"]
pub struct PermitHeld {
    pool: Option<PoolConnection>,
}

impl PermitHeld {
    /// Booking completed: the permit is consumed and never returns to the pool.
    pub fn into_consumed(mut self) -> PermitConsumed {
        self.pool = None;
        PermitConsumed { _private: () }
    }

    /// Give the permit back explicitly. Returns the available count after release.
    pub fn release(mut self) -> usize {
        match self.pool.take() {
            Some(pool) => pool.release(),
            None => 0,
        }
    }
}

impl Drop for PermitHeld {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            let available = pool.release();
            tracing::debug!(available, "Held permit dropped - returned to pool");
        }
    }
}

impl std::fmt::Debug for PermitHeld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermitHeld")
            .field("held", &self.pool.is_some())
            .finish()
    }
}

/// Proof that a permit was permanently consumed by a completed booking.
#[derive(Debug)]
pub struct PermitConsumed {
    _private: (),
}

/// Bounded pool of interchangeable ticket permits.
///
/// Capacity is fixed at construction. `try_acquire` never blocks and grants no
/// FIFO ordering: a later caller may win a permit freed after an earlier
/// caller was refused.
pub struct TicketPool {
    capacity: usize,
    available: Arc<AtomicUsize>,
}

impl TicketPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            available: Arc::new(AtomicUsize::new(capacity)),
        }
    }

    /// Claim one permit if any is available, without waiting.
    ///
    /// When `available == 1` and many callers race, exactly one gets `Some`.
    pub fn try_acquire(&self) -> Option<PermitHeld> {
        self.available
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .ok()?;

        Some(PermitHeld {
            pool: Some(PoolConnection {
                available: Arc::clone(&self.available),
                capacity: self.capacity,
            }),
        })
    }

    /// Return one permit to the pool.
    ///
    /// Only valid as the undo of a successful acquire whose permit was
    /// forgotten. Held permits release themselves; prefer dropping them.
    ///
    /// # Panics
    ///
    /// Releasing while the pool is already full is a bookkeeping bug and panics.
    pub fn release(&self) -> usize {
        PoolConnection {
            available: Arc::clone(&self.available),
            capacity: self.capacity,
        }
        .release()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the available count. Stale as soon as it returns under contention.
    pub fn available_permits(&self) -> usize {
        self.available.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for TicketPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketPool")
            .field("capacity", &self.capacity)
            .field("available", &self.available_permits())
            .finish()
    }
}
