//! Ticket pool for bounded admission.
//!
//! The permit system uses typestate to make the release discipline structural:
//! - `PermitHeld` → dropped: returns to the pool (cancellation, failure, panic unwind)
//! - `PermitHeld` → `PermitConsumed` via `into_consumed()` (booking completed, never returned)
//! - `PermitConsumed` → `PermitHeld`: NOT POSSIBLE (no method exists)

mod pool;

pub use pool::{PermitConsumed, PermitHeld, TicketPool};
