//! Venue store implementations
//!
//! [`SqliteVenueStore`] backs the service and the batch tools.
//! [`MemoryVenueStore`] is a test double with failure injection.

mod memory;
mod venue_store;

pub use memory::MemoryVenueStore;
pub use venue_store::SqliteVenueStore;
