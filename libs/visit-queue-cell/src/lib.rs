//! # Visit Queue Cell
//!
//! Moves a patient between service queues and through a visit.
//!
//! ```text
//! +-----------------------------------------------------+
//! |                 Visit Queue Cell                    |
//! +-----------------------------------------------------+
//! |  handlers.rs     |  HTTP endpoint handlers          |
//! |  router.rs       |  Route definitions               |
//! |  models.rs       |  Visits, queue entries, lookups  |
//! |  datetime.rs     |  Remote date-time representation |
//! |  services/       |                                  |
//! |    lookup.rs     |  Statuses, priorities, services  |
//! |    transition.rs |  Queue entry transition engine   |
//! |    lifecycle.rs  |  Visit lifecycle guards          |
//! |    visit.rs      |  Start / end visit calls         |
//! |    cache.rs      |  Active entries invalidation     |
//! +-----------------------------------------------------+
//! ```
//!
//! A transition closes the current queue entry and opens a new one in one
//! remote call. On success the active queue entries are invalidated and
//! refetched; subscribers see a [`services::CacheEvent`] for each step.

pub mod datetime;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::*;
pub use models::*;
pub use router::create_visit_queue_router;
pub use services::*;
