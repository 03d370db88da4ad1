//! Ghostwriter Relay crate - correlation queue, coordinator, WebSocket surface.
//!
//! Bridges the messaging client (producer) and the reviewing surface
//! (reviewer): inbound messages are queued and drafted, candidates go to the
//! reviewer, and the chosen reply goes back to the producer and into the
//! Q/A archive.

pub mod archive;
pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod queue;
pub mod routes;
pub mod socket;
pub mod state;

pub use archive::QaArchive;
pub use coordinator::{RelayCoordinator, RelayHandle, RelaySettings, ReplyDrafter, GENERIC_FAILURE};
pub use error::{ApiError, RelayError};
pub use queue::{CorrelationEntry, CorrelationQueue, EntryId};
pub use routes::{create_router, start_server};
pub use state::AppState;
