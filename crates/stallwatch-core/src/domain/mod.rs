//! Domain model (work ids, queue collections, events, errors, lifecycle state).

pub mod errors;
pub mod events;
pub mod ids;
pub mod queue;
pub mod state;

pub use self::errors::{StoreError, WatchdogError};
pub use self::events::WatchdogEvent;
pub use self::ids::WorkId;
pub use self::queue::{Collection, QueueTriple};
pub use self::state::WatchdogState;
