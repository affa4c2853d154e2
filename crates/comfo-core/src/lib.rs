// comfo-core: Update-coordination engine between comfo-api and consumers.
//
// One coordinator per unit serves every consumer (sensors, climate, fan
// control) from a shared snapshot cache: periodic + on-demand refresh
// scheduling, single-flight debouncing, atomic snapshot replacement,
// and centralized classification of transport failures.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod snapshot;
pub mod stream;

mod debounce;
mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, RefreshOutcome, verify_device};
pub use error::CoreError;
pub use snapshot::{DataGroup, Snapshot};
pub use stream::{Update, UpdateStream};
