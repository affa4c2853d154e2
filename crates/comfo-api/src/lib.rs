// comfo-api: Async client boundary for Zehnder ComfoAir ventilation units.
//
// This crate defines the *seam* between the coordination core and the
// unit's RPC transport: the record types for each data group, the
// `ComfoClient` trait, and the transport error taxonomy. Concrete
// transports (and test fakes) implement `ComfoClient`; everything above
// this crate is transport-agnostic.

pub mod client;
pub mod error;
pub mod types;

pub use client::ComfoClient;
pub use error::{ApiError, ErrorCode};
pub use types::{BootInfo, Bypass, DeviceErrors, FanMode, FanProfiles, FanState, Temperatures};
