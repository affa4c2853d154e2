use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{BootInfo, Bypass, DeviceErrors, FanMode, FanProfiles, FanState, Temperatures};

/// Async client interface to a ComfoAir unit.
///
/// One method per data group plus the write operations. Each call is a
/// single RPC round-trip and fails independently with an [`ApiError`].
/// Object-safe so the coordinator can hold `Arc<dyn ComfoClient>` and
/// tests can substitute a scripted fake.
#[async_trait]
pub trait ComfoClient: Send + Sync {
    /// Liveness probe; cheap, no payload.
    async fn ping(&self) -> Result<(), ApiError>;

    async fn boot_info(&self) -> Result<BootInfo, ApiError>;

    async fn errors(&self) -> Result<DeviceErrors, ApiError>;

    async fn fans(&self) -> Result<FanState, ApiError>;

    async fn fan_profiles(&self) -> Result<FanProfiles, ApiError>;

    async fn temperatures(&self) -> Result<Temperatures, ApiError>;

    async fn bypass(&self) -> Result<Bypass, ApiError>;

    /// Set the comfort (heat-recovery cut-off) temperature in whole
    /// degrees Celsius. Returns whether the unit actually changed the
    /// stored value.
    async fn set_comfort_temperature(&self, celsius: u8) -> Result<bool, ApiError>;

    /// Switch the active fan profile. Returns whether the profile
    /// changed on the unit.
    async fn set_fan_speed(&self, mode: FanMode) -> Result<bool, ApiError>;

    /// Reconfigure the duty percentage of one profile. Returns whether
    /// the stored percentage changed.
    async fn configure_fan_profile(&self, mode: FanMode, percent: u8) -> Result<bool, ApiError>;
}
