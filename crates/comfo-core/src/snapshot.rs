// ── Refresh snapshot ──
//
// All data groups fetched during a single refresh cycle. A refresh is
// all-or-nothing: either every group below was fetched in the same
// cycle, or no snapshot is produced. Partial snapshots are
// unrepresentable by construction.

use comfo_api::{BootInfo, Bypass, DeviceErrors, FanProfiles, FanState, Temperatures};

/// Identifies one data group on the unit. Closed set; one RPC per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum DataGroup {
    BootInfo,
    Errors,
    Fans,
    FanProfiles,
    Temperatures,
    Bypass,
}

/// The complete, internally consistent set of latest readings across
/// all data groups, replaced atomically on each successful refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub boot_info: BootInfo,
    pub errors: DeviceErrors,
    pub fans: FanState,
    pub fan_profiles: FanProfiles,
    pub temperatures: Temperatures,
    pub bypass: Bypass,
}

impl Snapshot {
    /// Whether the heat exchanger is currently recovering heat
    /// (bypass closed).
    pub fn heat_recovery_active(&self) -> bool {
        self.bypass.level == 0
    }
}
