// ── Data-group records ──
//
// One record per data group the unit exposes. Field sets follow the
// unit's RPC schema; a full refresh fetches all six groups together.

use serde::{Deserialize, Serialize};

/// Fan profile selector. The unit runs one of four fixed profiles;
/// "off" on control surfaces maps to `Away` (ventilation never fully
/// stops on these units).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FanMode {
    Away,
    Low,
    Medium,
    High,
}

/// Static identity of the unit, read once per refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootInfo {
    pub device_name: String,
    pub serial_number: String,
    pub firmware_major: u8,
    pub firmware_minor: u8,
}

/// Error/maintenance flags reported by the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceErrors {
    /// The supply/exhaust filters are due for replacement.
    pub filter: bool,
}

/// Live fan telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanState {
    /// Supply fan duty cycle, percent.
    pub supply_duty: u8,
    /// Exhaust fan duty cycle, percent.
    pub exhaust_duty: u8,
    /// Supply fan speed, rpm.
    pub supply_rpm: u16,
    /// Exhaust fan speed, rpm.
    pub exhaust_rpm: u16,
}

/// Configured duty percentages per profile, plus the active profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanProfiles {
    pub current_mode: FanMode,
    pub away: u8,
    pub low: u8,
    pub medium: u8,
    pub high: u8,
}

/// Temperature probes, degrees Celsius.
///
/// `geo_heat`, `reheating` and `kitchen_hood` are accessory probes that
/// only report when the matching hardware is installed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperatures {
    /// Configured comfort (heat-recovery cut-off) temperature.
    pub comfort: f32,
    pub inside_air: f32,
    pub outside_air: f32,
    pub supply_air: f32,
    pub exhaust_air: f32,
    pub geo_heat: Option<f32>,
    pub reheating: Option<f32>,
    pub kitchen_hood: Option<f32>,
}

/// Heat-exchanger bypass state. `level == 0` means the bypass is closed
/// and the exchanger recovers heat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bypass {
    /// Bypass valve opening, percent.
    pub level: u8,
    pub factor: u8,
    pub correction: u8,
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn fan_mode_serializes_snake_case_for_every_mode() {
        // serde and Display must agree on the wire name of each mode.
        for mode in FanMode::iter() {
            assert_eq!(
                serde_json::to_string(&mode).expect("serialize"),
                format!("\"{mode}\"")
            );
        }
        assert_eq!(FanMode::High.to_string(), "high");
    }

    #[test]
    fn temperatures_roundtrip_with_missing_probes() {
        let temps = Temperatures {
            comfort: 21.0,
            inside_air: 22.5,
            outside_air: 4.0,
            supply_air: 19.5,
            exhaust_air: 21.5,
            geo_heat: None,
            reheating: None,
            kitchen_hood: Some(24.0),
        };
        let json = serde_json::to_string(&temps).expect("serialize");
        let back: Temperatures = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, temps);
    }
}
