//! Persisted configuration record
//!
//! [`AccessPolicy`] is loaded once at boot and written back on explicit save. Security fields are
//! only reachable through [`crate::access::AccessControl`]; [`VehicleConfig`] is plain
//! configuration mutated by the authenticated settings menu.
use serde::{Deserialize, Serialize};

use crate::access::{LimitTable, LockState, Passcode};

/// Privileged override credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PrivilegedCredential {
    /// Override passcode
    pub passcode: Passcode,
    /// Override enabled
    pub enabled: bool,
}

/// Battery pack configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryConfig {
    /// Low voltage cutoff, volts
    pub low_voltage_cutoff: u16,
    /// Pack capacity, amp-hours
    pub capacity_ah: f32,
    /// Charge current ceiling, amps
    pub max_charge_current: u8,
    /// Charge voltage ceiling, volts
    pub max_charge_voltage: u8,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            low_voltage_cutoff: 42,
            capacity_ah: 20.0,
            max_charge_current: 5,
            max_charge_voltage: 54,
        }
    }
}

/// Cruise control tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CruiseControlConfig {
    /// Allowed deviation from the set speed before the loop reacts
    pub tolerance: u8,
    /// Integral term multiplier
    pub integral_mult: u8,
}

impl Default for CruiseControlConfig {
    fn default() -> Self {
        Self {
            tolerance: 1,
            integral_mult: 10,
        }
    }
}

/// Sensor calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    /// Divisor from wheel pulse rate to speed
    pub speed_div: f32,
    /// Offset written to the real-time clock's aging register, applied by the clock driver
    pub rtc_offset: u8,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            speed_div: 1.0,
            rtc_offset: 0,
        }
    }
}

/// Dashboard display settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayConfig {
    /// Backlight level, 0-255
    pub backlight: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { backlight: 255 }
    }
}

/// Accumulators saved when power is lost
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Accumulators {
    /// Charge drawn from the pack, amp-hours
    pub battery_used_ah: f32,
    /// Energy drawn from the pack, watt-hours
    pub battery_used_wh: f32,
    /// Lifetime distance, miles
    pub odometer: f32,
}

/// Configuration outside the lock state machine, freely editable from the settings menu
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VehicleConfig {
    /// Battery pack configuration
    pub battery: BatteryConfig,
    /// Cruise control tuning
    pub cruise: CruiseControlConfig,
    /// Sensor calibration
    pub calibration: Calibration,
    /// Dashboard display settings
    pub display: DisplayConfig,
    /// Power-loss accumulators
    pub accumulators: Accumulators,
}

/// Persisted configuration root
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AccessPolicy {
    pub(crate) password: Passcode,
    pub(crate) privileged: PrivilegedCredential,
    pub(crate) lock: LockState,
    pub(crate) limits: LimitTable,
    /// Everything else
    pub vehicle: VehicleConfig,
}

impl AccessPolicy {
    /// Ordinary user passcode
    pub fn password(&self) -> &Passcode {
        &self.password
    }

    /// Privileged override credential
    pub fn privileged(&self) -> &PrivilegedCredential {
        &self.privileged
    }

    /// Lock gates and restriction phase
    pub fn lock(&self) -> &LockState {
        &self.lock
    }

    /// Limit table for both tiers
    pub fn limits(&self) -> &LimitTable {
        &self.limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Restriction, Tier};

    #[test]
    fn factory_defaults_are_unlocked() {
        let policy = AccessPolicy::default();
        assert!(!policy.lock().gates.boot);
        assert!(!policy.lock().gates.settings);
        assert!(!policy.lock().gates.security);
        assert_eq!(policy.lock().restriction, Restriction::Unrestricted);
        assert!(!policy.privileged().enabled);
        assert_eq!(policy.password().len(), 4);
        assert!(policy.limits()[Tier::Restricted].max_speed < policy.limits()[Tier::Normal].max_speed);
        assert_eq!(policy.vehicle.accumulators, Accumulators::default());
    }
}
