//! Lock state: password gates and the restricted trial phase
//!
//! The legacy settings block packs all of this into a five bit `lockLevel` byte, see
//! [`LockLevel`]. Here the restriction phase is an enum so that a running countdown without a
//! configured restriction cannot be expressed.
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::{Error, RestrictionStatus};
use crate::datetime::Timestamp;

/// Legacy `lockLevel` bitmask
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LockLevel(pub u8);

bitflags! {
    impl LockLevel: u8 {
        /// Password required at boot
        const BOOT = 1 << 0;
        /// Password required to enter the settings menu
        const SETTINGS = 1 << 1;
        /// Password required to enter the settings security sub-menu
        const SECURITY = 1 << 2;
        /// Restricted mode configured
        const RESTRICTION_SET = 1 << 3;
        /// Restricted mode counting down
        const RESTRICTION_RUNNING = 1 << 4;
    }
}

/// Independent password prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LockGates {
    /// Password required at boot
    pub boot: bool,
    /// Password required to enter the settings menu
    pub settings: bool,
    /// Password required to enter the security sub-menu
    pub security: bool,
}

/// Initial trial allowance, set when the trial is configured
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(try_from = "RawAllotment")]
pub struct TrialAllotment {
    minutes: u32,
    miles10: f32,
}

#[derive(Deserialize)]
struct RawAllotment {
    minutes: u32,
    miles10: f32,
}

impl TryFrom<RawAllotment> for TrialAllotment {
    type Error = Error;

    fn try_from(raw: RawAllotment) -> Result<Self, Self::Error> {
        TrialAllotment::new(raw.minutes, raw.miles10)
    }
}

impl TrialAllotment {
    /// Create an allotment of `minutes` and `miles10` tenths of a mile
    ///
    /// Both must be positive, a zero allotment would expire the moment the trial starts.
    pub fn new(minutes: u32, miles10: f32) -> Result<Self, Error> {
        if minutes == 0 || !miles10.is_finite() || miles10 <= 0.0 {
            return Err(Error::InputOutOfRange);
        }

        Ok(Self { minutes, miles10 })
    }

    /// Minutes allowed from the start of the trial
    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// Distance allowed from the start of the trial, in tenths of a mile
    pub fn miles10(&self) -> f32 {
        self.miles10
    }

    /// Distance allowed from the start of the trial, in miles
    pub fn miles(&self) -> f32 {
        self.miles10 / 10.0
    }
}

/// End of a running trial, fixed when the trial starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrialBoundary {
    /// Trial is over once the clock reaches this
    pub end_date: Timestamp,
    /// Trial is over once the odometer reaches this
    pub end_miles: f32,
}

/// Restricted mode phase
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Restriction {
    /// No restriction
    #[default]
    Unrestricted,
    /// Restriction configured, countdown not started
    Configured(TrialAllotment),
    /// Countdown running
    Active {
        /// Allowance the trial was started with
        allotment: TrialAllotment,
        /// Fixed end of the trial
        boundary: TrialBoundary,
    },
}

impl Restriction {
    /// Coarse phase
    pub fn status(&self) -> RestrictionStatus {
        match self {
            Restriction::Unrestricted => RestrictionStatus::Unrestricted,
            Restriction::Configured(_) => RestrictionStatus::Configured,
            Restriction::Active { .. } => RestrictionStatus::Active,
        }
    }

    /// Allotment, if a restriction is configured or running
    pub fn allotment(&self) -> Option<TrialAllotment> {
        match self {
            Restriction::Unrestricted => None,
            Restriction::Configured(allotment) | Restriction::Active { allotment, .. } => Some(*allotment),
        }
    }

    /// Boundary, if the countdown is running
    pub fn boundary(&self) -> Option<TrialBoundary> {
        match self {
            Restriction::Active { boundary, .. } => Some(*boundary),
            _ => None,
        }
    }
}

/// Complete lock state persisted with the settings record
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LockState {
    /// Password prompts
    pub gates: LockGates,
    /// Restricted mode phase
    pub restriction: Restriction,
}

impl LockState {
    /// Legacy bitmask view of this state
    pub fn lock_level(&self) -> LockLevel {
        let mut level = LockLevel::empty();
        level.set(LockLevel::BOOT, self.gates.boot);
        level.set(LockLevel::SETTINGS, self.gates.settings);
        level.set(LockLevel::SECURITY, self.gates.security);
        match self.restriction {
            Restriction::Unrestricted => {}
            Restriction::Configured(_) => level.insert(LockLevel::RESTRICTION_SET),
            Restriction::Active { .. } => level.insert(LockLevel::RESTRICTION_SET | LockLevel::RESTRICTION_RUNNING),
        }
        level
    }

    /// Rebuild the typed state from a legacy bitmask and the trial fields stored next to it
    ///
    /// Bits above bit 4 are ignored. A running bit without the configured bit is rejected, as is a
    /// restriction bit without the trial data it needs.
    pub fn from_lock_level(
        level: LockLevel,
        allotment: Option<TrialAllotment>,
        boundary: Option<TrialBoundary>,
    ) -> Result<Self, Error> {
        let level = LockLevel::from_bits_truncate(level.bits());
        let gates = LockGates {
            boot: level.contains(LockLevel::BOOT),
            settings: level.contains(LockLevel::SETTINGS),
            security: level.contains(LockLevel::SECURITY),
        };

        let set = level.contains(LockLevel::RESTRICTION_SET);
        let running = level.contains(LockLevel::RESTRICTION_RUNNING);
        let restriction = match (set, running) {
            (false, false) => Restriction::Unrestricted,
            (false, true) => return Err(Error::InvalidState),
            (true, false) => Restriction::Configured(allotment.ok_or(Error::InvalidState)?),
            (true, true) => Restriction::Active {
                allotment: allotment.ok_or(Error::InvalidState)?,
                boundary: boundary.ok_or(Error::InvalidState)?,
            },
        };

        Ok(Self { gates, restriction })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary() -> TrialBoundary {
        TrialBoundary {
            end_date: Timestamp::new(2024, 5, 1, 13, 0, 0).unwrap(),
            end_miles: 105.0,
        }
    }

    #[test]
    fn allotment_validation() {
        assert_eq!(TrialAllotment::new(0, 0.0), Err(Error::InputOutOfRange));
        assert_eq!(TrialAllotment::new(60, -1.0), Err(Error::InputOutOfRange));
        assert_eq!(TrialAllotment::new(60, f32::NAN), Err(Error::InputOutOfRange));
        assert_eq!(TrialAllotment::new(60, f32::INFINITY), Err(Error::InputOutOfRange));
        assert_eq!(TrialAllotment::new(0, 50.0), Err(Error::InputOutOfRange));
        assert_eq!(TrialAllotment::new(60, 0.0), Err(Error::InputOutOfRange));
        assert!(TrialAllotment::new(1, 0.5).is_ok());
        assert_eq!(TrialAllotment::new(60, 50.0).unwrap().miles(), 5.0);
    }

    #[test]
    fn lock_level_bits() {
        let allotment = TrialAllotment::new(60, 50.0).unwrap();
        let state = LockState {
            gates: LockGates {
                boot: true,
                settings: false,
                security: true,
            },
            restriction: Restriction::Active {
                allotment,
                boundary: boundary(),
            },
        };
        assert_eq!(state.lock_level().bits(), 0b1_1101);

        let configured = LockState {
            gates: LockGates::default(),
            restriction: Restriction::Configured(allotment),
        };
        assert_eq!(configured.lock_level().bits(), 0b0_1000);
        assert_eq!(LockState::default().lock_level().bits(), 0);
    }

    #[test]
    fn from_lock_level_round_trip() {
        let allotment = TrialAllotment::new(60, 50.0).unwrap();
        let state = LockState::from_lock_level(LockLevel(0b1_1011), Some(allotment), Some(boundary())).unwrap();
        assert!(state.gates.boot);
        assert!(state.gates.settings);
        assert!(!state.gates.security);
        assert_eq!(state.restriction.status(), RestrictionStatus::Active);
        assert_eq!(state.lock_level(), LockLevel(0b1_1011));
    }

    #[test]
    fn running_without_configured_rejected() {
        assert_eq!(
            LockState::from_lock_level(LockLevel(0b1_0000), None, Some(boundary())),
            Err(Error::InvalidState)
        );
        assert_eq!(
            LockState::from_lock_level(LockLevel(0b0_1000), None, None),
            Err(Error::InvalidState)
        );
    }

    #[test]
    fn upper_bits_ignored() {
        let state = LockState::from_lock_level(LockLevel(0b1110_0001), None, None).unwrap();
        assert_eq!(state.lock_level(), LockLevel::BOOT);
    }
}
