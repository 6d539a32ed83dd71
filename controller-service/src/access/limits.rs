//! Speed, power, current and temperature ceilings, one set per tier
use core::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::values::{PerMotor, MOTOR_COUNT};

/// Limit tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tier {
    /// Ordinary limits
    Normal,
    /// Tighter limits applied while a restriction is counting down
    Restricted,
}

/// Ceilings handed to the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LimitSet {
    /// Top speed
    pub max_speed: u16,
    /// Power ceiling per channel at stall, in watts
    pub stall_watts: PerMotor<u16>,
    /// Power ceiling per channel in boost, in watts
    pub boost_watts: PerMotor<u16>,
    /// Current ceiling per channel, in amps
    pub max_amps: PerMotor<u16>,
    /// ESC temperature ceiling per channel, degrees C
    pub max_esc_temp: PerMotor<u8>,
    /// Motor temperature ceiling per channel, degrees C
    pub max_motor_temp: PerMotor<u8>,
}

impl LimitSet {
    /// Limit set with the same ceiling on every channel and a single power ceiling for stall and boost
    pub const fn uniform(max_speed: u16, max_watts: u16, max_amps: u16, max_esc_temp: u8, max_motor_temp: u8) -> Self {
        Self {
            max_speed,
            stall_watts: [max_watts; MOTOR_COUNT],
            boost_watts: [max_watts; MOTOR_COUNT],
            max_amps: [max_amps; MOTOR_COUNT],
            max_esc_temp: [max_esc_temp; MOTOR_COUNT],
            max_motor_temp: [max_motor_temp; MOTOR_COUNT],
        }
    }
}

/// One limit set per tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LimitTable {
    normal: LimitSet,
    restricted: LimitSet,
}

impl LimitTable {
    /// Create a table from the two tiers
    pub const fn new(normal: LimitSet, restricted: LimitSet) -> Self {
        Self { normal, restricted }
    }
}

impl Default for LimitTable {
    fn default() -> Self {
        Self {
            normal: LimitSet {
                max_speed: 25,
                stall_watts: [1000; MOTOR_COUNT],
                boost_watts: [1500; MOTOR_COUNT],
                max_amps: [30; MOTOR_COUNT],
                max_esc_temp: [80; MOTOR_COUNT],
                max_motor_temp: [100; MOTOR_COUNT],
            },
            restricted: LimitSet::uniform(10, 500, 15, 70, 90),
        }
    }
}

impl Index<Tier> for LimitTable {
    type Output = LimitSet;

    fn index(&self, tier: Tier) -> &LimitSet {
        match tier {
            Tier::Normal => &self.normal,
            Tier::Restricted => &self.restricted,
        }
    }
}

impl IndexMut<Tier> for LimitTable {
    fn index_mut(&mut self, tier: Tier) -> &mut LimitSet {
        match tier {
            Tier::Normal => &mut self.normal,
            Tier::Restricted => &mut self.restricted,
        }
    }
}
