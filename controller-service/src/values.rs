//! Live operating state shared with the control loop
use crate::datetime::Timestamp;

/// Number of motor/ESC channels driven by the controller
pub const MOTOR_COUNT: usize = 2;

/// A pair of readings, one per motor channel
pub type PerMotor<T> = [T; MOTOR_COUNT];

/// Continuously updated snapshot owned by the control loop
///
/// Created zeroed at boot and never persisted as a whole. The power-loss accumulators live in
/// [`crate::settings::Accumulators`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OperatingState {
    /// Time of the last refresh, if the clock has been read
    pub timestamp: Option<Timestamp>,
    /// Pack voltage in volts
    pub volts: f32,
    /// Measured current per channel in amps
    pub amps: PerMotor<f32>,
    /// Commanded current per channel in amps
    pub set_amps: PerMotor<f32>,
    /// Ground speed
    pub speed: f32,
    /// Rounded values shown on the dashboard
    pub display: DisplayReadings,
    /// ESC temperature per channel, degrees C
    pub esc_temp: PerMotor<f32>,
    /// Motor temperature per channel, degrees C
    pub motor_temp: PerMotor<f32>,
    /// Normalized throttle input
    pub throttle_in: f32,
    /// Regen mode selector, interpreted by the control loop
    pub regen_mode: u8,
    /// Regen level set point
    pub set_regen: f32,
    /// Charging from the MPPT solar input
    pub mppt_charge: bool,
    /// Brake lever asserted
    pub brake: bool,
    /// Distance covered since the trip was reset
    pub tripometer: f32,
    /// Running energy efficiency
    pub watt_hours_per_mile: f32,
    /// Cruise control target, `None` when cruise is off
    pub cruise: Option<CruiseState>,
    /// Regen reported a fault
    pub regen_error: bool,
    /// Headlight switched on
    pub headlight: bool,
    /// Time spent in the last control tick, in milliseconds
    pub busy_millis: u32,
}

/// Dashboard values, rounded to one decimal
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayReadings {
    pub volts: f32,
    pub amps: PerMotor<f32>,
    pub speed: f32,
}

/// Cruise control loop state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CruiseState {
    /// Target speed
    pub set_speed: f32,
    /// Integral accumulator
    pub integral: f32,
}

fn round_tenths(value: f32) -> f32 {
    // no_std has no f32::round, go through an integer
    let scaled = value * 10.0;
    let rounded = if scaled >= 0.0 {
        (scaled + 0.5) as i32
    } else {
        (scaled - 0.5) as i32
    };
    rounded as f32 / 10.0
}

impl OperatingState {
    /// Copy the measured values into their display counterparts
    pub fn refresh_display(&mut self) {
        self.display = DisplayReadings {
            volts: round_tenths(self.volts),
            amps: self.amps.map(round_tenths),
            speed: round_tenths(self.speed),
        };
    }

    /// Returns true if cruise control currently drives the motor command
    ///
    /// Brake always wins over cruise.
    pub fn cruise_engaged(&self) -> bool {
        self.cruise.is_some() && !self.brake
    }
}
