//! Access control: password gates, privileged override and the restricted trial mode
pub mod control;
pub mod limits;
pub mod lock;
pub mod passcode;

pub use control::AccessControl;
pub use limits::{LimitSet, LimitTable, Tier};
pub use lock::{LockGates, LockLevel, LockState, Restriction, TrialAllotment, TrialBoundary};
pub use passcode::Passcode;

/// Error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Privileged action attempted without a valid, enabled privileged credential
    PermissionDenied,
    /// The operation is not valid in the current lock state
    InvalidState,
    /// A passcode or trial allotment is out of range
    InputOutOfRange,
}

impl Error {
    /// The request was understood but refused by the lock state machine
    pub fn is_refusal(&self) -> bool {
        matches!(self, Error::PermissionDenied | Error::InvalidState)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::PermissionDenied => write!(f, "permission denied"),
            Error::InvalidState => write!(f, "invalid lock state for this operation"),
            Error::InputOutOfRange => write!(f, "input out of range"),
        }
    }
}

/// Which stored credential an input is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Credential {
    /// Ordinary user password
    User,
    /// Privileged override password
    Privileged,
}

/// Result of a password check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AuthResult {
    /// Input matched an enabled credential
    Granted,
    /// Input did not match, or the credential is disabled
    Denied,
}

impl AuthResult {
    /// Returns true if access was granted
    pub fn is_granted(self) -> bool {
        self == AuthResult::Granted
    }
}

/// Outcome of checking the running trial against its boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrialStatus {
    /// Trial is running and neither boundary has been reached
    Ongoing,
    /// The end date has been reached
    ExpiredByTime,
    /// The end odometer reading has been reached
    ExpiredByDistance,
    /// No trial is running
    Inactive,
}

impl TrialStatus {
    /// Returns true if either boundary has been reached
    pub fn is_expired(self) -> bool {
        matches!(self, TrialStatus::ExpiredByTime | TrialStatus::ExpiredByDistance)
    }
}

/// Coarse restriction phase, as reported to the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RestrictionStatus {
    /// No restriction configured
    Unrestricted,
    /// Restriction configured but the countdown has not started
    Configured,
    /// Restriction is counting down, restricted limits apply
    Active,
}
