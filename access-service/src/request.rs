//! Settings menu requests and responses
use controller_services::access::{AuthResult, Credential, LimitSet, Passcode, Tier, TrialAllotment, TrialBoundary};
use controller_services::settings::PrivilegedCredential;
use controller_services::Timestamp;
use heapless::Vec;

/// Most digits the keypad buffers for one entry
pub const MAX_PIN_ENTRY: usize = 16;

/// Digits entered on the dashboard keypad, most significant first
pub type PinEntry = Vec<u8, MAX_PIN_ENTRY>;

/// Request from the settings menu
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    /// Check an entry against the user or privileged passcode
    CheckPassword {
        /// Entered digits
        input: PinEntry,
        /// Credential to check against
        credential: Credential,
    },
    /// Replace the user passcode
    SetPassword(Passcode),
    /// Replace the privileged credential
    SetPrivilegedCredential {
        /// Current privileged passcode entry
        current: PinEntry,
        /// Replacement credential
        credential: PrivilegedCredential,
    },
    /// Toggle the boot password prompt
    SetBootGate(bool),
    /// Toggle the settings menu password prompt
    SetSettingsGate(bool),
    /// Require a password for the security sub-menu
    EnableSecurityGate,
    /// Replace the limits of one tier
    SetLimits(Tier, LimitSet),
    /// Configure a restriction
    ConfigureTrial(TrialAllotment),
    /// Start the configured restriction's countdown
    StartTrial {
        /// Current time
        now: Timestamp,
        /// Current odometer reading
        odometer: f32,
    },
    /// Lift the restriction with the privileged passcode
    ClearRestriction {
        /// Privileged passcode entry
        input: PinEntry,
    },
}

/// Data for a successful response
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseData {
    /// The request was completed
    Complete,
    /// Outcome of a password check
    Auth(AuthResult),
    /// Countdown started with this boundary
    TrialStarted(TrialBoundary),
}

/// Response to the settings menu
pub type Response = Result<ResponseData, controller_services::access::Error>;
