//! Access control state machine
//!
//! Restriction phases, with the security gate shown alongside:
//!
//! ```text
//! Unrestricted --configure_trial--> Configured --start_trial--> Active
//! Active --advance_trial detects expiry--> Active (no automatic clear)
//! Configured | Active --clear_restriction (privileged)--> Unrestricted, security gate cleared
//! ```
//!
//! Boot and settings gates are independent of the restriction phase. Every operation that fails
//! leaves the policy untouched.
use super::limits::{LimitSet, Tier};
use super::lock::{LockLevel, Restriction, TrialAllotment, TrialBoundary};
use super::passcode::Passcode;
use super::{AuthResult, Credential, Error, RestrictionStatus, TrialStatus};
use crate::datetime::Timestamp;
use crate::settings::{AccessPolicy, PrivilegedCredential, VehicleConfig};
use crate::{info, trace, warn};

/// Owner of the access policy, answering permission questions and running the trial lifecycle
#[derive(Debug, Clone, PartialEq)]
pub struct AccessControl {
    policy: AccessPolicy,
}

impl AccessControl {
    /// Take ownership of a loaded policy
    pub fn new(policy: AccessPolicy) -> Self {
        Self { policy }
    }

    /// Read-only view of the whole policy
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Mutable access to the configuration outside the lock state machine
    ///
    /// Passwords, lock state and limits go through the dedicated methods instead.
    pub fn vehicle_mut(&mut self) -> &mut VehicleConfig {
        &mut self.policy.vehicle
    }

    /// Give the policy back, e.g. for saving
    pub fn into_policy(self) -> AccessPolicy {
        self.policy
    }

    /// Password required at boot
    pub fn requires_password_at_boot(&self) -> bool {
        self.policy.lock.gates.boot
    }

    /// Password required to enter the settings menu
    pub fn requires_password_for_settings(&self) -> bool {
        self.policy.lock.gates.settings
    }

    /// Password required to enter the security sub-menu
    pub fn requires_password_for_security_menu(&self) -> bool {
        self.policy.lock.gates.security
    }

    /// Check entered digits against the user or privileged passcode
    ///
    /// The privileged path is always denied while the privileged credential is disabled.
    pub fn check_password(&self, input: &[u8], credential: Credential) -> Result<AuthResult, Error> {
        let passcode = match credential {
            Credential::User => &self.policy.password,
            Credential::Privileged => {
                if !self.policy.privileged.enabled {
                    warn!("Privileged password checked while disabled");
                    return Ok(AuthResult::Denied);
                }
                &self.policy.privileged.passcode
            }
        };

        if passcode.matches(input)? {
            Ok(AuthResult::Granted)
        } else {
            warn!("Password denied for {:?}", credential);
            Ok(AuthResult::Denied)
        }
    }

    /// Replace the user passcode
    pub fn set_password(&mut self, passcode: Passcode) {
        info!("User password changed, {} digits", passcode.len());
        self.policy.password = passcode;
    }

    /// Replace the privileged credential
    ///
    /// While the privileged credential is enabled the current privileged passcode is required.
    /// While it is disabled it can only be set up when no restriction is configured, so that it
    /// cannot be used to lift a restriction it did not guard. It cannot be disabled while a
    /// restriction is in place, since [`Self::clear_restriction`] would then have no credential.
    pub fn set_privileged_credential(&mut self, current: &[u8], credential: PrivilegedCredential) -> Result<(), Error> {
        let restricted = self.policy.lock.restriction != Restriction::Unrestricted;
        if self.policy.privileged.enabled {
            if !self.check_password(current, Credential::Privileged)?.is_granted() {
                return Err(Error::PermissionDenied);
            }

            if restricted && !credential.enabled {
                warn!("Privileged credential cannot be disabled while restricted");
                return Err(Error::InvalidState);
            }
        } else if restricted {
            warn!("Privileged credential setup refused while restricted");
            return Err(Error::InvalidState);
        }

        info!("Privileged credential updated, enabled: {}", credential.enabled);
        self.policy.privileged = credential;
        Ok(())
    }

    /// Toggle the boot password prompt
    pub fn set_boot_gate(&mut self, enabled: bool) {
        info!("Boot password gate: {}", enabled);
        self.policy.lock.gates.boot = enabled;
    }

    /// Toggle the settings menu password prompt
    pub fn set_settings_gate(&mut self, enabled: bool) {
        info!("Settings password gate: {}", enabled);
        self.policy.lock.gates.settings = enabled;
    }

    /// Require a password for the security sub-menu
    ///
    /// Only [`Self::clear_restriction`] lifts it again.
    pub fn enable_security_gate(&mut self) {
        info!("Security password gate enabled");
        self.policy.lock.gates.security = true;
    }

    /// Replace the limits of one tier
    ///
    /// The restricted tier is frozen while a restriction is configured or running.
    pub fn set_limits(&mut self, tier: Tier, limits: LimitSet) -> Result<(), Error> {
        if tier == Tier::Restricted && self.policy.lock.restriction != Restriction::Unrestricted {
            warn!("Restricted limits are frozen while a restriction is in place");
            return Err(Error::InvalidState);
        }

        self.policy.limits[tier] = limits;
        Ok(())
    }

    /// Configure a restriction without starting its countdown
    ///
    /// Reconfiguring a restriction that has not started replaces its allotment.
    pub fn configure_trial(&mut self, allotment: TrialAllotment) -> Result<(), Error> {
        if matches!(self.policy.lock.restriction, Restriction::Active { .. }) {
            warn!("Trial reconfiguration refused while running");
            return Err(Error::InvalidState);
        }

        info!(
            "Trial configured: {} minutes, {} tenths of a mile",
            allotment.minutes(),
            allotment.miles10()
        );
        self.policy.lock.restriction = Restriction::Configured(allotment);
        Ok(())
    }

    /// Start the countdown of a configured restriction
    ///
    /// The end date and end odometer reading are fixed here and never move afterwards.
    pub fn start_trial(&mut self, now: Timestamp, odometer: f32) -> Result<TrialBoundary, Error> {
        let allotment = match self.policy.lock.restriction {
            Restriction::Configured(allotment) => allotment,
            Restriction::Unrestricted => {
                warn!("Trial start refused, no restriction configured");
                return Err(Error::InvalidState);
            }
            Restriction::Active { .. } => {
                warn!("Trial start refused, already running");
                return Err(Error::InvalidState);
            }
        };

        if !odometer.is_finite() || odometer < 0.0 {
            return Err(Error::InputOutOfRange);
        }

        let end_date = now
            .checked_add_minutes(allotment.minutes())
            .map_err(|_| Error::InputOutOfRange)?;
        let boundary = TrialBoundary {
            end_date,
            end_miles: odometer + allotment.miles(),
        };

        info!("Trial started, ends at odometer {}", boundary.end_miles);
        self.policy.lock.restriction = Restriction::Active { allotment, boundary };
        Ok(boundary)
    }

    /// Compare the clock and odometer against the running trial's boundaries
    ///
    /// Expiry is reported but never clears the restriction. When both boundaries have been
    /// reached, time is reported. A non-finite odometer reading counts as the distance reached.
    pub fn advance_trial(&self, now: Timestamp, odometer: f32) -> TrialStatus {
        let status = match self.policy.lock.restriction {
            Restriction::Active { boundary, .. } => {
                if now.is_at_or_past(&boundary.end_date) {
                    TrialStatus::ExpiredByTime
                } else if !odometer.is_finite() || odometer >= boundary.end_miles {
                    TrialStatus::ExpiredByDistance
                } else {
                    TrialStatus::Ongoing
                }
            }
            _ => TrialStatus::Inactive,
        };

        trace!("Trial status: {:?}", status);
        status
    }

    /// Tier currently applied
    pub fn tier(&self) -> Tier {
        match self.policy.lock.restriction {
            Restriction::Active { .. } => Tier::Restricted,
            _ => Tier::Normal,
        }
    }

    /// Limits the control loop must apply right now, always taken whole from a single tier
    pub fn effective_limits(&self) -> LimitSet {
        self.policy.limits[self.tier()]
    }

    /// Lift the restriction and the security gate
    ///
    /// Requires the privileged passcode; fails with [`Error::PermissionDenied`] otherwise.
    pub fn clear_restriction(&mut self, privileged_input: &[u8]) -> Result<(), Error> {
        if !self
            .check_password(privileged_input, Credential::Privileged)?
            .is_granted()
        {
            warn!("Restriction clear denied");
            return Err(Error::PermissionDenied);
        }

        info!("Restriction cleared");
        self.policy.lock.gates.security = false;
        self.policy.lock.restriction = Restriction::Unrestricted;
        Ok(())
    }

    /// Coarse restriction phase
    pub fn restriction_status(&self) -> RestrictionStatus {
        self.policy.lock.restriction.status()
    }

    /// Legacy bitmask view of the lock state
    pub fn lock_level(&self) -> LockLevel {
        self.policy.lock.lock_level()
    }
}

impl From<AccessPolicy> for AccessControl {
    fn from(policy: AccessPolicy) -> Self {
        Self::new(policy)
    }
}
