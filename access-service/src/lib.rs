#![no_std]
//! Access control service
//!
//! Single owner of the live [`AccessControl`]. The control loop reads consistent snapshots from
//! it on every tick; the settings menu mutates it either through [`AccessService::edit`] or by
//! sending [`Request`]s that [`task`] processes one at a time.
use core::cell::Cell;
use core::ops::DerefMut;

use controller_services::access::{AccessControl, LimitSet, RestrictionStatus, TrialStatus};
use controller_services::rtc::RealTimeClock;
use controller_services::settings::{AccessPolicy, Accumulators};
use controller_services::{error, info, trace, warn, Timestamp};
use embassy_sync::blocking_mutex;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_sync::once_lock::OnceLock;

pub mod request;

pub use request::{PinEntry, Request, Response, ResponseData};

/// Number of slots for settings menu requests
const REQUEST_CHANNEL_SIZE: usize = 1;

/// Access control service state
pub struct AccessService {
    /// Live policy, mutated only while locked
    control: Mutex<NoopRawMutex, AccessControl>,
    /// Trial status from the most recent control tick
    last_trial: blocking_mutex::Mutex<NoopRawMutex, Cell<TrialStatus>>,
    /// Settings menu requests
    request: Channel<NoopRawMutex, Request, REQUEST_CHANNEL_SIZE>,
    /// Responses to settings menu requests
    response: Channel<NoopRawMutex, Response, REQUEST_CHANNEL_SIZE>,
}

impl AccessService {
    /// Create a service around a loaded policy
    pub fn new(policy: AccessPolicy) -> Self {
        Self {
            control: Mutex::new(AccessControl::new(policy)),
            last_trial: blocking_mutex::Mutex::new(Cell::new(TrialStatus::Inactive)),
            request: Channel::new(),
            response: Channel::new(),
        }
    }

    /// Limits the control loop must apply right now
    pub async fn effective_limits(&self) -> LimitSet {
        self.control.lock().await.effective_limits()
    }

    /// Password required at boot
    pub async fn requires_password_at_boot(&self) -> bool {
        self.control.lock().await.requires_password_at_boot()
    }

    /// Password required to enter the settings menu
    pub async fn requires_password_for_settings(&self) -> bool {
        self.control.lock().await.requires_password_for_settings()
    }

    /// Password required to enter the security sub-menu
    pub async fn requires_password_for_security_menu(&self) -> bool {
        self.control.lock().await.requires_password_for_security_menu()
    }

    /// Coarse restriction phase
    pub async fn restriction_status(&self) -> RestrictionStatus {
        self.control.lock().await.restriction_status()
    }

    /// Check the running trial, called from the control tick
    pub async fn advance_trial(&self, now: Timestamp, odometer: f32) -> TrialStatus {
        let status = self.control.lock().await.advance_trial(now, odometer);
        let previous = self.last_trial.lock(|last| last.replace(status));
        if status != previous && status.is_expired() {
            info!("Trial expired: {:?}", status);
        }
        status
    }

    /// Trial status from the most recent [`Self::advance_trial`]
    pub fn last_trial_status(&self) -> TrialStatus {
        self.last_trial.lock(|last| last.get())
    }

    /// Read the clock and check the running trial
    pub async fn advance_trial_with<C: RealTimeClock>(&self, clock: &mut C, odometer: f32) -> Result<TrialStatus, C::Error> {
        let now = clock.now().await?;
        Ok(self.advance_trial(now, odometer).await)
    }

    /// Record the accumulators the control loop maintains
    pub async fn record_accumulators(&self, accumulators: Accumulators) {
        self.control.lock().await.vehicle_mut().accumulators = accumulators;
    }

    /// Copy of the whole policy, for saving
    pub async fn snapshot(&self) -> AccessPolicy {
        *self.control.lock().await.policy()
    }

    /// Run `f` with exclusive access to the policy
    ///
    /// `f` is synchronous so the lock cannot be held across an await point; control loop readers
    /// observe the policy either entirely before or entirely after the edit.
    pub async fn edit<R>(&self, f: impl FnOnce(&mut AccessControl) -> R) -> R {
        let mut lock = self.control.lock().await;
        f(lock.deref_mut())
    }

    fn handle(control: &mut AccessControl, request: Request) -> Response {
        match request {
            Request::CheckPassword { input, credential } => {
                control.check_password(&input, credential).map(ResponseData::Auth)
            }
            Request::SetPassword(passcode) => {
                control.set_password(passcode);
                Ok(ResponseData::Complete)
            }
            Request::SetPrivilegedCredential { current, credential } => control
                .set_privileged_credential(&current, credential)
                .map(|_| ResponseData::Complete),
            Request::SetBootGate(enabled) => {
                control.set_boot_gate(enabled);
                Ok(ResponseData::Complete)
            }
            Request::SetSettingsGate(enabled) => {
                control.set_settings_gate(enabled);
                Ok(ResponseData::Complete)
            }
            Request::EnableSecurityGate => {
                control.enable_security_gate();
                Ok(ResponseData::Complete)
            }
            Request::SetLimits(tier, limits) => control.set_limits(tier, limits).map(|_| ResponseData::Complete),
            Request::ConfigureTrial(allotment) => control.configure_trial(allotment).map(|_| ResponseData::Complete),
            Request::StartTrial { now, odometer } => control.start_trial(now, odometer).map(ResponseData::TrialStarted),
            Request::ClearRestriction { input } => control.clear_restriction(&input).map(|_| ResponseData::Complete),
        }
    }

    /// Wait for one settings menu request, apply it and send the response
    pub async fn process_request(&self) {
        let request = self.request.receive().await;
        trace!("Received request {:?}", request);

        let response = self.edit(|control| Self::handle(control, request)).await;
        match response {
            Err(e) if e.is_refusal() => warn!("Request refused: {:?}", e),
            Err(e) => error!("Request failed: {:?}", e),
            Ok(_) => {}
        }

        self.response.send(response).await;
    }

    /// Send a request from the settings menu and wait for its response
    pub async fn execute(&self, request: Request) -> Response {
        self.request.send(request).await;
        self.response.receive().await
    }
}

static SERVICE: OnceLock<AccessService> = OnceLock::new();

/// Initialize the service singleton with the policy loaded at boot
///
/// Returns `None` if the service was already initialized.
pub fn init(policy: AccessPolicy) -> Option<&'static AccessService> {
    if SERVICE.try_get().is_some() {
        return None;
    }

    Some(SERVICE.get_or_init(|| AccessService::new(policy)))
}

/// Wait for the service singleton to be initialized
pub async fn get() -> &'static AccessService {
    SERVICE.get().await
}

/// Settings menu request loop
#[embassy_executor::task]
pub async fn task() {
    info!("Starting access control task");
    let service = get().await;

    loop {
        service.process_request().await;
    }
}
