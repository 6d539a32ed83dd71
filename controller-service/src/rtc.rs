//! Real-time clock collaborator
use crate::datetime::Timestamp;

/// Source of controller-local wall-clock time
///
/// Implementations apply the calibration offset from [`crate::settings::Calibration`] themselves.
#[allow(async_fn_in_trait)]
pub trait RealTimeClock {
    /// Clock bus or device error
    type Error;

    /// Read the current time
    async fn now(&mut self) -> Result<Timestamp, Self::Error>;
}
