//! Shared data model and access control for EV dashboard and motor controller firmware

#![no_std]
#![warn(missing_docs)]

pub mod access;
pub mod datetime;
pub mod fmt;
pub mod rtc;
pub mod settings;
pub mod values;

pub use access::AccessControl;
pub use datetime::Timestamp;
pub use settings::AccessPolicy;
pub use values::OperatingState;
