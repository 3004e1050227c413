//! Reference attachment strategies.
//!
//! - [`ScanBus`] / [`BusSurface`]: a broadcast bus where every scan is
//!   published and default handling listens downstream
//! - [`InputField`] / [`InputFieldSurface`]: a text field filled by a
//!   keyboard-wedge scanner and submitted with Enter
//!
//! Hosts with other capture mechanisms implement
//! [`ScanSurface`](crate::ScanSurface) directly.

mod bus;
mod input_field;

pub use bus::{BusSurface, ScanBus};
pub use input_field::{InputField, InputFieldSurface, SubmitTrigger};
