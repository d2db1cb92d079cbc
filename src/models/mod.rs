//! Data models for the ITSM API.
//!
//! Records travel through the engine as untyped JSON. These types are the
//! typed views for the resources callers use most, plus the error body.

mod canned_response;
mod common;
mod onboarding;
mod release;
mod ticket;

pub use canned_response::*;
pub use common::*;
pub use onboarding::*;
pub use release::*;
pub use ticket::*;
