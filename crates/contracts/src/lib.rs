//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the relay.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Record timestamps are epoch milliseconds (`i64`), assigned by the upstream source
//! - Ordering is arrival order; the relay never reorders by timestamp

mod config;
mod error;
mod frame;
mod record;
mod sink;
mod source;

pub use config::*;
pub use error::*;
pub use frame::RawFrame;
pub use record::{Record, RejectionReason};
pub use sink::*;
pub use source::*;
