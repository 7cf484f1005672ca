//! trop-stack
//!
//! Stack operations against a declarative-infrastructure control plane.
//!
//! Public API:
//! - `ControlPlane` - the remote API seam; `CloudFormation` is the AWS implementation
//! - `tail_events()` / `EventTailer` - live, deduplicated event stream until the stack settles
//! - `reconcile()` - decide per parameter: new value, reuse previous, or omit
//! - `build_request()` - template + supplied parameters + previous values → create/update request
//! - `memory` - in-process control plane and manual clock for tests (`test-util` feature)

pub mod api;
pub mod cloudformation;
pub mod error;
#[cfg(feature = "test-util")]
pub mod memory;
pub mod reconcile;
pub mod tail;

pub use crate::api::{BoxFuture, ControlPlane};
pub use crate::cloudformation::CloudFormation;
pub use crate::error::StackError;
pub use crate::reconcile::{build_request, previous_parameters, reconcile, stack_parameters};
pub use crate::tail::{Clock, EventTailer, SystemClock, TailState, tail_events};
