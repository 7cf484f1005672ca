//! trop-core
//!
//! Pure domain types for stack management: statuses, events, parameters,
//! outputs, and the template capability.
//! No AWS SDK dependency: this is the shared vocabulary of the trop system.

pub mod error;
pub mod models;
pub mod template;

pub use crate::error::CoreError;
pub use crate::template::{JsonTemplate, Layout, StackTemplate};
