pub mod event;
pub mod parameter;
pub mod stack;

pub use event::StackEvent;
pub use parameter::{ParameterDirective, ParameterSet, ParameterValue};
pub use stack::{
    Capability, StackDescription, StackOutput, StackRequest, StackStatus, StackSummary,
};
