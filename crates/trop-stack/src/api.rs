use std::future::Future;
use std::pin::Pin;

use trop_core::models::{StackDescription, StackEvent, StackRequest, StackStatus, StackSummary};

use crate::error::StackError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The remote declarative-infrastructure control plane.
///
/// One value is constructed per process and passed by reference to the
/// tailer, the reconciler, and every command.
pub trait ControlPlane: Send + Sync {
    /// Stacks whose status is in `filter`.
    fn list_stacks<'a>(
        &'a self,
        filter: &'a [StackStatus],
    ) -> BoxFuture<'a, Result<Vec<StackSummary>, StackError>>;

    /// Current state of one stack. `StackError::NotFound` if absent.
    fn describe_stack<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<StackDescription, StackError>>;

    /// Full event history, newest first.
    fn list_stack_events<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Vec<StackEvent>, StackError>>;

    fn create_stack<'a>(&'a self, request: &'a StackRequest)
    -> BoxFuture<'a, Result<(), StackError>>;

    fn update_stack<'a>(&'a self, request: &'a StackRequest)
    -> BoxFuture<'a, Result<(), StackError>>;
}
