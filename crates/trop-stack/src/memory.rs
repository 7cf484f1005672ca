//! In-process control plane and clock.
//!
//! Simulates stack lifecycles without network access or real delays:
//! every `describe_stack` call advances a stack one scripted status step and
//! records a stack-level event for it, stamped with the shared
//! [`ManualClock`]. Sleeping on the clock advances it instantly.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use serde_json::Value;
use trop_core::models::{
    ParameterSet, ParameterValue, StackDescription, StackEvent, StackOutput, StackRequest,
    StackStatus, StackSummary,
};

use crate::api::{BoxFuture, ControlPlane};
use crate::error::StackError;
use crate::tail::Clock;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clock whose time only moves when told to (or when slept on).
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
            slept: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn advance(&self, by: SignedDuration) {
        let mut now = lock(&self.now);
        if let Ok(next) = now.checked_add(by) {
            *now = next;
        }
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.slept).clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Timestamp::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *lock(&self.now)
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        lock(&self.slept).push(duration);
        if let Ok(by) = SignedDuration::try_from(duration) {
            self.advance(by);
        }
        Box::pin(std::future::ready(()))
    }
}

/// Which call submitted a recorded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Create,
    Update,
}

#[derive(Debug)]
struct MemoryStack {
    description: StackDescription,
    /// Oldest first.
    events: Vec<StackEvent>,
    pending: VecDeque<StackStatus>,
}

#[derive(Debug, Default)]
struct Inner {
    stacks: BTreeMap<String, MemoryStack>,
    submissions: Vec<(Submission, StackRequest)>,
    next_event: u64,
    failure: Option<String>,
}

impl Inner {
    fn take_failure(&mut self, operation: &'static str) -> Result<(), StackError> {
        match self.failure.take() {
            Some(message) => Err(StackError::Aws { operation, message }),
            None => Ok(()),
        }
    }

    fn record(&mut self, name: &str, at: Timestamp, status: &StackStatus) {
        self.next_event += 1;
        let id = format!("{name}-{}", self.next_event);
        if let Some(stack) = self.stacks.get_mut(name) {
            stack.description.status = status.clone();
            stack.events.push(StackEvent {
                id,
                timestamp: at,
                logical_resource_id: name.to_string(),
                resource_status: status.to_string(),
                status_reason: None,
            });
        }
    }

    fn stack(&self, name: &str) -> Result<&MemoryStack, StackError> {
        self.stacks.get(name).ok_or_else(|| StackError::NotFound {
            name: name.to_string(),
        })
    }
}

/// `ControlPlane` held entirely in memory.
#[derive(Debug)]
pub struct InMemoryControlPlane {
    clock: ManualClock,
    inner: Mutex<Inner>,
}

impl InMemoryControlPlane {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Seed a stack that already exists, with no event history.
    pub fn insert_stack(
        &self,
        name: &str,
        status: StackStatus,
        parameters: ParameterSet,
        outputs: Vec<StackOutput>,
    ) {
        lock(&self.inner).stacks.insert(
            name.to_string(),
            MemoryStack {
                description: StackDescription {
                    name: name.to_string(),
                    status,
                    parameters,
                    outputs,
                },
                events: Vec::new(),
                pending: VecDeque::new(),
            },
        );
    }

    /// Append a raw event to a stack's history.
    pub fn push_event(&self, name: &str, event: StackEvent) {
        if let Some(stack) = lock(&self.inner).stacks.get_mut(name) {
            stack.events.push(event);
        }
    }

    /// Queue statuses the stack moves through, one per `describe_stack`.
    pub fn script(&self, name: &str, statuses: impl IntoIterator<Item = StackStatus>) {
        if let Some(stack) = lock(&self.inner).stacks.get_mut(name) {
            stack.pending.extend(statuses);
        }
    }

    /// Make the next API call fail with a service error.
    pub fn fail_next(&self, message: &str) {
        lock(&self.inner).failure = Some(message.to_string());
    }

    /// Every create/update request received, in order.
    pub fn submissions(&self) -> Vec<(Submission, StackRequest)> {
        lock(&self.inner).submissions.clone()
    }
}

impl ControlPlane for InMemoryControlPlane {
    fn list_stacks<'a>(
        &'a self,
        filter: &'a [StackStatus],
    ) -> BoxFuture<'a, Result<Vec<StackSummary>, StackError>> {
        Box::pin(async move {
            let mut inner = lock(&self.inner);
            inner.take_failure("ListStacks")?;
            Ok(inner
                .stacks
                .values()
                .filter(|s| filter.contains(&s.description.status))
                .map(|s| StackSummary {
                    name: s.description.name.clone(),
                    status: s.description.status.clone(),
                })
                .collect())
        })
    }

    fn describe_stack<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<StackDescription, StackError>> {
        Box::pin(async move {
            let now = self.clock.now();
            let mut inner = lock(&self.inner);
            inner.take_failure("DescribeStacks")?;
            let next = inner
                .stacks
                .get_mut(name)
                .ok_or_else(|| StackError::NotFound {
                    name: name.to_string(),
                })?
                .pending
                .pop_front();
            if let Some(status) = next {
                inner.record(name, now, &status);
            }
            Ok(inner.stack(name)?.description.clone())
        })
    }

    fn list_stack_events<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Vec<StackEvent>, StackError>> {
        Box::pin(async move {
            let mut inner = lock(&self.inner);
            inner.take_failure("DescribeStackEvents")?;
            Ok(inner.stack(name)?.events.iter().rev().cloned().collect())
        })
    }

    fn create_stack<'a>(
        &'a self,
        request: &'a StackRequest,
    ) -> BoxFuture<'a, Result<(), StackError>> {
        Box::pin(async move {
            let now = self.clock.now();
            let mut inner = lock(&self.inner);
            inner.take_failure("CreateStack")?;
            let live = inner
                .stacks
                .get(&request.name)
                .is_some_and(|s| s.description.status != StackStatus::DeleteComplete);
            if live {
                return Err(StackError::Aws {
                    operation: "CreateStack",
                    message: format!("AlreadyExistsException: Stack [{}] already exists", request.name),
                });
            }

            let mut parameters = ParameterSet::new();
            for directive in &request.parameters {
                match &directive.value {
                    ParameterValue::Explicit(value) => parameters.insert(&directive.key, value),
                    ParameterValue::UsePrevious => {
                        return Err(invalid_previous("CreateStack", &directive.key));
                    }
                }
            }

            inner.submissions.push((Submission::Create, request.clone()));
            inner.stacks.insert(
                request.name.clone(),
                MemoryStack {
                    description: StackDescription {
                        name: request.name.clone(),
                        status: StackStatus::CreateInProgress,
                        parameters,
                        outputs: template_outputs(&request.template_body),
                    },
                    events: Vec::new(),
                    pending: VecDeque::from([StackStatus::CreateComplete]),
                },
            );
            inner.record(&request.name, now, &StackStatus::CreateInProgress);
            Ok(())
        })
    }

    fn update_stack<'a>(
        &'a self,
        request: &'a StackRequest,
    ) -> BoxFuture<'a, Result<(), StackError>> {
        Box::pin(async move {
            let now = self.clock.now();
            let mut inner = lock(&self.inner);
            inner.take_failure("UpdateStack")?;
            let previous = inner.stack(&request.name)?.description.parameters.clone();

            let mut parameters = ParameterSet::new();
            for directive in &request.parameters {
                match &directive.value {
                    ParameterValue::Explicit(value) => parameters.insert(&directive.key, value),
                    ParameterValue::UsePrevious => {
                        let value = previous
                            .get(&directive.key)
                            .ok_or_else(|| invalid_previous("UpdateStack", &directive.key))?;
                        parameters.insert(&directive.key, value);
                    }
                }
            }

            inner.submissions.push((Submission::Update, request.clone()));
            if let Some(stack) = inner.stacks.get_mut(&request.name) {
                stack.description.parameters = parameters;
                stack.description.outputs = template_outputs(&request.template_body);
                stack.pending.extend([
                    StackStatus::UpdateCompleteCleanupInProgress,
                    StackStatus::UpdateComplete,
                ]);
            }
            inner.record(&request.name, now, &StackStatus::UpdateInProgress);
            Ok(())
        })
    }
}

fn invalid_previous(operation: &'static str, key: &str) -> StackError {
    StackError::Aws {
        operation,
        message: format!(
            "ValidationError: Invalid input for parameter key {key}. \
             Cannot specify usePreviousValue as true for non-existing parameter"
        ),
    }
}

/// Outputs whose `Value` is a literal string in the template body.
fn template_outputs(body: &str) -> Vec<StackOutput> {
    let Ok(document) = serde_json::from_str::<Value>(body) else {
        return Vec::new();
    };
    document
        .get("Outputs")
        .and_then(Value::as_object)
        .map(|outputs| {
            outputs
                .iter()
                .filter_map(|(key, output)| {
                    Some(StackOutput {
                        key: key.clone(),
                        description: output
                            .get("Description")
                            .and_then(Value::as_str)
                            .map(String::from),
                        value: output.get("Value")?.as_str()?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
