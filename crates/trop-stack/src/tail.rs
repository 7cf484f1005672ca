//! Live, deduplicated event stream for one stack.
//!
//! Each poll fetches the stack status and its full event history, prints
//! every event not printed before (oldest first), and stops once the
//! status is terminal. Events older than the tail start minus a grace
//! window are history and never printed.

use std::collections::HashSet;
use std::io::Write;
use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use trop_core::models::StackStatus;

use crate::api::{BoxFuture, ControlPlane};
use crate::error::StackError;

/// Pause between two polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Tolerated clock skew between the local start time and remote timestamps.
pub const GRACE_WINDOW: SignedDuration = SignedDuration::from_secs(2);

/// Source of "now" and of the pause between polls.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

/// Wall clock, real sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailState {
    Polling,
    /// The stack reached this terminal status; no further polls.
    Terminal(StackStatus),
}

pub struct EventTailer<'a> {
    api: &'a dyn ControlPlane,
    clock: &'a dyn Clock,
    name: String,
    since: Timestamp,
    seen: HashSet<String>,
    state: TailState,
    interval: Duration,
}

impl<'a> EventTailer<'a> {
    /// Start tailing `name`. The reference time is captured here, once.
    pub fn new(
        api: &'a dyn ControlPlane,
        clock: &'a dyn Clock,
        name: impl Into<String>,
    ) -> Result<Self, StackError> {
        let since = clock.now().checked_sub(GRACE_WINDOW)?;
        Ok(Self {
            api,
            clock,
            name: name.into(),
            since,
            seen: HashSet::new(),
            state: TailState::Polling,
            interval: POLL_INTERVAL,
        })
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn state(&self) -> &TailState {
        &self.state
    }

    /// One iteration: status, events, print the new ones.
    ///
    /// A poll after reaching `Terminal` is a no-op.
    pub async fn poll(&mut self, out: &mut dyn Write) -> Result<&TailState, StackError> {
        if let TailState::Terminal(_) = self.state {
            return Ok(&self.state);
        }

        let status = self.api.describe_stack(&self.name).await?.status;
        let mut events = self.api.list_stack_events(&self.name).await?;
        // Newest-first from the API; stable sort keeps that order for ties.
        events.reverse();
        events.sort_by_key(|e| e.timestamp);

        for event in events {
            if event.timestamp < self.since {
                continue;
            }
            if self.seen.insert(event.id.clone()) {
                writeln!(out, "{event}")?;
            }
        }
        out.flush()?;

        if status.is_terminal() {
            tracing::debug!(stack = %self.name, status = %status, "stack reached terminal status");
            self.state = TailState::Terminal(status);
        }
        Ok(&self.state)
    }

    /// Poll until the stack is terminal and return its final status.
    ///
    /// `ROLLBACK_COMPLETE` and `UPDATE_ROLLBACK_COMPLETE` end the tail like
    /// any other `*_COMPLETE` status; inspect the returned value to tell a
    /// rolled-back operation from a successful one.
    pub async fn run(mut self, out: &mut dyn Write) -> Result<StackStatus, StackError> {
        tracing::info!(stack = %self.name, since = %self.since, "tailing stack events");
        loop {
            if let TailState::Terminal(status) = self.poll(out).await? {
                return Ok(status.clone());
            }
            self.clock.sleep(self.interval).await;
        }
    }
}

/// Tail `name` until it reaches a terminal status.
pub async fn tail_events(
    api: &dyn ControlPlane,
    clock: &dyn Clock,
    name: &str,
    out: &mut dyn Write,
) -> Result<StackStatus, StackError> {
    EventTailer::new(api, clock, name)?.run(out).await
}
