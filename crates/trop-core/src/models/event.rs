use std::fmt;

use serde::{Deserialize, Serialize};

/// One lifecycle event reported for a stack or one of its resources.
///
/// The same `id` may be delivered by several polls; it always names the
/// same event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEvent {
    pub id: String,
    pub timestamp: jiff::Timestamp,
    pub logical_resource_id: String,
    pub resource_status: String,
    pub status_reason: Option<String>,
}

/// `<timestamp> [ <logical id padded to 20> ] <status>[ - <reason>]`
impl fmt::Display for StackEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} [ {:<20} ] {}",
            self.timestamp, self.logical_resource_id, self.resource_status
        )?;
        if let Some(reason) = &self.status_reason {
            write!(f, " - {reason}")?;
        }
        Ok(())
    }
}
