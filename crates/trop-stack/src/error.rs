use thiserror::Error;

#[derive(Debug, Error)]
pub enum StackError {
    /// The stack does not exist on the control plane.
    #[error("stack `{name}` does not exist")]
    NotFound { name: String },

    #[error("cloudformation:{operation} failed: {message}")]
    Aws {
        operation: &'static str,
        message: String,
    },

    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] jiff::Error),

    #[error(transparent)]
    Core(#[from] trop_core::CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StackError {
    pub fn aws(operation: &'static str, err: &dyn std::error::Error) -> Self {
        Self::Aws {
            operation,
            message: format_err_chain(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Walk the full error chain and join all causes into one string.
///
/// AWS SDK errors often have terse `Display` impls (e.g. "service error")
/// but useful detail in the source chain.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
