use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read template at {path}: {source}")]
    TemplateRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("template is not valid JSON: {0}")]
    TemplateParse(#[from] serde_json::Error),

    #[error("template must be a JSON object, found {0}")]
    TemplateShape(&'static str),
}
