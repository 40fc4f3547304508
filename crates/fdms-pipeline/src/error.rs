use fdms_core::{AnalysisError, ErrorKind};
use thiserror::Error;

/// Errors of the analysis pipeline and its reporting collaborators.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Analysis(e) => e.kind(),
            PipelineError::Io(_) | PipelineError::Json(_) | PipelineError::Csv(_) => ErrorKind::Io,
        }
    }
}
