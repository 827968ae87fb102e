use thiserror::Error;

/// Faults raised while driving the calendar surface. Whether an
/// `ElementNotFound` aborts the attempt is the caller's call: the creation
/// protocol treats some lookups as required and others as degradable.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("failed to navigate to {url}: {details}")]
    NavigateFailed { url: String, details: String },
    #[error("session error: {0}")]
    Session(String),
    #[error("automation error: {0}")]
    Automation(String),
}
