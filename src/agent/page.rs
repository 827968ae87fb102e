use std::path::Path;

use async_trait::async_trait;

use crate::agent::element::{ElementHandle, Strategy};
use crate::agent::error::AgentError;

/// The live-page seam between the scheduling protocol and the browser. One
/// implementation drives chromium; tests script their own.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), AgentError>;

    /// How many elements the strategy matches right now, in document order.
    async fn count_matches(&self, strategy: &Strategy) -> Result<usize, AgentError>;

    async fn click(&self, handle: &ElementHandle) -> Result<(), AgentError>;

    /// Sets an input's value and emits the `input`/`change` notifications
    /// the surface expects before it accepts the edit.
    async fn fill(&self, handle: &ElementHandle, value: &str) -> Result<(), AgentError>;

    async fn read_aria_label(&self, handle: &ElementHandle) -> Result<Option<String>, AgentError>;

    async fn read_text(&self, handle: &ElementHandle) -> Result<Option<String>, AgentError>;

    async fn screenshot_full_page(&self, path: &Path) -> Result<(), AgentError>;
}
