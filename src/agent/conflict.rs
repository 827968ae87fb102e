use crate::agent::element::{self, ElementHandle, ElementQuery, Strategy};
use crate::agent::error::AgentError;
use crate::agent::page::PageDriver;
use crate::models::labels::SurfaceLabels;
use crate::models::schedule::{ConflictResult, ScheduleRequest};

/// Probes the day view for an existing entry at the request's start hour.
/// Matches on the start-hour label only; minutes and the end bound are not
/// consulted.
pub struct ConflictDetector {
    labels: SurfaceLabels,
}

impl ConflictDetector {
    pub fn new(labels: SurfaceLabels) -> Self {
        Self { labels }
    }

    fn probe_query(&self, request: &ScheduleRequest) -> ElementQuery {
        let hour_label = self.labels.hour_label(request.start.time());
        ElementQuery::new(
            format!("existing entry at {hour_label}"),
            vec![Strategy::aria(&hour_label), Strategy::text(&hour_label)],
        )
    }

    pub async fn check(
        &self,
        page: &dyn PageDriver,
        request: &ScheduleRequest,
    ) -> Result<ConflictResult, AgentError> {
        let query = self.probe_query(request);
        let Some(handle) = element::resolve(page, &query).await? else {
            return Ok(ConflictResult::clear());
        };
        let description = self.describe(page, &handle).await?;
        log::info!(target: "agent", "found existing entry: {description}");
        Ok(ConflictResult::found(description))
    }

    /// Accessibility label first, then the first non-empty line of visible
    /// text, then the busy placeholder. Never returns an empty description.
    async fn describe(
        &self,
        page: &dyn PageDriver,
        handle: &ElementHandle,
    ) -> Result<String, AgentError> {
        if let Some(label) = page.read_aria_label(handle).await? {
            let label = label.trim();
            if !label.is_empty() {
                return Ok(label.to_string());
            }
        }
        if let Some(text) = page.read_text(handle).await? {
            if let Some(line) = text.lines().map(str::trim).find(|line| !line.is_empty()) {
                return Ok(line.to_string());
            }
        }
        Ok(self.labels.busy_placeholder.clone())
    }
}
