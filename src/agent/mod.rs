//! The calendar automation engine: one attempt owns one browser session
//! from acquire to release and resolves to exactly one outcome.

pub mod chromium;
pub mod conflict;
pub mod creator;
pub mod element;
pub mod error;
mod js;
pub mod navigator;
pub mod page;
pub mod session;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::conflict::ConflictDetector;
use crate::agent::creator::EventCreator;
use crate::agent::error::AgentError;
use crate::agent::navigator::Navigator;
use crate::agent::page::PageDriver;
use crate::agent::session::SessionManager;
use crate::models::labels::SurfaceLabels;
use crate::models::schedule::{OperationOutcome, ScheduleRequest};

/// Everything the engine needs to know about the surface and the host.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Entry URL; the day view is derived from it.
    pub calendar_url: String,
    pub storage_state_path: PathBuf,
    pub screenshot_path: PathBuf,
    /// Applies to restored sessions only; the login bootstrap is always
    /// headed.
    pub headless: bool,
    pub chrome_binary: Option<String>,
    pub settle_nav_ms: u64,
    pub settle_menu_ms: u64,
    pub settle_save_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            calendar_url: "https://calendar.google.com".to_string(),
            storage_state_path: PathBuf::from("storage_state.json"),
            screenshot_path: PathBuf::from("calendar_error.png"),
            headless: true,
            chrome_binary: None,
            settle_nav_ms: 3000,
            settle_menu_ms: 1000,
            settle_save_ms: 2000,
        }
    }
}

/// The engine seam callers schedule through.
#[async_trait]
pub trait EventScheduler: Send + Sync {
    async fn attempt_schedule(&self, request: &ScheduleRequest) -> OperationOutcome;
}

/// Post-failure diagnostics. Hook errors are the hook's own problem; the
/// orchestrator swallows them.
#[async_trait]
pub trait FailureHook: Send + Sync {
    async fn capture(&self, page: &dyn PageDriver, error: &AgentError);
}

/// Default hook: best-effort full-page screenshot to a fixed path.
pub struct ScreenshotHook {
    path: PathBuf,
}

impl ScreenshotHook {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl FailureHook for ScreenshotHook {
    async fn capture(&self, page: &dyn PageDriver, error: &AgentError) {
        log::warn!(target: "agent", "capturing {} after: {error}", self.path.display());
        if let Err(shot_err) = page.screenshot_full_page(&self.path).await {
            log::warn!(target: "agent", "screenshot failed: {shot_err}");
        }
    }
}

/// Orchestrates one scheduling attempt: acquire, navigate, probe for a
/// conflict, create, release. Release runs on every path.
pub struct CalendarAgent {
    sessions: Arc<dyn SessionManager>,
    navigator: Navigator,
    conflicts: ConflictDetector,
    creator: EventCreator,
    failure_hook: Option<Arc<dyn FailureHook>>,
}

impl CalendarAgent {
    pub fn new(
        sessions: Arc<dyn SessionManager>,
        config: &AgentConfig,
        labels: SurfaceLabels,
    ) -> Self {
        Self {
            sessions,
            navigator: Navigator::new(config),
            conflicts: ConflictDetector::new(labels.clone()),
            creator: EventCreator::new(labels, config),
            failure_hook: Some(Arc::new(ScreenshotHook::new(config.screenshot_path.clone()))),
        }
    }

    pub fn with_failure_hook(mut self, hook: Option<Arc<dyn FailureHook>>) -> Self {
        self.failure_hook = hook;
        self
    }

    async fn run_attempt(
        &self,
        page: &dyn PageDriver,
        request: &ScheduleRequest,
    ) -> Result<OperationOutcome, AgentError> {
        self.navigator.goto_date(page, request.date()).await?;

        let conflict = self.conflicts.check(page, request).await?;
        if conflict.has_conflict {
            log::info!(target: "agent", "conflict at {}: {}", request.start, conflict.description);
            return Ok(OperationOutcome::conflict(conflict.description));
        }

        self.creator.create(page, request).await?;
        log::info!(target: "agent", "created {:?} at {}", request.title, request.start);
        Ok(OperationOutcome::created())
    }
}

#[async_trait]
impl EventScheduler for CalendarAgent {
    async fn attempt_schedule(&self, request: &ScheduleRequest) -> OperationOutcome {
        let session = match self.sessions.acquire().await {
            Ok(session) => session,
            Err(err) => {
                log::error!(target: "agent", "session acquire failed: {err}");
                return OperationOutcome::failure();
            }
        };

        let outcome = match self.run_attempt(session.page.as_ref(), request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!(target: "agent", "attempt failed: {err}");
                if let Some(hook) = &self.failure_hook {
                    hook.capture(session.page.as_ref(), &err).await;
                }
                OperationOutcome::failure()
            }
        };

        if let Err(err) = self.sessions.release(session).await {
            log::warn!(target: "agent", "session release failed: {err}");
        }
        outcome
    }
}
