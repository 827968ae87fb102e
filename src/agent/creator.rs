use std::time::Duration;

use crate::agent::element::{self, ElementQuery, Strategy};
use crate::agent::error::AgentError;
use crate::agent::page::PageDriver;
use crate::agent::AgentConfig;
use crate::models::labels::SurfaceLabels;
use crate::models::schedule::ScheduleRequest;

/// Drives the surface's creation dialog. Steps that abort the dialog (open,
/// event type, save) are required; steps that merely degrade the event
/// (title, times) are logged and skipped when their element is missing.
pub struct EventCreator {
    labels: SurfaceLabels,
    menu_settle: Duration,
    save_settle: Duration,
}

impl EventCreator {
    pub fn new(labels: SurfaceLabels, config: &AgentConfig) -> Self {
        Self {
            labels,
            menu_settle: Duration::from_millis(config.settle_menu_ms),
            save_settle: Duration::from_millis(config.settle_save_ms),
        }
    }

    pub async fn create(
        &self,
        page: &dyn PageDriver,
        request: &ScheduleRequest,
    ) -> Result<(), AgentError> {
        self.click_required(page, self.create_button_query()).await?;
        tokio::time::sleep(self.menu_settle).await;

        self.click_required(page, self.event_menu_query()).await?;
        tokio::time::sleep(self.menu_settle).await;

        self.fill_degradable(page, self.title_input_query(), &request.title)
            .await?;
        self.fill_degradable(
            page,
            self.start_input_query(),
            &self.labels.time_input_value(request.start.time()),
        )
        .await?;
        self.fill_degradable(
            page,
            self.end_input_query(),
            &self.labels.time_input_value(request.end.time()),
        )
        .await?;

        self.click_required(page, self.save_button_query()).await?;
        tokio::time::sleep(self.save_settle).await;
        Ok(())
    }

    async fn click_required(
        &self,
        page: &dyn PageDriver,
        query: ElementQuery,
    ) -> Result<(), AgentError> {
        match element::resolve(page, &query).await? {
            Some(handle) => page.click(&handle).await,
            None => Err(AgentError::ElementNotFound(query.target)),
        }
    }

    /// Missing inputs degrade the event instead of aborting it; driver
    /// faults still propagate.
    async fn fill_degradable(
        &self,
        page: &dyn PageDriver,
        query: ElementQuery,
        value: &str,
    ) -> Result<(), AgentError> {
        match element::resolve(page, &query).await? {
            Some(handle) => page.fill(&handle, value).await,
            None => {
                log::warn!(target: "agent", "{} not found, leaving the surface default", query.target);
                Ok(())
            }
        }
    }

    fn create_button_query(&self) -> ElementQuery {
        let mut strategies: Vec<Strategy> = Vec::new();
        for label in &self.labels.create_button {
            strategies.push(Strategy::aria(label));
        }
        for label in &self.labels.create_button {
            strategies.push(Strategy::role_text("button", label));
        }
        for label in &self.labels.create_button {
            strategies.push(Strategy::text(label));
        }
        ElementQuery::new("create button", strategies)
    }

    fn event_menu_query(&self) -> ElementQuery {
        let mut strategies: Vec<Strategy> = Vec::new();
        for label in &self.labels.event_menu_item {
            strategies.push(Strategy::role_text("menuitem", label));
        }
        for label in &self.labels.event_menu_item {
            strategies.push(Strategy::text(label));
        }
        ElementQuery::new("event menu item", strategies)
    }

    fn title_input_query(&self) -> ElementQuery {
        let mut strategies: Vec<Strategy> = Vec::new();
        for label in &self.labels.title_input {
            strategies.push(Strategy::aria(label));
        }
        strategies.push(Strategy::dialog_input(0));
        ElementQuery::new("title input", strategies)
    }

    fn start_input_query(&self) -> ElementQuery {
        let mut strategies: Vec<Strategy> = Vec::new();
        for label in &self.labels.start_time_input {
            strategies.push(Strategy::aria(label));
        }
        strategies.push(Strategy::dialog_input(1));
        ElementQuery::new("start time input", strategies)
    }

    fn end_input_query(&self) -> ElementQuery {
        let mut strategies: Vec<Strategy> = Vec::new();
        for label in &self.labels.end_time_input {
            strategies.push(Strategy::aria(label));
        }
        strategies.push(Strategy::dialog_input(2));
        ElementQuery::new("end time input", strategies)
    }

    fn save_button_query(&self) -> ElementQuery {
        let mut strategies: Vec<Strategy> = Vec::new();
        for label in &self.labels.save_button {
            strategies.push(Strategy::aria(label));
        }
        for label in &self.labels.save_button {
            strategies.push(Strategy::role_text("button", label));
        }
        for label in &self.labels.save_button {
            strategies.push(Strategy::text(label));
        }
        ElementQuery::new("save button", strategies)
    }
}
