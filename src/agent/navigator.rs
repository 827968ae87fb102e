use std::time::Duration;

use chrono::{Datelike, NaiveDate};

use crate::agent::error::AgentError;
use crate::agent::page::PageDriver;
use crate::agent::AgentConfig;

/// Puts the surface on the day view for a given date. There is no arrival
/// validation: the canonical URL plus the settle delay is the contract.
pub struct Navigator {
    base_url: String,
    settle: Duration,
}

impl Navigator {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            base_url: config.calendar_url.trim_end_matches('/').to_string(),
            settle: Duration::from_millis(config.settle_nav_ms),
        }
    }

    pub fn day_url(&self, date: NaiveDate) -> String {
        format!(
            "{}/calendar/u/0/r/day/{:04}{:02}{:02}",
            self.base_url,
            date.year(),
            date.month(),
            date.day()
        )
    }

    pub async fn goto_date(&self, page: &dyn PageDriver, date: NaiveDate) -> Result<(), AgentError> {
        let url = self.day_url(date);
        log::info!(target: "agent", "navigating to day view {url}");
        page.goto(&url).await?;
        tokio::time::sleep(self.settle).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_url_zero_pads_and_strips_trailing_slash() {
        let config = AgentConfig {
            calendar_url: "https://calendar.google.com/".to_string(),
            ..AgentConfig::default()
        };
        let navigator = Navigator::new(&config);
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(
            navigator.day_url(date),
            "https://calendar.google.com/calendar/u/0/r/day/20260105"
        );
    }
}
