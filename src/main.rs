#![allow(non_snake_case)]

mod agent;
mod cli;
mod clients;
mod config;
mod models;
mod runtime;
mod service;

use std::env;
use std::sync::Arc;

use crate::agent::chromium::ChromiumSessionManager;
use crate::agent::session::TerminalLoginGate;
use crate::agent::CalendarAgent;
use crate::config::{AppConfig, ParserKind, Settings};
use crate::service::assistant::Assistant;
use crate::service::openai_service::OpenAIService;
use crate::service::parser::{OpenAIParser, RuleParser, ScheduleParser};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    };
    let settings = Settings::load(&config);

    let sessions = Arc::new(ChromiumSessionManager::new(
        settings.agent.clone(),
        Arc::new(TerminalLoginGate),
    ));
    let scheduler = Arc::new(CalendarAgent::new(
        sessions.clone(),
        &settings.agent,
        settings.labels.clone(),
    ));

    let parser: Arc<dyn ScheduleParser> = match settings.parser {
        ParserKind::Rule => Arc::new(RuleParser),
        ParserKind::OpenAi => {
            let api_key = settings
                .openai_api_key
                .clone()
                .expect("OPENAI_API_KEY must be set for PARSER=openai");
            Arc::new(OpenAIParser::new(Arc::new(OpenAIService::new(api_key))))
        }
    };
    let assistant = Arc::new(Assistant::new(parser, scheduler, settings.timezone));

    if settings.run_mode == "api" {
        runtime::run_api(assistant, settings.http_port).await;
    } else if settings.run_mode == "cli" {
        cli::cli(assistant, sessions).await;
    } else {
        println!("Invalid run mode {}", settings.run_mode);
    }
}
