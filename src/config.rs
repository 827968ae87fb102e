use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use chrono_tz::Tz;

use crate::agent::AgentConfig;
use crate::models::labels::SurfaceLabels;

#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(format!("Invalid config line {}: {}", idx + 1, line));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if (value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\''))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    Rule,
    OpenAi,
}

/// Typed settings assembled from the KEY=VALUE file with the process
/// environment as fallback. Misconfigured values panic at startup rather
/// than surfacing mid-attempt.
#[derive(Debug, Clone)]
pub struct Settings {
    pub run_mode: String,
    pub http_port: u16,
    pub parser: ParserKind,
    pub openai_api_key: Option<String>,
    pub timezone: Tz,
    pub agent: AgentConfig,
    pub labels: SurfaceLabels,
}

const DEFAULT_RUN_MODE: &str = "cli";
const DEFAULT_HTTP_PORT: u16 = 8000;
const DEFAULT_TIMEZONE: &str = "Asia/Taipei";

impl Settings {
    pub fn load(config: &AppConfig) -> Self {
        let get_prop = |key: &str| -> Option<String> {
            config.get(key).or_else(|| env::var(key).ok())
        };

        let defaults = AgentConfig::default();
        let agent = AgentConfig {
            calendar_url: get_prop("CALENDAR_URL").unwrap_or(defaults.calendar_url),
            storage_state_path: get_prop("STORAGE_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_state_path),
            screenshot_path: get_prop("SCREENSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.screenshot_path),
            headless: get_prop("HEADLESS")
                .map(|v| parse_bool(&v))
                .unwrap_or(defaults.headless),
            chrome_binary: get_prop("CHROME_BINARY"),
            settle_nav_ms: parse_millis(get_prop("SETTLE_NAV_MS"), defaults.settle_nav_ms),
            settle_menu_ms: parse_millis(get_prop("SETTLE_MENU_MS"), defaults.settle_menu_ms),
            settle_save_ms: parse_millis(get_prop("SETTLE_SAVE_MS"), defaults.settle_save_ms),
        };

        let parser = match get_prop("PARSER").as_deref() {
            None | Some("rule") => ParserKind::Rule,
            Some("openai") => ParserKind::OpenAi,
            Some(other) => panic!("Invalid PARSER {other}, expected rule or openai"),
        };

        let timezone: Tz = get_prop("TIMEZONE")
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string())
            .parse()
            .expect("TIMEZONE must be an IANA timezone name");

        Self {
            run_mode: get_prop("RUN_MODE").unwrap_or_else(|| DEFAULT_RUN_MODE.to_string()),
            http_port: get_prop("HTTP_PORT")
                .map(|v| v.parse().expect("HTTP_PORT must be a port number"))
                .unwrap_or(DEFAULT_HTTP_PORT),
            parser,
            openai_api_key: get_prop("OPENAI_API_KEY"),
            timezone,
            agent,
            labels: load_labels(&get_prop),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "false" | "0" | "no"
    )
}

fn parse_millis(value: Option<String>, default: u64) -> u64 {
    value
        .map(|v| v.parse().expect("settle delays must be milliseconds"))
        .unwrap_or(default)
}

/// Label overrides are `;`-separated variant lists, one entry per script the
/// surface may render. Unset keys keep the built-in vocabulary.
fn load_labels(get_prop: &dyn Fn(&str) -> Option<String>) -> SurfaceLabels {
    let mut labels = SurfaceLabels::default();
    let mut list = |key: &str, slot: &mut Vec<String>| {
        if let Some(raw) = get_prop(key) {
            let parsed: Vec<String> = raw
                .split(';')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect();
            if !parsed.is_empty() {
                *slot = parsed;
            }
        }
    };
    list("LABELS_CREATE", &mut labels.create_button);
    list("LABELS_EVENT_ITEM", &mut labels.event_menu_item);
    list("LABELS_TITLE_INPUT", &mut labels.title_input);
    list("LABELS_START_INPUT", &mut labels.start_time_input);
    list("LABELS_END_INPUT", &mut labels.end_time_input);
    list("LABELS_SAVE", &mut labels.save_button);
    if let Some(am) = get_prop("LABEL_AM") {
        labels.am = am;
    }
    if let Some(pm) = get_prop("LABEL_PM") {
        labels.pm = pm;
    }
    if let Some(suffix) = get_prop("LABEL_HOUR_SUFFIX") {
        labels.hour_suffix = suffix;
    }
    if let Some(busy) = get_prop("LABEL_BUSY") {
        labels.busy_placeholder = busy;
    }
    labels
}
