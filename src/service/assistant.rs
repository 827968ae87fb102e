use std::sync::Arc;

use chrono::{Datelike, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::agent::EventScheduler;
use crate::models::schedule::ScheduleRequest;
use crate::service::parser::{ScheduleParser, UNTITLED_FALLBACK};

pub const WELCOME_TEXT: &str = "您好，我是您的日程助手，你要记录什么日程？";
pub const REPROMPT_TEXT: &str =
    "我没有听清楚具体的时间或标题，请再说一遍，例如：明天上午十点到十一点，和公司CEO会议。";

/// Per-conversation state, owned by the caller and passed into every turn.
/// After a conflict the conversation waits for a replacement time; a bare
/// follow-up time reuses the conflicted title.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub waiting_new_time: bool,
    pub pending_title: Option<String>,
}

pub struct Assistant {
    parser: Arc<dyn ScheduleParser>,
    scheduler: Arc<dyn EventScheduler>,
    timezone: Tz,
}

impl Assistant {
    pub fn new(
        parser: Arc<dyn ScheduleParser>,
        scheduler: Arc<dyn EventScheduler>,
        timezone: Tz,
    ) -> Self {
        Self {
            parser,
            scheduler,
            timezone,
        }
    }

    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.timezone).naive_local()
    }

    /// One conversational turn: parse, schedule, answer. Replies are the
    /// product wording verbatim; automation failures pass through the
    /// engine's generic failure reply and leave the pending state alone.
    pub async fn handle_message(&self, state: &mut ConversationState, text: &str) -> String {
        let Some(mut request) = self.parser.parse(text, self.now()).await else {
            return REPROMPT_TEXT.to_string();
        };

        // The user answered a conflict with just a new time.
        if request.title == UNTITLED_FALLBACK && state.waiting_new_time {
            if let Some(title) = &state.pending_title {
                request.title = title.clone();
            }
        }

        let outcome = self.scheduler.attempt_schedule(&request).await;
        if outcome.created {
            state.waiting_new_time = false;
            state.pending_title = None;
            return format!(
                "好的，已经在 {} 到 {} 为您创建日程：{}。",
                span_start(&request),
                span_end(&request),
                request.title
            );
        }
        if outcome.is_failure() {
            return outcome.message;
        }

        state.waiting_new_time = true;
        state.pending_title = Some(request.title.clone());
        format!(
            "您在 {} 到 {} 已有日程安排：{}，请说一个新的时间。",
            span_start(&request),
            span_end(&request),
            outcome.message
        )
    }
}

fn span_start(request: &ScheduleRequest) -> String {
    format!(
        "{}月{}日 {}点",
        request.start.month(),
        request.start.day(),
        request.start.hour()
    )
}

fn span_end(request: &ScheduleRequest) -> String {
    format!("{}点", request.end.hour())
}
