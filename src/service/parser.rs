use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::{Captures, Regex};

use crate::models::schedule::ScheduleRequest;
use crate::service::openai_service::OpenAIClient;

/// Title used when an utterance carries a time span but no recognizable
/// purpose. The conversation layer keys pending-title substitution on it.
pub const UNTITLED_FALLBACK: &str = "未命名日程";

static HOUR_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})[点點时時:](?:到|至|-)(\d{1,2})[点點时時]?").expect("hour span pattern")
});

static NUMERAL_HOUR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([一二三四五六七八九十两]+)([点點时時])").expect("numeral pattern")
});

static BRACE_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{(.+?)\}").expect("brace pattern"));

/// Turns one utterance into a normalized request. `now` is the current wall
/// clock in the assistant's timezone; `None` means no schedule recognized.
#[async_trait]
pub trait ScheduleParser: Send + Sync {
    async fn parse(&self, text: &str, now: NaiveDateTime) -> Option<ScheduleRequest>;
}

/// Rule-based extraction: a relative day word, an optional period word, an
/// hour span, and whatever follows as the title.
pub struct RuleParser;

#[async_trait]
impl ScheduleParser for RuleParser {
    async fn parse(&self, text: &str, now: NaiveDateTime) -> Option<ScheduleRequest> {
        parse_schedule_rules(text, now)
    }
}

pub fn parse_schedule_rules(text: &str, now: NaiveDateTime) -> Option<ScheduleRequest> {
    let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    let day_offset = if text.contains("今天") {
        0
    } else if text.contains("明天") {
        1
    } else if text.contains("后天") || text.contains("後天") {
        2
    } else {
        return None;
    };
    let date = now.date() + Duration::days(day_offset);

    // 上午/早上/早晨 keep the matched hours as they are.
    let is_pm = ["下午", "晚上", "傍晚"].iter().any(|w| text.contains(w));

    let text = normalize_numeral_hours(&text);
    let caps = HOUR_SPAN.captures(&text)?;

    let mut start_hour: u32 = caps[1].parse().ok()?;
    let mut end_hour: u32 = caps[2].parse().ok()?;
    if is_pm && start_hour < 12 {
        start_hour += 12;
    }
    if is_pm && end_hour <= 12 {
        end_hour += 12;
    }

    let after_span = caps.get(0).map(|m| m.end()).unwrap_or(text.len());
    let title = text[after_span..]
        .trim_start_matches(['，', ',', '、', '。', '.', ':', '：'])
        .replace("加上一个日程安排", "")
        .replace("加上一个日程", "");
    let title = if title.is_empty() {
        UNTITLED_FALLBACK.to_string()
    } else {
        title
    };

    let start = date.and_time(NaiveTime::from_hms_opt(start_hour, 0, 0)?);
    let end = date.and_time(NaiveTime::from_hms_opt(end_hour, 0, 0)?);
    ScheduleRequest::new(start, end, title)
}

/// Rewrites Chinese numeral hours that sit directly on an hour marker into
/// digits, so the span pattern only has to know about digits.
fn normalize_numeral_hours(text: &str) -> String {
    NUMERAL_HOUR
        .replace_all(text, |caps: &Captures| match numeral_value(&caps[1]) {
            Some(hour) => format!("{hour}{}", &caps[2]),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn numeral_value(numeral: &str) -> Option<u32> {
    match numeral {
        "两" => return Some(2),
        "十" => return Some(10),
        _ => {}
    }
    if let Some(rest) = numeral.strip_prefix('十') {
        let mut chars = rest.chars();
        let units = single_numeral(chars.next()?)?;
        return chars.next().is_none().then_some(10 + units);
    }
    let mut chars = numeral.chars();
    let value = single_numeral(chars.next()?)?;
    chars.next().is_none().then_some(value)
}

fn single_numeral(c: char) -> Option<u32> {
    "一二三四五六七八九"
        .chars()
        .position(|n| n == c)
        .map(|i| i as u32 + 1)
}

/// Model-assisted extraction. The model replies with a brace-wrapped
/// `{year,month,day,H:MM,H:MM,title}` tuple or `{None}`; transport errors
/// fall back to the rules, a well-formed `{None}` stands.
pub struct OpenAIParser {
    openai: Arc<dyn OpenAIClient>,
    fallback: RuleParser,
}

impl OpenAIParser {
    pub fn new(openai: Arc<dyn OpenAIClient>) -> Self {
        Self {
            openai,
            fallback: RuleParser,
        }
    }
}

#[async_trait]
impl ScheduleParser for OpenAIParser {
    async fn parse(&self, text: &str, now: NaiveDateTime) -> Option<ScheduleRequest> {
        let prompt = format!("Now:{} , {}", now.format("%Y-%m-%d %H:%M"), text);
        match self
            .openai
            .generate_prompt(&prompt, "schedule_extraction")
            .await
        {
            Ok(payload) => {
                log::debug!(target: "parser", "model payload: {payload:?}");
                decode_schedule_payload(&payload)
            }
            Err(err) => {
                log::warn!(target: "parser", "model call failed, using rules: {err}");
                self.fallback.parse(text, now).await
            }
        }
    }
}

/// Decodes the first brace group of a model reply. Titles may contain
/// commas; everything after the fifth field is re-joined.
pub fn decode_schedule_payload(payload: &str) -> Option<ScheduleRequest> {
    let content = BRACE_GROUP.captures(payload)?.get(1)?.as_str().trim();
    if content.is_empty() || content.eq_ignore_ascii_case("none") {
        return None;
    }

    let parts: Vec<&str> = content.split(',').map(str::trim).collect();
    if parts.len() < 6 {
        log::warn!(target: "parser", "incomplete schedule payload: {content:?}");
        return None;
    }

    let year: i32 = parts[0].parse().ok()?;
    let month: u32 = parts[1].parse().ok()?;
    let day: u32 = parts[2].parse().ok()?;
    let (start_hour, start_min) = parse_clock(parts[3])?;
    let (end_hour, end_min) = parse_clock(parts[4])?;
    let title = parts[5..].join(",");

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let start = date.and_hms_opt(start_hour, start_min, 0)?;
    let end = date.and_hms_opt(end_hour, end_min, 0)?;
    ScheduleRequest::new(start, end, title.trim())
}

fn parse_clock(value: &str) -> Option<(u32, u32)> {
    let (hour, minute) = value.split_once(':')?;
    Some((hour.trim().parse().ok()?, minute.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn parses_numeral_hours_and_title() {
        let request = parse_schedule_rules("明天上午十点到十一点，和公司CEO会议", now()).unwrap();
        assert_eq!(request.start.to_string(), "2026-03-15 10:00:00");
        assert_eq!(request.end.to_string(), "2026-03-15 11:00:00");
        assert_eq!(request.title, "和公司CEO会议");
    }

    #[test]
    fn afternoon_shifts_to_24h() {
        let request = parse_schedule_rules("今天下午3点到4点开会", now()).unwrap();
        assert_eq!(request.start.to_string(), "2026-03-14 15:00:00");
        assert_eq!(request.end.to_string(), "2026-03-14 16:00:00");
        assert_eq!(request.title, "开会");
    }

    #[test]
    fn day_after_tomorrow_in_both_scripts() {
        let simplified = parse_schedule_rules("后天10点到11点看牙医", now()).unwrap();
        let traditional = parse_schedule_rules("後天10點到11點看牙医", now()).unwrap();
        assert_eq!(simplified.start, traditional.start);
        assert_eq!(simplified.start.to_string(), "2026-03-16 10:00:00");
    }

    #[test]
    fn missing_day_word_is_not_a_schedule() {
        assert!(parse_schedule_rules("上午十点到十一点开会", now()).is_none());
    }

    #[test]
    fn missing_span_is_not_a_schedule() {
        assert!(parse_schedule_rules("明天提醒我开会", now()).is_none());
    }

    #[test]
    fn bare_span_falls_back_to_untitled() {
        let request = parse_schedule_rules("明天上午10点到11点", now()).unwrap();
        assert_eq!(request.title, UNTITLED_FALLBACK);
    }

    #[test]
    fn filler_phrases_are_stripped_from_titles() {
        let request = parse_schedule_rules("明天10点到11点加上一个日程安排", now()).unwrap();
        assert_eq!(request.title, UNTITLED_FALLBACK);
    }

    #[test]
    fn alternate_span_separators() {
        assert!(parse_schedule_rules("明天10点至11点开会", now()).is_some());
        assert!(parse_schedule_rules("明天10点-11点开会", now()).is_some());
    }

    #[test]
    fn evening_two_oclock_uses_liang() {
        let request = parse_schedule_rules("明天下午两点到四点打麻将", now()).unwrap();
        assert_eq!(request.start.to_string(), "2026-03-15 14:00:00");
        assert_eq!(request.end.to_string(), "2026-03-15 16:00:00");
    }

    #[test]
    fn out_of_range_hours_fail_the_parse() {
        // 下午 pushes the end past 23.
        assert!(parse_schedule_rules("明天下午11点到12点开会", now()).is_none());
    }

    #[test]
    fn decodes_model_payload() {
        let request =
            decode_schedule_payload("好的：{2026,3,15,10:00,11:00,和公司CEO会议}").unwrap();
        assert_eq!(request.start.to_string(), "2026-03-15 10:00:00");
        assert_eq!(request.title, "和公司CEO会议");
    }

    #[test]
    fn model_titles_keep_embedded_commas() {
        let request = decode_schedule_payload("{2026,3,15,10:00,11:00,开会,带笔记本}").unwrap();
        assert_eq!(request.title, "开会,带笔记本");
    }

    #[test]
    fn model_none_is_final() {
        assert!(decode_schedule_payload("{None}").is_none());
        assert!(decode_schedule_payload("{none}").is_none());
    }

    #[test]
    fn repeated_parses_share_the_compiled_patterns() {
        for _ in 0..3 {
            assert!(parse_schedule_rules("明天十点到十一点开会", now()).is_some());
            assert!(decode_schedule_payload("{2026,3,15,10:00,11:00,开会}").is_some());
        }
    }

    #[test]
    fn garbled_model_payloads_are_rejected() {
        assert!(decode_schedule_payload("no braces here").is_none());
        assert!(decode_schedule_payload("{2026,3,15,10:00}").is_none());
        assert!(decode_schedule_payload("{2026,3,15,25:00,26:00,开会}").is_none());
    }
}
