use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// The semantic label vocabulary of the calendar surface. Each control label
/// carries one entry per script the surface may render (Traditional Chinese,
/// Simplified Chinese, English); queries try them in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceLabels {
    pub create_button: Vec<String>,
    pub event_menu_item: Vec<String>,
    pub title_input: Vec<String>,
    pub start_time_input: Vec<String>,
    pub end_time_input: Vec<String>,
    pub save_button: Vec<String>,
    pub am: String,
    pub pm: String,
    pub hour_suffix: String,
    /// Conflict description of last resort when an entry exposes neither an
    /// accessibility label nor readable text.
    pub busy_placeholder: String,
}

fn list(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for SurfaceLabels {
    fn default() -> Self {
        Self {
            create_button: list(&["建立", "创建", "Create"]),
            event_menu_item: list(&["活動", "活动", "Event"]),
            title_input: list(&["新增標題", "事件标题", "添加标题", "Add title", "Event title"]),
            start_time_input: list(&["開始時間", "开始时间", "Start time"]),
            end_time_input: list(&["結束時間", "结束时间", "End time"]),
            save_button: list(&["儲存", "保存", "Save"]),
            am: "上午".to_string(),
            pm: "下午".to_string(),
            hour_suffix: "點".to_string(),
            busy_placeholder: "已有日程".to_string(),
        }
    }
}

impl SurfaceLabels {
    /// Hour label as the day view renders event blocks, e.g. `上午10點`.
    pub fn hour_label(&self, time: NaiveTime) -> String {
        let (period, hour) = self.split_12h(time);
        format!("{period}{hour}{}", self.hour_suffix)
    }

    /// Value for the creation dialog's time inputs, e.g. `上午10:00`.
    pub fn time_input_value(&self, time: NaiveTime) -> String {
        let (period, hour) = self.split_12h(time);
        format!("{period}{hour}:{:02}", time.minute())
    }

    fn split_12h(&self, time: NaiveTime) -> (&str, u32) {
        let (is_pm, hour) = time.hour12();
        let period = if is_pm { self.pm.as_str() } else { self.am.as_str() };
        (period, hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn hour_label_uses_period_and_12h_clock() {
        let labels = SurfaceLabels::default();
        assert_eq!(labels.hour_label(time(10, 0)), "上午10點");
        assert_eq!(labels.hour_label(time(15, 0)), "下午3點");
        assert_eq!(labels.hour_label(time(0, 0)), "上午12點");
    }

    #[test]
    fn time_input_value_keeps_minutes() {
        let labels = SurfaceLabels::default();
        assert_eq!(labels.time_input_value(time(10, 30)), "上午10:30");
        assert_eq!(labels.time_input_value(time(23, 5)), "下午11:05");
    }
}
