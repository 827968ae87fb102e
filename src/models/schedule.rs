use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// The fixed wording every automation failure surfaces as. Callers recognize
/// the failure case of an [`OperationOutcome`] by comparing against this.
pub const GENERIC_FAILURE_REPLY: &str = "在操作谷歌日历时发生错误，请稍后再试。";

/// A normalized scheduling request: both bounds on the same calendar day,
/// start strictly before end. Immutable once handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub title: String,
}

impl ScheduleRequest {
    /// Rejects bounds that are reversed or spill across midnight, the same
    /// way an unparseable utterance is rejected.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, title: impl Into<String>) -> Option<Self> {
        if start >= end || start.date() != end.date() {
            return None;
        }
        Some(Self {
            start,
            end,
            title: title.into(),
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConflictResult {
    pub has_conflict: bool,
    pub description: String,
}

impl ConflictResult {
    pub fn clear() -> Self {
        Self {
            has_conflict: false,
            description: String::new(),
        }
    }

    /// `description` must be non-empty; the detector substitutes its busy
    /// placeholder before calling this.
    pub fn found(description: impl Into<String>) -> Self {
        Self {
            has_conflict: true,
            description: description.into(),
        }
    }
}

/// The engine's sole return contract. Exactly three shapes:
/// created with an empty message, a conflict carrying its description, or a
/// failure carrying [`GENERIC_FAILURE_REPLY`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationOutcome {
    pub created: bool,
    pub message: String,
}

impl OperationOutcome {
    pub fn created() -> Self {
        Self {
            created: true,
            message: String::new(),
        }
    }

    pub fn conflict(description: impl Into<String>) -> Self {
        Self {
            created: false,
            message: description.into(),
        }
    }

    pub fn failure() -> Self {
        Self {
            created: false,
            message: GENERIC_FAILURE_REPLY.to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        !self.created && self.message == GENERIC_FAILURE_REPLY
    }

    pub fn is_conflict(&self) -> bool {
        !self.created && !self.is_failure()
    }
}
