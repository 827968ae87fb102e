use serde::{Deserialize, Serialize};

use crate::agent::error::AgentError;
use crate::agent::page::PageDriver;

/// One way of locating an element on the surface. Queries carry an ordered
/// list of these; resolution is data-driven, not branching code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// Any element whose `aria-label` contains the value.
    AriaLabelContains { value: String },
    /// Elements of the given role whose visible text or label contains the
    /// text.
    RoleText { role: String, text: String },
    /// Deepest element whose visible text contains the value.
    TextContains { value: String },
    /// A raw CSS selector.
    Css { selector: String },
    /// The nth non-hidden input inside the active dialog. Positional last
    /// resort for unlabeled inputs.
    DialogInput { index: usize },
}

impl Strategy {
    pub fn aria(value: impl Into<String>) -> Self {
        Self::AriaLabelContains { value: value.into() }
    }

    pub fn role_text(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self::RoleText {
            role: role.into(),
            text: text.into(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::TextContains { value: value.into() }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css {
            selector: selector.into(),
        }
    }

    pub fn dialog_input(index: usize) -> Self {
        Self::DialogInput { index }
    }
}

/// An ordered element lookup plus a human-readable target name for logs and
/// not-found messages.
#[derive(Debug, Clone)]
pub struct ElementQuery {
    pub target: String,
    pub strategies: Vec<Strategy>,
}

impl ElementQuery {
    pub fn new(target: impl Into<String>, strategies: Vec<Strategy>) -> Self {
        Self {
            target: target.into(),
            strategies,
        }
    }
}

/// A located element. Carries the winning strategy and match index so later
/// click/fill/read operations can re-find the node.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementHandle {
    pub strategy: Strategy,
    pub index: usize,
}

/// Walks the query's strategies in order; the first strategy with at least
/// one match resolves to its first match in document order. A miss across
/// every strategy is `Ok(None)`, never an error; fatality is decided by the
/// caller.
pub async fn resolve(
    page: &dyn PageDriver,
    query: &ElementQuery,
) -> Result<Option<ElementHandle>, AgentError> {
    for strategy in &query.strategies {
        let count = page.count_matches(strategy).await?;
        if count > 0 {
            log::debug!(target: "agent", "resolved {} via {:?} ({count} match(es))", query.target, strategy);
            return Ok(Some(ElementHandle {
                strategy: strategy.clone(),
                index: 0,
            }));
        }
    }
    log::debug!(target: "agent", "no match for {}", query.target);
    Ok(None)
}
