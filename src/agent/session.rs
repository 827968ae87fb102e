use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use inquire::Text;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::error::AgentError;
use crate::agent::page::PageDriver;

/// One live browser session. The id ties log lines and the manager's
/// teardown bookkeeping together.
pub struct Session {
    pub id: Uuid,
    pub page: Arc<dyn PageDriver>,
}

/// Owns the browser lifecycle: `acquire` yields a logged-in session (running
/// the first-run login bootstrap when no credential blob exists yet),
/// `release` tears everything down. Callers must release every acquired
/// session exactly once, on every path.
#[async_trait]
pub trait SessionManager: Send + Sync {
    async fn acquire(&self) -> Result<Session, AgentError>;
    async fn release(&self, session: Session) -> Result<(), AgentError>;
}

/// Blocks until the human confirms the interactive login is complete. No
/// timeout: first-run login plus MFA takes as long as it takes.
#[async_trait]
pub trait LoginGate: Send + Sync {
    async fn wait_for_login(&self) -> Result<(), AgentError>;
}

/// Terminal gate: prints the instructions and waits for a newline, off the
/// async workers so the wait cannot stall unrelated tasks.
pub struct TerminalLoginGate;

#[async_trait]
impl LoginGate for TerminalLoginGate {
    async fn wait_for_login(&self) -> Result<(), AgentError> {
        println!("请在新打开的浏览器窗口中完成 Google 登录和多因子认证。");
        tokio::task::spawn_blocking(|| Text::new("登录完成后请按回车继续").prompt())
            .await
            .map_err(|e| AgentError::Session(format!("login gate task failed: {e}")))?
            .map_err(|e| AgentError::Session(format!("login gate aborted: {e}")))?;
        Ok(())
    }
}

/// The interactive bootstrap runs only while no credential blob exists yet;
/// every later acquire restores the blob instead.
pub fn needs_login_bootstrap(storage_state_path: &Path) -> bool {
    !StorageState::exists(storage_state_path)
}

/// The persisted credential blob. Written once by the login bootstrap and
/// read-only afterwards; nothing outside the session layer interprets it.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StorageState {
    pub cookies: Vec<StoredCookie>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub expires: Option<f64>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<String>,
}

impl StorageState {
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| AgentError::Session(format!("cannot read storage state {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| AgentError::Session(format!("corrupt storage state {}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<(), AgentError> {
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| AgentError::Session(format!("cannot encode storage state: {e}")))?;
        fs::write(path, raw)
            .map_err(|e| AgentError::Session(format!("cannot write storage state {}: {e}", path.display())))
    }
}
