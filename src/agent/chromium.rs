//! chromium-backed implementations of the page driver and session manager.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{
    Cookie, CookieParam, CookieSameSite, TimeSinceEpoch,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::agent::element::{ElementHandle, Strategy};
use crate::agent::error::AgentError;
use crate::agent::js;
use crate::agent::page::PageDriver;
use crate::agent::session::{self, LoginGate, Session, SessionManager, StorageState, StoredCookie};
use crate::agent::AgentConfig;

/// One chromium tab, addressed through injected JS only.
pub struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    async fn evaluate_js<T: DeserializeOwned>(&self, script: &str) -> Result<T, AgentError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| AgentError::Automation(format!("js evaluation failed: {e}")))?
            .into_value::<T>()
            .map_err(|e| AgentError::Automation(format!("failed to decode js result: {e}")))
    }
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<(), AgentError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| AgentError::NavigateFailed {
                url: url.to_string(),
                details: e.to_string(),
            })?
            .wait_for_navigation()
            .await
            .map_err(|e| AgentError::NavigateFailed {
                url: url.to_string(),
                details: e.to_string(),
            })?;
        Ok(())
    }

    async fn count_matches(&self, strategy: &Strategy) -> Result<usize, AgentError> {
        self.evaluate_js::<usize>(&js::count_script(strategy)).await
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), AgentError> {
        let outcome: js::ClickOutcome = self.evaluate_js(&js::click_script(handle)).await?;
        if !outcome.found {
            return Err(AgentError::Automation(format!(
                "element vanished before click: {:?}",
                handle.strategy
            )));
        }
        if !outcome.clicked {
            return Err(AgentError::Automation(format!(
                "click rejected: {}",
                outcome.reason
            )));
        }
        Ok(())
    }

    async fn fill(&self, handle: &ElementHandle, value: &str) -> Result<(), AgentError> {
        let outcome: js::FillOutcome = self.evaluate_js(&js::fill_script(handle, value)).await?;
        if !outcome.found {
            return Err(AgentError::Automation(format!(
                "element vanished before fill: {:?}",
                handle.strategy
            )));
        }
        if !outcome.filled {
            return Err(AgentError::Automation(format!(
                "fill rejected: {}",
                outcome.reason
            )));
        }
        Ok(())
    }

    async fn read_aria_label(&self, handle: &ElementHandle) -> Result<Option<String>, AgentError> {
        self.evaluate_js::<Option<String>>(&js::read_aria_label_script(handle))
            .await
    }

    async fn read_text(&self, handle: &ElementHandle) -> Result<Option<String>, AgentError> {
        self.evaluate_js::<Option<String>>(&js::read_text_script(handle))
            .await
    }

    async fn screenshot_full_page(&self, path: &Path) -> Result<(), AgentError> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .capture_beyond_viewport(true)
            .build();
        let bytes = self
            .page
            .screenshot(params)
            .await
            .map_err(|e| AgentError::Automation(format!("screenshot failed: {e}")))?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| AgentError::Automation(format!("cannot write screenshot {}: {e}", path.display())))
    }
}

struct LiveSession {
    page: Page,
    browser: Browser,
    handler_task: JoinHandle<()>,
}

/// Launches one chromium per attempt. The first acquire without a credential
/// blob runs headed and blocks on the login gate; every later acquire
/// restores the stored cookies and honors the configured headless flag.
pub struct ChromiumSessionManager {
    config: AgentConfig,
    gate: Arc<dyn LoginGate>,
    // Serializes concurrent first-run acquires so only one login gate opens.
    bootstrap_lock: Mutex<()>,
    live: Mutex<HashMap<Uuid, LiveSession>>,
}

impl ChromiumSessionManager {
    pub fn new(config: AgentConfig, gate: Arc<dyn LoginGate>) -> Self {
        Self {
            config,
            gate,
            bootstrap_lock: Mutex::new(()),
            live: Mutex::new(HashMap::new()),
        }
    }

    async fn launch(&self, headed: bool) -> Result<(Browser, JoinHandle<()>), AgentError> {
        let mut args = vec![
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            "--disable-infobars".to_string(),
            "--disable-extensions".to_string(),
            "--no-first-run".to_string(),
            "--start-maximized".to_string(),
        ];
        if std::env::var("CI").is_ok() || std::env::var("NO_SANDBOX").is_ok() {
            args.push("--no-sandbox".to_string());
        }

        let mut builder = BrowserConfig::builder();
        if let Some(ref bin) = self.config.chrome_binary {
            builder = builder.chrome_executable(bin);
        }
        if headed {
            builder = builder.with_head();
        }
        let config = builder
            .args(args)
            .build()
            .map_err(|e| AgentError::Session(format!("browser config failed: {e}")))?;

        log::info!(target: "session", "launching chromium (headed={headed})");
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AgentError::Session(format!("browser launch failed: {e}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
            log::debug!(target: "session", "chromium event loop exited");
        });

        Ok((browser, handler_task))
    }

    /// Last step of every acquire path: once a session is registered it is
    /// handed to the caller, who owns its release.
    async fn register(
        &self,
        page: Page,
        browser: Browser,
        handler_task: JoinHandle<()>,
    ) -> Session {
        let id = Uuid::new_v4();
        self.live.lock().await.insert(
            id,
            LiveSession {
                page: page.clone(),
                browser,
                handler_task,
            },
        );
        log::info!(target: "session", "session {id} ready");
        Session {
            id,
            page: Arc::new(ChromiumPage::new(page)),
        }
    }

    /// First run: headed browser, human completes login + MFA, then the
    /// cookie set is persisted and the same session serves the attempt.
    /// Any failure after launch tears the browser down before propagating.
    async fn bootstrap(&self) -> Result<Session, AgentError> {
        let (browser, handler_task) = self.launch(true).await?;
        let page = match browser.new_page(self.config.calendar_url.as_str()).await {
            Ok(page) => page,
            Err(e) => {
                teardown(None, browser, handler_task).await;
                return Err(AgentError::Session(format!("cannot open login page: {e}")));
            }
        };

        if let Err(e) = self.gate.wait_for_login().await {
            teardown(Some(page), browser, handler_task).await;
            return Err(e);
        }

        let cookies = match page.get_cookies().await {
            Ok(cookies) => cookies,
            Err(e) => {
                teardown(Some(page), browser, handler_task).await;
                return Err(AgentError::Session(format!(
                    "cannot read cookies after login: {e}"
                )));
            }
        };
        let state = StorageState {
            cookies: cookies.iter().map(stored_from_cookie).collect(),
        };
        if let Err(e) = state.save(&self.config.storage_state_path) {
            teardown(Some(page), browser, handler_task).await;
            return Err(e);
        }
        log::info!(
            target: "session",
            "stored {} cookies to {}",
            state.cookies.len(),
            self.config.storage_state_path.display()
        );

        Ok(self.register(page, browser, handler_task).await)
    }

    async fn restore(&self) -> Result<Session, AgentError> {
        let state = StorageState::load(&self.config.storage_state_path)?;
        let (browser, handler_task) = self.launch(!self.config.headless).await?;
        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                teardown(None, browser, handler_task).await;
                return Err(AgentError::Session(format!("cannot open page: {e}")));
            }
        };

        let params: Vec<CookieParam> = state
            .cookies
            .iter()
            .filter_map(cookie_param_from_stored)
            .collect();
        if let Err(e) = page.set_cookies(params).await {
            teardown(Some(page), browser, handler_task).await;
            return Err(AgentError::Session(format!("cannot restore cookies: {e}")));
        }

        // Navigate before registering: a navigation failure must not leave
        // an unreleasable entry behind.
        if let Err(e) = ChromiumPage::new(page.clone())
            .goto(&self.config.calendar_url)
            .await
        {
            teardown(Some(page), browser, handler_task).await;
            return Err(e);
        }

        Ok(self.register(page, browser, handler_task).await)
    }
}

/// Teardown order: page, browser connection, browser process, handler task.
/// Every step runs even if an earlier one fails.
async fn teardown(page: Option<Page>, mut browser: Browser, handler_task: JoinHandle<()>) {
    if let Some(page) = page {
        if let Err(e) = page.close().await {
            log::warn!(target: "session", "page close failed: {e}");
        }
    }
    if let Err(e) = browser.close().await {
        log::warn!(target: "session", "browser close failed: {e}");
    }
    match tokio::time::timeout(Duration::from_secs(5), browser.wait()).await {
        Ok(Err(e)) => log::warn!(target: "session", "browser exit failed: {e}"),
        Err(_) => {
            log::warn!(target: "session", "browser did not exit in time, killing it");
            browser.kill().await;
        }
        Ok(Ok(_)) => {}
    }
    handler_task.abort();
}

#[async_trait]
impl SessionManager for ChromiumSessionManager {
    async fn acquire(&self) -> Result<Session, AgentError> {
        if session::needs_login_bootstrap(&self.config.storage_state_path) {
            let _guard = self.bootstrap_lock.lock().await;
            // A waiter may arrive after the first bootstrap finished.
            if session::needs_login_bootstrap(&self.config.storage_state_path) {
                return self.bootstrap().await;
            }
        }
        self.restore().await
    }

    async fn release(&self, session: Session) -> Result<(), AgentError> {
        let Some(guts) = self.live.lock().await.remove(&session.id) else {
            log::warn!(target: "session", "release of unknown session {}", session.id);
            return Ok(());
        };
        let LiveSession {
            page,
            browser,
            handler_task,
        } = guts;

        teardown(Some(page), browser, handler_task).await;
        log::info!(target: "session", "session {} released", session.id);
        Ok(())
    }
}

fn stored_from_cookie(cookie: &Cookie) -> StoredCookie {
    StoredCookie {
        name: cookie.name.clone(),
        value: cookie.value.clone(),
        domain: cookie.domain.clone(),
        path: cookie.path.clone(),
        // Session cookies report a negative expiry; they are not worth
        // persisting a timestamp for.
        expires: (!cookie.session && cookie.expires >= 0.0).then_some(cookie.expires),
        http_only: cookie.http_only,
        secure: cookie.secure,
        same_site: cookie.same_site.as_ref().map(same_site_name),
    }
}

fn cookie_param_from_stored(stored: &StoredCookie) -> Option<CookieParam> {
    let mut builder = CookieParam::builder()
        .name(stored.name.clone())
        .value(stored.value.clone())
        .domain(stored.domain.clone())
        .path(stored.path.clone())
        .http_only(stored.http_only)
        .secure(stored.secure);
    if let Some(expires) = stored.expires {
        builder = builder.expires(TimeSinceEpoch::new(expires));
    }
    if let Some(same_site) = stored.same_site.as_deref().and_then(same_site_from_name) {
        builder = builder.same_site(same_site);
    }
    match builder.build() {
        Ok(param) => Some(param),
        Err(e) => {
            log::warn!(target: "session", "skipping unrestorable cookie {}: {e}", stored.name);
            None
        }
    }
}

fn same_site_name(same_site: &CookieSameSite) -> String {
    match same_site {
        CookieSameSite::Strict => "Strict".to_string(),
        CookieSameSite::Lax => "Lax".to_string(),
        CookieSameSite::None => "None".to_string(),
    }
}

fn same_site_from_name(name: &str) -> Option<CookieSameSite> {
    match name {
        "Strict" => Some(CookieSameSite::Strict),
        "Lax" => Some(CookieSameSite::Lax),
        "None" => Some(CookieSameSite::None),
        _ => None,
    }
}
