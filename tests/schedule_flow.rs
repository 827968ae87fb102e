use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use calendarBot::agent::element::{ElementHandle, Strategy};
use calendarBot::agent::error::AgentError;
use calendarBot::agent::page::PageDriver;
use calendarBot::agent::session::{self, LoginGate, Session, SessionManager, StorageState};
use calendarBot::agent::{AgentConfig, CalendarAgent, EventScheduler, FailureHook};
use calendarBot::models::labels::SurfaceLabels;
use calendarBot::models::schedule::ScheduleRequest;
use chrono::NaiveDate;
use uuid::Uuid;

#[derive(Clone, Default)]
struct FakeElement {
    aria: String,
    role: String,
    text: String,
}

/// A scripted day view: a flat element list plus a dialog-input count. All
/// interactions are recorded for assertions.
#[derive(Default)]
struct FakePage {
    elements: Mutex<Vec<FakeElement>>,
    dialog_inputs: usize,
    gotos: Mutex<Vec<String>>,
    counts: Mutex<Vec<Strategy>>,
    clicks: Mutex<Vec<Strategy>>,
    fills: Mutex<Vec<(Strategy, String)>>,
    screenshots: AtomicUsize,
}

impl FakePage {
    fn matches(element: &FakeElement, strategy: &Strategy) -> bool {
        match strategy {
            Strategy::AriaLabelContains { value } => element.aria.contains(value),
            Strategy::RoleText { role, text } => {
                element.role == *role
                    && (element.text.contains(text) || element.aria.contains(text))
            }
            Strategy::TextContains { value } => element.text.contains(value),
            Strategy::Css { .. } => false,
            Strategy::DialogInput { .. } => false,
        }
    }

    fn first_match(&self, strategy: &Strategy) -> Option<FakeElement> {
        self.elements
            .lock()
            .unwrap()
            .iter()
            .find(|e| Self::matches(e, strategy))
            .cloned()
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str) -> Result<(), AgentError> {
        self.gotos.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn count_matches(&self, strategy: &Strategy) -> Result<usize, AgentError> {
        self.counts.lock().unwrap().push(strategy.clone());
        if let Strategy::DialogInput { index } = strategy {
            return Ok(usize::from(*index < self.dialog_inputs));
        }
        Ok(self
            .elements
            .lock()
            .unwrap()
            .iter()
            .filter(|e| Self::matches(e, strategy))
            .count())
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), AgentError> {
        self.clicks.lock().unwrap().push(handle.strategy.clone());
        Ok(())
    }

    async fn fill(&self, handle: &ElementHandle, value: &str) -> Result<(), AgentError> {
        self.fills
            .lock()
            .unwrap()
            .push((handle.strategy.clone(), value.to_string()));
        Ok(())
    }

    async fn read_aria_label(&self, handle: &ElementHandle) -> Result<Option<String>, AgentError> {
        Ok(self
            .first_match(&handle.strategy)
            .map(|e| e.aria)
            .filter(|aria| !aria.is_empty()))
    }

    async fn read_text(&self, handle: &ElementHandle) -> Result<Option<String>, AgentError> {
        Ok(self
            .first_match(&handle.strategy)
            .map(|e| e.text)
            .filter(|text| !text.is_empty()))
    }

    async fn screenshot_full_page(&self, _path: &Path) -> Result<(), AgentError> {
        self.screenshots.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeSessions {
    page: Arc<FakePage>,
    acquires: AtomicUsize,
    releases: AtomicUsize,
}

impl FakeSessions {
    fn new(page: Arc<FakePage>) -> Self {
        Self {
            page,
            acquires: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SessionManager for FakeSessions {
    async fn acquire(&self) -> Result<Session, AgentError> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        Ok(Session {
            id: Uuid::new_v4(),
            page: self.page.clone(),
        })
    }

    async fn release(&self, _session: Session) -> Result<(), AgentError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct CountingHook {
    captures: AtomicUsize,
}

#[async_trait]
impl FailureHook for CountingHook {
    async fn capture(&self, _page: &dyn PageDriver, _error: &AgentError) {
        self.captures.fetch_add(1, Ordering::SeqCst);
    }
}

fn fast_config() -> AgentConfig {
    AgentConfig {
        settle_nav_ms: 0,
        settle_menu_ms: 0,
        settle_save_ms: 0,
        ..AgentConfig::default()
    }
}

/// Every control of an empty, schedulable day view.
fn schedulable_elements() -> Vec<FakeElement> {
    vec![
        FakeElement {
            aria: "建立".into(),
            role: "button".into(),
            text: "建立".into(),
        },
        FakeElement {
            role: "menuitem".into(),
            text: "活動".into(),
            ..Default::default()
        },
        FakeElement {
            aria: "新增標題".into(),
            ..Default::default()
        },
        FakeElement {
            aria: "開始時間".into(),
            ..Default::default()
        },
        FakeElement {
            aria: "結束時間".into(),
            ..Default::default()
        },
        FakeElement {
            aria: "儲存".into(),
            role: "button".into(),
            text: "儲存".into(),
        },
    ]
}

fn page_with(elements: Vec<FakeElement>) -> Arc<FakePage> {
    Arc::new(FakePage {
        elements: Mutex::new(elements),
        dialog_inputs: 3,
        ..Default::default()
    })
}

fn request() -> ScheduleRequest {
    let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
    ScheduleRequest::new(
        day.and_hms_opt(10, 0, 0).unwrap(),
        day.and_hms_opt(11, 0, 0).unwrap(),
        "開會",
    )
    .unwrap()
}

fn agent(sessions: Arc<FakeSessions>) -> CalendarAgent {
    CalendarAgent::new(sessions, &fast_config(), SurfaceLabels::default())
        .with_failure_hook(None)
}

fn save_clicks(page: &FakePage) -> usize {
    page.clicks
        .lock()
        .unwrap()
        .iter()
        .filter(|s| matches!(s, Strategy::AriaLabelContains { value } if value == "儲存"))
        .count()
}

fn conflict_probes(page: &FakePage) -> usize {
    page.counts
        .lock()
        .unwrap()
        .iter()
        .filter(|s| **s == Strategy::aria("上午10點"))
        .count()
}

#[tokio::test]
async fn empty_slot_creates_the_event() {
    let page = page_with(schedulable_elements());
    let sessions = Arc::new(FakeSessions::new(page.clone()));

    let outcome = agent(sessions.clone()).attempt_schedule(&request()).await;

    assert!(outcome.created);
    assert_eq!(outcome.message, "");
    assert_eq!(save_clicks(&page), 1);
    assert_eq!(
        page.gotos.lock().unwrap().as_slice(),
        ["https://calendar.google.com/calendar/u/0/r/day/20260314"]
    );
    let fills = page.fills.lock().unwrap();
    assert!(fills.iter().any(|(_, v)| v == "開會"));
    assert!(fills.iter().any(|(_, v)| v == "上午10:00"));
    assert!(fills.iter().any(|(_, v)| v == "上午11:00"));
}

#[tokio::test]
async fn occupied_slot_reports_the_existing_entry() {
    let mut elements = schedulable_elements();
    elements.push(FakeElement {
        aria: "上午10點 - 11點 Team Sync".into(),
        role: "button".into(),
        text: "Team Sync".into(),
    });
    let page = page_with(elements);
    let sessions = Arc::new(FakeSessions::new(page.clone()));

    let outcome = agent(sessions.clone()).attempt_schedule(&request()).await;

    assert!(!outcome.created);
    assert_eq!(outcome.message, "上午10點 - 11點 Team Sync");
    // Creation never starts on a conflict.
    assert!(page.clicks.lock().unwrap().is_empty());
    assert_eq!(sessions.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn conflict_description_falls_back_to_visible_text() {
    let mut elements = schedulable_elements();
    elements.push(FakeElement {
        role: "button".into(),
        text: "上午10點 開會\n會議室A".into(),
        ..Default::default()
    });
    let page = page_with(elements);
    let sessions = Arc::new(FakeSessions::new(page.clone()));

    let outcome = agent(sessions).attempt_schedule(&request()).await;

    assert!(!outcome.created);
    assert_eq!(outcome.message, "上午10點 開會");
}

#[tokio::test]
async fn sessions_are_released_on_every_path() {
    // Success, then conflict, then failure; one release per acquire.
    let page = page_with(schedulable_elements());
    let sessions = Arc::new(FakeSessions::new(page.clone()));
    let agent = agent(sessions.clone());

    agent.attempt_schedule(&request()).await;

    page.elements.lock().unwrap().push(FakeElement {
        aria: "上午10點 繁忙".into(),
        ..Default::default()
    });
    agent.attempt_schedule(&request()).await;

    page.elements.lock().unwrap().clear();
    agent.attempt_schedule(&request()).await;

    assert_eq!(sessions.acquires.load(Ordering::SeqCst), 3);
    assert_eq!(sessions.releases.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn failed_save_invokes_the_hook_and_still_releases() {
    let mut elements = schedulable_elements();
    elements.retain(|e| e.aria != "儲存");
    let page = page_with(elements);
    let sessions = Arc::new(FakeSessions::new(page.clone()));
    let hook = Arc::new(CountingHook::default());
    let agent = CalendarAgent::new(sessions.clone(), &fast_config(), SurfaceLabels::default())
        .with_failure_hook(Some(hook.clone()));

    let outcome = agent.attempt_schedule(&request()).await;

    assert!(outcome.is_failure());
    assert_eq!(hook.captures.load(Ordering::SeqCst), 1);
    assert_eq!(sessions.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retry_after_failure_reruns_the_conflict_probe() {
    let mut elements = schedulable_elements();
    elements.retain(|e| e.aria != "儲存");
    let page = page_with(elements);
    let sessions = Arc::new(FakeSessions::new(page.clone()));
    let agent = agent(sessions.clone());

    let first = agent.attempt_schedule(&request()).await;
    assert!(first.is_failure());
    assert_eq!(conflict_probes(&page), 1);

    // The slot filled up between attempts; the retry must notice.
    page.elements.lock().unwrap().push(FakeElement {
        aria: "上午10點 - 11點 Team Sync".into(),
        ..Default::default()
    });
    let second = agent.attempt_schedule(&request()).await;

    assert_eq!(conflict_probes(&page), 2);
    assert!(!second.created);
    assert_eq!(second.message, "上午10點 - 11點 Team Sync");
}

// A gate-observing manager that takes the same bootstrap-or-restore decision
// as the real one, without launching a browser.
struct GateObservingSessions {
    page: Arc<FakePage>,
    gate: Arc<CountingGate>,
    storage_state_path: std::path::PathBuf,
}

#[derive(Default)]
struct CountingGate {
    waits: AtomicUsize,
}

#[async_trait]
impl LoginGate for CountingGate {
    async fn wait_for_login(&self) -> Result<(), AgentError> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl SessionManager for GateObservingSessions {
    async fn acquire(&self) -> Result<Session, AgentError> {
        if session::needs_login_bootstrap(&self.storage_state_path) {
            self.gate.wait_for_login().await?;
            StorageState::default().save(&self.storage_state_path)?;
        }
        Ok(Session {
            id: Uuid::new_v4(),
            page: self.page.clone(),
        })
    }

    async fn release(&self, _session: Session) -> Result<(), AgentError> {
        Ok(())
    }
}

#[tokio::test]
async fn persisted_credential_skips_the_login_gate() {
    let dir = tempfile::tempdir().unwrap();
    let gate = Arc::new(CountingGate::default());
    let sessions = GateObservingSessions {
        page: page_with(schedulable_elements()),
        gate: gate.clone(),
        storage_state_path: dir.path().join("storage_state.json"),
    };

    let first = sessions.acquire().await.unwrap();
    sessions.release(first).await.unwrap();
    assert_eq!(gate.waits.load(Ordering::SeqCst), 1);

    // The blob now exists; the gate must stay shut.
    let second = sessions.acquire().await.unwrap();
    sessions.release(second).await.unwrap();
    assert_eq!(gate.waits.load(Ordering::SeqCst), 1);
}
