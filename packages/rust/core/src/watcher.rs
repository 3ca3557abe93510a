//! Navigation watcher: infers SPA route changes from clicks.
//!
//! The host app's router is not observable, so each click captures the route
//! it happened on, waits a fixed settle delay for the router to update the
//! location, then runs the decision table in [`decide`] against the settled
//! location.
//!
//! Every click gets its own settle check and pending checks are never
//! cancelled. Dispatches go through [`Dispatcher`], which serializes pipeline
//! runs, so overlapping checks can repeat a pipeline but never interleave two.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, info, warn};
use url::Url;

use prospectcue_shared::{ConsoleColor, PageKind, ProspectCueError, Result, WatcherConfig};

use crate::console::{color_log, log};
use crate::host::{ClickEvent, Host, PageLocation};
use crate::route::{CONTACTS_PATH, CONVERSATIONS_INBOX_PATH, OPPORTUNITIES_PATH, PHONE_SETTINGS_PATH};
use crate::runner::Dispatcher;

// ---------------------------------------------------------------------------
// Observation & decision table
// ---------------------------------------------------------------------------

/// What a click looked like at the instant it happened. Consumed by one settle check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationObservation {
    /// Route (path plus query) when the click fired.
    pub path_at_click: String,
    /// Resolved destination of the clicked anchor, if any.
    pub anchor_href: Option<Url>,
}

/// Outcome of evaluating one settled click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Hash jump within the same contact page.
    InPageAnchor,
    /// Run `kind`'s pipeline.
    Run { kind: PageKind, reason: &'static str },
    /// Nothing to do.
    Ignore,
}

impl Decision {
    pub fn kind(&self) -> Option<PageKind> {
        match self {
            Self::Run { kind, .. } => Some(*kind),
            Self::InPageAnchor | Self::Ignore => None,
        }
    }
}

/// Decide what a settled click means. The first matching rule wins.
pub fn decide(observation: &NavigationObservation, settled: &PageLocation) -> Decision {
    let before = observation.path_at_click.as_str();
    let after = settled.route();

    if before.contains(CONTACTS_PATH) && after.contains(CONTACTS_PATH) && settled.has_hash() {
        return Decision::InPageAnchor;
    }

    if observation
        .anchor_href
        .as_ref()
        .is_some_and(|href| href.as_str().contains(CONTACTS_PATH))
    {
        return Decision::Run {
            kind: PageKind::ContactDetail,
            reason: "anchor points at a contact page",
        };
    }

    if !before.contains(CONTACTS_PATH) && after.contains(CONTACTS_PATH) {
        return Decision::Run {
            kind: PageKind::ContactDetail,
            reason: "navigated onto a contact page",
        };
    }

    if after.contains(CONVERSATIONS_INBOX_PATH) {
        return Decision::Run {
            kind: PageKind::Conversations,
            reason: "on the conversations page",
        };
    }

    if before.contains(OPPORTUNITIES_PATH) && after.contains(OPPORTUNITIES_PATH) {
        return Decision::Run {
            kind: PageKind::OpportunitiesList,
            reason: "click within the opportunities list",
        };
    }

    if before.contains(PHONE_SETTINGS_PATH) && after.contains(PHONE_SETTINGS_PATH) {
        return Decision::Run {
            kind: PageKind::PhoneNumberSettings,
            reason: "click within phone number settings",
        };
    }

    Decision::Ignore
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

/// `Idle` until a click arrives, `AwaitingSettle` while any settle check is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    AwaitingSettle,
}

/// Counters collected by an installed watcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherStats {
    pub clicks: usize,
    pub in_page_anchors: usize,
    pub ignored: usize,
    /// Settle checks that panicked instead of returning a decision.
    pub failed_checks: usize,
    pub dispatched: HashMap<PageKind, usize>,
}

impl WatcherStats {
    fn record(&mut self, outcome: std::result::Result<Decision, JoinError>) {
        match outcome {
            Ok(Decision::Run { kind, .. }) => *self.dispatched.entry(kind).or_default() += 1,
            Ok(Decision::InPageAnchor) => self.in_page_anchors += 1,
            Ok(Decision::Ignore) => self.ignored += 1,
            Err(e) => {
                color_log(
                    "settle check failed",
                    ConsoleColor::Red,
                    Some(&json!({ "error": e.to_string() })),
                );
                self.failed_checks += 1;
            }
        }
    }

    pub fn dispatches(&self, kind: PageKind) -> usize {
        self.dispatched.get(&kind).copied().unwrap_or(0)
    }
}

/// Click listener that re-dispatches customizations after SPA navigation.
#[derive(Clone)]
pub struct NavigationWatcher {
    host: Arc<dyn Host>,
    dispatcher: Arc<Dispatcher>,
    config: WatcherConfig,
    pending: Arc<AtomicUsize>,
}

/// Returns the watcher to `Idle` when the last pending check ends, even on panic.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.fetch_sub(1, Ordering::SeqCst) == 1 {
            debug!("watcher idle");
        }
    }
}

impl NavigationWatcher {
    pub fn new(host: Arc<dyn Host>, dispatcher: Arc<Dispatcher>, config: WatcherConfig) -> Self {
        Self {
            host,
            dispatcher,
            config,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn state(&self) -> WatcherState {
        if self.pending.load(Ordering::SeqCst) == 0 {
            WatcherState::Idle
        } else {
            WatcherState::AwaitingSettle
        }
    }

    /// Capture the click synchronously: current route plus anchor destination.
    pub fn capture(&self, click: &ClickEvent) -> NavigationObservation {
        let base = self.host.current_url();
        let path_at_click = PageLocation::from_url(&base).route();

        let anchor_href = match click.anchor_destination(&base) {
            Ok(Some(href)) => {
                log(&format!("click was on an anchor element: {href}"), ConsoleColor::Yellow);
                Some(href)
            }
            Ok(None) => {
                log("click was not on an anchor element", ConsoleColor::Yellow);
                None
            }
            Err(e) => {
                color_log(
                    "could not resolve clicked anchor",
                    ConsoleColor::Orange,
                    Some(&json!({ "error": e.to_string() })),
                );
                None
            }
        };

        NavigationObservation {
            path_at_click,
            anchor_href,
        }
    }

    /// Capture `click` now and mark a settle check as pending.
    fn arm(&self, click: &ClickEvent) -> ArmedCheck {
        let observation = self.capture(click);
        if self.pending.fetch_add(1, Ordering::SeqCst) == 0 {
            debug!(path = %observation.path_at_click, "watcher awaiting settle");
        }
        ArmedCheck {
            observation,
            guard: PendingGuard(self.pending.clone()),
        }
    }

    /// The settle check for an armed click, to be polled later.
    fn settle_later(&self, armed: ArmedCheck) -> impl Future<Output = Decision> + Send + use<> {
        let watcher = self.clone();

        async move {
            let ArmedCheck { observation, guard } = armed;
            let _guard = guard;
            tokio::time::sleep(watcher.config.settle_delay).await;
            watcher.settle(observation).await
        }
    }

    /// Handle one click: capture it and schedule its settle check.
    pub fn observe(&self, click: &ClickEvent) -> JoinHandle<Decision> {
        tokio::spawn(self.settle_later(self.arm(click)))
    }

    async fn settle(&self, observation: NavigationObservation) -> Decision {
        let settled = self.host.location();
        let decision = decide(&observation, &settled);

        debug!(
            before = %observation.path_at_click,
            after = %settled.route(),
            hash = %settled.hash,
            ?decision,
            "click settled"
        );

        match decision {
            Decision::InPageAnchor => {
                log("in-page anchor on contact page, skipping", ConsoleColor::Blue);
            }
            Decision::Run { kind, reason } => {
                log(&format!("{reason}, running {kind} customizations"), ConsoleColor::Yellow);
                self.dispatcher.dispatch(kind).await;
            }
            Decision::Ignore => {}
        }

        decision
    }

    /// Install the click listener.
    ///
    /// Clicks go through [`WatcherHandle::click`], which captures them on the
    /// caller's side. The listener runs until the handle is joined, then waits
    /// for pending settle checks.
    pub fn install(self) -> WatcherHandle {
        info!(settle_delay_ms = self.config.settle_delay.as_millis(), "navigation watcher installed");

        let (clicks, mut armed) = mpsc::unbounded_channel::<ArmedCheck>();
        let listener = self.clone();

        let task = tokio::spawn(async move {
            let mut checks = JoinSet::new();
            let mut stats = WatcherStats::default();

            loop {
                tokio::select! {
                    check = armed.recv() => match check {
                        Some(check) => {
                            stats.clicks += 1;
                            checks.spawn(listener.settle_later(check));
                        }
                        None => break,
                    },
                    Some(done) = checks.join_next(), if !checks.is_empty() => stats.record(done),
                }
            }

            while let Some(done) = checks.join_next().await {
                stats.record(done);
            }

            info!(clicks = stats.clicks, "navigation watcher stopped");
            stats
        });

        WatcherHandle {
            watcher: self,
            clicks,
            task,
        }
    }
}

/// A click captured at the moment it fired, with its pending mark held.
struct ArmedCheck {
    observation: NavigationObservation,
    guard: PendingGuard,
}

/// Handle to an installed watcher.
pub struct WatcherHandle {
    watcher: NavigationWatcher,
    clicks: mpsc::UnboundedSender<ArmedCheck>,
    task: JoinHandle<WatcherStats>,
}

impl WatcherHandle {
    /// Deliver a click. The route and anchor are captured before this returns,
    /// so the router may move the location right after.
    pub fn click(&self, click: &ClickEvent) -> Result<()> {
        let armed = self.watcher.arm(click);
        self.clicks
            .send(armed)
            .map_err(|_| ProspectCueError::Task("navigation watcher is not running".into()))
    }

    pub fn state(&self) -> WatcherState {
        self.watcher.state()
    }

    /// Stop accepting clicks, then wait for pending settle checks to drain.
    pub async fn join(self) -> Result<WatcherStats> {
        let Self { clicks, task, .. } = self;
        drop(clicks);
        task.await.map_err(|e| {
            warn!(error = %e, "navigation watcher task failed");
            ProspectCueError::Task(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::host::{ElementInfo, MemoryHost};
    use crate::pipeline::Step;
    use crate::runner::tests::ScriptedSteps;

    const BASE: &str = "https://app.example.com";

    fn loc(path: &str) -> PageLocation {
        PageLocation::from_url(&Url::parse(&format!("{BASE}{path}")).unwrap())
    }

    fn obs(before: &str, anchor: Option<&str>) -> NavigationObservation {
        NavigationObservation {
            path_at_click: before.to_string(),
            anchor_href: anchor.map(|a| Url::parse(&format!("{BASE}{a}")).unwrap()),
        }
    }

    fn harness(start: &str) -> (Arc<MemoryHost>, Arc<ScriptedSteps>, Arc<Dispatcher>, NavigationWatcher) {
        let host = Arc::new(MemoryHost::parse(&format!("{BASE}{start}")).unwrap());
        let steps = Arc::new(ScriptedSteps::default());
        let dispatcher = Arc::new(Dispatcher::new(steps.clone()));
        let watcher = NavigationWatcher::new(host.clone(), dispatcher.clone(), WatcherConfig::default());
        (host, steps, dispatcher, watcher)
    }

    // -----------------------------------------------------------------------
    // Decision table
    // -----------------------------------------------------------------------

    #[test]
    fn hash_jump_on_contact_page_is_skipped() {
        let o = obs("/contacts/detail/42", Some("/contacts/detail/42#notes"));
        assert_eq!(decide(&o, &loc("/contacts/detail/42#notes")), Decision::InPageAnchor);
    }

    #[test]
    fn anchor_to_contact_runs_contact_pipeline() {
        let o = obs("/opportunities/list", Some("/contacts/detail/7"));
        assert_eq!(decide(&o, &loc("/contacts/detail/7")).kind(), Some(PageKind::ContactDetail));

        // router not done yet: the anchor alone is enough
        assert_eq!(decide(&o, &loc("/opportunities/list")).kind(), Some(PageKind::ContactDetail));
    }

    #[test]
    fn programmatic_redirect_onto_contact_page() {
        let o = obs("/dashboard", None);
        assert_eq!(decide(&o, &loc("/contacts/detail/9")).kind(), Some(PageKind::ContactDetail));
    }

    #[test]
    fn contact_to_contact_without_hash() {
        let o = obs("/contacts/detail/42", Some("/contacts/detail/43"));
        assert_eq!(decide(&o, &loc("/contacts/detail/43")).kind(), Some(PageKind::ContactDetail));

        // no anchor and already on a contact page: nothing attributes a navigation
        let o = obs("/contacts/detail/42", None);
        assert_eq!(decide(&o, &loc("/contacts/detail/43")), Decision::Ignore);
    }

    #[test]
    fn conversations_only_needs_the_settled_path() {
        let o = obs("/dashboard", None);
        assert_eq!(
            decide(&o, &loc("/conversations/conversations")).kind(),
            Some(PageKind::Conversations)
        );
        assert_eq!(decide(&o, &loc("/conversations/templates")), Decision::Ignore);
    }

    #[test]
    fn opportunities_and_phone_settings_need_both_sides() {
        let o = obs("/opportunities/list", None);
        assert_eq!(
            decide(&o, &loc("/opportunities/list")).kind(),
            Some(PageKind::OpportunitiesList)
        );
        let o = obs("/dashboard", None);
        assert_eq!(decide(&o, &loc("/opportunities/list")), Decision::Ignore);

        let o = obs("/settings/phone_number?tab=manage", None);
        assert_eq!(
            decide(&o, &loc("/settings/phone_number?tab=manage")).kind(),
            Some(PageKind::PhoneNumberSettings)
        );
        assert_eq!(decide(&o, &loc("/settings/phone_number?tab=buy")), Decision::Ignore);
    }

    #[test]
    fn anchor_rule_beats_conversations() {
        let o = obs("/conversations/conversations", Some("/contacts/detail/1"));
        assert_eq!(
            decide(&o, &loc("/conversations/conversations")).kind(),
            Some(PageKind::ContactDetail)
        );
    }

    // -----------------------------------------------------------------------
    // Settle checks
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn click_without_anchor_on_opportunities_runs_once() {
        let (_host, steps, dispatcher, watcher) = harness("/opportunities/list");
        let click = ClickEvent::new(vec![ElementInfo::new("button"), ElementInfo::new("div")]);

        let decision = watcher.observe(&click).await.unwrap();

        assert_eq!(decision.kind(), Some(PageKind::OpportunitiesList));
        assert_eq!(dispatcher.runs(PageKind::OpportunitiesList), 1);
        assert_eq!(steps.calls(), vec![Step::CheckNewTagAlert]);
    }

    #[tokio::test(start_paused = true)]
    async fn hash_navigation_never_runs_contact_pipeline() {
        let (host, steps, dispatcher, watcher) = harness("/contacts/detail/42");
        let click = ClickEvent::new(vec![ElementInfo::anchor("#notes")]);

        let handle = watcher.observe(&click);
        host.navigate("#notes").unwrap();
        assert_eq!(handle.await.unwrap(), Decision::InPageAnchor);

        assert_eq!(dispatcher.runs(PageKind::ContactDetail), 0);
        assert!(steps.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn anchor_click_runs_contact_pipeline_once_within_settle_window() {
        let (host, steps, dispatcher, watcher) = harness("/opportunities/list");
        let click = ClickEvent::new(vec![
            ElementInfo::new("span"),
            ElementInfo::anchor("/contacts/detail/43"),
        ]);

        let started = tokio::time::Instant::now();
        let handle = watcher.observe(&click);
        assert_eq!(watcher.state(), WatcherState::AwaitingSettle);
        host.navigate("/contacts/detail/43").unwrap();

        let decision = handle.await.unwrap();
        assert_eq!(decision.kind(), Some(PageKind::ContactDetail));
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert!(started.elapsed() < Duration::from_millis(600));
        assert_eq!(dispatcher.runs(PageKind::ContactDetail), 1);
        assert_eq!(steps.calls().len(), 5);
        assert_eq!(watcher.state(), WatcherState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn location_is_read_after_the_delay() {
        let (host, _steps, dispatcher, watcher) = harness("/dashboard");
        let handle = watcher.observe(&ClickEvent::default());

        tokio::time::sleep(Duration::from_millis(300)).await;
        host.navigate("/conversations/conversations").unwrap();

        assert_eq!(handle.await.unwrap().kind(), Some(PageKind::Conversations));
        assert_eq!(dispatcher.runs(PageKind::Conversations), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn installed_watcher_handles_every_click() {
        let (host, _steps, dispatcher, watcher) = harness("/opportunities/list");
        let handle = watcher.install();

        // double click: two independent settle checks
        handle.click(&ClickEvent::default()).unwrap();
        handle.click(&ClickEvent::default()).unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        host.navigate("/dashboard").unwrap();
        handle.click(&ClickEvent::default()).unwrap();

        let stats = handle.join().await.unwrap();
        assert_eq!(stats.clicks, 3);
        assert_eq!(stats.dispatches(PageKind::OpportunitiesList), 2);
        assert_eq!(stats.ignored, 1);
        assert_eq!(dispatcher.runs(PageKind::OpportunitiesList), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_steps_do_not_uninstall_the_watcher() {
        let host = Arc::new(MemoryHost::parse(&format!("{BASE}/dashboard")).unwrap());
        let steps = Arc::new(ScriptedSteps::failing(&Step::ALL));
        let dispatcher = Arc::new(Dispatcher::new(steps.clone()));
        let watcher = NavigationWatcher::new(host.clone(), dispatcher.clone(), WatcherConfig::default());
        let handle = watcher.install();

        handle.click(&ClickEvent::new(vec![ElementInfo::anchor("/contacts/detail/1")])).unwrap();
        host.navigate("/contacts/detail/1").unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        host.navigate("/conversations/conversations").unwrap();
        handle.click(&ClickEvent::default()).unwrap();

        let stats = handle.join().await.unwrap();
        assert_eq!(stats.dispatches(PageKind::ContactDetail), 1);
        assert_eq!(stats.dispatches(PageKind::Conversations), 1);
        assert_eq!(stats.failed_checks, 0);
        assert_eq!(steps.calls().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn installed_watcher_captures_before_the_router_moves() {
        let (host, steps, dispatcher, watcher) = harness("/dashboard");
        let handle = watcher.install();

        // router moves in the same tick as the click, before the listener runs
        handle.click(&ClickEvent::default()).unwrap();
        host.navigate("/contacts/detail/5").unwrap();

        let stats = handle.join().await.unwrap();
        assert_eq!(stats.dispatches(PageKind::ContactDetail), 1);
        assert_eq!(dispatcher.runs(PageKind::ContactDetail), 1);
        assert_eq!(steps.calls().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn handle_reports_pending_checks() {
        let (_host, _steps, _dispatcher, watcher) = harness("/dashboard");
        let handle = watcher.install();
        assert_eq!(handle.state(), WatcherState::Idle);

        handle.click(&ClickEvent::default()).unwrap();
        assert_eq!(handle.state(), WatcherState::AwaitingSettle);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(handle.state(), WatcherState::Idle);

        let stats = handle.join().await.unwrap();
        assert_eq!(stats.ignored, 1);
    }
}
