//! Script-load entry point: initial dispatch, then watcher installation.

use std::sync::Arc;

use tracing::{info, instrument};

use prospectcue_shared::{ConsoleColor, Result, WatcherConfig};

use crate::console::log;
use crate::host::{ClickEvent, Host};
use crate::pipeline::Customizations;
use crate::route::matching_kinds;
use crate::runner::{Dispatcher, PipelineReport};
use crate::watcher::{NavigationWatcher, WatcherHandle, WatcherState, WatcherStats};

/// Everything needed to start customizing one page load.
pub struct Bootstrap {
    host: Arc<dyn Host>,
    dispatcher: Arc<Dispatcher>,
    config: WatcherConfig,
}

impl Bootstrap {
    /// Bootstrap with the compiled-in [`SETTLE_DELAY`](prospectcue_shared::SETTLE_DELAY).
    pub fn with_defaults(host: Arc<dyn Host>, customizations: Arc<dyn Customizations>) -> Self {
        Self::new(host, customizations, WatcherConfig::default())
    }

    /// Bootstrap with an explicit watcher config.
    ///
    /// The settle delay is overridden only by the replay harness (config file
    /// or session script). Page loads use [`Bootstrap::with_defaults`].
    pub fn new(
        host: Arc<dyn Host>,
        customizations: Arc<dyn Customizations>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            host,
            dispatcher: Arc::new(Dispatcher::new(customizations)),
            config,
        }
    }

    /// Run the pipelines for the current route and install the watcher.
    ///
    /// Consumes the bootstrap, so each page load installs exactly one watcher.
    #[instrument(skip_all)]
    pub async fn start(self) -> Session {
        log("Starting prospectcue customizations", ConsoleColor::Green);

        let location = self.host.location();
        let route = location.route();
        let mut initial = Vec::new();

        // No "before" state on a fresh load: every matching page kind runs.
        for kind in matching_kinds(&route) {
            log(&format!("loaded on {kind} page"), ConsoleColor::Yellow);
            initial.push(self.dispatcher.dispatch(kind).await);
        }

        info!(%route, pipelines = initial.len(), "initial customizations done");

        let watcher =
            NavigationWatcher::new(self.host, self.dispatcher.clone(), self.config).install();

        Session {
            initial,
            watcher,
            dispatcher: self.dispatcher,
        }
    }
}

/// A running page load and its installed watcher.
pub struct Session {
    initial: Vec<PipelineReport>,
    watcher: WatcherHandle,
    dispatcher: Arc<Dispatcher>,
}

impl Session {
    /// Reports of the pipelines run at load time.
    pub fn initial_reports(&self) -> &[PipelineReport] {
        &self.initial
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Deliver a click to the watcher. The click is captured before this returns.
    pub fn click(&self, click: ClickEvent) -> Result<()> {
        self.watcher.click(&click)
    }

    /// `AwaitingSettle` while any settle check is pending.
    pub fn state(&self) -> WatcherState {
        self.watcher.state()
    }

    /// Stop feeding clicks, wait for pending settle checks, and return watcher stats.
    pub async fn shutdown(self) -> Result<WatcherStats> {
        self.watcher.join().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::host::{ElementInfo, MemoryHost};
    use crate::pipeline::Step;
    use crate::runner::tests::ScriptedSteps;
    use prospectcue_shared::{PageKind, SETTLE_DELAY};

    async fn boot(url: &str) -> (Arc<MemoryHost>, Arc<ScriptedSteps>, Session) {
        let host = Arc::new(MemoryHost::parse(url).unwrap());
        let steps = Arc::new(ScriptedSteps::default());
        let session = Bootstrap::with_defaults(host.clone(), steps.clone())
            .start()
            .await;
        (host, steps, session)
    }

    #[tokio::test(start_paused = true)]
    async fn conversations_load_runs_tag_alert_once() {
        let (_host, steps, session) =
            boot("https://app.example.com/conversations/conversations").await;

        assert_eq!(session.initial_reports().len(), 1);
        assert_eq!(session.initial_reports()[0].kind, PageKind::Conversations);
        assert_eq!(session.dispatcher().runs(PageKind::Conversations), 1);
        assert_eq!(steps.calls(), vec![Step::CheckNewTagAlert]);

        let stats = session.shutdown().await.unwrap();
        assert_eq!(stats.clicks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn contact_load_runs_contact_pipeline() {
        let (_host, steps, session) = boot("https://app.example.com/contacts/detail/42").await;
        assert_eq!(session.dispatcher().runs(PageKind::ContactDetail), 1);
        assert_eq!(steps.calls().len(), 5);
        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn phone_settings_load_uses_query_string() {
        let (_host, steps, session) =
            boot("https://app.example.com/settings/phone_number?tab=manage").await;
        assert_eq!(steps.calls(), vec![Step::UpdatePhoneNumberIcon]);
        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_load_runs_nothing_but_watches() {
        let (host, steps, session) = boot("https://app.example.com/dashboard").await;
        assert!(session.initial_reports().is_empty());
        assert!(steps.calls().is_empty());

        session
            .click(ClickEvent::new(vec![ElementInfo::anchor("/contacts/detail/5")]))
            .unwrap();
        host.navigate("/contacts/detail/5").unwrap();

        let stats = session.shutdown().await.unwrap();
        assert_eq!(stats.dispatches(PageKind::ContactDetail), 1);
        assert_eq!(steps.calls().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn compound_route_runs_each_match() {
        let (_host, steps, session) =
            boot("https://app.example.com/contacts/detail/42/conversations").await;
        assert_eq!(session.initial_reports().len(), 2);
        assert_eq!(steps.calls().last(), Some(&Step::CheckNewTagAlert));
        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn router_moving_in_the_click_tick_is_seen() {
        let (host, steps, session) = boot("https://app.example.com/dashboard").await;

        session.click(ClickEvent::default()).unwrap();
        host.navigate("/contacts/detail/5").unwrap();

        assert_eq!(session.dispatcher().runs(PageKind::ContactDetail), 0);
        let stats = session.shutdown().await.unwrap();
        assert_eq!(stats.dispatches(PageKind::ContactDetail), 1);
        assert_eq!(steps.calls().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn session_state_follows_settle_checks() {
        let (_host, _steps, session) = boot("https://app.example.com/dashboard").await;
        assert_eq!(session.state(), WatcherState::Idle);

        let started = tokio::time::Instant::now();
        session.click(ClickEvent::default()).unwrap();
        assert_eq!(session.state(), WatcherState::AwaitingSettle);

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(session.state(), WatcherState::AwaitingSettle);

        tokio::time::sleep(Duration::from_millis(101)).await;
        assert_eq!(session.state(), WatcherState::Idle);
        assert!(started.elapsed() >= SETTLE_DELAY);

        let stats = session.shutdown().await.unwrap();
        assert_eq!(stats.ignored, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn anchor_between_contacts_runs_contact_pipeline_once() {
        let (host, steps, session) = boot("https://app.example.com/contacts/detail/42").await;
        assert_eq!(session.dispatcher().runs(PageKind::ContactDetail), 1);
        let loaded = steps.calls().len();

        session
            .click(ClickEvent::new(vec![
                ElementInfo::new("span"),
                ElementInfo::anchor("/contacts/detail/43"),
            ]))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        host.navigate("/contacts/detail/43").unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(session.dispatcher().runs(PageKind::ContactDetail), 2);
        assert_eq!(steps.calls().len() - loaded, 5);

        let stats = session.shutdown().await.unwrap();
        assert_eq!(stats.dispatches(PageKind::ContactDetail), 1);
        assert_eq!(stats.in_page_anchors, 0);
    }
}
