//! Scripted session replay against an in-memory host.
//!
//! A session file describes a page load and the clicks that follow it. Replay
//! boots the engine on a [`MemoryHost`], feeds it the clicks, moves the host's
//! location the way the CRM's router would, and reports what was dispatched.
//!
//! ```toml
//! initial_url = "https://app.example.com/opportunities/list"
//! fail_steps = ["add address buttons"]
//!
//! [[clicks]]
//! target = [{ tag = "span" }, { tag = "a", href = "/contacts/detail/43" }]
//! navigate_to = "/contacts/detail/43"
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use prospectcue_shared::{
    AddressDivs, AugmentationSnapshot, AugmentationState, ConsoleColor, PageKind,
    ProspectCueError, Result, WatcherConfig,
};

use crate::bootstrap::Bootstrap;
use crate::console::log;
use crate::host::{ClickEvent, ElementInfo, MemoryHost};
use crate::pipeline::{Customizations, Step};
use crate::runner::PipelineReport;
use crate::watcher::WatcherStats;

// ---------------------------------------------------------------------------
// Session script
// ---------------------------------------------------------------------------

/// A replayable session, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayScript {
    /// Absolute URL of the initial page load.
    pub initial_url: String,

    /// Overrides the watcher's settle delay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_delay_ms: Option<u64>,

    /// Step labels whose mutators should fail.
    #[serde(default)]
    pub fail_steps: Vec<String>,

    #[serde(default)]
    pub clicks: Vec<ScriptedClick>,
}

/// One click in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedClick {
    /// Clicked element, then its ancestors.
    #[serde(default)]
    pub target: Vec<ElementInfo>,

    /// Where the router moves the location after the click, if anywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigate_to: Option<String>,

    /// Router latency between the click and `navigate_to`.
    #[serde(default = "default_navigate_after_ms")]
    pub navigate_after_ms: u64,

    /// Idle time after this click before the next one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_ms: Option<u64>,
}

fn default_navigate_after_ms() -> u64 {
    50
}

impl ReplayScript {
    pub fn from_toml(content: &str) -> Result<Self> {
        let script: Self = toml::from_str(content)
            .map_err(|e| ProspectCueError::session(format!("invalid session: {e}")))?;
        script.failing_steps()?;
        Ok(script)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ProspectCueError::io(path, e))?;
        Self::from_toml(&content)
    }

    fn failing_steps(&self) -> Result<HashSet<Step>> {
        self.fail_steps
            .iter()
            .map(|label| {
                Step::from_label(label)
                    .ok_or_else(|| ProspectCueError::session(format!("unknown step '{label}'")))
            })
            .collect()
    }

    fn watcher_config(&self, base: WatcherConfig) -> WatcherConfig {
        match self.settle_delay_ms {
            Some(ms) => WatcherConfig {
                settle_delay: Duration::from_millis(ms),
            },
            None => base,
        }
    }
}

// ---------------------------------------------------------------------------
// Recording customizations
// ---------------------------------------------------------------------------

/// Stand-in mutators: record each invocation and fill in the augmentation record.
pub struct RecordingCustomizations {
    state: Arc<AugmentationState>,
    failing: HashSet<Step>,
    invoked: Mutex<Vec<Step>>,
}

impl RecordingCustomizations {
    pub fn new(state: Arc<AugmentationState>, failing: HashSet<Step>) -> Self {
        Self {
            state,
            failing,
            invoked: Mutex::new(Vec::new()),
        }
    }

    /// Steps invoked so far, in order.
    pub fn invoked(&self) -> Vec<Step> {
        self.invoked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn enter(&self, step: Step) -> Result<()> {
        self.invoked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(step);
        if self.failing.contains(&step) {
            return Err(ProspectCueError::dom(format!("{step}: element not found")));
        }
        log(&format!("{step}"), ConsoleColor::Blue);
        Ok(())
    }
}

#[async_trait]
impl Customizations for RecordingCustomizations {
    async fn process_contact_divs(&self) -> Result<()> {
        self.enter(Step::ProcessContactDivs)?;
        self.state.record_contact_div("contact-details");
        Ok(())
    }

    async fn add_section_toggle(&self) -> Result<()> {
        self.enter(Step::AddSectionToggle)?;
        self.state.record_contact_div_trigger("section-toggle");
        Ok(())
    }

    async fn add_address_buttons(&self) -> Result<()> {
        self.enter(Step::AddAddressButtons)?;
        if self.state.address_divs().is_none() {
            self.state.set_address_divs(AddressDivs {
                street_label: "street-label".into(),
                street_div: "street".into(),
                city_div: "city".into(),
                state_div: "state".into(),
                zip_div: "zip".into(),
            });
        }
        Ok(())
    }

    async fn add_tag_elements(&self) -> Result<()> {
        self.enter(Step::AddTagElements)?;
        self.state.record_tag("contact-tags");
        Ok(())
    }

    async fn attach_save_alert(&self) -> Result<()> {
        self.enter(Step::AttachSaveAlert)
    }

    async fn check_new_tag_alert(&self) -> Result<()> {
        self.enter(Step::CheckNewTagAlert)?;
        self.state.record_tag("new-tag-alert");
        Ok(())
    }

    async fn update_phone_number_icon(&self) -> Result<()> {
        self.enter(Step::UpdatePhoneNumberIcon)
    }
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// What a replayed session did.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    /// Pipelines run at load time.
    pub initial: Vec<PipelineReport>,
    /// Watcher counters over all clicks.
    pub watcher: WatcherStats,
    /// Every step invoked, load time and clicks together, in order.
    pub steps: Vec<Step>,
    /// Pipeline runs per page kind.
    pub runs: HashMap<PageKind, usize>,
    /// Augmentation record at the end of the session.
    pub state: AugmentationSnapshot,
}

/// Replay `script` from a fresh page load.
#[instrument(skip_all, fields(initial_url = %script.initial_url))]
pub async fn replay(script: &ReplayScript, config: WatcherConfig) -> Result<ReplayReport> {
    let failing = script.failing_steps()?;
    let config = script.watcher_config(config);

    let host = Arc::new(MemoryHost::parse(&script.initial_url)?);
    let state = Arc::new(AugmentationState::new());
    let customizations = Arc::new(RecordingCustomizations::new(state.clone(), failing));

    let session = Bootstrap::new(host.clone(), customizations.clone(), config)
        .start()
        .await;
    let initial = session.initial_reports().to_vec();

    let default_pause = config.settle_delay + Duration::from_millis(100);
    for (i, click) in script.clicks.iter().enumerate() {
        info!(click = i + 1, target = ?click.target, "replaying click");
        session.click(ClickEvent::new(click.target.clone()))?;

        let mut elapsed = Duration::ZERO;
        if let Some(target) = &click.navigate_to {
            let latency = Duration::from_millis(click.navigate_after_ms);
            tokio::time::sleep(latency).await;
            elapsed = latency;
            let url = host.navigate(target)?;
            info!(%url, "router moved");
        }

        let pause = click.pause_ms.map(Duration::from_millis).unwrap_or(default_pause);
        tokio::time::sleep(pause.saturating_sub(elapsed)).await;
    }

    let runs = session.dispatcher().run_counts();
    let watcher = session.shutdown().await?;

    Ok(ReplayReport {
        initial,
        watcher,
        steps: customizations.invoked(),
        runs,
        state: state.snapshot(),
    })
}
