//! Step runner: executes a pipeline, isolating each step's failure.
//!
//! Steps run strictly in order because later ones read DOM that earlier ones
//! wrote. A failing step is reported and the next step runs anyway; there is no
//! aggregate success signal.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde_json::json;
use tracing::{debug, instrument};

use prospectcue_shared::{ConsoleColor, PageKind, ProspectCueError};

use crate::console::{color_log, log};
use crate::pipeline::{Customizations, Step, pipeline_for};

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed(Step),
    Failed { step: Step, error: String },
}

impl StepOutcome {
    pub fn step(&self) -> Step {
        match self {
            Self::Completed(step) | Self::Failed { step, .. } => *step,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Per-step record of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub kind: PageKind,
    pub outcomes: Vec<StepOutcome>,
}

impl PipelineReport {
    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }
}

/// Run every step of `kind`'s pipeline in order.
#[instrument(skip_all, fields(kind = %kind))]
pub async fn run_pipeline(kind: PageKind, customizations: &dyn Customizations) -> PipelineReport {
    let steps = pipeline_for(kind);
    let start = Instant::now();
    let mut outcomes = Vec::with_capacity(steps.len());

    if !steps.is_empty() {
        log(&format!("running {kind} customizations"), ConsoleColor::Green);
    }

    for &step in steps {
        match step.invoke(customizations).await {
            Ok(()) => {
                debug!(step = step.label(), "step complete");
                outcomes.push(StepOutcome::Completed(step));
            }
            Err(e) => {
                let err = ProspectCueError::step(step.label(), e);
                color_log(
                    &format!("error: {err}"),
                    ConsoleColor::Red,
                    Some(&json!({ "step": step.label(), "page": kind.label() })),
                );
                outcomes.push(StepOutcome::Failed {
                    step,
                    error: err.to_string(),
                });
            }
        }
    }

    debug!(
        steps = outcomes.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "pipeline finished"
    );

    PipelineReport { kind, outcomes }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Shared entry point for bootstrap and watcher dispatches.
///
/// Holds the customizations and serializes pipeline runs: a second dispatch
/// waits until the first has attempted all of its steps.
pub struct Dispatcher {
    customizations: Arc<dyn Customizations>,
    running: tokio::sync::Mutex<()>,
    runs: Mutex<HashMap<PageKind, usize>>,
}

impl Dispatcher {
    pub fn new(customizations: Arc<dyn Customizations>) -> Self {
        Self {
            customizations,
            running: tokio::sync::Mutex::new(()),
            runs: Mutex::new(HashMap::new()),
        }
    }

    /// Run `kind`'s pipeline once other in-flight runs have finished.
    pub async fn dispatch(&self, kind: PageKind) -> PipelineReport {
        let _guard = self.running.lock().await;
        if kind != PageKind::Other {
            *self
                .runs
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .entry(kind)
                .or_default() += 1;
        }
        run_pipeline(kind, self.customizations.as_ref()).await
    }

    /// How many times `kind`'s pipeline has been dispatched.
    pub fn runs(&self, kind: PageKind) -> usize {
        self.run_counts().get(&kind).copied().unwrap_or(0)
    }

    pub fn run_counts(&self) -> HashMap<PageKind, usize> {
        self.runs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
