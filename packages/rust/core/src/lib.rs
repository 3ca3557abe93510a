//! Navigation detection and customization dispatch for ProspectCue.
//!
//! The host CRM is a single-page app: route changes never reload the page, so
//! this crate infers them from clicks and re-runs the matching customization
//! pipeline.
//!
//! - [`route`] — path fragment → [`PageKind`](prospectcue_shared::PageKind)
//! - [`pipeline`] — page kind → ordered [`Step`]s, and the [`Customizations`] seam
//! - [`runner`] — runs a pipeline, isolating each step's failure
//! - [`watcher`] — click → settle delay → decision table → dispatch
//! - [`bootstrap`] — initial dispatch and watcher installation
//! - [`replay`] — scripted sessions against an in-memory host

pub mod bootstrap;
pub mod console;
pub mod host;
pub mod pipeline;
pub mod replay;
pub mod route;
pub mod runner;
pub mod watcher;

pub use bootstrap::{Bootstrap, Session};
pub use host::{ClickEvent, ElementInfo, Host, MemoryHost, PageLocation};
pub use pipeline::{Customizations, Step, pipeline_for};
pub use runner::{Dispatcher, PipelineReport, StepOutcome, run_pipeline};
pub use watcher::{
    Decision, NavigationObservation, NavigationWatcher, WatcherHandle, WatcherState, WatcherStats,
    decide,
};
