//! Core domain types for ProspectCue customizations.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PageKind
// ---------------------------------------------------------------------------

/// Logical category of the screen the host app is showing, inferred from the route.
///
/// Never cached: recompute it from the current location for every decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    ContactDetail,
    Conversations,
    OpportunitiesList,
    PhoneNumberSettings,
    Other,
}

impl PageKind {
    /// Human-readable label for log lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::ContactDetail => "contact detail",
            Self::Conversations => "conversations",
            Self::OpportunitiesList => "opportunities list",
            Self::PhoneNumberSettings => "phone number settings",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for PageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// ConsoleColor
// ---------------------------------------------------------------------------

/// Color channel attached to every log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleColor {
    Red,
    Green,
    #[default]
    Blue,
    Yellow,
    Orange,
}

impl ConsoleColor {
    pub fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
        }
    }

    /// CSS color the browser console renders this channel with.
    pub fn swatch(self) -> &'static str {
        match self {
            Self::Red => "#f1889a",
            Self::Green => "#6DECB9",
            Self::Blue => "#88FFF7",
            Self::Yellow => "#FFF6BF",
            Self::Orange => "#f19684",
        }
    }
}

// ---------------------------------------------------------------------------
// AugmentationState
// ---------------------------------------------------------------------------

/// Handles of the address field containers on a contact page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressDivs {
    pub street_label: String,
    pub street_div: String,
    pub city_div: String,
    pub state_div: String,
    pub zip_div: String,
}

/// Plain copy of the augmentation record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentationSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_divs: Option<AddressDivs>,
    pub tags_added: BTreeSet<String>,
    pub contact_divs: BTreeSet<String>,
    pub contact_div_triggers: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_box: Option<String>,
}

/// Record of what the DOM mutators have already inserted.
///
/// Lives for one script lifetime: it survives SPA navigation but starts empty on
/// every full page load. Only mutators touch it; they use it to stay idempotent.
#[derive(Debug, Default)]
pub struct AugmentationState {
    inner: Mutex<AugmentationSnapshot>,
}

impl AugmentationState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AugmentationSnapshot> {
        // A poisoned record is still a valid record.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a tag widget. Returns `false` if it was already present.
    pub fn record_tag(&self, tag: impl Into<String>) -> bool {
        self.lock().tags_added.insert(tag.into())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.lock().tags_added.contains(tag)
    }

    /// Record a processed contact div. Returns `false` if it was already present.
    pub fn record_contact_div(&self, node: impl Into<String>) -> bool {
        self.lock().contact_divs.insert(node.into())
    }

    pub fn has_contact_div(&self, node: &str) -> bool {
        self.lock().contact_divs.contains(node)
    }

    /// Record a contact div toggle trigger. Returns `false` if it was already present.
    pub fn record_contact_div_trigger(&self, node: impl Into<String>) -> bool {
        self.lock().contact_div_triggers.insert(node.into())
    }

    pub fn set_address_divs(&self, divs: AddressDivs) {
        self.lock().address_divs = Some(divs);
    }

    pub fn address_divs(&self) -> Option<AddressDivs> {
        self.lock().address_divs.clone()
    }

    pub fn set_search_box(&self, node: impl Into<String>) {
        self.lock().search_box = Some(node.into());
    }

    pub fn search_box(&self) -> Option<String> {
        self.lock().search_box.clone()
    }

    pub fn snapshot(&self) -> AugmentationSnapshot {
        self.lock().clone()
    }

    /// Forget everything, as a full page reload would.
    pub fn reset(&self) {
        *self.lock() = AugmentationSnapshot::default();
    }
}
