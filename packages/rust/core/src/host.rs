//! Seams to the host page: its location and the clicks it receives.

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use url::Url;

use prospectcue_shared::{ProspectCueError, Result};

// ---------------------------------------------------------------------------
// PageLocation
// ---------------------------------------------------------------------------

/// The parts of `window.location` the engine reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    /// Path component, always starting with `/`.
    pub pathname: String,
    /// Query string including the leading `?`, or empty.
    pub search: String,
    /// Fragment including the leading `#`, or empty.
    pub hash: String,
}

impl PageLocation {
    pub fn from_url(url: &Url) -> Self {
        let search = match url.query() {
            Some(q) if !q.is_empty() => format!("?{q}"),
            _ => String::new(),
        };
        let hash = match url.fragment() {
            Some(f) if !f.is_empty() => format!("#{f}"),
            _ => String::new(),
        };
        Self {
            pathname: url.path().to_string(),
            search,
            hash,
        }
    }

    /// Path plus query string; the string route fragments are matched against.
    pub fn route(&self) -> String {
        format!("{}{}", self.pathname, self.search)
    }

    /// Whether the location carries a non-empty fragment.
    pub fn has_hash(&self) -> bool {
        !self.hash.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// The page the engine is injected into.
pub trait Host: Send + Sync {
    /// The document's current absolute URL.
    fn current_url(&self) -> Url;

    fn location(&self) -> PageLocation {
        PageLocation::from_url(&self.current_url())
    }
}

/// In-memory host whose location only changes when told to.
#[derive(Debug)]
pub struct MemoryHost {
    url: Mutex<Url>,
}

impl MemoryHost {
    pub fn new(url: Url) -> Self {
        Self {
            url: Mutex::new(url),
        }
    }

    /// Create a host from an absolute URL string.
    pub fn parse(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| ProspectCueError::Url(format!("{url}: {e}")))?;
        Ok(Self::new(url))
    }

    fn lock(&self) -> MutexGuard<'_, Url> {
        self.url.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Move to `target`, resolved against the current URL like `history.pushState`.
    pub fn navigate(&self, target: &str) -> Result<Url> {
        let mut url = self.lock();
        let next = url
            .join(target)
            .map_err(|e| ProspectCueError::Url(format!("{target}: {e}")))?;
        *url = next.clone();
        Ok(next)
    }
}

impl Host for MemoryHost {
    fn current_url(&self) -> Url {
        self.lock().clone()
    }
}

// ---------------------------------------------------------------------------
// Click events
// ---------------------------------------------------------------------------

/// One element on a click's propagation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Lowercase tag name, e.g. `a`, `span`.
    pub tag: String,
    /// Raw `href` attribute, if the element has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl ElementInfo {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            href: None,
        }
    }

    pub fn anchor(href: impl Into<String>) -> Self {
        Self {
            tag: "a".into(),
            href: Some(href.into()),
        }
    }
}

/// A click, described by its target and the target's ancestors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    /// Target first, then each parent up to the document.
    pub path: Vec<ElementInfo>,
}

impl ClickEvent {
    pub fn new(path: Vec<ElementInfo>) -> Self {
        Self { path }
    }

    /// Raw `href` of the nearest anchor at or above the target.
    pub fn anchor_href(&self) -> Option<&str> {
        self.path
            .iter()
            .find(|el| el.tag.eq_ignore_ascii_case("a") && el.href.is_some())
            .and_then(|el| el.href.as_deref())
    }

    /// Absolute destination of the nearest anchor, resolved against `base`.
    pub fn anchor_destination(&self, base: &Url) -> Result<Option<Url>> {
        match self.anchor_href() {
            Some(href) => base
                .join(href)
                .map(Some)
                .map_err(|e| ProspectCueError::Url(format!("{href}: {e}"))),
            None => Ok(None),
        }
    }
}
