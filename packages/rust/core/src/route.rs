//! Route classification by path fragment.
//!
//! Matching is plain substring containment. A route may match several fragments;
//! callers that care use [`matching_kinds`] and treat each match independently.

use prospectcue_shared::PageKind;

pub const CONTACTS_PATH: &str = "/contacts/detail/";
/// Bootstrap matches any conversations route.
pub const CONVERSATIONS_PATH: &str = "conversations";
/// After a click only the conversations inbox counts.
pub const CONVERSATIONS_INBOX_PATH: &str = "/conversations/conversations";
pub const OPPORTUNITIES_PATH: &str = "/opportunities/list";
pub const PHONE_SETTINGS_PATH: &str = "/settings/phone_number?tab=manage";

/// Ordered fragment table. Add new page types here and in [`crate::pipeline`].
pub const ROUTE_TABLE: &[(&str, PageKind)] = &[
    (CONTACTS_PATH, PageKind::ContactDetail),
    (CONVERSATIONS_PATH, PageKind::Conversations),
    (OPPORTUNITIES_PATH, PageKind::OpportunitiesList),
    (PHONE_SETTINGS_PATH, PageKind::PhoneNumberSettings),
];

/// First page kind whose fragment `route` contains, or [`PageKind::Other`].
pub fn classify(route: &str) -> PageKind {
    ROUTE_TABLE
        .iter()
        .find(|(fragment, _)| route.contains(fragment))
        .map(|(_, kind)| *kind)
        .unwrap_or(PageKind::Other)
}

/// Every page kind whose fragment `route` contains, in table order.
pub fn matching_kinds(route: &str) -> Vec<PageKind> {
    ROUTE_TABLE
        .iter()
        .filter(|(fragment, _)| route.contains(fragment))
        .map(|(_, kind)| *kind)
        .collect()
}

/// Fragment for `kind` in [`ROUTE_TABLE`], if it has one.
///
/// This is the load-time fragment. For [`PageKind::Conversations`] that is the
/// broad [`CONVERSATIONS_PATH`]; the watcher matches settled clicks against the
/// narrower [`CONVERSATIONS_INBOX_PATH`] instead.
pub fn fragment_for(kind: PageKind) -> Option<&'static str> {
    ROUTE_TABLE
        .iter()
        .find(|(_, k)| *k == kind)
        .map(|(fragment, _)| *fragment)
}
