//! Pipeline registry: which customization steps run on which page.

use async_trait::async_trait;

use prospectcue_shared::{PageKind, Result};

/// The DOM mutators the engine dispatches to.
///
/// Each method inserts or updates its widgets on the current page and either
/// completes or fails. Implementations own whatever shared record they need to
/// stay idempotent across repeated runs.
#[async_trait]
pub trait Customizations: Send + Sync {
    /// Collapse and decorate the contact detail field groups.
    async fn process_contact_divs(&self) -> Result<()>;

    /// Add show/hide toggles to the contact detail sections.
    async fn add_section_toggle(&self) -> Result<()>;

    /// Add map and copy buttons next to the address fields.
    async fn add_address_buttons(&self) -> Result<()>;

    /// Render tag widgets on the contact page.
    async fn add_tag_elements(&self) -> Result<()>;

    /// Warn when leaving the contact page with unsaved edits.
    async fn attach_save_alert(&self) -> Result<()>;

    /// Look for the "add new tag" prompt and append the tag alert.
    async fn check_new_tag_alert(&self) -> Result<()>;

    /// Refresh the icons on the managed phone number list.
    async fn update_phone_number_icon(&self) -> Result<()>;
}

/// One named customization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    ProcessContactDivs,
    AddSectionToggle,
    AddAddressButtons,
    AddTagElements,
    AttachSaveAlert,
    CheckNewTagAlert,
    UpdatePhoneNumberIcon,
}

impl Step {
    /// Label used in failure reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::ProcessContactDivs => "process contact divs",
            Self::AddSectionToggle => "add section toggle",
            Self::AddAddressButtons => "add address buttons",
            Self::AddTagElements => "add tag elements",
            Self::AttachSaveAlert => "attach save alert",
            Self::CheckNewTagAlert => "check new tag alert",
            Self::UpdatePhoneNumberIcon => "update phone number icon",
        }
    }

    /// Look a step up by its label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.label() == label)
    }

    pub const ALL: [Step; 7] = [
        Self::ProcessContactDivs,
        Self::AddSectionToggle,
        Self::AddAddressButtons,
        Self::AddTagElements,
        Self::AttachSaveAlert,
        Self::CheckNewTagAlert,
        Self::UpdatePhoneNumberIcon,
    ];

    /// Run this step against `customizations`.
    pub async fn invoke(self, customizations: &dyn Customizations) -> Result<()> {
        match self {
            Self::ProcessContactDivs => customizations.process_contact_divs().await,
            Self::AddSectionToggle => customizations.add_section_toggle().await,
            Self::AddAddressButtons => customizations.add_address_buttons().await,
            Self::AddTagElements => customizations.add_tag_elements().await,
            Self::AttachSaveAlert => customizations.attach_save_alert().await,
            Self::CheckNewTagAlert => customizations.check_new_tag_alert().await,
            Self::UpdatePhoneNumberIcon => customizations.update_phone_number_icon().await,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

const CONTACT_DETAIL_PIPELINE: &[Step] = &[
    // Address buttons hang off the sections the earlier steps lay out.
    Step::ProcessContactDivs,
    Step::AddSectionToggle,
    Step::AddAddressButtons,
    Step::AddTagElements,
    Step::AttachSaveAlert,
];

/// Ordered steps for `kind`. Empty for [`PageKind::Other`].
pub fn pipeline_for(kind: PageKind) -> &'static [Step] {
    match kind {
        PageKind::ContactDetail => CONTACT_DETAIL_PIPELINE,
        PageKind::Conversations => &[Step::CheckNewTagAlert],
        PageKind::OpportunitiesList => &[Step::CheckNewTagAlert],
        PageKind::PhoneNumberSettings => &[Step::UpdatePhoneNumberIcon],
        PageKind::Other => &[],
    }
}
