//! Dialog wrappers.
//!
//! Every dialog kind exposes the same small surface through
//! [`DialogSurface`] (`text`, `visible`, `wait_until_destroyed`, `dismiss`)
//! plus its own buttons and fields. [`AnyDialog`] covers "whichever dialog
//! is open" as a tagged variant.

use super::{button, click, click_named, emulator, Emulator};
use crate::matcher::satisfies;
use crate::node::UiNode;
use crate::query::{Query, OBJECT_NAME};
use crate::result::{PilotError, PilotResult};
use crate::value::Value;
use crate::wait::{eventually_with, WaitOptions};

/// Behavior shared by every dialog kind
pub trait DialogSurface {
    /// Root node of the dialog
    fn surface(&self) -> &UiNode;

    /// Click the button that closes the dialog without accepting it
    /// (OK for an alert)
    fn dismiss(&self) -> PilotResult<()>;

    /// Message text
    fn text(&self) -> PilotResult<String> {
        self.surface().text()
    }

    /// Whether the dialog is showing
    fn visible(&self) -> PilotResult<bool> {
        self.surface().visible()
    }

    /// Block until the dialog is showing
    fn wait_until_visible(&self) -> PilotResult<()> {
        self.surface().wait_until_visible()
    }

    /// Block until the dialog is gone
    fn wait_until_destroyed(&self) -> PilotResult<()> {
        self.surface().wait_until_destroyed()
    }
}

macro_rules! dialog_surface {
    ($ty:ident, $dismiss:literal) => {
        impl DialogSurface for $ty {
            fn surface(&self) -> &UiNode {
                &self.node
            }

            fn dismiss(&self) -> PilotResult<()> {
                click_named(&self.node, $dismiss)
            }
        }
    };
}

/// Replace the text of an input field: focus, erase, type
fn replace_text(field: &UiNode, text: &str) -> PilotResult<()> {
    let session = field.session()?;
    session.pointer().click_object(field)?;
    let keyboard = session.keyboard();
    for _ in 0..field.text()?.chars().count() {
        keyboard.press_key("Backspace")?;
    }
    keyboard.type_text(text)
}

// =============================================================================
// JAVASCRIPT DIALOGS
// =============================================================================

/// `alert()`
#[derive(Debug, Clone)]
pub struct AlertDialog {
    node: UiNode,
}

emulator!(AlertDialog, "Dialog", "alertDialog");
dialog_surface!(AlertDialog, "okButton");

impl AlertDialog {
    /// OK button
    pub fn ok_button(&self) -> PilotResult<UiNode> {
        button(&self.node, "okButton")
    }

    /// Click OK
    pub fn click_ok(&self) -> PilotResult<()> {
        click(&self.ok_button()?)
    }
}

/// `confirm()`
#[derive(Debug, Clone)]
pub struct ConfirmDialog {
    node: UiNode,
}

emulator!(ConfirmDialog, "Dialog", "confirmDialog");
dialog_surface!(ConfirmDialog, "cancelButton");

impl ConfirmDialog {
    /// OK button
    pub fn ok_button(&self) -> PilotResult<UiNode> {
        button(&self.node, "okButton")
    }

    /// Cancel button
    pub fn cancel_button(&self) -> PilotResult<UiNode> {
        button(&self.node, "cancelButton")
    }

    /// Click OK
    pub fn click_ok(&self) -> PilotResult<()> {
        click(&self.ok_button()?)
    }

    /// Click Cancel
    pub fn click_cancel(&self) -> PilotResult<()> {
        click(&self.cancel_button()?)
    }
}

/// `prompt()`
#[derive(Debug, Clone)]
pub struct PromptDialog {
    node: UiNode,
}

emulator!(PromptDialog, "Dialog", "promptDialog");
dialog_surface!(PromptDialog, "cancelButton");

impl PromptDialog {
    /// Input field, prefilled with the prompt's default value
    pub fn input_text_field(&self) -> PilotResult<UiNode> {
        self.node
            .select_single(&Query::of_type("TextField").with_name("inputTextField"))
    }

    /// Current input
    pub fn input_text(&self) -> PilotResult<String> {
        self.input_text_field()?.text()
    }

    /// Replace the input with `text`
    pub fn write_input(&self, text: &str) -> PilotResult<()> {
        replace_text(&self.input_text_field()?, text)
    }

    /// OK button
    pub fn ok_button(&self) -> PilotResult<UiNode> {
        button(&self.node, "okButton")
    }

    /// Cancel button
    pub fn cancel_button(&self) -> PilotResult<UiNode> {
        button(&self.node, "cancelButton")
    }

    /// Click OK
    pub fn click_ok(&self) -> PilotResult<()> {
        click(&self.ok_button()?)
    }

    /// Click Cancel
    pub fn click_cancel(&self) -> PilotResult<()> {
        click(&self.cancel_button()?)
    }
}

/// `onbeforeunload` confirmation
#[derive(Debug, Clone)]
pub struct BeforeUnloadDialog {
    node: UiNode,
}

emulator!(BeforeUnloadDialog, "Dialog", "beforeUnloadDialog");
dialog_surface!(BeforeUnloadDialog, "stayButton");

impl BeforeUnloadDialog {
    /// Leave the page
    pub fn leave_button(&self) -> PilotResult<UiNode> {
        button(&self.node, "leaveButton")
    }

    /// Stay on the page
    pub fn stay_button(&self) -> PilotResult<UiNode> {
        button(&self.node, "stayButton")
    }

    /// Click Leave
    pub fn click_leave(&self) -> PilotResult<()> {
        click(&self.leave_button()?)
    }

    /// Click Stay
    pub fn click_stay(&self) -> PilotResult<()> {
        click(&self.stay_button()?)
    }
}

// =============================================================================
// PERMISSION AND AUTH DIALOGS
// =============================================================================

/// HTTP Basic authentication prompt
#[derive(Debug, Clone)]
pub struct HttpAuthDialog {
    node: UiNode,
}

emulator!(HttpAuthDialog, "Dialog", "httpAuthenticationDialog");
dialog_surface!(HttpAuthDialog, "denyButton");

impl HttpAuthDialog {
    /// Username field
    pub fn username_field(&self) -> PilotResult<UiNode> {
        self.node
            .select_single(&Query::of_type("TextField").with_name("username"))
    }

    /// Password field
    pub fn password_field(&self) -> PilotResult<UiNode> {
        self.node
            .select_single(&Query::of_type("TextField").with_name("password"))
    }

    /// Accept button
    pub fn allow_button(&self) -> PilotResult<UiNode> {
        button(&self.node, "allowButton")
    }

    /// Cancel button
    pub fn deny_button(&self) -> PilotResult<UiNode> {
        button(&self.node, "denyButton")
    }

    /// Fill in both fields and accept
    pub fn authenticate(&self, username: &str, password: &str) -> PilotResult<()> {
        replace_text(&self.username_field()?, username)?;
        replace_text(&self.password_field()?, password)?;
        click(&self.allow_button()?)
    }
}

/// Camera/microphone access request
#[derive(Debug, Clone)]
pub struct MediaAccessDialog {
    node: UiNode,
}

emulator!(MediaAccessDialog, "Dialog", "mediaAccessDialog");
dialog_surface!(MediaAccessDialog, "denyButton");

impl MediaAccessDialog {
    /// Allow button
    pub fn allow_button(&self) -> PilotResult<UiNode> {
        button(&self.node, "allowButton")
    }

    /// Deny button
    pub fn deny_button(&self) -> PilotResult<UiNode> {
        button(&self.node, "denyButton")
    }

    /// Click Allow
    pub fn click_allow(&self) -> PilotResult<()> {
        click(&self.allow_button()?)
    }

    /// Click Deny
    pub fn click_deny(&self) -> PilotResult<()> {
        click(&self.deny_button()?)
    }
}

/// Location access request
#[derive(Debug, Clone)]
pub struct GeolocationDialog {
    node: UiNode,
}

emulator!(GeolocationDialog, "GeolocationPermissionRequest");
dialog_surface!(GeolocationDialog, "denyButton");

impl GeolocationDialog {
    /// Allow button
    pub fn allow_button(&self) -> PilotResult<UiNode> {
        button(&self.node, "allowButton")
    }

    /// Deny button
    pub fn deny_button(&self) -> PilotResult<UiNode> {
        button(&self.node, "denyButton")
    }

    /// Click Allow
    pub fn click_allow(&self) -> PilotResult<()> {
        click(&self.allow_button()?)
    }

    /// Click Deny
    pub fn click_deny(&self) -> PilotResult<()> {
        click(&self.deny_button()?)
    }
}

/// Popover shown after bookmarking a page
#[derive(Debug, Clone)]
pub struct BookmarkOptions {
    node: UiNode,
}

emulator!(BookmarkOptions, "BookmarkOptions", "bookmarkOptions");
dialog_surface!(BookmarkOptions, "okButton");

impl BookmarkOptions {
    /// Folder selector
    pub fn folder_selector(&self) -> PilotResult<UiNode> {
        self.node.select_single(
            &Query::of_type("OptionSelector").with_name("bookmarkFolderSelector"),
        )
    }

    /// Folder the bookmark is saved in (`""` for the default folder)
    pub fn save_in_folder(&self) -> PilotResult<String> {
        self.folder_selector()?.get("selectedText")
    }

    /// Title field
    pub fn title_field(&self) -> PilotResult<UiNode> {
        self.node
            .select_single(&Query::of_type("TextField").with_name("titleTextField"))
    }

    /// Replace the bookmark title
    pub fn set_title(&self, title: &str) -> PilotResult<()> {
        replace_text(&self.title_field()?, title)
    }

    /// Close the popover, keeping the bookmark
    pub fn click_dismiss_button(&self) -> PilotResult<()> {
        click_named(&self.node, "okButton")
    }
}

// =============================================================================
// ANY DIALOG
// =============================================================================

/// Whichever dialog is showing
#[derive(Debug, Clone)]
pub enum AnyDialog {
    /// `alert()`
    Alert(AlertDialog),
    /// `confirm()`
    Confirm(ConfirmDialog),
    /// `prompt()`
    Prompt(PromptDialog),
    /// `onbeforeunload`
    BeforeUnload(BeforeUnloadDialog),
    /// HTTP authentication
    HttpAuth(HttpAuthDialog),
    /// Media access
    MediaAccess(MediaAccessDialog),
    /// Geolocation
    Geolocation(GeolocationDialog),
    /// Bookmark options
    BookmarkOptions(BookmarkOptions),
}

impl AnyDialog {
    fn classify(node: UiNode) -> PilotResult<Option<Self>> {
        if node.type_name() == GeolocationDialog::TYPE_NAME {
            return Ok(Some(Self::Geolocation(GeolocationDialog::from_node(node))));
        }
        if node.type_name() == BookmarkOptions::TYPE_NAME {
            return Ok(Some(Self::BookmarkOptions(BookmarkOptions::from_node(node))));
        }
        let name = match node.property(OBJECT_NAME)? {
            Value::String(name) => name,
            _ => return Ok(None),
        };
        Ok(match name.as_str() {
            "alertDialog" => Some(Self::Alert(AlertDialog::from_node(node))),
            "confirmDialog" => Some(Self::Confirm(ConfirmDialog::from_node(node))),
            "promptDialog" => Some(Self::Prompt(PromptDialog::from_node(node))),
            "beforeUnloadDialog" => Some(Self::BeforeUnload(BeforeUnloadDialog::from_node(node))),
            "httpAuthenticationDialog" => Some(Self::HttpAuth(HttpAuthDialog::from_node(node))),
            "mediaAccessDialog" => Some(Self::MediaAccess(MediaAccessDialog::from_node(node))),
            _ => None,
        })
    }

    fn find_once(scope: &UiNode) -> PilotResult<Self> {
        let mut candidates = scope.select_many(&Query::of_type("Dialog"))?;
        candidates.extend(scope.select_many(&GeolocationDialog::query())?);
        candidates.extend(scope.select_many(&BookmarkOptions::query())?);
        let mut found = Vec::new();
        for node in candidates {
            if let Some(dialog) = Self::classify(node)? {
                found.push(dialog);
            }
        }
        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(PilotError::NotFound {
                query: "any dialog".into(),
            }),
            count => Err(PilotError::Ambiguous {
                query: "any dialog".into(),
                count,
            }),
        }
    }

    /// Wait for exactly one dialog below `scope`
    pub fn find(scope: &UiNode) -> PilotResult<Self> {
        let options = WaitOptions::from_config(scope.session()?.config());
        eventually_with(
            &options,
            || Self::find_once(scope),
            satisfies("a single dialog", |_: &Self| true),
        )
    }

    fn inner(&self) -> &dyn DialogSurface {
        match self {
            Self::Alert(d) => d,
            Self::Confirm(d) => d,
            Self::Prompt(d) => d,
            Self::BeforeUnload(d) => d,
            Self::HttpAuth(d) => d,
            Self::MediaAccess(d) => d,
            Self::Geolocation(d) => d,
            Self::BookmarkOptions(d) => d,
        }
    }
}

impl DialogSurface for AnyDialog {
    fn surface(&self) -> &UiNode {
        self.inner().surface()
    }

    fn dismiss(&self) -> PilotResult<()> {
        self.inner().dismiss()
    }
}
