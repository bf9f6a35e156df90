use super::{
    emulator, AddressBar, AlertDialog, AnyDialog, BeforeUnloadDialog, BookmarkOptions, Chrome,
    ConfirmDialog, ContextMenu, Emulator, FindInPageBar, GeolocationDialog, HistoryView,
    HttpAuthDialog, MediaAccessDialog, NewTabView, PromptDialog, SadTab, SettingsPage,
    Suggestions, TabsView,
};
use crate::matcher::satisfies;
use crate::node::UiNode;
use crate::query::Query;
use crate::result::PilotResult;
use crate::wait::{eventually_with, WaitOptions};

/// Browser main window
#[derive(Debug, Clone)]
pub struct Browser {
    node: UiNode,
}

emulator!(Browser, "Browser");

impl Browser {
    /// Whether the window uses the wide (desktop/tablet) layout
    pub fn wide(&self) -> PilotResult<bool> {
        self.node.get("wide")
    }

    /// Whether this is a private-browsing window
    pub fn incognito(&self) -> PilotResult<bool> {
        self.node.get("incognito")
    }

    /// Toolbar. `NotFound` when running chromeless.
    pub fn chrome(&self) -> PilotResult<Chrome> {
        self.node.select_single_as(Query::named("chrome"))
    }

    /// Address bar inside the chrome
    pub fn address_bar(&self) -> PilotResult<AddressBar> {
        self.node.select_single_as(Query::named("addressBar"))
    }

    /// The webview of the current tab
    pub fn current_webview(&self) -> PilotResult<WebView> {
        self.node
            .select_single_as(Query::any().with_property("current", true))
    }

    /// Every visible webview
    pub fn visible_webviews(&self) -> PilotResult<Vec<WebView>> {
        self.node.select_many_as(Query::any().visible())
    }

    /// Every webview, one per open tab
    pub fn webviews(&self) -> PilotResult<Vec<WebView>> {
        self.node.select_many_as(Query::any())
    }

    /// Error sheet shown over a page that failed to load
    pub fn error_sheet(&self) -> PilotResult<UiNode> {
        self.node.select_single(&Query::of_type("ErrorSheet"))
    }

    /// Address bar suggestion popup
    pub fn suggestions(&self) -> PilotResult<Suggestions> {
        self.node.select_single_as(Query::any())
    }

    /// Focus the address bar, replace its text with `url` and submit.
    /// Does not wait for the navigation.
    pub fn go_to_url(&self, url: &str) -> PilotResult<()> {
        navigate(&self.address_bar()?, url)
    }

    /// Wait, up to the page-load budget, until the current webview shows
    /// `url` and is no longer loading
    pub fn wait_until_page_loaded(&self, url: &str) -> PilotResult<()> {
        wait_until_loaded(&self.node, url, || self.current_webview())
    }

    /// Press a key combo such as `"Ctrl+T"`
    pub fn press_key(&self, combo: &str) -> PilotResult<()> {
        self.node.session()?.keyboard().press_key(combo)
    }

    // =========================================================================
    // VIEWS
    // =========================================================================

    /// Tabs overview
    pub fn tabs_view(&self) -> PilotResult<TabsView> {
        self.node.wait_select_single_as(Query::any())
    }

    /// Open the tabs overview from the chrome
    pub fn open_tabs_view(&self) -> PilotResult<TabsView> {
        self.chrome()?.click_tabs_button()?;
        self.tabs_view()
    }

    /// New tab view (empty tab)
    pub fn new_tab_view(&self) -> PilotResult<NewTabView> {
        self.node.wait_select_single_as(Query::any())
    }

    /// Open a new tab with the keyboard and return its new tab view
    pub fn open_new_tab(&self) -> PilotResult<NewTabView> {
        self.press_key("Ctrl+T")?;
        self.new_tab_view()
    }

    /// Recovery view of a crashed tab
    pub fn sad_tab(&self) -> PilotResult<SadTab> {
        self.node.wait_select_single_as(Query::any())
    }

    /// Settings page
    pub fn settings_page(&self) -> PilotResult<SettingsPage> {
        self.node.wait_select_single_as(Query::any())
    }

    /// Open settings from the drawer
    pub fn open_settings(&self) -> PilotResult<SettingsPage> {
        self.chrome()?.open_drawer()?.click_action("settings")?;
        self.settings_page()
    }

    /// History view
    pub fn history_view(&self) -> PilotResult<HistoryView> {
        self.node.wait_select_single_as(Query::any())
    }

    /// Open history from the drawer
    pub fn open_history(&self) -> PilotResult<HistoryView> {
        self.chrome()?.open_drawer()?.click_action("history")?;
        self.history_view()
    }

    /// Find-in-page bar
    pub fn find_in_page_bar(&self) -> PilotResult<FindInPageBar> {
        self.node.wait_select_single_as(Query::any().visible())
    }

    /// Open find-in-page with the keyboard
    pub fn open_find_in_page(&self) -> PilotResult<FindInPageBar> {
        self.press_key("Ctrl+F")?;
        self.find_in_page_bar()
    }

    // =========================================================================
    // CONTEXT MENUS
    // =========================================================================

    /// The open context menu, in the variant matching the window layout
    pub fn context_menu(&self) -> PilotResult<ContextMenu> {
        ContextMenu::wait_for(&self.node, self.wide()?, self.current_webview()?.node().clone())
    }

    /// Open the context menu over the current page
    pub fn open_context_menu(&self) -> PilotResult<ContextMenu> {
        ContextMenu::open(&self.node, self.wide()?, self.current_webview()?.node().clone())
    }

    // =========================================================================
    // DIALOGS
    // =========================================================================

    /// JavaScript alert
    pub fn alert_dialog(&self) -> PilotResult<AlertDialog> {
        self.dialog()
    }

    /// JavaScript confirm
    pub fn confirm_dialog(&self) -> PilotResult<ConfirmDialog> {
        self.dialog()
    }

    /// JavaScript prompt
    pub fn prompt_dialog(&self) -> PilotResult<PromptDialog> {
        self.dialog()
    }

    /// `beforeunload` confirmation
    pub fn before_unload_dialog(&self) -> PilotResult<BeforeUnloadDialog> {
        self.dialog()
    }

    /// HTTP authentication prompt
    pub fn http_auth_dialog(&self) -> PilotResult<HttpAuthDialog> {
        self.dialog()
    }

    /// Camera/microphone permission request
    pub fn media_access_dialog(&self) -> PilotResult<MediaAccessDialog> {
        self.dialog()
    }

    /// Location permission request
    pub fn geolocation_dialog(&self) -> PilotResult<GeolocationDialog> {
        self.dialog()
    }

    /// Bookmark options popover
    pub fn bookmark_options(&self) -> PilotResult<BookmarkOptions> {
        self.dialog()
    }

    /// Whichever dialog is open
    pub fn any_dialog(&self) -> PilotResult<AnyDialog> {
        AnyDialog::find(&self.node)
    }

    fn dialog<D: Emulator>(&self) -> PilotResult<D> {
        self.node.wait_select_single(&D::query()).map(D::from_node)
    }
}

/// One tab's web content
#[derive(Debug, Clone)]
pub struct WebView {
    node: UiNode,
}

emulator!(WebView, "WebViewImpl");

impl WebView {
    /// Current URL
    pub fn url(&self) -> PilotResult<String> {
        self.node.get("url")
    }

    /// Document title
    pub fn title(&self) -> PilotResult<String> {
        self.node.get("title")
    }

    /// Whether a load is in progress
    pub fn loading(&self) -> PilotResult<bool> {
        self.node.get("loading")
    }

    /// Whether this is the current tab's webview
    pub fn is_current(&self) -> PilotResult<bool> {
        self.node.get("current")
    }

    /// Whether the webview belongs to a private tab
    pub fn incognito(&self) -> PilotResult<bool> {
        self.node.get("incognito")
    }

    /// Click the center of the page
    pub fn click(&self) -> PilotResult<()> {
        super::click(&self.node)
    }
}

pub(crate) fn navigate(address_bar: &AddressBar, url: &str) -> PilotResult<()> {
    address_bar.focus()?;
    address_bar.clear()?;
    address_bar.write(url)?;
    address_bar.node().session()?.keyboard().press_key("Enter")
}

pub(crate) fn wait_until_loaded(
    window: &UiNode,
    url: &str,
    webview: impl Fn() -> PilotResult<WebView>,
) -> PilotResult<()> {
    let options = WaitOptions::page_load(window.session()?.config());
    eventually_with(
        &options,
        || {
            let webview = webview()?;
            Ok((webview.url()?, webview.loading()?))
        },
        satisfies(format!("page {url} loaded"), |(current, loading): &(String, bool)| {
            current == url && !loading
        }),
    )
    .map(|_| ())
}
