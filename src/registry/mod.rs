pub const SNAPCHAT_PACKAGE: &str = "com.snapchat.android";
pub const SNAPCHAT_STORIES: &str = "com.snapchat.android:stories";
pub const SNAPCHAT_SPOTLIGHT: &str = "com.snapchat.android:spotlight";
pub const INSTAGRAM_PACKAGE: &str = "com.instagram.android";
pub const INSTAGRAM_REELS: &str = "com.instagram.android:reels";
pub const YOUTUBE_PACKAGE: &str = "com.google.android.youtube";
pub const YOUTUBE_SHORTS: &str = "com.google.android.youtube:shorts";

pub const CHROME_PACKAGE: &str = "com.android.chrome";
pub const FIREFOX_PACKAGE: &str = "org.mozilla.firefox";
pub const BRAVE_PACKAGE: &str = "com.brave.browser";
pub const EDGE_PACKAGE: &str = "com.microsoft.emmx";
pub const OPERA_PACKAGE: &str = "com.opera.browser";
pub const SAMSUNG_BROWSER_PACKAGE: &str = "com.sec.android.app.sbrowser";

pub const SYSTEM_UI_PACKAGE: &str = "com.android.systemui";
pub const STOCK_LAUNCHER_PACKAGE: &str = "com.android.launcher";

/// Apps with in-app features that can carry their own quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureHost {
    Snapchat,
    Instagram,
    YouTube,
}

impl FeatureHost {
    pub const ALL: [FeatureHost; 3] = [Self::Snapchat, Self::Instagram, Self::YouTube];

    pub fn package(self) -> &'static str {
        match self {
            Self::Snapchat => SNAPCHAT_PACKAGE,
            Self::Instagram => INSTAGRAM_PACKAGE,
            Self::YouTube => YOUTUBE_PACKAGE,
        }
    }

    pub fn from_package(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|host| host.package() == id)
    }

    pub fn virtual_targets(self) -> impl Iterator<Item = &'static VirtualTarget> {
        VIRTUAL_TARGETS.iter().filter(move |v| v.host == self)
    }
}

/// Feature/tab a detector can recognise inside a host app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureTab {
    /// Nothing resolved yet.
    Unknown,
    /// A definite tab that no virtual target tracks (home feed, chat list,
    /// memories).
    Other,
    Stories,
    Spotlight,
    Chat,
    Reels,
    Shorts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualTarget {
    pub id: &'static str,
    pub parent: &'static str,
    pub host: FeatureHost,
    pub tab: FeatureTab,
}

pub const VIRTUAL_TARGETS: &[VirtualTarget] = &[
    VirtualTarget {
        id: SNAPCHAT_STORIES,
        parent: SNAPCHAT_PACKAGE,
        host: FeatureHost::Snapchat,
        tab: FeatureTab::Stories,
    },
    VirtualTarget {
        id: SNAPCHAT_SPOTLIGHT,
        parent: SNAPCHAT_PACKAGE,
        host: FeatureHost::Snapchat,
        tab: FeatureTab::Spotlight,
    },
    VirtualTarget {
        id: INSTAGRAM_REELS,
        parent: INSTAGRAM_PACKAGE,
        host: FeatureHost::Instagram,
        tab: FeatureTab::Reels,
    },
    VirtualTarget {
        id: YOUTUBE_SHORTS,
        parent: YOUTUBE_PACKAGE,
        host: FeatureHost::YouTube,
        tab: FeatureTab::Shorts,
    },
];

pub fn parent_of(id: &str) -> Option<&'static str> {
    VIRTUAL_TARGETS.iter().find(|v| v.id == id).map(|v| v.parent)
}

pub fn is_virtual(id: &str) -> bool {
    parent_of(id).is_some()
}

pub fn virtual_target_for(host: FeatureHost, tab: FeatureTab) -> Option<&'static VirtualTarget> {
    host.virtual_targets().find(|v| v.tab == tab)
}

pub const BROWSER_PACKAGES: &[&str] = &[
    CHROME_PACKAGE,
    "com.google.android.apps.chrome",
    "com.chrome.beta",
    "com.chrome.dev",
    "com.chrome.canary",
    FIREFOX_PACKAGE,
    "org.mozilla.firefox_beta",
    "org.mozilla.fenix",
    BRAVE_PACKAGE,
    EDGE_PACKAGE,
    OPERA_PACKAGE,
    "com.opera.mini.native",
    SAMSUNG_BROWSER_PACKAGE,
];

/// Apps whose browser-looking surfaces are not in-app browsers.
pub const IN_APP_BROWSER_IGNORE: &[&str] = &["com.google.chromeremotedesktop"];

/// Substrings of a view hint that mark an embedded browser surface.
pub const IN_APP_BROWSER_MARKERS: &[&str] = &[
    "customtab",
    "customtabs",
    "browser",
    "webview",
    "webactivity",
    "inappbrowser",
];

/// View-hint substring to browser id, first match wins.
pub const BROWSER_HINTS: &[(&str, &str)] = &[
    ("chrome", CHROME_PACKAGE),
    ("firefox", FIREFOX_PACKAGE),
    ("brave", BRAVE_PACKAGE),
    ("edge", EDGE_PACKAGE),
    ("emmx", EDGE_PACKAGE),
    ("opera", OPERA_PACKAGE),
    ("samsung", SAMSUNG_BROWSER_PACKAGE),
    ("sbrowser", SAMSUNG_BROWSER_PACKAGE),
];

pub fn is_browser(id: &str) -> bool {
    BROWSER_PACKAGES.contains(&id)
}

pub fn ignores_in_app_browser(id: &str) -> bool {
    IN_APP_BROWSER_IGNORE.contains(&id)
}

pub fn is_in_app_browser_hint(hint: &str) -> bool {
    let normalized = hint.to_lowercase();
    IN_APP_BROWSER_MARKERS.iter().any(|m| normalized.contains(m))
}

/// Best guess at which real browser renders an in-app browser surface.
///
/// Custom tabs are overwhelmingly Chrome, so anything unrecognised maps to
/// Chrome. This is a heuristic, not a guarantee.
pub fn browser_for_hint(hint: &str) -> &'static str {
    let normalized = hint.to_lowercase();
    BROWSER_HINTS
        .iter()
        .find(|(marker, _)| normalized.contains(marker))
        .map_or(CHROME_PACKAGE, |(_, browser)| browser)
}

const TRANSIENT_PACKAGES: &[&str] = &[
    SYSTEM_UI_PACKAGE,
    "com.android.permissioncontroller",
    "com.google.android.permissioncontroller",
];

/// Status bar, notification shade, keyboards, permission dialogs and other
/// overlays that sit on top of the real foreground app.
pub fn is_transient_surface(id: &str) -> bool {
    if is_browser(id) {
        return false;
    }
    TRANSIENT_PACKAGES.contains(&id)
        || id.starts_with("com.google.android.inputmethod")
        || id.contains("keyboard")
        || id.contains("overlay")
}

pub fn is_launcher(id: &str) -> bool {
    id == STOCK_LAUNCHER_PACKAGE || id.contains("launcher")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_of_virtual_targets() {
        assert_eq!(parent_of(SNAPCHAT_STORIES), Some(SNAPCHAT_PACKAGE));
        assert_eq!(parent_of(INSTAGRAM_REELS), Some(INSTAGRAM_PACKAGE));
        assert_eq!(parent_of(YOUTUBE_SHORTS), Some(YOUTUBE_PACKAGE));
        assert_eq!(parent_of(SNAPCHAT_PACKAGE), None);
        assert!(!is_virtual("com.example.app"));
    }

    #[test]
    fn test_feature_host_lookup() {
        assert_eq!(FeatureHost::from_package(SNAPCHAT_PACKAGE), Some(FeatureHost::Snapchat));
        assert_eq!(FeatureHost::from_package("com.example.app"), None);
        assert_eq!(FeatureHost::Snapchat.virtual_targets().count(), 2);
    }

    #[test]
    fn test_virtual_target_for_tab() {
        let spotlight = virtual_target_for(FeatureHost::Snapchat, FeatureTab::Spotlight);
        assert_eq!(spotlight.map(|v| v.id), Some(SNAPCHAT_SPOTLIGHT));
        assert!(virtual_target_for(FeatureHost::Snapchat, FeatureTab::Chat).is_none());
        assert!(virtual_target_for(FeatureHost::YouTube, FeatureTab::Reels).is_none());
    }

    #[test]
    fn test_browser_for_hint() {
        assert_eq!(browser_for_hint("org.mozilla.firefox.customtabs.CustomTabActivity"), FIREFOX_PACKAGE);
        assert_eq!(browser_for_hint("com.google.android.apps.chrome.CustomTab"), CHROME_PACKAGE);
        assert_eq!(browser_for_hint("com.example.InAppBrowserActivity"), CHROME_PACKAGE);
        assert_eq!(browser_for_hint("SBrowserWebView"), SAMSUNG_BROWSER_PACKAGE);
    }

    #[test]
    fn test_in_app_browser_hint() {
        assert!(is_in_app_browser_hint("androidx.browser.customtabs.CustomTabActivity"));
        assert!(is_in_app_browser_hint("com.example.WebViewActivity"));
        assert!(!is_in_app_browser_hint("com.example.MainActivity"));
    }

    #[test]
    fn test_transient_surfaces() {
        assert!(is_transient_surface(SYSTEM_UI_PACKAGE));
        assert!(is_transient_surface("com.google.android.inputmethod.latin"));
        assert!(is_transient_surface("com.samsung.android.honeyboard.keyboard"));
        assert!(is_transient_surface("com.example.screenoverlay"));
        assert!(!is_transient_surface("com.spotify.music"));
        assert!(!is_transient_surface(CHROME_PACKAGE));
    }

    #[test]
    fn test_launchers() {
        assert!(is_launcher(STOCK_LAUNCHER_PACKAGE));
        assert!(is_launcher("com.teslacoilsw.launcher"));
        assert!(!is_launcher("com.spotify.music"));
    }
}
