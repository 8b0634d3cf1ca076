use crate::record::SITE_BASE;

/// The fixed set of feed layouts the walker understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    /// Watch history grouped under date headers ("Today", "Yesterday").
    HistorySection,
    /// One video inside a history section.
    HistoryEntry,
    /// Saved playlists overview.
    Playlist,
    /// Videos of a single playlist.
    PlaylistVideo,
    /// Subscribed channels.
    SubChannel,
    /// Latest videos of subscribed channels.
    SubVideo,
}

/// Where the item list lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// Items are queried on the whole page.
    Page,
    /// Items are queried inside the first element matching the selector.
    Selector(&'static str),
    /// Items are queried inside an element handed in by an outer walk.
    Parent,
}

/// What happens to a record once it matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostMatch {
    /// Report only.
    Report,
    /// Walk the entries nested inside the section.
    WalkEntries,
    /// Run the destructive menu action with this menu label.
    MenuAction { label: &'static str },
}

/// How a layout decides whether another scroll is worthwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollRule {
    /// Follow the scroll budget, stop when the feed stops growing.
    Budget,
    /// Like `Budget`, and stop once a record is older than the day horizon.
    RecencyHorizon,
    /// Never scroll; one pass over the container.
    SinglePass,
}

pub const MENU_REMOVE_FROM_HISTORY: &str = "Remove from watch history";

/// Loading spinner appended at the end of a feed while more content exists.
pub const CONTINUATION_SELECTOR: &str = "ytd-continuation-item-renderer";

impl Layout {
    pub const ALL: [Layout; 6] = [
        Layout::HistorySection,
        Layout::HistoryEntry,
        Layout::Playlist,
        Layout::PlaylistVideo,
        Layout::SubChannel,
        Layout::SubVideo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Layout::HistorySection => "history-section",
            Layout::HistoryEntry => "history-entry",
            Layout::Playlist => "playlist",
            Layout::PlaylistVideo => "playlist-video",
            Layout::SubChannel => "sub-channel",
            Layout::SubVideo => "sub-video",
        }
    }

    /// Page loaded at the start of a walk, if the layout owns one.
    /// Playlist videos are loaded from the playlist's own url.
    pub fn page_url(self) -> Option<String> {
        let path = match self {
            Layout::HistorySection => "/feed/history",
            Layout::Playlist => "/feed/playlists",
            Layout::SubChannel => "/feed/channels",
            Layout::SubVideo => "/feed/subscriptions",
            Layout::HistoryEntry | Layout::PlaylistVideo => return None,
        };
        Some(format!("{SITE_BASE}{path}"))
    }

    pub fn container(self) -> Container {
        match self {
            Layout::HistorySection | Layout::SubChannel | Layout::SubVideo => Container::Page,
            Layout::HistoryEntry => Container::Parent,
            Layout::Playlist => Container::Selector("#contents"),
            Layout::PlaylistVideo => Container::Selector("ytd-playlist-video-list-renderer"),
        }
    }

    /// Selector enumerating the items; comma-separated alternatives.
    pub fn item_selector(self) -> &'static str {
        match self {
            Layout::HistorySection => "ytd-item-section-renderer",
            Layout::HistoryEntry => "ytd-video-renderer,yt-lockup-view-model",
            Layout::Playlist | Layout::SubVideo => "ytd-rich-item-renderer",
            Layout::PlaylistVideo => "ytd-playlist-video-renderer",
            Layout::SubChannel => "#content-section",
        }
    }

    /// Sub-lists inside the container that are removed before counting.
    pub fn dropped_sublists(self) -> &'static [&'static str] {
        match self {
            Layout::HistoryEntry => &["ytd-reel-shelf-renderer"],
            _ => &[],
        }
    }

    /// Whether the first item must be visible before the list is read.
    pub fn waits_for_visible(self) -> bool {
        matches!(self, Layout::HistorySection | Layout::SubChannel)
    }

    /// Whether include/exclude rules apply; other layouts report everything.
    pub fn uses_filters(self) -> bool {
        matches!(self, Layout::HistoryEntry | Layout::Playlist)
    }

    pub fn post_match(self) -> PostMatch {
        match self {
            Layout::HistorySection => PostMatch::WalkEntries,
            Layout::HistoryEntry => PostMatch::MenuAction {
                label: MENU_REMOVE_FROM_HISTORY,
            },
            _ => PostMatch::Report,
        }
    }

    pub fn scroll_rule(self) -> ScrollRule {
        match self {
            Layout::HistoryEntry => ScrollRule::SinglePass,
            Layout::SubVideo => ScrollRule::RecencyHorizon,
            _ => ScrollRule::Budget,
        }
    }

    /// Element whose identity marks the end of the feed between passes.
    pub fn trailing_selector(self) -> &'static str {
        match self {
            Layout::HistoryEntry => Layout::HistorySection.item_selector(),
            other => other.item_selector(),
        }
    }

    /// Layouts whose feed shows a continuation spinner while more pages exist.
    pub fn has_continuation(self) -> bool {
        matches!(self, Layout::HistorySection)
    }
}
