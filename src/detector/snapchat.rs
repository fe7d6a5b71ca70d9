use crate::models::{UiNode, UiSnapshot};
use crate::registry::FeatureTab;

const SPOTLIGHT_CONTAINER_ID: &str = "com.snapchat.android:id/spotlight_container";

const CHAT_UI_IDS: &[&str] = &[
    "ff_item",
    "list-picker-pill",
    "feed_chat_button",
    "feed_pinned_convo_button",
];

#[derive(Debug, Default)]
struct Signals {
    stories_header: bool,
    chat_header: bool,
    selected_stories: bool,
    selected_chat: bool,
    chat_ui: bool,
    stories_content: bool,
    memories: bool,
}

impl Signals {
    fn decide(&self) -> Option<FeatureTab> {
        if self.memories {
            Some(FeatureTab::Other)
        } else if self.chat_ui {
            Some(FeatureTab::Chat)
        } else if self.selected_stories {
            Some(FeatureTab::Stories)
        } else if self.selected_chat {
            Some(FeatureTab::Chat)
        } else if self.stories_header && !self.chat_header && self.stories_content {
            Some(FeatureTab::Stories)
        } else if self.chat_header && !self.stories_header {
            Some(FeatureTab::Chat)
        } else {
            None
        }
    }
}

/// Spotlight has a dedicated container and wins outright. The Stories and
/// Chat tabs share one layout, so they are told apart by selection state,
/// chat-only widgets, and which label sits in the header strip.
pub(super) fn classify(snapshot: &UiSnapshot, header_max_y_dp: f64) -> Option<FeatureTab> {
    let header_max_y = snapshot.dp_to_px(header_max_y_dp);
    let mut signals = Signals::default();

    for node in snapshot.root.breadth_first() {
        let view_id = node.view_id();
        if view_id == SPOTLIGHT_CONTAINER_ID {
            return Some(FeatureTab::Spotlight);
        }

        signals.chat_ui |= is_chat_ui(view_id);
        signals.stories_content |= is_stories_content(node);
        signals.memories |= is_memories(node);

        let in_header = f64::from(node.bounds.top) <= header_max_y;
        match node.trimmed_text() {
            "Spotlight" | "Following" if node.selected => return Some(FeatureTab::Spotlight),
            "Stories" if node.selected => signals.selected_stories = true,
            "Stories" if in_header => signals.stories_header = true,
            "Chat" if node.selected => signals.selected_chat = true,
            "Chat" if in_header => signals.chat_header = true,
            _ => {}
        }
    }

    signals.decide()
}

fn is_chat_ui(view_id: &str) -> bool {
    !view_id.is_empty() && CHAT_UI_IDS.iter().any(|marker| view_id.contains(marker))
}

fn is_stories_content(node: &UiNode) -> bool {
    node.view_id().contains("friend_card_frame") || node.trimmed_text() == "friend_story_circle_thumbnail"
}

fn is_memories(node: &UiNode) -> bool {
    node.view_id().contains("memories_grid") || node.trimmed_text() == "Memories"
}
