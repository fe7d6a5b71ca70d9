use crate::models::{UiNode, UiSnapshot};
use crate::registry::FeatureTab;

fn is_shorts_marker(node: &UiNode) -> bool {
    node.has_label("Shorts") || node.view_id().to_lowercase().contains("shorts")
}

pub(super) fn classify(snapshot: &UiSnapshot) -> Option<FeatureTab> {
    let mut saw_inactive_marker = false;

    for node in snapshot.root.breadth_first().filter(|n| is_shorts_marker(n)) {
        if node.is_active() {
            return Some(FeatureTab::Shorts);
        }
        saw_inactive_marker = true;
    }

    // The Shorts tab is visible but another tab is selected.
    saw_inactive_marker.then_some(FeatureTab::Other)
}
