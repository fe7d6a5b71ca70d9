use crate::models::UiSnapshot;
use crate::registry::FeatureTab;

const CLIPS_TAB_ID: &str = "com.instagram.android:id/clips_tab";

/// The bottom bar's clips tab is authoritative when present; otherwise an
/// active node labelled "Reels" is enough.
pub(super) fn classify(snapshot: &UiSnapshot) -> Option<FeatureTab> {
    let mut found_clips_tab = false;

    for node in snapshot.root.breadth_first() {
        if node.view_id() == CLIPS_TAB_ID {
            if node.is_active() {
                return Some(FeatureTab::Reels);
            }
            found_clips_tab = true;
            continue;
        }

        if !found_clips_tab && node.is_active() && node.has_label("Reels") {
            return Some(FeatureTab::Reels);
        }
    }

    found_clips_tab.then_some(FeatureTab::Other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UiNode;

    fn classify_root(root: UiNode) -> Option<FeatureTab> {
        classify(&UiSnapshot::new(root))
    }

    #[test]
    fn test_selected_clips_tab_is_reels() {
        let root = UiNode::new().with_child(UiNode::new().with_view_id(CLIPS_TAB_ID).selected());
        assert_eq!(classify_root(root), Some(FeatureTab::Reels));
    }

    #[test]
    fn test_checked_clips_tab_is_reels() {
        let root = UiNode::new().with_child(UiNode::new().with_view_id(CLIPS_TAB_ID).checked());
        assert_eq!(classify_root(root), Some(FeatureTab::Reels));
    }

    #[test]
    fn test_unselected_clips_tab_is_other() {
        let root = UiNode::new()
            .with_child(UiNode::new().with_view_id(CLIPS_TAB_ID))
            .with_child(UiNode::new().with_description("Reels").selected());
        assert_eq!(classify_root(root), Some(FeatureTab::Other));
    }

    #[test]
    fn test_active_reels_label_without_clips_tab() {
        let root = UiNode::new().with_child(UiNode::new().with_description("reels").selected());
        assert_eq!(classify_root(root), Some(FeatureTab::Reels));
    }

    #[test]
    fn test_no_markers() {
        let root = UiNode::new().with_child(UiNode::new().with_text("Reels"));
        assert_eq!(classify_root(root), None);
    }
}
