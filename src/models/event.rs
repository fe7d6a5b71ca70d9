use serde::Deserialize;
use std::collections::VecDeque;

/// Kind of foreground notification reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    WindowChanged,
    ContentChanged,
    Clicked,
    Scrolled,
}

impl EventKind {
    /// Whether this kind of event is worth re-reading the UI tree for.
    pub fn triggers_detection(self) -> bool {
        match self {
            Self::WindowChanged | Self::ContentChanged | Self::Clicked => true,
            Self::Scrolled => false,
        }
    }
}

/// Screen-space bounds of a UI node, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// Immutable copy of one node of the foreground window's UI tree.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct UiNode {
    pub view_id: Option<String>,
    pub text: Option<String>,
    pub content_description: Option<String>,
    pub selected: bool,
    pub checked: bool,
    pub bounds: Bounds,
    pub children: Vec<UiNode>,
}

impl UiNode {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_view_id(mut self, view_id: &str) -> Self {
        self.view_id = Some(view_id.to_string());
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.content_description = Some(description.to_string());
        self
    }

    #[must_use]
    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    #[must_use]
    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    #[must_use]
    pub fn at_top(mut self, top: i32) -> Self {
        self.bounds.top = top;
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: UiNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn view_id(&self) -> &str {
        self.view_id.as_deref().unwrap_or("")
    }

    pub fn trimmed_text(&self) -> &str {
        self.text.as_deref().map_or("", str::trim)
    }

    pub fn trimmed_description(&self) -> &str {
        self.content_description.as_deref().map_or("", str::trim)
    }

    /// Selected or checked: how tab bars mark the current tab.
    pub fn is_active(&self) -> bool {
        self.selected || self.checked
    }

    /// Text or content description equals `label`, ignoring case.
    pub fn has_label(&self, label: &str) -> bool {
        self.trimmed_text().eq_ignore_ascii_case(label)
            || self.trimmed_description().eq_ignore_ascii_case(label)
    }

    pub fn breadth_first(&self) -> BreadthFirst<'_> {
        BreadthFirst {
            queue: VecDeque::from([self]),
        }
    }
}

/// Level-order walk over a UI tree.
pub struct BreadthFirst<'a> {
    queue: VecDeque<&'a UiNode>,
}

impl<'a> Iterator for BreadthFirst<'a> {
    type Item = &'a UiNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        self.queue.extend(node.children.iter());
        Some(node)
    }
}

fn default_density() -> f64 {
    1.0
}

/// UI tree of the active window plus the display density needed to turn
/// dp thresholds into pixels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UiSnapshot {
    #[serde(default = "default_density")]
    pub density: f64,
    pub root: UiNode,
}

impl UiSnapshot {
    pub fn new(root: UiNode) -> Self {
        Self {
            density: default_density(),
            root,
        }
    }

    pub fn dp_to_px(&self, dp: f64) -> f64 {
        dp * self.density
    }
}

/// One "foreground surface changed" notification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForegroundEvent {
    pub raw_target: String,
    /// Component/class name of the visible surface, when the platform
    /// reports one.
    #[serde(default)]
    pub view_hint: Option<String>,
    pub kind: EventKind,
    pub timestamp_ms: i64,
    #[serde(default)]
    pub snapshot: Option<UiSnapshot>,
}

impl ForegroundEvent {
    pub fn new(raw_target: &str, kind: EventKind, timestamp_ms: i64) -> Self {
        Self {
            raw_target: raw_target.to_string(),
            view_hint: None,
            kind,
            timestamp_ms,
            snapshot: None,
        }
    }

    pub fn window_changed(raw_target: &str, timestamp_ms: i64) -> Self {
        Self::new(raw_target, EventKind::WindowChanged, timestamp_ms)
    }

    #[must_use]
    pub fn with_view_hint(mut self, hint: &str) -> Self {
        self.view_hint = Some(hint.to_string());
        self
    }

    #[must_use]
    pub fn with_snapshot(mut self, snapshot: UiSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breadth_first_visits_level_order() {
        let tree = UiNode::new()
            .with_text("root")
            .with_child(UiNode::new().with_text("a").with_child(UiNode::new().with_text("a1")))
            .with_child(UiNode::new().with_text("b"));

        let order: Vec<&str> = tree.breadth_first().map(UiNode::trimmed_text).collect();
        assert_eq!(order, vec!["root", "a", "b", "a1"]);
    }

    #[test]
    fn test_scrolled_does_not_trigger_detection() {
        assert!(EventKind::WindowChanged.triggers_detection());
        assert!(EventKind::ContentChanged.triggers_detection());
        assert!(EventKind::Clicked.triggers_detection());
        assert!(!EventKind::Scrolled.triggers_detection());
    }

    #[test]
    fn test_has_label_checks_text_and_description() {
        assert!(UiNode::new().with_text(" Reels ").has_label("reels"));
        assert!(UiNode::new().with_description("Shorts").has_label("shorts"));
        assert!(!UiNode::new().with_text("Home").has_label("reels"));
    }

    #[test]
    fn test_event_deserializes_from_host_json() {
        let json = r#"{
            "raw_target": "com.snapchat.android",
            "kind": "content_changed",
            "timestamp_ms": 1200,
            "snapshot": {"density": 2.0, "root": {"view_id": "x", "children": [{"text": "Stories", "selected": true}]}}
        }"#;
        let event: ForegroundEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.kind, EventKind::ContentChanged);
        assert!(event.view_hint.is_none());
        let snapshot = event.snapshot.unwrap();
        assert!((snapshot.dp_to_px(10.0) - 20.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.root.children.len(), 1);
    }
}
