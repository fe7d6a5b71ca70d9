mod instagram;
mod snapchat;
mod youtube;

use crate::config::EngineConfig;
use crate::models::{ForegroundEvent, UiSnapshot};
use crate::registry::{FeatureHost, FeatureTab};
use log::debug;

pub struct FeatureDetector {
    host: FeatureHost,
    detection_interval_ms: i64,
    header_max_y_dp: f64,
    last_tab: FeatureTab,
    last_detection_ms: Option<i64>,
}

impl FeatureDetector {
    pub fn new(host: FeatureHost, config: &EngineConfig) -> Self {
        Self {
            host,
            detection_interval_ms: config.detection_interval_ms,
            header_max_y_dp: config.header_max_y_dp,
            last_tab: FeatureTab::Unknown,
            last_detection_ms: None,
        }
    }

    pub fn host(&self) -> FeatureHost {
        self.host
    }

    pub fn last_tab(&self) -> FeatureTab {
        self.last_tab
    }

    /// Infer the active tab of the host app from `event`.
    ///
    /// Scrolls and calls inside the detection interval return the previous
    /// answer without looking at the snapshot.
    pub fn detect(&mut self, event: &ForegroundEvent, now_ms: i64) -> FeatureTab {
        if !event.kind.triggers_detection() {
            return self.last_tab;
        }
        if let Some(last) = self.last_detection_ms {
            if now_ms - last < self.detection_interval_ms {
                return self.last_tab;
            }
        }
        self.last_detection_ms = Some(now_ms);

        let Some(snapshot) = event.snapshot.as_ref() else {
            return self.last_tab;
        };

        if let Some(tab) = self.classify(snapshot) {
            if tab != self.last_tab {
                debug!("{:?} tab changed: {:?} -> {:?}", self.host, self.last_tab, tab);
            }
            self.last_tab = tab;
        }
        self.last_tab
    }

    fn classify(&self, snapshot: &UiSnapshot) -> Option<FeatureTab> {
        match self.host {
            FeatureHost::Snapchat => snapchat::classify(snapshot, self.header_max_y_dp),
            FeatureHost::Instagram => instagram::classify(snapshot),
            FeatureHost::YouTube => youtube::classify(snapshot),
        }
    }
}
