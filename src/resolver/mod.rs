use crate::config::EngineConfig;
use crate::detector::FeatureDetector;
use crate::models::{ForegroundEvent, QuotaConfig, TargetId};
use crate::registry::{self, FeatureHost};
use log::debug;

pub struct TargetResolver {
    detectors: Vec<FeatureDetector>,
}

impl TargetResolver {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            detectors: FeatureHost::ALL
                .into_iter()
                .map(|host| FeatureDetector::new(host, config))
                .collect(),
        }
    }

    /// Resolve `event` against the current config set. Never fails: a tab
    /// no config covers degrades to the parent app.
    pub fn resolve(&mut self, configs: &[QuotaConfig], event: &ForegroundEvent) -> TargetId {
        let raw = remap_in_app_browser(&event.raw_target, event.view_hint.as_deref());

        if let Some(host) = FeatureHost::from_package(raw) {
            return self.resolve_feature_host(host, configs, event);
        }

        TargetId::RealApp(raw.to_string())
    }

    fn resolve_feature_host(&mut self, host: FeatureHost, configs: &[QuotaConfig], event: &ForegroundEvent) -> TargetId {
        let parent = TargetId::RealApp(host.package().to_string());

        if QuotaConfig::is_covered(configs, host.package()) {
            return parent;
        }
        if !host.virtual_targets().any(|v| QuotaConfig::is_covered(configs, v.id)) {
            return parent;
        }

        let Some(detector) = self.detectors.iter_mut().find(|d| d.host() == host) else {
            return parent;
        };
        let tab = detector.detect(event, event.timestamp_ms);

        match registry::virtual_target_for(host, tab) {
            Some(target) if QuotaConfig::is_covered(configs, target.id) => TargetId::new(target.id),
            _ => parent,
        }
    }
}

/// Embedded browser surfaces count as the browser they most likely are.
fn remap_in_app_browser<'a>(raw: &'a str, view_hint: Option<&str>) -> &'a str {
    if registry::ignores_in_app_browser(raw) || registry::is_browser(raw) {
        return raw;
    }
    match view_hint {
        Some(hint) if registry::is_in_app_browser_hint(hint) => {
            let browser = registry::browser_for_hint(hint);
            debug!("In-app browser in {raw} ({hint}) counted as {browser}");
            browser
        }
        _ => raw,
    }
}
