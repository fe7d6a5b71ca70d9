pub mod event;
pub mod quota_config;
pub mod settings;
pub mod target;
pub mod usage_event;
pub mod virtual_session;

pub use event::{Bounds, EventKind, ForegroundEvent, UiNode, UiSnapshot};
pub use quota_config::{InterventionMode, QuotaConfig};
pub use settings::{AuthMode, AuthPurpose, AuthSettings, OverlayPosition};
pub use target::TargetId;
pub use usage_event::{UsageEvent, UsageEventKind};
pub use virtual_session::{VirtualSessionRecord, VirtualSessions};
