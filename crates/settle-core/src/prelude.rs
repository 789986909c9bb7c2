pub use settle_types::error::{ClResult, Error};
pub use settle_types::types::{OverrideScope, ScopeId, ScopeLevel, Timestamp};
pub use settle_types::value::SettingValue;

pub use tracing::{debug, debug_span, error, error_span, info, info_span, warn, warn_span};

// vim: ts=4
