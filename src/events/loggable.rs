use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity levels for audit entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Long-term retention.
    Critical,
    #[default]
    Important,
    Noise,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Important => "important",
            Severity::Noise => "noise",
        }
    }
}

/// Anything that can be written to the audit trail.
pub trait Loggable: Serialize + Send + Sync {
    /// Prefix of the event name, as in `records.bulk_deleted`.
    fn entity_type() -> &'static str;

    fn subject_id(&self) -> Option<Uuid> {
        None
    }

    fn severity_for_action(&self, _action: &str) -> Severity {
        Severity::Important
    }
}
