//! Getwork wire representation of a mining job.

use serde::{Deserialize, Serialize};

/// Immutable snapshot of the current job in getwork wire shape.
///
/// Produced by the bound pool session and superseded wholesale when a new
/// job arrives; there is no partial update. Equality over both fields is
/// what the long-poll path uses to decide whether a miner has already seen
/// the current work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkTemplate {
    /// Hex-encoded block header data the miner hashes.
    pub data: String,
    /// Hex-encoded share target.
    pub target: String,
}

impl WorkTemplate {
    /// Creates a new template from hex strings.
    #[must_use]
    pub fn new(data: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            target: target.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn serde_round_trip_is_byte_identical() {
        let template = WorkTemplate::new("00ab".repeat(64), "ff".repeat(32));
        let json = serde_json::to_string(&template).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        let parsed: Option<WorkTemplate> = serde_json::from_str(&json).ok();
        let Some(parsed) = parsed else {
            panic!("deserialization failed");
        };
        assert_eq!(parsed.data, template.data);
        assert_eq!(parsed.target, template.target);
    }

    #[test]
    fn equality_covers_both_fields() {
        let a = WorkTemplate::new("aa", "01");
        let b = WorkTemplate::new("aa", "02");
        let c = WorkTemplate::new("bb", "01");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, WorkTemplate::new("aa", "01"));
    }
}
