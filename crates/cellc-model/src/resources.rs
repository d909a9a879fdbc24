//! Container resource requests and limits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Requests and limits keyed by resource name (`cpu`, `memory`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    /// Upper bounds.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, String>,
    /// Guaranteed amounts.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,
}

impl ResourceRequirements {
    /// Whether neither limits nor requests are set.
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty() && self.requests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sections_are_omitted() {
        let mut resources = ResourceRequirements::default();
        assert!(resources.is_empty());
        let _ = resources.limits.insert("cpu".into(), "500m".into());
        let json = serde_json::to_value(&resources).expect("serialize");
        assert_eq!(json["limits"]["cpu"], "500m");
        assert!(json.get("requests").is_none());
    }
}
