//! AI insight payloads. Scores are computed server-side and shown as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDistribution {
    #[serde(default)]
    pub tier_a: u64,
    #[serde(default)]
    pub tier_b: u64,
    #[serde(default)]
    pub tier_c: u64,
    #[serde(default)]
    pub tier_d: u64,
}

impl TierDistribution {
    pub fn total(&self) -> u64 {
        self.tier_a
            .saturating_add(self.tier_b)
            .saturating_add(self.tier_c)
            .saturating_add(self.tier_d)
    }

    /// Labelled counts in chart order.
    pub fn rows(&self) -> [(&'static str, u64); 4] {
        [
            ("Tier A", self.tier_a),
            ("Tier B", self.tier_b),
            ("Tier C", self.tier_c),
            ("Tier D", self.tier_d),
        ]
    }
}

/// Response of `GET /ai/insights/lead-distribution`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadDistribution {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub distribution: TierDistribution,
    /// Null when there are no scored leads.
    #[serde(default)]
    pub average_score: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl LeadDistribution {
    /// `updated_at` as a timestamp, if the backend sent RFC 3339.
    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        self.updated_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}
