//! # Amplify Protocol
//!
//! The dashboard report contract. The static front end reads these structures verbatim from
//! `data.js`, so field names and nesting are stable: renaming a key is a breaking change.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every top-level key of a serialized [`Report`], in declaration order.
pub const REPORT_KEYS: [&str; 29] = [
    "lastUpdated",
    "signedCount",
    "totalSigned",
    "totalPipeline",
    "paid",
    "outstanding",
    "waitingBilling",
    "inKind",
    "needsInvoice",
    "needsInvoiceCount",
    "inDiscussion",
    "inDiscussionCount",
    "finalFollowUp",
    "finalFollowUpCount",
    "marketingComplete",
    "byStage",
    "countByStage",
    "pipelineByStage",
    "pipelineCountByStage",
    "otherCountByStage",
    "funnel",
    "signedOverTime",
    "newThisWeek",
    "features",
    "quarters",
    "topCountries",
    "topGroups",
    "topBrands",
    "partners",
];

/// Frequency ranking as ordered `[key, count]` pairs, highest count first.
pub type Ranking = Vec<(String, usize)>;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Human-readable generation date, e.g. "Oct 19, 2026".
    pub last_updated: String,
    pub signed_count: usize,
    pub total_signed: i64,
    /// Signed value plus every open pipeline stage.
    pub total_pipeline: i64,

    pub paid: i64,
    pub outstanding: i64,
    pub waiting_billing: i64,
    pub in_kind: i64,

    pub needs_invoice: i64,
    pub needs_invoice_count: usize,
    pub in_discussion: i64,
    pub in_discussion_count: usize,
    pub final_follow_up: i64,
    pub final_follow_up_count: usize,
    pub marketing_complete: i64,

    /// Signed value keyed by stage label.
    pub by_stage: BTreeMap<String, i64>,
    pub count_by_stage: BTreeMap<String, usize>,
    pub pipeline_by_stage: BTreeMap<String, i64>,
    pub pipeline_count_by_stage: BTreeMap<String, usize>,
    /// Counts for stages outside the financial rollups, keyed by raw stage key.
    pub other_count_by_stage: BTreeMap<String, usize>,

    pub funnel: Vec<FunnelStage>,
    pub signed_over_time: Vec<MonthlySignings>,
    pub new_this_week: Vec<RecentSigning>,

    pub features: BTreeMap<String, usize>,
    pub quarters: BTreeMap<String, usize>,
    pub top_countries: Ranking,
    pub top_groups: Ranking,
    pub top_brands: Ranking,

    pub partners: Vec<Partner>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStage {
    pub label: String,
    pub stage_key: String,
    pub count: usize,
    /// Always 0 for stages that carry no financial weight.
    pub value: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySignings {
    /// Display form, e.g. "Mar 2026".
    pub month: String,
    /// Sortable bucket key, e.g. "2026-03".
    pub key: String,
    pub count: usize,
    pub value: i64,
    pub cumulative_count: usize,
    pub cumulative_value: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecentSigning {
    pub key: String,
    pub name: String,
    pub stage: String,
    pub price: i64,
    pub signed_date: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct FeatureTiming {
    pub name: String,
    pub timing: String,
}

/// One row of the partner table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub key: String,
    pub name: String,
    pub stage: String,
    pub stage_key: String,
    pub price: i64,
    /// Empty when the invoice code is not a known status.
    pub invoice_status: String,
    /// Empty unless the stored value is an absolute http(s) URL.
    pub invoice_url: String,
    pub features: Vec<FeatureTiming>,
    pub quarters: Vec<String>,
    pub country: String,
    pub brand: String,
    pub group: String,
    pub email: String,
    pub streak_url: String,
}

impl Report {
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }
}

/// JSON schema of the `data.js` payload, for front-end tooling.
pub fn report_schema() -> Result<serde_json::Value> {
    let schema = schemars::schema_for!(Report);
    serde_json::to_value(&schema).map_err(Into::into)
}
