//! Static lookup tables for the dashboard pipeline: stage taxonomy, custom-field keys,
//! the feature catalog and dropdown code labels.

use crate::error::{CatalogError, Result};
use std::collections::HashSet;

/// Custom-field keys on a pipeline box.
pub mod fields {
    pub const PRICE: &str = "1024";
    pub const INVOICE_STATUS: &str = "1037";
    pub const INVOICE_URL: &str = "1035";
    pub const INVOICE_DATE: &str = "1036";
    pub const COUNTRY: &str = "1051";
    pub const BRAND: &str = "1033";
    pub const GROUP: &str = "1034";
    pub const QUARTER: &str = "1053";
    pub const EMAIL: &str = "1050";
}

pub const LAST_STAGE_CHANGE_TIMESTAMP: &str = "lastStageChangeTimestamp";
pub const CREATION_TIMESTAMP: &str = "creationTimestamp";

pub const PREVIEW_BASE_URL: &str = "https://app.streak.com/preview/";

/// "N/A" option on the Collection tag field.
pub const COLLECTION_NA: &str = "9025";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageGroup {
    /// Revenue recognized.
    Signed,
    /// In negotiation.
    Pipeline,
    Other,
}

impl StageGroup {
    /// Sort rank of the partner table.
    pub const fn rank(self) -> u8 {
        match self {
            StageGroup::Signed => 0,
            StageGroup::Pipeline => 1,
            StageGroup::Other => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Tier1,
    BrandSpotlight,
    Tier2,
    NewOpening,
    MarketingComplete,
    NeedsInvoice,
    InDiscussion,
    FinalFollowUp,
    NeedsContact,
    NeedsReview,
    Declined,
    DoNotInvite,
    Invited,
    FutureLead,
}

impl Stage {
    pub const ALL: [Stage; 14] = [
        Stage::Tier1,
        Stage::BrandSpotlight,
        Stage::Tier2,
        Stage::NewOpening,
        Stage::MarketingComplete,
        Stage::NeedsInvoice,
        Stage::InDiscussion,
        Stage::FinalFollowUp,
        Stage::NeedsContact,
        Stage::NeedsReview,
        Stage::Declined,
        Stage::DoNotInvite,
        Stage::Invited,
        Stage::FutureLead,
    ];

    /// Signed stages in funnel presentation order.
    pub const SIGNED: [Stage; 5] = [
        Stage::Tier1,
        Stage::BrandSpotlight,
        Stage::Tier2,
        Stage::NewOpening,
        Stage::MarketingComplete,
    ];

    pub const PIPELINE: [Stage; 3] = [
        Stage::NeedsInvoice,
        Stage::InDiscussion,
        Stage::FinalFollowUp,
    ];

    pub const OTHER: [Stage; 6] = [
        Stage::NeedsContact,
        Stage::NeedsReview,
        Stage::Declined,
        Stage::DoNotInvite,
        Stage::Invited,
        Stage::FutureLead,
    ];

    /// Non-financial stages shown in the funnel when populated.
    pub const FUNNEL_OTHER: [Stage; 4] = [
        Stage::NeedsContact,
        Stage::NeedsReview,
        Stage::Declined,
        Stage::DoNotInvite,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Stage::Tier1 => "5014",
            Stage::Tier2 => "5015",
            Stage::BrandSpotlight => "5016",
            Stage::NewOpening => "5017",
            Stage::MarketingComplete => "5007",
            Stage::NeedsInvoice => "5011",
            Stage::InDiscussion => "5004",
            Stage::FinalFollowUp => "5001",
            Stage::NeedsContact => "5013",
            Stage::NeedsReview => "5010",
            Stage::Declined => "5008",
            Stage::DoNotInvite => "5009",
            Stage::Invited => "5002",
            Stage::FutureLead => "5018",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Stage::Tier1 => "Tier 1",
            Stage::Tier2 => "Tier 2",
            Stage::BrandSpotlight => "Brand Spotlight",
            Stage::NewOpening => "New Opening",
            Stage::MarketingComplete => "Marketing Complete",
            Stage::NeedsInvoice => "Needs Invoice",
            Stage::InDiscussion => "In Discussion",
            Stage::FinalFollowUp => "Final Follow Up",
            Stage::NeedsContact => "Needs Contact",
            Stage::NeedsReview => "Needs Review",
            Stage::Declined => "Declined",
            Stage::DoNotInvite => "Do Not Invite",
            Stage::Invited => "Invited",
            Stage::FutureLead => "2027 Lead",
        }
    }

    pub const fn group(self) -> StageGroup {
        match self {
            Stage::Tier1
            | Stage::BrandSpotlight
            | Stage::Tier2
            | Stage::NewOpening
            | Stage::MarketingComplete => StageGroup::Signed,
            Stage::NeedsInvoice | Stage::InDiscussion | Stage::FinalFollowUp => {
                StageGroup::Pipeline
            }
            Stage::NeedsContact
            | Stage::NeedsReview
            | Stage::Declined
            | Stage::DoNotInvite
            | Stage::Invited
            | Stage::FutureLead => StageGroup::Other,
        }
    }

    pub fn from_key(key: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|stage| stage.key() == key)
    }

    /// Boxes in these stages never appear in the partner table.
    pub const fn is_listed(self) -> bool {
        !matches!(self, Stage::Invited | Stage::FutureLead)
    }
}

/// Group of a raw stage key; unknown keys are `Other`.
pub fn stage_group(raw_key: &str) -> StageGroup {
    Stage::from_key(raw_key).map_or(StageGroup::Other, Stage::group)
}

/// Display label of a raw stage key; unknown keys echo the key.
pub fn stage_label(raw_key: &str) -> String {
    Stage::from_key(raw_key).map_or_else(|| raw_key.to_string(), |s| s.label().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feature {
    pub name: &'static str,
    pub field: &'static str,
    /// Option keys that do not count as the feature being present.
    pub exclude: &'static [&'static str],
}

pub const FEATURES: [Feature; 7] = [
    Feature {
        name: "Collection",
        field: "1067",
        exclude: &[COLLECTION_NA],
    },
    Feature {
        name: "Forum",
        field: "1066",
        exclude: &[],
    },
    Feature {
        name: "Newsletter",
        field: "1063",
        exclude: &[],
    },
    Feature {
        name: "Advisor Assets",
        field: "1070",
        exclude: &[],
    },
    Feature {
        name: "Journal Article",
        field: "1074",
        exclude: &[],
    },
    Feature {
        name: "Social Media",
        field: "1075",
        exclude: &[],
    },
    Feature {
        name: "Webinar",
        field: "1073",
        exclude: &[],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvoiceStatus {
    Outstanding,
    Paid,
    ToInvoice,
    WaitingForBilling,
    InKind,
    Held,
}

/// Scalar total an invoice status rolls up into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvoiceBucket {
    Paid,
    Outstanding,
    Waiting,
    InKind,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 6] = [
        InvoiceStatus::Outstanding,
        InvoiceStatus::Paid,
        InvoiceStatus::ToInvoice,
        InvoiceStatus::WaitingForBilling,
        InvoiceStatus::InKind,
        InvoiceStatus::Held,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            InvoiceStatus::Outstanding => "9001",
            InvoiceStatus::Paid => "9002",
            InvoiceStatus::ToInvoice => "9003",
            InvoiceStatus::WaitingForBilling => "9004",
            InvoiceStatus::InKind => "9005",
            InvoiceStatus::Held => "9006",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            InvoiceStatus::Outstanding => "Outstanding",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::ToInvoice => "To Invoice",
            InvoiceStatus::WaitingForBilling => "Waiting for billing details",
            InvoiceStatus::InKind => "In Kind Sponsorship",
            InvoiceStatus::Held => "Invoice held",
        }
    }

    pub const fn bucket(self) -> Option<InvoiceBucket> {
        match self {
            InvoiceStatus::Paid => Some(InvoiceBucket::Paid),
            InvoiceStatus::Outstanding => Some(InvoiceBucket::Outstanding),
            InvoiceStatus::WaitingForBilling => Some(InvoiceBucket::Waiting),
            InvoiceStatus::InKind => Some(InvoiceBucket::InKind),
            InvoiceStatus::ToInvoice | InvoiceStatus::Held => None,
        }
    }

    pub fn from_code(code: &str) -> Option<InvoiceStatus> {
        InvoiceStatus::ALL.into_iter().find(|s| s.code() == code)
    }
}

pub const QUARTER_LABELS: [(&str, &str); 5] = [
    ("9001", "Q1"),
    ("9002", "Q2"),
    ("9003", "Q3"),
    ("9004", "Q4"),
    ("9005", "August"),
];

pub fn quarter_label(code: &str) -> Option<&'static str> {
    QUARTER_LABELS
        .iter()
        .find(|(k, _)| *k == code)
        .map(|(_, label)| *label)
}

/// Checks the tables for duplicate keys and an exact signed/pipeline/other partition.
pub fn validate() -> Result<()> {
    unique("stage", Stage::ALL.iter().map(|s| s.key()))?;
    unique("feature field", FEATURES.iter().map(|f| f.field))?;
    unique("feature name", FEATURES.iter().map(|f| f.name))?;
    unique("invoice status", InvoiceStatus::ALL.iter().map(|s| s.code()))?;
    unique("quarter", QUARTER_LABELS.iter().map(|(k, _)| *k))?;

    let mut grouped = HashSet::new();
    for (group, stages) in [
        (StageGroup::Signed, &Stage::SIGNED[..]),
        (StageGroup::Pipeline, &Stage::PIPELINE[..]),
        (StageGroup::Other, &Stage::OTHER[..]),
    ] {
        for stage in stages {
            if stage.group() != group || !grouped.insert(*stage) {
                return Err(CatalogError::OverlappingStage(stage.key().to_string()));
            }
        }
    }
    if let Some(missing) = Stage::ALL.iter().find(|s| !grouped.contains(*s)) {
        return Err(CatalogError::UngroupedStage(missing.key().to_string()));
    }
    Ok(())
}

fn unique<'a>(table: &'static str, keys: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(CatalogError::DuplicateKey {
                table,
                key: key.to_string(),
            });
        }
    }
    if seen.is_empty() {
        return Err(CatalogError::EmptyTable(table));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_consistent() {
        assert_eq!(validate(), Ok(()));
    }

    #[test]
    fn duplicate_keys_are_reported() {
        let err = unique("demo", ["a", "b", "a"].into_iter()).unwrap_err();
        assert_eq!(
            err,
            CatalogError::DuplicateKey {
                table: "demo",
                key: "a".to_string()
            }
        );
        assert_eq!(
            unique("demo", std::iter::empty()),
            Err(CatalogError::EmptyTable("demo"))
        );
    }

    #[test]
    fn stage_lookup_round_trips_every_key() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_key(stage.key()), Some(stage));
        }
        assert_eq!(Stage::from_key("9999"), None);
    }

    #[test]
    fn unknown_stage_is_other_with_raw_label() {
        assert_eq!(stage_group("9999"), StageGroup::Other);
        assert_eq!(stage_label("9999"), "9999");
        assert_eq!(stage_group("5014"), StageGroup::Signed);
        assert_eq!(stage_label("5018"), "2027 Lead");
    }

    #[test]
    fn invoice_buckets() {
        assert_eq!(
            InvoiceStatus::from_code("9002").and_then(InvoiceStatus::bucket),
            Some(InvoiceBucket::Paid)
        );
        assert_eq!(
            InvoiceStatus::from_code("9003").and_then(InvoiceStatus::bucket),
            None
        );
        assert_eq!(InvoiceStatus::from_code("1234"), None);
    }

    #[test]
    fn quarter_labels() {
        assert_eq!(quarter_label("9005"), Some("August"));
        assert_eq!(quarter_label("9009"), None);
    }
}
