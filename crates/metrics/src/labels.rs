use crate::catalog::{self, fields, Feature, FEATURES};
use crate::record::{FieldValue, Record};
use amplify_protocol::FeatureTiming;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Dropdown/tag option labels: field key -> option key -> display label.
pub type LabelMap = HashMap<String, HashMap<String, String>>;

/// Numeric field values above this are read as epoch milliseconds.
pub const EPOCH_MS_THRESHOLD: f64 = 1e12;

/// Quarter labels for the box, in stored order. Unknown codes echo the raw code.
pub fn quarters(record: &Record) -> Vec<String> {
    record
        .field_value(fields::QUARTER)
        .items()
        .into_iter()
        .map(|code| match catalog::quarter_label(&code) {
            Some(label) => label.to_string(),
            None => code,
        })
        .collect()
}

/// Catalog features the box has set, in catalog order.
pub fn present_features(record: &Record) -> impl Iterator<Item = &'static Feature> + '_ {
    let all: &'static [Feature] = &FEATURES;
    all.iter()
        .filter(move |feature| record.is_set(feature.field, feature.exclude))
}

/// Present features with their resolved timing, in catalog order.
pub fn features(record: &Record, labels: &LabelMap) -> Vec<FeatureTiming> {
    present_features(record)
        .map(|feature| FeatureTiming {
            name: feature.name.to_string(),
            timing: feature_timing(record, feature, labels),
        })
        .collect()
}

pub fn feature_timing(record: &Record, feature: &Feature, labels: &LabelMap) -> String {
    let value = record.field_value(feature.field);
    let kept = |item: &str| !feature.exclude.contains(&item);

    if let Some(options) = labels.get(feature.field).filter(|m| !m.is_empty()) {
        return value
            .items()
            .iter()
            .filter(|item| kept(item.as_str()))
            .map(|item| options.get(item).cloned().unwrap_or_else(|| item.clone()))
            .collect::<Vec<_>>()
            .join(", ");
    }

    match value {
        FieldValue::Number(n) => match n.as_f64() {
            Some(ms) if ms > EPOCH_MS_THRESHOLD => {
                format_month_year(ms as i64).unwrap_or_else(|| n.to_string())
            }
            _ => n.to_string(),
        },
        FieldValue::List(items) => items
            .iter()
            .filter(|item| kept(item.as_str()))
            .cloned()
            .collect::<Vec<_>>()
            .join(", "),
        other => other.display(),
    }
}

/// "November 2023" for an epoch-millisecond instant.
pub fn format_month_year(ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|dt| dt.format("%B %Y").to_string())
}
