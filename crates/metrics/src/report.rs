use crate::aggregate::{self, Accumulator, TOP_N};
use crate::catalog::Stage;
use crate::classify::Classifier;
use crate::labels::LabelMap;
use crate::record::Record;
use amplify_protocol::Report;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// One linear pass over the boxes.
pub fn accumulate(records: &[Record], labels: &LabelMap, now: DateTime<Utc>) -> Accumulator {
    let classifier = Classifier::new(labels, now);
    records
        .iter()
        .map(|record| classifier.classify(record))
        .fold(Accumulator::default(), |mut acc, item| {
            acc.fold(item);
            acc
        })
}

/// Builds the dashboard report. Deterministic for fixed inputs and `now`.
pub fn compute_report(records: &[Record], labels: &LabelMap, now: DateTime<Utc>) -> Report {
    let acc = accumulate(records, labels, now);
    let report = assemble(&acc, now);
    log::info!(
        "Computed report: {} boxes, {} signed, {} partners listed",
        records.len(),
        report.signed_count,
        report.partners.len()
    );
    report
}

pub fn assemble(acc: &Accumulator, now: DateTime<Utc>) -> Report {
    let totals = acc.totals();
    let value_of = |stage: Stage| acc.slot(stage).whole();
    let count_of = |stage: Stage| acc.slot(stage).count;

    let by_label = |slots: &BTreeMap<Stage, aggregate::StageSlot>| {
        let values: BTreeMap<String, i64> = slots
            .iter()
            .map(|(stage, slot)| (stage.label().to_string(), slot.whole()))
            .collect();
        let counts: BTreeMap<String, usize> = slots
            .iter()
            .map(|(stage, slot)| (stage.label().to_string(), slot.count))
            .collect();
        (values, counts)
    };
    let (by_stage, count_by_stage) = by_label(&acc.signed);
    let (pipeline_by_stage, pipeline_count_by_stage) = by_label(&acc.pipeline);

    Report {
        last_updated: now.format("%b %d, %Y").to_string(),
        signed_count: totals.signed_count,
        total_signed: totals.total_signed,
        total_pipeline: totals.total_pipeline,
        paid: acc.invoices.paid as i64,
        outstanding: acc.invoices.outstanding as i64,
        waiting_billing: acc.invoices.waiting as i64,
        in_kind: acc.invoices.in_kind as i64,
        needs_invoice: value_of(Stage::NeedsInvoice),
        needs_invoice_count: count_of(Stage::NeedsInvoice),
        in_discussion: value_of(Stage::InDiscussion),
        in_discussion_count: count_of(Stage::InDiscussion),
        final_follow_up: value_of(Stage::FinalFollowUp),
        final_follow_up_count: count_of(Stage::FinalFollowUp),
        marketing_complete: value_of(Stage::MarketingComplete),
        by_stage,
        count_by_stage,
        pipeline_by_stage,
        pipeline_count_by_stage,
        other_count_by_stage: acc.other.to_map(),
        funnel: aggregate::funnel(acc),
        signed_over_time: aggregate::time_series(&acc.months),
        new_this_week: aggregate::recent_signings(acc.recent.clone()),
        features: acc.features.to_map(),
        quarters: acc.quarters.to_map(),
        top_countries: acc.countries.top_n(TOP_N),
        top_groups: acc.groups.top_n(TOP_N),
        top_brands: acc.brands.top_n(TOP_N),
        partners: aggregate::ordered_partners(acc.partners.clone()),
    }
}
