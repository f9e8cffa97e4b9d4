use crate::catalog::{InvoiceBucket, Stage, StageGroup};
use crate::classify::Classified;
use amplify_protocol::{FunnelStage, MonthlySignings, Partner, Ranking, RecentSigning};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};

pub const TOP_N: usize = 10;

/// Bucket for boxes with no quarter selected.
pub const QUARTER_TBD: &str = "TBD";

/// Frequency counter that remembers first-seen order for stable tie-breaking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    order: Vec<String>,
    counts: HashMap<String, usize>,
}

impl Tally {
    pub fn add(&mut self, key: &str) {
        match self.counts.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                self.order.push(key.to_string());
                self.counts.insert(key.to_string(), 1);
            }
        }
    }

    pub fn get(&self, key: &str) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Highest counts first; equal counts keep first-seen order.
    pub fn top_n(&self, n: usize) -> Ranking {
        let mut ranked: Vec<(String, usize)> = self
            .order
            .iter()
            .map(|key| (key.clone(), self.get(key)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    pub fn to_map(&self) -> BTreeMap<String, usize> {
        self.order
            .iter()
            .map(|key| (key.clone(), self.get(key)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageSlot {
    pub count: usize,
    pub value: f64,
}

impl StageSlot {
    /// Whole-dollar value as published. Every total is summed from these.
    pub fn whole(&self) -> i64 {
        self.value as i64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InvoiceTotals {
    pub paid: f64,
    pub outstanding: f64,
    pub waiting: f64,
    pub in_kind: f64,
}

impl InvoiceTotals {
    fn add(&mut self, bucket: InvoiceBucket, price: f64) {
        let slot = match bucket {
            InvoiceBucket::Paid => &mut self.paid,
            InvoiceBucket::Outstanding => &mut self.outstanding,
            InvoiceBucket::Waiting => &mut self.waiting,
            InvoiceBucket::InKind => &mut self.in_kind,
        };
        *slot += price;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonthBucket {
    pub count: usize,
    pub value: f64,
}

/// Running state of a single pass over the boxes.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    pub signed: BTreeMap<Stage, StageSlot>,
    pub pipeline: BTreeMap<Stage, StageSlot>,
    /// Keyed by raw stage key, unknown keys included.
    pub other: Tally,
    pub invoices: InvoiceTotals,
    pub features: Tally,
    pub quarters: Tally,
    pub countries: Tally,
    pub brands: Tally,
    pub groups: Tally,
    /// Keyed by (year, month).
    pub months: BTreeMap<(i32, u32), MonthBucket>,
    pub recent: Vec<RecentSigning>,
    pub partners: Vec<(u8, Partner)>,
}

impl Accumulator {
    pub fn fold(&mut self, item: Classified) {
        match (item.group, item.stage) {
            (StageGroup::Signed, Some(stage)) => bump(&mut self.signed, stage, item.price),
            (StageGroup::Pipeline, Some(stage)) => bump(&mut self.pipeline, stage, item.price),
            _ => self.other.add(&item.stage_key),
        }

        if let Some(bucket) = item.invoice {
            self.invoices.add(bucket, item.price);
        }

        if let Some(signed) = item.signed {
            for name in &signed.features {
                self.features.add(name);
            }
            if signed.quarters.is_empty() {
                self.quarters.add(QUARTER_TBD);
            }
            for quarter in &signed.quarters {
                self.quarters.add(quarter);
            }
            for (tally, value) in [
                (&mut self.countries, &signed.country),
                (&mut self.brands, &signed.brand),
                (&mut self.groups, &signed.group),
            ] {
                if !value.is_empty() {
                    tally.add(value);
                }
            }
            if let Some(at) = signed.signed_at {
                let bucket = self.months.entry(month_of(at)).or_default();
                bucket.count += 1;
                bucket.value += item.price;
            }
            if let Some(recent) = signed.recent {
                self.recent.push(recent);
            }
        }

        if let Some(partner) = item.partner {
            self.partners.push((item.group.rank(), partner));
        }
    }

    pub fn totals(&self) -> Totals {
        let total_signed: i64 = self.signed.values().map(StageSlot::whole).sum();
        let pipeline_only: i64 = self.pipeline.values().map(StageSlot::whole).sum();
        Totals {
            signed_count: self.signed.values().map(|s| s.count).sum(),
            total_signed,
            total_pipeline: total_signed + pipeline_only,
        }
    }

    pub fn slot(&self, stage: Stage) -> StageSlot {
        self.signed
            .get(&stage)
            .or_else(|| self.pipeline.get(&stage))
            .copied()
            .unwrap_or_default()
    }
}

fn bump(slots: &mut BTreeMap<Stage, StageSlot>, stage: Stage, price: f64) {
    let slot = slots.entry(stage).or_default();
    slot.count += 1;
    slot.value += price;
}

fn month_of(at: DateTime<Utc>) -> (i32, u32) {
    (at.year(), at.month())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub signed_count: usize,
    pub total_signed: i64,
    pub total_pipeline: i64,
}

/// Signed stages, then pipeline stages, then populated non-financial stages.
pub fn funnel(acc: &Accumulator) -> Vec<FunnelStage> {
    let mut out = Vec::new();
    for stage in Stage::SIGNED {
        let slot = acc.slot(stage);
        out.push(FunnelStage {
            label: format!("Signed — {}", stage.label()),
            stage_key: stage.key().to_string(),
            count: slot.count,
            value: slot.whole(),
        });
    }
    for stage in Stage::PIPELINE {
        let slot = acc.slot(stage);
        out.push(FunnelStage {
            label: stage.label().to_string(),
            stage_key: stage.key().to_string(),
            count: slot.count,
            value: slot.whole(),
        });
    }
    for stage in Stage::FUNNEL_OTHER {
        let count = acc.other.get(stage.key());
        if count > 0 {
            out.push(FunnelStage {
                label: stage.label().to_string(),
                stage_key: stage.key().to_string(),
                count,
                value: 0,
            });
        }
    }
    out
}

/// Ascending months with running totals carried across the whole series.
/// The running value is the sum of the published monthly values.
pub fn time_series(months: &BTreeMap<(i32, u32), MonthBucket>) -> Vec<MonthlySignings> {
    let mut cumulative_count = 0usize;
    let mut cumulative_value = 0i64;
    months
        .iter()
        .map(|(&(year, month), bucket)| {
            let value = bucket.value as i64;
            cumulative_count += bucket.count;
            cumulative_value += value;
            MonthlySignings {
                month: NaiveDate::from_ymd_opt(year, month, 1)
                    .map(|d| d.format("%b %Y").to_string())
                    .unwrap_or_else(|| format!("{year:04}-{month:02}")),
                key: format!("{year:04}-{month:02}"),
                count: bucket.count,
                value,
                cumulative_count,
                cumulative_value,
            }
        })
        .collect()
}

/// Highest price first; equal prices keep input order.
pub fn recent_signings(mut recent: Vec<RecentSigning>) -> Vec<RecentSigning> {
    recent.sort_by(|a, b| b.price.cmp(&a.price));
    recent
}

/// Signed, then pipeline, then everything else; by name within a rank.
pub fn ordered_partners(mut partners: Vec<(u8, Partner)>) -> Vec<Partner> {
    partners.sort_by(|(ra, a), (rb, b)| ra.cmp(rb).then_with(|| a.name.cmp(&b.name)));
    partners.into_iter().map(|(_, partner)| partner).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tally_ranks_by_count_then_first_seen() {
        let mut tally = Tally::default();
        for key in ["Peru", "Chile", "Chile", "Mexico", "Peru", "Brazil"] {
            tally.add(key);
        }
        assert_eq!(
            tally.top_n(10),
            vec![
                ("Peru".to_string(), 2),
                ("Chile".to_string(), 2),
                ("Mexico".to_string(), 1),
                ("Brazil".to_string(), 1),
            ]
        );
        assert_eq!(tally.top_n(1), vec![("Peru".to_string(), 2)]);
        assert_eq!(tally.get("Chile"), 2);
        assert_eq!(tally.get("Uruguay"), 0);
    }

    #[test]
    fn tally_truncates_to_n() {
        let mut tally = Tally::default();
        for i in 0..15 {
            tally.add(&format!("k{i}"));
        }
        assert_eq!(tally.top_n(TOP_N).len(), TOP_N);
    }

    #[test]
    fn time_series_accumulates_across_years() {
        let mut months = BTreeMap::new();
        months.insert((2026, 1), MonthBucket { count: 1, value: 100.0 });
        months.insert((2025, 11), MonthBucket { count: 2, value: 50.5 });
        months.insert((2025, 12), MonthBucket { count: 3, value: 0.0 });
        let series = time_series(&months);
        let keys: Vec<_> = series.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["2025-11", "2025-12", "2026-01"]);
        assert_eq!(series[0].month, "Nov 2025");
        assert_eq!(series[0].value, 50);
        assert_eq!(
            series.iter().map(|m| m.cumulative_count).collect::<Vec<_>>(),
            vec![2, 5, 6]
        );
        assert_eq!(series[2].cumulative_value, 150);
    }

    #[test]
    fn cumulative_value_sums_published_months() {
        let mut months = BTreeMap::new();
        months.insert((2026, 1), MonthBucket { count: 1, value: 0.6 });
        months.insert((2026, 2), MonthBucket { count: 1, value: 0.6 });
        months.insert((2026, 3), MonthBucket { count: 1, value: 10.9 });
        let series = time_series(&months);
        let mut running = 0;
        for month in &series {
            running += month.value;
            assert_eq!(month.cumulative_value, running);
        }
        assert_eq!(series[2].cumulative_value, 10);
    }

    #[test]
    fn totals_are_sums_of_published_stage_values() {
        let mut acc = Accumulator::default();
        bump(&mut acc.signed, Stage::Tier1, 0.5);
        bump(&mut acc.signed, Stage::Tier2, 100.75);
        bump(&mut acc.pipeline, Stage::NeedsInvoice, 0.5);
        bump(&mut acc.pipeline, Stage::InDiscussion, 0.75);
        let totals = acc.totals();
        assert_eq!(totals.signed_count, 2);
        assert_eq!(totals.total_signed, 100);
        assert_eq!(totals.total_pipeline, 100);
    }

    #[test]
    fn empty_funnel_has_signed_and_pipeline_rows_only() {
        let rows = funnel(&Accumulator::default());
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0].label, "Signed — Tier 1");
        assert_eq!(rows[1].stage_key, "5016");
        assert_eq!(rows[5].label, "Needs Invoice");
        assert!(rows.iter().all(|r| r.count == 0 && r.value == 0));
    }

    #[test]
    fn funnel_includes_populated_other_stages() {
        let mut acc = Accumulator::default();
        acc.other.add("5008");
        acc.other.add("5008");
        acc.other.add("5002");
        let rows = funnel(&acc);
        assert_eq!(rows.len(), 9);
        let last = rows.last().unwrap();
        assert_eq!(last.label, "Declined");
        assert_eq!(last.count, 2);
        assert_eq!(last.value, 0);
    }

    #[test]
    fn recent_sorted_by_price_descending() {
        let entry = |name: &str, price| RecentSigning {
            key: name.to_string(),
            name: name.to_string(),
            stage: "Tier 1".to_string(),
            price,
            signed_date: String::new(),
        };
        let sorted = recent_signings(vec![entry("a", 10), entry("b", 30), entry("c", 10)]);
        let names: Vec<_> = sorted.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
