use crate::catalog::{
    self, fields, InvoiceBucket, InvoiceStatus, Stage, StageGroup, CREATION_TIMESTAMP,
    LAST_STAGE_CHANGE_TIMESTAMP, PREVIEW_BASE_URL,
};
use crate::labels::{self, LabelMap};
use crate::record::{FieldValue, Record};
use amplify_protocol::{Partner, RecentSigning};
use chrono::{DateTime, Duration, Utc};

/// Trailing window for the "new this week" list.
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Everything one box contributes to the report.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub stage_key: String,
    pub stage: Option<Stage>,
    pub group: StageGroup,
    pub price: f64,
    /// `None` for invited boxes and for codes outside the rollup.
    pub invoice: Option<InvoiceBucket>,
    /// Only populated for signed stages.
    pub signed: Option<SignedDetails>,
    /// `None` for stages hidden from the partner table.
    pub partner: Option<Partner>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignedDetails {
    pub features: Vec<&'static str>,
    pub quarters: Vec<String>,
    pub country: String,
    pub brand: String,
    pub group: String,
    pub signed_at: Option<DateTime<Utc>>,
    pub recent: Option<RecentSigning>,
}

/// Per-box classification against a fixed label map and computation instant.
pub struct Classifier<'a> {
    labels: &'a LabelMap,
    now: DateTime<Utc>,
}

impl<'a> Classifier<'a> {
    pub fn new(labels: &'a LabelMap, now: DateTime<Utc>) -> Self {
        Self { labels, now }
    }

    pub fn classify(&self, record: &Record) -> Classified {
        let stage_key = record.stage_key();
        let stage = Stage::from_key(&stage_key);
        let group = catalog::stage_group(&stage_key);
        if stage.is_none() {
            log::debug!("Box {} has unknown stage {stage_key:?}", record.key());
        }
        let price = record.price();
        let status = InvoiceStatus::from_code(&invoice_code(record));

        let invoice = if stage == Some(Stage::Invited) {
            None
        } else {
            status.and_then(InvoiceStatus::bucket)
        };

        let signed = (group == StageGroup::Signed)
            .then(|| self.signed_details(record, &stage_key, price));

        let partner = stage
            .map_or(true, Stage::is_listed)
            .then(|| self.partner(record, &stage_key, price, status));

        Classified {
            stage_key,
            stage,
            group,
            price,
            invoice,
            signed,
            partner,
        }
    }

    fn signed_details(&self, record: &Record, stage_key: &str, price: f64) -> SignedDetails {
        let signed_at = signed_date(record);
        if signed_at.is_none() {
            log::debug!("Box {} has no resolvable signed date", record.key());
        }
        let recent = signed_at
            .filter(|at| self.is_recent(*at))
            .map(|at| RecentSigning {
                key: record.key(),
                name: record.name(),
                stage: catalog::stage_label(stage_key),
                price: price as i64,
                signed_date: at.format("%b %d, %Y").to_string(),
            });

        SignedDetails {
            features: labels::present_features(record).map(|f| f.name).collect(),
            quarters: labels::quarters(record),
            country: record.text(fields::COUNTRY),
            brand: record.text(fields::BRAND),
            group: record.text(fields::GROUP),
            signed_at,
            recent,
        }
    }

    fn is_recent(&self, at: DateTime<Utc>) -> bool {
        at <= self.now && at >= self.now - Duration::days(RECENT_WINDOW_DAYS)
    }

    fn partner(
        &self,
        record: &Record,
        stage_key: &str,
        price: f64,
        status: Option<InvoiceStatus>,
    ) -> Partner {
        let key = record.key();
        Partner {
            streak_url: format!("{PREVIEW_BASE_URL}{key}"),
            key,
            name: record.name(),
            stage: catalog::stage_label(stage_key),
            stage_key: stage_key.to_string(),
            price: price as i64,
            invoice_status: status.map(|s| s.label().to_string()).unwrap_or_default(),
            invoice_url: invoice_url(record),
            features: labels::features(record, self.labels),
            quarters: labels::quarters(record),
            country: record.text(fields::COUNTRY),
            brand: record.text(fields::BRAND),
            group: record.text(fields::GROUP),
            email: record.text(fields::EMAIL),
        }
    }
}

fn invoice_code(record: &Record) -> String {
    match record.field_value(fields::INVOICE_STATUS) {
        FieldValue::Text(s) => s.trim().to_string(),
        FieldValue::Number(n) => n.to_string(),
        FieldValue::Absent | FieldValue::List(_) => String::new(),
    }
}

/// The stored invoice link when it is an absolute http(s) URL, else empty.
pub fn invoice_url(record: &Record) -> String {
    let raw = record.text(fields::INVOICE_URL);
    match url::Url::parse(&raw) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => raw,
        _ => String::new(),
    }
}

/// Invoice date field, then last stage change, then creation time.
pub fn signed_date(record: &Record) -> Option<DateTime<Utc>> {
    invoice_date_ms(record)
        .and_then(decode_epoch_ms)
        .or_else(|| {
            record
                .timestamp_ms(LAST_STAGE_CHANGE_TIMESTAMP)
                .and_then(decode_epoch_ms)
        })
        .or_else(|| record.timestamp_ms(CREATION_TIMESTAMP).and_then(decode_epoch_ms))
}

fn invoice_date_ms(record: &Record) -> Option<i64> {
    match record.field_value(fields::INVOICE_DATE) {
        FieldValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|v| v as i64)),
        FieldValue::Text(s) => s.trim().parse().ok(),
        FieldValue::Absent | FieldValue::List(_) => None,
    }
}

fn decode_epoch_ms(ms: i64) -> Option<DateTime<Utc>> {
    if ms <= 0 {
        return None;
    }
    DateTime::<Utc>::from_timestamp_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn ms(dt: DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    fn classify(value: serde_json::Value) -> Classified {
        let labels = LabelMap::new();
        Classifier::new(&labels, now()).classify(&Record::new(value))
    }

    #[test]
    fn tier_one_paid_box() {
        let c = classify(json!({
            "key": "k1",
            "name": "Hotel Alpha",
            "stageKey": "5014",
            "fields": { "1024": "$5,000", "1037": "9002" }
        }));
        assert_eq!(c.stage, Some(Stage::Tier1));
        assert_eq!(c.group, StageGroup::Signed);
        assert_eq!(c.price, 5000.0);
        assert_eq!(c.invoice, Some(InvoiceBucket::Paid));
        let partner = c.partner.expect("listed");
        assert_eq!(partner.stage, "Tier 1");
        assert_eq!(partner.invoice_status, "Paid");
        assert_eq!(partner.streak_url, "https://app.streak.com/preview/k1");
        assert_eq!(partner.price, 5000);
    }

    #[test]
    fn invited_boxes_skip_invoice_rollup_and_listing() {
        let c = classify(json!({
            "stageKey": "5002",
            "fields": { "1024": "100", "1037": "9002" }
        }));
        assert_eq!(c.invoice, None);
        assert!(c.partner.is_none());
        assert!(c.signed.is_none());
    }

    #[test]
    fn future_leads_roll_up_invoices_but_are_not_listed() {
        let c = classify(json!({
            "stageKey": "5018",
            "fields": { "1024": "100", "1037": "9001" }
        }));
        assert_eq!(c.invoice, Some(InvoiceBucket::Outstanding));
        assert!(c.partner.is_none());
    }

    #[test]
    fn unknown_stage_is_listed_with_raw_label() {
        let c = classify(json!({ "stageKey": "7777", "name": "Mystery" }));
        assert_eq!(c.group, StageGroup::Other);
        assert_eq!(c.partner.expect("listed").stage, "7777");
    }

    #[test]
    fn unmapped_invoice_code_is_blank() {
        let c = classify(json!({ "stageKey": "5011", "fields": { "1037": "9003" } }));
        assert_eq!(c.invoice, None);
        assert_eq!(c.partner.unwrap().invoice_status, "To Invoice");

        let c = classify(json!({ "stageKey": "5011", "fields": { "1037": "42" } }));
        assert_eq!(c.partner.unwrap().invoice_status, "");
    }

    #[test]
    fn invoice_url_must_be_absolute_http() {
        let url_of = |raw: &str| {
            invoice_url(&Record::new(json!({ "fields": { "1035": raw } })))
        };
        assert_eq!(url_of(" https://pay.example.com/inv/1 "), "https://pay.example.com/inv/1");
        assert_eq!(url_of("http://example.com"), "http://example.com");
        assert_eq!(url_of("httpbin"), "");
        assert_eq!(url_of("ftp://example.com/x"), "");
        assert_eq!(url_of("/relative/path"), "");
        assert_eq!(url_of("http://"), "");
    }

    #[test]
    fn signed_date_prefers_invoice_date() {
        let invoice = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        let changed = Utc.with_ymd_and_hms(2026, 2, 5, 0, 0, 0).unwrap();
        let created = Utc.with_ymd_and_hms(2025, 12, 5, 0, 0, 0).unwrap();
        let record = Record::new(json!({
            "fields": { "1036": ms(invoice) },
            "lastStageChangeTimestamp": ms(changed),
            "creationTimestamp": ms(created)
        }));
        assert_eq!(signed_date(&record), Some(invoice));

        let record = Record::new(json!({
            "fields": { "1036": "not a date" },
            "lastStageChangeTimestamp": ms(changed),
            "creationTimestamp": ms(created)
        }));
        assert_eq!(signed_date(&record), Some(changed));

        let record = Record::new(json!({
            "lastStageChangeTimestamp": null,
            "creationTimestamp": ms(created)
        }));
        assert_eq!(signed_date(&record), Some(created));

        assert_eq!(signed_date(&Record::new(json!({ "creationTimestamp": -5 }))), None);
    }

    #[test]
    fn recent_window_is_trailing_seven_days() {
        let inside = now() - Duration::days(3);
        let outside = now() - Duration::days(8);
        let future = now() + Duration::days(1);
        let recent = |at: DateTime<Utc>| {
            classify(json!({
                "key": "k",
                "name": "N",
                "stageKey": "5015",
                "fields": { "1024": 10 },
                "creationTimestamp": ms(at)
            }))
            .signed
            .expect("signed")
            .recent
        };
        let entry = recent(inside).expect("inside window");
        assert_eq!(entry.stage, "Tier 2");
        assert_eq!(entry.signed_date, "Mar 07, 2026");
        assert!(recent(outside).is_none());
        assert!(recent(future).is_none());
    }

    #[test]
    fn signed_details_collect_side_channels() {
        let c = classify(json!({
            "stageKey": "5016",
            "fields": {
                "1051": " Canada ",
                "1033": "",
                "1034": "Collective",
                "1053": ["9001", "9002"],
                "1066": "Spring",
                "1067": ["9025"]
            }
        }));
        let signed = c.signed.expect("signed");
        assert_eq!(signed.country, "Canada");
        assert_eq!(signed.brand, "");
        assert_eq!(signed.group, "Collective");
        assert_eq!(signed.quarters, vec!["Q1", "Q2"]);
        assert_eq!(signed.features, vec!["Forum"]);
        assert!(signed.signed_at.is_none());
    }

    #[test]
    fn signed_features_match_partner_features() {
        let c = classify(json!({
            "key": "k1",
            "stageKey": "5014",
            "fields": {
                "1063": 1700000000000u64,
                "1066": "   ",
                "1067": ["9025", "9031"],
                "1070": [],
                "1075": "Spring"
            }
        }));
        let signed = c.signed.expect("signed");
        let partner = c.partner.expect("listed");
        let listed: Vec<&str> = partner.features.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(signed.features, listed);
        assert_eq!(signed.features, vec!["Collection", "Newsletter", "Social Media"]);
    }
}
