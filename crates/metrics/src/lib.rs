//! # Amplify Metrics
//!
//! Turns the raw pipeline boxes of the partner CRM into the dashboard [`Report`].
//!
//! ## Architecture
//!
//! ```text
//! Record[] + LabelMap + now
//!     │
//!     ├──> Classifier (one box at a time)
//!     │      ├─ stage group: signed | pipeline | other
//!     │      ├─ invoice rollup bucket
//!     │      ├─ signed-only side channels (features, quarters, geography, signed date)
//!     │      └─ partner row projection
//!     │
//!     ├──> Accumulator (fold)
//!     │
//!     └──> Report assembly
//!            ├─ totals, per-stage maps, funnel
//!            ├─ monthly series with running totals, new this week
//!            └─ top-N rankings, ordered partner table
//! ```
//!
//! Malformed box data never fails the pass: prices degrade to 0, missing fields to empty
//! values and unknown codes to their raw text.
//!
//! ## Example
//!
//! ```rust
//! use amplify_metrics::{compute_report, LabelMap, Record};
//! use chrono::Utc;
//! use serde_json::json;
//!
//! let records = vec![Record::new(json!({
//!     "key": "b1",
//!     "name": "Hotel Alpha",
//!     "stageKey": "5014",
//!     "fields": { "1024": "$5,000", "1037": "9002" }
//! }))];
//! let report = compute_report(&records, &LabelMap::new(), Utc::now());
//! assert_eq!(report.total_signed, 5000);
//! assert_eq!(report.paid, 5000);
//! ```

pub mod aggregate;
pub mod catalog;
pub mod classify;
mod error;
pub mod labels;
mod record;
mod report;

pub use aggregate::{Accumulator, Tally};
pub use amplify_protocol::Report;
pub use catalog::{Stage, StageGroup};
pub use classify::{Classified, Classifier};
pub use error::{CatalogError, Result};
pub use labels::LabelMap;
pub use record::{parse_amount, FieldValue, Record};
pub use report::{accumulate, assemble, compute_report};
