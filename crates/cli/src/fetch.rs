use crate::config::Config;
use amplify_metrics::{LabelMap, Record};
use anyhow::{Context as AnyhowContext, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A paginated box listing.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, page: usize, limit: usize) -> Result<Vec<Record>>;
}

/// Reads pages from 0 until an empty or short page.
pub async fn fetch_all<S>(source: &S, page_size: usize) -> Result<Vec<Record>>
where
    S: PageSource + ?Sized,
{
    if page_size == 0 {
        anyhow::bail!("page size must be > 0");
    }

    let mut records = Vec::new();
    let mut page = 0usize;
    loop {
        let batch = source
            .fetch_page(page, page_size)
            .await
            .with_context(|| format!("Failed to fetch box page {page}"))?;
        let len = batch.len();
        if len == 0 {
            break;
        }
        records.extend(batch);
        log::debug!("Fetched page {page}: {len} boxes");
        if len < page_size {
            break;
        }
        page += 1;
    }

    log::info!("Fetched {} boxes", records.len());
    Ok(records)
}

/// Pipeline API client. The API key is sent as the basic-auth user with an empty password.
pub struct StreakClient {
    http: Client,
    base_url: String,
    pipeline_key: String,
    api_key: String,
}

impl StreakClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            pipeline_key: config.pipeline_key.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!(
                "{}/pipelines/{}/{path}",
                self.base_url, self.pipeline_key
            ))
            .basic_auth(&self.api_key, Some(""))
    }

    /// Dropdown and tag labels for the pipeline's fields. Never fails: on error the
    /// dashboard falls back to raw option keys.
    pub async fn fetch_label_map(&self) -> LabelMap {
        match self.try_fetch_label_map().await {
            Ok(labels) => {
                log::debug!("Loaded option labels for {} fields", labels.len());
                labels
            }
            Err(err) => {
                log::warn!("Failed to load field labels, using raw values: {err:#}");
                LabelMap::new()
            }
        }
    }

    async fn try_fetch_label_map(&self) -> Result<LabelMap> {
        let fields: Vec<FieldDefinition> = self
            .get("fields")
            .send()
            .await
            .context("GET fields")?
            .error_for_status()
            .context("GET fields")?
            .json()
            .await
            .context("Invalid fields payload")?;
        Ok(label_map_from_fields(&fields))
    }
}

#[async_trait]
impl PageSource for StreakClient {
    async fn fetch_page(&self, page: usize, limit: usize) -> Result<Vec<Record>> {
        let response = self
            .get("boxes")
            .query(&[("limit", limit), ("page", page)])
            .send()
            .await
            .context("GET boxes")?
            .error_for_status()
            .context("GET boxes")?;
        response.json().await.context("Invalid boxes payload")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dropdown_settings: Option<DropdownSettings>,
    #[serde(default)]
    pub tag_settings: Option<TagSettings>,
}

#[derive(Debug, Deserialize)]
pub struct DropdownSettings {
    #[serde(default)]
    pub items: Vec<DropdownItem>,
}

#[derive(Debug, Deserialize)]
pub struct DropdownItem {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TagSettings {
    #[serde(default)]
    pub tags: Vec<TagItem>,
}

#[derive(Debug, Deserialize)]
pub struct TagItem {
    pub key: String,
    pub tag: String,
}

pub fn label_map_from_fields(fields: &[FieldDefinition]) -> LabelMap {
    let mut labels = LabelMap::new();
    for field in fields {
        let dropdown = field
            .dropdown_settings
            .iter()
            .flat_map(|s| &s.items)
            .map(|item| (item.key.clone(), item.name.clone()));
        let tags = field
            .tag_settings
            .iter()
            .flat_map(|s| &s.tags)
            .map(|tag| (tag.key.clone(), tag.tag.clone()));
        let options: std::collections::HashMap<_, _> = dropdown.chain(tags).collect();
        if !options.is_empty() {
            labels.insert(field.key.clone(), options);
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakePages {
        pages: Vec<usize>,
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    impl FakePages {
        fn new(pages: &[usize]) -> Self {
            Self {
                pages: pages.to_vec(),
                calls: AtomicUsize::new(0),
                fail_on: None,
            }
        }
    }

    #[async_trait]
    impl PageSource for FakePages {
        async fn fetch_page(&self, page: usize, _limit: usize) -> Result<Vec<Record>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(page) {
                anyhow::bail!("boom");
            }
            let size = self.pages.get(page).copied().unwrap_or(0);
            Ok((0..size)
                .map(|i| Record::new(json!({ "key": format!("{page}-{i}") })))
                .collect())
        }
    }

    #[tokio::test]
    async fn stops_on_short_page() {
        let source = FakePages::new(&[3, 3, 1, 3]);
        let records = fetch_all(&source, 3).await.unwrap();
        assert_eq!(records.len(), 7);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(records[6].key(), "2-0");
    }

    #[tokio::test]
    async fn stops_on_empty_page() {
        let source = FakePages::new(&[2, 2]);
        let records = fetch_all(&source, 2).await.unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_pipeline() {
        let source = FakePages::new(&[]);
        assert!(fetch_all(&source, 500).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn page_error_is_fatal() {
        let mut source = FakePages::new(&[2, 2, 2]);
        source.fail_on = Some(1);
        let err = fetch_all(&source, 2).await.unwrap_err();
        assert!(format!("{err:#}").contains("page 1"));
    }

    #[tokio::test]
    async fn zero_page_size_is_rejected() {
        let source = FakePages::new(&[1]);
        assert!(fetch_all(&source, 0).await.is_err());
    }

    #[test]
    fn label_map_merges_dropdowns_and_tags() {
        let fields: Vec<FieldDefinition> = serde_json::from_value(json!([
            {
                "key": "1063",
                "name": "Newsletter",
                "type": "TAG",
                "tagSettings": { "tags": [ { "key": "9101", "tag": "March issue" } ] }
            },
            {
                "key": "1037",
                "name": "Invoice",
                "dropdownSettings": { "items": [
                    { "key": "9001", "name": "Outstanding" },
                    { "key": "9002", "name": "Paid" }
                ] }
            },
            { "key": "1024", "name": "Price", "type": "TEXT_INPUT" }
        ]))
        .unwrap();
        let labels = label_map_from_fields(&fields);
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["1063"]["9101"], "March issue");
        assert_eq!(labels["1037"]["9002"], "Paid");
        assert!(!labels.contains_key("1024"));
    }
}
