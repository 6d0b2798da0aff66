//! HTTP client for the legacy source system's export endpoints.
//!
//! The legacy side exposes a small JSON export surface per migration
//! unit: `GET {base}/export/{unit_key}?limit=N&offset=M` for paginated
//! listing and `GET {base}/export/record/{source_id}` for a single
//! record. Some deployments ignore the pagination parameters and return
//! the whole set; the controller tolerates that.

use std::time::Duration;

use serde::Deserialize;

use crosswalk_core::record::SourceRecord;

use crate::error::EngineError;
use crate::traits::SourceClient;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Export endpoints deliver either a bare array or a wrapped object,
/// depending on the legacy side's version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportPage {
    Wrapped { records: Vec<SourceRecord> },
    Bare(Vec<SourceRecord>),
}

impl ExportPage {
    fn into_records(self) -> Vec<SourceRecord> {
        match self {
            ExportPage::Wrapped { records } => records,
            ExportPage::Bare(records) => records,
        }
    }
}

pub struct HttpSourceClient {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpSourceClient {
    pub fn new(base_url: &str) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: None,
        })
    }

    pub fn with_bearer_token(mut self, token: &str) -> Self {
        self.bearer_token = Some(token.to_string());
        self
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        let mut request = self.client.get(url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        request
    }
}

#[async_trait::async_trait]
impl SourceClient for HttpSourceClient {
    async fn list_records(
        &self,
        unit_key: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SourceRecord>, EngineError> {
        let url = format!("{}/export/{unit_key}", self.base_url);
        let page: ExportPage = self
            .get(url)
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(page.into_records())
    }

    async fn get_record_by_id(
        &self,
        source_id: &str,
    ) -> Result<Option<SourceRecord>, EngineError> {
        let url = format!("{}/export/record/{source_id}", self.base_url);
        let response = self.get(url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let record = response.error_for_status()?.json().await?;
        Ok(Some(record))
    }
}
