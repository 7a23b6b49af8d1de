use crate::core::records;
use crate::domain::model::{DataType, Record};
use crate::domain::ports::ZoneParser;
use crate::utils::error::{CollectorError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Zone parser served over HTTP.
///
/// Requests `GET {endpoint}/{data_type}/{zone}` (or `.../{zone1}/{zone2}` for
/// exchanges) and expects parser output as JSON: an object, an array of
/// objects, or `null`.
#[derive(Debug, Clone)]
pub struct HttpZoneParser {
    client: Client,
    endpoint: String,
}

impl HttpZoneParser {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, endpoint))
    }

    /// Share one connection pool between parsers.
    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    /// Zone arguments are percent-encoded as single path segments.
    pub fn request_url(&self, args: &[String], data_type: DataType) -> Result<Url> {
        let invalid = |reason: &str| CollectorError::InvalidConfigValueError {
            field: "parsers.endpoint".to_string(),
            value: self.endpoint.clone(),
            reason: reason.to_string(),
        };

        let mut url = Url::parse(&self.endpoint).map_err(|e| invalid(&e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("URL cannot take path segments"))?
            .pop_if_empty()
            .push(data_type.as_str())
            .extend(args);
        Ok(url)
    }
}

#[async_trait]
impl ZoneParser for HttpZoneParser {
    async fn fetch(
        &self,
        args: &[String],
        data_type: DataType,
        target_datetime: Option<DateTime<Utc>>,
    ) -> Result<Vec<Record>> {
        let url = self.request_url(args, data_type)?;
        let mut request = self.client.get(url.clone());
        if let Some(target) = target_datetime {
            request = request.query(&[(
                "target_datetime",
                target.to_rfc3339_opts(SecondsFormat::Secs, true),
            )]);
        }

        tracing::debug!("Making parser request to: {}", url);
        let response = request.send().await?;
        tracing::debug!("Parser response status: {}", response.status());

        if !response.status().is_success() {
            return Err(CollectorError::ParserStatusError {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let json_data: serde_json::Value = serde_json::from_str(&body)?;
        records::records_from_value(json_data)
    }
}
