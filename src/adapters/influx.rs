//! InfluxDB 1.x writer speaking line protocol over HTTP.

use crate::domain::model::{FieldValue, Point};
use crate::domain::ports::PointWriter;
use crate::utils::error::{CollectorError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::fmt::Write as FmtWrite;
use std::time::Duration;

/// Line breaks end a line in the protocol, so they are written as spaces
/// before the position-specific escaping is applied.
fn escape(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        let c = if matches!(c, '\n' | '\r') { ' ' } else { c };
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn escape_measurement(value: &str) -> String {
    escape(value, &[',', ' '])
}

fn escape_key(value: &str) -> String {
    escape(value, &[',', '=', ' '])
}

fn escape_string_field(value: &str) -> String {
    escape(value, &['"', '\\'])
}

/// Render one point as a line. Non-finite floats are left out; a point whose
/// fields are all dropped renders as `None`.
pub fn to_line(point: &Point) -> Option<String> {
    let mut line = escape_measurement(&point.measurement);
    for (key, value) in &point.tags {
        // writing to a String cannot fail
        let _ = write!(line, ",{}={}", escape_key(key), escape_key(value));
    }

    let mut first_field = true;
    for (key, value) in &point.fields {
        let rendered = match value {
            FieldValue::Float(f) if f.is_finite() => format!("{}", f),
            FieldValue::Float(_) => continue,
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::String(s) => format!("\"{}\"", escape_string_field(s)),
        };
        line.push(if first_field { ' ' } else { ',' });
        first_field = false;
        let _ = write!(line, "{}={}", escape_key(key), rendered);
    }

    if first_field {
        return None;
    }

    let nanos = point.timestamp.timestamp_nanos_opt()?;
    let _ = write!(line, " {}", nanos);
    Some(line)
}

pub fn to_line_protocol(points: &[Point]) -> String {
    points
        .iter()
        .filter_map(to_line)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone)]
pub struct InfluxClient {
    client: Client,
    url: String,
    database: String,
    username: Option<String>,
    password: Option<String>,
}

impl InfluxClient {
    pub fn new(url: impl Into<String>, database: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
            database: database.into(),
            username: None,
            password: None,
        })
    }

    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    pub fn write_url(&self) -> String {
        format!("{}/write", self.url)
    }
}

#[async_trait]
impl PointWriter for InfluxClient {
    async fn write_points(&self, points: &[Point]) -> Result<()> {
        let body = to_line_protocol(points);
        if body.is_empty() {
            tracing::debug!("No points to write");
            return Ok(());
        }

        let mut query = vec![("db", self.database.as_str()), ("precision", "ns")];
        if let Some(username) = &self.username {
            query.push(("u", username.as_str()));
        }
        if let Some(password) = &self.password {
            query.push(("p", password.as_str()));
        }

        tracing::debug!(
            "POST {} ({} lines, {} bytes)",
            self.write_url(),
            body.lines().count(),
            body.len()
        );
        let response = self
            .client
            .post(self.write_url())
            .query(&query)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollectorError::InfluxError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
