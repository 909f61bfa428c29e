//! ClickHouse sample store over the HTTP interface.

use crate::dataset::RawSample;
use crate::error::{TrainingError, TrainingResult};
use crate::extract::{SampleQuery, SampleStore};
use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use reqwest::{Client, Url};
use tracing::{debug, error};

/// Connection to a ClickHouse server.
///
/// Built from a URL of the form `http(s)://user:password@host:port/database`.
/// Credentials are sent as basic auth and the path selects the database.
/// Query-string pairs are ClickHouse settings and ride along on every request.
#[derive(Debug, Clone)]
pub struct ClickHouseStore {
    endpoint: Url,
    user: Option<String>,
    password: Option<String>,
    database: Option<String>,
    settings: Vec<(String, String)>,
    client: Client,
}

impl ClickHouseStore {
    pub fn from_url(url: &str) -> TrainingResult<Self> {
        let mut endpoint = Url::parse(url)
            .map_err(|e| TrainingError::Config(format!("invalid warehouse URL: {e}")))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(TrainingError::Config(format!(
                "warehouse URL must use http or https, got `{}`",
                endpoint.scheme()
            )));
        }

        let user = Some(decode_userinfo(endpoint.username(), "user")?).filter(|u| !u.is_empty());
        let password = endpoint.password().map(|p| decode_userinfo(p, "password")).transpose()?;
        let mut database = Some(endpoint.path().trim_matches('/').to_string()).filter(|d| !d.is_empty());

        let mut settings = Vec::new();
        for (name, value) in endpoint.query_pairs().into_owned() {
            if name.starts_with("param_") {
                return Err(TrainingError::Config(format!(
                    "warehouse URL cannot bind query parameter `{name}`"
                )));
            }
            if name == "database" {
                if database.as_ref().is_some_and(|d| *d != value) {
                    return Err(TrainingError::Config(format!(
                        "warehouse URL names two databases: `{}` and `{value}`",
                        database.unwrap_or_default()
                    )));
                }
                database = Some(value);
                continue;
            }
            settings.push((name, value));
        }

        endpoint
            .set_username("")
            .and_then(|()| endpoint.set_password(None))
            .map_err(|()| TrainingError::Config("warehouse URL cannot carry credentials".to_string()))?;
        endpoint.set_path("/");
        endpoint.set_query(None);

        Ok(Self { endpoint, user, password, database, settings, client: Client::new() })
    }

    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Endpoint with credentials stripped, safe to log.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_url(&self, query: &SampleQuery) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(database) = &self.database {
                pairs.append_pair("database", database);
            }
            for (name, value) in &self.settings {
                pairs.append_pair(name, value);
            }
            for (name, value) in &query.params {
                pairs.append_pair(&format!("param_{name}"), value);
            }
        }
        url
    }
}

#[async_trait]
impl SampleStore for ClickHouseStore {
    async fn query_samples(&self, query: &SampleQuery) -> TrainingResult<Vec<RawSample>> {
        let url = self.request_url(query);
        debug!(endpoint = %self.endpoint, params = ?query.params, "Sending warehouse query");

        let mut request = self.client.post(url).body(query.sql.clone());
        if let Some(user) = &self.user {
            request = request.basic_auth(user, self.password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| TrainingError::Store(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TrainingError::Store(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            error!(status = %status, error = %body, "Warehouse query failed");
            return Err(TrainingError::Store(format!("query failed ({status}): {}", body.trim())));
        }

        parse_rows(&body)
    }
}

fn decode_userinfo(raw: &str, part: &str) -> TrainingResult<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| TrainingError::Config(format!("warehouse URL {part} is not valid UTF-8: {e}")))
}

/// Parse a `JSONEachRow` response body.
fn parse_rows(body: &str) -> TrainingResult<Vec<RawSample>> {
    body.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<RawSample>(line).map_err(|e| {
                TrainingError::structural(format!("warehouse row {}", idx + 1), e.to_string())
            })
        })
        .collect()
}
