use crate::error::QueryError;
use crate::model::Location;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// Path of the AQL endpoint below the repository base URL.
const AQL_PATH: &str = "api/search/aql";

/// Searches an Artifactory instance with AQL `items.find` queries.
pub struct AqlSearch {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl AqlSearch {
    /// Creates a search client for `base_url`, e.g.
    /// `https://acme.jfrog.io/artifactory`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not an absolute http(s) URL.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), base_url, token)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        token: impl Into<String>,
    ) -> Result<Self> {
        let endpoint = endpoint_url(base_url)?;
        Ok(Self {
            client,
            endpoint,
            token: token.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn endpoint_url(base_url: &str) -> Result<String> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let url = reqwest::Url::parse(trimmed)
        .with_context(|| format!("Invalid repository URL: {}", base_url))?;

    if !matches!(url.scheme(), "http" | "https") {
        bail!("Repository URL must use http or https: {}", base_url);
    }

    Ok(format!("{}/{}", trimmed, AQL_PATH))
}

/// Builds an AQL query matching items whose name equals `filename` exactly.
///
/// # Example
///
/// ```
/// use artifact_audit::search::build_query;
///
/// assert_eq!(
///     build_query("bar-1.0.0.tgz"),
///     r#"items.find({"name":{"$eq":"bar-1.0.0.tgz"}}).include("repo","path","name")"#
/// );
/// ```
pub fn build_query(filename: &str) -> String {
    let predicate = serde_json::json!({ "name": { "$eq": filename } });
    format!(
        "items.find({}).include(\"repo\",\"path\",\"name\")",
        predicate
    )
}

#[derive(Deserialize)]
struct AqlResponse {
    results: Vec<AqlItem>,
}

#[derive(Deserialize)]
struct AqlItem {
    repo: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    name: String,
}

impl AqlItem {
    fn into_location(self) -> Location {
        // AQL reports the folder in `path`, with "." for the repository root.
        let path = if self.name.is_empty() {
            self.path
        } else if self.path.is_empty() || self.path == "." {
            self.name
        } else {
            format!("{}/{}", self.path.trim_end_matches('/'), self.name)
        };
        Location::new(self.repo, path)
    }
}

/// Parses an AQL response body into locations, keeping result order.
pub(crate) fn parse_response(body: &str) -> Result<Vec<Location>, QueryError> {
    let response: AqlResponse =
        serde_json::from_str(body).map_err(|e| QueryError::Malformed(e.to_string()))?;
    Ok(response
        .results
        .into_iter()
        .map(AqlItem::into_location)
        .collect())
}

#[async_trait]
impl super::ArtifactSearch for AqlSearch {
    fn name(&self) -> &'static str {
        "Artifactory AQL"
    }

    async fn find(&self, filename: &str) -> Result<Vec<Location>, QueryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(build_query(filename))
            .send()
            .await?;

        if let Some(err) = QueryError::from_status(response.status().as_u16()) {
            return Err(err);
        }

        let body = response.text().await?;
        parse_response(&body)
    }
}
