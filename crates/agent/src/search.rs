//! Web search for attractions and lodging.
//!
//! [`SearchClient`] is the raw provider seam; [`SearchConnector`] builds the
//! planner's queries, applies the broader-search fallback and projects hits
//! into domain records. Provider failures never escape the connector: they
//! are reported through the [`NoticeSink`] and an empty list is returned.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use tripsmith_core::config::SearchConfig;
use tripsmith_core::domain::trip::{
    Accommodation, Attraction, Budget, DEFAULT_FOOD_TYPE, DEFAULT_LODGING_KIND,
};
use tripsmith_core::notices::{Notice, NoticeSink, NoticeSource};

use crate::retry::RetryRunner;

pub const MAX_ATTRACTIONS: usize = 5;
pub const MAX_ACCOMMODATIONS: usize = 3;
const SNIPPET_CHARS: usize = 150;
const NO_DESCRIPTION: &str = "No description available";
const ATTRACTION_FALLBACK_WARNING: &str =
    "Couldn't find attractions matching your criteria. Trying a broader search...";
const ACCOMMODATION_FALLBACK_WARNING: &str =
    "Couldn't find accommodations matching your criteria. Trying a broader search...";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("search provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode search response: {0}")]
    Decode(String),
}

impl SearchError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) => false,
        }
    }
}

/// One raw result as the provider returns it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}

pub struct TavilyClient {
    http: Client,
    api_key: SecretString,
    base_url: String,
    include_answer: bool,
    retry: RetryRunner,
}

impl TavilyClient {
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| SearchError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            include_answer: config.include_answer,
            retry: RetryRunner::new(config.retry_policy()),
        })
    }

    async fn search_once(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let body = serde_json::json!({
            "api_key": self.api_key.expose_secret(),
            "query": query,
            "max_results": max_results,
            "include_answer": self.include_answer,
            "search_depth": "basic"
        });

        let response = self
            .http
            .post(format!("{}/search", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|error| SearchError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status { status: status.as_u16(), body });
        }

        let payload: TavilyResponse =
            response.json().await.map_err(|error| SearchError::Decode(error.to_string()))?;
        Ok(payload.results)
    }
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.retry
            .run("search.tavily", SearchError::is_retryable, || {
                self.search_once(query, max_results)
            })
            .await
    }
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttractionQuery<'a> {
    pub destination: &'a str,
    pub preferences: &'a str,
    pub budget: Option<Budget>,
    pub hidden_gems: bool,
    pub food_type: &'a str,
}

impl AttractionQuery<'_> {
    pub fn to_query_string(&self) -> String {
        let mut clauses = vec![format!("{} activities in {}", self.preferences, self.destination)];
        if let Some(budget) = self.budget {
            clauses.push(format!("{budget} budget"));
        }
        if self.hidden_gems {
            clauses.push("off the beaten path less touristy".to_string());
        }
        let food_type = self.food_type.trim();
        if !food_type.is_empty() && food_type != DEFAULT_FOOD_TYPE {
            clauses.push(format!("{food_type} friendly"));
        }
        clauses.push("for tourists official sites".to_string());
        join_clauses(clauses)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccommodationQuery<'a> {
    pub destination: &'a str,
    pub budget: Option<Budget>,
    pub accommodation_type: &'a str,
}

impl AccommodationQuery<'_> {
    pub fn to_query_string(&self) -> String {
        let mut clauses =
            vec![format!("{} accommodations in {}", self.accommodation_type, self.destination)];
        if let Some(budget) = self.budget {
            clauses.push(format!("{budget} budget"));
        }
        clauses.push("official sites".to_string());
        join_clauses(clauses)
    }

    fn kind(&self) -> String {
        let kind = self.accommodation_type.trim();
        if kind.is_empty() { DEFAULT_LODGING_KIND.to_string() } else { kind.to_string() }
    }
}

fn join_clauses(clauses: Vec<String>) -> String {
    clauses
        .iter()
        .map(|clause| clause.trim())
        .filter(|clause| !clause.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Clone)]
pub struct SearchConnector {
    client: Arc<dyn SearchClient>,
}

impl SearchConnector {
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self { client }
    }

    pub async fn find_attractions(
        &self,
        query: &AttractionQuery<'_>,
        notices: &dyn NoticeSink,
    ) -> Vec<Attraction> {
        let primary = query.to_query_string();
        let fallback = format!("things to do in {}", query.destination);

        let hits = self
            .search_with_fallback(
                &primary,
                &fallback,
                MAX_ATTRACTIONS,
                ATTRACTION_FALLBACK_WARNING,
                notices,
            )
            .await;

        match hits {
            Ok(hits) => hits.iter().map(project_attraction).collect(),
            Err(error) => {
                warn!(
                    event_name = "planner.search.attractions_failed",
                    destination = query.destination,
                    error = %error,
                    "attraction search failed"
                );
                notices.emit(Notice::error(NoticeSource::Search, format!("Search error: {error}")));
                Vec::new()
            }
        }
    }

    pub async fn find_accommodations(
        &self,
        query: &AccommodationQuery<'_>,
        notices: &dyn NoticeSink,
    ) -> Vec<Accommodation> {
        let primary = query.to_query_string();
        let fallback = format!("hotels in {}", query.destination);

        let hits = self
            .search_with_fallback(
                &primary,
                &fallback,
                MAX_ACCOMMODATIONS,
                ACCOMMODATION_FALLBACK_WARNING,
                notices,
            )
            .await;

        match hits {
            Ok(hits) => {
                let kind = query.kind();
                hits.iter().map(|hit| project_accommodation(hit, &kind)).collect()
            }
            Err(error) => {
                warn!(
                    event_name = "planner.search.accommodations_failed",
                    destination = query.destination,
                    error = %error,
                    "accommodation search failed"
                );
                notices.emit(Notice::error(
                    NoticeSource::Search,
                    format!("Accommodation search error: {error}"),
                ));
                Vec::new()
            }
        }
    }

    async fn search_with_fallback(
        &self,
        primary: &str,
        fallback: &str,
        max_results: usize,
        warning: &str,
        notices: &dyn NoticeSink,
    ) -> Result<Vec<SearchHit>, SearchError> {
        debug!(event_name = "planner.search.query", query = primary, max_results);
        let hits = self.client.search(primary, max_results).await?;
        if !hits.is_empty() {
            return Ok(hits.into_iter().take(max_results).collect());
        }

        notices.emit(Notice::warning(NoticeSource::Search, warning));
        debug!(event_name = "planner.search.fallback_query", query = fallback, max_results);
        let hits = self.client.search(fallback, max_results).await?;
        Ok(hits.into_iter().take(max_results).collect())
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn snippet(content: &Option<String>) -> String {
    match non_blank(content) {
        Some(content) => {
            let truncated = content.chars().take(SNIPPET_CHARS).collect::<String>();
            format!("{truncated}...")
        }
        None => NO_DESCRIPTION.to_string(),
    }
}

fn project_attraction(hit: &SearchHit) -> Attraction {
    Attraction {
        name: non_blank(&hit.title).unwrap_or("Unknown").to_string(),
        url: non_blank(&hit.url).unwrap_or("#").to_string(),
        snippet: snippet(&hit.content),
    }
}

fn project_accommodation(hit: &SearchHit, kind: &str) -> Accommodation {
    Accommodation {
        name: non_blank(&hit.title).unwrap_or("Unknown").to_string(),
        url: non_blank(&hit.url).unwrap_or("#").to_string(),
        snippet: snippet(&hit.content),
        kind: kind.to_string(),
    }
}
