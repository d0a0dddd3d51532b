//! NewsAPI article search

use async_trait::async_trait;
use coinsult_agent::{NewsEntry, NewsSource, SourceError};
use reqwest::Client;
use serde::Deserialize;

use super::{http_error, read_json};

const BASE_URL: &str = "https://newsapi.org/v2";
const SERVICE: &str = "newsapi";
const CRYPTO_TERMS: &str = "crypto OR cryptocurrency";
const MAX_PAGE_SIZE: usize = 100;

/// Restrict a query to crypto coverage
pub fn build_query(query: &str) -> String {
    let query = query.trim();
    if query.is_empty() {
        CRYPTO_TERMS.to_string()
    } else {
        format!("({query}) AND ({CRYPTO_TERMS})")
    }
}

pub fn clamp_page_size(max_results: usize) -> usize {
    max_results.clamp(1, MAX_PAGE_SIZE)
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<WireArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
    source: Option<WireSource>,
}

#[derive(Debug, Deserialize)]
struct WireSource {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl From<WireArticle> for NewsEntry {
    fn from(article: WireArticle) -> Self {
        NewsEntry::Article {
            title: article.title.unwrap_or_default(),
            description: article.description.unwrap_or_default(),
            url: article.url.unwrap_or_default(),
            published_at: article.published_at.unwrap_or_default(),
            source: article.source.and_then(|s| s.name).unwrap_or_default(),
        }
    }
}

fn error_detail(body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let parts: Vec<String> = [parsed.code, parsed.message]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect();
    if parts.is_empty() {
        body.trim().to_string()
    } else {
        parts.join(" | ")
    }
}

/// NewsAPI `/everything` adapter
pub struct NewsApi {
    client: Client,
    api_key: Option<String>,
}

impl NewsApi {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }
}

#[async_trait]
impl NewsSource for NewsApi {
    async fn news(&self, query: &str, max_results: usize) -> Result<Vec<NewsEntry>, SourceError> {
        let Some(api_key) = &self.api_key else {
            return Ok(vec![NewsEntry::unavailable("NEWS_API_KEY is not set")]);
        };

        let page_size = clamp_page_size(max_results).to_string();
        let response = self
            .client
            .get(format!("{BASE_URL}/everything"))
            .header("X-Api-Key", api_key)
            .query(&[
                ("q", build_query(query).as_str()),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
                ("language", "en"),
            ])
            .send()
            .await
            .map_err(http_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                service: SERVICE,
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        let body: EverythingResponse = read_json(response).await?;
        Ok(body.articles.into_iter().map(NewsEntry::from).collect())
    }
}
