//! DuckDuckGo Instant Answer search

use async_trait::async_trait;
use coinsult_agent::{SearchHit, SearchSource, SourceError};
use reqwest::Client;
use serde::Deserialize;

use super::{http_error, read_json, status_error};

const BASE_URL: &str = "https://api.duckduckgo.com/";
const SERVICE: &str = "duckduckgo";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct InstantAnswer {
    heading: String,
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    related_topics: Vec<RelatedTopic>,
}

/// Either a plain topic or a named group of topics
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<Topic>,
    },
    Item(Topic),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Topic {
    #[serde(rename = "Text")]
    text: String,
    #[serde(rename = "FirstURL")]
    first_url: String,
}

impl Topic {
    fn into_hit(self) -> Option<SearchHit> {
        let text = self.text.trim();
        if text.is_empty() {
            return None;
        }
        let title = text.split(" - ").next().unwrap_or(text).trim().to_string();
        Some(SearchHit {
            title,
            body: text.to_string(),
            url: self.first_url,
        })
    }
}

fn flatten(answer: InstantAnswer, query: &str, max_results: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();

    if !answer.abstract_text.trim().is_empty() {
        let title = if answer.heading.trim().is_empty() {
            query.trim().to_string()
        } else {
            answer.heading
        };
        hits.push(SearchHit {
            title,
            body: answer.abstract_text,
            url: answer.abstract_url,
        });
    }

    for topic in answer.related_topics {
        match topic {
            RelatedTopic::Group { topics } => {
                hits.extend(topics.into_iter().filter_map(Topic::into_hit))
            }
            RelatedTopic::Item(topic) => hits.extend(topic.into_hit()),
        }
    }

    hits.truncate(max_results);
    hits
}

/// Keyless web search over the Instant Answer API
pub struct DuckDuckGo {
    client: Client,
}

impl DuckDuckGo {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchSource for DuckDuckGo {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SourceError> {
        let response = self
            .client
            .get(BASE_URL)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(http_error)?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let answer: InstantAnswer = read_json(response).await?;
        Ok(flatten(answer, query, max_results))
    }
}
