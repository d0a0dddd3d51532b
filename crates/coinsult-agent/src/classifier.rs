//! Intent classification with history-aware coin resolution

use coinsult_ai::{ChatMessage, ChatModel, Role};
use serde::Deserialize;

use crate::{
    error::Result,
    state::{ConversationState, Intent},
};

/// How many recent messages the classifier sees
pub const HISTORY_WINDOW: usize = 6;

const EMPTY_HISTORY: &str = "(history empty)";

const CLASSIFY_PROMPT: &str = r#"You classify user questions about cryptocurrencies.

Determine the user's intent and extract the cryptocurrency the question is about, if any.

Possible intents:
- "price": the user asks for the current price or exchange rate of a coin
- "news": the user wants news about a coin
- "analytics": the user asks for analysis, a forecast, or a buy/sell recommendation
- "chat": a general question about crypto, blockchain, DeFi and so on

Answer STRICTLY with JSON:
{"intent": "<intent>", "coin": "<coin name or empty string>"}

Examples:
Question: "Сколько стоит Bitcoin?"
{"intent": "price", "coin": "bitcoin"}

Question: "News about Ethereum"
{"intent": "news", "coin": "ethereum"}

Question: "Should I buy BTC now?"
{"intent": "analytics", "coin": "bitcoin"}

Question: "What is DeFi?"
{"intent": "chat", "coin": ""}

Question: "Какой курс солана?"
{"intent": "price", "coin": "solana"}
"#;

const COREFERENCE_HINT: &str = "If the current question uses pronouns or references such as \
'it', 'this coin' or 'is it cheap now' and names no coin explicitly, use the coin from the \
dialogue history.";

/// Classifier result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub intent: Intent,
    pub coin: String,
}

impl Classification {
    fn fallback() -> Self {
        Self {
            intent: Intent::Chat,
            coin: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    intent: String,
    #[serde(default)]
    coin: Option<String>,
}

/// Render the last `limit` messages as `role: text` lines
pub fn format_recent_history(messages: &[ChatMessage], limit: usize) -> String {
    let start = messages.len().saturating_sub(limit);
    let lines: Vec<String> = messages[start..]
        .iter()
        .filter_map(|m| {
            let compact = m.content.split_whitespace().collect::<Vec<_>>().join(" ");
            if compact.is_empty() {
                return None;
            }
            let role = match m.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => "system",
            };
            Some(format!("{role}: {compact}"))
        })
        .collect();

    if lines.is_empty() {
        EMPTY_HISTORY.to_string()
    } else {
        lines.join("\n")
    }
}

/// Remove a surrounding ``` fence (with optional language tag)
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    if !text.starts_with("```") {
        return text;
    }
    let Some((_, body)) = text.split_once('\n') else {
        return text;
    };
    match body.rfind("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Parse the model's JSON answer. Anything malformed becomes `chat` with no coin.
pub fn parse_classification(raw: &str) -> Classification {
    let parsed: RawClassification = match serde_json::from_str(strip_code_fence(raw)) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "unparsable classifier output, falling back to chat");
            return Classification::fallback();
        }
    };

    let intent = Intent::parse(&parsed.intent).unwrap_or_else(|| {
        tracing::warn!(intent = %parsed.intent, "unknown intent, treating as chat");
        Intent::Chat
    });
    let coin = parsed
        .coin
        .map(|c| c.trim().to_lowercase())
        .unwrap_or_default();

    Classification { intent, coin }
}

/// Reuse the thread's coin when a coin-bound intent names none
pub fn resolve_coin(mut classification: Classification, previous_coin: &str) -> Classification {
    let previous_coin = previous_coin.trim();
    if classification.coin.is_empty()
        && classification.intent.requires_coin()
        && !previous_coin.is_empty()
    {
        classification.coin = previous_coin.to_string();
    }
    classification
}

fn build_messages(state: &ConversationState) -> Vec<ChatMessage> {
    let history = format_recent_history(&state.messages, HISTORY_WINDOW);
    vec![
        ChatMessage::system(CLASSIFY_PROMPT),
        ChatMessage::user(format!(
            "Dialogue history (most recent messages):\n{history}\n\n\
             Current user question: {}\n\n{COREFERENCE_HINT}",
            state.user_query
        )),
    ]
}

/// Classify the current turn.
///
/// Only a failing model call is an error; bad output degrades to `chat`.
pub async fn classify(model: &dyn ChatModel, state: &ConversationState) -> Result<Classification> {
    let raw = model.generate(&build_messages(state)).await?;
    let classification = resolve_coin(parse_classification(&raw), &state.coin);
    tracing::debug!(
        intent = %classification.intent,
        coin = %classification.coin,
        "classified"
    );
    Ok(classification)
}
