//! Routing predicates for the conditional edges

use std::sync::LazyLock;

use coinsult_ai::{ChatMessage, ChatModel};
use regex::Regex;

use crate::{
    classifier::strip_code_fence,
    error::Result,
    state::{ConversationState, Intent},
};

/// Outcome of the primary router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentRoute {
    Price,
    News,
    Analytics,
    Chat,
    ClarifyCoin,
}

/// Outcome of the analytics sub-router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchRoute {
    NeedsSearch,
    NoSearch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    Yes,
    No,
}

/// A single word, optionally wrapped in quotes or backticks, with trailing punctuation
static YES_NO_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[`"'\s]*([a-z]+)[`"'\s]*[.!?,;:]*$"#).expect("valid yes/no pattern")
});

const NEEDS_SEARCH_PROMPT: &str = "You assist a crypto analyst. Based on the collected data, \
decide whether an additional web search is needed for a quality analysis.\n\
Answer with ONE word only: 'yes' or 'no'.\n\
Answer 'yes' if the data is thin, the news is stale, or the question needs more context.";

/// Pick the branch after classification. Coin-bound intents without a coin go to clarification.
pub fn route_by_intent(state: &ConversationState) -> IntentRoute {
    let intent = state.intent.unwrap_or(Intent::Chat);
    if intent.requires_coin() && state.coin.trim().is_empty() {
        return IntentRoute::ClarifyCoin;
    }
    match intent {
        Intent::Price => IntentRoute::Price,
        Intent::News => IntentRoute::News,
        Intent::Analytics => IntentRoute::Analytics,
        Intent::Chat => IntentRoute::Chat,
    }
}

/// Strictly parse a yes/no answer. `None` for anything but exactly one of the two words.
pub fn parse_yes_no(raw: &str) -> Option<YesNo> {
    let lowered = raw.trim().to_lowercase();
    let text = strip_code_fence(&lowered);
    let word = YES_NO_PATTERN.captures(text)?.get(1)?.as_str();
    match word {
        "yes" => Some(YesNo::Yes),
        "no" => Some(YesNo::No),
        _ => None,
    }
}

/// Map a raw model answer to a branch. Unclear answers take the cheaper path.
pub fn search_route_from_answer(raw: &str) -> SearchRoute {
    match parse_yes_no(raw) {
        Some(YesNo::Yes) => SearchRoute::NeedsSearch,
        Some(YesNo::No) => SearchRoute::NoSearch,
        None => {
            tracing::debug!(answer = %raw.trim(), "ambiguous search decision, skipping search");
            SearchRoute::NoSearch
        }
    }
}

/// Ask the model whether the analytics data needs a supplemental web search
pub async fn route_needs_search(
    model: &dyn ChatModel,
    state: &ConversationState,
) -> Result<SearchRoute> {
    let messages = vec![
        ChatMessage::system(NEEDS_SEARCH_PROMPT),
        ChatMessage::user(format!(
            "User query: {}\nCollected data: {}",
            state.user_query,
            state.api_data.to_json()
        )),
    ];
    let answer = model.generate(&messages).await?;
    Ok(search_route_from_answer(&answer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;

    fn state_with(intent: Option<Intent>, coin: &str) -> ConversationState {
        let mut state = ConversationState::new("t");
        state.intent = intent;
        state.coin = coin.into();
        state
    }

    #[test]
    fn test_coin_bound_intents_without_coin_clarify() {
        for intent in [Intent::Price, Intent::News, Intent::Analytics] {
            assert_eq!(
                route_by_intent(&state_with(Some(intent), "  ")),
                IntentRoute::ClarifyCoin
            );
        }
    }

    #[test]
    fn test_intents_route_to_their_branch() {
        assert_eq!(route_by_intent(&state_with(Some(Intent::Price), "btc")), IntentRoute::Price);
        assert_eq!(route_by_intent(&state_with(Some(Intent::News), "btc")), IntentRoute::News);
        assert_eq!(
            route_by_intent(&state_with(Some(Intent::Analytics), "btc")),
            IntentRoute::Analytics
        );
        assert_eq!(route_by_intent(&state_with(Some(Intent::Chat), "")), IntentRoute::Chat);
        assert_eq!(route_by_intent(&state_with(None, "")), IntentRoute::Chat);
    }

    #[test]
    fn test_yes_no_accepts_exact_words() {
        for raw in ["yes", "Yes.", "  YES!", "'yes'", "`no`", "\"no\"", "no.", "```\nyes\n```", "```yes```"] {
            assert!(parse_yes_no(raw).is_some(), "{raw:?}");
        }
        assert_eq!(parse_yes_no("Yes."), Some(YesNo::Yes));
        assert_eq!(parse_yes_no("\"no\""), Some(YesNo::No));
    }

    #[test]
    fn test_yes_no_rejects_everything_else() {
        for raw in ["yesterday", "nope", "yes, definitely", "no search", "да", "", "y", "1"] {
            assert_eq!(parse_yes_no(raw), None, "{raw:?}");
        }
    }

    #[test]
    fn test_search_route_is_total() {
        assert_eq!(search_route_from_answer("yes"), SearchRoute::NeedsSearch);
        assert_eq!(search_route_from_answer("no"), SearchRoute::NoSearch);
        assert_eq!(search_route_from_answer("yesterday"), SearchRoute::NoSearch);
        assert_eq!(search_route_from_answer("maybe?"), SearchRoute::NoSearch);
    }

    #[tokio::test]
    async fn test_route_needs_search_sends_collected_data() {
        let model = MockModel::new(["Yes"]);
        let mut state = state_with(Some(Intent::Analytics), "bitcoin");
        state.user_query = "is bitcoin a buy?".into();
        state.api_data.record_call("coingecko:/coins/{id}");

        let route = route_needs_search(&model, &state).await.unwrap();
        assert_eq!(route, SearchRoute::NeedsSearch);

        let prompt = &model.prompts()[0];
        assert!(prompt[1].content.contains("User query: is bitcoin a buy?"));
        assert!(prompt[1].content.contains("coingecko:/coins/{id}"));
    }
}
