//! Suggestion pipeline, run only for zero-result searches.
//!
//! Both strategies go through the engine breaker like any other search;
//! any failure contributes an empty list. Suggestions are best-effort and
//! never turn a successful (empty) search into an error.

use vitrine_core::dsl::{self, PHRASE_SUGGESTER};
use vitrine_core::suggest::{self, Suggestion};

use crate::state::AppState;

pub async fn fetch(state: &AppState, text: &str) -> Vec<Suggestion> {
    let phrase_body = dsl::phrase_suggest_body(text);
    let fuzzy_body = dsl::fuzzy_suggest_body(text);

    let (phrase_raw, fuzzy_raw) = tokio::join!(
        super::engine_raw(state, &phrase_body),
        super::engine_raw(state, &fuzzy_body),
    );

    let phrase = match phrase_raw {
        Ok(raw) => suggest::parse_phrase_options(&raw, PHRASE_SUGGESTER),
        Err(err) => {
            tracing::debug!(error = %err, "Phrase suggester unavailable");
            Vec::new()
        }
    };

    let (brands, categories) = match fuzzy_raw {
        Ok(raw) => (
            suggest::parse_agg_buckets(&raw, "brands"),
            suggest::parse_agg_buckets(&raw, "categories"),
        ),
        Err(err) => {
            tracing::debug!(error = %err, "Fuzzy suggester unavailable");
            (Vec::new(), Vec::new())
        }
    };

    suggest::merge_suggestions(text, phrase, brands, categories)
}
