use serde::Deserialize;
use thiserror::Error;

use crate::db::operations::cards::{self, Flashcard, NewFlashcard, CARD_TYPE_QUESTION_ANSWER};
use crate::db::operations::decks;
use crate::db::Database;
use crate::services::llm::{ChatMessage, LlmClient, LlmError};

pub const DEFAULT_CARD_COUNT: usize = 10;
pub const MAX_CARD_COUNT: usize = 50;
pub const MAX_SOURCE_TEXT_CHARS: usize = 50_000;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("deck not found")]
    DeckNotFound,
    #[error("deck belongs to another user")]
    Forbidden,
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("model returned unusable output: {0}")]
    Parse(String),
    #[error(transparent)]
    Persistence(#[from] sqlx::Error),
}

#[derive(Debug, Deserialize)]
struct GeneratedCard {
    question: String,
    answer: String,
}

/// Generates flashcards for a deck from source text. Ownership is checked
/// before any model call; the created cards start on a fresh one-day
/// schedule, immediately due.
pub async fn generate_cards(
    db: &Database,
    llm: &LlmClient,
    deck_id: &str,
    user_id: &str,
    source_text: &str,
    count: usize,
) -> Result<Vec<Flashcard>, GenerationError> {
    let source_text = source_text.trim();
    if source_text.is_empty() {
        return Err(GenerationError::Validation(
            "sourceText must not be empty".to_string(),
        ));
    }
    if source_text.chars().count() > MAX_SOURCE_TEXT_CHARS {
        return Err(GenerationError::Validation(format!(
            "sourceText exceeds maximum length of {MAX_SOURCE_TEXT_CHARS} characters"
        )));
    }
    if count == 0 || count > MAX_CARD_COUNT {
        return Err(GenerationError::Validation(format!(
            "count must be between 1 and {MAX_CARD_COUNT}"
        )));
    }

    let deck = decks::get_deck(db, deck_id)
        .await?
        .ok_or(GenerationError::DeckNotFound)?;
    if deck.owner_id != user_id {
        return Err(GenerationError::Forbidden);
    }

    let messages = [
        ChatMessage::system(
            "You create study flashcards. Respond with a JSON array only, no prose. \
             Each element must be an object with exactly two string fields: \
             \"question\" and \"answer\".",
        ),
        ChatMessage::user(format!(
            "Create up to {count} concise question/answer flashcards covering the key \
             facts in the following text:\n\n{source_text}"
        )),
    ];

    let response = llm.chat(&messages).await?;
    let content = response
        .first_content()
        .ok_or(LlmError::EmptyChoices)?;
    let generated = parse_generated_cards(content)?;

    let mut created = Vec::with_capacity(generated.len());
    for card in generated.into_iter().take(count) {
        let new_card = NewFlashcard {
            deck_id: deck.id.clone(),
            question: card.question,
            answer: card.answer,
            card_type: CARD_TYPE_QUESTION_ANSWER.to_string(),
            options: None,
        };
        created.push(cards::insert_card(db, &new_card).await?);
    }

    Ok(created)
}

/// Models wrap JSON in markdown fences often enough that stripping them is
/// part of the contract.
fn parse_generated_cards(content: &str) -> Result<Vec<GeneratedCard>, GenerationError> {
    let trimmed = strip_code_fences(content);

    let parsed: Vec<GeneratedCard> = serde_json::from_str(trimmed)
        .map_err(|err| GenerationError::Parse(err.to_string()))?;

    let cards: Vec<GeneratedCard> = parsed
        .into_iter()
        .filter(|card| !card.question.trim().is_empty() && !card.answer.trim().is_empty())
        .collect();

    if cards.is_empty() {
        return Err(GenerationError::Parse(
            "no usable question/answer pairs in model output".to_string(),
        ));
    }

    Ok(cards)
}

fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the optional language tag on the opening fence
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .trim_end_matches('`')
        .trim()
}
