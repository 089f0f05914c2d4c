//! Routing of free-form text to an assistant action.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static QUESTION_WORDS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b(who|what|when|where|why|how)\b").ok());
static REMINDER_WORDS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b(remind|reminder|schedule|appointment)").ok());

const REMIND_PREFIX: &str = "remind me to";
const DEFAULT_TITLE: &str = "Reminder";

/// What the user most likely wants done with a line of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Question,
    Reminder,
    Note,
}

/// Classify text. Questions win over reminders.
pub fn classify(text: &str) -> Intent {
    if text.contains('?') || matches(&QUESTION_WORDS, text) {
        Intent::Question
    } else if matches(&REMINDER_WORDS, text) {
        Intent::Reminder
    } else {
        Intent::Note
    }
}

fn matches(pattern: &LazyLock<Option<Regex>>, text: &str) -> bool {
    pattern
        .as_ref()
        .map(|regex| regex.is_match(text))
        .unwrap_or(false)
}

/// Title and description pulled from a reminder request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderDraft {
    pub title: String,
    pub description: String,
}

impl ReminderDraft {
    /// "remind me to X" yields title `X` and description `Reminder: X`;
    /// anything else keeps the whole text as the description.
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        let lowered = text.to_ascii_lowercase();
        let title = lowered
            .find(REMIND_PREFIX)
            .and_then(|start| text.get(start + REMIND_PREFIX.len()..))
            .map(|rest| rest.trim().trim_end_matches(['.', '!']).trim())
            .filter(|rest| !rest.is_empty());
        match title {
            Some(title) => Self {
                title: title.to_string(),
                description: format!("Reminder: {title}"),
            },
            None => Self {
                title: DEFAULT_TITLE.to_string(),
                description: text.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Intent, ReminderDraft, classify};
    use pretty_assertions::assert_eq;

    /// Question words and question marks route to answering.
    #[test]
    fn questions_are_detected() {
        assert_eq!(classify("What did I eat for lunch"), Intent::Question);
        assert_eq!(classify("lunch with Meera?"), Intent::Question);
        assert_eq!(classify("How was the trip"), Intent::Question);
    }

    /// Question words only count as whole words.
    #[test]
    fn question_words_need_word_boundaries() {
        assert_eq!(classify("Showed the kids the whale"), Intent::Note);
        assert_eq!(classify("Somehow the cake survived"), Intent::Note);
    }

    /// Reminder vocabulary routes to scheduling unless it is a question.
    #[test]
    fn reminders_are_detected() {
        assert_eq!(classify("Remind me to call mom"), Intent::Reminder);
        assert_eq!(classify("Dentist appointment on Friday"), Intent::Reminder);
        assert_eq!(classify("When is my appointment"), Intent::Question);
    }

    /// Anything else is a note.
    #[test]
    fn plain_text_is_a_note() {
        assert_eq!(classify("Had pasta with Meera"), Intent::Note);
    }

    /// The action after "remind me to" becomes the title.
    #[test]
    fn draft_extracts_title() {
        let draft = ReminderDraft::from_text("Please Remind me to water the plants.");
        assert_eq!(draft.title, "water the plants");
        assert_eq!(draft.description, "Reminder: water the plants");
    }

    /// Without the phrase the whole text is kept as the description.
    #[test]
    fn draft_defaults_title() {
        let draft = ReminderDraft::from_text("  schedule the dentist  ");
        assert_eq!(draft.title, "Reminder");
        assert_eq!(draft.description, "schedule the dentist");

        let empty_action = ReminderDraft::from_text("remind me to");
        assert_eq!(empty_action.title, "Reminder");
        assert_eq!(empty_action.description, "remind me to");
    }
}
