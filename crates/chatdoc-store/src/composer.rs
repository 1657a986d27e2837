//! Bounded conversation context for follow-up questions.

use crate::config::ContextConfig;
use crate::types::{ConversationEntry, Message};

pub const HISTORY_HEADER: &str = "Conversation history:";

#[derive(Debug, Clone, Default)]
pub struct ContextComposer {
    config: ContextConfig,
}

impl ContextComposer {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Text to send for `question`, prefixed with the tail of the entry's
    /// prior turns when that fits.
    ///
    /// Tries the full window first, then the fallback window, and finally
    /// the bare question when even that is over `max_chars`.
    pub fn compose(&self, entry: &ConversationEntry, question: &str) -> String {
        let turns = entry.turns();
        if turns.is_empty() {
            return question.to_string();
        }

        for window in [self.config.window, self.config.fallback_window] {
            if window == 0 {
                continue;
            }
            let composed = render(tail(turns, window), question);
            if composed.chars().count() <= self.config.max_chars {
                return composed;
            }
        }

        question.to_string()
    }
}

fn tail(turns: &[Message], n: usize) -> &[Message] {
    &turns[turns.len().saturating_sub(n)..]
}

fn render(history: &[Message], question: &str) -> String {
    let mut parts = Vec::with_capacity(history.len() + 2);
    parts.push(HISTORY_HEADER.to_string());
    for message in history {
        parts.push(format!("{}: {}", message.role.label(), message.text));
    }
    parts.push(format!("\n\nNew question: {question}"));
    parts.join("\n")
}
