//! Prompt assembler - pure request construction.
//!
//! Combines the persona prefix, the session history and the new utterance
//! into one ordered message list. No I/O, no shared state.

use parley_ai::{Message, Role};

use crate::memory::{Speaker, Utterance};

/// Assembles outbound completion requests.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    persona_max_chars: usize,
}

impl PromptAssembler {
    pub fn new(persona_max_chars: usize) -> Self {
        Self { persona_max_chars }
    }

    /// Build the ordered message list: persona system message, history in
    /// original order, then the new user utterance. Output length is always
    /// `history.len() + 2`.
    pub fn build(&self, persona_prefix: &str, history: &[Utterance], new_text: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(truncate_tail(
            persona_prefix,
            self.persona_max_chars,
        )));
        for utterance in history {
            messages.push(match utterance.speaker {
                Speaker::User => Message::user(utterance.text.clone()),
                Speaker::Assistant => Message::assistant(utterance.text.clone()),
            });
        }
        messages.push(Message::user(new_text));
        messages
    }
}

/// Keep the last `max_chars` characters of `text`.
///
/// The persona prefix grows newest-last, and recent samples are assumed most
/// representative, so truncation drops the head rather than the tail.
fn truncate_tail(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    text.chars().skip(total - max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<Utterance> {
        vec![
            Utterance::user("hi"),
            Utterance::assistant("hello"),
            Utterance::user("how are you?"),
            Utterance::assistant("fine"),
        ]
    }

    #[test]
    fn test_output_shape() {
        let assembler = PromptAssembler::new(1000);
        let messages = assembler.build("persona", &history(), "new question");

        assert_eq!(messages.len(), history().len() + 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "persona");
        assert_eq!(messages.last().unwrap().role, Role::User);
        assert_eq!(messages.last().unwrap().content, "new question");
    }

    #[test]
    fn test_history_order_and_roles_preserved() {
        let assembler = PromptAssembler::new(1000);
        let messages = assembler.build("persona", &history(), "next");

        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "hi");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[2].content, "hello");
        assert_eq!(messages[3].content, "how are you?");
        assert_eq!(messages[4].content, "fine");
    }

    #[test]
    fn test_empty_history() {
        let assembler = PromptAssembler::new(1000);
        let messages = assembler.build("persona", &[], "hi");
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_persona_truncation_keeps_tail() {
        let assembler = PromptAssembler::new(10);
        let messages = assembler.build("0123456789abcdefghij", &[], "hi");
        assert_eq!(messages[0].content, "abcdefghij");
    }

    #[test]
    fn test_persona_truncation_char_boundary_safe() {
        let assembler = PromptAssembler::new(4);
        let messages = assembler.build("привет мир", &[], "hi");
        assert_eq!(messages[0].content.chars().count(), 4);
        assert_eq!(messages[0].content, " мир");
    }

    #[test]
    fn test_short_persona_unchanged() {
        let assembler = PromptAssembler::new(100);
        let messages = assembler.build("short", &[], "hi");
        assert_eq!(messages[0].content, "short");
    }
}
