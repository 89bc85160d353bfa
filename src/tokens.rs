use crate::error::{GitWiseError, Result};
use crate::prompt::PromptMessage;
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// Every message is framed as `<im_start>{role}\n{content}<im_end>\n`.
const TOKENS_PER_MESSAGE: usize = 4;
/// Every reply is primed with `<im_start>assistant`.
const TOKENS_PER_REPLY: usize = 2;

pub trait Tokenizer {
    fn encoded_len(&self, text: &str) -> usize;
}

impl Tokenizer for CoreBPE {
    fn encoded_len(&self, text: &str) -> usize {
        self.encode_ordinary(text).len()
    }
}

/// Counts chat-completion request tokens the way the provider bills them.
pub struct TokenCounter {
    tokenizer: Box<dyn Tokenizer>,
}

impl TokenCounter {
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = tiktoken_rs::get_bpe_from_model(model)
            .map_err(|_| GitWiseError::UnsupportedModel(model.to_string()))?;
        debug!(model, "loaded tokenizer");
        Ok(Self::with_tokenizer(bpe))
    }

    pub fn with_tokenizer(tokenizer: impl Tokenizer + 'static) -> Self {
        Self {
            tokenizer: Box::new(tokenizer),
        }
    }

    pub fn count<'a, I>(&self, messages: I) -> usize
    where
        I: IntoIterator<Item = &'a PromptMessage>,
    {
        let framed: usize = messages
            .into_iter()
            .map(|message| {
                TOKENS_PER_MESSAGE
                    + self.tokenizer.encoded_len(message.role.as_str())
                    + self.tokenizer.encoded_len(&message.content)
            })
            .sum();
        framed + TOKENS_PER_REPLY
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{TokenCounter, Tokenizer};
    use crate::error::GitWiseError;
    use crate::prompt::PromptMessage;

    /// One token per character.
    pub(crate) struct CharTokenizer;

    impl Tokenizer for CharTokenizer {
        fn encoded_len(&self, text: &str) -> usize {
            text.chars().count()
        }
    }

    #[test]
    fn count_adds_message_and_reply_overhead() {
        let counter = TokenCounter::with_tokenizer(CharTokenizer);
        let messages = [PromptMessage::system("abc"), PromptMessage::user("hello")];

        // (4 + "system" + "abc") + (4 + "user" + "hello") + 2
        assert_eq!(counter.count(&messages), (4 + 6 + 3) + (4 + 4 + 5) + 2);
    }

    #[test]
    fn count_of_no_messages_is_reply_primer_only() {
        let counter = TokenCounter::with_tokenizer(CharTokenizer);
        let none: [PromptMessage; 0] = [];
        assert_eq!(counter.count(&none), 2);
    }

    #[test]
    fn count_matches_cl100k_framing() {
        let counter = TokenCounter::for_model("gpt-3.5-turbo").expect("tokenizer available");
        let messages = [PromptMessage::user("hello world")];

        // 4 framing + "user" (1) + "hello world" (2) + 2 reply primer
        assert_eq!(counter.count(&messages), 9);
    }

    #[test]
    fn count_is_idempotent() {
        let counter = TokenCounter::for_model("gpt-4o-mini").expect("tokenizer available");
        let messages = [
            PromptMessage::system("You generate commit messages."),
            PromptMessage::user("Staged changes: [{\"path\":\"a.py\"}]"),
        ];
        assert_eq!(counter.count(&messages), counter.count(&messages));
    }

    #[test]
    fn unknown_model_is_unsupported() {
        let err = TokenCounter::for_model("definitely-not-a-model").err();
        assert!(matches!(err, Some(GitWiseError::UnsupportedModel(m)) if m == "definitely-not-a-model"));
    }
}
