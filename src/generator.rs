use crate::error::{GitWiseError, Result};
use crate::openai::{Completion, ModelBackend};
use crate::planner::ChunkPlan;
use crate::prompt::{self, DetailLevel};
use tracing::{debug, info};

pub const TEMPERATURE: f32 = 0.7;

/// Turns a chunk plan into a commit message, one backend call per fragment.
pub struct MessageGenerator<'b> {
    backend: &'b dyn ModelBackend,
    model: String,
}

impl<'b> MessageGenerator<'b> {
    pub fn new(backend: &'b dyn ModelBackend, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    /// Fragments are sent in order and their messages joined by a blank line.
    /// A failure on any fragment fails the whole run.
    pub fn generate(
        &self,
        plan: &ChunkPlan<'_>,
        system_instructions: &str,
        detail: DetailLevel,
    ) -> Result<String> {
        let total = plan.len();
        let mut messages = Vec::with_capacity(total);

        for (index, fragment) in plan.fragments().iter().enumerate() {
            let request = prompt::assemble(system_instructions, *fragment);
            let prompt_messages = request.to_messages();
            debug!(chunk = index + 1, total, files = fragment.len(), "generating chunk");

            let text = self
                .backend
                .complete(&Completion {
                    model: &self.model,
                    messages: &prompt_messages,
                    max_output_tokens: detail.max_output_tokens(),
                    temperature: TEMPERATURE,
                })
                .map_err(|e| chunk_failure(e, index, total))?;

            let text = text.trim();
            if text.is_empty() {
                return Err(chunk_failure(GitWiseError::EmptyResponse, index, total));
            }
            messages.push(text.to_string());
        }

        info!(chunks = total, "commit message generated");
        Ok(messages.join("\n\n"))
    }
}

fn chunk_failure(err: GitWiseError, index: usize, total: usize) -> GitWiseError {
    if total == 1 {
        GitWiseError::Generation(err.to_string())
    } else {
        GitWiseError::Generation(format!("chunk {}/{}: {}", index + 1, total, err))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{MessageGenerator, TEMPERATURE};
    use crate::changes::{ChangeEntry, ChangeSet};
    use crate::error::{GitWiseError, Result};
    use crate::openai::{Completion, ModelBackend};
    use crate::planner::ChunkPlanner;
    use crate::prompt::{DetailLevel, Role};
    use crate::tokens::TokenCounter;
    use crate::tokens::tests::CharTokenizer;
    use std::cell::RefCell;

    #[derive(Debug, Clone)]
    pub(crate) struct Call {
        pub(crate) model: String,
        pub(crate) user_content: String,
        pub(crate) max_output_tokens: u32,
        pub(crate) temperature: f32,
    }

    /// Replies with scripted results in order and records every call.
    pub(crate) struct ScriptedBackend {
        replies: RefCell<Vec<Result<String>>>,
        pub(crate) calls: RefCell<Vec<Call>>,
    }

    impl ScriptedBackend {
        pub(crate) fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: RefCell::new(replies.into_iter().rev().collect()),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ModelBackend for ScriptedBackend {
        fn complete(&self, completion: &Completion<'_>) -> Result<String> {
            assert_eq!(completion.messages.len(), 2);
            assert_eq!(completion.messages[0].role, Role::System);
            self.calls.borrow_mut().push(Call {
                model: completion.model.to_string(),
                user_content: completion.messages[1].content.clone(),
                max_output_tokens: completion.max_output_tokens,
                temperature: completion.temperature,
            });
            self.replies
                .borrow_mut()
                .pop()
                .unwrap_or(Err(GitWiseError::EmptyResponse))
        }
    }

    fn uniform_set(count: usize) -> ChangeSet {
        (0..count)
            .map(|i| ChangeEntry::modified(format!("src/mod_{i}.rs"), "+line\n".repeat(20)))
            .collect()
    }

    #[test]
    fn single_fragment_makes_one_capped_call() {
        let counter = TokenCounter::with_tokenizer(CharTokenizer);
        let set = uniform_set(2);
        let plan = ChunkPlanner::new(&counter, 100_000, 3).plan(&set, "sys").expect("plan");
        let backend = ScriptedBackend::new(vec![Ok("  feat: add modules \n".to_string())]);

        let message = MessageGenerator::new(&backend, "gpt-4o-mini")
            .generate(&plan, "sys", DetailLevel::Minimal)
            .expect("generated");

        assert_eq!(message, "feat: add modules");
        let calls = backend.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, "gpt-4o-mini");
        assert_eq!(calls[0].max_output_tokens, 100);
        assert_eq!(calls[0].temperature, TEMPERATURE);
    }

    #[test]
    fn chunks_are_sent_in_order_and_joined_with_blank_line() {
        let counter = TokenCounter::with_tokenizer(CharTokenizer);
        let set = uniform_set(4);
        let probe = ChunkPlanner::new(&counter, 0, 3);
        let budget = probe.request_tokens("sys", &set.entries()[..2]);
        let plan = ChunkPlanner::new(&counter, budget, 3).plan(&set, "sys").expect("plan");
        assert_eq!(plan.fragment_sizes(), vec![2, 2]);

        let backend = ScriptedBackend::new(vec![
            Ok("feat: first half".to_string()),
            Ok("fix: second half\n".to_string()),
        ]);
        let message = MessageGenerator::new(&backend, "gpt-4o")
            .generate(&plan, "sys", DetailLevel::Detailed)
            .expect("generated");

        assert_eq!(message, "feat: first half\n\nfix: second half");
        let calls = backend.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].user_content.contains("src/mod_0.rs"));
        assert!(!calls[0].user_content.contains("src/mod_2.rs"));
        assert!(calls[1].user_content.contains("src/mod_3.rs"));
        assert!(calls.iter().all(|c| c.max_output_tokens == 500));
    }

    #[test]
    fn failed_chunk_fails_whole_generation() {
        let counter = TokenCounter::with_tokenizer(CharTokenizer);
        let set = uniform_set(4);
        let budget = ChunkPlanner::new(&counter, 0, 3).request_tokens("sys", &set.entries()[..2]);
        let plan = ChunkPlanner::new(&counter, budget, 3).plan(&set, "sys").expect("plan");

        let backend = ScriptedBackend::new(vec![
            Ok("feat: first half".to_string()),
            Err(GitWiseError::ApiError {
                status: 500,
                message: "upstream exploded".to_string(),
            }),
        ]);
        let err = MessageGenerator::new(&backend, "gpt-4o")
            .generate(&plan, "sys", DetailLevel::Brief)
            .err();

        match err {
            Some(GitWiseError::Generation(msg)) => {
                assert!(msg.contains("chunk 2/2"));
                assert!(msg.contains("upstream exploded"));
            }
            other => panic!("expected generation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_response_is_a_generation_error() {
        let counter = TokenCounter::with_tokenizer(CharTokenizer);
        let set = uniform_set(1);
        let plan = ChunkPlanner::new(&counter, 100_000, 3).plan(&set, "sys").expect("plan");
        let backend = ScriptedBackend::new(vec![Err(GitWiseError::EmptyResponse)]);

        let err = MessageGenerator::new(&backend, "gpt-4o-mini")
            .generate(&plan, "sys", DetailLevel::Brief)
            .err();

        assert!(matches!(err, Some(GitWiseError::Generation(_))));
    }

    #[test]
    fn blank_reply_is_a_generation_error() {
        let counter = TokenCounter::with_tokenizer(CharTokenizer);
        let set = uniform_set(4);
        let budget = ChunkPlanner::new(&counter, 0, 3).request_tokens("sys", &set.entries()[..2]);
        let plan = ChunkPlanner::new(&counter, budget, 3).plan(&set, "sys").expect("plan");
        let backend = ScriptedBackend::new(vec![
            Ok("feat: first half".to_string()),
            Ok("  \n".to_string()),
        ]);

        let err = MessageGenerator::new(&backend, "gpt-4o-mini")
            .generate(&plan, "sys", DetailLevel::Brief)
            .err();

        match err {
            Some(GitWiseError::Generation(msg)) => {
                assert!(msg.contains("chunk 2/2"));
                assert!(msg.contains("empty response"));
            }
            other => panic!("expected generation error, got {other:?}"),
        }
    }
}
