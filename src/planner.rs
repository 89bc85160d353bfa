use crate::changes::{ChangeEntry, ChangeSet};
use crate::error::{GitWiseError, Result};
use crate::prompt;
use crate::tokens::TokenCounter;
use tracing::{debug, info};

pub const DEFAULT_TOKEN_BUDGET: usize = 16_000;
pub const DEFAULT_MAX_CHUNKS: usize = 3;

/// Contiguous slices of a change set, each sent as its own request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan<'a> {
    fragments: Vec<&'a [ChangeEntry]>,
    truncated: bool,
}

impl<'a> ChunkPlan<'a> {
    pub fn fragments(&self) -> &[&'a [ChangeEntry]] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_single(&self) -> bool {
        self.fragments.len() == 1
    }

    /// True when the change set could not be covered within the budget and
    /// only a leading subset of it was kept.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn fragment_sizes(&self) -> Vec<usize> {
        self.fragments.iter().map(|f| f.len()).collect()
    }
}

pub struct ChunkPlanner<'c> {
    counter: &'c TokenCounter,
    token_budget: usize,
    max_chunks: usize,
}

impl<'c> ChunkPlanner<'c> {
    pub fn new(counter: &'c TokenCounter, token_budget: usize, max_chunks: usize) -> Self {
        Self {
            counter,
            token_budget,
            max_chunks,
        }
    }

    pub fn request_tokens(&self, system_instructions: &str, fragment: &[ChangeEntry]) -> usize {
        let request = prompt::assemble(system_instructions, fragment);
        self.counter.count(request.messages())
    }

    pub fn plan<'a>(&self, changes: &'a ChangeSet, system_instructions: &str) -> Result<ChunkPlan<'a>> {
        let entries = changes.entries();
        if entries.is_empty() {
            return Err(GitWiseError::NoStagedChanges);
        }

        let total_tokens = self.request_tokens(system_instructions, entries);
        debug!(total_tokens, budget = self.token_budget, files = entries.len(), "planning request");
        if total_tokens <= self.token_budget {
            return Ok(ChunkPlan {
                fragments: vec![entries],
                truncated: false,
            });
        }

        for num_chunks in 2..=self.max_chunks {
            let fragments = split_fixed_stride(entries, num_chunks);
            let max_tokens = fragments
                .iter()
                .map(|fragment| self.request_tokens(system_instructions, fragment))
                .max()
                .unwrap_or(0);
            debug!(num_chunks, fragments = fragments.len(), max_tokens, "trying split");

            if max_tokens <= self.token_budget {
                return Ok(ChunkPlan {
                    fragments,
                    truncated: false,
                });
            }
        }

        let kept = self.fitting_prefix_len(entries, system_instructions);
        info!(
            kept,
            total = entries.len(),
            max_chunks = self.max_chunks,
            "changes exceed token budget, truncating"
        );
        Ok(ChunkPlan {
            fragments: vec![&entries[..kept]],
            truncated: true,
        })
    }

    /// Number of leading entries whose combined request stays within budget.
    fn fitting_prefix_len(&self, entries: &[ChangeEntry], system_instructions: &str) -> usize {
        let mut kept = 0;
        for end in 1..=entries.len() {
            if self.request_tokens(system_instructions, &entries[..end]) > self.token_budget {
                break;
            }
            kept = end;
        }
        kept
    }
}

/// Slices `entries` in strides of `len / num_chunks`.
///
/// When `len` is not divisible by `num_chunks` the remainder lands in an extra
/// trailing fragment, so ten entries split three ways become `3, 3, 3, 1`.
/// The stride never drops below one.
pub fn split_fixed_stride(entries: &[ChangeEntry], num_chunks: usize) -> Vec<&[ChangeEntry]> {
    let stride = (entries.len() / num_chunks.max(1)).max(1);
    entries.chunks(stride).collect()
}
