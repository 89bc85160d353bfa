use crate::changes::{ChangeEntry, ChangeKind};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are a Git commit message generator that follows conventional commit practices. Your task is to generate a clear, concise, and meaningful commit message based on the staged changes provided.

## GUIDELINES

- Start with a type prefix (feat, fix, docs, style, refactor, test, chore)
- Keep the first line under 72 characters
- Use the imperative mood ("add" not "added" or "adds")
- Be descriptive but concise
- Focus on WHY and WHAT changed, not HOW

## CONFIGURATION

Detail level: {detail_level}
Language preference: {language}
Repository context:
{repository_context}

## OUTPUT

Your response must contain ONLY the commit message. No explanations. No comments."#;

const USER_PREFIX: &str = "Staged changes: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Detailed,
    #[default]
    Brief,
    Minimal,
}

impl DetailLevel {
    pub fn max_output_tokens(self) -> u32 {
        match self {
            DetailLevel::Detailed => 500,
            DetailLevel::Brief => 200,
            DetailLevel::Minimal => 100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DetailLevel::Detailed => "detailed",
            DetailLevel::Brief => "brief",
            DetailLevel::Minimal => "minimal",
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A system message followed by the user message carrying the changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub system: PromptMessage,
    pub user: PromptMessage,
}

impl Request {
    pub fn messages(&self) -> [&PromptMessage; 2] {
        [&self.system, &self.user]
    }

    pub fn to_messages(&self) -> Vec<PromptMessage> {
        vec![self.system.clone(), self.user.clone()]
    }
}

pub fn build_system_prompt(detail: DetailLevel, language: &str, repository_context: &str) -> String {
    SYSTEM_PROMPT_TEMPLATE
        .replace("{detail_level}", detail.as_str())
        .replace("{language}", language)
        .replace("{repository_context}", repository_context)
}

pub fn assemble<'a, I>(system_instructions: &str, fragment: I) -> Request
where
    I: IntoIterator<Item = &'a ChangeEntry>,
{
    Request {
        system: PromptMessage::system(system_instructions),
        user: PromptMessage::user(format!("{USER_PREFIX}{}", serialize_changes(fragment))),
    }
}

/// Renders entries as a JSON array in iteration order.
///
/// Object keys are emitted in sorted order, so identical input always renders
/// to identical text.
pub fn serialize_changes<'a, I>(fragment: I) -> String
where
    I: IntoIterator<Item = &'a ChangeEntry>,
{
    let items = fragment.into_iter().map(entry_value).collect::<Vec<_>>();
    Value::Array(items).to_string()
}

fn entry_value(entry: &ChangeEntry) -> Value {
    let mut object = Map::new();
    object.insert("path".into(), Value::String(entry.path.clone()));
    object.insert("type".into(), Value::String(entry.kind.as_str().to_string()));
    object.insert("content".into(), Value::String(entry.content.clone()));
    if entry.kind == ChangeKind::Renamed
        && let Some(old_path) = &entry.old_path
    {
        object.insert("old_path".into(), Value::String(old_path.clone()));
    }
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::{DetailLevel, Role, assemble, build_system_prompt, serialize_changes};
    use crate::changes::{ChangeEntry, ChangeSet};

    fn sample_set() -> ChangeSet {
        [
            ChangeEntry::modified("src/main.rs", "-old\n+new\n"),
            ChangeEntry::added("README.md", "# hello\n"),
            ChangeEntry::renamed("a.rs", "b.rs", "+x\n"),
            ChangeEntry::deleted("gone.rs"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn system_prompt_interpolates_configuration() {
        let prompt = build_system_prompt(DetailLevel::Minimal, "zh", "Repository: demo");

        assert!(prompt.contains("Detail level: minimal"));
        assert!(prompt.contains("Language preference: zh"));
        assert!(prompt.contains("Repository: demo"));
        assert!(!prompt.contains("{language}"));
    }

    #[test]
    fn assemble_builds_system_then_user_message() {
        let set = sample_set();
        let request = assemble("instructions", &set);

        assert_eq!(request.system.role, Role::System);
        assert_eq!(request.system.content, "instructions");
        assert_eq!(request.user.role, Role::User);
        assert!(request.user.content.starts_with("Staged changes: ["));
    }

    #[test]
    fn serialization_keeps_entry_order_and_is_stable() {
        let set = sample_set();
        let first = serialize_changes(&set);
        let second = serialize_changes(&set);
        assert_eq!(first, second);

        let main_at = first.find("src/main.rs").expect("main.rs rendered");
        let readme_at = first.find("README.md").expect("README rendered");
        let gone_at = first.find("gone.rs").expect("gone.rs rendered");
        assert!(main_at < readme_at && readme_at < gone_at);
        assert!(first.contains(r#""old_path":"a.rs""#));
        assert!(first.contains(r#""type":"deleted""#));
    }

    #[test]
    fn empty_fragment_renders_empty_array() {
        let request = assemble("sys", &ChangeSet::new());
        assert_eq!(request.user.content, "Staged changes: []");
    }

    #[test]
    fn detail_levels_cap_output_tokens() {
        assert_eq!(DetailLevel::Detailed.max_output_tokens(), 500);
        assert_eq!(DetailLevel::Brief.max_output_tokens(), 200);
        assert_eq!(DetailLevel::Minimal.max_output_tokens(), 100);
    }
}
