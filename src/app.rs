use crate::args::{Command, StartArgs};
use crate::changes::ChangeSet;
use crate::config::{self, Config};
use crate::error::{GitWiseError, Result};
use crate::generator::MessageGenerator;
use crate::git::{self, GitRepo};
use crate::openai::{self, ModelBackend, OpenAiBackend};
use crate::output::OutputSink;
use crate::planner::ChunkPlanner;
use crate::prompt::{self, DetailLevel};
use crate::tokens::TokenCounter;
use dialoguer::{Confirm, Input, Password, Select};
use tracing::info;

const TRUNCATION_WARNING: &str = "Your changes are extensive. The commit message generation might be incomplete. Only a reduced subset of the staged changes will be processed.";

const LANGUAGES: [(&str, Option<&str>); 3] = [
    ("English (default)", Some("en")),
    ("Chinese", Some("zh")),
    ("Custom", None),
];

const DETAIL_LEVELS: [(&str, DetailLevel); 3] = [
    (
        "Detailed - Comprehensive commit messages with context",
        DetailLevel::Detailed,
    ),
    (
        "Brief - Concise but informative messages (Recommended)",
        DetailLevel::Brief,
    ),
    ("Minimal - Just the essential changes", DetailLevel::Minimal),
];

const MODELS: [(&str, &str); 2] = [
    (
        "GPT-4o-mini (Recommended, sufficient for most cases and more cost-effective)",
        "gpt-4o-mini",
    ),
    ("GPT-4o (Full capability, higher cost)", "gpt-4o"),
];

/// `loaded` is the outcome of reading the config file. Only `start` needs a
/// valid file; `init` replaces a broken one and `doctor` reports it.
pub fn run(command: &Command, loaded: Result<Config>, out: &mut dyn OutputSink) -> Result<()> {
    match command {
        Command::Init => init(loaded, out),
        Command::Start(args) => start(&loaded?, args, out),
        Command::Doctor => doctor(loaded, out),
    }
}

/// Everything one `start` run needs to turn staged changes into a message.
pub struct Drafter<'a> {
    pub counter: &'a TokenCounter,
    pub backend: &'a dyn ModelBackend,
    pub model: &'a str,
    pub token_budget: usize,
    pub max_chunks: usize,
}

impl Drafter<'_> {
    pub fn draft(
        &self,
        changes: &ChangeSet,
        system_instructions: &str,
        detail: DetailLevel,
        out: &mut dyn OutputSink,
    ) -> Result<String> {
        if changes.is_empty() {
            return Err(GitWiseError::NoStagedChanges);
        }

        let planner = ChunkPlanner::new(self.counter, self.token_budget, self.max_chunks);
        let plan = planner.plan(changes, system_instructions)?;

        if plan.is_truncated() {
            out.warn(TRUNCATION_WARNING);
            if plan.fragments().iter().all(|f| f.is_empty()) {
                return Err(GitWiseError::Generation(
                    "no staged change fits within the token budget".to_string(),
                ));
            }
        } else if !plan.is_single() {
            out.info(&format!(
                "Changes are large; generating in {} parts.",
                plan.len()
            ));
        }
        info!(sizes = ?plan.fragment_sizes(), truncated = plan.is_truncated(), "plan ready");

        MessageGenerator::new(self.backend, self.model).generate(&plan, system_instructions, detail)
    }
}

fn start(config: &Config, args: &StartArgs, out: &mut dyn OutputSink) -> Result<()> {
    let api_key = config::require_api_key(config)?;
    let model = args.model.as_deref().unwrap_or_else(|| config.model());
    let language = args.language.as_deref().unwrap_or_else(|| config.language());
    let detail = args.detail.unwrap_or_else(|| config.detail_level());

    let repo = GitRepo::discover()?;
    let changes = repo.collect_staged()?;
    if changes.is_empty() {
        return Err(GitWiseError::NoStagedChanges);
    }

    let counter = TokenCounter::for_model(model)?;
    let context = repo.describe().render();
    let system_instructions = prompt::build_system_prompt(detail, language, &context);
    let backend = openai::connect(config.provider, api_key, config.api_base());

    out.info(&format!(
        "Generating commit message for {} staged file(s) with {}...",
        changes.len(),
        model
    ));
    let drafter = Drafter {
        counter: &counter,
        backend: backend.as_ref(),
        model,
        token_budget: config.token_budget(),
        max_chunks: config.max_chunks(),
    };
    let message = drafter.draft(&changes, &system_instructions, detail, out)?;
    out.commit_message(&message);

    if args.interactive
        && Confirm::new()
            .with_prompt("Do you want to use this commit message?")
            .default(false)
            .interact()?
    {
        git::commit_with_git_cli(&message)?;
        out.success("Commit created successfully!");
    }
    Ok(())
}

/// The settings `init` would overwrite, if any. An unreadable file counts as
/// nothing to keep.
fn existing_settings(loaded: Result<Config>, out: &mut dyn OutputSink) -> Option<Config> {
    match loaded {
        Ok(config) if config != Config::default() => Some(config),
        Ok(_) => None,
        Err(e) => {
            out.warn(&format!("Existing configuration is unreadable and will be replaced: {e}"));
            None
        }
    }
}

fn init(loaded: Result<Config>, out: &mut dyn OutputSink) -> Result<()> {
    if existing_settings(loaded, out).is_some() {
        let reconfigure = Confirm::new()
            .with_prompt(
                "git-wise is already configured. Do you want to clear the settings and reconfigure?",
            )
            .default(false)
            .interact()?;
        if !reconfigure {
            out.success("Keeping existing configuration.");
            return Ok(());
        }
    }

    let labels: Vec<&str> = LANGUAGES.iter().map(|(label, _)| *label).collect();
    let choice = Select::new()
        .with_prompt("Select your default commit message language")
        .items(&labels)
        .default(0)
        .interact()?;
    let language = match LANGUAGES[choice].1 {
        Some(code) => code.to_string(),
        None => Input::<String>::new()
            .with_prompt("Enter the language code (e.g., fr, de, es) or language name")
            .validate_with(|text: &String| {
                if text.trim().is_empty() {
                    Err("Language cannot be empty")
                } else {
                    Ok(())
                }
            })
            .interact_text()?,
    };

    let labels: Vec<&str> = DETAIL_LEVELS.iter().map(|(label, _)| *label).collect();
    let choice = Select::new()
        .with_prompt("Select the detail level for commit messages")
        .items(&labels)
        .default(1)
        .interact()?;
    let detail_level = DETAIL_LEVELS[choice].1;

    let api_key = Password::new()
        .with_prompt("Enter your OpenAI API key")
        .validate_with(|key: &String| {
            if key.trim().is_empty() {
                Err("API key cannot be empty, please re-enter.")
            } else {
                Ok(())
            }
        })
        .interact()?;
    let api_key = api_key.trim().to_string();

    let labels: Vec<&str> = MODELS.iter().map(|(label, _)| *label).collect();
    let choice = Select::new()
        .with_prompt("Select the default model")
        .items(&labels)
        .default(0)
        .interact()?;
    let model = MODELS[choice].1.to_string();

    let config = Config {
        api_key: Some(api_key.clone()),
        model: Some(model.clone()),
        language: Some(language),
        detail_level: Some(detail_level),
        ..Config::default()
    };
    config::save(&config)?;
    out.success("Configuration saved successfully!");

    if let Err(e) = OpenAiBackend::new(api_key, config.api_base()).validate_api_key(&model) {
        out.warn(&format!("Could not verify the API key: {e}"));
    }
    Ok(())
}

fn doctor(loaded: Result<Config>, out: &mut dyn OutputSink) -> Result<()> {
    out.info("Performing git-wise diagnostics...");

    let config = match loaded {
        Ok(config) => {
            match config::config_path() {
                Ok(path) if path.exists() => {
                    out.success(&format!("Configuration file: found ({})", path.display()))
                }
                Ok(path) => out.warn(&format!("Configuration file: not found ({})", path.display())),
                Err(e) => out.warn(&format!("Configuration file: {e}")),
            }
            config
        }
        Err(e) => {
            out.warn(&format!("Configuration file: invalid ({e})"));
            Config::default()
        }
    };
    let config = &config;

    let missing = config.missing_keys();
    if missing.is_empty() {
        out.success("Configuration content: complete");
    } else {
        out.warn(&format!("Configuration content: missing {}", missing.join(", ")));
    }

    match GitRepo::discover() {
        Ok(_) => out.success("Git repository: valid"),
        Err(_) => out.warn("Git repository: not found or invalid"),
    }

    if config::get_effective_api_key(config).is_some() {
        out.success("API key: found");
    } else {
        out.warn("API key: missing");
    }

    match TokenCounter::for_model(config.model()) {
        Ok(_) => out.success(&format!("Tokenizer: available for {}", config.model())),
        Err(e) => out.warn(&format!("Tokenizer: {e}")),
    }
    Ok(())
}
