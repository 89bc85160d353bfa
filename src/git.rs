use crate::changes::{ChangeEntry, ChangeKind, ChangeSet};
use crate::error::{GitWiseError, Result};
use chrono::DateTime;
use git2::{Delta, DiffFindOptions, ErrorCode, Oid, Repository, Tree};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

const RECENT_COMMIT_LIMIT: usize = 5;
const BINARY_PLACEHOLDER: &str = "Binary file";

pub struct GitRepo {
    repo: Repository,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentCommit {
    pub message: String,
    pub author: String,
    pub date: String,
}

/// Descriptive repository facts injected into the system prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoContext {
    pub name: String,
    pub current_branch: Option<String>,
    pub recent_commits: Vec<RecentCommit>,
    pub branches: Vec<String>,
    pub remote_url: Option<String>,
}

impl RepoContext {
    pub fn render(&self) -> String {
        let mut out = format!("Repository: {}\n", self.name);
        out.push_str(&format!(
            "Current branch: {}\n",
            self.current_branch.as_deref().unwrap_or("(detached)")
        ));
        if let Some(url) = &self.remote_url {
            out.push_str(&format!("Remote: {url}\n"));
        }
        if !self.branches.is_empty() {
            out.push_str(&format!("Branches: {}\n", self.branches.join(", ")));
        }
        if !self.recent_commits.is_empty() {
            out.push_str("Recent commits:\n");
            for commit in &self.recent_commits {
                out.push_str(&format!(
                    "- {} ({}, {})\n",
                    commit.message, commit.author, commit.date
                ));
            }
        }
        out.trim_end().to_string()
    }
}

/// Pending (entry, old blob id) pairs, keyed by path, built during a diff walk.
struct Pending {
    entries: Vec<(ChangeEntry, Option<Oid>)>,
    index: HashMap<String, usize>,
}

impl GitRepo {
    pub fn discover() -> Result<Self> {
        Self::discover_at(".")
    }

    pub fn discover_at(path: impl AsRef<Path>) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|_| GitWiseError::NotAGitRepo)?;
        Ok(Self { repo })
    }

    pub fn branch(&self) -> Option<String> {
        self.repo
            .head()
            .ok()
            .filter(|h| h.is_branch())
            .and_then(|h| h.shorthand().map(|s| s.to_string()))
    }

    /// Collects staged changes (HEAD tree against the index) in diff order.
    pub fn collect_staged(&self) -> Result<ChangeSet> {
        let head_tree = self.head_tree()?;
        let mut diff = self
            .repo
            .diff_tree_to_index(head_tree.as_ref(), None, None)?;

        let mut find_opts = DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))?;

        let pending = RefCell::new(Pending {
            entries: Vec::new(),
            index: HashMap::new(),
        });

        diff.foreach(
            &mut |delta, _| {
                let Some(path) = delta_path(&delta) else {
                    return true;
                };
                let entry = match delta.status() {
                    Delta::Added | Delta::Copied => ChangeEntry::added(path.clone(), ""),
                    Delta::Deleted => ChangeEntry::deleted(path.clone()),
                    Delta::Renamed => {
                        let old_path = delta
                            .old_file()
                            .path()
                            .map(|p| p.to_string_lossy().to_string())
                            .unwrap_or_default();
                        ChangeEntry::renamed(old_path, path.clone(), "")
                    }
                    _ => ChangeEntry::modified(path.clone(), ""),
                };
                let blob = (entry.kind == ChangeKind::Added).then(|| delta.new_file().id());

                let mut pending = pending.borrow_mut();
                let slot = pending.entries.len();
                pending.index.insert(path, slot);
                pending.entries.push((entry, blob));
                true
            },
            None,
            Some(&mut |delta, hunk| {
                let Some(path) = delta_path(&delta) else {
                    return true;
                };
                let mut pending = pending.borrow_mut();
                if let Some(slot) = pending.index.get(&path).copied() {
                    let entry = &mut pending.entries[slot].0;
                    if takes_patch(entry.kind) {
                        entry.content.push_str(&String::from_utf8_lossy(hunk.header()));
                    }
                }
                true
            }),
            Some(&mut |delta, _hunk, line| {
                let Some(path) = delta_path(&delta) else {
                    return true;
                };
                let mut pending = pending.borrow_mut();
                let Some(slot) = pending.index.get(&path).copied() else {
                    return true;
                };
                let entry = &mut pending.entries[slot].0;
                if takes_patch(entry.kind)
                    && matches!(line.origin(), '+' | '-' | ' ')
                {
                    entry.content.push(line.origin());
                    entry
                        .content
                        .push_str(&String::from_utf8_lossy(line.content()));
                }
                true
            }),
        )?;

        let mut changes = ChangeSet::new();
        for (mut entry, blob) in pending.into_inner().entries {
            if let Some(id) = blob {
                entry.content = self.blob_text(id);
            }
            if !changes.insert(entry) {
                warn!("duplicate staged path skipped");
            }
        }
        debug!(files = changes.len(), "collected staged changes");
        Ok(changes)
    }

    pub fn describe(&self) -> RepoContext {
        let remote_url = self
            .repo
            .find_remote("origin")
            .ok()
            .and_then(|r| r.url().map(|u| u.to_string()));

        let name = remote_url
            .as_deref()
            .and_then(repo_name_from_remote)
            .unwrap_or_else(|| self.workdir_name());

        RepoContext {
            name,
            current_branch: self.branch(),
            recent_commits: self.recent_commits(),
            branches: self.local_branches(),
            remote_url,
        }
    }

    fn head_tree(&self) -> Result<Option<Tree<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_tree()?)),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn blob_text(&self, id: Oid) -> String {
        match self.repo.find_blob(id) {
            Ok(blob) if blob.is_binary() => BINARY_PLACEHOLDER.to_string(),
            Ok(blob) => match std::str::from_utf8(blob.content()) {
                Ok(text) => text.to_string(),
                Err(_) => BINARY_PLACEHOLDER.to_string(),
            },
            Err(e) => {
                warn!(error = %e, "unable to read staged blob");
                "Unable to retrieve file content".to_string()
            }
        }
    }

    fn workdir_name(&self) -> String {
        self.repo
            .workdir()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "repository".to_string())
    }

    fn recent_commits(&self) -> Vec<RecentCommit> {
        let Ok(mut walk) = self.repo.revwalk() else {
            return Vec::new();
        };
        if walk.push_head().is_err() {
            return Vec::new();
        }
        walk.filter_map(|oid| oid.ok())
            .filter_map(|oid| self.repo.find_commit(oid).ok())
            .take(RECENT_COMMIT_LIMIT)
            .map(|commit| RecentCommit {
                message: commit.summary().unwrap_or_default().to_string(),
                author: commit.author().name().unwrap_or("unknown").to_string(),
                date: DateTime::from_timestamp(commit.time().seconds(), 0)
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            })
            .collect()
    }

    fn local_branches(&self) -> Vec<String> {
        let Ok(branches) = self.repo.branches(Some(git2::BranchType::Local)) else {
            return Vec::new();
        };
        branches
            .filter_map(|b| b.ok())
            .filter_map(|(branch, _)| branch.name().ok().flatten().map(|n| n.to_string()))
            .collect()
    }
}

fn takes_patch(kind: ChangeKind) -> bool {
    matches!(kind, ChangeKind::Modified | ChangeKind::Renamed)
}

fn delta_path(delta: &git2::DiffDelta<'_>) -> Option<String> {
    delta
        .new_file()
        .path()
        .or_else(|| delta.old_file().path())
        .map(|p| p.to_string_lossy().to_string())
}

/// `owner/repo` from an https or scp-style remote URL.
pub fn repo_name_from_remote(url: &str) -> Option<String> {
    let trimmed = url.trim_end_matches('/').trim_end_matches(".git");
    let mut parts = trimmed.rsplit(['/', ':']);
    let repo = parts.next().filter(|s| !s.is_empty())?;
    let owner = parts.next().filter(|s| !s.is_empty())?;
    Some(format!("{owner}/{repo}"))
}

pub fn commit_with_git_cli(message: &str) -> Result<()> {
    let output = std::process::Command::new("git")
        .arg("commit")
        .arg("-m")
        .arg(message)
        .output()
        .map_err(|e| GitWiseError::CommitFailed(format!("Failed to run git commit: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let msg = if !stderr.is_empty() {
            stderr.to_string()
        } else if !stdout.is_empty() {
            stdout.to_string()
        } else {
            "Git commit failed".to_string()
        };
        return Err(GitWiseError::CommitFailed(msg));
    }

    Ok(())
}
