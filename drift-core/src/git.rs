//! Git diff retrieval and file content lookup.
//!
//! All git subprocess calls live here. Nothing else touches git.

use crate::error::DriftError;
use crate::languages::Language;
use crate::pipeline::ContentProvider;
use crate::refs::RepoQuery;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Handle to a git repository rooted at a filesystem path.
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn git(&self, args: &[&str]) -> std::io::Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
    }

    /// Run `git diff --no-renames` and return raw unified diff text.
    pub fn diff(&self, ref_range: &str) -> crate::Result<String> {
        let output = self.git(&["diff", "--no-renames", ref_range])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let first_line = stderr.lines().next().unwrap_or("unknown error").to_string();
            let lower = stderr.to_lowercase();
            let err = if lower.contains("not a git repository") {
                DriftError::NotARepository(self.root.clone())
            } else if lower.contains("unknown revision") || lower.contains("bad revision") {
                DriftError::InvalidRefRange {
                    range: ref_range.to_string(),
                    detail: first_line,
                }
            } else {
                DriftError::GitCommand {
                    command: "diff".to_string(),
                    detail: first_line,
                }
            };
            tracing::warn!("git diff failed: {err}");
            return Err(err);
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// File contents at `ref:path`. Absence at the ref is None, not an error.
    pub fn show(&self, at_ref: &str, path: &str) -> Option<String> {
        let spec = format!("{at_ref}:{path}");
        let output = self.git(&["show", &spec]).ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ContentProvider for GitRepo {
    fn content(&self, at_ref: &str, path: &str) -> Option<String> {
        self.show(at_ref, path)
    }
}

impl RepoQuery for GitRepo {
    fn ls_files(&self, at_ref: &str) -> Vec<String> {
        let Ok(output) = self.git(&["ls-tree", "-r", "--name-only", at_ref]) else {
            return Vec::new();
        };
        if !output.status.success() {
            return Vec::new();
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()
    }

    fn file_at_ref(&self, at_ref: &str, path: &str) -> Option<String> {
        self.show(at_ref, path)
    }

    /// `git grep -l` restricted to supported extensions. Failures produce an
    /// empty set, which callers treat as "pre-filter unavailable".
    fn grep_files(&self, needle: &str, at_ref: &str) -> Vec<String> {
        let mut args: Vec<&str> = vec!["grep", "-l", needle, at_ref, "--"];
        args.extend(Language::extension_globs());
        let Ok(output) = self.git(&args) else {
            tracing::debug!("git grep unavailable, falling back to full listing");
            return Vec::new();
        };
        if !output.status.success() {
            return Vec::new();
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|l| !l.is_empty())
            // git grep with a ref outputs "ref:path"
            .map(|line| match line.split_once(':') {
                Some((_, path)) => path.to_string(),
                None => line.to_string(),
            })
            .collect()
    }
}
