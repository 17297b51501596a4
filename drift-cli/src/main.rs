//! Drift CLI - Symbol-level git diff analysis

mod report;

use clap::{Parser, Subcommand};
use colored::Colorize;
use drift_core::{
    find_references, run_pipeline, AnalysisOutput, Config, ContentProvider, DriftError, GitRepo,
    PipelineOptions,
};
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

// Exit codes
const EXIT_SUCCESS: i32 = 0; // no high-signal findings (silence)
const EXIT_FINDINGS: i32 = 1; // findings present, read the output
const EXIT_ERROR: i32 = 2; // something went wrong
const EXIT_NO_CHANGES: i32 = 3; // no changes in diff (summarize)
const EXIT_PARTIAL: i32 = 4; // parse errors in some files (summarize)

#[derive(Parser)]
#[command(name = "drift")]
#[command(version)]
#[command(about = "Symbol-level git diff analysis", long_about = None)]
struct Cli {
    /// Repository path
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize git changes
    Summarize {
        /// Git ref range like HEAD~1..HEAD or main..feature
        /// (default: unstaged changes)
        ref_range: Option<String>,

        /// Read unified diff from stdin ('--diff -')
        #[arg(long = "diff", value_parser = ["-"])]
        diff_source: Option<String>,

        /// Output format
        #[arg(long, value_parser = ["json", "oneliner", "short", "detailed"], default_value = "json")]
        format: String,

        /// Summary tier for text output fallback
        #[arg(long, value_parser = ["oneliner", "short", "detailed"], default_value = "detailed")]
        tier: String,

        /// Skip generated file detection
        #[arg(long)]
        skip_generated: bool,

        /// Include test file changes in summary text output
        #[arg(long)]
        include_tests: bool,

        /// Show skipped (unsupported/binary/generated) files in summary text
        #[arg(long)]
        show_skipped: bool,
    },

    /// Surface high-signal findings for code review
    ///
    /// Detects signature changes, breaking changes, removed and moved
    /// symbols, and finds callers that may be affected. Exit code 0 means
    /// silence, 1 means findings are present.
    Review {
        /// Git ref range (default: HEAD~1..HEAD)
        ref_range: Option<String>,

        /// Disable dependency scanning
        #[arg(long)]
        no_deps: bool,

        /// Show full output even when no high-signal changes
        #[arg(long)]
        verbose: bool,

        /// Output format
        #[arg(long, value_parser = ["text", "json"], default_value = "text")]
        format: String,
    },

    /// Install a git hook that runs drift review before push/commit
    InstallHook {
        /// Git hook type to install
        #[arg(long, value_parser = ["pre-push", "pre-commit"], default_value = "pre-push")]
        hook_type: String,

        /// Overwrite existing hook
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let repo = cli.repo.clone();

    let result = match cli.command {
        Commands::Summarize {
            ref_range,
            diff_source,
            format,
            tier,
            skip_generated,
            include_tests,
            show_skipped,
        } => cmd_summarize(
            &repo,
            ref_range,
            diff_source,
            &format,
            &tier,
            skip_generated,
            include_tests,
            show_skipped,
        ),
        Commands::Review {
            ref_range,
            no_deps,
            verbose,
            format,
        } => cmd_review(&repo, ref_range, no_deps, verbose, &format),
        Commands::InstallHook { hook_type, force } => cmd_install_hook(&repo, &hook_type, force),
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            EXIT_ERROR
        }
    };
    std::process::exit(code);
}

fn pipeline_options(
    config: &Config,
    skip_generated: bool,
    include_tests: bool,
    show_skipped: bool,
) -> PipelineOptions {
    PipelineOptions {
        skip_generated,
        include_tests: include_tests || config.summary.include_tests,
        show_skipped: show_skipped || config.summary.show_skipped,
        extra_generated_patterns: config.generated.extra_patterns.clone(),
    }
}

fn format_output(output: &AnalysisOutput, fmt: &str, tier: &str) -> String {
    let pick_tier = |name: &str| match name {
        "oneliner" => output.tiered.oneliner.clone(),
        "short" => output.tiered.short.clone(),
        _ => output.tiered.detailed.clone(),
    };
    match fmt {
        "json" => serde_json::to_string_pretty(output).unwrap_or_default(),
        "oneliner" | "short" | "detailed" => pick_tier(fmt),
        _ => pick_tier(tier),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_summarize(
    repo_path: &Path,
    ref_range: Option<String>,
    diff_source: Option<String>,
    fmt: &str,
    tier: &str,
    skip_generated: bool,
    include_tests: bool,
    show_skipped: bool,
) -> drift_core::Result<i32> {
    let repo = GitRepo::new(repo_path);
    let config = Config::discover(repo_path)?;

    let (diff_text, range_label, with_provider) = if diff_source.as_deref() == Some("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        (buf, "stdin".to_string(), false)
    } else if let Some(range) = ref_range {
        let diff = repo.diff(&range)?;
        (diff, range, true)
    } else {
        let diff = repo.diff("HEAD")?;
        (diff, "HEAD (unstaged)".to_string(), true)
    };

    if diff_text.trim().is_empty() {
        eprintln!("No changes found.");
        return Ok(EXIT_NO_CHANGES);
    }

    let options = pipeline_options(&config, skip_generated, include_tests, show_skipped);
    let provider: Option<&dyn ContentProvider> = if with_provider { Some(&repo) } else { None };
    let output = run_pipeline(&diff_text, &range_label, provider, &options);

    let has_parse_errors = output.files.iter().any(|fc| fc.parse_error);

    println!("{}", format_output(&output, fmt, tier));

    if has_parse_errors {
        return Ok(EXIT_PARTIAL);
    }
    Ok(EXIT_SUCCESS)
}

fn cmd_review(
    repo_path: &Path,
    ref_range: Option<String>,
    no_deps: bool,
    verbose: bool,
    fmt: &str,
) -> drift_core::Result<i32> {
    let ref_range = ref_range.unwrap_or_else(|| "HEAD~1..HEAD".to_string());
    let repo = GitRepo::new(repo_path);
    let config = Config::discover(repo_path)?;

    let diff_text = repo.diff(&ref_range)?;
    if diff_text.trim().is_empty() {
        if fmt == "json" {
            println!("{}", report::empty_json_output(&ref_range));
        } else {
            eprintln!("No changes found.");
        }
        return Ok(EXIT_SUCCESS);
    }

    let options = pipeline_options(&config, false, false, false);
    let output = run_pipeline(&diff_text, &ref_range, Some(&repo), &options);

    let dep_refs = if no_deps {
        None
    } else {
        let mut changed_symbols: Vec<String> = Vec::new();
        let mut changed_files: HashSet<String> = HashSet::new();
        for fc in &output.files {
            changed_files.insert(fc.path.clone());
            for sc in &fc.changes {
                changed_symbols.push(sc.name.clone());
            }
        }
        if changed_symbols.is_empty() {
            None
        } else {
            let after_ref = ref_range
                .split_once("..")
                .map(|(_, after)| after)
                .unwrap_or(&ref_range);
            Some(find_references(
                &repo,
                &changed_symbols,
                after_ref,
                &changed_files,
            ))
        }
    };

    let has_findings = report::has_high_signal_changes(&output);

    if fmt == "json" {
        println!(
            "{}",
            report::build_json_output(&output, &ref_range, dep_refs.as_deref())
        );
        return Ok(if has_findings {
            EXIT_FINDINGS
        } else {
            EXIT_SUCCESS
        });
    }

    if !verbose && !has_findings {
        return Ok(EXIT_SUCCESS);
    }

    let text = report::format_context_output(&output, dep_refs.as_deref());
    if !text.is_empty() {
        println!("{text}");
        return Ok(EXIT_FINDINGS);
    }
    Ok(EXIT_SUCCESS)
}

const PRE_PUSH_HOOK: &str = r#"#!/bin/sh
# drift pre-push hook: runs drift review on pushed changes
# Installed by: drift install-hook

remote="$1"
z40=0000000000000000000000000000000000000000

while read local_ref local_sha remote_ref remote_sha; do
    if [ "$remote_sha" = "$z40" ]; then
        # New branch: compare against main/master
        base=$(git rev-parse --verify refs/heads/main 2>/dev/null || git rev-parse --verify refs/heads/master 2>/dev/null || echo "")
        if [ -z "$base" ]; then
            continue
        fi
        range="$base..$local_sha"
    else
        range="$remote_sha..$local_sha"
    fi

    echo "Running drift review $range ..."
    drift review "$range"
    status=$?
    if [ $status -eq 1 ]; then
        echo ""
        echo "drift found changes that need review (see above)."
        echo "Push anyway with: git push --no-verify"
        exit 1
    fi
done

exit 0
"#;

const PRE_COMMIT_HOOK: &str = r#"#!/bin/sh
# drift pre-commit hook: runs drift review on staged changes
# Installed by: drift install-hook

echo "Running drift review HEAD ..."
drift review HEAD
status=$?
if [ $status -eq 1 ]; then
    echo ""
    echo "drift found changes that need review (see above)."
    echo "Commit anyway with: git commit --no-verify"
    exit 1
fi

exit 0
"#;

fn cmd_install_hook(repo_path: &Path, hook_type: &str, force: bool) -> drift_core::Result<i32> {
    let git_dir = repo_path.join(".git");
    if !git_dir.is_dir() {
        return Err(DriftError::NotARepository(repo_path.to_path_buf()));
    }

    let hooks_dir = git_dir.join("hooks");
    std::fs::create_dir_all(&hooks_dir)?;

    let hook_path = hooks_dir.join(hook_type);
    if hook_path.exists() && !force {
        eprintln!("Hook already exists: {}", hook_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(EXIT_ERROR);
    }

    let hook_content = if hook_type == "pre-commit" {
        PRE_COMMIT_HOOK
    } else {
        PRE_PUSH_HOOK
    };
    std::fs::write(&hook_path, hook_content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&hook_path)?.permissions();
        perms.set_mode(perms.mode() | 0o111);
        std::fs::set_permissions(&hook_path, perms)?;
    }

    println!(
        "{} {} hook: {}",
        "Installed".green(),
        hook_type,
        hook_path.display()
    );
    Ok(EXIT_SUCCESS)
}
