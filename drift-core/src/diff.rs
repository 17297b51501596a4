//! Unified diff parsing and generated-file detection

use crate::schema::ChangeType;
use once_cell::sync::Lazy;
use regex::Regex;

/// Patterns marking files as generated or vendored. Matching rules:
/// trailing `/` = path prefix, leading `.` = suffix, otherwise exact basename.
pub const DEFAULT_GENERATED_PATTERNS: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "poetry.lock",
    "Pipfile.lock",
    "Cargo.lock",
    "go.sum",
    "composer.lock",
    "Gemfile.lock",
    "flake.lock",
    ".min.js",
    ".min.css",
    ".map",
    "vendor/",
    "node_modules/",
    "third_party/",
    "__generated__/",
    ".pb.go",
    "_generated.go",
];

/// Origin of a single diff line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOrigin {
    Add,
    Remove,
    Context,
}

/// Parsed `@@` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub section: String,
}

/// A single line from a diff hunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub origin: LineOrigin,
    pub content: String,
    pub old_lineno: Option<usize>,
    pub new_lineno: Option<usize>,
}

/// A contiguous hunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub header: HunkHeader,
    pub lines: Vec<DiffLine>,
}

/// Parsed diff for a single file.
///
/// At least one of `old_path` / `new_path` is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// None for newly added files
    pub old_path: Option<String>,
    /// None for deleted files
    pub new_path: Option<String>,
    pub change_type: ChangeType,
    pub binary: bool,
    pub generated: bool,
    pub hunks: Vec<DiffHunk>,
}

impl FileDiff {
    pub fn path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or("")
    }

    pub fn additions(&self) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| l.origin == LineOrigin::Add)
            .count()
    }

    pub fn deletions(&self) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| l.origin == LineOrigin::Remove)
            .count()
    }
}

static DIFF_GIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^diff --git a/(.*) b/(.*)$").unwrap());

static HUNK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@(.*)?$").unwrap());

/// Full pattern table: the defaults plus any configured extras.
pub fn generated_patterns(extra: &[String]) -> Vec<String> {
    DEFAULT_GENERATED_PATTERNS
        .iter()
        .map(|p| p.to_string())
        .chain(extra.iter().cloned())
        .collect()
}

/// Check whether a file path matches generated/vendored patterns.
pub fn is_generated(path: &str, patterns: &[String]) -> bool {
    for pat in patterns {
        if pat.ends_with('/') {
            // directory prefix
            if format!("/{path}").contains(&format!("/{pat}")) || path.starts_with(pat.as_str()) {
                return true;
            }
        } else if pat.starts_with('.') {
            // extension/suffix
            if path.ends_with(pat.as_str()) {
                return true;
            }
        } else {
            // exact filename (basename)
            if path == pat || path.ends_with(&format!("/{pat}")) {
                return true;
            }
        }
    }
    false
}

/// Parse unified diff text into structured [`FileDiff`] records.
///
/// Malformed hunk headers are skipped rather than aborting the parse; the
/// parser degrades file-by-file. When `skip_generated` is set, files are
/// never flagged as generated even if they match the pattern table.
pub fn parse_diff(diff_text: &str, patterns: &[String], skip_generated: bool) -> Vec<FileDiff> {
    let lines: Vec<&str> = diff_text.split('\n').collect();
    let mut files: Vec<FileDiff> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let captures = match DIFF_GIT_RE.captures(lines[i]) {
            Some(c) => c,
            None => {
                i += 1;
                continue;
            }
        };

        let a_path = captures.get(1).map_or("", |m| m.as_str()).to_string();
        let b_path = captures.get(2).map_or("", |m| m.as_str()).to_string();
        i += 1;

        // Consume extended header lines
        let mut old_path: Option<String> = Some(a_path);
        let mut new_path: Option<String> = Some(b_path);
        let mut is_binary = false;
        let mut change_type = ChangeType::Modified;

        while i < lines.len() && !lines[i].starts_with("diff --git ") {
            let hdr = lines[i];

            if hdr.starts_with("Binary files") {
                is_binary = true;
                i += 1;
                break;
            }
            if hdr.starts_with("new file mode") {
                change_type = ChangeType::Added;
                old_path = None;
                i += 1;
                continue;
            }
            if hdr.starts_with("deleted file mode") {
                change_type = ChangeType::Removed;
                new_path = None;
                i += 1;
                continue;
            }
            if hdr.starts_with("--- ") {
                if hdr == "--- /dev/null" {
                    old_path = None;
                    change_type = ChangeType::Added;
                }
                i += 1;
                continue;
            }
            if hdr.starts_with("+++ ") {
                if hdr == "+++ /dev/null" {
                    new_path = None;
                    change_type = ChangeType::Removed;
                }
                i += 1;
                continue;
            }
            if hdr.starts_with("@@") {
                break; // start of hunks
            }
            // Other extended headers (index, similarity, mode, ...)
            i += 1;
        }

        let canonical = new_path.as_deref().or(old_path.as_deref()).unwrap_or("");
        let generated = !skip_generated && is_generated(canonical, patterns);

        let mut file_diff = FileDiff {
            old_path,
            new_path,
            change_type,
            binary: is_binary,
            generated,
            hunks: Vec::new(),
        };

        // Binary files carry no hunks
        if is_binary {
            files.push(file_diff);
            continue;
        }

        while i < lines.len() && !lines[i].starts_with("diff --git ") {
            if !lines[i].starts_with("@@") {
                i += 1;
                continue;
            }
            let hunk_caps = match HUNK_RE.captures(lines[i]) {
                Some(c) => c,
                None => {
                    i += 1;
                    continue;
                }
            };

            let header = HunkHeader {
                old_start: hunk_caps[1].parse().unwrap_or(0),
                old_count: hunk_caps
                    .get(2)
                    .map_or(1, |m| m.as_str().parse().unwrap_or(1)),
                new_start: hunk_caps[3].parse().unwrap_or(0),
                new_count: hunk_caps
                    .get(4)
                    .map_or(1, |m| m.as_str().parse().unwrap_or(1)),
                section: hunk_caps
                    .get(5)
                    .map_or(String::new(), |m| m.as_str().trim().to_string()),
            };
            let mut hunk = DiffHunk {
                header,
                lines: Vec::new(),
            };
            i += 1;

            let mut old_ln = hunk.header.old_start;
            let mut new_ln = hunk.header.new_start;

            while i < lines.len()
                && !lines[i].starts_with("diff --git ")
                && !lines[i].starts_with("@@")
            {
                let dl = lines[i];
                if let Some(content) = dl.strip_prefix('+') {
                    hunk.lines.push(DiffLine {
                        origin: LineOrigin::Add,
                        content: content.to_string(),
                        old_lineno: None,
                        new_lineno: Some(new_ln),
                    });
                    new_ln += 1;
                } else if let Some(content) = dl.strip_prefix('-') {
                    hunk.lines.push(DiffLine {
                        origin: LineOrigin::Remove,
                        content: content.to_string(),
                        old_lineno: Some(old_ln),
                        new_lineno: None,
                    });
                    old_ln += 1;
                } else if let Some(content) = dl.strip_prefix(' ') {
                    hunk.lines.push(DiffLine {
                        origin: LineOrigin::Context,
                        content: content.to_string(),
                        old_lineno: Some(old_ln),
                        new_lineno: Some(new_ln),
                    });
                    old_ln += 1;
                    new_ln += 1;
                } else if dl.starts_with("\\ No newline at end of file") {
                    // does not affect line counters
                } else if dl.is_empty() {
                    // A truly blank line is an empty context line only when the
                    // diff continues afterward; otherwise it ends the hunk.
                    let continues = lines.get(i + 1).is_some_and(|next| {
                        next.starts_with("diff --git ")
                            || next.starts_with("@@")
                            || next.starts_with('+')
                            || next.starts_with('-')
                            || next.starts_with(' ')
                            || next.starts_with("\\ ")
                    });
                    if continues {
                        hunk.lines.push(DiffLine {
                            origin: LineOrigin::Context,
                            content: String::new(),
                            old_lineno: Some(old_ln),
                            new_lineno: Some(new_ln),
                        });
                        old_ln += 1;
                        new_ln += 1;
                    } else {
                        i += 1;
                        break;
                    }
                }
                i += 1;
            }

            file_diff.hunks.push(hunk);
        }

        files.push(file_diff);
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Vec<String> {
        generated_patterns(&[])
    }

    const SIMPLE_DIFF: &str = "\
diff --git a/src/app.py b/src/app.py
index 83db48f..bf269f4 100644
--- a/src/app.py
+++ b/src/app.py
@@ -1,4 +1,5 @@ def helper
 def helper(a):
-    return a
+    return a + 1
+
 # trailing comment
";

    #[test]
    fn test_parse_simple_modification() {
        let files = parse_diff(SIMPLE_DIFF, &defaults(), false);
        assert_eq!(files.len(), 1);
        let fd = &files[0];
        assert_eq!(fd.path(), "src/app.py");
        assert_eq!(fd.change_type, ChangeType::Modified);
        assert_eq!(fd.hunks.len(), 1);
        assert_eq!(fd.additions(), 2);
        assert_eq!(fd.deletions(), 1);
        assert_eq!(fd.hunks[0].header.section, "def helper");
    }

    #[test]
    fn test_line_numbers_advance_independently() {
        let files = parse_diff(SIMPLE_DIFF, &defaults(), false);
        let hunk = &files[0].hunks[0];
        // context line
        assert_eq!(hunk.lines[0].old_lineno, Some(1));
        assert_eq!(hunk.lines[0].new_lineno, Some(1));
        // removed line holds only an old number
        assert_eq!(hunk.lines[1].old_lineno, Some(2));
        assert_eq!(hunk.lines[1].new_lineno, None);
        // added line holds only a new number
        assert_eq!(hunk.lines[2].old_lineno, None);
        assert_eq!(hunk.lines[2].new_lineno, Some(2));
    }

    #[test]
    fn test_new_file() {
        let diff = "\
diff --git a/src/new.py b/src/new.py
new file mode 100644
index 0000000..e69de29
--- /dev/null
+++ b/src/new.py
@@ -0,0 +1,2 @@
+def f():
+    return 1
";
        let files = parse_diff(diff, &defaults(), false);
        assert_eq!(files[0].change_type, ChangeType::Added);
        assert_eq!(files[0].old_path, None);
        assert_eq!(files[0].new_path.as_deref(), Some("src/new.py"));
    }

    #[test]
    fn test_deleted_file() {
        let diff = "\
diff --git a/src/old.py b/src/old.py
deleted file mode 100644
index e69de29..0000000
--- a/src/old.py
+++ /dev/null
@@ -1,2 +0,0 @@
-def f():
-    return 1
";
        let files = parse_diff(diff, &defaults(), false);
        assert_eq!(files[0].change_type, ChangeType::Removed);
        assert_eq!(files[0].new_path, None);
    }

    #[test]
    fn test_binary_file_has_no_hunks() {
        let diff = "\
diff --git a/logo.png b/logo.png
index 83db48f..bf269f4 100644
Binary files a/logo.png and b/logo.png differ
";
        let files = parse_diff(diff, &defaults(), false);
        assert!(files[0].binary);
        assert!(files[0].hunks.is_empty());
    }

    #[test]
    fn test_hunk_header_defaults_counts_to_one() {
        let diff = "\
diff --git a/a.py b/a.py
--- a/a.py
+++ b/a.py
@@ -3 +3 @@
-x = 1
+x = 2
";
        let files = parse_diff(diff, &defaults(), false);
        let header = &files[0].hunks[0].header;
        assert_eq!(header.old_count, 1);
        assert_eq!(header.new_count, 1);
    }

    #[test]
    fn test_no_newline_marker_skipped() {
        let diff = "\
diff --git a/a.py b/a.py
--- a/a.py
+++ b/a.py
@@ -1 +1 @@
-x = 1
\\ No newline at end of file
+x = 2
\\ No newline at end of file
";
        let files = parse_diff(diff, &defaults(), false);
        let hunk = &files[0].hunks[0];
        assert_eq!(hunk.lines.len(), 2);
        assert_eq!(hunk.lines[1].new_lineno, Some(1));
    }

    #[test]
    fn test_malformed_hunk_header_skipped() {
        let diff = "\
diff --git a/a.py b/a.py
--- a/a.py
+++ b/a.py
@@ garbage @@
@@ -1 +1 @@
-x = 1
+x = 2
";
        let files = parse_diff(diff, &defaults(), false);
        assert_eq!(files[0].hunks.len(), 1);
    }

    #[test]
    fn test_multiple_files() {
        let diff = format!(
            "{}diff --git a/b.py b/b.py\n--- a/b.py\n+++ b/b.py\n@@ -1 +1 @@\n-y = 1\n+y = 2\n",
            SIMPLE_DIFF
        );
        let files = parse_diff(&diff, &defaults(), false);
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].path(), "b.py");
    }

    #[test]
    fn test_generated_lockfile_flagged() {
        let diff = "\
diff --git a/package-lock.json b/package-lock.json
--- a/package-lock.json
+++ b/package-lock.json
@@ -1 +1 @@
-{}
+{\"x\": 1}
";
        let files = parse_diff(diff, &defaults(), false);
        assert!(files[0].generated);

        let files = parse_diff(diff, &defaults(), true);
        assert!(!files[0].generated, "skip_generated disables flagging");
    }

    #[test]
    fn test_is_generated_pattern_classes() {
        let patterns = defaults();
        // basename exact, anywhere in the tree
        assert!(is_generated("package-lock.json", &patterns));
        assert!(is_generated("web/package-lock.json", &patterns));
        // suffix
        assert!(is_generated("dist/app.min.js", &patterns));
        assert!(is_generated("api/service.pb.go", &patterns));
        // directory prefix at root or nested
        assert!(is_generated("vendor/lib/x.go", &patterns));
        assert!(is_generated("pkg/node_modules/m/index.js", &patterns));
        // plain source is not generated
        assert!(!is_generated("src/app.py", &patterns));
        assert!(!is_generated("src/vendored_helpers.py", &patterns));
    }

    #[test]
    fn test_extra_patterns_appended() {
        let patterns = generated_patterns(&["schema_gen.py".to_string()]);
        assert!(is_generated("api/schema_gen.py", &patterns));
        assert!(is_generated("package-lock.json", &patterns));
    }
}
