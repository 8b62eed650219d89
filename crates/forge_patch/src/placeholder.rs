//! Detection of elided-content placeholders in generated edits.
//!
//! Generators sometimes anchor an edit on a stand-in comment such as
//! `// Existing imports ...` or `... rest of the file` instead of real
//! file text. Matching those literally would always fail, so they are
//! recognized up front and turned into insertions.

use regex::Regex;

/// Comment-like markers generators use for content they chose not to repeat.
const PLACEHOLDER_PATTERNS: [&str; 4] = [
    r"(?i)^//\s*(Existing|Add|Insert|Place|Your)\s+.*\.\.\.",
    r"(?i)^/\*\s*(Existing|Add|Insert|Place|Your)\s+.*\.\.\.\s*\*/",
    r"(?i)^#\s*(Existing|Add|Insert|Place|Your)\s+.*\.\.\.",
    r"(?i)^\.\.\.\s*(rest|other|more|existing)",
];

/// Whether `old_text` is a placeholder rather than literal file content.
pub fn is_placeholder(old_text: &str) -> bool {
    let trimmed = old_text.trim();
    PLACEHOLDER_PATTERNS.iter().any(|pattern| {
        Regex::new(pattern)
            .map(|re| re.is_match(trimmed))
            .unwrap_or(false)
    })
}

/// Insert a snippet whose anchor was a placeholder.
///
/// Import declarations land after the last line that already contains
/// `import `; everything else is appended at the end of the file. The
/// caller is expected to skip empty snippets.
pub fn insert_snippet(content: &str, snippet: &str) -> String {
    if snippet.contains("import ") {
        if let Some(last_import) = content.rfind("import ") {
            if let Some(line_break) = content[last_import..].find('\n') {
                let insert_at = last_import + line_break + 1;
                return format!(
                    "{}{}\n{}",
                    &content[..insert_at],
                    snippet,
                    &content[insert_at..]
                );
            }
        }
    }

    format!("{}\n\n{}", content, snippet)
}
