//! Import extraction from Go source files.
//!
//! The walker only needs the import declarations, so this is a line scanner
//! rather than a full parser: it strips comments, follows `import ( ... )`
//! blocks, and stops at the first top-level declaration (imports must
//! precede them).

use regex::Regex;

pub struct ImportParser {
    single: Regex,
    grouped: Regex,
}

impl ImportParser {
    pub fn new() -> Self {
        Self {
            // import "path", with an optional alias, `_` or `.`
            single: Regex::new(r#"^import\s+(?:\.|_|[A-Za-z_][A-Za-z0-9_]*)?\s*"([^"]+)""#)
                .unwrap(),
            // one entry inside an import block
            grouped: Regex::new(r#"^(?:\.|_|[A-Za-z_][A-Za-z0-9_]*)?\s*"([^"]+)""#).unwrap(),
        }
    }

    /// Collect every import path declared in one source file.
    pub fn parse(&self, source: &str) -> Vec<String> {
        let source = strip_block_comments(source);
        let mut imports = Vec::new();
        let mut in_block = false;

        for raw in source.lines() {
            let line = strip_line_comment(raw).trim().to_string();
            if line.is_empty() {
                continue;
            }
            if in_block {
                if line.starts_with(')') {
                    in_block = false;
                } else if let Some(caps) = self.grouped.captures(&line) {
                    imports.push(caps[1].to_string());
                }
                continue;
            }
            if line == "import (" || (line.starts_with("import") && line.ends_with('(')) {
                in_block = true;
                continue;
            }
            if let Some(caps) = self.single.captures(&line) {
                imports.push(caps[1].to_string());
                continue;
            }
            if line.starts_with("func ")
                || line.starts_with("type ")
                || line.starts_with("var ")
                || line.starts_with("const ")
            {
                break;
            }
        }
        imports
    }
}

impl Default for ImportParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop a trailing `//` comment, ignoring slashes inside string literals.
fn strip_line_comment(line: &str) -> &str {
    let mut in_string = false;
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => in_string = !in_string,
            b'\\' if in_string => i += 1,
            b'/' if !in_string && i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                return &line[..i];
            }
            _ => {}
        }
        i += 1;
    }
    line
}

/// Blank out `/* ... */` comments, keeping newlines so line structure
/// survives.
fn strip_block_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("*/") {
            Some(end) => {
                for c in after[..end].chars() {
                    if c == '\n' {
                        out.push('\n');
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
