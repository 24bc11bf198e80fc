//! Generated summary headers at the top of source files.
//!
//! A header is a comment block whose first line is [`SUMMARY_MARKER`]. It is
//! regenerated in place: the previous marked block is stripped before a new
//! one is prepended. Only the leading comment region of a file is searched;
//! the first line of code ends the search.

/// First line of every generated summary header.
pub const SUMMARY_MARKER: &str = "docloop file summary";

const DOCSTRING_QUOTES: &str = "\"\"\"";

/// Comment syntax used for a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStyle {
    /// Python module docstring.
    Docstring,
    /// Rust inner doc comment (`//!`).
    InnerDoc,
}

impl HeaderStyle {
    pub fn for_extension(ext: &str) -> Option<Self> {
        match ext {
            "py" => Some(Self::Docstring),
            "rs" => Some(Self::InnerDoc),
            _ => None,
        }
    }
}

/// Comment block carrying `body` under the summary marker.
pub fn render_summary_header(style: HeaderStyle, body: &str) -> Vec<String> {
    let body: Vec<&str> = body.trim().lines().map(str::trim_end).collect();
    match style {
        HeaderStyle::Docstring => {
            let mut out = vec![DOCSTRING_QUOTES.to_string(), SUMMARY_MARKER.to_string()];
            if !body.is_empty() {
                out.push(String::new());
            }
            out.extend(body.iter().map(|line| line.replace(DOCSTRING_QUOTES, "'''")));
            out.push(DOCSTRING_QUOTES.to_string());
            out
        }
        HeaderStyle::InnerDoc => {
            let mut out = vec![format!("//! {SUMMARY_MARKER}")];
            if !body.is_empty() {
                out.push("//!".to_string());
            }
            out.extend(body.iter().map(|line| {
                if line.is_empty() {
                    "//!".to_string()
                } else {
                    format!("//! {line}")
                }
            }));
            out
        }
    }
}

/// `lines` without any marked summary header in the leading comment region.
///
/// One blank line directly after a removed header is removed with it. Other
/// comments, docstrings and everything from the first line of code onward are
/// kept verbatim. An unterminated docstring is never treated as a header.
pub fn strip_summary_header(lines: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let trimmed = lines[i].trim();
        let end = if trimmed.starts_with("//!") {
            lines[i..]
                .iter()
                .position(|line| !line.trim().starts_with("//!"))
                .map_or(lines.len(), |offset| i + offset)
        } else if let Some(rest) = trimmed.strip_prefix(DOCSTRING_QUOTES) {
            if rest.contains(DOCSTRING_QUOTES) {
                i + 1
            } else {
                match lines[i + 1..]
                    .iter()
                    .position(|line| line.contains(DOCSTRING_QUOTES))
                {
                    Some(offset) => i + offset + 2,
                    None => break,
                }
            }
        } else if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
            out.push(lines[i].clone());
            i += 1;
            continue;
        } else {
            break;
        };

        let block = &lines[i..end];
        if block.iter().any(|line| line.contains(SUMMARY_MARKER)) {
            i = end;
            if lines.get(i).is_some_and(|line| line.trim().is_empty()) {
                i += 1;
            }
        } else {
            out.extend_from_slice(block);
            i = end;
        }
    }
    out.extend_from_slice(&lines[i..]);
    out
}

/// Reply text without a surrounding Markdown code fence.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (`python`, `rust`, ...) on the opening line.
    match body.split_once('\n') {
        Some((_, inner)) => inner.trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn strips_marked_docstring_before_imports() {
        let src = lines(&format!(
            "\"\"\"\n{SUMMARY_MARKER}\n\nLoads files.\n\"\"\"\n\nimport os\n\ndef load():\n    pass"
        ));
        assert_eq!(
            strip_summary_header(&src),
            lines("import os\n\ndef load():\n    pass")
        );
    }

    #[test]
    fn strips_single_line_marked_docstring() {
        let src = lines(&format!("\"\"\"{SUMMARY_MARKER}: loader\"\"\"\nimport os"));
        assert_eq!(strip_summary_header(&src), lines("import os"));
    }

    #[test]
    fn keeps_unmarked_docstrings_and_shebang() {
        let src = lines("#!/usr/bin/env python\n\"\"\"\nHand-written module docs.\n\"\"\"\nimport os");
        assert_eq!(strip_summary_header(&src), src);
    }

    #[test]
    fn strips_only_the_marked_block_among_several() {
        let src = lines(&format!(
            "\"\"\"\n{SUMMARY_MARKER}\nold\n\"\"\"\n\n\"\"\"Hand-written.\"\"\"\nimport os"
        ));
        assert_eq!(
            strip_summary_header(&src),
            lines("\"\"\"Hand-written.\"\"\"\nimport os")
        );
    }

    #[test]
    fn marker_below_first_code_line_is_untouched() {
        let src = lines(&format!("import os\n\"\"\"\n{SUMMARY_MARKER}\n\"\"\""));
        assert_eq!(strip_summary_header(&src), src);
    }

    #[test]
    fn unterminated_docstring_is_kept() {
        let src = lines(&format!("\"\"\"\n{SUMMARY_MARKER}\nnever closed"));
        assert_eq!(strip_summary_header(&src), src);
    }

    #[test]
    fn strips_marked_inner_doc_run() {
        let src = lines(&format!(
            "//! {SUMMARY_MARKER}\n//!\n//! Old text.\n\n//! Crate docs.\n\nuse std::fs;"
        ));
        assert_eq!(
            strip_summary_header(&src),
            lines("//! Crate docs.\n\nuse std::fs;")
        );
    }

    /// Regenerating a header replaces the previous one instead of stacking.
    #[test]
    fn regenerated_header_replaces_previous_one() {
        let original = lines("import os\n\nx = 1");
        let mut first = render_summary_header(HeaderStyle::Docstring, "First summary.");
        first.push(String::new());
        first.extend(strip_summary_header(&original));

        let mut second = render_summary_header(HeaderStyle::Docstring, "Second summary.");
        second.push(String::new());
        second.extend(strip_summary_header(&first));

        assert_eq!(second.iter().filter(|l| l.contains(SUMMARY_MARKER)).count(), 1);
        assert!(!second.iter().any(|l| l.contains("First summary.")));
        assert!(second.ends_with(&original));
    }

    #[test]
    fn renders_inner_doc_header() {
        assert_eq!(
            render_summary_header(HeaderStyle::InnerDoc, "Purpose.\n\nDetails."),
            vec![
                format!("//! {SUMMARY_MARKER}"),
                "//!".to_string(),
                "//! Purpose.".to_string(),
                "//!".to_string(),
                "//! Details.".to_string(),
            ]
        );
    }

    #[test]
    fn docstring_body_cannot_close_the_block() {
        let header = render_summary_header(HeaderStyle::Docstring, "Uses \"\"\"quotes\"\"\".");
        assert_eq!(header.iter().filter(|l| l.contains(DOCSTRING_QUOTES)).count(), 2);
    }

    #[test]
    fn code_fence_is_removed() {
        assert_eq!(strip_code_fence("```python\nLoads files.\n```"), "Loads files.");
        assert_eq!(strip_code_fence("  plain text \n"), "plain text");
        assert_eq!(strip_code_fence("```unclosed"), "```unclosed");
    }
}
