//! Product document parsing and text extraction.

use copilot_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    Html,
    PlainText,
    Unsupported,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            Some("txt") => Self::PlainText,
            _ => Self::Unsupported,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::PlainText => "text",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// A parsed product document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub title: String,
    pub text: String,
}

/// Parse a product document and extract its title and clean text.
///
/// The title is the first markdown heading (or HTML `<title>`), falling
/// back to the file stem.
pub fn parse_file(path: &Path) -> AppResult<ParsedDocument> {
    let content_type = ContentType::from_path(path);
    if !content_type.is_supported() {
        return Err(AppError::Input(format!(
            "Unsupported document type: {:?}",
            path
        )));
    }

    tracing::debug!("Parsing {:?} as {}", path, content_type.as_str());

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Input(format!("Failed to read {:?}: {}", path, e)))?;

    let fallback_title = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let (title, text) = match content_type {
        ContentType::Markdown => (markdown_title(&raw), clean_markdown(&raw)),
        ContentType::Html => (html_title(&raw), clean_html(&raw)),
        _ => (None, raw.trim().to_string()),
    };

    Ok(ParsedDocument {
        title: title.unwrap_or(fallback_title),
        text,
    })
}

/// First heading of a markdown document.
fn markdown_title(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| line.starts_with('#'))
        .map(|line| line.trim_start_matches('#').trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Contents of the HTML `<title>` element.
fn html_title(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let open = lower.find("<title")?;
    let start = open + lower[open..].find('>')? + 1;
    let end = start + lower[start..].find("</title")?;
    let title = text.get(start..end)?.trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Clean markdown by removing excess formatting.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_start_matches('#').trim();

        // Horizontal rules and code fences carry no content
        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

/// Clean HTML by stripping tags, scripts and styles.
fn clean_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;

    for (i, ch) in text.char_indices() {
        if ch == '<' {
            in_tag = true;

            let rest = text[i..].as_bytes();
            let starts = |tag: &str| {
                rest.len() >= tag.len() && rest[..tag.len()].eq_ignore_ascii_case(tag.as_bytes())
            };

            if starts("<script") {
                in_script = true;
            } else if starts("</script") {
                in_script = false;
            } else if starts("<style") {
                in_style = true;
            } else if starts("</style") {
                in_style = false;
            }
        } else if ch == '>' {
            in_tag = false;
        } else if !in_tag && !in_script && !in_style {
            result.push(ch);
        }
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_type_detection() {
        assert_eq!(
            ContentType::from_path(Path::new("product_info_1.md")),
            ContentType::Markdown
        );
        assert_eq!(
            ContentType::from_path(Path::new("PAGE.HTML")),
            ContentType::Html
        );
        assert_eq!(
            ContentType::from_path(Path::new("notes.txt")),
            ContentType::PlainText
        );
        assert!(!ContentType::from_path(Path::new("image.png")).is_supported());
    }

    #[test]
    fn test_clean_markdown() {
        let input = "# Header\n\nSome text\n\n```rust\ncode\n```\n\nMore text";
        let output = clean_markdown(input);
        assert!(output.contains("Header"));
        assert!(output.contains("Some text"));
        assert!(output.contains("More text"));
        assert!(!output.contains("```"));
    }

    #[test]
    fn test_markdown_title() {
        let input = "Intro line\n\n## TrailMaster X4 Tent\n\nBrand: OutdoorLiving";
        assert_eq!(markdown_title(input).as_deref(), Some("TrailMaster X4 Tent"));
        assert_eq!(markdown_title("no heading"), None);
    }

    #[test]
    fn test_clean_html() {
        let input = "<html><head><style>p {}</style></head><body><p>Hello <b>world</b></p><SCRIPT>x()</SCRIPT></body></html>";
        let output = clean_html(input);
        assert_eq!(output, "Hello world");
    }

    #[test]
    fn test_html_title() {
        let input = "<html><head><TITLE> Alpine Explorer Tent </TITLE></head></html>";
        assert_eq!(html_title(input).as_deref(), Some("Alpine Explorer Tent"));
    }

    #[test]
    fn test_parse_file_falls_back_to_stem() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("product_info_3.txt");
        std::fs::write(&path, "  Summit Breeze Jacket, lightweight  ").unwrap();

        let doc = parse_file(&path).unwrap();
        assert_eq!(doc.title, "product_info_3");
        assert_eq!(doc.text, "Summit Breeze Jacket, lightweight");
    }

    #[test]
    fn test_parse_unsupported_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("photo.jpg");
        std::fs::write(&path, "binary").unwrap();

        assert!(matches!(parse_file(&path), Err(AppError::Input(_))));
    }
}
