//! Web page loading. Pages are fetched with a per-request timeout and
//! reduced to plain text with a tag stripper that drops script/style
//! blocks entirely.

use std::time::Duration;

use crate::core::errors::LoadError;

use super::document::{Document, SourceRef};

pub struct WebLoader {
    client: reqwest::Client,
}

impl WebLoader {
    pub fn new(timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client }
    }

    /// Fetch one URL into a document.
    pub async fn fetch(&self, url: &str) -> Result<Document, LoadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LoadError::Web {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(LoadError::Web {
                url: url.to_string(),
                message: format!("http status {}", response.status()),
            });
        }

        let html = response.text().await.map_err(|e| LoadError::Web {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let text = strip_html(&html);
        if text.is_empty() {
            return Err(LoadError::Web {
                url: url.to_string(),
                message: "page contained no extractable text".to_string(),
            });
        }

        Ok(Document::new(text, SourceRef::url(url)))
    }

    /// Fetch every URL, failing on the first error. The caller decides
    /// whether losing the web sources is fatal.
    pub async fn fetch_all(&self, urls: &[String]) -> Result<Vec<Document>, LoadError> {
        let mut documents = Vec::with_capacity(urls.len());
        for url in urls {
            documents.push(self.fetch(url).await?);
        }
        Ok(documents)
    }
}

/// Reduce HTML to visible text: script/style blocks are removed wholesale,
/// remaining tags become line breaks, blank lines are collapsed. Tag
/// matching is ASCII case-insensitive against the original string, so
/// byte offsets always stay on character boundaries.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len() / 2);
    let mut i = 0;

    while i < html.len() {
        if html.as_bytes()[i] == b'<' {
            if let Some(skip) = skip_block(&html[i..], "<script", "</script>")
                .or_else(|| skip_block(&html[i..], "<style", "</style>"))
            {
                i += skip;
                continue;
            }

            match html[i..].find('>') {
                Some(end) => {
                    out.push('\n');
                    i += end + 1;
                }
                // Unterminated tag; nothing visible follows.
                None => break,
            }
            continue;
        }

        let next_tag = html[i..].find('<').map(|o| i + o).unwrap_or(html.len());
        out.push_str(&html[i..next_tag]);
        i = next_tag;
    }

    let lines: Vec<&str> = out
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    lines.join("\n")
}

/// If `rest` starts with `open` (ignoring ASCII case), return the byte
/// length up to and including the matching `close` tag, or the whole
/// rest when unclosed.
fn skip_block(rest: &str, open: &str, close: &str) -> Option<usize> {
    if !starts_with_ci(rest, open) {
        return None;
    }
    match find_ci(rest, close) {
        Some(pos) => Some(pos + close.len()),
        None => Some(rest.len()),
    }
}

fn starts_with_ci(haystack: &str, needle: &str) -> bool {
    haystack.len() >= needle.len()
        && haystack.as_bytes()[..needle.len()].eq_ignore_ascii_case(needle.as_bytes())
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < n.len() {
        return None;
    }
    (0..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_keeps_text() {
        let html = "<html><body><h1>Hello</h1><p>World</p></body></html>";
        let text = strip_html(html);
        assert!(text.contains("Hello"));
        assert!(text.contains("World"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn drops_script_and_style_contents() {
        let html = r#"
            <head>
              <script>var hidden = 1;</script>
              <style>.cls { color: red; }</style>
            </head>
            <body><p>Visible</p></body>
        "#;
        let text = strip_html(html);
        assert!(text.contains("Visible"));
        assert!(!text.contains("hidden"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn adjacent_tags_do_not_join_words() {
        let text = strip_html("<p>Hello</p><p>World</p>");
        assert_eq!(text, "Hello\nWorld");
    }

    #[test]
    fn unclosed_script_discards_remainder() {
        let text = strip_html("<p>ok</p><script>var x = 1;");
        assert_eq!(text, "ok");
    }
}
