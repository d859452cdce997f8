//! arXiv Atom API search backend.

use super::{SearchBackend, SearchHit};
use crate::errors::BackendError;
use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;

/// Public arXiv query endpoint.
pub const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

/// Search backend over the arXiv Atom API.
#[derive(Debug, Clone)]
pub struct ArxivSearchBackend {
    http: Client,
    base: String,
}

impl ArxivSearchBackend {
    /// Creates a backend against the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, BackendError> {
        Self::with_base(ARXIV_API_URL, Duration::from_secs(15))
    }

    /// Creates a backend against a custom endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_base(base: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let http = Client::builder()
            .user_agent(concat!("paperflow/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base: base.into(),
        })
    }
}

#[async_trait]
impl SearchBackend for ArxivSearchBackend {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, BackendError> {
        let search_query = format!("all:{}", query.trim());
        let resp = self
            .http
            .get(&self.base)
            .query(&[("search_query", search_query.as_str())])
            .query(&[("max_results", limit)])
            .header(ACCEPT, "application/atom+xml, application/xml;q=0.9")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::search(format!("arXiv API error: HTTP {status}")));
        }

        let text = resp.text().await?;
        let hits = parse_atom_feed(&text)?;
        tracing::debug!(query, limit, hits = hits.len(), "arXiv search completed");
        Ok(hits)
    }
}

#[derive(Default)]
struct EntryBuilder {
    id: String,
    title: String,
    summary: String,
    pdf: Option<String>,
}

impl EntryBuilder {
    fn take_link(&mut self, e: &BytesStart<'_>) {
        let mut href = None;
        let mut is_pdf = false;
        for attr in e.attributes().flatten() {
            let value = String::from_utf8_lossy(&attr.value).to_string();
            match attr.key.as_ref() {
                b"href" => href = Some(value),
                b"type" if value.contains("pdf") => is_pdf = true,
                b"title" if value.eq_ignore_ascii_case("pdf") => is_pdf = true,
                _ => {}
            }
        }
        if is_pdf && self.pdf.is_none() {
            self.pdf = href;
        }
    }

    fn finish(self) -> SearchHit {
        let link = self.pdf.unwrap_or_else(|| self.id.clone());
        SearchHit {
            title: collapse_whitespace(&self.title),
            summary: collapse_whitespace(&self.summary),
            id: self.id.trim().to_string(),
            link,
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn local_name(raw: &[u8]) -> &[u8] {
    match raw.iter().position(|b| *b == b':') {
        Some(ix) => &raw[ix + 1..],
        None => raw,
    }
}

#[derive(Clone, Copy)]
enum TextTarget {
    Id,
    Title,
    Summary,
}

/// Parses an Atom feed into hits, in feed order.
pub(crate) fn parse_atom_feed(xml: &str) -> Result<Vec<SearchHit>, BackendError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut hits = Vec::new();

    let mut entry: Option<EntryBuilder> = None;
    let mut target: Option<TextTarget> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let in_entry = entry.is_some();
                target = None;
                match local_name(e.name().as_ref()) {
                    b"entry" => entry = Some(EntryBuilder::default()),
                    b"id" if in_entry => target = Some(TextTarget::Id),
                    b"title" if in_entry => target = Some(TextTarget::Title),
                    b"summary" if in_entry => target = Some(TextTarget::Summary),
                    b"link" => {
                        if let Some(current) = entry.as_mut() {
                            current.take_link(&e);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(current) = entry.as_mut() {
                    if local_name(e.name().as_ref()) == b"link" {
                        current.take_link(&e);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(tag), Some(current)) = (target, entry.as_mut()) {
                    let text = t
                        .unescape()
                        .map_err(|e| BackendError::Parse(format!("XML text error: {e}")))?;
                    let field = match tag {
                        TextTarget::Id => &mut current.id,
                        TextTarget::Title => &mut current.title,
                        TextTarget::Summary => &mut current.summary,
                    };
                    field.push_str(&text);
                }
            }
            Ok(Event::End(e)) => {
                target = None;
                if local_name(e.name().as_ref()) == b"entry" {
                    if let Some(done) = entry.take() {
                        hits.push(done.finish());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(BackendError::Parse(format!("XML parse error: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query</title>
  <entry>
    <id>http://arxiv.org/abs/2501.01234v1</id>
    <title>Graph Neural Networks
      for Molecules</title>
    <summary>We study graph neural networks &amp; molecules.</summary>
    <author><name>Doe, J.</name></author>
    <link rel="alternate" type="text/html" href="https://arxiv.org/abs/2501.01234v1"/>
    <link title="pdf" href="https://arxiv.org/pdf/2501.01234v1" rel="related" type="application/pdf"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2502.00001v2</id>
    <title>No PDF Here</title>
    <summary>Summary two.</summary>
  </entry>
</feed>
"#;

    #[test]
    fn test_parse_feed() {
        let hits = parse_atom_feed(SAMPLE).unwrap();
        assert_eq!(hits.len(), 2);

        assert_eq!(hits[0].title, "Graph Neural Networks for Molecules");
        assert_eq!(hits[0].summary, "We study graph neural networks & molecules.");
        assert_eq!(hits[0].id, "http://arxiv.org/abs/2501.01234v1");
        assert_eq!(hits[0].link, "https://arxiv.org/pdf/2501.01234v1");

        assert_eq!(hits[1].link, "http://arxiv.org/abs/2502.00001v2");
    }

    #[test]
    fn test_feed_title_is_not_an_entry() {
        let hits = parse_atom_feed(r#"<feed><title>Only a feed</title></feed>"#).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_malformed_feed() {
        let err = parse_atom_feed("<feed><entry><title>x</entry></feed>").unwrap_err();
        assert!(matches!(err, BackendError::Parse(_)));
    }
}
