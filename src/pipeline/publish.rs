//! Article sinks: where finished articles go.
//!
//! The segmenter hands each article over the moment it closes, so a sink
//! sees articles in page order and a later fatal error never retracts one
//! already published. Posting to a CMS is a host concern; this module ships
//! an in-memory collector, a JSON-lines writer and a no-op sink.

use crate::error::IssueError;
use crate::output::Article;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Receives articles as they are emitted.
pub trait ArticleSink: Send {
    fn publish(&mut self, article: &Article) -> Result<(), IssueError>;

    /// Called once after the last article.
    fn finish(&mut self) -> Result<(), IssueError> {
        Ok(())
    }
}

impl ArticleSink for Vec<Article> {
    fn publish(&mut self, article: &Article) -> Result<(), IssueError> {
        self.push(article.clone());
        Ok(())
    }
}

/// Drops every article; the run's [`crate::IssueOutput`] still lists them.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl ArticleSink for DiscardSink {
    fn publish(&mut self, _article: &Article) -> Result<(), IssueError> {
        Ok(())
    }
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W: Write + Send> {
    writer: BufWriter<W>,
    written: usize,
}

impl JsonLinesSink<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, IssueError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| IssueError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            written: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> Result<W, IssueError> {
        self.writer
            .into_inner()
            .map_err(|e| IssueError::Internal(format!("flushing article sink: {}", e.error())))
    }
}

impl<W: Write + Send> ArticleSink for JsonLinesSink<W> {
    fn publish(&mut self, article: &Article) -> Result<(), IssueError> {
        let failed = |detail: String| IssueError::Publish {
            title: article.title.clone(),
            detail,
        };
        let line = serde_json::to_string(article).map_err(|e| failed(e.to_string()))?;
        writeln!(self.writer, "{}", line).map_err(|e| failed(e.to_string()))?;
        self.written += 1;
        debug!("Wrote article '{}' ({} so far)", article.title, self.written);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), IssueError> {
        self.writer
            .flush()
            .map_err(|e| IssueError::Internal(format!("flushing article sink: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Termination;

    fn article(title: &str) -> Article {
        Article {
            title: title.into(),
            body: "Text.".into(),
            category: "kultur".into(),
            image_id: Some("img".into()),
            image_html: String::new(),
            first_page: 2,
            last_page: 2,
            termination: Termination::Complete,
        }
    }

    #[test]
    fn vec_collects() {
        let mut sink: Vec<Article> = Vec::new();
        sink.publish(&article("a")).unwrap();
        sink.publish(&article("b")).unwrap();
        assert_eq!(sink.iter().map(|a| a.title.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn json_lines_one_object_per_line() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.publish(&article("Erster")).unwrap();
        sink.publish(&article("Zweiter")).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.written(), 2);

        let bytes = sink.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Article = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.title, "Erster");
    }

    #[test]
    fn json_lines_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.jsonl");
        let mut sink = JsonLinesSink::create(&path).unwrap();
        sink.publish(&article("Datei")).unwrap();
        sink.finish().unwrap();
        drop(sink);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"title\":\"Datei\""));
    }
}
