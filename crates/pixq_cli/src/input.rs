//! Input acquisition: files, standard input and URLs become input blobs.
//!
//! A source that cannot be read is reported and skipped; it never becomes a
//! record.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use futures_util::future::join_all;
use pixq_core::models::InputBlob;
use reqwest::{Client, Url};
use tokio::io::AsyncReadExt;

use crate::cli::{CliError, CliResult};

const STDIN_MARKER: &str = "-";
const STDIN_NAME: &str = "stdin";
const URL_FALLBACK_NAME: &str = "download";
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Where one input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InputSource {
    File(PathBuf),
    Stdin,
    Url(Url),
}

impl InputSource {
    /// Human-readable origin, for error reports.
    pub(crate) fn label(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Stdin => "<stdin>".to_string(),
            Self::Url(url) => url.to_string(),
        }
    }
}

/// Blobs that were read, plus the sources that failed and why.
#[derive(Debug, Default)]
pub(crate) struct Acquired {
    pub(crate) blobs: Vec<InputBlob>,
    pub(crate) failures: Vec<(String, String)>,
}

/// Classify positional inputs and `--url` values, keeping their order.
pub(crate) fn collect_sources(inputs: &[String], urls: &[Url]) -> CliResult<Vec<InputSource>> {
    let mut sources = Vec::with_capacity(inputs.len() + urls.len());
    for input in inputs {
        let source = if input == STDIN_MARKER {
            InputSource::Stdin
        } else if input.starts_with("http://") || input.starts_with("https://") {
            let url = Url::parse(input)
                .map_err(|err| CliError::validation(format!("invalid URL '{input}': {err}")))?;
            InputSource::Url(url)
        } else {
            InputSource::File(PathBuf::from(input))
        };
        sources.push(source);
    }
    sources.extend(urls.iter().cloned().map(InputSource::Url));

    if sources.is_empty() {
        return Err(CliError::validation("no inputs given"));
    }
    if sources.iter().filter(|s| **s == InputSource::Stdin).count() > 1 {
        return Err(CliError::validation("standard input can only be used once"));
    }
    Ok(sources)
}

pub(crate) fn http_client() -> CliResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(concat!("pixq/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))
}

/// Read every source. Results keep the order of `sources`.
pub(crate) async fn acquire(sources: &[InputSource], client: &Client) -> Acquired {
    let results = join_all(sources.iter().map(|source| read_source(source, client))).await;

    let mut acquired = Acquired::default();
    for (source, result) in sources.iter().zip(results) {
        match result {
            Ok(blob) => {
                tracing::debug!("Read {} ({} bytes)", source.label(), blob.size());
                acquired.blobs.push(blob);
            }
            Err(err) => {
                tracing::warn!("Could not read {}: {:#}", source.label(), err);
                acquired.failures.push((source.label(), format!("{err:#}")));
            }
        }
    }
    acquired
}

async fn read_source(source: &InputSource, client: &Client) -> anyhow::Result<InputBlob> {
    let (name, bytes) = match source {
        InputSource::File(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| anyhow!("{} is not a file path", path.display()))?;
            (name, bytes)
        }
        InputSource::Stdin => {
            let mut bytes = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut bytes)
                .await
                .context("failed to read standard input")?;
            (STDIN_NAME.to_string(), bytes)
        }
        InputSource::Url(url) => {
            let response = client
                .get(url.clone())
                .send()
                .await
                .with_context(|| format!("request to {url} failed"))?
                .error_for_status()?;
            let bytes = response.bytes().await.context("failed to read response body")?;
            (name_from_url(url), bytes.to_vec())
        }
    };

    if bytes.is_empty() {
        bail!("input is empty");
    }
    Ok(InputBlob::new(name, bytes))
}

/// Last non-empty path segment of a URL, or a fixed fallback.
pub(crate) fn name_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .unwrap_or_else(|| URL_FALLBACK_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn classifies_inputs_in_order() {
        let inputs = vec![
            "a.jpg".to_string(),
            "-".to_string(),
            "https://example.com/b.png".to_string(),
        ];
        let urls = vec![Url::parse("http://example.com/c.webp").unwrap()];

        let sources = collect_sources(&inputs, &urls).unwrap();
        assert_eq!(sources.len(), 4);
        assert_eq!(sources[0], InputSource::File(PathBuf::from("a.jpg")));
        assert_eq!(sources[1], InputSource::Stdin);
        assert!(matches!(&sources[2], InputSource::Url(u) if u.path() == "/b.png"));
        assert!(matches!(&sources[3], InputSource::Url(u) if u.path() == "/c.webp"));
    }

    #[test]
    fn rejects_empty_and_repeated_stdin() {
        assert!(collect_sources(&[], &[]).is_err());
        let inputs = vec!["-".to_string(), "-".to_string()];
        assert!(collect_sources(&inputs, &[]).is_err());
    }

    #[test]
    fn url_names_use_last_segment() {
        let url = Url::parse("https://example.com/photos/cat.jpg?size=large").unwrap();
        assert_eq!(name_from_url(&url), "cat.jpg");
        let url = Url::parse("https://example.com/photos/").unwrap();
        assert_eq!(name_from_url(&url), "photos");
        let url = Url::parse("https://example.com").unwrap();
        assert_eq!(name_from_url(&url), "download");
    }

    #[tokio::test]
    async fn unreadable_sources_are_reported_not_accepted() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.png");
        let empty = dir.path().join("empty.png");
        std::fs::write(&good, b"not really a png").unwrap();
        std::fs::write(&empty, b"").unwrap();

        let sources = vec![
            InputSource::File(good),
            InputSource::File(dir.path().join("missing.png")),
            InputSource::File(empty),
        ];
        let acquired = acquire(&sources, &http_client().unwrap()).await;

        assert_eq!(acquired.blobs.len(), 1);
        assert_eq!(acquired.blobs[0].name(), "good.png");
        assert_eq!(acquired.failures.len(), 2);
        assert!(acquired.failures[1].1.contains("empty"));
    }
}
