#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session holder for recorded traces.
//!
//! The [`TraceStore`] owns the one authoritative [`SessionRecord`] the rest
//! of the engine reads. Loading replaces the session wholesale: a successful
//! load installs the freshly parsed session atomically, while any failure
//! leaves the previously loaded session untouched and authoritative. There
//! is no partial mutation path.

use std::{
    fs,
    path::{Path, PathBuf},
};

use gem_replay_core::{RoundRecord, SessionRecord};
use thiserror::Error;

/// Errors surfaced when loading a trace document.
///
/// These are the only user-visible failures in the engine; everything past
/// the ingestion boundary degrades silently per the replay contract.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The trace file could not be read.
    #[error("failed to read trace file {path}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The document is not valid JSON or does not describe a session.
    #[error("trace document is not a valid session: {0}")]
    Parse(#[from] serde_json::Error),
    /// The document is a list with no elements to take the session from.
    #[error("trace document is an empty list")]
    EmptyDocument,
    /// A reload was requested before any trace was loaded.
    #[error("no trace has been loaded yet")]
    NothingLoaded,
}

/// Owns the currently loaded session and the path it came from.
#[derive(Debug, Default)]
pub struct TraceStore {
    session: Option<SessionRecord>,
    source: Option<PathBuf>,
}

impl TraceStore {
    /// Creates a store with no session loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a trace document from disk, replacing the held session.
    ///
    /// On failure the previously loaded session (if any) remains
    /// authoritative and the stored source path is unchanged.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<&SessionRecord, TraceError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let session = parse_document(&text)?;

        self.session = Some(session);
        self.source = Some(path.to_path_buf());
        Ok(self.session.as_ref().expect("session installed above"))
    }

    /// Re-reads the most recently loaded path.
    pub fn reload(&mut self) -> Result<&SessionRecord, TraceError> {
        let path = self.source.clone().ok_or(TraceError::NothingLoaded)?;
        self.load(path)
    }

    /// Parses a trace document from an in-memory string, replacing the held
    /// session. The stored source path is cleared since the session no
    /// longer corresponds to a file.
    pub fn load_str(&mut self, text: &str) -> Result<&SessionRecord, TraceError> {
        let session = parse_document(text)?;
        self.session = Some(session);
        self.source = None;
        Ok(self.session.as_ref().expect("session installed above"))
    }

    /// The currently loaded session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&SessionRecord> {
        self.session.as_ref()
    }

    /// Path the current session was loaded from, when it came from disk.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Number of rounds in the loaded session, zero when nothing is loaded.
    #[must_use]
    pub fn round_count(&self) -> usize {
        self.session.as_ref().map_or(0, |session| session.rounds.len())
    }

    /// The round at the given index, when it exists.
    #[must_use]
    pub fn round(&self, index: usize) -> Option<&RoundRecord> {
        self.session.as_ref()?.rounds.get(index)
    }

    /// Display labels for every round, in play order.
    #[must_use]
    pub fn round_labels(&self) -> Vec<String> {
        (0..self.round_count())
            .map(|index| format!("Round {}", index + 1))
            .collect()
    }
}

/// Parses a trace document that is either a session object or a list whose
/// first element is the session. All other list elements are ignored.
fn parse_document(text: &str) -> Result<SessionRecord, TraceError> {
    let document: serde_json::Value = serde_json::from_str(text)?;
    let session_value = match document {
        serde_json::Value::Array(values) => values
            .into_iter()
            .next()
            .ok_or(TraceError::EmptyDocument)?,
        other => other,
    };

    serde_json::from_value(session_value).map_err(TraceError::Parse)
}

#[cfg(test)]
mod tests {
    use super::{parse_document, TraceError};

    #[test]
    fn document_may_be_a_bare_session_object() {
        let session = parse_document(r#"{"total_score": 40}"#).expect("object form");
        assert_eq!(session.total_score, 40);
    }

    #[test]
    fn document_list_takes_first_element_and_ignores_the_rest() {
        let session = parse_document(r#"[{"total_score": 7}, {"total_score": 99}, "junk"]"#)
            .expect("list form");
        assert_eq!(session.total_score, 7);
    }

    #[test]
    fn empty_list_is_rejected() {
        assert!(matches!(
            parse_document("[]"),
            Err(TraceError::EmptyDocument)
        ));
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        assert!(matches!(
            parse_document("{definitely not json"),
            Err(TraceError::Parse(_))
        ));
    }
}
