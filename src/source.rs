// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Replayed sample source: a JSON-lines reader resolved from a fixed
//! candidate-path search.

use crate::error::AgentError;
use crate::sample::Sample;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// A line that could not be used as a sample: either malformed JSON or a
/// field outside its documented domain. The source continues past it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceError {
    pub line_number: usize,
    pub reason: String,
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line_number, self.reason)
    }
}

impl From<SourceError> for AgentError {
    fn from(e: SourceError) -> Self {
        AgentError::Source(e.to_string())
    }
}

/// Search order for a VIN with no explicit `--source` override, rooted at
/// `base`.
fn candidate_paths(base: &Path, vin: &str) -> Vec<PathBuf> {
    vec![
        base.join("samples").join(format!("{vin}.jsonl")),
        base.join(format!("{vin}.jsonl")),
        base.join("samples").join("default.jsonl"),
    ]
}

/// Resolve the sample source path for `vin`: `explicit` if given, otherwise
/// the first candidate path under `base` that exists on disk.
pub fn resolve_source_path_under(base: &Path, vin: &str, explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    candidate_paths(base, vin).into_iter().find(|p| p.exists())
}

/// Resolve the sample source path for `vin` relative to the process's
/// current working directory.
pub fn resolve_source_path(vin: &str, explicit: Option<&Path>) -> Option<PathBuf> {
    resolve_source_path_under(Path::new("."), vin, explicit)
}

/// Sequential JSON-lines sample reader over a single file.
pub struct SampleSource {
    lines: Lines<BufReader<File>>,
    line_number: usize,
}

impl SampleSource {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            line_number: 0,
        })
    }

    /// Read and parse the next line. Returns `None` once the source is
    /// exhausted; a malformed or out-of-domain line yields `Some(Err(..))`
    /// for that line only, and the next call resumes at the following line.
    pub fn next_sample(&mut self) -> Option<Result<Sample, SourceError>> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    self.line_number += 1;
                    return Some(Err(SourceError {
                        line_number: self.line_number,
                        reason: format!("read error: {e}"),
                    }));
                }
            };
            self.line_number += 1;

            if line.trim().is_empty() {
                continue;
            }

            return Some(
                serde_json::from_str::<Sample>(&line)
                    .map_err(|e| SourceError {
                        line_number: self.line_number,
                        reason: format!("invalid JSON: {e}"),
                    })
                    .and_then(|sample| {
                        sample
                            .validate()
                            .map(|()| sample)
                            .map_err(|reason| SourceError {
                                line_number: self.line_number,
                                reason,
                            })
                    }),
            );
        }
    }
}

impl Iterator for SampleSource {
    type Item = Result<Sample, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_lines(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        path
    }

    #[test]
    fn reads_valid_samples_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(
            dir.path(),
            "a.jsonl",
            &[
                r#"{"timestamp":1,"speed":1.0,"power":1.0,"battery":50,"heading":1,"odometer":0.0}"#,
                r#"{"timestamp":2,"speed":2.0,"power":2.0,"battery":51,"heading":2,"odometer":0.1}"#,
            ],
        );

        let mut source = SampleSource::open(&path).unwrap();
        let first = source.next_sample().unwrap().unwrap();
        let second = source.next_sample().unwrap().unwrap();
        assert_eq!(first.timestamp, 1);
        assert_eq!(second.timestamp, 2);
        assert!(source.next_sample().is_none());
    }

    #[test]
    fn malformed_json_yields_an_error_but_does_not_stop_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(
            dir.path(),
            "b.jsonl",
            &[
                "not json at all",
                r#"{"timestamp":2,"speed":2.0,"power":2.0,"battery":51,"heading":2,"odometer":0.1}"#,
            ],
        );

        let mut source = SampleSource::open(&path).unwrap();
        assert!(source.next_sample().unwrap().is_err());
        let second = source.next_sample().unwrap().unwrap();
        assert_eq!(second.timestamp, 2);
    }

    #[test]
    fn out_of_domain_fields_yield_an_error_for_that_line_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(
            dir.path(),
            "c.jsonl",
            &[
                r#"{"timestamp":1,"speed":1.0,"power":1.0,"battery":200,"heading":1,"odometer":0.0}"#,
                r#"{"timestamp":2,"speed":2.0,"power":2.0,"battery":51,"heading":2,"odometer":0.1}"#,
            ],
        );

        let mut source = SampleSource::open(&path).unwrap();
        let err = source.next_sample().unwrap().unwrap_err();
        assert!(err.reason.contains("battery"));
        let second = source.next_sample().unwrap().unwrap();
        assert_eq!(second.timestamp, 2);
    }

    #[test]
    fn blank_lines_are_skipped_silently() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(
            dir.path(),
            "d.jsonl",
            &[
                "",
                r#"{"timestamp":1,"speed":1.0,"power":1.0,"battery":50,"heading":1,"odometer":0.0}"#,
                "",
            ],
        );

        let mut source = SampleSource::open(&path).unwrap();
        let only = source.next_sample().unwrap().unwrap();
        assert_eq!(only.timestamp, 1);
        assert!(source.next_sample().is_none());
    }

    #[test]
    fn source_error_converts_into_the_shared_error_taxonomy() {
        let err = SourceError {
            line_number: 3,
            reason: "invalid JSON: ...".to_string(),
        };
        let agent_err: AgentError = err.into();
        assert!(matches!(agent_err, AgentError::Source(_)));
    }

    #[test]
    fn explicit_override_wins_over_the_candidate_search() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = write_lines(dir.path(), "explicit.jsonl", &[]);
        let resolved = resolve_source_path("VIN123", Some(&explicit));
        assert_eq!(resolved, Some(explicit));
    }

    #[test]
    fn candidate_search_prefers_vin_specific_over_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("samples")).unwrap();
        write_lines(&dir.path().join("samples"), "default.jsonl", &[]);
        write_lines(&dir.path().join("samples"), "VIN123.jsonl", &[]);

        let resolved = resolve_source_path_under(dir.path(), "VIN123", None).unwrap();
        assert_eq!(
            resolved,
            dir.path().join("samples").join("VIN123.jsonl")
        );
    }
}
