//! Standard Workload Format reader
//!
//! One job per line, 18 whitespace-separated integer fields. Lines starting
//! with `;` (header comments) and blank lines are ignored.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::job::SWF_FIELD_COUNT;
use crate::models::{SwfRecord, TraceJob};
use crate::orchestrator::SimulationError;

/// Raw bytes of a trace file plus their SHA-256 fingerprint
#[derive(Debug, Clone)]
pub struct TraceSource {
    pub path: PathBuf,
    pub fingerprint: String,
    bytes: Vec<u8>,
}

impl TraceSource {
    pub fn read(path: &Path) -> Result<Self, SimulationError> {
        let bytes = fs::read(path).map_err(|source| SimulationError::TraceIo {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            fingerprint: fingerprint(&bytes),
            bytes,
        })
    }
}

/// Hex SHA-256 of `bytes`
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Normalized job stream of one trace
#[derive(Debug, Clone)]
pub struct ParsedTrace {
    pub source: PathBuf,
    pub fingerprint: String,
    pub jobs: Vec<TraceJob>,
}

impl ParsedTrace {
    /// Raw submit time of the first job, or 0 for an empty trace
    pub fn first_submit(&self) -> i64 {
        self.jobs.first().map_or(0, |j| j.submit)
    }
}

/// Parse a trace into normalized jobs
pub fn parse(source: &TraceSource) -> Result<ParsedTrace, SimulationError> {
    let text = String::from_utf8_lossy(&source.bytes);
    let mut jobs = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let Some(record) = parse_line(line).map_err(|reason| SimulationError::TraceParse {
            path: source.path.clone(),
            line: line_no + 1,
            reason,
        })?
        else {
            continue;
        };
        jobs.push(TraceJob::from_record(jobs.len(), &record));
    }
    Ok(ParsedTrace {
        source: source.path.clone(),
        fingerprint: source.fingerprint.clone(),
        jobs,
    })
}

/// Parse one line; `Ok(None)` for comments and blank lines
///
/// ```
/// use metasim_core_rs::trace::swf::parse_line;
///
/// assert!(parse_line("; Version: 2.2").unwrap().is_none());
/// let record = parse_line("1 0 5 10 4 -1 -1 4 20 -1 1 1 1 -1 1 -1 -1 -1")
///     .unwrap()
///     .unwrap();
/// assert_eq!(record.run, 10);
/// ```
pub fn parse_line(line: &str) -> Result<Option<SwfRecord>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(';') {
        return Ok(None);
    }

    let mut fields = [0i64; SWF_FIELD_COUNT];
    let mut count = 0;
    for token in line.split_whitespace() {
        if count == SWF_FIELD_COUNT {
            return Err(format!("more than {SWF_FIELD_COUNT} fields"));
        }
        fields[count] = parse_field(token)?;
        count += 1;
    }
    if count != SWF_FIELD_COUNT {
        return Err(format!("expected {SWF_FIELD_COUNT} fields, found {count}"));
    }
    Ok(Some(SwfRecord::from_fields(fields)))
}

/// Integer field; some archives write averages with a fractional part, which
/// is truncated. Non-finite or out-of-range values are errors.
fn parse_field(token: &str) -> Result<i64, String> {
    if let Ok(v) = token.parse::<i64>() {
        return Ok(v);
    }
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() && v.abs() < 9.2e18 => Ok(v as i64),
        Ok(_) => Err(format!("field '{token}' is out of range")),
        Err(_) => Err(format!("field '{token}' is not numeric")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fractional_field_truncates() {
        let record = parse_line("1 0 5 10 4 12.75 -1 4 20 -1 1 1 1 -1 1 -1 -1 -1")
            .unwrap()
            .unwrap();
        assert_eq!(record.used_avg_cpu, 12);
    }

    #[test]
    fn test_non_finite_fields_are_errors() {
        for bad in ["nan", "inf", "-inf", "1e30"] {
            let line = format!("1 {bad} 5 10 4 -1 -1 4 20 -1 1 1 1 -1 1 -1 -1 -1");
            let err = parse_line(&line).unwrap_err();
            assert_eq!(err, format!("field '{bad}' is out of range"));
        }
    }

    #[test]
    fn test_wrong_field_count_is_error() {
        let err = parse_line("1 2 3").unwrap_err();
        assert_eq!(err, "expected 18 fields, found 3");
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        assert_ne!(fingerprint(b"1 0 0"), fingerprint(b"1 0 1"));
        assert_eq!(fingerprint(b"abc"), fingerprint(b"abc"));
    }
}
