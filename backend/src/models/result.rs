//! Per-job result records
//!
//! One record is produced for every completed job, by live instances and by
//! rollout clones alike. The text form is a single ASCII line:
//!
//! ```text
//! id;reqProc;reqProc2;walltime;run;wait;submit;start;end
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const FIELD_COUNT: usize = 9;

/// Error parsing a result line
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResultParseError {
    #[error("expected {FIELD_COUNT} fields, found {0}")]
    FieldCount(usize),

    #[error("field '{field}' is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },
}

/// Outcome of one completed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub id: i64,
    /// Processors requested
    pub req_proc: u32,
    /// Processors allocated
    pub req_proc2: u32,
    /// Scaled requested walltime
    pub walltime: f64,
    /// Scaled run time
    pub run: f64,
    pub wait: f64,
    pub submit: f64,
    pub start: f64,
    pub end: f64,
}

impl JobResult {
    /// Completion time minus submission time
    ///
    /// ```
    /// use metasim_core_rs::JobResult;
    ///
    /// let r: JobResult = "1;4;4;10;10;0;0;0;10".parse().unwrap();
    /// assert_eq!(r.turnaround(), 10.0);
    /// ```
    pub fn turnaround(&self) -> f64 {
        self.end - self.submit
    }

    /// The `;`-delimited text form
    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{};{};{};{};{};{}",
            self.id,
            self.req_proc,
            self.req_proc2,
            self.walltime,
            self.run,
            self.wait,
            self.submit,
            self.start,
            self.end
        )
    }
}

impl FromStr for JobResult {
    type Err = ResultParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = line.trim().split(';').collect();
        if parts.len() != FIELD_COUNT {
            return Err(ResultParseError::FieldCount(parts.len()));
        }

        fn num(field: &'static str, value: &str) -> Result<f64, ResultParseError> {
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| ResultParseError::NotNumeric {
                    field,
                    value: value.to_string(),
                })
        }

        Ok(Self {
            id: num("id", parts[0])? as i64,
            req_proc: num("reqProc", parts[1])? as u32,
            req_proc2: num("reqProc2", parts[2])? as u32,
            walltime: num("walltime", parts[3])?,
            run: num("run", parts[4])?,
            wait: num("wait", parts[5])?,
            submit: num("submit", parts[6])?,
            start: num("start", parts[7])?,
            end: num("end", parts[8])?,
        })
    }
}
