//! Simulated time for a single instance
//!
//! Trace submit times are absolute ("real") seconds. An instance maps them
//! onto its own virtual clock, which starts at `virtual_start` when the
//! first job of the trace (`real_start`) is submitted.
//!
//! The clock only moves forward: every event an instance processes happens
//! at or after the previous one.

use serde::{Deserialize, Serialize};

/// Virtual clock plus the mapping from trace time to virtual time
///
/// # Example
/// ```
/// use metasim_core_rs::TimeManager;
///
/// let mut time = TimeManager::new(1_000, 0);
/// assert_eq!(time.to_virtual(1_010), 10.0);
///
/// time.advance_to(10.0);
/// assert_eq!(time.now(), 10.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeManager {
    /// Trace time that corresponds to `virtual_start`
    real_start: i64,
    /// Virtual time of the first submission
    virtual_start: i64,
    /// Current virtual time
    now: f64,
}

impl TimeManager {
    /// Create a clock whose origin maps `real_start` to `virtual_start`
    pub fn new(real_start: i64, virtual_start: i64) -> Self {
        Self {
            real_start,
            virtual_start,
            now: virtual_start as f64,
        }
    }

    /// Re-anchor the trace-to-virtual mapping
    ///
    /// The current time is clamped so it never moves backwards.
    pub fn set_origin(&mut self, real_start: i64, virtual_start: i64) {
        self.real_start = real_start;
        self.virtual_start = virtual_start;
        self.now = self.now.max(virtual_start as f64);
    }

    /// Convert a raw trace submit time to virtual time
    ///
    /// Computed in `i128`, so any pair of `i64` trace times maps without
    /// overflow.
    pub fn to_virtual(&self, raw_submit: i64) -> f64 {
        (i128::from(raw_submit) - i128::from(self.real_start) + i128::from(self.virtual_start))
            as f64
    }

    /// Move the clock to `t`; earlier times leave the clock where it is
    ///
    /// # Example
    /// ```
    /// use metasim_core_rs::TimeManager;
    ///
    /// let mut time = TimeManager::new(0, 0);
    /// time.advance_to(50.0);
    /// time.advance_to(20.0);
    /// assert_eq!(time.now(), 50.0);
    /// ```
    pub fn advance_to(&mut self, t: f64) {
        if t > self.now {
            self.now = t;
        }
    }

    /// Current virtual time
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn real_start(&self) -> i64 {
        self.real_start
    }

    pub fn virtual_start(&self) -> i64 {
        self.virtual_start
    }
}
