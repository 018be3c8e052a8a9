use chrono::{DateTime, Utc};

use crate::proto::{ListUpcomingAvailablePassesResponse, Pass};

/// A closed UTC interval `[start, stop]` used to narrow a pass listing by AOS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, stop: DateTime<Utc>) -> Result<Self, WindowError> {
        if stop < start {
            return Err(WindowError::Inverted { start, stop });
        }
        Ok(Self { start, stop })
    }

    /// Window starting at `start` and lasting `days` days.
    pub fn days_from(start: DateTime<Utc>, days: i64) -> Result<Self, WindowError> {
        Self::new(start, start + chrono::Duration::days(days))
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn stop(&self) -> DateTime<Utc> {
        self.stop
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.stop
    }

    /// Passes without an AOS time never match.
    pub fn contains_aos(&self, pass: &Pass) -> bool {
        pass.aos_time
            .as_ref()
            .and_then(|ts| DateTime::from_timestamp(ts.seconds, ts.nanos.max(0) as u32))
            .is_some_and(|aos| self.contains(aos))
    }

    pub fn filter(
        &self,
        response: ListUpcomingAvailablePassesResponse,
    ) -> ListUpcomingAvailablePassesResponse {
        ListUpcomingAvailablePassesResponse {
            pass: response
                .pass
                .into_iter()
                .filter(|p| self.contains_aos(p))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    Inverted {
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    },
}

impl std::fmt::Display for WindowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowError::Inverted { start, stop } => write!(
                f,
                "time window stop {} is before start {}",
                stop.to_rfc3339(),
                start.to_rfc3339()
            ),
        }
    }
}

impl std::error::Error for WindowError {}
