use std::io::Write;

use tracing::{error, info};

use crate::client::{ClientError, PassLister};
use crate::config::Satellite;
use crate::window::TimeWindow;

/// Query upcoming passes for each satellite in order and print every listing
/// to `out`.
///
/// Calls are issued one at a time. The first failing satellite stops the run;
/// later satellites are not queried. Returns the number of satellites listed.
pub async fn list_all<L, W>(
    lister: &mut L,
    satellites: &[Satellite],
    window: Option<&TimeWindow>,
    out: &mut W,
) -> Result<usize, RunError>
where
    L: PassLister + Send,
    W: Write,
{
    for (listed, satellite) in satellites.iter().enumerate() {
        let satellite_id = satellite.wire_id();
        let response = match lister.list_upcoming_passes(&satellite_id).await {
            Ok(response) => response,
            Err(e) => {
                error!(satellite_id = %satellite_id, name = ?satellite.name, error = %e, "pass query failed");
                return Err(RunError::Query {
                    listed,
                    source: e,
                });
            }
        };

        let total = response.pass.len();
        let response = match window {
            Some(window) => window.filter(response),
            None => response,
        };
        info!(
            satellite_id = %satellite_id,
            name = ?satellite.name,
            passes = response.pass.len(),
            filtered_out = total - response.pass.len(),
            "listed upcoming passes"
        );

        writeln!(out, "== satellite {}", satellite)
            .and_then(|_| writeln!(out, "{:#?}", response))
            .map_err(RunError::Output)?;
    }

    Ok(satellites.len())
}

#[derive(Debug)]
pub enum RunError {
    /// Query for a satellite failed after `listed` satellites succeeded.
    Query { listed: usize, source: ClientError },
    Output(std::io::Error),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Query { listed, source } => {
                write!(f, "{} (after {} satellites listed)", source, listed)
            }
            RunError::Output(e) => write!(f, "failed to write pass listing: {}", e),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Query { source, .. } => Some(source),
            RunError::Output(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{ListUpcomingAvailablePassesResponse, Pass};

    /// Records every call and fails on the configured satellite ids.
    struct RecordingLister {
        calls: Vec<String>,
        fail_on: Vec<String>,
    }

    impl RecordingLister {
        fn new(fail_on: &[&str]) -> Self {
            Self {
                calls: Vec::new(),
                fail_on: fail_on.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    #[tonic::async_trait]
    impl PassLister for RecordingLister {
        async fn list_upcoming_passes(
            &mut self,
            satellite_id: &str,
        ) -> Result<ListUpcomingAvailablePassesResponse, ClientError> {
            self.calls.push(satellite_id.to_string());
            if self.fail_on.iter().any(|id| id == satellite_id) {
                return Err(ClientError::Rpc {
                    satellite_id: satellite_id.to_string(),
                    status: tonic::Status::unavailable("link down"),
                });
            }
            Ok(ListUpcomingAvailablePassesResponse {
                pass: vec![Pass {
                    reservation_token: format!("token-{}", satellite_id),
                    aos_time: Some(prost_types::Timestamp { seconds: 1_000, nanos: 0 }),
                    ..Default::default()
                }],
            })
        }
    }

    fn satellites(ids: &[i64]) -> Vec<Satellite> {
        ids.iter()
            .map(|id| Satellite {
                id: *id,
                name: Some(format!("SAT-{}", id)),
            })
            .collect()
    }

    #[tokio::test]
    async fn queries_each_satellite_once_in_order() {
        let mut lister = RecordingLister::new(&[]);
        let mut out = Vec::new();
        // Duplicates are queried as-is.
        let sats = satellites(&[98, 5, 174, 5]);

        let listed = list_all(&mut lister, &sats, None, &mut out).await.unwrap();

        assert_eq!(listed, 4);
        assert_eq!(lister.calls, vec!["98", "5", "174", "5"]);

        let printed = String::from_utf8(out).unwrap();
        let headers: Vec<&str> = printed.lines().filter(|l| l.starts_with("== ")).collect();
        assert_eq!(
            headers,
            vec![
                "== satellite 98 (SAT-98)",
                "== satellite 5 (SAT-5)",
                "== satellite 174 (SAT-174)",
                "== satellite 5 (SAT-5)",
            ]
        );
        assert!(printed.contains("token-174"));
    }

    #[tokio::test]
    async fn unnamed_satellite_header_is_bare_id() {
        let mut lister = RecordingLister::new(&[]);
        let mut out = Vec::new();
        let sats = vec![Satellite { id: 5, name: None }];

        list_all(&mut lister, &sats, None, &mut out).await.unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed.lines().next(), Some("== satellite 5"));
    }

    #[tokio::test]
    async fn empty_satellite_list_makes_no_calls() {
        let mut lister = RecordingLister::new(&[]);
        let mut out = Vec::new();

        let listed = list_all(&mut lister, &[], None, &mut out).await.unwrap();

        assert_eq!(listed, 0);
        assert!(lister.calls.is_empty());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn failure_aborts_remaining_satellites() {
        let mut lister = RecordingLister::new(&["2"]);
        let mut out = Vec::new();
        let sats = satellites(&[1, 2, 3, 4]);

        let err = list_all(&mut lister, &sats, None, &mut out).await.unwrap_err();

        assert_eq!(lister.calls, vec!["1", "2"]);
        match err {
            RunError::Query { listed, source } => {
                assert_eq!(listed, 1);
                assert_eq!(source.code(), tonic::Code::Unavailable);
            }
            other => panic!("expected Query error, got {:?}", other),
        }
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("== satellite 1 (SAT-1)"));
        assert!(!printed.contains("== satellite 3"));
    }

    #[tokio::test]
    async fn window_filters_printed_passes() {
        let mut lister = RecordingLister::new(&[]);
        let mut out = Vec::new();
        let sats = satellites(&[7]);
        let window = TimeWindow::new(
            chrono::DateTime::from_timestamp(2_000, 0).unwrap(),
            chrono::DateTime::from_timestamp(3_000, 0).unwrap(),
        )
        .unwrap();

        list_all(&mut lister, &sats, Some(&window), &mut out).await.unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("== satellite 7 (SAT-7)"));
        assert!(!printed.contains("token-7"));
    }

    #[tokio::test]
    async fn write_failure_is_output_error() {
        struct BrokenWriter;
        impl Write for BrokenWriter {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut lister = RecordingLister::new(&[]);
        let err = list_all(&mut lister, &satellites(&[1, 2]), None, &mut BrokenWriter)
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Output(_)));
        assert_eq!(lister.calls, vec!["1"]);
    }

    #[test]
    fn run_error_display() {
        let err = RunError::Query {
            listed: 2,
            source: ClientError::Rpc {
                satellite_id: "9".to_string(),
                status: tonic::Status::not_found("no such satellite"),
            },
        };
        let msg = err.to_string();
        assert!(msg.starts_with("failed to list upcoming passes for satellite 9"));
        assert!(msg.ends_with("(after 2 satellites listed)"));
    }
}
