use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::info;

use stellarstation_passes::channel;
use stellarstation_passes::client::PassClient;
use stellarstation_passes::config::{Config, Satellite};
use stellarstation_passes::runner;
use stellarstation_passes::window::TimeWindow;

/// List upcoming available passes for the satellites in a config file.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(long, env = "STELLARSTATION_CONFIG", value_name = "FILE")]
    config: PathBuf,

    /// Only list passes for this satellite ID (repeatable)
    #[arg(short = 's', long = "satellite", value_name = "ID")]
    satellites: Vec<i64>,

    /// Only print passes with AOS at or after this time (RFC 3339)
    #[arg(long, value_name = "TIME", requires = "until")]
    from: Option<DateTime<Utc>>,

    /// Only print passes with AOS at or before this time (RFC 3339)
    #[arg(long, value_name = "TIME", requires = "from")]
    until: Option<DateTime<Utc>>,

    /// Only print passes with AOS within this many days from now
    #[arg(long, value_name = "DAYS", conflicts_with_all = ["from", "until"])]
    days: Option<u32>,
}

/// Resolve the satellites to query and the window to print, as of `now`.
fn selection(
    args: &Args,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<(Vec<Satellite>, Option<TimeWindow>), Box<dyn std::error::Error>> {
    let satellites = config.select_satellites(&args.satellites)?;
    let window = match (args.from, args.until, args.days) {
        (Some(from), Some(until), _) => Some(TimeWindow::new(from, until)?),
        (_, _, Some(days)) => Some(TimeWindow::days_from(now, i64::from(days))?),
        _ => None,
    };
    Ok((satellites, window))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = Config::from_file(&args.config)?;
    let (satellites, window) = selection(&args, &config, Utc::now())?;

    info!(
        api_address = %config.api_address,
        ground_stations = config.ground_stations.len(),
        satellites = satellites.len(),
        "loaded config"
    );

    let channel = channel::connect_with_config(&config).await?;
    let mut client = PassClient::new(&channel);

    let stdout = std::io::stdout();
    let listed = runner::list_all(&mut client, &satellites, window.as_ref(), &mut stdout.lock()).await?;

    info!(listed, "done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellarstation_passes::config::ConfigError;
    use stellarstation_passes::window::WindowError;

    const CONFIG: &str = r#"{
        "api_address": "https://api.stellarstation.com",
        "api_key_path": "key.json",
        "ground_stations": [{"id": 1}],
        "satellites": [{"id": 174}, {"id": 5}, {"id": 98}]
    }"#;

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        let mut argv = vec!["stellarstation-passes", "--config", "config.json"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv)
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn ids(satellites: &[Satellite]) -> Vec<i64> {
        satellites.iter().map(|s| s.id).collect()
    }

    #[test]
    fn no_flags_selects_everything_without_window() {
        let config = Config::from_json(CONFIG).unwrap();
        let (satellites, window) = selection(&parse(&[]).unwrap(), &config, now()).unwrap();
        assert_eq!(ids(&satellites), vec![174, 5, 98]);
        assert!(window.is_none());
    }

    #[test]
    fn satellite_flags_keep_config_order() {
        let config = Config::from_json(CONFIG).unwrap();
        let args = parse(&["-s", "98", "--satellite", "174"]).unwrap();
        let (satellites, _) = selection(&args, &config, now()).unwrap();
        assert_eq!(ids(&satellites), vec![174, 98]);
    }

    #[test]
    fn unknown_satellite_flag_is_rejected() {
        let config = Config::from_json(CONFIG).unwrap();
        let err = selection(&parse(&["-s", "42"]).unwrap(), &config, now()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::UnknownSatellite(42))
        ));
    }

    #[test]
    fn from_and_until_build_window() {
        let config = Config::from_json(CONFIG).unwrap();
        let args = parse(&[
            "--from",
            "2024-01-01T00:00:00Z",
            "--until",
            "2024-01-02T00:00:00Z",
        ])
        .unwrap();
        let (_, window) = selection(&args, &config, now()).unwrap();
        let window = window.unwrap();
        assert_eq!(window.start().to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(window.stop().to_rfc3339(), "2024-01-02T00:00:00+00:00");
    }

    #[test]
    fn from_requires_until() {
        assert!(parse(&["--from", "2024-01-01T00:00:00Z"]).is_err());
        assert!(parse(&["--until", "2024-01-01T00:00:00Z"]).is_err());
    }

    #[test]
    fn inverted_window_is_rejected() {
        let config = Config::from_json(CONFIG).unwrap();
        let args = parse(&[
            "--from",
            "2024-01-02T00:00:00Z",
            "--until",
            "2024-01-01T00:00:00Z",
        ])
        .unwrap();
        let err = selection(&args, &config, now()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WindowError>(),
            Some(WindowError::Inverted { .. })
        ));
    }

    #[test]
    fn days_window_starts_now() {
        let config = Config::from_json(CONFIG).unwrap();
        let (_, window) = selection(&parse(&["--days", "3"]).unwrap(), &config, now()).unwrap();
        let window = window.unwrap();
        assert_eq!(window.start(), now());
        assert_eq!(window.stop(), now() + chrono::Duration::days(3));
    }

    #[test]
    fn days_conflicts_with_explicit_range() {
        let err = parse(&[
            "--days",
            "3",
            "--from",
            "2024-01-01T00:00:00Z",
            "--until",
            "2024-01-02T00:00:00Z",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
