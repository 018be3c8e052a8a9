use std::time::Duration;

/// Fake server configuration.
#[derive(Debug, Clone)]
pub struct FakeServerConfig {
    pub port: u16,
    /// PEM public key tokens must verify against. `None` disables auth.
    pub public_key_path: Option<String>,
    pub issuer: String,
    pub audience: String,
    /// Satellite IDs the server knows about; others get `NOT_FOUND`.
    pub satellites: Vec<String>,
    pub passes_per_satellite: u32,
    pub pass_interval: Duration,
    pub pass_duration: Duration,
}

impl Default for FakeServerConfig {
    fn default() -> Self {
        Self {
            port: 8081,
            public_key_path: None,
            issuer: "fakeclient@example.com".to_string(),
            audience: "http://127.0.0.1".to_string(),
            satellites: vec!["5".to_string()],
            passes_per_satellite: 5,
            pass_interval: Duration::from_secs(90 * 60),
            pass_duration: Duration::from_secs(10 * 60),
        }
    }
}

impl FakeServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_parse("STELLARSTATION_FAKESERVER_PORT").unwrap_or(defaults.port),
            public_key_path: std::env::var("STELLARSTATION_FAKESERVER_PUBLIC_KEY").ok(),
            issuer: std::env::var("STELLARSTATION_FAKESERVER_ISSUER")
                .unwrap_or(defaults.issuer),
            audience: std::env::var("STELLARSTATION_FAKESERVER_AUDIENCE")
                .unwrap_or(defaults.audience),
            satellites: std::env::var("STELLARSTATION_FAKESERVER_SATELLITES")
                .map(|s| parse_list(&s))
                .unwrap_or(defaults.satellites),
            passes_per_satellite: env_parse("STELLARSTATION_FAKESERVER_PASSES")
                .unwrap_or(defaults.passes_per_satellite),
            pass_interval: env_parse("STELLARSTATION_FAKESERVER_PASS_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.pass_interval),
            pass_duration: env_parse("STELLARSTATION_FAKESERVER_PASS_DURATION_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.pass_duration),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}
