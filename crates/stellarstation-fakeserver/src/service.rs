use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tonic::{Request, Response, Status};
use tracing::info;

use crate::config::FakeServerConfig;
use crate::proto::stellar_station_service_server::StellarStationService;
use crate::proto::{ListUpcomingAvailablePassesRequest, ListUpcomingAvailablePassesResponse, Pass};

/// Ground stations passes are spread across: (id, latitude, longitude, country).
const GROUND_STATIONS: &[(&str, f64, f64, &str)] = &[
    ("gs-tokyo", 35.6762, 139.6503, "JP"),
    ("gs-svalbard", 78.2232, 15.6267, "NO"),
    ("gs-santiago", -33.4489, -70.6693, "CL"),
];

pub struct FakeStellarStationService {
    satellites: Vec<String>,
    passes_per_satellite: u32,
    pass_interval: Duration,
    pass_duration: Duration,
}

impl FakeStellarStationService {
    pub fn new(config: &FakeServerConfig) -> Self {
        Self {
            satellites: config.satellites.clone(),
            passes_per_satellite: config.passes_per_satellite,
            pass_interval: config.pass_interval,
            pass_duration: config.pass_duration,
        }
    }

    /// Build the pass schedule for `satellite_id` starting after `now`.
    ///
    /// Pass `i` has AOS at `now + (i + 1) * interval`, rounded down to the
    /// second, and lasts `pass_duration`. Times past the end of the
    /// timestamp range are clamped to it.
    pub fn passes_for(&self, satellite_id: &str, now: SystemTime) -> Vec<Pass> {
        let base = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        (0..self.passes_per_satellite)
            .map(|i| {
                let aos = base.saturating_add(
                    self.pass_interval.as_secs().saturating_mul(u64::from(i) + 1),
                );
                let los = aos.saturating_add(self.pass_duration.as_secs());
                let (gs_id, lat, lon, country) = GROUND_STATIONS[i as usize % GROUND_STATIONS.len()];

                Pass {
                    reservation_token: format!("{}-{}-{}", satellite_id, gs_id, aos),
                    aos_time: Some(timestamp(aos)),
                    los_time: Some(timestamp(los)),
                    ground_station_latitude: lat,
                    ground_station_longitude: lon,
                    ground_station_country_code: country.to_string(),
                    max_elevation_degrees: 10.0 + ((i * 17) % 80) as f64,
                    max_elevation_time: Some(timestamp(aos + (los - aos) / 2)),
                    ground_station_id: gs_id.to_string(),
                }
            })
            .collect()
    }
}

fn timestamp(unix_secs: u64) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: i64::try_from(unix_secs).unwrap_or(i64::MAX),
        nanos: 0,
    }
}

#[tonic::async_trait]
impl StellarStationService for FakeStellarStationService {
    async fn list_upcoming_available_passes(
        &self,
        request: Request<ListUpcomingAvailablePassesRequest>,
    ) -> Result<Response<ListUpcomingAvailablePassesResponse>, Status> {
        let req = request.into_inner();

        if req.satellite_id.is_empty() {
            return Err(Status::invalid_argument("satellite_id is required"));
        }
        if !self.satellites.contains(&req.satellite_id) {
            return Err(Status::not_found(format!(
                "satellite {} not found",
                req.satellite_id
            )));
        }

        let pass = self.passes_for(&req.satellite_id, SystemTime::now());
        info!(satellite_id = %req.satellite_id, passes = pass.len(), "listed upcoming passes");

        Ok(Response::new(ListUpcomingAvailablePassesResponse { pass }))
    }
}
