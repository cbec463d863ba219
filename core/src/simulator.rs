//! Trip event simulator — synthetic minute-by-minute telemetry.
//!
//! RULES:
//!   - All motion randomness flows through the simulator's StreamRng;
//!     the same seed reproduces the same traces.
//!   - Trip ids are uuid v4, unique across runs regardless of seed.
//!   - A trip row and its full event batch are written in ONE store
//!     transaction; a reader never observes a half-written trip.

use crate::{
    config::SimulatorConfig,
    geohash,
    rng::StreamRng,
    types::{TripId, UserId, VehicleId},
};
use chrono::{DateTime, Duration, Timelike, Utc};
use uuid::Uuid;

/// One bounded driving session. Written once by the simulator,
/// read-only afterward except for the processed flag.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    pub trip_id: TripId,
    pub user_id: UserId,
    pub vehicle_id: VehicleId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub miles: f64,
    pub processed: bool,
}

/// One per-minute telemetry sample. Immutable once written.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub ts: DateTime<Utc>,
    pub user_id: UserId,
    pub trip_id: TripId,
    pub vehicle_id: VehicleId,
    pub speed: f64,
    pub accel: f64,
    pub brake: f64,
    pub lat: f64,
    pub lon: f64,
    pub geohash: String,
}

#[derive(Debug, Clone)]
pub struct SimulatedTrip {
    pub trip: TripRecord,
    pub events: Vec<RawEvent>,
}

pub struct TripSimulator<'a> {
    config: &'a SimulatorConfig,
    rng: StreamRng,
}

impl<'a> TripSimulator<'a> {
    pub fn new(config: &'a SimulatorConfig, rng: StreamRng) -> Self {
        Self { config, rng }
    }

    /// Generate one trip starting at `start`: N per-minute events
    /// (N uniform in the configured range) plus the aggregate miles.
    pub fn simulate_trip(
        &mut self,
        user_id: UserId,
        vehicle_id: VehicleId,
        start: DateTime<Utc>,
    ) -> SimulatedTrip {
        let cfg = self.config;
        let trip_id: TripId = Uuid::new_v4().to_string();
        let span = (cfg.trip_minutes_max - cfg.trip_minutes_min + 1) as u64;
        let minutes = cfg.trip_minutes_min + self.rng.next_u64_below(span) as u32;

        let mut lat = self.rng.uniform(cfg.lat_min, cfg.lat_max);
        let mut lon = self.rng.uniform(cfg.lon_min, cfg.lon_max);
        let mut speed = 0.0f64;
        let mut target = self.draw_target(start.hour());
        let mut miles = 0.0f64;
        let mut events = Vec::with_capacity(minutes as usize);

        for minute in 0..minutes {
            let ts = start + Duration::minutes(minute as i64);
            if self.rng.chance(cfg.target_redraw_chance) {
                target = self.draw_target(ts.hour());
            }

            let prev = speed;
            let jitter = self.rng.uniform(-cfg.accel_jitter, cfg.accel_jitter);
            speed = (prev + cfg.speed_smoothing * (target - prev) + jitter).max(0.0);
            let accel = speed - prev;
            let brake = if prev - speed > cfg.harsh_brake_drop {
                1.0
            } else {
                0.0
            };

            lat = (lat + self.rng.uniform(-cfg.position_step, cfg.position_step))
                .clamp(cfg.lat_min, cfg.lat_max);
            lon = (lon + self.rng.uniform(-cfg.position_step, cfg.position_step))
                .clamp(cfg.lon_min, cfg.lon_max);

            miles += speed * (1.0 / 60.0);

            events.push(RawEvent {
                ts,
                user_id,
                trip_id: trip_id.clone(),
                vehicle_id,
                speed,
                accel,
                brake,
                lat,
                lon,
                geohash: geohash::encode(lat, lon, cfg.geohash_precision),
            });
        }

        let ended_at = events.last().map(|e| e.ts).unwrap_or(start);
        SimulatedTrip {
            trip: TripRecord {
                trip_id,
                user_id,
                vehicle_id,
                started_at: start,
                ended_at,
                miles,
                processed: false,
            },
            events,
        }
    }

    /// Draw a fresh target speed, scaled down during night hours.
    fn draw_target(&mut self, hour: u32) -> f64 {
        let target = self
            .rng
            .uniform(self.config.target_speed_min, self.config.target_speed_max);
        if crate::features::is_night_hour(hour) {
            target * self.config.night_speed_factor
        } else {
            target
        }
    }
}
