//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database. Pipeline components
//! call store methods — they never execute SQL directly. The store is
//! the sole synchronization point between the simulator process and
//! the processing loop, so every multi-row write set (a trip with its
//! event batch, a trip's derived rows) goes through one transaction.

mod feature;
mod quote;
mod reward;
mod trip;

pub use quote::QuoteRecord;
pub use reward::RewardRecord;

use crate::{
    error::UbiResult,
    features::FeatureVector,
    pricing::QuoteBreakdown,
    rewards::RewardGrant,
    types::{UserId, VehicleId},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

pub struct UbiStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl UbiStore {
    pub fn open(path: &str) -> UbiResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> UbiResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new isolated database.
    pub fn reopen(&self) -> UbiResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> UbiResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_derived.sql"))?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    // ── Vehicles (immutable reference data) ────────────────────

    pub fn insert_vehicle(&self, v: &VehicleRecord) -> UbiResult<VehicleId> {
        self.conn.execute(
            "INSERT INTO vehicles (user_id, make, model, year, safety_rating, base_rate)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![v.user_id, v.make, v.model, v.year, v.safety_rating, v.base_rate],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn vehicles_for_user(&self, user_id: UserId) -> UbiResult<Vec<VehicleRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT vehicle_id, user_id, make, model, year, safety_rating, base_rate
             FROM vehicles WHERE user_id = ?1 ORDER BY vehicle_id",
        )?;
        let rows = stmt.query_map(params![user_id], map_vehicle)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn all_vehicles(&self) -> UbiResult<Vec<VehicleRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT vehicle_id, user_id, make, model, year, safety_rating, base_rate
             FROM vehicles ORDER BY vehicle_id",
        )?;
        let rows = stmt.query_map([], map_vehicle)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn vehicle_base_rate(&self, vehicle_id: VehicleId) -> UbiResult<Option<f64>> {
        let rate = self
            .conn
            .query_row(
                "SELECT base_rate FROM vehicles WHERE vehicle_id = ?1",
                params![vehicle_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(rate)
    }

    // ── Driver summary ─────────────────────────────────────────

    /// Provision a driver. Keeps existing points when the driver is
    /// already present.
    pub fn provision_driver(&self, user_id: UserId, display_name: &str) -> UbiResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO driver_summary (user_id, display_name, points, badges, risk_score)
             VALUES (?1, ?2, 0, 0, 50.0)",
            params![user_id, display_name],
        )?;
        Ok(())
    }

    pub fn driver_summary(&self, user_id: UserId) -> UbiResult<Option<DriverSummaryRecord>> {
        self.conn
            .query_row(
                "SELECT user_id, display_name, points, badges, risk_score
                 FROM driver_summary WHERE user_id = ?1",
                params![user_id],
                map_driver_summary,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn all_driver_summaries(&self) -> UbiResult<Vec<DriverSummaryRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, display_name, points, badges, risk_score
             FROM driver_summary ORDER BY user_id",
        )?;
        let rows = stmt.query_map([], map_driver_summary)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Per-trip derivation write set ──────────────────────────

    /// Apply one trip's full derived write set atomically: feature,
    /// label, quote, optional reward + points, summary risk score, and
    /// the processed flag. Either all rows land or none do.
    pub fn apply_trip_derivations(
        &self,
        features: &FeatureVector,
        incident: i64,
        breakdown: &QuoteBreakdown,
        grant: Option<&RewardGrant>,
    ) -> UbiResult<()> {
        let now = Utc::now();
        let tx = self.conn.unchecked_transaction()?;
        feature::insert_feature_tx(&tx, features)?;
        feature::insert_label_tx(&tx, &features.trip_id, incident)?;
        quote::insert_quote_tx(
            &tx,
            &now,
            features.user_id,
            features.vehicle_id,
            &features.trip_id,
            breakdown,
        )?;
        if let Some(grant) = grant {
            reward::insert_reward_tx(&tx, &now, grant)?;
            reward::add_points_tx(&tx, grant.user_id, grant.points)?;
        }
        reward::set_driver_risk_tx(&tx, features.user_id, breakdown.risk_score)?;
        trip::mark_processed_tx(&tx, &features.trip_id)?;
        tx.commit()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRecord {
    pub vehicle_id: Option<VehicleId>,
    pub user_id: UserId,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub safety_rating: f64,
    pub base_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverSummaryRecord {
    pub user_id: UserId,
    pub display_name: String,
    pub points: i64,
    pub badges: i64,
    pub risk_score: f64,
}

fn map_vehicle(row: &rusqlite::Row<'_>) -> rusqlite::Result<VehicleRecord> {
    Ok(VehicleRecord {
        vehicle_id: Some(row.get(0)?),
        user_id: row.get(1)?,
        make: row.get(2)?,
        model: row.get(3)?,
        year: row.get(4)?,
        safety_rating: row.get(5)?,
        base_rate: row.get(6)?,
    })
}

fn map_driver_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<DriverSummaryRecord> {
    Ok(DriverSummaryRecord {
        user_id: row.get(0)?,
        display_name: row.get(1)?,
        points: row.get(2)?,
        badges: row.get(3)?,
        risk_score: row.get(4)?,
    })
}

/// Parse an RFC 3339 column back into UTC, surfacing a conversion
/// failure at the offending column index.
pub(crate) fn parse_ts(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
