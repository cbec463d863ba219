//! Feature and label queries.
//!
//! Both tables are keyed by trip id with insert-or-replace writes, so
//! a retried trip replaces its own rows instead of duplicating them.

use super::UbiStore;
use crate::{error::UbiResult, features::FeatureVector, types::TripId};
use rusqlite::{params, Connection, OptionalExtension};

impl UbiStore {
    pub fn feature_for_trip(&self, trip_id: &str) -> UbiResult<Option<FeatureVector>> {
        self.conn()
            .query_row(
                "SELECT trip_id, user_id, vehicle_id, miles, avg_speed, max_speed,
                        harsh_brake_ct, accel_var, night_pct, speeding_pct, weather_risk
                 FROM features WHERE trip_id = ?1",
                params![trip_id],
                map_feature,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn feature_count(&self) -> UbiResult<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM features", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn label_for_trip(&self, trip_id: &str) -> UbiResult<Option<i64>> {
        self.conn()
            .query_row(
                "SELECT incident FROM labels WHERE trip_id = ?1",
                params![trip_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn label_count(&self) -> UbiResult<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM labels", [], |row| row.get(0))?;
        Ok(count)
    }
}

pub(super) fn insert_feature_tx(conn: &Connection, f: &FeatureVector) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO features (
            trip_id, user_id, vehicle_id, miles, avg_speed, max_speed,
            harsh_brake_ct, accel_var, night_pct, speeding_pct, weather_risk
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            f.trip_id,
            f.user_id,
            f.vehicle_id,
            f.miles,
            f.avg_speed,
            f.max_speed,
            f.harsh_brake_ct,
            f.accel_var,
            f.night_pct,
            f.speeding_pct,
            f.weather_risk,
        ],
    )?;
    Ok(())
}

pub(super) fn insert_label_tx(
    conn: &Connection,
    trip_id: &TripId,
    incident: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO labels (trip_id, incident) VALUES (?1, ?2)",
        params![trip_id, incident],
    )?;
    Ok(())
}

fn map_feature(row: &rusqlite::Row<'_>) -> rusqlite::Result<FeatureVector> {
    Ok(FeatureVector {
        trip_id: row.get(0)?,
        user_id: row.get(1)?,
        vehicle_id: row.get(2)?,
        miles: row.get(3)?,
        avg_speed: row.get(4)?,
        max_speed: row.get(5)?,
        harsh_brake_ct: row.get(6)?,
        accel_var: row.get(7)?,
        night_pct: row.get(8)?,
        speeding_pct: row.get(9)?,
        weather_risk: row.get(10)?,
    })
}
