//! Trip and raw event queries.

use super::{parse_ts, UbiStore};
use crate::{
    error::UbiResult,
    simulator::{RawEvent, TripRecord},
    types::TripId,
};
use rusqlite::{params, Connection};

impl UbiStore {
    /// Write one trip row and its full ordered event batch in a single
    /// transaction. Buffering the whole trip is the write discipline
    /// that keeps the processing loop from feature-extracting a
    /// half-formed trip.
    pub fn insert_trip_with_events(
        &self,
        trip: &TripRecord,
        events: &[RawEvent],
    ) -> UbiResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO trips (trip_id, user_id, vehicle_id, started_at, ended_at, miles, processed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
            params![
                trip.trip_id,
                trip.user_id,
                trip.vehicle_id,
                trip.started_at.to_rfc3339(),
                trip.ended_at.to_rfc3339(),
                trip.miles,
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO raw_events (ts, user_id, trip_id, vehicle_id, speed, accel, brake, lat, lon, geohash)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for e in events {
                stmt.execute(params![
                    e.ts.to_rfc3339(),
                    e.user_id,
                    e.trip_id,
                    e.vehicle_id,
                    e.speed,
                    e.accel,
                    e.brake,
                    e.lat,
                    e.lon,
                    e.geohash,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// The work queue: every trip not yet transitioned to processed.
    pub fn unprocessed_trips(&self) -> UbiResult<Vec<TripRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT trip_id, user_id, vehicle_id, started_at, ended_at, miles, processed
             FROM trips WHERE processed = 0",
        )?;
        let rows = stmt.query_map([], map_trip)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn trip(&self, trip_id: &str) -> UbiResult<Option<TripRecord>> {
        use rusqlite::OptionalExtension;
        self.conn()
            .query_row(
                "SELECT trip_id, user_id, vehicle_id, started_at, ended_at, miles, processed
                 FROM trips WHERE trip_id = ?1",
                params![trip_id],
                map_trip,
            )
            .optional()
            .map_err(Into::into)
    }

    /// One trip's events in timestamp order — the order feature
    /// extraction is defined over.
    pub fn events_for_trip(&self, trip_id: &str) -> UbiResult<Vec<RawEvent>> {
        let mut stmt = self.conn().prepare(
            "SELECT ts, user_id, trip_id, vehicle_id, speed, accel, brake, lat, lon, geohash
             FROM raw_events WHERE trip_id = ?1 ORDER BY ts ASC",
        )?;
        let rows = stmt.query_map(params![trip_id], |row| {
            Ok(RawEvent {
                ts: parse_ts(0, row.get(0)?)?,
                user_id: row.get(1)?,
                trip_id: row.get(2)?,
                vehicle_id: row.get(3)?,
                speed: row.get(4)?,
                accel: row.get(5)?,
                brake: row.get(6)?,
                lat: row.get(7)?,
                lon: row.get(8)?,
                geohash: row.get(9)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Count of still-unprocessed trips, reported as queue lag in the
    /// cycle metrics.
    pub fn queue_lag(&self) -> UbiResult<i64> {
        let lag = self.conn().query_row(
            "SELECT COUNT(*) FROM trips WHERE processed = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(lag)
    }

    pub fn trip_count(&self) -> UbiResult<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM trips", [], |row| row.get(0))?;
        Ok(count)
    }
}

pub(super) fn mark_processed_tx(conn: &Connection, trip_id: &TripId) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE trips SET processed = 1 WHERE trip_id = ?1",
        params![trip_id],
    )?;
    Ok(())
}

fn map_trip(row: &rusqlite::Row<'_>) -> rusqlite::Result<TripRecord> {
    Ok(TripRecord {
        trip_id: row.get(0)?,
        user_id: row.get(1)?,
        vehicle_id: row.get(2)?,
        started_at: parse_ts(3, row.get(3)?)?,
        ended_at: parse_ts(4, row.get(4)?)?,
        miles: row.get(5)?,
        processed: row.get::<_, i64>(6)? != 0,
    })
}
