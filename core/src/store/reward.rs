//! Reward queries and driver-summary updates.

use super::{parse_ts, UbiStore};
use crate::{
    error::UbiResult,
    rewards::RewardGrant,
    types::{TripId, UserId},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone, PartialEq)]
pub struct RewardRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub user_id: UserId,
    pub points: i64,
    pub reason: String,
    pub trip_id: TripId,
}

impl UbiStore {
    pub fn reward_for_trip(&self, trip_id: &str) -> UbiResult<Option<RewardRecord>> {
        self.conn()
            .query_row(
                "SELECT id, created_at, user_id, points, reason, trip_id
                 FROM rewards WHERE trip_id = ?1",
                params![trip_id],
                map_reward,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn rewards_for_user(&self, user_id: UserId) -> UbiResult<Vec<RewardRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, created_at, user_id, points, reason, trip_id
             FROM rewards WHERE user_id = ?1 ORDER BY id DESC",
        )?;
        let rows = stmt.query_map(params![user_id], map_reward)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn reward_count(&self) -> UbiResult<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM rewards", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Keyed by trip id: a retried trip replaces its own grant, it cannot
/// double-grant.
pub(super) fn insert_reward_tx(
    conn: &Connection,
    created_at: &DateTime<Utc>,
    grant: &RewardGrant,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO rewards (created_at, user_id, points, reason, trip_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            created_at.to_rfc3339(),
            grant.user_id,
            grant.points,
            grant.reason,
            grant.trip_id,
        ],
    )?;
    Ok(())
}

pub(super) fn add_points_tx(
    conn: &Connection,
    user_id: UserId,
    points: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE driver_summary SET points = points + ?1 WHERE user_id = ?2",
        params![points, user_id],
    )?;
    Ok(())
}

/// The summary mirrors the most recently processed trip's risk score.
pub(super) fn set_driver_risk_tx(
    conn: &Connection,
    user_id: UserId,
    risk_score: f64,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE driver_summary SET risk_score = ?1 WHERE user_id = ?2",
        params![risk_score, user_id],
    )?;
    Ok(())
}

fn map_reward(row: &rusqlite::Row<'_>) -> rusqlite::Result<RewardRecord> {
    Ok(RewardRecord {
        id: row.get(0)?,
        created_at: parse_ts(1, row.get(1)?)?,
        user_id: row.get(2)?,
        points: row.get(3)?,
        reason: row.get(4)?,
        trip_id: row.get(5)?,
    })
}
