//! Quote queries. Quotes are append-only history — one row per
//! processed trip, never replaced.

use super::{parse_ts, UbiStore};
use crate::{
    error::UbiResult,
    pricing::QuoteBreakdown,
    types::{TripId, UserId, VehicleId},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub user_id: UserId,
    pub vehicle_id: VehicleId,
    pub trip_id: TripId,
    pub breakdown: QuoteBreakdown,
}

impl UbiStore {
    /// The read façade's "latest quote" query.
    pub fn latest_quote_for_user(&self, user_id: UserId) -> UbiResult<Option<QuoteRecord>> {
        self.conn()
            .query_row(
                "SELECT id, created_at, user_id, vehicle_id, trip_id, base_component,
                        usage_component, behavior_component, context_component,
                        final_premium, risk_score, explanations
                 FROM quotes WHERE user_id = ?1 ORDER BY id DESC LIMIT 1",
                params![user_id],
                map_quote,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn quotes_for_trip(&self, trip_id: &str) -> UbiResult<Vec<QuoteRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, created_at, user_id, vehicle_id, trip_id, base_component,
                    usage_component, behavior_component, context_component,
                    final_premium, risk_score, explanations
             FROM quotes WHERE trip_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![trip_id], map_quote)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn quote_count(&self) -> UbiResult<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))?;
        Ok(count)
    }
}

pub(super) fn insert_quote_tx(
    conn: &Connection,
    created_at: &DateTime<Utc>,
    user_id: UserId,
    vehicle_id: VehicleId,
    trip_id: &TripId,
    b: &QuoteBreakdown,
) -> UbiResult<()> {
    conn.execute(
        "INSERT INTO quotes (
            created_at, user_id, vehicle_id, trip_id, base_component, usage_component,
            behavior_component, context_component, final_premium, risk_score, explanations
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            created_at.to_rfc3339(),
            user_id,
            vehicle_id,
            trip_id,
            b.base_component,
            b.usage_component,
            b.behavior_component,
            b.context_component,
            b.final_premium,
            b.risk_score,
            serde_json::to_string(&b.explanations)?,
        ],
    )?;
    Ok(())
}

fn map_quote(row: &rusqlite::Row<'_>) -> rusqlite::Result<QuoteRecord> {
    let explanations_json: String = row.get(11)?;
    let explanations = serde_json::from_str(&explanations_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(QuoteRecord {
        id: row.get(0)?,
        created_at: parse_ts(1, row.get(1)?)?,
        user_id: row.get(2)?,
        vehicle_id: row.get(3)?,
        trip_id: row.get(4)?,
        breakdown: QuoteBreakdown {
            base_component: row.get(5)?,
            usage_component: row.get(6)?,
            behavior_component: row.get(7)?,
            context_component: row.get(8)?,
            final_premium: row.get(9)?,
            risk_score: row.get(10)?,
            explanations,
        },
    })
}
