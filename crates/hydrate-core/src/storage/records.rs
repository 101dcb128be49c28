//! Drink records.
//!
//! Records live as one JSON array under [`keys::WATER_RECORDS`]. The list is
//! append-only; "today" and "this week" are filters over the full list.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::{keys, read_json, update_json, KeyValueStore};
use crate::clock::{local_at_or_after, same_local_day, week_start};
use crate::error::{PortError, Result, ValidationError};

/// A single logged drink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrinkRecord {
    /// Creation time in epoch milliseconds, bumped to stay unique.
    pub id: String,
    #[serde(rename = "amount")]
    pub amount_ml: u32,
    #[serde(rename = "timestamp")]
    pub occurred_at: DateTime<Utc>,
}

/// Append-only drink record store.
#[derive(Clone)]
pub struct RecordStore {
    kv: Arc<dyn KeyValueStore>,
}

impl RecordStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// All records in insertion order. A missing list reads as empty.
    pub async fn all(&self) -> Result<Vec<DrinkRecord>, PortError> {
        Ok(read_json(self.kv.as_ref(), keys::WATER_RECORDS)
            .await?
            .unwrap_or_default())
    }

    /// Append a record of `amount_ml` drunk at `occurred_at`.
    ///
    /// # Errors
    /// Rejects zero amounts; otherwise fails only if the port does.
    pub async fn add(&self, amount_ml: u32, occurred_at: DateTime<Utc>) -> Result<DrinkRecord> {
        if amount_ml == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }

        let record = update_json(
            self.kv.as_ref(),
            keys::WATER_RECORDS,
            |records: &mut Vec<DrinkRecord>| {
                let mut id = occurred_at.timestamp_millis();
                if let Some(last) = records.iter().filter_map(|r| r.id.parse::<i64>().ok()).max() {
                    if id <= last {
                        id = last + 1;
                    }
                }
                let record = DrinkRecord {
                    id: id.to_string(),
                    amount_ml,
                    occurred_at,
                };
                records.push(record.clone());
                record
            },
        )
        .await?;
        tracing::debug!(id = %record.id, amount_ml, "drink recorded");
        Ok(record)
    }

    /// Records on the same local calendar day as `as_of`.
    pub async fn for_date<Tz: TimeZone>(
        &self,
        as_of: &DateTime<Tz>,
    ) -> Result<Vec<DrinkRecord>, PortError> {
        let records = self.all().await?;
        Ok(records
            .into_iter()
            .filter(|r| same_local_day(&r.occurred_at, as_of))
            .collect())
    }

    /// Records since the start (Sunday 00:00 local) of the week containing `as_of`.
    pub async fn for_week<Tz: TimeZone>(
        &self,
        as_of: &DateTime<Tz>,
    ) -> Result<Vec<DrinkRecord>, PortError> {
        let start = week_start(as_of.date_naive());
        let Some(start) = local_at_or_after(&as_of.timezone(), start, 0, 0, 0) else {
            return Ok(Vec::new());
        };
        let start = start.with_timezone(&Utc);
        let records = self.all().await?;
        Ok(records
            .into_iter()
            .filter(|r| r.occurred_at >= start)
            .collect())
    }

    pub async fn clear(&self) -> Result<(), PortError> {
        self.kv.remove(keys::WATER_RECORDS).await
    }
}
