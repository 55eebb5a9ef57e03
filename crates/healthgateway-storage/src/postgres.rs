//! PostgreSQL-backed communication storage.

use async_trait::async_trait;
use healthgateway_core::{Communication, CommunicationType, SharedClock};
use sqlx_core::query::query;
use sqlx_postgres::PgPool;
use time::{PrimitiveDateTime, UtcOffset};
use tracing::{debug, error, instrument};

use crate::error::Result;
use crate::record::{COMMUNICATION_COLUMNS, CommunicationRecord};
use crate::traits::CommunicationStorage;
use crate::types::DbResult;

/// Reads communications from `gateway."Communication"`.
#[derive(Clone)]
pub struct PostgresCommunicationStorage {
    pool: PgPool,
    clock: SharedClock,
}

impl PostgresCommunicationStorage {
    pub fn new(pool: PgPool, clock: SharedClock) -> Self {
        Self { pool, clock }
    }

    async fn fetch_next(&self, communication_type: CommunicationType) -> Result<Option<Communication>> {
        let now = self.clock.now_utc().to_offset(UtcOffset::UTC);
        let now = PrimitiveDateTime::new(now.date(), now.time());

        let sql = format!(
            r#"SELECT {COMMUNICATION_COLUMNS}
            FROM gateway."Communication"
            WHERE "CommunicationTypeCode" = $1
              AND "ExpiryDateTime" > $2
            ORDER BY "EffectiveDateTime" ASC, "CommunicationId" ASC
            LIMIT 1"#
        );

        let row = query(&sql)
            .bind(communication_type.as_str())
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let record = CommunicationRecord::from_row(&row)?;
        Ok(Some(record.into_communication()?))
    }
}

#[async_trait]
impl CommunicationStorage for PostgresCommunicationStorage {
    #[instrument(skip_all, fields(communication_type = %communication_type))]
    async fn get_next(&self, communication_type: CommunicationType) -> DbResult<Option<Communication>> {
        match self.fetch_next(communication_type).await {
            Ok(communication) => {
                debug!(found = communication.is_some(), "Fetched next communication");
                DbResult::read(communication)
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch next communication");
                DbResult::error(e.to_string())
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
