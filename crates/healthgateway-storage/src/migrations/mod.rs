//! Embedded schema migrations for the communication table.

use sqlx_core::migrate::{Migration, MigrationType};
use sqlx_postgres::PgPool;
use std::borrow::Cow;
use tracing::{info, instrument};

use crate::error::{Result, StorageError};

/// (version, description, sql) in the order they must be applied.
const EMBEDDED_MIGRATIONS: &[(i64, &str, &str)] = &[
    (
        20240601000001,
        "communication",
        include_str!("../../migrations/20240601000001_communication.sql"),
    ),
    (
        20240601000002,
        "banner_change_trigger",
        include_str!("../../migrations/20240601000002_banner_change_trigger.sql"),
    ),
];

fn build_migrations() -> Vec<Migration> {
    EMBEDDED_MIGRATIONS
        .iter()
        .map(|(version, description, sql)| Migration {
            version: *version,
            description: Cow::Borrowed(description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(sql),
            checksum: Cow::Borrowed(&[]),
            no_tx: false,
        })
        .collect()
}

/// Applies pending migrations. Applied versions are tracked in
/// `_sqlx_migrations`.
///
/// # Errors
///
/// Returns an error if a migration fails to execute.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> Result<()> {
    let migrations = build_migrations();
    info!(count = migrations.len(), "Running database migrations (embedded)");

    let migrator = sqlx_core::migrate::Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    };

    migrator
        .run(pool)
        .await
        .map_err(|e| StorageError::migration(format!("Migration failed: {e}")))?;

    info!("Database migrations completed successfully");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered() {
        let migrations = build_migrations();
        assert_eq!(migrations.len(), 2);
        assert!(migrations.windows(2).all(|w| w[0].version < w[1].version));
    }

    #[test]
    fn test_trigger_publishes_on_banner_change_channel() {
        let trigger = EMBEDDED_MIGRATIONS[1].2;
        assert!(trigger.contains(&format!("'{}'", crate::BANNER_CHANGE_CHANNEL)));
        assert!(trigger.contains("'Action', TG_OP"));
    }
}
