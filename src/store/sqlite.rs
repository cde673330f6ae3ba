// SQLite record store. Usage/availability maps are stored as JSON text.
// Mutating transactions always start with a write so WAL never has to
// upgrade a read lock under contention.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::instrument;

use super::{DayShifts, RecordStore, StoreError, UpsertOutcome, WriteOutcome};
use crate::models::{DailyRollup, ShiftPatch, ShiftRecord};

const BUMP_REVISION: &str = "INSERT INTO day_revisions (date, revision) VALUES ($1, 1)
     ON CONFLICT(date) DO UPDATE SET revision = revision + 1
     RETURNING revision";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(path: &str, max_pool_size: u32) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS shift_records (
                date TEXT NOT NULL,
                shift_index INTEGER NOT NULL,
                cpu_usage TEXT NOT NULL,
                memory_usage TEXT NOT NULL,
                application_availability TEXT NOT NULL,
                PRIMARY KEY (date, shift_index)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS day_revisions (date TEXT PRIMARY KEY, revision INTEGER NOT NULL)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_rollups (
                date TEXT PRIMARY KEY,
                source_revision INTEGER NOT NULL,
                max_cpu_usage TEXT NOT NULL,
                max_memory_usage TEXT NOT NULL,
                application_availability TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn parse_shift_row(row: &SqliteRow) -> Result<ShiftRecord, StoreError> {
        let date: String = row.try_get("date")?;
        let shift_index: i64 = row.try_get("shift_index")?;
        let cpu_usage: String = row.try_get("cpu_usage")?;
        let memory_usage: String = row.try_get("memory_usage")?;
        let application_availability: String = row.try_get("application_availability")?;

        let shift_index = u32::try_from(shift_index)
            .map_err(|_| StoreError::Corrupt(format!("shift_index {} out of range", shift_index)))?;

        Ok(ShiftRecord {
            date,
            shift_index,
            cpu_usage: serde_json::from_str(&cpu_usage)?,
            memory_usage: serde_json::from_str(&memory_usage)?,
            application_availability: serde_json::from_str(&application_availability)?,
        })
    }

    fn parse_rollup_row(row: &SqliteRow) -> Result<DailyRollup, StoreError> {
        let date: String = row.try_get("date")?;
        let max_cpu_usage: String = row.try_get("max_cpu_usage")?;
        let max_memory_usage: String = row.try_get("max_memory_usage")?;
        let application_availability: String = row.try_get("application_availability")?;

        Ok(DailyRollup {
            date,
            max_cpu_usage: serde_json::from_str(&max_cpu_usage)?,
            max_memory_usage: serde_json::from_str(&max_memory_usage)?,
            application_availability: serde_json::from_str(&application_availability)?,
        })
    }
}

fn revision_from_db(revision: i64) -> Result<u64, StoreError> {
    u64::try_from(revision)
        .map_err(|_| StoreError::Corrupt(format!("negative revision {}", revision)))
}

#[async_trait]
impl RecordStore for SqliteStore {
    #[instrument(
        skip(self, record),
        fields(repo = "sqlite", operation = "write_shift", date = %record.date, shift_index = record.shift_index)
    )]
    async fn write_shift(&self, record: &ShiftRecord) -> Result<(WriteOutcome, u64), StoreError> {
        let cpu_usage = serde_json::to_string(&record.cpu_usage)?;
        let memory_usage = serde_json::to_string(&record.memory_usage)?;
        let availability = serde_json::to_string(&record.application_availability)?;

        let mut tx = self.pool.begin().await?;

        let revision = sqlx::query_scalar::<_, i64>(BUMP_REVISION)
            .bind(&record.date)
            .fetch_one(&mut *tx)
            .await?;

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM shift_records WHERE date = $1 AND shift_index = $2",
        )
        .bind(&record.date)
        .bind(record.shift_index as i64)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO shift_records (date, shift_index, cpu_usage, memory_usage, application_availability)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT(date, shift_index) DO UPDATE SET
                cpu_usage = excluded.cpu_usage,
                memory_usage = excluded.memory_usage,
                application_availability = excluded.application_availability
            "#,
        )
        .bind(&record.date)
        .bind(record.shift_index as i64)
        .bind(&cpu_usage)
        .bind(&memory_usage)
        .bind(&availability)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let outcome = if existing > 0 {
            WriteOutcome::Replaced
        } else {
            WriteOutcome::Inserted
        };
        Ok((outcome, revision_from_db(revision)?))
    }

    async fn read_shift(
        &self,
        date: &str,
        shift_index: u32,
    ) -> Result<Option<ShiftRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT date, shift_index, cpu_usage, memory_usage, application_availability
             FROM shift_records WHERE date = $1 AND shift_index = $2",
        )
        .bind(date)
        .bind(shift_index as i64)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::parse_shift_row).transpose()
    }

    #[instrument(skip(self), fields(repo = "sqlite", operation = "read_all_shifts"))]
    async fn read_all_shifts(&self) -> Result<Vec<ShiftRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT date, shift_index, cpu_usage, memory_usage, application_availability
             FROM shift_records ORDER BY date ASC, shift_index ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Self::parse_shift_row(&row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self), fields(repo = "sqlite", operation = "read_shifts"))]
    async fn read_shifts(&self, date: &str) -> Result<DayShifts, StoreError> {
        let mut tx = self.pool.begin().await?;

        let revision = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT revision FROM day_revisions WHERE date = $1",
        )
        .bind(date)
        .fetch_optional(&mut *tx)
        .await?
        .flatten()
        .unwrap_or(0);

        let rows = sqlx::query(
            "SELECT date, shift_index, cpu_usage, memory_usage, application_availability
             FROM shift_records WHERE date = $1 ORDER BY shift_index ASC",
        )
        .bind(date)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(Self::parse_shift_row(&row)?);
        }
        Ok(DayShifts {
            revision: revision_from_db(revision)?,
            records,
        })
    }

    #[instrument(skip(self, patch), fields(repo = "sqlite", operation = "update_shift"))]
    async fn update_shift(
        &self,
        date: &str,
        shift_index: u32,
        patch: ShiftPatch,
    ) -> Result<Option<ShiftRecord>, StoreError> {
        let cpu_usage = patch
            .cpu_usage
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let memory_usage = patch
            .memory_usage
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let availability = patch
            .application_availability
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        let r = sqlx::query(
            r#"
            UPDATE shift_records SET
                cpu_usage = COALESCE($3, cpu_usage),
                memory_usage = COALESCE($4, memory_usage),
                application_availability = COALESCE($5, application_availability)
            WHERE date = $1 AND shift_index = $2
            "#,
        )
        .bind(date)
        .bind(shift_index as i64)
        .bind(cpu_usage)
        .bind(memory_usage)
        .bind(availability)
        .execute(&mut *tx)
        .await?;

        if r.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query_scalar::<_, i64>(BUMP_REVISION)
            .bind(date)
            .fetch_one(&mut *tx)
            .await?;

        let row = sqlx::query(
            "SELECT date, shift_index, cpu_usage, memory_usage, application_availability
             FROM shift_records WHERE date = $1 AND shift_index = $2",
        )
        .bind(date)
        .bind(shift_index as i64)
        .fetch_one(&mut *tx)
        .await?;
        let updated = Self::parse_shift_row(&row)?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    #[instrument(skip(self), fields(repo = "sqlite", operation = "delete_shift"))]
    async fn delete_shift(&self, date: &str, shift_index: u32) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let r = sqlx::query("DELETE FROM shift_records WHERE date = $1 AND shift_index = $2")
            .bind(date)
            .bind(shift_index as i64)
            .execute(&mut *tx)
            .await?;

        if r.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query_scalar::<_, i64>(BUMP_REVISION)
            .bind(date)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn count_shifts(&self, date: &str) -> Result<u64, StoreError> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM shift_records WHERE date = $1")
            .bind(date)
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }

    async fn read_rollup(&self, date: &str) -> Result<Option<DailyRollup>, StoreError> {
        let row = sqlx::query(
            "SELECT date, max_cpu_usage, max_memory_usage, application_availability
             FROM daily_rollups WHERE date = $1",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::parse_rollup_row).transpose()
    }

    async fn rollup_revision(&self, date: &str) -> Result<Option<u64>, StoreError> {
        let revision = sqlx::query_scalar::<_, i64>(
            "SELECT source_revision FROM daily_rollups WHERE date = $1",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        revision.map(revision_from_db).transpose()
    }

    #[instrument(
        skip(self, rollup),
        fields(repo = "sqlite", operation = "upsert_rollup", date = %rollup.date)
    )]
    async fn upsert_rollup(
        &self,
        rollup: &DailyRollup,
        revision: u64,
    ) -> Result<UpsertOutcome, StoreError> {
        let max_cpu_usage = serde_json::to_string(&rollup.max_cpu_usage)?;
        let max_memory_usage = serde_json::to_string(&rollup.max_memory_usage)?;
        let availability = serde_json::to_string(&rollup.application_availability)?;

        let r = sqlx::query(
            r#"
            INSERT INTO daily_rollups
            (date, source_revision, max_cpu_usage, max_memory_usage, application_availability)
            SELECT $1, $2, $3, $4, $5
            WHERE (SELECT revision FROM day_revisions WHERE date = $1) = $2
            ON CONFLICT(date) DO UPDATE SET
                source_revision = excluded.source_revision,
                max_cpu_usage = excluded.max_cpu_usage,
                max_memory_usage = excluded.max_memory_usage,
                application_availability = excluded.application_availability
            WHERE excluded.source_revision >= daily_rollups.source_revision
            "#,
        )
        .bind(&rollup.date)
        .bind(revision as i64)
        .bind(&max_cpu_usage)
        .bind(&max_memory_usage)
        .bind(&availability)
        .execute(&self.pool)
        .await?;

        Ok(if r.rows_affected() > 0 {
            UpsertOutcome::Written
        } else {
            UpsertOutcome::Stale
        })
    }

    #[instrument(skip(self), fields(repo = "sqlite", operation = "retract_rollup"))]
    async fn retract_rollup(&self, date: &str, expected_shifts: u64) -> Result<bool, StoreError> {
        let r = sqlx::query(
            "DELETE FROM daily_rollups WHERE date = $1
             AND (SELECT COUNT(*) FROM shift_records WHERE date = $1) != $2",
        )
        .bind(date)
        .bind(expected_shifts as i64)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(repo = "sqlite", operation = "pending_dates"))]
    async fn pending_dates(&self, expected_shifts: u64) -> Result<Vec<String>, StoreError> {
        let dates = sqlx::query_scalar::<_, String>(
            r#"
            SELECT d.date FROM day_revisions d
            LEFT JOIN (SELECT date, COUNT(*) AS n FROM shift_records GROUP BY date) s
                ON s.date = d.date
            LEFT JOIN daily_rollups r ON r.date = d.date
            WHERE (COALESCE(s.n, 0) = $1 AND (r.date IS NULL OR r.source_revision < d.revision))
               OR (COALESCE(s.n, 0) != $1 AND r.date IS NOT NULL)
            ORDER BY d.date ASC
            "#,
        )
        .bind(expected_shifts as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(dates)
    }
}
