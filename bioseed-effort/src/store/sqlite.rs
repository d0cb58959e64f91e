//! SQLite-backed stores
//!
//! Per-rank column lists are generated from the shared schema names, so
//! statements are assembled at call time and values bound positionally.

use super::codec::{decode_curve, decode_rank, encode_curve, encode_flags, encode_ids, encode_names};
use super::{EffortStore, RichnessRange, SpecimenSource, VisitStore};
use crate::effort::Effort;
use crate::pagination::PageRequest;
use crate::specimen::Specimen;
use crate::taxon::{Rank, TaxonTally};
use crate::visit::{Visit, VisitKey};
use async_trait::async_trait;
use bioseed_common::db::schema::{
    flags_column, ids_column, names_column, specimen_id_column, EFFORT_TABLE, SPECIMENS_TABLE,
    VISITS_TABLE,
};
use bioseed_common::{Error, Result};
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const VISIT_BASE_COLUMNS: [&str; 5] = [
    "location_id",
    "is_cave",
    "start_epoch_day",
    "end_epoch_day",
    "normalized_collectors",
];

const EFFORT_BASE_COLUMNS: [&str; 10] = [
    "location_id",
    "is_cave",
    "start_date",
    "end_date",
    "visit_count",
    "person_visit_count",
    "species_count",
    "is_final",
    "per_visit_points",
    "per_person_visit_points",
];

const SPECIMEN_BASE_COLUMNS: [&str; 6] = [
    "locality_id",
    "locality_name",
    "is_cave",
    "start_date",
    "end_date",
    "normalized_collectors",
];

fn visit_rank_columns() -> Vec<String> {
    Rank::IDENTIFIED
        .iter()
        .flat_map(|rank| {
            let prefix = rank.column();
            [names_column(prefix), ids_column(prefix), flags_column(prefix)]
        })
        .collect()
}

fn effort_rank_columns() -> Vec<String> {
    Rank::ALL
        .iter()
        .flat_map(|rank| {
            let prefix = rank.column();
            [names_column(prefix), flags_column(prefix)]
        })
        .collect()
}

fn specimen_rank_columns() -> Vec<String> {
    Rank::IDENTIFIED
        .iter()
        .flat_map(|rank| {
            let prefix = rank.column();
            [prefix.to_string(), specimen_id_column(prefix)]
        })
        .collect()
}

fn visit_columns() -> Vec<String> {
    VISIT_BASE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(visit_rank_columns())
        .collect()
}

fn effort_columns() -> Vec<String> {
    EFFORT_BASE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(effort_rank_columns())
        .collect()
}

fn specimen_columns() -> Vec<String> {
    SPECIMEN_BASE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(specimen_rank_columns())
        .collect()
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Stores backed by the shared SQLite pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a raw specimen row, returning its row id
    pub async fn insert_specimen(&self, specimen: &Specimen) -> Result<i64> {
        let columns = specimen_columns();
        let sql = format!(
            "INSERT INTO {SPECIMENS_TABLE} ({}) VALUES ({})",
            columns.join(", "),
            placeholders(columns.len())
        );

        let mut query = sqlx::query(&sql)
            .bind(specimen.locality_id)
            .bind(&specimen.locality_name)
            .bind(specimen.is_cave)
            .bind(specimen.start_date)
            .bind(specimen.end_date)
            .bind(&specimen.normalized_collectors);
        for rank in Rank::IDENTIFIED {
            let ident = specimen.identification(rank);
            query = query
                .bind(ident.map(|i| i.name.clone()))
                .bind(ident.and_then(|i| i.id));
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn count_visits(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {VISITS_TABLE}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_efforts(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {EFFORT_TABLE}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Every snapshot of one location, oldest first
    pub async fn location_efforts(&self, location_id: i64) -> Result<Vec<Effort>> {
        let sql = format!(
            "SELECT {} FROM {EFFORT_TABLE} WHERE location_id = ? ORDER BY visit_count ASC",
            effort_columns().join(", ")
        );
        let rows = sqlx::query(&sql)
            .bind(location_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(effort_from_row).collect()
    }
}

/// Rows written through [`SqliteStore::insert_specimen`] always decode;
/// a name edited in place to be blank or to hold the separator is a
/// corrupt table and surfaces as `Encoding`, aborting the scan.
fn specimen_from_row(row: &SqliteRow) -> Result<Specimen> {
    let mut specimen = Specimen::new(row.try_get("locality_id")?, row.try_get::<String, _>("locality_name")?)
        .in_cave(row.try_get("is_cave")?)
        .with_signature(row.try_get("normalized_collectors")?);
    specimen.start_date = row.try_get::<Option<NaiveDate>, _>("start_date")?;
    specimen.end_date = row.try_get::<Option<NaiveDate>, _>("end_date")?;

    for rank in Rank::IDENTIFIED {
        let prefix = rank.column();
        let name: Option<String> = row.try_get(prefix)?;
        let id: Option<i64> = row.try_get(specimen_id_column(prefix).as_str())?;
        if let Some(name) = name {
            let locality_id = specimen.locality_id;
            specimen = specimen.identify(rank, &name, id).map_err(|e| {
                Error::Encoding(format!("specimen at locality {locality_id}: {e}"))
            })?;
        }
    }
    Ok(specimen)
}

fn visit_from_row(row: &SqliteRow) -> Result<Visit> {
    let key = VisitKey::new(
        row.try_get("location_id")?,
        row.try_get("start_epoch_day")?,
        row.try_get::<String, _>("normalized_collectors")?,
    );

    let mut tally = TaxonTally::new();
    for rank in Rank::IDENTIFIED {
        let prefix = rank.column();
        let names: Option<String> = row.try_get(names_column(prefix).as_str())?;
        let ids: Option<String> = row.try_get(ids_column(prefix).as_str())?;
        let flags: Option<String> = row.try_get(flags_column(prefix).as_str())?;
        tally.set_rank(
            rank,
            decode_rank(rank, names.as_deref(), flags.as_deref(), ids.as_deref())?,
        );
    }

    Visit::new(key, row.try_get("is_cave")?, row.try_get("end_epoch_day")?, tally)
}

fn effort_from_row(row: &SqliteRow) -> Result<Effort> {
    let mut tally = TaxonTally::new();
    for rank in Rank::ALL {
        let prefix = rank.column();
        let names: Option<String> = row.try_get(names_column(prefix).as_str())?;
        let flags: Option<String> = row.try_get(flags_column(prefix).as_str())?;
        tally.set_rank(rank, decode_rank(rank, names.as_deref(), flags.as_deref(), None)?);
    }

    Ok(Effort {
        location_id: row.try_get("location_id")?,
        is_cave: row.try_get("is_cave")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        visit_count: row.try_get("visit_count")?,
        person_visit_count: row.try_get("person_visit_count")?,
        species_count: row.try_get("species_count")?,
        is_final: row.try_get("is_final")?,
        tally,
        per_visit_points: decode_curve(&row.try_get::<String, _>("per_visit_points")?)?,
        per_person_visit_points: decode_curve(&row.try_get::<String, _>("per_person_visit_points")?)?,
    })
}

#[async_trait]
impl SpecimenSource for SqliteStore {
    async fn fetch_specimens(&self, page: PageRequest) -> Result<Vec<Specimen>> {
        let sql = format!(
            "SELECT {} FROM {SPECIMENS_TABLE} ORDER BY locality_id ASC, start_date ASC, id ASC LIMIT ? OFFSET ?",
            specimen_columns().join(", ")
        );
        let rows = sqlx::query(&sql)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(specimen_from_row).collect()
    }
}

#[async_trait]
impl VisitStore for SqliteStore {
    async fn find_visit(&self, key: &VisitKey) -> Result<Option<Visit>> {
        let sql = format!(
            "SELECT {} FROM {VISITS_TABLE} WHERE location_id = ? AND start_epoch_day = ? AND normalized_collectors = ?",
            visit_columns().join(", ")
        );
        let row = sqlx::query(&sql)
            .bind(key.location_id)
            .bind(key.start_epoch_day)
            .bind(&key.normalized_collectors)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(visit_from_row).transpose()
    }

    async fn insert_visit(&self, visit: &Visit) -> Result<()> {
        let columns = visit_columns();
        let sql = format!(
            "INSERT INTO {VISITS_TABLE} ({}) VALUES ({})",
            columns.join(", "),
            placeholders(columns.len())
        );

        let mut query = sqlx::query(&sql)
            .bind(visit.location_id())
            .bind(visit.is_cave())
            .bind(visit.start_epoch_day())
            .bind(visit.end_epoch_day())
            .bind(visit.normalized_collectors());
        for rank in Rank::IDENTIFIED {
            let tally = visit.tally().rank(rank);
            query = query
                .bind(encode_names(tally))
                .bind(encode_ids(tally))
                .bind(encode_flags(tally));
        }

        query.execute(&self.pool).await?;
        Ok(())
    }

    async fn update_visit(&self, visit: &Visit) -> Result<u64> {
        let assignments: Vec<String> = ["is_cave".to_string(), "end_epoch_day".to_string()]
            .into_iter()
            .chain(visit_rank_columns())
            .map(|c| format!("{c} = ?"))
            .collect();
        let sql = format!(
            "UPDATE {VISITS_TABLE} SET {} WHERE location_id = ? AND start_epoch_day = ? AND normalized_collectors = ?",
            assignments.join(", ")
        );

        let mut query = sqlx::query(&sql)
            .bind(visit.is_cave())
            .bind(visit.end_epoch_day());
        for rank in Rank::IDENTIFIED {
            let tally = visit.tally().rank(rank);
            query = query
                .bind(encode_names(tally))
                .bind(encode_ids(tally))
                .bind(encode_flags(tally));
        }
        let result = query
            .bind(visit.location_id())
            .bind(visit.start_epoch_day())
            .bind(visit.normalized_collectors())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn fetch_visits(&self, page: PageRequest) -> Result<Vec<Visit>> {
        let sql = format!(
            "SELECT {} FROM {VISITS_TABLE} ORDER BY location_id ASC, start_epoch_day ASC, normalized_collectors ASC LIMIT ? OFFSET ?",
            visit_columns().join(", ")
        );
        let rows = sqlx::query(&sql)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(visit_from_row).collect()
    }

    async fn clear_visits(&self) -> Result<u64> {
        let result = sqlx::query(&format!("DELETE FROM {VISITS_TABLE}"))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl EffortStore for SqliteStore {
    async fn insert_effort(&self, effort: &Effort) -> Result<()> {
        let columns = effort_columns();
        let sql = format!(
            "INSERT INTO {EFFORT_TABLE} ({}) VALUES ({})",
            columns.join(", "),
            placeholders(columns.len())
        );

        let mut query = sqlx::query(&sql)
            .bind(effort.location_id)
            .bind(effort.is_cave)
            .bind(effort.start_date)
            .bind(effort.end_date)
            .bind(effort.visit_count)
            .bind(effort.person_visit_count)
            .bind(effort.species_count)
            .bind(effort.is_final)
            .bind(encode_curve(&effort.per_visit_points)?)
            .bind(encode_curve(&effort.per_person_visit_points)?);
        for rank in Rank::ALL {
            let tally = effort.tally.rank(rank);
            query = query.bind(encode_names(tally)).bind(encode_flags(tally));
        }

        query.execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_efforts(&self, range: RichnessRange, page: PageRequest) -> Result<Vec<Effort>> {
        let sql = format!(
            "SELECT {} FROM {EFFORT_TABLE} \
             WHERE is_final = 1 AND species_count BETWEEN ? AND ? \
             ORDER BY species_count DESC, location_id ASC LIMIT ? OFFSET ?",
            effort_columns().join(", ")
        );
        let rows = sqlx::query(&sql)
            .bind(range.min)
            .bind(range.max)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(effort_from_row).collect()
    }

    async fn final_effort(&self, location_id: i64) -> Result<Option<Effort>> {
        let sql = format!(
            "SELECT {} FROM {EFFORT_TABLE} WHERE location_id = ? AND is_final = 1 ORDER BY visit_count DESC LIMIT 1",
            effort_columns().join(", ")
        );
        let row = sqlx::query(&sql)
            .bind(location_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(effort_from_row).transpose()
    }

    async fn clear_efforts(&self) -> Result<u64> {
        let result = sqlx::query(&format!("DELETE FROM {EFFORT_TABLE}"))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
