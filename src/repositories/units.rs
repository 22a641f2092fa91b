use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Unit;

pub(crate) const COLUMNS: &str = "id, subject_id, unit_number, name, created_at";

pub(crate) async fn list_for_subject(
    pool: &PgPool,
    subject_id: &str,
) -> Result<Vec<Unit>, sqlx::Error> {
    sqlx::query_as::<_, Unit>(&format!(
        "SELECT {COLUMNS}
         FROM assessment_units
         WHERE subject_id = $1
         ORDER BY unit_number ASC"
    ))
    .bind(subject_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateUnit<'a> {
    pub(crate) id: &'a str,
    pub(crate) subject_id: &'a str,
    pub(crate) unit_number: i32,
    pub(crate) name: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Inserts the unit or returns the row already holding `(subject_id, unit_number)`.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateUnit<'_>,
) -> Result<Unit, sqlx::Error> {
    sqlx::query_as::<_, Unit>(&format!(
        "INSERT INTO assessment_units (id, subject_id, unit_number, name, created_at)
         VALUES ($1,$2,$3,$4,$5)
         ON CONFLICT (subject_id, unit_number) DO UPDATE SET
            name = assessment_units.name
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.subject_id)
    .bind(params.unit_number)
    .bind(params.name)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}
