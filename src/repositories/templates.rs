use sqlx::types::Json as SqlxJson;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::AssessmentTemplate;

pub(crate) const COLUMNS: &str =
    "id, university_id, name, exam_type, max_marks, config, created_at, updated_at";

pub(crate) async fn list_for_university(
    pool: &PgPool,
    university_id: &str,
) -> Result<Vec<AssessmentTemplate>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentTemplate>(&format!(
        "SELECT {COLUMNS}
         FROM assessment_templates
         WHERE university_id = $1
         ORDER BY created_at DESC"
    ))
    .bind(university_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    template_id: &str,
) -> Result<Option<AssessmentTemplate>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentTemplate>(&format!(
        "SELECT {COLUMNS}
         FROM assessment_templates
         WHERE id = $1"
    ))
    .bind(template_id)
    .fetch_optional(pool)
    .await
}

pub(crate) struct CreateTemplate<'a> {
    pub(crate) id: &'a str,
    pub(crate) university_id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) exam_type: Option<&'a str>,
    pub(crate) max_marks: Option<f64>,
    pub(crate) config: serde_json::Value,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateTemplate<'_>,
) -> Result<AssessmentTemplate, sqlx::Error> {
    sqlx::query_as::<_, AssessmentTemplate>(&format!(
        "INSERT INTO assessment_templates (
            id, university_id, name, exam_type, max_marks, config, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.university_id)
    .bind(params.name)
    .bind(params.exam_type)
    .bind(params.max_marks)
    .bind(SqlxJson(params.config))
    .bind(params.now)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) struct UpdateTemplate<'a> {
    pub(crate) name: Option<&'a str>,
    pub(crate) exam_type: Option<&'a str>,
    pub(crate) max_marks: Option<f64>,
    pub(crate) config: Option<serde_json::Value>,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    template_id: &str,
    params: UpdateTemplate<'_>,
) -> Result<Option<AssessmentTemplate>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentTemplate>(&format!(
        "UPDATE assessment_templates
         SET name = COALESCE($2, name),
             exam_type = COALESCE($3, exam_type),
             max_marks = COALESCE($4, max_marks),
             config = COALESCE($5, config),
             updated_at = $6
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(template_id)
    .bind(params.name)
    .bind(params.exam_type)
    .bind(params.max_marks)
    .bind(params.config.map(SqlxJson))
    .bind(params.now)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, template_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM assessment_templates WHERE id = $1")
        .bind(template_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
