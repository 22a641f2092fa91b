use sqlx::types::Json as SqlxJson;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::AssessmentPaper;

pub(crate) struct CreatePaper<'a> {
    pub(crate) id: &'a str,
    pub(crate) university_id: Option<&'a str>,
    pub(crate) batch_id: Option<&'a str>,
    pub(crate) branch_id: Option<&'a str>,
    pub(crate) subject_id: &'a str,
    pub(crate) exam_type: Option<&'a str>,
    pub(crate) semester: Option<i32>,
    pub(crate) paper_date: Option<&'a str>,
    pub(crate) duration_minutes: Option<i32>,
    pub(crate) max_marks: f64,
    pub(crate) sets_data: serde_json::Value,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreatePaper<'_>,
) -> Result<String, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO assessment_papers (
            id, university_id, batch_id, branch_id, subject_id, exam_type, semester,
            paper_date, duration_minutes, max_marks, sets_data, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
         RETURNING id",
    )
    .bind(params.id)
    .bind(params.university_id)
    .bind(params.batch_id)
    .bind(params.branch_id)
    .bind(params.subject_id)
    .bind(params.exam_type)
    .bind(params.semester)
    .bind(params.paper_date)
    .bind(params.duration_minutes)
    .bind(params.max_marks)
    .bind(SqlxJson(params.sets_data))
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    paper_id: &str,
) -> Result<Option<AssessmentPaper>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentPaper>(
        "SELECT id, university_id, subject_id, max_marks, sets_data, created_at
         FROM assessment_papers
         WHERE id = $1",
    )
    .bind(paper_id)
    .fetch_optional(pool)
    .await
}
