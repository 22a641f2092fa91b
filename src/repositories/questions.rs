use sqlx::types::Json as SqlxJson;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Question;
use crate::db::types::{BloomLevel, QuestionType};

pub(crate) const COLUMNS: &str = "\
    q.id, q.unit_id, q.topic_id, q.co_id, q.question_text, q.marks, q.question_type, \
    q.bloom_level, q.options, q.answer_key, q.image_url, q.created_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct QuestionListRow {
    pub(crate) id: String,
    pub(crate) unit_id: String,
    pub(crate) unit_number: i32,
    pub(crate) topic_name: Option<String>,
    pub(crate) question_text: String,
    pub(crate) marks: f64,
    pub(crate) question_type: QuestionType,
    pub(crate) bloom_level: BloomLevel,
    pub(crate) options: SqlxJson<Vec<String>>,
    pub(crate) answer_key: String,
    pub(crate) total_count: i64,
}

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) unit_id: &'a str,
    pub(crate) topic_id: Option<&'a str>,
    pub(crate) co_id: Option<&'a str>,
    pub(crate) question_text: &'a str,
    pub(crate) marks: f64,
    pub(crate) question_type: QuestionType,
    pub(crate) bloom_level: BloomLevel,
    pub(crate) options: &'a [String],
    pub(crate) answer_key: &'a str,
    pub(crate) image_url: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(
        "INSERT INTO assessment_questions (
            id, unit_id, topic_id, co_id, question_text, marks, question_type, bloom_level,
            options, answer_key, image_url, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
         RETURNING id, unit_id, topic_id, co_id, question_text, marks, question_type,
                   bloom_level, options, answer_key, image_url, created_at",
    )
    .bind(params.id)
    .bind(params.unit_id)
    .bind(params.topic_id)
    .bind(params.co_id)
    .bind(params.question_text)
    .bind(params.marks)
    .bind(params.question_type)
    .bind(params.bloom_level)
    .bind(SqlxJson(params.options))
    .bind(params.answer_key)
    .bind(params.image_url)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

/// Whole pool for a subject, the input of paper generation.
pub(crate) async fn list_for_subject(
    pool: &PgPool,
    subject_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS}
         FROM assessment_questions q
         JOIN assessment_units u ON u.id = q.unit_id
         WHERE u.subject_id = $1
         ORDER BY u.unit_number, q.created_at, q.id"
    ))
    .bind(subject_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct ListQuestionsParams {
    pub(crate) subject_id: String,
    pub(crate) unit_id: Option<String>,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

pub(crate) async fn list_page(
    pool: &PgPool,
    params: ListQuestionsParams,
) -> Result<Vec<QuestionListRow>, sqlx::Error> {
    sqlx::query_as::<_, QuestionListRow>(
        "SELECT q.id,
                q.unit_id,
                u.unit_number,
                t.name AS topic_name,
                q.question_text,
                q.marks,
                q.question_type,
                q.bloom_level,
                q.options,
                q.answer_key,
                COUNT(*) OVER() AS total_count
         FROM assessment_questions q
         JOIN assessment_units u ON u.id = q.unit_id
         LEFT JOIN assessment_topics t ON t.id = q.topic_id
         WHERE u.subject_id = $1
           AND ($2::varchar IS NULL OR q.unit_id = $2)
         ORDER BY u.unit_number, q.created_at, q.id
         OFFSET $3
         LIMIT $4",
    )
    .bind(params.subject_id)
    .bind(params.unit_id)
    .bind(params.skip.max(0))
    .bind(params.limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}
