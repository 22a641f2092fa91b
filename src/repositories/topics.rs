use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Topic;

pub(crate) async fn list_for_subject(
    pool: &PgPool,
    subject_id: &str,
) -> Result<Vec<Topic>, sqlx::Error> {
    sqlx::query_as::<_, Topic>(
        "SELECT t.id, t.unit_id, t.name, t.created_at
         FROM assessment_topics t
         JOIN assessment_units u ON u.id = t.unit_id
         WHERE u.subject_id = $1
         ORDER BY t.created_at",
    )
    .bind(subject_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateTopic<'a> {
    pub(crate) id: &'a str,
    pub(crate) unit_id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateTopic<'_>,
) -> Result<Topic, sqlx::Error> {
    sqlx::query_as::<_, Topic>(
        "INSERT INTO assessment_topics (id, unit_id, name, created_at)
         VALUES ($1,$2,$3,$4)
         ON CONFLICT (unit_id, (lower(name))) DO UPDATE SET
            name = assessment_topics.name
         RETURNING id, unit_id, name, created_at",
    )
    .bind(params.id)
    .bind(params.unit_id)
    .bind(params.name)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}
