use sqlx::PgPool;

use crate::db::models::CourseOutcome;

pub(crate) async fn list_for_subject(
    pool: &PgPool,
    subject_id: &str,
) -> Result<Vec<CourseOutcome>, sqlx::Error> {
    sqlx::query_as::<_, CourseOutcome>(
        "SELECT id, subject_id, code, description
         FROM assessment_course_outcomes
         WHERE subject_id = $1
         ORDER BY code",
    )
    .bind(subject_id)
    .fetch_all(pool)
    .await
}
