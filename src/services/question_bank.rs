use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::{CourseOutcome, Question, Topic, Unit};
use crate::db::types::{BloomLevel, QuestionType};
use crate::repositories;

/// Fields of a question about to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NewQuestion {
    pub(crate) unit_id: String,
    pub(crate) topic_id: Option<String>,
    pub(crate) co_id: Option<String>,
    pub(crate) text: String,
    pub(crate) marks: f64,
    pub(crate) question_type: QuestionType,
    pub(crate) bloom_level: BloomLevel,
    pub(crate) options: Vec<String>,
    pub(crate) answer_key: String,
    pub(crate) image_url: Option<String>,
}

/// Persistence contract the ingestion and generation pipelines depend on.
#[async_trait]
pub(crate) trait QuestionBankStore: Send + Sync {
    async fn fetch_questions_for_subject(&self, subject_id: &str) -> anyhow::Result<Vec<Question>>;

    async fn fetch_units(&self, subject_id: &str) -> anyhow::Result<Vec<Unit>>;

    async fn create_unit(&self, subject_id: &str, number: i32, name: &str)
        -> anyhow::Result<Unit>;

    async fn fetch_topics(&self, subject_id: &str) -> anyhow::Result<Vec<Topic>>;

    async fn create_topic(&self, unit_id: &str, name: &str) -> anyhow::Result<Topic>;

    async fn create_question(&self, question: NewQuestion) -> anyhow::Result<Question>;

    async fn fetch_course_outcomes(&self, subject_id: &str) -> anyhow::Result<Vec<CourseOutcome>>;
}

#[derive(Clone)]
pub(crate) struct PgQuestionBank {
    pool: PgPool,
}

impl PgQuestionBank {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionBankStore for PgQuestionBank {
    async fn fetch_questions_for_subject(&self, subject_id: &str) -> anyhow::Result<Vec<Question>> {
        repositories::questions::list_for_subject(&self.pool, subject_id)
            .await
            .with_context(|| format!("failed to load question pool for subject {subject_id}"))
    }

    async fn fetch_units(&self, subject_id: &str) -> anyhow::Result<Vec<Unit>> {
        repositories::units::list_for_subject(&self.pool, subject_id)
            .await
            .with_context(|| format!("failed to load units for subject {subject_id}"))
    }

    async fn create_unit(
        &self,
        subject_id: &str,
        number: i32,
        name: &str,
    ) -> anyhow::Result<Unit> {
        repositories::units::create(
            &self.pool,
            repositories::units::CreateUnit {
                id: &Uuid::new_v4().to_string(),
                subject_id,
                unit_number: number,
                name,
                created_at: primitive_now_utc(),
            },
        )
        .await
        .with_context(|| format!("failed to create unit {number} for subject {subject_id}"))
    }

    async fn fetch_topics(&self, subject_id: &str) -> anyhow::Result<Vec<Topic>> {
        repositories::topics::list_for_subject(&self.pool, subject_id)
            .await
            .with_context(|| format!("failed to load topics for subject {subject_id}"))
    }

    async fn create_topic(&self, unit_id: &str, name: &str) -> anyhow::Result<Topic> {
        repositories::topics::create(
            &self.pool,
            repositories::topics::CreateTopic {
                id: &Uuid::new_v4().to_string(),
                unit_id,
                name,
                created_at: primitive_now_utc(),
            },
        )
        .await
        .with_context(|| format!("failed to create topic '{name}'"))
    }

    async fn create_question(&self, question: NewQuestion) -> anyhow::Result<Question> {
        repositories::questions::create(
            &self.pool,
            repositories::questions::CreateQuestion {
                id: &Uuid::new_v4().to_string(),
                unit_id: &question.unit_id,
                topic_id: question.topic_id.as_deref(),
                co_id: question.co_id.as_deref(),
                question_text: &question.text,
                marks: question.marks,
                question_type: question.question_type,
                bloom_level: question.bloom_level,
                options: &question.options,
                answer_key: &question.answer_key,
                image_url: question.image_url.as_deref(),
                created_at: primitive_now_utc(),
            },
        )
        .await
        .context("failed to store question")
    }

    async fn fetch_course_outcomes(&self, subject_id: &str) -> anyhow::Result<Vec<CourseOutcome>> {
        repositories::course_outcomes::list_for_subject(&self.pool, subject_id)
            .await
            .with_context(|| format!("failed to load course outcomes for subject {subject_id}"))
    }
}

/// Units, topics and course-outcome codes of one subject, loaded once per
/// ingestion run and extended as units/topics are created lazily.
#[derive(Debug, Clone)]
pub(crate) struct BankCatalog {
    subject_id: String,
    units: Vec<Unit>,
    topics: Vec<Topic>,
    outcome_ids: HashMap<String, String>,
}

impl BankCatalog {
    pub(crate) async fn load(
        store: &dyn QuestionBankStore,
        subject_id: &str,
    ) -> anyhow::Result<Self> {
        let mut units = store.fetch_units(subject_id).await?;
        units.sort_by_key(|unit| unit.unit_number);
        let topics = store.fetch_topics(subject_id).await?;
        let outcome_ids = store
            .fetch_course_outcomes(subject_id)
            .await?
            .into_iter()
            .map(|outcome| (outcome.code.trim().to_ascii_uppercase(), outcome.id))
            .collect();

        Ok(Self { subject_id: subject_id.to_string(), units, topics, outcome_ids })
    }

    pub(crate) fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Lowest-numbered unit of the subject, if any exists yet.
    pub(crate) fn first_unit_id(&self) -> Option<&str> {
        self.units.first().map(|unit| unit.id.as_str())
    }

    pub(crate) fn has_unit(&self, unit_id: &str) -> bool {
        self.units.iter().any(|unit| unit.id == unit_id)
    }

    /// Returns the id of unit `number`, creating `"Unit {number}"` when absent.
    pub(crate) async fn resolve_unit(
        &mut self,
        store: &dyn QuestionBankStore,
        number: i32,
    ) -> anyhow::Result<String> {
        if let Some(unit) = self.units.iter().find(|unit| unit.unit_number == number) {
            return Ok(unit.id.clone());
        }

        let unit = store.create_unit(&self.subject_id, number, &format!("Unit {number}")).await?;
        tracing::debug!(subject_id = %self.subject_id, unit_number = number, "created unit");
        let id = unit.id.clone();
        self.units.push(unit);
        Ok(id)
    }

    /// Returns the id of the topic named `name` (case-insensitive) under `unit_id`,
    /// creating it when absent.
    pub(crate) async fn resolve_topic(
        &mut self,
        store: &dyn QuestionBankStore,
        unit_id: &str,
        name: &str,
    ) -> anyhow::Result<String> {
        let name = name.trim();
        let wanted = name.to_lowercase();
        if let Some(topic) = self
            .topics
            .iter()
            .find(|topic| topic.unit_id == unit_id && topic.name.to_lowercase() == wanted)
        {
            return Ok(topic.id.clone());
        }

        let topic = store.create_topic(unit_id, name).await?;
        tracing::debug!(unit_id, topic = name, "created topic");
        let id = topic.id.clone();
        self.topics.push(topic);
        Ok(id)
    }

    pub(crate) fn course_outcome_id(&self, code: &str) -> Option<String> {
        let code = code.trim().to_ascii_uppercase();
        if code.is_empty() {
            return None;
        }
        self.outcome_ids.get(&code).cloned()
    }
}
