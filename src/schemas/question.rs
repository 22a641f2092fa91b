use serde::{Deserialize, Serialize};

use crate::db::types::{BloomLevel, QuestionType};

#[derive(Debug, Serialize)]
pub(crate) struct UploadResponse {
    pub(crate) status: &'static str,
    pub(crate) source: &'static str,
    pub(crate) count: usize,
    pub(crate) skipped: usize,
    pub(crate) answer_keys_resolved: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuestionsQuery {
    #[serde(default, alias = "unitId")]
    pub(crate) unit_id: Option<String>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) unit_id: String,
    pub(crate) unit_number: i32,
    pub(crate) topic: Option<String>,
    pub(crate) question_text: String,
    pub(crate) marks: f64,
    pub(crate) question_type: QuestionType,
    pub(crate) bloom_level: BloomLevel,
    pub(crate) options: Vec<String>,
    pub(crate) answer_key: String,
}
