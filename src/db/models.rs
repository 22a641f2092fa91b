use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{BloomLevel, QuestionType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Unit {
    pub(crate) id: String,
    pub(crate) subject_id: String,
    pub(crate) unit_number: i32,
    pub(crate) name: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Topic {
    pub(crate) id: String,
    pub(crate) unit_id: String,
    pub(crate) name: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct CourseOutcome {
    pub(crate) id: String,
    pub(crate) subject_id: String,
    pub(crate) code: String,
    pub(crate) description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) unit_id: String,
    pub(crate) topic_id: Option<String>,
    pub(crate) co_id: Option<String>,
    pub(crate) question_text: String,
    pub(crate) marks: f64,
    pub(crate) question_type: QuestionType,
    pub(crate) bloom_level: BloomLevel,
    pub(crate) options: Json<Vec<String>>,
    pub(crate) answer_key: String,
    pub(crate) image_url: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AssessmentPaper {
    pub(crate) id: String,
    pub(crate) university_id: Option<String>,
    pub(crate) subject_id: String,
    pub(crate) max_marks: f64,
    pub(crate) sets_data: Json<serde_json::Value>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AssessmentTemplate {
    pub(crate) id: String,
    pub(crate) university_id: String,
    pub(crate) name: String,
    pub(crate) exam_type: Option<String>,
    pub(crate) max_marks: Option<f64>,
    pub(crate) config: Json<serde_json::Value>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
