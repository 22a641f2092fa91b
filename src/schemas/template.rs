use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize)]
pub(crate) struct TemplateListQuery {
    #[serde(default, alias = "universityId")]
    pub(crate) university_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TemplateCreate {
    #[validate(length(min = 1, max = 200, message = "name must be 1..200 characters"))]
    pub(crate) name: String,
    #[serde(alias = "universityId")]
    #[validate(length(min = 1, message = "university_id must not be empty"))]
    pub(crate) university_id: String,
    #[serde(default, alias = "examType")]
    pub(crate) exam_type: Option<String>,
    #[serde(default, alias = "maxMarks")]
    #[validate(range(exclusive_min = 0.0, message = "max_marks must be positive"))]
    pub(crate) max_marks: Option<f64>,
    #[serde(default = "empty_sections", alias = "sections")]
    pub(crate) config: serde_json::Value,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TemplateUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "name must be 1..200 characters"))]
    pub(crate) name: Option<String>,
    #[serde(default, alias = "examType")]
    pub(crate) exam_type: Option<String>,
    #[serde(default, alias = "maxMarks")]
    #[validate(range(exclusive_min = 0.0, message = "max_marks must be positive"))]
    pub(crate) max_marks: Option<f64>,
    #[serde(default, alias = "sections")]
    pub(crate) config: Option<serde_json::Value>,
}

fn empty_sections() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

#[derive(Debug, Serialize)]
pub(crate) struct TemplateResponse {
    pub(crate) id: String,
    pub(crate) university_id: String,
    pub(crate) name: String,
    pub(crate) exam_type: Option<String>,
    pub(crate) max_marks: Option<f64>,
    pub(crate) config: serde_json::Value,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}
