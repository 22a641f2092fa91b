use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::paper_generation::GeneratedSet;
use crate::services::slot_layout::LevelSpec;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GenerateRequest {
    #[serde(default, alias = "subjectId")]
    pub(crate) subject_id: String,
    #[serde(default)]
    pub(crate) university_id: Option<String>,
    #[serde(default)]
    pub(crate) batch_id: Option<String>,
    #[serde(default)]
    pub(crate) branch_id: Option<String>,
    #[serde(default)]
    pub(crate) exam_type: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 12, message = "semester must be between 1 and 12"))]
    pub(crate) semester: Option<i32>,
    #[serde(default)]
    pub(crate) paper_date: Option<String>,
    #[serde(default)]
    pub(crate) exam_time: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: Option<i32>,
    #[serde(default)]
    pub(crate) course_code: Option<String>,
    #[serde(default)]
    pub(crate) exam_title: Option<String>,
    #[serde(default)]
    pub(crate) instructions: Option<serde_json::Value>,
    #[serde(default)]
    pub(crate) template_id: Option<String>,
    #[serde(default)]
    pub(crate) unit_ids: Vec<String>,
    #[serde(default = "default_generation_mode")]
    pub(crate) generation_mode: String,
    #[serde(default = "default_max_marks")]
    #[validate(range(exclusive_min = 0.0, message = "max_marks must be positive"))]
    pub(crate) max_marks: f64,
    #[serde(default = "default_part_a_type")]
    pub(crate) part_a_type: String,
    #[serde(default)]
    pub(crate) sets_config: BTreeMap<String, LevelSpec>,
    #[serde(default = "default_selected_template")]
    pub(crate) selected_template: String,
    #[serde(default)]
    pub(crate) template_config: Option<serde_json::Value>,
    #[serde(default)]
    pub(crate) institution_variant: bool,
    #[serde(default = "default_set_count")]
    #[validate(range(min = 1, max = 4, message = "set_count must be between 1 and 4"))]
    pub(crate) set_count: usize,
    #[serde(default)]
    pub(crate) seed: Option<u64>,
}

fn default_generation_mode() -> String {
    "Automatic".to_string()
}

fn default_max_marks() -> f64 {
    50.0
}

fn default_part_a_type() -> String {
    "Mixed".to_string()
}

fn default_selected_template() -> String {
    "standard".to_string()
}

fn default_set_count() -> usize {
    4
}

impl GenerateRequest {
    /// Layout-relevant options stored next to the sets.
    pub(crate) fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "unit_ids": self.unit_ids,
            "generation_mode": self.generation_mode,
            "part_a_type": self.part_a_type,
            "sets_config": self.sets_config,
            "selected_template": self.selected_template,
            "exam_time": self.exam_time,
            "course_code": self.course_code,
            "exam_title": self.exam_title,
            "instructions": self.instructions,
            "seed": self.seed,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateResponse {
    pub(crate) id: String,
    pub(crate) sets: BTreeMap<String, GeneratedSet>,
    pub(crate) template_config: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct PaperResponse {
    pub(crate) id: String,
    pub(crate) university_id: Option<String>,
    pub(crate) subject_id: String,
    pub(crate) max_marks: f64,
    pub(crate) sets_data: serde_json::Value,
    pub(crate) created_at: String,
}
