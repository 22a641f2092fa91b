use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "questiontype", rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum QuestionType {
    Mcq,
    FillInBlank,
    Short,
    VeryShort,
    Long,
    VeryLong,
    Paragraph,
    Normal,
}

impl QuestionType {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            QuestionType::Mcq => "MCQ",
            QuestionType::FillInBlank => "FILL_IN_BLANK",
            QuestionType::Short => "SHORT",
            QuestionType::VeryShort => "VERY_SHORT",
            QuestionType::Long => "LONG",
            QuestionType::VeryLong => "VERY_LONG",
            QuestionType::Paragraph => "PARAGRAPH",
            QuestionType::Normal => "NORMAL",
        }
    }

    /// Accepts the stored spelling as well as loose variants (`fill in blank`, `mcq`).
    pub(crate) fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "MCQ" => Some(QuestionType::Mcq),
            "FILL_IN_BLANK" | "FILL_IN_THE_BLANK" | "FILL" => Some(QuestionType::FillInBlank),
            "SHORT" => Some(QuestionType::Short),
            "VERY_SHORT" => Some(QuestionType::VeryShort),
            "LONG" => Some(QuestionType::Long),
            "VERY_LONG" => Some(QuestionType::VeryLong),
            "PARAGRAPH" => Some(QuestionType::Paragraph),
            "NORMAL" => Some(QuestionType::Normal),
            _ => None,
        }
    }

    /// Marks assumed for a question of this type when the source omits them.
    pub(crate) fn default_marks(self) -> f64 {
        match self {
            QuestionType::Mcq => 1.0,
            QuestionType::Long => 10.0,
            _ => 2.0,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Type,
)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "bloomlevel", rename_all = "UPPERCASE")]
pub(crate) enum BloomLevel {
    #[default]
    L1,
    L2,
    L3,
    L4,
    L5,
}

impl BloomLevel {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "L1" => Some(BloomLevel::L1),
            "L2" => Some(BloomLevel::L2),
            "L3" => Some(BloomLevel::L3),
            "L4" => Some(BloomLevel::L4),
            "L5" => Some(BloomLevel::L5),
            _ => None,
        }
    }

    pub(crate) fn parse_or_default(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }
}
