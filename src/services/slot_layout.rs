use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::db::types::{BloomLevel, QuestionType};

const MARKS_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum SlotKind {
    Single,
    OrGroup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UnitTarget {
    /// Filled from the set's rotating unit order.
    Auto,
    Unit(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TypeFilter {
    Any,
    Mixed,
    Mcq,
    Normal,
    Exact(QuestionType),
}

impl TypeFilter {
    pub(crate) fn parse(value: Option<&str>) -> Self {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return TypeFilter::Any;
        };
        match raw.to_ascii_uppercase().as_str() {
            "ANY" => TypeFilter::Any,
            "MIXED" => TypeFilter::Mixed,
            "MCQ" => TypeFilter::Mcq,
            "NORMAL" => TypeFilter::Normal,
            _ => match QuestionType::parse(raw) {
                Some(exact) => TypeFilter::Exact(exact),
                None => {
                    tracing::warn!(question_type = raw, "unknown slot question type, accepting any");
                    TypeFilter::Any
                }
            },
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TypeFilter::Any => "ANY",
            TypeFilter::Mixed => "MIXED",
            TypeFilter::Mcq => "MCQ",
            TypeFilter::Normal => "NORMAL",
            TypeFilter::Exact(kind) => kind.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) enum BloomFilter {
    #[default]
    Any,
    Levels(Vec<BloomLevel>),
}

impl BloomFilter {
    /// `ANY` anywhere in the list, or no recognizable level, means no preference.
    pub(crate) fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        if labels.iter().any(|label| label.as_ref().trim().eq_ignore_ascii_case("ANY")) {
            return BloomFilter::Any;
        }
        let mut levels: Vec<BloomLevel> =
            labels.iter().filter_map(|label| BloomLevel::parse(label.as_ref())).collect();
        levels.sort();
        levels.dedup();
        if levels.is_empty() {
            BloomFilter::Any
        } else {
            BloomFilter::Levels(levels)
        }
    }

    pub(crate) fn is_any(&self) -> bool {
        matches!(self, BloomFilter::Any)
    }
}

/// One level label or a list of them, as accepted from request JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum LevelSpec {
    One(String),
    Many(Vec<String>),
}

impl LevelSpec {
    pub(crate) fn to_filter(&self) -> BloomFilter {
        match self {
            LevelSpec::One(label) => BloomFilter::from_labels(std::slice::from_ref(label)),
            LevelSpec::Many(labels) => BloomFilter::from_labels(labels),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ChoiceSpec {
    pub(crate) label: Option<String>,
    pub(crate) manual_marks: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Slot {
    pub(crate) id: String,
    pub(crate) label: Option<String>,
    pub(crate) display_label: Option<String>,
    pub(crate) part: String,
    pub(crate) kind: SlotKind,
    pub(crate) marks: f64,
    pub(crate) unit: UnitTarget,
    pub(crate) type_filter: TypeFilter,
    pub(crate) bloom_filter: BloomFilter,
    pub(crate) co_filter: Option<String>,
    pub(crate) has_sub_questions: bool,
    pub(crate) sub_marks: Option<Vec<f64>>,
    pub(crate) choices: [ChoiceSpec; 2],
}

impl Slot {
    /// Marks of each sub-part: the manual split when given, else two halves
    /// rounded to one decimal.
    pub(crate) fn sub_split(marks: f64, manual: Option<&[f64]>) -> Vec<f64> {
        match manual.filter(|values| !values.is_empty()) {
            Some(values) => values.to_vec(),
            None => {
                let half = (marks / 2.0 * 10.0).round() / 10.0;
                vec![half, half]
            }
        }
    }
}

pub(crate) fn marks_equal(left: f64, right: f64) -> bool {
    (left - right).abs() < MARKS_EPSILON
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum LayoutError {
    #[error("Template is not a list of sections: {0}")]
    Malformed(String),
    #[error("Template slot {slot} in part {part} has no marks")]
    MissingMarks { part: String, slot: usize },
    #[error("Template contains no slots")]
    Empty,
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberLike {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<NumberLike>::deserialize(deserializer)? {
        Some(NumberLike::Number(value)) => Some(value),
        Some(NumberLike::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

/// Section of an explicit template. Accepts both the camelCase keys the
/// editor emits and snake_case spellings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct TemplateSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) part: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) title: Option<String>,
    #[serde(default, alias = "marksPerQ", deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub(crate) marks_per_q: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) count: Option<u32>,
    #[serde(default)]
    pub(crate) slots: Vec<TemplateSlot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct TemplateSlot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) label: Option<String>,
    #[serde(
        default,
        rename = "displayLabel",
        alias = "display_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) display_label: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub(crate) marks: Option<f64>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub(crate) kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) unit: Option<String>,
    #[serde(default, rename = "hasSubQuestions", alias = "has_sub_questions")]
    pub(crate) has_sub_questions: bool,
    #[serde(default, rename = "subMarks", alias = "sub_marks", skip_serializing_if = "Option::is_none")]
    pub(crate) sub_marks: Option<Vec<f64>>,
    #[serde(default, rename = "qType", alias = "q_type", alias = "question_type", skip_serializing_if = "Option::is_none")]
    pub(crate) q_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) bloom: Option<LevelSpec>,
    #[serde(default, alias = "co_id", skip_serializing_if = "Option::is_none")]
    pub(crate) co: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) choices: Vec<TemplateChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct TemplateChoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) unit: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub(crate) marks: Option<f64>,
    #[serde(default, rename = "hasSubQuestions", alias = "has_sub_questions")]
    pub(crate) has_sub_questions: bool,
    #[serde(default, rename = "qType", alias = "q_type", skip_serializing_if = "Option::is_none")]
    pub(crate) q_type: Option<String>,
    #[serde(default, rename = "manualMarks", alias = "manual_marks", skip_serializing_if = "Option::is_none")]
    pub(crate) manual_marks: Option<Vec<f64>>,
}

pub(crate) fn parse_template(value: &serde_json::Value) -> Result<Vec<TemplateSection>, LayoutError> {
    serde_json::from_value(value.clone()).map_err(|err| LayoutError::Malformed(err.to_string()))
}

fn section_part(section: &TemplateSection) -> String {
    if let Some(part) = section.part.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        return part.to_ascii_uppercase();
    }
    let title = section.title.as_deref().unwrap_or_default().to_ascii_uppercase();
    if title.contains("PART A") {
        "A".to_string()
    } else if title.contains("PART B") {
        "B".to_string()
    } else {
        "C".to_string()
    }
}

fn unit_target(value: Option<&str>) -> UnitTarget {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => UnitTarget::Auto,
        Some(v) if v.eq_ignore_ascii_case("auto") => UnitTarget::Auto,
        Some(v) => UnitTarget::Unit(v.to_string()),
    }
}

/// Flattens explicit template sections into slots in document order.
pub(crate) fn expand_template(sections: &[TemplateSection]) -> Result<Vec<Slot>, LayoutError> {
    let mut slots = Vec::new();

    for section in sections {
        let part = section_part(section);
        for (idx, raw) in section.slots.iter().enumerate() {
            let marks = raw
                .marks
                .filter(|m| *m > 0.0)
                .or(section.marks_per_q.filter(|m| *m > 0.0))
                .ok_or_else(|| LayoutError::MissingMarks { part: part.clone(), slot: idx + 1 })?;

            let kind = match raw.kind.as_deref().map(str::trim) {
                Some(kind) if kind.eq_ignore_ascii_case("OR_GROUP") || kind.eq_ignore_ascii_case("OR") => {
                    SlotKind::OrGroup
                }
                _ => SlotKind::Single,
            };

            let choice = |n: usize| {
                raw.choices
                    .get(n)
                    .map(|c| ChoiceSpec { label: c.label.clone(), manual_marks: c.manual_marks.clone() })
                    .unwrap_or_default()
            };

            slots.push(Slot {
                id: raw.id.clone().filter(|id| !id.trim().is_empty()).unwrap_or_else(|| Uuid::new_v4().to_string()),
                label: raw.label.clone(),
                display_label: raw.display_label.clone(),
                part: part.clone(),
                kind,
                marks,
                unit: unit_target(raw.unit.as_deref()),
                type_filter: TypeFilter::parse(raw.q_type.as_deref()),
                bloom_filter: raw.bloom.as_ref().map(LevelSpec::to_filter).unwrap_or_default(),
                co_filter: raw.co.clone().filter(|co| !co.trim().is_empty()),
                has_sub_questions: raw.has_sub_questions,
                sub_marks: raw.sub_marks.clone(),
                choices: [choice(0), choice(1)],
            });
        }
    }

    if slots.is_empty() {
        return Err(LayoutError::Empty);
    }
    Ok(slots)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PartAMode {
    Mcq,
    Mixed,
    Normal,
}

impl PartAMode {
    pub(crate) fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "MCQ" => PartAMode::Mcq,
            "MIXED" => PartAMode::Mixed,
            _ => PartAMode::Normal,
        }
    }
}

/// The three switches that pick a derived layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LayoutSwitches {
    pub(crate) institution_variant: bool,
    pub(crate) max_marks: f64,
    pub(crate) part_a: PartAMode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PartDimensions {
    pub(crate) count_a: u32,
    pub(crate) marks_a: f64,
    pub(crate) type_a: &'static str,
    pub(crate) count_b: u32,
    pub(crate) marks_b: f64,
}

impl LayoutSwitches {
    pub(crate) fn dimensions(&self) -> PartDimensions {
        let hundred = marks_equal(self.max_marks, 100.0);
        let mcq = self.part_a == PartAMode::Mcq;

        let count_a = match (self.institution_variant, hundred, mcq) {
            (true, _, _) => 10,
            (false, true, true) => 20,
            (false, true, false) => 10,
            (false, false, true) => 10,
            (false, false, false) => 5,
        };
        let marks_a = if self.institution_variant || !mcq { 2.0 } else { 1.0 };
        let type_a = match self.part_a {
            PartAMode::Mixed => "MIXED",
            PartAMode::Mcq => "MCQ",
            PartAMode::Normal => "NORMAL",
        };
        let (count_b, marks_b) = match (self.institution_variant, hundred) {
            (true, _) => (2, 4.0),
            (false, true) => (5, 16.0),
            (false, false) => (8, 5.0),
        };

        PartDimensions { count_a, marks_a, type_a, count_b, marks_b }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct DerivedLayout {
    pub(crate) slots: Vec<Slot>,
    /// Two-section template mirroring `slots`.
    pub(crate) template: Vec<TemplateSection>,
}

pub(crate) fn derive_layout(switches: LayoutSwitches) -> DerivedLayout {
    let dims = switches.dimensions();
    let mut slots = Vec::with_capacity((dims.count_a + dims.count_b) as usize);

    for n in 1..=dims.count_a {
        slots.push(Slot {
            id: Uuid::new_v4().to_string(),
            label: Some(n.to_string()),
            display_label: None,
            part: "A".to_string(),
            kind: SlotKind::Single,
            marks: dims.marks_a,
            unit: UnitTarget::Auto,
            type_filter: TypeFilter::parse(Some(dims.type_a)),
            bloom_filter: BloomFilter::Any,
            co_filter: None,
            has_sub_questions: false,
            sub_marks: None,
            choices: Default::default(),
        });
    }

    for i in 0..dims.count_b {
        let first = dims.count_a + 1 + i * 2;
        let second = first + 1;
        slots.push(Slot {
            id: Uuid::new_v4().to_string(),
            label: Some(first.to_string()),
            display_label: Some(format!("{first} OR {second}")),
            part: "B".to_string(),
            kind: SlotKind::OrGroup,
            marks: dims.marks_b,
            unit: UnitTarget::Auto,
            type_filter: TypeFilter::Normal,
            bloom_filter: BloomFilter::Any,
            co_filter: None,
            has_sub_questions: false,
            sub_marks: None,
            choices: [
                ChoiceSpec { label: Some(first.to_string()), manual_marks: None },
                ChoiceSpec { label: Some(second.to_string()), manual_marks: None },
            ],
        });
    }

    let section = |part: &str, marks_per_q: f64, count: u32| TemplateSection {
        part: Some(part.to_string()),
        title: Some(format!("PART {part}")),
        marks_per_q: Some(marks_per_q),
        count: Some(count),
        slots: slots.iter().filter(|slot| slot.part == part).map(template_slot).collect(),
    };
    let template = vec![section("A", dims.marks_a, dims.count_a), section("B", dims.marks_b, dims.count_b)];

    DerivedLayout { slots, template }
}

fn template_slot(slot: &Slot) -> TemplateSlot {
    let unit = match &slot.unit {
        UnitTarget::Auto => "Auto".to_string(),
        UnitTarget::Unit(id) => id.clone(),
    };
    let choices = match slot.kind {
        SlotKind::Single => Vec::new(),
        SlotKind::OrGroup => slot
            .choices
            .iter()
            .map(|choice| TemplateChoice {
                label: choice.label.clone(),
                unit: Some(unit.clone()),
                marks: Some(slot.marks),
                has_sub_questions: slot.has_sub_questions,
                q_type: Some(slot.type_filter.label().to_string()),
                manual_marks: choice.manual_marks.clone(),
            })
            .collect(),
    };

    TemplateSlot {
        id: Some(slot.id.clone()),
        label: slot.label.clone(),
        display_label: slot.display_label.clone(),
        marks: Some(slot.marks),
        kind: Some(match slot.kind {
            SlotKind::Single => "SINGLE".to_string(),
            SlotKind::OrGroup => "OR_GROUP".to_string(),
        }),
        unit: Some(unit),
        has_sub_questions: slot.has_sub_questions,
        sub_marks: slot.sub_marks.clone(),
        q_type: Some(slot.type_filter.label().to_string()),
        bloom: None,
        co: slot.co_filter.clone(),
        choices,
    }
}
