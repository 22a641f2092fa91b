//! Multi-set paper generation.
//!
//! One request produces up to four parallel sets (A-D) from a single shuffled
//! pool. Sets are filled strictly in label order: every pick lands in a
//! request-wide exclusion set, so later sets prefer questions earlier sets did
//! not use. Slots that cannot be filled stay empty instead of failing the run.

mod selection;

use std::collections::{BTreeMap, HashSet};

use anyhow::Context;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;

use crate::db::models::Question;
use crate::services::question_bank::QuestionBankStore;
use crate::services::slot_layout::{
    derive_layout, expand_template, parse_template, BloomFilter, LayoutError, LayoutSwitches, Slot,
    SlotKind, UnitTarget,
};

pub(crate) use selection::{PickRequest, PickedQuestion, SetPicker};

pub(crate) const SET_LABELS: [&str; 4] = ["A", "B", "C", "D"];

#[derive(Debug, thiserror::Error)]
pub(crate) enum GenerationError {
    #[error("Subject ID is required")]
    MissingSubject,
    #[error("No questions found for subject {subject_id}. Please upload questions first.")]
    EmptyPool { subject_id: String },
    #[error(transparent)]
    InvalidTemplate(#[from] LayoutError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Request-wide selection state shared by every set.
#[derive(Debug, Default)]
pub(crate) struct SelectionContext {
    pub(crate) globally_excluded: HashSet<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct GenerationInput {
    pub(crate) subject_id: String,
    pub(crate) unit_ids: Vec<String>,
    /// Author-supplied sections; when present they replace the derived layout.
    pub(crate) explicit_template: Option<Value>,
    pub(crate) layout: LayoutSwitches,
    pub(crate) sets_config: BTreeMap<String, BloomFilter>,
    pub(crate) set_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ChoiceFill {
    pub(crate) questions: Vec<PickedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum FilledSlot {
    Single {
        id: String,
        part: String,
        marks: f64,
        questions: Vec<PickedQuestion>,
    },
    OrGroup {
        id: String,
        part: String,
        choice1: ChoiceFill,
        choice2: ChoiceFill,
    },
}

impl FilledSlot {
    pub(crate) fn part(&self) -> &str {
        match self {
            FilledSlot::Single { part, .. } | FilledSlot::OrGroup { part, .. } => part,
        }
    }

    /// Every picked question in slot order, both alternatives included.
    pub(crate) fn questions(&self) -> impl Iterator<Item = &PickedQuestion> {
        let (first, second): (&[PickedQuestion], &[PickedQuestion]) = match self {
            FilledSlot::Single { questions, .. } => (questions.as_slice(), &[]),
            FilledSlot::OrGroup { choice1, choice2, .. } => {
                (choice1.questions.as_slice(), choice2.questions.as_slice())
            }
        };
        first.iter().chain(second.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct GeneratedSet {
    pub(crate) questions: Vec<FilledSlot>,
}

#[derive(Debug, Clone)]
pub(crate) struct GeneratedPaper {
    pub(crate) sets: BTreeMap<String, GeneratedSet>,
    /// The layout actually used, in the explicit template JSON shape.
    pub(crate) template: Value,
    pub(crate) empty_picks: usize,
}

fn resolve_layout(input: &GenerationInput) -> Result<(Vec<Slot>, Value), GenerationError> {
    match &input.explicit_template {
        Some(value) => {
            let sections = parse_template(value)?;
            Ok((expand_template(&sections)?, value.clone()))
        }
        None => {
            let derived = derive_layout(input.layout);
            let template =
                serde_json::to_value(&derived.template).context("failed to render derived template")?;
            Ok((derived.slots, template))
        }
    }
}

pub(crate) async fn generate<R: Rng + Send>(
    store: &dyn QuestionBankStore,
    input: GenerationInput,
    rng: &mut R,
) -> Result<GeneratedPaper, GenerationError> {
    if input.subject_id.trim().is_empty() {
        return Err(GenerationError::MissingSubject);
    }

    let (slots, template) = resolve_layout(&input)?;

    let pool = store.fetch_questions_for_subject(&input.subject_id).await?;
    if pool.is_empty() {
        return Err(GenerationError::EmptyPool { subject_id: input.subject_id });
    }

    let (sets, empty_picks) = fill_sets(pool, &slots, &input, rng);

    metrics::counter!("assessment_papers_generated_total").increment(1);
    metrics::counter!("assessment_slot_picks_empty_total").increment(empty_picks as u64);

    if empty_picks > 0 {
        tracing::warn!(
            subject_id = %input.subject_id,
            empty_picks,
            "question bank too small for the requested layout"
        );
    }
    tracing::info!(
        subject_id = %input.subject_id,
        sets = sets.len(),
        slots = slots.len(),
        "paper sets generated"
    );

    Ok(GeneratedPaper { sets, template, empty_picks })
}

fn fill_sets<R: Rng>(
    mut pool: Vec<Question>,
    slots: &[Slot],
    input: &GenerationInput,
    rng: &mut R,
) -> (BTreeMap<String, GeneratedSet>, usize) {
    let first_pool_unit = pool.first().map(|question| question.unit_id.clone());
    pool.shuffle(rng);

    let mut context = SelectionContext::default();
    let mut sets = BTreeMap::new();
    let mut empty_picks = 0;

    for label in SET_LABELS.iter().take(input.set_count.clamp(1, SET_LABELS.len())) {
        let mut unit_order = input.unit_ids.clone();
        unit_order.shuffle(rng);
        let set_bloom = input.sets_config.get(*label).cloned().unwrap_or_default();

        let mut picker = SetPicker::new(&pool, &mut context.globally_excluded, &mut *rng);
        let mut auto_counter = 0usize;
        let mut filled = Vec::with_capacity(slots.len());

        for slot in slots {
            let unit_id = match &slot.unit {
                UnitTarget::Unit(id) => Some(id.clone()),
                UnitTarget::Auto => {
                    let next = (!unit_order.is_empty())
                        .then(|| unit_order[auto_counter % unit_order.len()].clone());
                    auto_counter += 1;
                    next.or_else(|| first_pool_unit.clone())
                }
            };

            let bloom = if slot.bloom_filter.is_any() { &set_bloom } else { &slot.bloom_filter };
            let request = PickRequest {
                target_marks: slot.marks,
                unit_id: unit_id.as_deref(),
                type_filter: &slot.type_filter,
                bloom,
                co_filter: slot.co_filter.as_deref(),
            };
            let split = |manual: Option<&[f64]>| {
                slot.has_sub_questions.then(|| Slot::sub_split(slot.marks, manual))
            };

            filled.push(match slot.kind {
                SlotKind::Single => FilledSlot::Single {
                    id: slot.id.clone(),
                    part: slot.part.clone(),
                    marks: slot.marks,
                    questions: picker.pick_choice(&request, split(slot.sub_marks.as_deref())),
                },
                SlotKind::OrGroup => {
                    let [first, second] = &slot.choices;
                    let choice1 = picker.pick_choice(&request, split(first.manual_marks.as_deref()));
                    let choice2 = picker.pick_choice(&request, split(second.manual_marks.as_deref()));
                    FilledSlot::OrGroup {
                        id: slot.id.clone(),
                        part: slot.part.clone(),
                        choice1: ChoiceFill { questions: choice1 },
                        choice2: ChoiceFill { questions: choice2 },
                    }
                }
            });
        }

        tracing::debug!(set = *label, empty_picks = picker.empty_picks(), "set filled");
        empty_picks += picker.empty_picks();
        sets.insert(label.to_string(), GeneratedSet { questions: filled });
    }

    (sets, empty_picks)
}

/// Stored form of a paper: one key per set label plus a `metadata` object.
pub(crate) fn assemble_sets_data(
    sets: &BTreeMap<String, GeneratedSet>,
    metadata: Value,
) -> serde_json::Result<Value> {
    let mut data = serde_json::to_value(sets)?;
    if let Value::Object(map) = &mut data {
        map.insert("metadata".to_string(), metadata);
    }
    Ok(data)
}
