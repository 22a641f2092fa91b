use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::db::models::Question;
use crate::db::types::{BloomLevel, QuestionType};
use crate::services::slot_layout::{marks_equal, BloomFilter, TypeFilter};

/// Question snapshot stored in a generated set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct PickedQuestion {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) marks: f64,
    pub(crate) bloom: BloomLevel,
    pub(crate) co_id: Option<String>,
    pub(crate) unit_id: String,
    #[serde(rename = "type")]
    pub(crate) question_type: QuestionType,
    pub(crate) options: Vec<String>,
    pub(crate) image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) sub_label: Option<String>,
}

impl PickedQuestion {
    fn snapshot(question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            text: question.question_text.clone(),
            marks: question.marks,
            bloom: question.bloom_level,
            co_id: question.co_id.clone(),
            unit_id: question.unit_id.clone(),
            question_type: question.question_type,
            options: question.options.0.clone(),
            image_url: question.image_url.clone(),
            sub_label: None,
        }
    }
}

/// Constraints of a single pick.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PickRequest<'a> {
    pub(crate) target_marks: f64,
    pub(crate) unit_id: Option<&'a str>,
    pub(crate) type_filter: &'a TypeFilter,
    pub(crate) bloom: &'a BloomFilter,
    pub(crate) co_filter: Option<&'a str>,
}

/// Blank-fill markers or options make a question usable as a short objective item.
pub(crate) fn looks_short_or_mcq(question: &Question) -> bool {
    let text = question.question_text.to_lowercase();
    text.contains("___") || text.contains("....") || !question.options.0.is_empty()
}

pub(crate) fn type_accepts(filter: &TypeFilter, question: &Question, target_marks: f64) -> bool {
    match filter {
        TypeFilter::Any => true,
        TypeFilter::Mixed => {
            matches!(
                question.question_type,
                QuestionType::Mcq
                    | QuestionType::FillInBlank
                    | QuestionType::VeryShort
                    | QuestionType::Short
                    | QuestionType::Long
                    | QuestionType::VeryLong
                    | QuestionType::Paragraph
            ) || looks_short_or_mcq(question)
        }
        TypeFilter::Mcq => question.question_type == QuestionType::Mcq || looks_short_or_mcq(question),
        TypeFilter::Normal if target_marks < 5.0 => {
            !matches!(question.question_type, QuestionType::Mcq | QuestionType::FillInBlank)
                && !looks_short_or_mcq(question)
        }
        TypeFilter::Normal => question.question_type == QuestionType::Normal,
        TypeFilter::Exact(kind) => question.question_type == *kind,
    }
}

/// Keeps `preferred` members when any exist, otherwise leaves `candidates` alone.
fn prefer<'q>(candidates: Vec<&'q Question>, keep: impl Fn(&Question) -> bool) -> Vec<&'q Question> {
    let preferred: Vec<&Question> = candidates.iter().copied().filter(|q| keep(*q)).collect();
    if preferred.is_empty() {
        candidates
    } else {
        preferred
    }
}

/// Picks questions for one set. Exclusions recorded here also feed the
/// request-wide `globally_excluded` set.
pub(crate) struct SetPicker<'a, R: Rng> {
    pool: &'a [Question],
    globally_excluded: &'a mut HashSet<String>,
    excluded_in_set: HashSet<String>,
    rng: &'a mut R,
    empty_picks: usize,
}

impl<'a, R: Rng> SetPicker<'a, R> {
    pub(crate) fn new(pool: &'a [Question], globally_excluded: &'a mut HashSet<String>, rng: &'a mut R) -> Self {
        Self { pool, globally_excluded, excluded_in_set: HashSet::new(), rng, empty_picks: 0 }
    }

    pub(crate) fn empty_picks(&self) -> usize {
        self.empty_picks
    }

    /// Candidate list for one stage. Novelty first, then marks, type, bloom
    /// and course outcome; bloom and outcome never empty the list.
    pub(crate) fn filter_candidates(
        &mut self,
        base: Vec<&'a Question>,
        request: &PickRequest<'_>,
        strict_marks: bool,
    ) -> Vec<&'a Question> {
        let unused_anywhere: Vec<&Question> = base
            .iter()
            .copied()
            .filter(|q| !self.excluded_in_set.contains(&q.id) && !self.globally_excluded.contains(&q.id))
            .collect();
        let mut candidates = if unused_anywhere.is_empty() {
            base.into_iter().filter(|q| !self.excluded_in_set.contains(&q.id)).collect()
        } else {
            unused_anywhere
        };

        candidates.shuffle(&mut *self.rng);

        if strict_marks {
            let exact: Vec<&Question> =
                candidates.iter().copied().filter(|q| marks_equal(q.marks, request.target_marks)).collect();
            if !exact.is_empty() {
                candidates = exact;
            } else {
                let near: Vec<&Question> = candidates
                    .iter()
                    .copied()
                    .filter(|q| (q.marks - request.target_marks).abs() <= 1.0 + 1e-9)
                    .collect();
                if !near.is_empty() {
                    candidates = near;
                }
            }
        }

        candidates.retain(|q| type_accepts(request.type_filter, q, request.target_marks));

        if let BloomFilter::Levels(levels) = request.bloom {
            candidates = prefer(candidates, |q| levels.contains(&q.bloom_level));
        }

        if let Some(co) = request.co_filter {
            candidates = prefer(candidates, |q| q.co_id.as_deref() == Some(co));
        }

        candidates
    }

    /// Runs the four-stage unit/marks relaxation and records the winner.
    pub(crate) fn pick(&mut self, request: &PickRequest<'_>) -> Option<PickedQuestion> {
        let pool = self.pool;
        let mut stages: Vec<(Vec<&'a Question>, bool)> = Vec::with_capacity(4);
        if let Some(unit_id) = request.unit_id {
            let in_unit: Vec<&Question> = pool.iter().filter(|q| q.unit_id == unit_id).collect();
            stages.push((in_unit.clone(), true));
            stages.push((in_unit, false));
        }
        stages.push((pool.iter().collect(), true));
        stages.push((pool.iter().collect(), false));

        for (base, strict_marks) in stages {
            let candidates = self.filter_candidates(base, request, strict_marks);
            if let Some(&chosen) = candidates.choose(&mut *self.rng) {
                self.excluded_in_set.insert(chosen.id.clone());
                self.globally_excluded.insert(chosen.id.clone());
                return Some(PickedQuestion::snapshot(chosen));
            }
        }

        self.empty_picks += 1;
        None
    }

    /// Fills one choice: a single pick, or labeled sub-parts `(a)`, `(b)`, ...
    pub(crate) fn pick_choice(&mut self, request: &PickRequest<'_>, sub_marks: Option<Vec<f64>>) -> Vec<PickedQuestion> {
        let Some(split) = sub_marks else {
            return self.pick(request).into_iter().collect();
        };

        let mut picked = Vec::with_capacity(split.len());
        for (idx, marks) in split.into_iter().enumerate() {
            let sub_request = PickRequest { target_marks: marks, ..*request };
            if let Some(mut question) = self.pick(&sub_request) {
                question.sub_label = Some(format!("({})", sub_label(idx)));
                picked.push(question);
            }
        }
        picked
    }
}

fn sub_label(idx: usize) -> char {
    char::from(b'a' + (idx % 26) as u8)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::test_support::question;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn request<'a>(marks: f64, unit: Option<&'a str>, filter: &'a TypeFilter, bloom: &'a BloomFilter) -> PickRequest<'a> {
        PickRequest { target_marks: marks, unit_id: unit, type_filter: filter, bloom, co_filter: None }
    }

    #[test]
    fn heuristic_detects_blanks_and_options() {
        let blank = question("q1", "u1", "The capital is ___", 1.0, QuestionType::Short);
        let dots = question("q2", "u1", "Complete .... here", 1.0, QuestionType::Short);
        let mut with_options = question("q3", "u1", "Pick one", 1.0, QuestionType::Short);
        with_options.options.0 = vec!["(a) x".into()];
        let plain = question("q4", "u1", "Explain", 1.0, QuestionType::Short);

        assert!(looks_short_or_mcq(&blank));
        assert!(looks_short_or_mcq(&dots));
        assert!(looks_short_or_mcq(&with_options));
        assert!(!looks_short_or_mcq(&plain));
    }

    #[test]
    fn type_filters_follow_question_shape() {
        let blank = question("q1", "u1", "Fill ___ in", 2.0, QuestionType::Normal);
        let long = question("q2", "u1", "Explain paging", 5.0, QuestionType::Long);
        let mcq = question("q3", "u1", "Pick", 1.0, QuestionType::Mcq);

        assert!(type_accepts(&TypeFilter::Mcq, &blank, 1.0));
        assert!(type_accepts(&TypeFilter::Mixed, &blank, 1.0));
        assert!(!type_accepts(&TypeFilter::Mcq, &long, 1.0));

        assert!(!type_accepts(&TypeFilter::Normal, &blank, 2.0));
        assert!(type_accepts(&TypeFilter::Normal, &blank, 5.0));
        assert!(!type_accepts(&TypeFilter::Normal, &mcq, 5.0));
        assert!(!type_accepts(&TypeFilter::Normal, &long, 5.0));

        let essay = question("q4", "u1", "Discuss scheduling", 16.0, QuestionType::Normal);
        let short = question("q5", "u1", "Outline paging", 5.0, QuestionType::Short);
        assert!(type_accepts(&TypeFilter::Normal, &essay, 16.0));
        assert!(!type_accepts(&TypeFilter::Normal, &short, 5.0));
        assert!(!type_accepts(&TypeFilter::Normal, &long, 16.0));

        assert!(type_accepts(&TypeFilter::Exact(QuestionType::Long), &long, 5.0));
        assert!(!type_accepts(&TypeFilter::Exact(QuestionType::Short), &long, 5.0));
    }

    #[test]
    fn pick_prefers_unit_and_exact_marks() {
        let pool = vec![
            question("a", "u1", "Unit one two marks", 2.0, QuestionType::Short),
            question("b", "u1", "Unit one five marks", 5.0, QuestionType::Short),
            question("c", "u2", "Unit two two marks", 2.0, QuestionType::Short),
        ];
        let mut excluded = HashSet::new();
        let mut rng = StdRng::seed_from_u64(7);
        let mut picker = SetPicker::new(&pool, &mut excluded, &mut rng);

        let any = TypeFilter::Any;
        let bloom = BloomFilter::Any;
        let picked = picker.pick(&request(2.0, Some("u1"), &any, &bloom)).unwrap();
        assert_eq!(picked.id, "a");

        // u1 has no unused 2-mark item left; the strict-unit stage falls back to its 5-mark item
        let picked = picker.pick(&request(2.0, Some("u1"), &any, &bloom)).unwrap();
        assert_eq!(picked.id, "b");

        let picked = picker.pick(&request(2.0, Some("u1"), &any, &bloom)).unwrap();
        assert_eq!(picked.id, "c");

        assert!(picker.pick(&request(2.0, Some("u1"), &any, &bloom)).is_none());
        assert_eq!(picker.empty_picks(), 1);
        drop(picker);
        assert_eq!(excluded.len(), 3);
    }

    fn candidate_ids<'a>(
        picker: &mut SetPicker<'a, StdRng>,
        pool: &'a [Question],
        unit: Option<&str>,
        request: &PickRequest<'_>,
        strict_marks: bool,
    ) -> BTreeSet<String> {
        let base = pool.iter().filter(|q| unit.map_or(true, |u| q.unit_id == u)).collect();
        picker.filter_candidates(base, request, strict_marks).into_iter().map(|q| q.id.clone()).collect()
    }

    #[test]
    fn relaxed_stages_never_shrink_candidates() {
        let mut pool = vec![
            question("a", "u1", "Define paging", 2.0, QuestionType::Short),
            question("b", "u1", "Explain paging", 5.0, QuestionType::Short),
            question("c", "u1", "List page tables", 2.0, QuestionType::Short),
            question("d", "u2", "Define caching", 2.0, QuestionType::Short),
            question("e", "u2", "Discuss caching", 10.0, QuestionType::Long),
            question("f", "u2", "Pick a cache", 2.0, QuestionType::Mcq),
        ];
        for q in pool.iter_mut().filter(|q| q.id != "c") {
            q.bloom_level = BloomLevel::L2;
        }
        let mut excluded = HashSet::new();
        let mut rng = StdRng::seed_from_u64(4);
        let mut picker = SetPicker::new(&pool, &mut excluded, &mut rng);

        let short = TypeFilter::Exact(QuestionType::Short);
        let any_type = TypeFilter::Any;
        let l2 = BloomFilter::Levels(vec![BloomLevel::L2]);
        let any_bloom = BloomFilter::Any;
        let strict = request(2.0, Some("u1"), &short, &l2);

        let unit_exact = candidate_ids(&mut picker, &pool, Some("u1"), &strict, true);
        let unit_any = candidate_ids(&mut picker, &pool, Some("u1"), &strict, false);
        let pool_exact = candidate_ids(&mut picker, &pool, None, &strict, true);
        let pool_any = candidate_ids(&mut picker, &pool, None, &strict, false);
        assert_eq!(unit_exact, BTreeSet::from(["a".to_string()]));
        assert!(unit_exact.is_subset(&unit_any));
        assert!(unit_exact.is_subset(&pool_exact));
        assert!(unit_any.is_subset(&pool_any));
        assert!(pool_exact.is_subset(&pool_any));

        let untyped = candidate_ids(&mut picker, &pool, None, &request(2.0, None, &any_type, &l2), false);
        assert!(pool_any.is_subset(&untyped));
        let unfiltered =
            candidate_ids(&mut picker, &pool, None, &request(2.0, None, &any_type, &any_bloom), false);
        assert!(untyped.is_subset(&unfiltered));
        assert_eq!(unfiltered.len(), pool.len());

        let unmatched_bloom = BloomFilter::Levels(vec![BloomLevel::L5]);
        let unmatched = PickRequest { co_filter: Some("co-9"), ..request(2.0, None, &any_type, &unmatched_bloom) };
        assert_eq!(candidate_ids(&mut picker, &pool, None, &unmatched, false), unfiltered);
    }

    #[test]
    fn strict_marks_accept_one_mark_tolerance() {
        let pool = vec![
            question("far", "u1", "Ten marks", 10.0, QuestionType::Long),
            question("near", "u2", "Three marks", 3.0, QuestionType::Short),
        ];
        let mut excluded = HashSet::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut picker = SetPicker::new(&pool, &mut excluded, &mut rng);

        let any = TypeFilter::Any;
        let bloom = BloomFilter::Any;
        // no exact 2-mark item exists; the 3-mark one is inside the tolerance band
        let picked = picker.pick(&request(2.0, None, &any, &bloom)).unwrap();
        assert_eq!(picked.id, "near");
    }

    #[test]
    fn bloom_and_outcome_are_soft_preferences() {
        let mut l3 = question("l3", "u1", "Analyse", 2.0, QuestionType::Short);
        l3.bloom_level = BloomLevel::L3;
        l3.co_id = Some("co-2".into());
        let l1 = question("l1", "u1", "Define", 2.0, QuestionType::Short);
        let pool = vec![l1, l3];

        let any = TypeFilter::Any;
        let wanted = BloomFilter::Levels(vec![BloomLevel::L3]);
        let missing = BloomFilter::Levels(vec![BloomLevel::L5]);

        for seed in 0..8 {
            let mut excluded = HashSet::new();
            let mut rng = StdRng::seed_from_u64(seed);
            let mut picker = SetPicker::new(&pool, &mut excluded, &mut rng);
            assert_eq!(picker.pick(&request(2.0, Some("u1"), &any, &wanted)).unwrap().id, "l3");
        }

        let mut excluded = HashSet::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut picker = SetPicker::new(&pool, &mut excluded, &mut rng);
        assert!(picker.pick(&request(2.0, Some("u1"), &any, &missing)).is_some());

        let no_bloom = BloomFilter::Any;
        let co_request = PickRequest { co_filter: Some("co-2"), ..request(2.0, Some("u1"), &any, &no_bloom) };
        let mut excluded = HashSet::new();
        let mut rng = StdRng::seed_from_u64(5);
        let mut picker = SetPicker::new(&pool, &mut excluded, &mut rng);
        assert_eq!(picker.pick(&co_request).unwrap().id, "l3");
    }

    #[test]
    fn reuse_across_sets_only_after_fresh_questions_run_out() {
        let pool = vec![
            question("x", "u1", "First", 1.0, QuestionType::Mcq),
            question("y", "u1", "Second", 1.0, QuestionType::Mcq),
        ];
        let mut excluded = HashSet::from(["x".to_string()]);
        let mut rng = StdRng::seed_from_u64(11);
        let mut picker = SetPicker::new(&pool, &mut excluded, &mut rng);

        let mcq = TypeFilter::Mcq;
        let bloom = BloomFilter::Any;
        assert_eq!(picker.pick(&request(1.0, Some("u1"), &mcq, &bloom)).unwrap().id, "y");
        assert_eq!(picker.pick(&request(1.0, Some("u1"), &mcq, &bloom)).unwrap().id, "x");
        assert!(picker.pick(&request(1.0, Some("u1"), &mcq, &bloom)).is_none());
    }

    #[test]
    fn sub_questions_are_labeled_in_order() {
        let pool = vec![
            question("p", "u1", "Part one", 2.5, QuestionType::Short),
            question("q", "u1", "Part two", 2.5, QuestionType::Short),
        ];
        let mut excluded = HashSet::new();
        let mut rng = StdRng::seed_from_u64(2);
        let mut picker = SetPicker::new(&pool, &mut excluded, &mut rng);

        let any = TypeFilter::Any;
        let bloom = BloomFilter::Any;
        let picked = picker.pick_choice(&request(5.0, Some("u1"), &any, &bloom), Some(vec![2.5, 2.5]));
        let labels: Vec<&str> = picked.iter().filter_map(|q| q.sub_label.as_deref()).collect();
        assert_eq!(labels, vec!["(a)", "(b)"]);
        assert_ne!(picked[0].id, picked[1].id);
    }
}
