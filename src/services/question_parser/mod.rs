//! Marker-driven segmentation of free-text question papers.
//!
//! The normalized text is tokenized into [`lexer::Marker`]s which a small state
//! machine walks in document order. Every `NUMBER` marker opens a question
//! block that runs until the next marker of any kind.

mod lexer;
mod metadata;

pub(crate) use lexer::{MarkerKind, MarkerLexer};
pub(crate) use metadata::{InlineMetadata, MetadataPatterns};

use crate::db::types::{BloomLevel, QuestionType};
use crate::services::question_bank::{BankCatalog, QuestionBankStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParseMode {
    Mcq,
    Normal,
}

impl ParseMode {
    pub(crate) fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("mcq") {
            ParseMode::Mcq
        } else {
            ParseMode::Normal
        }
    }

    fn baseline_type(self) -> QuestionType {
        match self {
            ParseMode::Mcq => QuestionType::Mcq,
            ParseMode::Normal => QuestionType::Normal,
        }
    }
}

/// Unit the parser starts in before any `Unit` heading is seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UnitContext {
    /// Start in the subject's first unit, if any.
    Global,
    Unit(String),
}

impl UnitContext {
    pub(crate) fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("GLOBAL") {
            UnitContext::Global
        } else {
            UnitContext::Unit(value.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TextParseOptions {
    pub(crate) mode: ParseMode,
    pub(crate) unit_context: UnitContext,
    pub(crate) default_marks: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DraftQuestion {
    /// `5`, or `II-5` inside a Roman group; used to match answer keys.
    pub(crate) hierarchical_id: String,
    pub(crate) unit_id: Option<String>,
    pub(crate) topic_id: Option<String>,
    pub(crate) co_id: Option<String>,
    pub(crate) text: String,
    pub(crate) marks: f64,
    pub(crate) question_type: QuestionType,
    pub(crate) bloom_level: BloomLevel,
    pub(crate) options: Vec<String>,
    pub(crate) answer_key: String,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ParsedDocument {
    pub(crate) drafts: Vec<DraftQuestion>,
    /// Text from the first `ANSWER KEY` marker to the end, if present.
    pub(crate) answer_key_section: Option<String>,
}

pub(crate) struct QuestionTextParser {
    lexer: MarkerLexer,
    metadata: MetadataPatterns,
}

impl QuestionTextParser {
    pub(crate) fn new() -> Result<Self, regex::Error> {
        Ok(Self { lexer: MarkerLexer::new()?, metadata: MetadataPatterns::new()? })
    }

    /// Walks the markers of `text` in order. Unit headings and `Topic:` labels
    /// are resolved against `catalog` as they are met, so later blocks see
    /// units created by earlier ones.
    pub(crate) async fn parse(
        &self,
        text: &str,
        options: &TextParseOptions,
        store: &dyn QuestionBankStore,
        catalog: &mut BankCatalog,
    ) -> anyhow::Result<ParsedDocument> {
        let markers = self.lexer.tokenize(text);

        let mut current_part: Option<char> = None;
        let mut current_roman: Option<String> = None;
        let mut current_unit: Option<String> = match &options.unit_context {
            UnitContext::Global => catalog.first_unit_id().map(str::to_string),
            UnitContext::Unit(id) => Some(id.clone()),
        };
        let mut drafts = Vec::new();
        let mut answer_key_section = None;

        for (idx, marker) in markers.iter().enumerate() {
            match &marker.kind {
                MarkerKind::AnswerKey => {
                    answer_key_section = Some(text[marker.start..].to_string());
                    break;
                }
                MarkerKind::Part(part) => {
                    current_part = Some(*part);
                }
                MarkerKind::Roman(label) => {
                    current_roman = Some(label.clone());
                }
                MarkerKind::Unit(number) => {
                    current_unit = Some(catalog.resolve_unit(store, *number).await?);
                }
                MarkerKind::Number(raw_id) => {
                    let block_end = markers.get(idx + 1).map_or(text.len(), |next| next.start);
                    let block = text.get(marker.end..block_end).unwrap_or_default().trim();

                    let hierarchical_id = if raw_id.contains('-') {
                        raw_id.to_ascii_uppercase()
                    } else {
                        match &current_roman {
                            Some(roman) => format!("{roman}-{raw_id}"),
                            None => raw_id.clone(),
                        }
                    };

                    let draft = self
                        .build_draft(block, raw_id, hierarchical_id, current_unit.as_deref(), options, store, catalog)
                        .await?;
                    if let Some(draft) = draft {
                        tracing::trace!(id = %draft.hierarchical_id, part = ?current_part, "parsed question block");
                        drafts.push(draft);
                    }
                }
            }
        }

        Ok(ParsedDocument { drafts, answer_key_section })
    }

    #[allow(clippy::too_many_arguments)]
    async fn build_draft(
        &self,
        block: &str,
        raw_id: &str,
        hierarchical_id: String,
        unit_id: Option<&str>,
        options: &TextParseOptions,
        store: &dyn QuestionBankStore,
        catalog: &mut BankCatalog,
    ) -> anyhow::Result<Option<DraftQuestion>> {
        let (stem, choices) = self.metadata.split_options(block);
        let InlineMetadata { bloom_level, co_code, topic } = self.metadata.extract(block);

        let topic_id = match (topic, unit_id) {
            (Some(name), Some(unit_id)) => Some(catalog.resolve_topic(store, unit_id, &name).await?),
            _ => None,
        };

        let stem = self.metadata.scrub(&stem);
        let choices: Vec<String> = choices.iter().map(|choice| self.metadata.scrub(choice)).collect();
        let stem = self.metadata.truncate_stray_option(&stem);

        if stem.chars().count() <= 3 && choices.is_empty() {
            return Ok(None);
        }

        let text = if stem.is_empty() { format!("Question {raw_id}") } else { stem };
        let marks = match options.mode {
            ParseMode::Mcq => 1.0,
            ParseMode::Normal => options.default_marks,
        };
        let question_type =
            if choices.is_empty() { options.mode.baseline_type() } else { QuestionType::Mcq };

        Ok(Some(DraftQuestion {
            hierarchical_id,
            unit_id: unit_id.map(str::to_string),
            topic_id,
            co_id: co_code.and_then(|code| catalog.course_outcome_id(&code)),
            text,
            marks,
            question_type,
            bloom_level,
            options: choices,
            answer_key: String::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryBank;

    fn normal_options(unit_context: UnitContext) -> TextParseOptions {
        TextParseOptions { mode: ParseMode::Normal, unit_context, default_marks: 2.0 }
    }

    async fn parse(
        bank: &MemoryBank,
        text: &str,
        options: &TextParseOptions,
    ) -> ParsedDocument {
        let mut catalog = BankCatalog::load(bank, "subj").await.unwrap();
        QuestionTextParser::new().unwrap().parse(text, options, bank, &mut catalog).await.unwrap()
    }

    #[tokio::test]
    async fn numbered_blocks_become_drafts() {
        let bank = MemoryBank::new();
        let unit = bank.add_unit("subj", 1);
        let doc = parse(
            &bank,
            "PART A\n1. Define an operating system.\n2. Explain process scheduling in detail.",
            &normal_options(UnitContext::Global),
        )
        .await;

        assert_eq!(doc.drafts.len(), 2);
        assert_eq!(doc.drafts[0].text, "Define an operating system.");
        assert_eq!(doc.drafts[0].unit_id.as_deref(), Some(unit.as_str()));
        assert_eq!(doc.drafts[0].marks, 2.0);
        assert_eq!(doc.drafts[0].question_type, QuestionType::Normal);
        assert_eq!(doc.drafts[1].hierarchical_id, "2");
        assert!(doc.answer_key_section.is_none());
    }

    #[tokio::test]
    async fn roman_groups_prefix_item_ids() {
        let bank = MemoryBank::new();
        bank.add_unit("subj", 1);
        let doc = parse(
            &bank,
            "I. Short answers\n1. Define a stack.\nII. Long answers\n5. Explain quicksort.\nii-6. Explain heapsort.",
            &normal_options(UnitContext::Global),
        )
        .await;

        let ids: Vec<&str> = doc.drafts.iter().map(|d| d.hierarchical_id.as_str()).collect();
        assert_eq!(ids, vec!["I-1", "II-5", "II-6"]);
    }

    #[tokio::test]
    async fn mcq_blocks_collect_options_and_single_marks() {
        let bank = MemoryBank::new();
        bank.add_unit("subj", 1);
        let options = TextParseOptions {
            mode: ParseMode::Mcq,
            unit_context: UnitContext::Global,
            default_marks: 5.0,
        };
        let doc = parse(
            &bank,
            "1. Which is a prime? (a) 4 (b) 7 (c) 8 (d) 9\n2. (a) only options (b) here",
            &options,
        )
        .await;

        assert_eq!(doc.drafts.len(), 2);
        assert_eq!(doc.drafts[0].options, vec!["(a) 4", "(b) 7", "(c) 8", "(d) 9"]);
        assert_eq!(doc.drafts[0].question_type, QuestionType::Mcq);
        assert_eq!(doc.drafts[0].marks, 1.0);
        assert_eq!(doc.drafts[1].text, "Question 2");
    }

    #[tokio::test]
    async fn tiny_blocks_without_options_are_dropped() {
        let bank = MemoryBank::new();
        bank.add_unit("subj", 1);
        let doc = parse(&bank, "1. Yes\n2. ok\n3. Real question text", &normal_options(UnitContext::Global)).await;

        let texts: Vec<&str> = doc.drafts.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["Real question text"]);
    }

    #[tokio::test]
    async fn unit_headings_create_units_and_topics_follow() {
        let bank = MemoryBank::new();
        let doc = parse(
            &bank,
            "Unit II: Trees\n1. Define a binary tree. Topic: Binary Trees\nUnit 3\n2. Define a graph. Topic: binary trees",
            &normal_options(UnitContext::Global),
        )
        .await;

        let units = bank.units();
        assert_eq!(units.len(), 2);
        let unit_two = units.iter().find(|u| u.unit_number == 2).unwrap();
        let unit_three = units.iter().find(|u| u.unit_number == 3).unwrap();

        assert_eq!(doc.drafts[0].unit_id.as_deref(), Some(unit_two.id.as_str()));
        assert_eq!(doc.drafts[0].text, "Define a binary tree.");
        assert_eq!(doc.drafts[1].unit_id.as_deref(), Some(unit_three.id.as_str()));
        assert_ne!(doc.drafts[0].topic_id, doc.drafts[1].topic_id);
        assert_eq!(bank.topics().len(), 2);
    }

    #[tokio::test]
    async fn global_context_without_units_leaves_drafts_unassigned() {
        let bank = MemoryBank::new();
        let doc = parse(
            &bank,
            "1. Explain deadlocks. Topic: Concurrency",
            &normal_options(UnitContext::Global),
        )
        .await;

        assert_eq!(doc.drafts.len(), 1);
        assert_eq!(doc.drafts[0].unit_id, None);
        assert_eq!(doc.drafts[0].topic_id, None);
        assert!(bank.topics().is_empty());
    }

    #[tokio::test]
    async fn metadata_is_extracted_and_scrubbed() {
        let bank = MemoryBank::new();
        let unit = bank.add_unit("subj", 1);
        let co = bank.add_course_outcome("subj", "CO2");
        let doc = parse(
            &bank,
            "1. Explain paging. Bloom's Level: L4 (CO2)",
            &normal_options(UnitContext::Unit(unit)),
        )
        .await;

        let draft = &doc.drafts[0];
        assert_eq!(draft.text, "Explain paging.");
        assert_eq!(draft.bloom_level, BloomLevel::L4);
        assert_eq!(draft.co_id.as_deref(), Some(co.as_str()));
    }

    #[tokio::test]
    async fn answer_key_section_stops_question_extraction() {
        let bank = MemoryBank::new();
        bank.add_unit("subj", 1);
        let doc = parse(
            &bank,
            "1. Which is even? (a) 3 (b) 4\nANSWER KEY\n1. b)\n2. Not a question here",
            &normal_options(UnitContext::Global),
        )
        .await;

        assert_eq!(doc.drafts.len(), 1);
        assert_eq!(doc.drafts[0].options, vec!["(a) 3", "(b) 4"]);
        assert!(doc.answer_key_section.as_deref().unwrap().starts_with("ANSWER KEY"));
    }

    #[tokio::test]
    async fn text_without_markers_yields_nothing() {
        let bank = MemoryBank::new();
        let doc = parse(&bank, "Just a paragraph of prose.", &normal_options(UnitContext::Global)).await;
        assert!(doc.drafts.is_empty());
    }

    #[test]
    fn unit_context_and_mode_parse_sentinels() {
        assert_eq!(UnitContext::parse("GLOBAL"), UnitContext::Global);
        assert_eq!(UnitContext::parse(""), UnitContext::Global);
        assert_eq!(UnitContext::parse("u-1"), UnitContext::Unit("u-1".into()));
        assert_eq!(ParseMode::parse("MCQ"), ParseMode::Mcq);
        assert_eq!(ParseMode::parse("normal"), ParseMode::Normal);
    }
}
