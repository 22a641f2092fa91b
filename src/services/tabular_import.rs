use crate::db::types::{BloomLevel, QuestionType};
use crate::services::document_text::{SheetRow, SheetTable};
use crate::services::question_bank::{BankCatalog, NewQuestion, QuestionBankStore};

const TEXT_COLUMNS: &[&str] = &["Questions", "Question", "question_text", "Question Description"];
const MODULE_COLUMNS: &[&str] = &["Module Number", "Module", "unit_number", "Unit"];
const TOPIC_COLUMNS: &[&str] = &["Topic name", "Topic", "topic_name"];
const BLOOM_COLUMNS: &[&str] = &["Difficulty level", "Bloom Level", "bloom_level"];
const MARKS_COLUMNS: &[&str] = &["Marks", "marks"];
const CO_COLUMNS: &[&str] = &["CO", "Course Outcome", "co_code"];
const ANSWER_COLUMNS: &[&str] = &["Solution", "Answer", "answer_key", "Correct Answer"];
const OPTION_COLUMNS: &[&str] = &["A", "B", "C", "D"];

const DEFAULT_TOPIC: &str = "General";

/// A spreadsheet row after alias resolution, before any store lookups.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TabularRecord {
    pub(crate) text: String,
    pub(crate) unit_number: i32,
    pub(crate) topic: String,
    pub(crate) bloom_level: BloomLevel,
    pub(crate) marks: f64,
    pub(crate) co_code: String,
    pub(crate) answer_key: String,
    pub(crate) question_type: QuestionType,
    pub(crate) options: Vec<String>,
}

/// Question type implied by a sheet name, e.g. `MCQ_Bank` or `Long Answers`.
pub(crate) fn sheet_category(sheet_name: &str) -> QuestionType {
    let lowered = sheet_name.to_lowercase();
    if lowered.contains("mcq") {
        QuestionType::Mcq
    } else if lowered.contains("long") {
        QuestionType::Long
    } else if lowered.contains("fill") {
        QuestionType::FillInBlank
    } else {
        QuestionType::Short
    }
}

/// Returns `None` for rows whose question text is missing or shorter than two characters.
pub(crate) fn normalize_row(row: &SheetRow, category: QuestionType) -> Option<TabularRecord> {
    let text = row.first_of(TEXT_COLUMNS)?.trim();
    if text.chars().count() < 2 {
        return None;
    }

    let unit_number = row
        .first_of(MODULE_COLUMNS)
        .and_then(parse_leading_int)
        .filter(|n| *n > 0)
        .unwrap_or(1);

    let topic = row.first_of(TOPIC_COLUMNS).unwrap_or(DEFAULT_TOPIC).trim().to_string();
    let bloom_level = row.first_of(BLOOM_COLUMNS).map(BloomLevel::parse_or_default).unwrap_or_default();

    let marks = row
        .first_of(MARKS_COLUMNS)
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|marks| marks.is_finite() && *marks > 0.0)
        .unwrap_or_else(|| category.default_marks());

    let options = if category == QuestionType::Mcq {
        OPTION_COLUMNS
            .iter()
            .filter_map(|column| row.first_of(&[*column]))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect()
    } else {
        Vec::new()
    };

    Some(TabularRecord {
        text: text.to_string(),
        unit_number,
        topic,
        bloom_level,
        marks,
        co_code: row.first_of(CO_COLUMNS).unwrap_or_default().trim().to_ascii_uppercase(),
        answer_key: row.first_of(ANSWER_COLUMNS).unwrap_or_default().trim().to_string(),
        question_type: category,
        options,
    })
}

fn parse_leading_int(raw: &str) -> Option<i32> {
    let digits: String = raw.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TabularOutcome {
    pub(crate) imported: usize,
    pub(crate) skipped: usize,
}

/// Persists every accepted row of `tables`, resolving units and topics lazily.
pub(crate) async fn import_sheets(
    store: &dyn QuestionBankStore,
    catalog: &mut BankCatalog,
    tables: &[SheetTable],
) -> anyhow::Result<TabularOutcome> {
    let mut outcome = TabularOutcome::default();

    for table in tables {
        let category = sheet_category(&table.name);
        let mut sheet_imported = 0usize;

        for row in &table.rows {
            let Some(record) = normalize_row(row, category) else {
                outcome.skipped += 1;
                continue;
            };

            let unit_id = catalog.resolve_unit(store, record.unit_number).await?;
            let topic_id = catalog.resolve_topic(store, &unit_id, &record.topic).await?;
            let co_id = catalog.course_outcome_id(&record.co_code);

            store
                .create_question(NewQuestion {
                    unit_id,
                    topic_id: Some(topic_id),
                    co_id,
                    text: record.text,
                    marks: record.marks,
                    question_type: record.question_type,
                    bloom_level: record.bloom_level,
                    options: record.options,
                    answer_key: record.answer_key,
                    image_url: None,
                })
                .await?;
            sheet_imported += 1;
        }

        tracing::debug!(
            sheet = %table.name,
            category = category.as_str(),
            imported = sheet_imported,
            "sheet processed"
        );
        outcome.imported += sheet_imported;
    }

    Ok(outcome)
}
