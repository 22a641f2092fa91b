use anyhow::Context;

use crate::services::answer_key::AnswerKeyResolver;
use crate::services::document_text::{self, DocumentError, DocumentFormat};
use crate::services::question_bank::{BankCatalog, NewQuestion, QuestionBankStore};
use crate::services::question_parser::{ParseMode, QuestionTextParser, TextParseOptions, UnitContext};
use crate::services::tabular_import;

#[derive(Debug, Clone)]
pub(crate) struct ImportRequest {
    pub(crate) subject_id: String,
    pub(crate) unit_context: UnitContext,
    pub(crate) mode: ParseMode,
    pub(crate) sheet_name: Option<String>,
    pub(crate) default_marks: f64,
    pub(crate) file_name: String,
    pub(crate) bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportSummary {
    pub(crate) source: &'static str,
    pub(crate) imported: usize,
    pub(crate) skipped: usize,
    pub(crate) answer_keys_resolved: usize,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ImportError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("Unit {unit_id} does not belong to subject {subject_id}")]
    UnknownUnit { unit_id: String, subject_id: String },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Runs one document through format detection, parsing and persistence.
pub(crate) async fn import_document(
    store: &dyn QuestionBankStore,
    request: ImportRequest,
) -> Result<ImportSummary, ImportError> {
    let format = DocumentFormat::detect(&request.file_name)?;
    let mut catalog = BankCatalog::load(store, &request.subject_id).await?;

    let summary = match format {
        DocumentFormat::Spreadsheet => {
            let tables = document_text::read_workbook(&request.bytes, request.sheet_name.as_deref())?;
            let outcome = tabular_import::import_sheets(store, &mut catalog, &tables).await?;
            ImportSummary {
                source: format.source_label(),
                imported: outcome.imported,
                skipped: outcome.skipped,
                answer_keys_resolved: 0,
            }
        }
        DocumentFormat::Docx | DocumentFormat::Pdf | DocumentFormat::PlainText => {
            if let UnitContext::Unit(unit_id) = &request.unit_context {
                if !catalog.has_unit(unit_id) {
                    return Err(ImportError::UnknownUnit {
                        unit_id: unit_id.clone(),
                        subject_id: request.subject_id.clone(),
                    });
                }
            }
            let raw = match format {
                DocumentFormat::Docx => document_text::docx_to_text(&request.bytes)?,
                DocumentFormat::Pdf => document_text::pdf_to_text(&request.bytes)?,
                _ => document_text::plain_text(&request.bytes)?,
            };
            let text = document_text::normalize_text(&raw);
            import_text(store, &mut catalog, &text, &request, format.source_label()).await?
        }
    };

    metrics::counter!("assessment_questions_imported_total", "source" => summary.source)
        .increment(summary.imported as u64);
    metrics::counter!("assessment_answer_keys_resolved_total")
        .increment(summary.answer_keys_resolved as u64);

    tracing::info!(
        subject_id = %request.subject_id,
        file_name = %request.file_name,
        source = summary.source,
        imported = summary.imported,
        skipped = summary.skipped,
        answer_keys_resolved = summary.answer_keys_resolved,
        "question import finished"
    );

    Ok(summary)
}

async fn import_text(
    store: &dyn QuestionBankStore,
    catalog: &mut BankCatalog,
    text: &str,
    request: &ImportRequest,
    source: &'static str,
) -> anyhow::Result<ImportSummary> {
    let parser = QuestionTextParser::new().context("failed to compile question markers")?;
    let resolver = AnswerKeyResolver::new().context("failed to compile answer key pattern")?;

    let options = TextParseOptions {
        mode: request.mode,
        unit_context: request.unit_context.clone(),
        default_marks: request.default_marks,
    };
    let mut parsed = parser.parse(text, &options, store, catalog).await?;

    let answer_keys_resolved = match parsed.answer_key_section.as_deref() {
        Some(section) => resolver.apply(section, &mut parsed.drafts),
        None => 0,
    };

    let mut imported = 0usize;
    let mut skipped = 0usize;
    for draft in parsed.drafts {
        let Some(unit_id) = draft.unit_id else {
            tracing::debug!(id = %draft.hierarchical_id, "no unit for parsed question, skipping");
            skipped += 1;
            continue;
        };

        store
            .create_question(NewQuestion {
                unit_id,
                topic_id: draft.topic_id,
                co_id: draft.co_id,
                text: draft.text,
                marks: draft.marks,
                question_type: draft.question_type,
                bloom_level: draft.bloom_level,
                options: draft.options,
                answer_key: draft.answer_key,
                image_url: None,
            })
            .await
            .with_context(|| format!("failed to store parsed question in {}", catalog.subject_id()))?;
        imported += 1;
    }

    Ok(ImportSummary { source, imported, skipped, answer_keys_resolved })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::QuestionType;
    use crate::test_support::MemoryBank;

    fn request(file_name: &str, body: &str, unit_context: UnitContext, mode: ParseMode) -> ImportRequest {
        ImportRequest {
            subject_id: "subj".to_string(),
            unit_context,
            mode,
            sheet_name: None,
            default_marks: 2.0,
            file_name: file_name.to_string(),
            bytes: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn unsupported_format_fails_before_touching_store() {
        let bank = MemoryBank::new();
        let err = import_document(&bank, request("paper.rtf", "", UnitContext::Global, ParseMode::Normal))
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Document(DocumentError::UnsupportedFormat { .. })));
        assert!(bank.questions().is_empty());
    }

    #[tokio::test]
    async fn unreadable_pdf_is_a_document_error() {
        let bank = MemoryBank::new();
        bank.add_unit("subj", 1);

        let broken = request("paper.pdf", "%PDF-1.4 broken", UnitContext::Global, ParseMode::Normal);
        let err = import_document(&bank, broken).await.unwrap_err();

        assert!(matches!(err, ImportError::Document(DocumentError::Pdf(_))));
        assert!(bank.questions().is_empty());
    }

    #[tokio::test]
    async fn unit_of_another_subject_is_rejected_before_parsing() {
        let bank = MemoryBank::new();
        bank.add_unit("subj", 1);
        let foreign = bank.add_unit("other-subject", 1);
        let body = "Unit 3\n1. Explain ownership and moves.";

        let upload = request("notes.txt", body, UnitContext::Unit(foreign.clone()), ParseMode::Normal);
        let err = import_document(&bank, upload).await.unwrap_err();

        match err {
            ImportError::UnknownUnit { unit_id, subject_id } => {
                assert_eq!(unit_id, foreign);
                assert_eq!(subject_id, "subj");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(bank.questions().is_empty());
        assert_eq!(bank.units().len(), 2);

        let upload = request("notes.txt", body, UnitContext::Unit("nope".into()), ParseMode::Normal);
        let missing = import_document(&bank, upload).await.unwrap_err();
        assert!(matches!(missing, ImportError::UnknownUnit { .. }));
    }

    #[tokio::test]
    async fn explicit_unit_of_the_subject_is_used() {
        let bank = MemoryBank::new();
        bank.add_unit("subj", 1);
        let second = bank.add_unit("subj", 2);

        let body = "1. Explain ownership and moves.";
        let upload = request("notes.txt", body, UnitContext::Unit(second.clone()), ParseMode::Normal);
        let summary = import_document(&bank, upload).await.unwrap();

        assert_eq!(summary.imported, 1);
        assert_eq!(bank.questions()[0].unit_id, second);
    }

    #[tokio::test]
    async fn text_import_resolves_answer_keys_and_persists() {
        let bank = MemoryBank::new();
        bank.add_unit("subj", 1);
        let body = "PART A\nII. Objective\n5. Largest planet? (a) Mars (b) Jupiter\n6. Smallest planet? (a) Mercury (b) Venus\nANSWER KEY\n5. (b)\n6. (a)";

        let summary = import_document(&bank, request("paper.txt", body, UnitContext::Global, ParseMode::Mcq))
            .await
            .unwrap();

        assert_eq!(
            summary,
            ImportSummary { source: "text", imported: 2, skipped: 0, answer_keys_resolved: 2 }
        );
        let questions = bank.questions();
        assert_eq!(questions[0].answer_key, "(b)");
        assert_eq!(questions[1].answer_key, "(a)");
        assert!(questions.iter().all(|q| q.question_type == QuestionType::Mcq));
    }

    #[tokio::test]
    async fn drafts_without_unit_are_reported_as_skipped() {
        let bank = MemoryBank::new();
        let body = "1. Explain the borrow checker.\nUnit 2\n2. Explain lifetimes in detail.";

        let summary = import_document(&bank, request("notes.txt", body, UnitContext::Global, ParseMode::Normal))
            .await
            .unwrap();

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped, 1);
        let questions = bank.questions();
        assert_eq!(questions[0].question_text, "Explain lifetimes in detail.");
        assert_eq!(questions[0].marks, 2.0);
    }
}
