use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use rand::rngs::StdRng;
use rand::SeedableRng;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::repositories;
use crate::schemas::paper::{GenerateRequest, GenerateResponse, PaperResponse};
use crate::schemas::question::{ListQuestionsQuery, QuestionResponse, UploadResponse};
use crate::services::paper_generation::{self, GenerationInput};
use crate::services::question_import::{self, ImportRequest};
use crate::services::question_parser::{ParseMode, UnitContext};
use crate::services::slot_layout::{LayoutSwitches, PartAMode};

const DEFAULT_IMPORT_MARKS: f64 = 1.0;

#[derive(Default)]
struct UploadForm {
    file_name: Option<String>,
    bytes: Option<Vec<u8>>,
    subject_id: Option<String>,
    unit_id: Option<String>,
    mode: Option<String>,
    sheet_name: Option<String>,
    default_marks: Option<String>,
}

async fn read_upload_form(multipart: &mut Multipart, max_mb: u64) -> Result<UploadForm, ApiError> {
    let max_bytes = max_mb * 1024 * 1024;
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            form.file_name = field.file_name().map(|s| s.to_string());
            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
            {
                if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
                    return Err(ApiError::PayloadTooLarge(format!("File size exceeds {max_mb}MB limit")));
                }
                bytes.extend_from_slice(&chunk);
            }
            form.bytes = Some(bytes);
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|_| ApiError::BadRequest(format!("Invalid value for {name}")))?;
        let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
        match name.as_str() {
            "subjectId" | "subject_id" => form.subject_id = value,
            "unitId" | "unit_id" => form.unit_id = value,
            "mode" => form.mode = value,
            "sheetName" | "sheet_name" => form.sheet_name = value,
            "defaultMarks" | "default_marks" => form.default_marks = value,
            _ => {}
        }
    }

    Ok(form)
}

pub(super) async fn upload_questions(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let form = read_upload_form(&mut multipart, state.settings().upload().max_upload_size_mb).await?;

    let (Some(bytes), Some(subject_id)) = (form.bytes, form.subject_id) else {
        return Err(ApiError::BadRequest("No file or subjectId provided".to_string()));
    };
    let file_name = form.file_name.unwrap_or_default();
    let default_marks = form
        .default_marks
        .and_then(|raw| raw.parse::<f64>().ok())
        .filter(|marks| *marks > 0.0)
        .unwrap_or(DEFAULT_IMPORT_MARKS);

    let store = state.question_bank();
    let summary = question_import::import_document(
        &store,
        ImportRequest {
            subject_id,
            unit_context: UnitContext::parse(form.unit_id.as_deref().unwrap_or_default()),
            mode: ParseMode::parse(form.mode.as_deref().unwrap_or_default()),
            sheet_name: form.sheet_name,
            default_marks,
            file_name,
            bytes,
        },
    )
    .await?;

    Ok(Json(UploadResponse {
        status: "success",
        source: summary.source,
        count: summary.imported,
        skipped: summary.skipped,
        answer_keys_resolved: summary.answer_keys_resolved,
    }))
}

pub(super) async fn list_questions(
    Path(subject_id): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<ListQuestionsQuery>,
) -> Result<Json<PaginatedResponse<QuestionResponse>>, ApiError> {
    let skip = query.skip.max(0);
    let limit = query.limit.clamp(1, 1000);

    let rows = repositories::questions::list_page(
        state.db(),
        repositories::questions::ListQuestionsParams {
            subject_id,
            unit_id: query.unit_id.map(|value| value.trim().to_string()).filter(|v| !v.is_empty()),
            skip,
            limit,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;

    let total_count = rows.first().map(|row| row.total_count).unwrap_or(0);
    let items = rows
        .into_iter()
        .map(|row| QuestionResponse {
            id: row.id,
            unit_id: row.unit_id,
            unit_number: row.unit_number,
            topic: row.topic_name,
            question_text: row.question_text,
            marks: row.marks,
            question_type: row.question_type,
            bloom_level: row.bloom_level,
            options: row.options.0,
            answer_key: row.answer_key,
        })
        .collect();

    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}

pub(super) async fn generate_paper(
    State(state): State<AppState>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let explicit_template = match payload.template_config.clone().filter(|value| !value.is_null()) {
        Some(inline) => Some(inline),
        None => match payload.template_id.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(template_id) => {
                let stored = repositories::templates::find_by_id(state.db(), template_id)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to load template"))?
                    .ok_or_else(|| ApiError::NotFound("Template not found".to_string()))?;
                Some(stored.config.0)
            }
            None => None,
        },
    };

    let institution_variant = payload.institution_variant
        || state
            .settings()
            .layout()
            .is_institution_variant(payload.university_id.as_deref(), &payload.selected_template);

    let input = GenerationInput {
        subject_id: payload.subject_id.trim().to_string(),
        unit_ids: payload.unit_ids.clone(),
        explicit_template,
        layout: LayoutSwitches {
            institution_variant,
            max_marks: payload.max_marks,
            part_a: PartAMode::parse(&payload.part_a_type),
        },
        sets_config: payload
            .sets_config
            .iter()
            .map(|(label, levels)| (label.trim().to_ascii_uppercase(), levels.to_filter()))
            .collect(),
        set_count: payload.set_count,
    };

    let seed = payload.seed.unwrap_or_else(rand::random::<u64>);
    let mut rng = StdRng::seed_from_u64(seed);
    tracing::debug!(subject_id = %input.subject_id, seed, "generating paper");

    let store = state.question_bank();
    let paper = paper_generation::generate(&store, input, &mut rng).await?;

    let sets_data = paper_generation::assemble_sets_data(&paper.sets, payload.metadata())
        .map_err(|e| ApiError::internal(e, "Failed to serialize generated sets"))?;
    let paper_id = repositories::papers::create(
        state.db(),
        repositories::papers::CreatePaper {
            id: &Uuid::new_v4().to_string(),
            university_id: payload.university_id.as_deref(),
            batch_id: payload.batch_id.as_deref(),
            branch_id: payload.branch_id.as_deref(),
            subject_id: payload.subject_id.trim(),
            exam_type: payload.exam_type.as_deref(),
            semester: payload.semester,
            paper_date: payload.paper_date.as_deref(),
            duration_minutes: payload.duration_minutes,
            max_marks: payload.max_marks,
            sets_data,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to store generated paper"))?;

    tracing::info!(paper_id = %paper_id, empty_picks = paper.empty_picks, "paper stored");

    Ok(Json(GenerateResponse { id: paper_id, sets: paper.sets, template_config: paper.template }))
}

pub(super) async fn get_paper(
    Path(paper_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PaperResponse>, ApiError> {
    let paper = repositories::papers::find_by_id(state.db(), &paper_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load paper"))?
        .ok_or_else(|| ApiError::NotFound("Paper not found".to_string()))?;

    Ok(Json(PaperResponse {
        id: paper.id,
        university_id: paper.university_id,
        subject_id: paper.subject_id,
        max_marks: paper.max_marks,
        sets_data: paper.sets_data.0,
        created_at: format_primitive(paper.created_at),
    }))
}
