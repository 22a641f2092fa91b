use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    metrics::describe_counter!(
        "assessment_questions_imported_total",
        "Questions persisted into the bank, labelled by ingestion source"
    );
    metrics::describe_counter!(
        "assessment_answer_keys_resolved_total",
        "Answer-key entries matched back to parsed questions"
    );
    metrics::describe_counter!("assessment_papers_generated_total", "Generated papers stored");
    metrics::describe_counter!(
        "assessment_slot_picks_empty_total",
        "Slot picks that found no candidate after every fallback stage"
    );
}
