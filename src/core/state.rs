use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::question_bank::PgQuestionBank;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool) -> Self {
        Self { inner: Arc::new(InnerState { settings, db }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Question bank store bound to this state's pool.
    pub(crate) fn question_bank(&self) -> PgQuestionBank {
        PgQuestionBank::new(self.inner.db.clone())
    }
}
