// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, repository::ExamRepository, utils::clock::Clock};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ExamRepository>,
    pub clock: Arc<dyn Clock>,
    pub config: Config,
}

impl FromRef<AppState> for Arc<dyn ExamRepository> {
    fn from_ref(state: &AppState) -> Self {
        state.repo.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
