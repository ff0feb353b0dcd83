use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::bank::QuestionBank;
use crate::config::AppConfig;
use crate::gate::AccessGate;
use crate::session::store::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub bank: Arc<dyn QuestionBank>,
    pub gate: AccessGate,
    pub sessions: Arc<SessionStore>,
}
