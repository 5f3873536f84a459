use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::Config;
use crate::services::{
    arbiter::SessionArbiter, catalog::QuestionCatalog, ledger::ScoreLedger,
    ranking::RankingProjector, renderer::MessageBoard,
};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<QuestionCatalog>,
    pub arbiter: Arc<SessionArbiter>,
    pub ranking: Arc<RankingProjector>,
    pub board: Arc<MessageBoard>,
    pub config: Config,
}

impl AppState {
    /// Wires the services together around a ledger and a loaded catalog.
    pub fn new(catalog: QuestionCatalog, ledger: ScoreLedger, config: Config) -> Self {
        let ledger = Arc::new(ledger);
        let board = Arc::new(MessageBoard::with_retention(config.message_retention));
        let arbiter = SessionArbiter::new(Arc::clone(&ledger), board.clone());

        Self {
            catalog: Arc::new(catalog),
            ranking: Arc::new(RankingProjector::new(ledger)),
            arbiter: Arc::new(arbiter),
            board,
            config,
        }
    }
}

impl FromRef<AppState> for Arc<QuestionCatalog> {
    fn from_ref(state: &AppState) -> Self {
        state.catalog.clone()
    }
}

impl FromRef<AppState> for Arc<RankingProjector> {
    fn from_ref(state: &AppState) -> Self {
        state.ranking.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
