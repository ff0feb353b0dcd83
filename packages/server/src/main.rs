use std::sync::Arc;

use tracing::{Level, info};

use server::bank::FileQuestionBank;
use server::config::AppConfig;
use server::gate::AccessGate;
use server::session::store::SessionStore;
use server::state::AppState;
use server::{build_router, database, seed, session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let db = database::init_db(&config.database.url).await?;
    seed::seed_role_permissions(&db).await?;
    seed::seed_round_access(&db).await?;
    seed::ensure_indexes(&db).await?;

    let bank = Arc::new(FileQuestionBank::load(&config.bank.catalog_dir)?);
    let gate = AccessGate::load(&db).await?;

    let state = AppState {
        db,
        config: config.clone(),
        bank,
        gate,
        sessions: Arc::new(SessionStore::new()),
    };

    // Deadlines and revocations are enforced server-side even if every
    // client disappears.
    tokio::spawn(session::sweeper::run(state.clone()));

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running at http://{addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
