// Oscar predictor entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config and build the catalog
// 3. Open database
// 4. Import seed CSVs into an empty database
// 5. Run an initial prediction cycle for the current year
// 6. Serve WebSocket requests until Ctrl+C

use std::path::Path;
use std::sync::Arc;

use oscar_app::config;
use oscar_app::db;
use oscar_app::seed;
use oscar_app::service::Service;
use oscar_app::ws_server;

use anyhow::Context;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Oscar predictor starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    let catalog = config
        .awards
        .catalog()
        .context("invalid venue/category catalog")?;
    info!(
        "Config loaded: current year {}, {} venues, {} categories",
        config.awards.current_year,
        catalog.venues().len(),
        catalog.categories().len()
    );

    // 3. Open database
    let db = db::Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    // 4. Seed an empty database
    if db.nomination_count()? == 0 {
        if Path::new(&config.data_paths.nominations).exists() {
            let records = seed::load_seed(&catalog, &config.data_paths)
                .context("failed to load seed data")?;
            db.import_records(&records.nominations, &records.award_wins, &records.references)
                .context("failed to import seed data")?;
            info!("Imported {} nominations", records.nominations.len());
        } else {
            warn!(
                "Database is empty and no seed file at {}",
                config.data_paths.nominations
            );
        }
    }

    let service = Arc::new(Service::new(db, catalog, config.awards.current_year));

    // 5. Initial prediction cycle; a failure is logged, not fatal
    if let Err(e) = service.run_prediction_cycle(config.awards.current_year) {
        error!("Initial prediction run failed: {e:#}");
    }

    // 6. Serve until Ctrl+C
    let ws_port = config.ws_port;
    let ws_handle = tokio::spawn(async move {
        if let Err(e) = ws_server::run(ws_port, service).await {
            error!("WebSocket server error: {}", e);
        }
    });

    info!("Application ready. WebSocket server listening on 127.0.0.1:{}", ws_port);
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    ws_handle.abort();
    info!("Oscar predictor shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("oscar-predictor.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("oscar_app=info,oscar_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
