//! wingbeat-station - Field Station Service
//!
//! Hosts the capture-to-persistence flow for the shared bird-sighting
//! map: snapshot intake from the camera UI, upload to object storage,
//! species identification, record persistence, and the map/lookup read
//! side, all behind one HTTP + SSE surface.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use wingbeat_common::config::StationConfig;
use wingbeat_common::events::EventBus;
use wingbeat_station::clients::{
    BucketClient, EncyclopediaApi, HttpLocationProvider, InferenceApi, InferenceClient,
    LocationProvider, ObjectStore, WikiSummaryClient,
};
use wingbeat_station::pipeline::SubmissionPipeline;
use wingbeat_station::store::{RecordStore, SqliteRecordStore};
use wingbeat_station::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "wingbeat-station", about = "Wingbeat field station service")]
struct Args {
    /// Path to a TOML config file (overrides WINGBEAT_CONFIG and the
    /// platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting wingbeat-station (Field Station)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = StationConfig::load(args.config.as_deref())?;
    info!("Database: {}", config.database_path.display());

    let db_pool = wingbeat_common::db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    let event_bus = EventBus::new(100);

    let object_store: Arc<dyn ObjectStore> = Arc::new(BucketClient::new(
        config.object_store.base_url.clone(),
        config.object_store.bucket.clone(),
        config.object_store.api_key.clone(),
    )?);
    let inference: Arc<dyn InferenceApi> =
        Arc::new(InferenceClient::new(config.inference.base_url.clone())?);
    let encyclopedia: Arc<dyn EncyclopediaApi> =
        Arc::new(WikiSummaryClient::new(&config.encyclopedia.summary_url)?);
    let location: Arc<dyn LocationProvider> =
        Arc::new(HttpLocationProvider::new(config.location.endpoint.clone())?);
    let records: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(db_pool));

    let pipeline = Arc::new(SubmissionPipeline::new(
        object_store,
        inference,
        records.clone(),
        event_bus.clone(),
    ));

    // Session start: viewfinder live plus exactly one location
    // acquisition. The acquisition may block on the positioning bridge,
    // so it runs beside the server.
    {
        let pipeline = pipeline.clone();
        let location = location.clone();
        tokio::spawn(async move {
            pipeline.begin_session(location).await;
        });
    }

    let state = AppState::new(pipeline, records, encyclopedia, location, event_bus);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Listening on http://{}", config.bind);
    info!("Health check: http://{}/health", config.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
