mod auth;
mod config;
mod conversion;
mod errors;
mod feedback;
mod llm_client;
mod models;
mod resumes;
mod routes;
mod state;
mod storage;
mod submissions;
#[cfg(test)]
mod testing;
mod workflow;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::StaticTokenAuth;
use crate::config::Config;
use crate::conversion::{LazyPdfConverter, PageRenderer, PdfiumRenderer};
use crate::feedback::AnthropicFeedbackService;
use crate::llm_client::LlmClient;
use crate::resumes::repository::ResumeRepository;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{RedisKvStore, S3BlobStore};
use crate::submissions::SubmissionTracker;
use crate::workflow::UploadWorkflow;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resumind API v{}", env!("CARGO_PKG_VERSION"));

    // Redis holds resume records
    let redis = redis::Client::open(config.redis_url.clone())?;
    let kv = Arc::new(RedisKvStore::connect(&redis).await?);

    // S3 / MinIO holds uploaded PDFs and preview images
    let s3 = build_s3_client(&config).await;
    let blobs = Arc::new(S3BlobStore::new(s3, config.s3_bucket.clone()));
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let ai = Arc::new(AnthropicFeedbackService::new(llm, blobs.clone()));

    // Pdfium is bound on the first conversion, not at startup
    let library_path = config.pdfium_library_path.clone();
    let scale = config.render_scale;
    let converter = Arc::new(LazyPdfConverter::new(move || {
        let renderer = PdfiumRenderer::new(library_path.clone(), scale)?;
        Ok(Arc::new(renderer) as Arc<dyn PageRenderer>)
    }));

    let resumes = ResumeRepository::new(kv);
    let workflow = UploadWorkflow::new(blobs.clone(), converter, resumes.clone(), ai);

    let state = AppState {
        workflow: Arc::new(workflow),
        resumes,
        blobs,
        submissions: Arc::new(SubmissionTracker::default()),
        auth: Arc::new(StaticTokenAuth::from_config(&config.auth_tokens)?),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client's host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "resumind-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
