//! Compliance audit server binary
//!
//! Run with: cargo run -p compliance-audit --bin compliance-audit-server -- --config audit.toml

use clap::Parser;
use compliance_audit::{
    config::AuditConfig,
    ingestion::PageRenderer,
    providers::GeminiClient,
    server::{state::AppState, AuditServer},
    storage::FileStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Regulation compliance audit server
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "compliance_audit=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                  Compliance Audit Assistant               ║
║          Regulation Audits with Cited Clauses             ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    // Load configuration
    let mut config = match &args.config {
        Some(path) => AuditConfig::from_file(path)?,
        None => AuditConfig::default(),
    };
    config.apply_env();
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Reasoning model: {}", config.llm.reasoning_model);
    tracing::info!("  - Image model: {}", config.llm.image_model);
    tracing::info!("  - Data directory: {}", config.storage.data_dir.display());
    tracing::info!("  - Max PDF pages: {}", config.ingestion.max_pdf_pages);
    tracing::info!("  - Batch policy: {:?}", config.ingestion.batch_policy);

    let backing = Arc::new(FileStore::new(config.storage.data_dir.clone())?);
    let renderer = page_renderer(&config);
    let provider = Arc::new(GeminiClient::new(&config.llm)?);

    let state = AppState::new(config, backing, renderer, provider).await?;
    let server = AuditServer::new(state);

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/ingest  - Upload regulations (admin)");
    println!("  POST /api/audit   - Audit a scenario");
    println!("  POST /api/ask     - Ask about the regulations");
    println!("  GET  /api/sources - List regulations");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}

#[cfg(feature = "render")]
fn page_renderer(config: &AuditConfig) -> Option<Arc<dyn PageRenderer>> {
    use compliance_audit::ingestion::render::PdfiumRenderer;

    match PdfiumRenderer::probe(config.ingestion.pdfium_library.clone()) {
        Ok(renderer) => {
            tracing::info!("Page snapshots enabled ({})", renderer.name());
            Some(Arc::new(renderer))
        }
        Err(e) => {
            tracing::warn!("Page snapshots disabled: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "render"))]
fn page_renderer(_config: &AuditConfig) -> Option<Arc<dyn PageRenderer>> {
    tracing::warn!("Built without the render feature; page snapshots disabled");
    None
}
