use std::sync::Arc;

use clap::Parser;
use meetai_server::db::services::SeaOrmMeetingStore;
use meetai_server::server::config::ServerConfig;
use meetai_server::services::inngest::InngestClient;
use meetai_server::services::openai::OpenAiCompletionClient;
use meetai_server::services::stream_auth::StreamCredentials;
use meetai_server::services::stream_chat::StreamChatClient;
use meetai_server::services::stream_video::StreamVideoClient;
use meetai_server::version::VERSION;
use meetai_server::web::create_axum_router;
use meetai_server::webhook::{Collaborators, ProcessorSettings, WebhookProcessor};
use sea_orm::{ConnectOptions, Database};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "server.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C.");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Manually check for --version before full parsing to keep the simple output.
    if std::env::args().any(|arg| arg == "--version") {
        println!("Server version: {VERSION}");
        return Ok(());
    }

    let args = Args::parse();

    // The log directory is configurable, so configuration is read first.
    let config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load server configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);
    info!("Starting server, version: {}", VERSION);

    let mut opt = ConnectOptions::new(config.database_url.clone());
    opt.max_connections(10);
    let db_pool = Database::connect(opt)
        .await
        .expect("Failed to create database connection.");

    let credentials = StreamCredentials::new(&config.stream_api_key, &config.stream_api_secret);
    let collaborators = Collaborators {
        store: Arc::new(SeaOrmMeetingStore::new(db_pool)),
        video: Arc::new(StreamVideoClient::new(
            &config.stream_video_url,
            credentials.clone(),
        )),
        chat: Arc::new(StreamChatClient::new(&config.stream_chat_url, credentials)),
        completions: Arc::new(OpenAiCompletionClient::new(
            &config.openai_url,
            &config.openai_api_key,
            &config.openai_model,
        )),
        jobs: Arc::new(InngestClient::new(
            &config.inngest_url,
            &config.inngest_event_key,
        )),
    };
    let settings = ProcessorSettings {
        api_key: config.stream_api_key.clone(),
        call_type: config.call_type.clone(),
        chat_channel_type: config.chat_channel_type.clone(),
        llm_api_key: config.openai_api_key.clone(),
        history_limit: ProcessorSettings::DEFAULT_HISTORY_LIMIT,
    };
    let processor = Arc::new(WebhookProcessor::new(settings, collaborators));

    if config.job_callback_secret.is_none() {
        info!("JOB_CALLBACK_SECRET not set; job callback route disabled.");
    }
    let app = create_axum_router(processor, config.job_callback_secret.clone());

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("Axum HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}
