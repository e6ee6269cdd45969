use anyhow::{Context, Result};
use attendance_face_worker::aws::load_sdk_config;
use attendance_face_worker::config::{load_config, Config};
use attendance_face_worker::db::{open_store, AttendanceStore};
use attendance_face_worker::face::RekognitionComparison;
use attendance_face_worker::key::{ImageRole, ObjectKey};
use attendance_face_worker::logging::init_logging;
use attendance_face_worker::pipeline::{
    parse_envelope, Consumer, ConsumerSettings, Envelope, ImageRouter,
};
use attendance_face_worker::queue::SqsQueue;
use attendance_face_worker::s3::S3Storage;
use aws_config::SdkConfig;
use clap::{Parser, Subcommand};
use std::process;
use std::sync::Arc;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

type Router = ImageRouter<S3Storage, RekognitionComparison, dyn AttendanceStore>;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.toml",
        global = true
    )]
    config: String,

    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Consume upload notifications until interrupted
    Run,
    /// Show how an object key is interpreted
    ParseKey {
        /// Object key as stored in the bucket
        key: String,
    },
    /// Route one saved message body without touching the queue
    Replay {
        /// File holding the message body
        file: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::ParseKey { key } = &cli.command {
        parse_key(key);
        return Ok(());
    }

    let config = match load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", cli.config, e);
            process::exit(1);
        }
    };
    let _log_guard = init_logging(config.logging.as_ref(), cli.verbose)?;

    info!("Attendance face worker v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from: {}", cli.config);

    match cli.command {
        Commands::Run => run_consumer(config).await,
        Commands::Replay { file } => replay(config, &file).await,
        Commands::ParseKey { .. } => Ok(()),
    }
}

fn parse_key(key: &str) {
    match ObjectKey::parse(key) {
        Ok(parsed) => {
            println!("subject_id:    {}", parsed.subject_id);
            println!("attendance_id: {}", parsed.attendance_id);
            match parsed.role {
                ImageRole::Reference => {
                    println!("role:          reference");
                    println!("promoted to:   {}", parsed.reference_image_key());
                }
                ImageRole::Candidate { timestamp } => {
                    println!("role:          candidate (taken at {})", timestamp);
                    println!("compared with: {}", parsed.reference_image_key());
                }
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    }
}

async fn build_router(config: &Config, sdk_config: &SdkConfig) -> Result<Router> {
    let storage = S3Storage::new(sdk_config, &config.s3);
    let faces = RekognitionComparison::new(sdk_config, &config.face);
    let store = open_store(&config.database)
        .await
        .context("Failed to open attendance store")?;

    Ok(ImageRouter::new(
        Arc::new(storage),
        Arc::new(faces),
        store,
        config.pipeline.call_timeout(),
    ))
}

async fn run_consumer(config: Config) -> Result<()> {
    let sdk_config = load_sdk_config(&config.aws).await;
    let router = build_router(&config, &sdk_config).await?;
    let queue = SqsQueue::new(&sdk_config, &config.queue)
        .await
        .context("Failed to connect to queue")?;

    let consumer = Consumer::new(
        Arc::new(queue),
        router,
        ConsumerSettings::from_config(&config),
    );
    consumer.run(shutdown_signal()).await;

    Ok(())
}

async fn replay(config: Config, file: &str) -> Result<()> {
    let body = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read message body from {}", file))?;

    let uploads = match parse_envelope(&body).context("Message body is not a notification")? {
        Envelope::TestEvent => {
            println!("storage test event: nothing to route");
            return Ok(());
        }
        Envelope::Uploads(uploads) => uploads,
    };

    let sdk_config = load_sdk_config(&config.aws).await;
    let router = build_router(&config, &sdk_config).await?;
    let mut failures = 0;
    for upload in &uploads {
        match router.route(upload).await {
            Ok(outcome) => println!("{}: {}", upload, outcome),
            Err(e) => {
                failures += 1;
                error!("Failed to route {}: {}", upload, e);
                println!("{}: failed ({})", upload, e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} record(s) failed", failures, uploads.len());
    }
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}
