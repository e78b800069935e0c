mod script;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use scan_carousel_core::{
    AppConfig, CarouselStore, ContentCatalog, ContentInstance, DetectionSession,
    GestureClassifier, JsonFileStore, Narrator, PageSnapshot, SessionOrchestrator, SnapshotStore,
};
use tracing_subscriber::EnvFilter;

use crate::script::{LogSink, Script, ScriptedCamera, ScriptedDecoder};

const HOME_CONTENT_ID: &str = "home";

fn main() -> scan_carousel_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            script,
            config,
            catalog,
            state,
        } => run_replay(&script, config.as_deref(), catalog.as_deref(), &state),
        Commands::Pages { state } => list_pages(&state),
        Commands::Reset { state } => reset_pages(&state),
    }
}

fn run_replay(
    script_path: &Path,
    config_path: Option<&Path>,
    catalog_path: Option<&Path>,
    state: &Path,
) -> scan_carousel_core::Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let catalog = match catalog_path {
        Some(path) => ContentCatalog::load(path)?,
        None => ContentCatalog::new(),
    };
    let script = Script::load(script_path)?;
    tracing::info!(
        script = ?script_path,
        ticks = script.total_ticks(),
        catalog_entries = catalog.len(),
        "replaying input script"
    );

    let carousel = CarouselStore::restore(
        config.carousel.clone(),
        ContentInstance::new(HOME_CONTENT_ID),
        Box::new(JsonFileStore::new(state)),
        &catalog,
    )?;
    let detection = DetectionSession::new(
        config.detection.clone(),
        Box::new(ScriptedCamera::default()),
        Box::new(ScriptedDecoder::new(script.decode_results.clone())),
    );
    let mut session = SessionOrchestrator::new(
        &config.session,
        GestureClassifier::new(config.gesture.clone()),
        detection,
        carousel,
        Box::new(catalog),
        Narrator::new(Box::new(LogSink::new(script.clip_seconds))),
    );

    let mut elapsed = 0.0_f32;
    for step in &script.steps {
        if step.camera_button {
            let outcome = session.press_camera_button();
            tracing::info!(elapsed, ?outcome, "camera button");
        }
        if step.manual {
            session.request_manual();
        }
        let frame = step.frame(script.dt);
        for _ in 0..step.repeat {
            let report = session.tick(&frame);
            elapsed += script.dt;
            for gesture in &report.gestures {
                tracing::info!(elapsed, ?gesture, "gesture");
            }
            for event in &report.detection {
                tracing::info!(elapsed, ?event, "detection");
            }
            if report.settled {
                tracing::debug!(
                    elapsed,
                    page = session.carousel().current_index(),
                    "carousel settled"
                );
            }
        }
    }

    session.shutdown();
    print_snapshot(&session.carousel().snapshot());
    Ok(())
}

fn list_pages(state: &Path) -> scan_carousel_core::Result<()> {
    match JsonFileStore::new(state).load()? {
        Some(snapshot) => print_snapshot(&snapshot),
        None => println!("no pages saved at {}", state.display()),
    }
    Ok(())
}

fn reset_pages(state: &Path) -> scan_carousel_core::Result<()> {
    JsonFileStore::new(state).clear()?;
    tracing::info!(state = ?state, "page snapshot cleared");
    Ok(())
}

fn print_snapshot(snapshot: &PageSnapshot) {
    println!("{} page(s)", snapshot.total_pages);
    println!("  0  {HOME_CONTENT_ID}");
    for record in &snapshot.records {
        println!(
            "  {}  {}  {}",
            record.index,
            record.content_id,
            record.scan_code.as_deref().unwrap_or("-")
        );
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Scan-to-add product page carousel", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive a session from a scripted input file.
    Replay {
        /// JSON input script.
        script: PathBuf,
        /// Optional JSON config overriding the default thresholds.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// JSON catalog mapping scan codes to content.
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Persisted page snapshot.
        #[arg(long, default_value = "pages.json")]
        state: PathBuf,
    },
    /// Print the persisted pages.
    Pages {
        #[arg(long, default_value = "pages.json")]
        state: PathBuf,
    },
    /// Delete the persisted pages.
    Reset {
        #[arg(long, default_value = "pages.json")]
        state: PathBuf,
    },
}
