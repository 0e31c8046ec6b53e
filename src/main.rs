use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::Context;
use clap::{Parser, Subcommand};
use media_queue::config::Config;
use media_queue::logging::init_logging;
use media_queue::{
    ConnectivityMonitor, EnqueueGateway, GraphUploader, Mutation, Notifier, PassReport,
    QueueProcessor, QueueTrigger, SqliteTaskStore, TaskId, TaskStore,
};

#[derive(Parser)]
#[command(name = "media-queue", version, about = "Offline-aware media upload queue")]
struct Cli {
    /// Path of the TOML config file
    #[arg(long, short, default_value = "media-queue.toml")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Queue files for upload
    Enqueue {
        files: Vec<PathBuf>,
        /// Overrides the content type guessed from the extension
        #[arg(long)]
        content_type: Option<String>,
        /// Publish right after queueing
        #[arg(long, default_value_t = false)]
        now: bool,
    },

    /// Upload everything pending or failed
    Publish,

    /// Show the queue
    List,

    /// Remove a queued task
    Cancel {
        id: i64,
    },

    /// Return tasks interrupted mid-upload to the queue
    Recover,
}

struct Runtime {
    store: Arc<dyn TaskStore>,
    connectivity: ConnectivityMonitor,
    trigger: QueueTrigger,
    gateway: EnqueueGateway,
}

impl Runtime {
    fn open(config: &Config, online: bool) -> anyhow::Result<Self> {
        let store: Arc<dyn TaskStore> = Arc::new(
            SqliteTaskStore::open(&config.store.path)
                .with_context(|| format!("Failed to open queue at {}", config.store.path.display()))?,
        );
        let uploader = Arc::new(GraphUploader::from_config(config).context("Failed to build platform client")?);
        let connectivity = ConnectivityMonitor::new(online);

        let processor = QueueProcessor::new(
            store.clone(),
            uploader,
            Arc::new(connectivity.clone()),
            Notifier::default(),
        )
        .with_failure_policy(config.queue.failure_policy);

        let trigger = QueueTrigger::new(Arc::new(processor), connectivity.clone());
        let gateway = EnqueueGateway::new(trigger.clone());

        Ok(Self { store, connectivity, trigger, gateway })
    }

    async fn publish(&self) -> anyhow::Result<PassReport> {
        self.trigger.publish().await.context("Publish failed")
    }
}

/// Small extension table; anything unknown goes through the video path.
fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

fn print_report(report: &PassReport) {
    if report.skipped_offline {
        println!("Offline, nothing uploaded");
        return;
    }
    println!(
        "Attempted {}, uploaded {}, failed {}",
        report.attempted, report.succeeded, report.failed
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging("info");

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    // enqueue only stores; --now uploads as well
    let online = !matches!(cli.cmd, Command::Enqueue { now: false, .. });
    let runtime = Runtime::open(&config, online)?;

    let recovered = runtime.trigger.on_startup().await.context("Failed to recover interrupted uploads")?;

    match cli.cmd {
        Command::Enqueue { files, content_type, now } => {
            anyhow::ensure!(!files.is_empty(), "No files given");

            for file in &files {
                let mime = content_type.as_deref().unwrap_or_else(|| guess_content_type(file));
                let id = runtime
                    .gateway
                    .enqueue_path(file, mime)
                    .await
                    .with_context(|| format!("Failed to queue {}", file.display()))?;
                println!("Queued {} as task {}", file.display(), id);
            }

            if now {
                runtime.connectivity.set_online(true);
                print_report(&runtime.publish().await?);
            }
        }
        Command::Publish => {
            print_report(&runtime.publish().await?);
        }
        Command::List => {
            let tasks = runtime.store.snapshot().await.context("Failed to read queue")?;
            if tasks.is_empty() {
                println!("Queue is empty");
            }
            for task in tasks {
                println!(
                    "{:>5}  {:<9}  {:<5}  {:>12}  {}",
                    task.id, task.status, task.media_kind, task.byte_size, task.display_name
                );
            }
        }
        Command::Cancel { id } => {
            match runtime.gateway.cancel(TaskId(id)).await? {
                Mutation::Applied => println!("Cancelled task {}", id),
                Mutation::NotFound => println!("No task {}", id),
            }
        }
        Command::Recover => {
            println!("Returned {} interrupted task(s) to the queue", recovered);
        }
    }

    Ok(())
}
