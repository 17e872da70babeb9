//! runlog CLI
//!
//! Entry point for the `runlog` command-line tool.

use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use runlog::config::{
    default_user_config_path, deep_merge, nest, process_env_overrides, EffectiveConfig,
};
use runlog::exit::{self, EXIT_CODE_ERROR, EXIT_CODE_INTERRUPTED, EXIT_CODE_OK};
use runlog::{BackendClient, HttpLogFetcher, LogFetcher, OwnerRef, StopReason, TailManager, TailPolicy};

#[derive(Parser)]
#[command(name = "runlog")]
#[command(about = "Follow image builds and job runs on a script runner backend", version)]
struct Cli {
    /// Path to user config file (default: ~/.config/runlog/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Backend root URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Log fetch cadence in milliseconds
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the log of an image build or a job until it finishes
    Watch {
        #[command(subcommand)]
        target: WatchTarget,
    },

    /// Start building an image
    Build {
        image: String,

        /// Follow the build log
        #[arg(long, short = 'f')]
        follow: bool,
    },

    /// Destroy an image
    Destroy { image: String },

    /// Run a script, creating a job
    Run {
        script: String,

        /// Follow the job log
        #[arg(long, short = 'f')]
        follow: bool,
    },

    /// Kill a running job
    Kill { job: String },

    /// Delete a finished job
    DeleteJob { job: String },

    /// Script schedule commands
    Schedules {
        #[command(subcommand)]
        action: SchedulesCommands,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum WatchTarget {
    /// Follow an image build log
    Image { id: String },
    /// Follow a job log
    Job { id: String },
}

#[derive(Subcommand)]
enum SchedulesCommands {
    /// List the schedules of a script
    List {
        script: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Enable a schedule
    Enable { id: u64 },

    /// Disable a schedule
    Disable { id: u64 },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration and where it came from
    Show {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_CODE_ERROR
        }
    };
    process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let config = load_config(&cli)?;

    if let Commands::Config { action } = &cli.command {
        let ConfigCommands::Show { json } = action;
        return run_config_show(&config, *json);
    }

    let policy = config.tail_policy();
    policy.validate().context("invalid tail policy")?;
    let client = BackendClient::new(&config.client_config()).context("failed to create backend client")?;

    match cli.command {
        Commands::Watch { target } => {
            let owner = match target {
                WatchTarget::Image { id } => OwnerRef::image(id),
                WatchTarget::Job { id } => OwnerRef::job(id),
            };
            follow(client, policy, owner).await
        }
        Commands::Build { image, follow: tail } => {
            client
                .build_image(&image)
                .await
                .with_context(|| format!("failed to start build of image {image}"))?;
            eprintln!("Build started for image {}", image);
            if tail {
                follow(client, policy, OwnerRef::image(image)).await
            } else {
                Ok(EXIT_CODE_OK)
            }
        }
        Commands::Destroy { image } => {
            client
                .destroy_image(&image)
                .await
                .with_context(|| format!("failed to destroy image {image}"))?;
            eprintln!("Image {} destroyed", image);
            Ok(EXIT_CODE_OK)
        }
        Commands::Run { script, follow: tail } => {
            let started = client
                .run_script(&script)
                .await
                .with_context(|| format!("failed to run script {script}"))?;
            println!("{}", started.job_id);
            eprintln!("Job {} started for script {}", started.job_id, script);
            if tail {
                follow(client, policy, OwnerRef::job(started.job_id.to_string())).await
            } else {
                Ok(EXIT_CODE_OK)
            }
        }
        Commands::Kill { job } => {
            client
                .kill_job(&job)
                .await
                .with_context(|| format!("failed to kill job {job}"))?;
            eprintln!("Kill requested for job {}", job);
            Ok(EXIT_CODE_OK)
        }
        Commands::DeleteJob { job } => {
            client
                .delete_job(&job)
                .await
                .with_context(|| format!("failed to delete job {job}"))?;
            eprintln!("Job {} deleted", job);
            Ok(EXIT_CODE_OK)
        }
        Commands::Schedules { action } => run_schedules(&client, action).await,
        Commands::Config { .. } => Ok(EXIT_CODE_OK),
    }
}

fn load_config(cli: &Cli) -> Result<EffectiveConfig> {
    let user_path = match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("config file not found: {}", path.display());
            }
            Some(path.clone())
        }
        None => default_user_config_path(),
    };

    let env = process_env_overrides()?;

    let mut overrides = Vec::new();
    if let Some(url) = &cli.base_url {
        overrides.push(nest("backend.base_url", json!(url)));
    }
    if let Some(ms) = cli.poll_interval_ms {
        overrides.push(nest("tail.poll_interval_ms", json!(ms)));
    }
    let cli_layer = (!overrides.is_empty())
        .then(|| overrides.into_iter().fold(Value::Object(Default::default()), deep_merge));

    let config = EffectiveConfig::build(user_path.as_deref(), env, cli_layer)?;
    Ok(config)
}

/// Tail `owner` until the session stops, printing lines to stdout as they
/// arrive.
async fn follow(client: BackendClient, policy: TailPolicy, owner: OwnerRef) -> Result<i32> {
    let fetcher: Arc<dyn LogFetcher> = Arc::new(HttpLogFetcher::new(client));
    let mut manager = TailManager::new(fetcher, policy);
    let mut session = manager.open(owner.clone()).await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut printed = 0;
    let (reason, error) = loop {
        let changed = tokio::select! {
            changed = session.changed() => changed,
            _ = &mut ctrl_c => {
                info!(owner = %owner, "interrupted");
                manager.close().await;
                eprintln!("Interrupted");
                return Ok(EXIT_CODE_INTERRUPTED);
            }
        };

        let (reason, error) = {
            let snapshot = session.borrow_and_update();
            let mut out = std::io::stdout().lock();
            for line in &snapshot.transcript()[printed..] {
                writeln!(out, "{}", line)?;
            }
            out.flush()?;
            printed = snapshot.transcript().len();
            (snapshot.stop_reason(), snapshot.last_error().cloned())
        };

        if let Some(reason) = reason {
            break (reason, error);
        }
        if changed.is_err() {
            bail!("tail session for {owner} ended unexpectedly");
        }
    };

    match reason {
        StopReason::Terminal(status) => eprintln!("{} finished: {}", owner, status),
        StopReason::Stalled => eprintln!("{}: no new output, stopped following", owner),
        StopReason::NotFound => eprintln!("Error: {} not found", owner),
        StopReason::Unavailable => match error {
            Some(e) => eprintln!("Error: log stream unavailable: {}", e),
            None => eprintln!("Error: log stream unavailable"),
        },
    }

    Ok(exit::for_stop(reason))
}

async fn run_schedules(client: &BackendClient, action: SchedulesCommands) -> Result<i32> {
    match action {
        SchedulesCommands::List { script, json } => {
            let page = client
                .schedules(&script)
                .await
                .with_context(|| format!("failed to list schedules of script {script}"))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
                return Ok(EXIT_CODE_OK);
            }

            if page.schedules.is_empty() {
                println!("No schedules for script {}", script);
                return Ok(EXIT_CODE_OK);
            }

            println!("{:>6}  {:<8}  {:<8}  {:<20}  LAST RUN", "ID", "ENABLED", "RUNNING", "CRON");
            for schedule in &page.schedules {
                let last_run = schedule
                    .last_run_at()
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:>6}  {:<8}  {:<8}  {:<20}  {}",
                    schedule.id,
                    schedule.enabled,
                    schedule.running,
                    schedule.cron.as_deref().unwrap_or("-"),
                    last_run
                );
            }
            if page.total > page.schedules.len() as u64 {
                println!("({} of {} shown)", page.schedules.len(), page.total);
            }
            Ok(EXIT_CODE_OK)
        }
        SchedulesCommands::Enable { id } => {
            client
                .set_schedule_enabled(id, true)
                .await
                .with_context(|| format!("failed to enable schedule {id}"))?;
            eprintln!("Schedule {} enabled", id);
            Ok(EXIT_CODE_OK)
        }
        SchedulesCommands::Disable { id } => {
            client
                .set_schedule_enabled(id, false)
                .await
                .with_context(|| format!("failed to disable schedule {id}"))?;
            eprintln!("Schedule {} disabled", id);
            Ok(EXIT_CODE_OK)
        }
    }
}

fn run_config_show(config: &EffectiveConfig, json: bool) -> Result<i32> {
    if json {
        println!("{}", config.to_json()?);
        return Ok(EXIT_CODE_OK);
    }

    let policy = config.tail_policy();
    println!("base_url:                 {}", config.base_url());
    println!("request_timeout_seconds:  {}", config.request_timeout().as_secs());
    println!("poll_interval_ms:         {}", policy.poll_interval.as_millis());
    println!("max_consecutive_failures: {}", policy.max_consecutive_failures);
    println!();
    println!("Sources (lowest precedence first):");
    for source in &config.sources {
        let mut line = format!("  {:?}", source.origin).to_lowercase();
        if let Some(path) = &source.path {
            line.push_str(&format!("  {}", path));
        }
        if let Some(digest) = &source.digest {
            line.push_str(&format!("  sha256:{}", &digest[..12.min(digest.len())]));
        }
        if !source.keys.is_empty() {
            line.push_str(&format!("  [{}]", source.keys.join(", ")));
        }
        println!("{}", line);
    }
    Ok(EXIT_CODE_OK)
}
