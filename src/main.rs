use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use goaler::agent::{Agent, GoalAgent, LlmDriver, MockDriver, Responder, SYSTEM_PROMPT};
use goaler::channels::CliChannel;
use goaler::coach::ToneComposer;
use goaler::config::{CoachConfig, ReportConfig, db_path_from_env};
use goaler::llm::{UsageLog, create_provider};
use goaler::report::{ReportGenerator, ReportPeriod, run_scheduled};
use goaler::state::InMemoryStateStore;
use goaler::store::{Database, LibSqlBackend};

#[derive(Parser)]
#[command(name = "goaler", version, about = "Conversational goal-setting coach")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive goal-setting conversation (default)
    Chat,
    /// Write a loot report for the trailing period
    Report {
        #[arg(long, value_enum, default_value_t = ReportPeriod::Monthly)]
        period: ReportPeriod,
        /// Only include goals owned by this user
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long, env = "GOALER_REPORTS_DIR")]
        output_dir: Option<PathBuf>,
        #[arg(long, env = "GOALER_USAGE_LOG")]
        usage_log: Option<PathBuf>,
        /// Cron expression (seconds first); run on every fire time instead of once
        #[arg(long)]
        cron: Option<String>,
    },
}

/// Logs go to stderr so stdout stays the conversation transcript.
/// With a log dir, a daily-rotated file gets a copy.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "goaler.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(false),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

async fn open_database(path: &Path) -> anyhow::Result<Arc<dyn Database>> {
    let db = LibSqlBackend::new_local(path)
        .await
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    Ok(Arc::new(db))
}

async fn chat() -> anyhow::Result<()> {
    println!("--- Goaler 초기화 중... ---");

    let config = match CoachConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("오류: {e}");
            std::process::exit(1);
        }
    };
    let _guard = init_tracing(config.log_dir.as_deref());

    let db = open_database(&config.db_path).await?;
    let store = Arc::new(InMemoryStateStore::new());

    let responder: Arc<dyn Responder> = match &config.llm {
        Some(llm_config) => {
            let llm = create_provider(llm_config)?;
            let agent = Arc::new(GoalAgent::new(db, store, &config.user_id));
            Arc::new(
                LlmDriver::new(agent, llm, SYSTEM_PROMPT, UsageLog::new(&config.usage_log))
                    .with_max_tool_rounds(config.max_tool_rounds),
            )
        }
        None => {
            tracing::info!("Mock mode: replies come from the tone composer");
            Arc::new(MockDriver::new(
                store,
                ToneComposer::new(StdRng::from_entropy()),
            ))
        }
    };

    let channel = Arc::new(CliChannel::new(&config.user_id));
    Agent::new(responder, channel).run().await?;
    Ok(())
}

async fn report(
    period: ReportPeriod,
    user_id: Option<String>,
    output_dir: Option<PathBuf>,
    usage_log: Option<PathBuf>,
    cron: Option<String>,
) -> anyhow::Result<()> {
    let _guard = init_tracing(std::env::var_os("GOALER_LOG_DIR").map(PathBuf::from).as_deref());

    let defaults = ReportConfig::from_env();
    let config = ReportConfig {
        output_dir: output_dir.unwrap_or(defaults.output_dir),
        usage_log: usage_log.unwrap_or(defaults.usage_log),
    };
    let db = open_database(&db_path_from_env()).await?;
    let generator = ReportGenerator::new(db, config);

    match cron {
        Some(expr) => run_scheduled(&generator, &expr, period, user_id.as_deref()).await?,
        None => {
            let path = generator.run_once(period, user_id.as_deref()).await?;
            println!("Report written to {}", path.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat().await,
        Command::Report {
            period,
            user_id,
            output_dir,
            usage_log,
            cron,
        } => report(period, user_id, output_dir, usage_log, cron).await,
    }
}
