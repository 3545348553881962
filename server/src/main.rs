mod config;
mod graphql;
mod http;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use directory::{EmployeeRepository, RosterSyncJob, SlackRosterClient};
use migration::{Migrator, MigratorTrait};
use platform_db::{DatabaseSettings, DbPool, connect};
use platform_obs::{ObsConfig, init_tracing, shutdown_tracing};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "kiosk-server", version, about = "Front-desk kiosk backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP + GraphQL server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Reconcile the employee directory against the roster provider once.
    Sync,
    /// Print the GraphQL schema snapshot.
    #[command(name = "schema:print")]
    SchemaPrint {
        #[arg(long, value_name = "FILE", help = "Destination file path")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
    #[arg(long, help = "Do not sync the employee directory at startup")]
    skip_startup_sync: bool,
}

impl From<&ServeCommand> for ServeConfig {
    fn from(value: &ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(ObsConfig::default())?;
    let cli = Cli::parse();
    let app_config = Arc::new(AppConfig::load()?);
    let outcome = match cli.command {
        Command::Serve(cmd) => run_server(cmd, app_config).await,
        Command::Migrate(action) => match action {
            MigrateCommand::Up => migrate_up().await,
            MigrateCommand::Down => migrate_down().await,
        },
        Command::Sync => run_sync_once(app_config).await,
        Command::SchemaPrint { output } => schema_print(output),
    };
    shutdown_tracing();
    outcome
}

fn schema_print(path: Option<PathBuf>) -> Result<()> {
    let sdl = graphql::schema_sdl();
    match path {
        Some(target) => {
            std::fs::write(&target, sdl)
                .with_context(|| format!("failed to write {}", target.display()))?;
            info!(path = %target.display(), "schema snapshot written");
        }
        None => println!("{sdl}"),
    }
    Ok(())
}

async fn setup_pool() -> Result<DbPool> {
    let settings = DatabaseSettings::from_env();
    connect(&settings).await.map_err(Into::into)
}

fn build_sync_job(pool: &DbPool, config: &AppConfig) -> Result<Arc<RosterSyncJob>> {
    let provider = SlackRosterClient::new(config.provider.clone())?;
    let store = EmployeeRepository::new(pool.clone());
    Ok(Arc::new(RosterSyncJob::new(
        Arc::new(provider),
        Arc::new(store),
        config.sync.clone(),
    )))
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let pool = setup_pool().await?;
    ensure_migrations(&pool, cmd.allow_dirty).await?;

    let sync = build_sync_job(&pool, &config)?;
    if !config.provider.has_token() {
        warn!("SLACK_BOT_TOKEN is not set; directory syncs will fail until it is configured");
    }
    if config.sync_on_startup && !cmd.skip_startup_sync {
        directory::spawn_logged(sync.clone(), "startup");
    }
    let scheduled = config.sync_interval.map(|every| {
        info!(every_secs = every.as_secs(), "scheduling periodic directory sync");
        directory::schedule(sync.clone(), every)
    });

    let schema = graphql::build_schema(EmployeeRepository::new(pool.clone()));
    let state = AppState {
        pool,
        schema,
        config: config.clone(),
        sync,
    };
    let served = http::serve((&cmd).into(), state).await;
    if let Some(ticker) = scheduled {
        ticker.abort();
    }
    served
}

async fn run_sync_once(config: Arc<AppConfig>) -> Result<()> {
    let pool = setup_pool().await?;
    ensure_migrations(&pool, false).await?;
    let job = build_sync_job(&pool, &config)?;
    let report = job.run().await.context("directory sync failed")?;
    println!(
        "Synced {} employees ({} pages, {} fetched, {} skipped) in {:.1?}",
        report.employees_count, report.pages, report.fetched, report.skipped, report.elapsed
    );
    Ok(())
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() && !allow_dirty {
        anyhow::bail!(
            "pending migrations detected; run `kiosk-server migrate up` or pass --allow-dirty"
        );
    }
    Ok(())
}

async fn migrate_up() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::up(&pool, None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::down(&pool, Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}
