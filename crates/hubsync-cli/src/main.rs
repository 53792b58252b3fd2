use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tracing::info;

use hubsync_config::secrets::resolve_secrets;
use hubsync_config::Settings;
use hubsync_db::PgRecordStore;
use hubsync_freshdesk::FreshdeskCrm;
use hubsync_github::GithubIdentitySource;
use hubsync_reconcile::ReconcileOutcome;

const USAGE: &str = "usage: hubsync <username> <crm_domain> [--config <path>]...";

#[derive(Parser, Debug)]
#[command(name = "hubsync", version)]
#[command(about = "Sync one GitHub user into the local store and a Freshdesk tenant", long_about = None)]
struct Cli {
    /// GitHub login to reconcile
    username: String,

    /// Freshdesk tenant subdomain (the `acme` in acme.freshdesk.com)
    crm_domain: String,

    /// Layered config paths in merge order
    #[arg(long = "config")]
    config_paths: Vec<String>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<ReconcileOutcome> {
    let paths: Vec<&str> = cli.config_paths.iter().map(String::as_str).collect();
    let loaded = hubsync_config::load_layered_yaml(&paths)?;
    let settings = Settings::from_config_json(&loaded.config_json)?;
    info!(config_hash = %loaded.config_hash, "config loaded");

    let secrets = resolve_secrets(&loaded.config_json)?;

    let identity = GithubIdentitySource::new_with_base_url(
        secrets.github_token,
        &settings.github_api_base_url,
        settings.http_timeout,
    )?;
    let crm = FreshdeskCrm::new(
        secrets.freshdesk_token,
        secrets.freshdesk_password,
        settings.freshdesk_base_url_template,
        settings.http_timeout,
    )?;

    let pool = hubsync_db::connect(&secrets.database_url, settings.database_max_connections).await?;
    hubsync_db::migrate(&pool).await.context("database migration failed")?;
    let store = PgRecordStore::new(pool);

    let outcome =
        hubsync_reconcile::reconcile(&identity, &store, &crm, &cli.username, &cli.crm_domain)
            .await?;
    Ok(outcome)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(_) => {
            println!("Error: {USAGE}");
            return ExitCode::FAILURE;
        }
    };

    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();
    init_tracing();

    match run(&cli).await {
        Ok(outcome) => {
            for line in outcome.messages() {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            // One line on stdout; the full chain is already joined by `{:#}`.
            let msg = format!("{e:#}").replace('\n', " ");
            tracing::error!(error = %msg, "reconcile failed");
            println!("Error: {msg}");
            ExitCode::FAILURE
        }
    }
}
