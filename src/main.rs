use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use zoho_crm::config::{CliArgs, Command, Config};
use zoho_crm::http_client::{ZohoHttpClient, DEFAULT_CONNECT_TIMEOUT_SECS};
use zoho_crm::{TokenManager, ZohoClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();

    // Initialize logging with a configured level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_level.to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_args(&args)?;
    tracing::debug!(
        domain = %config.oauth.domain,
        token_path = %config.oauth.token_path.display(),
        "Configuration loaded"
    );

    let tokens = Arc::new(
        TokenManager::new(config.oauth.clone()).context("Failed to initialize token manager")?,
    );

    if let Command::Token { force } = &args.command {
        let token = if *force {
            tokens.refresh().await?
        } else {
            tokens.get_access_token().await?
        };
        println!("{}", token);
        return Ok(());
    }

    let http = ZohoHttpClient::new(DEFAULT_CONNECT_TIMEOUT_SECS, config.http_request_timeout)?;
    let client = ZohoClient::with_http_client(config.require_base_url()?, tokens, http);
    let response = run_command(&client, &args.command).await?;

    let status = response.status();
    let body = response.text().await.context("Failed to read response body")?;
    println!("HTTP {}", status);
    println!("{}", pretty(&body));

    if !status.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_command(client: &ZohoClient, command: &Command) -> Result<reqwest::Response> {
    let response = match command {
        Command::Token { .. } => anyhow::bail!("token command does not call the CRM API"),
        Command::Create { module, json } => {
            client.create_record(module, &parse_json(json)?).await?
        }
        Command::Get { module, id } => client.read_record(module, id).await?,
        Command::List { module } => client.read_records(module).await?,
        Command::Update { module, id, json } => {
            client.update_record(module, id, &parse_json(json)?).await?
        }
        Command::Patch { module, id, json } => {
            client.patch_record(module, id, &parse_json(json)?).await?
        }
        Command::Delete { module, id } => client.delete_record(module, id).await?,
        Command::Attach {
            module,
            id,
            file,
            url,
        } => {
            client
                .attach_file(module, id, file.as_deref(), url.as_deref())
                .await?
        }
        Command::Attachments {
            module,
            id,
            file_id,
        } => {
            client
                .fetch_file(module, id, file_id.as_deref(), file_id.is_none())
                .await?
        }
        Command::Related { module, id, name } => {
            client.fetch_related_list(module, id, name).await?
        }
    };
    Ok(response)
}

fn parse_json(raw: &str) -> Result<serde_json::Value> {
    serde_json::from_str(raw).with_context(|| format!("Invalid JSON record: {}", raw))
}

/// Pretty-print JSON bodies, pass anything else through
fn pretty(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| body.to_string())
}
