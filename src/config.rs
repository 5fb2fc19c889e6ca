use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{OAuthConfig, DEFAULT_TOKEN_DIR, DEFAULT_TOKEN_FILENAME};

/// Zoho CRM command-line client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Data-centre region (united states, europe, india, australia, japan, canada)
    #[arg(short = 'D', long, env = "ZOHO_DOMAIN", default_value = "united states")]
    pub domain: String,

    /// OAuth refresh token
    #[arg(long, env = "ZOHO_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// OAuth client id
    #[arg(long, env = "ZOHO_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, env = "ZOHO_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// OAuth grant type
    #[arg(long, env = "ZOHO_GRANT_TYPE", default_value = "refresh_token")]
    pub grant_type: String,

    /// CRM API base URL, e.g. https://www.zohoapis.com/crm/v2
    #[arg(short = 'b', long, env = "ZOHO_BASE_URL")]
    pub base_url: Option<String>,

    /// Directory holding the cached token file
    #[arg(long, env = "ZOHO_TOKEN_DIR", default_value = DEFAULT_TOKEN_DIR)]
    pub token_dir: String,

    /// Name of the cached token file
    #[arg(long, env = "ZOHO_TOKEN_FILENAME", default_value = DEFAULT_TOKEN_FILENAME)]
    pub token_filename: String,

    /// Override the region's accounts server
    #[arg(long, env = "ZOHO_ACCOUNTS_URL")]
    pub accounts_url: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "300")]
    pub http_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print a valid access token, refreshing it if needed
    Token {
        /// Refresh even if the cached token is still valid
        #[arg(long)]
        force: bool,
    },
    /// Create a record from a JSON object
    Create { module: String, json: String },
    /// Read one record
    Get { module: String, id: String },
    /// Read all records of a module
    List { module: String },
    /// Replace a record with a JSON object
    Update {
        module: String,
        id: String,
        json: String,
    },
    /// Partially update a record
    Patch {
        module: String,
        id: String,
        json: String,
    },
    /// Delete a record
    Delete { module: String, id: String },
    /// Attach a local file or a URL to a record
    Attach {
        module: String,
        id: String,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        url: Option<String>,
    },
    /// List a record's attachments, or fetch one with --file-id
    Attachments {
        module: String,
        id: String,
        #[arg(long)]
        file_id: Option<String>,
    },
    /// Fetch a related list of a record
    Related {
        module: String,
        id: String,
        name: String,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub oauth: OAuthConfig,
    pub base_url: Option<String>,
    pub http_request_timeout: u64,
    pub log_level: String,
}

impl Config {
    /// Build configuration from parsed arguments (CLI > ENV > defaults)
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let refresh_token = args
            .refresh_token
            .clone()
            .context("ZOHO_REFRESH_TOKEN is required (use --refresh-token or set ZOHO_REFRESH_TOKEN env var)")?;
        let client_id = args
            .client_id
            .clone()
            .context("ZOHO_CLIENT_ID is required (use --client-id or set ZOHO_CLIENT_ID env var)")?;
        let client_secret = args
            .client_secret
            .clone()
            .context("ZOHO_CLIENT_SECRET is required (use --client-secret or set ZOHO_CLIENT_SECRET env var)")?;

        let mut oauth = OAuthConfig::new(
            &args.domain,
            refresh_token,
            client_id,
            client_secret,
            args.grant_type.clone(),
        )
        .context("Invalid ZOHO_DOMAIN")?
        .token_dir(expand_tilde(&args.token_dir))
        .token_filename(&args.token_filename)
        .request_timeout(Duration::from_secs(args.http_timeout));

        if let Some(url) = &args.accounts_url {
            oauth = oauth.accounts_url(url.clone());
        }

        Ok(Config {
            oauth,
            base_url: args.base_url.clone(),
            http_request_timeout: args.http_timeout,
            log_level: args.log_level.clone(),
        })
    }

    /// Base URL, required by every command except `token`
    pub fn require_base_url(&self) -> Result<&str> {
        self.base_url
            .as_deref()
            .context("ZOHO_BASE_URL is required (use -b or set ZOHO_BASE_URL env var)")
    }
}

/// Expand tilde (~) in file paths to user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
