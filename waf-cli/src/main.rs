use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, error, info};
use reqwest::{blocking::Client, header};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};

/// WAF Control-Plane CLI Tool
#[derive(Parser)]
#[command(name = "waf-cli")]
#[command(about = "CLI tool for the WAF control-plane API", long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Use credentials from OS environment variables (WAF_USER, WAF_PASS)
    #[arg(long, global = true)]
    osenv: bool,

    /// Username for API authentication
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Password for API authentication
    #[arg(short, long, global = true)]
    pass: Option<String>,

    /// API base URL
    #[arg(long, global = true, default_value = "http://localhost:24042")]
    api_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage virtual host domains
    Domain {
        #[command(subcommand)]
        action: EntityAction,
    },
    /// Manage WAF match rules
    Rule {
        #[command(subcommand)]
        action: EntityAction,
    },
    /// Manage rule-group policies
    Policy {
        #[command(subcommand)]
        action: EntityAction,
    },
    /// Manage blacklist entries
    Blacklist {
        #[command(subcommand)]
        action: EntityAction,
    },
    /// Manage whitelist entries
    Whitelist {
        #[command(subcommand)]
        action: EntityAction,
    },
    /// Query the attack log
    Logs {
        /// Filter by domain fqdn
        #[arg(long)]
        domain: Option<String>,
        /// Filter by client IP
        #[arg(long)]
        client_ip: Option<String>,
        /// Filter by recorded action (block/allow/log)
        #[arg(long)]
        action: Option<String>,
        /// Max rows to return
        #[arg(long, default_value_t = 100)]
        limit: i64,
        /// Row offset for pagination
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
}

#[derive(Subcommand)]
enum EntityAction {
    /// List all entries visible to the authenticated user
    List,
    /// Fetch a single entry by id
    Get { id: i64 },
    /// Create an entry from a JSON file
    Create {
        /// Path to a JSON file describing the new entry
        #[arg(long)]
        file: PathBuf,
    },
    /// Update an entry from a JSON file
    Update {
        id: i64,
        /// Path to a JSON file with the fields to change
        #[arg(long)]
        file: PathBuf,
    },
    /// Delete an entry by id
    Delete { id: i64 },
}

#[derive(Serialize, Deserialize, Debug)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize, Deserialize, Debug)]
struct LoginResponse {
    success: bool,
    token: Option<String>,
    user_id: Option<String>,
    username: Option<String>,
    role: Option<String>,
    tenant: Option<i64>,
    message: String,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let (username, password) = get_credentials(&cli)?;
    debug!("Using API URL: {}", cli.api_url);
    debug!("Using username: {}", username);

    let client = Client::new();
    let token = authenticate(&client, &cli.api_url, &username, &password)?;
    debug!("Authentication successful, token received");

    match &cli.command {
        Commands::Domain { action } => run_entity(&client, &cli.api_url, &token, "domains", action)?,
        Commands::Rule { action } => run_entity(&client, &cli.api_url, &token, "rules", action)?,
        Commands::Policy { action } => run_entity(&client, &cli.api_url, &token, "policies", action)?,
        Commands::Blacklist { action } => run_entity(&client, &cli.api_url, &token, "blacklist", action)?,
        Commands::Whitelist { action } => run_entity(&client, &cli.api_url, &token, "whitelist", action)?,
        Commands::Logs { domain, client_ip, action, limit, offset } => {
            query_logs(&client, &cli.api_url, &token, domain, client_ip, action, *limit, *offset)?
        }
    }

    Ok(())
}

fn get_credentials(cli: &Cli) -> Result<(String, String)> {
    if cli.osenv {
        debug!("Getting credentials from environment variables");
        let username = env::var("WAF_USER").context("WAF_USER environment variable not set")?;
        let password = env::var("WAF_PASS").context("WAF_PASS environment variable not set")?;
        Ok((username, password))
    } else if let (Some(user), Some(pass)) = (&cli.user, &cli.pass) {
        debug!("Using credentials from command line arguments");
        Ok((user.clone(), pass.clone()))
    } else {
        error!("No credentials provided. Use --osenv or provide --user and --pass");
        anyhow::bail!("No credentials provided. Use --osenv or provide --user and --pass");
    }
}

fn authenticate(client: &Client, base_url: &str, username: &str, password: &str) -> Result<String> {
    info!("Authenticating with username: {}", username);

    let login_url = format!("{}/api/v1/users/login", base_url);
    let login_request = LoginRequest {
        username: username.to_string(),
        password: password.to_string(),
    };

    let response = client
        .post(&login_url)
        .json(&login_request)
        .send()
        .context("Failed to send login request")?;

    let login_response = response
        .json::<LoginResponse>()
        .context("Failed to parse login response")?;

    if !login_response.success {
        error!("Authentication failed: {}", login_response.message);
        anyhow::bail!("Authentication failed: {}", login_response.message);
    }

    match login_response.token {
        Some(token) => Ok(token),
        None => {
            error!("No token received despite successful login");
            anyhow::bail!("No token received despite successful login");
        }
    }
}

fn auth_headers(token: &str) -> Result<header::HeaderMap> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token))?,
    );
    Ok(headers)
}

/// Dispatches a `domains`/`rules`/`policies`/`blacklist`/`whitelist` action
/// against its REST resource. All five entities share the same CRUD shape,
/// so one function handles them generically rather than repeating the
/// request plumbing five times.
fn run_entity(client: &Client, base_url: &str, token: &str, resource: &str, action: &EntityAction) -> Result<()> {
    let base = format!("{}/api/v1/{}", base_url, resource);

    let response = match action {
        EntityAction::List => client.get(&base).headers(auth_headers(token)?).send(),
        EntityAction::Get { id } => client.get(format!("{}/{}", base, id)).headers(auth_headers(token)?).send(),
        EntityAction::Create { file } => {
            let body = read_json_file(file)?;
            client.post(&base).headers(auth_headers(token)?).json(&body).send()
        }
        EntityAction::Update { id, file } => {
            let body = read_json_file(file)?;
            client.put(format!("{}/{}", base, id)).headers(auth_headers(token)?).json(&body).send()
        }
        EntityAction::Delete { id } => client.delete(format!("{}/{}", base, id)).headers(auth_headers(token)?).send(),
    }
    .context("Failed to send request")?;

    print_response(response)
}

fn query_logs(
    client: &Client,
    base_url: &str,
    token: &str,
    domain: &Option<String>,
    client_ip: &Option<String>,
    action: &Option<String>,
    limit: i64,
    offset: i64,
) -> Result<()> {
    let mut request = client
        .get(format!("{}/api/v1/logs", base_url))
        .headers(auth_headers(token)?)
        .query(&[("limit", limit.to_string()), ("offset", offset.to_string())]);

    if let Some(domain) = domain {
        request = request.query(&[("domain", domain)]);
    }
    if let Some(client_ip) = client_ip {
        request = request.query(&[("client_ip", client_ip)]);
    }
    if let Some(action) = action {
        request = request.query(&[("action", action)]);
    }

    let response = request.send().context("Failed to query attack log")?;
    print_response(response)
}

fn read_json_file(path: &PathBuf) -> Result<serde_json::Value> {
    let raw = fs::read_to_string(path).context("Failed to read JSON file")?;
    serde_json::from_str(&raw).context("File does not contain valid JSON")
}

fn print_response(response: reqwest::blocking::Response) -> Result<()> {
    let status = response.status();
    let body: serde_json::Value = response.json().unwrap_or(serde_json::Value::Null);
    let pretty = serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string());

    if !status.is_success() {
        error!("Request failed with status {}: {}", status, pretty);
        anyhow::bail!("Request failed with status {}: {}", status, pretty);
    }

    println!("{}", pretty);
    Ok(())
}
