//! OpenAutomate command line client
//!
//! Headless access to an OpenAutomate tenant: sign in, pick an organization
//! unit, list agents, and follow live agent/execution status.
//!
//! # Usage
//!
//! ```bash
//! oa_cli login --email ops@acme.test --password '...'
//! oa_cli tenants --select acme
//! oa_cli agents
//! oa_cli watch-agents --seconds 60
//! oa_cli nav -o json
//! ```
//!
//! Configuration comes from `OPENAUTOMATE_*` variables (a `.env` file is
//! read when present).

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::prelude::*;
use url::Url;

use openautomate::api::AccountApi;
use openautomate::auth::FileTokenStorage;
use openautomate::navigation::navigation_for;
use openautomate::notify::{Toast, ToastLevel, ToastSink};
use openautomate::realtime::{apply_agent_statuses, discover_api_url, HubState, UpdateCallback};
use openautomate::types::{StatusChannel, StatusUpdate};
use openautomate::{
    ApiClient, ClientConfig, ListQuery, NavItem, Notifier, RealtimeHub, SessionError, SessionStore,
    TenantApi, TenantSelector,
};

#[derive(Parser)]
#[command(name = "oa_cli")]
#[command(author = "OpenAutomate")]
#[command(version = "0.1.0")]
#[command(about = "Command line client for OpenAutomate tenants")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: pretty (default) or json
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,

    /// Tenant slug (defaults to the last selected one)
    #[arg(long, short = 't', global = true, env = "OPENAUTOMATE_TENANT")]
    tenant: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and persist the session
    Login {
        #[arg(long, env = "OPENAUTOMATE_EMAIL")]
        email: String,

        #[arg(long, env = "OPENAUTOMATE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Revoke the refresh token and forget the session
    Logout,

    /// Show the signed-in user and selected tenant
    Whoami,

    /// List organization units, optionally selecting one
    Tenants {
        /// Slug to remember as the current tenant
        #[arg(long)]
        select: Option<String>,
    },

    /// Show the navigation the user is allowed to see
    Nav,

    /// List bot agents of the tenant
    Agents {
        /// Overlay live status received within this many seconds
        #[arg(long, default_value_t = 0)]
        live_seconds: u64,
    },

    /// Follow live agent status
    WatchAgents {
        /// Stop after this many seconds (0 = until Ctrl-C)
        #[arg(long, default_value_t = 0)]
        seconds: u64,
    },

    /// Follow live execution status
    WatchExecutions {
        /// Stop after this many seconds (0 = until Ctrl-C)
        #[arg(long, default_value_t = 0)]
        seconds: u64,
    },
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "openautomate=info,oa_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let format = cli.format;
    let notifier = Notifier::new(Arc::new(StderrSink { format }));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !notifier.report_unhandled(&e) {
                eprintln!(
                    "{}: session expired or not signed in, run `oa_cli login`",
                    "error".red().bold()
                );
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ClientConfig::from_env().context("invalid configuration")?;
    let ctx = App::new(config).await?;

    match cli.command {
        Commands::Login { email, password } => cmd_login(&ctx, &email, &password, cli.format).await,
        Commands::Logout => cmd_logout(&ctx).await,
        Commands::Whoami => cmd_whoami(&ctx, cli.format).await,
        Commands::Tenants { select } => cmd_tenants(&ctx, select.as_deref(), cli.format).await,
        Commands::Nav => cmd_nav(&ctx, cli.tenant, cli.format).await,
        Commands::Agents { live_seconds } => {
            cmd_agents(&ctx, cli.tenant, live_seconds, cli.format).await
        }
        Commands::WatchAgents { seconds } => {
            cmd_watch(&ctx, cli.tenant, StatusChannel::Agent, seconds, cli.format).await
        }
        Commands::WatchExecutions { seconds } => {
            cmd_watch(&ctx, cli.tenant, StatusChannel::Execution, seconds, cli.format).await
        }
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Everything a command needs, wired once.
struct App {
    config: ClientConfig,
    http: reqwest::Client,
    session: SessionStore,
    client: ApiClient,
    account: AccountApi,
}

impl App {
    async fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed to build HTTP client")?;

        let session = SessionStore::new(FileTokenStorage::new(config.session_file.clone()));
        session.init().context("failed to read session")?;

        let api_url = backend_url(&config, &http).await?;
        let client = ApiClient::from_config(&config, api_url, Arc::new(session.clone()))
            .with_http(http.clone());
        let account = AccountApi::new(client.clone());

        Ok(Self {
            config,
            http,
            session,
            client,
            account,
        })
    }

    fn tenant(&self, flag: Option<String>) -> Result<String> {
        flag.or_else(|| self.session.tenant())
            .ok_or_else(|| anyhow!("no tenant selected, pass --tenant or run `oa_cli tenants --select <slug>`"))
    }

    fn require_login(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            bail!("not signed in, run `oa_cli login`");
        }
        Ok(())
    }

    fn tenant_api(&self, tenant: &str) -> TenantApi {
        TenantApi::new(self.client.clone(), tenant)
    }
}

async fn backend_url(config: &ClientConfig, http: &reqwest::Client) -> Result<Url> {
    if let Some(url) = &config.api_url {
        return Ok(url.clone());
    }
    discover_api_url(http, &config.frontend_url, config.request_timeout)
        .await
        .context("set OPENAUTOMATE_API_URL or OPENAUTOMATE_FRONTEND_URL")
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

async fn cmd_login(ctx: &App, email: &str, password: &str, format: OutputFormat) -> Result<()> {
    let user = match ctx.session.login(&ctx.account, email, password).await {
        Ok(user) => user,
        Err(SessionError::Api(e)) if e.is_unauthorized() => bail!("invalid email or password"),
        Err(e) => return Err(e.into()),
    };
    match format {
        OutputFormat::Json => print_json(&user)?,
        OutputFormat::Pretty => {
            println!("{} Signed in as {}", "OK".green(), user.display_name().bold());
        }
    }
    Ok(())
}

async fn cmd_logout(ctx: &App) -> Result<()> {
    ctx.session.logout(Some(&ctx.account)).await;
    println!("{} Signed out", "OK".green());
    Ok(())
}

async fn cmd_whoami(ctx: &App, format: OutputFormat) -> Result<()> {
    ctx.require_login()?;
    let profile = ctx.account.profile().await?;
    let tenant = ctx.session.tenant();

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "profile": profile,
            "tenant": tenant,
        }))?,
        OutputFormat::Pretty => {
            println!("{} <{}>", format!("{} {}", profile.first_name, profile.last_name).bold(), profile.email);
            println!("  role:   {:?}", profile.system_role);
            println!("  tenant: {}", tenant.as_deref().unwrap_or("-"));
            for ou in &profile.organization_units {
                println!("  {} {} ({} grants)", "•".dimmed(), ou.slug.cyan(), ou.permissions.len());
            }
        }
    }
    Ok(())
}

async fn cmd_tenants(ctx: &App, select: Option<&str>, format: OutputFormat) -> Result<()> {
    ctx.require_login()?;
    let selector = TenantSelector::new(ctx.account.clone(), ctx.session.clone());

    if let Some(slug) = select {
        let unit = selector.select(slug).await?;
        println!("{} Selected {} ({})", "OK".green(), unit.name.bold(), unit.slug.cyan());
        return Ok(());
    }

    let units = selector.list().await?;
    let current = ctx.session.tenant();
    match format {
        OutputFormat::Json => print_json(&units)?,
        OutputFormat::Pretty => {
            if units.is_empty() {
                println!("No organization units. Create one in the web app first.");
            }
            for unit in &units {
                let marker = if current.as_deref() == Some(unit.slug.as_str()) {
                    "*".green().to_string()
                } else {
                    " ".to_string()
                };
                println!("{} {:<24} {}", marker, unit.slug.cyan(), unit.name);
            }
        }
    }
    Ok(())
}

async fn cmd_nav(ctx: &App, tenant: Option<String>, format: OutputFormat) -> Result<()> {
    ctx.require_login()?;
    let tenant = ctx.tenant(tenant)?;
    let profile = ctx.account.profile().await?;
    let items = navigation_for(&profile, &tenant);

    match format {
        OutputFormat::Json => print_json(&items)?,
        OutputFormat::Pretty => print_nav(&items, 0),
    }
    Ok(())
}

fn print_nav(items: &[NavItem], depth: usize) {
    for item in items {
        let indent = "  ".repeat(depth);
        match &item.url {
            Some(url) => println!("{}{} {}", indent, item.title.bold(), url.dimmed()),
            None => println!("{}{}", indent, item.title.bold()),
        }
        print_nav(&item.children, depth + 1);
    }
}

async fn cmd_agents(
    ctx: &App,
    tenant: Option<String>,
    live_seconds: u64,
    format: OutputFormat,
) -> Result<()> {
    ctx.require_login()?;
    let tenant = ctx.tenant(tenant)?;
    let mut agents = ctx.tenant_api(&tenant).list_agents(&ListQuery::new()).await?;

    if live_seconds > 0 {
        let hub = realtime_hub(ctx).start(&tenant, None);
        tokio::time::sleep(Duration::from_secs(live_seconds)).await;
        let changed = apply_agent_statuses(&mut agents, &hub.agents().snapshot());
        tracing::debug!(changed, "applied live agent status");
        hub.shutdown().await;
    }

    match format {
        OutputFormat::Json => print_json(&agents)?,
        OutputFormat::Pretty => {
            for agent in &agents {
                println!(
                    "{:<28} {:<20} {}",
                    agent.name.bold(),
                    agent.machine_name,
                    colorize_status(&agent.status)
                );
            }
        }
    }
    Ok(())
}

async fn cmd_watch(
    ctx: &App,
    tenant: Option<String>,
    channel: StatusChannel,
    seconds: u64,
    format: OutputFormat,
) -> Result<()> {
    ctx.require_login()?;
    let tenant = ctx.tenant(tenant)?;

    let callback: UpdateCallback = Arc::new(move |update_channel, update| {
        if update_channel == channel {
            print_update(update_channel, update, format);
        }
    });
    let hub = realtime_hub(ctx).start(&tenant, Some(callback));
    let mut state = hub.subscribe_state();

    if format == OutputFormat::Pretty {
        eprintln!("{} {} status for {} (Ctrl-C to stop)", "Watching".cyan(), channel.hub_method(), tenant.bold());
    }

    let deadline = async {
        if seconds == 0 {
            std::future::pending::<()>().await
        } else {
            tokio::time::sleep(Duration::from_secs(seconds)).await
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = state.borrow_and_update().clone();
                if let HubState::Disabled(reason) = &current {
                    eprintln!("{}: live updates unavailable ({})", "warning".yellow().bold(), reason);
                    break;
                }
                tracing::debug!(state = ?current, "hub state");
            }
        }
    }

    hub.shutdown().await;
    Ok(())
}

fn realtime_hub(ctx: &App) -> RealtimeHub {
    let mut config = ctx.config.clone();
    config.api_url = Some(ctx.client.base_url().clone());
    RealtimeHub::new(&config, ctx.http.clone(), Arc::new(ctx.session.clone()))
}

// =============================================================================
// OUTPUT
// =============================================================================

fn print_update(channel: StatusChannel, update: &StatusUpdate, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            if let Ok(line) = serde_json::to_string(update) {
                println!("{}", line);
            }
        }
        OutputFormat::Pretty => {
            let key = update.key(channel).unwrap_or("?");
            let name = update.agent_name.as_deref().unwrap_or("");
            println!(
                "{} {:<38} {:<20} {}{}",
                update.timestamp.format("%H:%M:%S").to_string().dimmed(),
                key,
                name,
                colorize_status(&update.status),
                update
                    .message
                    .as_deref()
                    .map(|m| format!("  {}", m.dimmed()))
                    .unwrap_or_default()
            );
        }
    }
    let _ = std::io::stdout().flush();
}

fn colorize_status(status: &str) -> colored::ColoredString {
    match status.to_ascii_lowercase().as_str() {
        "available" | "completed" | "online" => status.green(),
        "busy" | "running" | "pending" => status.yellow(),
        "failed" | "disconnected" | "offline" => status.red(),
        _ => status.normal(),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("JSON serialization failed")?
    );
    Ok(())
}

/// Error toasts on stderr.
struct StderrSink {
    format: OutputFormat,
}

impl ToastSink for StderrSink {
    fn show(&self, toast: Toast) {
        if self.format == OutputFormat::Json {
            let line = serde_json::json!({ "error": toast });
            println!("{}", line);
            return;
        }
        let title = match toast.level {
            ToastLevel::Error => toast.title.red().bold(),
            ToastLevel::Warning => toast.title.yellow().bold(),
            ToastLevel::Success | ToastLevel::Info => toast.title.green().bold(),
        };
        eprintln!("{}: {}", title, toast.description);
    }
}
