use std::env;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use config::{Config, Environment, File, FileFormat};
use log::{LevelFilter, debug, info};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use blog::api::{self, AppState};
use blog::auth::{ADMIN_ROLE, AuthConfig, AuthState};
use blog::cache::DEFAULT_TTL;
use blog::db::Database;
use blog::user::RegisterRequest;

const APP_NAME: &str = "blog";
const ENV_PREFIX: &str = "BLOG";

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn async_serve(ctx: RuntimeContext, cmd: ServeCommand) -> Result<()> {
    handle_serve(&ctx, cmd).await
}

#[tokio::main]
async fn async_admin(ctx: RuntimeContext, cmd: AdminCommand) -> Result<()> {
    handle_admin(&ctx, cmd).await
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common.clone())?;
    ctx.init_logging()?;
    debug!("resolved paths: {:#?}", ctx.paths);

    match cli.command {
        Command::Serve(cmd) => async_serve(ctx, cmd),
        Command::Init(cmd) => handle_init(&ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Admin { command } => async_admin(ctx, command),
        Command::Completions { shell } => handle_completions(shell),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Blog - blogging platform API server.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Config file (or directory containing `config.toml`)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// More log output: -v for debug, -vv for trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Log as JSON lines and print command results as JSON
    #[arg(long, global = true)]
    json: bool,
    /// When to color log output
    #[arg(long, value_enum, default_value_t = ColorOption::Auto, global = true)]
    color: ColorOption,
    /// Report what would be written without touching disk or database
    #[arg(long = "dry-run", global = true)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorOption {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeCommand),
    /// Create config directories and default files
    Init(InitCommand),
    /// Inspect and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Manage accounts from the command line
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct ServeCommand {
    /// Host address to bind to (overrides config)
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Debug, Clone, Args)]
struct InitCommand {
    /// Recreate configuration even if it already exists
    #[arg(long = "force")]
    force: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Output the effective configuration
    Show,
    /// Print the resolved config file path
    Path,
    /// Regenerate the default configuration file
    Reset,
}

#[derive(Debug, Subcommand)]
enum AdminCommand {
    /// Create an account with the admin role and print its generated password
    Create(AdminCreateCommand),
    /// Grant a role to an existing account
    Grant(AdminGrantCommand),
}

#[derive(Debug, Clone, Args)]
struct AdminCreateCommand {
    /// Display name
    #[arg(long)]
    name: String,
    /// Login email
    #[arg(long)]
    email: String,
}

#[derive(Debug, Clone, Args)]
struct AdminGrantCommand {
    /// Login email of the account
    #[arg(long)]
    email: String,
    /// Role slug to grant
    #[arg(long, default_value = ADMIN_ROLE)]
    role: String,
}

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    paths: AppPaths,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let paths = AppPaths::discover(common.config.clone())?;
        let config = load_or_init_config(&paths, &common)?;
        let paths = paths.apply_overrides(&config)?;
        let ctx = Self {
            common,
            paths,
            config,
        };
        ctx.ensure_directories()?;
        Ok(ctx)
    }

    fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        let level = self.log_level();
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = level.to_string().to_lowercase();
            EnvFilter::new(format!("{APP_NAME}={level},tower_http={level}"))
        });

        let fmt = tracing_subscriber::fmt::layer().with_target(false);
        let registry = tracing_subscriber::registry().with(filter);
        if self.common.json {
            registry.with(fmt.json()).try_init().ok();
        } else {
            registry.with(fmt.with_ansi(self.use_color())).try_init().ok();
        }

        // Handles `log` records if the tracing log bridge was not installed.
        env_logger::Builder::new()
            .filter_level(level)
            .format_timestamp(None)
            .try_init()
            .ok();
        Ok(())
    }

    fn use_color(&self) -> bool {
        match self.common.color {
            ColorOption::Always => true,
            ColorOption::Never => false,
            ColorOption::Auto => env::var_os("NO_COLOR").is_none() && io::stderr().is_terminal(),
        }
    }

    /// `-q` and `-v` win over `logging.level` from the config.
    fn log_level(&self) -> LevelFilter {
        if self.common.quiet {
            return LevelFilter::Error;
        }
        match self.common.verbose {
            0 => self
                .config
                .logging
                .level
                .parse()
                .unwrap_or(LevelFilter::Info),
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn ensure_directories(&self) -> Result<()> {
        if self.common.dry_run {
            info!(
                "dry-run: would ensure data dir {}",
                self.paths.data_dir.display()
            );
            return Ok(());
        }

        fs::create_dir_all(&self.paths.data_dir).with_context(|| {
            format!("creating data directory {}", self.paths.data_dir.display())
        })
    }

    async fn open_database(&self) -> Result<Database> {
        match &self.config.database.url {
            Some(url) => {
                info!("Database: {}", url);
                Database::connect(url).await
            }
            None => {
                let path = self.paths.data_dir.join("blog.db");
                info!("Database path: {}", path.display());
                Database::new(&path).await
            }
        }
    }

    fn app_state(&self, db: &Database) -> Result<AppState> {
        let auth = AuthState::new(self.config.auth.clone())
            .context("Invalid auth configuration")?;
        Ok(AppState::new(db, auth, self.config.cache.ttl()))
    }
}

#[derive(Debug, Clone)]
struct AppPaths {
    config_file: PathBuf,
    data_dir: PathBuf,
}

impl AppPaths {
    fn discover(override_path: Option<PathBuf>) -> Result<Self> {
        let config_file = match override_path {
            Some(path) => {
                let expanded = expand_path(&path.to_string_lossy())?;
                if expanded.is_dir() {
                    expanded.join("config.toml")
                } else {
                    expanded
                }
            }
            None => default_config_dir()?.join("config.toml"),
        };

        if config_file.parent().is_none() {
            return Err(anyhow!("invalid config file path: {config_file:?}"));
        }

        Ok(Self {
            config_file,
            data_dir: default_data_dir()?,
        })
    }

    fn apply_overrides(mut self, cfg: &AppConfig) -> Result<Self> {
        if let Some(ref data_override) = cfg.paths.data_dir {
            self.data_dir = expand_path(data_override)?;
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct AppConfig {
    logging: LoggingConfig,
    paths: PathsConfig,
    server: ServerConfig,
    database: DatabaseConfig,
    auth: AuthConfig,
    cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct LoggingConfig {
    level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
struct PathsConfig {
    data_dir: Option<String>,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ServerConfig {
    host: String,
    port: u16,
    /// Maximum request body size in megabytes.
    max_body_size_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_body_size_mb: 2,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
struct DatabaseConfig {
    /// `sqlite://` connection string. Defaults to `blog.db` in the data dir.
    url: Option<String>,
}

/// List cache configuration for categories, tags and roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct CacheConfig {
    ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL.as_secs(),
        }
    }
}

impl CacheConfig {
    fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

fn handle_init(ctx: &RuntimeContext, cmd: InitCommand) -> Result<()> {
    if ctx.paths.config_file.exists() && !cmd.force {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            ctx.paths.config_file.display()
        ));
    }

    if ctx.common.dry_run {
        info!(
            "dry-run: would write default config to {}",
            ctx.paths.config_file.display()
        );
        return Ok(());
    }

    write_default_config(&ctx.paths.config_file)
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            if ctx.common.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ctx.config)
                        .context("serializing config to JSON")?
                );
            } else {
                println!(
                    "{}",
                    toml::to_string_pretty(&ctx.config).context("serializing config to TOML")?
                );
            }
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", ctx.paths.config_file.display());
            Ok(())
        }
        ConfigCommand::Reset => {
            if ctx.common.dry_run {
                info!(
                    "dry-run: would reset config at {}",
                    ctx.paths.config_file.display()
                );
                return Ok(());
            }
            write_default_config(&ctx.paths.config_file)
        }
    }
}

fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
    Ok(())
}

async fn handle_admin(ctx: &RuntimeContext, cmd: AdminCommand) -> Result<()> {
    if ctx.common.dry_run {
        info!("dry-run: would run admin command {:?}", cmd);
        return Ok(());
    }

    let db = ctx.open_database().await?;
    let state = ctx.app_state(&db)?;

    match cmd {
        AdminCommand::Create(args) => {
            let registration = state
                .users
                .register(RegisterRequest {
                    name: args.name,
                    email: args.email,
                    password: None,
                    bio: None,
                    image: None,
                })
                .await?;
            let id = state
                .users
                .find_id_by_email(&registration.user)
                .await?
                .ok_or_else(|| anyhow!("account vanished after creation"))?;
            state.users.add_role_by_slug(id, ADMIN_ROLE).await?;

            if ctx.common.json {
                println!("{}", serde_json::to_string_pretty(&registration)?);
            } else {
                println!("user:     {}", registration.user);
                println!("password: {}", registration.password);
            }
        }
        AdminCommand::Grant(args) => {
            let id = state
                .users
                .find_id_by_email(&args.email)
                .await?
                .ok_or_else(|| anyhow!("no account for {}", args.email))?;
            let roles = state.users.add_role_by_slug(id, &args.role).await?;

            if ctx.common.json {
                println!("{}", serde_json::to_string_pretty(&roles)?);
            } else {
                let slugs: Vec<&str> = roles.roles.iter().map(|r| r.slug.as_str()).collect();
                println!("{} now has roles: {}", roles.email, slugs.join(", "));
            }
        }
    }

    Ok(())
}

async fn handle_serve(ctx: &RuntimeContext, cmd: ServeCommand) -> Result<()> {
    info!("Starting blog API server...");

    let db = ctx.open_database().await?;
    let state = ctx.app_state(&db)?;
    let app = api::create_router(state, ctx.config.server.max_body_size_mb);

    let host = cmd.host.unwrap_or_else(|| ctx.config.server.host.clone());
    let port = cmd.port.unwrap_or(ctx.config.server.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    info!("Listening on http://{}", addr);

    let shutdown_signal = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c().await.ok();
        };

        #[cfg(unix)]
        let terminate = async {
            if let Ok(mut signal) =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            {
                signal.recv().await;
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        info!("Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("running server")?;

    Ok(())
}

fn load_or_init_config(paths: &AppPaths, common: &CommonOpts) -> Result<AppConfig> {
    if !paths.config_file.exists() {
        if common.dry_run {
            info!(
                "dry-run: would create default config at {}",
                paths.config_file.display()
            );
        } else {
            write_default_config(&paths.config_file)?;
        }
    }

    let built = Config::builder()
        .set_default("logging.level", "info")?
        .add_source(
            File::from(paths.config_file.as_path())
                .format(FileFormat::Toml)
                .required(false),
        )
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    Ok(built.try_deserialize()?)
}

/// Write a default config with a freshly generated signing secret.
fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    let mut config = AppConfig::default();
    config.auth.jwt_secret = Some(AuthConfig::generate_jwt_secret());
    let toml = toml::to_string_pretty(&config).context("serializing default config to TOML")?;
    let mut body = default_config_header(path);
    body.push_str(&toml);
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))
}

fn default_config_header(path: &Path) -> String {
    format!(
        "# {APP_NAME} configuration ({})\n\
         # Any key can be overridden from the environment, e.g. {ENV_PREFIX}_SERVER__PORT=9000\n\
         # or {ENV_PREFIX}_AUTH__JWT_SECRET=env:MY_SECRET_VAR\n\n",
        path.display()
    )
}

/// Expand `~` and `$VARS` in a configured path.
fn expand_path(text: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(text).with_context(|| format!("expanding path {text}"))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// `$XDG_*_HOME/blog`, else the platform directory, else `~/<fallback>/blog`.
fn app_dir(xdg_var: &str, platform: Option<PathBuf>, fallback: &[&str]) -> Result<PathBuf> {
    let base = env::var_os(xdg_var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or(platform)
        .or_else(|| dirs::home_dir().map(|home| fallback.iter().fold(home, |p, c| p.join(c))))
        .ok_or_else(|| anyhow!("cannot locate a home directory for {xdg_var}"))?;
    Ok(base.join(APP_NAME))
}

fn default_config_dir() -> Result<PathBuf> {
    app_dir("XDG_CONFIG_HOME", dirs::config_dir(), &[".config"])
}

fn default_data_dir() -> Result<PathBuf> {
    app_dir("XDG_DATA_HOME", dirs::data_dir(), &[".local", "share"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_flags() {
        let cli = Cli::parse_from(["blog", "-vv", "config", "path"]);
        assert_eq!(cli.common.verbose, 2);
        assert!(Cli::try_parse_from(["blog", "-q", "-v", "config", "path"]).is_err());
    }

    #[test]
    fn test_default_config_roundtrips_through_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths {
            config_file: dir.path().join("config.toml"),
            data_dir: dir.path().join("data"),
        };
        let common = Cli::parse_from(["blog", "config", "path"]).common;

        let config = load_or_init_config(&paths, &common).unwrap();
        assert!(paths.config_file.exists());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cache.ttl(), DEFAULT_TTL);
        assert_eq!(config.auth.token_ttl_hours, 8);
        assert!(config.auth.validate().is_ok());
    }

    #[test]
    fn test_config_header_mentions_env_prefix() {
        let header = default_config_header(Path::new("/tmp/blog/config.toml"));
        assert!(header.contains("BLOG_AUTH__JWT_SECRET"));
    }

    #[test]
    fn test_cli_parses_admin_create() {
        let cli = Cli::parse_from([
            "blog",
            "admin",
            "create",
            "--name",
            "Root",
            "--email",
            "root@example.com",
        ]);
        assert!(matches!(
            cli.command,
            Command::Admin {
                command: AdminCommand::Create(_)
            }
        ));
    }
}
