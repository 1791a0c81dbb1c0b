use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use jsonwebtoken::Algorithm;
use std::{
    env, fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Development-only signing key, used when `SECRET_KEY` is unset outside `pro`.
const DEV_SECRET_KEY: &str = "dev-secret-key-change-me-0123456789abcdef";
/// One year.
pub const MAX_ACCESS_TOKEN_MINUTES: i64 = 365 * 24 * 60;
/// Ten years.
pub const MAX_REFRESH_TOKEN_DAYS: i64 = 3650;

/// Deployment environment, selects the `.env.<env>` file and the bind host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Local,
    Dev,
    Pro,
}

impl AppEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnv::Local => "local",
            AppEnv::Dev => "dev",
            AppEnv::Pro => "pro",
        }
    }

    /// Loopback for development, all interfaces for production.
    pub fn default_host(&self) -> &'static str {
        match self {
            AppEnv::Pro => "0.0.0.0",
            AppEnv::Local | AppEnv::Dev => "127.0.0.1",
        }
    }
}

impl FromStr for AppEnv {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(AppEnv::Local),
            "dev" => Ok(AppEnv::Dev),
            "pro" => Ok(AppEnv::Pro),
            other => bail!("unknown APP_ENV `{}` (expected local, dev or pro)", other),
        }
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token signing settings.
#[derive(Clone)]
pub struct JwtSettings {
    pub secret_key: String,
    pub algorithm: Algorithm,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
}

impl JwtSettings {
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_token_expire_minutes * 60
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_token_expire_days * 24 * 60 * 60
    }
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret_key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_token_expire_minutes", &self.access_token_expire_minutes)
            .field("refresh_token_expire_days", &self.refresh_token_expire_days)
            .finish()
    }
}

/// Which requests the audit middleware records and how much of them.
#[derive(Debug, Clone)]
pub struct RequestLogSettings {
    pub excluded_paths: Vec<String>,
    pub max_body_length: usize,
}

/// Centralized application configuration.
/// Combines `.env.<env>` files, environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub app_env: AppEnv,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub database_url: String,
    pub db_init: bool,
    pub jwt: JwtSettings,
    pub log_level: String,
    pub cors_origins: Vec<String>,
    pub request_log: RequestLogSettings,
}

/// What the binary should do once configuration is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    Serve,
    Migrate,
    CreateAdmin { user_name: String, password: String },
}

/// Command-line configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Layered user management API")]
pub struct Args {
    /// Host to bind to (overrides APP_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides APP_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides DB_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,

    /// Create or promote an administrator account and exit
    #[arg(long, value_name = "USER_NAME", requires = "admin_password")]
    pub create_admin: Option<String>,

    /// Password for --create-admin
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,
}

impl AppConfig {
    /// Parse environment variables and CLI args into AppConfig and the
    /// requested action. Env files must already be loaded (`load_env_file`).
    pub fn from_env_and_args() -> Result<(Self, CliAction)> {
        let args = Args::parse();
        let mut cfg = Self::from_lookup(|key| env::var(key).ok())?;

        // --- Merge CLI overrides ---
        if let Some(host) = args.host {
            cfg.host = host;
        }
        if let Some(port) = args.port {
            cfg.port = port;
        }
        if let Some(url) = args.database_url {
            cfg.database_url = url;
        }

        let action = match (args.create_admin, args.admin_password) {
            (Some(user_name), Some(password)) => CliAction::CreateAdmin {
                user_name,
                password,
            },
            _ if args.migrate => CliAction::Migrate,
            _ => CliAction::Serve,
        };

        Ok((cfg, action))
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_env: AppEnv = lookup("APP_ENV")
            .unwrap_or_else(|| "dev".into())
            .parse()?;

        let host = lookup("APP_HOST").unwrap_or_else(|| app_env.default_host().into());
        let port = parse_var(&lookup, "APP_PORT", 8000u16)?;
        let debug = parse_bool(&lookup, "DEBUG", app_env != AppEnv::Pro)?;

        let db_name = lookup("DB_NAME").unwrap_or_else(|| "app".into());
        let database_url =
            lookup("DB_URL").unwrap_or_else(|| format!("sqlite://./data/{}.db", db_name));
        let db_init = parse_bool(&lookup, "DB_INIT", false)?;

        let secret_key = match lookup("SECRET_KEY").filter(|s| !s.trim().is_empty()) {
            Some(key) => key,
            None if app_env == AppEnv::Pro => bail!("SECRET_KEY must be set when APP_ENV=pro"),
            None => {
                tracing::warn!("SECRET_KEY not set, using the development key");
                DEV_SECRET_KEY.into()
            }
        };
        let algorithm = parse_algorithm(&lookup("ALGORITHM").unwrap_or_else(|| "HS256".into()))?;
        let access_token_expire_minutes = parse_var(&lookup, "ACCESS_TOKEN_EXPIRE_MINUTES", 30i64)?;
        let refresh_token_expire_days = parse_var(&lookup, "REFRESH_TOKEN_EXPIRE_DAYS", 7i64)?;
        if access_token_expire_minutes <= 0 || refresh_token_expire_days <= 0 {
            bail!("token lifetimes must be positive");
        }
        if access_token_expire_minutes > MAX_ACCESS_TOKEN_MINUTES {
            bail!(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be at most {}",
                MAX_ACCESS_TOKEN_MINUTES
            );
        }
        if refresh_token_expire_days > MAX_REFRESH_TOKEN_DAYS {
            bail!(
                "REFRESH_TOKEN_EXPIRE_DAYS must be at most {}",
                MAX_REFRESH_TOKEN_DAYS
            );
        }

        let cors_origins = split_list(&lookup("CORS_ORIGINS").unwrap_or_else(|| "*".into()));
        let excluded_paths = split_list(
            &lookup("LOG_EXCLUDED_PATHS").unwrap_or_else(|| "/health,/docs,/openapi.json".into()),
        );
        let max_body_length = parse_var(&lookup, "LOG_MAX_BODY_LENGTH", 1000usize)?;

        Ok(Self {
            app_name: lookup("APP_NAME").unwrap_or_else(|| "User Service".into()),
            app_env,
            host,
            port,
            debug,
            database_url,
            db_init,
            jwt: JwtSettings {
                secret_key,
                algorithm,
                access_token_expire_minutes,
                refresh_token_expire_days,
            },
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            cors_origins,
            request_log: RequestLogSettings {
                excluded_paths,
                max_body_length,
            },
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Startup banner.
    pub fn print_summary(&self) {
        tracing::info!(
            env = %self.app_env,
            debug = self.debug,
            database = %redact_url(&self.database_url),
            log_level = %self.log_level,
            "starting {} on http://{}",
            self.app_name,
            self.addr()
        );
    }
}

/// Locate the env file for `app_env` inside `dir`.
///
/// Order: `.env.<app_env>`, then `.env.local`, then `.env.dev`.
pub fn resolve_env_file(dir: &Path, app_env: &str) -> Option<PathBuf> {
    let mut candidates = vec![format!(".env.{}", app_env)];
    for fallback in [".env.local", ".env.dev"] {
        if !candidates.iter().any(|c| c == fallback) {
            candidates.push(fallback.to_string());
        }
    }

    candidates
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Load the resolved env file into the process environment.
/// Variables already set in the environment are kept.
///
/// Runs before logging is set up, so failures are returned for the caller
/// to report.
pub fn load_env_file(dir: &Path, app_env: &str) -> Result<Option<PathBuf>> {
    let Some(path) = resolve_env_file(dir, app_env) else {
        return Ok(None);
    };
    dotenv::from_path(&path).with_context(|| format!("reading {}", path.display()))?;
    Ok(Some(path))
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|err| anyhow!("{}", err))
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        None => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => bail!("parsing {} value `{}`: expected a boolean", key, value),
        },
        None => Ok(default),
    }
}

fn parse_algorithm(value: &str) -> Result<Algorithm> {
    match value.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => bail!("unsupported ALGORITHM `{}` (expected HS256, HS384 or HS512)", other),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Hide credentials embedded in a database URL.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
