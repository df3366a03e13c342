use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, fmt, str::FromStr};

/// Longest expiry S3 accepts for a presigned URL (seven days).
pub const MAX_LINK_TTL_SECS: u32 = 604_800;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Shared password; `None` disables the access gate.
    pub password: Option<String>,
    /// Secret used to sign the session cookie; `None` means a per-process key.
    pub secret_key: Option<String>,
    /// Seconds a rendered listing stays cached.
    pub cache_ttl: u64,
    /// Seconds a generated download link stays valid.
    pub link_ttl: u32,
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_access_key: String,
    pub redis_url: Option<String>,
    /// Mark the session cookie `Secure`; set when served over HTTPS.
    pub secure_cookie: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Browsable directory listing over an S3 bucket")]
pub struct Args {
    /// Host to bind to (overrides BUCKET_INDEX_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides BUCKET_INDEX_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Shared password, empty disables auth (overrides PASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// Session cookie signing secret (overrides SECRET_KEY)
    #[arg(long)]
    pub secret_key: Option<String>,

    /// Listing cache TTL in seconds (overrides CACHE_TTL)
    #[arg(long)]
    pub cache_ttl: Option<u64>,

    /// Download link TTL in seconds (overrides S3_LINK_TTL)
    #[arg(long)]
    pub link_ttl: Option<u32>,

    /// Bucket to list (overrides BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Storage region (overrides S3_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Custom S3-compatible endpoint (overrides S3_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Redis URL for the page cache (overrides REDIS_URL)
    #[arg(long)]
    pub redis_url: Option<String>,

    /// Send the session cookie over HTTPS only (or set SECURE_COOKIE=true)
    #[arg(long)]
    pub secure_cookie: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::from_sources(args, |name| env::var(name))
    }

    /// Merge CLI args over values returned by `lookup`.
    ///
    /// `lookup` has the shape of `std::env::var` so tests can feed a map.
    pub fn from_sources<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let text = |name: &str| -> Result<Option<String>> {
            match lookup(name) {
                Ok(value) if value.trim().is_empty() => Ok(None),
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(err) => Err(err).with_context(|| format!("reading {}", name)),
            }
        };

        let host = match args.host {
            Some(host) => host,
            None => text("BUCKET_INDEX_HOST")?.unwrap_or_else(|| "0.0.0.0".into()),
        };
        let port = match args.port {
            Some(port) => port,
            None => parse_var(text("BUCKET_INDEX_PORT")?, "BUCKET_INDEX_PORT", 3000)?,
        };
        let cache_ttl = match args.cache_ttl {
            Some(ttl) => ttl,
            None => parse_var(text("CACHE_TTL")?, "CACHE_TTL", 300)?,
        };
        let link_ttl = match args.link_ttl {
            Some(ttl) => ttl,
            None => parse_var(text("S3_LINK_TTL")?, "S3_LINK_TTL", 3600)?,
        };
        if link_ttl == 0 || link_ttl > MAX_LINK_TTL_SECS {
            bail!(
                "download link TTL must be between 1 and {} seconds, got {}",
                MAX_LINK_TTL_SECS,
                link_ttl
            );
        }

        let secure_cookie =
            args.secure_cookie || parse_var(text("SECURE_COOKIE")?, "SECURE_COOKIE", false)?;

        let bucket = match args.bucket.or(text("BUCKET")?) {
            Some(bucket) => bucket,
            None => bail!("BUCKET must be set"),
        };
        let access_key = text("ACCESS_KEY")?.context("ACCESS_KEY must be set")?;
        let secret_access_key =
            text("SECRET_ACCESS_KEY")?.context("SECRET_ACCESS_KEY must be set")?;

        Ok(Self {
            host,
            port,
            password: non_empty(args.password).or(text("PASSWORD")?),
            secret_key: non_empty(args.secret_key).or(text("SECRET_KEY")?),
            cache_ttl,
            link_ttl,
            bucket,
            region: args
                .region
                .or(text("S3_REGION")?)
                .unwrap_or_else(|| "us-east-1".into()),
            endpoint: args.endpoint.or(text("S3_ENDPOINT")?),
            access_key,
            secret_access_key,
            redis_url: args.redis_url.or(text("REDIS_URL")?),
            secure_cookie,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn auth_enabled(&self) -> bool {
        self.password.is_some()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &redact(&self.password))
            .field("secret_key", &redact(&self.secret_key))
            .field("cache_ttl", &self.cache_ttl)
            .field("link_ttl", &self.link_ttl)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_access_key", &"<redacted>")
            .field("redis_url", &self.redis_url)
            .field("secure_cookie", &self.secure_cookie)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(value: Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        None => Ok(default),
    }
}
