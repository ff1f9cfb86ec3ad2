use anyhow::{Context, Result};
use clap::Parser;
use std::{env, fmt, str::FromStr};

/// Object addressing policy.
///
/// Deployments observed in the wild disagree on how uploads are keyed, so
/// the choice is explicit configuration rather than a silent variation:
///
/// - `form`: deterministic `{owner}/avatar{ext}` avatar keys with
///   delete-then-overwrite, `{owner}/form/{index}_{timestamp}{ext}` photo
///   keys, and presigned retrieval URLs.
/// - `random`: collision-resistant `{owner}/photos/{uuid}{ext}` keys for
///   both operations and permanent public URLs, resolvable later through
///   the photo-lookup endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScheme {
    Form,
    Random,
}

impl FromStr for KeyScheme {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "form" => Ok(Self::Form),
            "random" => Ok(Self::Random),
            other => anyhow::bail!("unknown key scheme `{}` (expected `form` or `random`)", other),
        }
    }
}

impl fmt::Display for KeyScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Form => f.write_str("form"),
            Self::Random => f.write_str("random"),
        }
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Store address the service itself talks to (host:port or full URL).
    pub endpoint: String,
    /// Store address reachable by end clients; may equal `endpoint`.
    pub public_endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub use_tls: bool,
    pub region: String,
    pub bucket: String,
    /// Signed-URL lifetime in hours.
    pub expiry_hours: u64,
    pub key_scheme: KeyScheme,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Avatar and photo upload service backed by S3-compatible storage"
)]
pub struct Args {
    /// Host to bind to (overrides MEDIA_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides MEDIA_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Internal object-store endpoint (overrides MEDIA_STORE_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Client-reachable object-store endpoint (overrides MEDIA_STORE_PUBLIC_ENDPOINT)
    #[arg(long)]
    pub public_endpoint: Option<String>,

    /// Object-store access key (overrides MEDIA_STORE_ACCESS_KEY)
    #[arg(long)]
    pub access_key: Option<String>,

    /// Object-store secret key (overrides MEDIA_STORE_SECRET_KEY)
    #[arg(long)]
    pub secret_key: Option<String>,

    /// Reach the store over TLS (overrides MEDIA_STORE_USE_TLS)
    #[arg(long)]
    pub use_tls: bool,

    /// Store region label (overrides MEDIA_STORE_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Bucket name (overrides MEDIA_STORE_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Signed-URL expiry in hours (overrides MEDIA_STORE_URL_EXPIRY_HOURS)
    #[arg(long)]
    pub expiry_hours: Option<u64>,

    /// Object addressing policy: `form` or `random` (overrides MEDIA_STORE_KEY_SCHEME)
    #[arg(long)]
    pub key_scheme: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::merge(Args::parse())
    }

    fn merge(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("MEDIA_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("MEDIA_STORE_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing MEDIA_STORE_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading MEDIA_STORE_PORT"),
        };
        let env_endpoint =
            env::var("MEDIA_STORE_ENDPOINT").unwrap_or_else(|_| "localhost:9000".into());
        let env_public_endpoint = env::var("MEDIA_STORE_PUBLIC_ENDPOINT").ok();
        let env_use_tls = match env::var("MEDIA_STORE_USE_TLS") {
            Ok(value) => parse_bool(&value)
                .with_context(|| format!("parsing MEDIA_STORE_USE_TLS value `{}`", value))?,
            Err(env::VarError::NotPresent) => false,
            Err(err) => return Err(err).context("reading MEDIA_STORE_USE_TLS"),
        };
        let env_region = env::var("MEDIA_STORE_REGION").unwrap_or_else(|_| "us-east-1".into());
        let env_bucket = env::var("MEDIA_STORE_BUCKET").unwrap_or_else(|_| "media".into());
        let env_expiry = match env::var("MEDIA_STORE_URL_EXPIRY_HOURS") {
            Ok(value) => value.parse::<u64>().with_context(|| {
                format!("parsing MEDIA_STORE_URL_EXPIRY_HOURS value `{}`", value)
            })?,
            Err(env::VarError::NotPresent) => 24,
            Err(err) => return Err(err).context("reading MEDIA_STORE_URL_EXPIRY_HOURS"),
        };
        let env_key_scheme = env::var("MEDIA_STORE_KEY_SCHEME").unwrap_or_else(|_| "form".into());

        // Credentials have no sensible default.
        let access_key = args
            .access_key
            .or_else(|| env::var("MEDIA_STORE_ACCESS_KEY").ok())
            .context(
                "object-store access key missing: set --access-key or MEDIA_STORE_ACCESS_KEY",
            )?;
        let secret_key = args
            .secret_key
            .or_else(|| env::var("MEDIA_STORE_SECRET_KEY").ok())
            .context(
                "object-store secret key missing: set --secret-key or MEDIA_STORE_SECRET_KEY",
            )?;

        // --- Merge ---
        let endpoint = args.endpoint.unwrap_or(env_endpoint);
        let public_endpoint = args
            .public_endpoint
            .or(env_public_endpoint)
            .unwrap_or_else(|| endpoint.clone());
        let key_scheme = args
            .key_scheme
            .unwrap_or(env_key_scheme)
            .parse::<KeyScheme>()?;

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            endpoint,
            public_endpoint,
            access_key,
            secret_key,
            use_tls: args.use_tls || env_use_tls,
            region: args.region.unwrap_or(env_region),
            bucket: args.bucket.unwrap_or(env_bucket),
            expiry_hours: args.expiry_hours.unwrap_or(env_expiry),
            key_scheme,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => anyhow::bail!("expected a boolean, got `{}`", other),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fixture shared by unit tests across the crate. Never bootstrapped
    /// against a live store.
    pub(crate) fn test_config() -> AppConfig {
        AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            endpoint: "internal.example:9000".into(),
            public_endpoint: "public.example:9000".into(),
            access_key: "test-access".into(),
            secret_key: "test-secret".into(),
            use_tls: false,
            region: "us-east-1".into(),
            bucket: "media".into(),
            expiry_hours: 24,
            key_scheme: KeyScheme::Form,
        }
    }

    #[test]
    fn test_key_scheme_parsing() {
        assert_eq!("form".parse::<KeyScheme>().unwrap(), KeyScheme::Form);
        assert_eq!("RANDOM".parse::<KeyScheme>().unwrap(), KeyScheme::Random);
        assert!("ordinal".parse::<KeyScheme>().is_err());
    }

    #[test]
    fn test_addr_joins_host_and_port() {
        let mut cfg = test_config();
        cfg.host = "0.0.0.0".into();
        cfg.port = 3000;
        assert_eq!(cfg.addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert!(parse_bool("TRUE").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("maybe").is_err());
    }
}
