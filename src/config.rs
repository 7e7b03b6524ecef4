use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::services::advisor::{
    OLLAMA_DEFAULT_MODEL, OLLAMA_DEFAULT_URL, OPENAI_DEFAULT_API_BASE, OPENAI_DEFAULT_MAX_TOKENS,
    OPENAI_DEFAULT_MODEL, ProviderKind,
};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub filter: FilterConfig,
    pub advisor: AdvisorConfig,
    pub logging: LoggingConfig,
}

/// Profiling store connection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub uri: String,
    /// Database whose `system.profile` collection is inspected
    pub database: String,
    /// Bound applied to every store call (default: 10s)
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// Only queries that ran at least this long are considered
    pub min_millis: u64,
}

/// Advisory backend selection and per-backend settings
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub provider: ProviderKind,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_base: String,
    pub openai_max_tokens: u32,
    pub ollama_model: String,
    pub ollama_url: String,
    /// Bound applied to every advisory call (default: 60s)
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

/// Command line arguments for configuration overrides
///
/// Camel-case aliases keep old invocations (`--mongoURI`, `--millis`, ...) working.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "index-advisor")]
#[command(version, about = "Suggest MongoDB indexes for slow profiler queries")]
pub struct CommandLineArgs {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// MongoDB connection URI
    #[arg(long, alias = "mongoURI", value_name = "URI")]
    pub mongo_uri: Option<String>,

    /// Database whose profiler output is inspected
    #[arg(long, alias = "dbName", value_name = "NAME")]
    pub db_name: Option<String>,

    /// Advisory backend
    #[arg(long, alias = "aiProvider", value_enum, value_name = "PROVIDER")]
    pub ai_provider: Option<ProviderKind>,

    /// Ollama model to use: llama3, mistral, etc
    #[arg(long, alias = "ollamaModel", value_name = "MODEL")]
    pub ollama_model: Option<String>,

    /// Ollama chat-completion endpoint
    #[arg(long, value_name = "URL")]
    pub ollama_url: Option<String>,

    /// OpenAI API key
    #[arg(long, alias = "openaiApiKey", value_name = "KEY")]
    pub openai_api_key: Option<String>,

    /// OpenAI model
    #[arg(long, value_name = "MODEL")]
    pub openai_model: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, value_name = "URL")]
    pub openai_api_base: Option<String>,

    /// OpenAI maximum tokens per query
    #[arg(long, alias = "openaiMaxTokens", value_name = "N")]
    pub openai_max_tokens: Option<u32>,

    /// Process queries with execution time >= millis
    #[arg(long, value_name = "MILLIS")]
    pub millis: Option<u64>,

    /// Store call timeout (e.g., "10s", "1m")
    #[arg(long, value_name = "DURATION")]
    pub store_timeout: Option<String>,

    /// Advisory call timeout (e.g., "60s", "2m")
    #[arg(long, value_name = "DURATION")]
    pub advisor_timeout: Option<String>,

    /// Logging level (e.g., "info,index_advisor=debug")
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Also log to a daily rolling file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<String>,
}

impl Config {
    /// Load configuration with command line, environment variable, and file support
    ///
    /// Loading order (priority from highest to lowest):
    /// 1. Command line arguments
    /// 2. Environment variables (prefixed with APP_)
    /// 3. Configuration file (advisor.toml)
    /// 4. Default values
    pub fn load() -> Result<Self, anyhow::Error> {
        Self::load_with(CommandLineArgs::parse())
    }

    pub fn load_with(cli_args: CommandLineArgs) -> Result<Self, anyhow::Error> {
        let config_path = cli_args.config.clone().or_else(Self::find_config_file);
        let mut config = if let Some(config_path) = config_path {
            Self::from_toml(&config_path)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        config.apply_cli_overrides(&cli_args);
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - APP_MONGO_URI, APP_DB_NAME, APP_STORE_TIMEOUT
    /// - APP_MILLIS
    /// - APP_AI_PROVIDER (openai | ollama)
    /// - APP_OPENAI_API_KEY (falls back to OPENAI_API_KEY)
    /// - APP_OPENAI_MODEL, APP_OPENAI_API_BASE, APP_OPENAI_MAX_TOKENS
    /// - APP_OLLAMA_MODEL, APP_OLLAMA_URL
    /// - APP_ADVISOR_TIMEOUT
    /// - APP_LOG_LEVEL, APP_LOG_FILE
    fn apply_env_overrides(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    fn apply_env_from(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(uri) = env("APP_MONGO_URI") {
            self.store.uri = uri;
            tracing::info!("Override store.uri from env");
        }

        if let Some(database) = env("APP_DB_NAME") {
            self.store.database = database;
            tracing::info!("Override store.database from env: {}", self.store.database);
        }

        if let Some(timeout) = env("APP_STORE_TIMEOUT") {
            match parse_duration_to_secs(&timeout) {
                Ok(val) => self.store.timeout_secs = val,
                Err(e) => tracing::warn!(
                    "Invalid APP_STORE_TIMEOUT '{}': {} (keep {})",
                    timeout,
                    e,
                    self.store.timeout_secs
                ),
            }
        }

        if let Some(millis) = env("APP_MILLIS")
            && let Ok(millis) = millis.parse()
        {
            self.filter.min_millis = millis;
            tracing::info!("Override filter.min_millis from env: {}", self.filter.min_millis);
        }

        if let Some(provider) = env("APP_AI_PROVIDER") {
            match ProviderKind::from_str(&provider, true) {
                Ok(kind) => self.advisor.provider = kind,
                Err(e) => tracing::warn!(
                    "Invalid APP_AI_PROVIDER '{}': {} (keep {})",
                    provider,
                    e,
                    self.advisor.provider.as_str()
                ),
            }
        }

        if let Some(key) = env("APP_OPENAI_API_KEY").or_else(|| env("OPENAI_API_KEY")) {
            self.advisor.openai_api_key = Some(key);
            tracing::info!("Override advisor.openai_api_key from env");
        }

        if let Some(model) = env("APP_OPENAI_MODEL") {
            self.advisor.openai_model = model;
        }

        if let Some(api_base) = env("APP_OPENAI_API_BASE") {
            self.advisor.openai_api_base = api_base;
        }

        if let Some(max_tokens) = env("APP_OPENAI_MAX_TOKENS")
            && let Ok(max_tokens) = max_tokens.parse()
        {
            self.advisor.openai_max_tokens = max_tokens;
        }

        if let Some(model) = env("APP_OLLAMA_MODEL") {
            self.advisor.ollama_model = model;
        }

        if let Some(url) = env("APP_OLLAMA_URL") {
            self.advisor.ollama_url = url;
        }

        if let Some(timeout) = env("APP_ADVISOR_TIMEOUT") {
            match parse_duration_to_secs(&timeout) {
                Ok(val) => self.advisor.timeout_secs = val,
                Err(e) => tracing::warn!(
                    "Invalid APP_ADVISOR_TIMEOUT '{}': {} (keep {})",
                    timeout,
                    e,
                    self.advisor.timeout_secs
                ),
            }
        }

        if let Some(level) = env("APP_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(file) = env("APP_LOG_FILE") {
            self.logging.file = Some(file);
        }
    }

    /// Apply command line argument overrides (highest priority)
    fn apply_cli_overrides(&mut self, args: &CommandLineArgs) {
        if let Some(uri) = &args.mongo_uri {
            self.store.uri = uri.clone();
            tracing::info!("Override store.uri from CLI");
        }

        if let Some(database) = &args.db_name {
            self.store.database = database.clone();
            tracing::info!("Override store.database from CLI: {}", self.store.database);
        }

        if let Some(timeout) = &args.store_timeout {
            match parse_duration_to_secs(timeout) {
                Ok(val) => self.store.timeout_secs = val,
                Err(e) => tracing::warn!(
                    "Invalid --store-timeout '{}': {} (keep {})",
                    timeout,
                    e,
                    self.store.timeout_secs
                ),
            }
        }

        if let Some(millis) = args.millis {
            self.filter.min_millis = millis;
        }

        if let Some(provider) = args.ai_provider {
            self.advisor.provider = provider;
        }

        if let Some(key) = &args.openai_api_key {
            self.advisor.openai_api_key = Some(key.clone());
            tracing::info!("Override advisor.openai_api_key from CLI");
        }

        if let Some(model) = &args.openai_model {
            self.advisor.openai_model = model.clone();
        }

        if let Some(api_base) = &args.openai_api_base {
            self.advisor.openai_api_base = api_base.clone();
        }

        if let Some(max_tokens) = args.openai_max_tokens {
            self.advisor.openai_max_tokens = max_tokens;
        }

        if let Some(model) = &args.ollama_model {
            self.advisor.ollama_model = model.clone();
        }

        if let Some(url) = &args.ollama_url {
            self.advisor.ollama_url = url.clone();
        }

        if let Some(timeout) = &args.advisor_timeout {
            match parse_duration_to_secs(timeout) {
                Ok(val) => self.advisor.timeout_secs = val,
                Err(e) => tracing::warn!(
                    "Invalid --advisor-timeout '{}': {} (keep {})",
                    timeout,
                    e,
                    self.advisor.timeout_secs
                ),
            }
        }

        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }

        if let Some(file) = &args.log_file {
            self.logging.file = Some(file.clone());
        }
    }

    /// Validate configuration
    ///
    /// The OpenAI key is checked when the backend is built, not here.
    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.store.uri.trim().is_empty() {
            anyhow::bail!("store.uri cannot be empty");
        }
        if self.store.database.trim().is_empty() {
            anyhow::bail!("store.database cannot be empty");
        }
        if self.store.timeout_secs == 0 {
            anyhow::bail!("store.timeout_secs must be > 0");
        }
        if self.advisor.timeout_secs == 0 {
            anyhow::bail!("advisor.timeout_secs must be > 0");
        }

        match self.advisor.provider {
            ProviderKind::OpenAi => {
                if self.advisor.openai_model.trim().is_empty() {
                    anyhow::bail!("advisor.openai_model cannot be empty");
                }
                if self.advisor.openai_max_tokens == 0 {
                    anyhow::bail!("advisor.openai_max_tokens must be > 0");
                }
            },
            ProviderKind::Ollama => {
                if self.advisor.ollama_model.trim().is_empty() {
                    anyhow::bail!("advisor.ollama_model cannot be empty");
                }
            },
        }

        Ok(())
    }

    fn find_config_file() -> Option<String> {
        let possible_paths = ["conf/advisor.toml", "advisor.toml"];

        possible_paths
            .iter()
            .find(|path| Path::new(path).exists())
            .map(|path| path.to_string())
    }

    fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://127.0.0.1:27017".to_string(),
            database: "default".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            openai_api_key: None,
            openai_model: OPENAI_DEFAULT_MODEL.to_string(),
            openai_api_base: OPENAI_DEFAULT_API_BASE.to_string(),
            openai_max_tokens: OPENAI_DEFAULT_MAX_TOKENS,
            ollama_model: OLLAMA_DEFAULT_MODEL.to_string(),
            ollama_url: OLLAMA_DEFAULT_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

// The key never reaches logs in full
impl fmt::Debug for AdvisorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvisorConfig")
            .field("provider", &self.provider)
            .field("openai_api_key", &self.openai_api_key.as_deref().map(mask_secret))
            .field("openai_model", &self.openai_model)
            .field("openai_api_base", &self.openai_api_base)
            .field("openai_max_tokens", &self.openai_max_tokens)
            .field("ollama_model", &self.ollama_model)
            .field("ollama_url", &self.ollama_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), file: None }
    }
}

// =========================
// Helpers for parsing values
// =========================

fn mask_secret(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "****".to_string()
    }
}

fn parse_duration_to_secs(input: &str) -> Result<u64, String> {
    // Accept plain numbers (treated as seconds)
    if let Ok(val) = input.parse::<u64>() {
        return Ok(val);
    }

    let s = input.trim().to_lowercase();
    let (num_str, unit) = s.split_at(s.chars().take_while(|c| c.is_ascii_digit()).count());
    if num_str.is_empty() || unit.is_empty() {
        return Err("missing number or unit".into());
    }
    let n: u64 = num_str.parse().map_err(|_| "invalid number".to_string())?;
    let factor: u64 = match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hour" | "hours" => 60 * 60,
        _ => return Err(format!("unsupported unit: {}", unit)),
    };
    n.checked_mul(factor).ok_or_else(|| format!("duration too large: {}", input))
}

// Numeric seconds or a human-friendly string
fn deserialize_duration_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Visitor;
    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = u64;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a number of seconds or a string like '10s', '1m'")
        }
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v)
        }
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if v >= 0 { Ok(v as u64) } else { Err(E::custom("negative not allowed")) }
        }
        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_secs(v).map_err(E::custom)
        }
    }
    deserializer.deserialize_any(Visitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_cli_tool() {
        let config = Config::default();
        assert_eq!(config.store.uri, "mongodb://127.0.0.1:27017");
        assert_eq!(config.store.database, "default");
        assert_eq!(config.store.timeout_secs, 10);
        assert_eq!(config.filter.min_millis, 0);
        assert_eq!(config.advisor.provider, ProviderKind::OpenAi);
        assert_eq!(config.advisor.openai_max_tokens, 500);
        assert_eq!(config.advisor.ollama_model, "llama3");
        assert_eq!(config.advisor.timeout_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_with_human_durations() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[store]
uri = "mongodb://db.internal:27017"
database = "shop"
timeout_secs = "30s"

[filter]
min_millis = 250

[advisor]
provider = "ollama"
ollama_model = "mistral"
timeout_secs = "2m"
"#
        )
        .unwrap();

        let config = Config::from_toml(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.store.uri, "mongodb://db.internal:27017");
        assert_eq!(config.store.database, "shop");
        assert_eq!(config.store.timeout_secs, 30);
        assert_eq!(config.filter.min_millis, 250);
        assert_eq!(config.advisor.provider, ProviderKind::Ollama);
        assert_eq!(config.advisor.ollama_model, "mistral");
        assert_eq!(config.advisor.timeout_secs, 120);
        // Untouched sections keep their defaults
        assert_eq!(config.advisor.openai_model, "gpt-3.5-turbo");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_from(env_of(&[
            ("APP_DB_NAME", "analytics"),
            ("APP_MILLIS", "100"),
            ("APP_AI_PROVIDER", "Ollama"),
            ("APP_STORE_TIMEOUT", "1m"),
            ("OPENAI_API_KEY", "sk-fallback"),
        ]));

        assert_eq!(config.store.database, "analytics");
        assert_eq!(config.filter.min_millis, 100);
        assert_eq!(config.advisor.provider, ProviderKind::Ollama);
        assert_eq!(config.store.timeout_secs, 60);
        assert_eq!(config.advisor.openai_api_key.as_deref(), Some("sk-fallback"));
    }

    #[test]
    fn test_prefixed_key_wins_over_fallback() {
        let mut config = Config::default();
        config.apply_env_from(env_of(&[
            ("APP_OPENAI_API_KEY", "sk-app"),
            ("OPENAI_API_KEY", "sk-fallback"),
        ]));
        assert_eq!(config.advisor.openai_api_key.as_deref(), Some("sk-app"));
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env_from(env_of(&[
            ("APP_AI_PROVIDER", "anthropic"),
            ("APP_MILLIS", "fast"),
            ("APP_ADVISOR_TIMEOUT", "5 parsecs"),
        ]));
        assert_eq!(config.advisor.provider, ProviderKind::OpenAi);
        assert_eq!(config.filter.min_millis, 0);
        assert_eq!(config.advisor.timeout_secs, 60);
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = Config::default();
        config.apply_env_from(env_of(&[("APP_DB_NAME", "from_env")]));

        let args = CommandLineArgs::parse_from([
            "index-advisor",
            "--dbName",
            "from_cli",
            "--millis",
            "50",
            "--ai-provider",
            "ollama",
            "--ollamaModel",
            "mistral",
            "--advisor-timeout",
            "90s",
        ]);
        config.apply_cli_overrides(&args);

        assert_eq!(config.store.database, "from_cli");
        assert_eq!(config.filter.min_millis, 50);
        assert_eq!(config.advisor.provider, ProviderKind::Ollama);
        assert_eq!(config.advisor.ollama_model, "mistral");
        assert_eq!(config.advisor.timeout_secs, 90);
    }

    #[test]
    fn test_cli_accepts_openai_aliases() {
        let args = CommandLineArgs::parse_from([
            "index-advisor",
            "--mongoURI",
            "mongodb://other:27017",
            "--aiProvider",
            "openai",
            "--openaiApiKey",
            "sk-cli",
            "--openaiMaxTokens",
            "800",
        ]);
        assert_eq!(args.mongo_uri.as_deref(), Some("mongodb://other:27017"));
        assert_eq!(args.ai_provider, Some(ProviderKind::OpenAi));
        assert_eq!(args.openai_api_key.as_deref(), Some("sk-cli"));
        assert_eq!(args.openai_max_tokens, Some(800));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.store.database = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.advisor.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.advisor.openai_max_tokens = 0;
        assert!(config.validate().is_err());

        // A missing key is not a validation error
        let config = Config::default();
        assert!(config.advisor.openai_api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_masks_api_key() {
        let mut config = AdvisorConfig::default();
        config.openai_api_key = Some("sk-abcdefghijklmnop".to_string());
        let printed = format!("{:?}", config);
        assert!(printed.contains("sk-a...mnop"));
        assert!(!printed.contains("abcdefghijkl"));
    }

    #[test]
    fn test_parse_duration_to_secs() {
        assert_eq!(parse_duration_to_secs("45"), Ok(45));
        assert_eq!(parse_duration_to_secs("10s"), Ok(10));
        assert_eq!(parse_duration_to_secs("2m"), Ok(120));
        assert_eq!(parse_duration_to_secs("1h"), Ok(3600));
        assert!(parse_duration_to_secs("m").is_err());
        assert!(parse_duration_to_secs("3w").is_err());
        assert_eq!(parse_duration_to_secs("307445734561825860m"), Ok(18_446_744_073_709_551_600));
        assert!(parse_duration_to_secs("307445734561825861m").is_err());
        assert!(parse_duration_to_secs("18446744073709551615h").is_err());
    }

    #[test]
    fn test_mask_secret_counts_chars() {
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(mask_secret("sk-abcdefghijklmnop"), "sk-a...mnop");
        assert_eq!(mask_secret("ключ-секретный-äöü"), "ключ...-äöü");
    }
}
