use serde::Deserialize;

/// Database path that selects the in-memory store instead of SQLite.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

fn default_max_pool_size() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    /// Number of shift records that makes a day complete.
    #[serde(default = "default_expected_shifts_per_day")]
    pub expected_shifts_per_day: u64,
    /// How often the reconcile worker looks for days with a missing or outdated rollup.
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
    #[serde(default = "default_reconcile_on_startup")]
    pub reconcile_on_startup: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            expected_shifts_per_day: default_expected_shifts_per_day(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
            reconcile_on_startup: default_reconcile_on_startup(),
        }
    }
}

fn default_expected_shifts_per_day() -> u64 {
    3
}

fn default_reconcile_interval_secs() -> u64 {
    300
}

fn default_reconcile_on_startup() -> bool {
    true
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn uses_in_memory_store(&self) -> bool {
        self.database.path == IN_MEMORY_DATABASE
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.aggregation.expected_shifts_per_day > 0,
            "aggregation.expected_shifts_per_day must be > 0, got {}",
            self.aggregation.expected_shifts_per_day
        );
        anyhow::ensure!(
            self.aggregation.reconcile_interval_secs > 0,
            "aggregation.reconcile_interval_secs must be > 0, got {}",
            self.aggregation.reconcile_interval_secs
        );
        Ok(())
    }
}
