use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub storage: StorageConfig,
    pub oracle: OracleSection,
    pub platform: PlatformSection,
    pub products: ProductsConfig,
    pub gate: GateConfig,
    pub cadence: CadenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("cadence")
                .join("cadence.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_ms: u64,
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            base_url: "https://oracle.example.com".to_string(),
            model: "oracle-large".to_string(),
            api_key_env: "ORACLE_API_KEY".to_string(),
            timeout_ms: 120_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSection {
    pub base_url: String,
    pub page_id: String,
    pub token_env: String,
    pub timeout_ms: u64,
}

impl Default for PlatformSection {
    fn default() -> Self {
        Self {
            base_url: "https://graph.example.com".to_string(),
            page_id: String::new(),
            token_env: "PLATFORM_ACCESS_TOKEN".to_string(),
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductsConfig {
    pub base_url: String,
}

impl Default for ProductsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://products.example.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub max_posts_per_day: usize,
    pub min_interval_hours: i64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_posts_per_day: 5,
            min_interval_hours: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// Seconds between publishing gate ticks
    pub publish_tick_secs: u64,
    /// Seconds between comment engine passes
    pub comment_tick_secs: u64,
    /// Local "HH:MM" for the daily content run
    pub daily_content_at: String,
    /// Local hour for the product cycle
    pub product_cycle_hour: u32,
    /// Local hour for the daily metrics snapshot
    pub metrics_hour: u32,
    /// Local hour for the daily token check
    pub token_check_hour: u32,
    /// Weekday for the trends run ("mon".."sun")
    pub trends_weekday: String,
    /// Local hour for the trends run
    pub trends_hour: u32,
    /// Milliseconds between successive Oracle calls within one run
    pub inter_call_delay_ms: u64,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            publish_tick_secs: 60,
            comment_tick_secs: 300,
            daily_content_at: "07:00".to_string(),
            product_cycle_hour: 8,
            metrics_hour: 6,
            token_check_hour: 5,
            trends_weekday: "mon".to_string(),
            trends_hour: 6,
            inter_call_delay_ms: 3_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            storage: StorageConfig::default(),
            oracle: OracleSection::default(),
            platform: PlatformSection::default(),
            products: ProductsConfig::default(),
            gate: GateConfig::default(),
            cadence: CadenceConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gate.max_posts_per_day == 0 {
            bail!("gate.max_posts_per_day must be at least 1");
        }
        if self.gate.min_interval_hours < 0 {
            bail!("gate.min_interval_hours must not be negative");
        }
        if self.cadence.publish_tick_secs == 0 || self.cadence.comment_tick_secs == 0 {
            bail!("cadence tick intervals must be at least 1 second");
        }
        if self.trends_weekday().is_none() {
            bail!("cadence.trends_weekday must be one of mon..sun");
        }
        Ok(())
    }

    pub fn inter_call_delay(&self) -> Duration {
        Duration::from_millis(self.cadence.inter_call_delay_ms)
    }

    pub fn trends_weekday(&self) -> Option<chrono::Weekday> {
        match self.cadence.trends_weekday.to_lowercase().as_str() {
            "mon" | "monday" => Some(chrono::Weekday::Mon),
            "tue" | "tuesday" => Some(chrono::Weekday::Tue),
            "wed" | "wednesday" => Some(chrono::Weekday::Wed),
            "thu" | "thursday" => Some(chrono::Weekday::Thu),
            "fri" | "friday" => Some(chrono::Weekday::Fri),
            "sat" | "saturday" => Some(chrono::Weekday::Sat),
            "sun" | "sunday" => Some(chrono::Weekday::Sun),
            _ => None,
        }
    }

    /// "HH:MM" for the daily content run, parsed leniently.
    pub fn daily_content_time(&self) -> (u32, u32) {
        let mut parts = self.cadence.daily_content_at.splitn(2, ':');
        let hour = parts.next().and_then(|h| h.trim().parse().ok()).unwrap_or(7);
        let minute = parts.next().and_then(|m| m.trim().parse().ok()).unwrap_or(0);
        (hour, minute)
    }
}
