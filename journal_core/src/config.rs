use std::path::PathBuf;

use iroh::SecretKey;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

static DATA_DIR_NAME: &str = "journal_core";
static JOURNAL_DB_NAME: &str = "journal_db.sqlite";
static CONFIG_FILE_NAME: &str = "config.json";

// data_dir_path
// |- journal_core
//    |- journal_db.sqlite
//    |- config.json

fn default_secret_key() -> SecretKey {
    SecretKey::generate(&mut rand::rng())
}

fn default_sweep_interval_secs() -> u64 {
    300
}

/// No policy or proposal may be decided in less than a week.
pub const MIN_APPROVAL_DAYS: i32 = 7;

/// Bounds on a policy's deliberation window, in days.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyLimits {
    pub min_approval_days: i32,
    pub max_approval_days: i32,
}

impl Default for PolicyLimits {
    fn default() -> Self {
        Self {
            min_approval_days: MIN_APPROVAL_DAYS,
            max_approval_days: 30,
        }
    }
}

impl PolicyLimits {
    /// Raise the minimum to [`MIN_APPROVAL_DAYS`] and keep the maximum at or
    /// above the minimum.
    pub fn normalized(self) -> Self {
        let min_approval_days = self.min_approval_days.max(MIN_APPROVAL_DAYS);
        Self {
            min_approval_days,
            max_approval_days: self.max_approval_days.max(min_approval_days),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct JournalConfig {
    /// Secret key for the local node/instance.
    #[serde(default = "default_secret_key")]
    pub(crate) secret_key: SecretKey,

    /// Secret key used for client-side identity/auth (separate from node secret).
    #[serde(default = "default_secret_key")]
    pub(crate) client_secret_key: SecretKey,

    pub(crate) database_path: PathBuf,

    #[serde(default)]
    pub policy_limits: PolicyLimits,

    /// How often the background sweeper resolves overdue proposals.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl JournalConfig {
    /// Creates a new JournalConfig with generated secret keys and the specified data directory
    fn new(data_dir: PathBuf) -> Self {
        JournalConfig {
            secret_key: default_secret_key(),
            client_secret_key: default_secret_key(),
            database_path: data_dir.join(JOURNAL_DB_NAME),
            policy_limits: PolicyLimits::default(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Gets the existing config or initializes a new one if it doesn't exist
pub async fn get_or_init() -> Result<JournalConfig, Box<dyn std::error::Error>> {
    let data_dir = dirs::data_dir().ok_or("failed to find a data directory on this platform")?;

    let journal_dir = data_dir.join(DATA_DIR_NAME);
    let config_path = journal_dir.join(CONFIG_FILE_NAME);

    fs::create_dir_all(&journal_dir).await?;

    if config_path.exists() {
        let mut file = fs::File::open(&config_path).await?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;

        let mut config: JournalConfig = serde_json::from_str(&contents)?;
        let limits = config.policy_limits.normalized();
        if limits != config.policy_limits {
            tracing::warn!(
                configured = ?config.policy_limits,
                effective = ?limits,
                "policy limits out of range, adjusted"
            );
            config.policy_limits = limits;
        }
        tracing::debug!(path = %config_path.display(), "loaded config");
        Ok(config)
    } else {
        let config = JournalConfig::new(journal_dir.clone());

        let json = serde_json::to_string_pretty(&config)?;
        let mut file = fs::File::create(&config_path).await?;
        file.write_all(json.as_bytes()).await?;

        tracing::info!(path = %config_path.display(), "wrote new config");
        Ok(config)
    }
}
