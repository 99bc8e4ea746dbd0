use alloy::primitives::U256;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub networks: HashMap<String, NetworkConfig>,
    pub default_network: String,
    pub security: SecurityConfig,
    /// Directory searched for compiled artifacts of contracts that are not
    /// embedded, or that should be deployed.
    #[serde(default)]
    pub artifacts_dir: Option<PathBuf>,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub explorer_url: Option<String>,
    pub gas: GasConfig,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    /// Deployed addresses keyed by contract name.
    #[serde(default)]
    pub contracts: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    pub default_gas_limit: u64,
    pub max_gas_price: Option<u64>,
    pub priority_fee: Option<u64>,
}

impl GasConfig {
    /// `(max_fee_per_gas, max_priority_fee_per_gas)` from the configured cap
    /// and tip. Both must be set; the tip never exceeds the cap.
    pub fn eip1559_fees(&self) -> Option<(u128, u128)> {
        let max_fee = u128::from(self.max_gas_price?);
        let tip = u128::from(self.priority_fee?);
        Some((max_fee, tip.min(max_fee)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub allow_write_operations: bool,
    pub require_confirmation: bool,
    pub max_transaction_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub transport: String,
}

const GWEI: u64 = 1_000_000_000;

impl NetworkConfig {
    fn public(
        rpc_url: &str,
        chain_id: u64,
        explorer_url: &str,
        max_gwei: u64,
        tip_gwei: u64,
    ) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
            chain_id,
            explorer_url: Some(explorer_url.to_string()),
            gas: GasConfig {
                default_gas_limit: 300_000,
                max_gas_price: Some(max_gwei * GWEI),
                priority_fee: Some(tip_gwei * GWEI),
            },
            poll_interval_ms: None,
            contracts: BTreeMap::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut ethereum = NetworkConfig::public(
            "https://ethereum-rpc.publicnode.com",
            1,
            "https://etherscan.io",
            50,
            2,
        );
        // one poll per mainnet slot
        ethereum.poll_interval_ms = Some(12_000);

        let holesky = NetworkConfig::public(
            "https://ethereum-holesky-rpc.publicnode.com",
            17000,
            "https://holesky.etherscan.io",
            20,
            1,
        );

        Self {
            networks: HashMap::from([
                ("ethereum".to_string(), ethereum),
                ("holesky".to_string(), holesky),
            ]),
            default_network: "ethereum".to_string(),
            security: SecurityConfig {
                allow_write_operations: false,
                require_confirmation: true,
                max_transaction_value: None,
            },
            artifacts_dir: None,
            server: ServerConfig {
                transport: "stdio".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| anyhow!("Failed to create config directory {:?}: {}", parent, e))?;
        }

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {:?}: {}", path, e))?;

        Ok(())
    }

    /// Loads `path`, or the default config file when it exists, falling back
    /// to built-in defaults. Environment overrides apply in every case.
    pub async fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Self {
        let path = match path {
            Some(path) => Some(path.as_ref().to_path_buf()),
            None => Self::default_config_path().ok().filter(|p| p.is_file()),
        };

        let mut config = match path {
            Some(path) => match Self::load_from_file(&path).await {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("{}; using defaults", e);
                    Self::default()
                }
            },
            None => Self::default(),
        };

        config.apply_env_vars();
        config
    }

    /// Configured deployment address of `contract` on `network`.
    pub fn contract_address(&self, network: &str, contract: &str) -> Option<&str> {
        self.networks
            .get(network)?
            .contracts
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(contract))
            .map(|(_, address)| address.as_str())
    }

    /// Largest value a transaction may carry, when configured.
    pub fn max_transaction_value(&self) -> Result<Option<U256>> {
        self.security
            .max_transaction_value
            .as_deref()
            .map(|v| {
                U256::from_str(v.trim())
                    .map_err(|e| anyhow!("Invalid security.max_transaction_value '{}': {}", v, e))
            })
            .transpose()
    }

    /// Applies `<NETWORK>_RPC_URL` overrides, e.g. `HOLESKY_RPC_URL`.
    fn apply_env_vars(&mut self) {
        self.apply_rpc_overrides(|key| std::env::var(key).ok());
    }

    fn apply_rpc_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        for (network_name, network_config) in &mut self.networks {
            let key = format!(
                "{}_RPC_URL",
                network_name.to_ascii_uppercase().replace('-', "_")
            );
            if let Some(url) = lookup(&key).filter(|url| !url.is_empty()) {
                tracing::info!("Using {} for network {}", key, network_name);
                network_config.rpc_url = url;
            }
        }
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("restaking-bindings").join("config.toml"))
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let sample_config = r#"# restaking-bindings configuration file

# Default network to use when none is specified
default_network = "ethereum"

# Optional directory of Foundry/Hardhat artifacts (<Name>.json or
# <Name>.sol/<Name>.json). Needed for deployments and non-embedded contracts.
# artifacts_dir = "./out"

[networks.ethereum]
rpc_url = "https://ethereum-rpc.publicnode.com"
chain_id = 1
explorer_url = "https://etherscan.io"
poll_interval_ms = 12000

[networks.ethereum.gas]
default_gas_limit = 300000
max_gas_price = 50_000_000_000  # 50 Gwei
priority_fee = 2_000_000_000    # 2 Gwei

# Deployed addresses, looked up by contract name
[networks.ethereum.contracts]
# RestakingPool = "0x..."
# RatioFeed = "0x..."
# ProtocolConfig = "0x..."

[networks.holesky]
rpc_url = "https://ethereum-holesky-rpc.publicnode.com"
chain_id = 17000
explorer_url = "https://holesky.etherscan.io"

[networks.holesky.gas]
default_gas_limit = 300000
max_gas_price = 20_000_000_000  # 20 Gwei
priority_fee = 1_000_000_000    # 1 Gwei

[networks.holesky.contracts]

# Security settings
[security]
allow_write_operations = false
require_confirmation = true
# max_transaction_value = "1000000000000000000"  # 1 ETH in wei

[server]
transport = "stdio"

# Environment variables:
# <NETWORK>_RPC_URL - overrides the rpc_url of that network (ETHEREUM_RPC_URL, HOLESKY_RPC_URL)
# PRIVATE_KEY       - signer for send/deploy when --private-key is not given
"#;
        sample_config.to_string()
    }
}
