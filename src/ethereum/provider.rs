use crate::config::{Config, NetworkConfig};
use alloy::{
    network::EthereumWallet,
    providers::{Provider, ProviderBuilder, RootProvider},
    signers::local::PrivateKeySigner,
    transports::http::{Client, Http},
};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::time::Duration;

use super::watch::{WatchOpts, DEFAULT_POLL_INTERVAL};

#[derive(Debug)]
pub struct ProviderManager {
    providers: HashMap<String, RootProvider<Http<Client>>>,
    config: Config,
}

impl ProviderManager {
    pub fn new(config: Config) -> Result<Self> {
        let mut providers = HashMap::new();

        for (network_name, network_config) in &config.networks {
            let provider = Self::create_provider(network_config)
                .map_err(|e| anyhow!("Network '{}': {}", network_name, e))?;
            providers.insert(network_name.clone(), provider);
        }

        Ok(Self { providers, config })
    }

    fn create_provider(network_config: &NetworkConfig) -> Result<RootProvider<Http<Client>>> {
        let url = network_config
            .rpc_url
            .parse()
            .map_err(|e| anyhow!("Invalid RPC URL '{}': {}", network_config.rpc_url, e))?;
        Ok(ProviderBuilder::new().on_http(url))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn network_name<'a>(&'a self, network: Option<&'a str>) -> &'a str {
        network.unwrap_or(&self.config.default_network)
    }

    pub fn get_provider(&self, network: Option<&str>) -> Result<&RootProvider<Http<Client>>> {
        let network_name = self.network_name(network);
        self.providers
            .get(network_name)
            .ok_or_else(|| anyhow!("Network '{}' not found", network_name))
    }

    /// Provider that fills nonce, gas and chain id and signs with `signer`.
    pub fn wallet_provider(
        &self,
        network: Option<&str>,
        signer: PrivateKeySigner,
    ) -> Result<impl Provider<Http<Client>> + Clone> {
        let network_config = self.get_network_config(network)?;
        let url = network_config
            .rpc_url
            .parse()
            .map_err(|e| anyhow!("Invalid RPC URL '{}': {}", network_config.rpc_url, e))?;

        Ok(ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_http(url))
    }

    pub fn get_network_config(&self, network: Option<&str>) -> Result<&NetworkConfig> {
        let network_name = self.network_name(network);
        self.config
            .networks
            .get(network_name)
            .ok_or_else(|| anyhow!("Network '{}' not configured", network_name))
    }

    pub fn watch_opts(&self, network: Option<&str>) -> WatchOpts {
        let poll_interval = self
            .get_network_config(network)
            .ok()
            .and_then(|n| n.poll_interval_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        WatchOpts { poll_interval }
    }

    pub fn get_available_networks(&self) -> Vec<String> {
        let mut networks: Vec<String> = self.config.networks.keys().cloned().collect();
        networks.sort();
        networks
    }

    pub async fn check_connection(&self, network: Option<&str>) -> Result<bool> {
        let provider = self
            .get_provider(network)
            .map_err(|e| anyhow!("Failed to get provider for connection check: {}", e))?;

        match provider.get_block_number().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::debug!(
                    "Connection check failed for network {}: {}",
                    self.network_name(network),
                    e
                );
                Ok(false)
            }
        }
    }

    /// Fails with a readable message when the network's node is unreachable
    /// or reports a chain id other than the configured one.
    pub async fn validate_network_connection(&self, network: Option<&str>) -> Result<()> {
        let network_name = self.network_name(network);
        let expected = self.get_network_config(network)?.chain_id;

        let chain_id = self.get_chain_id(network).await.map_err(|e| {
            anyhow!(
                "Cannot connect to network '{}': {}. Please check your RPC endpoint configuration and network connectivity.",
                network_name,
                super::utils::interpret_rpc_error(&e.to_string())
            )
        })?;

        if chain_id != expected {
            return Err(anyhow!(
                "Network '{}' is configured with chain id {} but the RPC endpoint reports {}",
                network_name,
                expected,
                chain_id
            ));
        }
        Ok(())
    }

    pub async fn get_chain_id(&self, network: Option<&str>) -> Result<u64> {
        let provider = self.get_provider(network)?;
        let chain_id = provider.get_chain_id().await?;
        Ok(chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_for_every_network() {
        let manager = ProviderManager::new(Config::default()).unwrap();
        assert_eq!(manager.get_available_networks(), vec!["ethereum", "holesky"]);
        assert!(manager.get_provider(None).is_ok());
        assert!(manager.get_provider(Some("holesky")).is_ok());
        assert!(manager.get_provider(Some("polygon")).is_err());
        assert_eq!(manager.get_network_config(Some("holesky")).unwrap().chain_id, 17000);
    }

    #[test]
    fn poll_interval_from_config() {
        let mut config = Config::default();
        config.networks.get_mut("holesky").unwrap().poll_interval_ms = Some(250);
        let manager = ProviderManager::new(config).unwrap();

        assert_eq!(
            manager.watch_opts(Some("holesky")).poll_interval,
            Duration::from_millis(250)
        );
        assert_eq!(manager.watch_opts(None).poll_interval, Duration::from_secs(12));
        assert_eq!(
            manager.watch_opts(Some("missing")).poll_interval,
            DEFAULT_POLL_INTERVAL
        );
    }

    #[test]
    fn rejects_bad_rpc_url() {
        let mut config = Config::default();
        config.networks.get_mut("ethereum").unwrap().rpc_url = "not a url".to_string();
        let err = ProviderManager::new(config).unwrap_err();
        assert!(err.to_string().contains("ethereum"));
    }

    #[test]
    fn wallet_provider_for_configured_network() {
        let manager = ProviderManager::new(Config::default()).unwrap();
        let signer: PrivateKeySigner =
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
                .parse()
                .unwrap();
        assert!(manager.wallet_provider(None, signer.clone()).is_ok());
        assert!(manager.wallet_provider(Some("missing"), signer).is_err());
    }
}
