use alloy::{
    json_abi::{JsonAbi, StateMutability},
    primitives::{Address, U256},
    providers::{Provider, RootProvider},
    rpc::types::Filter,
    transports::http::{Client, Http},
};
use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{
    bound::{self, BoundContract, CallOpts, TransactOpts},
    codec::{self, DecodedLog},
    watch::{EventSubscription, FilterOpts},
    CallResult, ContractInfo, EventInfo, FunctionCall, FunctionSignature, TransactionInfo,
};
use crate::{
    bindings::{Artifact, ContractKind},
    ethereum::{abi::AbiResolver, provider::ProviderManager, utils},
};

type HttpContract = BoundContract<Http<Client>, RootProvider<Http<Client>>>;

/// One row of [`ContractManager::list_contracts`].
#[derive(Debug, Clone, Serialize)]
pub struct ContractEntry {
    pub name: String,
    pub alias: Option<String>,
    pub interface: bool,
    pub embedded: bool,
    pub address: Option<String>,
}

#[derive(Debug)]
pub struct ContractManager {
    provider_manager: ProviderManager,
    abi_resolver: AbiResolver,
}

impl ContractManager {
    pub fn new(provider_manager: ProviderManager) -> Self {
        let abi_resolver = AbiResolver::new(provider_manager.config().artifacts_dir.clone());
        Self {
            provider_manager,
            abi_resolver,
        }
    }

    pub fn provider_manager(&self) -> &ProviderManager {
        &self.provider_manager
    }

    pub fn abi_resolver_mut(&mut self) -> &mut AbiResolver {
        &mut self.abi_resolver
    }

    fn check_network(&self, network: Option<&str>) -> Result<()> {
        if let Some(net) = network {
            let available_networks = self.provider_manager.get_available_networks();
            utils::validate_network(net, &available_networks)
                .map_err(|e| anyhow!("Network validation failed: {}", e))?;
        }
        Ok(())
    }

    /// Explicit address if given, else the deployment configured for
    /// `contract` on the network.
    pub fn resolve_address(
        &self,
        contract: &str,
        address: Option<&str>,
        network: Option<&str>,
    ) -> Result<Option<Address>> {
        if let Some(address) = address {
            return utils::validate_address(address)
                .map(Some)
                .map_err(|e| anyhow!("Invalid contract address: {}", e));
        }

        let network_name = self.provider_manager.network_name(network);
        match self
            .provider_manager
            .config()
            .contract_address(network_name, contract)
        {
            Some(configured) => utils::validate_address(configured).map(Some).map_err(|e| {
                anyhow!(
                    "Invalid address configured for {} on {}: {}",
                    contract,
                    network_name,
                    e
                )
            }),
            None => Ok(None),
        }
    }

    fn require_address(
        &self,
        contract: &str,
        address: Option<&str>,
        network: Option<&str>,
    ) -> Result<Address> {
        self.resolve_address(contract, address, network)?
            .ok_or_else(|| {
                anyhow!(
                    "No address for {} on network '{}'. Pass an address or add it under [networks.{}.contracts] in the config file.",
                    contract,
                    self.provider_manager.network_name(network),
                    self.provider_manager.network_name(network)
                )
            })
    }

    async fn artifact(&mut self, contract: &str) -> Result<Artifact> {
        self.abi_resolver
            .resolve_name(contract)
            .await
            .map_err(|e| anyhow!(utils::interpret_abi_error(&e.to_string(), contract)))
    }

    async fn bind(
        &mut self,
        contract: &str,
        address: Option<&str>,
        network: Option<&str>,
    ) -> Result<HttpContract> {
        self.check_network(network)?;
        let artifact = self.artifact(contract).await?;
        let address = self.require_address(&artifact.name, address, network)?;
        let provider = self
            .provider_manager
            .get_provider(network)
            .map_err(|e| anyhow!("Failed to get provider: {}", e))?
            .clone();
        Ok(BoundContract::new(address, artifact.abi, provider))
    }

    fn call_opts(function_call: &FunctionCall, block: Option<u64>) -> Result<CallOpts> {
        let from = function_call
            .from
            .as_deref()
            .map(utils::validate_address)
            .transpose()
            .map_err(|e| anyhow!("Invalid 'from' address: {}", e))?;
        Ok(CallOpts { from, block })
    }

    fn transact_opts(function_call: &FunctionCall) -> Result<TransactOpts> {
        let from = function_call
            .from
            .as_deref()
            .map(utils::validate_address)
            .transpose()
            .map_err(|e| anyhow!("Invalid 'from' address: {}", e))?;
        let value = function_call
            .value
            .as_deref()
            .map(utils::validate_hex_value)
            .transpose()
            .map_err(|e| anyhow!("Invalid transaction value: {}", e))?;
        let gas_price = function_call
            .gas_price
            .as_deref()
            .map(|p| utils::validate_hex_value(p).map(|v| v.saturating_to::<u128>()))
            .transpose()
            .map_err(|e| anyhow!("Invalid gas price: {}", e))?;

        Ok(TransactOpts {
            from,
            value,
            gas_limit: function_call.gas_limit,
            gas_price,
            ..Default::default()
        })
    }

    fn check_value_limit(&self, value: Option<U256>) -> Result<()> {
        let (Some(value), Some(limit)) = (
            value,
            self.provider_manager.config().max_transaction_value()?,
        ) else {
            return Ok(());
        };
        if value > limit {
            return Err(anyhow!(
                "Transaction value {} exceeds the configured max_transaction_value {}",
                value,
                limit
            ));
        }
        Ok(())
    }

    fn check_writes_allowed(&self) -> Result<()> {
        if !self.provider_manager.config().security.allow_write_operations {
            return Err(anyhow!(
                "Write operations are disabled. Use --allow-writes flag or set security.allow_write_operations to enable transactions."
            ));
        }
        Ok(())
    }

    /// Embedded contracts plus loaded artifacts, with their configured
    /// address on the network.
    pub fn list_contracts(&self, network: Option<&str>) -> Result<Vec<ContractEntry>> {
        self.check_network(network)?;

        let mut entries: Vec<ContractEntry> = ContractKind::ALL
            .iter()
            .map(|kind| ContractEntry {
                name: kind.name().to_string(),
                alias: Some(kind.alias().to_string()),
                interface: kind.is_interface(),
                embedded: true,
                address: None,
            })
            .collect();
        entries.extend(
            self.abi_resolver
                .cached_names()
                .into_iter()
                .map(|name| ContractEntry {
                    name,
                    alias: None,
                    interface: false,
                    embedded: false,
                    address: None,
                }),
        );

        for entry in &mut entries {
            entry.address = self
                .resolve_address(&entry.name, None, network)?
                .map(|a| a.to_checksum(None));
        }
        Ok(entries)
    }

    pub async fn get_contract_info(
        &mut self,
        contract: &str,
        address: Option<&str>,
        network: Option<&str>,
    ) -> Result<ContractInfo> {
        self.check_network(network)?;
        let artifact = self.artifact(contract).await?;
        let address = self.resolve_address(&artifact.name, address, network)?;

        let has_code = match address {
            Some(address) => {
                let provider = self.provider_manager.get_provider(network)?;
                debug!("Fetching code for {} at {:?}", artifact.name, address);
                match provider.get_code_at(address).await {
                    Ok(code) => Some(!code.is_empty()),
                    Err(e) => {
                        warn!(
                            "Could not fetch code at {}: {}",
                            address,
                            utils::interpret_rpc_error(&e.to_string())
                        );
                        None
                    }
                }
            }
            None => None,
        };

        if has_code == Some(false) {
            warn!(
                "No contract code at {:?} on network '{}'",
                address,
                self.provider_manager.network_name(network)
            );
        }

        Ok(ContractInfo {
            name: artifact.name.clone(),
            address: address.map(|a| a.to_checksum(None)),
            abi: serde_json::to_value(artifact.abi.as_ref())
                .map_err(|e| anyhow!("Failed to serialize ABI: {}", e))?,
            functions: function_signatures(&artifact.abi),
            events: artifact.abi.events().map(|e| e.signature()).collect(),
            deployable: artifact.is_deployable(),
            has_code,
        })
    }

    pub async fn call_view_function(
        &mut self,
        contract: &str,
        address: Option<&str>,
        function_call: &FunctionCall,
        block: Option<u64>,
        network: Option<&str>,
    ) -> Result<CallResult> {
        utils::validate_function_name(&function_call.function_name)
            .map_err(|e| anyhow!("Invalid function name: {}", e))?;
        let opts = Self::call_opts(function_call, block)?;

        let bound = match self.bind(contract, address, network).await {
            Ok(bound) => bound,
            Err(e) => return Ok(CallResult::failed(e.to_string())),
        };

        let function = match codec::find_function(bound.abi(), &function_call.function_name) {
            Ok(function) => function,
            Err(e) => return Ok(CallResult::failed(e.to_string())),
        };
        if let Err(e) = codec::encode_args(function, &function_call.parameters) {
            return Ok(CallResult::failed(format!(
                "Failed to encode function call: {}",
                e
            )));
        }

        match bound
            .call(&opts, &function_call.function_name, &function_call.parameters)
            .await
        {
            Ok(result) => Ok(CallResult::ok(result)),
            Err(e) => Ok(CallResult::failed(utils::interpret_rpc_error(&e.to_string()))),
        }
    }

    pub async fn estimate_gas(
        &mut self,
        contract: &str,
        address: Option<&str>,
        function_call: &FunctionCall,
        network: Option<&str>,
    ) -> Result<u64> {
        utils::validate_function_name(&function_call.function_name)
            .map_err(|e| anyhow!("Invalid function name: {}", e))?;
        let opts = Self::transact_opts(function_call)?;
        let bound = self.bind(contract, address, network).await?;

        bound
            .estimate_gas(&opts, &function_call.function_name, &function_call.parameters)
            .await
            .map_err(|e| {
                anyhow!(
                    "Gas estimation failed: {}",
                    utils::interpret_rpc_error(&e.to_string())
                )
            })
    }

    /// Logs emitted by the contract in the block range. With `event` only
    /// that event is fetched; otherwise every log is returned and decoded
    /// where the ABI knows its topic.
    #[allow(clippy::too_many_arguments)]
    pub async fn get_contract_events(
        &mut self,
        contract: &str,
        address: Option<&str>,
        event: Option<&str>,
        indexed: &[Option<Value>],
        from_block: Option<u64>,
        to_block: Option<u64>,
        network: Option<&str>,
    ) -> Result<Vec<EventInfo>> {
        utils::validate_block_range(from_block, to_block)?;
        let bound = self.bind(contract, address, network).await?;
        let opts = FilterOpts::range(from_block, to_block);

        if let Some(event) = event {
            let logs = bound.filter_logs(&opts, event, indexed).await.map_err(|e| {
                anyhow!(
                    "Failed to fetch events: {}",
                    utils::interpret_rpc_error(&e.to_string())
                )
            })?;
            return Ok(logs
                .into_iter()
                .map(|decoded| {
                    let raw = decoded.raw.clone();
                    EventInfo::from_log(&raw, Some(decoded))
                })
                .collect());
        }

        let filter = opts.apply(Filter::new().address(bound.address()));
        let logs = bound.provider().get_logs(&filter).await.map_err(|e| {
            anyhow!(
                "Failed to fetch events: {}",
                utils::interpret_rpc_error(&e.to_string())
            )
        })?;

        Ok(logs
            .iter()
            .map(|log| {
                let decoded = bound::unpack_any(bound.abi(), log)
                    .map_err(|e| debug!("Leaving log undecoded: {}", e))
                    .ok();
                EventInfo::from_log(log, decoded)
            })
            .collect())
    }

    /// Streams decoded logs of `event` (or of every known event) into `sink`.
    pub async fn watch_events(
        &mut self,
        contract: &str,
        address: Option<&str>,
        event: Option<&str>,
        indexed: &[Option<Value>],
        network: Option<&str>,
        sink: mpsc::Sender<DecodedLog>,
    ) -> Result<EventSubscription> {
        let bound = self.bind(contract, address, network).await?;
        let opts = self.provider_manager.watch_opts(network);

        info!(
            "Watching {} events of {} at {} every {:?}",
            event.unwrap_or("all"),
            contract,
            bound.address(),
            opts.poll_interval
        );
        match event {
            Some(event) => bound.watch_logs(opts, event, indexed, sink).await,
            None => bound.watch_all(opts, sink).await,
        }
    }

    pub async fn simulate_transaction(
        &mut self,
        contract: &str,
        address: Option<&str>,
        function_call: &FunctionCall,
        network: Option<&str>,
    ) -> Result<CallResult> {
        utils::validate_function_name(&function_call.function_name)
            .map_err(|e| anyhow!("Invalid function name: {}", e))?;

        let opts = match Self::transact_opts(function_call) {
            Ok(opts) => opts,
            Err(e) => return Ok(CallResult::failed(format!("Invalid simulation input: {}", e))),
        };
        let bound = match self.bind(contract, address, network).await {
            Ok(bound) => bound,
            Err(e) => return Ok(CallResult::failed(e.to_string())),
        };
        let function = match codec::find_function(bound.abi(), &function_call.function_name) {
            Ok(function) => function.clone(),
            Err(e) => return Ok(CallResult::failed(e.to_string())),
        };

        let gas_estimate = match bound
            .estimate_gas(&opts, &function_call.function_name, &function_call.parameters)
            .await
        {
            Ok(gas) => gas,
            Err(e) => {
                let friendly_error = utils::interpret_rpc_error(&e.to_string());
                return Ok(CallResult {
                    success: false,
                    result: Some(serde_json::json!({
                        "simulated": true,
                        "gas_estimation_failed": true,
                        "error": friendly_error
                    })),
                    error: Some(format!(
                        "Gas estimation failed (transaction would likely revert): {}",
                        friendly_error
                    )),
                    gas_used: None,
                    transaction_hash: None,
                });
            }
        };

        let call_opts = CallOpts {
            from: opts.from,
            block: None,
        };
        match bound
            .call(&call_opts, &function_call.function_name, &function_call.parameters)
            .await
        {
            Ok(result) => Ok(CallResult {
                success: true,
                result: Some(serde_json::json!({
                    "simulated": true,
                    "function": function.signature(),
                    "result": result,
                    "would_succeed": true
                })),
                error: None,
                gas_used: Some(gas_estimate),
                transaction_hash: None,
            }),
            Err(e) => {
                let friendly_error = utils::interpret_rpc_error(&e.to_string());
                Ok(CallResult {
                    success: false,
                    result: Some(serde_json::json!({
                        "simulated": true,
                        "would_succeed": false,
                        "revert_reason": friendly_error
                    })),
                    error: Some(format!("Transaction simulation failed: {}", friendly_error)),
                    gas_used: Some(gas_estimate),
                    transaction_hash: None,
                })
            }
        }
    }

    /// Signs and sends a contract call, then waits for the receipt.
    pub async fn send_transaction(
        &mut self,
        contract: &str,
        address: Option<&str>,
        function_call: &FunctionCall,
        private_key: &str,
        network: Option<&str>,
    ) -> Result<TransactionInfo> {
        self.check_writes_allowed()?;
        utils::validate_function_name(&function_call.function_name)
            .map_err(|e| anyhow!("Invalid function name: {}", e))?;

        let signer = utils::parse_private_key(private_key)?;
        let mut opts = Self::transact_opts(function_call)?;
        opts.from = Some(signer.address());
        self.check_value_limit(opts.value)?;

        let read_only = self.bind(contract, address, network).await?;
        let network_config = self.provider_manager.get_network_config(network)?;
        if opts.gas_limit.is_none() {
            opts.gas_limit = match read_only
                .estimate_gas(&opts, &function_call.function_name, &function_call.parameters)
                .await
            {
                Ok(gas) => Some(gas),
                Err(e) => {
                    warn!("Gas estimation failed, using default: {}", e);
                    Some(network_config.gas.default_gas_limit)
                }
            };
        }
        if opts.gas_price.is_none() {
            if let Some((max_fee, tip)) = network_config.gas.eip1559_fees() {
                opts.max_fee_per_gas = Some(max_fee);
                opts.max_priority_fee_per_gas = Some(tip);
            }
        }

        let provider = self.provider_manager.wallet_provider(network, signer)?;
        let bound = BoundContract::<Http<Client>, _>::new(
            read_only.address(),
            read_only.abi().clone().into(),
            provider,
        );

        info!(
            "Sending {} to {} from {:?}",
            function_call.function_name,
            bound.address(),
            opts.from
        );
        let pending = bound
            .transact(&opts, &function_call.function_name, &function_call.parameters)
            .await
            .map_err(|e| {
                anyhow!(
                    "Failed to send transaction: {}",
                    utils::interpret_rpc_error(&e.to_string())
                )
            })?;

        let tx_hash = *pending.tx_hash();
        info!("Transaction sent with hash: {:?}", tx_hash);
        let receipt = pending.get_receipt().await.map_err(|e| {
            anyhow!(
                "Transaction was sent but confirmation failed: {}. Transaction hash: {:#x}",
                e,
                tx_hash
            )
        })?;
        Ok(TransactionInfo::from_receipt(&receipt))
    }

    /// Deploys a compiled artifact from the artifacts directory.
    pub async fn deploy_contract(
        &mut self,
        artifact_name: &str,
        constructor_args: &Value,
        value: Option<&str>,
        private_key: &str,
        network: Option<&str>,
    ) -> Result<TransactionInfo> {
        self.check_writes_allowed()?;
        self.check_network(network)?;

        let artifact = self
            .abi_resolver
            .resolve_artifact(artifact_name)
            .await
            .map_err(|e| anyhow!(utils::interpret_abi_error(&e.to_string(), artifact_name)))?;
        if !artifact.is_deployable() {
            return Err(anyhow!(
                "Artifact {} has no bytecode and cannot be deployed",
                artifact.name
            ));
        }
        let args = codec::encode_constructor_args(&artifact.abi, constructor_args)?;

        let signer = utils::parse_private_key(private_key)?;
        let value = value
            .map(utils::validate_hex_value)
            .transpose()
            .map_err(|e| anyhow!("Invalid transaction value: {}", e))?;
        self.check_value_limit(value)?;

        let opts = TransactOpts {
            from: Some(signer.address()),
            value,
            ..Default::default()
        };
        let provider = self.provider_manager.wallet_provider(network, signer)?;

        info!("Deploying {} from {:?}", artifact.name, opts.from);
        let pending = bound::deploy::<Http<Client>, _>(&provider, &opts, &artifact, &args)
            .await
            .map_err(|e| anyhow!(utils::interpret_rpc_error(&e.to_string())))?;
        let tx_hash = *pending.tx_hash();
        info!("Deployment sent with hash: {:?}", tx_hash);

        let receipt = pending.get_receipt().await.map_err(|e| {
            anyhow!(
                "Deployment was sent but confirmation failed: {}. Transaction hash: {:#x}",
                e,
                tx_hash
            )
        })?;
        let info = TransactionInfo::from_receipt(&receipt);
        if let Some(address) = &info.contract_address {
            info!("{} deployed at {}", artifact.name, address);
        }
        Ok(info)
    }
}

fn mutability_name(mutability: StateMutability) -> &'static str {
    match mutability {
        StateMutability::Pure => "pure",
        StateMutability::View => "view",
        StateMutability::NonPayable => "nonpayable",
        StateMutability::Payable => "payable",
    }
}

pub fn function_signatures(abi: &JsonAbi) -> Vec<FunctionSignature> {
    abi.functions()
        .map(|f| FunctionSignature {
            signature: f.signature(),
            selector: f.selector().to_string(),
            state_mutability: mutability_name(f.state_mutability).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    const POOL: &str = "0x00000000000000000000000000000000000000a1";

    fn manager(config: Config) -> ContractManager {
        ContractManager::new(ProviderManager::new(config).unwrap())
    }

    fn with_pool_deployment() -> Config {
        let mut config = Config::default();
        config
            .networks
            .get_mut("holesky")
            .unwrap()
            .contracts
            .insert("RestakingPool".to_string(), POOL.to_string());
        config
    }

    fn call(name: &str, params: Value) -> FunctionCall {
        FunctionCall {
            function_name: name.to_string(),
            parameters: params,
            from: None,
            gas_limit: None,
            gas_price: None,
            value: None,
        }
    }

    #[test]
    fn addresses_from_config_or_argument() {
        let manager = manager(with_pool_deployment());
        let pool: Address = POOL.parse().unwrap();

        assert_eq!(
            manager
                .resolve_address("RestakingPool", None, Some("holesky"))
                .unwrap(),
            Some(pool)
        );
        assert_eq!(
            manager.resolve_address("RestakingPool", None, None).unwrap(),
            None
        );
        let explicit = "0x00000000000000000000000000000000000000b2";
        assert_eq!(
            manager
                .resolve_address("RestakingPool", Some(explicit), Some("holesky"))
                .unwrap(),
            Some(explicit.parse().unwrap())
        );
        assert!(manager
            .resolve_address("RestakingPool", Some("0x12"), None)
            .is_err());
    }

    #[test]
    fn lists_embedded_contracts_with_deployments() {
        let manager = manager(with_pool_deployment());
        let entries = manager.list_contracts(Some("holesky")).unwrap();
        assert_eq!(entries.len(), ContractKind::ALL.len());

        let pool = entries.iter().find(|e| e.name == "RestakingPool").unwrap();
        assert_eq!(pool.address.as_deref().map(str::to_lowercase), Some(POOL.to_string()));
        assert!(entries.iter().find(|e| e.name == "ISlasher").unwrap().interface);
        assert!(manager.list_contracts(Some("nowhere")).is_err());
    }

    #[tokio::test]
    async fn contract_info_without_address_stays_offline() {
        let mut manager = manager(Config::default());
        let info = manager
            .get_contract_info("fee_collector", None, None)
            .await
            .unwrap();
        assert_eq!(info.name, "FeeCollector");
        assert!(info.address.is_none());
        assert!(info.has_code.is_none());
        assert!(!info.deployable);

        let set_commission = info
            .functions
            .iter()
            .find(|f| f.signature == "setCommission(uint16)")
            .unwrap();
        assert_eq!(set_commission.state_mutability, "nonpayable");
        assert!(info.events.contains(&"CommissionChanged(uint16,uint16)".to_string()));
    }

    #[tokio::test]
    async fn missing_address_is_reported_in_call_result() {
        let mut manager = manager(Config::default());
        let result = manager
            .call_view_function("RestakingPool", None, &call("getMinStake", Value::Null), None, None)
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("No address for RestakingPool"));
    }

    #[tokio::test]
    async fn unknown_function_is_reported_in_call_result() {
        let mut manager = manager(with_pool_deployment());
        let result = manager
            .call_view_function(
                "RestakingPool",
                None,
                &call("notAFunction", json!([])),
                None,
                Some("holesky"),
            )
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Available functions"));
    }

    #[tokio::test]
    async fn writes_are_gated() {
        let mut manager = manager(with_pool_deployment());
        let err = manager
            .send_transaction(
                "RestakingPool",
                None,
                &call("stake", json!([])),
                "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
                Some("holesky"),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Write operations are disabled"));

        let err = manager
            .deploy_contract("Vault", &json!([]), None, "0x01", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Write operations are disabled"));
    }

    #[tokio::test]
    async fn value_limit_is_enforced() {
        let mut config = with_pool_deployment();
        config.security.allow_write_operations = true;
        config.security.max_transaction_value = Some("100".to_string());
        let mut manager = manager(config);

        let mut stake = call("stake", json!([]));
        stake.value = Some("101".to_string());
        let err = manager
            .send_transaction(
                "RestakingPool",
                None,
                &stake,
                "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
                Some("holesky"),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("max_transaction_value"));
    }

    #[tokio::test]
    async fn deploy_requires_bytecode() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Iface.json"),
            r#"{"abi": [], "bytecode": {"object": "0x"}}"#,
        )
        .unwrap();

        let mut config = Config::default();
        config.security.allow_write_operations = true;
        config.artifacts_dir = Some(dir.path().to_path_buf());
        let mut manager = manager(config);

        let err = manager
            .deploy_contract(
                "Iface",
                &json!([]),
                None,
                "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
                None,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot be deployed"));
    }

    #[test]
    fn signatures_carry_selectors() {
        let signatures = function_signatures(ContractKind::CToken.abi());
        let transfer = signatures
            .iter()
            .find(|s| s.signature == "transfer(address,uint256)")
            .unwrap();
        assert_eq!(transfer.selector, "0xa9059cbb");
    }
}
