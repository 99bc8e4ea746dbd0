use anyhow::Result;
use rmcp::{
    model::{ServerCapabilities, ServerInfo},
    tool,
    transport::stdio,
    ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    config::Config,
    ethereum::{contract::ContractManager, provider::ProviderManager, FunctionCall},
};

#[derive(Debug, Clone)]
pub struct RestakingMcpServer {
    contract_manager: Arc<tokio::sync::Mutex<ContractManager>>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ListContractsRequest {
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ContractInfoRequest {
    /// Contract name (e.g. RestakingPool) or snake_case alias
    contract: String,
    /// Overrides the address configured for the network
    address: Option<String>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ViewFunctionRequest {
    contract: String,
    address: Option<String>,
    /// Function name, or full signature for overloads
    function_name: String,
    #[serde(default)]
    parameters: Value,
    from: Option<String>,
    block: Option<u64>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct EstimateGasRequest {
    contract: String,
    address: Option<String>,
    function_name: String,
    #[serde(default)]
    parameters: Value,
    from: Option<String>,
    value: Option<String>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ContractEventsRequest {
    contract: String,
    address: Option<String>,
    /// Event name; all events of the contract when omitted
    event: Option<String>,
    /// One value per indexed field, null for any
    #[serde(default)]
    indexed: Vec<Option<Value>>,
    from_block: Option<u64>,
    to_block: Option<u64>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct SimulateTransactionRequest {
    contract: String,
    address: Option<String>,
    function_name: String,
    #[serde(default)]
    parameters: Value,
    from: Option<String>,
    value: Option<String>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct SendTransactionRequest {
    contract: String,
    address: Option<String>,
    function_name: String,
    #[serde(default)]
    parameters: Value,
    private_key: String,
    value: Option<String>,
    gas_limit: Option<u64>,
    gas_price: Option<String>,
    network: Option<String>,
}

/// Renders a tool result. Failures become `Error: ...` text so the client
/// sees them as output, not as a protocol error.
fn respond<T: Serialize>(action: &str, result: Result<T>) -> String {
    match result.and_then(|value| Ok(serde_json::to_string_pretty(&value)?)) {
        Ok(text) => text,
        Err(e) => {
            error!("{} failed: {}", action, e);
            format!("Error: {}", e)
        }
    }
}

fn view_call(function_name: String, parameters: Value, from: Option<String>) -> FunctionCall {
    FunctionCall {
        function_name,
        parameters,
        from,
        gas_limit: None,
        gas_price: None,
        value: None,
    }
}

impl RestakingMcpServer {
    pub fn new(config: Config) -> Result<Self> {
        let provider_manager = ProviderManager::new(config)?;
        Ok(Self::with_manager(ContractManager::new(provider_manager)))
    }

    pub fn with_manager(contract_manager: ContractManager) -> Self {
        Self {
            contract_manager: Arc::new(tokio::sync::Mutex::new(contract_manager)),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let service = self.clone().serve(stdio()).await?;
        info!("MCP server listening on stdio");

        service.waiting().await?;
        info!("MCP server stopped");
        Ok(())
    }
}

#[tool(tool_box)]
impl RestakingMcpServer {
    #[tool(description = "List the known restaking contracts and their configured addresses")]
    async fn list_contracts(&self, #[tool(aggr)] request: ListContractsRequest) -> String {
        let manager = self.contract_manager.lock().await;
        respond(
            "list_contracts",
            manager.list_contracts(request.network.as_deref()),
        )
    }

    #[tool(description = "Get the ABI, function signatures and deployment status of a contract")]
    async fn get_contract_info(&self, #[tool(aggr)] request: ContractInfoRequest) -> String {
        let mut manager = self.contract_manager.lock().await;
        let info = manager
            .get_contract_info(
                &request.contract,
                request.address.as_deref(),
                request.network.as_deref(),
            )
            .await;
        respond("get_contract_info", info)
    }

    #[tool(description = "Call a read-only contract function, optionally at a past block")]
    async fn call_view_function(&self, #[tool(aggr)] request: ViewFunctionRequest) -> String {
        let call = view_call(request.function_name, request.parameters, request.from);
        let mut manager = self.contract_manager.lock().await;
        let result = manager
            .call_view_function(
                &request.contract,
                request.address.as_deref(),
                &call,
                request.block,
                request.network.as_deref(),
            )
            .await;
        respond("call_view_function", result)
    }

    #[tool(description = "Estimate the gas used by a contract function call")]
    async fn estimate_gas(&self, #[tool(aggr)] request: EstimateGasRequest) -> String {
        let call = FunctionCall {
            value: request.value,
            ..view_call(request.function_name, request.parameters, request.from)
        };
        let mut manager = self.contract_manager.lock().await;
        let gas = manager
            .estimate_gas(
                &request.contract,
                request.address.as_deref(),
                &call,
                request.network.as_deref(),
            )
            .await
            .map(|gas| serde_json::json!({ "gas": gas }));
        respond("estimate_gas", gas)
    }

    #[tool(description = "Get decoded events emitted by a contract, filtered by indexed fields")]
    async fn get_contract_events(&self, #[tool(aggr)] request: ContractEventsRequest) -> String {
        let mut manager = self.contract_manager.lock().await;
        let events = manager
            .get_contract_events(
                &request.contract,
                request.address.as_deref(),
                request.event.as_deref(),
                &request.indexed,
                request.from_block,
                request.to_block,
                request.network.as_deref(),
            )
            .await;
        respond("get_contract_events", events)
    }

    #[tool(description = "Simulate a state-changing call with eth_call and report gas and output")]
    async fn simulate_transaction(
        &self,
        #[tool(aggr)] request: SimulateTransactionRequest,
    ) -> String {
        let call = FunctionCall {
            value: request.value,
            ..view_call(request.function_name, request.parameters, request.from)
        };
        let mut manager = self.contract_manager.lock().await;
        let result = manager
            .simulate_transaction(
                &request.contract,
                request.address.as_deref(),
                &call,
                request.network.as_deref(),
            )
            .await;
        respond("simulate_transaction", result)
    }

    #[tool(description = "Sign and send a transaction; requires write operations to be enabled")]
    async fn send_transaction(&self, #[tool(aggr)] request: SendTransactionRequest) -> String {
        let call = FunctionCall {
            gas_limit: request.gas_limit,
            gas_price: request.gas_price,
            value: request.value,
            ..view_call(request.function_name, request.parameters, None)
        };
        let mut manager = self.contract_manager.lock().await;
        let receipt = manager
            .send_transaction(
                &request.contract,
                request.address.as_deref(),
                &call,
                &request.private_key,
                request.network.as_deref(),
            )
            .await;
        respond("send_transaction", receipt)
    }
}

#[tool(tool_box)]
impl ServerHandler for RestakingMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Liquid-restaking contracts: RestakingPool, CToken, RatioFeed, FeeCollector, \
                 ProtocolConfig, the restaker contracts and the EigenLayer interfaces. \
                 Contracts are addressed by name; addresses come from the network config \
                 unless given explicitly."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tools_report_errors_as_text() {
        let server = RestakingMcpServer::new(Config::default()).unwrap();

        let listed = server
            .list_contracts(ListContractsRequest { network: None })
            .await;
        assert!(listed.contains("RestakingPool"));

        let unknown = server
            .list_contracts(ListContractsRequest {
                network: Some("nowhere".to_string()),
            })
            .await;
        assert!(unknown.starts_with("Error:"));

        let refused = server
            .send_transaction(SendTransactionRequest {
                contract: "RestakingPool".to_string(),
                address: Some("0x00000000000000000000000000000000000000a1".to_string()),
                function_name: "stake".to_string(),
                parameters: Value::Null,
                private_key: "0x01".to_string(),
                value: None,
                gas_limit: None,
                gas_price: None,
                network: None,
            })
            .await;
        assert!(refused.contains("Write operations are disabled"));
    }

    #[test]
    fn respond_renders_errors_as_text() {
        assert_eq!(respond("noop", Ok(1u64)), "1");
        assert_eq!(
            respond::<u64>("noop", Err(anyhow::anyhow!("no address"))),
            "Error: no address"
        );
    }

    #[test]
    fn requests_default_parameters() {
        let request: ViewFunctionRequest = serde_json::from_value(serde_json::json!({
            "contract": "CToken",
            "function_name": "totalSupply"
        }))
        .unwrap();
        assert!(request.parameters.is_null());
        assert!(request.address.is_none());
    }
}
