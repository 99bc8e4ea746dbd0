use alloy::{
    network::{Ethereum, ReceiptResponse},
    primitives::{Address, U256},
    providers::Provider,
    rpc::types::TransactionReceipt,
    transports::Transport,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use super::ProtocolAddresses;
use crate::bindings::contracts::{FeeCollector, RatioFeed, RestakerDeployer, RestakingPool};

/// State-changing protocol flows. Each call sends one transaction, waits for
/// its receipt and returns it; a reverted receipt is an error.
#[async_trait]
pub trait ProtocolWriter: Send + Sync {
    async fn stake(&self, amount: U256) -> Result<TransactionReceipt>;
    async fn unstake(&self, to: Address, shares: U256) -> Result<TransactionReceipt>;
    async fn claim_unstake(&self, claimer: Address) -> Result<TransactionReceipt>;
    async fn distribute_unstakes(&self) -> Result<TransactionReceipt>;
    async fn update_ratio(&self, token: Address, ratio: U256) -> Result<TransactionReceipt>;
    async fn withdraw_fees(&self, fee_collector: Address) -> Result<TransactionReceipt>;
    async fn deploy_restaker(&self) -> Result<TransactionReceipt>;
}

/// Writer over a signing provider.
pub struct ProtocolChainWriter<T, P>
where
    T: Transport + Clone,
    P: Provider<T, Ethereum> + Clone,
{
    addresses: ProtocolAddresses,
    pool: RestakingPool::RestakingPoolInstance<T, P>,
    ratio_feed: RatioFeed::RatioFeedInstance<T, P>,
    restaker_deployer: RestakerDeployer::RestakerDeployerInstance<T, P>,
    eth_client: P,
}

impl<T, P> ProtocolChainWriter<T, P>
where
    T: Transport + Clone,
    P: Provider<T, Ethereum> + Clone,
{
    pub fn new(addresses: ProtocolAddresses, eth_client: P) -> Self {
        Self {
            pool: RestakingPool::new(addresses.restaking_pool, eth_client.clone()),
            ratio_feed: RatioFeed::new(addresses.ratio_feed, eth_client.clone()),
            restaker_deployer: RestakerDeployer::new(
                addresses.restaker_deployer,
                eth_client.clone(),
            ),
            addresses,
            eth_client,
        }
    }

    pub fn addresses(&self) -> &ProtocolAddresses {
        &self.addresses
    }
}

fn confirmed(action: &str, receipt: TransactionReceipt) -> Result<TransactionReceipt> {
    if !receipt.status() {
        warn!("{} reverted, txHash: {}", action, receipt.transaction_hash);
        return Err(anyhow!(
            "{} reverted in transaction {}",
            action,
            receipt.transaction_hash
        ));
    }
    info!("{} succeeded, txHash: {}", action, receipt.transaction_hash);
    Ok(receipt)
}

/// The `RestakerDeployed` event of a `deployRestaker` receipt.
pub fn deployed_restaker(
    receipt: &TransactionReceipt,
) -> Option<RestakerDeployer::RestakerDeployed> {
    receipt
        .inner
        .logs()
        .iter()
        .find_map(|log| log.log_decode::<RestakerDeployer::RestakerDeployed>().ok())
        .map(|log| log.inner.data)
}

#[async_trait]
impl<T, P> ProtocolWriter for ProtocolChainWriter<T, P>
where
    T: Transport + Clone,
    P: Provider<T, Ethereum> + Clone,
{
    async fn stake(&self, amount: U256) -> Result<TransactionReceipt> {
        info!("staking {} wei into pool {}", amount, self.addresses.restaking_pool);
        let receipt = self
            .pool
            .stake()
            .value(amount)
            .send()
            .await?
            .get_receipt()
            .await?;
        confirmed("stake", receipt)
    }

    async fn unstake(&self, to: Address, shares: U256) -> Result<TransactionReceipt> {
        info!("unstaking {} shares to {}", shares, to);
        let receipt = self
            .pool
            .unstake(to, shares)
            .send()
            .await?
            .get_receipt()
            .await?;
        confirmed("unstake", receipt)
    }

    async fn claim_unstake(&self, claimer: Address) -> Result<TransactionReceipt> {
        info!("claiming unstake for {}", claimer);
        let receipt = self
            .pool
            .claimUnstake(claimer)
            .send()
            .await?
            .get_receipt()
            .await?;
        confirmed("claimUnstake", receipt)
    }

    async fn distribute_unstakes(&self) -> Result<TransactionReceipt> {
        info!("distributing pending unstakes");
        let receipt = self
            .pool
            .distributeUnstakes()
            .send()
            .await?
            .get_receipt()
            .await?;
        confirmed("distributeUnstakes", receipt)
    }

    async fn update_ratio(&self, token: Address, ratio: U256) -> Result<TransactionReceipt> {
        info!("updating ratio of {} to {}", token, ratio);
        let receipt = self
            .ratio_feed
            .updateRatio(token, ratio)
            .send()
            .await?
            .get_receipt()
            .await?;
        confirmed("updateRatio", receipt)
    }

    async fn withdraw_fees(&self, fee_collector: Address) -> Result<TransactionReceipt> {
        info!("withdrawing fees from collector {}", fee_collector);
        let collector = FeeCollector::new(fee_collector, self.eth_client.clone());
        let receipt = collector.withdraw().send().await?.get_receipt().await?;
        confirmed("withdraw", receipt)
    }

    async fn deploy_restaker(&self) -> Result<TransactionReceipt> {
        info!(
            "deploying restaker through {}",
            self.addresses.restaker_deployer
        );
        let receipt = self
            .restaker_deployer
            .deployRestaker()
            .send()
            .await?
            .get_receipt()
            .await?;
        let receipt = confirmed("deployRestaker", receipt)?;

        if let Some(deployed) = deployed_restaker(&receipt) {
            info!("restaker #{} deployed at {}", deployed.id, deployed.restaker);
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::{primitives::Log as LogRecord, sol_types::SolEvent};
    use serde_json::{json, Value};

    const TX_HASH: &str = "0x00000000000000000000000000000000000000000000000000000000000000aa";

    fn receipt(status: &str, logs: Vec<Value>) -> TransactionReceipt {
        serde_json::from_value(json!({
            "transactionHash": TX_HASH,
            "transactionIndex": "0x0",
            "blockHash": "0x00000000000000000000000000000000000000000000000000000000000000bb",
            "blockNumber": "0x10",
            "from": "0x00000000000000000000000000000000000000f1",
            "to": "0x0000000000000000000000000000000000000008",
            "cumulativeGasUsed": "0x5208",
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00",
            "contractAddress": null,
            "logs": logs,
            "logsBloom": format!("0x{}", "0".repeat(512)),
            "type": "0x2",
            "status": status,
        }))
        .unwrap()
    }

    fn rpc_log(log: LogRecord) -> Value {
        json!({
            "address": log.address,
            "topics": log.data.topics(),
            "data": log.data.data,
            "blockHash": "0x00000000000000000000000000000000000000000000000000000000000000bb",
            "blockNumber": "0x10",
            "transactionHash": TX_HASH,
            "transactionIndex": "0x0",
            "logIndex": "0x0",
            "removed": false,
        })
    }

    #[test]
    fn reverted_receipt_is_an_error() {
        let err = confirmed("stake", receipt("0x0", vec![])).unwrap_err().to_string();
        assert!(err.contains("stake reverted"));
        assert!(err.contains(TX_HASH));

        assert!(confirmed("stake", receipt("0x1", vec![])).is_ok());
    }

    #[test]
    fn finds_deployed_restaker_in_receipt() {
        let event = RestakerDeployer::RestakerDeployed {
            creator: Address::repeat_byte(0xf1),
            restaker: Address::repeat_byte(0x99),
            id: U256::from(3),
        };
        let log = LogRecord {
            address: Address::repeat_byte(0x08),
            data: event.encode_log_data(),
        };

        let deployed = deployed_restaker(&receipt("0x1", vec![rpc_log(log)])).unwrap();
        assert_eq!(deployed.restaker, Address::repeat_byte(0x99));
        assert_eq!(deployed.id, U256::from(3));

        assert!(deployed_restaker(&receipt("0x1", vec![])).is_none());
    }
}
