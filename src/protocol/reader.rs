use alloy::{
    network::Ethereum,
    primitives::{Address, U256},
    providers::Provider,
    transports::Transport,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::debug;

use super::{CapacityCurve, PoolState, ProtocolAddresses};
use crate::bindings::contracts::{
    CToken, IDelegationManager, IEigenPodManager, ISlasher, IStrategyManager, InceptionLibrary,
    ProtocolConfig, RatioFeed, RestakingPool,
};

#[async_trait]
pub trait ProtocolReader: Send + Sync {
    fn addresses(&self) -> &ProtocolAddresses;
    /// cToken ratio as published by the ratio feed.
    async fn ratio(&self) -> Result<U256>;
    async fn pool_state(&self) -> Result<PoolState>;
    async fn claimable_of(&self, claimer: Address) -> Result<U256>;
    async fn convert_to_shares(&self, amount: U256) -> Result<U256>;
    async fn convert_to_amount(&self, shares: U256) -> Result<U256>;
    async fn balance_of(&self, account: Address) -> Result<U256>;
    async fn restaker_of(&self, provider: &str) -> Result<Address>;
    async fn deposit_bonus(&self, library: Address, curve: CapacityCurve) -> Result<U256>;
    async fn withdrawal_fee(&self, library: Address, curve: CapacityCurve) -> Result<U256>;
    async fn pod_of(&self, eigen_pod_manager: Address, owner: Address) -> Result<Address>;
    async fn is_operator_frozen(&self, slasher: Address, operator: Address) -> Result<bool>;
    async fn staker_strategy_shares(
        &self,
        strategy_manager: Address,
        staker: Address,
        strategy: Address,
    ) -> Result<U256>;
    async fn delegated_to(&self, delegation_manager: Address, staker: Address) -> Result<Address>;
}

pub struct ProtocolChainReader<T, P>
where
    T: Transport + Clone,
    P: Provider<T, Ethereum> + Clone,
{
    addresses: ProtocolAddresses,
    pool: RestakingPool::RestakingPoolInstance<T, P>,
    ratio_feed: RatioFeed::RatioFeedInstance<T, P>,
    c_token: CToken::CTokenInstance<T, P>,
    eth_client: P,
}

impl<T, P> ProtocolChainReader<T, P>
where
    T: Transport + Clone,
    P: Provider<T, Ethereum> + Clone,
{
    pub fn new(addresses: ProtocolAddresses, eth_client: P) -> Self {
        Self {
            pool: RestakingPool::new(addresses.restaking_pool, eth_client.clone()),
            ratio_feed: RatioFeed::new(addresses.ratio_feed, eth_client.clone()),
            c_token: CToken::new(addresses.c_token, eth_client.clone()),
            addresses,
            eth_client,
        }
    }

    /// Reads every registered address from `ProtocolConfig`.
    pub async fn build(protocol_config_addr: Address, eth_client: P) -> Result<Self> {
        let addresses = fetch_addresses(protocol_config_addr, eth_client.clone()).await?;
        debug!("Protocol addresses: {:?}", addresses);
        Ok(Self::new(addresses, eth_client))
    }
}

pub async fn fetch_addresses<T, P>(protocol_config_addr: Address, eth_client: P) -> Result<ProtocolAddresses>
where
    T: Transport + Clone,
    P: Provider<T, Ethereum> + Clone,
{
    let config = ProtocolConfig::new(protocol_config_addr, eth_client);

    let governance = config.getGovernance();
    let operator = config.getOperator();
    let ratio_feed = config.getRatioFeed();
    let restaking_pool = config.getRestakingPool();
    let c_token = config.getCToken();
    let treasury = config.getTreasury();
    let restaker_deployer = config.getRestakerDeployer();

    let (governance, operator, ratio_feed, restaking_pool, c_token, treasury, restaker_deployer) =
        tokio::try_join!(
            governance.call(),
            operator.call(),
            ratio_feed.call(),
            restaking_pool.call(),
            c_token.call(),
            treasury.call(),
            restaker_deployer.call(),
        )
        .map_err(|e| anyhow!("Failed to read ProtocolConfig at {}: {}", protocol_config_addr, e))?;

    Ok(ProtocolAddresses {
        protocol_config: protocol_config_addr,
        governance: governance._0,
        operator: operator._0,
        ratio_feed: ratio_feed._0,
        restaking_pool: restaking_pool._0,
        c_token: c_token._0,
        treasury: treasury._0,
        restaker_deployer: restaker_deployer._0,
    })
}

#[async_trait]
impl<T, P> ProtocolReader for ProtocolChainReader<T, P>
where
    T: Transport + Clone,
    P: Provider<T, Ethereum> + Clone,
{
    fn addresses(&self) -> &ProtocolAddresses {
        &self.addresses
    }

    async fn ratio(&self) -> Result<U256> {
        let ratio = self
            .ratio_feed
            .getRatio(self.addresses.c_token)
            .call()
            .await
            .map(|r| r._0)?;
        Ok(ratio)
    }

    async fn pool_state(&self) -> Result<PoolState> {
        let min_stake = self.pool.getMinStake();
        let min_unstake = self.pool.getMinUnstake();
        let max_tvl = self.pool.getMaxTVL();
        let pending = self.pool.getPending();
        let total_pending_unstakes = self.pool.getTotalPendingUnstakes();
        let total_claimable = self.pool.getTotalClaimable();
        let unstakes_length = self.pool.getUnstakesLength();
        let available_to_stake = self.pool.availableToStake();
        let paused = self.pool.paused();

        let (
            min_stake,
            min_unstake,
            max_tvl,
            pending,
            total_pending_unstakes,
            total_claimable,
            unstakes_length,
            available_to_stake,
            paused,
        ) = tokio::try_join!(
            min_stake.call(),
            min_unstake.call(),
            max_tvl.call(),
            pending.call(),
            total_pending_unstakes.call(),
            total_claimable.call(),
            unstakes_length.call(),
            available_to_stake.call(),
            paused.call(),
        )?;

        Ok(PoolState {
            min_stake: min_stake._0,
            min_unstake: min_unstake._0,
            max_tvl: max_tvl._0,
            pending: pending._0,
            total_pending_unstakes: total_pending_unstakes._0,
            total_claimable: total_claimable._0,
            unstakes_length: unstakes_length._0,
            available_to_stake: available_to_stake._0,
            paused: paused._0,
        })
    }

    async fn claimable_of(&self, claimer: Address) -> Result<U256> {
        let claimable = self.pool.claimableOf(claimer).call().await.map(|c| c._0)?;
        Ok(claimable)
    }

    async fn convert_to_shares(&self, amount: U256) -> Result<U256> {
        let shares = self
            .c_token
            .convertToShares(amount)
            .call()
            .await
            .map(|s| s.shares)?;
        Ok(shares)
    }

    async fn convert_to_amount(&self, shares: U256) -> Result<U256> {
        let amount = self
            .c_token
            .convertToAmount(shares)
            .call()
            .await
            .map(|a| a.amount)?;
        Ok(amount)
    }

    async fn balance_of(&self, account: Address) -> Result<U256> {
        let balance = self.c_token.balanceOf(account).call().await.map(|b| b._0)?;
        Ok(balance)
    }

    async fn restaker_of(&self, provider: &str) -> Result<Address> {
        let restaker = self
            .pool
            .getRestaker(provider.to_string())
            .call()
            .await
            .map(|r| r._0)?;
        if restaker.is_zero() {
            return Err(anyhow!("No restaker registered for provider '{}'", provider));
        }
        Ok(restaker)
    }

    async fn deposit_bonus(&self, library: Address, curve: CapacityCurve) -> Result<U256> {
        let library = InceptionLibrary::new(library, self.eth_client.clone());
        let bonus = library
            .calculateDepositBonus(
                curve.amount,
                curve.capacity,
                curve.optimal_capacity,
                curve.rate,
                curve.max_rate,
                curve.target_capacity,
            )
            .call()
            .await
            .map(|b| b.bonus)?;
        Ok(bonus)
    }

    async fn withdrawal_fee(&self, library: Address, curve: CapacityCurve) -> Result<U256> {
        let library = InceptionLibrary::new(library, self.eth_client.clone());
        let fee = library
            .calculateWithdrawalFee(
                curve.amount,
                curve.capacity,
                curve.optimal_capacity,
                curve.rate,
                curve.max_rate,
                curve.target_capacity,
            )
            .call()
            .await
            .map(|f| f.fee)?;
        Ok(fee)
    }

    async fn pod_of(&self, eigen_pod_manager: Address, owner: Address) -> Result<Address> {
        let manager = IEigenPodManager::new(eigen_pod_manager, self.eth_client.clone());
        let pod = manager.getPod(owner).call().await.map(|p| p._0)?;
        Ok(pod)
    }

    async fn is_operator_frozen(&self, slasher: Address, operator: Address) -> Result<bool> {
        let slasher = ISlasher::new(slasher, self.eth_client.clone());
        let frozen = slasher.isFrozen(operator).call().await.map(|f| f._0)?;
        Ok(frozen)
    }

    async fn staker_strategy_shares(
        &self,
        strategy_manager: Address,
        staker: Address,
        strategy: Address,
    ) -> Result<U256> {
        let manager = IStrategyManager::new(strategy_manager, self.eth_client.clone());
        let shares = manager
            .stakerStrategyShares(staker, strategy)
            .call()
            .await
            .map(|s| s.shares)?;
        Ok(shares)
    }

    async fn delegated_to(&self, delegation_manager: Address, staker: Address) -> Result<Address> {
        let manager = IDelegationManager::new(delegation_manager, self.eth_client.clone());
        let operator = manager.delegatedTo(staker).call().await.map(|o| o._0)?;
        Ok(operator)
    }
}
