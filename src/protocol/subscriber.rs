use alloy::{
    network::Ethereum,
    primitives::{Address, B256},
    providers::Provider,
    rpc::types::Log,
    transports::Transport,
};
use anyhow::Result;
use std::marker::PhantomData;
use tokio::sync::mpsc;

use super::ProtocolAddresses;
use crate::{
    bindings::contracts::{CToken, RatioFeed, RestakerDeployer, RestakingPool},
    ethereum::watch::{self, EventSubscription, FilterOpts, WatchOpts},
};

/// Event query and watch entry points. Every address slice filters one
/// indexed field and matches any of its values; an empty slice matches all.
pub struct ProtocolChainSubscriber<T, P>
where
    T: Transport + Clone,
    P: Provider<T, Ethereum> + Clone,
{
    addresses: ProtocolAddresses,
    eth_client: P,
    opts: WatchOpts,
    _transport: PhantomData<T>,
}

pub(crate) fn words(addresses: &[Address]) -> Vec<B256> {
    addresses.iter().map(|a| a.into_word()).collect()
}

impl<T, P> ProtocolChainSubscriber<T, P>
where
    T: Transport + Clone,
    P: Provider<T, Ethereum> + Clone,
{
    pub fn new(addresses: ProtocolAddresses, eth_client: P, opts: WatchOpts) -> Self {
        Self {
            addresses,
            eth_client,
            opts,
            _transport: PhantomData,
        }
    }

    pub async fn query_staked(
        &self,
        range: FilterOpts,
        stakers: &[Address],
    ) -> Result<Vec<(RestakingPool::Staked, Log)>> {
        watch::query_typed(
            &self.eth_client,
            self.addresses.restaking_pool,
            &[words(stakers)],
            range,
        )
        .await
    }

    pub async fn watch_staked(
        &self,
        stakers: &[Address],
        sink: mpsc::Sender<(RestakingPool::Staked, Log)>,
    ) -> Result<EventSubscription> {
        watch::watch_typed(
            &self.eth_client,
            self.addresses.restaking_pool,
            &[words(stakers)],
            sink,
            self.opts,
        )
        .await
    }

    pub async fn query_unstake(
        &self,
        range: FilterOpts,
        owners: &[Address],
        receivers: &[Address],
    ) -> Result<Vec<(RestakingPool::Unstake, Log)>> {
        watch::query_typed(
            &self.eth_client,
            self.addresses.restaking_pool,
            &[words(owners), words(receivers)],
            range,
        )
        .await
    }

    pub async fn watch_unstake(
        &self,
        owners: &[Address],
        receivers: &[Address],
        sink: mpsc::Sender<(RestakingPool::Unstake, Log)>,
    ) -> Result<EventSubscription> {
        watch::watch_typed(
            &self.eth_client,
            self.addresses.restaking_pool,
            &[words(owners), words(receivers)],
            sink,
            self.opts,
        )
        .await
    }

    pub async fn query_claim_expected(
        &self,
        range: FilterOpts,
        claimers: &[Address],
    ) -> Result<Vec<(RestakingPool::ClaimExpected, Log)>> {
        watch::query_typed(
            &self.eth_client,
            self.addresses.restaking_pool,
            &[words(claimers)],
            range,
        )
        .await
    }

    pub async fn watch_claim_expected(
        &self,
        claimers: &[Address],
        sink: mpsc::Sender<(RestakingPool::ClaimExpected, Log)>,
    ) -> Result<EventSubscription> {
        watch::watch_typed(
            &self.eth_client,
            self.addresses.restaking_pool,
            &[words(claimers)],
            sink,
            self.opts,
        )
        .await
    }

    pub async fn query_ratio_updated(
        &self,
        range: FilterOpts,
        tokens: &[Address],
    ) -> Result<Vec<(RatioFeed::RatioUpdated, Log)>> {
        watch::query_typed(
            &self.eth_client,
            self.addresses.ratio_feed,
            &[words(tokens)],
            range,
        )
        .await
    }

    pub async fn watch_ratio_updated(
        &self,
        tokens: &[Address],
        sink: mpsc::Sender<(RatioFeed::RatioUpdated, Log)>,
    ) -> Result<EventSubscription> {
        watch::watch_typed(
            &self.eth_client,
            self.addresses.ratio_feed,
            &[words(tokens)],
            sink,
            self.opts,
        )
        .await
    }

    pub async fn query_transfers(
        &self,
        range: FilterOpts,
        from: &[Address],
        to: &[Address],
    ) -> Result<Vec<(CToken::Transfer, Log)>> {
        watch::query_typed(
            &self.eth_client,
            self.addresses.c_token,
            &[words(from), words(to)],
            range,
        )
        .await
    }

    pub async fn watch_transfers(
        &self,
        from: &[Address],
        to: &[Address],
        sink: mpsc::Sender<(CToken::Transfer, Log)>,
    ) -> Result<EventSubscription> {
        watch::watch_typed(
            &self.eth_client,
            self.addresses.c_token,
            &[words(from), words(to)],
            sink,
            self.opts,
        )
        .await
    }

    pub async fn query_restaker_deployed(
        &self,
        range: FilterOpts,
        creators: &[Address],
        restakers: &[Address],
    ) -> Result<Vec<(RestakerDeployer::RestakerDeployed, Log)>> {
        watch::query_typed(
            &self.eth_client,
            self.addresses.restaker_deployer,
            &[words(creators), words(restakers)],
            range,
        )
        .await
    }

    pub async fn watch_restaker_deployed(
        &self,
        creators: &[Address],
        restakers: &[Address],
        sink: mpsc::Sender<(RestakerDeployer::RestakerDeployed, Log)>,
    ) -> Result<EventSubscription> {
        watch::watch_typed(
            &self.eth_client,
            self.addresses.restaker_deployer,
            &[words(creators), words(restakers)],
            sink,
            self.opts,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::{primitives::U256, sol_types::SolEvent};

    #[test]
    fn transfer_filter_matches_encoded_log() {
        let from = Address::repeat_byte(0x0a);
        let to = Address::repeat_byte(0x0b);
        let token = Address::repeat_byte(0x0c);
        let filter = watch::event_filter::<CToken::Transfer>(token, &[words(&[from]), words(&[])]);

        let event = CToken::Transfer {
            from,
            to,
            value: U256::from(7),
        };
        let data = event.encode_log_data();
        assert_eq!(data.topics().len(), 3);
        assert!(filter.topics[0].matches(&data.topics()[0]));
        assert!(filter.topics[1].matches(&data.topics()[1]));
        assert!(filter.topics[2].is_empty());
        assert!(filter.address.matches(&token));
    }

    #[test]
    fn empty_address_list_is_wildcard() {
        assert!(words(&[]).is_empty());
        let filter = watch::with_indexed_topics(
            watch::event_filter::<RestakingPool::Staked>(Address::ZERO, &[]),
            &[words(&[])],
        );
        assert!(filter.topics[1].is_empty());
    }
}
