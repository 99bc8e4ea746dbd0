use alloy::{
    dyn_abi::DynSolValue,
    eips::BlockId,
    json_abi::JsonAbi,
    network::{Ethereum, TransactionBuilder},
    primitives::{Address, Bytes, B256, U256},
    providers::{PendingTransactionBuilder, Provider},
    rpc::types::{Filter, Log, TransactionRequest},
    transports::Transport,
};
use anyhow::{anyhow, Result};
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::{marker::PhantomData, sync::Arc};
use tokio::sync::mpsc;
use tracing::debug;

use super::{
    codec::{self, DecodedLog},
    watch::{self, EventSubscription, FilterOpts, WatchOpts},
};
use crate::bindings::{Artifact, ContractKind};

/// Options for read-only calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallOpts {
    pub from: Option<Address>,
    /// Block to execute against; latest when unset.
    pub block: Option<u64>,
}

/// Options for state-changing calls. Unset fields are left to the provider's
/// fillers.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactOpts {
    pub from: Option<Address>,
    pub value: Option<U256>,
    pub gas_limit: Option<u64>,
    /// Legacy gas price. Takes precedence over the EIP-1559 fields.
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub nonce: Option<u64>,
}

impl TransactOpts {
    fn apply(&self, mut tx: TransactionRequest) -> TransactionRequest {
        if let Some(from) = self.from {
            tx = tx.from(from);
        }
        if let Some(value) = self.value {
            tx = tx.value(value);
        }
        if let Some(gas) = self.gas_limit {
            tx = tx.with_gas_limit(gas);
        }
        if let Some(gas_price) = self.gas_price {
            tx = tx.with_gas_price(gas_price);
        } else {
            if let Some(max_fee) = self.max_fee_per_gas {
                tx = tx.with_max_fee_per_gas(max_fee);
            }
            if let Some(tip) = self.max_priority_fee_per_gas {
                tx = tx.with_max_priority_fee_per_gas(tip);
            }
        }
        if let Some(nonce) = self.nonce {
            tx = tx.with_nonce(nonce);
        }
        tx
    }
}

/// A contract bound to an address through a parsed ABI. Groups the caller,
/// transactor and filterer facets over one provider.
#[derive(Debug, Clone)]
pub struct BoundContract<T, P> {
    address: Address,
    abi: Arc<JsonAbi>,
    provider: P,
    _transport: PhantomData<T>,
}

impl<T, P> BoundContract<T, P>
where
    T: Transport + Clone,
    P: Provider<T> + Clone,
{
    pub fn new(address: Address, abi: Arc<JsonAbi>, provider: P) -> Self {
        Self {
            address,
            abi,
            provider,
            _transport: PhantomData,
        }
    }

    pub fn embedded(kind: ContractKind, address: Address, provider: P) -> Self {
        Self::new(address, Arc::new(kind.abi().clone()), provider)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn request(&self, method: &str, params: &Value) -> Result<TransactionRequest> {
        let function = codec::find_function(&self.abi, method)?;
        let calldata = codec::encode_call(function, params)?;
        Ok(TransactionRequest::default()
            .to(self.address)
            .input(calldata.into()))
    }

    // Caller

    pub async fn call_raw(
        &self,
        opts: &CallOpts,
        method: &str,
        params: &Value,
    ) -> Result<Vec<DynSolValue>> {
        let function = codec::find_function(&self.abi, method)?;
        let output = self.call_bytes(opts, method, params).await?;
        codec::decode_output_values(function, &output)
    }

    /// Executes `eth_call` and decodes the return data into JSON.
    pub async fn call(&self, opts: &CallOpts, method: &str, params: &Value) -> Result<Value> {
        let function = codec::find_function(&self.abi, method)?;
        let output = self.call_bytes(opts, method, params).await?;
        codec::decode_output(function, &output)
    }

    async fn call_bytes(&self, opts: &CallOpts, method: &str, params: &Value) -> Result<Bytes> {
        let mut tx = self.request(method, params)?;
        if let Some(from) = opts.from {
            tx = tx.from(from);
        }

        let call = self.provider.call(&tx);
        let output = match opts.block {
            Some(block) => call.block(BlockId::number(block)).await,
            None => call.await,
        }
        .map_err(|e| anyhow!("eth_call {} failed: {}", method, e))?;

        debug!("{} returned {} bytes", method, output.len());
        Ok(output)
    }

    // Transactor

    /// Submits the transaction and returns without waiting for inclusion.
    pub async fn transact(
        &self,
        opts: &TransactOpts,
        method: &str,
        params: &Value,
    ) -> Result<PendingTransactionBuilder<T, Ethereum>> {
        let tx = opts.apply(self.request(method, params)?);
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| anyhow!("Failed to send {}: {}", method, e))?;
        debug!("{} submitted: {:?}", method, pending.tx_hash());
        Ok(pending)
    }

    /// Plain value transfer to the contract's receive/fallback function.
    pub async fn transfer(&self, opts: &TransactOpts) -> Result<PendingTransactionBuilder<T, Ethereum>> {
        if self.abi.receive.is_none() && self.abi.fallback.is_none() {
            return Err(anyhow!(
                "Contract at {} has neither a receive nor a fallback function",
                self.address
            ));
        }
        let tx = opts.apply(TransactionRequest::default().to(self.address));
        self.provider
            .send_transaction(tx)
            .await
            .map_err(|e| anyhow!("Failed to send transfer: {}", e))
    }

    pub async fn estimate_gas(&self, opts: &TransactOpts, method: &str, params: &Value) -> Result<u64> {
        let tx = opts.apply(self.request(method, params)?);
        self.provider
            .estimate_gas(&tx)
            .await
            .map_err(|e| anyhow!("Gas estimation for {} failed: {}", method, e))
    }

    // Filterer

    fn event_filter(&self, event: &str, indexed: &[Option<Value>]) -> Result<Filter> {
        let abi_event = codec::find_event(&self.abi, event)?;
        let topics: Vec<Vec<B256>> = codec::indexed_topics(abi_event, indexed)?
            .into_iter()
            .map(|topic| topic.into_iter().collect())
            .collect();
        let filter = Filter::new()
            .address(self.address)
            .event_signature(abi_event.selector());
        Ok(watch::with_indexed_topics(filter, &topics))
    }

    /// Historical logs of `event`, decoded, in node order.
    pub async fn filter_logs(
        &self,
        opts: &FilterOpts,
        event: &str,
        indexed: &[Option<Value>],
    ) -> Result<Vec<DecodedLog>> {
        let filter = opts.apply(self.event_filter(event, indexed)?);
        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|e| anyhow!("Failed to fetch {} logs: {}", event, e))?;
        logs.iter().map(|log| self.unpack_log(event, log)).collect()
    }

    /// Streams decoded `event` logs into `sink` until unsubscribed.
    pub async fn watch_logs(
        &self,
        opts: WatchOpts,
        event: &str,
        indexed: &[Option<Value>],
        sink: mpsc::Sender<DecodedLog>,
    ) -> Result<EventSubscription> {
        let filter = self.event_filter(event, indexed)?;
        let abi_event = codec::find_event(&self.abi, event)?.clone();
        let stream = watch::log_stream(&self.provider, &filter, opts).await?;
        debug!("Watching {} at {}", abi_event.signature(), self.address);
        Ok(watch::spawn_forwarder(stream, sink, move |log| {
            codec::decode_log(&abi_event, log)
        }))
    }

    /// Streams every log of the contract, decoded against whichever ABI event
    /// matches its topic.
    /// Logs with a topic outside the ABI (proxy `Upgraded`, `Initialized`)
    /// are skipped.
    pub async fn watch_all(&self, opts: WatchOpts, sink: mpsc::Sender<DecodedLog>) -> Result<EventSubscription> {
        let filter = Filter::new().address(self.address);
        let stream = watch::log_stream(&self.provider, &filter, opts).await?;
        Ok(forward_known_events(self.abi.clone(), stream, sink))
    }

    pub fn unpack_log(&self, event: &str, log: &Log) -> Result<DecodedLog> {
        let abi_event = codec::find_event(&self.abi, event)?;
        codec::decode_log(abi_event, log)
    }
}

/// Decodes `log` against whichever event of `abi` its first topic selects.
pub fn unpack_any(abi: &JsonAbi, log: &Log) -> Result<DecodedLog> {
    let event = codec::event_for_log(abi, log).ok_or_else(|| {
        anyhow!(
            "Log topic {:?} matches no event in the contract ABI",
            log.topics().first()
        )
    })?;
    codec::decode_log(event, log)
}

/// Forwards the logs of `stream` that `abi` has an event for, decoded.
pub(crate) fn forward_known_events<S>(
    abi: Arc<JsonAbi>,
    stream: S,
    sink: mpsc::Sender<DecodedLog>,
) -> EventSubscription
where
    S: Stream<Item = Log> + Send + 'static,
{
    let filter_abi = abi.clone();
    let known = stream.filter(move |log| {
        let known = codec::event_for_log(&filter_abi, log).is_some();
        if !known {
            debug!(
                "Skipping log with unknown topic {:?} at {}",
                log.topics().first(),
                log.address()
            );
        }
        futures::future::ready(known)
    });
    watch::spawn_forwarder(known, sink, move |log| unpack_any(&abi, log))
}

/// Sends a creation transaction for `artifact`.
pub async fn deploy<T, P>(
    provider: &P,
    opts: &TransactOpts,
    artifact: &Artifact,
    constructor_args: &[DynSolValue],
) -> Result<PendingTransactionBuilder<T, Ethereum>>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let code = artifact.deploy_code(constructor_args)?;
    let tx = opts.apply(TransactionRequest::default().with_deploy_code(code));
    provider
        .send_transaction(tx)
        .await
        .map_err(|e| anyhow!("Failed to deploy {}: {}", artifact.name, e))
}
