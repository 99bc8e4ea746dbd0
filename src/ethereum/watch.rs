use alloy::{
    primitives::{Address, B256},
    providers::Provider,
    rpc::types::{Filter, Log},
    sol_types::SolEvent,
    transports::Transport,
};
use anyhow::{anyhow, Result};
use futures::{stream::BoxStream, Stream, StreamExt};
use std::time::Duration;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::debug;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

/// Block range for historical queries. `None` bounds are left to the node
/// (earliest / latest).
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterOpts {
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
}

impl FilterOpts {
    pub fn range(from_block: Option<u64>, to_block: Option<u64>) -> Self {
        Self {
            from_block,
            to_block,
        }
    }

    pub fn apply(&self, mut filter: Filter) -> Filter {
        if let Some(from) = self.from_block {
            filter = filter.from_block(from);
        }
        if let Some(to) = self.to_block {
            filter = filter.to_block(to);
        }
        filter
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WatchOpts {
    pub poll_interval: Duration,
}

impl Default for WatchOpts {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Sets topics 1..=3, one set of accepted values per indexed field. An empty
/// set is a wildcard.
pub fn with_indexed_topics(mut filter: Filter, indexed: &[Vec<B256>]) -> Filter {
    for (position, topics) in indexed.iter().enumerate() {
        if topics.is_empty() {
            continue;
        }
        let topics = topics.clone();
        filter = match position {
            0 => filter.topic1(topics),
            1 => filter.topic2(topics),
            _ => filter.topic3(topics),
        };
    }
    filter
}

pub fn event_filter<E: SolEvent>(address: Address, indexed: &[Vec<B256>]) -> Filter {
    let filter = Filter::new()
        .address(address)
        .event_signature(E::SIGNATURE_HASH);
    with_indexed_topics(filter, indexed)
}

pub fn decode_typed<E: SolEvent>(log: &Log) -> Result<(E, Log)> {
    let decoded = log
        .log_decode::<E>()
        .map_err(|e| anyhow!("Failed to decode {} log: {}", E::SIGNATURE, e))?;
    Ok((decoded.inner.data, log.clone()))
}

/// Handle to a running forwarding task. Dropping it cancels the task.
#[derive(Debug)]
pub struct EventSubscription {
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<()>>,
}

impl EventSubscription {
    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the task to end and returns why it ended. Does not cancel.
    pub async fn err(self) -> Result<()> {
        let EventSubscription { cancel, handle } = self;
        let result = handle.await;
        drop(cancel);
        result.map_err(|e| anyhow!("Event subscription task failed: {}", e))?
    }
}

/// Forwards decoded logs from `stream` into `sink` until the subscription is
/// cancelled, the sink is dropped, the stream ends or a log fails to decode.
/// The last two end the task with an error.
pub fn spawn_forwarder<S, T, F>(stream: S, sink: mpsc::Sender<T>, decode: F) -> EventSubscription
where
    S: Stream<Item = Log> + Send + 'static,
    T: Send + 'static,
    F: Fn(&Log) -> Result<T> + Send + 'static,
{
    let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        let mut stream = Box::pin(stream);
        loop {
            let next = tokio::select! {
                _ = &mut cancel_rx => {
                    debug!("Event subscription cancelled");
                    return Ok(());
                }
                _ = sink.closed() => {
                    debug!("Event sink dropped, stopping subscription");
                    return Ok(());
                }
                next = stream.next() => next,
            };

            let Some(log) = next else {
                return Err(anyhow!("Log subscription closed by the provider"));
            };
            let event = decode(&log)?;

            tokio::select! {
                _ = &mut cancel_rx => {
                    debug!("Event subscription cancelled");
                    return Ok(());
                }
                sent = sink.send(event) => {
                    if sent.is_err() {
                        debug!("Event sink dropped, stopping subscription");
                        return Ok(());
                    }
                }
            }
        }
    });

    EventSubscription {
        cancel: Some(cancel_tx),
        handle,
    }
}

/// Polls `eth_getFilterChanges` for `filter` and flattens the batches.
pub async fn log_stream<T, P>(
    provider: &P,
    filter: &Filter,
    opts: WatchOpts,
) -> Result<BoxStream<'static, Log>>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let poller = provider
        .watch_logs(filter)
        .await
        .map_err(|e| anyhow!("Failed to install log filter: {}", e))?;

    Ok(poller
        .with_poll_interval(opts.poll_interval)
        .into_stream()
        .flat_map(futures::stream::iter)
        .boxed())
}

pub async fn query_typed<E, T, P>(
    provider: &P,
    address: Address,
    indexed: &[Vec<B256>],
    opts: FilterOpts,
) -> Result<Vec<(E, Log)>>
where
    E: SolEvent,
    T: Transport + Clone,
    P: Provider<T>,
{
    let filter = opts.apply(event_filter::<E>(address, indexed));
    let logs = provider
        .get_logs(&filter)
        .await
        .map_err(|e| anyhow!("Failed to fetch {} logs: {}", E::SIGNATURE, e))?;
    logs.iter().map(decode_typed::<E>).collect()
}

pub async fn watch_typed<E, T, P>(
    provider: &P,
    address: Address,
    indexed: &[Vec<B256>],
    sink: mpsc::Sender<(E, Log)>,
    opts: WatchOpts,
) -> Result<EventSubscription>
where
    E: SolEvent + Send + 'static,
    T: Transport + Clone,
    P: Provider<T>,
{
    let filter = event_filter::<E>(address, indexed);
    let stream = log_stream(provider, &filter, opts).await?;
    debug!("Watching {} at {}", E::SIGNATURE, address);
    Ok(spawn_forwarder(stream, sink, decode_typed::<E>))
}
