use alloy::{
    primitives::{Address, U256},
    transports::http::{Client, Http},
};
use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use restaking_bindings::{
    bindings::ContractKind,
    config::Config,
    ethereum::{
        contract::{function_signatures, ContractManager},
        provider::ProviderManager,
        utils,
        watch::FilterOpts,
        EventInfo, FunctionCall, TransactionInfo,
    },
    protocol::{
        ProtocolChainReader, ProtocolChainSubscriber, ProtocolChainWriter, ProtocolReader,
        ProtocolWriter,
    },
    server::RestakingMcpServer,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

fn contract_arg() -> Arg {
    Arg::new("contract")
        .required(true)
        .value_name("CONTRACT")
        .help("Contract name (RestakingPool) or alias (restaking_pool)")
}

fn address_arg() -> Arg {
    Arg::new("address")
        .short('a')
        .long("address")
        .value_name("ADDRESS")
        .help("Contract address; defaults to the configured deployment")
}

fn params_arg() -> Arg {
    Arg::new("params")
        .short('p')
        .long("params")
        .value_name("JSON")
        .help("Arguments as a JSON array, or an object keyed by parameter name")
}

fn call_command(name: &'static str, about: &'static str) -> Command {
    Command::new(name)
        .about(about)
        .arg(contract_arg())
        .arg(
            Arg::new("function")
                .required(true)
                .value_name("FUNCTION")
                .help("Function name, or full signature for overloads"),
        )
        .arg(address_arg())
        .arg(params_arg())
}

fn private_key_arg() -> Arg {
    Arg::new("private-key")
        .long("private-key")
        .value_name("KEY")
        .help("Signing key; falls back to the PRIVATE_KEY environment variable")
}

fn range_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("from-block")
                .long("from-block")
                .value_name("BLOCK")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("to-block")
                .long("to-block")
                .value_name("BLOCK")
                .value_parser(clap::value_parser!(u64)),
        )
}

fn cli() -> Command {
    Command::new("restaking-bindings")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Bindings, CLI and MCP server for the liquid-restaking contracts")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Path to configuration file"),
        )
        .arg(
            Arg::new("network")
                .short('n')
                .long("network")
                .value_name("NETWORK")
                .global(true)
                .help("Network to use (ethereum, holesky, or any configured network)"),
        )
        .arg(
            Arg::new("rpc-url")
                .short('r')
                .long("rpc-url")
                .value_name("URL")
                .global(true)
                .help("RPC endpoint URL"),
        )
        .arg(
            Arg::new("allow-writes")
                .long("allow-writes")
                .global(true)
                .help("Allow write operations (transactions)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .help("Generate a sample configuration file and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config-path")
                .long("config-path")
                .help("Print the default configuration file path and exit")
                .action(ArgAction::SetTrue),
        )
        .subcommand(Command::new("contracts").about("List embedded contracts and their addresses"))
        .subcommand(
            Command::new("abi")
                .about("Print the ABI of a contract")
                .arg(contract_arg()),
        )
        .subcommand(
            Command::new("signatures")
                .about("Print function selectors and event signatures")
                .arg(contract_arg()),
        )
        .subcommand(
            call_command("call", "Call a read-only function")
                .arg(
                    Arg::new("block")
                        .long("block")
                        .value_name("BLOCK")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(Arg::new("from").long("from").value_name("ADDRESS")),
        )
        .subcommand(
            call_command("send", "Send a transaction")
                .arg(Arg::new("value").long("value").value_name("WEI"))
                .arg(
                    Arg::new("gas-limit")
                        .long("gas-limit")
                        .value_name("GAS")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(Arg::new("gas-price").long("gas-price").value_name("WEI"))
                .arg(private_key_arg()),
        )
        .subcommand(
            call_command("estimate", "Estimate gas for a function call")
                .arg(Arg::new("value").long("value").value_name("WEI"))
                .arg(Arg::new("from").long("from").value_name("ADDRESS")),
        )
        .subcommand(range_args(
            Command::new("events")
                .about("Query decoded historical events")
                .arg(contract_arg())
                .arg(address_arg())
                .arg(Arg::new("event").short('e').long("event").value_name("EVENT"))
                .arg(
                    Arg::new("indexed")
                        .long("indexed")
                        .value_name("JSON")
                        .help("JSON array with one value per indexed field, null for any"),
                ),
        ))
        .subcommand(
            Command::new("watch")
                .about("Stream decoded events until Ctrl-C")
                .arg(contract_arg())
                .arg(address_arg())
                .arg(Arg::new("event").short('e').long("event").value_name("EVENT"))
                .arg(Arg::new("indexed").long("indexed").value_name("JSON")),
        )
        .subcommand(
            Command::new("deploy")
                .about("Deploy a compiled artifact from the artifacts directory")
                .arg(Arg::new("artifact").required(true).value_name("ARTIFACT"))
                .arg(
                    Arg::new("args")
                        .long("args")
                        .value_name("JSON")
                        .help("Constructor arguments as a JSON array or object"),
                )
                .arg(Arg::new("value").long("value").value_name("WEI"))
                .arg(private_key_arg()),
        )
        .subcommand(Command::new("serve").about("Run the MCP server over stdio"))
        .subcommand(
            Command::new("protocol")
                .about("Protocol flows resolved through the configured ProtocolConfig")
                .subcommand_required(true)
                .subcommand(Command::new("status").about("Registry addresses, ratio and pool state"))
                .subcommand(
                    Command::new("account")
                        .about("cToken balance and claimable amount of an account")
                        .arg(Arg::new("account").required(true).value_name("ADDRESS")),
                )
                .subcommand(range_args(
                    Command::new("history")
                        .about("Staked and Unstake events, optionally for one account")
                        .arg(Arg::new("account").long("account").value_name("ADDRESS")),
                ))
                .subcommand(
                    Command::new("stake")
                        .about("Stake ETH into the pool")
                        .arg(Arg::new("amount").required(true).value_name("WEI"))
                        .arg(private_key_arg()),
                )
                .subcommand(
                    Command::new("unstake")
                        .about("Unstake cToken shares")
                        .arg(Arg::new("shares").required(true).value_name("SHARES"))
                        .arg(Arg::new("to").long("to").value_name("ADDRESS"))
                        .arg(private_key_arg()),
                )
                .subcommand(
                    Command::new("claim")
                        .about("Claim a distributed unstake")
                        .arg(Arg::new("claimer").long("claimer").value_name("ADDRESS"))
                        .arg(private_key_arg()),
                ),
        )
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn json_arg(matches: &ArgMatches, name: &str) -> Result<Value> {
    match matches.get_one::<String>(name) {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| anyhow!("--{} is not valid JSON: {}", name, e)),
        None => Ok(Value::Null),
    }
}

fn indexed_arg(matches: &ArgMatches) -> Result<Vec<Option<Value>>> {
    match json_arg(matches, "indexed")? {
        Value::Null => Ok(Vec::new()),
        Value::Array(values) => Ok(values
            .into_iter()
            .map(|v| if v.is_null() { None } else { Some(v) })
            .collect()),
        other => Err(anyhow!("--indexed must be a JSON array, got {}", other)),
    }
}

fn private_key(matches: &ArgMatches) -> Result<String> {
    if let Some(key) = matches.get_one::<String>("private-key") {
        return Ok(key.clone());
    }
    std::env::var("PRIVATE_KEY")
        .map_err(|_| anyhow!("No private key given. Use --private-key or set PRIVATE_KEY"))
}

fn function_call(matches: &ArgMatches) -> Result<FunctionCall> {
    Ok(FunctionCall {
        function_name: matches
            .get_one::<String>("function")
            .cloned()
            .unwrap_or_default(),
        parameters: json_arg(matches, "params")?,
        from: matches.try_get_one::<String>("from").ok().flatten().cloned(),
        gas_limit: matches.try_get_one::<u64>("gas-limit").ok().flatten().copied(),
        gas_price: matches
            .try_get_one::<String>("gas-price")
            .ok()
            .flatten()
            .cloned(),
        value: matches.try_get_one::<String>("value").ok().flatten().cloned(),
    })
}

fn contract_name(matches: &ArgMatches) -> &str {
    matches
        .get_one::<String>("contract")
        .map(|s| s.as_str())
        .unwrap_or_default()
}

fn address(matches: &ArgMatches) -> Option<&str> {
    matches.get_one::<String>("address").map(|s| s.as_str())
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries command output and MCP frames; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let matches = cli().get_matches();

    if matches.get_flag("generate-config") {
        println!("{}", Config::generate_sample());
        return Ok(());
    }

    if matches.get_flag("config-path") {
        match Config::default_config_path() {
            Ok(path) => {
                println!("{}", path.display());
                return Ok(());
            }
            Err(e) => {
                error!("Could not determine default config path: {}", e);
                return Err(e);
            }
        }
    }

    let config_path = matches.get_one::<String>("config").map(|s| s.as_str());
    let mut config = Config::load_or_default(config_path).await;

    if let Some(network) = matches.get_one::<String>("network") {
        config.default_network = network.clone();
    }

    if let Some(rpc_url) = matches.get_one::<String>("rpc-url") {
        match config.networks.get_mut(&config.default_network) {
            Some(network_config) => network_config.rpc_url = rpc_url.clone(),
            None => warn!(
                "--rpc-url ignored: network '{}' is not configured",
                config.default_network
            ),
        }
    }

    if matches.get_flag("allow-writes") {
        config.security.allow_write_operations = true;
    }

    info!("Default network: {}", config.default_network);
    info!(
        "Write operations allowed: {}",
        config.security.allow_write_operations
    );

    let mut manager = ContractManager::new(ProviderManager::new(config)?);

    match matches.subcommand() {
        Some(("contracts", _)) => print_json(&manager.list_contracts(None)?),
        Some(("abi", sub)) => {
            let artifact = manager
                .abi_resolver_mut()
                .resolve_name(contract_name(sub))
                .await?;
            print_json(artifact.abi.as_ref())
        }
        Some(("signatures", sub)) => {
            let artifact = manager
                .abi_resolver_mut()
                .resolve_name(contract_name(sub))
                .await?;
            let events: Vec<Value> = artifact
                .abi
                .events()
                .map(|e| json!({ "signature": e.signature(), "topic0": e.selector() }))
                .collect();
            print_json(&json!({
                "functions": function_signatures(&artifact.abi),
                "events": events,
            }))
        }
        Some(("call", sub)) => {
            let result = manager
                .call_view_function(
                    contract_name(sub),
                    address(sub),
                    &function_call(sub)?,
                    sub.get_one::<u64>("block").copied(),
                    None,
                )
                .await?;
            print_json(&result)
        }
        Some(("estimate", sub)) => {
            let gas = manager
                .estimate_gas(contract_name(sub), address(sub), &function_call(sub)?, None)
                .await?;
            print_json(&json!({ "gas": gas }))
        }
        Some(("send", sub)) => {
            let key = private_key(sub)?;
            let info = manager
                .send_transaction(
                    contract_name(sub),
                    address(sub),
                    &function_call(sub)?,
                    &key,
                    None,
                )
                .await?;
            print_json(&info)
        }
        Some(("events", sub)) => {
            let events = manager
                .get_contract_events(
                    contract_name(sub),
                    address(sub),
                    sub.get_one::<String>("event").map(|s| s.as_str()),
                    &indexed_arg(sub)?,
                    sub.get_one::<u64>("from-block").copied(),
                    sub.get_one::<u64>("to-block").copied(),
                    None,
                )
                .await?;
            print_json(&events)
        }
        Some(("watch", sub)) => watch(&mut manager, sub).await,
        Some(("deploy", sub)) => {
            let key = private_key(sub)?;
            let artifact = sub
                .get_one::<String>("artifact")
                .map(|s| s.as_str())
                .unwrap_or_default();
            let info = manager
                .deploy_contract(
                    artifact,
                    &json_arg(sub, "args")?,
                    sub.get_one::<String>("value").map(|s| s.as_str()),
                    &key,
                    None,
                )
                .await?;
            print_json(&info)
        }
        Some(("protocol", sub)) => protocol(&manager, sub).await,
        Some(("serve", _)) | None => serve(manager).await,
        Some((other, _)) => Err(anyhow!("Unknown command '{}'", other)),
    }
}

async fn serve(manager: ContractManager) -> Result<()> {
    let server = RestakingMcpServer::with_manager(manager);
    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
        return Err(e);
    }
    Ok(())
}

async fn watch(manager: &mut ContractManager, matches: &ArgMatches) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(64);
    let mut subscription = manager
        .watch_events(
            contract_name(matches),
            address(matches),
            matches.get_one::<String>("event").map(|s| s.as_str()),
            &indexed_arg(matches)?,
            None,
            tx,
        )
        .await?;

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(decoded) => {
                    let raw = decoded.raw.clone();
                    print_json(&EventInfo::from_log(&raw, Some(decoded)))?;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch");
                subscription.unsubscribe();
                break;
            }
        }
    }

    drop(rx);
    subscription.err().await
}

fn parse_amount(matches: &ArgMatches, name: &str) -> Result<U256> {
    let raw = matches
        .get_one::<String>(name)
        .ok_or_else(|| anyhow!("Missing {}", name))?;
    utils::validate_hex_value(raw)
}

fn optional_address(matches: &ArgMatches, name: &str) -> Result<Option<Address>> {
    matches
        .get_one::<String>(name)
        .map(|a| utils::validate_address(a))
        .transpose()
}

async fn protocol(manager: &ContractManager, matches: &ArgMatches) -> Result<()> {
    let providers = manager.provider_manager();
    let network = providers.network_name(None);
    let protocol_config = providers
        .config()
        .contract_address(network, ContractKind::ProtocolConfig.name())
        .ok_or_else(|| {
            anyhow!(
                "No ProtocolConfig address configured for network '{}'",
                network
            )
        })
        .and_then(utils::validate_address)?;

    let reader = ProtocolChainReader::<Http<Client>, _>::build(
        protocol_config,
        providers.get_provider(None)?.clone(),
    )
    .await?;
    let addresses = *reader.addresses();

    match matches.subcommand() {
        Some(("status", _)) => {
            let (ratio, pool) = tokio::try_join!(reader.ratio(), reader.pool_state())?;
            print_json(&json!({
                "network": network,
                "addresses": addresses,
                "ratio": ratio.to_string(),
                "pool": pool,
            }))
        }
        Some(("account", sub)) => {
            let account = optional_address(sub, "account")?
                .ok_or_else(|| anyhow!("Missing account"))?;
            let (balance, claimable) =
                tokio::try_join!(reader.balance_of(account), reader.claimable_of(account))?;
            let amount = reader.convert_to_amount(balance).await?;
            print_json(&json!({
                "account": account,
                "shares": balance.to_string(),
                "amount": amount.to_string(),
                "claimable": claimable.to_string(),
            }))
        }
        Some(("history", sub)) => {
            let accounts: Vec<Address> = optional_address(sub, "account")?.into_iter().collect();
            let range = FilterOpts::range(
                sub.get_one::<u64>("from-block").copied(),
                sub.get_one::<u64>("to-block").copied(),
            );
            let subscriber = ProtocolChainSubscriber::<Http<Client>, _>::new(
                addresses,
                providers.get_provider(None)?.clone(),
                providers.watch_opts(None),
            );
            let (staked, unstaked) = tokio::try_join!(
                subscriber.query_staked(range, &accounts),
                subscriber.query_unstake(range, &accounts, &[]),
            )?;
            let staked: Vec<Value> = staked
                .iter()
                .map(|(event, log)| {
                    json!({
                        "staker": event.staker,
                        "amount": event.amount.to_string(),
                        "shares": event.shares.to_string(),
                        "block": log.block_number,
                    })
                })
                .collect();
            let unstaked: Vec<Value> = unstaked
                .iter()
                .map(|(event, log)| {
                    json!({
                        "owner": event.ownerAddress,
                        "receiver": event.receiverAddress,
                        "amount": event.amount.to_string(),
                        "shares": event.shares.to_string(),
                        "block": log.block_number,
                    })
                })
                .collect();
            print_json(&json!({ "staked": staked, "unstaked": unstaked }))
        }
        Some((action, sub)) => {
            if !providers.config().security.allow_write_operations {
                return Err(anyhow!(
                    "Write operations are disabled. Use --allow-writes flag or set security.allow_write_operations to enable transactions."
                ));
            }
            let signer = utils::parse_private_key(&private_key(sub)?)?;
            let sender = signer.address();
            let writer = ProtocolChainWriter::<Http<Client>, _>::new(
                addresses,
                providers.wallet_provider(None, signer)?,
            );

            let receipt = match action {
                "stake" => {
                    let amount = parse_amount(sub, "amount")?;
                    if let Some(max) = providers.config().max_transaction_value()? {
                        if amount > max {
                            return Err(anyhow!(
                                "Stake of {} wei exceeds the configured maximum of {} wei",
                                amount,
                                max
                            ));
                        }
                    }
                    writer.stake(amount).await?
                }
                "unstake" => {
                    let shares = parse_amount(sub, "shares")?;
                    let to = optional_address(sub, "to")?.unwrap_or(sender);
                    writer.unstake(to, shares).await?
                }
                "claim" => {
                    let claimer = optional_address(sub, "claimer")?.unwrap_or(sender);
                    writer.claim_unstake(claimer).await?
                }
                other => return Err(anyhow!("Unknown protocol command '{}'", other)),
            };
            print_json(&TransactionInfo::from_receipt(&receipt))
        }
        None => Err(anyhow!("Missing protocol command")),
    }
}
