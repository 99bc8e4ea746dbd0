use alloy::{
    primitives::{Address, U256},
    signers::local::PrivateKeySigner,
};
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Parses a `0x`-prefixed, 40 hex digit address. Checksums are not enforced.
pub fn validate_address(address: &str) -> Result<Address> {
    let address = address.trim();
    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| {
            anyhow!(
                "Invalid address '{}': expected 0x followed by 40 hex digits",
                address
            )
        })?;

    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(anyhow!(
            "Invalid address '{}': expected 0x followed by 40 hex digits, got {} characters",
            address,
            digits.len()
        ));
    }

    Address::from_str(digits).map_err(|e| anyhow!("Invalid address '{}': {}", address, e))
}

pub fn validate_network(network: &str, available_networks: &[String]) -> Result<()> {
    if available_networks.iter().any(|n| n == network) {
        return Ok(());
    }
    Err(anyhow!(
        "Unknown network '{}'. Configured networks: {}",
        network,
        available_networks.join(", ")
    ))
}

/// Validates a function or event name. A full signature such as
/// `unstake(address,uint256)` is accepted to pick an overload.
pub fn validate_function_name(function_name: &str) -> Result<()> {
    let name = function_name.split('(').next().unwrap_or_default();

    let Some(first) = name.chars().next() else {
        return Err(anyhow!("Function name cannot be empty"));
    };

    if !first.is_ascii_alphabetic() && first != '_' && first != '$' {
        return Err(anyhow!(
            "Invalid function name: '{}'. Function names must start with a letter or underscore",
            function_name
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    {
        return Err(anyhow!(
            "Invalid function name: '{}'. Function names can only contain letters, numbers, and underscores",
            function_name
        ));
    }

    if name.len() != function_name.len() && !function_name.ends_with(')') {
        return Err(anyhow!(
            "Invalid function signature: '{}'. Expected 'name(type,...)'",
            function_name
        ));
    }

    Ok(())
}

/// Parses a hex private key, with or without the `0x` prefix.
pub fn parse_private_key(private_key: &str) -> Result<PrivateKeySigner> {
    let private_key = private_key.trim();
    let private_key = private_key
        .strip_prefix("0x")
        .or_else(|| private_key.strip_prefix("0X"))
        .unwrap_or(private_key);

    PrivateKeySigner::from_str(private_key).map_err(|e| anyhow!("Invalid private key: {}", e))
}

/// Validates and parses a hex string value (for transaction values)
pub fn validate_hex_value(value_str: &str) -> Result<U256> {
    let value_str = value_str.trim();
    if value_str.is_empty() {
        return Err(anyhow!("Value cannot be empty"));
    }

    let hex_digits = value_str
        .strip_prefix("0x")
        .or_else(|| value_str.strip_prefix("0X"));
    let value = if let Some(digits) = hex_digits {
        U256::from_str_radix(digits, 16)
            .map_err(|_| anyhow!("Invalid hexadecimal value: '{}'", value_str))?
    } else {
        U256::from_str(value_str).map_err(|_| {
            anyhow!(
                "Invalid numeric value: '{}'. Use decimal format or '0x' prefixed hex",
                value_str
            )
        })?
    };

    Ok(value)
}

/// Validates an optional block range; `from` must not exceed `to`.
pub fn validate_block_range(from_block: Option<u64>, to_block: Option<u64>) -> Result<()> {
    for block in [from_block, to_block].into_iter().flatten() {
        if block > u64::MAX / 2 {
            return Err(anyhow!(
                "Block number {} is too large. Maximum supported block number is {}",
                block,
                u64::MAX / 2
            ));
        }
    }

    match (from_block, to_block) {
        (Some(from), Some(to)) if from > to => Err(anyhow!(
            "Invalid block range: from_block {} is after to_block {}",
            from,
            to
        )),
        _ => Ok(()),
    }
}

/// Revert reasons raised by the pool, the ratio feed and their access
/// modifiers, mapped to what the caller has to change.
const REVERT_HINTS: &[(&str, &str)] = &[
    ("not paused", "the contract is not paused"),
    ("paused", "the restaking pool is paused"),
    ("min stake", "the amount is below the pool's minimum stake"),
    ("min unstake", "the share amount is below the pool's minimum unstake"),
    ("max tvl", "the stake would exceed the pool's maximum TVL"),
    ("not claimable", "nothing is claimable yet; wait for distributeUnstakes"),
    ("only governance", "the sender is not the protocol governance"),
    ("only operator", "the sender is not the protocol operator"),
    ("caller is not the owner", "the sender does not own this contract"),
    ("threshold", "the new ratio is outside the ratio feed's update threshold"),
];

/// Node error substrings mapped to a short explanation.
const RPC_HINTS: &[(&str, &str)] = &[
    ("insufficient funds", "Insufficient funds to cover value plus gas"),
    ("gas required exceeds allowance", "Gas limit too low for this call"),
    ("nonce too low", "Nonce too low; a transaction with this nonce was already mined"),
    ("replacement transaction underpriced", "Gas price too low to replace the pending transaction"),
    ("connection refused", "Cannot reach the RPC endpoint; check the network's rpc_url"),
    ("network unreachable", "Cannot reach the RPC endpoint; check the network's rpc_url"),
    ("timeout", "The RPC endpoint timed out"),
    ("timed out", "The RPC endpoint timed out"),
    ("rate limit", "The RPC endpoint is rate limiting requests"),
    ("method not found", "The RPC endpoint does not support this method"),
];

/// Turns a node error into a message naming the likely cause. Reverts keep
/// their reason string.
pub fn interpret_rpc_error(error: &str) -> String {
    let lowered = error.to_ascii_lowercase();

    if let Some(at) = lowered.find("execution reverted") {
        let reason = error[at + "execution reverted".len()..]
            .trim_start_matches([':', ' '])
            .trim();
        let reason_lowered = reason.to_ascii_lowercase();
        let hint = REVERT_HINTS
            .iter()
            .find(|(needle, _)| reason_lowered.contains(needle))
            .map(|(_, hint)| *hint);
        return match (reason.is_empty(), hint) {
            (true, _) => "Execution reverted without a reason".to_string(),
            (false, Some(hint)) => format!("Execution reverted: {} ({})", reason, hint),
            (false, None) => format!("Execution reverted: {}", reason),
        };
    }

    RPC_HINTS
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map(|(_, hint)| format!("{}: {}", hint, error))
        .unwrap_or_else(|| format!("RPC error: {}", error))
}

/// Creates user-friendly error messages for ABI-related errors
pub fn interpret_abi_error(error: &str, contract: &str) -> String {
    if error.contains("Unknown contract") || error.contains("No ABI") {
        format!(
            "No ABI known for '{}'. Use one of the embedded contracts or place a compiled artifact named {}.json in the artifacts directory.",
            contract, contract
        )
    } else if error.contains("not found in contract ABI") {
        format!("{} (contract: {})", error, contract)
    } else if error.contains("overloaded") {
        format!(
            "Ambiguous function on '{}': {}. Pass the full signature instead of the bare name.",
            contract, error
        )
    } else if error.contains("Failed to parse") || error.contains("expected") {
        format!("Artifact for '{}' is not a valid ABI or compiler artifact: {}", contract, error)
    } else if error.contains("bytecode") {
        format!("Artifact for '{}' cannot be deployed: {}", contract, error)
    } else {
        format!("ABI resolution error: {}", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_address() {
        assert!(validate_address("0x742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").is_ok());
        assert!(validate_address("0x0000000000000000000000000000000000000000").is_ok());

        assert!(validate_address("").is_err());
        assert!(validate_address("not_an_address").is_err());
        assert!(validate_address("0x123").is_err()); // Too short
        assert!(validate_address("742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").is_err()); // Missing 0x
        assert!(validate_address("0xgg2d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").is_err());
        assert_eq!(
            validate_address(" 0X000000000000000000000000000000000000000A ").unwrap(),
            Address::with_last_byte(0x0a)
        );
    }

    #[test]
    fn test_validate_network() {
        let networks = vec!["ethereum".to_string(), "sepolia".to_string()];

        assert!(validate_network("ethereum", &networks).is_ok());
        assert!(validate_network("sepolia", &networks).is_ok());
        assert!(validate_network("", &networks).is_err());
        let err = validate_network("mainnet", &networks).unwrap_err().to_string();
        assert!(err.contains("ethereum, sepolia"));
    }

    #[test]
    fn test_validate_function_name() {
        assert!(validate_function_name("transfer").is_ok());
        assert!(validate_function_name("_internal").is_ok());
        assert!(validate_function_name("getBalance123").is_ok());
        assert!(validate_function_name("__Restaker_init").is_ok());
        assert!(validate_function_name("unstake(address,uint256)").is_ok());

        assert!(validate_function_name("").is_err());
        assert!(validate_function_name("()").is_err());
        assert!(validate_function_name("123invalid").is_err());
        assert!(validate_function_name("invalid-name").is_err());
        assert!(validate_function_name("unstake(address").is_err());
    }

    #[test]
    fn test_validate_hex_value() {
        assert_eq!(validate_hex_value("1000").unwrap(), U256::from(1000));
        assert_eq!(validate_hex_value("0x10").unwrap(), U256::from(16));
        assert_eq!(validate_hex_value(" 0X0a ").unwrap(), U256::from(10));

        assert!(validate_hex_value("").is_err());
        assert!(validate_hex_value("0xzz").is_err());
        assert!(validate_hex_value("1e18").is_err());
    }

    #[test]
    fn test_validate_block_range() {
        assert!(validate_block_range(None, None).is_ok());
        assert!(validate_block_range(Some(5), None).is_ok());
        assert!(validate_block_range(Some(5), Some(5)).is_ok());
        assert!(validate_block_range(Some(6), Some(5)).is_err());
        assert!(validate_block_range(Some(u64::MAX), None).is_err());
    }

    #[test]
    fn test_parse_private_key() {
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let expected: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();

        assert_eq!(parse_private_key(key).unwrap().address(), expected);
        assert_eq!(
            parse_private_key(&format!("0x{}", key)).unwrap().address(),
            expected
        );
        assert!(parse_private_key("0x1234").is_err());
    }

    #[test]
    fn test_interpret_errors() {
        assert_eq!(
            interpret_rpc_error("server returned an error response: execution reverted: Pausable: paused"),
            "Execution reverted: Pausable: paused (the restaking pool is paused)"
        );
        assert_eq!(
            interpret_rpc_error("execution reverted"),
            "Execution reverted without a reason"
        );
        assert!(interpret_rpc_error("insufficient funds for gas * price + value")
            .starts_with("Insufficient funds"));
        assert_eq!(interpret_rpc_error("boom"), "RPC error: boom");

        assert!(interpret_abi_error("Unknown contract 'Foo'", "Foo").contains("Foo.json"));
        assert!(interpret_abi_error("Function 'x' is overloaded; use a full signature", "Pool")
            .contains("full signature"));
    }
}
