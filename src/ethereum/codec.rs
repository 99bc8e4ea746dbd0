use alloy::{
    dyn_abi::{DynSolType, DynSolValue, EventExt, FunctionExt, JsonAbiExt, Specifier},
    json_abi::{Event, EventParam, Function, JsonAbi, Param},
    primitives::{keccak256, Bytes, B256},
    rpc::types::Log,
};
use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// A log decoded against its ABI event.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedLog {
    pub event: String,
    pub fields: Value,
    #[serde(skip)]
    pub raw: Log,
}

/// Looks up a function by bare name or by full signature (`name(type,...)`).
pub fn find_function<'a>(abi: &'a JsonAbi, name: &str) -> Result<&'a Function> {
    if name.contains('(') {
        return abi
            .functions()
            .find(|f| f.signature() == name)
            .ok_or_else(|| anyhow!("Function signature '{}' not found in contract ABI", name));
    }

    match abi.function(name).map(|overloads| overloads.as_slice()) {
        Some([function]) => Ok(function),
        Some(overloads) if !overloads.is_empty() => {
            let signatures: Vec<String> = overloads.iter().map(|f| f.signature()).collect();
            Err(anyhow!(
                "Function '{}' is overloaded; use a full signature: {}",
                name,
                signatures.join(", ")
            ))
        }
        _ => {
            let available: Vec<&str> = abi.functions().map(|f| f.name.as_str()).collect();
            if available.is_empty() {
                Err(anyhow!(
                    "Function '{}' not found. The contract ABI contains no functions.",
                    name
                ))
            } else {
                Err(anyhow!(
                    "Function '{}' not found in contract ABI. Available functions: {}",
                    name,
                    available.join(", ")
                ))
            }
        }
    }
}

/// Looks up an event by bare name or by full signature. A bare name with
/// several overloads is an error.
pub fn find_event<'a>(abi: &'a JsonAbi, name: &str) -> Result<&'a Event> {
    if name.contains('(') {
        return abi
            .events()
            .find(|e| e.signature() == name)
            .ok_or_else(|| anyhow!("Event signature '{}' not found in contract ABI", name));
    }

    match abi.event(name).map(|overloads| overloads.as_slice()) {
        Some([event]) => Ok(event),
        Some(overloads) if !overloads.is_empty() => {
            let signatures: Vec<String> = overloads.iter().map(|e| e.signature()).collect();
            Err(anyhow!(
                "Event '{}' is overloaded; use a full signature: {}",
                name,
                signatures.join(", ")
            ))
        }
        _ => {
            let available: Vec<&str> = abi.events().map(|e| e.name.as_str()).collect();
            Err(anyhow!(
                "Event '{}' not found in contract ABI. Available events: {}",
                name,
                available.join(", ")
            ))
        }
    }
}

/// The ABI event whose topic matches the log's first topic.
pub fn event_for_log<'a>(abi: &'a JsonAbi, log: &Log) -> Option<&'a Event> {
    let topic0 = log.topics().first()?;
    abi.events().find(|e| !e.anonymous && e.selector() == *topic0)
}

fn describe_params(params: &[Param]) -> String {
    params
        .iter()
        .map(|p| format!("{}: {}", p.name, p.ty))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Converts JSON call parameters (positional array or named object) into
/// values for the function's inputs.
pub fn encode_args(function: &Function, parameters: &Value) -> Result<Vec<DynSolValue>> {
    encode_inputs(&format!("function '{}'", function.name), &function.inputs, parameters)
}

/// Constructor arguments for `abi`; a contract without a constructor takes
/// none.
pub fn encode_constructor_args(abi: &JsonAbi, parameters: &Value) -> Result<Vec<DynSolValue>> {
    let inputs = abi
        .constructor
        .as_ref()
        .map(|c| c.inputs.as_slice())
        .unwrap_or_default();
    match parameters {
        Value::Array(params) if params.is_empty() && inputs.is_empty() => Ok(Vec::new()),
        _ => encode_inputs("constructor", inputs, parameters),
    }
}

fn encode_inputs(target: &str, inputs: &[Param], parameters: &Value) -> Result<Vec<DynSolValue>> {
    let pairs: Vec<(&Param, &Value)> = match parameters {
        Value::Null if inputs.is_empty() => Vec::new(),
        Value::Array(params) => {
            if params.len() != inputs.len() {
                return Err(anyhow!(
                    "Parameter count mismatch for {}: expected {} parameters, got {}.\nExpected parameters: [{}]",
                    target,
                    inputs.len(),
                    params.len(),
                    describe_params(inputs)
                ));
            }
            inputs.iter().zip(params.iter()).collect()
        }
        Value::Object(obj) => inputs
            .iter()
            .map(|input| {
                obj.get(&input.name).map(|v| (input, v)).ok_or_else(|| {
                    anyhow!(
                        "Missing required parameter '{}' of type '{}' for {}.\nExpected parameters: {{{}}}",
                        input.name,
                        input.ty,
                        target,
                        describe_params(inputs)
                    )
                })
            })
            .collect::<Result<_>>()?,
        _ => {
            return Err(anyhow!(
                "Invalid parameter format for {}. Parameters must be provided as either:\n1. Array: [value1, value2, ...]\n2. Object: {{{}}}\nProvided: {}",
                target,
                describe_params(inputs),
                parameters
            ));
        }
    };

    pairs
        .into_iter()
        .enumerate()
        .map(|(i, (input, value))| {
            let ty = input
                .resolve()
                .map_err(|e| anyhow!("Cannot resolve type '{}': {}", input.ty, e))?;
            json_to_sol_value(value, &ty).map_err(|e| {
                anyhow!(
                    "Invalid parameter #{} ('{}' of type '{}'): {}",
                    i + 1,
                    input.name,
                    input.ty,
                    e
                )
            })
        })
        .collect()
}

/// Selector followed by the encoded arguments.
pub fn encode_call(function: &Function, parameters: &Value) -> Result<Bytes> {
    let args = encode_args(function, parameters)?;
    let encoded = function
        .abi_encode_input(&args)
        .map_err(|e| anyhow!("Failed to encode function inputs: {}", e))?;
    Ok(encoded.into())
}

/// Decodes calldata produced by [`encode_call`] back into its arguments.
pub fn decode_call(function: &Function, calldata: &[u8]) -> Result<Vec<DynSolValue>> {
    if calldata.len() < 4 || calldata[..4] != function.selector()[..] {
        return Err(anyhow!(
            "Calldata does not start with the selector of '{}'",
            function.signature()
        ));
    }
    function
        .abi_decode_input(&calldata[4..], true)
        .map_err(|e| anyhow!("Failed to decode input: {}", e))
}

pub fn decode_output_values(function: &Function, data: &[u8]) -> Result<Vec<DynSolValue>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    function
        .abi_decode_output(data, false)
        .map_err(|e| anyhow!("Failed to decode output: {}", e))
}

/// Decodes return data into JSON: `null` for nothing, the bare value for a
/// single output, an object when every output is named, an array otherwise.
pub fn decode_output(function: &Function, data: &[u8]) -> Result<Value> {
    if function.outputs.is_empty() || data.is_empty() {
        return Ok(Value::Null);
    }
    let values = decode_output_values(function, data)?;
    params_to_json(&function.outputs, &values)
}

fn params_to_json(params: &[Param], values: &[DynSolValue]) -> Result<Value> {
    if values.len() == 1 {
        return sol_value_to_json(&values[0]);
    }

    let all_named = params.len() == values.len() && params.iter().all(|p| !p.name.is_empty());
    if all_named {
        let mut obj = Map::new();
        for (param, value) in params.iter().zip(values) {
            obj.insert(param.name.clone(), sol_value_to_json(value)?);
        }
        Ok(Value::Object(obj))
    } else {
        values
            .iter()
            .map(sol_value_to_json)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }
}

/// Converts a JSON value into a value of the given Solidity type.
pub fn json_to_sol_value(value: &Value, ty: &DynSolType) -> Result<DynSolValue> {
    match ty {
        DynSolType::Array(inner) => {
            let items = value
                .as_array()
                .ok_or_else(|| anyhow!("Array parameter must be an array"))?;
            let values = items
                .iter()
                .map(|item| json_to_sol_value(item, inner))
                .collect::<Result<Vec<_>>>()?;
            Ok(DynSolValue::Array(values))
        }
        DynSolType::FixedArray(inner, len) => {
            let items = value
                .as_array()
                .ok_or_else(|| anyhow!("Fixed array parameter must be an array"))?;
            if items.len() != *len {
                return Err(anyhow!(
                    "Fixed array expects {} elements, got {}",
                    len,
                    items.len()
                ));
            }
            let values = items
                .iter()
                .map(|item| json_to_sol_value(item, inner))
                .collect::<Result<Vec<_>>>()?;
            Ok(DynSolValue::FixedArray(values))
        }
        DynSolType::Tuple(types) => {
            let items = value
                .as_array()
                .ok_or_else(|| anyhow!("Tuple parameter must be an array of its fields"))?;
            if items.len() != types.len() {
                return Err(anyhow!(
                    "Tuple expects {} fields, got {}",
                    types.len(),
                    items.len()
                ));
            }
            let values = items
                .iter()
                .zip(types)
                .map(|(item, ty)| json_to_sol_value(item, ty))
                .collect::<Result<Vec<_>>>()?;
            Ok(DynSolValue::Tuple(values))
        }
        DynSolType::String => value
            .as_str()
            .map(|s| DynSolValue::String(s.to_string()))
            .ok_or_else(|| anyhow!("String parameter must be a string")),
        DynSolType::Bool => match value {
            Value::Bool(b) => Ok(DynSolValue::Bool(*b)),
            Value::String(s) => ty
                .coerce_str(s)
                .map_err(|_| anyhow!("Invalid bool string: {}", s)),
            _ => Err(anyhow!("Bool parameter must be a boolean")),
        },
        _ => {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                other => return Err(anyhow!("Expected a scalar value for '{}', got {}", ty, other)),
            };
            ty.coerce_str(&text)
                .map_err(|e| anyhow!("Cannot convert '{}' to {}: {}", text, ty, e))
        }
    }
}

/// Renders a decoded value as JSON. Integers become decimal strings so that
/// 256-bit values survive.
pub fn sol_value_to_json(value: &DynSolValue) -> Result<Value> {
    match value {
        DynSolValue::Address(addr) => Ok(Value::String(addr.to_checksum(None))),
        DynSolValue::Uint(num, _) => Ok(Value::String(num.to_string())),
        DynSolValue::Int(num, _) => Ok(Value::String(num.to_string())),
        DynSolValue::Bool(b) => Ok(Value::Bool(*b)),
        DynSolValue::String(s) => Ok(Value::String(s.clone())),
        DynSolValue::Bytes(bytes) => Ok(Value::String(format!("0x{}", hex::encode(bytes)))),
        DynSolValue::FixedBytes(word, size) => Ok(Value::String(format!(
            "0x{}",
            hex::encode(&word[..*size])
        ))),
        DynSolValue::Function(f) => Ok(Value::String(format!("0x{}", hex::encode(f)))),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            items
                .iter()
                .map(sol_value_to_json)
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        #[allow(unreachable_patterns)]
        _ => Err(anyhow!("Unsupported DynSolValue type: {:?}", value)),
    }
}

/// Decodes a raw log against `event`, restoring ABI input order.
pub fn decode_log(event: &Event, log: &Log) -> Result<DecodedLog> {
    let decoded = event
        .decode_log(log.data(), true)
        .map_err(|e| anyhow!("Failed to decode {} log: {}", event.name, e))?;

    let mut indexed = decoded.indexed.into_iter();
    let mut body = decoded.body.into_iter();
    let mut fields = Map::new();

    for (i, input) in event.inputs.iter().enumerate() {
        let value = if input.indexed {
            indexed.next()
        } else {
            body.next()
        }
        .ok_or_else(|| anyhow!("Log is missing field #{} of {}", i, event.name))?;

        let key = if input.name.is_empty() {
            format!("_{}", i)
        } else {
            input.name.clone()
        };
        fields.insert(key, sol_value_to_json(&value)?);
    }

    Ok(DecodedLog {
        event: event.name.clone(),
        fields: Value::Object(fields),
        raw: log.clone(),
    })
}

/// Topic value an indexed input takes for `value`. Dynamic types are indexed
/// by the hash of their packed encoding.
pub fn topic_for(value: &DynSolValue) -> B256 {
    value
        .as_word()
        .unwrap_or_else(|| keccak256(value.abi_encode_packed()))
}

/// Maps per-indexed-input filter values onto topics 1..=3. `None` matches
/// any value.
pub fn indexed_topics(event: &Event, filters: &[Option<Value>]) -> Result<Vec<Option<B256>>> {
    let indexed: Vec<&EventParam> = event.inputs.iter().filter(|p| p.indexed).collect();
    if filters.len() > indexed.len() {
        return Err(anyhow!(
            "Event '{}' has {} indexed fields but {} filters were given",
            event.name,
            indexed.len(),
            filters.len()
        ));
    }

    filters
        .iter()
        .zip(indexed)
        .map(|(filter, param)| match filter {
            None | Some(Value::Null) => Ok(None),
            Some(value) => {
                let ty = param
                    .resolve()
                    .map_err(|e| anyhow!("Cannot resolve type '{}': {}", param.ty, e))?;
                let sol_value = json_to_sol_value(value, &ty)
                    .map_err(|e| anyhow!("Invalid filter for '{}': {}", param.name, e))?;
                Ok(Some(topic_for(&sol_value)))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::ContractKind;
    use alloy::primitives::{Address, LogData, I256, U256};
    use serde_json::json;

    fn pool_abi() -> &'static JsonAbi {
        ContractKind::RestakingPool.abi()
    }

    fn rpc_log(topics: Vec<B256>, data: Vec<u8>) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: Address::repeat_byte(0x01),
                data: LogData::new_unchecked(topics, data.into()),
            },
            block_number: Some(7),
            log_index: Some(3),
            ..Default::default()
        }
    }

    #[test]
    fn finds_functions_by_name_and_signature() {
        let abi = pool_abi();
        assert_eq!(find_function(abi, "stake").unwrap().name, "stake");
        assert_eq!(
            find_function(abi, "unstake(address,uint256)").unwrap().name,
            "unstake"
        );

        let err = find_function(abi, "doesNotExist").unwrap_err().to_string();
        assert!(err.contains("Available functions"));
        assert!(find_function(abi, "unstake(uint256)").is_err());
    }

    #[test]
    fn finds_events() {
        let abi = pool_abi();
        assert_eq!(find_event(abi, "Staked").unwrap().name, "Staked");
        assert!(find_event(abi, "Staked(address,uint256,uint256)").is_ok());
        assert!(find_event(abi, "Nope").is_err());
    }

    #[test]
    fn overloaded_event_needs_signature() {
        let abi = JsonAbi::parse([
            "event Moved(address indexed who)",
            "event Moved(address indexed who, uint256 amount)",
        ])
        .unwrap();

        let err = find_event(&abi, "Moved").unwrap_err().to_string();
        assert!(err.contains("overloaded"));
        assert!(err.contains("Moved(address,uint256)"));
        assert_eq!(
            find_event(&abi, "Moved(address,uint256)").unwrap().inputs.len(),
            2
        );
    }

    #[test]
    fn encode_positional_and_named_params() {
        let function = find_function(pool_abi(), "unstake").unwrap();
        let to = "0x742d35cc6435c9c1c72c5e7b18bab7e1db7a5d6e";

        let positional = encode_call(function, &json!([to, "1000"])).unwrap();
        let named = encode_call(function, &json!({"to": to, "shares": 1000})).unwrap();
        assert_eq!(positional, named);
        assert_eq!(&positional[..4], function.selector().as_slice());
        assert_eq!(positional.len(), 4 + 64);
    }

    #[test]
    fn call_round_trip() {
        let function = find_function(pool_abi(), "batchDeposit").unwrap();
        let params = json!([
            "p2p",
            ["0x01", "0x0203"],
            ["0xaa", "0xbbcc"],
            [format!("0x{}", "11".repeat(32))]
        ]);
        let calldata = encode_call(function, &params).unwrap();
        let decoded = decode_call(function, &calldata).unwrap();

        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded[0], DynSolValue::String("p2p".into()));
        assert_eq!(
            decoded[1],
            DynSolValue::Array(vec![
                DynSolValue::Bytes(vec![0x01]),
                DynSolValue::Bytes(vec![0x02, 0x03]),
            ])
        );
        assert_eq!(
            sol_value_to_json(&decoded[3]).unwrap(),
            json!([format!("0x{}", "11".repeat(32))])
        );
    }

    #[test]
    fn decode_call_rejects_foreign_selector() {
        let stake = find_function(pool_abi(), "stake").unwrap();
        let unstake = find_function(pool_abi(), "unstake").unwrap();
        let calldata = encode_call(stake, &json!([])).unwrap();
        assert!(decode_call(unstake, &calldata).is_err());
        assert!(decode_call(unstake, &[0u8; 2]).is_err());
    }

    #[test]
    fn param_errors_are_descriptive() {
        let function = find_function(pool_abi(), "unstake").unwrap();

        let err = encode_args(function, &json!(["0x00"])).unwrap_err().to_string();
        assert!(err.contains("expected 2 parameters, got 1"));

        let err = encode_args(function, &json!({"to": "0x00"})).unwrap_err().to_string();
        assert!(err.contains("Missing required parameter 'shares'"));

        let err = encode_args(function, &json!("nope")).unwrap_err().to_string();
        assert!(err.contains("Invalid parameter format"));

        let err = encode_args(function, &json!(["not-an-address", "1"]))
            .unwrap_err()
            .to_string();
        assert!(err.contains("Invalid parameter #1"));
    }

    #[test]
    fn constructor_args() {
        let with_ctor: JsonAbi = serde_json::from_str(
            r#"[{"type": "constructor", "inputs": [{"name": "owner", "type": "address"}], "stateMutability": "nonpayable"}]"#,
        )
        .unwrap();
        let owner = "0x00000000000000000000000000000000000000aa";
        let args = encode_constructor_args(&with_ctor, &json!({ "owner": owner })).unwrap();
        assert_eq!(args.len(), 1);
        assert!(encode_constructor_args(&with_ctor, &json!([])).is_err());

        let without_ctor = pool_abi();
        assert!(encode_constructor_args(without_ctor, &json!([])).unwrap().is_empty());
        assert!(encode_constructor_args(without_ctor, &Value::Null).unwrap().is_empty());
        assert!(encode_constructor_args(without_ctor, &json!([1])).is_err());
    }

    #[test]
    fn null_params_for_no_arg_functions() {
        let function = find_function(pool_abi(), "getMinStake").unwrap();
        assert!(encode_args(function, &Value::Null).unwrap().is_empty());
    }

    #[test]
    fn json_conversion_covers_sized_types() {
        let commission = json_to_sol_value(&json!(500), &DynSolType::Uint(16)).unwrap();
        assert_eq!(commission, DynSolValue::Uint(U256::from(500), 16));

        let hex = json_to_sol_value(&json!("0xff"), &DynSolType::Uint(256)).unwrap();
        assert_eq!(hex, DynSolValue::Uint(U256::from(255), 256));

        let neg = json_to_sol_value(&json!("-5"), &DynSolType::Int(256)).unwrap();
        assert_eq!(neg, DynSolValue::Int(I256::try_from(-5i64).unwrap(), 256));

        let sig = json_to_sol_value(&json!("0x3a4b5c6d"), &DynSolType::FixedBytes(4)).unwrap();
        assert_eq!(sol_value_to_json(&sig).unwrap(), json!("0x3a4b5c6d"));

        assert!(json_to_sol_value(&json!(true), &DynSolType::Bool).is_ok());
        assert!(json_to_sol_value(&json!([1, 2]), &DynSolType::FixedArray(
            Box::new(DynSolType::Uint(256)),
            3
        ))
        .is_err());
        assert!(json_to_sol_value(&json!({"a": 1}), &DynSolType::Uint(256)).is_err());
    }

    #[test]
    fn output_shapes() {
        let abi = ContractKind::IStrategyManager.abi();

        let length = find_function(abi, "stakerStrategyListLength").unwrap();
        let data = DynSolValue::Uint(U256::from(3), 256).abi_encode();
        assert_eq!(decode_output(length, &data).unwrap(), json!("3"));

        let deposits = find_function(abi, "getDeposits").unwrap();
        let strategy = Address::repeat_byte(0x22);
        let data = DynSolValue::Tuple(vec![
            DynSolValue::Array(vec![DynSolValue::Address(strategy)]),
            DynSolValue::Array(vec![DynSolValue::Uint(U256::from(10), 256)]),
        ])
        .abi_encode_params();
        assert_eq!(
            decode_output(deposits, &data).unwrap(),
            json!([[strategy.to_checksum(None)], ["10"]])
        );

        let stake = find_function(pool_abi(), "stake").unwrap();
        assert_eq!(decode_output(stake, &[]).unwrap(), Value::Null);
    }

    #[test]
    fn decodes_logs_in_abi_order() {
        let event = find_event(pool_abi(), "Unstake").unwrap();
        let owner = Address::repeat_byte(0xaa);
        let receiver = Address::repeat_byte(0xbb);
        let data = DynSolValue::Tuple(vec![
            DynSolValue::Uint(U256::from(100), 256),
            DynSolValue::Uint(U256::from(99), 256),
        ])
        .abi_encode_params();
        let log = rpc_log(
            vec![event.selector(), owner.into_word(), receiver.into_word()],
            data,
        );

        assert_eq!(event_for_log(pool_abi(), &log).unwrap().name, "Unstake");

        let decoded = decode_log(event, &log).unwrap();
        assert_eq!(decoded.event, "Unstake");
        assert_eq!(
            decoded.fields,
            json!({
                "ownerAddress": owner.to_checksum(None),
                "receiverAddress": receiver.to_checksum(None),
                "amount": "100",
                "shares": "99",
            })
        );
        assert_eq!(decoded.raw.block_number, Some(7));
    }

    #[test]
    fn indexed_string_surfaces_as_topic_hash() {
        let event = find_event(pool_abi(), "RestakerAdded").unwrap();
        let provider_hash = keccak256("p2p");
        let data = DynSolValue::Address(Address::repeat_byte(0x05)).abi_encode();
        let log = rpc_log(vec![event.selector(), provider_hash], data);

        let decoded = decode_log(event, &log).unwrap();
        assert_eq!(decoded.fields["provider"], json!(provider_hash.to_string()));
    }

    #[test]
    fn malformed_log_is_an_error() {
        let event = find_event(pool_abi(), "Unstake").unwrap();
        let log = rpc_log(vec![event.selector()], vec![]);
        assert!(decode_log(event, &log).is_err());
    }

    #[test]
    fn builds_indexed_topics() {
        let event = find_event(pool_abi(), "Unstake").unwrap();
        let owner = Address::repeat_byte(0xaa);

        let topics = indexed_topics(event, &[Some(json!(owner.to_string())), None]).unwrap();
        assert_eq!(topics, vec![Some(owner.into_word()), None]);

        assert!(indexed_topics(event, &[None, None, None]).is_err());

        let added = find_event(pool_abi(), "RestakerAdded").unwrap();
        let topics = indexed_topics(added, &[Some(json!("p2p"))]).unwrap();
        assert_eq!(topics, vec![Some(keccak256("p2p"))]);
    }
}
