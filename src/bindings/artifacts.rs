use alloy::{
    dyn_abi::{DynSolValue, JsonAbiExt},
    json_abi::JsonAbi,
    primitives::Bytes,
};
use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::{fmt, path::Path, str::FromStr, sync::Arc};
use tokio::fs;

macro_rules! embedded_contracts {
    ($($kind:ident => $alias:literal),+ $(,)?) => {
        /// Contracts whose ABI ships with the crate.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ContractKind {
            $($kind),+
        }

        impl ContractKind {
            pub const ALL: &'static [ContractKind] = &[$(ContractKind::$kind),+];

            pub fn name(&self) -> &'static str {
                match self {
                    $(ContractKind::$kind => stringify!($kind)),+
                }
            }

            /// Snake-case alias accepted on the command line.
            pub fn alias(&self) -> &'static str {
                match self {
                    $(ContractKind::$kind => $alias),+
                }
            }

            pub fn abi_json(&self) -> &'static str {
                match self {
                    $(ContractKind::$kind => include_str!(concat!("../../abi/", stringify!($kind), ".json"))),+
                }
            }
        }
    };
}

embedded_contracts! {
    RestakingPool => "restaking_pool",
    FeeCollector => "fee_collector",
    RatioFeed => "ratio_feed",
    ProtocolConfig => "protocol_config",
    CToken => "c_token",
    RestakerFacets => "restaker_facets",
    RestakerDeployer => "restaker_deployer",
    Restaker => "restaker",
    InceptionLibrary => "inception_library",
    IEigenPodManager => "eigen_pod_manager",
    ISlasher => "slasher",
    IStrategyManager => "strategy_manager",
    IDelegationManager => "delegation_manager",
}

static PARSED_ABIS: Lazy<Vec<JsonAbi>> = Lazy::new(|| {
    ContractKind::ALL
        .iter()
        .map(|kind| {
            // Every embedded ABI is parsed in tests.
            serde_json::from_str(kind.abi_json())
                .unwrap_or_else(|e| panic!("embedded ABI for {} is invalid: {}", kind, e))
        })
        .collect()
});

impl ContractKind {
    pub fn abi(&self) -> &'static JsonAbi {
        &PARSED_ABIS[*self as usize]
    }

    /// Embedded artifacts carry interfaces only.
    pub fn bytecode(&self) -> Option<Bytes> {
        None
    }

    /// Third-party interface mirrors (`IEigenPodManager`, `ISlasher`, ...).
    pub fn is_interface(&self) -> bool {
        let name = self.name();
        name.len() > 1
            && name.starts_with('I')
            && name[1..].starts_with(|c: char| c.is_ascii_uppercase())
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContractKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        ContractKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s) || kind.alias() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = ContractKind::ALL.iter().map(|k| k.name()).collect();
                anyhow!(
                    "Unknown contract '{}'. Known contracts: {}",
                    s,
                    known.join(", ")
                )
            })
    }
}

/// ABI plus optional creation bytecode.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub abi: Arc<JsonAbi>,
    pub bytecode: Option<Bytes>,
}

impl Artifact {
    pub fn embedded(kind: ContractKind) -> Self {
        Self {
            name: kind.name().to_string(),
            abi: Arc::new(kind.abi().clone()),
            bytecode: kind.bytecode(),
        }
    }

    /// Parses a bare ABI array, a Foundry artifact (`bytecode.object`) or a
    /// Hardhat artifact (`bytecode` as a string).
    pub fn from_json(name: &str, content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| anyhow!("Failed to parse artifact {}: {}", name, e))?;

        let (abi_value, bytecode_value) = match value {
            Value::Array(_) => (value, None),
            Value::Object(mut obj) => {
                let abi = obj
                    .remove("abi")
                    .ok_or_else(|| anyhow!("Artifact {} has no 'abi' field", name))?;
                let bytecode = match obj.remove("bytecode") {
                    Some(Value::String(s)) => Some(s),
                    Some(Value::Object(mut inner)) => match inner.remove("object") {
                        Some(Value::String(s)) => Some(s),
                        _ => None,
                    },
                    _ => None,
                };
                (abi, bytecode)
            }
            _ => return Err(anyhow!("Artifact {} is neither an ABI array nor an object", name)),
        };

        let abi: JsonAbi = serde_json::from_value(abi_value)
            .map_err(|e| anyhow!("Failed to parse ABI of {}: {}", name, e))?;

        let bytecode = match bytecode_value {
            Some(code) if code.trim_start_matches("0x").is_empty() => None,
            Some(code) => Some(parse_bytecode(&code).map_err(|e| anyhow!("{}: {}", name, e))?),
            None => None,
        };

        Ok(Self {
            name: name.to_string(),
            abi: Arc::new(abi),
            bytecode,
        })
    }

    /// Loads an artifact file, naming it after the file stem.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read artifact {:?}: {}", path, e))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("Artifact path {:?} has no file name", path))?;
        Self::from_json(name, &content)
    }

    pub fn is_deployable(&self) -> bool {
        self.bytecode.is_some()
    }

    /// Creation bytecode followed by the ABI-encoded constructor arguments.
    pub fn deploy_code(&self, constructor_args: &[DynSolValue]) -> Result<Bytes> {
        let bytecode = self
            .bytecode
            .as_ref()
            .ok_or_else(|| anyhow!("Artifact {} has no bytecode and cannot be deployed", self.name))?;

        let mut code = bytecode.to_vec();
        match &self.abi.constructor {
            Some(constructor) => {
                let encoded = constructor
                    .abi_encode_input(constructor_args)
                    .map_err(|e| anyhow!("Failed to encode constructor of {}: {}", self.name, e))?;
                code.extend_from_slice(&encoded);
            }
            None if constructor_args.is_empty() => {}
            None => {
                return Err(anyhow!(
                    "{} has no constructor but {} arguments were given",
                    self.name,
                    constructor_args.len()
                ))
            }
        }
        Ok(code.into())
    }
}

/// Decodes creation bytecode; it must be non-empty, fully linked hex.
pub fn parse_bytecode(code: &str) -> Result<Bytes> {
    let code = code.trim();
    let hex_part = code
        .strip_prefix("0x")
        .or_else(|| code.strip_prefix("0X"))
        .unwrap_or(code);
    if hex_part.is_empty() {
        return Err(anyhow!("Bytecode is empty"));
    }
    if hex_part.contains("__") {
        return Err(anyhow!("Bytecode contains unlinked library placeholders"));
    }
    let bytes = hex::decode(hex_part).map_err(|e| anyhow!("Invalid bytecode hex: {}", e))?;
    Ok(bytes.into())
}
