//! Typed views over a deployed protocol: a reader for state, a writer for the
//! user and operator flows, and a subscriber for pool, ratio and token events.
//! All three hang off the address registry kept by `ProtocolConfig`.

pub mod reader;
pub mod subscriber;
pub mod writer;

#[cfg(test)]
mod rpc_stub;

pub use reader::{ProtocolChainReader, ProtocolReader};
pub use subscriber::ProtocolChainSubscriber;
pub use writer::{ProtocolChainWriter, ProtocolWriter};

use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::bindings::ContractKind;

/// Addresses registered in `ProtocolConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProtocolAddresses {
    pub protocol_config: Address,
    pub governance: Address,
    pub operator: Address,
    pub ratio_feed: Address,
    pub restaking_pool: Address,
    pub c_token: Address,
    pub treasury: Address,
    pub restaker_deployer: Address,
}

impl ProtocolAddresses {
    /// Address of an embedded protocol contract, when the registry tracks it.
    pub fn of(&self, kind: ContractKind) -> Option<Address> {
        match kind {
            ContractKind::ProtocolConfig => Some(self.protocol_config),
            ContractKind::RatioFeed => Some(self.ratio_feed),
            ContractKind::RestakingPool => Some(self.restaking_pool),
            ContractKind::CToken => Some(self.c_token),
            ContractKind::RestakerDeployer => Some(self.restaker_deployer),
            _ => None,
        }
    }
}

/// Snapshot of the pool's limits and queues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolState {
    pub min_stake: U256,
    pub min_unstake: U256,
    pub max_tvl: U256,
    pub pending: U256,
    pub total_pending_unstakes: U256,
    pub total_claimable: U256,
    pub unstakes_length: U256,
    pub available_to_stake: U256,
    pub paused: bool,
}

/// Inputs of the bonus and fee curves in `InceptionLibrary`. `rate` is the
/// optimal bonus (or fee) rate and `max_rate` the ceiling reached at the
/// edge of the capacity range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacityCurve {
    pub amount: U256,
    pub capacity: U256,
    pub optimal_capacity: U256,
    pub rate: U256,
    pub max_rate: U256,
    pub target_capacity: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup() {
        let addresses = ProtocolAddresses {
            protocol_config: Address::repeat_byte(0x01),
            governance: Address::repeat_byte(0x02),
            operator: Address::repeat_byte(0x03),
            ratio_feed: Address::repeat_byte(0x04),
            restaking_pool: Address::repeat_byte(0x05),
            c_token: Address::repeat_byte(0x06),
            treasury: Address::repeat_byte(0x07),
            restaker_deployer: Address::repeat_byte(0x08),
        };
        assert_eq!(
            addresses.of(ContractKind::RestakingPool),
            Some(Address::repeat_byte(0x05))
        );
        assert_eq!(addresses.of(ContractKind::CToken), Some(Address::repeat_byte(0x06)));
        assert_eq!(addresses.of(ContractKind::ISlasher), None);
        assert_eq!(addresses.of(ContractKind::FeeCollector), None);
    }
}
