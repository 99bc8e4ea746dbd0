//! Typed bindings expanded from the ABIs under `abi/`.
//!
//! Every module exposes `new(address, provider)`, one call builder per
//! function (`.call()` reads, `.send()` transacts) and one `<Event>_filter()`
//! per event (`.query()` for history, `.watch()` for a polling subscription).

use alloy::sol;

sol!(
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    RestakingPool,
    "abi/RestakingPool.json"
);

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    FeeCollector,
    "abi/FeeCollector.json"
);

sol!(
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    RatioFeed,
    "abi/RatioFeed.json"
);

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    ProtocolConfig,
    "abi/ProtocolConfig.json"
);

sol!(
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    CToken,
    "abi/CToken.json"
);

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    RestakerFacets,
    "abi/RestakerFacets.json"
);

sol!(
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    RestakerDeployer,
    "abi/RestakerDeployer.json"
);

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    Restaker,
    "abi/Restaker.json"
);

sol!(
    #[allow(missing_docs, clippy::too_many_arguments)]
    #[sol(rpc)]
    InceptionLibrary,
    "abi/InceptionLibrary.json"
);

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    IEigenPodManager,
    "abi/IEigenPodManager.json"
);

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    ISlasher,
    "abi/ISlasher.json"
);

sol!(
    #[allow(missing_docs, clippy::too_many_arguments)]
    #[sol(rpc)]
    IStrategyManager,
    "abi/IStrategyManager.json"
);

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    IDelegationManager,
    "abi/IDelegationManager.json"
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::artifacts::ContractKind;
    use alloy::sol_types::{SolCall, SolEvent};

    fn selector_of(kind: ContractKind, name: &str) -> [u8; 4] {
        kind.abi()
            .function(name)
            .and_then(|overloads| overloads.first())
            .map(|f| f.selector().0)
            .unwrap_or_else(|| panic!("{} has no function {}", kind, name))
    }

    fn topic_of(kind: ContractKind, name: &str) -> alloy::primitives::B256 {
        kind.abi()
            .event(name)
            .and_then(|overloads| overloads.first())
            .map(|e| e.selector())
            .unwrap_or_else(|| panic!("{} has no event {}", kind, name))
    }

    #[test]
    fn typed_call_selectors_match_embedded_abi() {
        assert_eq!(
            RestakingPool::stakeCall::SELECTOR,
            selector_of(ContractKind::RestakingPool, "stake")
        );
        assert_eq!(
            RestakingPool::unstakeCall::SELECTOR,
            selector_of(ContractKind::RestakingPool, "unstake")
        );
        assert_eq!(
            RatioFeed::getRatioCall::SELECTOR,
            selector_of(ContractKind::RatioFeed, "getRatio")
        );
        assert_eq!(
            CToken::transferCall::SELECTOR,
            selector_of(ContractKind::CToken, "transfer")
        );
        assert_eq!(
            IStrategyManager::depositIntoStrategyCall::SELECTOR,
            selector_of(ContractKind::IStrategyManager, "depositIntoStrategy")
        );
        assert_eq!(
            InceptionLibrary::calculateDepositBonusCall::SELECTOR,
            selector_of(ContractKind::InceptionLibrary, "calculateDepositBonus")
        );
        assert_eq!(
            Restaker::__Restaker_initCall::SELECTOR,
            selector_of(ContractKind::Restaker, "__Restaker_init")
        );
    }

    #[test]
    fn well_known_selectors() {
        // ERC-20 selectors are fixed by the standard
        assert_eq!(CToken::transferCall::SELECTOR, [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(CToken::balanceOfCall::SELECTOR, [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(CToken::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(
            CToken::Transfer::SIGNATURE_HASH,
            alloy::primitives::b256!(
                "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
            )
        );
    }

    #[test]
    fn typed_event_topics_match_embedded_abi() {
        assert_eq!(
            RestakingPool::Staked::SIGNATURE_HASH,
            topic_of(ContractKind::RestakingPool, "Staked")
        );
        assert_eq!(
            RatioFeed::RatioUpdated::SIGNATURE_HASH,
            topic_of(ContractKind::RatioFeed, "RatioUpdated")
        );
        assert_eq!(
            RestakerDeployer::RestakerDeployed::SIGNATURE_HASH,
            topic_of(ContractKind::RestakerDeployer, "RestakerDeployed")
        );
        assert_eq!(
            ISlasher::OperatorFrozen::SIGNATURE_HASH,
            topic_of(ContractKind::ISlasher, "OperatorFrozen")
        );
        assert_eq!(
            IEigenPodManager::PodDeployed::SIGNATURE_HASH,
            topic_of(ContractKind::IEigenPodManager, "PodDeployed")
        );
    }

    #[test]
    fn typed_signatures() {
        assert_eq!(RestakingPool::Staked::SIGNATURE, "Staked(address,uint256,uint256)");
        assert_eq!(
            IEigenPodManager::stakeCall::SIGNATURE,
            "stake(bytes,bytes,bytes32)"
        );
        assert_eq!(
            RestakingPool::batchDepositCall::SIGNATURE,
            "batchDeposit(string,bytes[],bytes[],bytes32[])"
        );
    }

    #[test]
    fn typed_call_round_trip() {
        let call = RestakingPool::unstakeCall {
            to: alloy::primitives::Address::repeat_byte(0x11),
            shares: alloy::primitives::U256::from(42u64),
        };
        let encoded = call.abi_encode();
        assert_eq!(&encoded[..4], &RestakingPool::unstakeCall::SELECTOR);

        let decoded = RestakingPool::unstakeCall::abi_decode(&encoded, true).unwrap();
        assert_eq!(decoded.to, call.to);
        assert_eq!(decoded.shares, call.shares);
    }
}
