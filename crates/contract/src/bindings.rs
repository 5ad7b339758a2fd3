//! ABI bindings for the shared-validator network contracts.

use alloy::sol;
use dvt_registrar_primitives::ClusterState;

sol! {
    /// Cluster bookkeeping tuple as the network contract expects it.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct Cluster {
        uint32 validatorCount;
        uint64 networkFeeIndex;
        uint64 index;
        uint256 balance;
        bool active;
    }

    /// State-mutating entry points of the network contract.
    contract DvtNetwork {
        function registerValidator(
            bytes publicKey,
            uint64[] operatorIds,
            bytes sharesData,
            uint256 amount,
            Cluster cluster
        ) external;

        function removeValidator(
            bytes publicKey,
            uint64[] operatorIds,
            Cluster cluster
        ) external;
    }

    /// Read-only views published alongside the network contract.
    contract DvtNetworkViews {
        function getValidator(bytes publicKey) external view returns (address owner, bool active);

        function getNetworkFee() external view returns (uint256 fee);

        function getLiquidationThresholdPeriod() external view returns (uint256 blocks);
    }

    /// The ERC-20 surface of the network token this service needs.
    contract DvtToken {
        function approve(address spender, uint256 amount) external returns (bool success);

        function allowance(address owner, address spender) external view returns (uint256 remaining);
    }
}

impl From<&ClusterState> for Cluster {
    fn from(state: &ClusterState) -> Self {
        Cluster {
            validatorCount: state.validator_count,
            networkFeeIndex: state.network_fee_index,
            index: state.index,
            balance: state.balance,
            active: state.active,
        }
    }
}
