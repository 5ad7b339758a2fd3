use std::time::Duration;

use dvt_registrar_contract::{ContractAddresses, GasPads, PollPolicy};
use serde::{Deserialize, Serialize};

/// The configuration values that dictate the behavior of the registrar service.
///
/// None of these values are consensus-critical; they control where the service connects, which
/// operators it splits keys across, and how patient its confirmation loops are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// The RPC server addr for the registrar service.
    pub rpc_addr: String,

    /// The number of tokio worker threads.
    pub num_threads: Option<u8>,

    /// The configuration required to connect to the ledger RPC node and sign transactions.
    pub ledger: LedgerConfig,

    /// Deployment addresses of the network, views and token contracts.
    pub contracts: ContractAddresses,

    /// The configuration required to connect to the operator registry.
    pub registry: RegistryConfig,

    /// The configuration required to connect to the local key-splitting daemon.
    pub splitter: SplitterConfig,

    /// Funding and allowance parameters.
    pub funding: FundingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct LedgerConfig {
    /// The HTTP URL of the ledger RPC node.
    pub url: String,

    /// The signing account's private key, 0x-prefixed hex.
    ///
    /// NOTE: Prefer injecting this via the config file's permissions rather than baking it into
    /// an image.
    pub signing_key: String,

    /// Polling cadence and ceilings for the submission engine.
    #[serde(default)]
    pub poll: PollPolicy,

    /// Gas padding per call kind on top of the node's estimate.
    #[serde(default)]
    pub gas_pads: GasPads,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RegistryConfig {
    /// The base URL of the operator registry REST API.
    pub url: String,

    /// The network name the registry should be queried for (e.g. `mainnet`).
    pub network: String,

    /// The ids of the operators every validator is split across.
    pub operator_ids: Vec<u32>,

    /// How often to re-fetch operator metadata.
    ///
    /// Default is [`DEFAULT_OPERATOR_REFRESH_INTERVAL`](crate::constants::DEFAULT_OPERATOR_REFRESH_INTERVAL).
    pub refresh_interval: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SplitterConfig {
    /// The base URL of the key-splitting daemon.
    pub url: String,

    /// Password for the encrypted keystores this service is handed.
    pub keystore_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct FundingConfig {
    /// How many blocks of runtime a registration deposit should fund beyond the liquidation
    /// threshold.
    pub operation_period: u64,

    /// The standing token allowance ceiling in whole tokens (e.g. `"1000"`).
    pub allowance_ceiling: String,

    /// How often to re-read fee parameters and check the allowance.
    ///
    /// Default is [`DEFAULT_FEE_REFRESH_INTERVAL`](crate::constants::DEFAULT_FEE_REFRESH_INTERVAL).
    pub fee_refresh_interval: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_toml() {
        let config = r#"
            rpc_addr = "localhost:8462"
            num_threads = 2

            [ledger]
            url = "http://localhost:8545"
            signing_key = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"
            poll = { poll_interval = { secs = 6, nanos = 0 }, mined_attempts = 60, nonce_attempts = 120 }
            gas_pads = { approve = 0, register = 300000, remove = 100000 }

            [contracts]
            network = "0xDD9BC35aE942eF0cFa76930954a156B3fF30a4E1"
            network_views = "0xafE830B6Ee262ba11cce5F32fDCd760FFE6a66e4"
            token = "0x3a9f01091C446bdE031E39ea8354647AFef091E7"

            [registry]
            url = "api.registry.example.io"
            network = "mainnet"
            operator_ids = [10, 20, 30, 40]
            refresh_interval = { secs = 14400, nanos = 0 }

            [splitter]
            url = "http://localhost:3030"
            keystore_password = "hunter2"

            [funding]
            operation_period = 43200
            allowance_ceiling = "1000"
            fee_refresh_interval = { secs = 600, nanos = 0 }
        "#;

        let config = toml::from_str::<Config>(config);
        assert!(
            config.is_ok(),
            "must be able to deserialize config from toml but got: {}",
            config.unwrap_err()
        );

        let config = config.unwrap();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized = toml::from_str::<Config>(&serialized).unwrap();
        assert_eq!(
            deserialized, config,
            "must be able to serialize and deserialize config to toml"
        );
    }

    #[test]
    fn test_config_defaults_apply() {
        let config = r#"
            rpc_addr = "localhost:8462"

            [ledger]
            url = "http://localhost:8545"
            signing_key = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"

            [contracts]
            network = "0xDD9BC35aE942eF0cFa76930954a156B3fF30a4E1"
            network_views = "0xafE830B6Ee262ba11cce5F32fDCd760FFE6a66e4"
            token = "0x3a9f01091C446bdE031E39ea8354647AFef091E7"

            [registry]
            url = "api.registry.example.io"
            network = "mainnet"
            operator_ids = [10, 20, 30, 40]

            [splitter]
            url = "http://localhost:3030"
            keystore_password = "hunter2"

            [funding]
            operation_period = 43200
            allowance_ceiling = "1000"
        "#;

        let config = toml::from_str::<Config>(config).unwrap();
        assert_eq!(config.ledger.poll, PollPolicy::default());
        assert_eq!(config.ledger.gas_pads, GasPads::default());
        assert!(config.registry.refresh_interval.is_none());
    }
}
