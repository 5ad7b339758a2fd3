//! Wires the service together and runs it until shutdown.

use std::sync::Arc;

use alloy::{
    network::EthereumWallet,
    primitives::{utils::parse_ether, U256},
    providers::{Provider, RootProvider},
    signers::local::PrivateKeySigner,
};
use anyhow::Context;
use dvt_registrar_contract::{
    spawn_fee_refresh, spawn_outcome_logger, AllowanceMaintainer, AlloyLedger, NetworkClient,
    TxSubmitter,
};
use dvt_registrar_orchestrator::{Registrar, RegistrarConfig, RemoteKeySplitter};
use dvt_registrar_registry::{spawn_operator_refresh, OperatorDirectory, RestClient};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    config::Config,
    constants::{DEFAULT_FEE_REFRESH_INTERVAL, DEFAULT_OPERATOR_REFRESH_INTERVAL},
    rpc_server::{self, RegistrarRpc},
};

/// Brings every subsystem up, runs the initial refreshes, and serves RPC until interrupted.
///
/// All initial refreshes (operators, fee parameters, allowance) complete before the RPC server
/// starts, so the first request never observes a zeroed snapshot.
pub(crate) async fn bootstrap(config: Config) -> anyhow::Result<()> {
    let signer = config
        .ledger
        .signing_key
        .parse::<PrivateKeySigner>()
        .context("parse signing key")?;
    let sender = signer.address();
    let wallet = EthereumWallet::from(signer);

    let url = config.ledger.url.parse().context("parse ledger rpc url")?;
    let provider = RootProvider::new_http(url);
    let chain_id = provider
        .get_chain_id()
        .await
        .context("query ledger chain id")?;
    info!(%sender, chain_id, "connected to ledger rpc");

    let ledger = Arc::new(AlloyLedger::new(provider));
    let submitter = TxSubmitter::new(
        ledger.clone(),
        wallet,
        sender,
        chain_id,
        config.ledger.poll,
        config.ledger.gas_pads,
    );
    let client = Arc::new(NetworkClient::new(ledger, config.contracts, submitter));

    let registry_client = RestClient::new(&config.registry.url, &config.registry.network);
    registry_client
        .health()
        .await
        .context("registry health check")?;

    let directory = Arc::new(OperatorDirectory::new(
        registry_client,
        config.registry.operator_ids.clone(),
    ));
    directory
        .refresh()
        .await
        .context("initial operator refresh")?;

    client
        .refresh_fee_parameters()
        .await
        .context("initial fee parameter refresh")?;

    let ceiling =
        parse_ether(&config.funding.allowance_ceiling).context("parse allowance ceiling")?;
    let (maintainer, outcomes) = AllowanceMaintainer::new(client.clone(), ceiling);
    let maintainer = Arc::new(maintainer);
    spawn_outcome_logger(outcomes);
    maintainer
        .ensure_allowance()
        .await
        .context("initial allowance check")?;

    let cancel = CancellationToken::new();
    spawn_fee_refresh(
        client.clone(),
        maintainer,
        config
            .funding
            .fee_refresh_interval
            .unwrap_or(DEFAULT_FEE_REFRESH_INTERVAL),
        cancel.child_token(),
    );
    spawn_operator_refresh(
        directory.clone(),
        config
            .registry
            .refresh_interval
            .unwrap_or(DEFAULT_OPERATOR_REFRESH_INTERVAL),
        cancel.child_token(),
    );

    let splitter = Arc::new(RemoteKeySplitter::new(&config.splitter.url));
    let registrar = Registrar::new(
        client,
        directory,
        splitter,
        RegistrarConfig {
            owner: sender,
            operation_period: U256::from(config.funding.operation_period),
            keystore_password: config.splitter.keystore_password.clone(),
        },
    );

    let rpc_impl = RegistrarRpc::new(Arc::new(registrar));
    rpc_server::start_rpc(&rpc_impl, &config.rpc_addr).await?;

    cancel.cancel();

    Ok(())
}
