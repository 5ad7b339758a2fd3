//! High-level client over the network, views and token contracts.

use std::{sync::Arc, time::Duration};

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Bytes, U256},
    rpc::types::{TransactionInput, TransactionRequest},
    sol_types::SolCall,
};
use async_trait::async_trait;
use dvt_registrar_primitives::FeeParameters;
use serde::{Deserialize, Serialize};
use tokio::{sync::RwLock, task::JoinHandle, time::interval};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    allowance::AllowanceMaintainer,
    bindings::{Cluster, DvtNetwork, DvtNetworkViews, DvtToken},
    errors::ContractError,
    ledger::Ledger,
    submitter::{CallKind, SubmitOutcome, TxPlan, TxSubmitter},
    traits::{RegisterCall, RemoveCall, ValidatorContract, ValidatorStatus},
};

/// Deployment addresses of the three contracts this service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    /// The state-mutating network contract.
    pub network: Address,

    /// The read-only views contract.
    pub network_views: Address,

    /// The network's ERC-20 token.
    pub token: Address,
}

/// Client for the shared-validator network contracts.
///
/// Read paths go straight to the node; write paths go through the owned [`TxSubmitter`], which
/// serializes them per signing account.
#[derive(Debug)]
pub struct NetworkClient {
    ledger: Arc<dyn Ledger>,
    addresses: ContractAddresses,
    submitter: TxSubmitter,
    fee_params: RwLock<FeeParameters>,
}

impl NetworkClient {
    /// Creates a new client. Fee parameters start zeroed; call
    /// [`refresh_fee_parameters`](Self::refresh_fee_parameters) before serving requests.
    pub fn new(ledger: Arc<dyn Ledger>, addresses: ContractAddresses, submitter: TxSubmitter) -> Self {
        Self {
            ledger,
            addresses,
            submitter,
            fee_params: RwLock::new(FeeParameters::default()),
        }
    }

    /// The signing account every mutating call is issued from.
    pub const fn sender(&self) -> Address {
        self.submitter.sender()
    }

    async fn view(&self, to: Address, calldata: Vec<u8>) -> Result<Bytes, ContractError> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .input(TransactionInput::new(calldata.into()));

        Ok(self.ledger.call(&tx).await?)
    }

    /// Re-reads the network fee and liquidation threshold period from the views contract and
    /// caches them.
    pub async fn refresh_fee_parameters(&self) -> Result<FeeParameters, ContractError> {
        let fee_raw = self
            .view(
                self.addresses.network_views,
                DvtNetworkViews::getNetworkFeeCall {}.abi_encode(),
            )
            .await?;
        let network_fee = DvtNetworkViews::getNetworkFeeCall::abi_decode_returns(&fee_raw, true)?.fee;

        let ltp_raw = self
            .view(
                self.addresses.network_views,
                DvtNetworkViews::getLiquidationThresholdPeriodCall {}.abi_encode(),
            )
            .await?;
        let liquidation_threshold_period =
            DvtNetworkViews::getLiquidationThresholdPeriodCall::abi_decode_returns(&ltp_raw, true)?
                .blocks;

        let params = FeeParameters {
            network_fee,
            liquidation_threshold_period,
        };

        info!(
            network_fee = %params.network_fee,
            ltp = %params.liquidation_threshold_period,
            "fee parameters refreshed"
        );

        *self.fee_params.write().await = params.clone();
        Ok(params)
    }

    /// The current token allowance granted by the signing account to the network contract.
    pub async fn allowance(&self) -> Result<U256, ContractError> {
        let raw = self
            .view(
                self.addresses.token,
                DvtToken::allowanceCall {
                    owner: self.sender(),
                    spender: self.addresses.network,
                }
                .abi_encode(),
            )
            .await?;

        Ok(DvtToken::allowanceCall::abi_decode_returns(&raw, true)?.remaining)
    }

    /// Approves the network contract to spend `amount` of the token on the signing account's
    /// behalf.
    pub async fn approve(
        &self,
        amount: U256,
        request_id: u64,
    ) -> Result<SubmitOutcome, ContractError> {
        info!(request_id, spender = %self.addresses.network, %amount, "sending token approval");

        let calldata = DvtToken::approveCall {
            spender: self.addresses.network,
            amount,
        }
        .abi_encode();

        self.submitter
            .submit(
                TxPlan {
                    kind: CallKind::Approve,
                    to: self.addresses.token,
                    calldata: calldata.into(),
                },
                request_id,
            )
            .await
    }
}

/// Sorts operator ids ascending and widens them to the ABI's id type.
fn abi_operator_ids(ids: &[u32]) -> Vec<u64> {
    let mut ids: Vec<u64> = ids.iter().map(|id| u64::from(*id)).collect();
    ids.sort_unstable();
    ids
}

#[async_trait]
impl ValidatorContract for NetworkClient {
    async fn fee_parameters(&self) -> FeeParameters {
        self.fee_params.read().await.clone()
    }

    async fn validator_status(&self, public_key: &Bytes) -> Result<ValidatorStatus, ContractError> {
        let raw = self
            .view(
                self.addresses.network_views,
                DvtNetworkViews::getValidatorCall {
                    publicKey: public_key.clone(),
                }
                .abi_encode(),
            )
            .await?;

        let ret = DvtNetworkViews::getValidatorCall::abi_decode_returns(&raw, true)?;
        Ok(ValidatorStatus {
            owner: ret.owner,
            active: ret.active,
        })
    }

    async fn wait_idle(&self, request_id: u64) -> Result<(), ContractError> {
        self.submitter.wait_idle(request_id).await
    }

    async fn register_validator(
        &self,
        call: RegisterCall,
        request_id: u64,
    ) -> Result<SubmitOutcome, ContractError> {
        info!(
            request_id,
            public_key = %call.public_key,
            operator_ids = ?call.operator_ids,
            amount = %call.amount,
            "sending registerValidator transaction"
        );

        let calldata = DvtNetwork::registerValidatorCall {
            publicKey: call.public_key,
            operatorIds: abi_operator_ids(&call.operator_ids),
            sharesData: call.share_data,
            amount: call.amount,
            cluster: Cluster::from(&call.cluster),
        }
        .abi_encode();

        self.submitter
            .submit(
                TxPlan {
                    kind: CallKind::Register,
                    to: self.addresses.network,
                    calldata: calldata.into(),
                },
                request_id,
            )
            .await
    }

    async fn remove_validator(
        &self,
        call: RemoveCall,
        request_id: u64,
    ) -> Result<SubmitOutcome, ContractError> {
        info!(
            request_id,
            public_key = %call.public_key,
            operator_ids = ?call.operator_ids,
            "sending removeValidator transaction"
        );

        let calldata = DvtNetwork::removeValidatorCall {
            publicKey: call.public_key,
            operatorIds: abi_operator_ids(&call.operator_ids),
            cluster: Cluster::from(&call.cluster),
        }
        .abi_encode();

        self.submitter
            .submit(
                TxPlan {
                    kind: CallKind::Remove,
                    to: self.addresses.network,
                    calldata: calldata.into(),
                },
                request_id,
            )
            .await
    }
}

/// Spawns the periodic fee-parameter refresh, which doubles as the allowance check cycle.
///
/// The initial refresh is expected to have completed during bootstrap; the task only runs the
/// periodic follow-ups. Upstream failures are logged and the previous snapshot keeps serving.
pub fn spawn_fee_refresh(
    client: Arc<NetworkClient>,
    maintainer: Arc<AllowanceMaintainer<NetworkClient>>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        // The first tick fires immediately; bootstrap already did that refresh.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("fee refresh task stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(err) = client.refresh_fee_parameters().await {
                        warn!(%err, "fee refresh failed, keeping previous snapshot");
                    }
                    if let Err(err) = maintainer.ensure_allowance().await {
                        warn!(%err, "allowance check failed");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abi_operator_ids_sorted_ascending() {
        assert_eq!(abi_operator_ids(&[3, 1, 2]), vec![1u64, 2, 3]);
        assert_eq!(abi_operator_ids(&[]), Vec::<u64>::new());
    }
}
