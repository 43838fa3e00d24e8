//! Multicall3 batching
//!
//! Every lens read for a chain goes through `aggregate3` with
//! `allowFailure = true`, so a reverting vault only blanks its own slot.

use alloy_primitives::{Address, Bytes};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use eyre::{eyre, Result};
use tracing::debug;

sol! {
    /// Multicall3 - deployed at same address on all EVM chains
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls)
            external payable returns (Result[] memory returnData);
    }
}

/// Outcome of one call inside a batch. `None` when the call reverted.
pub type CallOutput = Option<Bytes>;

/// Build a failure-tolerant call against `target`
pub fn tolerant_call(target: Address, call_data: Vec<u8>) -> IMulticall3::Call3 {
    IMulticall3::Call3 {
        target,
        allowFailure: true,
        callData: call_data.into(),
    }
}

/// Execute `calls` in chunks of `batch_size`, one `eth_call` per chunk.
///
/// The returned vector has exactly one slot per input call, in input order.
/// A transport or decode failure for a whole chunk is an error.
pub async fn aggregate(
    rpc_url: &str,
    multicall: Address,
    calls: Vec<IMulticall3::Call3>,
    batch_size: usize,
) -> Result<Vec<CallOutput>> {
    if calls.is_empty() {
        return Ok(Vec::new());
    }

    let provider = ProviderBuilder::new().connect_http(rpc_url.parse()?);
    let total = calls.len();
    let mut outputs = Vec::with_capacity(total);

    for (i, chunk) in calls.chunks(batch_size.max(1)).enumerate() {
        let calldata = IMulticall3::aggregate3Call { calls: chunk.to_vec() }.abi_encode();

        let tx = TransactionRequest::default()
            .to(multicall)
            .input(calldata.into());

        let result = provider
            .call(tx)
            .await
            .map_err(|e| eyre!("Multicall3 failed: {}", e))?;

        let decoded = IMulticall3::aggregate3Call::abi_decode_returns(&result)
            .map_err(|e| eyre!("Failed to decode multicall result: {}", e))?;

        if decoded.len() != chunk.len() {
            return Err(eyre!(
                "Multicall3 returned {} results for {} calls",
                decoded.len(),
                chunk.len()
            ));
        }

        debug!("Multicall chunk {}: {} calls", i, chunk.len());
        outputs.extend(decoded.into_iter().map(slot_output));
    }

    Ok(outputs)
}

fn slot_output(result: IMulticall3::Result) -> CallOutput {
    if result.success {
        Some(result.returnData)
    } else {
        None
    }
}
