//! Vault discovery from EVK factory deployment logs
//!
//! Every vault proxy the factory deploys emits exactly one `ProxyCreated`.
//! Scanning `[start_block, head]` for that topic yields the full vault set.

use alloy_primitives::{Address, LogData};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::{Filter, Log};
use alloy_sol_types::{sol, SolEvent};
use eyre::{eyre, Result};
use tracing::{debug, warn};

use crate::error::DecodeError;

sol! {
    /// EVK GenericFactory deployment event
    event ProxyCreated(address indexed proxy, bool upgradeable, address implementation, bytes trailingData);
}

/// Decode the vault address out of one factory log
pub fn decode_proxy_created(data: &LogData) -> Result<Address, DecodeError> {
    let topic0 = data.topics().first().ok_or(DecodeError::MissingTopic)?;

    if *topic0 != ProxyCreated::SIGNATURE_HASH {
        return Err(DecodeError::UnexpectedTopic {
            topic: hex::encode(topic0),
        });
    }

    ProxyCreated::decode_log_data(data)
        .map(|event| event.proxy)
        .map_err(|e| DecodeError::Malformed {
            reason: e.to_string(),
        })
}

/// Decode vault addresses from raw logs, in emission order.
///
/// Logs reporting a block outside `[from_block, to_block]` are dropped.
/// Any log that fails to decode aborts the whole batch.
pub fn vaults_from_logs(logs: &[Log], from_block: u64, to_block: u64) -> Result<Vec<Address>, DecodeError> {
    let mut vaults = Vec::with_capacity(logs.len());

    for log in logs {
        if let Some(block) = log.block_number {
            if block < from_block || block > to_block {
                warn!(
                    "Dropping ProxyCreated log at block {} outside [{}, {}]",
                    block, from_block, to_block
                );
                continue;
            }
        }
        vaults.push(decode_proxy_created(&log.inner.data)?);
    }

    Ok(vaults)
}

/// Split the inclusive range `[from, to]` into windows of at most `max_range` blocks
pub fn block_windows(from: u64, to: u64, max_range: u64) -> Vec<(u64, u64)> {
    let step = max_range.max(1);
    let mut windows = Vec::new();
    let mut start = from;

    while start <= to {
        let end = start.saturating_add(step - 1).min(to);
        windows.push((start, end));
        if end == u64::MAX {
            break;
        }
        start = end + 1;
    }

    windows
}

/// Raw log retrieval against a JSON-RPC endpoint
pub struct FactoryScanner {
    rpc_url: String,
    max_log_range: u64,
}

impl FactoryScanner {
    pub fn new(rpc_url: String, max_log_range: u64) -> Self {
        Self { rpc_url, max_log_range }
    }

    /// Current chain head
    pub async fn head(&self) -> Result<u64> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.parse()?);
        provider
            .get_block_number()
            .await
            .map_err(|e| eyre!("eth_blockNumber failed: {}", e))
    }

    /// All `ProxyCreated` logs emitted by `factory` in `[from_block, to_block]`,
    /// ascending. Windows are fetched one after another; the first failing
    /// window aborts the scan.
    pub async fn proxy_created_logs(&self, factory: Address, from_block: u64, to_block: u64) -> Result<Vec<Log>> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.parse()?);
        let mut logs = Vec::new();

        for (start, end) in block_windows(from_block, to_block, self.max_log_range) {
            let filter = Filter::new()
                .address(factory)
                .event_signature(ProxyCreated::SIGNATURE_HASH)
                .from_block(start)
                .to_block(end);

            let window = provider
                .get_logs(&filter)
                .await
                .map_err(|e| eyre!("eth_getLogs [{}, {}] failed: {}", start, end, e))?;

            debug!("Factory {:?}: {} logs in [{}, {}]", factory, window.len(), start, end);
            logs.extend(window);
        }

        Ok(logs)
    }

    /// Every vault deployed by `factory` from `start_block` up to the current head
    pub async fn discover_vaults(&self, factory: Address, start_block: u64) -> Result<Vec<Address>> {
        let head = self.head().await?;
        if head < start_block {
            return Err(eyre!("Chain head {} is behind start block {}", head, start_block));
        }

        let logs = self.proxy_created_logs(factory, start_block, head).await?;
        let vaults = vaults_from_logs(&logs, start_block, head)?;

        debug!("Discovered {} vaults in [{}, {}]", vaults.len(), start_block, head);
        Ok(vaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Bytes, B256};

    fn proxy_log(proxy: Address, block: Option<u64>) -> Log {
        let event = ProxyCreated {
            proxy,
            upgradeable: false,
            implementation: Address::repeat_byte(0xee),
            trailingData: Bytes::from(vec![0u8; 60]),
        };
        Log {
            inner: alloy_primitives::Log {
                address: Address::repeat_byte(0xfa),
                data: event.encode_log_data(),
            },
            block_number: block,
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_proxy_created() {
        let vault = Address::repeat_byte(0x42);
        let log = proxy_log(vault, Some(10));
        assert_eq!(decode_proxy_created(&log.inner.data), Ok(vault));
    }

    #[test]
    fn test_decode_rejects_foreign_topic() {
        let data = LogData::new_unchecked(vec![B256::repeat_byte(0x01)], Bytes::new());
        assert!(matches!(
            decode_proxy_created(&data),
            Err(DecodeError::UnexpectedTopic { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_missing_topics() {
        let data = LogData::new_unchecked(vec![], Bytes::new());
        assert_eq!(decode_proxy_created(&data), Err(DecodeError::MissingTopic));
    }

    #[test]
    fn test_decode_rejects_truncated_payload() {
        let proxy_topic = B256::left_padding_from(Address::repeat_byte(0x42).as_slice());
        let data = LogData::new_unchecked(
            vec![ProxyCreated::SIGNATURE_HASH, proxy_topic],
            Bytes::from(vec![0u8; 7]),
        );
        assert!(matches!(
            decode_proxy_created(&data),
            Err(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_vaults_keep_emission_order_and_duplicates() {
        let a = Address::repeat_byte(0x0a);
        let b = Address::repeat_byte(0x0b);
        let logs = vec![proxy_log(a, Some(100)), proxy_log(b, Some(101)), proxy_log(a, Some(150))];

        let vaults = vaults_from_logs(&logs, 100, 200).unwrap();
        assert_eq!(vaults, vec![a, b, a]);
    }

    #[test]
    fn test_vaults_outside_range_dropped() {
        let inside = Address::repeat_byte(0x01);
        let before = Address::repeat_byte(0x02);
        let after = Address::repeat_byte(0x03);
        let logs = vec![
            proxy_log(before, Some(99)),
            proxy_log(inside, Some(100)),
            proxy_log(after, Some(201)),
        ];

        assert_eq!(vaults_from_logs(&logs, 100, 200).unwrap(), vec![inside]);
    }

    #[test]
    fn test_one_bad_log_fails_batch() {
        let mut bad = proxy_log(Address::repeat_byte(0x01), Some(100));
        bad.inner.data = LogData::new_unchecked(vec![B256::ZERO], Bytes::new());
        let logs = vec![proxy_log(Address::repeat_byte(0x02), Some(100)), bad];

        assert!(vaults_from_logs(&logs, 0, 1_000).is_err());
    }

    #[test]
    fn test_block_windows() {
        assert_eq!(block_windows(10, 10, 5), vec![(10, 10)]);
        assert_eq!(block_windows(0, 9, 5), vec![(0, 4), (5, 9)]);
        assert_eq!(block_windows(0, 10, 5), vec![(0, 4), (5, 9), (10, 10)]);
        assert!(block_windows(11, 10, 5).is_empty());
        assert_eq!(block_windows(1, 3, 0), vec![(1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn test_block_windows_cover_range_exactly() {
        let windows = block_windows(20_529_225, 20_900_000, 100_000);
        assert_eq!(windows.first().unwrap().0, 20_529_225);
        assert_eq!(windows.last().unwrap().1, 20_900_000);
        for pair in windows.windows(2) {
            assert_eq!(pair[0].1 + 1, pair[1].0);
        }
    }
}
