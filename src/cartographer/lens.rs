//! VaultLens reads
//!
//! `getVaultInfoFull(vault)` returns the whole vault snapshot in one call.
//! We batch one lens call per vault through Multicall3 and keep only the
//! handful of fields the yield pipeline uses.
//!
//! The returned struct has 46 members, past what `sol!` can derive a codec
//! for, so the return data is decoded against a `DynSolType` that mirrors
//! the full on-chain layout and the needed members are read by position.

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};
use eyre::{eyre, Result};
use lazy_static::lazy_static;
use tracing::{debug, trace};

use super::multicall::{self, CallOutput};
use crate::chains::ChainConfig;

// ============================================
// LENS INTERFACE
// ============================================

sol! {
    interface IVaultLens {
        /// Returns `VaultInfoFull`; decoded with `VAULT_INFO_FULL_RETURNS`
        function getVaultInfoFull(address vault) external view;
    }
}

// VaultInfoFull member positions
const VAULT: usize = 1;
const VAULT_NAME: usize = 2;
const ASSET: usize = 5;
const ASSET_SYMBOL: usize = 7;
const ASSET_DECIMALS: usize = 8;
const TOTAL_BORROWED: usize = 15;
const TOTAL_ASSETS: usize = 16;
const IRM_INFO: usize = 39;

// VaultInterestRateModelInfo member positions
const IRM_QUERY_FAILURE: usize = 0;
const IRM_RATE_INFO: usize = 4;

// InterestRateInfo member positions
const RATE_BORROW_APY: usize = 3;
const RATE_SUPPLY_APY: usize = 4;

fn uint256() -> DynSolType {
    DynSolType::Uint(256)
}

/// (cash, borrows, borrowSPY, borrowAPY, supplyAPY)
fn interest_rate_info_type() -> DynSolType {
    DynSolType::Tuple(vec![uint256(); 5])
}

/// (queryFailure, queryFailureReason, vault, interestRateModel,
///  interestRateInfo[], (interestRateModel, interestRateModelType, params))
fn irm_info_type() -> DynSolType {
    DynSolType::Tuple(vec![
        DynSolType::Bool,
        DynSolType::Bytes,
        DynSolType::Address,
        DynSolType::Address,
        DynSolType::Array(Box::new(interest_rate_info_type())),
        DynSolType::Tuple(vec![DynSolType::Address, DynSolType::Uint(8), DynSolType::Bytes]),
    ])
}

/// (collateral, borrowLTV, liquidationLTV, initialLiquidationLTV,
///  targetTimestamp, rampDuration)
fn ltv_info_type() -> DynSolType {
    let mut members = vec![DynSolType::Address];
    members.extend(vec![uint256(); 5]);
    DynSolType::Tuple(members)
}

/// (queryFailure, queryFailureReason, timestamp, oracle, asset,
///  unitOfAccount, amountIn, amountOutMid, amountOutBid, amountOutAsk)
fn asset_price_info_type() -> DynSolType {
    let mut members = vec![
        DynSolType::Bool,
        DynSolType::Bytes,
        uint256(),
        DynSolType::Address,
        DynSolType::Address,
        DynSolType::Address,
    ];
    members.extend(vec![uint256(); 4]);
    DynSolType::Tuple(members)
}

/// (oracle, name, oracleInfo)
fn oracle_info_type() -> DynSolType {
    DynSolType::Tuple(vec![DynSolType::Address, DynSolType::String, DynSolType::Bytes])
}

fn vault_info_full_type() -> DynSolType {
    let address = || DynSolType::Address;
    let string = || DynSolType::String;

    let mut members = vec![
        uint256(),  // timestamp
        address(),  // vault
        string(),   // vaultName
        string(),   // vaultSymbol
        uint256(),  // vaultDecimals
        address(),  // asset
        string(),   // assetName
        string(),   // assetSymbol
        uint256(),  // assetDecimals
        address(),  // unitOfAccount
        string(),   // unitOfAccountName
        string(),   // unitOfAccountSymbol
        uint256(),  // unitOfAccountDecimals
        uint256(),  // totalShares
        uint256(),  // totalCash
        uint256(),  // totalBorrowed
        uint256(),  // totalAssets
        uint256(),  // accumulatedFeesShares
        uint256(),  // accumulatedFeesAssets
        address(),  // governorFeeReceiver
        address(),  // protocolFeeReceiver
        uint256(),  // protocolFeeShare
        uint256(),  // interestFee
        uint256(),  // hookedOperations
        uint256(),  // configFlags
        uint256(),  // supplyCap
        uint256(),  // borrowCap
        uint256(),  // maxLiquidationDiscount
        uint256(),  // liquidationCoolOffTime
    ];
    // dToken, oracle, interestRateModel, hookTarget, evc, protocolConfig,
    // balanceTracker, permit2, creator, governorAdmin
    members.extend(vec![address(); 10]);
    members.extend(vec![
        irm_info_type(),                                    // irmInfo
        DynSolType::Array(Box::new(ltv_info_type())),       // collateralLTVInfo
        asset_price_info_type(),                            // liabilityPriceInfo
        DynSolType::Array(Box::new(asset_price_info_type())), // collateralPriceInfo
        oracle_info_type(),                                 // oracleInfo
        asset_price_info_type(),                            // backupAssetPriceInfo
        oracle_info_type(),                                 // backupAssetOracleInfo
    ]);

    DynSolType::Tuple(members)
}

lazy_static! {
    /// Return parameters of `getVaultInfoFull`: a single `VaultInfoFull`
    static ref VAULT_INFO_FULL_RETURNS: DynSolType = DynSolType::Tuple(vec![vault_info_full_type()]);
}

// ============================================
// TYPES
// ============================================

/// Current rates as reported by the vault's IRM, fixed-point percentages
/// with 25 decimals (1e25 = 1%)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterestRates {
    pub supply_apy: U256,
    pub borrow_apy: U256,
}

/// Raw on-chain snapshot of one vault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultInfo {
    pub vault: Address,
    pub asset: Address,
    pub asset_decimals: u8,
    pub asset_symbol: String,
    pub vault_name: String,
    pub total_assets: U256,
    pub total_borrowed: U256,
    /// `None` when the IRM query failed or the vault has no IRM
    pub interest_rates: Option<InterestRates>,
}

impl VaultInfo {
    /// True when the vault reports a strictly positive supply rate
    pub fn is_supplying(&self) -> bool {
        self.interest_rates
            .map(|r| r.supply_apy > U256::ZERO)
            .unwrap_or(false)
    }
}

fn member(fields: &[DynSolValue], index: usize) -> Result<&DynSolValue> {
    fields
        .get(index)
        .ok_or_else(|| eyre!("VaultInfoFull has no member {}", index))
}

fn uint_at(fields: &[DynSolValue], index: usize) -> Result<U256> {
    member(fields, index)?
        .as_uint()
        .map(|(value, _)| value)
        .ok_or_else(|| eyre!("VaultInfoFull member {} is not a uint", index))
}

fn address_at(fields: &[DynSolValue], index: usize) -> Result<Address> {
    member(fields, index)?
        .as_address()
        .ok_or_else(|| eyre!("VaultInfoFull member {} is not an address", index))
}

fn string_at(fields: &[DynSolValue], index: usize) -> Result<String> {
    member(fields, index)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| eyre!("VaultInfoFull member {} is not a string", index))
}

/// Build from a decoded `VaultInfoFull` tuple
impl TryFrom<&DynSolValue> for VaultInfo {
    type Error = eyre::Report;

    fn try_from(full: &DynSolValue) -> Result<Self> {
        let fields = full
            .as_tuple()
            .ok_or_else(|| eyre!("VaultInfoFull is not a tuple"))?;

        let decimals = uint_at(fields, ASSET_DECIMALS)?;
        if decimals > U256::from(u8::MAX) {
            return Err(eyre!("asset decimals {} out of range", decimals));
        }

        Ok(Self {
            vault: address_at(fields, VAULT)?,
            asset: address_at(fields, ASSET)?,
            asset_decimals: decimals.to::<u8>(),
            asset_symbol: string_at(fields, ASSET_SYMBOL)?,
            vault_name: string_at(fields, VAULT_NAME)?,
            total_assets: uint_at(fields, TOTAL_ASSETS)?,
            total_borrowed: uint_at(fields, TOTAL_BORROWED)?,
            interest_rates: rates_from_irm(member(fields, IRM_INFO)?),
        })
    }
}

/// First reported rate point of the IRM, if the lens could query it
pub fn rates_from_irm(irm: &DynSolValue) -> Option<InterestRates> {
    let fields = irm.as_tuple()?;
    if fields.get(IRM_QUERY_FAILURE)?.as_bool()? {
        return None;
    }

    let first = fields.get(IRM_RATE_INFO)?.as_array()?.first()?.as_tuple()?;
    Some(InterestRates {
        supply_apy: first.get(RATE_SUPPLY_APY)?.as_uint()?.0,
        borrow_apy: first.get(RATE_BORROW_APY)?.as_uint()?.0,
    })
}

/// Decode raw `getVaultInfoFull` return data
pub fn decode_vault_info_full(data: &[u8]) -> Result<VaultInfo> {
    let returns = VAULT_INFO_FULL_RETURNS
        .abi_decode_sequence(data)
        .map_err(|e| eyre!("Undecodable lens result: {}", e))?;

    let full = returns
        .as_tuple()
        .and_then(|values| values.first())
        .ok_or_else(|| eyre!("Lens result carries no VaultInfoFull"))?;

    VaultInfo::try_from(full)
}

/// Decode one multicall slot. Reverted or undecodable slots become `None`.
pub fn decode_slot(vault: Address, output: &CallOutput) -> Option<VaultInfo> {
    let data = output.as_ref()?;

    match decode_vault_info_full(data) {
        Ok(info) => Some(info),
        Err(e) => {
            trace!("Rejected lens result for {:?}: {}", vault, e);
            None
        }
    }
}

/// Keep only vaults with a defined, strictly positive supply rate
pub fn supplying<I>(infos: I) -> Vec<VaultInfo>
where
    I: IntoIterator<Item = Option<VaultInfo>>,
{
    infos
        .into_iter()
        .flatten()
        .filter(VaultInfo::is_supplying)
        .collect()
}

// ============================================
// LENS READER
// ============================================

pub struct LensReader {
    rpc_url: String,
    batch_size: usize,
}

impl LensReader {
    pub fn new(rpc_url: String, batch_size: usize) -> Self {
        Self { rpc_url, batch_size }
    }

    /// One lens call per vault, batched. The output is positionally aligned
    /// with `vaults`; failed reads are `None`.
    pub async fn fetch_vault_infos(&self, chain: &ChainConfig, vaults: &[Address]) -> Result<Vec<Option<VaultInfo>>> {
        let calls = vaults
            .iter()
            .map(|vault| {
                multicall::tolerant_call(
                    chain.lens,
                    IVaultLens::getVaultInfoFullCall { vault: *vault }.abi_encode(),
                )
            })
            .collect();

        let outputs = multicall::aggregate(&self.rpc_url, chain.multicall, calls, self.batch_size).await?;

        let infos: Vec<Option<VaultInfo>> = vaults
            .iter()
            .zip(outputs.iter())
            .map(|(vault, output)| decode_slot(*vault, output))
            .collect();

        debug!(
            "{}: lens returned {}/{} vaults",
            chain.name,
            infos.iter().filter(|i| i.is_some()).count(),
            vaults.len()
        );

        Ok(infos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;
    use alloy_sol_types::SolType;

    sol! {
        struct InterestRateInfo {
            uint256 cash;
            uint256 borrows;
            uint256 borrowSPY;
            uint256 borrowAPY;
            uint256 supplyAPY;
        }

        struct InterestRateModelDetailedInfo {
            address interestRateModel;
            uint8 interestRateModelType;
            bytes interestRateModelParams;
        }

        struct VaultInterestRateModelInfo {
            bool queryFailure;
            bytes queryFailureReason;
            address vault;
            address interestRateModel;
            InterestRateInfo[] interestRateInfo;
            InterestRateModelDetailedInfo interestRateModelInfo;
        }
    }

    fn vault(supply: u64, borrow: u64) -> VaultInfo {
        VaultInfo {
            vault: Address::repeat_byte(0x01),
            asset: Address::repeat_byte(0x02),
            asset_decimals: 6,
            asset_symbol: "USDC".to_string(),
            vault_name: "EVK Vault eUSDC-1".to_string(),
            total_assets: U256::from(1_000_000u64),
            total_borrowed: U256::from(400_000u64),
            interest_rates: Some(InterestRates {
                supply_apy: U256::from(supply),
                borrow_apy: U256::from(borrow),
            }),
        }
    }

    fn irm_value(query_failure: bool, points: Vec<(u64, u64)>) -> DynSolValue {
        let rates = points
            .into_iter()
            .map(|(supply, borrow)| {
                DynSolValue::Tuple(vec![
                    DynSolValue::Uint(U256::ZERO, 256),
                    DynSolValue::Uint(U256::ZERO, 256),
                    DynSolValue::Uint(U256::ZERO, 256),
                    DynSolValue::Uint(U256::from(borrow), 256),
                    DynSolValue::Uint(U256::from(supply), 256),
                ])
            })
            .collect();

        DynSolValue::Tuple(vec![
            DynSolValue::Bool(query_failure),
            DynSolValue::Bytes(vec![]),
            DynSolValue::Address(Address::repeat_byte(0x01)),
            DynSolValue::Address(Address::repeat_byte(0x03)),
            DynSolValue::Array(rates),
            DynSolValue::Tuple(vec![
                DynSolValue::Address(Address::repeat_byte(0x03)),
                DynSolValue::Uint(U256::from(1u64), 8),
                DynSolValue::Bytes(vec![]),
            ]),
        ])
    }

    /// Zero value of any type used in the lens layout
    fn zero(ty: &DynSolType) -> DynSolValue {
        match ty {
            DynSolType::Bool => DynSolValue::Bool(false),
            DynSolType::Uint(bits) => DynSolValue::Uint(U256::ZERO, *bits),
            DynSolType::Address => DynSolValue::Address(Address::ZERO),
            DynSolType::Bytes => DynSolValue::Bytes(vec![]),
            DynSolType::String => DynSolValue::String(String::new()),
            DynSolType::Array(_) => DynSolValue::Array(vec![]),
            DynSolType::Tuple(members) => DynSolValue::Tuple(members.iter().map(zero).collect()),
            other => panic!("unexpected lens member type {:?}", other),
        }
    }

    /// ABI-encoded `getVaultInfoFull` return data for a 6-decimal USDC vault
    fn lens_return(decimals: u64, irm: DynSolValue) -> Vec<u8> {
        let DynSolValue::Tuple(mut fields) = zero(&vault_info_full_type()) else {
            panic!("VaultInfoFull must be a tuple");
        };

        fields[0] = DynSolValue::Uint(U256::from(1_700_000_000u64), 256);
        fields[VAULT] = DynSolValue::Address(Address::repeat_byte(0x01));
        fields[VAULT_NAME] = DynSolValue::String("EVK Vault eUSDC-1".to_string());
        fields[3] = DynSolValue::String("eUSDC-1".to_string());
        fields[ASSET] = DynSolValue::Address(Address::repeat_byte(0x02));
        fields[6] = DynSolValue::String("USD Coin".to_string());
        fields[ASSET_SYMBOL] = DynSolValue::String("USDC".to_string());
        fields[ASSET_DECIMALS] = DynSolValue::Uint(U256::from(decimals), 256);
        fields[14] = DynSolValue::Uint(U256::from(600_000u64), 256);
        fields[TOTAL_BORROWED] = DynSolValue::Uint(U256::from(400_000u64), 256);
        fields[TOTAL_ASSETS] = DynSolValue::Uint(U256::from(1_000_000u64), 256);
        fields[IRM_INFO] = irm;
        fields[43] = DynSolValue::Tuple(vec![
            DynSolValue::Address(Address::repeat_byte(0x0c)),
            DynSolValue::String("ChainlinkOracle".to_string()),
            DynSolValue::Bytes(vec![0xab; 40]),
        ]);

        DynSolValue::Tuple(vec![DynSolValue::Tuple(fields)])
            .abi_encode_sequence()
            .unwrap()
    }

    #[test]
    fn test_layout_has_every_member() {
        let DynSolType::Tuple(members) = vault_info_full_type() else {
            panic!("VaultInfoFull must be a tuple");
        };
        assert_eq!(members.len(), 46);
        assert_eq!(members[VAULT], DynSolType::Address);
        assert_eq!(members[ASSET_SYMBOL], DynSolType::String);
        assert_eq!(members[TOTAL_ASSETS], DynSolType::Uint(256));
        assert_eq!(members[IRM_INFO], irm_info_type());
    }

    #[test]
    fn test_decode_full_lens_return() {
        let data = lens_return(6, irm_value(false, vec![(20, 50), (1, 2)]));
        let info = decode_slot(Address::repeat_byte(0x01), &Some(Bytes::from(data))).unwrap();

        assert_eq!(info, vault(20, 50));
    }

    #[test]
    fn test_decode_vault_without_rate_points() {
        let data = lens_return(6, irm_value(false, vec![]));
        let info = decode_vault_info_full(&data).unwrap();

        assert_eq!(info.total_assets, U256::from(1_000_000u64));
        assert!(info.interest_rates.is_none());
        assert!(!info.is_supplying());
    }

    #[test]
    fn test_decode_rejects_oversized_decimals() {
        let data = lens_return(256, irm_value(false, vec![(1, 1)]));
        assert!(decode_vault_info_full(&data).is_err());
        assert!(decode_slot(Address::ZERO, &Some(Bytes::from(data))).is_none());
    }

    #[test]
    fn test_irm_layout_matches_solidity_encoding() {
        let irm = VaultInterestRateModelInfo {
            queryFailure: false,
            queryFailureReason: Bytes::new(),
            vault: Address::repeat_byte(0x01),
            interestRateModel: Address::repeat_byte(0x03),
            interestRateInfo: vec![InterestRateInfo {
                cash: U256::from(9u64),
                borrows: U256::from(8u64),
                borrowSPY: U256::from(7u64),
                borrowAPY: U256::from(50u64),
                supplyAPY: U256::from(20u64),
            }],
            interestRateModelInfo: InterestRateModelDetailedInfo {
                interestRateModel: Address::repeat_byte(0x03),
                interestRateModelType: 2,
                interestRateModelParams: Bytes::from(vec![1u8, 2, 3]),
            },
        };

        let encoded = <VaultInterestRateModelInfo as SolType>::abi_encode(&irm);
        let decoded = irm_info_type().abi_decode(&encoded).unwrap();

        assert_eq!(
            rates_from_irm(&decoded),
            Some(InterestRates {
                supply_apy: U256::from(20u64),
                borrow_apy: U256::from(50u64),
            })
        );
    }

    #[test]
    fn test_rates_use_first_point() {
        let rates = rates_from_irm(&irm_value(false, vec![(7, 9), (1, 2)])).unwrap();
        assert_eq!(rates.supply_apy, U256::from(7u64));
        assert_eq!(rates.borrow_apy, U256::from(9u64));
    }

    #[test]
    fn test_rates_absent_on_query_failure_or_empty() {
        assert!(rates_from_irm(&irm_value(true, vec![(7, 9)])).is_none());
        assert!(rates_from_irm(&irm_value(false, vec![])).is_none());
    }

    #[test]
    fn test_failed_or_garbage_slot_is_none() {
        let addr = Address::repeat_byte(0x01);
        assert!(decode_slot(addr, &None).is_none());
        assert!(decode_slot(addr, &Some(Bytes::from(vec![0u8; 31]))).is_none());
    }

    #[test]
    fn test_supplying_drops_idle_and_failed() {
        let mut no_irm = vault(5, 5);
        no_irm.interest_rates = None;

        let kept = supplying(vec![
            Some(vault(10, 20)),
            None,
            Some(vault(0, 20)),
            Some(no_irm),
            Some(vault(1, 0)),
        ]);

        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|v| v.is_supplying()));
    }

    #[test]
    fn test_supplying_is_idempotent() {
        let once = supplying(vec![Some(vault(3, 4)), Some(vault(0, 1)), None]);
        let twice = supplying(once.clone().into_iter().map(Some));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_lens_call_encodes_vault_argument() {
        let target = Address::repeat_byte(0x77);
        let encoded = IVaultLens::getVaultInfoFullCall { vault: target }.abi_encode();
        assert_eq!(&encoded[..4], IVaultLens::getVaultInfoFullCall::SELECTOR.as_slice());
        assert_eq!(&encoded[16..36], target.as_slice());
    }
}
