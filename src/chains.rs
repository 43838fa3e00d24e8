//! Chain registry for Euler v2 deployments
//!
//! One entry per network where the EVK factory and VaultLens are deployed.
//! The table is built once and never mutated.

use alloy_primitives::{address, Address};

/// Multicall3 - deployed at the same address on every supported chain
pub const MULTICALL3: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

/// Static deployment data for one chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    /// Chain name as used in price keys and pool records ("ethereum", "base", ...)
    pub name: &'static str,
    /// Numeric EVM chain id (reward campaigns key chains by this)
    pub evm_chain_id: u64,
    /// EVK GenericFactory emitting `ProxyCreated`
    pub factory: Address,
    /// VaultLens exposing `getVaultInfoFull`
    pub lens: Address,
    /// Block the factory was deployed at; discovery always starts here
    pub start_block: u64,
    /// Public endpoint used when no RPC override is configured
    pub default_rpc_url: &'static str,
    pub multicall: Address,
}

lazy_static::lazy_static! {
    static ref REGISTRY: Vec<ChainConfig> = vec![
        ChainConfig {
            name: "ethereum",
            evm_chain_id: 1,
            factory: address!("29a56a1b8214D9Cf7c5561811750D5cBDb45CC8e"),
            lens: address!("A8695d44EC128136F8Afcd796D6ba3Db3cdA8914"),
            start_block: 20_529_225,
            default_rpc_url: "https://eth.llamarpc.com",
            multicall: MULTICALL3,
        },
        ChainConfig {
            name: "bob",
            evm_chain_id: 60808,
            factory: address!("046a9837A61d6b6263f54F4E27EE072bA4bdC7e4"),
            lens: address!("b20343277ad78150D21CC8820fF012efDDa71531"),
            start_block: 12_266_832,
            default_rpc_url: "https://rpc.gobob.xyz",
            multicall: MULTICALL3,
        },
        ChainConfig {
            name: "sonic",
            evm_chain_id: 146,
            factory: address!("F075cC8660B51D0b8a4474e3f47eDAC5fA034cFB"),
            lens: address!("0058F402aaa67868A682DA1bDd2E08c7aA3795eE"),
            start_block: 5_324_454,
            default_rpc_url: "https://rpc.soniclabs.com",
            multicall: MULTICALL3,
        },
        ChainConfig {
            name: "avax",
            evm_chain_id: 43114,
            factory: address!("af4B4c18B17F6a2B32F6c398a3910bdCD7f26181"),
            lens: address!("eE2CaC5Df4984f56395b48e71b1D1E84acFbcD9E"),
            start_block: 56_805_794,
            default_rpc_url: "https://api.avax.network/ext/bc/C/rpc",
            multicall: MULTICALL3,
        },
        ChainConfig {
            name: "berachain",
            evm_chain_id: 80094,
            factory: address!("5C13fb43ae9BAe8470f646ea647784534E9543AF"),
            lens: address!("a61BC2Df76DBFCeDAe4fAaB7A1341bA98fA76FdA"),
            start_block: 786_314,
            default_rpc_url: "https://rpc.berachain.com",
            multicall: MULTICALL3,
        },
        ChainConfig {
            name: "bsc",
            evm_chain_id: 56,
            factory: address!("7F53E2755eB3c43824E162F7F6F087832B9C9Df6"),
            lens: address!("BfD019C90e8Ca8286f9919DF31c25BF989C6bD46"),
            start_block: 46_370_655,
            default_rpc_url: "https://bsc-dataseed.bnbchain.org",
            multicall: MULTICALL3,
        },
        ChainConfig {
            name: "base",
            evm_chain_id: 8453,
            factory: address!("7F321498A801A191a93C840750ed637149dDf8D0"),
            lens: address!("CCC8D18e40c439F5234042FbEA0f4f1528f52f00"),
            start_block: 22_282_408,
            default_rpc_url: "https://mainnet.base.org",
            multicall: MULTICALL3,
        },
        ChainConfig {
            name: "swellchain",
            evm_chain_id: 1923,
            factory: address!("238bF86bb451ec3CA69BB855f91BDA001aB118b9"),
            lens: address!("1f1997528FbD68496d8007E65599637fBBe85582"),
            start_block: 2_350_701,
            default_rpc_url: "https://swell-mainnet.alt.technology",
            multicall: MULTICALL3,
        },
        ChainConfig {
            name: "unichain",
            evm_chain_id: 130,
            factory: address!("bAd8b5BDFB2bcbcd78Cc9f1573D3Aad6E865e752"),
            lens: address!("03833b4A873eA1F657340C72971a2d0EbB2B4D82"),
            start_block: 8_541_544,
            default_rpc_url: "https://mainnet.unichain.org",
            multicall: MULTICALL3,
        },
        ChainConfig {
            name: "arbitrum",
            evm_chain_id: 42161,
            factory: address!("78Df1CF5bf06a7f27f2ACc580B934238C1b80D50"),
            lens: address!("1Df19EE4Ed7353fCC54e26E54f960a19Aa43D304"),
            start_block: 300_690_953,
            default_rpc_url: "https://arb1.arbitrum.io/rpc",
            multicall: MULTICALL3,
        },
    ];
}

/// All supported chains, in processing order
pub fn all_chains() -> &'static [ChainConfig] {
    &REGISTRY
}

pub fn chain_by_name(name: &str) -> Option<&'static ChainConfig> {
    REGISTRY.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

pub fn chain_by_evm_id(evm_chain_id: u64) -> Option<&'static ChainConfig> {
    REGISTRY.iter().find(|c| c.evm_chain_id == evm_chain_id)
}

/// Registry subset matching `names`, kept in registry order.
/// An empty filter selects every chain.
pub fn select_chains(names: &[String]) -> eyre::Result<Vec<&'static ChainConfig>> {
    if let Some(unknown) = names.iter().find(|n| chain_by_name(n).is_none()) {
        return Err(eyre::eyre!(
            "Unknown chain '{}' (supported: {})",
            unknown,
            REGISTRY.iter().map(|c| c.name).collect::<Vec<_>>().join(", ")
        ));
    }

    Ok(REGISTRY
        .iter()
        .filter(|c| names.is_empty() || names.iter().any(|n| c.name.eq_ignore_ascii_case(n)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_has_all_deployments() {
        assert_eq!(all_chains().len(), 10);
        assert_eq!(all_chains()[0].name, "ethereum");
        assert_eq!(all_chains()[9].name, "arbitrum");
    }

    #[test]
    fn test_registry_entries_unique() {
        let names: HashSet<_> = all_chains().iter().map(|c| c.name).collect();
        let ids: HashSet<_> = all_chains().iter().map(|c| c.evm_chain_id).collect();
        let factories: HashSet<_> = all_chains().iter().map(|c| c.factory).collect();

        assert_eq!(names.len(), all_chains().len());
        assert_eq!(ids.len(), all_chains().len());
        assert_eq!(factories.len(), all_chains().len());
        assert!(all_chains().iter().all(|c| c.factory != c.lens));
    }

    #[test]
    fn test_lookup() {
        let base = chain_by_name("BASE").unwrap();
        assert_eq!(base.evm_chain_id, 8453);
        assert_eq!(base.start_block, 22_282_408);
        assert_eq!(chain_by_evm_id(42161).unwrap().name, "arbitrum");
        assert!(chain_by_name("solana").is_none());
    }

    #[test]
    fn test_select_keeps_registry_order() {
        let picked = select_chains(&["base".to_string(), "ethereum".to_string()]).unwrap();
        let names: Vec<_> = picked.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["ethereum", "base"]);

        assert_eq!(select_chains(&[]).unwrap().len(), 10);
        assert!(select_chains(&["fantom".to_string()]).is_err());
    }
}
