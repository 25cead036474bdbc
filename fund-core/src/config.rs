//! Configuration for the fund console

use crate::registry::WalletRegistry;
use crate::{Error, Result};
use ledger_client::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fund console configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ledger connection configuration
    pub ledger: LedgerConfig,

    /// Fund contract addresses
    pub contracts: ContractsConfig,

    /// Wallet key material and role addresses
    pub wallets: WalletConfig,

    /// Fund accounting parameters
    pub fund: FundConfig,
}

/// Ledger connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Run against the embedded in-memory ledger instead of a remote node
    pub in_memory: bool,

    /// JSON-RPC endpoint of the ledger node
    pub endpoint: String,

    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,

    /// Receipt polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            in_memory: true,
            endpoint: "http://localhost:8545".to_string(),
            request_timeout_secs: 30,
            poll_interval_ms: 500,
        }
    }
}

/// Fund contract addresses
///
/// Left empty for the in-memory ledger, which reports its own deployed
/// addresses. Remote nodes require both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// Fund token contract address
    pub fund_token: String,

    /// Crowdsale contract address
    pub crowdsale: String,
}

/// Wallet key material and role addresses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Hex-encoded 32-byte seed for the AUM wallet signing key.
    /// Empty selects the dev-chain key when running in memory.
    pub aum_wallet_key: String,

    /// Contract deployer address. Leave the role addresses empty to bind
    /// roles by position from the ledger's account list instead.
    #[serde(default)]
    pub contract_deployer: String,

    /// AUM wallet address
    #[serde(default)]
    pub aum_wallet: String,

    /// Burn wallet address
    #[serde(default)]
    pub burn_wallet: String,

    /// Investor wallet addresses, in pool order
    #[serde(default)]
    pub investors: Vec<String>,
}

impl WalletConfig {
    /// Whether any explicit role address is configured
    pub fn has_role_addresses(&self) -> bool {
        !self.contract_deployer.is_empty()
            || !self.aum_wallet.is_empty()
            || !self.burn_wallet.is_empty()
            || !self.investors.is_empty()
    }

    /// Registry bound from the configured role addresses
    ///
    /// Partial configuration is rejected: all three fund roles and at
    /// least one investor must be present.
    pub fn role_registry(&self) -> Result<WalletRegistry> {
        let contract_deployer = parse_role_address("contract_deployer", &self.contract_deployer)?;
        let aum_wallet = parse_role_address("aum_wallet", &self.aum_wallet)?;
        let burn_wallet = parse_role_address("burn_wallet", &self.burn_wallet)?;
        if self.investors.is_empty() {
            return Err(Error::Configuration(
                "wallets.investors is empty".to_string(),
            ));
        }
        let investors = self
            .investors
            .iter()
            .map(|raw| parse_role_address("investors", raw))
            .collect::<Result<Vec<_>>>()?;
        WalletRegistry::from_roles(contract_deployer, aum_wallet, burn_wallet, investors)
    }
}

fn parse_role_address(name: &str, raw: &str) -> Result<Address> {
    if raw.trim().is_empty() {
        return Err(Error::Configuration(format!(
            "wallets.{} is not set",
            name
        )));
    }
    Address::parse(raw.trim())
        .map_err(|e| Error::Configuration(format!("wallets.{}: {}", name, e)))
}

/// Fund accounting parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundConfig {
    /// Reserve offset subtracted from the AUM wallet balance
    pub reserve_offset: String, // u128, base units

    /// Tokens minted per native base unit in the crowdsale
    pub tokens_per_native_unit: u64,

    /// Gas price attached to redemption payouts, in base units
    pub gas_price: u64,

    /// Seconds to wait for a transaction receipt
    pub confirmation_timeout_secs: u64,
}

impl Default for FundConfig {
    fn default() -> Self {
        Self {
            reserve_offset: "100000000000000000000".to_string(), // 100 units at 18 decimals
            tokens_per_native_unit: 1,
            gas_price: 0,
            confirmation_timeout_secs: 120, // 2 minutes
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Configuration(format!(
                "failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Configuration(format!("failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Some(flag) = read_env("FUND_LEDGER_IN_MEMORY") {
            config.ledger.in_memory = flag;
        }

        if let Ok(endpoint) = std::env::var("FUND_LEDGER_ENDPOINT") {
            config.ledger.endpoint = endpoint;
        }

        if let Some(secs) = read_env("FUND_LEDGER_REQUEST_TIMEOUT_SECS") {
            config.ledger.request_timeout_secs = secs;
        }

        if let Some(ms) = read_env("FUND_LEDGER_POLL_INTERVAL_MS") {
            config.ledger.poll_interval_ms = ms;
        }

        if let Ok(address) = std::env::var("FUND_TOKEN_ADDRESS") {
            config.contracts.fund_token = address;
        }

        if let Ok(address) = std::env::var("FUND_CROWDSALE_ADDRESS") {
            config.contracts.crowdsale = address;
        }

        if let Ok(key) = std::env::var("FUND_AUM_WALLET_KEY") {
            config.wallets.aum_wallet_key = key;
        }

        if let Ok(address) = std::env::var("FUND_DEPLOYER_ADDRESS") {
            config.wallets.contract_deployer = address;
        }

        if let Ok(address) = std::env::var("FUND_AUM_WALLET_ADDRESS") {
            config.wallets.aum_wallet = address;
        }

        if let Ok(address) = std::env::var("FUND_BURN_WALLET_ADDRESS") {
            config.wallets.burn_wallet = address;
        }

        if let Ok(list) = std::env::var("FUND_INVESTOR_ADDRESSES") {
            config.wallets.investors = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(offset) = std::env::var("FUND_RESERVE_OFFSET") {
            config.fund.reserve_offset = offset;
        }

        if let Some(rate) = read_env("FUND_TOKENS_PER_NATIVE_UNIT") {
            config.fund.tokens_per_native_unit = rate;
        }

        if let Some(price) = read_env("FUND_GAS_PRICE") {
            config.fund.gas_price = price;
        }

        if let Some(secs) = read_env("FUND_CONFIRMATION_TIMEOUT_SECS") {
            config.fund.confirmation_timeout_secs = secs;
        }

        Ok(config)
    }

    /// Reserve offset parsed to base units
    pub fn reserve_offset(&self) -> Result<u128> {
        self.fund.reserve_offset.trim().parse().map_err(|_| {
            Error::Configuration(format!(
                "reserve_offset '{}' is not a non-negative integer",
                self.fund.reserve_offset
            ))
        })
    }

    /// Receipt wait bound
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.fund.confirmation_timeout_secs)
    }
}

fn read_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aum::DEFAULT_RESERVE_OFFSET;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.ledger.in_memory);
        assert_eq!(config.ledger.endpoint, "http://localhost:8545");
        assert_eq!(config.fund.tokens_per_native_unit, 1);
        assert_eq!(config.fund.gas_price, 0);
        assert_eq!(config.fund.confirmation_timeout_secs, 120);
        assert_eq!(config.reserve_offset().unwrap(), DEFAULT_RESERVE_OFFSET);
        assert_eq!(config.confirmation_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[ledger]
in_memory = false
endpoint = "http://ledger:8545"
request_timeout_secs = 10
poll_interval_ms = 250

[contracts]
fund_token = "0x00112233445566778899aabbccddeeff00112233"
crowdsale = "0x33221100ffeeddccbbaa998877665544332211ff"

[wallets]
aum_wallet_key = "0xda00000000000000000000000000000000000000000000000000000000000003"
contract_deployer = "0x2222222222222222222222222222222222222222"
aum_wallet = "0x3333333333333333333333333333333333333333"
burn_wallet = "0x4444444444444444444444444444444444444444"
investors = [
    "0x5555555555555555555555555555555555555555",
    "0x6666666666666666666666666666666666666666",
]

[fund]
reserve_offset = "250000000000000000000"
tokens_per_native_unit = 2
gas_price = 0
confirmation_timeout_secs = 30
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert!(!config.ledger.in_memory);
        assert_eq!(config.ledger.endpoint, "http://ledger:8545");
        assert_eq!(config.fund.tokens_per_native_unit, 2);
        assert_eq!(config.reserve_offset().unwrap(), 250_000_000_000_000_000_000);
        assert_eq!(config.confirmation_timeout(), Duration::from_secs(30));

        assert!(config.wallets.has_role_addresses());
        let registry = config.wallets.role_registry().unwrap();
        assert_eq!(
            registry.aum_wallet().as_str(),
            "0x3333333333333333333333333333333333333333"
        );
        assert_eq!(registry.investors().len(), 2);
    }

    #[test]
    fn test_role_addresses_default_to_positional() {
        let config = Config::default();
        assert!(!config.wallets.has_role_addresses());
    }

    #[test]
    fn test_partial_role_addresses_rejected() {
        let mut config = Config::default();
        config.wallets.aum_wallet = "0x3333333333333333333333333333333333333333".to_string();
        assert!(config.wallets.has_role_addresses());
        assert!(matches!(
            config.wallets.role_registry(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_from_file_missing() {
        let result = Config::from_file("/nonexistent/fund-console.toml");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_bad_reserve_offset() {
        let mut config = Config::default();
        config.fund.reserve_offset = "12.5".to_string();
        assert!(matches!(
            config.reserve_offset(),
            Err(Error::Configuration(_))
        ));
    }
}
