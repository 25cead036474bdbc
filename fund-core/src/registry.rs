//! Wallet registry
//!
//! Fixed mapping of fund roles to ledger addresses, resolved once at
//! startup and immutable for the process lifetime. The dev-chain path
//! binds roles by account position; production supplies addresses
//! explicitly. All role lookups go through typed accessors, never raw
//! positional indexing.

use crate::{Error, Result};
use ledger_client::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Positions 0-1 of the node account list are reserved/unused
pub const RESERVED_ACCOUNTS: usize = 2;

/// Account position bound to the contract deployer
pub const CONTRACT_DEPLOYER_POSITION: usize = 2;

/// Account position bound to the AUM wallet
pub const AUM_WALLET_POSITION: usize = 3;

/// Account position bound to the burn wallet
pub const BURN_WALLET_POSITION: usize = 4;

/// Account positions bound to the investor pool
pub const INVESTOR_POSITIONS: std::ops::Range<usize> = 5..10;

/// Accounts the positional binding requires
pub const REQUIRED_ACCOUNTS: usize = 10;

/// Fund role a wallet plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletRole {
    /// Deployed the fund contracts
    ContractDeployer,
    /// Holds investor capital plus the operational reserve
    AumWallet,
    /// Receives redeemed tokens for later burning
    BurnWallet,
    /// Investor pool member
    Investor(usize),
}

impl fmt::Display for WalletRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletRole::ContractDeployer => write!(f, "contract deployer"),
            WalletRole::AumWallet => write!(f, "AUM wallet"),
            WalletRole::BurnWallet => write!(f, "burn wallet"),
            WalletRole::Investor(index) => write!(f, "investor {}", index),
        }
    }
}

/// Immutable role-to-address binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRegistry {
    contract_deployer: Address,
    aum_wallet: Address,
    burn_wallet: Address,
    investors: Vec<Address>,
}

impl WalletRegistry {
    /// Bind roles by position from the node's ordered account list
    ///
    /// Layout: positions 0-1 reserved, 2 contract deployer, 3 AUM wallet,
    /// 4 burn wallet, 5-9 investor pool.
    pub fn from_accounts(accounts: &[Address]) -> Result<Self> {
        if accounts.len() < REQUIRED_ACCOUNTS {
            return Err(Error::Configuration(format!(
                "ledger exposes {} accounts, need at least {}",
                accounts.len(),
                REQUIRED_ACCOUNTS
            )));
        }

        Self::from_roles(
            accounts[CONTRACT_DEPLOYER_POSITION].clone(),
            accounts[AUM_WALLET_POSITION].clone(),
            accounts[BURN_WALLET_POSITION].clone(),
            accounts[INVESTOR_POSITIONS].to_vec(),
        )
    }

    /// Bind roles from explicitly configured addresses
    pub fn from_roles(
        contract_deployer: Address,
        aum_wallet: Address,
        burn_wallet: Address,
        investors: Vec<Address>,
    ) -> Result<Self> {
        if investors.is_empty() {
            return Err(Error::Configuration(
                "investor pool is empty".to_string(),
            ));
        }

        let registry = Self {
            contract_deployer,
            aum_wallet,
            burn_wallet,
            investors,
        };
        registry.ensure_unique()?;
        Ok(registry)
    }

    fn ensure_unique(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let all = [&self.contract_deployer, &self.aum_wallet, &self.burn_wallet]
            .into_iter()
            .chain(self.investors.iter());
        for address in all {
            if !seen.insert(address) {
                return Err(Error::Configuration(format!(
                    "address {} bound to more than one role",
                    address
                )));
            }
        }
        Ok(())
    }

    /// Contract deployer address
    pub fn contract_deployer(&self) -> &Address {
        &self.contract_deployer
    }

    /// AUM wallet address
    pub fn aum_wallet(&self) -> &Address {
        &self.aum_wallet
    }

    /// Burn wallet address
    pub fn burn_wallet(&self) -> &Address {
        &self.burn_wallet
    }

    /// Investor pool, in position order
    pub fn investors(&self) -> &[Address] {
        &self.investors
    }

    /// Address of one investor, bounds-checked
    pub fn investor(&self, index: usize) -> Result<&Address> {
        self.investors.get(index).ok_or_else(|| {
            Error::InvalidInput(format!(
                "investor index {} out of range (pool holds {})",
                index,
                self.investors.len()
            ))
        })
    }

    /// Role bound to an address, if any
    pub fn role_of(&self, address: &Address) -> Option<WalletRole> {
        if address == &self.contract_deployer {
            return Some(WalletRole::ContractDeployer);
        }
        if address == &self.aum_wallet {
            return Some(WalletRole::AumWallet);
        }
        if address == &self.burn_wallet {
            return Some(WalletRole::BurnWallet);
        }
        self.investors
            .iter()
            .position(|a| a == address)
            .map(WalletRole::Investor)
    }
}
