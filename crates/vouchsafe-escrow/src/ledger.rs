//! Host ledger seam.
//!
//! The escrow engine never owns balances itself; it asks the ledger to move
//! them. Each call is all-or-nothing: it either applies completely or returns
//! an error with nothing changed.

use parking_lot::RwLock;
use std::collections::HashMap;
use vouchsafe_types::Address;

use crate::error::LedgerError;

/// Program id under which associated token accounts are derived.
pub const TOKEN_PROGRAM_ID: Address = Address::from_bytes(*b"vouchsafe-token-prog");

/// Address of `owner`'s token account for `mint`.
pub fn associated_token_address(owner: &Address, mint: &Address) -> Address {
    Address::derive(&TOKEN_PROGRAM_ID, &[b"ata", owner.as_bytes(), mint.as_bytes()])
}

/// Fungible token balance held by `owner` for one `mint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccount {
    pub address: Address,
    pub owner: Address,
    pub mint: Address,
    pub amount: u64,
}

/// Account and balance operations provided by the host chain.
pub trait Ledger: Send + Sync {
    /// Whether any account (record, native or token) lives at `address`.
    fn account_exists(&self, address: &Address) -> bool;

    /// Allocate a program-owned record holding `data`. Fails if the address
    /// is taken.
    fn create_record(&self, address: &Address, data: Vec<u8>) -> Result<(), LedgerError>;

    /// Data stored in the record at `address`.
    fn record(&self, address: &Address) -> Option<Vec<u8>>;

    fn native_balance(&self, address: &Address) -> u64;

    /// Mint native coin into `address` (genesis / faucet).
    fn credit_native(&self, address: &Address, amount: u64) -> Result<(), LedgerError>;

    /// Move native coin. Only `from` may sign.
    fn transfer_native(
        &self,
        signer: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), LedgerError>;

    fn token_account(&self, address: &Address) -> Option<TokenAccount>;

    fn create_token_account(
        &self,
        address: &Address,
        owner: &Address,
        mint: &Address,
    ) -> Result<TokenAccount, LedgerError>;

    /// Mint tokens into an existing token account.
    fn mint_to(&self, account: &Address, amount: u64) -> Result<(), LedgerError>;

    /// Move tokens between accounts of the same mint. Only the owner of
    /// `from` may sign.
    fn transfer_token(
        &self,
        signer: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), LedgerError>;
}

/// Ledger held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    records: RwLock<HashMap<Address, Vec<u8>>>,
    native: RwLock<HashMap<Address, u64>>,
    tokens: RwLock<HashMap<Address, TokenAccount>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (if needed) `owner`'s associated token account and mint into it.
    pub fn fund_token(&self, owner: &Address, mint: &Address, amount: u64) -> Result<Address, LedgerError> {
        let address = associated_token_address(owner, mint);
        if self.token_account(&address).is_none() {
            self.create_token_account(&address, owner, mint)?;
        }
        self.mint_to(&address, amount)?;
        Ok(address)
    }

    /// Total native coin across all accounts.
    pub fn native_supply(&self) -> u128 {
        self.native.read().values().map(|v| *v as u128).sum()
    }
}

impl Ledger for InMemoryLedger {
    fn account_exists(&self, address: &Address) -> bool {
        self.records.read().contains_key(address)
            || self.native.read().contains_key(address)
            || self.tokens.read().contains_key(address)
    }

    fn create_record(&self, address: &Address, data: Vec<u8>) -> Result<(), LedgerError> {
        if self.tokens.read().contains_key(address) {
            return Err(LedgerError::AccountExists(*address));
        }
        let mut records = self.records.write();
        if records.contains_key(address) {
            return Err(LedgerError::AccountExists(*address));
        }
        records.insert(*address, data);
        Ok(())
    }

    fn record(&self, address: &Address) -> Option<Vec<u8>> {
        self.records.read().get(address).cloned()
    }

    fn native_balance(&self, address: &Address) -> u64 {
        self.native.read().get(address).copied().unwrap_or(0)
    }

    fn credit_native(&self, address: &Address, amount: u64) -> Result<(), LedgerError> {
        let mut native = self.native.write();
        let balance = native.entry(*address).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*address))?;
        Ok(())
    }

    fn transfer_native(
        &self,
        signer: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), LedgerError> {
        if signer != from {
            return Err(LedgerError::MissingSignature {
                signer: *signer,
                account: *from,
            });
        }

        let mut native = self.native.write();
        let have = native.get(from).copied().unwrap_or(0);
        if have < amount {
            return Err(LedgerError::InsufficientFunds {
                account: *from,
                required: amount,
                have,
            });
        }
        if from == to {
            return Ok(());
        }

        let to_balance = native.get(to).copied().unwrap_or(0);
        let credited = to_balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*to))?;

        native.insert(*from, have - amount);
        native.insert(*to, credited);
        Ok(())
    }

    fn token_account(&self, address: &Address) -> Option<TokenAccount> {
        self.tokens.read().get(address).cloned()
    }

    fn create_token_account(
        &self,
        address: &Address,
        owner: &Address,
        mint: &Address,
    ) -> Result<TokenAccount, LedgerError> {
        if self.records.read().contains_key(address) {
            return Err(LedgerError::AccountExists(*address));
        }

        let mut tokens = self.tokens.write();
        if tokens.contains_key(address) {
            return Err(LedgerError::AccountExists(*address));
        }

        let account = TokenAccount {
            address: *address,
            owner: *owner,
            mint: *mint,
            amount: 0,
        };
        tokens.insert(*address, account.clone());
        Ok(account)
    }

    fn mint_to(&self, account: &Address, amount: u64) -> Result<(), LedgerError> {
        let mut tokens = self.tokens.write();
        let token = tokens
            .get_mut(account)
            .ok_or(LedgerError::AccountNotFound(*account))?;
        token.amount = token
            .amount
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*account))?;
        Ok(())
    }

    fn transfer_token(
        &self,
        signer: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let mut tokens = self.tokens.write();

        let source = tokens
            .get(from)
            .ok_or(LedgerError::AccountNotFound(*from))?;
        let destination = tokens
            .get(to)
            .ok_or(LedgerError::AccountNotFound(*to))?;

        if &source.owner != signer {
            return Err(LedgerError::MissingSignature {
                signer: *signer,
                account: *from,
            });
        }
        if source.mint != destination.mint {
            return Err(LedgerError::MintMismatch {
                expected: source.mint,
                actual: destination.mint,
            });
        }
        if source.amount < amount {
            return Err(LedgerError::InsufficientFunds {
                account: *from,
                required: amount,
                have: source.amount,
            });
        }
        if from == to {
            return Ok(());
        }

        let credited = destination
            .amount
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*to))?;

        if let Some(source) = tokens.get_mut(from) {
            source.amount -= amount;
        }
        if let Some(destination) = tokens.get_mut(to) {
            destination.amount = credited;
        }
        Ok(())
    }
}
