//! Asset custody under the program-derived custody authority.
//!
//! All escrowed value sits in accounts owned by a single authority address
//! derived from the program id. Native coin is held directly by the authority;
//! tokens are held in one custodial token account per mint. Only the
//! authority signs movements out of custody.

use borsh::{BorshDeserialize, BorshSerialize};
use tracing::{debug, info};
use vouchsafe_types::{Address, Asset};

use crate::account::EscrowAccount;
use crate::error::{EscrowError, LedgerError};
use crate::ledger::{associated_token_address, Ledger};

/// Seed of the custody authority address.
pub const AUTHORITY_SEED: &[u8] = b"signer";

/// Seed prefix of custodial token accounts.
pub const CUSTODY_SEED: &[u8] = b"custody";

/// Persisted form of the custody authority.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
struct AuthorityRecord {
    address: Address,
    program_id: Address,
    seed: Vec<u8>,
    initialized_by: Address,
}

impl AuthorityRecord {
    fn encode(&self) -> Result<Vec<u8>, EscrowError> {
        borsh::to_vec(self).map_err(|e| EscrowError::Serialization(e.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<Self, EscrowError> {
        borsh::from_slice(bytes).map_err(|e| EscrowError::Serialization(e.to_string()))
    }
}

/// Capability handle for the custody authority.
///
/// Obtained once from [`CustodyAuthority::initialize`] and passed explicitly
/// to every operation that moves funds. The address is fixed by the program
/// id and never rotates. A handle is only honoured while it matches the
/// record stored on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustodyAuthority {
    record: AuthorityRecord,
}

impl CustodyAuthority {
    /// Address the authority lives at for `program_id`.
    pub fn derive_address(program_id: &Address) -> Address {
        Address::derive(program_id, &[AUTHORITY_SEED])
    }

    /// Allocate the authority record on the ledger.
    ///
    /// Fails with [`EscrowError::AuthorityAlreadyInitialized`] if the record
    /// already exists.
    pub fn initialize(ledger: &dyn Ledger, program_id: &Address, payer: &Address) -> Result<Self, EscrowError> {
        let record = AuthorityRecord {
            address: Self::derive_address(program_id),
            program_id: *program_id,
            seed: AUTHORITY_SEED.to_vec(),
            initialized_by: *payer,
        };

        ledger
            .create_record(&record.address, record.encode()?)
            .map_err(|e| match e {
                LedgerError::AccountExists(_) => EscrowError::AuthorityAlreadyInitialized,
                other => EscrowError::Ledger(other),
            })?;

        info!("Custody authority {} initialized by {}", record.address, payer);

        Ok(Self { record })
    }

    pub fn address(&self) -> &Address {
        &self.record.address
    }

    pub fn program_id(&self) -> &Address {
        &self.record.program_id
    }

    pub fn seed(&self) -> &[u8] {
        &self.record.seed
    }

    pub fn initialized_by(&self) -> &Address {
        &self.record.initialized_by
    }

    /// Check this handle is the authority of `program_id` and that it matches
    /// the record initialized on `ledger`.
    pub fn check(&self, ledger: &dyn Ledger, program_id: &Address) -> Result<(), EscrowError> {
        let address = Self::derive_address(program_id);
        if self.program_id() != program_id || self.address() != &address {
            return Err(EscrowError::Unauthorized(format!(
                "{} is not the custody authority of program {}",
                self.address(),
                program_id
            )));
        }

        let stored = ledger
            .record(&address)
            .ok_or(EscrowError::AuthorityNotInitialized)?;
        if AuthorityRecord::decode(&stored)? != self.record {
            return Err(EscrowError::Unauthorized(format!(
                "handle does not match the custody authority record at {}",
                address
            )));
        }
        Ok(())
    }

    /// Address of the custodial token account for `mint`.
    pub fn custodial_token_address(&self, mint: &Address) -> Address {
        Address::derive(self.program_id(), &[CUSTODY_SEED, mint.as_bytes()])
    }
}

/// Handle to the custodial token account for one mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccountHandle {
    pub address: Address,
    pub mint: Address,
    pub owner: Address,
}

/// Deposit and release for both asset kinds, signed by the custody authority.
pub struct AssetCustody<'a> {
    ledger: &'a dyn Ledger,
    authority: &'a CustodyAuthority,
}

impl<'a> AssetCustody<'a> {
    pub fn new(ledger: &'a dyn Ledger, authority: &'a CustodyAuthority) -> Self {
        Self { ledger, authority }
    }

    pub fn authority(&self) -> &CustodyAuthority {
        self.authority
    }

    /// Create the custodial token account for `mint`, or return the existing
    /// one.
    pub fn create_token_account(&self, mint: &Address) -> Result<TokenAccountHandle, EscrowError> {
        let address = self.authority.custodial_token_address(mint);

        match self.ledger.token_account(&address) {
            Some(existing) => {
                if &existing.mint != mint || &existing.owner != self.authority.address() {
                    return Err(EscrowError::Unauthorized(format!(
                        "custodial token account {} is not owned by the custody authority",
                        address
                    )));
                }
            }
            None => {
                self.ledger
                    .create_token_account(&address, self.authority.address(), mint)?;
                info!("Custodial token account {} created for mint {}", address, mint);
            }
        }

        Ok(TokenAccountHandle {
            address,
            mint: *mint,
            owner: *self.authority.address(),
        })
    }

    /// Move `amount` from `source` into custody and credit `escrow`.
    ///
    /// Ledger failures (insufficient funds, missing source account) are
    /// returned unchanged.
    pub fn deposit(&self, escrow: &mut EscrowAccount, amount: u64, source: &Address) -> Result<u64, EscrowError> {
        if amount == 0 {
            return Err(EscrowError::InvalidInput("deposit amount must be positive".to_string()));
        }
        let credited_balance = escrow
            .balance
            .checked_add(amount)
            .ok_or_else(|| EscrowError::InvalidInput("escrow balance overflow".to_string()))?;
        let credited_deposit = escrow
            .deposited
            .checked_add(amount)
            .ok_or_else(|| EscrowError::InvalidInput("escrow deposit overflow".to_string()))?;

        match escrow.asset {
            Asset::Native => {
                self.ledger
                    .transfer_native(source, source, self.authority.address(), amount)?;
            }
            Asset::Token { mint } => {
                let custody = self.create_token_account(&mint)?;
                let from = associated_token_address(source, &mint);
                self.ledger
                    .transfer_token(source, &from, &custody.address, amount)?;
            }
        }

        escrow.balance = credited_balance;
        escrow.deposited = credited_deposit;
        debug!("Deposited {} {} into escrow {}", amount, escrow.asset, escrow.address);
        Ok(amount)
    }

    /// Move the whole escrow balance to `destination` and zero it.
    pub fn release(&self, escrow: &mut EscrowAccount, destination: &Address) -> Result<u64, EscrowError> {
        let amount = escrow.balance;
        if amount == 0 {
            return Err(EscrowError::InsufficientCustodyBalance);
        }

        let signer = self.authority.address();
        match escrow.asset {
            Asset::Native => {
                self.ledger.transfer_native(signer, signer, destination, amount)?;
            }
            Asset::Token { mint } => {
                let to = associated_token_address(destination, &mint);
                let account = self
                    .ledger
                    .token_account(&to)
                    .ok_or(LedgerError::AccountNotFound(to))?;
                if account.mint != mint {
                    return Err(EscrowError::MintMismatch {
                        expected: mint,
                        actual: account.mint,
                    });
                }

                let from = self.authority.custodial_token_address(&mint);
                self.ledger.transfer_token(signer, &from, &to, amount)?;
            }
        }

        escrow.balance = 0;
        debug!("Released {} {} from escrow {} to {}", amount, escrow.asset, escrow.address, destination);
        Ok(amount)
    }
}
