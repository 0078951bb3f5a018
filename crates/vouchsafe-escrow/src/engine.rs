//! Escrow engine.
//!
//! Owns the escrow accounts and drives the lifecycle against a host
//! [`Ledger`]. Each escrow is one `DashMap` entry; an operation holds that
//! entry for validation, the ledger call and the commit, so operations on one
//! escrow are linearised while different escrows never share a lock.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use vouchsafe_crypto::{candidate_leaf, AuthPath, MerkleProof};
use vouchsafe_types::{Address, Asset, Hash};

use crate::account::{EscrowAccount, Phase};
use crate::clock::Clock;
use crate::config::EscrowConfig;
use crate::custody::{AssetCustody, CustodyAuthority, TokenAccountHandle};
use crate::error::EscrowError;
use crate::ledger::Ledger;
use crate::lifecycle::{self, OpenEscrow};

/// Returned from [`EscrowEngine::open_escrow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscrowHandle {
    pub address: Address,
    pub asset: Asset,
    pub quorum: u64,
    pub maturity: u64,
    pub phase: Phase,
}

/// Membership proof presented on collect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateProof {
    /// Claimed leaf. When absent the signer's candidate leaf is used.
    pub leaf: Option<Hash>,
    pub path: AuthPath,
    pub position: u64,
}

impl CandidateProof {
    pub fn new(path: AuthPath, position: u64) -> Self {
        Self {
            leaf: None,
            path,
            position,
        }
    }
}

impl From<MerkleProof> for CandidateProof {
    fn from(proof: MerkleProof) -> Self {
        Self {
            leaf: Some(proof.leaf),
            path: proof.path,
            position: proof.position,
        }
    }
}

/// Engine statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub escrows: usize,
    pub voting: usize,
    pub matured: usize,
    pub collected: usize,
}

pub struct EscrowEngine<L: Ledger, C: Clock> {
    config: EscrowConfig,
    ledger: Arc<L>,
    clock: C,
    escrows: DashMap<Address, EscrowAccount>,
}

impl<L: Ledger, C: Clock> EscrowEngine<L, C> {
    pub fn new(config: EscrowConfig, ledger: Arc<L>, clock: C) -> Result<Self, EscrowError> {
        config.validate()?;
        Ok(Self {
            config,
            ledger,
            clock,
            escrows: DashMap::new(),
        })
    }

    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Initialize the custody authority for the configured program.
    ///
    /// Only the first call succeeds; later calls fail with
    /// [`EscrowError::AuthorityAlreadyInitialized`].
    pub fn initialize_custody_authority(&self, payer: &Address) -> Result<CustodyAuthority, EscrowError> {
        CustodyAuthority::initialize(self.ledger.as_ref(), &self.config.program_id, payer)
    }

    /// Create (or return) the custodial token account for `mint`.
    pub fn create_custodial_token_account(
        &self,
        authority: &CustodyAuthority,
        payer: &Address,
        mint: &Address,
    ) -> Result<TokenAccountHandle, EscrowError> {
        self.authorize(authority)?;
        let handle = self.custody(authority).create_token_account(mint)?;
        debug!("Custodial token account {} requested by {}", handle.address, payer);
        Ok(handle)
    }

    /// Open an escrow and move the deposit into custody.
    ///
    /// Fails with [`EscrowError::EscrowExists`] if the depositor already has an
    /// escrow over the same root and asset.
    pub fn open_escrow(
        &self,
        authority: &CustodyAuthority,
        request: OpenEscrow,
    ) -> Result<EscrowHandle, EscrowError> {
        self.authorize(authority)?;

        let address = EscrowAccount::derive_address(
            &self.config.program_id,
            &request.depositor,
            &request.root,
            &request.asset,
        );

        match self.escrows.entry(address) {
            Entry::Occupied(_) => {
                debug!("Escrow {} already open", address);
                Err(EscrowError::EscrowExists(address))
            }
            Entry::Vacant(slot) => {
                let now = self.clock.now();
                let escrow = lifecycle::open(&self.config, &self.custody(authority), &request, now)?;
                let handle = EscrowHandle {
                    address: escrow.address,
                    asset: escrow.asset,
                    quorum: escrow.quorum,
                    maturity: escrow.maturity,
                    phase: escrow.phase(now),
                };
                slot.insert(escrow);
                Ok(handle)
            }
        }
    }

    /// Cast `weight` for the candidate at `position`.
    pub fn vote(&self, signer: &Address, escrow: &Address, position: u64, weight: u64) -> Result<Phase, EscrowError> {
        let mut entry = self
            .escrows
            .get_mut(escrow)
            .ok_or(EscrowError::EscrowNotFound(*escrow))?;

        let mut working = entry.clone();
        let phase = lifecycle::vote(&mut working, signer, position, weight, self.clock.now())?;
        *entry = working;
        Ok(phase)
    }

    /// Collect the escrow for `signer`, who proves membership with `proof`.
    ///
    /// The proven leaf is always the signer's candidate leaf and the funds go
    /// to the signer.
    pub fn collect(
        &self,
        authority: &CustodyAuthority,
        signer: &Address,
        escrow: &Address,
        proof: &CandidateProof,
    ) -> Result<u64, EscrowError> {
        self.authorize(authority)?;

        let leaf = candidate_leaf(signer);
        if proof.leaf.is_some_and(|claimed| claimed != leaf) {
            debug!("Collect on {} by {} presented a foreign leaf", escrow, signer);
            return Err(EscrowError::InvalidCandidate);
        }

        let mut entry = self
            .escrows
            .get_mut(escrow)
            .ok_or(EscrowError::EscrowNotFound(*escrow))?;

        let mut working = entry.clone();
        let amount = lifecycle::collect(
            &mut working,
            &self.custody(authority),
            signer,
            &leaf,
            &proof.path,
            proof.position,
            self.clock.now(),
        )?;
        *entry = working;
        Ok(amount)
    }

    /// Snapshot of an escrow account.
    pub fn escrow(&self, address: &Address) -> Option<EscrowAccount> {
        self.escrows.get(address).map(|entry| entry.clone())
    }

    /// Current phase of an escrow.
    pub fn phase(&self, address: &Address) -> Result<Phase, EscrowError> {
        let now = self.clock.now();
        self.escrows
            .get(address)
            .map(|entry| entry.phase(now))
            .ok_or(EscrowError::EscrowNotFound(*address))
    }

    pub fn stats(&self) -> EngineStats {
        let now = self.clock.now();
        let mut stats = EngineStats::default();
        for entry in self.escrows.iter() {
            stats.escrows += 1;
            match entry.phase(now) {
                Phase::Voting => stats.voting += 1,
                Phase::Matured => stats.matured += 1,
                Phase::Collected => stats.collected += 1,
            }
        }
        stats
    }

    fn custody<'a>(&'a self, authority: &'a CustodyAuthority) -> AssetCustody<'a> {
        AssetCustody::new(self.ledger.as_ref(), authority)
    }

    fn authorize(&self, authority: &CustodyAuthority) -> Result<(), EscrowError> {
        authority
            .check(self.ledger.as_ref(), &self.config.program_id)
            .map_err(|e| {
                warn!("Rejected custody authority {}: {}", authority.address(), e);
                e
            })
    }
}
