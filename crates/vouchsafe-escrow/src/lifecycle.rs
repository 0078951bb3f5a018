//! Escrow lifecycle: open, vote, collect.
//!
//! Voting -> Matured -> Collected. An escrow leaves `Voting` once its tally
//! reaches quorum or its maturity time passes, and becomes `Collected` after
//! the single successful collect. Every transition validates fully before it
//! touches the account or the ledger.

use tracing::{debug, info};
use vouchsafe_crypto::{verify, AuthPath};
use vouchsafe_types::{Address, Asset, Hash};

use crate::account::{Collection, EscrowAccount, Phase};
use crate::config::EscrowConfig;
use crate::custody::AssetCustody;
use crate::error::EscrowError;
use crate::tally::{cast_vote, VoteTally};
use crate::unlock::UnlockRule;

/// Parameters for opening an escrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenEscrow {
    pub depositor: Address,
    /// Merkle root of the candidate set
    pub root: Hash,
    /// Number of candidates under `root`
    pub size: u64,
    pub amount: u64,
    /// Seconds from now until votes are no longer required; 0 matures
    /// immediately
    pub maturity_offset: u64,
    pub asset: Asset,
    /// Falls back to the configured default when `None`
    pub unlock: Option<UnlockRule>,
}

impl OpenEscrow {
    /// Native-coin escrow with the configured unlock rule.
    pub fn native(depositor: Address, root: Hash, size: u64, amount: u64, maturity_offset: u64) -> Self {
        Self {
            depositor,
            root,
            size,
            amount,
            maturity_offset,
            asset: Asset::Native,
            unlock: None,
        }
    }

    pub fn with_asset(mut self, asset: Asset) -> Self {
        self.asset = asset;
        self
    }

    pub fn with_unlock(mut self, unlock: UnlockRule) -> Self {
        self.unlock = Some(unlock);
        self
    }

    fn validate(&self, config: &EscrowConfig) -> Result<(), EscrowError> {
        if self.size == 0 {
            return Err(EscrowError::InvalidInput("candidate set must not be empty".to_string()));
        }
        if self.size > config.max_candidates {
            return Err(EscrowError::InvalidInput(format!(
                "candidate set of {} exceeds maximum {}",
                self.size, config.max_candidates
            )));
        }
        if self.amount == 0 {
            return Err(EscrowError::InvalidInput("deposit amount must be positive".to_string()));
        }
        Ok(())
    }
}

/// Validate `request`, move the deposit into custody, and return the new
/// account.
///
/// Uniqueness of the derived address is the caller's store concern; see
/// [`EscrowEngine::open_escrow`](crate::engine::EscrowEngine::open_escrow).
pub fn open(
    config: &EscrowConfig,
    custody: &AssetCustody<'_>,
    request: &OpenEscrow,
    now: u64,
) -> Result<EscrowAccount, EscrowError> {
    request.validate(config)?;

    let quorum = config.quorum.required_weight(request.size, request.amount);
    if quorum == 0 {
        return Err(EscrowError::InvalidInput("quorum resolves to zero weight".to_string()));
    }

    let mut escrow = EscrowAccount {
        address: EscrowAccount::derive_address(
            &config.program_id,
            &request.depositor,
            &request.root,
            &request.asset,
        ),
        depositor: request.depositor,
        root: request.root,
        size: request.size,
        asset: request.asset,
        deposited: 0,
        balance: 0,
        quorum,
        tally: VoteTally::new(),
        duplicate_votes: config.duplicate_votes,
        unlock: request.unlock.unwrap_or(config.default_unlock),
        opened_at: now,
        maturity: now.saturating_add(request.maturity_offset),
        collected: None,
    };

    custody.deposit(&mut escrow, request.amount, &request.depositor)?;

    info!(
        escrow = %escrow.address,
        depositor = %escrow.depositor,
        amount = escrow.deposited,
        size = escrow.size,
        quorum = escrow.quorum,
        maturity = escrow.maturity,
        "Escrow opened"
    );
    Ok(escrow)
}

/// Record a weighted vote. Fails with [`EscrowError::VotingIsClosed`] once
/// the escrow has matured or been collected.
pub fn vote(
    escrow: &mut EscrowAccount,
    voter: &Address,
    position: u64,
    weight: u64,
    now: u64,
) -> Result<Phase, EscrowError> {
    let phase = cast_vote(escrow, voter, position, weight, now).map_err(|e| {
        debug!("Vote on {} rejected: {}", escrow.address, e);
        e
    })?;

    info!(
        escrow = %escrow.address,
        position,
        weight,
        total = escrow.tally.total_weight(),
        %phase,
        "Vote recorded"
    );
    Ok(phase)
}

/// Release the escrow to `recipient`, who proves `leaf` sits at `position`
/// of the committed candidate set.
///
/// Checks run in order: not yet collected, phase allows collection, path
/// length, proof and position binding, then the escrow's unlock rule.
pub fn collect(
    escrow: &mut EscrowAccount,
    custody: &AssetCustody<'_>,
    recipient: &Address,
    leaf: &Hash,
    path: &AuthPath,
    position: u64,
    now: u64,
) -> Result<u64, EscrowError> {
    check_collectable(escrow, leaf, path, position, now).map_err(|e| {
        debug!("Collect on {} at position {} rejected: {}", escrow.address, position, e);
        e
    })?;

    let amount = custody.release(escrow, recipient)?;
    escrow.collected = Some(Collection {
        recipient: *recipient,
        position,
        amount,
        collected_at: now,
    });

    info!(
        escrow = %escrow.address,
        recipient = %recipient,
        position,
        amount,
        "Escrow collected"
    );
    Ok(amount)
}

fn check_collectable(
    escrow: &EscrowAccount,
    leaf: &Hash,
    path: &AuthPath,
    position: u64,
    now: u64,
) -> Result<(), EscrowError> {
    match escrow.phase(now) {
        Phase::Collected => return Err(EscrowError::AlreadyCollected),
        Phase::Voting => return Err(EscrowError::VotingInProgress),
        Phase::Matured => {}
    }

    path.check_length(escrow.size)
        .map_err(|e| EscrowError::InvalidInput(e.to_string()))?;

    if !path.binds_position(position, escrow.size) || !verify(leaf, path, &escrow.root) {
        return Err(EscrowError::InvalidCandidate);
    }

    if !escrow.unlock.permits(escrow, position) {
        return Err(EscrowError::UnlockConditionFail { position });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::CustodyAuthority;
    use crate::ledger::{InMemoryLedger, Ledger};
    use crate::tally::QuorumPolicy;
    use vouchsafe_crypto::{candidate_leaf, MerkleTree};

    const NOW: u64 = 10_000;

    struct Fixture {
        ledger: InMemoryLedger,
        authority: CustodyAuthority,
        config: EscrowConfig,
        candidates: Vec<Address>,
        tree: MerkleTree,
    }

    impl Fixture {
        fn new(size: u8) -> Self {
            let config = EscrowConfig {
                quorum: QuorumPolicy::Absolute(60),
                ..EscrowConfig::default()
            };
            let ledger = InMemoryLedger::new();
            let authority = CustodyAuthority::initialize(&ledger, &config.program_id, &depositor()).unwrap();
            ledger.credit_native(&depositor(), 1_000).unwrap();

            let candidates: Vec<Address> = (0..size).map(|i| Address::from_bytes([100 + i; 20])).collect();
            let leaves: Vec<Hash> = candidates.iter().map(candidate_leaf).collect();
            let tree = MerkleTree::from_leaves(&leaves).unwrap();

            Self { ledger, authority, config, candidates, tree }
        }

        fn custody(&self) -> AssetCustody<'_> {
            AssetCustody::new(&self.ledger, &self.authority)
        }

        fn open(&self, maturity_offset: u64) -> EscrowAccount {
            let request = OpenEscrow::native(
                depositor(),
                self.tree.root(),
                self.tree.len(),
                100,
                maturity_offset,
            );
            open(&self.config, &self.custody(), &request, NOW).unwrap()
        }

        fn collect(&self, escrow: &mut EscrowAccount, position: u64, now: u64) -> Result<u64, EscrowError> {
            let recipient = self.candidates[position as usize];
            let path = self.tree.path(position).unwrap();
            collect(escrow, &self.custody(), &recipient, &candidate_leaf(&recipient), &path, position, now)
        }
    }

    fn depositor() -> Address {
        Address::from_bytes([1u8; 20])
    }

    fn voter() -> Address {
        Address::from_bytes([2u8; 20])
    }

    #[test]
    fn test_open_records_commitment() {
        let fx = Fixture::new(8);
        let escrow = fx.open(3_600);

        assert_eq!(escrow.root, fx.tree.root());
        assert_eq!(escrow.size, 8);
        assert_eq!(escrow.balance, 100);
        assert_eq!(escrow.deposited, 100);
        assert_eq!(escrow.quorum, 60);
        assert_eq!(escrow.maturity, NOW + 3_600);
        assert_eq!(escrow.phase(NOW), Phase::Voting);
        assert_eq!(fx.ledger.native_balance(fx.authority.address()), 100);
    }

    #[test]
    fn test_open_with_zero_offset_starts_matured() {
        let fx = Fixture::new(8);
        let escrow = fx.open(0);
        assert_eq!(escrow.phase(NOW), Phase::Matured);
    }

    #[test]
    fn test_open_rejects_invalid_input() {
        let fx = Fixture::new(8);
        let base = OpenEscrow::native(depositor(), fx.tree.root(), 8, 100, 0);

        for request in [
            OpenEscrow { size: 0, ..base.clone() },
            OpenEscrow { amount: 0, ..base.clone() },
            OpenEscrow { size: fx.config.max_candidates + 1, ..base.clone() },
        ] {
            assert!(matches!(
                open(&fx.config, &fx.custody(), &request, NOW),
                Err(EscrowError::InvalidInput(_))
            ));
        }
        assert_eq!(fx.ledger.native_balance(&depositor()), 1_000);
    }

    #[test]
    fn test_small_deposit_still_opens_in_voting() {
        let fx = Fixture::new(8);
        let config = EscrowConfig::default();
        let request = OpenEscrow::native(depositor(), fx.tree.root(), 8, 1, 86_400);

        let mut escrow = open(&config, &fx.custody(), &request, NOW).unwrap();
        assert_eq!(escrow.quorum, 1);
        assert_eq!(escrow.phase(NOW), Phase::Voting);
        assert_eq!(
            fx.collect(&mut escrow, 0, NOW),
            Err(EscrowError::VotingInProgress)
        );

        assert_eq!(vote(&mut escrow, &voter(), 0, 1, NOW), Ok(Phase::Matured));
    }

    #[test]
    fn test_open_rejects_zero_quorum() {
        let fx = Fixture::new(8);
        let config = EscrowConfig {
            quorum: QuorumPolicy::Absolute(0),
            ..EscrowConfig::default()
        };
        let request = OpenEscrow::native(depositor(), fx.tree.root(), 8, 100, 86_400);

        assert!(matches!(
            open(&config, &fx.custody(), &request, NOW),
            Err(EscrowError::InvalidInput(_))
        ));
        assert_eq!(fx.ledger.native_balance(&depositor()), 1_000);
    }

    #[test]
    fn test_open_saturates_far_maturity() {
        let fx = Fixture::new(2);
        let escrow = fx.open(u64::MAX);
        assert_eq!(escrow.maturity, u64::MAX);
        assert_eq!(escrow.phase(u64::MAX - 1), Phase::Voting);
    }

    #[test]
    fn test_open_propagates_insufficient_funds() {
        let fx = Fixture::new(8);
        let request = OpenEscrow::native(depositor(), fx.tree.root(), 8, 5_000, 0);
        assert!(matches!(
            open(&fx.config, &fx.custody(), &request, NOW),
            Err(EscrowError::Ledger(_))
        ));
    }

    #[test]
    fn test_vote_until_quorum_then_closed() {
        let fx = Fixture::new(8);
        let mut escrow = fx.open(3_600);

        assert_eq!(vote(&mut escrow, &voter(), 3, 40, NOW).unwrap(), Phase::Voting);
        assert_eq!(vote(&mut escrow, &voter(), 3, 20, NOW).unwrap(), Phase::Matured);
        assert_eq!(vote(&mut escrow, &voter(), 3, 1, NOW), Err(EscrowError::VotingIsClosed));
        assert_eq!(escrow.tally.total_weight(), 60);
    }

    #[test]
    fn test_vote_after_maturity_is_closed() {
        let fx = Fixture::new(8);
        let mut escrow = fx.open(3_600);
        assert_eq!(vote(&mut escrow, &voter(), 0, 1, NOW + 3_600), Err(EscrowError::VotingIsClosed));
    }

    #[test]
    fn test_vote_rejects_out_of_range_position() {
        let fx = Fixture::new(8);
        let mut escrow = fx.open(3_600);
        assert!(matches!(
            vote(&mut escrow, &voter(), 8, 1, NOW),
            Err(EscrowError::InvalidInput(_))
        ));
        assert_eq!(escrow.tally.total_weight(), 0);
    }

    #[test]
    fn test_collect_while_voting() {
        let fx = Fixture::new(8);
        let mut escrow = fx.open(3_600);
        assert_eq!(fx.collect(&mut escrow, 2, NOW), Err(EscrowError::VotingInProgress));
        assert_eq!(escrow.balance, 100);
    }

    #[test]
    fn test_collect_after_maturity_time() {
        let fx = Fixture::new(8);
        let mut escrow = fx.open(3_600);
        assert_eq!(fx.collect(&mut escrow, 2, NOW + 3_600), Ok(100));
        assert_eq!(fx.ledger.native_balance(&fx.candidates[2]), 100);
    }

    #[test]
    fn test_collect_once() {
        let fx = Fixture::new(8);
        let mut escrow = fx.open(0);

        assert_eq!(fx.collect(&mut escrow, 5, NOW), Ok(100));
        assert_eq!(escrow.balance, 0);
        assert_eq!(escrow.phase(NOW), Phase::Collected);
        let collection = escrow.collected.unwrap();
        assert_eq!(collection.recipient, fx.candidates[5]);
        assert_eq!(collection.position, 5);

        assert_eq!(fx.collect(&mut escrow, 5, NOW), Err(EscrowError::AlreadyCollected));
        assert_eq!(fx.collect(&mut escrow, 1, NOW), Err(EscrowError::AlreadyCollected));
    }

    #[test]
    fn test_collect_shifted_position_is_invalid_candidate() {
        let fx = Fixture::new(8);
        let mut escrow = fx.open(0);
        let recipient = fx.candidates[4];
        let path = fx.tree.path(4).unwrap();

        let result = collect(&mut escrow, &fx.custody(), &recipient, &candidate_leaf(&recipient), &path, 5, NOW);
        assert_eq!(result, Err(EscrowError::InvalidCandidate));
        assert_eq!(escrow.balance, 100);
    }

    #[test]
    fn test_collect_by_non_candidate() {
        let fx = Fixture::new(8);
        let mut escrow = fx.open(0);
        let outsider = Address::from_bytes([0x55u8; 20]);
        let path = fx.tree.path(0).unwrap();

        let result = collect(&mut escrow, &fx.custody(), &outsider, &candidate_leaf(&outsider), &path, 0, NOW);
        assert_eq!(result, Err(EscrowError::InvalidCandidate));
    }

    #[test]
    fn test_collect_position_past_size() {
        let fx = Fixture::new(5);
        let mut escrow = fx.open(0);
        let recipient = fx.candidates[4];
        let path = fx.tree.path(4).unwrap();

        let result = collect(&mut escrow, &fx.custody(), &recipient, &candidate_leaf(&recipient), &path, 5, NOW);
        assert_eq!(result, Err(EscrowError::InvalidCandidate));
    }

    #[test]
    fn test_collect_malformed_path_length() {
        let fx = Fixture::new(8);
        let mut escrow = fx.open(0);
        let recipient = fx.candidates[0];
        let mut path = fx.tree.path(0).unwrap();
        path.nodes_mut().pop();

        let result = collect(&mut escrow, &fx.custody(), &recipient, &candidate_leaf(&recipient), &path, 0, NOW);
        assert!(matches!(result, Err(EscrowError::InvalidInput(_))));
    }

    #[test]
    fn test_collect_respects_unlock_rule() {
        let fx = Fixture::new(8);
        let request = OpenEscrow::native(depositor(), fx.tree.root(), 8, 100, 3_600)
            .with_unlock(UnlockRule::Leading);
        let mut escrow = open(&fx.config, &fx.custody(), &request, NOW).unwrap();

        vote(&mut escrow, &voter(), 6, 50, NOW).unwrap();
        vote(&mut escrow, &voter(), 1, 10, NOW).unwrap();
        assert_eq!(escrow.phase(NOW), Phase::Matured);

        assert_eq!(
            fx.collect(&mut escrow, 1, NOW),
            Err(EscrowError::UnlockConditionFail { position: 1 })
        );
        assert_eq!(escrow.balance, 100);
        assert_eq!(fx.collect(&mut escrow, 6, NOW), Ok(100));
    }

    #[test]
    fn test_single_candidate_escrow() {
        let fx = Fixture::new(1);
        let mut escrow = fx.open(0);
        assert_eq!(escrow.root, candidate_leaf(&fx.candidates[0]));
        assert_eq!(fx.collect(&mut escrow, 0, NOW), Ok(100));
    }

    #[test]
    fn test_single_release_matches_deposit() {
        let fx = Fixture::new(8);
        let mut escrow = fx.open(0);
        let supply = fx.ledger.native_supply();

        let released: u64 = (0..8)
            .filter_map(|position| fx.collect(&mut escrow, position, NOW).ok())
            .sum();

        assert_eq!(released, escrow.deposited);
        assert_eq!(fx.ledger.native_supply(), supply);
        assert_eq!(fx.ledger.native_balance(fx.authority.address()), 0);
    }
}
