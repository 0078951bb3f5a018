//! Scenario files for `vouchsafe simulate`.
//!
//! A scenario opens one escrow against a fresh in-memory ledger and replays a
//! list of steps. Rejected steps are recorded in the report, not fatal.
//!
//! ```toml
//! start_time = 1700000000
//! candidates = ["vsf1...", "vsf1..."]
//!
//! [open]
//! amount = 100
//! maturity_offset = 3600
//!
//! [[steps]]
//! action = "vote"
//! voter = "0x4141414141414141414141414141414141414141"
//! position = 1
//! weight = 60
//!
//! [[steps]]
//! action = "collect"
//! position = 1
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use vouchsafe_escrow::{
    CandidateProof, Clock, EscrowConfig, EscrowEngine, InMemoryLedger, Ledger, ManualClock, OpenEscrow, UnlockRule,
};
use vouchsafe_types::{Address, Asset, Hash};

use crate::candidates::candidate_tree;

/// Depositor used when a scenario does not name one.
pub const DEFAULT_DEPOSITOR: Address = Address::from_bytes([0x0du8; 20]);

fn default_depositor() -> Address {
    DEFAULT_DEPOSITOR
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Clock value when the escrow is opened
    #[serde(default)]
    pub start_time: u64,
    #[serde(default = "default_depositor")]
    pub depositor: Address,
    /// Depositor's starting balance; defaults to the escrow amount
    #[serde(default)]
    pub funding: Option<u64>,
    /// Candidate set in leaf order
    pub candidates: Vec<Address>,
    pub open: OpenStep,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenStep {
    pub amount: u64,
    #[serde(default)]
    pub maturity_offset: u64,
    /// Token mint; native coin when absent
    #[serde(default)]
    pub mint: Option<Address>,
    #[serde(default)]
    pub unlock: Option<UnlockRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Vote {
        voter: Address,
        position: u64,
        weight: u64,
    },
    Advance {
        seconds: u64,
    },
    Collect {
        position: u64,
        /// Signer; defaults to the candidate at `position`
        #[serde(default)]
        claimant: Option<Address>,
        /// Build the presented path for this position instead
        #[serde(default)]
        proof_for: Option<u64>,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Vote { .. } => "vote",
            Step::Advance { .. } => "advance",
            Step::Collect { .. } => "collect",
        }
    }
}

impl Scenario {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read scenario file '{}': {}", path.display(), e))?;
        let scenario: Scenario = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse scenario file '{}': {}", path.display(), e))?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.candidates.is_empty() {
            anyhow::bail!("scenario has no candidates");
        }

        let size = self.candidates.len() as u64;
        for (index, step) in self.steps.iter().enumerate() {
            if let Step::Collect { position, claimant, proof_for } = step {
                if claimant.is_none() && *position >= size {
                    anyhow::bail!(
                        "step {}: collect at position {} needs a claimant, only {} candidates",
                        index,
                        position,
                        size
                    );
                }
                if proof_for.unwrap_or(*position) >= size {
                    anyhow::bail!("step {}: no proof exists for position {}", index, proof_for.unwrap_or(*position));
                }
            }
        }
        Ok(())
    }
}

/// Result of one replayed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub action: &'static str,
    /// Clock value after the step
    pub time: u64,
    pub ok: bool,
    pub detail: String,
}

/// Final state after a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    pub escrow: Address,
    pub root: Hash,
    pub size: u64,
    pub asset: Asset,
    pub deposited: u64,
    pub quorum: u64,
    pub maturity: u64,
    pub steps: Vec<StepOutcome>,
    pub phase: String,
    pub balance: u64,
    pub total_weight: u64,
    pub recipient: Option<Address>,
}

/// Replay `scenario` against a fresh engine configured by `config`.
pub fn run(scenario: &Scenario, config: &EscrowConfig) -> anyhow::Result<SimulationReport> {
    scenario.validate()?;

    let clock = Arc::new(ManualClock::new(scenario.start_time));
    let ledger = Arc::new(InMemoryLedger::new());
    let engine = EscrowEngine::new(config.clone(), ledger.clone(), clock.clone())?;
    let authority = engine.initialize_custody_authority(&scenario.depositor)?;

    let funding = scenario.funding.unwrap_or(scenario.open.amount);
    let asset = match scenario.open.mint {
        Some(mint) => {
            ledger.fund_token(&scenario.depositor, &mint, funding)?;
            // Every candidate gets a destination account for the mint
            for candidate in &scenario.candidates {
                ledger.fund_token(candidate, &mint, 0)?;
            }
            engine.create_custodial_token_account(&authority, &scenario.depositor, &mint)?;
            Asset::Token { mint }
        }
        None => {
            ledger.credit_native(&scenario.depositor, funding)?;
            Asset::Native
        }
    };

    let tree = candidate_tree(&scenario.candidates)?;
    let mut request = OpenEscrow::native(
        scenario.depositor,
        tree.root(),
        tree.len(),
        scenario.open.amount,
        scenario.open.maturity_offset,
    )
    .with_asset(asset);
    if let Some(unlock) = scenario.open.unlock {
        request = request.with_unlock(unlock);
    }

    let handle = engine.open_escrow(&authority, request).context("opening escrow")?;
    info!("Simulating {} steps against escrow {}", scenario.steps.len(), handle.address);

    let mut outcomes = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        let result = match step {
            Step::Vote { voter, position, weight } => engine
                .vote(voter, &handle.address, *position, *weight)
                .map(|phase| format!("phase {}", phase)),
            Step::Advance { seconds } => Ok(format!("clock at {}", clock.advance(*seconds))),
            Step::Collect { position, claimant, proof_for } => {
                let claimant = match claimant {
                    Some(claimant) => *claimant,
                    None => scenario.candidates[*position as usize],
                };
                let path = tree.path(proof_for.unwrap_or(*position))?;
                let proof = CandidateProof::new(path, *position);
                engine
                    .collect(&authority, &claimant, &handle.address, &proof)
                    .map(|amount| format!("released {} to {}", amount, claimant))
            }
        };

        outcomes.push(StepOutcome {
            index,
            action: step.name(),
            time: clock.now(),
            ok: result.is_ok(),
            detail: result.unwrap_or_else(|e| e.to_string()),
        });
    }

    let escrow = engine
        .escrow(&handle.address)
        .ok_or_else(|| anyhow::anyhow!("escrow {} vanished", handle.address))?;

    Ok(SimulationReport {
        escrow: escrow.address,
        root: escrow.root,
        size: escrow.size,
        asset: escrow.asset,
        deposited: escrow.deposited,
        quorum: escrow.quorum,
        maturity: escrow.maturity,
        steps: outcomes,
        phase: escrow.phase(clock.now()).to_string(),
        balance: escrow.balance,
        total_weight: escrow.tally.total_weight(),
        recipient: escrow.collected.map(|c| c.recipient),
    })
}
