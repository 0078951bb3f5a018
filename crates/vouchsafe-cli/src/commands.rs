//! CLI command implementations.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};
use vouchsafe_crypto::{CryptoError, MerkleProof};
use vouchsafe_types::Hash;

use crate::candidates::{candidate_tree, load_candidates};
use crate::config::CliConfig;
use crate::output::*;
use crate::scenario::{self, Scenario, SimulationReport};

/// Main CLI.
#[derive(Parser, Debug)]
#[command(name = "vouchsafe")]
#[command(about = "Vouchsafe - quorum-gated Merkle escrow tooling")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Config file path
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level or filter directives (overrides the config file)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the Merkle root of a candidate file
    Root {
        /// Candidate file, one address per line
        #[arg(long, value_name = "FILE")]
        candidates: PathBuf,
    },
    /// Print the inclusion proof for one candidate as JSON
    Proof {
        /// Candidate file, one address per line
        #[arg(long, value_name = "FILE")]
        candidates: PathBuf,
        /// Zero-based candidate position
        #[arg(long)]
        position: u64,
        /// Write the proof to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Verify a JSON proof against a root
    Verify {
        /// Proof file produced by `proof`
        #[arg(long, value_name = "FILE")]
        proof: PathBuf,
        /// Expected root (0x-prefixed hex)
        #[arg(long)]
        root: String,
        /// Candidate-set size; binds the proof to its position
        #[arg(long)]
        size: Option<u64>,
    },
    /// Replay an escrow scenario against an in-memory ledger
    Simulate {
        /// Scenario file (TOML)
        #[arg(long, value_name = "FILE")]
        scenario: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Root of a candidate file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootSummary {
    pub root: Hash,
    pub size: u64,
    pub depth: usize,
}

/// Outcome of `verify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    /// Path folds to a different root, or is shaped for another position
    Mismatch,
    /// Path length does not fit a set of the given size
    Malformed { expected: usize, actual: usize },
}

/// Execute a CLI command.
pub fn execute(cmd: Commands, config: &CliConfig) -> anyhow::Result<()> {
    match cmd {
        Commands::Root { candidates } => {
            let summary = compute_root(&candidates)?;
            println!("{}", summary.root);
            print_info(&format!("{} candidates, depth {}", summary.size, summary.depth));
            Ok(())
        }
        Commands::Proof { candidates, position, output } => {
            let proof = build_proof(&candidates, position)?;
            let json = serde_json::to_string_pretty(&proof)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .map_err(|e| anyhow::anyhow!("Failed to write proof '{}': {}", path.display(), e))?;
                    print_proof_summary(&proof);
                    print_success(&format!("Proof written to {}", path.display()));
                }
                None => println!("{}", json),
            }
            Ok(())
        }
        Commands::Verify { proof, root, size } => {
            let root = parse_hash(&root)?;
            let proof = load_proof(&proof)?;
            match verify_proof(&proof, &root, size) {
                Verdict::Valid => {
                    print_success(&format!("Proof for position {} is valid", proof.position));
                    Ok(())
                }
                Verdict::Mismatch => anyhow::bail!("Proof does not match root {}", root),
                Verdict::Malformed { expected, actual } => {
                    anyhow::bail!("Malformed proof: expected {} siblings, got {}", expected, actual)
                }
            }
        }
        Commands::Simulate { scenario, json } => {
            let report = simulate(&scenario, config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(())
        }
    }
}

/// Root, size and depth of the tree over a candidate file.
pub fn compute_root(candidates: &Path) -> anyhow::Result<RootSummary> {
    let candidates = load_candidates(candidates)?;
    let tree = candidate_tree(&candidates)?;
    debug!("Built tree over {} candidates", tree.len());

    Ok(RootSummary {
        root: tree.root(),
        size: tree.len(),
        depth: tree.depth(),
    })
}

/// Inclusion proof for the candidate at `position`.
pub fn build_proof(candidates: &Path, position: u64) -> anyhow::Result<MerkleProof> {
    let candidates = load_candidates(candidates)?;
    let tree = candidate_tree(&candidates)?;
    tree.proof(position)
        .with_context(|| format!("no candidate at position {}", position))
}

/// Read a JSON proof.
pub fn load_proof(path: &Path) -> anyhow::Result<MerkleProof> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read proof file '{}': {}", path.display(), e))?;
    serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse proof file '{}': {}", path.display(), e))
}

/// Check `proof` against `root`. With a size the path must also be shaped
/// for the proof's position.
pub fn verify_proof(proof: &MerkleProof, root: &Hash, size: Option<u64>) -> Verdict {
    let Some(size) = size else {
        return if proof.verify(root) {
            Verdict::Valid
        } else {
            Verdict::Mismatch
        };
    };

    match proof.check(root, size) {
        Ok(()) => Verdict::Valid,
        Err(CryptoError::MalformedProof { expected, actual }) => Verdict::Malformed { expected, actual },
        Err(_) => Verdict::Mismatch,
    }
}

/// Run a scenario file with the configured engine.
pub fn simulate(path: &Path, config: &CliConfig) -> anyhow::Result<SimulationReport> {
    let scenario = Scenario::from_file(path)?;
    info!("Loaded scenario {} with {} candidates", path.display(), scenario.candidates.len());
    scenario::run(&scenario, &config.escrow)
}

/// Parse hash string.
fn parse_hash(s: &str) -> anyhow::Result<Hash> {
    Hash::from_str(s.trim()).map_err(|e| anyhow::anyhow!("Invalid root '{}': {}", s, e))
}
