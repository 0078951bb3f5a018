//! Output formatting utilities.

use colored::Colorize;
use vouchsafe_crypto::MerkleProof;
use vouchsafe_types::Hash;

use crate::scenario::SimulationReport;

/// Print success message.
pub fn print_success(msg: &str) {
    println!("{}", format!("✓ {}", msg).green());
}

/// Print error message.
pub fn print_error(msg: &str) {
    eprintln!("{}", format!("✗ {}", msg).red());
}

/// Print info message.
pub fn print_info(msg: &str) {
    println!("{}", format!("ℹ {}", msg).blue());
}

/// Format hash for display.
pub fn format_hash(hash: &Hash) -> String {
    hash.to_string()
}

/// Shorten a long identifier to `head...tail`.
pub fn format_short(value: &str) -> String {
    if value.len() > 20 {
        format!("{}...{}", &value[..12], &value[value.len() - 6..])
    } else {
        value.to_string()
    }
}

/// Print a proof summary.
pub fn print_proof_summary(proof: &MerkleProof) {
    println!("{}", "Merkle Proof".bold());
    println!("{}", "=".repeat(50));
    println!("Leaf:      {}", format_hash(&proof.leaf).bright_cyan());
    println!("Position:  {}", proof.position.to_string().bright_green());
    println!("Depth:     {}", proof.depth());
}

/// Print a simulation report.
pub fn print_report(report: &SimulationReport) {
    println!("{}", "Simulation".bold());
    println!("{}", "=".repeat(50));
    println!("Escrow:    {}", report.escrow.to_string().bright_cyan());
    println!("Root:      {}", format_short(&format_hash(&report.root)));
    println!("Asset:     {}", report.asset);
    println!("Deposited: {}", report.deposited);
    println!("Quorum:    {}", report.quorum);
    println!("Maturity:  {}", report.maturity);
    println!();

    for step in &report.steps {
        let marker = if step.ok { "✓".green() } else { "✗".red() };
        println!(
            "{} [{:>3}] t={} {:<8} {}",
            marker, step.index, step.time, step.action, step.detail
        );
    }

    println!();
    println!("Phase:     {}", report.phase.bright_yellow());
    println!("Balance:   {}", report.balance);
    println!("Weight:    {}", report.total_weight);
    if let Some(recipient) = &report.recipient {
        println!("Recipient: {}", recipient.to_string().bright_green());
    }
}
