//! Output formatting utilities.
//!
//! Pretty printing for CLI commands.

use colored::Colorize;
use fabula_governance::{Ballot, Outcome, TallySnapshot, VoteDirection, VotingPower};
use fabula_types::time::format_remaining;
use fabula_types::TokenAmount;
use tabled::{Table, Tabled};

/// Format a token amount with thousands separators.
pub fn format_tokens(amount: TokenAmount) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format a percentage with one decimal.
pub fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Print success message.
pub fn print_success(msg: &str) {
    println!("{}", format!("✓ {}", msg).green());
}

/// Print error message.
pub fn print_error(msg: &str) {
    eprintln!("{}", format!("✗ {}", msg).red());
}

/// Print warning message.
pub fn print_warning(msg: &str) {
    println!("{}", format!("⚠ {}", msg).yellow());
}

/// Print info message.
pub fn print_info(msg: &str) {
    println!("{}", format!("ℹ {}", msg).blue());
}

/// Print a voter's power.
pub fn print_power(power: &VotingPower) {
    println!("{}", "Voting Power".bold());
    println!("{}", "=".repeat(50));
    println!("Balance:     {}", format_tokens(power.total_tokens).bright_green());
    println!("Committed:   {}", format_tokens(power.used_tokens).bright_yellow());
    println!("Available:   {}", format_tokens(power.available_tokens).bright_cyan());
    println!("Max weight:  {}", power.max_weight.to_string().bright_magenta());
}

/// Print an accepted ballot.
pub fn print_ballot(ballot: &Ballot) {
    let direction = match ballot.direction() {
        VoteDirection::For => "for".green(),
        VoteDirection::Against => "against".red(),
        VoteDirection::Abstain => "abstain".yellow(),
    };
    print_success(&format!(
        "{} voted {} {} with weight {} ({} tokens)",
        ballot.voter(),
        direction,
        ballot.proposal_id(),
        ballot.weight(),
        format_tokens(ballot.tokens_used())
    ));
}

/// Print a round outcome.
pub fn print_outcome(round: &str, outcome: &Outcome) {
    match outcome {
        Outcome::Passed { winner } => {
            print_success(&format!("Round {} passed, winner {}", round, winner.as_str().bold()))
        }
        Outcome::Rejected => print_warning(&format!("Round {} rejected: no majority", round)),
        Outcome::Expired => print_warning(&format!("Round {} expired: quorum not reached", round)),
    }
}

/// Print a tally with one row per proposal.
pub fn print_tally(tally: &TallySnapshot, remaining_secs: u64) {
    #[derive(Tabled)]
    struct ProposalRow {
        proposal: String,
        #[tabled(rename = "for")]
        for_votes: u64,
        #[tabled(rename = "against")]
        against_votes: u64,
        #[tabled(rename = "abstain")]
        abstain_votes: u64,
        voters: u32,
        tokens: String,
        support: String,
    }

    println!("{}", format!("Round {} ({:?})", tally.round_id, tally.phase).bold());
    println!("{}", "=".repeat(50));

    let rows: Vec<ProposalRow> = tally
        .proposals
        .iter()
        .map(|p| ProposalRow {
            proposal: p.proposal_id.to_string(),
            for_votes: p.for_votes,
            against_votes: p.against_votes,
            abstain_votes: p.abstain_votes,
            voters: p.voters,
            tokens: format_tokens(p.tokens_used),
            support: format_percentage(p.support_percentage()),
        })
        .collect();
    println!("{}", Table::new(rows));

    let quorum = if tally.quorum_reached {
        "reached".green()
    } else {
        "not reached".red()
    };
    println!(
        "Total weight: {}  Support: {}  Voters: {}",
        tally.total.to_string().bright_cyan(),
        format_percentage(tally.support_percentage).bright_green(),
        tally.participants
    );
    println!("Quorum:       {} / {} ({})", tally.total, tally.quorum_threshold, quorum);
    println!("Remaining:    {}", format_remaining(remaining_secs));
}
