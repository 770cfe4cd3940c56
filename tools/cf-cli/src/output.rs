//! Plain-text rendering of engine values.

use std::fmt::Write;

use cf_funding_engine::{
    Amount, ContributionSummary, CurrencyPair, DonorPosition, ExchangeRate, Project, Receipt,
};
use rust_decimal::Decimal;

/// Renders amounts natively and, with a rate, in the display currency.
pub struct Renderer<F: Fn(Amount) -> Option<Decimal>> {
    convert: F,
    pair: CurrencyPair,
}

impl<F: Fn(Amount) -> Option<Decimal>> Renderer<F> {
    /// Renderer using `convert` for display amounts.
    pub fn new(convert: F, pair: CurrencyPair) -> Self {
        Self { convert, pair }
    }

    /// `123 (0.25 EUR)` or just `123` without a rate.
    pub fn amount(&self, amount: Amount) -> String {
        match (self.convert)(amount) {
            Some(display) => format!("{} ({} {})", amount, display.round_dp(2), self.pair.quote),
            None => amount.to_string(),
        }
    }

    /// One-line project summary.
    pub fn project_line(&self, project: &Project) -> String {
        format!(
            "#{:<4} {:<24} {} raised {} / {} [{}]",
            project.id,
            project.name,
            project.owner,
            self.amount(project.raised_amount),
            self.amount(project.goal_amount),
            if project.is_active { "active" } else { "inactive" },
        )
    }

    /// Project with its milestones.
    pub fn project_detail(&self, project: &Project) -> String {
        let mut out = self.project_line(project);
        let _ = write!(out, "\n      unallocated {}", self.amount(project.unallocated()));
        for m in &project.milestones {
            let _ = write!(
                out,
                "\n  [{}] {:<32} {} / {}{}",
                m.index,
                m.description,
                self.amount(m.raised_amount),
                self.amount(m.target_amount),
                if m.is_completed() { "  completed" } else { "" },
            );
        }
        out
    }

    /// Contribution breakdown.
    pub fn contributions(&self, summary: &ContributionSummary) -> String {
        let mut out = format!(
            "project #{} total {}",
            summary.project_id,
            self.amount(summary.total)
        );
        for (index, amount) in summary.per_milestone.iter().enumerate() {
            let _ = write!(out, "\n  [{}] {}", index, self.amount(*amount));
        }
        if !summary.is_consistent() {
            let _ = write!(out, "\n  (per-milestone sum differs; ledger still settling)");
        }
        out
    }

    /// Donor position line.
    pub fn position(&self, position: &DonorPosition) -> String {
        format!(
            "#{:<4} {:<24} donated {}",
            position.project.id,
            position.project.name,
            self.amount(position.donated)
        )
    }
}

/// Confirmed write.
pub fn receipt(receipt: &Receipt) -> String {
    let mut out = format!(
        "confirmed tx 0x{} in block {}",
        hex::encode(receipt.tx_hash),
        receipt.block_number
    );
    if let Some(id) = receipt.project_id {
        let _ = write!(out, " (project #{})", id);
    }
    out
}

/// Exchange rate line.
pub fn rate(rate: &ExchangeRate) -> String {
    format!("1 {} = {} {} (as of {})", rate.pair.base, rate.rate, rate.pair.quote, rate.fetched_at)
}
