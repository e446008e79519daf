use super::ui;
use crate::core::agent::{CycleOutcome, CycleStatus, NoActionReason};
use crate::core::config::Frequency;
use crate::core::{Agent, CycleRequest};
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;

impl CycleOutcome {
    pub fn display_as_table(&self, frequency: Frequency, currency: &str) -> String {
        let mut output = format!(
            "Investment cycle: {}\n\n",
            ui::style_text(&self.date.to_string(), ui::StyleType::Title)
        );

        for warning in &self.warnings {
            output.push_str(&ui::style_text(
                &format!("Warning: {warning}\n"),
                ui::StyleType::Warning,
            ));
        }

        output.push_str(&format!(
            "Universe: {} ({} instruments)\n",
            self.universe.label(),
            self.universe.len()
        ));

        if let CycleStatus::NoAction(reason) = self.status {
            let message = match reason {
                NoActionReason::EmptyUniverse => {
                    "No instruments matched the selected sectors. Nothing was invested."
                }
                NoActionReason::NoPrices => {
                    "No price data could be fetched. Nothing was invested."
                }
                NoActionReason::ZeroBudget => "Budget is zero. Nothing was invested.",
            };
            output.push_str(&format!(
                "\n{}",
                ui::style_text(message, ui::StyleType::Error)
            ));
            output.push_str(&self.unpriced_lines());
            return output;
        }

        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Symbol"),
            ui::header_cell(&format!("Price ({currency})")),
            ui::header_cell(&format!("Amount ({currency})")),
            ui::header_cell("Shares"),
        ]);
        for allocation in &self.allocations {
            table.add_row(vec![
                Cell::new(&allocation.symbol),
                ui::number_cell(allocation.price, 2),
                ui::number_cell(allocation.amount, 2),
                ui::number_cell(allocation.shares, 4),
            ]);
        }
        output.push('\n');
        output.push_str(&table.to_string());

        let invested: f64 = self.allocations.iter().map(|a| a.amount).sum();
        output.push_str(&format!(
            "\n\nTotal Invested ({}): {}",
            ui::style_text(currency, ui::StyleType::TotalLabel),
            ui::style_text(&format!("{invested:.2}"), ui::StyleType::TotalValue)
        ));
        output.push_str(&self.unpriced_lines());

        if let Some(level) = self.price_level {
            output.push_str(&format!(
                "\n\n{}",
                ui::style_text(level.advice(), ui::StyleType::Subtle)
            ));
        }
        output.push_str(&format!("\n{frequency} investment complete."));
        output
    }

    fn unpriced_lines(&self) -> String {
        if self.unpriced.is_empty() {
            return String::new();
        }
        let mut lines = format!(
            "\n\n{}",
            ui::style_text("Skipped (no price):", ui::StyleType::Error)
        );
        for unpriced in &self.unpriced {
            lines.push_str(&format!("\n  {}: {}", unpriced.symbol, unpriced.reason));
        }
        lines
    }
}

pub async fn run(
    agent: &mut Agent,
    request: &CycleRequest,
    date: NaiveDate,
    frequency: Frequency,
    currency: &str,
) -> Result<()> {
    if agent.taxonomy().is_fallback() {
        println!(
            "{}",
            ui::style_text(
                "Sector discovery unavailable, using the bundled sector list.",
                ui::StyleType::Warning
            )
        );
    }

    let universe = agent.resolve_universe(&request.sectors);
    let pb = ui::new_progress_bar(universe.len() as u64, true);
    pb.set_message("Fetching prices...");
    let outcome = agent.run_cycle(request, date, &|| pb.inc(1)).await;
    pb.finish_and_clear();

    println!("{}", outcome?.display_as_table(frequency, currency));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::allocation::Allocation;
    use crate::core::price::{PriceLevel, Unpriced};
    use crate::core::universe::{InstrumentUniverse, UniverseSource};

    fn outcome(status: CycleStatus) -> CycleOutcome {
        CycleOutcome {
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            budget: 10000.0,
            universe: InstrumentUniverse {
                symbols: ["INFY.NS", "TCS.NS"].iter().map(|s| s.to_string()).collect(),
                source: UniverseSource::Sectors(vec!["technology".to_string()]),
            },
            allocations: vec![
                Allocation {
                    symbol: "INFY.NS".to_string(),
                    price: 2000.0,
                    amount: 5000.0,
                    shares: 2.5,
                },
                Allocation {
                    symbol: "TCS.NS".to_string(),
                    price: 3000.0,
                    amount: 5000.0,
                    shares: 5000.0 / 3000.0,
                },
            ],
            unpriced: Vec::new(),
            price_level: Some(PriceLevel::Elevated),
            status,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_invested_outcome_rounds_for_display() {
        let text = outcome(CycleStatus::Invested).display_as_table(Frequency::Monthly, "INR");

        assert!(text.contains("technology"));
        assert!(text.contains("1.6667"));
        assert!(text.contains("10000.00"));
        assert!(text.contains("consider increasing"));
        assert!(text.contains("Monthly investment complete."));
    }

    #[test]
    fn test_no_action_outcome_lists_unpriced() {
        let mut outcome = outcome(CycleStatus::NoAction(NoActionReason::NoPrices));
        outcome.allocations.clear();
        outcome.unpriced = vec![Unpriced {
            symbol: "TCS.NS".to_string(),
            reason: "No price data found for symbol: TCS.NS".to_string(),
        }];

        let text = outcome.display_as_table(Frequency::Weekly, "INR");
        assert!(text.contains("Nothing was invested"));
        assert!(text.contains("TCS.NS: No price data found"));
        assert!(!text.contains("investment complete"));
    }
}
