use super::ui;
use crate::core::Agent;
use crate::core::PortfolioSummary;
use crate::core::config::Frequency;
use anyhow::Result;
use comfy_table::{Cell, Color};

impl PortfolioSummary {
    pub fn display_as_table(&self, frequency: Frequency, currency: &str) -> String {
        let mut output = format!(
            "{}\n\n",
            ui::style_text("Portfolio Summary", ui::StyleType::Title)
        );

        for warning in &self.warnings {
            output.push_str(&ui::style_text(
                &format!("Warning: {warning}\n"),
                ui::StyleType::Warning,
            ));
        }

        if self.holdings.is_empty() {
            output.push_str("No holdings yet. Run `invest` to start a cycle.");
            return output;
        }

        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Symbol"),
            ui::header_cell("Shares"),
            ui::header_cell(&format!("Price ({currency})")),
            ui::header_cell(&format!("Value ({currency})")),
        ]);
        for holding in &self.holdings {
            let symbol = if holding.error.is_some() {
                Cell::new(&holding.symbol).fg(Color::Red)
            } else {
                Cell::new(&holding.symbol)
            };
            table.add_row(vec![
                symbol,
                ui::number_cell(holding.shares, 4),
                ui::format_optional_cell(holding.price, |p| format!("{p:.2}")),
                ui::format_optional_cell(holding.value, |v| format!("{v:.2}")),
            ]);
        }
        output.push_str(&table.to_string());

        output.push_str(&format!(
            "\n\nTotal Value ({}): {}",
            ui::style_text(currency, ui::StyleType::TotalLabel),
            ui::style_text(&format!("{:.2}", self.total_value), ui::StyleType::TotalValue)
        ));
        output.push_str(&format!(
            "\nTotal Invested ({currency}): {:.2}",
            self.total_invested
        ));
        if let Some((symbol, shares)) = &self.largest_holding {
            output.push_str(&format!("\nLargest Holding: {symbol} ({shares:.4} shares)"));
        }
        output.push_str(&format!(
            "\nTransactions: {} over {} runs",
            self.transactions, self.run_days
        ));
        if let Some(last_run) = self.last_run {
            output.push_str(&format!("\nLast Run: {last_run}"));
            if let Some(next) = frequency.next_due(last_run) {
                output.push_str(&format!(
                    "\n{}",
                    ui::style_text(
                        &format!("Next {} investment due: {next}", frequency.to_string().to_lowercase()),
                        ui::StyleType::Subtle
                    )
                ));
            }
        }

        let failed: Vec<&str> = self
            .holdings
            .iter()
            .filter(|h| h.error.is_some())
            .map(|h| h.symbol.as_str())
            .collect();
        if !failed.is_empty() {
            output.push_str(&format!(
                "\n\n{}",
                ui::style_text(
                    &format!("Could not price: {}", failed.join(", ")),
                    ui::StyleType::Error
                )
            ));
        }
        output
    }
}

pub async fn run(agent: &Agent, frequency: Frequency, currency: &str) -> Result<()> {
    let pb = ui::new_progress_bar(agent.ledger().len() as u64, true);
    pb.set_message("Fetching prices...");
    let summary = agent.summary(&|| pb.inc(1)).await;
    pb.finish_and_clear();

    println!("{}", summary.display_as_table(frequency, currency));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::agent::HoldingValue;
    use chrono::NaiveDate;

    fn summary() -> PortfolioSummary {
        PortfolioSummary {
            holdings: vec![
                HoldingValue {
                    symbol: "INFY.NS".to_string(),
                    shares: 5.0,
                    price: Some(2100.0),
                    value: Some(10500.0),
                    error: None,
                },
                HoldingValue {
                    symbol: "TCS.NS".to_string(),
                    shares: 2.5,
                    price: None,
                    value: None,
                    error: Some("HTTP error: 404 Not Found for symbol: TCS.NS".to_string()),
                },
            ],
            total_value: 10500.0,
            largest_holding: Some(("INFY.NS".to_string(), 5.0)),
            transactions: 4,
            run_days: 2,
            total_invested: 20000.0,
            last_run: NaiveDate::from_ymd_opt(2025, 1, 31),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_summary_shows_totals_and_next_due() {
        let text = summary().display_as_table(Frequency::Monthly, "INR");

        assert!(text.contains("10500.00"));
        assert!(text.contains("20000.00"));
        assert!(text.contains("Largest Holding: INFY.NS (5.0000 shares)"));
        assert!(text.contains("Transactions: 4 over 2 runs"));
        assert!(text.contains("Next monthly investment due: 2025-02-28"));
        assert!(text.contains("Could not price: TCS.NS"));
    }

    #[test]
    fn test_empty_summary() {
        let empty = PortfolioSummary {
            holdings: Vec::new(),
            total_value: 0.0,
            largest_holding: None,
            transactions: 0,
            run_days: 0,
            total_invested: 0.0,
            last_run: None,
            warnings: Vec::new(),
        };
        assert!(
            empty
                .display_as_table(Frequency::Daily, "INR")
                .contains("No holdings yet")
        );
    }
}
