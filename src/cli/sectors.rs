use super::ui;
use crate::core::ResolvedTaxonomy;
use crate::core::taxonomy::FALLBACK_VERSION;
use comfy_table::Cell;

impl ResolvedTaxonomy {
    pub fn display_as_table(&self) -> String {
        let source = match self {
            ResolvedTaxonomy::Discovered(_) => "discovered".to_string(),
            ResolvedTaxonomy::Fallback(_) => format!("fallback v{FALLBACK_VERSION}"),
        };
        let mut output = format!(
            "Sectors: {}\n\n",
            ui::style_text(&source, ui::StyleType::Title)
        );

        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Sector"),
            ui::header_cell("Count"),
            ui::header_cell("Symbols"),
        ]);
        for (sector, symbols) in self.taxonomy().sectors() {
            table.add_row(vec![
                Cell::new(sector),
                Cell::new(symbols.len()),
                Cell::new(symbols.join(", ")),
            ]);
        }
        output.push_str(&table.to_string());
        output
    }
}

pub fn run(taxonomy: &ResolvedTaxonomy) {
    println!("{}", taxonomy.display_as_table());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SectorTaxonomy;

    #[test]
    fn test_fallback_is_tagged() {
        let text = ResolvedTaxonomy::Fallback(SectorTaxonomy::fallback()).display_as_table();
        assert!(text.contains("fallback v2024.1"));
        assert!(text.contains("banking"));
        assert!(text.contains("HDFCBANK.NS"));
    }

    #[test]
    fn test_discovered_is_tagged() {
        let taxonomy = SectorTaxonomy::from_pairs([("energy", "RELIANCE.NS")]);
        let text = ResolvedTaxonomy::Discovered(taxonomy).display_as_table();
        assert!(text.contains("discovered"));
        assert!(text.contains("RELIANCE.NS"));
    }
}
