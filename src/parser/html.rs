// HTML table extraction shared by the legislator disclosure parsers

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("valid selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static HEADER_CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("th").expect("valid selector"));
static DATA_CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("valid selector"));

/// One `<table>`: lowercased header texts plus the text of each data row
#[derive(Debug, Clone, Default)]
pub(crate) struct HtmlTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl HtmlTable {
    /// Any header containing any of `keywords`
    pub fn header_mentions(&self, keywords: &[&str]) -> bool {
        self.headers
            .iter()
            .any(|h| keywords.iter().any(|k| h.contains(k)))
    }

    /// First column whose header contains one of `include` and none of
    /// `exclude`
    pub fn column(&self, include: &[&str], exclude: &[&str]) -> Option<usize> {
        self.headers.iter().position(|h| {
            include.iter().any(|k| h.contains(k)) && !exclude.iter().any(|k| h.contains(k))
        })
    }
}

/// Collapse runs of whitespace; `get_text(strip=True)` semantics
pub(crate) fn element_text(el: &ElementRef) -> String {
    el.text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// All tables in document order. Header texts come from `<th>` cells; rows
/// are the `<tr>`s that carry `<td>` cells.
pub(crate) fn extract_tables(document: &Html) -> Vec<HtmlTable> {
    document
        .select(&TABLE)
        .map(|table| {
            let headers = table
                .select(&HEADER_CELL)
                .map(|th| element_text(&th).to_lowercase())
                .collect();

            let rows = table
                .select(&ROW)
                .map(|tr| tr.select(&DATA_CELL).map(|td| element_text(&td)).collect::<Vec<_>>())
                .filter(|cells: &Vec<String>| !cells.is_empty())
                .collect();

            HtmlTable { headers, rows }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tables() {
        let doc = Html::parse_document(
            "<table><tr><th> Asset </th><th>Value</th></tr>
                    <tr><td>Apple   Inc</td><td>$1,001 - $15,000</td></tr>
                    <tr></tr></table>
             <table><tr><td>only data</td></tr></table>",
        );
        let tables = extract_tables(&doc);

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].headers, vec!["asset", "value"]);
        assert_eq!(tables[0].rows, vec![vec!["Apple Inc", "$1,001 - $15,000"]]);
        assert_eq!(tables[0].column(&["value"], &[]), Some(1));
        assert_eq!(tables[0].column(&["asset"], &["asset"]), None);
        assert!(tables[1].headers.is_empty());
        assert_eq!(tables[1].rows.len(), 1);
    }
}
