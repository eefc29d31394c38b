// src/extractors/table.rs

// --- Imports ---
use std::collections::HashSet;

use once_cell::sync::Lazy;
use scraper::{node::Node, ElementRef, Html, Selector};

use crate::utils::error::ExtractError;

// --- Constants ---
/// Column used to recognise header rows repeated inside the body.
pub const DEFAULT_PRIMARY_KEY: &str = "Player";
/// Name given to blank header cells; columns containing it are dropped.
pub const DEFAULT_PLACEHOLDER_MARKER: &str = "Unnamed";
// Grouping row above the real header on the site's wider tables
const OVER_HEADER_CLASS: &str = "over_header";
const MAX_COLSPAN: usize = 64;

// --- CSS Selectors (Lazy Static) ---
static TABLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("table").expect("Failed to compile TABLE_SELECTOR")
});

// --- Data Structures ---

/// A table of string cells with one ordered list of column names shared by
/// every row. Each row holds exactly one cell per column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl StatTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell of `row` under column `name`.
    #[allow(dead_code)]
    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let col = self.column_index(name)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    /// Column name / cell pairs of one row, in column order.
    #[allow(dead_code)]
    pub fn record(&self, row: usize) -> Option<impl Iterator<Item = (&str, &str)> + '_> {
        let cells = self.rows.get(row)?;
        Some(self.columns.iter().map(String::as_str).zip(cells.iter().map(String::as_str)))
    }

    /// Appends a row, padding with empty cells or truncating to the column count.
    pub fn push_row(&mut self, mut cells: Vec<String>) {
        cells.resize(self.columns.len(), String::new());
        self.rows.push(cells);
    }

    /// Keeps only the columns for which `keep` returns true, preserving order.
    pub fn retain_columns<F: FnMut(&str) -> bool>(&mut self, mut keep: F) {
        let mask: Vec<bool> = self.columns.iter().map(|c| keep(c.as_str())).collect();
        if mask.iter().all(|&k| k) {
            return;
        }
        let filter = |values: &mut Vec<String>| {
            let mut i = 0;
            values.retain(|_| {
                let k = mask[i];
                i += 1;
                k
            });
        };
        filter(&mut self.columns);
        for row in &mut self.rows {
            filter(row);
        }
    }

    /// Sets `name` to `value` on every row, as the last column. An existing
    /// column of the same name is replaced.
    pub fn set_constant_column(&mut self, name: &str, value: &str) {
        self.retain_columns(|c| c != name);
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(value.to_string());
        }
    }

    /// Concatenates tables row-wise. Columns are unioned in order of first
    /// appearance, except that `trailing` columns always come last in the
    /// given order. Cells a table does not have are left empty.
    /// Returns `None` for an empty input.
    pub fn concat(tables: Vec<StatTable>, trailing: &[&str]) -> Option<StatTable> {
        if tables.is_empty() {
            return None;
        }

        let mut columns: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for table in &tables {
            for col in &table.columns {
                if !trailing.contains(&col.as_str()) && seen.insert(col.as_str()) {
                    columns.push(col.clone());
                }
            }
        }
        for name in trailing {
            if tables.iter().any(|t| t.column_index(name).is_some()) {
                columns.push(name.to_string());
            }
        }

        let mut combined = StatTable::new(columns);
        for table in tables {
            let positions: Vec<Option<usize>> =
                combined.columns.iter().map(|c| table.column_index(c)).collect();
            for mut row in table.rows {
                let cells = positions
                    .iter()
                    .map(|pos| pos.map(|i| std::mem::take(&mut row[i])).unwrap_or_default())
                    .collect();
                combined.rows.push(cells);
            }
        }
        Some(combined)
    }
}

// --- Main Extractor Structure ---
/// Locates the first `<table>` of a page and normalizes it into a [`StatTable`].
#[derive(Debug, Clone)]
pub struct TableExtractor {
    primary_key: String,
    placeholder_marker: String,
}

impl Default for TableExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TableExtractor {
    pub fn new() -> Self {
        Self {
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            placeholder_marker: DEFAULT_PLACEHOLDER_MARKER.to_string(),
        }
    }

    /// Overrides the column used to detect repeated header rows.
    pub fn with_primary_key(mut self, column: &str) -> Self {
        column.clone_into(&mut self.primary_key);
        self
    }

    /// Overrides the marker identifying unlabeled columns.
    #[allow(dead_code)]
    pub fn with_placeholder_marker(mut self, marker: &str) -> Self {
        marker.clone_into(&mut self.placeholder_marker);
        self
    }

    /// Extracts and normalizes the first table of `html`.
    ///
    /// Repeated header rows are removed, `<br>` inside cells becomes `\n` and
    /// unlabeled columns are dropped. Every cell is kept as text.
    pub fn extract_table(&self, html: &str) -> Result<StatTable, ExtractError> {
        // 1. Parse the HTML document and find the first table in document order
        let document = Html::parse_document(html);
        let table = document
            .select(&TABLE_SELECTOR)
            .next()
            .ok_or(ExtractError::TableNotFound)?;

        // 2. Split rows into header candidates and body rows
        let (head_rows, mut body_rows) = self.table_rows(table);

        // 3. Pick the header row and name the columns
        let header = match head_rows.iter().find(|row| !is_over_header(**row)) {
            Some(row) => Some(*row),
            None => head_rows.last().copied(),
        };
        let header = header.or_else(|| {
            let pos = body_rows.iter().position(|row| is_header_only(*row))?;
            body_rows.drain(..=pos).last()
        });

        let columns = match header {
            Some(row) => self.column_names(row),
            None => {
                // No header at all: positional names, like a headerless CSV
                let width = body_rows.iter().map(|r| expanded_cells(*r).len()).max().unwrap_or(0);
                (0..width).map(|i| i.to_string()).collect()
            }
        };
        tracing::debug!("Table header: {:?}", columns);

        // 4. Parse data rows, skipping repeated headers and grouping rows
        let key_index = columns.iter().position(|c| *c == self.primary_key);
        if key_index.is_none() {
            tracing::debug!("No '{}' column; repeated-header check skipped", self.primary_key);
        }

        let mut table_out = StatTable::new(columns);
        let mut repeated_headers = 0usize;
        for row in body_rows {
            if is_over_header(row) {
                repeated_headers += 1;
                continue;
            }
            let cells = expanded_cells(row);
            if cells.is_empty() {
                continue;
            }
            if let Some(idx) = key_index {
                if cells.get(idx).map(String::as_str) == Some(self.primary_key.as_str()) {
                    repeated_headers += 1;
                    continue;
                }
            }
            if cells.len() > table_out.columns().len() {
                tracing::debug!(
                    "Row has {} cells for {} columns; dropping the surplus",
                    cells.len(),
                    table_out.columns().len()
                );
            }
            table_out.push_row(cells);
        }

        // 5. Drop unlabeled columns
        let before = table_out.columns().len();
        table_out.retain_columns(|name| !name.contains(self.placeholder_marker.as_str()));

        tracing::debug!(
            "Extracted table: {} rows x {} columns ({} repeated headers, {} unlabeled columns removed)",
            table_out.len(),
            table_out.columns().len(),
            repeated_headers,
            before - table_out.columns().len()
        );
        Ok(table_out)
    }

    /// Returns (`<thead>` rows, all other rows) of a table, in document order.
    /// Only the table's own sections are visited so nested tables are ignored.
    fn table_rows<'a>(&self, table: ElementRef<'a>) -> (Vec<ElementRef<'a>>, Vec<ElementRef<'a>>) {
        let mut head = Vec::new();
        let mut body = Vec::new();
        for section in table.children().filter_map(ElementRef::wrap) {
            match section.value().name() {
                "thead" => head.extend(child_rows(section)),
                "tbody" | "tfoot" => body.extend(child_rows(section)),
                "tr" => body.push(section),
                _ => {}
            }
        }
        (head, body)
    }

    /// Column names from a header row: blanks become `Unnamed: {i}`,
    /// duplicates get `.1`, `.2`, ... suffixes.
    fn column_names(&self, header: ElementRef) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for (i, raw) in expanded_cells(header).into_iter().enumerate() {
            let base = if raw.is_empty() {
                format!("{}: {}", self.placeholder_marker, i)
            } else {
                raw
            };
            let mut name = base.clone();
            let mut n = 0;
            while names.contains(&name) {
                n += 1;
                name = format!("{}.{}", base, n);
            }
            names.push(name);
        }
        names
    }
}

// --- Helpers ---

fn child_rows<'a>(section: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    section
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "tr")
}

fn row_cells<'a>(row: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
}

fn is_over_header(row: ElementRef) -> bool {
    row.value()
        .attr("class")
        .is_some_and(|classes| classes.split_whitespace().any(|c| c == OVER_HEADER_CLASS))
}

fn is_header_only(row: ElementRef) -> bool {
    let mut cells = row_cells(row).peekable();
    cells.peek().is_some() && cells.all(|c| c.value().name() == "th")
}

/// Cell texts of a row with `colspan` cells repeated once per spanned column.
fn expanded_cells(row: ElementRef) -> Vec<String> {
    let mut out = Vec::new();
    for cell in row_cells(row) {
        let span = cell
            .value()
            .attr("colspan")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_COLSPAN);
        let text = cell_text(cell);
        out.extend(std::iter::repeat(text).take(span));
    }
    out
}

/// Text of a cell with each `<br>` turned into `\n`. Runs of source
/// whitespace collapse to one space; spaces around line breaks and at the
/// ends are trimmed.
fn cell_text(cell: ElementRef) -> String {
    let mut raw = String::new();
    let mut prev_space = true;
    for node in cell.descendants() {
        match node.value() {
            Node::Text(text) => {
                for c in text.chars() {
                    if c.is_whitespace() {
                        if !prev_space {
                            raw.push(' ');
                            prev_space = true;
                        }
                    } else {
                        raw.push(c);
                        prev_space = false;
                    }
                }
            }
            Node::Element(el) if el.name() == "br" => {
                raw.push('\n');
                prev_space = true;
            }
            _ => {} // Ignore comments, etc.
        }
    }

    raw.split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn page(table: &str) -> String {
        format!(
            "<!DOCTYPE html><html><head><title>2020 WNBA Player Stats</title></head><body>\
             <div id=\"content\"><h1>2020 WNBA Player Stats: Per 100 Poss</h1>{}</div></body></html>",
            table
        )
    }

    #[test]
    fn test_no_table_is_table_not_found() {
        let extractor = TableExtractor::new();
        let result = extractor.extract_table("<html><body><p>Page not found</p></body></html>");
        assert!(matches!(result, Err(ExtractError::TableNotFound)));
        assert!(matches!(extractor.extract_table(""), Err(ExtractError::TableNotFound)));
    }

    #[test]
    fn test_repeated_header_rows_are_dropped() {
        let html = page(
            r#"<table id="per_poss">
                <thead><tr><th>Rk</th><th>Player</th><th>PTS</th></tr></thead>
                <tbody>
                  <tr><th>1</th><td>A. Wilson</td><td>22</td></tr>
                  <tr class="thead"><th>Rk</th><th>Player</th><th>PTS</th></tr>
                  <tr><th>2</th><td>B. Stewart</td><td>19</td></tr>
                </tbody>
              </table>"#,
        );
        let table = TableExtractor::new().extract_table(&html).unwrap();
        assert_eq!(table.columns(), ["Rk", "Player", "PTS"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "Player"), Some("A. Wilson"));
        assert_eq!(table.cell(0, "PTS"), Some("22"));
        assert_eq!(table.cell(1, "Player"), Some("B. Stewart"));
    }

    #[test]
    fn test_unnamed_columns_are_removed_in_order() {
        let html = page(
            r#"<table>
                <thead><tr><th>Player</th><th></th><th>G</th><th>Unnamed: 5</th><th>PTS</th></tr></thead>
                <tbody><tr><td>A. Wilson</td><td>x</td><td>22</td><td></td><td>20.5</td></tr></tbody>
              </table>"#,
        );
        let table = TableExtractor::new().extract_table(&html).unwrap();
        assert_eq!(table.columns(), ["Player", "G", "PTS"]);
        assert_eq!(table.rows()[0], ["A. Wilson", "22", "20.5"]);
    }

    #[test]
    fn test_line_breaks_become_newlines() {
        let html = page(
            r#"<table>
                <thead><tr><th>Player</th><th>Pos</th></tr></thead>
                <tbody><tr><td>C. Parker</td><td>F<br>C</td></tr>
                       <tr><td>D. Taurasi</td><td> G <br/> F </td></tr></tbody>
              </table>"#,
        );
        let table = TableExtractor::new().extract_table(&html).unwrap();
        assert_eq!(table.cell(0, "Pos"), Some("F\nC"));
        assert_eq!(table.cell(1, "Pos"), Some("G\nF"));
    }

    #[test]
    fn test_cell_text_collapses_source_whitespace() {
        let html = page(
            "<table><thead><tr><th>Player</th><th>Team</th></tr></thead>\
             <tbody><tr><td>\n   <a href=\"/wnba/players/w/wilsoa01w.html\">A&#39;ja\n Wilson</a>\n</td>\
             <td><!-- tm -->LVA</td></tr></tbody></table>",
        );
        let table = TableExtractor::new().extract_table(&html).unwrap();
        assert_eq!(table.cell(0, "Player"), Some("A'ja Wilson"));
        assert_eq!(table.cell(0, "Team"), Some("LVA"));
    }

    #[test]
    fn test_header_only_table_has_zero_rows() {
        let html = page("<table><thead><tr><th>Player</th><th>PTS</th></tr></thead><tbody></tbody></table>");
        let table = TableExtractor::new().extract_table(&html).unwrap();
        assert_eq!(table.columns(), ["Player", "PTS"]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_missing_primary_key_skips_dedup() {
        let html = page(
            r#"<table><thead><tr><th>Team</th><th>W</th></tr></thead>
               <tbody><tr><td>Player</td><td>Player</td></tr><tr><td>LVA</td><td>18</td></tr></tbody></table>"#,
        );
        let table = TableExtractor::new().extract_table(&html).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "Team"), Some("Player"));
    }

    #[test]
    fn test_custom_primary_key() {
        let html = page(
            r#"<table><thead><tr><th>Team</th><th>W</th></tr></thead>
               <tbody><tr><td>LVA</td><td>18</td></tr><tr><th>Team</th><th>W</th></tr></tbody></table>"#,
        );
        let table = TableExtractor::new().with_primary_key("Team").extract_table(&html).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_first_table_wins() {
        let html = page(
            r#"<table><thead><tr><th>Player</th></tr></thead><tbody><tr><td>First</td></tr></tbody></table>
               <table><thead><tr><th>Player</th></tr></thead><tbody><tr><td>Second</td></tr></tbody></table>"#,
        );
        let table = TableExtractor::new().extract_table(&html).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.cell(0, "Player"), Some("First"));
    }

    #[test]
    fn test_over_header_row_is_skipped() {
        let html = page(
            r#"<table><thead>
                 <tr class="over_header"><th colspan="2"></th><th colspan="2">Shooting</th></tr>
                 <tr><th>Player</th><th>Team</th><th>FG%</th><th>3P%</th></tr>
               </thead>
               <tbody><tr><td>A. Wilson</td><td>LVA</td><td>.480</td><td>.286</td></tr></tbody></table>"#,
        );
        let table = TableExtractor::new().extract_table(&html).unwrap();
        assert_eq!(table.columns(), ["Player", "Team", "FG%", "3P%"]);
        assert_eq!(table.cell(0, "3P%"), Some(".286"));
    }

    #[test]
    fn test_grouping_rows_repeated_in_body_are_dropped() {
        let html = page(
            r#"<table><thead>
                 <tr class="over_header"><th colspan="2"></th><th colspan="2">Shooting</th></tr>
                 <tr><th>Player</th><th>Team</th><th>FG%</th><th>3P%</th></tr>
               </thead>
               <tbody>
                 <tr><td>A. Wilson</td><td>LVA</td><td>.480</td><td>.286</td></tr>
                 <tr class="over_header thead"><th colspan="2"></th><th colspan="2">Shooting</th></tr>
                 <tr class="thead"><th>Player</th><th>Team</th><th>FG%</th><th>3P%</th></tr>
                 <tr><td>B. Stewart</td><td>NYL</td><td>.465</td><td>.346</td></tr>
               </tbody></table>"#,
        );
        let table = TableExtractor::new().extract_table(&html).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "Player"), Some("A. Wilson"));
        assert_eq!(table.cell(1, "Player"), Some("B. Stewart"));
        assert_eq!(table.cell(1, "3P%"), Some(".346"));
    }

    #[test]
    fn test_colspan_cells_fill_spanned_columns_and_short_rows_pad() {
        let html = page(
            r#"<table><thead><tr><th>Player</th><th>G</th><th>PTS</th><th>TRB</th></tr></thead>
               <tbody>
                 <tr><td>E. Delle Donne</td><td colspan="3">Did Not Play</td></tr>
                 <tr><td>J. Jones</td><td>22</td></tr>
               </tbody></table>"#,
        );
        let table = TableExtractor::new().extract_table(&html).unwrap();
        assert_eq!(table.rows()[0], ["E. Delle Donne", "Did Not Play", "Did Not Play", "Did Not Play"]);
        assert_eq!(table.rows()[1], ["J. Jones", "22", "", ""]);
    }

    #[test]
    fn test_duplicate_header_names_get_suffixes() {
        let html = page(
            r#"<table><thead><tr><th>Player</th><th>WS</th><th>WS</th></tr></thead>
               <tbody><tr><td>A</td><td>1.0</td><td>2.0</td></tr></tbody></table>"#,
        );
        let table = TableExtractor::new().extract_table(&html).unwrap();
        assert_eq!(table.columns(), ["Player", "WS", "WS.1"]);
        assert_eq!(table.cell(0, "WS.1"), Some("2.0"));
    }

    #[test]
    fn test_table_without_thead_uses_first_th_row() {
        let html = page(
            r#"<table>
                 <tr><th>Player</th><th>PTS</th></tr>
                 <tr><td>A. Wilson</td><td>22</td></tr>
                 <tr><th>Player</th><th>PTS</th></tr>
                 <tr><td>B. Stewart</td><td>19</td></tr>
               </table>"#,
        );
        let table = TableExtractor::new().extract_table(&html).unwrap();
        assert_eq!(table.columns(), ["Player", "PTS"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, "Player"), Some("B. Stewart"));
    }

    #[test]
    fn test_tfoot_rows_are_data() {
        let html = page(
            r#"<table><thead><tr><th>Player</th><th>PTS</th></tr></thead>
               <tbody><tr><td>A</td><td>10</td></tr></tbody>
               <tfoot><tr><td>League Average</td><td>8.1</td></tr></tfoot></table>"#,
        );
        let table = TableExtractor::new().extract_table(&html).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, "Player"), Some("League Average"));
    }

    #[test]
    fn test_record_pairs_names_with_cells() {
        let mut table = StatTable::new(vec!["Player".into(), "PTS".into()]);
        table.push_row(vec!["A".into(), "10".into()]);
        let record: Vec<(&str, &str)> = table.record(0).unwrap().collect();
        assert_eq!(record, vec![("Player", "A"), ("PTS", "10")]);
        assert!(table.record(1).is_none());
    }

    #[test]
    fn test_set_constant_column_appends_and_replaces() {
        let mut table = StatTable::new(vec!["Season".into(), "Player".into()]);
        table.push_row(vec!["old".into(), "A".into()]);
        table.set_constant_column("Season", "2020");
        assert_eq!(table.columns(), ["Player", "Season"]);
        assert_eq!(table.rows()[0], ["A", "2020"]);
    }

    #[test]
    fn test_concat_unions_columns_and_keeps_trailing_last() {
        let mut first = StatTable::new(vec!["Player".into(), "PTS".into()]);
        first.push_row(vec!["A".into(), "10".into()]);
        first.set_constant_column("Season", "2019");

        let mut second = StatTable::new(vec!["Player".into(), "3P%".into(), "PTS".into()]);
        second.push_row(vec!["B".into(), ".400".into(), "12".into()]);
        second.set_constant_column("Season", "2020");

        let combined = StatTable::concat(vec![first, second], &["Season"]).unwrap();
        assert_eq!(combined.columns(), ["Player", "PTS", "3P%", "Season"]);
        assert_eq!(combined.rows()[0], ["A", "10", "", "2019"]);
        assert_eq!(combined.rows()[1], ["B", "12", ".400", "2020"]);
    }

    #[test]
    fn test_concat_of_nothing_is_none() {
        assert!(StatTable::concat(Vec::new(), &[]).is_none());
    }
}
