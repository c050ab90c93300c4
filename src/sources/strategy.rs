use log::{info, warn};
use regex::Regex;

use super::table::Table;
use super::ReportError;

/// How to turn the text of a page into table rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Cells are separated by two or more spaces.
    WideGaps,
    /// Every number is a cell, the words before the first number are the
    /// label.
    Tokens,
}

/// A window of lines of the page where the table is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageArea {
    pub first_line: usize,
    pub num_lines: usize,
}

/// One way of reading a table: a strategy and, optionally, where to look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub strategy: ExtractionStrategy,
    pub area: Option<PageArea>,
}

impl Attempt {
    pub const fn new(strategy: ExtractionStrategy, area: Option<PageArea>) -> Attempt {
        Attempt { strategy, area }
    }
}

fn lines_in_area(text: &str, area: Option<PageArea>) -> Vec<&str> {
    let lines = text.lines().filter(|line| !line.trim().is_empty());
    match area {
        Some(area) => lines.skip(area.first_line).take(area.num_lines).collect(),
        None => lines.collect(),
    }
}

impl ExtractionStrategy {
    pub fn extract(&self, text: &str, area: Option<PageArea>) -> Result<Table, ReportError> {
        let lines = lines_in_area(text, area);
        let rows: Vec<Vec<String>> = match self {
            ExtractionStrategy::WideGaps => {
                let re = Regex::new(r"\s{2,}")
                    .map_err(|e| ReportError::Malformed(e.to_string()))?;
                lines
                    .iter()
                    .map(|line| re.split(line.trim()).map(|c| c.to_string()).collect())
                    .collect()
            }
            ExtractionStrategy::Tokens => {
                let number = Regex::new(r"^(-|-?[\d.,]+%?)$")
                    .map_err(|e| ReportError::Malformed(e.to_string()))?;
                lines
                    .iter()
                    .map(|line| {
                        let tokens: Vec<&str> = line.split_whitespace().collect();
                        let split = tokens
                            .iter()
                            .position(|t| number.is_match(t))
                            .unwrap_or(tokens.len());
                        let mut row = vec![tokens[..split].join(" ")];
                        row.extend(tokens[split..].iter().map(|t| t.to_string()));
                        row
                    })
                    .collect()
            }
        };
        Ok(Table::new(rows))
    }
}

/// Try every attempt in order and keep the first table with at least
/// `min_rows` region rows that split into a label and values.
pub fn extract_table(
    text: &str,
    attempts: &[Attempt],
    min_rows: usize,
) -> Result<Table, ReportError> {
    let mut last_error = ReportError::Malformed("No extraction strategy given".to_string());
    for (i, attempt) in attempts.iter().enumerate() {
        if i > 0 {
            warn!("falling back to {:?}", attempt);
        }
        let table = match attempt.strategy.extract(text, attempt.area) {
            Ok(table) => table,
            Err(e) => {
                last_error = e;
                continue;
            }
        };
        let rows = table.readable_region_rows();
        if rows >= min_rows {
            info!("table found with {:?}, {} region rows", attempt, rows);
            return Ok(table);
        }
        last_error = ReportError::Malformed(format!(
            "{:?} found {} region rows, expected {}",
            attempt, rows, min_rows
        ));
    }
    Err(last_error)
}
