use log::debug;

use crate::geography::Region;
use crate::metric::RegionValues;

use super::ReportError;

/// Rows found in report tables that are not regions.
const NON_REGION_ROWS: [&str; 5] = [
    "fuerzas armadas",
    "sanidad exterior",
    "sanidad",
    "instituciones penitenciarias",
    "ministerio de defensa",
];

pub type ValueParser = fn(&str) -> Result<f64, ReportError>;

/// A table as a grid of strings, the first cell of every data row being the
/// region label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

/// Which value to read from a row: the cell at `column`, and inside that
/// cell the `part`-th space separated piece.  Some reports put two figures
/// in the same cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSelector {
    pub column: usize,
    pub part: usize,
}

impl ColumnSelector {
    pub fn column(column: usize) -> ColumnSelector {
        ColumnSelector { column, part: 0 }
    }
}

/// Remove the annotations the reports add to region names.
pub fn clean_region_label(label: &str) -> String {
    let label = label
        .replace(['*', '(', ')'], "")
        .replace("Leon", "León")
        .replace('\r', " ")
        .replace('\n', " ")
        .replace('-', " ")
        .replace(" arra", "arra");
    label.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Spanish number to something `f64` can parse.
pub fn clean_value(value: &str) -> String {
    let value = value.trim();
    let value = value.strip_suffix(".0").unwrap_or(value);
    value
        .replace('.', "")
        .replace('-', "0")
        .replace(',', ".")
        .replace('%', "")
}

pub fn parse_count(value: &str) -> Result<f64, ReportError> {
    let cleaned = clean_value(value);
    cleaned
        .parse::<i64>()
        .map(|v| v as f64)
        .map_err(|_| ReportError::Malformed(format!("Expected a count, found {value:?}")))
}

pub fn parse_decimal(value: &str) -> Result<f64, ReportError> {
    let cleaned = clean_value(value);
    cleaned
        .parse::<f64>()
        .map_err(|_| ReportError::Malformed(format!("Expected a number, found {value:?}")))
}

fn is_non_region(label: &str) -> bool {
    let label = label.to_lowercase();
    NON_REGION_ROWS.iter().any(|x| label.starts_with(x))
}

fn is_total(label: &str) -> bool {
    let label = label.to_lowercase();
    label.starts_with("total") || label == "españa"
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Table {
        Table { rows }
    }

    /// Index of the row with the first region.
    pub fn first_region_row(&self) -> Result<usize, ReportError> {
        self.rows
            .iter()
            .position(|row| {
                row.first()
                    .is_some_and(|cell| cell.trim_start().starts_with("Andalucía"))
            })
            .ok_or_else(|| ReportError::Malformed("No row for Andalucía".to_string()))
    }

    /// Region rows, from Andalucía to the total, that have a known label
    /// and at least one value.  A row that is still one single cell means
    /// the text wasn't split the right way.
    pub fn readable_region_rows(&self) -> usize {
        let Ok(start) = self.first_region_row() else {
            return 0;
        };
        self.rows[start..]
            .iter()
            .map(|row| {
                let label = row.first().map(String::as_str).unwrap_or_default();
                (clean_region_label(label), row.len())
            })
            .take_while(|(label, _)| !is_total(label))
            .filter(|(label, cells)| *cells > 1 && label.parse::<Region>().is_ok())
            .count()
    }

    /// Index of the first column whose header contains `title`, ignoring
    /// case.  Only the rows above the data are searched.
    pub fn find_column(&self, title: &str) -> Result<usize, ReportError> {
        let end = self.first_region_row()?;
        let title = title.to_lowercase();
        self.rows[..end]
            .iter()
            .find_map(|row| {
                row.iter()
                    .position(|cell| cell.to_lowercase().contains(&title))
            })
            .ok_or_else(|| ReportError::Malformed(format!("No column with title {title:?}")))
    }

    /// Read one value per region, starting at Andalucía and looking at no
    /// more than `num_rows` rows.  Rows that are not regions (armed forces,
    /// external health) are skipped and a total row ends the table.
    pub fn fetch_column(
        &self,
        selector: ColumnSelector,
        num_rows: usize,
        parser: ValueParser,
    ) -> Result<RegionValues, ReportError> {
        let start = self.first_region_row()?;
        let mut values = RegionValues::new();
        for row in self.rows.iter().skip(start).take(num_rows) {
            let label = clean_region_label(row.first().map(String::as_str).unwrap_or_default());
            if is_total(&label) {
                break;
            }
            if is_non_region(&label) {
                debug!("skipping row {label}");
                continue;
            }
            let region: Region = label.parse()?;
            let cell = row.get(selector.column).ok_or_else(|| {
                ReportError::Malformed(format!(
                    "Row {label} has no column {}",
                    selector.column
                ))
            })?;
            let part = cell.split(' ').nth(selector.part).ok_or_else(|| {
                ReportError::Malformed(format!("Cell {cell:?} has no part {}", selector.part))
            })?;
            values.insert(region, parser(part)?);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn annotated_table() -> Table {
        let mut rows = vec![row(&["", "header1", "header2"]), row(&["CCAA", "Total", "Nuevos"])];
        for (i, region) in Region::ALL.iter().enumerate() {
            rows.push(row(&[
                &format!("{}*", region.label()),
                &(i + 1).to_string(),
                &format!("{}.000", i + 21),
            ]));
        }
        rows.push(row(&["ESPAÑA", "190", "580.000"]));
        Table::new(rows)
    }

    #[test]
    fn labels() {
        assert_eq!(clean_region_label("Madrid*"), "Madrid");
        assert_eq!(clean_region_label("Castilla y Leon"), "Castilla y León");
        assert_eq!(clean_region_label("Castilla La\rMancha"), "Castilla La Mancha");
        assert_eq!(clean_region_label("Castilla-La Mancha"), "Castilla La Mancha");
        assert_eq!(clean_region_label("Nav arra (*)"), "Navarra");
        assert_eq!(clean_region_label("  País   Vasco "), "País Vasco");
    }

    #[test]
    fn values() -> Result<(), Box<dyn Error>> {
        assert_eq!(parse_count("1.234")?, 1234.0);
        assert_eq!(parse_count("21.000")?, 21000.0);
        assert_eq!(parse_count("12.0")?, 12.0);
        assert_eq!(parse_count("-")?, 0.0);
        assert_eq!(parse_decimal("12,5%")?, 12.5);
        assert_eq!(parse_decimal("1.234,56")?, 1234.56);
        assert!(parse_count("n/a").is_err());
        Ok(())
    }

    #[test]
    fn fetch_column_with_annotated_labels() -> Result<(), Box<dyn Error>> {
        let table = annotated_table();
        let values = table.fetch_column(ColumnSelector::column(2), 19, parse_count)?;
        assert_eq!(values.len(), 19);
        let expected: Vec<f64> = (21..40).map(|x| x as f64 * 1000.0).collect();
        assert_eq!(values.values().copied().collect::<Vec<_>>(), expected);
        assert_eq!(values.keys().copied().collect::<Vec<_>>(), Region::ALL.to_vec());
        Ok(())
    }

    #[test]
    fn national_row_ends_the_table() -> Result<(), Box<dyn Error>> {
        let values = annotated_table().fetch_column(ColumnSelector::column(1), 21, parse_count)?;
        assert_eq!(values.len(), 19);
        Ok(())
    }

    #[test]
    fn readable_rows() {
        assert_eq!(annotated_table().readable_region_rows(), 19);
        let unsplit = Table::new(vec![
            row(&["Andalucía 1.000 0"]),
            row(&["Aragón 2.000 1"]),
            row(&["Madrid", "7"]),
        ]);
        assert_eq!(unsplit.readable_region_rows(), 1);
        assert_eq!(Table::default().readable_region_rows(), 0);
    }

    #[test]
    fn fetch_fewer_rows() -> Result<(), Box<dyn Error>> {
        let values = annotated_table().fetch_column(ColumnSelector::column(1), 3, parse_count)?;
        assert_eq!(values.len(), 3);
        assert_eq!(values[&Region::Asturias], 3.0);
        Ok(())
    }

    #[test]
    fn fetch_part_of_a_cell() -> Result<(), Box<dyn Error>> {
        let table = Table::new(vec![row(&["Andalucía", "12 3,5"]), row(&["Aragón", "7 1,2"])]);
        let values = table.fetch_column(ColumnSelector { column: 1, part: 1 }, 2, parse_decimal)?;
        assert_eq!(values[&Region::Andalucia], 3.5);
        assert_eq!(values[&Region::Aragon], 1.2);
        Ok(())
    }

    #[test]
    fn non_region_rows_and_totals() -> Result<(), Box<dyn Error>> {
        let table = Table::new(vec![
            row(&["Andalucía", "1"]),
            row(&["Fuerzas Armadas", "5"]),
            row(&["Madrid", "2"]),
            row(&["Totales", "8"]),
            row(&["Murcia", "9"]),
        ]);
        let values = table.fetch_column(ColumnSelector::column(1), 21, parse_count)?;
        assert_eq!(
            values,
            RegionValues::from([(Region::Andalucia, 1.0), (Region::Madrid, 2.0)])
        );
        Ok(())
    }

    #[test]
    fn malformed_tables() {
        let no_regions = Table::new(vec![row(&["CCAA", "Total"])]);
        assert!(matches!(
            no_regions.fetch_column(ColumnSelector::column(1), 19, parse_count),
            Err(ReportError::Malformed(_))
        ));
        let unknown = Table::new(vec![row(&["Andalucía", "1"]), row(&["Atlántida", "2"])]);
        assert!(matches!(
            unknown.fetch_column(ColumnSelector::column(1), 19, parse_count),
            Err(ReportError::Malformed(_))
        ));
        let short = Table::new(vec![row(&["Andalucía"])]);
        assert!(short
            .fetch_column(ColumnSelector::column(1), 19, parse_count)
            .is_err());
    }

    #[test]
    fn columns_by_title() -> Result<(), Box<dyn Error>> {
        let table = Table::new(vec![
            row(&["", "Dosis entregadas (1)", "Dosis administradas (2)", "Nº Personas con al menos 1 dosis", "Nº Personas con pauta completada"]),
            row(&["Andalucía", "10", "8", "5", "3"]),
        ]);
        assert_eq!(table.find_column("administradas")?, 2);
        assert_eq!(table.find_column("1 DOSIS")?, 3);
        assert_eq!(table.find_column("completada")?, 4);
        assert!(table.find_column("adicional").is_err());
        Ok(())
    }
}
