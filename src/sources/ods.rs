use std::io::{Cursor, Read};

use jiff::civil::Date;
use log::info;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::download::download_bytes;
use super::table::{parse_count, ColumnSelector, Table};
use super::{ReportError, VaccinationFigures, VaccinationSource};

/// Empty cells repeated more than this are the padding at the end of a row.
const MAX_EMPTY_REPEAT: usize = 32;

/// Regions plus the armed forces and external health rows.
const VACCINATION_ROWS: usize = 21;

/// One sheet of a spreadsheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub table: Table,
}

fn malformed<E: std::fmt::Display>(e: E) -> ReportError {
    ReportError::Malformed(e.to_string())
}

fn repeat_count(e: &BytesStart, attribute: &str) -> Result<usize, ReportError> {
    match e.try_get_attribute(attribute).map_err(malformed)? {
        Some(attr) => attr
            .unescape_value()
            .map_err(malformed)?
            .parse::<usize>()
            .map_err(malformed),
        None => Ok(1),
    }
}

fn push_cell(row: &mut Vec<String>, cell: String, repeat: usize) {
    let repeat = if cell.is_empty() {
        repeat.min(MAX_EMPTY_REPEAT)
    } else {
        repeat
    };
    row.extend(std::iter::repeat(cell).take(repeat));
}

fn push_row(rows: &mut Vec<Vec<String>>, mut row: Vec<String>, repeat: usize) {
    while row.last().is_some_and(|c| c.is_empty()) {
        row.pop();
    }
    // repeated empty rows pad the end of the sheet
    let repeat = if row.is_empty() { 1 } else { repeat };
    for _ in 0..repeat {
        rows.push(row.clone());
    }
}

/// Parse the `content.xml` of an OpenDocument spreadsheet into its sheets.
/// Paragraphs inside a cell are joined with a new line.
pub fn parse_content(xml: &str) -> Result<Vec<Sheet>, ReportError> {
    let mut reader = Reader::from_str(xml);
    let mut sheets: Vec<Sheet> = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut row_repeat = 1;
    let mut cell: Option<(String, usize)> = None;
    let mut paragraphs = 0;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => match e.name().as_ref() {
                b"table:table" => {
                    let name = match e.try_get_attribute("table:name").map_err(malformed)? {
                        Some(attr) => attr.unescape_value().map_err(malformed)?.to_string(),
                        None => String::new(),
                    };
                    sheets.push(Sheet {
                        name,
                        table: Table::default(),
                    });
                    rows.clear();
                }
                b"table:table-row" => {
                    row.clear();
                    row_repeat = repeat_count(&e, "table:number-rows-repeated")?;
                }
                b"table:table-cell" | b"table:covered-table-cell" => {
                    cell = Some((String::new(), repeat_count(&e, "table:number-columns-repeated")?));
                    paragraphs = 0;
                }
                b"text:p" => {
                    if let Some((text, _)) = cell.as_mut() {
                        if paragraphs > 0 {
                            text.push('\n');
                        }
                        paragraphs += 1;
                    }
                }
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"table:table-cell" | b"table:covered-table-cell" => {
                    let repeat = repeat_count(&e, "table:number-columns-repeated")?;
                    push_cell(&mut row, String::new(), repeat);
                }
                b"text:s" => {
                    if let Some((text, _)) = cell.as_mut() {
                        let spaces = repeat_count(&e, "text:c")?;
                        text.push_str(&" ".repeat(spaces));
                    }
                }
                _ => {}
            },
            Event::Text(t) => {
                if let Some((text, _)) = cell.as_mut() {
                    text.push_str(&t.unescape().map_err(malformed)?);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"table:table-cell" | b"table:covered-table-cell" => {
                    if let Some((text, repeat)) = cell.take() {
                        push_cell(&mut row, text, repeat);
                    }
                }
                b"table:table-row" => {
                    push_row(&mut rows, std::mem::take(&mut row), row_repeat);
                }
                b"table:table" => {
                    while rows.last().is_some_and(|r| r.is_empty()) {
                        rows.pop();
                    }
                    if let Some(sheet) = sheets.last_mut() {
                        sheet.table = Table::new(std::mem::take(&mut rows));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

/// The vaccination report published by the Ministry of Health as an ods
/// spreadsheet.
#[derive(Debug, Clone)]
pub struct MinistryOdsReport {
    pub sheets: Vec<Sheet>,
}

impl MinistryOdsReport {
    pub fn url(day: Date) -> String {
        format!(
            "https://www.mscbs.gob.es/profesionales/saludPublica/ccayes/alertasActual/nCov/documentos/Informe_Comunicacion_{}.ods",
            day.strftime("%Y%m%d")
        )
    }

    pub fn download(day: Date) -> Result<MinistryOdsReport, ReportError> {
        let bytes = download_bytes(&MinistryOdsReport::url(day))?;
        MinistryOdsReport::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<MinistryOdsReport, ReportError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(malformed)?;
        let mut xml = String::new();
        archive
            .by_name("content.xml")
            .map_err(malformed)?
            .read_to_string(&mut xml)?;
        Ok(MinistryOdsReport {
            sheets: parse_content(&xml)?,
        })
    }

    /// Sheet by position, starting at 1.
    pub fn sheet(&self, page: usize) -> Result<&Table, ReportError> {
        page.checked_sub(1)
            .and_then(|i| self.sheets.get(i))
            .map(|s| &s.table)
            .ok_or_else(|| ReportError::Malformed(format!("No sheet {page}")))
    }
}

/// Reads the accumulated vaccinations from the first sheet, finding the
/// columns by their titles.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinistryVaccinationSource;

impl MinistryVaccinationSource {
    pub fn figures_from_report(
        &self,
        report: &MinistryOdsReport,
    ) -> Result<VaccinationFigures, ReportError> {
        let table = report.sheet(1)?;
        let column = |title: &str| -> Result<_, ReportError> {
            let selector = ColumnSelector::column(table.find_column(title)?);
            table.fetch_column(selector, VACCINATION_ROWS, parse_count)
        };
        Ok(VaccinationFigures {
            accumulated_doses: column("administradas")?,
            accumulated_first_doses: column("1 dosis")?,
            accumulated_completed: column("completada")?,
            accumulated_extra_doses: column("adicional").ok(),
        })
    }
}

impl VaccinationSource for MinistryVaccinationSource {
    fn vaccination_figures(&self, day: Date) -> Result<VaccinationFigures, ReportError> {
        let report = MinistryOdsReport::download(day)?;
        info!("read {} sheets of vaccination report for {}", report.sheets.len(), day);
        self.figures_from_report(&report)
    }
}
