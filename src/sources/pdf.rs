use jiff::civil::{date, Date};
use log::{info, warn};

use crate::calendar::days_between;
use crate::metric::RegionValues;

use super::download::download_bytes;
use super::strategy::{extract_table, Attempt, ExtractionStrategy, PageArea};
use super::table::{parse_count, ColumnSelector, Table};
use super::{DailyFigures, DailySource, ReportError};

/// Working days on which the ministry didn't publish its report.
pub const DAYS_WITHOUT_REPORT: [Date; 14] = [
    date(2020, 12, 8),
    date(2020, 12, 25),
    date(2021, 1, 1),
    date(2021, 1, 6),
    date(2021, 3, 19),
    date(2021, 10, 12),
    date(2021, 11, 1),
    date(2021, 11, 9),
    date(2021, 12, 6),
    date(2021, 12, 8),
    date(2021, 12, 24),
    date(2021, 12, 31),
    date(2022, 1, 6),
    date(2022, 2, 28),
];

const REFERENCE_DATE: Date = date(2020, 5, 14);
const REFERENCE_ID: i64 = 105;
/// From this weekend on there are no reports on Saturdays and Sundays.
const FIRST_WEEKEND_WITHOUT_REPORT: Date = date(2020, 7, 4);

const NUM_REGIONS: usize = 19;

/// Reports are numbered sequentially, one per published day.
pub fn pdf_id_for_date(day: Date, days_without_report: &[Date]) -> i64 {
    let weekends = if day > FIRST_WEEKEND_WITHOUT_REPORT {
        (days_between(FIRST_WEEKEND_WITHOUT_REPORT, day) + 6) / 7
    } else {
        0
    };
    let skipped = days_without_report.iter().filter(|d| day > **d).count() as i64;
    REFERENCE_ID + days_between(REFERENCE_DATE, day) - weekends * 2 - skipped
}

/// The daily update published by the Ministry of Health as a pdf.
#[derive(Debug, Clone)]
pub struct MinistryPdfReport {
    pub pages: Vec<String>,
}

impl MinistryPdfReport {
    pub fn url(day: Date) -> String {
        format!(
            "https://www.mscbs.gob.es/en/profesionales/saludPublica/ccayes/alertasActual/nCov-China/documentos/Actualizacion_{}_COVID-19.pdf",
            pdf_id_for_date(day, &DAYS_WITHOUT_REPORT)
        )
    }

    pub fn download(day: Date) -> Result<MinistryPdfReport, ReportError> {
        let bytes = download_bytes(&MinistryPdfReport::url(day))?;
        let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
            .map_err(|e| ReportError::Malformed(format!("Can't read pdf: {e}")))?;
        Ok(MinistryPdfReport::from_pages(pages))
    }

    pub fn from_pages(pages: Vec<String>) -> MinistryPdfReport {
        MinistryPdfReport { pages }
    }

    /// Text of a page, starting at 1.
    pub fn page(&self, page: usize) -> Result<&str, ReportError> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .map(String::as_str)
            .ok_or_else(|| {
                ReportError::Malformed(format!(
                    "Report has {} pages, no page {}",
                    self.pages.len(),
                    page
                ))
            })
    }

    pub fn table(&self, page: usize, attempts: &[Attempt]) -> Result<Table, ReportError> {
        extract_table(self.page(page)?, attempts, NUM_REGIONS)
    }
}

/// Where each figure is in the daily report.
#[derive(Debug, Clone)]
pub struct DailyLayout {
    pub cases_page: usize,
    pub cases_attempts: Vec<Attempt>,
    pub accumulated_pcrs: ColumnSelector,
    pub pcrs_last_24h: ColumnSelector,
    pub hospitals_page: usize,
    pub hospitals_attempts: Vec<Attempt>,
    pub accumulated_admitted: ColumnSelector,
    pub accumulated_icu: ColumnSelector,
    pub accumulated_deaths: ColumnSelector,
    pub occupancy_page: usize,
    pub hospitalized_now: ColumnSelector,
    pub icu_now: ColumnSelector,
}

impl Default for DailyLayout {
    fn default() -> Self {
        let attempts = vec![
            Attempt::new(ExtractionStrategy::WideGaps, None),
            Attempt::new(ExtractionStrategy::Tokens, None),
        ];
        let mut cases_attempts = attempts.clone();
        // Some reports have a chart above the table that confuses the first
        // two.
        cases_attempts.push(Attempt::new(
            ExtractionStrategy::Tokens,
            Some(PageArea {
                first_line: 8,
                num_lines: 24,
            }),
        ));
        DailyLayout {
            cases_page: 1,
            cases_attempts,
            accumulated_pcrs: ColumnSelector::column(1),
            pcrs_last_24h: ColumnSelector::column(2),
            hospitals_page: 2,
            hospitals_attempts: attempts,
            accumulated_admitted: ColumnSelector::column(1),
            accumulated_icu: ColumnSelector::column(2),
            accumulated_deaths: ColumnSelector::column(3),
            occupancy_page: 3,
            hospitalized_now: ColumnSelector::column(1),
            icu_now: ColumnSelector::column(3),
        }
    }
}

/// Reads the daily figures from the ministry pdf.
#[derive(Debug, Clone, Default)]
pub struct MinistryDailySource {
    pub layout: DailyLayout,
}

impl MinistryDailySource {
    pub fn figures_from_report(
        &self,
        report: &MinistryPdfReport,
    ) -> Result<DailyFigures, ReportError> {
        let layout = &self.layout;
        let cases = report.table(layout.cases_page, &layout.cases_attempts)?;
        let hospitals = report.table(layout.hospitals_page, &layout.hospitals_attempts)?;

        let pcrs_last_24h = optional(
            "pcrs in the last 24h",
            cases.fetch_column(layout.pcrs_last_24h, NUM_REGIONS, parse_count),
        );
        let occupancy = report.table(layout.occupancy_page, &layout.hospitals_attempts);
        let (hospitalized_now, icu_now) = match occupancy {
            Ok(table) => (
                optional(
                    "hospitalized people",
                    table.fetch_column(layout.hospitalized_now, NUM_REGIONS, parse_count),
                ),
                optional(
                    "people in ICU",
                    table.fetch_column(layout.icu_now, NUM_REGIONS, parse_count),
                ),
            ),
            Err(e) => {
                warn!("no occupancy table: {e}");
                (None, None)
            }
        };

        Ok(DailyFigures {
            accumulated_pcrs: cases.fetch_column(layout.accumulated_pcrs, NUM_REGIONS, parse_count)?,
            pcrs_last_24h,
            accumulated_admitted: hospitals.fetch_column(
                layout.accumulated_admitted,
                NUM_REGIONS,
                parse_count,
            )?,
            accumulated_icu: hospitals.fetch_column(layout.accumulated_icu, NUM_REGIONS, parse_count)?,
            accumulated_deaths: hospitals.fetch_column(
                layout.accumulated_deaths,
                NUM_REGIONS,
                parse_count,
            )?,
            hospitalized_now,
            icu_now,
        })
    }
}

fn optional(what: &str, values: Result<RegionValues, ReportError>) -> Option<RegionValues> {
    match values {
        Ok(values) => Some(values),
        Err(e) => {
            warn!("no {what} in the report: {e}");
            None
        }
    }
}

impl DailySource for MinistryDailySource {
    fn daily_figures(&self, day: Date) -> Result<DailyFigures, ReportError> {
        let report = MinistryPdfReport::download(day)?;
        info!("read {} pages of report for {}", report.pages.len(), day);
        self.figures_from_report(&report)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::geography::Region;

    #[test]
    fn pdf_ids() {
        assert_eq!(pdf_id_for_date(date(2020, 5, 14), &DAYS_WITHOUT_REPORT), 105);
        assert_eq!(pdf_id_for_date(date(2020, 5, 10), &DAYS_WITHOUT_REPORT), 101);
        assert_eq!(pdf_id_for_date(date(2020, 7, 3), &DAYS_WITHOUT_REPORT), 155);
        assert_eq!(pdf_id_for_date(date(2020, 7, 6), &DAYS_WITHOUT_REPORT), 156);
        assert_eq!(pdf_id_for_date(date(2020, 7, 13), &DAYS_WITHOUT_REPORT), 161);
    }

    #[test]
    fn pdf_ids_with_days_without_report() {
        assert_eq!(pdf_id_for_date(date(2020, 12, 9), &[date(2020, 12, 8)]), 267);
        assert_eq!(
            pdf_id_for_date(date(2020, 12, 9), &[date(2020, 12, 7), date(2020, 12, 8)]),
            266
        );
        assert_eq!(pdf_id_for_date(date(2020, 12, 8), &[date(2020, 12, 8)]), 267);
    }

    #[test]
    fn url() {
        assert_eq!(
            MinistryPdfReport::url(date(2020, 7, 13)),
            "https://www.mscbs.gob.es/en/profesionales/saludPublica/ccayes/alertasActual/nCov-China/documentos/Actualizacion_161_COVID-19.pdf"
        );
    }

    /// A page as pdf text extraction gives it, one space between cells.
    fn page(title: &str, columns: usize, offset: usize) -> String {
        let mut lines = vec![title.to_string(), "CCAA A B C".to_string()];
        for (i, region) in Region::ALL.iter().enumerate() {
            let cells: Vec<String> = (1..=columns)
                .map(|c| format!("{}", (i + offset) * 1000 + c))
                .collect();
            lines.push(format!("{}* {}", region.label(), cells.join(" ")));
        }
        lines.push(format!("ESPAÑA {}", vec!["1"; columns].join(" ")));
        lines.join("\n")
    }

    #[test]
    fn figures_from_pages() -> Result<(), Box<dyn Error>> {
        let report = MinistryPdfReport::from_pages(vec![
            page("Tabla 1. Casos", 2, 1),
            page("Tabla 2. Hospitalizados", 3, 100),
            "Tabla 3. Sin datos".to_string(),
        ]);
        assert_eq!(report.pages.len(), 3);

        let figures = MinistryDailySource::default().figures_from_report(&report)?;
        assert_eq!(figures.accumulated_pcrs[&Region::Andalucia], 1001.0);
        assert_eq!(figures.accumulated_pcrs.len(), 19);
        assert_eq!(
            figures.pcrs_last_24h.as_ref().map(|v| v[&Region::Aragon]),
            Some(2002.0)
        );
        assert_eq!(figures.accumulated_admitted[&Region::Madrid], 114_001.0);
        assert_eq!(figures.accumulated_icu[&Region::Madrid], 114_002.0);
        assert_eq!(figures.accumulated_deaths[&Region::Madrid], 114_003.0);
        assert_eq!(figures.hospitalized_now, None);
        assert_eq!(figures.icu_now, None);
        Ok(())
    }

    #[test]
    fn occupancy_from_third_page() -> Result<(), Box<dyn Error>> {
        let report = MinistryPdfReport::from_pages(vec![
            page("Tabla 1. Casos", 2, 1),
            page("Tabla 2. Hospitalizados", 3, 100),
            page("Tabla 3. Ocupación", 3, 200),
        ]);
        let figures = MinistryDailySource::default().figures_from_report(&report)?;
        let icu_now = figures.icu_now.ok_or("no icu occupancy")?;
        assert_eq!(icu_now[&Region::Ceuta], 210_003.0);
        assert_eq!(
            figures.hospitalized_now.map(|v| v[&Region::Ceuta]),
            Some(210_001.0)
        );
        Ok(())
    }

    #[test]
    fn missing_page_is_malformed() {
        let report = MinistryPdfReport::from_pages(vec!["only one page".to_string()]);
        assert!(matches!(report.page(2), Err(ReportError::Malformed(_))));
        assert!(matches!(report.page(0), Err(ReportError::Malformed(_))));
    }

    #[ignore]
    #[test]
    fn download_report() -> Result<(), Box<dyn Error>> {
        let figures = MinistryDailySource::default().daily_figures(date(2021, 3, 4))?;
        assert_eq!(figures.accumulated_pcrs.len(), 19);
        Ok(())
    }
}
