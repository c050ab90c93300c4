use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::Read,
    path::Path,
};

use flate2::read::GzDecoder;
use jiff::{civil::Date, ToSpan};
use log::info;

use crate::geography::Region;
use crate::metric::RegionValues;

use super::download::{archive_gz, download_bytes};
use super::{DailyFigures, DailySource, ReportError};

pub const FEED_URL: &str = "https://cnecovid.isciii.es/covid19/resources/agregados.csv";

/// Cumulative values of every region for one day of the feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedDay {
    pub date: Option<Date>,
    pub pcrs: RegionValues,
    pub hospitalized: RegionValues,
    pub icu: RegionValues,
    pub deaths: RegionValues,
}

/// Daily copies of the ISCIII aggregated csv file.
#[derive(Clone)]
pub struct CsvFeedArchive {
    pub base_dir: String,
}

impl CsvFeedArchive {
    /// Path of the gzipped copy downloaded on that day.
    pub fn filename(&self, date: &Date) -> String {
        self.base_dir.to_owned()
            + "/Raw/"
            + &date.year().to_string()
            + "/agregados_"
            + &date.strftime("%Y%m%d").to_string()
            + ".csv.gz"
    }

    pub fn download_file(&self, date: &Date) -> Result<(), ReportError> {
        let bytes = download_bytes(FEED_URL)?;
        archive_gz(&bytes, Path::new(&self.filename(date)))?;
        info!("archived {}", self.filename(date));
        Ok(())
    }

    fn read_bytes(&self, date: &Date) -> Result<Vec<u8>, ReportError> {
        let mut buffer = Vec::new();
        GzDecoder::new(File::open(self.filename(date))?).read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// Whether the copy of `date` differs from the one of the day before.
    /// There is nothing to compare against on the first day.
    pub fn has_changed(&self, date: &Date) -> Result<bool, ReportError> {
        let previous = date.saturating_sub(1.day());
        if !Path::new(&self.filename(&previous)).exists() {
            return Ok(true);
        }
        Ok(self.read_bytes(date)? != self.read_bytes(&previous)?)
    }

    pub fn remove_file(&self, date: &Date) -> Result<(), ReportError> {
        fs::remove_file(self.filename(date))?;
        Ok(())
    }

    pub fn read_file(&self, date: &Date) -> Result<FeedDay, ReportError> {
        latest_day(self.read_bytes(date)?.as_slice())
    }
}

fn field<'a>(record: &'a csv::ByteRecord, i: usize) -> &'a str {
    record
        .get(i)
        .and_then(|f| std::str::from_utf8(f).ok())
        .unwrap_or_default()
        .trim()
}

fn count(record: &csv::ByteRecord, i: usize) -> Result<f64, ReportError> {
    let value = field(record, i);
    if value.is_empty() {
        return Ok(0.0);
    }
    value
        .parse::<f64>()
        .map_err(|_| ReportError::Malformed(format!("Bad value {value:?} in column {i}")))
}

/// Read the whole feed and keep the last date in it.  The file is latin-1
/// and ends with notes, only rows starting with a two letter region code
/// and a date are data.
pub fn latest_day<R: Read>(reader: R) -> Result<FeedDay, ReportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut days: BTreeMap<Date, FeedDay> = BTreeMap::new();
    for record in rdr.byte_records() {
        let record = record.map_err(|e| ReportError::Malformed(e.to_string()))?;
        let code = field(&record, 0);
        if code.len() != 2 {
            continue;
        }
        let Ok(date) = Date::strptime("%d/%m/%Y", field(&record, 1)) else {
            continue;
        };
        let region = Region::from_code(code)?;
        let day = days.entry(date).or_default();
        day.date = Some(date);
        day.pcrs.insert(region, count(&record, 3)?);
        day.hospitalized.insert(region, count(&record, 5)?);
        day.icu.insert(region, count(&record, 6)?);
        day.deaths.insert(region, count(&record, 7)?);
    }
    days.pop_last()
        .map(|(_, day)| day)
        .ok_or_else(|| ReportError::Malformed("No data rows in the feed".to_string()))
}

/// Daily figures from the csv feed.  A feed identical to yesterday's is
/// not published yet.
pub struct CsvDailySource {
    pub archive: CsvFeedArchive,
}

impl DailySource for CsvDailySource {
    fn daily_figures(&self, date: Date) -> Result<DailyFigures, ReportError> {
        self.archive.download_file(&date)?;
        if !self.archive.has_changed(&date)? {
            self.archive.remove_file(&date)?;
            return Err(ReportError::NotPublished(
                "Feed has not been updated yet".to_string(),
            ));
        }
        let day = self.archive.read_file(&date)?;
        info!("feed has data up to {:?}", day.date);
        Ok(DailyFigures {
            accumulated_pcrs: day.pcrs,
            pcrs_last_24h: None,
            accumulated_admitted: day.hospitalized,
            accumulated_icu: day.icu,
            accumulated_deaths: day.deaths,
            hospitalized_now: None,
            icu_now: None,
        })
    }
}
