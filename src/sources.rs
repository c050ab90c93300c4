//! Readers for the documents published by the Ministry of Health and the
//! ISCIII.

pub mod csv_feed;
pub mod download;
pub mod ods;
pub mod pdf;
pub mod strategy;
pub mod table;

use jiff::civil::Date;
use thiserror::Error;

use crate::geography::GeographyError;
use crate::metric::RegionValues;

#[derive(Error, Debug)]
pub enum ReportError {
    /// The document for that day is not there yet.  Try again later.
    #[error("Report not published yet: {0}")]
    NotPublished(String),
    /// The document is there but doesn't look like it should.
    #[error("Malformed report: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<GeographyError> for ReportError {
    fn from(e: GeographyError) -> Self {
        ReportError::Malformed(e.to_string())
    }
}

/// Cumulative figures per region as published on one day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyFigures {
    pub accumulated_pcrs: RegionValues,
    /// Only some report formats have it.
    pub pcrs_last_24h: Option<RegionValues>,
    pub accumulated_admitted: RegionValues,
    pub accumulated_icu: RegionValues,
    pub accumulated_deaths: RegionValues,
    /// People in hospital right now, used for occupancy.
    pub hospitalized_now: Option<RegionValues>,
    pub icu_now: Option<RegionValues>,
}

pub trait DailySource {
    fn daily_figures(&self, date: Date) -> Result<DailyFigures, ReportError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VaccinationFigures {
    pub accumulated_doses: RegionValues,
    pub accumulated_first_doses: RegionValues,
    pub accumulated_completed: RegionValues,
    pub accumulated_extra_doses: Option<RegionValues>,
}

pub trait VaccinationSource {
    fn vaccination_figures(&self, date: Date) -> Result<VaccinationFigures, ReportError>;
}
