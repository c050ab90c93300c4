use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

use crate::geography::{Region, Weight};

/// One numeric value per region.
pub type RegionValues = BTreeMap<Region, f64>;

#[derive(Error, Debug)]
#[error("Unknown metric {0}")]
pub struct UnknownMetric(pub String);

/// How regional values of a metric are combined into a national figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Weighted(Weight),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    Pcrs,
    Deaths,
    PcrsLast24h,
    AdmittedPeople,
    IcuPeople,
    AccumulatedIncidence,
    PercentageAdmitted,
    PercentageIcu,
    Vaccinations,
    CompletedVaccinations,
    FirstDoseVaccinations,
    ExtraDoseVaccinations,
    PercentageFirstDose,
    PercentageCompletedVaccination,
    PercentageExtraDose,
}

impl Metric {
    pub const ALL: [Metric; 15] = [
        Metric::Pcrs,
        Metric::Deaths,
        Metric::PcrsLast24h,
        Metric::AdmittedPeople,
        Metric::IcuPeople,
        Metric::AccumulatedIncidence,
        Metric::PercentageAdmitted,
        Metric::PercentageIcu,
        Metric::Vaccinations,
        Metric::CompletedVaccinations,
        Metric::FirstDoseVaccinations,
        Metric::ExtraDoseVaccinations,
        Metric::PercentageFirstDose,
        Metric::PercentageCompletedVaccination,
        Metric::PercentageExtraDose,
    ];

    /// Name of the series in the store.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Pcrs => "pcrs",
            Metric::Deaths => "deaths",
            Metric::PcrsLast24h => "pcrs_last_24h",
            Metric::AdmittedPeople => "admitted_people",
            Metric::IcuPeople => "icu_people",
            Metric::AccumulatedIncidence => "accumulated_incidence",
            Metric::PercentageAdmitted => "percentage_admitted",
            Metric::PercentageIcu => "percentage_icu",
            Metric::Vaccinations => "vaccinations",
            Metric::CompletedVaccinations => "completed_vaccinations",
            Metric::FirstDoseVaccinations => "first_dose_vaccinations",
            Metric::ExtraDoseVaccinations => "extra_dose_vaccinations",
            Metric::PercentageFirstDose => "percentage_first_dose",
            Metric::PercentageCompletedVaccination => "percentage_completed_vaccination",
            Metric::PercentageExtraDose => "percentage_extra_dose",
        }
    }

    /// Cumulative series are stored as daily counts, so they can be summed
    /// over any period.  The others are readings valid for one instant and
    /// only the latest one is meaningful.
    pub fn is_cumulative(self) -> bool {
        matches!(
            self,
            Metric::Pcrs
                | Metric::Deaths
                | Metric::PcrsLast24h
                | Metric::AdmittedPeople
                | Metric::IcuPeople
                | Metric::Vaccinations
                | Metric::CompletedVaccinations
                | Metric::FirstDoseVaccinations
                | Metric::ExtraDoseVaccinations
        )
    }

    pub fn aggregation(self) -> Aggregation {
        match self {
            Metric::AccumulatedIncidence
            | Metric::PercentageFirstDose
            | Metric::PercentageCompletedVaccination
            | Metric::PercentageExtraDose => Aggregation::Weighted(Weight::Population),
            Metric::PercentageAdmitted => Aggregation::Weighted(Weight::AdmittedBeds),
            Metric::PercentageIcu => Aggregation::Weighted(Weight::IcuBeds),
            _ => Aggregation::Sum,
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

/// All the values known for one territory at one reporting instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Snapshot {
    pub pcrs: Option<f64>,
    pub deaths: Option<f64>,
    pub pcrs_last_24h: Option<f64>,
    pub admitted_people: Option<f64>,
    pub icu_people: Option<f64>,
    pub accumulated_incidence: Option<f64>,
    pub percentage_admitted: Option<f64>,
    pub percentage_icu: Option<f64>,
    pub vaccinations: Option<f64>,
    pub completed_vaccinations: Option<f64>,
    pub first_dose_vaccinations: Option<f64>,
    pub extra_dose_vaccinations: Option<f64>,
    pub percentage_first_dose: Option<f64>,
    pub percentage_completed_vaccination: Option<f64>,
    pub percentage_extra_dose: Option<f64>,
}

impl Snapshot {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        *self.field(metric)
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        *self.field_mut(metric) = value;
    }

    pub fn is_empty(&self) -> bool {
        Metric::ALL.iter().all(|m| self.get(*m).is_none())
    }

    fn field(&self, metric: Metric) -> &Option<f64> {
        match metric {
            Metric::Pcrs => &self.pcrs,
            Metric::Deaths => &self.deaths,
            Metric::PcrsLast24h => &self.pcrs_last_24h,
            Metric::AdmittedPeople => &self.admitted_people,
            Metric::IcuPeople => &self.icu_people,
            Metric::AccumulatedIncidence => &self.accumulated_incidence,
            Metric::PercentageAdmitted => &self.percentage_admitted,
            Metric::PercentageIcu => &self.percentage_icu,
            Metric::Vaccinations => &self.vaccinations,
            Metric::CompletedVaccinations => &self.completed_vaccinations,
            Metric::FirstDoseVaccinations => &self.first_dose_vaccinations,
            Metric::ExtraDoseVaccinations => &self.extra_dose_vaccinations,
            Metric::PercentageFirstDose => &self.percentage_first_dose,
            Metric::PercentageCompletedVaccination => &self.percentage_completed_vaccination,
            Metric::PercentageExtraDose => &self.percentage_extra_dose,
        }
    }

    fn field_mut(&mut self, metric: Metric) -> &mut Option<f64> {
        match metric {
            Metric::Pcrs => &mut self.pcrs,
            Metric::Deaths => &mut self.deaths,
            Metric::PcrsLast24h => &mut self.pcrs_last_24h,
            Metric::AdmittedPeople => &mut self.admitted_people,
            Metric::IcuPeople => &mut self.icu_people,
            Metric::AccumulatedIncidence => &mut self.accumulated_incidence,
            Metric::PercentageAdmitted => &mut self.percentage_admitted,
            Metric::PercentageIcu => &mut self.percentage_icu,
            Metric::Vaccinations => &mut self.vaccinations,
            Metric::CompletedVaccinations => &mut self.completed_vaccinations,
            Metric::FirstDoseVaccinations => &mut self.first_dose_vaccinations,
            Metric::ExtraDoseVaccinations => &mut self.extra_dose_vaccinations,
            Metric::PercentageFirstDose => &mut self.percentage_first_dose,
            Metric::PercentageCompletedVaccination => &mut self.percentage_completed_vaccination,
            Metric::PercentageExtraDose => &mut self.percentage_extra_dose,
        }
    }
}

/// Turn one map per metric into one snapshot per region.  A region missing
/// from a metric's map gets `None` for that metric.
pub fn pack_snapshots(readings: Vec<(Metric, RegionValues)>) -> BTreeMap<Region, Snapshot> {
    let mut snapshots: BTreeMap<Region, Snapshot> = BTreeMap::new();
    for (metric, values) in readings {
        for (region, value) in values {
            snapshots.entry(region).or_default().set(metric, Some(value));
        }
    }
    snapshots
}
