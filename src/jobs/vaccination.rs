use jiff::civil::{date, Date};
use log::info;

use crate::db::timeseries::TimeSeriesStore;
use crate::db::StoreError;
use crate::metric::Metric;
use crate::publish::Publisher;
use crate::report::aggregate::population_percentage;
use crate::report::territorial::{build_vaccination_posts, graph_url, VACCINE_IMAGE_PATH};
use crate::sources::VaccinationSource;

use super::{settle, update_stat, JobError, Outcome, ReportSettings};

/// First day of the vaccination chart.
const CAMPAIGN_START: Date = date(2021, 1, 1);

pub struct VaccinationJob<'a> {
    pub store: &'a dyn TimeSeriesStore,
    pub source: &'a dyn VaccinationSource,
    pub publisher: &'a dyn Publisher,
    pub settings: ReportSettings,
}

impl VaccinationJob<'_> {
    pub fn run(&self, today: Date) -> Outcome {
        settle(self.try_run(today), self.publisher)
    }

    fn try_run(&self, today: Date) -> Result<Outcome, JobError> {
        if !self.store.sum_on_date(Metric::Vaccinations, today)?.is_empty() {
            info!("vaccinations for {today} are already stored");
            return Ok(Outcome::AlreadyRecorded);
        }
        self.update_vaccinations(today)?;
        for (accumulated, percentage) in [
            (Metric::CompletedVaccinations, Metric::PercentageCompletedVaccination),
            (Metric::FirstDoseVaccinations, Metric::PercentageFirstDose),
            (Metric::ExtraDoseVaccinations, Metric::PercentageExtraDose),
        ] {
            self.update_percentage(today, accumulated, percentage)?;
        }
        self.publish_report(today)?;
        Ok(Outcome::Published)
    }

    pub fn update_vaccinations(&self, today: Date) -> Result<(), JobError> {
        let figures = self.source.vaccination_figures(today)?;
        update_stat(self.store, Metric::Vaccinations, &figures.accumulated_doses, today)?;
        update_stat(
            self.store,
            Metric::CompletedVaccinations,
            &figures.accumulated_completed,
            today,
        )?;
        update_stat(
            self.store,
            Metric::FirstDoseVaccinations,
            &figures.accumulated_first_doses,
            today,
        )?;
        if let Some(extra) = &figures.accumulated_extra_doses {
            update_stat(self.store, Metric::ExtraDoseVaccinations, extra, today)?;
        }
        Ok(())
    }

    /// Share of each region's population covered so far.  Nothing is
    /// stored for a metric that was never reported.
    fn update_percentage(
        &self,
        today: Date,
        accumulated: Metric,
        percentage: Metric,
    ) -> Result<(), StoreError> {
        let people = self.store.accumulated_until(accumulated, today)?;
        if people.is_empty() {
            return Ok(());
        }
        self.store.insert(percentage, today, &population_percentage(&people))
    }

    pub fn publish_report(&self, today: Date) -> Result<(), JobError> {
        let today_data = self.store.snapshots_on_date(today)?;
        let accumulated = self.store.accumulated_snapshots(today)?;
        let (spain_post, region_posts) = build_vaccination_posts(
            today,
            &today_data,
            &accumulated,
            &self.settings.dashboard_url,
        );
        let graph = graph_url(
            &self.settings.grafana_server,
            VACCINE_IMAGE_PATH,
            Some(CAMPAIGN_START),
            Some(today),
            &[],
        );
        let first = self.publisher.publish_with_media(&spain_post, &graph, None)?;
        self.publisher.publish_thread(&region_posts, Some(first))?;
        info!("published vaccination report for {today}");
        Ok(())
    }
}
