use jiff::civil::Date;
use jiff::ToSpan;
use log::info;

use crate::calendar::subtract_days_ignoring_weekends;
use crate::db::timeseries::TimeSeriesStore;
use crate::geography::Weight;
use crate::metric::Metric;
use crate::publish::Publisher;
use crate::report::aggregate::{incidence_per_100k, occupancy_percentage};
use crate::report::territorial::{
    build_global_report, build_report_by_region, daily_date_header, daily_final_post, graph_url,
    ReportTail, GRAPH_IMAGE_PATH,
};
use crate::sources::DailySource;

use super::{settle, update_stat, JobError, Outcome, ReportSettings};

/// Days shown in the chart attached to the daily report.
const GRAPH_DAYS: i64 = 31;

/// Days in the cumulative incidence window.
const INCIDENCE_DAYS: i64 = 14;

/// Reads today's report, stores the increases and publishes the thread.
pub struct DailyJob<'a> {
    pub store: &'a dyn TimeSeriesStore,
    pub source: &'a dyn DailySource,
    pub publisher: &'a dyn Publisher,
    pub settings: ReportSettings,
}

impl DailyJob<'_> {
    pub fn run(&self, today: Date) -> Outcome {
        settle(self.try_run(today), self.publisher)
    }

    fn try_run(&self, today: Date) -> Result<Outcome, JobError> {
        if !self.store.sum_on_date(Metric::Pcrs, today)?.is_empty() {
            info!("figures for {today} are already stored");
            return Ok(Outcome::AlreadyRecorded);
        }
        self.update_database(today)?;
        self.publish_report(today)?;
        Ok(Outcome::Published)
    }

    pub fn update_database(&self, today: Date) -> Result<(), JobError> {
        let figures = self.source.daily_figures(today)?;
        let store = self.store;

        update_stat(store, Metric::Pcrs, &figures.accumulated_pcrs, today)?;
        update_stat(store, Metric::AdmittedPeople, &figures.accumulated_admitted, today)?;
        update_stat(store, Metric::IcuPeople, &figures.accumulated_icu, today)?;
        update_stat(store, Metric::Deaths, &figures.accumulated_deaths, today)?;
        if let Some(pcrs_last_24h) = &figures.pcrs_last_24h {
            store.insert(Metric::PcrsLast24h, today, pcrs_last_24h)?;
        }

        let window_start = today.saturating_sub((INCIDENCE_DAYS - 1).days());
        let window = store.sum_in_range(Metric::Pcrs, window_start, today)?;
        store.insert(Metric::AccumulatedIncidence, today, &incidence_per_100k(&window))?;

        if let Some(hospitalized) = &figures.hospitalized_now {
            store.insert(
                Metric::PercentageAdmitted,
                today,
                &occupancy_percentage(hospitalized, Weight::AdmittedBeds),
            )?;
        }
        if let Some(icu) = &figures.icu_now {
            store.insert(
                Metric::PercentageIcu,
                today,
                &occupancy_percentage(icu, Weight::IcuBeds),
            )?;
        }
        Ok(())
    }

    /// National report with the chart, one post per region and the links to
    /// the dashboards, all in one thread.
    pub fn publish_report(&self, today: Date) -> Result<(), JobError> {
        let previous = subtract_days_ignoring_weekends(today, 1);
        let today_data = self.store.snapshots_on_date(today)?;
        let previous_data = self.store.snapshots_on_date(previous)?;
        let accumulated = self.store.accumulated_snapshots(today)?;
        let header = daily_date_header(today);

        let spain_report = build_global_report(
            &header,
            &today_data,
            &previous_data,
            &accumulated,
            ReportTail::Hospitals,
        );
        let graph = graph_url(
            &self.settings.grafana_server,
            GRAPH_IMAGE_PATH,
            Some(today.saturating_sub(GRAPH_DAYS.days())),
            Some(today),
            &[],
        );
        let first = self.publisher.publish_with_media(&spain_report, &graph, None)?;

        let regions = build_report_by_region(
            &header,
            &today_data,
            &previous_data,
            &accumulated,
            ReportTail::Hospitals,
        );
        let last = self.publisher.publish_thread(&regions, Some(first))?;
        self.publisher
            .publish(&daily_final_post(&self.settings.dashboard_url), last.as_ref())?;
        info!("published daily report for {today}");
        Ok(())
    }
}
