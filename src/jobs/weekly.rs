use jiff::civil::Date;
use jiff::ToSpan;
use log::info;

use crate::db::timeseries::TimeSeriesStore;
use crate::publish::Publisher;
use crate::report::territorial::{
    build_global_report, build_report_by_region, graph_url, weekly_date_header, weekly_final_post,
    ReportTail, GRAPH_IMAGE_PATH,
};

use super::{settle, JobError, Outcome, ReportSettings};

/// Summary of the week containing the given day, compared with the week
/// before.  Only reads the store, so there is nothing to guard.
pub struct WeeklyJob<'a> {
    pub store: &'a dyn TimeSeriesStore,
    pub publisher: &'a dyn Publisher,
    pub settings: ReportSettings,
    pub tail: ReportTail,
}

impl WeeklyJob<'_> {
    pub fn run(&self, day: Date) -> Outcome {
        settle(self.publish_report(day).map(|_| Outcome::Published), self.publisher)
    }

    /// Regions first, then the national report with the chart and the links.
    pub fn publish_report(&self, day: Date) -> Result<(), JobError> {
        let week = self.store.snapshots_in_week(day)?;
        let previous_week = self.store.snapshots_in_week(day.saturating_sub(7.days()))?;
        let accumulated = self.store.accumulated_snapshots(day)?;
        let header = weekly_date_header(day);

        let regions =
            build_report_by_region(&header, &week, &previous_week, &accumulated, self.tail);
        let last = self.publisher.publish_thread(&regions, None)?;

        let spain_report =
            build_global_report(&header, &week, &previous_week, &accumulated, self.tail);
        let graph = graph_url(
            &self.settings.grafana_server,
            GRAPH_IMAGE_PATH,
            Some(day.saturating_sub(7.days())),
            Some(day.saturating_sub(2.days())),
            &[("group_by", "1w,4d")],
        );
        let last = self
            .publisher
            .publish_with_media(&spain_report, &graph, last.as_ref())?;
        self.publisher
            .publish(&weekly_final_post(&self.settings.dashboard_url), Some(&last))?;
        info!("published weekly report for {header}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use jiff::civil::date;

    use super::*;
    use crate::db::timeseries::DuckDbStore;
    use crate::geography::Region;
    use crate::jobs::tests::{settings, RecordingPublisher};
    use crate::metric::{Metric, RegionValues};
    use crate::publish::PostId;

    #[test]
    fn week_against_previous_week() -> Result<(), Box<dyn Error>> {
        let store = DuckDbStore::open_in_memory()?;
        for day in [date(2020, 7, 20), date(2020, 7, 21)] {
            store.insert(Metric::Pcrs, day, &RegionValues::from([(Region::Madrid, 10.0)]))?;
        }
        for day in [date(2020, 7, 27), date(2020, 7, 28), date(2020, 7, 29)] {
            store.insert(Metric::Pcrs, day, &RegionValues::from([(Region::Madrid, 10.0)]))?;
            store.insert(Metric::Deaths, day, &RegionValues::from([(Region::Aragon, 1.0)]))?;
        }
        store.insert(
            Metric::PercentageIcu,
            date(2020, 7, 29),
            &RegionValues::from([(Region::Madrid, 4.0)]),
        )?;

        let publisher = RecordingPublisher::default();
        let job = WeeklyJob {
            store: &store,
            publisher: &publisher,
            settings: settings(),
            tail: ReportTail::Hospitals,
        };
        assert_eq!(job.run(date(2020, 8, 2)), Outcome::Published);

        let posts = publisher.posts.borrow().clone();
        // Aragón, Madrid, national, links
        assert_eq!(posts.len(), 4);
        assert!(posts[0].text.starts_with("Aragón - Sem. 27/07 al 02/08:"));
        assert_eq!(posts[0].reply_to, None);
        assert!(posts[1]
            .text
            .starts_with("Madrid - Sem. 27/07 al 02/08:\n\n💉 PCRs: +30 🔺10 (Totales: 50)"));
        assert!(posts[1].text.ends_with("🏥 UCI: 4%"));
        assert!(posts[2].text.starts_with("🇪🇸 España - Sem. 27/07 al 02/08:"));
        assert_eq!(posts[2].reply_to, Some(PostId("2".to_string())));
        assert!(posts[2]
            .image_url
            .as_deref()
            .is_some_and(|url| url.ends_with("&var-group_by=1w,4d")));
        assert!(posts[3].text.contains("Tabla 2"));
        assert_eq!(posts[3].reply_to, Some(PostId("3".to_string())));
        Ok(())
    }
}
