//! The three scheduled runs: daily figures, weekly summary and vaccination.
//!
//! Every run goes through [`settle`], so a failure ends up in the logs and,
//! unless the document is simply not out yet, in a direct message to the
//! operator.

pub mod daily;
pub mod vaccination;
pub mod weekly;

use jiff::civil::Date;
use jiff::ToSpan;
use log::{error, info};
use thiserror::Error;

use crate::config::Config;
use crate::db::timeseries::TimeSeriesStore;
use crate::db::StoreError;
use crate::metric::{Metric, RegionValues};
use crate::publish::{truncate_chars, PublishError, Publisher, MAX_POST_LENGTH};
use crate::report::aggregate::normalize_delta;
use crate::sources::ReportError;

#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl JobError {
    pub fn is_not_published(&self) -> bool {
        matches!(self, JobError::Report(ReportError::NotPublished(_)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Today's figures were already in the store, nothing was done.
    AlreadyRecorded,
    /// The document isn't out yet, the scheduler will try again.
    NotYetPublished,
    Published,
    Failed,
}

/// Where the charts and the interactive dashboards live.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub grafana_server: String,
    pub dashboard_url: String,
}

impl From<&Config> for ReportSettings {
    fn from(config: &Config) -> Self {
        ReportSettings {
            grafana_server: config.grafana_server.clone(),
            dashboard_url: config.dashboard_url.clone(),
        }
    }
}

/// Direct message sent to the operator when a run fails.
pub fn alert_text(e: &JobError) -> String {
    truncate_chars(
        &format!("There was an unhandled exception. Trace:\n\n{e}"),
        MAX_POST_LENGTH,
    )
}

/// Turn the result of a run into its outcome, logging and alerting on the
/// way.
pub fn settle(result: Result<Outcome, JobError>, publisher: &dyn Publisher) -> Outcome {
    match result {
        Ok(outcome) => outcome,
        Err(e) if e.is_not_published() => {
            info!("{e}");
            Outcome::NotYetPublished
        }
        Err(e) => {
            error!("unhandled error while publishing: {e}");
            if let Err(dm) = publisher.send_direct_message(&alert_text(&e)) {
                error!("can't alert the operator: {dm}");
            }
            Outcome::Failed
        }
    }
}

/// Store today's increase of a cumulative metric, that is the published
/// total minus everything stored up to yesterday.  A region seen for the
/// first time gets its whole total.
pub fn update_stat(
    store: &dyn TimeSeriesStore,
    metric: Metric,
    accumulated_today: &RegionValues,
    today: Date,
) -> Result<RegionValues, StoreError> {
    let yesterday = today.saturating_sub(1.day());
    let accumulated = store.accumulated_until(metric, yesterday)?;
    let delta = normalize_delta(accumulated_today, &accumulated);
    store.insert(metric, today, &delta)?;
    Ok(delta)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::error::Error;

    use jiff::civil::date;

    use super::*;
    use crate::db::timeseries::DuckDbStore;
    use crate::geography::Region;
    use crate::publish::PostId;

    /// A post as seen by [`RecordingPublisher`].
    #[derive(Debug, Clone, PartialEq)]
    pub struct Post {
        pub text: String,
        pub image_url: Option<String>,
        pub reply_to: Option<PostId>,
    }

    /// Keeps everything it is asked to publish.
    #[derive(Default)]
    pub struct RecordingPublisher {
        pub posts: RefCell<Vec<Post>>,
        pub messages: RefCell<Vec<String>>,
    }

    impl RecordingPublisher {
        fn record(&self, text: &str, image_url: Option<&str>, reply_to: Option<&PostId>) -> PostId {
            let mut posts = self.posts.borrow_mut();
            posts.push(Post {
                text: text.to_string(),
                image_url: image_url.map(|s| s.to_string()),
                reply_to: reply_to.cloned(),
            });
            PostId(posts.len().to_string())
        }
    }

    impl Publisher for RecordingPublisher {
        fn publish(&self, text: &str, reply_to: Option<&PostId>) -> Result<PostId, PublishError> {
            Ok(self.record(text, None, reply_to))
        }

        fn publish_with_media(
            &self,
            text: &str,
            image_url: &str,
            reply_to: Option<&PostId>,
        ) -> Result<PostId, PublishError> {
            Ok(self.record(text, Some(image_url), reply_to))
        }

        fn send_direct_message(&self, text: &str) -> Result<(), PublishError> {
            self.messages.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    pub fn settings() -> ReportSettings {
        ReportSettings {
            grafana_server: "http://grafana.local".to_string(),
            dashboard_url: "https://dashboards.local".to_string(),
        }
    }

    #[test]
    fn first_appearance_gets_whole_total() -> Result<(), Box<dyn Error>> {
        let store = DuckDbStore::open_in_memory()?;
        store.insert(
            Metric::Deaths,
            date(2020, 8, 4),
            &RegionValues::from([(Region::Madrid, 100.0)]),
        )?;
        let delta = update_stat(
            &store,
            Metric::Deaths,
            &RegionValues::from([(Region::Madrid, 104.0), (Region::Ceuta, 3.0)]),
            date(2020, 8, 5),
        )?;
        assert_eq!(delta, RegionValues::from([(Region::Madrid, 4.0), (Region::Ceuta, 3.0)]));
        assert_eq!(store.sum_on_date(Metric::Deaths, date(2020, 8, 5))?, delta);
        Ok(())
    }

    #[test]
    fn sentences_are_chained_in_numbered_posts() -> Result<(), Box<dyn Error>> {
        let publisher = RecordingPublisher::default();
        let sentences = vec!["Madrid: +7 🔺5".to_string(); 20];
        let first = publisher.publish("Resumen diario", None)?;
        let last = publisher.publish_sentences(&sentences, Some("Resumen"), Some(first))?;

        let posts = publisher.posts.borrow().clone();
        assert_eq!(posts.len(), 3);
        assert!(posts[1].text.starts_with("Resumen (1/2):\n\n"));
        assert!(posts[2].text.starts_with("Resumen (2/2):\n\n"));
        assert_eq!(posts[1].reply_to, Some(PostId("1".to_string())));
        assert_eq!(posts[2].reply_to, Some(PostId("2".to_string())));
        assert_eq!(last, Some(PostId("3".to_string())));
        Ok(())
    }

    #[test]
    fn alert_is_truncated() {
        let e = JobError::Report(ReportError::Malformed("x".repeat(500)));
        let text = alert_text(&e);
        assert_eq!(text.chars().count(), MAX_POST_LENGTH);
        assert!(text.starts_with("There was an unhandled exception. Trace:\n\nMalformed report: xxx"));
    }

    #[test]
    fn settle_outcomes() {
        let publisher = RecordingPublisher::default();
        assert_eq!(settle(Ok(Outcome::Published), &publisher), Outcome::Published);

        let not_yet = Err(JobError::Report(ReportError::NotPublished("404".to_string())));
        assert_eq!(settle(not_yet, &publisher), Outcome::NotYetPublished);
        assert!(publisher.messages.borrow().is_empty());

        let broken = Err(JobError::Report(ReportError::Malformed("no table".to_string())));
        assert_eq!(settle(broken, &publisher), Outcome::Failed);
        assert_eq!(
            publisher.messages.borrow().as_slice(),
            ["There was an unhandled exception. Trace:\n\nMalformed report: no table"]
        );
    }
}
