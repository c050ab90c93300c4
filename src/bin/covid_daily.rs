use std::error::Error;

use clap::{Parser, ValueEnum};
use covid19_es::{
    config::Config,
    db::prod_db::ProdDb,
    jobs::{daily::DailyJob, Outcome, ReportSettings},
    publish::twitter::TwitterClient,
    sources::{csv_feed::CsvDailySource, pdf::MinistryDailySource, DailySource},
};
use jiff::{civil::Date, Zoned};
use log::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Source {
    /// The ministry's daily pdf report
    Pdf,
    /// The ISCIII aggregated csv feed
    Csv,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// Where to read the figures from
    #[arg(short, long, value_enum, default_value = "pdf")]
    source: Source,

    /// Report date, today if missing, e.g. 2020-08-05
    #[arg(short, long)]
    date: Option<Date>,
}

/// Run this job every 15 minutes on weekdays from 12:00[Europe/Madrid]
/// until it publishes.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = Config::load(&args.env)?;
    let today = args.date.unwrap_or_else(|| Zoned::now().date());

    let store = ProdDb::covid19(&config)?;
    let publisher = TwitterClient::new(config.twitter.clone());
    let source: Box<dyn DailySource> = match args.source {
        Source::Pdf => Box::new(MinistryDailySource::default()),
        Source::Csv => Box::new(CsvDailySource {
            archive: ProdDb::isciii_feed(&config),
        }),
    };
    let job = DailyJob {
        store: &store,
        source: source.as_ref(),
        publisher: &publisher,
        settings: ReportSettings::from(&config),
    };
    let outcome = job.run(today);
    info!("daily job for {today}: {outcome:?}");
    if outcome == Outcome::Failed {
        return Err(format!("daily job for {today} failed").into());
    }

    Ok(())
}
