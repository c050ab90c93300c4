use std::error::Error;

use clap::Parser;
use covid19_es::{
    config::Config,
    db::prod_db::ProdDb,
    jobs::{vaccination::VaccinationJob, Outcome, ReportSettings},
    publish::twitter::TwitterClient,
    sources::ods::MinistryVaccinationSource,
};
use jiff::{civil::Date, Zoned};
use log::info;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// Report date, today if missing, e.g. 2021-02-03
    #[arg(short, long)]
    date: Option<Date>,
}

/// Run this job every 15 minutes on weekdays from 17:00[Europe/Madrid]
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
    let job = VaccinationJob {
        store: &store,
        source: &MinistryVaccinationSource,
        publisher: &publisher,
        settings: ReportSettings::from(&config),
    };
    let outcome = job.run(today);
    info!("vaccination job for {today}: {outcome:?}");
    if outcome == Outcome::Failed {
        return Err(format!("vaccination job for {today} failed").into());
    }

    Ok(())
}
