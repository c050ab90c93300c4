use std::error::Error;

use clap::{Parser, ValueEnum};
use covid19_es::{
    config::Config,
    db::prod_db::ProdDb,
    jobs::{weekly::WeeklyJob, Outcome, ReportSettings},
    publish::twitter::TwitterClient,
    report::territorial::ReportTail,
};
use jiff::{civil::Date, Zoned};
use log::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Tail {
    /// Hospital and ICU occupancy
    Hospitals,
    /// Vaccine doses
    Vaccines,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// What closes each report
    #[arg(short, long, value_enum, default_value = "hospitals")]
    tail: Tail,

    /// Any day of the week to summarize, today if missing
    #[arg(short, long)]
    date: Option<Date>,
}

/// Run this job on Sundays at 20:00[Europe/Madrid]
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = Config::load(&args.env)?;
    let day = args.date.unwrap_or_else(|| Zoned::now().date());

    let store = ProdDb::covid19(&config)?;
    let publisher = TwitterClient::new(config.twitter.clone());
    let job = WeeklyJob {
        store: &store,
        publisher: &publisher,
        settings: ReportSettings::from(&config),
        tail: match args.tail {
            Tail::Hospitals => ReportTail::Hospitals,
            Tail::Vaccines => ReportTail::Vaccines,
        },
    };
    let outcome = job.run(day);
    info!("weekly job for {day}: {outcome:?}");
    if outcome == Outcome::Failed {
        return Err(format!("weekly job for {day} failed").into());
    }

    Ok(())
}
