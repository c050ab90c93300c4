use std::{collections::BTreeMap, time::Duration};

use duckdb::{params, AccessMode, Connection};
use jiff::civil::Date;
use log::info;

use crate::calendar::{week_bounds, DATA_START};
use crate::db::StoreError;
use crate::geography::Region;
use crate::metric::{pack_snapshots, Metric, RegionValues, Snapshot};
use crate::utils::lib_duckdb::open_with_retry;

/// Daily values per metric and region.
///
/// Only the first three methods talk to the database, everything else is
/// built on top of them.
pub trait TimeSeriesStore {
    /// Write one value per region.  A value already stored for the same
    /// metric, day and region is replaced.
    fn insert(&self, metric: Metric, date: Date, values: &RegionValues) -> Result<(), StoreError>;

    /// Sum of the values between `start` and `end`, both inclusive.
    fn sum_in_range(&self, metric: Metric, start: Date, end: Date)
        -> Result<RegionValues, StoreError>;

    /// Value of the last day with data between `start` and `end`.
    fn latest_in_range(
        &self,
        metric: Metric,
        start: Date,
        end: Date,
    ) -> Result<RegionValues, StoreError>;

    fn sum_on_date(&self, metric: Metric, date: Date) -> Result<RegionValues, StoreError> {
        self.sum_in_range(metric, date, date)
    }

    /// Everything recorded up to and including `date`.
    fn accumulated_until(&self, metric: Metric, date: Date) -> Result<RegionValues, StoreError> {
        self.sum_in_range(metric, DATA_START, date)
    }

    fn sum_in_week(&self, metric: Metric, date: Date) -> Result<RegionValues, StoreError> {
        let (monday, sunday) = week_bounds(date);
        self.sum_in_range(metric, monday, sunday)
    }

    fn latest_in_week(&self, metric: Metric, date: Date) -> Result<RegionValues, StoreError> {
        let (monday, sunday) = week_bounds(date);
        self.latest_in_range(metric, monday, sunday)
    }

    fn snapshots_on_date(&self, date: Date) -> Result<BTreeMap<Region, Snapshot>, StoreError> {
        let readings = Metric::ALL
            .into_iter()
            .map(|metric| -> Result<_, StoreError> {
                Ok((metric, self.sum_on_date(metric, date)?))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok(pack_snapshots(readings))
    }

    /// Counts are added up over the week, ratios take their last reading.
    fn snapshots_in_week(&self, date: Date) -> Result<BTreeMap<Region, Snapshot>, StoreError> {
        let readings = Metric::ALL
            .into_iter()
            .map(|metric| -> Result<_, StoreError> {
                let values = if metric.is_cumulative() {
                    self.sum_in_week(metric, date)?
                } else {
                    self.latest_in_week(metric, date)?
                };
                Ok((metric, values))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok(pack_snapshots(readings))
    }

    /// Totals to date.  Only counts have one.
    fn accumulated_snapshots(&self, date: Date) -> Result<BTreeMap<Region, Snapshot>, StoreError> {
        let readings = Metric::ALL
            .into_iter()
            .filter(|metric| metric.is_cumulative())
            .map(|metric| -> Result<_, StoreError> {
                Ok((metric, self.accumulated_until(metric, date)?))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok(pack_snapshots(readings))
    }
}

pub struct DuckDbStore {
    conn: Connection,
}

impl DuckDbStore {
    pub fn open(duckdb_path: &str) -> Result<DuckDbStore, StoreError> {
        let conn = open_with_retry(
            duckdb_path,
            8,
            Duration::from_millis(25),
            AccessMode::ReadWrite,
        )?;
        DuckDbStore::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<DuckDbStore, StoreError> {
        DuckDbStore::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<DuckDbStore, StoreError> {
        conn.execute_batch(
            r#"
CREATE TABLE IF NOT EXISTS observations (
    metric VARCHAR NOT NULL,
    day DATE NOT NULL,
    region VARCHAR NOT NULL,
    value DOUBLE NOT NULL,
    PRIMARY KEY (metric, day, region)
);
        "#,
        )?;
        Ok(DuckDbStore { conn })
    }

    fn group_by_region(
        &self,
        query: &str,
        metric: Metric,
        start: Date,
        end: Date,
    ) -> Result<RegionValues, StoreError> {
        let mut stmt = self.conn.prepare(query)?;
        let rows = stmt.query_map(
            params![metric.name(), start.to_string(), end.to_string()],
            |row| Ok((row.get::<usize, String>(0)?, row.get::<usize, f64>(1)?)),
        )?;
        let mut values = RegionValues::new();
        for row in rows {
            let (region, value) = row?;
            values.insert(region.parse::<Region>()?, value);
        }
        Ok(values)
    }
}

impl TimeSeriesStore for DuckDbStore {
    fn insert(&self, metric: Metric, date: Date, values: &RegionValues) -> Result<(), StoreError> {
        let mut stmt = self.conn.prepare(
            "INSERT OR REPLACE INTO observations VALUES (?, CAST(? AS DATE), ?, ?);",
        )?;
        for (region, value) in values {
            stmt.execute(params![metric.name(), date.to_string(), region.label(), value])?;
        }
        info!("inserted {} values of {} for {}", values.len(), metric, date);
        Ok(())
    }

    fn sum_in_range(
        &self,
        metric: Metric,
        start: Date,
        end: Date,
    ) -> Result<RegionValues, StoreError> {
        self.group_by_region(
            r#"
SELECT region, SUM(value)
FROM observations
WHERE metric = ?
AND day BETWEEN CAST(? AS DATE) AND CAST(? AS DATE)
GROUP BY region;
        "#,
            metric,
            start,
            end,
        )
    }

    fn latest_in_range(
        &self,
        metric: Metric,
        start: Date,
        end: Date,
    ) -> Result<RegionValues, StoreError> {
        self.group_by_region(
            r#"
SELECT region, arg_max(value, day)
FROM observations
WHERE metric = ?
AND day BETWEEN CAST(? AS DATE) AND CAST(? AS DATE)
GROUP BY region;
        "#,
            metric,
            start,
            end,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use jiff::civil::date;

    use super::*;

    fn store_with_week() -> Result<DuckDbStore, Box<dyn Error>> {
        let store = DuckDbStore::open_in_memory()?;
        // Monday 27/07/2020 to Sunday 02/08/2020
        for (i, day) in [date(2020, 7, 27), date(2020, 7, 28), date(2020, 7, 29)]
            .into_iter()
            .enumerate()
        {
            let i = i as f64;
            store.insert(
                Metric::Pcrs,
                day,
                &RegionValues::from([(Region::Madrid, 10.0 + i), (Region::Ceuta, 1.0)]),
            )?;
            store.insert(
                Metric::PercentageIcu,
                day,
                &RegionValues::from([(Region::Madrid, 5.0 + i)]),
            )?;
        }
        store.insert(
            Metric::Pcrs,
            date(2020, 7, 20),
            &RegionValues::from([(Region::Madrid, 100.0)]),
        )?;
        Ok(store)
    }

    #[test]
    fn insert_and_read_back() -> Result<(), Box<dyn Error>> {
        let store = DuckDbStore::open_in_memory()?;
        let values = RegionValues::from([(Region::Madrid, 7.0), (Region::Cataluna, 3.0)]);
        store.insert(Metric::Pcrs, date(2020, 8, 5), &values)?;
        assert_eq!(store.sum_on_date(Metric::Pcrs, date(2020, 8, 5))?, values);
        assert!(store.sum_on_date(Metric::Pcrs, date(2020, 8, 4))?.is_empty());
        assert!(store.sum_on_date(Metric::Deaths, date(2020, 8, 5))?.is_empty());
        Ok(())
    }

    #[test]
    fn insert_replaces() -> Result<(), Box<dyn Error>> {
        let store = DuckDbStore::open_in_memory()?;
        let day = date(2020, 8, 5);
        store.insert(Metric::Deaths, day, &RegionValues::from([(Region::Madrid, 7.0)]))?;
        store.insert(Metric::Deaths, day, &RegionValues::from([(Region::Madrid, 9.0)]))?;
        assert_eq!(
            store.sum_on_date(Metric::Deaths, day)?,
            RegionValues::from([(Region::Madrid, 9.0)])
        );
        Ok(())
    }

    #[test]
    fn ranges() -> Result<(), Box<dyn Error>> {
        let store = store_with_week()?;
        let week = store.sum_in_week(Metric::Pcrs, date(2020, 7, 29))?;
        assert_eq!(week, RegionValues::from([(Region::Madrid, 33.0), (Region::Ceuta, 3.0)]));

        let accumulated = store.accumulated_until(Metric::Pcrs, date(2020, 7, 28))?;
        assert_eq!(
            accumulated,
            RegionValues::from([(Region::Madrid, 121.0), (Region::Ceuta, 2.0)])
        );

        let latest = store.latest_in_week(Metric::PercentageIcu, date(2020, 8, 2))?;
        assert_eq!(latest, RegionValues::from([(Region::Madrid, 7.0)]));
        Ok(())
    }

    #[test]
    fn snapshots() -> Result<(), Box<dyn Error>> {
        let store = store_with_week()?;
        let day = store.snapshots_on_date(date(2020, 7, 28))?;
        assert_eq!(day[&Region::Madrid].pcrs, Some(11.0));
        assert_eq!(day[&Region::Madrid].percentage_icu, Some(6.0));
        assert_eq!(day[&Region::Ceuta].percentage_icu, None);

        let week = store.snapshots_in_week(date(2020, 7, 27))?;
        assert_eq!(week[&Region::Madrid].pcrs, Some(33.0));
        assert_eq!(week[&Region::Madrid].percentage_icu, Some(7.0));

        let accumulated = store.accumulated_snapshots(date(2020, 7, 29))?;
        assert_eq!(accumulated[&Region::Madrid].pcrs, Some(133.0));
        assert_eq!(accumulated[&Region::Madrid].percentage_icu, None);
        Ok(())
    }

    #[test]
    fn unknown_region_in_store() -> Result<(), Box<dyn Error>> {
        let store = DuckDbStore::open_in_memory()?;
        store.conn.execute_batch(
            "INSERT INTO observations VALUES ('pcrs', DATE '2020-08-05', 'Atlántida', 1.0);",
        )?;
        assert!(matches!(
            store.sum_on_date(Metric::Pcrs, date(2020, 8, 5)),
            Err(StoreError::UnknownRegion(_))
        ));
        Ok(())
    }
}
