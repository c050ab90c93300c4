use std::collections::BTreeMap;

use crate::geography::{Region, Weight};
use crate::metric::{Aggregation, Metric, RegionValues, Snapshot};

/// New occurrences per region between two cumulative readings.  Regions
/// missing yesterday count as zero, regions missing today are dropped.
pub fn normalize_delta(today: &RegionValues, yesterday: &RegionValues) -> RegionValues {
    today
        .iter()
        .map(|(region, value)| (*region, value - yesterday.get(region).copied().unwrap_or(0.0)))
        .collect()
}

/// Weighted mean of per-100k ratios, `Σ(v·w/100000) / Σw · 100000`.
/// Returns 0 when there is no weight at all.
pub fn calculate_weighted_incidence<I>(values: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (numerator, denominator) = values
        .into_iter()
        .fold((0.0, 0.0), |(n, d), (value, weight)| {
            (n + value * weight / 100_000.0, d + weight)
        });
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator * 100_000.0
    }
}

/// Combine the snapshots of several regions into the national one.
///
/// Only metrics with a reading in at least one region are set.  Counts are
/// summed, a missing reading being zero.  Ratios are weighted by the
/// capacity of the regions that do have a reading.
pub fn aggregate_national(snapshots: &BTreeMap<Region, Snapshot>) -> Snapshot {
    let mut national = Snapshot::default();
    for metric in Metric::ALL {
        let readings: Vec<(Region, f64)> = snapshots
            .iter()
            .filter_map(|(region, snapshot)| snapshot.get(metric).map(|v| (*region, v)))
            .collect();
        if readings.is_empty() {
            continue;
        }
        let value = match metric.aggregation() {
            Aggregation::Sum => readings.iter().map(|(_, v)| v).sum(),
            Aggregation::Weighted(weight) => calculate_weighted_incidence(
                readings
                    .iter()
                    .map(|(region, v)| (*v, region.weight(weight) as f64)),
            ),
        };
        national.set(metric, Some(value));
    }
    national
}

/// Cases per 100,000 inhabitants of each region.
pub fn incidence_per_100k(cases: &RegionValues) -> RegionValues {
    ratio_to(cases, Weight::Population, 100_000.0)
}

/// Percentage of the region's beds that are taken.
pub fn occupancy_percentage(occupied: &RegionValues, beds: Weight) -> RegionValues {
    ratio_to(occupied, beds, 100.0)
}

/// Percentage of the region's population.
pub fn population_percentage(people: &RegionValues) -> RegionValues {
    ratio_to(people, Weight::Population, 100.0)
}

fn ratio_to(values: &RegionValues, weight: Weight, scale: f64) -> RegionValues {
    values
        .iter()
        .filter_map(|(region, value)| match region.weight(weight) {
            0 => None,
            w => Some((*region, scale * value / w as f64)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn delta_from_cumulative() {
        let today = RegionValues::from([(Region::Madrid, 107.0), (Region::Cataluna, 203.0)]);
        let yesterday = RegionValues::from([(Region::Madrid, 100.0), (Region::Cataluna, 200.0)]);
        let delta = normalize_delta(&today, &yesterday);
        assert_eq!(
            delta,
            RegionValues::from([(Region::Madrid, 7.0), (Region::Cataluna, 3.0)])
        );
        // pure
        assert_eq!(normalize_delta(&today, &yesterday), delta);
    }

    #[test]
    fn delta_on_first_appearance() {
        let today = RegionValues::from([(Region::Madrid, 107.0), (Region::Ceuta, 4.0)]);
        let yesterday = RegionValues::from([(Region::Madrid, 100.0), (Region::Galicia, 50.0)]);
        let delta = normalize_delta(&today, &yesterday);
        assert_eq!(
            delta,
            RegionValues::from([(Region::Madrid, 7.0), (Region::Ceuta, 4.0)])
        );
    }

    #[test]
    fn weighted_incidence() {
        assert_eq!(calculate_weighted_incidence(Vec::<(f64, f64)>::new()), 0.0);
        assert_eq!(calculate_weighted_incidence(vec![(10.0, 0.0)]), 0.0);
        assert!(close(calculate_weighted_incidence(vec![(10.0, 500.0)]), 10.0));
        assert!(close(
            calculate_weighted_incidence(vec![(10.0, 100.0), (20.0, 300.0)]),
            17.5
        ));
    }

    #[test]
    fn national_of_nothing_is_empty() {
        assert!(aggregate_national(&BTreeMap::new()).is_empty());
    }

    #[test]
    fn national_of_one_region_is_the_region() {
        let snapshot = Snapshot {
            pcrs: Some(7.0),
            accumulated_incidence: Some(123.4),
            percentage_icu: Some(12.5),
            ..Default::default()
        };
        let national = aggregate_national(&BTreeMap::from([(Region::Madrid, snapshot)]));
        assert_eq!(national.pcrs, Some(7.0));
        assert!(close(national.accumulated_incidence.unwrap(), 123.4));
        assert!(close(national.percentage_icu.unwrap(), 12.5));
        assert_eq!(national.deaths, None);
    }

    #[test]
    fn national_of_two_regions() {
        let madrid = Snapshot {
            pcrs: Some(7.0),
            deaths: Some(1.0),
            accumulated_incidence: Some(100.0),
            percentage_admitted: Some(10.0),
            ..Default::default()
        };
        let cataluna = Snapshot {
            pcrs: Some(3.0),
            accumulated_incidence: Some(200.0),
            percentage_admitted: Some(20.0),
            ..Default::default()
        };
        let national = aggregate_national(&BTreeMap::from([
            (Region::Madrid, madrid),
            (Region::Cataluna, cataluna),
        ]));
        assert_eq!(national.pcrs, Some(10.0));
        assert_eq!(national.deaths, Some(1.0));

        let (pm, pc) = (
            Region::Madrid.population() as f64,
            Region::Cataluna.population() as f64,
        );
        let expected = (100.0 * pm + 200.0 * pc) / (pm + pc);
        assert!(close(national.accumulated_incidence.unwrap(), expected));

        let (bm, bc) = (
            Region::Madrid.admitted_beds() as f64,
            Region::Cataluna.admitted_beds() as f64,
        );
        let expected = (10.0 * bm + 20.0 * bc) / (bm + bc);
        assert!(close(national.percentage_admitted.unwrap(), expected));
    }

    #[test]
    fn regions_without_reading_are_not_weighted() {
        let madrid = Snapshot {
            accumulated_incidence: Some(100.0),
            ..Default::default()
        };
        let ceuta = Snapshot {
            pcrs: Some(1.0),
            ..Default::default()
        };
        let national = aggregate_national(&BTreeMap::from([
            (Region::Madrid, madrid),
            (Region::Ceuta, ceuta),
        ]));
        assert!(close(national.accumulated_incidence.unwrap(), 100.0));
        assert_eq!(national.pcrs, Some(1.0));
    }

    #[test]
    fn ratios() {
        let cases = RegionValues::from([(Region::Madrid, 6_663_356.0 / 1000.0)]);
        assert!(close(incidence_per_100k(&cases)[&Region::Madrid], 100.0));

        let icu = RegionValues::from([(Region::Ceuta, 9.0)]);
        assert!(close(occupancy_percentage(&icu, Weight::IcuBeds)[&Region::Ceuta], 50.0));

        let people = RegionValues::from([(Region::Melilla, 86_486.0 / 4.0)]);
        assert!(close(population_percentage(&people)[&Region::Melilla], 25.0));
    }
}
