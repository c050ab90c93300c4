use std::collections::BTreeMap;

use itertools::Itertools;
use jiff::civil::{Date, Weekday};
use jiff::ToSpan;

use crate::calendar::{epoch_millis, week_bounds};
use crate::geography::Region;
use crate::metric::Snapshot;
use crate::report::aggregate::aggregate_national;
use crate::report::format::{
    format_incidence_sentence, format_region_sentence, format_vaccination_sentence,
};

pub const SPAIN_LABEL: &str = "🇪🇸 España";

/// Chart of the daily figures, rendered by the dashboard server.
pub const GRAPH_IMAGE_PATH: &str =
    "render/d-solo/HukfaHZgk/covid19?orgId=1&panelId=2&width=1000&height=500&tz=Europe%2FMadrid";
pub const VACCINE_IMAGE_PATH: &str = "render/d-solo/TeEplNgRk/covid-vacunas-espana?orgId=1&panelId=2&width=1000&height=500&tz=Europe%2FMadrid";

const EVOLUTION_DASHBOARD: &str = "d/HukfaHZgk/covid19?orgId=1";
const COMPARISON_DASHBOARD: &str = "d/h6K39NRRk/covid19-comparison?orgId=1";
const VACCINE_DASHBOARD: &str = "d/TeEplNgRk/covid-vacunas-espana?orgId=1";

/// Last block of a territorial report.  Both can't go in the same post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportTail {
    #[default]
    Hospitals,
    Vaccines,
}

/// One post for one territory.
///
/// ```text
/// Madrid - 05/08/2020:
///
/// 💉 PCRs: +7 🔺5 (Totales: 1.207)
/// 💉 PCRs 24h: +3 🔙
/// 💥 IA 14 días: 12,5/100.000 hab. 🔻1
///
/// 😢 Muertes: +1 (Totales: 8.400)
///
/// 🚑 Hospitalizados: 3,2% 🔺0,1
/// 🏥 UCI: 5% 🔙
/// ```
pub fn build_territorial_report(
    label: &str,
    header: &str,
    today: &Snapshot,
    yesterday: &Snapshot,
    accumulated: &Snapshot,
    tail: ReportTail,
) -> String {
    let mut sentences: Vec<String> = vec![format!("{label} - {header}:"), String::new()];
    sentences.push(format_region_sentence(
        "💉 PCRs",
        today.pcrs.unwrap_or_default(),
        yesterday.pcrs,
        accumulated.pcrs,
    ));
    if let Some(pcrs_last_24h) = today.pcrs_last_24h {
        sentences.push(format_region_sentence(
            "💉 PCRs 24h",
            pcrs_last_24h,
            yesterday.pcrs_last_24h,
            None,
        ));
    }
    sentences.push(format_incidence_sentence(
        "💥 IA 14 días",
        today.accumulated_incidence.unwrap_or_default(),
        yesterday.accumulated_incidence,
        "/100.000 hab.",
    ));
    sentences.push(String::new());
    sentences.push(format_region_sentence(
        "😢 Muertes",
        today.deaths.unwrap_or_default(),
        yesterday.deaths,
        accumulated.deaths,
    ));
    sentences.push(String::new());
    match tail {
        ReportTail::Hospitals => {
            sentences.push(hospital_sentence(
                "🚑 Hospitalizados",
                (today.percentage_admitted, yesterday.percentage_admitted),
                (today.admitted_people, yesterday.admitted_people),
            ));
            sentences.push(hospital_sentence(
                "🏥 UCI",
                (today.percentage_icu, yesterday.percentage_icu),
                (today.icu_people, yesterday.icu_people),
            ));
        }
        ReportTail::Vaccines => {
            sentences.push(format_region_sentence(
                "💉 Dosis",
                today.vaccinations.unwrap_or_default(),
                yesterday.vaccinations,
                accumulated.vaccinations,
            ));
            sentences.push(format_region_sentence(
                "💉 Pautas completas",
                today.completed_vaccinations.unwrap_or_default(),
                yesterday.completed_vaccinations,
                accumulated.completed_vaccinations,
            ));
        }
    }
    sentences.join("\n")
}

/// Occupancy when the report had it, new admissions otherwise.
fn hospital_sentence(
    label: &str,
    percentage: (Option<f64>, Option<f64>),
    admissions: (Option<f64>, Option<f64>),
) -> String {
    match percentage {
        (Some(today), yesterday) => format_incidence_sentence(label, today, yesterday, "%"),
        (None, _) => format_region_sentence(label, admissions.0.unwrap_or_default(), admissions.1, None),
    }
}

/// One report per region, sorted by label.  Regions missing yesterday or
/// in the accumulated data get empty snapshots there.
pub fn build_report_by_region(
    header: &str,
    today: &BTreeMap<Region, Snapshot>,
    yesterday: &BTreeMap<Region, Snapshot>,
    accumulated: &BTreeMap<Region, Snapshot>,
    tail: ReportTail,
) -> Vec<String> {
    let empty = Snapshot::default();
    today
        .iter()
        .sorted_by_key(|(region, _)| region.label())
        .map(|(region, snapshot)| {
            build_territorial_report(
                region.label(),
                header,
                snapshot,
                yesterday.get(region).unwrap_or(&empty),
                accumulated.get(region).unwrap_or(&empty),
                tail,
            )
        })
        .collect()
}

pub fn build_global_report(
    header: &str,
    today: &BTreeMap<Region, Snapshot>,
    yesterday: &BTreeMap<Region, Snapshot>,
    accumulated: &BTreeMap<Region, Snapshot>,
    tail: ReportTail,
) -> String {
    build_territorial_report(
        SPAIN_LABEL,
        header,
        &aggregate_national(today),
        &aggregate_national(yesterday),
        &aggregate_national(accumulated),
        tail,
    )
}

/// Body of a vaccination post: doses, first doses, complete courses and,
/// once they started being reported, extra doses.
pub fn build_vaccination_report(today: &Snapshot, accumulated: &Snapshot) -> String {
    let mut sentences = vec![
        format_vaccination_sentence(
            "💉 Dosis",
            accumulated.vaccinations.unwrap_or_default(),
            today.vaccinations.unwrap_or_default(),
            None,
        ),
        format_vaccination_sentence(
            "👤 Primera dosis",
            accumulated.first_dose_vaccinations.unwrap_or_default(),
            today.first_dose_vaccinations.unwrap_or_default(),
            today.percentage_first_dose,
        ),
        format_vaccination_sentence(
            "👥 Pauta completa",
            accumulated.completed_vaccinations.unwrap_or_default(),
            today.completed_vaccinations.unwrap_or_default(),
            today.percentage_completed_vaccination,
        ),
    ];
    if let Some(extra) = accumulated.extra_dose_vaccinations {
        sentences.push(format_vaccination_sentence(
            "➕ Dosis adicional",
            extra,
            today.extra_dose_vaccinations.unwrap_or_default(),
            today.percentage_extra_dose,
        ));
    }
    sentences.join("\n")
}

/// The national post, linking the interactive chart, followed by one post per
/// region sorted by label.
pub fn build_vaccination_posts(
    date: Date,
    today: &BTreeMap<Region, Snapshot>,
    accumulated: &BTreeMap<Region, Snapshot>,
    dashboard_url: &str,
) -> (String, Vec<String>) {
    let day = date.strftime("%d/%m/%Y").to_string();
    let national = format!(
        "{SPAIN_LABEL} - Vacunación a {day}:\n\n{}\n\n➡️ Gráfico Interactivo: {}",
        build_vaccination_report(&aggregate_national(today), &aggregate_national(accumulated)),
        dashboard_link(dashboard_url, VACCINE_DASHBOARD),
    );
    let empty = Snapshot::default();
    let regions = accumulated
        .iter()
        .sorted_by_key(|(region, _)| region.label())
        .map(|(region, acc)| {
            format!(
                "{} - Vacunación a {day}:\n\n{}",
                region.label(),
                build_vaccination_report(today.get(region).unwrap_or(&empty), acc)
            )
        })
        .collect();
    (national, regions)
}

/// The day the figures refer to, that is the day before.  On Mondays the
/// report covers the whole weekend.
pub fn daily_date_header(date: Date) -> String {
    let previous = date.saturating_sub(1.day());
    if date.weekday() == Weekday::Monday {
        let friday = date.saturating_sub(3.days());
        format!(
            "{} al {}",
            friday.strftime("%d/%m/%Y"),
            previous.strftime("%d/%m/%Y")
        )
    } else {
        previous.strftime("%d/%m/%Y").to_string()
    }
}

/// `"Sem. 27/07 al 02/08"`
pub fn weekly_date_header(date: Date) -> String {
    let (monday, sunday) = week_bounds(date);
    format!(
        "Sem. {} al {}",
        monday.strftime("%d/%m"),
        sunday.strftime("%d/%m")
    )
}

fn dashboard_link(dashboard_url: &str, path: &str) -> String {
    format!("{}/{}", dashboard_url.trim_end_matches('/'), path)
}

pub fn daily_final_post(dashboard_url: &str) -> String {
    [
        "¡Accede a los gráficos interactivos!".to_string(),
        String::new(),
        format!("Evolución ➡️ {}", dashboard_link(dashboard_url, EVOLUTION_DASHBOARD)),
        format!("Comparación ➡️ {}", dashboard_link(dashboard_url, COMPARISON_DASHBOARD)),
    ]
    .join("\n")
}

pub fn weekly_final_post(dashboard_url: &str) -> String {
    [
        "¡Accede a los gráficos interactivos!".to_string(),
        String::new(),
        format!(
            "Evolución ➡️ {}&var-group_by=1w,4d",
            dashboard_link(dashboard_url, EVOLUTION_DASHBOARD)
        ),
        String::new(),
        "* Los datos de nuevos hospitalizados e ingresados en UCI se basan en la Tabla 2 del informe diario de Sanidad."
            .to_string(),
    ]
    .join("\n")
}

/// Address of a chart image, optionally bounded in time and with dashboard
/// variables.
pub fn graph_url(
    server: &str,
    path: &str,
    from: Option<Date>,
    to: Option<Date>,
    vars: &[(&str, &str)],
) -> String {
    let mut url = format!("{}/{}", server.trim_end_matches('/'), path);
    if let Some(from) = from {
        url.push_str(&format!("&from={}", epoch_millis(from)));
    }
    if let Some(to) = to {
        url.push_str(&format!("&to={}", epoch_millis(to)));
    }
    for (k, v) in vars {
        url.push_str(&format!("&var-{k}={v}"));
    }
    url
}
