use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

/// Label of the whole country.  Never used as a storage key.
pub const SPAIN: &str = "España";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeographyError {
    #[error("Unknown region {0}")]
    UnknownRegion(String),
}

/// The 17 autonomous communities plus Ceuta and Melilla.
///
/// Variants are declared in the order of their labels, so the derived `Ord`
/// matches sorting by label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Region {
    Andalucia,
    Aragon,
    Asturias,
    Baleares,
    ComunidadValenciana,
    Canarias,
    Cantabria,
    CastillaLaMancha,
    CastillaYLeon,
    Cataluna,
    Ceuta,
    Extremadura,
    Galicia,
    LaRioja,
    Madrid,
    Melilla,
    Murcia,
    Navarra,
    PaisVasco,
}

/// Either a single region or the whole country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Territory {
    Country,
    Region(Region),
}

/// Which capacity is used to weight a region when aggregating ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weight {
    Population,
    AdmittedBeds,
    IcuBeds,
}

struct RegionInfo {
    region: Region,
    label: &'static str,
    code: &'static str,
    population: u64,
    admitted_beds: u64,
    icu_beds: u64,
}

const REGIONS: [RegionInfo; 19] = [
    RegionInfo { region: Region::Andalucia, label: "Andalucía", code: "AN", population: 8_414_192, admitted_beds: 19_520, icu_beds: 1_053 },
    RegionInfo { region: Region::Aragon, label: "Aragón", code: "AR", population: 1_319_281, admitted_beds: 4_614, icu_beds: 251 },
    RegionInfo { region: Region::Asturias, label: "Asturias", code: "AS", population: 1_022_840, admitted_beds: 3_612, icu_beds: 164 },
    RegionInfo { region: Region::Baleares, label: "Baleares", code: "IB", population: 1_149_490, admitted_beds: 3_806, icu_beds: 242 },
    RegionInfo { region: Region::ComunidadValenciana, label: "C. Valenciana", code: "VC", population: 5_003_797, admitted_beds: 14_306, icu_beds: 783 },
    RegionInfo { region: Region::Canarias, label: "Canarias", code: "CN", population: 2_153_472, admitted_beds: 6_812, icu_beds: 421 },
    RegionInfo { region: Region::Cantabria, label: "Cantabria", code: "CB", population: 581_081, admitted_beds: 1_904, icu_beds: 112 },
    RegionInfo { region: Region::CastillaLaMancha, label: "Castilla La Mancha", code: "CM", population: 2_032_851, admitted_beds: 5_418, icu_beds: 314 },
    RegionInfo { region: Region::CastillaYLeon, label: "Castilla y León", code: "CL", population: 2_399_575, admitted_beds: 8_402, icu_beds: 362 },
    RegionInfo { region: Region::Cataluna, label: "Cataluña", code: "CT", population: 7_675_124, admitted_beds: 25_011, icu_beds: 1_247 },
    RegionInfo { region: Region::Ceuta, label: "Ceuta", code: "CE", population: 84_778, admitted_beds: 252, icu_beds: 18 },
    RegionInfo { region: Region::Extremadura, label: "Extremadura", code: "EX", population: 1_067_705, admitted_beds: 3_904, icu_beds: 152 },
    RegionInfo { region: Region::Galicia, label: "Galicia", code: "GA", population: 2_699_404, admitted_beds: 9_218, icu_beds: 384 },
    RegionInfo { region: Region::LaRioja, label: "La Rioja", code: "RI", population: 316_795, admitted_beds: 1_006, icu_beds: 61 },
    RegionInfo { region: Region::Madrid, label: "Madrid", code: "MD", population: 6_663_356, admitted_beds: 19_808, icu_beds: 1_124 },
    RegionInfo { region: Region::Melilla, label: "Melilla", code: "ML", population: 86_486, admitted_beds: 248, icu_beds: 21 },
    RegionInfo { region: Region::Murcia, label: "Murcia", code: "MC", population: 1_493_912, admitted_beds: 4_512, icu_beds: 273 },
    RegionInfo { region: Region::Navarra, label: "Navarra", code: "NC", population: 654_216, admitted_beds: 2_010, icu_beds: 128 },
    RegionInfo { region: Region::PaisVasco, label: "País Vasco", code: "PV", population: 2_207_797, admitted_beds: 7_296, icu_beds: 382 },
];

/// Alternative spellings found in the ministry and ISCIII reports, keyed by
/// their folded form (see [`fold`]).
const ALIASES: [(&str, Region); 17] = [
    ("illesbalears", Region::Baleares),
    ("islasbaleares", Region::Baleares),
    ("balears", Region::Baleares),
    ("comunidadvalenciana", Region::ComunidadValenciana),
    ("comunitatvalenciana", Region::ComunidadValenciana),
    ("valencia", Region::ComunidadValenciana),
    ("principadodeasturias", Region::Asturias),
    ("castillamancha", Region::CastillaLaMancha),
    ("catalunya", Region::Cataluna),
    ("comunidaddemadrid", Region::Madrid),
    ("regiondemurcia", Region::Murcia),
    ("comunidadforaldenavarra", Region::Navarra),
    ("euskadi", Region::PaisVasco),
    ("rioja", Region::LaRioja),
    ("galiza", Region::Galicia),
    ("canaries", Region::Canarias),
    ("andalusia", Region::Andalucia),
];

impl Region {
    pub const ALL: [Region; 19] = [
        Region::Andalucia,
        Region::Aragon,
        Region::Asturias,
        Region::Baleares,
        Region::ComunidadValenciana,
        Region::Canarias,
        Region::Cantabria,
        Region::CastillaLaMancha,
        Region::CastillaYLeon,
        Region::Cataluna,
        Region::Ceuta,
        Region::Extremadura,
        Region::Galicia,
        Region::LaRioja,
        Region::Madrid,
        Region::Melilla,
        Region::Murcia,
        Region::Navarra,
        Region::PaisVasco,
    ];

    fn info(self) -> &'static RegionInfo {
        &REGIONS[self as usize]
    }

    /// Canonical label, used as the storage key and in the reports.
    pub fn label(self) -> &'static str {
        self.info().label
    }

    /// Two letter code used by the ISCIII aggregated csv file.
    pub fn code(self) -> &'static str {
        self.info().code
    }

    pub fn from_code(code: &str) -> Result<Region, GeographyError> {
        let code = code.trim();
        REGIONS
            .iter()
            .find(|e| e.code == code)
            .map(|e| e.region)
            .ok_or_else(|| GeographyError::UnknownRegion(code.to_string()))
    }

    pub fn population(self) -> u64 {
        self.info().population
    }

    pub fn admitted_beds(self) -> u64 {
        self.info().admitted_beds
    }

    pub fn icu_beds(self) -> u64 {
        self.info().icu_beds
    }

    pub fn weight(self, weight: Weight) -> u64 {
        match weight {
            Weight::Population => self.population(),
            Weight::AdmittedBeds => self.admitted_beds(),
            Weight::IcuBeds => self.icu_beds(),
        }
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Lowercase, strip accents and drop everything that is not alphanumeric.
fn fold(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'Á' | 'À' => 'a',
            'é' | 'è' | 'É' | 'È' => 'e',
            'í' | 'ì' | 'Í' | 'Ì' => 'i',
            'ó' | 'ò' | 'Ó' | 'Ò' => 'o',
            'ú' | 'ü' | 'Ú' | 'Ü' => 'u',
            'ñ' | 'Ñ' => 'n',
            _ => c.to_ascii_lowercase(),
        })
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

impl FromStr for Region {
    type Err = GeographyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(e) = REGIONS.iter().find(|e| e.label == s) {
            return Ok(e.region);
        }
        let key = fold(s);
        if key.is_empty() {
            return Err(GeographyError::UnknownRegion(s.to_string()));
        }
        REGIONS
            .iter()
            .find(|e| fold(e.label) == key)
            .map(|e| e.region)
            .or_else(|| ALIASES.iter().find(|(k, _)| *k == key).map(|(_, r)| *r))
            .ok_or_else(|| GeographyError::UnknownRegion(s.to_string()))
    }
}

impl Territory {
    pub fn label(self) -> &'static str {
        match self {
            Territory::Country => SPAIN,
            Territory::Region(region) => region.label(),
        }
    }

    /// Population, or the sum over all regions for the whole country.
    pub fn population(self) -> u64 {
        self.weight(Weight::Population)
    }

    pub fn admitted_beds(self) -> u64 {
        self.weight(Weight::AdmittedBeds)
    }

    pub fn icu_beds(self) -> u64 {
        self.weight(Weight::IcuBeds)
    }

    pub fn weight(self, weight: Weight) -> u64 {
        match self {
            Territory::Country => Region::ALL.iter().map(|r| r.weight(weight)).sum(),
            Territory::Region(region) => region.weight(weight),
        }
    }
}

impl From<Region> for Territory {
    fn from(region: Region) -> Self {
        Territory::Region(region)
    }
}

impl FromStr for Territory {
    type Err = GeographyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if fold(s) == fold(SPAIN) {
            return Ok(Territory::Country);
        }
        s.parse::<Region>().map(Territory::Region)
    }
}

pub fn population_of(name: &str) -> Result<u64, GeographyError> {
    Ok(name.parse::<Territory>()?.population())
}

pub fn admitted_beds_of(name: &str) -> Result<u64, GeographyError> {
    Ok(name.parse::<Territory>()?.admitted_beds())
}

pub fn icu_beds_of(name: &str) -> Result<u64, GeographyError> {
    Ok(name.parse::<Territory>()?.icu_beds())
}

/// Cases per 100,000 inhabitants.
pub fn impact_per_100k(total: f64, territory: Territory) -> f64 {
    match territory.population() {
        0 => 0.0,
        population => total * 100_000.0 / population as f64,
    }
}
