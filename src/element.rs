use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub const MAX_ATOMIC_NUMBER: u32 = 118;
pub const FALLBACK_CATEGORY_COLOR: u32 = 0xe6ee9c;

const HALOGEN_NUMBERS: [u32; 6] = [9, 17, 35, 53, 85, 117];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ElementImage {
    pub url: String,
    #[serde(default)]
    pub attribution: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Element {
    pub number: u32,
    pub symbol: String,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_mass")]
    pub atomic_mass: Option<f64>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub electron_configuration: Option<String>,
    #[serde(default)]
    pub electron_configuration_semantic: Option<String>,
    #[serde(default)]
    pub discovered_by: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub applications: Vec<String>,
    #[serde(default)]
    pub image: Option<ElementImage>,
}

impl Element {
    pub fn new(number: u32, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            number,
            symbol: symbol.into(),
            name: name.into(),
            atomic_mass: None,
            category: String::new(),
            phase: String::new(),
            electron_configuration: None,
            electron_configuration_semantic: None,
            discovered_by: None,
            summary: None,
            applications: Vec::new(),
            image: None,
        }
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.atomic_mass = Some(mass);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_configuration(mut self, notation: impl Into<String>) -> Self {
        self.electron_configuration = Some(notation.into());
        self
    }

    pub fn with_semantic_configuration(mut self, notation: impl Into<String>) -> Self {
        self.electron_configuration_semantic = Some(notation.into());
        self
    }

    pub fn display_category(&self) -> Category {
        Category::from_name(&self.category)
    }

    pub fn configuration_notation(&self) -> Option<&str> {
        [
            self.electron_configuration_semantic.as_deref(),
            self.electron_configuration.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|notation| !notation.trim().is_empty())
    }

    pub fn mass_label(&self) -> String {
        match self.atomic_mass {
            Some(mass) => format!("{mass}"),
            None => "unknown".to_string(),
        }
    }
}

fn lenient_mass<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|value| match value {
            serde_json::Value::Number(number) => number.as_f64(),
            serde_json::Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
        .filter(|mass: &f64| mass.is_finite()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    AlkaliMetal,
    AlkalineEarthMetal,
    TransitionMetal,
    PostTransitionMetal,
    Metalloid,
    Nonmetal,
    Halogen,
    NobleGas,
    Lanthanide,
    Actinide,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::AlkaliMetal,
        Category::AlkalineEarthMetal,
        Category::TransitionMetal,
        Category::PostTransitionMetal,
        Category::Metalloid,
        Category::Nonmetal,
        Category::Halogen,
        Category::NobleGas,
        Category::Lanthanide,
        Category::Actinide,
    ];

    pub fn from_name(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.name() == lower || category.variants().contains(&lower.as_str()))
            .unwrap_or(Category::Unknown)
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::AlkaliMetal => "alkali metal",
            Category::AlkalineEarthMetal => "alkaline earth metal",
            Category::TransitionMetal => "transition metal",
            Category::PostTransitionMetal => "post-transition metal",
            Category::Metalloid => "metalloid",
            Category::Nonmetal => "nonmetal",
            Category::Halogen => "halogen",
            Category::NobleGas => "noble gas",
            Category::Lanthanide => "lanthanide",
            Category::Actinide => "actinide",
            Category::Unknown => "unknown",
        }
    }

    fn variants(self) -> &'static [&'static str] {
        match self {
            Category::Nonmetal => &["diatomic nonmetal", "polyatomic nonmetal"],
            Category::TransitionMetal => &["probably transition metal"],
            Category::PostTransitionMetal => &["probably post-transition metal"],
            _ => &[],
        }
    }

    pub fn hex(self) -> u32 {
        match self {
            Category::AlkaliMetal => 0xff8a80,
            Category::AlkalineEarthMetal => 0xff80ab,
            Category::TransitionMetal => 0xea80fc,
            Category::PostTransitionMetal => 0xb388ff,
            Category::Metalloid => 0x8c9eff,
            Category::Nonmetal => 0x82b1ff,
            Category::Halogen => 0x80d8ff,
            Category::NobleGas => 0x84ffff,
            Category::Lanthanide => 0xa7ffeb,
            Category::Actinide => 0xb9f6ca,
            Category::Unknown => FALLBACK_CATEGORY_COLOR,
        }
    }

    pub fn color(self) -> [f32; 3] {
        hex_to_rgb(self.hex())
    }
}

pub fn hex_to_rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid dataset json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dataset contains no elements")]
    Empty,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DatasetFile {
    Wrapped { elements: Vec<Element> },
    Bare(Vec<Element>),
}

#[derive(Debug, Clone, Default)]
pub struct ElementDataset {
    elements: BTreeMap<u32, Arc<Element>>,
}

impl ElementDataset {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let contents = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        let elements = match serde_json::from_str(json)? {
            DatasetFile::Wrapped { elements } => elements,
            DatasetFile::Bare(elements) => elements,
        };
        let dataset = Self::from_elements(elements);
        if dataset.is_empty() {
            return Err(DatasetError::Empty);
        }
        Ok(dataset)
    }

    pub fn from_elements(elements: impl IntoIterator<Item = Element>) -> Self {
        let mut map = BTreeMap::new();
        for mut element in elements {
            if element.number == 0 || element.number > MAX_ATOMIC_NUMBER {
                log::warn!(
                    "skipping {} with atomic number {}",
                    element.name,
                    element.number
                );
                continue;
            }
            apply_fixups(&mut element);
            map.insert(element.number, Arc::new(element));
        }
        Self { elements: map }
    }

    pub fn get(&self, number: u32) -> Option<&Arc<Element>> {
        self.elements.get(&number)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Element>> {
        self.elements.values()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

fn apply_fixups(element: &mut Element) {
    if HALOGEN_NUMBERS.contains(&element.number) && element.category != "halogen" {
        log::debug!(
            "recategorising {} from {:?} to halogen",
            element.symbol,
            element.category
        );
        element.category = "halogen".to_string();
    }
    if element.applications.is_empty() {
        element.applications = applications_for(&element.symbol)
            .iter()
            .map(|entry| entry.to_string())
            .collect();
    }
}

fn applications_for(symbol: &str) -> &'static [&'static str] {
    match symbol {
        "H" => &["Fuel for stars", "Hydrogen fuel cells", "Industrial processes"],
        "He" => &[
            "Cooling superconducting magnets",
            "Lifting balloons",
            "Deep-sea diving mixtures",
        ],
        "Li" => &["Lithium-ion batteries", "Psychiatric medications", "Aerospace alloys"],
        "Be" => &["Aerospace components", "X-ray windows", "Nuclear reactors"],
        "C" => &["Structural materials", "Organic chemistry", "Energy storage"],
        "O" => &["Respiration", "Combustion", "Industrial oxidation"],
        "Na" => &["Salt (NaCl)", "Street lighting", "Heat transfer in nuclear reactors"],
        "Al" => &[
            "Lightweight structural materials",
            "Packaging",
            "Electrical transmission lines",
        ],
        "Si" => &["Semiconductors", "Solar cells", "Glass production"],
        "Fe" => &["Structural steel", "Vehicles", "Machinery manufacturing"],
        "Cu" => &["Electrical wiring", "Plumbing", "Electronics"],
        "Ag" => &["Electronics", "Photography", "Antimicrobial applications"],
        "Au" => &["Electronics", "Jewelry", "Dentistry"],
        "Hg" => &["Thermometers", "Fluorescent lighting", "Dental amalgams"],
        "Pb" => &["Batteries", "Radiation shielding", "Historical plumbing"],
        "U" => &["Nuclear fuel", "Military applications", "Radiation shielding"],
        _ => &["Industrial applications", "Scientific research"],
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_JSON: &str = r#"{
        "elements": [
            {"number": 1, "symbol": "H", "name": "Hydrogen", "atomic_mass": 1.008,
             "category": "diatomic nonmetal", "phase": "Gas",
             "electron_configuration": "1s1", "electron_configuration_semantic": "1s1"},
            {"number": 11, "symbol": "Na", "name": "Sodium", "atomic_mass": 22.98976928,
             "category": "alkali metal", "phase": "Solid"},
            {"number": 17, "symbol": "Cl", "name": "Chlorine", "atomic_mass": "35.45",
             "category": "diatomic nonmetal", "phase": "Gas",
             "electron_configuration_semantic": "[Ne] 3s2 3p5"},
            {"number": 29, "symbol": "Cu", "name": "Copper", "atomic_mass": 63.546,
             "category": "transition metal", "phase": "Solid",
             "electron_configuration_semantic": "[Ar] 3d10 4s1",
             "image": {"url": "https://example.org/cu.jpg", "attribution": "test"}},
            {"number": 58, "symbol": "Ce", "name": "Cerium", "atomic_mass": 140.116,
             "category": "lanthanide", "phase": "Solid"},
            {"number": 118, "symbol": "Og", "name": "Oganesson", "atomic_mass": null,
             "category": "unknown, predicted to be noble gas", "phase": "Solid"}
        ]
    }"#;

    #[test]
    fn parse_dataset_keyed_by_number() {
        let dataset = ElementDataset::from_json(SAMPLE_JSON).expect("parse dataset");
        assert_eq!(dataset.len(), 6);
        assert_eq!(dataset.get(29).unwrap().symbol, "Cu");
        let numbers: Vec<u32> = dataset.iter().map(|element| element.number).collect();
        assert_eq!(numbers, vec![1, 11, 17, 29, 58, 118]);
    }

    #[test]
    fn tolerant_atomic_mass() {
        let dataset = ElementDataset::from_json(SAMPLE_JSON).unwrap();
        assert_eq!(dataset.get(17).unwrap().atomic_mass, Some(35.45));
        assert_eq!(dataset.get(118).unwrap().atomic_mass, None);
        assert_eq!(dataset.get(118).unwrap().mass_label(), "unknown");
    }

    #[test]
    fn halogen_fixup_and_applications() {
        let dataset = ElementDataset::from_json(SAMPLE_JSON).unwrap();
        let chlorine = dataset.get(17).unwrap();
        assert_eq!(chlorine.category, "halogen");
        assert_eq!(chlorine.display_category(), Category::Halogen);
        assert_eq!(dataset.get(29).unwrap().applications[0], "Electrical wiring");
        assert_eq!(
            dataset.get(58).unwrap().applications,
            vec!["Industrial applications", "Scientific research"]
        );
    }

    #[test]
    fn bare_array_and_out_of_range_numbers() {
        let json = r#"[{"number": 0, "symbol": "X", "name": "Nothing"},
                       {"number": 2, "symbol": "He", "name": "Helium"},
                       {"number": 130, "symbol": "Zz", "name": "Too heavy"}]"#;
        let dataset = ElementDataset::from_json(json).unwrap();
        assert_eq!(dataset.len(), 1);
        assert!(dataset.get(2).is_some());
    }

    #[test]
    fn empty_and_invalid_dataset() {
        assert!(matches!(
            ElementDataset::from_json(r#"{"elements": []}"#),
            Err(DatasetError::Empty)
        ));
        assert!(matches!(
            ElementDataset::from_json("not json"),
            Err(DatasetError::Json(_))
        ));
        let missing = ElementDataset::load(Path::new("does/not/exist.json")).unwrap_err();
        assert!(missing.to_string().contains("does/not/exist.json"));
    }

    #[test]
    fn category_mapping_and_colors() {
        assert_eq!(Category::from_name("Diatomic Nonmetal"), Category::Nonmetal);
        assert_eq!(Category::from_name("polyatomic nonmetal"), Category::Nonmetal);
        assert_eq!(
            Category::from_name("probably transition metal"),
            Category::TransitionMetal
        );
        assert_eq!(Category::from_name("noble gas"), Category::NobleGas);
        assert_eq!(
            Category::from_name("unknown, probably transition metal"),
            Category::Unknown
        );
        assert_eq!(Category::Unknown.hex(), FALLBACK_CATEGORY_COLOR);
        assert_eq!(hex_to_rgb(0xff0000), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn semantic_notation_preferred_over_raw() {
        let element = Element::new(3, "Li", "Lithium")
            .with_configuration("1s2 2s1")
            .with_semantic_configuration("[He] 2s1");
        assert_eq!(element.configuration_notation(), Some("[He] 2s1"));
        let blank_semantic = Element::new(3, "Li", "Lithium")
            .with_configuration("1s2 2s1")
            .with_semantic_configuration("  ");
        assert_eq!(blank_semantic.configuration_notation(), Some("1s2 2s1"));
        assert_eq!(Element::new(3, "Li", "Lithium").configuration_notation(), None);
    }
}
