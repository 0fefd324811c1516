use std::collections::BTreeMap;
use std::sync::Arc;

use crate::element::{Category, Element, ElementDataset};
use crate::view::{CategoryKind, CategorySelection};

pub const MAX_RESULTS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hazard {
    Toxic,
    ExtremelyToxic,
    Carcinogenic,
    Corrosive,
    Flammable,
    WaterReactive,
    Asphyxiant,
    Pyrophoric,
    Oxidizer,
    Radioactive,
}

impl Hazard {
    pub const ALL: [Hazard; 10] = [
        Hazard::Toxic,
        Hazard::ExtremelyToxic,
        Hazard::Carcinogenic,
        Hazard::Corrosive,
        Hazard::Flammable,
        Hazard::WaterReactive,
        Hazard::Asphyxiant,
        Hazard::Pyrophoric,
        Hazard::Oxidizer,
        Hazard::Radioactive,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Hazard::Toxic => "toxic",
            Hazard::ExtremelyToxic => "extremely toxic",
            Hazard::Carcinogenic => "carcinogenic",
            Hazard::Corrosive => "corrosive",
            Hazard::Flammable => "flammable",
            Hazard::WaterReactive => "water-reactive",
            Hazard::Asphyxiant => "asphyxiant",
            Hazard::Pyrophoric => "pyrophoric",
            Hazard::Oxidizer => "oxidizer",
            Hazard::Radioactive => "radioactive",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Hazard::Toxic => "Toxic",
            Hazard::ExtremelyToxic => "Extremely Toxic",
            Hazard::Carcinogenic => "Carcinogenic",
            Hazard::Corrosive => "Corrosive",
            Hazard::Flammable => "Flammable",
            Hazard::WaterReactive => "Reacts with Water",
            Hazard::Asphyxiant => "Asphyxiant at High Concentrations",
            Hazard::Pyrophoric => "Pyrophoric",
            Hazard::Oxidizer => "Oxidizer",
            Hazard::Radioactive => "Radioactive",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        if lower == "extreme-toxic" {
            return Some(Hazard::ExtremelyToxic);
        }
        Self::ALL.into_iter().find(|hazard| hazard.name() == lower)
    }

    #[rustfmt::skip]
    pub fn symbols(self) -> &'static [&'static str] {
        match self {
            Hazard::Toxic => &[
                "Be", "As", "Pb", "Hg", "Cd", "Tl", "Os", "Po", "Pu", "F", "Cl", "Br", "I", "Sb",
                "Te", "Ba", "Cs", "Li", "Na", "K", "Rb", "V", "Cr", "Co", "Ni", "Se", "P", "U",
            ],
            Hazard::ExtremelyToxic => &["Pb", "Hg", "Cd", "As", "Be", "Tl", "Po", "F"],
            Hazard::Carcinogenic => &["Be", "Cd", "Ni", "As", "Cr"],
            Hazard::Corrosive => &["F", "Cl", "Br", "I", "Li", "Na", "K", "Rb", "Cs", "Fr"],
            Hazard::Flammable => &[
                "H", "Li", "Na", "K", "Rb", "Cs", "P", "Mg", "Al", "Fe", "Ti", "Zr", "Ce",
            ],
            Hazard::WaterReactive => &["Li", "Na", "K", "Rb", "Cs", "Fr", "Ca", "Sr", "Ba"],
            Hazard::Asphyxiant => &["He", "Ne", "Ar", "Kr", "Xe", "Rn", "N", "H"],
            Hazard::Pyrophoric => &["Li", "Na", "K", "Rb", "Cs", "P", "Ce"],
            Hazard::Oxidizer => &["O", "F", "Cl", "Br"],
            Hazard::Radioactive => &[
                "U", "Pu", "Ra", "Th", "Rn", "Po", "Tc", "Sr", "Am", "Cf", "Cm", "Np", "Pa", "Ac",
                "Pm", "Fr", "At", "Bi", "Es", "Fm", "Md", "No", "Lr",
            ],
        }
    }

    pub fn applies_to(self, element: &Element) -> bool {
        self.symbols().contains(&element.symbol.as_str())
    }
}

pub fn hazards_of(element: &Element) -> Vec<Hazard> {
    Hazard::ALL
        .into_iter()
        .filter(|hazard| hazard.applies_to(element))
        .collect()
}

pub fn special_note(element: &Element) -> Option<&'static str> {
    match element.symbol.as_str() {
        "H" => Some("Invisible flame"),
        "C" => Some("Dust can be explosive"),
        "P" => Some("White phosphorus glows in dark"),
        "F" => Some("Most reactive non-metal"),
        "Hg" => Some("Bioaccumulates"),
        "Pb" => Some("Neurotoxin"),
        "Te" => Some("Causes garlic breath"),
        "Rn" => Some("Accumulates in buildings"),
        "W" => Some("Highest melting point"),
        "Os" => Some("Densest natural element"),
        "Bi" => Some("Used in medicines for stomach upset"),
        _ => None,
    }
}

fn category_aliases(category: Category) -> &'static [&'static str] {
    match category {
        Category::AlkaliMetal => &["alkali", "alkali metal", "alkali metals", "group 1"],
        Category::AlkalineEarthMetal => &[
            "alkaline",
            "earth",
            "alkaline earth",
            "alkaline earth metal",
            "alkaline earth metals",
            "group 2",
        ],
        Category::TransitionMetal => &[
            "transition",
            "transition metal",
            "transition metals",
            "d-block",
        ],
        Category::PostTransitionMetal => &[
            "post-transition",
            "post transition",
            "post-transition metal",
            "post-transition metals",
            "poor metal",
        ],
        Category::Metalloid => &["metalloid", "metalloids", "semi-metal", "semi metal", "semimetal"],
        Category::Nonmetal => &["nonmetal", "nonmetals", "non-metal", "non metal"],
        Category::Halogen => &["halogen", "halogens", "group 17"],
        Category::NobleGas => &["noble", "noble gas", "noble gases", "inert gas", "group 18"],
        Category::Lanthanide => &["lanthanide", "lanthanides", "rare earth", "rare-earth"],
        Category::Actinide => &["actinide", "actinides", "actinoid"],
        Category::Unknown => &[],
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub elements: Vec<Arc<Element>>,
    pub categories: Vec<Category>,
    pub properties: Vec<Hazard>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.categories.is_empty() && self.properties.is_empty()
    }
}

pub fn search(dataset: &ElementDataset, query: &str) -> SearchResults {
    let query = query.trim();
    if query.is_empty() {
        return SearchResults::default();
    }
    let lower = query.to_lowercase();
    let mut results = SearchResults::default();
    let mut found: BTreeMap<u32, Arc<Element>> = BTreeMap::new();
    let mut collect = |element: &Arc<Element>| {
        found.entry(element.number).or_insert_with(|| Arc::clone(element));
    };

    for hazard in Hazard::ALL {
        if hazard.name().contains(&lower) {
            results.properties.push(hazard);
            dataset.iter().filter(|e| hazard.applies_to(e)).for_each(&mut collect);
        }
    }

    for category in Category::ALL {
        let matches = category_aliases(category)
            .iter()
            .any(|alias| alias.contains(&lower) || lower.contains(alias));
        if matches {
            results.categories.push(category);
            dataset
                .iter()
                .filter(|e| e.display_category() == category)
                .for_each(&mut collect);
        }
    }

    dataset
        .iter()
        .filter(|e| {
            e.name.to_lowercase().contains(&lower)
                || e.symbol.to_lowercase().contains(&lower)
                || e.number.to_string().contains(query)
        })
        .for_each(&mut collect);

    results.elements = found.into_values().take(MAX_RESULTS).collect();
    log::debug!("search {query:?}: {} results", results.elements.len());
    results
}

pub fn elements_for(dataset: &ElementDataset, selection: &CategorySelection) -> Vec<Arc<Element>> {
    match selection.kind {
        CategoryKind::Category => match Category::from_name(&selection.name) {
            Category::Unknown => {
                let lower = selection.name.trim().to_lowercase();
                dataset
                    .iter()
                    .filter(|e| e.category.to_lowercase() == lower)
                    .cloned()
                    .collect()
            }
            category => dataset
                .iter()
                .filter(|e| e.display_category() == category)
                .cloned()
                .collect(),
        },
        CategoryKind::Property => match Hazard::from_name(&selection.name) {
            Some(hazard) => dataset.iter().filter(|e| hazard.applies_to(e)).cloned().collect(),
            None => {
                log::warn!("unknown property {:?}", selection.name);
                Vec::new()
            }
        },
    }
}
