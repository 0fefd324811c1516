use std::collections::BTreeMap;

use crate::element::Element;

pub const SHELL_CAPACITIES: [u32; 7] = [2, 8, 18, 32, 32, 18, 8];

const HE_CORE: &str = "1s2";
const NE_CORE: &str = "1s2 2s2 2p6";
const AR_CORE: &str = "1s2 2s2 2p6 3s2 3p6";
const KR_CORE: &str = "1s2 2s2 2p6 3s2 3p6 4s2 3d10 4p6";
const XE_CORE: &str = "1s2 2s2 2p6 3s2 3p6 4s2 3d10 4p6 5s2 4d10 5p6";
const RN_CORE: &str = "1s2 2s2 2p6 3s2 3p6 4s2 3d10 4p6 5s2 4d10 5p6 6s2 4f14 5d10 6p6";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellConfiguration {
    shells: BTreeMap<u8, u32>,
}

impl ShellConfiguration {
    pub fn get(&self, shell: u8) -> u32 {
        self.shells.get(&shell).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.shells.iter().map(|(shell, count)| (*shell, *count))
    }

    pub fn shell_count(&self) -> usize {
        self.shells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shells.is_empty()
    }

    pub fn total_electrons(&self) -> u32 {
        self.shells.values().sum()
    }

    fn add(&mut self, shell: u8, electrons: u32) {
        if electrons == 0 {
            return;
        }
        let entry = self.shells.entry(shell).or_insert(0);
        *entry = entry.saturating_add(electrons);
    }

    fn is_consistent_with(&self, atomic_number: u32) -> bool {
        let within_capacity = self
            .shells
            .iter()
            .all(|(shell, count)| capacity(*shell).is_some_and(|cap| *count <= cap));
        within_capacity && self.total_electrons() <= atomic_number
    }
}

impl FromIterator<(u8, u32)> for ShellConfiguration {
    fn from_iter<I: IntoIterator<Item = (u8, u32)>>(iter: I) -> Self {
        let mut config = Self::default();
        for (shell, electrons) in iter {
            config.add(shell, electrons);
        }
        config
    }
}

pub fn capacity(shell: u8) -> Option<u32> {
    SHELL_CAPACITIES.get(usize::from(shell).checked_sub(1)?).copied()
}

pub fn resolve(element: &Element) -> ShellConfiguration {
    match element.configuration_notation() {
        Some(notation) => parse_configuration(notation, element.number),
        None => shells_by_number(element.number),
    }
}

pub fn shells_by_number(atomic_number: u32) -> ShellConfiguration {
    let mut config = ShellConfiguration::default();
    let mut remaining = atomic_number;
    for (index, capacity) in SHELL_CAPACITIES.iter().enumerate() {
        if remaining == 0 {
            break;
        }
        let electrons = remaining.min(*capacity);
        config.add(index as u8 + 1, electrons);
        remaining -= electrons;
    }
    config
}

pub fn parse_configuration(notation: &str, atomic_number: u32) -> ShellConfiguration {
    let Some(expanded) = expand_noble_gas(notation) else {
        log::debug!("unrecognised noble gas core in {notation:?}");
        return ShellConfiguration::default();
    };

    let config: ShellConfiguration = expanded.split_whitespace().filter_map(parse_term).collect();
    if config.is_empty() || !config.is_consistent_with(atomic_number) {
        log::debug!("falling back to shell filling for Z={atomic_number} ({notation:?})");
        return shells_by_number(atomic_number);
    }
    config
}

pub fn expand_noble_gas(notation: &str) -> Option<String> {
    let Some(open) = notation.find('[') else {
        return Some(notation.to_string());
    };
    let Some(close) = notation[open..].find(']').map(|offset| open + offset) else {
        return Some(notation.to_string());
    };
    let core = noble_gas_core(notation[open + 1..close].trim())?;
    Some(format!(
        "{core} {} {}",
        &notation[..open],
        &notation[close + 1..]
    ))
}

fn noble_gas_core(symbol: &str) -> Option<&'static str> {
    match symbol {
        "He" => Some(HE_CORE),
        "Ne" => Some(NE_CORE),
        "Ar" => Some(AR_CORE),
        "Kr" => Some(KR_CORE),
        "Xe" => Some(XE_CORE),
        "Rn" => Some(RN_CORE),
        _ => None,
    }
}

fn parse_term(term: &str) -> Option<(u8, u32)> {
    let mut chars = term.chars();
    let shell = chars.next()?.to_digit(10)?;
    if !matches!(chars.next()?, 's' | 'p' | 'd' | 'f') {
        return None;
    }
    let count = chars.as_str();
    if count.is_empty() || !count.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let electrons = count.parse().ok()?;
    (1..=7).contains(&shell).then_some((shell as u8, electrons))
}
