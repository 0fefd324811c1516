use std::f32::consts::TAU;
use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::element::Element;
use crate::layout::Label;
use crate::shells::{self, ShellConfiguration};
use crate::{IdAllocator, ObjectId};

pub const NUCLEUS_RADIUS: f32 = 2.5;
pub const NUCLEUS_COLOR: u32 = 0xff9999;
pub const NUCLEUS_EMISSIVE: u32 = 0x441111;
pub const ELECTRON_RADIUS: f32 = 0.4;
pub const ELECTRON_COLOR: u32 = 0x00ccff;
pub const ELECTRON_EMISSIVE: u32 = 0x0088aa;
pub const RING_COLOR: u32 = 0x00aaff;
pub const RING_TUBE_RADIUS: f32 = 0.12;
pub const BASE_SHELL_RADIUS: f32 = 5.0;
pub const SHELL_RADIUS_STEP: f32 = 3.0;

const SPEED_NUMERATOR: f32 = 0.5;
const SPEED_BASE: f32 = 0.8;
const SPEED_PER_SHELL: f32 = 0.2;

const SHELLS_PER_LINE: usize = 2;
const SYMBOL_LABEL_DEPTH: f32 = 3.0;
const SYMBOL_LABEL_SIZE: f32 = 1.25;
const NAME_LABEL_Y: f32 = 10.0;
const NAME_LABEL_SIZE: f32 = 1.75;
const COMPOSITION_LABEL_Y: f32 = -10.0;
const SHELL_LINES_Y: f32 = -15.0;
const SHELL_LINE_SPACING: f32 = 3.0;
const INFO_LABEL_SIZE: f32 = 1.05;

pub fn orbital_speed(shell: u8) -> f32 {
    SPEED_NUMERATOR / (SPEED_BASE + f32::from(shell) * SPEED_PER_SHELL)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Electron {
    pub id: ObjectId,
    pub shell: u8,
    pub radius: f32,
    pub initial_angle: f32,
    pub speed: f32,
    pub position: Vec2,
}

impl Electron {
    pub fn angle_at(&self, elapsed_seconds: f32) -> f32 {
        self.initial_angle + elapsed_seconds * self.speed
    }

    pub fn position_at(&self, elapsed_seconds: f32) -> Vec2 {
        let (sin, cos) = self.angle_at(elapsed_seconds).sin_cos();
        Vec2::new(self.radius * cos, self.radius * sin)
    }

    pub fn advance(&mut self, elapsed_seconds: f32) {
        self.position = self.position_at(elapsed_seconds);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    pub id: ObjectId,
    pub shell: u8,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Nucleus {
    pub id: ObjectId,
    pub radius: f32,
    pub label: Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Composition {
    pub protons: u32,
    pub neutrons: u32,
    pub electrons: u32,
}

impl Composition {
    pub fn of(element: &Element) -> Self {
        let protons = element.number;
        let mass = element.atomic_mass.unwrap_or(f64::from(protons));
        let neutrons = (mass.round() as i64 - i64::from(protons)).max(0) as u32;
        Self {
            protons,
            neutrons,
            electrons: protons,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Protons: {} | Neutrons: {} | Electrons: {}",
            self.protons, self.neutrons, self.electrons
        )
    }
}

pub fn shell_lines(shells: &ShellConfiguration) -> Vec<String> {
    let entries: Vec<String> = shells
        .iter()
        .map(|(shell, count)| format!("Shell {shell}: {count} electrons"))
        .collect();
    entries
        .chunks(SHELLS_PER_LINE)
        .map(|chunk| chunk.join(" | "))
        .collect()
}

#[derive(Debug, Clone)]
pub struct AtomicModel {
    pub element: Arc<Element>,
    pub shells: ShellConfiguration,
    pub composition: Composition,
    pub nucleus: Nucleus,
    pub rings: Vec<Ring>,
    pub electrons: Vec<Electron>,
    pub labels: Vec<Label>,
}

impl AtomicModel {
    pub fn build(element: Arc<Element>, ids: &mut IdAllocator) -> Self {
        let shells = shells::resolve(&element);
        Self::with_shells(element, shells, ids)
    }

    pub fn with_shells(
        element: Arc<Element>,
        shells: ShellConfiguration,
        ids: &mut IdAllocator,
    ) -> Self {
        let nucleus = Nucleus {
            id: ids.allocate(),
            radius: NUCLEUS_RADIUS,
            label: Label::new(
                ids,
                element.symbol.clone(),
                Vec3::new(0.0, 0.0, SYMBOL_LABEL_DEPTH),
                SYMBOL_LABEL_SIZE,
            ),
        };

        let mut rings = Vec::new();
        let mut electrons = Vec::new();
        let occupied = shells.iter().filter(|(_, count)| *count > 0);
        for (index, (shell, count)) in occupied.enumerate() {
            let radius = BASE_SHELL_RADIUS + index as f32 * SHELL_RADIUS_STEP;
            rings.push(Ring {
                id: ids.allocate(),
                shell,
                radius,
            });
            let speed = orbital_speed(shell);
            for slot in 0..count {
                let mut electron = Electron {
                    id: ids.allocate(),
                    shell,
                    radius,
                    initial_angle: TAU * slot as f32 / count as f32,
                    speed,
                    position: Vec2::ZERO,
                };
                electron.advance(0.0);
                electrons.push(electron);
            }
        }

        let composition = Composition::of(&element);
        let mut labels = vec![
            Label::new(
                ids,
                format!("{} ({})", element.name, element.symbol),
                Vec3::new(0.0, NAME_LABEL_Y, 0.0),
                NAME_LABEL_SIZE,
            ),
            Label::new(
                ids,
                composition.summary(),
                Vec3::new(0.0, COMPOSITION_LABEL_Y, 0.0),
                INFO_LABEL_SIZE,
            ),
        ];
        for (line_index, line) in shell_lines(&shells).into_iter().enumerate() {
            let y = SHELL_LINES_Y - line_index as f32 * SHELL_LINE_SPACING;
            labels.push(Label::new(ids, line, Vec3::new(0.0, y, 0.0), INFO_LABEL_SIZE));
        }

        log::info!(
            "built atomic model for {} ({} shells, {} electrons)",
            element.name,
            rings.len(),
            electrons.len()
        );

        Self {
            element,
            shells,
            composition,
            nucleus,
            rings,
            electrons,
            labels,
        }
    }

    pub fn animate(&mut self, elapsed_seconds: f32) {
        for electron in &mut self.electrons {
            electron.advance(elapsed_seconds);
        }
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        let mut ids = vec![self.nucleus.id, self.nucleus.label.id];
        ids.extend(self.rings.iter().map(|ring| ring.id));
        ids.extend(self.electrons.iter().map(|electron| electron.id));
        ids.extend(self.labels.iter().map(|label| label.id));
        ids
    }

    pub fn object_count(&self) -> usize {
        2 + self.rings.len() + self.electrons.len() + self.labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sodium() -> Arc<Element> {
        Arc::new(Element::new(11, "Na", "Sodium").with_mass(22.98976928))
    }

    #[test]
    fn rings_grow_outward_per_occupied_shell() {
        let mut ids = IdAllocator::default();
        let model = AtomicModel::build(sodium(), &mut ids);
        let radii: Vec<f32> = model.rings.iter().map(|ring| ring.radius).collect();
        assert_eq!(radii, vec![5.0, 8.0, 11.0]);
        assert_eq!(model.electrons.len(), 11);
        assert_eq!(model.nucleus.radius, NUCLEUS_RADIUS);
        assert_eq!(model.nucleus.label.text, "Na");
    }

    #[test]
    fn skipped_shells_leave_no_gap() {
        let mut ids = IdAllocator::default();
        let shells: ShellConfiguration = [(1, 2), (3, 5), (2, 0)].into_iter().collect();
        let model = AtomicModel::with_shells(sodium(), shells, &mut ids);
        let rings: Vec<(u8, f32)> = model.rings.iter().map(|ring| (ring.shell, ring.radius)).collect();
        assert_eq!(rings, vec![(1, 5.0), (3, 8.0)]);
        assert!(model.electrons.iter().filter(|e| e.shell == 3).all(|e| e.radius == 8.0));
    }

    #[test]
    fn electrons_evenly_spaced_and_slower_outside() {
        let mut ids = IdAllocator::default();
        let model = AtomicModel::build(sodium(), &mut ids);
        let second: Vec<&Electron> = model.electrons.iter().filter(|e| e.shell == 2).collect();
        assert_eq!(second.len(), 8);
        for (slot, electron) in second.iter().enumerate() {
            assert!((electron.initial_angle - TAU * slot as f32 / 8.0).abs() < 1e-6);
        }
        assert!(orbital_speed(1) > orbital_speed(2));
        assert!(orbital_speed(2) > orbital_speed(7));
        assert!((orbital_speed(1) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn electron_position_is_pure_function_of_time() {
        let mut ids = IdAllocator::default();
        let mut model = AtomicModel::build(sodium(), &mut ids);
        let electron = model.electrons[3].clone();
        let t = 12.75;
        let expected = Vec2::new(
            electron.radius * (electron.initial_angle + electron.speed * t).cos(),
            electron.radius * (electron.initial_angle + electron.speed * t).sin(),
        );
        assert_eq!(electron.position_at(t), expected);
        assert_eq!(electron.position_at(t), electron.position_at(t));
        model.animate(3.0);
        model.animate(t);
        assert_eq!(model.electrons[3].position, expected);
        assert!((model.electrons[3].position.length() - electron.radius).abs() < 1e-4);
    }

    #[test]
    fn composition_and_caption_lines() {
        let mut ids = IdAllocator::default();
        let model = AtomicModel::build(sodium(), &mut ids);
        assert_eq!(
            model.composition,
            Composition {
                protons: 11,
                neutrons: 12,
                electrons: 11
            }
        );
        let texts: Vec<&str> = model.labels.iter().map(|label| label.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Sodium (Na)",
                "Protons: 11 | Neutrons: 12 | Electrons: 11",
                "Shell 1: 2 electrons | Shell 2: 8 electrons",
                "Shell 3: 1 electrons",
            ]
        );
        assert!(model.labels[3].offset.y < model.labels[2].offset.y);
    }

    #[test]
    fn missing_mass_means_zero_neutrons() {
        let element = Element::new(118, "Og", "Oganesson");
        assert_eq!(Composition::of(&element).neutrons, 0);
    }

    #[test]
    fn object_ids_are_unique() {
        let mut ids = IdAllocator::default();
        let model = AtomicModel::build(sodium(), &mut ids);
        let mut all = model.object_ids();
        assert_eq!(all.len(), model.object_count());
        all.sort();
        all.dedup();
        assert_eq!(all.len(), model.object_count());
    }
}
