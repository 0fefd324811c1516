use std::sync::mpsc::Sender;
use std::sync::Arc;

use glam::Vec2;

use crate::element::Element;
use crate::scene::{Ray, SceneContext, SceneManager};

pub const HIGHLIGHT_EMISSIVE: [f32; 3] = [0x55 as f32 / 255.0; 3];
pub const HIGHLIGHT_SCALE: f32 = 1.3;

const TOOLTIP_OFFSET: f32 = 15.0;

#[derive(Debug, Clone)]
pub enum SceneEvent {
    ElementSelected(Arc<Element>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub position: Vec2,
    pub lines: Vec<String>,
}

impl Tooltip {
    fn for_element(element: &Element, cursor: Vec2) -> Self {
        Self {
            position: cursor + Vec2::splat(TOOLTIP_OFFSET),
            lines: vec![
                format!("{} ({})", element.name, element.symbol),
                format!("Atomic number: {}", element.number),
                format!("Atomic mass: {}", element.mass_label()),
                format!("Category: {}", element.category),
            ],
        }
    }
}

#[derive(Debug)]
pub struct Interaction {
    intersected: Option<u32>,
    touch_start: Option<Vec2>,
    tooltip: Option<Tooltip>,
    tap_threshold: f32,
    events: Sender<SceneEvent>,
}

impl Interaction {
    pub fn new(events: Sender<SceneEvent>, tap_threshold: f32) -> Self {
        Self {
            intersected: None,
            touch_start: None,
            tooltip: None,
            tap_threshold,
            events,
        }
    }

    pub fn intersected(&self) -> Option<u32> {
        self.intersected
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    pub fn pointer_moved(&mut self, scene: &mut SceneManager, cursor: Vec2) {
        self.update_intersection(scene, cursor);
        self.tooltip = scene
            .context()
            .filter(|context| context.table_visible())
            .zip(self.intersected)
            .and_then(|(context, number)| context.table().tile(number))
            .map(|tile| Tooltip::for_element(&tile.element, cursor));
    }

    pub fn click(&mut self, scene: &SceneManager) -> bool {
        let Some(context) = scene.context() else {
            return false;
        };
        if !context.table_visible() {
            return false;
        }
        let Some(tile) = self.intersected.and_then(|number| context.table().tile(number)) else {
            return false;
        };
        if self.events.send(SceneEvent::ElementSelected(Arc::clone(&tile.element))).is_err() {
            log::warn!("selection receiver dropped");
            return false;
        }
        self.tooltip = None;
        true
    }

    pub fn clear(&mut self, scene: &mut SceneManager) {
        self.tooltip = None;
        self.touch_start = None;
        let Some(previous) = self.intersected.take() else {
            return;
        };
        if let Some(tile) = scene
            .context_mut()
            .and_then(|context| context.table_mut().tile_mut(previous))
        {
            tile.restore();
        }
    }

    pub fn touch_start(&mut self, scene: &mut SceneManager, position: Vec2) {
        self.touch_start = Some(position);
        self.update_intersection(scene, position);
    }

    pub fn touch_end(&mut self, scene: &mut SceneManager, position: Vec2) -> bool {
        let Some(start) = self.touch_start.take() else {
            return false;
        };
        let moved = (position - start).abs();
        if moved.x >= self.tap_threshold || moved.y >= self.tap_threshold {
            return false;
        }
        self.update_intersection(scene, position);
        self.click(scene)
    }

    fn update_intersection(&mut self, scene: &mut SceneManager, cursor: Vec2) {
        let Some(context) = scene.context_mut() else {
            return;
        };
        let hit = match context.viewport.to_ndc(cursor) {
            Some(ndc) if context.table_visible() => {
                let ray = context.camera.ray(ndc);
                pick_tile(context, &ray)
            }
            _ => None,
        };
        if hit == self.intersected {
            return;
        }
        if let Some(previous) = self.intersected.take() {
            if let Some(tile) = context.table_mut().tile_mut(previous) {
                tile.restore();
            }
        }
        if let Some(number) = hit {
            if let Some(tile) = context.table_mut().tile_mut(number) {
                tile.highlight(HIGHLIGHT_EMISSIVE, HIGHLIGHT_SCALE);
                self.intersected = Some(number);
            }
        }
    }
}

fn pick_tile(context: &SceneContext, ray: &Ray) -> Option<u32> {
    let mut best: Option<(u32, f32)> = None;
    for tile in context.table().tiles() {
        let body = ray.intersect_aabb(tile.position, tile.half_extents());
        let labels = tile.labels.iter().filter_map(|label| {
            ray.intersect_sphere(tile.label_position(label), label.size * 0.5 * tile.scale)
        });
        let Some(t) = body.into_iter().chain(labels).reduce(f32::min) else {
            continue;
        };
        match best {
            Some((_, best_t)) if t >= best_t => {}
            _ => best = Some((tile.atomic_number(), t)),
        }
    }
    best.map(|(number, _)| number)
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{self, Receiver};
    use std::time::Instant;

    use super::*;
    use crate::config::SceneConfig;
    use crate::layout::cell_position;
    use crate::layout::tests::full_dataset;
    use crate::scene::Viewport;
    use crate::view::ViewController;

    fn setup() -> (SceneManager, Interaction, Receiver<SceneEvent>) {
        let mut scene = SceneManager::new(SceneConfig::default());
        scene.init();
        scene.populate_table(&full_dataset());
        scene.on_resize(800, 600);
        scene.show_table(Instant::now());
        let (tx, rx) = mpsc::channel();
        (scene, Interaction::new(tx, 10.0), rx)
    }

    fn screen_of(scene: &SceneManager, number: u32) -> Vec2 {
        let context = scene.context().unwrap();
        let tile = context.table().tile(number).unwrap();
        context
            .camera
            .project(tile.position, Viewport { width: 800, height: 600 })
            .unwrap()
    }

    fn highlighted(scene: &SceneManager) -> Vec<u32> {
        scene
            .context()
            .unwrap()
            .table()
            .tiles()
            .iter()
            .filter(|tile| tile.is_highlighted() || tile.scale != 1.0)
            .map(|tile| tile.atomic_number())
            .collect()
    }

    #[test]
    fn at_most_one_tile_highlighted() {
        let (mut scene, mut interaction, _rx) = setup();
        let hydrogen = screen_of(&scene, 1);
        interaction.pointer_moved(&mut scene, hydrogen);
        assert_eq!(interaction.intersected(), Some(1));
        assert_eq!(highlighted(&scene), vec![1]);

        let iron = screen_of(&scene, 26);
        interaction.pointer_moved(&mut scene, iron);
        assert_eq!(interaction.intersected(), Some(26));
        assert_eq!(highlighted(&scene), vec![26]);
        let restored = scene.context().unwrap().table().tile(1).unwrap();
        assert_eq!(restored.emissive, crate::layout::BASE_EMISSIVE);

        let context = scene.context().unwrap();
        let gap = context
            .camera
            .project(cell_position(0, 5), Viewport { width: 800, height: 600 })
            .unwrap();
        interaction.pointer_moved(&mut scene, gap);
        assert_eq!(interaction.intersected(), None);
        assert!(highlighted(&scene).is_empty());
    }

    #[test]
    fn click_selects_only_in_table_view() {
        let (mut scene, mut interaction, rx) = setup();
        let sodium = screen_of(&scene, 11);
        interaction.pointer_moved(&mut scene, sodium);
        assert!(interaction.click(&scene));
        match rx.try_recv() {
            Ok(SceneEvent::ElementSelected(element)) => assert_eq!(element.number, 11),
            other => panic!("unexpected {other:?}"),
        }

        let element = Arc::clone(&scene.context().unwrap().table().tile(11).unwrap().element);
        scene.show_atom(&element, Instant::now());
        assert!(!interaction.click(&scene));
        assert!(rx.try_recv().is_err());

        interaction.pointer_moved(&mut scene, sodium);
        assert_eq!(interaction.intersected(), None);
        assert!(highlighted(&scene).is_empty());
    }

    #[test]
    fn tooltip_follows_cursor_in_table_view() {
        let (mut scene, mut interaction, _rx) = setup();
        let sodium = screen_of(&scene, 11);
        interaction.pointer_moved(&mut scene, sodium);
        let tooltip = interaction.tooltip().unwrap();
        assert_eq!(tooltip.position, sodium + Vec2::splat(15.0));
        assert_eq!(tooltip.lines[0], "Element 11 (E11)");
        assert_eq!(tooltip.lines[1], "Atomic number: 11");
        assert_eq!(tooltip.lines[2], "Atomic mass: unknown");

        let element = Arc::clone(&scene.context().unwrap().table().tile(11).unwrap().element);
        scene.show_atom(&element, Instant::now());
        interaction.pointer_moved(&mut scene, sodium);
        assert!(interaction.tooltip().is_none());
    }

    #[test]
    fn tap_fires_and_drag_does_not() {
        let (mut scene, mut interaction, rx) = setup();
        let sodium = screen_of(&scene, 11);

        interaction.touch_start(&mut scene, sodium);
        assert!(interaction.touch_end(&mut scene, sodium + Vec2::new(3.0, -3.0)));
        assert!(matches!(rx.try_recv(), Ok(SceneEvent::ElementSelected(_))));

        interaction.touch_start(&mut scene, sodium);
        assert!(!interaction.touch_end(&mut scene, sodium + Vec2::new(12.0, 0.0)));
        interaction.touch_start(&mut scene, sodium);
        assert!(!interaction.touch_end(&mut scene, sodium + Vec2::new(0.0, -10.0)));
        assert!(rx.try_recv().is_err());

        assert!(!interaction.touch_end(&mut scene, sodium));
    }

    #[test]
    fn selection_hides_tooltip() {
        let (mut scene, mut interaction, rx) = setup();
        let mut views = ViewController::default();
        let sodium = screen_of(&scene, 11);
        interaction.pointer_moved(&mut scene, sodium);
        assert!(interaction.tooltip().is_some());

        assert!(interaction.click(&scene));
        views.handle(rx.try_recv().unwrap(), &mut scene, Instant::now());
        assert!(scene.context().unwrap().atom_visible());
        assert!(interaction.tooltip().is_none());
    }

    #[test]
    fn tap_selection_hides_tooltip() {
        let (mut scene, mut interaction, rx) = setup();
        let sodium = screen_of(&scene, 11);
        interaction.pointer_moved(&mut scene, sodium);
        interaction.touch_start(&mut scene, sodium);
        assert!(interaction.touch_end(&mut scene, sodium));
        assert!(rx.try_recv().is_ok());
        assert!(interaction.tooltip().is_none());
    }

    #[test]
    fn clear_restores_highlight() {
        let (mut scene, mut interaction, rx) = setup();
        let sodium = screen_of(&scene, 11);
        interaction.pointer_moved(&mut scene, sodium);
        assert_eq!(highlighted(&scene), vec![11]);

        interaction.clear(&mut scene);
        assert_eq!(interaction.intersected(), None);
        assert!(interaction.tooltip().is_none());
        assert!(highlighted(&scene).is_empty());
        assert!(!interaction.click(&scene));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn no_scene_means_no_interaction() {
        let mut scene = SceneManager::new(SceneConfig::default());
        let (tx, _rx) = mpsc::channel();
        let mut interaction = Interaction::new(tx, 10.0);
        interaction.pointer_moved(&mut scene, Vec2::new(10.0, 10.0));
        assert_eq!(interaction.intersected(), None);
        assert!(!interaction.click(&scene));
    }
}
