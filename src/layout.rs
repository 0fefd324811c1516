use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;

use crate::element::{Element, ElementDataset};
use crate::{IdAllocator, ObjectId};

pub const TILE_SIZE: f32 = 0.9;
pub const TILE_DEPTH: f32 = TILE_SIZE * 0.25;
pub const TILE_SPACING: f32 = 1.0;
pub const TABLE_COLUMNS: usize = 18;
pub const TABLE_ROWS: usize = 10;
pub const BASE_EMISSIVE: [f32; 3] = [0.0, 0.0, 0.0];

const START_X: f32 = -8.5 * TILE_SPACING;
const START_Y: f32 = 5.0 * TILE_SPACING;
const LABEL_DEPTH: f32 = 0.5;
const SYMBOL_LABEL_SIZE: f32 = 0.35;
const NUMBER_LABEL_SIZE: f32 = 0.16;

const LA: u16 = u16::MAX - 1;
const AC: u16 = u16::MAX;

#[rustfmt::skip]
const TABLE_TEMPLATE: [[u16; TABLE_COLUMNS]; TABLE_ROWS] = [
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2],
    [3, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5, 6, 7, 8, 9, 10],
    [11, 12, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 13, 14, 15, 16, 17, 18],
    [19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36],
    [37, 38, 39, 40, 41, 42, 43, 44, 45, 46, 47, 48, 49, 50, 51, 52, 53, 54],
    [55, 56, LA, 72, 73, 74, 75, 76, 77, 78, 79, 80, 81, 82, 83, 84, 85, 86],
    [87, 88, AC, 104, 105, 106, 107, 108, 109, 110, 111, 112, 113, 114, 115, 116, 117, 118],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, LA, 57, 58, 59, 60, 61, 62, 63, 64, 65, 66, 67, 68, 69, 70, 71],
    [0, 0, AC, 89, 90, 91, 92, 93, 94, 95, 96, 97, 98, 99, 100, 101, 102, 103],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Element(u32),
    LanthanideMarker,
    ActinideMarker,
}

pub fn cell(row: usize, col: usize) -> Cell {
    match TABLE_TEMPLATE.get(row).and_then(|cells| cells.get(col)) {
        None | Some(&0) => Cell::Empty,
        Some(&LA) => Cell::LanthanideMarker,
        Some(&AC) => Cell::ActinideMarker,
        Some(number) => Cell::Element(u32::from(*number)),
    }
}

pub fn cell_position(row: usize, col: usize) -> Vec3 {
    Vec3::new(
        START_X + col as f32 * TILE_SPACING,
        START_Y - row as f32 * TILE_SPACING,
        0.0,
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub id: ObjectId,
    pub text: String,
    pub offset: Vec3,
    pub size: f32,
}

impl Label {
    pub fn new(ids: &mut IdAllocator, text: impl Into<String>, offset: Vec3, size: f32) -> Self {
        Self {
            id: ids.allocate(),
            text: text.into(),
            offset,
            size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tile {
    pub id: ObjectId,
    pub element: Arc<Element>,
    pub row: usize,
    pub col: usize,
    pub position: Vec3,
    pub color: [f32; 3],
    pub emissive: [f32; 3],
    pub scale: f32,
    pub labels: [Label; 2],
    saved_emissive: Option<[f32; 3]>,
}

impl Tile {
    fn new(ids: &mut IdAllocator, element: Arc<Element>, row: usize, col: usize) -> Self {
        let id = ids.allocate();
        let symbol = Label::new(
            ids,
            element.symbol.clone(),
            Vec3::new(0.0, 0.0, LABEL_DEPTH),
            SYMBOL_LABEL_SIZE,
        );
        let number = Label::new(
            ids,
            element.number.to_string(),
            Vec3::new(-0.25, 0.25, LABEL_DEPTH),
            NUMBER_LABEL_SIZE,
        );
        Self {
            id,
            color: element.display_category().color(),
            element,
            row,
            col,
            position: cell_position(row, col),
            emissive: BASE_EMISSIVE,
            scale: 1.0,
            labels: [symbol, number],
            saved_emissive: None,
        }
    }

    pub fn atomic_number(&self) -> u32 {
        self.element.number
    }

    pub fn half_extents(&self) -> Vec3 {
        Vec3::new(TILE_SIZE, TILE_SIZE, TILE_DEPTH) * 0.5 * self.scale
    }

    pub fn label_position(&self, label: &Label) -> Vec3 {
        self.position + label.offset * self.scale
    }

    pub fn is_highlighted(&self) -> bool {
        self.saved_emissive.is_some()
    }

    pub(crate) fn highlight(&mut self, emissive: [f32; 3], scale: f32) {
        if self.saved_emissive.is_none() {
            self.saved_emissive = Some(self.emissive);
        }
        self.emissive = emissive;
        self.scale = scale;
    }

    pub(crate) fn restore(&mut self) {
        if let Some(saved) = self.saved_emissive.take() {
            self.emissive = saved;
        }
        self.scale = 1.0;
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableLayout {
    tiles: Vec<Tile>,
    index: HashMap<u32, usize>,
}

impl TableLayout {
    pub fn build(dataset: &ElementDataset, ids: &mut IdAllocator) -> Self {
        let mut layout = Self::default();
        for row in 0..TABLE_ROWS {
            for col in 0..TABLE_COLUMNS {
                let Cell::Element(number) = cell(row, col) else {
                    continue;
                };
                let Some(element) = dataset.get(number) else {
                    continue;
                };
                layout.index.insert(number, layout.tiles.len());
                layout
                    .tiles
                    .push(Tile::new(ids, Arc::clone(element), row, col));
            }
        }
        layout
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, number: u32) -> Option<&Tile> {
        self.index.get(&number).map(|index| &self.tiles[*index])
    }

    pub(crate) fn tile_mut(&mut self, number: u32) -> Option<&mut Tile> {
        let index = *self.index.get(&number)?;
        self.tiles.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::element::tests::SAMPLE_JSON;
    use crate::element::{hex_to_rgb, Category, FALLBACK_CATEGORY_COLOR};

    pub(crate) fn full_dataset() -> ElementDataset {
        ElementDataset::from_elements((1..=118).map(|number| {
            Element::new(number, format!("E{number}"), format!("Element {number}"))
        }))
    }

    #[test]
    fn template_contains_each_element_once() {
        let mut seen = Vec::new();
        for row in 0..TABLE_ROWS {
            for col in 0..TABLE_COLUMNS {
                if let Cell::Element(number) = cell(row, col) {
                    seen.push(number);
                }
            }
        }
        seen.sort_unstable();
        assert_eq!(seen, (1..=118).collect::<Vec<_>>());
        assert_eq!(cell(5, 2), Cell::LanthanideMarker);
        assert_eq!(cell(9, 2), Cell::ActinideMarker);
        assert_eq!(cell(7, 5), Cell::Empty);
        assert_eq!(cell(42, 0), Cell::Empty);
    }

    #[test]
    fn tiles_placed_on_grid() {
        let mut ids = IdAllocator::default();
        let layout = TableLayout::build(&full_dataset(), &mut ids);
        assert_eq!(layout.len(), 118);
        assert_eq!(layout.tile(1).unwrap().position, Vec3::new(-8.5, 5.0, 0.0));
        assert_eq!(layout.tile(2).unwrap().position, Vec3::new(8.5, 5.0, 0.0));
        assert_eq!(layout.tile(11).unwrap().position, Vec3::new(-8.5, 3.0, 0.0));
        assert_eq!(layout.tile(57).unwrap().position, Vec3::new(-5.5, -3.0, 0.0));
        assert_eq!(layout.tile(103).unwrap().position, Vec3::new(8.5, -4.0, 0.0));
    }

    #[test]
    fn cells_without_elements_are_skipped() {
        let dataset = ElementDataset::from_json(SAMPLE_JSON).unwrap();
        let mut ids = IdAllocator::default();
        let layout = TableLayout::build(&dataset, &mut ids);
        assert_eq!(layout.len(), 6);
        assert!(layout.tile(2).is_none());
        let empty = TableLayout::build(&ElementDataset::default(), &mut ids);
        assert!(empty.is_empty());
    }

    #[test]
    fn build_is_idempotent() {
        let dataset = ElementDataset::from_json(SAMPLE_JSON).unwrap();
        let mut ids = IdAllocator::default();
        let first = TableLayout::build(&dataset, &mut ids);
        let second = TableLayout::build(&dataset, &mut ids);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.tiles().iter().zip(second.tiles()) {
            assert_eq!(a.position, b.position);
            assert!(Arc::ptr_eq(&a.element, &b.element));
        }
    }

    #[test]
    fn tile_colors_and_labels() {
        let dataset = ElementDataset::from_json(SAMPLE_JSON).unwrap();
        let mut ids = IdAllocator::default();
        let layout = TableLayout::build(&dataset, &mut ids);
        let sodium = layout.tile(11).unwrap();
        assert_eq!(sodium.color, Category::AlkaliMetal.color());
        assert_eq!(sodium.labels[0].text, "Na");
        assert_eq!(sodium.labels[1].text, "11");
        assert!(sodium.labels[0].offset.z > 0.0);
        let oganesson = layout.tile(118).unwrap();
        assert_eq!(oganesson.color, hex_to_rgb(FALLBACK_CATEGORY_COLOR));
    }

    #[test]
    fn highlight_restores_saved_emissive() {
        let dataset = ElementDataset::from_json(SAMPLE_JSON).unwrap();
        let mut ids = IdAllocator::default();
        let mut layout = TableLayout::build(&dataset, &mut ids);
        let tile = layout.tile_mut(29).unwrap();
        tile.emissive = [0.1, 0.2, 0.3];
        tile.highlight([0.5; 3], 1.3);
        tile.highlight([0.5; 3], 1.3);
        assert!(tile.is_highlighted());
        assert_eq!(tile.half_extents().x, TILE_SIZE * 0.5 * 1.3);
        tile.restore();
        assert_eq!(tile.emissive, [0.1, 0.2, 0.3]);
        assert_eq!(tile.scale, 1.0);
        assert!(!tile.is_highlighted());
    }
}
