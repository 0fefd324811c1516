pub mod atom_model;
pub mod config;
pub mod element;
pub mod interaction;
pub mod layout;
pub mod scene;
pub mod search;
pub mod shells;
pub mod view;

pub use atom_model::{AtomicModel, Composition, Electron};
pub use config::Config;
pub use element::{Category, DatasetError, Element, ElementDataset};
pub use interaction::{Interaction, SceneEvent, Tooltip};
pub use layout::{Label, TableLayout, Tile};
pub use scene::{Camera, SceneContext, SceneError, SceneManager, SceneMode};
pub use shells::{resolve, ShellConfiguration};
pub use view::{CategoryKind, CategorySelection, View, ViewController};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub struct IdAllocator {
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    pub fn allocate(&mut self) -> ObjectId {
        let id = ObjectId(self.next);
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut ids = IdAllocator::default();
        let a = ids.allocate();
        let b = ids.allocate();
        assert_ne!(a, b);
        assert_eq!(a.value(), 1);
        assert!(b > a);
    }
}
