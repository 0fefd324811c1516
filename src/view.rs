use std::sync::Arc;
use std::time::Instant;

use crate::element::Element;
use crate::interaction::SceneEvent;
use crate::scene::SceneManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Table,
    Atom,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    Category,
    Property,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySelection {
    pub kind: CategoryKind,
    pub name: String,
}

impl CategorySelection {
    pub fn category(name: impl Into<String>) -> Self {
        Self {
            kind: CategoryKind::Category,
            name: name.into(),
        }
    }

    pub fn property(name: impl Into<String>) -> Self {
        Self {
            kind: CategoryKind::Property,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewController {
    view: View,
    selected_element: Option<Arc<Element>>,
    selected_category: Option<CategorySelection>,
}

impl Default for ViewController {
    fn default() -> Self {
        Self {
            view: View::Table,
            selected_element: None,
            selected_category: None,
        }
    }
}

impl ViewController {
    pub fn view(&self) -> View {
        self.view
    }

    pub fn selected_element(&self) -> Option<&Arc<Element>> {
        self.selected_element.as_ref()
    }

    pub fn selected_category(&self) -> Option<&CategorySelection> {
        self.selected_category.as_ref()
    }

    pub fn accepts_pointer(&self) -> bool {
        self.view == View::Table
    }

    pub fn handle(&mut self, event: SceneEvent, scene: &mut SceneManager, now: Instant) {
        match event {
            SceneEvent::ElementSelected(element) => self.select_element(element, scene, now),
        }
    }

    pub fn select_element(&mut self, element: Arc<Element>, scene: &mut SceneManager, now: Instant) {
        if !scene.show_atom(&element, now) {
            return;
        }
        log::info!("element selected: {}", element.name);
        self.selected_element = Some(element);
        self.view = View::Atom;
    }

    pub fn open_category(
        &mut self,
        selection: CategorySelection,
        scene: &mut SceneManager,
        now: Instant,
    ) {
        log::info!("category opened: {:?} {}", selection.kind, selection.name);
        self.selected_category = Some(selection);
        self.selected_element = None;
        self.view = View::Category;
        scene.show_table(now);
    }

    pub fn back_to_table(&mut self, scene: &mut SceneManager, now: Instant) {
        self.view = View::Table;
        self.selected_element = None;
        self.selected_category = None;
        scene.show_table(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use crate::element::tests::SAMPLE_JSON;
    use crate::element::ElementDataset;

    fn scene_with(dataset: &ElementDataset) -> SceneManager {
        let mut scene = SceneManager::new(SceneConfig::default());
        scene.init();
        scene.populate_table(dataset);
        scene
    }

    fn atom_shown(scene: &SceneManager) -> bool {
        scene.context().unwrap().atom_visible()
    }

    #[test]
    fn scene_mirrors_view() {
        let dataset = ElementDataset::from_json(SAMPLE_JSON).unwrap();
        let mut scene = scene_with(&dataset);
        let mut views = ViewController::default();
        let now = Instant::now();
        assert_eq!(views.view(), View::Table);

        let copper = Arc::clone(dataset.get(29).unwrap());
        views.handle(SceneEvent::ElementSelected(copper), &mut scene, now);
        assert_eq!(views.view(), View::Atom);
        assert_eq!(views.selected_element().unwrap().symbol, "Cu");
        assert!(atom_shown(&scene));

        views.open_category(CategorySelection::property("toxic"), &mut scene, now);
        assert_eq!(views.view(), View::Category);
        assert!(views.selected_element().is_none());
        assert_eq!(views.selected_category().unwrap().kind, CategoryKind::Property);
        assert!(!atom_shown(&scene));

        views.back_to_table(&mut scene, now);
        assert_eq!(views.view(), View::Table);
        assert!(views.selected_category().is_none());
        assert!(!atom_shown(&scene));
    }

    #[test]
    fn rejected_selection_keeps_view() {
        let dataset = ElementDataset::from_json(SAMPLE_JSON).unwrap();
        let mut scene = scene_with(&dataset);
        let mut views = ViewController::default();
        let now = Instant::now();
        views.select_element(Arc::new(Element::new(0, "X", "Nothing")), &mut scene, now);
        assert_eq!(views.view(), View::Table);
        assert!(views.selected_element().is_none());
        assert!(!atom_shown(&scene));

        let mut uninitialized = SceneManager::new(SceneConfig::default());
        views.select_element(Arc::clone(dataset.get(11).unwrap()), &mut uninitialized, now);
        assert_eq!(views.view(), View::Table);
        assert!(views.selected_element().is_none());
    }

    #[test]
    fn pointer_only_in_table_view() {
        let dataset = ElementDataset::from_json(SAMPLE_JSON).unwrap();
        let mut scene = scene_with(&dataset);
        let mut views = ViewController::default();
        let now = Instant::now();
        assert!(views.accepts_pointer());
        views.open_category(CategorySelection::category("halogen"), &mut scene, now);
        assert!(!views.accepts_pointer());
        views.select_element(Arc::clone(dataset.get(17).unwrap()), &mut scene, now);
        assert!(!views.accepts_pointer());
        views.back_to_table(&mut scene, now);
        assert!(views.accepts_pointer());
    }

    #[test]
    fn selecting_from_category_view() {
        let dataset = ElementDataset::from_json(SAMPLE_JSON).unwrap();
        let mut scene = scene_with(&dataset);
        let mut views = ViewController::default();
        let now = Instant::now();
        views.open_category(CategorySelection::category("lanthanide"), &mut scene, now);
        views.select_element(Arc::clone(dataset.get(58).unwrap()), &mut scene, now);
        assert_eq!(views.view(), View::Atom);
        let model = scene.context().unwrap().atom().unwrap();
        assert_eq!(model.element.symbol, "Ce");
    }
}
