use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{Mat4, Vec2, Vec3, Vec4};
use thiserror::Error;

use crate::atom_model::AtomicModel;
use crate::config::SceneConfig;
use crate::element::{Element, ElementDataset, MAX_ATOMIC_NUMBER};
use crate::layout::TableLayout;
use crate::IdAllocator;

const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 1000.0;
const ORBIT_SPEED: f32 = 0.01;
const MAX_PITCH: f32 = 1.4;
const MIN_DISTANCE: f32 = 2.0;
const MAX_DISTANCE: f32 = 120.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("scene has not been initialised")]
    NotInitialized,
    #[error("no element with atomic number {0}")]
    InvalidElement(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn intersect_aabb(&self, center: Vec3, half_extents: Vec3) -> Option<f32> {
        let min = center - half_extents;
        let max = center + half_extents;
        let inverse = self.direction.recip();
        let t1 = (min - self.origin) * inverse;
        let t2 = (max - self.origin) * inverse;
        let near = t1.min(t2).max_element();
        let far = t1.max(t2).min_element();
        if far < 0.0 || near > far {
            return None;
        }
        Some(near.max(0.0))
    }

    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let t = self.direction.dot(center - self.origin);
        if t < 0.0 {
            return None;
        }
        let closest = self.origin + self.direction * t;
        (center.distance_squared(closest) <= radius * radius).then_some(t)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub target: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
}

impl Camera {
    pub fn new(fov_degrees: f32, distance: f32) -> Self {
        Self {
            yaw: FRAC_PI_2,
            pitch: 0.0,
            distance,
            target: Vec3::ZERO,
            fov_y: fov_degrees.to_radians(),
            aspect: 1.0,
        }
    }

    pub fn reset(&mut self, distance: f32) {
        self.yaw = FRAC_PI_2;
        self.pitch = 0.0;
        self.distance = distance;
        self.target = Vec3::ZERO;
    }

    pub fn position(&self) -> Vec3 {
        let (yaw_sin, yaw_cos) = self.yaw.sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.sin_cos();
        Vec3::new(
            self.distance * pitch_cos * yaw_cos,
            self.distance * pitch_sin,
            self.distance * pitch_cos * yaw_sin,
        ) + self.target
    }

    pub fn view_proj(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.position(), self.target, Vec3::Y);
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect, NEAR_PLANE, FAR_PLANE);
        proj * view
    }

    pub fn orbit(&mut self, delta: Vec2) {
        self.yaw -= delta.x * ORBIT_SPEED;
        self.pitch = (self.pitch - delta.y * ORBIT_SPEED).clamp(-MAX_PITCH, MAX_PITCH);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance * (1.0 - delta)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn ray(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_proj().inverse();
        let near_point = inverse * Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        let far_point = inverse * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let near = near_point.truncate() / near_point.w;
        let far = far_point.truncate() / far_point.w;
        Ray {
            origin: near,
            direction: (far - near).normalize(),
        }
    }

    pub fn project(&self, point: Vec3, viewport: Viewport) -> Option<Vec2> {
        let clip = self.view_proj() * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * viewport.width as f32,
            (1.0 - ndc.y) * 0.5 * viewport.height as f32,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn aspect(self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn to_ndc(self, cursor: Vec2) -> Option<Vec2> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(Vec2::new(
            (2.0 * cursor.x / self.width as f32) - 1.0,
            1.0 - (2.0 * cursor.y / self.height as f32),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub ambient: f32,
    pub directional: f32,
    pub direction: Vec3,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: 0.5,
            directional: 0.8,
            direction: Vec3::ONE.normalize(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneMode {
    Table,
    Atom,
}

#[derive(Debug)]
pub struct SceneContext {
    pub camera: Camera,
    pub lighting: Lighting,
    pub viewport: Viewport,
    mode: SceneMode,
    table: TableLayout,
    atom: Option<AtomicModel>,
    ids: IdAllocator,
    model_generation: u64,
    pending_redraws: Vec<Instant>,
}

impl SceneContext {
    fn new(config: &SceneConfig) -> Self {
        Self {
            camera: Camera::new(config.fov_degrees, config.table_camera_distance),
            lighting: Lighting::default(),
            viewport: Viewport {
                width: 1,
                height: 1,
            },
            mode: SceneMode::Table,
            table: TableLayout::default(),
            atom: None,
            ids: IdAllocator::default(),
            model_generation: 0,
            pending_redraws: Vec::new(),
        }
    }

    pub fn mode(&self) -> SceneMode {
        self.mode
    }

    pub fn table_visible(&self) -> bool {
        self.mode == SceneMode::Table
    }

    pub fn atom_visible(&self) -> bool {
        self.mode == SceneMode::Atom
    }

    pub fn table(&self) -> &TableLayout {
        &self.table
    }

    pub(crate) fn table_mut(&mut self) -> &mut TableLayout {
        &mut self.table
    }

    pub fn atom(&self) -> Option<&AtomicModel> {
        self.atom.as_ref()
    }

    pub fn model_generation(&self) -> u64 {
        self.model_generation
    }

    pub fn next_redraw(&self) -> Option<Instant> {
        self.pending_redraws.iter().min().copied()
    }

    fn schedule_redraws(&mut self, now: Instant, delay: Duration) {
        self.pending_redraws.push(now);
        self.pending_redraws.push(now + delay);
    }

    fn teardown_atom(&mut self) {
        if let Some(model) = self.atom.take() {
            log::debug!(
                "released atomic model for {} ({} objects)",
                model.element.name,
                model.object_count()
            );
        }
        self.model_generation += 1;
    }
}

#[derive(Debug)]
pub struct SceneManager {
    config: SceneConfig,
    context: Option<SceneContext>,
}

impl SceneManager {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            config,
            context: None,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn init(&mut self) {
        if self.context.is_some() {
            log::debug!("scene already initialised");
            return;
        }
        self.context = Some(SceneContext::new(&self.config));
        log::info!("scene initialised");
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    pub fn context(&self) -> Option<&SceneContext> {
        self.context.as_ref()
    }

    pub fn context_mut(&mut self) -> Option<&mut SceneContext> {
        self.context.as_mut()
    }

    pub fn populate_table(&mut self, dataset: &ElementDataset) {
        if let Err(err) = self.try_populate_table(dataset) {
            log::error!("populate table: {err}");
        }
    }

    fn try_populate_table(&mut self, dataset: &ElementDataset) -> Result<(), SceneError> {
        let context = self.context.as_mut().ok_or(SceneError::NotInitialized)?;
        context.table = TableLayout::build(dataset, &mut context.ids);
        log::info!("table built with {} tiles", context.table.len());
        Ok(())
    }

    pub fn show_table(&mut self, now: Instant) {
        if let Err(err) = self.try_show_table(now) {
            log::error!("show table: {err}");
        }
    }

    fn try_show_table(&mut self, now: Instant) -> Result<(), SceneError> {
        let delay = Duration::from_millis(self.config.redraw_delay_ms);
        let distance = self.config.table_camera_distance;
        let context = self.context.as_mut().ok_or(SceneError::NotInitialized)?;
        context.mode = SceneMode::Table;
        context.camera.reset(distance);
        context.schedule_redraws(now, delay);
        log::debug!("showing periodic table");
        Ok(())
    }

    pub fn show_atom(&mut self, element: &Arc<Element>, now: Instant) -> bool {
        match self.try_show_atom(element, now) {
            Ok(()) => true,
            Err(err) => {
                log::error!("show atom: {err}");
                false
            }
        }
    }

    fn try_show_atom(&mut self, element: &Arc<Element>, now: Instant) -> Result<(), SceneError> {
        let delay = Duration::from_millis(self.config.redraw_delay_ms);
        let distance = self.config.atom_camera_distance;
        let context = self.context.as_mut().ok_or(SceneError::NotInitialized)?;
        if element.number == 0 || element.number > MAX_ATOMIC_NUMBER {
            return Err(SceneError::InvalidElement(element.number));
        }
        context.teardown_atom();
        context.atom = Some(AtomicModel::build(Arc::clone(element), &mut context.ids));
        context.mode = SceneMode::Atom;
        context.camera.reset(distance);
        context.schedule_redraws(now, delay);
        Ok(())
    }

    pub fn on_resize(&mut self, width: u32, height: u32) {
        let Some(context) = self.context.as_mut() else {
            log::error!("resize: {}", SceneError::NotInitialized);
            return;
        };
        if width == 0 || height == 0 {
            return;
        }
        context.viewport = Viewport { width, height };
        context.camera.aspect = context.viewport.aspect();
    }

    pub fn animate(&mut self, elapsed_seconds: f32) -> bool {
        let Some(context) = self.context.as_mut() else {
            return false;
        };
        if !context.atom_visible() {
            return false;
        }
        match context.atom.as_mut() {
            Some(model) => {
                model.animate(elapsed_seconds);
                true
            }
            None => false,
        }
    }

    pub fn take_redraw(&mut self, now: Instant) -> bool {
        let Some(context) = self.context.as_mut() else {
            return false;
        };
        let before = context.pending_redraws.len();
        context.pending_redraws.retain(|due| *due > now);
        context.pending_redraws.len() != before
    }
}
