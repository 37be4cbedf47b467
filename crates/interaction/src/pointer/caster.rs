//! Per-interactor pointer state machine.

use super::{PointerConfig, PointerEvent, PointerEventKind};
use crate::raycast::RaycastHit;
use glam::Vec3;
use tracing::{debug, trace};
use xrinteract_core::{Handedness, InteractorId, ObjectId, Ray, EPSILON};
use xrinteract_physics::Scene;

/// What a caster sees in one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CasterInput {
    /// Current ray, if the source supplied one.
    pub ray: Option<Ray>,
    /// First hit along the ray.
    pub hit: Option<RaycastHit>,
    /// Button level.
    pub pressed: bool,
}

#[derive(Debug, Clone, Copy)]
struct Press {
    target: ObjectId,
    distance: f32,
    origin: Vec3,
    last: Vec3,
    normal: Vec3,
    elapsed: f32,
    dragging: bool,
    fresh: bool,
}

/// Turns hits and button levels into pointer events for one interactor.
///
/// Per frame: hover, then press, then drag, then release. Click is decided
/// on release; a press that became a drag ends with DragEnd and no Up.
#[derive(Debug, Clone)]
pub struct PointerCaster {
    id: InteractorId,
    hand: Option<Handedness>,
    config: PointerConfig,
    enabled: bool,
    was_pressed: Option<bool>,
    hover: Option<RaycastHit>,
    press: Option<Press>,
}

impl PointerCaster {
    /// Enabled caster for `id`.
    pub fn new(id: InteractorId, hand: Option<Handedness>, config: PointerConfig) -> Self {
        Self {
            id,
            hand,
            config,
            enabled: true,
            was_pressed: None,
            hover: None,
            press: None,
        }
    }

    /// Interactor id.
    pub fn id(&self) -> InteractorId {
        self.id
    }

    /// Owning hand, if any.
    pub fn hand(&self) -> Option<Handedness> {
        self.hand
    }

    /// Tuning.
    pub fn config(&self) -> &PointerConfig {
        &self.config
    }

    /// Replace the tuning. Takes effect on the next frame.
    pub fn set_config(&mut self, config: PointerConfig) {
        self.config = config;
    }

    /// Whether the caster processes input.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Currently hovered object.
    pub fn hover_target(&self) -> Option<ObjectId> {
        self.hover.map(|h| h.object)
    }

    /// Object pressed on, while the press lasts.
    pub fn pressed_target(&self) -> Option<ObjectId> {
        self.press.map(|p| p.target)
    }

    /// Whether the current press became a drag.
    pub fn is_dragging(&self) -> bool {
        self.press.is_some_and(|p| p.dragging)
    }

    /// Enable or disable. Disabling flushes any press and hover first.
    ///
    /// The button level seen on the first frame after enabling is taken as
    /// the baseline, so a button already held does not produce a Down.
    pub fn set_enabled(&mut self, enabled: bool, out: &mut Vec<PointerEvent>) {
        if enabled == self.enabled {
            return;
        }
        if !enabled {
            if let Some(press) = self.press.take() {
                let release_target = self.hover_target();
                self.finish(press, release_target, None, true, out);
            }
            if let Some(old) = self.hover.take() {
                out.push(self.event(PointerEventKind::Exit, Some(old.object), old.point, old.normal, Vec3::ZERO));
            }
        }
        self.enabled = enabled;
        self.was_pressed = None;
        debug!(interactor = %self.id, enabled, "caster enablement");
    }

    /// Drop references to objects that vanished or went inactive.
    pub fn validate(&mut self, scene: &Scene, out: &mut Vec<PointerEvent>) {
        if let Some(hover) = self.hover {
            if !scene.is_active_in_hierarchy(hover.object) {
                debug!(interactor = %self.id, object = %hover.object, "hover target lost");
                out.push(self.event(PointerEventKind::Exit, Some(hover.object), hover.point, hover.normal, Vec3::ZERO));
                self.hover = None;
            }
        }
        if let Some(press) = self.press {
            if !scene.is_active_in_hierarchy(press.target) {
                debug!(interactor = %self.id, object = %press.target, "press target lost");
                self.press = None;
                self.finish(press, None, None, false, out);
            }
        }
    }

    /// Advance one render frame.
    pub fn process(&mut self, input: &CasterInput, dt: f32, out: &mut Vec<PointerEvent>) {
        if !self.enabled {
            return;
        }
        self.update_hover(input.hit, out);

        let (down, up) = match self.was_pressed.replace(input.pressed) {
            Some(was) => (input.pressed && !was, !input.pressed && was),
            None => (false, false),
        };
        if down && self.press.is_none() {
            self.begin_press(input, out);
        }
        self.update_drag(input.ray, dt, out);
        if up {
            if let Some(press) = self.press.take() {
                self.finish(press, input.hit.map(|h| h.object), input.hit, true, out);
            }
        }
    }

    fn update_hover(&mut self, hit: Option<RaycastHit>, out: &mut Vec<PointerEvent>) {
        let previous = self.hover;
        if previous.map(|h| h.object) != hit.map(|h| h.object) {
            if let Some(old) = previous {
                out.push(self.event(PointerEventKind::Exit, Some(old.object), old.point, old.normal, Vec3::ZERO));
            }
            if let Some(new) = hit {
                trace!(interactor = %self.id, object = %new.object, "hover enter");
                out.push(self.event(PointerEventKind::Enter, Some(new.object), new.point, new.normal, Vec3::ZERO));
            }
        }
        self.hover = hit;
        if let Some(current) = hit {
            out.push(self.event(PointerEventKind::Hover, Some(current.object), current.point, current.normal, Vec3::ZERO));
        }
    }

    fn begin_press(&mut self, input: &CasterInput, out: &mut Vec<PointerEvent>) {
        match input.hit {
            Some(hit) => {
                debug!(interactor = %self.id, object = %hit.object, "pointer down");
                out.push(self.event(PointerEventKind::Down, Some(hit.object), hit.point, hit.normal, Vec3::ZERO));
                self.press = Some(Press {
                    target: hit.object,
                    distance: hit.distance,
                    origin: hit.point,
                    last: hit.point,
                    normal: hit.normal,
                    elapsed: 0.0,
                    dragging: false,
                    fresh: true,
                });
            }
            None => {
                let point = input.ray.map_or(Vec3::ZERO, |r| r.origin);
                out.push(self.event(PointerEventKind::NothingDown, None, point, Vec3::ZERO, Vec3::ZERO));
            }
        }
    }

    fn update_drag(&mut self, ray: Option<Ray>, dt: f32, out: &mut Vec<PointerEvent>) {
        let Some(mut press) = self.press else {
            return;
        };
        if press.fresh {
            press.fresh = false;
            self.press = Some(press);
            return;
        }
        if !press.dragging {
            press.elapsed += dt.max(0.0);
        }
        if let Some(ray) = ray {
            let point = ray.at(press.distance);
            if !press.dragging {
                let moved = point - press.origin;
                let threshold = self.config.drag_threshold;
                if moved.length_squared() >= threshold * threshold {
                    press.dragging = true;
                    debug!(interactor = %self.id, object = %press.target, "drag begin");
                    out.push(self.event(PointerEventKind::DragBegin, Some(press.target), point, press.normal, moved));
                    out.push(self.event(PointerEventKind::Drag, Some(press.target), point, press.normal, point - press.last));
                    press.last = point;
                }
            } else if point.distance_squared(press.last) > EPSILON * EPSILON {
                out.push(self.event(PointerEventKind::Drag, Some(press.target), point, press.normal, point - press.last));
                press.last = point;
            }
        }
        self.press = Some(press);
    }

    fn finish(
        &self,
        press: Press,
        release_target: Option<ObjectId>,
        release_hit: Option<RaycastHit>,
        allow_click: bool,
        out: &mut Vec<PointerEvent>,
    ) {
        if press.dragging {
            debug!(interactor = %self.id, object = %press.target, "drag end");
            out.push(self.event(
                PointerEventKind::DragEnd,
                Some(press.target),
                press.last,
                press.normal,
                press.last - press.origin,
            ));
            return;
        }
        let (point, normal) = release_hit.map_or((press.last, press.normal), |h| (h.point, h.normal));
        out.push(self.event(PointerEventKind::Up, Some(press.target), point, normal, Vec3::ZERO));
        if allow_click && press.elapsed < self.config.click_time && release_target == Some(press.target) {
            debug!(interactor = %self.id, object = %press.target, "click");
            out.push(self.event(PointerEventKind::Click, Some(press.target), point, normal, Vec3::ZERO));
        }
    }

    fn event(
        &self,
        kind: PointerEventKind,
        target: Option<ObjectId>,
        world_point: Vec3,
        world_normal: Vec3,
        drag_delta: Vec3,
    ) -> PointerEvent {
        PointerEvent {
            kind,
            interactor: self.id,
            target,
            world_point,
            world_normal,
            drag_delta,
        }
    }
}
