//! A compact, deterministic implementation of [`super::PhysicsWorld`].
//!
//! Entity counts in this arena are small (≤32 floating bodies is typical
//! per `spec.md` §9), so broad-phase is a plain `O(n²)` scan — the same
//! tradeoff the spec's design notes make explicitly for the dynamic KD-tree
//! candidates (pickups, projectiles). Narrow-phase only needs
//! circle-circle, circle-obb and obb-obb (walls are boxes, everything else
//! is a circle), and joints are a single weld per projectile, so a hand
//! rolled solver stays small while remaining faithful to the trait's
//! contract.

use std::collections::HashSet;

use super::{
    BodyDef, BodyId, BodyKind, BodyMoveEvent, ContactEvent, ContactPhase, JointId, PhysicsWorld,
    RayHit, SensorEvent, Shape, ShapeDef, ShapeFilter, ShapeId,
};
use crate::math::Vec2;

#[derive(Clone)]
struct Body {
    def: BodyDef,
    position: Vec2,
    angle: f32,
    velocity: Vec2,
    angular_velocity: f32,
    inv_mass: f32,
    alive: bool,
}

#[derive(Clone)]
struct ShapeRec {
    body: BodyId,
    def: ShapeDef,
    alive: bool,
}

struct WeldJoint {
    body_a: BodyId,
    body_b: BodyId,
    local_offset: Vec2,
    alive: bool,
}

#[derive(Default)]
pub struct NativeWorld {
    bodies: Vec<Body>,
    shapes: Vec<ShapeRec>,
    joints: Vec<WeldJoint>,
    body_events: Vec<BodyMoveEvent>,
    contact_events: Vec<ContactEvent>,
    sensor_events: Vec<SensorEvent>,
    active_contacts: HashSet<(u32, u32)>,
    active_sensors: HashSet<(u32, u32)>,
}

impl NativeWorld {
    pub fn new() -> Self {
        Self::default()
    }

    fn body(&self, id: BodyId) -> &Body {
        &self.bodies[id.0 as usize]
    }
    fn body_mut(&mut self, id: BodyId) -> &mut Body {
        &mut self.bodies[id.0 as usize]
    }

    fn shapes_of(&self, body: BodyId) -> impl Iterator<Item = (ShapeId, &ShapeRec)> {
        self.shapes
            .iter()
            .enumerate()
            .filter(move |(_, s)| s.alive && s.body == body)
            .map(|(i, s)| (ShapeId(i as u32), s))
    }

    /// Closest point on `shape` (in world space) to `point`, and whether
    /// `point` is inside the shape.
    fn closest_point(&self, shape: ShapeId, point: Vec2) -> (Vec2, bool) {
        let rec = &self.shapes[shape.0 as usize];
        let body = self.body(rec.body);
        match rec.def.shape {
            Shape::Circle { radius } => {
                let d = point - body.position;
                let len = d.length();
                if len <= radius {
                    (point, true)
                } else if len <= f32::EPSILON {
                    (body.position + Vec2::new(radius, 0.0), false)
                } else {
                    (body.position + d.scale(radius / len), false)
                }
            }
            Shape::Box { half_extent } => {
                let local = (point - body.position).rotated(-body.angle);
                let inside = local.x.abs() <= half_extent.x && local.y.abs() <= half_extent.y;
                let clamped = Vec2::new(
                    local.x.max(-half_extent.x).min(half_extent.x),
                    local.y.max(-half_extent.y).min(half_extent.y),
                );
                (body.position + clamped.rotated(body.angle), inside)
            }
        }
    }

    fn aabb_of(&self, shape: ShapeId) -> (Vec2, Vec2) {
        let rec = &self.shapes[shape.0 as usize];
        let body = self.body(rec.body);
        match rec.def.shape {
            Shape::Circle { radius } => (
                Vec2::new(body.position.x - radius, body.position.y - radius),
                Vec2::new(body.position.x + radius, body.position.y + radius),
            ),
            Shape::Box { half_extent } => {
                // Conservative AABB of a rotated box: use the diagonal as radius.
                let r = half_extent.length();
                (
                    Vec2::new(body.position.x - r, body.position.y - r),
                    Vec2::new(body.position.x + r, body.position.y + r),
                )
            }
        }
    }

    fn aabb_overlaps(a: (Vec2, Vec2), b: (Vec2, Vec2)) -> bool {
        a.0.x <= b.1.x && a.1.x >= b.0.x && a.0.y <= b.1.y && a.1.y >= b.0.y
    }

    /// Overlap test + contact normal/point between two shapes, if touching.
    fn shape_overlap(&self, a: ShapeId, b: ShapeId) -> Option<(Vec2, Vec2)> {
        let ra = &self.shapes[a.0 as usize];
        let rb = &self.shapes[b.0 as usize];
        let ba = self.body(ra.body);
        let bb = self.body(rb.body);
        match (ra.def.shape, rb.def.shape) {
            (Shape::Circle { radius: rad_a }, Shape::Circle { radius: rad_b }) => {
                let delta = bb.position - ba.position;
                let dist = delta.length();
                if dist < rad_a + rad_b {
                    let normal = if dist > f32::EPSILON {
                        delta.scale(1.0 / dist)
                    } else {
                        Vec2::new(1.0, 0.0)
                    };
                    let point = ba.position + normal.scale(rad_a);
                    Some((normal, point))
                } else {
                    None
                }
            }
            (Shape::Circle { radius }, Shape::Box { .. }) => {
                let (closest, inside) = self.closest_point(b, ba.position);
                let delta = ba.position - closest;
                let dist = delta.length();
                if inside || dist < radius {
                    let normal = if dist > f32::EPSILON {
                        delta.scale(1.0 / dist)
                    } else {
                        Vec2::new(0.0, 1.0)
                    };
                    Some((-normal, closest))
                } else {
                    None
                }
            }
            (Shape::Box { .. }, Shape::Circle { .. }) => {
                self.shape_overlap(b, a).map(|(n, p)| (-n, p))
            }
            (Shape::Box { .. }, Shape::Box { .. }) => {
                // Approximate with the conservative circumscribed-circle test;
                // adequate since box-box contact in this arena is rare
                // (floating walls colliding with each other).
                let ra_r = match ra.def.shape {
                    Shape::Box { half_extent } => half_extent.length(),
                    _ => unreachable!(),
                };
                let rb_r = match rb.def.shape {
                    Shape::Box { half_extent } => half_extent.length(),
                    _ => unreachable!(),
                };
                let delta = bb.position - ba.position;
                let dist = delta.length();
                if dist < ra_r + rb_r {
                    let normal = if dist > f32::EPSILON {
                        delta.scale(1.0 / dist)
                    } else {
                        Vec2::new(1.0, 0.0)
                    };
                    Some((normal, ba.position + normal.scale(ra_r)))
                } else {
                    None
                }
            }
        }
    }
}

impl PhysicsWorld for NativeWorld {
    fn step(&mut self, dt: f32, substeps: i32) {
        let h = dt / substeps.max(1) as f32;
        for _ in 0..substeps.max(1) {
            // Integrate dynamic bodies.
            for body in self.bodies.iter_mut() {
                if !body.alive || body.def.kind != BodyKind::Dynamic {
                    continue;
                }
                let damping_factor = 1.0 / (1.0 + h * body.def.linear_damping);
                body.velocity = body.velocity.scale(damping_factor);
                body.position = body.position + body.velocity.scale(h);
                if !body.def.fixed_rotation {
                    let ang_damping_factor = 1.0 / (1.0 + h * body.def.angular_damping);
                    body.angular_velocity *= ang_damping_factor;
                    body.angle += body.angular_velocity * h;
                }
            }

            // Weld joints: pin body_b to body_a + local_offset (rigid weld).
            for joint in self.joints.iter() {
                if !joint.alive {
                    continue;
                }
                let anchor = self.bodies[joint.body_a.0 as usize].position + joint.local_offset;
                let b = &mut self.bodies[joint.body_b.0 as usize];
                b.position = anchor;
                b.velocity = Vec2::ZERO;
            }

            self.detect_contacts();
        }

        self.body_events.clear();
        for (i, body) in self.bodies.iter().enumerate() {
            if body.alive && body.def.kind != BodyKind::Static {
                self.body_events.push(BodyMoveEvent {
                    body: BodyId(i as u32),
                    position: body.position,
                    angle: body.angle,
                });
            }
        }
    }

    fn create_body(&mut self, def: BodyDef) -> BodyId {
        let inv_mass = 0.0;
        let body = Body {
            position: def.position,
            angle: def.angle,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            inv_mass,
            alive: true,
            def,
        };
        self.bodies.push(body);
        BodyId((self.bodies.len() - 1) as u32)
    }

    fn destroy_body(&mut self, id: BodyId) {
        self.body_mut(id).alive = false;
        for shape in self.shapes.iter_mut() {
            if shape.body == id {
                shape.alive = false;
            }
        }
        for joint in self.joints.iter_mut() {
            if joint.body_a == id || joint.body_b == id {
                joint.alive = false;
            }
        }
    }

    fn create_shape(&mut self, body: BodyId, def: ShapeDef) -> ShapeId {
        if let Shape::Circle { radius } = def.shape {
            let b = self.body_mut(body);
            if b.def.kind == BodyKind::Dynamic {
                let mass = (std::f32::consts::PI * radius * radius * def.density).max(1e-6);
                b.inv_mass = 1.0 / mass;
            }
        }
        self.shapes.push(ShapeRec {
            body,
            def,
            alive: true,
        });
        ShapeId((self.shapes.len() - 1) as u32)
    }

    fn destroy_shape(&mut self, id: ShapeId) {
        self.shapes[id.0 as usize].alive = false;
    }

    fn body_of_shape(&self, shape: ShapeId) -> BodyId {
        self.shapes[shape.0 as usize].body
    }

    fn shape_filter(&self, shape: ShapeId) -> ShapeFilter {
        self.shapes[shape.0 as usize].def.filter
    }

    fn transform(&self, id: BodyId) -> (Vec2, f32) {
        let b = self.body(id);
        (b.position, b.angle)
    }

    fn set_transform(&mut self, id: BodyId, pos: Vec2, angle: f32) {
        let b = self.body_mut(id);
        b.position = pos;
        b.angle = angle;
    }

    fn linear_velocity(&self, id: BodyId) -> Vec2 {
        self.body(id).velocity
    }

    fn set_linear_velocity(&mut self, id: BodyId, v: Vec2) {
        self.body_mut(id).velocity = v;
    }

    fn set_linear_damping(&mut self, id: BodyId, damping: f32) {
        self.body_mut(id).def.linear_damping = damping;
    }

    fn apply_linear_impulse(&mut self, id: BodyId, impulse: Vec2) {
        let b = self.body_mut(id);
        if b.def.kind == BodyKind::Dynamic {
            b.velocity = b.velocity + impulse.scale(b.inv_mass.max(1.0));
        }
    }

    fn apply_force(&mut self, id: BodyId, force: Vec2) {
        // No persistent force accumulator in this minimal model: a "force"
        // applied for one call is treated as an impulse over one substep.
        self.apply_linear_impulse(id, force.scale(crate::constants::DELTA_TIME));
    }

    fn apply_angular_impulse(&mut self, id: BodyId, impulse: f32) {
        let b = self.body_mut(id);
        if b.def.kind == BodyKind::Dynamic && !b.def.fixed_rotation {
            b.angular_velocity += impulse;
        }
    }

    fn overlap_aabb(&self, min: Vec2, max: Vec2, filter: ShapeFilter) -> Vec<ShapeId> {
        let query = (min, max);
        let mut out = Vec::new();
        for (i, s) in self.shapes.iter().enumerate() {
            if !s.alive || !filter.interacts_with(&s.def.filter) {
                continue;
            }
            let id = ShapeId(i as u32);
            if Self::aabb_overlaps(query, self.aabb_of(id)) {
                out.push(id);
            }
        }
        out
    }

    fn overlap_circle(&self, center: Vec2, radius: f32, filter: ShapeFilter) -> Vec<ShapeId> {
        let mut out = Vec::new();
        for (i, s) in self.shapes.iter().enumerate() {
            if !s.alive || !filter.interacts_with(&s.def.filter) {
                continue;
            }
            let id = ShapeId(i as u32);
            let (closest, inside) = self.closest_point(id, center);
            if inside || closest.distance(center) <= radius {
                out.push(id);
            }
        }
        out
    }

    fn cast_ray_closest(
        &self,
        origin: Vec2,
        translation: Vec2,
        filter: ShapeFilter,
    ) -> Option<RayHit> {
        let max_t = translation.length();
        if max_t <= f32::EPSILON {
            return None;
        }
        let dir = translation.scale(1.0 / max_t);
        let mut best: Option<RayHit> = None;
        for (i, s) in self.shapes.iter().enumerate() {
            if !s.alive || !filter.interacts_with(&s.def.filter) {
                continue;
            }
            let id = ShapeId(i as u32);
            let body = self.body(s.body);
            if let Shape::Circle { radius } = s.def.shape {
                if let Some((t, point, normal)) =
                    ray_circle(origin, dir, max_t, body.position, radius)
                {
                    if best.map_or(true, |b| t < b.fraction * max_t) {
                        best = Some(RayHit {
                            shape: id,
                            point,
                            normal,
                            fraction: t / max_t,
                        });
                    }
                }
            } else if let Shape::Box { half_extent } = s.def.shape {
                if let Some((t, point, normal)) =
                    ray_obb(origin, dir, max_t, body.position, body.angle, half_extent)
                {
                    if best.map_or(true, |b| t < b.fraction * max_t) {
                        best = Some(RayHit {
                            shape: id,
                            point,
                            normal,
                            fraction: t / max_t,
                        });
                    }
                }
            }
        }
        best
    }

    fn shape_distance(&self, a: ShapeId, b: ShapeId) -> f32 {
        let (pa, a_inside) = self.closest_point(a, self.body(self.shapes[b.0 as usize].body).position);
        if a_inside {
            return 0.0;
        }
        let (pb, _) = self.closest_point(b, pa);
        pa.distance(pb)
    }

    fn closest_point_on_shape(&self, shape: ShapeId, point: Vec2) -> Vec2 {
        self.closest_point(shape, point).0
    }

    fn create_weld_joint(&mut self, body_a: BodyId, body_b: BodyId, _anchor: Vec2) -> JointId {
        let offset = self.body(body_b).position - self.body(body_a).position;
        self.joints.push(WeldJoint {
            body_a,
            body_b,
            local_offset: offset,
            alive: true,
        });
        JointId((self.joints.len() - 1) as u32)
    }

    fn destroy_joint(&mut self, id: JointId) {
        self.joints[id.0 as usize].alive = false;
    }

    fn take_body_events(&mut self) -> Vec<BodyMoveEvent> {
        std::mem::take(&mut self.body_events)
    }

    fn take_contact_events(&mut self) -> Vec<ContactEvent> {
        std::mem::take(&mut self.contact_events)
    }

    fn take_sensor_events(&mut self) -> Vec<SensorEvent> {
        std::mem::take(&mut self.sensor_events)
    }
}

impl NativeWorld {
    fn detect_contacts(&mut self) {
        let n = self.shapes.len();
        let mut still_contact = HashSet::new();
        let mut still_sensor = HashSet::new();
        for i in 0..n {
            if !self.shapes[i].alive {
                continue;
            }
            for j in (i + 1)..n {
                if !self.shapes[j].alive {
                    continue;
                }
                let (ra, rb) = (&self.shapes[i], &self.shapes[j]);
                if ra.body == rb.body || !ra.def.filter.interacts_with(&rb.def.filter) {
                    continue;
                }
                let wants_sensor = ra.def.is_sensor || rb.def.is_sensor;
                let wants_events = (ra.def.enable_contact_events && rb.def.enable_contact_events)
                    || (ra.def.enable_sensor_events || rb.def.enable_sensor_events);
                if !wants_events {
                    continue;
                }
                let ia = ShapeId(i as u32);
                let ib = ShapeId(j as u32);
                if let Some((normal, point)) = self.shape_overlap(ia, ib) {
                    let key = (i as u32, j as u32);
                    if wants_sensor {
                        still_sensor.insert(key);
                        if !self.active_sensors.contains(&key) {
                            let (sensor, visitor) = if ra.def.is_sensor {
                                (ia, ib)
                            } else {
                                (ib, ia)
                            };
                            self.sensor_events.push(SensorEvent {
                                phase: ContactPhase::Begin,
                                sensor,
                                visitor,
                            });
                        }
                    } else {
                        still_contact.insert(key);
                        if !self.active_contacts.contains(&key) {
                            self.contact_events.push(ContactEvent {
                                phase: ContactPhase::Begin,
                                shape_a: ia,
                                shape_b: ib,
                                point,
                                normal,
                            });
                            self.resolve_collision(ia, ib, normal);
                        }
                    }
                }
            }
        }
        for key in self.active_contacts.difference(&still_contact) {
            self.contact_events.push(ContactEvent {
                phase: ContactPhase::End,
                shape_a: ShapeId(key.0),
                shape_b: ShapeId(key.1),
                point: Vec2::ZERO,
                normal: Vec2::ZERO,
            });
        }
        for key in self.active_sensors.difference(&still_sensor) {
            let ra = &self.shapes[key.0 as usize];
            let (sensor, visitor) = if ra.def.is_sensor {
                (ShapeId(key.0), ShapeId(key.1))
            } else {
                (ShapeId(key.1), ShapeId(key.0))
            };
            self.sensor_events.push(SensorEvent {
                phase: ContactPhase::End,
                sensor,
                visitor,
            });
        }
        self.active_contacts = still_contact;
        self.active_sensors = still_sensor;
    }

    /// Velocity-preserving elastic bounce for dynamic bodies, restitution
    /// averaged between the two shapes. Static/kinematic bodies are
    /// immovable reflectors.
    fn resolve_collision(&mut self, a: ShapeId, b: ShapeId, normal: Vec2) {
        let body_a = self.shapes[a.0 as usize].body;
        let body_b = self.shapes[b.0 as usize].body;
        let restitution =
            (self.shapes[a.0 as usize].def.restitution + self.shapes[b.0 as usize].def.restitution)
                * 0.5;
        let dyn_a = self.body(body_a).def.kind == BodyKind::Dynamic;
        let dyn_b = self.body(body_b).def.kind == BodyKind::Dynamic;
        if dyn_a && !dyn_b {
            let v = self.body(body_a).velocity;
            let vn = v.dot(normal);
            if vn < 0.0 {
                let reflected = v - normal.scale((1.0 + restitution) * vn);
                self.body_mut(body_a).velocity = reflected;
            }
        } else if dyn_b && !dyn_a {
            let v = self.body(body_b).velocity;
            let vn = v.dot(-normal);
            if vn < 0.0 {
                let reflected = v - (-normal).scale((1.0 + restitution) * vn);
                self.body_mut(body_b).velocity = reflected;
            }
        } else if dyn_a && dyn_b {
            let va = self.body(body_a).velocity;
            let vb = self.body(body_b).velocity;
            let rel = va - vb;
            let vn = rel.dot(normal);
            if vn < 0.0 {
                let impulse = normal.scale(-(1.0 + restitution) * vn * 0.5);
                self.body_mut(body_a).velocity = va + impulse;
                self.body_mut(body_b).velocity = vb - impulse;
            }
        }
    }
}

fn ray_circle(
    origin: Vec2,
    dir: Vec2,
    max_t: f32,
    center: Vec2,
    radius: f32,
) -> Option<(f32, Vec2, Vec2)> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t0 = -b - sqrt_disc;
    let t1 = -b + sqrt_disc;
    let t = if t0 >= 0.0 {
        t0
    } else if t1 >= 0.0 {
        t1
    } else {
        return None;
    };
    if t > max_t {
        return None;
    }
    let point = origin + dir.scale(t);
    let normal = (point - center).normalize();
    Some((t, point, normal))
}

fn ray_obb(
    origin: Vec2,
    dir: Vec2,
    max_t: f32,
    center: Vec2,
    angle: f32,
    half_extent: Vec2,
) -> Option<(f32, Vec2, Vec2)> {
    let local_origin = (origin - center).rotated(-angle);
    let local_dir = dir.rotated(-angle);
    let mut t_min = 0.0f32;
    let mut t_max = max_t;
    let mut normal = Vec2::ZERO;
    for axis in 0..2 {
        let (o, d, h) = if axis == 0 {
            (local_origin.x, local_dir.x, half_extent.x)
        } else {
            (local_origin.y, local_dir.y, half_extent.y)
        };
        if d.abs() < 1e-8 {
            if o < -h || o > h {
                return None;
            }
            continue;
        }
        let mut t0 = (-h - o) / d;
        let mut t1 = (h - o) / d;
        let mut sign = -1.0;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
            sign = 1.0;
        }
        if t0 > t_min {
            t_min = t0;
            normal = if axis == 0 {
                Vec2::new(sign, 0.0)
            } else {
                Vec2::new(0.0, sign)
            };
        }
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }
    let point = origin + dir.scale(t_min);
    Some((t_min, point, normal.rotated(angle)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle_body(world: &mut NativeWorld, pos: Vec2, kind: BodyKind) -> (BodyId, ShapeId) {
        let body = world.create_body(BodyDef {
            kind,
            position: pos,
            ..Default::default()
        });
        let shape = world.create_shape(
            body,
            ShapeDef {
                shape: Shape::Circle { radius: 0.5 },
                enable_contact_events: true,
                ..Default::default()
            },
        );
        (body, shape)
    }

    #[test]
    fn dynamic_circle_bounces_off_static_wall() {
        let mut world = NativeWorld::new();
        let (_wb, _ws) = circle_body(&mut world, Vec2::new(2.0, 0.0), BodyKind::Static);
        let (db, _ds) = circle_body(&mut world, Vec2::new(0.0, 0.0), BodyKind::Dynamic);
        world.set_linear_velocity(db, Vec2::new(5.0, 0.0));
        for _ in 0..200 {
            world.step(1.0 / 60.0, 1);
            let _ = world.take_body_events();
        }
        assert!(world.linear_velocity(db).x <= 0.0);
    }

    #[test]
    fn ray_hits_circle() {
        let mut world = NativeWorld::new();
        let (_b, _s) = circle_body(&mut world, Vec2::new(5.0, 0.0), BodyKind::Static);
        let hit = world.cast_ray_closest(Vec2::ZERO, Vec2::new(10.0, 0.0), ShapeFilter::ALL);
        assert!(hit.is_some());
        assert!((hit.unwrap().point.x - 4.5).abs() < 1e-4);
    }

    #[test]
    fn overlap_circle_finds_nearby_shape() {
        let mut world = NativeWorld::new();
        let (_b, _s) = circle_body(&mut world, Vec2::new(1.0, 0.0), BodyKind::Static);
        let hits = world.overlap_circle(Vec2::ZERO, 2.0, ShapeFilter::ALL);
        assert_eq!(hits.len(), 1);
    }
}
