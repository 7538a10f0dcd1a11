//! Procedurally generated streaming world
//!
//! Turns a lazily generated sequence of entity placements along the
//! circular track into a bounded set of live, physically simulated,
//! visually synchronized entities. Track positions are in cycles (one full
//! planet revolution = 1.0) so generation stays monotonic across
//! wrap-around; the queue of pending descriptors is always sorted
//! ascending by position.

use std::collections::VecDeque;
use std::f32::consts::TAU;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use rapier2d::prelude::ColliderHandle;

use super::entity::{Behavior, Entity, EntityId, SpawnRequest, UpdateCtx};
use crate::assets::Assets;
use crate::physics::PhysicsWorld;
use crate::scene::{Camera, Scene};
use crate::{angle_to_world_space, consts, cycles_to_angle};

/// Base track step between generated placements (cycles)
const TRACK_INCREMENT: f32 = 0.02;
/// How much track one generation batch covers (cycles)
const GENERATION_SPAN: f32 = 0.4;

/// A not-yet-instantiated entity: its kind plus type-specific fields
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityTag {
    Barn,
    Bullet { velocity: Vec2 },
    Cow,
    House,
    SmallRock,
    MedRock,
    BigRock,
    Tank,
    Tree,
    BigTree,
    Human,
}

/// An entity scheduled at a track position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityDesc {
    pub position: f32,
    pub tag: EntityTag,
}

pub fn barn(position: f32) -> EntityDesc {
    EntityDesc { position, tag: EntityTag::Barn }
}

pub fn cow(position: f32) -> EntityDesc {
    EntityDesc { position, tag: EntityTag::Cow }
}

pub fn house(position: f32) -> EntityDesc {
    EntityDesc { position, tag: EntityTag::House }
}

pub fn human(position: f32) -> EntityDesc {
    EntityDesc { position, tag: EntityTag::Human }
}

pub fn tank(position: f32) -> EntityDesc {
    EntityDesc { position, tag: EntityTag::Tank }
}

pub fn tree(position: f32) -> EntityDesc {
    EntityDesc { position, tag: EntityTag::Tree }
}

pub fn big_tree(position: f32) -> EntityDesc {
    EntityDesc { position, tag: EntityTag::BigTree }
}

pub fn small_rock(position: f32) -> EntityDesc {
    EntityDesc { position, tag: EntityTag::SmallRock }
}

pub fn med_rock(position: f32) -> EntityDesc {
    EntityDesc { position, tag: EntityTag::MedRock }
}

pub fn big_rock(position: f32) -> EntityDesc {
    EntityDesc { position, tag: EntityTag::BigRock }
}

/// Difficulty tiers reweight props vs hazards as the track advances
const TIER_EARLY: &[(EntityTag, f32)] = &[
    (EntityTag::MedRock, 25.0),
    (EntityTag::BigRock, 5.0),
    (EntityTag::Tree, 15.0),
    (EntityTag::BigTree, 5.0),
    (EntityTag::Cow, 20.0),
    (EntityTag::Tank, 5.0),
    (EntityTag::Human, 15.0),
];

const TIER_MID: &[(EntityTag, f32)] = &[
    (EntityTag::MedRock, 25.0),
    (EntityTag::BigRock, 5.0),
    (EntityTag::Tree, 15.0),
    (EntityTag::BigTree, 5.0),
    (EntityTag::Cow, 20.0),
    (EntityTag::Tank, 20.0),
    (EntityTag::Human, 15.0),
];

const TIER_LATE: &[(EntityTag, f32)] = &[
    (EntityTag::MedRock, 20.0),
    (EntityTag::BigRock, 5.0),
    (EntityTag::Tree, 10.0),
    (EntityTag::BigTree, 5.0),
    (EntityTag::Cow, 10.0),
    (EntityTag::Tank, 40.0),
    (EntityTag::Human, 15.0),
];

fn tier_table(t: f32) -> &'static [(EntityTag, f32)] {
    if t < 0.5 {
        TIER_EARLY
    } else if t < 1.0 {
        TIER_MID
    } else {
        TIER_LATE
    }
}

/// Draw one entry from a positive-weight table with the provided RNG.
/// Returns None only for an empty or non-positive table.
pub fn weighted_pick<'a, T, R: Rng>(rng: &mut R, table: &'a [(T, f32)]) -> Option<&'a T> {
    let total: f32 = table.iter().map(|(_, w)| *w).sum();
    if total <= 0.0 {
        return None;
    }
    weighted_pick_at(rng.random_range(0.0..total), table)
}

/// Resolve a draw value in [0, total) against the cumulative weights: the
/// first bucket whose cumulative sum exceeds the draw wins
pub fn weighted_pick_at<T>(draw: f32, table: &[(T, f32)]) -> Option<&T> {
    let mut cumulative = 0.0;
    for (item, weight) in table {
        cumulative += weight;
        if draw < cumulative {
            return Some(item);
        }
    }
    table.last().map(|(item, _)| item)
}

/// Everything the world needs from the rest of the simulation for one tick
pub struct WorldCtx<'a> {
    pub physics: &'a mut PhysicsWorld,
    pub scene: &'a mut Scene,
    pub assets: &'a Assets,
    pub camera: &'a Camera,
    pub planet_rotation: f32,
    pub planet_collider: ColliderHandle,
    pub ship_world: Vec2,
    pub paused: bool,
    pub dt: f32,
}

pub struct World {
    entities_to_spawn: VecDeque<EntityDesc>,
    pub spawned: Vec<Entity>,
    next_id: EntityId,
    rng: Pcg32,
}

impl World {
    /// Starts with a hand-authored opening strip; generation takes over
    /// once it drains.
    pub fn new(seed: u64) -> Self {
        let opening = [
            med_rock(-0.03),
            big_rock(-0.02),
            tree(0.01),
            tree(0.03),
            med_rock(0.05),
            cow(0.08),
            tree(0.09),
            cow(0.10),
        ];
        Self {
            entities_to_spawn: opening.into_iter().collect(),
            spawned: Vec::new(),
            next_id: 1,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn pending(&self) -> &VecDeque<EntityDesc> {
        &self.entities_to_spawn
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.spawned.iter().find(|e| e.id == id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.spawned.iter_mut().find(|e| e.id == id)
    }

    /// Resolve a physics collider back to its owning entity. Misses are
    /// normal across the despawn boundary.
    pub fn lookup_by_collider(&self, collider: ColliderHandle) -> Option<EntityId> {
        self.spawned
            .iter()
            .find(|e| e.collider == collider)
            .map(|e| e.id)
    }

    /// Generate the next stretch of track: one weighted draw per jittered
    /// step until the batch spans `GENERATION_SPAN` cycles. `t` only ever
    /// increases, so the batch comes out sorted.
    fn generate(&mut self, start: f32) -> Vec<EntityDesc> {
        let mut t = start + TRACK_INCREMENT;
        let stop = t + GENERATION_SPAN;
        let mut batch = Vec::new();
        while t < stop {
            if let Some(&tag) = weighted_pick(&mut self.rng, tier_table(t)) {
                batch.push(EntityDesc { position: t, tag });
            }
            t += TRACK_INCREMENT + 0.01 * self.rng.random_range(-1.0..1.0);
        }
        batch
    }

    /// Instantiate one descriptor at its track position: scene node and
    /// physics body come up together, and the body is registered at the
    /// matching surface angle.
    pub fn spawn(
        &mut self,
        desc: EntityDesc,
        physics: &mut PhysicsWorld,
        scene: &mut Scene,
        assets: &Assets,
    ) {
        let angle = cycles_to_angle(desc.position);
        let position = angle_to_world_space(angle, consts::PLANET_RADIUS);
        let id = self.next_entity_id();

        let entity = match desc.tag {
            EntityTag::Barn => Entity::barn(id, position, 80.0, scene, physics, assets),
            EntityTag::Bullet { velocity } => Entity::bullet(id, position, velocity, scene, physics),
            EntityTag::Cow => Entity::cow(id, position, scene, physics, assets),
            EntityTag::House => Entity::house(id, position, 50.0, scene, physics, assets),
            EntityTag::SmallRock => {
                Entity::rock(id, position, 10.0, scene, physics, assets, &mut self.rng)
            }
            EntityTag::MedRock => {
                Entity::rock(id, position, 25.0, scene, physics, assets, &mut self.rng)
            }
            EntityTag::BigRock => {
                Entity::rock(id, position, 40.0, scene, physics, assets, &mut self.rng)
            }
            EntityTag::Tank => Entity::tank(id, position, scene, physics, assets, &mut self.rng),
            EntityTag::Tree => {
                Entity::tree(id, position, 60.0, scene, physics, assets, &mut self.rng)
            }
            EntityTag::BigTree => {
                Entity::tree(id, position, 120.0, scene, physics, assets, &mut self.rng)
            }
            EntityTag::Human => Entity::human(id, position, scene, physics, assets, &mut self.rng),
        };

        physics.set_angle(entity.body, angle);
        self.spawned.push(entity);
    }

    /// Add a shell fired mid-tick at an explicit world position
    pub fn add_bullet(
        &mut self,
        position: Vec2,
        velocity: Vec2,
        physics: &mut PhysicsWorld,
        scene: &mut Scene,
    ) {
        let id = self.next_entity_id();
        self.spawned
            .push(Entity::bullet(id, position, velocity, scene, physics));
    }

    fn release_handles(entity: &Entity, physics: &mut PhysicsWorld, scene: &mut Scene) {
        scene.remove(entity.node);
        physics.remove_body(entity.body);
        for &extra in &entity.extra_bodies {
            physics.remove_body(extra);
        }
    }

    /// Remove one entity, releasing its visual node and physics bodies
    /// together
    pub fn despawn(&mut self, id: EntityId, physics: &mut PhysicsWorld, scene: &mut Scene) {
        if let Some(index) = self.spawned.iter().position(|e| e.id == id) {
            let entity = self.spawned.remove(index);
            Self::release_handles(&entity, physics, scene);
        }
    }

    /// Fresh run: everything despawned, queue regenerated from the start
    /// of the track
    pub fn reset(&mut self, physics: &mut PhysicsWorld, scene: &mut Scene) {
        for entity in std::mem::take(&mut self.spawned) {
            Self::release_handles(&entity, physics, scene);
        }
        self.entities_to_spawn.clear();
        let batch = self.generate(consts::TRACK_START);
        self.entities_to_spawn.extend(batch);
    }

    /// Attach models to nodes created before the asset catalog resolved
    pub fn attach_models(&self, scene: &mut Scene, assets: &Assets) {
        for entity in &self.spawned {
            let model = match entity.behavior {
                Behavior::Cow { .. } => assets.model("cow"),
                Behavior::Tree => assets.model("tree"),
                Behavior::Rock { .. } => assets.model("rock"),
                Behavior::Human { .. } => assets.model("human"),
                Behavior::Tank { .. } => assets.model("tank"),
                Behavior::Barn => assets.model("barn"),
                Behavior::House => assets.model("house"),
                Behavior::Bullet => None,
            };
            if let Some(node) = scene.get_mut(entity.node) {
                if node.model.is_none() {
                    node.model = model;
                }
            }
        }
    }

    /// One world tick: stream spawns in, sync visuals, cull, run behaviors
    pub fn update(&mut self, ctx: &mut WorldCtx<'_>) {
        // Spawn everything entering the lookahead window; regenerate as
        // soon as the queue drains so the stream never runs dry
        let cycles = ctx.planet_rotation / TAU;
        let spawn_limit = cycles + consts::SPAWN_MARGIN;

        while let Some(&front) = self.entities_to_spawn.front() {
            if front.position >= spawn_limit {
                break;
            }
            self.entities_to_spawn.pop_front();
            self.spawn(front, ctx.physics, ctx.scene, ctx.assets);

            if self.entities_to_spawn.is_empty() {
                let batch = self.generate(front.position);
                self.entities_to_spawn.extend(batch);
            }
        }

        // Physics into visuals, with the vertical flip
        for entity in &self.spawned {
            let p = ctx.physics.body_position(entity.body);
            let angle = ctx.physics.body_angle(entity.body);
            if let Some(node) = ctx.scene.get_mut(entity.node) {
                node.position = Vec2::new(p.x, -p.y);
                node.rotation = -angle;
            }
        }

        // Cull entities behind the camera or stuck in the polar dead zone
        let mut kept = Vec::with_capacity(self.spawned.len());
        for entity in std::mem::take(&mut self.spawned) {
            let position = ctx
                .scene
                .get(entity.node)
                .map(|n| n.position)
                .unwrap_or_default();
            let ndc = ctx.camera.project(position);
            let near_center = position.x.abs() < consts::POLAR_DEAD_ZONE
                && position.y.abs() < consts::POLAR_DEAD_ZONE;

            if ndc.x < consts::DESPAWN_NDC_X || near_center {
                Self::release_handles(&entity, ctx.physics, ctx.scene);
            } else {
                kept.push(entity);
            }
        }
        self.spawned = kept;

        // Behavior pass, with fired shells instantiated afterwards
        if !ctx.paused {
            let mut spawns = Vec::new();
            let mut ectx = UpdateCtx {
                physics: &mut *ctx.physics,
                scene: &mut *ctx.scene,
                rng: &mut self.rng,
                spawns: &mut spawns,
                ship_world: ctx.ship_world,
                planet_collider: ctx.planet_collider,
                planet_radius: consts::PLANET_RADIUS,
                dt: ctx.dt,
            };
            for entity in &mut self.spawned {
                entity.update(&mut ectx);
            }
            drop(ectx);

            for request in spawns {
                match request {
                    SpawnRequest::Bullet { position, velocity } => {
                        self.add_bullet(position, velocity, ctx.physics, ctx.scene);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fixture() -> (PhysicsWorld, Scene, Assets, Camera, ColliderHandle) {
        let mut physics = PhysicsWorld::new();
        let (_planet_body, planet_collider) = physics.add_planet(consts::PLANET_RADIUS);
        (
            physics,
            Scene::new(),
            Assets::new(),
            Camera::new(consts::PLANET_RADIUS),
            planet_collider,
        )
    }

    fn ctx<'a>(
        physics: &'a mut PhysicsWorld,
        scene: &'a mut Scene,
        assets: &'a Assets,
        camera: &'a Camera,
        planet_collider: ColliderHandle,
        planet_rotation: f32,
    ) -> WorldCtx<'a> {
        WorldCtx {
            physics,
            scene,
            assets,
            camera,
            planet_rotation,
            planet_collider,
            ship_world: Vec2::new(0.0, consts::PLANET_RADIUS + 200.0),
            paused: false,
            dt: crate::consts::TICK_DT,
        }
    }

    #[test]
    fn test_generated_batch_is_monotonic() {
        let mut world = World::new(123);
        let batch = world.generate(-0.05);
        assert!(!batch.is_empty());
        for pair in batch.windows(2) {
            assert!(pair[0].position <= pair[1].position);
        }
        // Roughly one placement per increment over the span
        assert!(batch.len() >= 10);
    }

    #[test]
    fn test_weighted_pick_at_exact_buckets() {
        let table = [("a", 10.0), ("b", 30.0), ("c", 60.0)];
        assert_eq!(weighted_pick_at(5.0, &table), Some(&"a"));
        assert_eq!(weighted_pick_at(35.0, &table), Some(&"b"));
        assert_eq!(weighted_pick_at(95.0, &table), Some(&"c"));
        assert_eq!(weighted_pick_at(9.999, &table), Some(&"a"));
        assert_eq!(weighted_pick_at(10.0, &table), Some(&"b"));
    }

    #[test]
    fn test_weighted_pick_frequencies() {
        use rand::SeedableRng;
        let table = [("a", 10.0), ("b", 30.0), ("c", 60.0)];
        let mut rng = Pcg32::seed_from_u64(99);

        let draws = 10_000;
        let mut counts = [0u32; 3];
        for _ in 0..draws {
            match weighted_pick(&mut rng, &table) {
                Some(&"a") => counts[0] += 1,
                Some(&"b") => counts[1] += 1,
                Some(&"c") => counts[2] += 1,
                other => panic!("unexpected draw {other:?}"),
            }
        }

        let expected = [0.10, 0.30, 0.60];
        for (count, expected) in counts.iter().zip(expected) {
            let freq = *count as f32 / draws as f32;
            assert!(
                (freq - expected).abs() < 0.02,
                "frequency {freq} too far from {expected}"
            );
        }
    }

    proptest! {
        #[test]
        fn prop_weighted_pick_matches_cumulative_scan(draw in 0.0f32..100.0) {
            let table = [("a", 10.0), ("b", 30.0), ("c", 60.0)];
            let expected = if draw < 10.0 {
                "a"
            } else if draw < 40.0 {
                "b"
            } else {
                "c"
            };
            prop_assert_eq!(weighted_pick_at(draw, &table), Some(&expected));
        }
    }

    #[test]
    fn test_spawn_window_streams_in_order() {
        let (mut physics, mut scene, assets, camera, planet_collider) = fixture();
        let mut world = World::new(5);

        let bodies_before = physics.body_count();
        let mut c = ctx(
            &mut physics,
            &mut scene,
            &assets,
            &camera,
            planet_collider,
            0.0,
        );
        world.update(&mut c);

        // Opening strip members below the 0.08 lookahead limit
        assert_eq!(world.spawned.len(), 5);
        assert_eq!(scene.len(), 5);
        assert_eq!(physics.body_count(), bodies_before + 5);
        assert_eq!(world.pending().front().map(|d| d.position), Some(0.08));
    }

    #[test]
    fn test_queue_regenerates_when_drained() {
        let (mut physics, mut scene, assets, camera, planet_collider) = fixture();
        let mut world = World::new(5);

        // Far enough around the planet to drain the opening strip
        let rotation = cycles_to_angle(0.15);
        let mut c = ctx(
            &mut physics,
            &mut scene,
            &assets,
            &camera,
            planet_collider,
            rotation,
        );
        world.update(&mut c);
        assert!(!world.pending().is_empty());
        for pair in world.pending().iter().collect::<Vec<_>>().windows(2) {
            assert!(pair[0].position <= pair[1].position);
        }
    }

    #[test]
    fn test_reset_releases_everything_once() {
        let (mut physics, mut scene, assets, camera, planet_collider) = fixture();
        let mut world = World::new(5);
        let mut c = ctx(
            &mut physics,
            &mut scene,
            &assets,
            &camera,
            planet_collider,
            0.0,
        );
        world.update(&mut c);
        assert_eq!(world.spawned.len(), 5);

        world.reset(&mut physics, &mut scene);
        assert!(world.spawned.is_empty());
        assert!(!world.pending().is_empty());
        assert_eq!(scene.len(), 0);
        // Only the planet body remains
        assert_eq!(physics.body_count(), 1);
    }

    #[test]
    fn test_cull_behind_camera() {
        let (mut physics, mut scene, assets, mut camera, planet_collider) = fixture();
        let mut world = World::new(5);
        let mut c = ctx(
            &mut physics,
            &mut scene,
            &assets,
            &camera,
            planet_collider,
            0.0,
        );
        world.update(&mut c);
        let before = world.spawned.len();
        assert!(before > 0);

        // Rotate the camera far past the spawned strip; everything spawned
        // falls off the left edge. No new spawns: keep the queue ahead.
        let rotation = 0.9;
        camera.pivot_rotation = -rotation;
        let mut c = ctx(
            &mut physics,
            &mut scene,
            &assets,
            &camera,
            planet_collider,
            0.0,
        );
        world.update(&mut c);
        assert!(world.spawned.len() < before);
    }

    #[test]
    fn test_polar_dead_zone_culls() {
        let (mut physics, mut scene, assets, camera, planet_collider) = fixture();
        let mut world = World::new(5);
        let mut c = ctx(
            &mut physics,
            &mut scene,
            &assets,
            &camera,
            planet_collider,
            0.0,
        );
        world.update(&mut c);
        let count = world.spawned.len();

        // Teleport one body into the planet core
        let body = world.spawned[0].body;
        physics.set_position(body, Vec2::new(10.0, 10.0));

        let mut c = ctx(
            &mut physics,
            &mut scene,
            &assets,
            &camera,
            planet_collider,
            0.0,
        );
        world.update(&mut c);
        assert_eq!(world.spawned.len(), count - 1);
    }

    #[test]
    fn test_attach_models_on_ready_edge() {
        let (mut physics, mut scene, mut assets, camera, planet_collider) = fixture();
        crate::assets::declare_game_assets(&mut assets).unwrap();
        assets.begin_load();

        let mut world = World::new(5);
        let mut c = ctx(
            &mut physics,
            &mut scene,
            &assets,
            &camera,
            planet_collider,
            0.0,
        );
        world.update(&mut c);

        // Nothing resolved yet: nodes carry placeholder visuals
        assert!(world
            .spawned
            .iter()
            .all(|e| scene.get(e.node).unwrap().model.is_none()));

        assets.finish_all();
        world.attach_models(&mut scene, &assets);
        assert!(world
            .spawned
            .iter()
            .all(|e| scene.get(e.node).unwrap().model.is_some()));
    }
}
