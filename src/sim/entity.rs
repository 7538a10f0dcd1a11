//! Entities and their capability contract
//!
//! Every prop on the planet is an `Entity`: one scene node, one physics
//! body, a lifecycle state relative to the tractor beam, and a behavior
//! variant dispatched once at spawn time. The world and the tick loop only
//! ever talk to entities through `update`/`grab`/`release` and the
//! direction helpers.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use rapier2d::prelude::{ColliderHandle, RigidBodyHandle};

use crate::assets::Assets;
use crate::physics::{PhysicsWorld, PropBodyDesc, REST_DAMPING};
use crate::rotate_vec;
use crate::scene::{Node, NodeId, Scene};
use crate::tuning::CatchCategory;

pub type EntityId = u32;

/// Bullet muzzle speed (12 units per tick at 60 Hz)
const BULLET_SPEED: f32 = 720.0;
/// Human surface run speed, radians per second
const RUN_SPEED: f32 = 0.24;
/// Tank gun slew rate, radians per second
const GUN_SLEW: f32 = 0.3;
/// Gun elevation limits either side of straight up
const GUN_CLAMP: f32 = 1.5;

/// Lifecycle relative to the tractor beam. Once absorption starts it runs
/// to completion even if the beam lets go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifeState {
    Alive,
    BeingAbsorbed,
    Absorbed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumanMode {
    Run { going_left: bool },
    Grabbed,
    Falling,
}

/// Per-kind state; the tag doubles as the scoring category
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    Cow { panicking: bool, anim_time: f32 },
    Tree,
    Rock { size: f32 },
    Human { mode: HumanMode, next_flip: f32 },
    Tank { gun_angle: f32, next_shot: f32 },
    Bullet,
    Barn,
    House,
}

/// Spawn requests produced during an entity update pass (a tank firing);
/// the world instantiates them once the pass is over.
#[derive(Debug, Clone, Copy)]
pub enum SpawnRequest {
    Bullet { position: Vec2, velocity: Vec2 },
}

/// Context handed to entity updates for one tick
pub struct UpdateCtx<'a> {
    pub physics: &'a mut PhysicsWorld,
    pub scene: &'a mut Scene,
    pub rng: &'a mut Pcg32,
    pub spawns: &'a mut Vec<SpawnRequest>,
    /// Ship position in world space
    pub ship_world: Vec2,
    pub planet_collider: ColliderHandle,
    pub planet_radius: f32,
    pub dt: f32,
}

pub struct Entity {
    pub id: EntityId,
    pub state: LifeState,
    pub node: NodeId,
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
    /// Auxiliary bodies removed together with the entity
    pub extra_bodies: Vec<RigidBodyHandle>,
    pub grabbed: bool,
    pub behavior: Behavior,
}

/// Visual-space position to the y-down physics plane
fn to_physics(p: Vec2) -> Vec2 {
    Vec2::new(p.x, -p.y)
}

impl Entity {
    fn new(
        id: EntityId,
        node: NodeId,
        body: RigidBodyHandle,
        collider: ColliderHandle,
        behavior: Behavior,
    ) -> Self {
        Self {
            id,
            state: LifeState::Alive,
            node,
            body,
            collider,
            extra_bodies: Vec::new(),
            grabbed: false,
            behavior,
        }
    }

    pub fn cow(
        id: EntityId,
        position: Vec2,
        scene: &mut Scene,
        physics: &mut PhysicsWorld,
        assets: &Assets,
    ) -> Self {
        let scale = 25.0;
        let mut node = Node::new(position);
        node.model = assets.model("cow");
        let node = scene.add(node);
        let (body, collider) = physics.add_prop_rect(
            to_physics(position),
            Vec2::splat(scale / 2.0),
            PropBodyDesc {
                fixed: false,
                friction: 1.0,
                air_friction: REST_DAMPING,
                mass: 1.0,
                planet_pull: true,
            },
        );
        Self::new(
            id,
            node,
            body,
            collider,
            Behavior::Cow {
                panicking: false,
                anim_time: 0.0,
            },
        )
    }

    pub fn tree(
        id: EntityId,
        position: Vec2,
        size: f32,
        scene: &mut Scene,
        physics: &mut PhysicsWorld,
        assets: &Assets,
        rng: &mut Pcg32,
    ) -> Self {
        let horizontal = size * rng.random_range(0.8..1.2);
        let vertical = size * rng.random_range(0.7..1.3);
        let mut node = Node::new(position);
        node.model = assets.model("tree");
        let node = scene.add(node);
        let (body, collider) = physics.add_prop_rect(
            to_physics(position),
            Vec2::new(horizontal / 2.0, vertical / 2.0),
            PropBodyDesc {
                fixed: size > 100.0,
                friction: 1.0,
                air_friction: REST_DAMPING,
                mass: 1.0,
                planet_pull: true,
            },
        );
        Self::new(id, node, body, collider, Behavior::Tree)
    }

    pub fn rock(
        id: EntityId,
        position: Vec2,
        size: f32,
        scene: &mut Scene,
        physics: &mut PhysicsWorld,
        assets: &Assets,
        rng: &mut Pcg32,
    ) -> Self {
        let horizontal = size * rng.random_range(0.7..1.6);
        let vertical = size * rng.random_range(0.7..1.6);
        let mut node = Node::new(position);
        node.model = assets.model("rock");
        node.rotation = rng.random_range(0.0..std::f32::consts::TAU);
        let node = scene.add(node);
        let (body, collider) = physics.add_prop_rect(
            to_physics(position),
            Vec2::new(horizontal / 2.0, vertical / 2.0),
            PropBodyDesc {
                fixed: size > 30.0,
                friction: 10.0,
                air_friction: REST_DAMPING,
                mass: 1.0,
                planet_pull: true,
            },
        );
        Self::new(id, node, body, collider, Behavior::Rock { size })
    }

    pub fn human(
        id: EntityId,
        position: Vec2,
        scene: &mut Scene,
        physics: &mut PhysicsWorld,
        assets: &Assets,
        rng: &mut Pcg32,
    ) -> Self {
        let scale = 50.0;
        let mut node = Node::new(position);
        node.model = assets.model("human");
        let node = scene.add(node);
        let (body, collider) = physics.add_prop_rect(
            to_physics(position + Vec2::new(0.0, 30.0)),
            Vec2::splat(scale / 2.0),
            PropBodyDesc {
                fixed: true,
                friction: 10.0,
                air_friction: REST_DAMPING,
                mass: 1.0,
                planet_pull: true,
            },
        );
        Self::new(
            id,
            node,
            body,
            collider,
            Behavior::Human {
                mode: HumanMode::Run { going_left: true },
                next_flip: rng.random_range(3.0..6.0),
            },
        )
    }

    pub fn tank(
        id: EntityId,
        position: Vec2,
        scene: &mut Scene,
        physics: &mut PhysicsWorld,
        assets: &Assets,
        rng: &mut Pcg32,
    ) -> Self {
        let scale = 50.0;
        let mut node = Node::new(position);
        node.model = assets.model("tank");
        let node = scene.add(node);
        let (body, collider) = physics.add_prop_rect(
            to_physics(position),
            Vec2::splat(scale * 0.9 / 2.0),
            PropBodyDesc {
                fixed: false,
                friction: 1.0,
                air_friction: REST_DAMPING,
                mass: 1.0,
                planet_pull: false,
            },
        );
        Self::new(
            id,
            node,
            body,
            collider,
            Behavior::Tank {
                gun_angle: 0.0,
                next_shot: rng.random_range(1.0..3.0),
            },
        )
    }

    /// Shells have no model; the renderer draws them procedurally
    pub fn bullet(
        id: EntityId,
        position: Vec2,
        velocity: Vec2,
        scene: &mut Scene,
        physics: &mut PhysicsWorld,
    ) -> Self {
        let node = scene.add(Node::new(position));
        let (body, collider) = physics.add_bullet(to_physics(position), 5.0, to_physics(velocity), 10.0);
        Self::new(id, node, body, collider, Behavior::Bullet)
    }

    pub fn barn(
        id: EntityId,
        position: Vec2,
        size: f32,
        scene: &mut Scene,
        physics: &mut PhysicsWorld,
        assets: &Assets,
    ) -> Self {
        let mut node = Node::new(position);
        node.model = assets.model("barn");
        let node = scene.add(node);
        let (body, collider) = physics.add_prop_rect(
            to_physics(position + Vec2::new(0.0, 30.0)),
            Vec2::splat(size / 2.0),
            PropBodyDesc {
                fixed: true,
                friction: 10.0,
                air_friction: REST_DAMPING,
                mass: 1.0,
                planet_pull: true,
            },
        );
        Self::new(id, node, body, collider, Behavior::Barn)
    }

    pub fn house(
        id: EntityId,
        position: Vec2,
        size: f32,
        scene: &mut Scene,
        physics: &mut PhysicsWorld,
        assets: &Assets,
    ) -> Self {
        let mut node = Node::new(position);
        node.model = assets.model("house");
        let node = scene.add(node);
        let (body, collider) = physics.add_prop_rect(
            to_physics(position + Vec2::new(0.0, 30.0)),
            Vec2::splat(size / 2.0),
            PropBodyDesc {
                fixed: true,
                friction: 10.0,
                air_friction: REST_DAMPING,
                mass: 1.0,
                planet_pull: true,
            },
        );
        Self::new(id, node, body, collider, Behavior::House)
    }

    /// Scoring category; scenery that never scores returns None
    pub fn category(&self) -> Option<CatchCategory> {
        match self.behavior {
            Behavior::Cow { .. } => Some(CatchCategory::Cow),
            Behavior::Tree => Some(CatchCategory::Tree),
            Behavior::Rock { .. } => Some(CatchCategory::Rock),
            Behavior::Human { .. } => Some(CatchCategory::Human),
            Behavior::Tank { .. } => Some(CatchCategory::Tank),
            Behavior::Bullet | Behavior::Barn | Behavior::House => None,
        }
    }

    /// Size used for tiered scoring (rocks); 0 otherwise
    pub fn size(&self) -> f32 {
        match self.behavior {
            Behavior::Rock { size } => size,
            _ => 0.0,
        }
    }

    /// Unit direction from the planet center through the entity
    pub fn dir_from_center(&self, scene: &Scene) -> Vec2 {
        scene
            .get(self.node)
            .map(|n| n.position.normalize_or_zero())
            .unwrap_or(Vec2::Y)
    }

    /// Surface-left as seen from outside the planet
    pub fn dir_left(&self, scene: &Scene) -> Vec2 {
        self.dir_from_center(scene).perp()
    }

    pub fn dir_right(&self, scene: &Scene) -> Vec2 {
        -self.dir_left(scene)
    }

    /// Invoked once when the entity enters the beam sensor
    pub fn grab(&mut self, physics: &mut PhysicsWorld) {
        self.grabbed = true;
        match &mut self.behavior {
            Behavior::Cow { panicking, .. } => *panicking = true,
            Behavior::Human { mode, .. } => {
                *mode = HumanMode::Grabbed;
                physics.set_frozen(self.body, false);
            }
            _ => {}
        }
    }

    /// Invoked once when the entity leaves the beam sensor (including a
    /// forced despawn)
    pub fn release(&mut self, _physics: &mut PhysicsWorld) {
        self.grabbed = false;
        match &mut self.behavior {
            Behavior::Cow { panicking, .. } => *panicking = false,
            Behavior::Human { mode, .. } => {
                // Free fall until the ground catches them
                *mode = HumanMode::Falling;
            }
            _ => {}
        }
    }

    /// Advance one tick of behavior. Only runs while the simulation is
    /// unpaused.
    pub fn update(&mut self, ctx: &mut UpdateCtx<'_>) {
        match &mut self.behavior {
            Behavior::Cow { anim_time, panicking } => {
                // Graze loop runs double-time while panicking
                *anim_time += if *panicking { ctx.dt * 2.0 } else { ctx.dt };
            }

            Behavior::Human { mode, next_flip } => match *mode {
                HumanMode::Run { going_left } => {
                    let p = ctx.physics.body_position(self.body);
                    let visual = Vec2::new(p.x, -p.y);
                    // Surface angle reproducing this position, then a step
                    // along the surface
                    let angle = visual.x.atan2(visual.y);
                    let dir = if going_left { 1.0 } else { -1.0 };
                    let next = crate::angle_to_world_space(
                        angle + RUN_SPEED * dir * ctx.dt,
                        ctx.planet_radius,
                    );
                    ctx.physics.set_position(self.body, to_physics(next));

                    *next_flip -= ctx.dt;
                    if *next_flip < 0.0 {
                        *mode = HumanMode::Run {
                            going_left: !going_left,
                        };
                        *next_flip = ctx.rng.random_range(3.0..6.0);
                    }
                }
                HumanMode::Grabbed => {}
                HumanMode::Falling => {
                    // The central pull does the falling; wait for ground
                    if ctx.physics.pair_touching(self.collider, ctx.planet_collider) {
                        *mode = HumanMode::Run { going_left: true };
                        *next_flip = ctx.rng.random_range(3.0..6.0);
                        ctx.physics.set_frozen(self.body, true);
                    }
                }
            },

            Behavior::Tank { gun_angle, next_shot } => {
                let Some(node) = ctx.scene.get(self.node) else {
                    return;
                };
                let pivot = node.position;
                let base_rotation = node.rotation;

                // Slew the gun toward the ship at a capped rate
                let gun_dir = rotate_vec(Vec2::Y, base_rotation + *gun_angle);
                let to_ship = (ctx.ship_world - pivot).normalize_or_zero();
                let turn = gun_dir.perp_dot(to_ship);
                if turn.abs() > 1e-3 {
                    *gun_angle += GUN_SLEW * ctx.dt * turn.signum();
                }
                *gun_angle = gun_angle.clamp(-GUN_CLAMP, GUN_CLAMP);

                *next_shot -= ctx.dt;
                if *next_shot < 0.0 {
                    let dir = rotate_vec(Vec2::Y, base_rotation + *gun_angle);
                    ctx.spawns.push(SpawnRequest::Bullet {
                        position: pivot + dir * 20.0,
                        velocity: dir * BULLET_SPEED,
                    });
                    *next_shot = ctx.rng.random_range(1.0..3.0);
                }
            }

            Behavior::Tree
            | Behavior::Rock { .. }
            | Behavior::Bullet
            | Behavior::Barn
            | Behavior::House => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts;
    use crate::consts::TICK_DT;
    use rand::SeedableRng;

    fn fixture() -> (Scene, PhysicsWorld, Assets, Pcg32, ColliderHandle) {
        let mut physics = PhysicsWorld::new();
        let (_planet_body, planet_collider) = physics.add_planet(consts::PLANET_RADIUS);
        (
            Scene::new(),
            physics,
            Assets::new(),
            Pcg32::seed_from_u64(7),
            planet_collider,
        )
    }

    fn surface_point() -> Vec2 {
        crate::angle_to_world_space(0.0, consts::PLANET_RADIUS)
    }

    #[test]
    fn test_dir_helpers_are_orthonormal() {
        let (mut scene, mut physics, assets, _rng, _planet) = fixture();
        let cow = Entity::cow(1, Vec2::new(0.0, 500.0), &mut scene, &mut physics, &assets);

        let up = cow.dir_from_center(&scene);
        let left = cow.dir_left(&scene);
        assert!((up - Vec2::Y).length() < 1e-6);
        assert!(up.dot(left).abs() < 1e-6);
        assert!((left + cow.dir_right(&scene)).length() < 1e-6);
    }

    #[test]
    fn test_human_grab_release_fall_cycle() {
        let (mut scene, mut physics, assets, mut rng, planet_collider) = fixture();
        let mut human = Entity::human(
            1,
            surface_point(),
            &mut scene,
            &mut physics,
            &assets,
            &mut rng,
        );
        assert!(matches!(
            human.behavior,
            Behavior::Human {
                mode: HumanMode::Run { going_left: true },
                ..
            }
        ));

        human.grab(&mut physics);
        assert!(human.grabbed);
        assert!(matches!(
            human.behavior,
            Behavior::Human {
                mode: HumanMode::Grabbed,
                ..
            }
        ));

        // Lift the body off the surface, then let go
        physics.set_position(human.body, Vec2::new(0.0, -(consts::PLANET_RADIUS + 150.0)));
        human.release(&mut physics);
        assert!(!human.grabbed);

        let mut spawns = Vec::new();
        let mut landed = false;
        for _ in 0..600 {
            let mut ctx = UpdateCtx {
                physics: &mut physics,
                scene: &mut scene,
                rng: &mut rng,
                spawns: &mut spawns,
                ship_world: Vec2::new(0.0, consts::PLANET_RADIUS + 200.0),
                planet_collider,
                planet_radius: consts::PLANET_RADIUS,
                dt: TICK_DT,
            };
            human.update(&mut ctx);
            physics.step(TICK_DT);
            if matches!(
                human.behavior,
                Behavior::Human {
                    mode: HumanMode::Run { .. },
                    ..
                }
            ) {
                landed = true;
                break;
            }
        }
        assert!(landed, "released human never hit the ground");
    }

    #[test]
    fn test_human_runs_along_surface() {
        let (mut scene, mut physics, assets, mut rng, planet_collider) = fixture();
        let mut human = Entity::human(
            1,
            surface_point(),
            &mut scene,
            &mut physics,
            &assets,
            &mut rng,
        );

        let mut spawns = Vec::new();
        let start = physics.body_position(human.body);
        for _ in 0..30 {
            let mut ctx = UpdateCtx {
                physics: &mut physics,
                scene: &mut scene,
                rng: &mut rng,
                spawns: &mut spawns,
                ship_world: Vec2::ZERO,
                planet_collider,
                planet_radius: consts::PLANET_RADIUS,
                dt: TICK_DT,
            };
            human.update(&mut ctx);
        }
        let end = physics.body_position(human.body);
        assert!((end - start).length() > 1.0);
        // Still on the surface band
        let r = Vec2::new(end.x, -end.y).length();
        assert!((r - (consts::PLANET_RADIUS + consts::SURFACE_MARGIN)).abs() < 1.0);
    }

    #[test]
    fn test_tank_fires_on_schedule() {
        let (mut scene, mut physics, assets, mut rng, planet_collider) = fixture();
        let mut tank = Entity::tank(
            1,
            surface_point(),
            &mut scene,
            &mut physics,
            &assets,
            &mut rng,
        );

        let mut spawns = Vec::new();
        // Shot delays are drawn from 1..3 s, so 4 s guarantees at least one
        for _ in 0..240 {
            let mut ctx = UpdateCtx {
                physics: &mut physics,
                scene: &mut scene,
                rng: &mut rng,
                spawns: &mut spawns,
                ship_world: Vec2::new(200.0, consts::PLANET_RADIUS + 200.0),
                planet_collider,
                planet_radius: consts::PLANET_RADIUS,
                dt: TICK_DT,
            };
            tank.update(&mut ctx);
        }
        assert!(!spawns.is_empty());
        let SpawnRequest::Bullet { velocity, .. } = spawns[0];
        assert!((velocity.length() - BULLET_SPEED).abs() < 1.0);
    }
}
