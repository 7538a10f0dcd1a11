//! 2D rigid-body collaborator built on rapier2d
//!
//! Wraps the engine behind the handful of capabilities the simulation
//! needs: body/sensor creation, per-tick stepping, direct position/angle
//! writes for kinematic sensors, per-tick forces, damping control and an
//! ordered collision begin/end event feed drained after each step.
//!
//! The physics plane is y-down relative to the render convention; the
//! world sync pass applies the flip (`visual.y = -physics.y`).

use crossbeam_channel::{Receiver, unbounded};
use glam::Vec2;
use rapier2d::math::Rotation;
use rapier2d::prelude::*;

use crate::consts;

/// Resting air friction restored when the beam lets a body go
pub const REST_DAMPING: f32 = 0.01;

/// Props, terrain and the beam sensor share one group; bullets and the
/// ship hull live in another so shells fly through scenery and only ever
/// hit the ship.
fn prop_groups() -> InteractionGroups {
    InteractionGroups::new(Group::GROUP_1, Group::GROUP_1)
}

fn bullet_groups() -> InteractionGroups {
    InteractionGroups::new(Group::GROUP_2, Group::GROUP_2)
}

/// Begin/end of a sensor overlap or contact, in the order the engine
/// reported them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactEvent {
    Started(ColliderHandle, ColliderHandle),
    Stopped(ColliderHandle, ColliderHandle),
}

/// Body parameters for a prop spawned on the planet surface
#[derive(Debug, Clone, Copy)]
pub struct PropBodyDesc {
    pub fixed: bool,
    pub friction: f32,
    pub air_friction: f32,
    pub mass: f32,
    /// Register for the central planet pull applied before every step
    pub planet_pull: bool,
}

pub struct PhysicsWorld {
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    event_handler: ChannelEventCollector,
    collision_recv: Receiver<CollisionEvent>,
    contact_force_recv: Receiver<ContactForceEvent>,
    pulled: Vec<RigidBodyHandle>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Create an empty world. Gravity is zero; the planet pull is applied
    /// manually so it always points at the planet center.
    pub fn new() -> Self {
        let (collision_send, collision_recv) = unbounded();
        let (contact_force_send, contact_force_recv) = unbounded();
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            gravity: vector![0.0, 0.0],
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            event_handler: ChannelEventCollector::new(collision_send, contact_force_send),
            collision_recv,
            contact_force_recv,
            pulled: Vec::new(),
        }
    }

    /// Step the simulation by a fixed delta and clear per-tick forces.
    /// Collision events collected during the step are available from
    /// `drain_events` afterwards.
    pub fn step(&mut self, dt: f32) {
        self.apply_planet_pull();

        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_handler,
        );

        for (_, body) in self.bodies.iter_mut() {
            body.reset_forces(false);
        }
    }

    /// Collision begin/end feed for the step that just ran, in report order
    pub fn drain_events(&mut self) -> Vec<ContactEvent> {
        // Contact force events are unused but must be drained
        while self.contact_force_recv.try_recv().is_ok() {}

        let mut events = Vec::new();
        while let Ok(event) = self.collision_recv.try_recv() {
            events.push(match event {
                CollisionEvent::Started(a, b, _) => ContactEvent::Started(a, b),
                CollisionEvent::Stopped(a, b, _) => ContactEvent::Stopped(a, b),
            });
        }
        events
    }

    fn apply_planet_pull(&mut self) {
        self.pulled.retain(|&handle| {
            let Some(body) = self.bodies.get_mut(handle) else {
                return false;
            };
            if body.is_dynamic() {
                let to_center = -*body.translation();
                body.add_force(to_center * consts::PLANET_PULL * body.mass(), true);
            }
            true
        });
    }

    /// The planet itself: a fixed disc at the origin
    pub fn add_planet(&mut self, radius: f32) -> (RigidBodyHandle, ColliderHandle) {
        let body = self.bodies.insert(RigidBodyBuilder::fixed().build());
        let collider = ColliderBuilder::ball(radius)
            .collision_groups(prop_groups())
            .friction(1.0)
            .build();
        let collider = self
            .colliders
            .insert_with_parent(collider, body, &mut self.bodies);
        (body, collider)
    }

    /// A rectangular prop body at a surface position
    pub fn add_prop_rect(
        &mut self,
        position: Vec2,
        half_extents: Vec2,
        desc: PropBodyDesc,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let builder = if desc.fixed {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        };
        let body = self.bodies.insert(
            builder
                .translation(vector![position.x, position.y])
                .linear_damping(desc.air_friction)
                .build(),
        );
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y)
            .friction(desc.friction)
            .mass(desc.mass)
            .collision_groups(prop_groups())
            .build();
        let collider = self
            .colliders
            .insert_with_parent(collider, body, &mut self.bodies);
        if desc.planet_pull {
            self.pulled.push(body);
        }
        (body, collider)
    }

    /// A shell: small ball that only interacts with the ship hull
    pub fn add_bullet(
        &mut self,
        position: Vec2,
        radius: f32,
        velocity: Vec2,
        mass: f32,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let body = self.bodies.insert(
            RigidBodyBuilder::dynamic()
                .translation(vector![position.x, position.y])
                .linvel(vector![velocity.x, velocity.y])
                .linear_damping(REST_DAMPING)
                .build(),
        );
        let collider = ColliderBuilder::ball(radius)
            .mass(mass)
            .collision_groups(bullet_groups())
            .build();
        let collider = self
            .colliders
            .insert_with_parent(collider, body, &mut self.bodies);
        (body, collider)
    }

    /// The ship hull sensor: kinematic rectangle in the bullet group,
    /// repositioned every tick from the ship transform
    pub fn add_ship_sensor(&mut self, half_extents: Vec2) -> (RigidBodyHandle, ColliderHandle) {
        let body = self
            .bodies
            .insert(RigidBodyBuilder::kinematic_position_based().build());
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y)
            .sensor(true)
            .collision_groups(bullet_groups())
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .active_collision_types(
                ActiveCollisionTypes::default()
                    | ActiveCollisionTypes::KINEMATIC_FIXED
                    | ActiveCollisionTypes::KINEMATIC_KINEMATIC,
            )
            .build();
        let collider = self
            .colliders
            .insert_with_parent(collider, body, &mut self.bodies);
        (body, collider)
    }

    /// The tractor-beam sensor: a cone with its apex at the body origin so
    /// rotating the body swings the beam. Overlaps fixed props too.
    pub fn add_beam_sensor(&mut self, width: f32, height: f32) -> (RigidBodyHandle, ColliderHandle) {
        let body = self
            .bodies
            .insert(RigidBodyBuilder::kinematic_position_based().build());
        let collider = ColliderBuilder::triangle(
            point![0.0, 0.0],
            point![width / 2.0, height],
            point![-width / 2.0, height],
        )
        .sensor(true)
        .collision_groups(prop_groups())
        .active_events(ActiveEvents::COLLISION_EVENTS)
        .active_collision_types(
            ActiveCollisionTypes::default()
                | ActiveCollisionTypes::KINEMATIC_FIXED
                | ActiveCollisionTypes::KINEMATIC_KINEMATIC,
        )
        .build();
        let collider = self
            .colliders
            .insert_with_parent(collider, body, &mut self.bodies);
        (body, collider)
    }

    pub fn body_position(&self, handle: RigidBodyHandle) -> Vec2 {
        self.bodies
            .get(handle)
            .map(|b| Vec2::new(b.translation().x, b.translation().y))
            .unwrap_or(Vec2::ZERO)
    }

    pub fn body_angle(&self, handle: RigidBodyHandle) -> f32 {
        self.bodies
            .get(handle)
            .map(|b| b.rotation().angle())
            .unwrap_or(0.0)
    }

    pub fn set_position(&mut self, handle: RigidBodyHandle, position: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_translation(vector![position.x, position.y], true);
        }
    }

    pub fn set_angle(&mut self, handle: RigidBodyHandle, angle: f32) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_rotation(Rotation::new(angle), true);
        }
    }

    pub fn set_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(vector![velocity.x, velocity.y], true);
        }
    }

    /// Air-friction equivalent; the beam cranks this up while holding a
    /// body and restores `REST_DAMPING` on release
    pub fn set_damping(&mut self, handle: RigidBodyHandle, damping: f32) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linear_damping(damping);
        }
    }

    /// Force applied for the next step only
    pub fn apply_force(&mut self, handle: RigidBodyHandle, force: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.add_force(vector![force.x, force.y], true);
        }
    }

    /// Freeze or unfreeze a body in place (running humans are frozen,
    /// grabbed ones are not)
    pub fn set_frozen(&mut self, handle: RigidBodyHandle, frozen: bool) {
        if let Some(body) = self.bodies.get_mut(handle) {
            let kind = if frozen {
                RigidBodyType::Fixed
            } else {
                RigidBodyType::Dynamic
            };
            if body.body_type() != kind {
                body.set_body_type(kind, true);
            }
        }
    }

    /// Whether two colliders currently overlap (sensor intersection or
    /// active contact)
    pub fn pair_touching(&self, a: ColliderHandle, b: ColliderHandle) -> bool {
        if self.narrow_phase.intersection_pair(a, b) == Some(true) {
            return true;
        }
        self.narrow_phase
            .contact_pair(a, b)
            .is_some_and(|pair| pair.has_any_active_contact)
    }

    /// Owning body of a collider, if both still exist
    pub fn collider_parent(&self, collider: ColliderHandle) -> Option<RigidBodyHandle> {
        self.colliders.get(collider).and_then(|c| c.parent())
    }

    /// Remove a body together with its colliders; safe to call with a
    /// stale handle
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        if self.bodies.get(handle).is_none() {
            log::warn!("removing physics body {handle:?} twice");
            return;
        }
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        self.pulled.retain(|&h| h != handle);
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}
