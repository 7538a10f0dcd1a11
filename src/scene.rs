//! Scene-graph and camera collaborator
//!
//! The simulation owns node transforms and the renderer (out of tree)
//! consumes them. Nodes are id-addressed slots; models attach lazily once
//! the asset catalog resolves. The camera orbits the planet on a pivot and
//! provides the normalized-device projection used for culling and beam
//! targeting.

use glam::Vec2;

use crate::assets::ModelId;
use crate::{consts, rotate_vec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(u32);

/// A visual node: 2D transform on the gameplay plane plus an optional model
#[derive(Debug, Clone)]
pub struct Node {
    pub position: Vec2,
    /// Rotation around the view axis
    pub rotation: f32,
    /// Uniform scale; driven by the simulation only during absorption
    pub scale: f32,
    pub model: Option<ModelId>,
}

impl Node {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            rotation: 0.0,
            scale: 1.0,
            model: None,
        }
    }
}

/// Slot-addressed node storage with id reuse
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<Option<Node>>,
    free: Vec<u32>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            self.nodes[index as usize] = Some(node);
            NodeId(index)
        } else {
            self.nodes.push(Some(node));
            NodeId(self.nodes.len() as u32 - 1)
        }
    }

    pub fn remove(&mut self, id: NodeId) {
        match self.nodes.get_mut(id.0 as usize) {
            Some(slot @ Some(_)) => {
                *slot = None;
                self.free.push(id.0);
            }
            _ => log::warn!("removing scene node {id:?} twice"),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)?.as_mut()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter_map(|n| n.as_ref())
    }
}

/// Orthographic camera riding a pivot at the planet center. The pivot
/// counter-rotates with the planet so the camera stays over the same
/// surface point on screen while the world turns underneath.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Pivot rotation around the planet center (kept at -planet_rotation)
    pub pivot_rotation: f32,
    /// Camera offset from the planet center, in the pivot frame
    pub offset: Vec2,
    pub half_extents: Vec2,
}

impl Camera {
    pub fn new(planet_radius: f32) -> Self {
        Self {
            pivot_rotation: 0.0,
            offset: Vec2::new(0.0, planet_radius + consts::CAMERA_VERTICAL_OFFSET),
            half_extents: Vec2::new(consts::VIEW_WIDTH / 2.0, consts::VIEW_HEIGHT / 2.0),
        }
    }

    /// World position of a point expressed in the camera frame
    pub fn camera_to_world(&self, local: Vec2) -> Vec2 {
        rotate_vec(self.offset + local, self.pivot_rotation)
    }

    /// Project a world point to normalized device coordinates ([-1, 1]
    /// inside the view)
    pub fn project(&self, world: Vec2) -> Vec2 {
        let local = rotate_vec(world, -self.pivot_rotation) - self.offset;
        local / self.half_extents
    }
}
