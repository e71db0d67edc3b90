//! Rigid-body world wrapper
//!
//! Bridges the scene graph to the rapier dynamics engine: owns body
//! lifecycle for nodes, applies per-frame forces, advances the
//! simulation, synchronizes node transforms from body state, and
//! detects and reacts to contacts.
//!
//! Scene graph and physics are two parallel representations of the
//! same spatial state. Consistency depends on strict ordering inside
//! [`PhysicsWorld::update`]: forces before stepping, transform sync
//! and collision detection after stepping, all within one call.

use std::collections::HashMap;

use nalgebra::{Isometry3, Translation3};
use rapier3d::prelude::{
    CCDSolver, ColliderBuilder, ColliderSet, DefaultBroadPhase, ImpulseJointSet,
    IntegrationParameters, IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline,
    RigidBody, RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
};
use slotmap::SecondaryMap;
use thiserror::Error;

use crate::config::PhysicsSettings;
use crate::foundation::math::Vec3;
use crate::physics::rules::{CollisionRules, ContactReaction, HitEvent};
use crate::scene::{NodeKey, SceneGraph, ShapeClass, Tag};

/// Fixed internal sub-step count used by every [`PhysicsWorld::update`]
const SUBSTEPS: u32 = 2;

/// Errors surfaced while building physics state for a node
///
/// These are configuration defects, not runtime conditions; there are
/// no retries anywhere in this core.
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// The key does not refer to a live node in the scene graph.
    #[error("node is not present in the scene graph")]
    UnknownNode,

    /// A mass-class node has a scale unusable as shape half-extents.
    #[error("node `{name}` has non-positive scale {scale:?}, cannot build a collision shape")]
    InvalidShape {
        /// Name of the offending node (or `<unnamed>`).
        name: String,
        /// The rejected scale.
        scale: Vec3,
    },
}

/// Owned state of the dynamics engine
///
/// The engine's one-time load is an explicit construction step: build
/// the context first, then hand it to [`PhysicsWorld::new`]. A world
/// cannot be stepped before its context exists, which encodes the
/// "loaded" gate by construction.
pub struct PhysicsContext {
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    integration: IntegrationParameters,
}

impl Default for PhysicsContext {
    fn default() -> Self {
        Self::load()
    }
}

impl PhysicsContext {
    /// Construct the dynamics engine state: collision structures,
    /// solver, and body/collider sets
    pub fn load() -> Self {
        log::info!("Loading physics engine context...");
        Self {
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            integration: IntegrationParameters::default(),
        }
    }
}

/// The rigid-body world: simulation context, gravity, and the tracked
/// node list with its body links
pub struct PhysicsWorld {
    ctx: PhysicsContext,
    gravity: Vec3,
    settings: PhysicsSettings,
    rules: CollisionRules,
    /// Nodes currently registered for simulation, in registration order
    tracked: Vec<NodeKey>,
    /// Node -> body half of the bidirectional link
    body_of: SecondaryMap<NodeKey, RigidBodyHandle>,
    /// Body -> node half of the bidirectional link
    node_of: HashMap<RigidBodyHandle, NodeKey>,
}

impl PhysicsWorld {
    /// Create a world with default settings and the shooter tag policy
    pub fn new(ctx: PhysicsContext) -> Self {
        Self::with_settings(ctx, PhysicsSettings::default())
    }

    /// Create a world with explicit settings
    pub fn with_settings(ctx: PhysicsContext, settings: PhysicsSettings) -> Self {
        Self {
            ctx,
            gravity: Vec3::from(settings.gravity),
            settings,
            rules: CollisionRules::default(),
            tracked: Vec::new(),
            body_of: SecondaryMap::new(),
            node_of: HashMap::new(),
        }
    }

    /// Replace the tag-pair reaction table
    pub fn with_rules(mut self, rules: CollisionRules) -> Self {
        self.rules = rules;
        self
    }

    /// The gravity vector applied to every dynamic body
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Keys of the nodes currently tracked for simulation
    pub fn tracked_nodes(&self) -> &[NodeKey] {
        &self.tracked
    }

    /// The rigid-body handle linked to a node, if it is tracked
    pub fn body_handle(&self, key: NodeKey) -> Option<RigidBodyHandle> {
        self.body_of.get(key).copied()
    }

    /// The rigid body linked to a node, if it is tracked
    pub fn body(&self, key: NodeKey) -> Option<&RigidBody> {
        self.ctx.bodies.get(self.body_handle(key)?)
    }

    /// Register every node in the scene's direct node list
    ///
    /// Nested descendants are not registered automatically; physics
    /// participation is opt-in per top-level node unless deeper nodes
    /// are added individually.
    pub fn prepare_world(&mut self, graph: &SceneGraph) -> Result<(), PhysicsError> {
        for &key in graph.roots() {
            self.add_node(graph, key)?;
        }
        log::info!(
            "Physics world prepared: {} tracked node(s)",
            self.tracked.len()
        );
        Ok(())
    }

    /// Create a rigid body for a node and start tracking it
    ///
    /// Nodes without a mass class are never added. The body is placed
    /// at the node's current translation and rotation, shaped from its
    /// scale (cylinder for the humanoid shape class, box otherwise),
    /// given mass-derived local inertia, friction/damping tuned per
    /// shape class, and kept from deactivating. Body and node are
    /// linked bidirectionally for the shorter of node destruction or
    /// explicit removal.
    pub fn add_node(&mut self, graph: &SceneGraph, key: NodeKey) -> Result<(), PhysicsError> {
        let node = graph.get(key).ok_or(PhysicsError::UnknownNode)?;
        if !node.mass_class.participates() {
            return Ok(());
        }
        if node.scale.x <= 0.0 || node.scale.y <= 0.0 || node.scale.z <= 0.0 {
            return Err(PhysicsError::InvalidShape {
                name: node.name.clone().unwrap_or_else(|| "<unnamed>".to_owned()),
                scale: node.scale,
            });
        }

        let mut builder = if node.mass_class.is_dynamic() {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        }
        .position(Isometry3::from_parts(
            Translation3::from(node.translation),
            node.rotation,
        ))
        .can_sleep(false);

        if node.shape_class == ShapeClass::Humanoid {
            builder = builder
                .linear_damping(self.settings.humanoid_linear_damping)
                .angular_damping(self.settings.humanoid_angular_damping);
        }
        let handle = self.ctx.bodies.insert(builder.build());

        let collider = match node.shape_class {
            ShapeClass::Humanoid => ColliderBuilder::cylinder(node.scale.y, node.scale.x)
                .friction(self.settings.humanoid_friction),
            ShapeClass::Block => {
                ColliderBuilder::cuboid(node.scale.x, node.scale.y, node.scale.z)
                    .friction(self.settings.block_friction)
            }
        }
        .mass(node.mass_class.mass());
        self.ctx
            .colliders
            .insert_with_parent(collider.build(), handle, &mut self.ctx.bodies);

        self.body_of.insert(key, handle);
        self.node_of.insert(handle, key);
        self.tracked.push(key);
        log::debug!(
            "Tracking node {:?} ({:?}, {:?})",
            node.name,
            node.mass_class,
            node.shape_class
        );
        Ok(())
    }

    /// Stop tracking a node and detach it from its parent
    ///
    /// Both halves of the body link are cleared together. The rigid
    /// body itself is NOT retracted from the dynamics world: it keeps
    /// being simulated and collidable, contributing tag-None contacts
    /// from then on.
    pub fn remove_node(&mut self, graph: &mut SceneGraph, key: NodeKey) {
        if !self.untrack(key) {
            return;
        }
        graph.detach(key);
    }

    /// Destroy a node subtree and drop physics tracking for all of it
    ///
    /// This is the full destruction contract: the graph removes the
    /// subtree from parents and the scene list, and every removed key
    /// is untracked here. Idempotent for already-destroyed keys.
    pub fn destroy_node(&mut self, graph: &mut SceneGraph, key: NodeKey) {
        for removed in graph.destroy(key) {
            self.untrack(removed);
        }
    }

    /// Clear the tracked entry and both link maps for a key
    fn untrack(&mut self, key: NodeKey) -> bool {
        let Some(index) = self.tracked.iter().position(|&k| k == key) else {
            return false;
        };
        self.tracked.remove(index);
        if let Some(handle) = self.body_of.remove(key) {
            self.node_of.remove(&handle);
        }
        true
    }

    /// Advance the simulation by `dt` and synchronize the scene graph
    ///
    /// Per-frame entry point, in strict order: apply forces, step the
    /// engine (two sub-steps), copy body positions back into nodes,
    /// reset colliding flags, then detect contacts and apply the tag
    /// policy. Returns the hit events produced this frame.
    pub fn update(&mut self, graph: &mut SceneGraph, dt: f32) -> Vec<HitEvent> {
        self.apply_forces(graph);
        self.step(dt);
        self.sync_transforms(graph);

        for &key in &self.tracked {
            if let Some(node) = graph.get_mut(key) {
                node.colliding = false;
            }
        }

        let mut events = Vec::new();
        self.detect_collisions(graph, &mut events);
        events
    }

    /// Push gameplay forces into the bodies of tracked dynamic nodes
    fn apply_forces(&mut self, graph: &SceneGraph) {
        for &key in &self.tracked {
            let Some(node) = graph.get(key) else { continue };
            if !node.mass_class.is_dynamic() {
                continue;
            }
            let Some(&handle) = self.body_of.get(key) else {
                continue;
            };
            let Some(body) = self.ctx.bodies.get_mut(handle) else {
                continue;
            };

            // Candidate next velocity; the speed cap that would consume
            // it is disabled, so the raw impulse goes in unclamped.
            let _next_velocity = body.linvel() + node.acceleration;

            // The node owns orientation: overwrite whatever rotation the
            // last step produced before integrating again.
            body.set_rotation(node.rotation, true);
            body.apply_impulse(node.acceleration, true);

            // Jump force goes in after the movement impulse
            if let Some(jump) = node.jump_force {
                body.apply_impulse(jump, true);
            }
        }
    }

    /// Step the dynamics engine, splitting `dt` across the fixed
    /// sub-step count
    fn step(&mut self, dt: f32) {
        let ctx = &mut self.ctx;
        ctx.integration.dt = dt / SUBSTEPS as f32;
        for _ in 0..SUBSTEPS {
            ctx.pipeline.step(
                &self.gravity,
                &ctx.integration,
                &mut ctx.islands,
                &mut ctx.broad_phase,
                &mut ctx.narrow_phase,
                &mut ctx.bodies,
                &mut ctx.colliders,
                &mut ctx.impulse_joints,
                &mut ctx.multibody_joints,
                &mut ctx.ccd_solver,
                None,
                &(),
                &(),
            );
        }
    }

    /// Copy body positions back into tracked dynamic nodes
    ///
    /// Only translation feeds back; physics-driven rotation is not
    /// reflected in the node transform.
    fn sync_transforms(&mut self, graph: &mut SceneGraph) {
        for &key in &self.tracked {
            let Some(&handle) = self.body_of.get(key) else {
                continue;
            };
            let Some(body) = self.ctx.bodies.get(handle) else {
                continue;
            };
            let Some(node) = graph.get_mut(key) else { continue };
            if !node.mass_class.is_dynamic() {
                continue;
            }
            node.translation = *body.translation();
            node.update_matrix();
        }
    }

    /// Enumerate contact manifolds, mark colliding nodes, and apply
    /// the tag-pair policy
    fn detect_collisions(&mut self, graph: &mut SceneGraph, events: &mut Vec<HitEvent>) {
        // (bullet, target) pairs to resolve once iteration is done
        let mut strikes: Vec<(NodeKey, NodeKey)> = Vec::new();

        for pair in self.ctx.narrow_phase.contact_pairs() {
            let body0 = self
                .ctx
                .colliders
                .get(pair.collider1)
                .and_then(|collider| collider.parent());
            let body1 = self
                .ctx
                .colliders
                .get(pair.collider2)
                .and_then(|collider| collider.parent());

            let key0 = body0.and_then(|handle| self.node_of.get(&handle).copied());
            let key1 = body1.and_then(|handle| self.node_of.get(&handle).copied());
            if key0.is_none() && key1.is_none() {
                // Contact between un-tracked geometry; expected, skip.
                continue;
            }

            let tag0 = key0
                .and_then(|key| graph.get(key))
                .map_or(Tag::None, |node| node.tag);
            let tag1 = key1
                .and_then(|key| graph.get(key))
                .map_or(Tag::None, |node| node.tag);

            for manifold in &pair.manifolds {
                for point in &manifold.points {
                    // Positive distance means separated
                    if point.dist > 0.0 {
                        continue;
                    }

                    if let Some(node) = key0.and_then(|key| graph.get_mut(key)) {
                        node.colliding = true;
                    }
                    if let Some(node) = key1.and_then(|key| graph.get_mut(key)) {
                        node.colliding = true;
                    }

                    if let Some((reaction, swapped)) = self.rules.lookup(tag0, tag1) {
                        match reaction {
                            ContactReaction::BulletStrike => {
                                let (bullet, target) =
                                    if swapped { (key1, key0) } else { (key0, key1) };
                                if let (Some(bullet), Some(target)) = (bullet, target) {
                                    strikes.push((bullet, target));
                                }
                            }
                        }
                    }
                }
            }
        }

        for (bullet, target) in strikes {
            // A bullet already destroyed by an earlier contact point
            // this frame must not fire again.
            if !graph.contains(bullet) {
                continue;
            }
            log::debug!("Bullet strike on node {target:?}");
            self.destroy_node(graph, bullet);
            events.push(HitEvent {
                source: bullet,
                target,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use crate::scene::{MassClass, NodeDesc};
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 60.0;

    fn block(mass_class: MassClass, translation: Vec3, scale: Vec3) -> NodeDesc {
        NodeDesc::new()
            .with_translation(translation)
            .with_scale(scale)
            .with_mass_class(mass_class)
    }

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(PhysicsContext::load())
    }

    #[test]
    fn test_prepare_world_tracks_only_mass_class_nodes() {
        let mut graph = SceneGraph::new();
        let plain = graph.spawn_root(&NodeDesc::new());
        let fixed = graph.spawn_root(&block(
            MassClass::Static,
            Vec3::zeros(),
            Vec3::new(1.0, 1.0, 1.0),
        ));
        let dynamic = graph.spawn_root(&block(
            MassClass::Dynamic(1.0),
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(0.5, 0.5, 0.5),
        ));

        let mut physics = world();
        physics.prepare_world(&graph).unwrap();

        assert_eq!(physics.tracked_nodes(), &[fixed, dynamic]);
        assert!(!physics.tracked_nodes().contains(&plain));
        assert!(physics.body_handle(plain).is_none());
    }

    #[test]
    fn test_add_node_rejects_degenerate_scale() {
        let mut graph = SceneGraph::new();
        let bad = graph.spawn_root(&block(
            MassClass::Static,
            Vec3::zeros(),
            Vec3::new(0.0, 1.0, 1.0),
        ));

        let mut physics = world();
        let result = physics.add_node(&graph, bad);

        assert!(matches!(result, Err(PhysicsError::InvalidShape { .. })));
        assert!(physics.tracked_nodes().is_empty());
    }

    #[test]
    fn test_dynamic_node_falls_and_syncs_translation_only() {
        let mut graph = SceneGraph::new();
        let falling = graph.spawn_root(&block(
            MassClass::Dynamic(1.0),
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(0.5, 0.5, 0.5),
        ));

        let mut physics = world();
        physics.prepare_world(&graph).unwrap();
        for _ in 0..10 {
            physics.update(&mut graph, DT);
        }

        let node = graph.get(falling).unwrap();
        assert!(node.translation.y < 4.99, "gravity should pull the node down");

        // Matrix was recomposed from the synced translation
        assert_relative_eq!(node.matrix.m24, node.translation.y, epsilon = 1e-5);

        // Rotation is not synchronized back from the body
        let dot = node.rotation.coords.dot(&Quat::identity().coords);
        assert!(dot.abs() > 0.999_9);
    }

    #[test]
    fn test_acceleration_and_jump_force_are_applied() {
        let mut graph = SceneGraph::new();
        let jumper = graph.spawn_root(&block(
            MassClass::Dynamic(1.0),
            Vec3::zeros(),
            Vec3::new(0.5, 0.5, 0.5),
        ));

        let mut physics = world();
        physics.prepare_world(&graph).unwrap();

        {
            let node = graph.get_mut(jumper).unwrap();
            node.acceleration = Vec3::new(2.0, 0.0, 0.0);
            node.jump_force = Some(Vec3::new(0.0, 8.0, 0.0));
        }
        physics.update(&mut graph, DT);

        let body = physics.body(jumper).unwrap();
        assert!(body.linvel().x > 0.0, "movement impulse missing");
        assert!(body.linvel().y > 0.0, "jump impulse missing");
    }

    #[test]
    fn test_node_rotation_overwrites_body_rotation() {
        let mut graph = SceneGraph::new();
        let spinner = graph.spawn_root(&block(
            MassClass::Dynamic(1.0),
            Vec3::zeros(),
            Vec3::new(0.5, 0.5, 0.5),
        ));

        let mut physics = world();
        physics.prepare_world(&graph).unwrap();

        let turned = Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2);
        graph.get_mut(spinner).unwrap().rotation = turned;
        physics.update(&mut graph, DT);

        let body = physics.body(spinner).unwrap();
        let dot = body.rotation().coords.dot(&turned.coords);
        assert!(dot.abs() > 0.999, "body rotation should follow the node");
    }

    fn bullet_at(translation: Vec3) -> NodeDesc {
        block(
            MassClass::Dynamic(1.0),
            translation,
            Vec3::new(0.2, 0.2, 0.2),
        )
        .with_tag(Tag::Bullet)
        .with_name("Bullet")
    }

    fn hittable_at(translation: Vec3) -> NodeDesc {
        block(MassClass::Static, translation, Vec3::new(1.0, 1.0, 1.0))
            .with_tag(Tag::Hittable)
            .with_name("Enemy")
    }

    #[test]
    fn test_bullet_strike_destroys_bullet_and_notifies_target() {
        let mut graph = SceneGraph::new();
        let bullet = graph.spawn_root(&bullet_at(Vec3::new(0.0, 0.0, 0.9)));
        let target = graph.spawn_root(&hittable_at(Vec3::zeros()));

        let mut physics = world();
        physics.prepare_world(&graph).unwrap();
        let events = physics.update(&mut graph, DT);

        assert_eq!(events, vec![HitEvent { source: bullet, target }]);
        assert!(!graph.contains(bullet), "bullet node should be destroyed");
        assert!(!physics.tracked_nodes().contains(&bullet));
        assert!(
            graph.get(target).unwrap().colliding,
            "target should be flagged as colliding"
        );
    }

    #[test]
    fn test_bullet_strike_is_order_independent() {
        // Same scenario with the registration (and thus manifold
        // reporting) order reversed
        let mut graph = SceneGraph::new();
        let target = graph.spawn_root(&hittable_at(Vec3::zeros()));
        let bullet = graph.spawn_root(&bullet_at(Vec3::new(0.0, 0.0, 0.9)));

        let mut physics = world();
        physics.prepare_world(&graph).unwrap();
        let events = physics.update(&mut graph, DT);

        assert_eq!(events, vec![HitEvent { source: bullet, target }]);
        assert!(!graph.contains(bullet));
        assert!(graph.get(target).unwrap().colliding);
    }

    #[test]
    fn test_separated_bodies_produce_no_reaction() {
        let mut graph = SceneGraph::new();
        let bullet = graph.spawn_root(&bullet_at(Vec3::new(0.0, 0.0, 5.0)));
        let target = graph.spawn_root(&hittable_at(Vec3::zeros()));

        let mut physics = world();
        physics.prepare_world(&graph).unwrap();
        let events = physics.update(&mut graph, DT);

        assert!(events.is_empty());
        assert!(graph.contains(bullet));
        assert!(!graph.get(bullet).unwrap().colliding);
        assert!(!graph.get(target).unwrap().colliding);
    }

    #[test]
    fn test_remove_node_untracks_and_detaches_but_keeps_body() {
        let mut graph = SceneGraph::new();
        let parent = graph.spawn_root(&NodeDesc::new());
        let child = graph.spawn(&block(
            MassClass::Dynamic(1.0),
            Vec3::zeros(),
            Vec3::new(0.5, 0.5, 0.5),
        ));
        graph.add_child(parent, child);

        let mut physics = world();
        physics.add_node(&graph, child).unwrap();
        assert!(physics.body_handle(child).is_some());

        physics.remove_node(&mut graph, child);

        assert!(physics.tracked_nodes().is_empty());
        assert!(physics.body_handle(child).is_none());
        assert_eq!(graph.get(child).unwrap().parent(), None);
        assert!(graph.get(parent).unwrap().children().is_empty());

        // Removing again is a no-op
        physics.remove_node(&mut graph, child);
        assert!(physics.tracked_nodes().is_empty());
    }

    #[test]
    fn test_destroy_node_untracks_whole_subtree() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_root(&block(
            MassClass::Dynamic(1.0),
            Vec3::zeros(),
            Vec3::new(0.5, 0.5, 0.5),
        ));
        let child = graph.spawn(&block(
            MassClass::Dynamic(1.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.2, 0.2, 0.2),
        ));
        graph.add_child(root, child);

        let mut physics = world();
        physics.add_node(&graph, root).unwrap();
        physics.add_node(&graph, child).unwrap();

        physics.destroy_node(&mut graph, root);

        assert!(physics.tracked_nodes().is_empty());
        assert!(!graph.contains(root));
        assert!(!graph.contains(child));

        // Destroying again is a no-op
        physics.destroy_node(&mut graph, root);
    }
}
