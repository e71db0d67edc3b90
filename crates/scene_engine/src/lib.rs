//! # Scene Engine
//!
//! The scene-graph and rigid-body physics core of a first-person
//! shooting demo.
//!
//! ## Features
//!
//! - **Scene Graph**: Hierarchical transform nodes in a keyed arena
//! - **Physics Bridge**: Rigid-body lifecycle and per-frame transform
//!   synchronization on top of rapier
//! - **Tag Policy**: Closed collision-tag table driving gameplay
//!   reactions (bullet hits target)
//! - **Configuration**: Serializable settings with TOML/RON loading
//!
//! ## Quick Start
//!
//! ```
//! use scene_engine::physics::{PhysicsContext, PhysicsWorld};
//! use scene_engine::scene::{MassClass, NodeDesc, SceneGraph};
//!
//! let mut graph = SceneGraph::new();
//! graph.spawn_root(&NodeDesc::default().with_mass_class(MassClass::Static));
//!
//! let mut physics = PhysicsWorld::new(PhysicsContext::load());
//! physics.prepare_world(&graph)?;
//!
//! let events = physics.update(&mut graph, 1.0 / 60.0);
//! assert!(events.is_empty());
//! # Ok::<(), scene_engine::physics::PhysicsError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod physics;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, PhysicsSettings},
        foundation::{
            math::{Mat4, Quat, Transform, Vec3},
            time::Timer,
        },
        physics::{CollisionRules, HitEvent, PhysicsContext, PhysicsError, PhysicsWorld},
        scene::{
            MassClass, Node, NodeDesc, NodeKey, SceneError, SceneGraph, ShapeClass, Tag,
        },
    };
}
