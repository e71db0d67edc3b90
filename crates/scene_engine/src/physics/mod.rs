//! Rigid-body physics bridge
//!
//! The [`PhysicsWorld`] owns the dynamics engine state and the set of
//! scene nodes registered for simulation. Gameplay writes intents into
//! node fields (acceleration, jump force, rotation); one `update` call
//! per frame pushes those into the engine, steps it, synchronizes
//! translations back into the scene graph, and reports tag-policy hits.

pub mod rules;
pub mod world;

pub use rules::{CollisionRules, ContactReaction, HitEvent};
pub use world::{PhysicsContext, PhysicsError, PhysicsWorld};
