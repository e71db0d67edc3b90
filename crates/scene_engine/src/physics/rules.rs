//! Tag-pair collision policy
//!
//! Gameplay reactions to contacts are driven by a closed table of
//! (tag, tag) -> reaction rules instead of ad hoc string comparison.
//! Lookups are order-independent: a rule registered as
//! (Bullet, Hittable) also matches a contact reported as
//! (Hittable, Bullet).

use crate::scene::{NodeKey, Tag};

/// Reaction triggered when two specific tags co-occur in a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactReaction {
    /// Destroy the first-tag side of the rule (the bullet) and deliver
    /// a [`HitEvent`] for the second-tag side (the target).
    BulletStrike,
}

/// Gameplay event emitted when a bullet strikes a hittable node
///
/// Queued during collision detection and returned from
/// [`PhysicsWorld::update`] for the frame loop to drain.
///
/// [`PhysicsWorld::update`]: crate::physics::PhysicsWorld::update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitEvent {
    /// The bullet node; already destroyed by the time the event is seen.
    pub source: NodeKey,
    /// The node that was struck.
    pub target: NodeKey,
}

/// Pairwise collision-rule table
///
/// Rules are stored as ordered (first, second) tag pairs; lookup
/// normalizes contact order so the policy is symmetric.
#[derive(Debug, Clone)]
pub struct CollisionRules {
    rules: Vec<((Tag, Tag), ContactReaction)>,
}

impl Default for CollisionRules {
    fn default() -> Self {
        Self::shooter()
    }
}

impl CollisionRules {
    /// The shooting-demo policy: a bullet striking a hittable target
    /// destroys the bullet and notifies the target.
    pub fn shooter() -> Self {
        Self {
            rules: vec![((Tag::Bullet, Tag::Hittable), ContactReaction::BulletStrike)],
        }
    }

    /// An empty table (no tag pair produces a reaction)
    pub fn none() -> Self {
        Self { rules: Vec::new() }
    }

    /// Register an additional rule
    pub fn with_rule(mut self, first: Tag, second: Tag, reaction: ContactReaction) -> Self {
        self.rules.push(((first, second), reaction));
        self
    }

    /// Look up the reaction for a contact between tags `a` and `b`
    ///
    /// Returns the reaction and whether the contact matched the rule
    /// in reversed order (`b` is the rule's first tag).
    pub fn lookup(&self, a: Tag, b: Tag) -> Option<(ContactReaction, bool)> {
        for &((first, second), reaction) in &self.rules {
            if (first, second) == (a, b) {
                return Some((reaction, false));
            }
            if (first, second) == (b, a) {
                return Some((reaction, true));
            }
        }
        None
    }
}
