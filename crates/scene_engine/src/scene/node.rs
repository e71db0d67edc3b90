//! Hierarchical transform entity
//!
//! A [`Node`] is the unit of the scene graph: a transformable,
//! optionally renderable, optionally physical object. The local matrix
//! and the translation/rotation/scale fields are kept consistent only
//! at the moment one is derived from the other — callers pick the
//! direction explicitly with [`Node::update_matrix`] or
//! [`Node::update_transform`].

use crate::foundation::math::{Mat4, Quat, Transform, Vec3};
use crate::scene::graph::NodeKey;

/// Opaque reference to a camera owned by the importer/renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraHandle(pub u32);

/// Opaque reference to a mesh owned by the importer/renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshHandle(pub u32);

/// Collision classification used by the tag-pair reaction table
///
/// Bodies whose contact partner has no owning node are treated as
/// [`Tag::None`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Tag {
    /// No gameplay reaction is associated with this node.
    #[default]
    None,
    /// Projectile spawned from the bullet prefab.
    Bullet,
    /// Target that reacts to being struck by a bullet.
    Hittable,
}

/// Collision shape family selected when a rigid body is built
///
/// Kept separate from [`Tag`] so a hittable enemy can still use the
/// humanoid shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShapeClass {
    /// Box shape with half-extents taken from the node scale.
    #[default]
    Block,
    /// Cylinder shape (radius from `scale.x`, half-height from
    /// `scale.y`) with character-friendly friction and damping.
    Humanoid,
}

/// Physics participation selector for a node
///
/// Mirrors the importer's `dynamic` extras value: absent means no
/// physics at all, zero means a static body, positive means a
/// simulated body with that mass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum MassClass {
    /// No rigid body is ever created for this node.
    #[default]
    None,
    /// Immovable collision geometry with zero mass.
    Static,
    /// Simulated body with the given mass.
    Dynamic(f32),
}

impl MassClass {
    /// Whether a rigid body should be created at all
    pub fn participates(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Whether the body is simulated (receives forces and moves)
    pub fn is_dynamic(self) -> bool {
        matches!(self, Self::Dynamic(_))
    }

    /// Body mass; static bodies weigh zero
    pub fn mass(self) -> f32 {
        match self {
            Self::Dynamic(mass) => mass,
            _ => 0.0,
        }
    }
}

/// Construction options for a [`Node`]
///
/// Every recognized option is an explicit field with an explicit
/// default; unrecognized options are impossible by construction. If
/// `matrix` is set it wins and is decomposed into
/// translation/rotation/scale; otherwise any provided TRS fields are
/// composed into the matrix; otherwise the node starts at identity.
#[derive(Debug, Clone, Default)]
pub struct NodeDesc {
    /// Initial local translation
    pub translation: Option<Vec3>,
    /// Initial local rotation
    pub rotation: Option<Quat>,
    /// Initial local scale
    pub scale: Option<Vec3>,
    /// Initial local matrix (decomposed into TRS when present)
    pub matrix: Option<Mat4>,
    /// Debug/lookup name
    pub name: Option<String>,
    /// Camera reference consumed by the renderer
    pub camera: Option<CameraHandle>,
    /// Mesh reference consumed by the renderer
    pub mesh: Option<MeshHandle>,
    /// Collision tag
    pub tag: Tag,
    /// Collision shape family
    pub shape_class: ShapeClass,
    /// Physics participation and mass
    pub mass_class: MassClass,
    /// Descriptions of child nodes, owned by the new node
    pub children: Vec<NodeDesc>,
}

impl NodeDesc {
    /// Create an empty description (identity transform, no attributes)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: set the local translation
    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = Some(translation);
        self
    }

    /// Builder pattern: set the local rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Builder pattern: set the local scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Builder pattern: set the local matrix
    pub fn with_matrix(mut self, matrix: Mat4) -> Self {
        self.matrix = Some(matrix);
        self
    }

    /// Builder pattern: set the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder pattern: set the camera reference
    pub fn with_camera(mut self, camera: CameraHandle) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Builder pattern: set the mesh reference
    pub fn with_mesh(mut self, mesh: MeshHandle) -> Self {
        self.mesh = Some(mesh);
        self
    }

    /// Builder pattern: set the collision tag
    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tag = tag;
        self
    }

    /// Builder pattern: set the collision shape family
    pub fn with_shape_class(mut self, shape_class: ShapeClass) -> Self {
        self.shape_class = shape_class;
        self
    }

    /// Builder pattern: set the physics participation
    pub fn with_mass_class(mut self, mass_class: MassClass) -> Self {
        self.mass_class = mass_class;
        self
    }

    /// Builder pattern: append a child description
    pub fn with_child(mut self, child: NodeDesc) -> Self {
        self.children.push(child);
        self
    }
}

/// Hierarchical transform entity, unit of the scene graph
#[derive(Debug, Clone)]
pub struct Node {
    /// Local translation
    pub translation: Vec3,
    /// Local rotation
    pub rotation: Quat,
    /// Local scale
    pub scale: Vec3,
    /// Local transform matrix
    pub matrix: Mat4,
    /// Debug/lookup name
    pub name: Option<String>,
    /// Camera reference consumed by the renderer
    pub camera: Option<CameraHandle>,
    /// Mesh reference consumed by the renderer
    pub mesh: Option<MeshHandle>,
    /// Collision tag
    pub tag: Tag,
    /// Collision shape family
    pub shape_class: ShapeClass,
    /// Physics participation and mass
    pub mass_class: MassClass,
    /// Impulse applied to the body every frame by gameplay
    pub acceleration: Vec3,
    /// Optional one-shot impulse applied after the acceleration
    pub jump_force: Option<Vec3>,
    /// Set while the node's body has a touching contact; reset every frame
    pub colliding: bool,
    /// Set when the node is torn down
    pub destroyed: bool,

    pub(crate) children: Vec<NodeKey>,
    pub(crate) parent: Option<NodeKey>,
}

impl Node {
    pub(crate) fn from_desc(desc: &NodeDesc) -> Self {
        let mut node = Self {
            translation: desc.translation.unwrap_or_else(Vec3::zeros),
            rotation: desc.rotation.unwrap_or_else(Quat::identity),
            scale: desc.scale.unwrap_or_else(|| Vec3::new(1.0, 1.0, 1.0)),
            matrix: desc.matrix.unwrap_or_else(Mat4::identity),
            name: desc.name.clone(),
            camera: desc.camera,
            mesh: desc.mesh,
            tag: desc.tag,
            shape_class: desc.shape_class,
            mass_class: desc.mass_class,
            acceleration: Vec3::zeros(),
            jump_force: None,
            colliding: false,
            destroyed: false,
            children: Vec::new(),
            parent: None,
        };

        if desc.matrix.is_some() {
            node.update_transform();
        } else if desc.translation.is_some() || desc.rotation.is_some() || desc.scale.is_some() {
            node.update_matrix();
        }

        node
    }

    /// Decompose the local matrix into translation, rotation, and scale
    ///
    /// The matrix is authoritative; pending TRS edits are overwritten.
    pub fn update_transform(&mut self) {
        let trs = Transform::from_matrix(self.matrix);
        self.translation = trs.position;
        self.rotation = trs.rotation;
        self.scale = trs.scale;
    }

    /// Compose translation, rotation, and scale into the local matrix
    ///
    /// The TRS fields are authoritative; the previous matrix is
    /// overwritten.
    pub fn update_matrix(&mut self) {
        self.matrix = Transform {
            position: self.translation,
            rotation: self.rotation,
            scale: self.scale,
        }
        .to_matrix();
    }

    /// Keys of this node's children, in insertion order
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Key of this node's parent, if attached
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_default_desc_is_identity() {
        let node = Node::from_desc(&NodeDesc::new());

        assert_eq!(node.translation, Vec3::zeros());
        assert_eq!(node.scale, Vec3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(node.matrix, Mat4::identity(), epsilon = EPSILON);
        assert_eq!(node.tag, Tag::None);
        assert_eq!(node.mass_class, MassClass::None);
        assert!(!node.colliding);
        assert!(!node.destroyed);
    }

    #[test]
    fn test_trs_desc_composes_matrix() {
        let node = Node::from_desc(
            &NodeDesc::new()
                .with_translation(Vec3::new(1.0, 2.0, 3.0))
                .with_scale(Vec3::new(2.0, 2.0, 2.0)),
        );

        let expected = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::identity(),
            scale: Vec3::new(2.0, 2.0, 2.0),
        }
        .to_matrix();
        assert_relative_eq!(node.matrix, expected, epsilon = EPSILON);
    }

    #[test]
    fn test_matrix_desc_decomposes_trs() {
        let matrix = Transform {
            position: Vec3::new(4.0, 5.0, 6.0),
            rotation: Quat::from_axis_angle(&Vec3::y_axis(), 0.3),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
        .to_matrix();

        let node = Node::from_desc(&NodeDesc::new().with_matrix(matrix));

        assert_relative_eq!(node.translation, Vec3::new(4.0, 5.0, 6.0), epsilon = EPSILON);
        assert_relative_eq!(node.scale, Vec3::new(1.0, 1.0, 1.0), epsilon = EPSILON);
    }

    #[test]
    fn test_update_roundtrip_preserves_trs() {
        let mut node = Node::from_desc(
            &NodeDesc::new()
                .with_translation(Vec3::new(-1.0, 0.5, 2.0))
                .with_rotation(Quat::from_axis_angle(&Vec3::x_axis(), 0.7))
                .with_scale(Vec3::new(0.5, 2.0, 1.5)),
        );

        let translation = node.translation;
        let rotation = node.rotation;
        let scale = node.scale;

        node.update_matrix();
        node.update_transform();

        assert_relative_eq!(node.translation, translation, epsilon = EPSILON);
        assert_relative_eq!(node.scale, scale, epsilon = EPSILON);
        let dot = rotation.coords.dot(&node.rotation.coords);
        assert!(dot.abs() > 0.999, "rotation changed across roundtrip");
    }

    #[test]
    fn test_mass_class_helpers() {
        assert!(!MassClass::None.participates());
        assert!(MassClass::Static.participates());
        assert!(MassClass::Dynamic(2.0).participates());

        assert!(!MassClass::Static.is_dynamic());
        assert!(MassClass::Dynamic(2.0).is_dynamic());

        assert_eq!(MassClass::Static.mass(), 0.0);
        assert_eq!(MassClass::Dynamic(2.0).mass(), 2.0);
    }
}
