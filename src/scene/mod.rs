//! # Scene Graph
//!
//! Objects, the ordered scene that owns them, the cluster relation between
//! inserted wardrobe parts, and the parametric wardrobe generator.
//!
//! ```rust
//! use wardrobe_designer::scene::{Scene, SceneObject};
//! use cgmath::Vector3;
//!
//! let mut scene = Scene::new();
//! let id = scene.add_object(SceneObject::new_sphere("ball", Vector3::new(0.0, 3.0, 0.0), 1.0));
//! assert_eq!(id, 0);
//! ```

pub mod cluster;
pub mod object;
pub mod scene;
pub mod wardrobe;

pub use cluster::{ClusterId, ClusterManager};
pub use object::{
    BoxShape, DrawContext, Material, MaterialTextures, ObjectFlags, ObjectKind, PartKind,
    PassKind, PhysicsState, SceneObject, WardrobePart, WardrobeSide,
};
pub use scene::{Scene, SceneStatistics};
pub use wardrobe::{InsertRequest, WardrobeGenerator};
