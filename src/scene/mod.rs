// scene/mod.rs

pub mod camera;
pub mod cascaded_shadow;
pub mod collision;
pub mod game_object;
pub mod geometry;
pub mod transform;

// Re-export commonly used types
pub use camera::{Camera, FirstPersonCamera, ThirdPersonCamera};
pub use cascaded_shadow::CascadedShadowManager;
pub use collision::{BoundingBox, Frustum, Ray};
pub use game_object::{GameObject, Model, ModelPart};
pub use geometry::MeshData;
pub use transform::Transform;
