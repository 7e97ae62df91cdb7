//! # Graphics
//!
//! The wgpu side of the editor:
//!
//! - [`RenderEngine`] - the [`RenderBackend`](crate::render::RenderBackend) the app renders with
//! - [`pipeline_manager`] - named pipelines built from [`PipelineConfig`]s
//! - [`texture_resource`] - depth, shadow, picking and material textures
//! - [`camera`] - the orbit camera and its mouse controller
//!
//! Shaders live next to this module in `shaders/` and are compiled in with
//! `include_str!`.

pub mod camera;
pub mod pipeline_manager;
pub mod render_engine;
pub mod texture_resource;

pub use camera::{CameraController, OrbitCamera};
pub use pipeline_manager::{PipelineConfig, PipelineManager};
pub use render_engine::RenderEngine;
