// src/lib.rs
//! Wardrobe Designer
//!
//! An interactive wardrobe editor built on wgpu and winit. Objects are picked
//! by rendering their indices as colors into an off-screen target, spheres
//! fall and rest on boxes, and shelves and partitions are placed and resized
//! from an imgui panel in millimetres.
//!
//! The [`editor::Editor`] and everything below it run against the
//! [`render::RenderBackend`] trait, so the whole frame, picking included, can
//! be driven headlessly with [`render::HeadlessBackend`]. [`app::EditorApp`]
//! wires it to a window and the GPU.

pub mod app;
pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod gfx;
pub mod input;
pub mod interaction;
pub mod physics;
pub mod picking;
pub mod prelude;
pub mod render;
pub mod scene;
pub mod ui;
pub mod units;

pub use app::EditorApp;
pub use editor::Editor;
pub use error::{EditorError, Result};
