//! # User Interface
//!
//! Dear ImGui on top of the render engine. [`UiManager`] owns the imgui
//! context and its winit/wgpu glue; [`EditorUi`] draws the editor's menus and
//! panels against an [`Editor`](crate::editor::Editor).
//!
//! While imgui wants the mouse the app hides the pointer from the editor and
//! the camera, so clicks on a panel never pick through it.

pub mod manager;
pub mod panels;

pub use manager::UiManager;
pub use panels::{EditorUi, FrameStats, NewProjectForm, ViewSettings};
