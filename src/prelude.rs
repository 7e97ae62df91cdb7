//! # Prelude
//!
//! Commonly used types in one import:
//!
//! ```no_run
//! use wardrobe_designer::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = EditorConfig::default().with_vsync(true);
//!     EditorApp::new(config).run()
//! }
//! ```

// Application and editor
pub use crate::app::EditorApp;
pub use crate::config::{EditorConfig, WardrobeDimensions};
pub use crate::editor::Editor;
pub use crate::error::{EditorError, Result};

// Scene
pub use crate::scene::{
    InsertRequest, Material, PartKind, Scene, SceneObject, WardrobeGenerator, WardrobeSide,
};

// Interaction and input
pub use crate::input::{FrameInput, InputState};
pub use crate::interaction::{
    DeleteOutcome, EditOutcome, InteractionController, InteractionState, MoveTransaction,
    PickAction,
};

// Rendering
pub use crate::render::{
    FrameContext, FrameReport, HeadlessBackend, RenderBackend, RenderOrchestrator,
    TextureRegistry,
};

// Units
pub use crate::units::{mm_to_units, units_to_mm};

pub use cgmath::Vector3;
