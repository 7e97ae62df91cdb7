//! Editor configuration
//!
//! Plain settings struct with builder-style setters. Everything has a sensible
//! default so `EditorConfig::default()` starts the editor as shipped.

use std::path::PathBuf;

/// Dimensions of a wardrobe in millimetres, as entered in the new-project dialog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WardrobeDimensions {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    pub board_thickness: f32,
    pub base_height: f32,
}

impl Default for WardrobeDimensions {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 2000.0,
            depth: 600.0,
            board_thickness: 16.0,
            base_height: 80.0,
        }
    }
}

impl WardrobeDimensions {
    /// Rejects dimensions that cannot produce a wardrobe with a non-empty interior.
    pub fn is_buildable(&self) -> bool {
        self.board_thickness > 0.0
            && self.base_height >= 0.0
            && self.width > 2.0 * self.board_thickness
            && self.height > self.base_height + 2.0 * self.board_thickness
            && self.depth > self.board_thickness
    }
}

#[derive(Debug, Clone)]
pub struct EditorConfig {
    pub window_title: String,
    pub window_size: (u32, u32),
    pub vsync: bool,
    pub shadow_map_size: u32,
    /// Scales cursor movement (pixels) into world units per second while dragging.
    pub drag_sensitivity: f32,
    /// Reads the picking target under the cursor every frame to drive hover.
    pub hover_picking: bool,
    pub clear_color: [f64; 4],
    pub wardrobe: WardrobeDimensions,
    pub texture_dir: Option<PathBuf>,
    pub demo_scene: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            window_title: "Wardrobe Designer".to_string(),
            window_size: (1600, 900),
            vsync: false,
            shadow_map_size: 2048,
            drag_sensitivity: 12.0,
            hover_picking: false,
            clear_color: [0.1, 0.2, 0.3, 1.0],
            wardrobe: WardrobeDimensions::default(),
            texture_dir: None,
            demo_scene: true,
        }
    }
}

impl EditorConfig {
    pub fn with_title(mut self, title: &str) -> Self {
        self.window_title = title.to_owned();
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width.max(1), height.max(1));
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Sets the shadow map resolution, clamped to the device limit the engine requests.
    pub fn with_shadow_map_size(mut self, size: u32) -> Self {
        self.shadow_map_size = size.clamp(256, 4096);
        self
    }

    pub fn with_drag_sensitivity(mut self, sensitivity: f32) -> Self {
        self.drag_sensitivity = sensitivity;
        self
    }

    pub fn with_hover_picking(mut self, enabled: bool) -> Self {
        self.hover_picking = enabled;
        self
    }

    pub fn with_clear_color(mut self, color: [f64; 4]) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_wardrobe(mut self, dimensions: WardrobeDimensions) -> Self {
        self.wardrobe = dimensions;
        self
    }

    /// Directory scanned for `*.png` / `*.jpg` textures at startup.
    pub fn with_texture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.texture_dir = Some(dir.into());
        self
    }

    pub fn with_demo_scene(mut self, enabled: bool) -> Self {
        self.demo_scene = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = EditorConfig::default()
            .with_vsync(true)
            .with_shadow_map_size(100_000)
            .with_window_size(0, 720)
            .with_hover_picking(true);

        assert!(config.vsync);
        assert!(config.hover_picking);
        assert_eq!(config.shadow_map_size, 4096);
        assert_eq!(config.window_size, (1, 720));
        assert_eq!(config.drag_sensitivity, 12.0);
    }

    #[test]
    fn test_wardrobe_dimensions_validation() {
        assert!(WardrobeDimensions::default().is_buildable());

        let too_thin = WardrobeDimensions {
            width: 30.0,
            ..Default::default()
        };
        assert!(!too_thin.is_buildable());

        let no_board = WardrobeDimensions {
            board_thickness: 0.0,
            ..Default::default()
        };
        assert!(!no_board.is_buildable());
    }
}
