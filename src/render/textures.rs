//! Texture registry
//!
//! Owns every material texture by [`TextureId`] and hands out complete
//! [`MaterialTextures`] sets by name. Objects only ever hold copies of the ids.
//!
//! A fresh registry always contains procedurally generated sets, so the editor
//! renders without any files on disk. Images found in an optional texture
//! directory are added as further albedo sets sharing the default maps.

use std::path::Path;

use crate::{
    error::{EditorError, Result},
    scene::MaterialTextures,
};

use super::{RenderBackend, TextureId};

const PROCEDURAL_SIZE: u32 = 64;

pub const WOOD: &str = "Oak";
pub const FLOOR: &str = "Floor tiles";

#[derive(Debug, Clone)]
pub struct TextureSet {
    pub name: String,
    pub textures: MaterialTextures,
}

/// Decoded RGBA8 image ready for upload.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl ImageData {
    pub fn from_file(path: &Path) -> Result<Self> {
        let img = image::open(path)
            .map_err(|source| EditorError::TextureDecode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        let (width, height) = img.dimensions();
        log::debug!("Decoded {}x{} texture {:?}", width, height, path);

        Ok(Self {
            width,
            height,
            rgba: img.into_raw(),
        })
    }

    pub fn solid(color: [u8; 4]) -> Self {
        Self::generate(1, 1, |_, _| color)
    }

    pub fn generate(width: u32, height: u32, texel: impl Fn(u32, u32) -> [u8; 4]) -> Self {
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                rgba.extend_from_slice(&texel(x, y));
            }
        }
        Self { width, height, rgba }
    }
}

fn wood_grain(tint: [f32; 3]) -> ImageData {
    ImageData::generate(PROCEDURAL_SIZE, PROCEDURAL_SIZE, |x, y| {
        let (u, v) = (x as f32, y as f32);
        let rings = ((u * 0.35 + (v * 0.15).sin() * 2.5).sin() * 0.5 + 0.5).powf(3.0);
        let shade = 0.75 + 0.25 * (1.0 - rings);
        let channel = |c: f32| (c * shade * 255.0).clamp(0.0, 255.0) as u8;
        [channel(tint[0]), channel(tint[1]), channel(tint[2]), 255]
    })
}

fn floor_tiles() -> ImageData {
    ImageData::generate(PROCEDURAL_SIZE, PROCEDURAL_SIZE, |x, y| {
        let tile = PROCEDURAL_SIZE / 2;
        let grout = x % tile == 0 || y % tile == 0;
        let checker = ((x / tile) + (y / tile)) % 2 == 0;
        match (grout, checker) {
            (true, _) => [70, 70, 70, 255],
            (false, true) => [190, 185, 175, 255],
            (false, false) => [160, 155, 148, 255],
        }
    })
}

#[derive(Debug, Default)]
pub struct TextureRegistry {
    sets: Vec<TextureSet>,
    flat_normal: Option<TextureId>,
    black: Option<TextureId>,
    roughness: Option<TextureId>,
}

impl TextureRegistry {
    /// Uploads the procedural sets.
    pub fn with_defaults<B: RenderBackend + ?Sized>(backend: &mut B) -> Result<Self> {
        let mut registry = Self::default();
        registry.flat_normal = Some(upload(backend, "flat normal", &ImageData::solid([128, 128, 255, 255]))?);
        registry.black = Some(upload(backend, "black", &ImageData::solid([0, 0, 0, 255]))?);
        registry.roughness = Some(upload(backend, "roughness", &ImageData::solid([160, 160, 160, 255]))?);

        let white = upload(backend, "white", &ImageData::solid([255, 255, 255, 255]))?;
        registry.add_albedo_set("White", white);

        for (name, tint) in [
            (WOOD, [0.76, 0.6, 0.42]),
            ("Walnut", [0.45, 0.3, 0.2]),
            ("Birch", [0.9, 0.82, 0.68]),
        ] {
            let albedo = upload(backend, name, &wood_grain(tint))?;
            registry.add_albedo_set(name, albedo);
        }

        let floor = upload(backend, FLOOR, &floor_tiles())?;
        registry.add_albedo_set(FLOOR, floor);

        log::info!("Created {} procedural texture sets", registry.sets.len());
        Ok(registry)
    }

    /// Adds every PNG/JPEG file in `dir` as an albedo set named after the file.
    ///
    /// An unreadable directory or a file that fails to decode is an error, so
    /// the editor never starts without textures it was asked to load.
    /// Returns how many sets were added.
    pub fn load_directory<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, dir: &Path) -> Result<usize> {
        let dir_error = |source: std::io::Error| EditorError::TextureDir {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(dir_error)? {
            let path = entry.map_err(dir_error)?.path();
            if is_supported_image(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            self.load_file(backend, path)?;
        }

        log::info!("Loaded {} textures from {:?}", paths.len(), dir);
        Ok(paths.len())
    }

    pub fn load_file<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, path: &Path) -> Result<usize> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let image = ImageData::from_file(path)?;
        let albedo = upload(backend, &name, &image)?;
        Ok(self.add_albedo_set(&name, albedo))
    }

    fn add_albedo_set(&mut self, name: &str, albedo: TextureId) -> usize {
        let textures = MaterialTextures {
            albedo: Some(albedo),
            normal: self.flat_normal,
            metallic: self.black,
            roughness: self.roughness,
            height: None,
            ambient_occlusion: None,
        };
        self.sets.push(TextureSet {
            name: name.to_owned(),
            textures,
        });
        self.sets.len() - 1
    }

    pub fn sets(&self) -> &[TextureSet] {
        &self.sets
    }

    pub fn get(&self, name: &str) -> Option<MaterialTextures> {
        self.sets.iter().find(|s| s.name == name).map(|s| s.textures)
    }

    /// Named set, or the first one when the name is unknown.
    pub fn get_or_default(&self, name: &str) -> MaterialTextures {
        self.get(name)
            .or_else(|| self.sets.first().map(|s| s.textures))
            .unwrap_or_default()
    }

    /// Position of the set whose albedo matches, for the texture combo.
    pub fn index_of(&self, textures: &MaterialTextures) -> Option<usize> {
        self.sets.iter().position(|s| s.textures.albedo == textures.albedo)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

fn upload<B: RenderBackend + ?Sized>(backend: &mut B, label: &str, image: &ImageData) -> Result<TextureId> {
    backend.create_texture(label, image.width, image.height, &image.rgba)
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessBackend;

    #[test]
    fn test_defaults_are_complete() {
        let mut backend = HeadlessBackend::new(4, 4);
        let registry = TextureRegistry::with_defaults(&mut backend).unwrap();

        assert!(registry.len() >= 5);
        assert!(registry.sets().iter().all(|s| s.textures.is_complete()));
        assert!(registry.get(WOOD).is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.get_or_default("missing"), registry.sets()[0].textures);

        let floor = registry.get(FLOOR).unwrap();
        assert_eq!(registry.index_of(&floor), registry.sets().iter().position(|s| s.name == FLOOR));
    }

    #[test]
    fn test_generated_image_layout() {
        let image = ImageData::generate(3, 2, |x, y| [x as u8, y as u8, 0, 255]);
        assert_eq!(image.rgba.len(), 24);
        assert_eq!(&image.rgba[4 * 4..4 * 4 + 4], &[1, 1, 0, 255]);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let mut backend = HeadlessBackend::new(4, 4);
        let mut registry = TextureRegistry::with_defaults(&mut backend).unwrap();
        let before = registry.len();
        let result = registry.load_directory(&mut backend, Path::new("/nonexistent/texture/dir"));
        assert!(matches!(result, Err(EditorError::TextureDir { .. })));
        assert_eq!(registry.len(), before);
    }

    #[test]
    fn test_directory_loads_png_and_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 100, 50, 255]))
            .save(dir.path().join("cherry.png"))
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"not an image").unwrap();

        let mut backend = HeadlessBackend::new(4, 4);
        let mut registry = TextureRegistry::with_defaults(&mut backend).unwrap();
        let before = registry.len();
        assert_eq!(registry.load_directory(&mut backend, dir.path()).unwrap(), 1);
        assert_eq!(registry.len(), before + 1);
        assert!(registry.get("cherry").is_some_and(|t| t.is_complete()));
    }

    #[test]
    fn test_undecodable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"definitely not a png").unwrap();

        let mut backend = HeadlessBackend::new(4, 4);
        let mut registry = TextureRegistry::with_defaults(&mut backend).unwrap();
        let result = registry.load_directory(&mut backend, dir.path());
        assert!(matches!(result, Err(EditorError::TextureDecode { .. })));
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_image(Path::new("wood.JPG")));
        assert!(is_supported_image(Path::new("a/b/floor.png")));
        assert!(!is_supported_image(Path::new("notes.txt")));
        assert!(!is_supported_image(Path::new("noext")));
    }
}
