//! # Parametric Wardrobe
//!
//! Builds the five carcass boards of a wardrobe from its outer dimensions and
//! inserts shelves and vertical partitions into it.
//!
//! ## Layout
//!
//! The wardrobe occupies `origin + [0, width] x [0, height] x [0, depth]`,
//! with the back panel at the low-z end and the open front at `z = depth`.
//! The left and right sides run the full height; the bottom board sits on a
//! plinth of `base_height`; the back panel fits between bottom and top.
//!
//! ## Insertion
//!
//! A new shelf or partition is placed in the middle of the largest free gap
//! along its axis. Anchoring on an existing element narrows the region: a
//! shelf anchored on a partition fills the space to the partition's right, a
//! partition anchored on a shelf stands on it. The new element's cluster hangs
//! off the anchor's cluster so deleting the anchor removes it too.

use cgmath::Vector3;

use crate::{
    config::WardrobeDimensions,
    geometry::Bounds,
    units::mm_to_units,
};

use super::{
    cluster::ClusterManager,
    object::{MaterialTextures, PartKind, SceneObject, WardrobePart, WardrobeSide},
    scene::Scene,
};

/// Element requested from the "Add element" panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertRequest {
    VerticalPartition,
    HorizontalShelf,
}

impl InsertRequest {
    pub fn label(self) -> &'static str {
        match self {
            InsertRequest::VerticalPartition => "Vertical partition",
            InsertRequest::HorizontalShelf => "Horizontal shelf",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WardrobeGenerator {
    pub origin: Vector3<f32>,
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    pub board_thickness: f32,
    pub base_height: f32,
    pub textures: MaterialTextures,
}

impl WardrobeGenerator {
    /// All lengths in world units.
    pub fn new(
        origin: Vector3<f32>,
        width: f32,
        height: f32,
        depth: f32,
        board_thickness: f32,
        base_height: f32,
        textures: MaterialTextures,
    ) -> Self {
        Self {
            origin,
            width,
            height,
            depth,
            board_thickness,
            base_height,
            textures,
        }
    }

    /// Builds a generator from dimensions entered in millimetres.
    pub fn from_mm(
        origin: Vector3<f32>,
        dimensions: &WardrobeDimensions,
        textures: MaterialTextures,
    ) -> Self {
        Self::new(
            origin,
            mm_to_units(dimensions.width),
            mm_to_units(dimensions.height),
            mm_to_units(dimensions.depth),
            mm_to_units(dimensions.board_thickness),
            mm_to_units(dimensions.base_height),
            textures,
        )
    }

    /// Floor slab the wardrobe stands on.
    pub fn floor(textures: MaterialTextures) -> SceneObject {
        SceneObject::new_box_from_corner(
            "Floor",
            Vector3::new(-10.0, -1.0, -10.0),
            Vector3::new(20.0, 1.0, 20.0),
        )
        .with_textures(textures)
        .with_tex_scale(8.0)
    }

    /// Center and full size of a side, in world space.
    pub fn side_geometry(&self, side: WardrobeSide) -> (Vector3<f32>, Vector3<f32>) {
        let (w, h, d) = (self.width, self.height, self.depth);
        let (t, b) = (self.board_thickness, self.base_height);

        let (min, size) = match side {
            WardrobeSide::Left => (Vector3::new(0.0, 0.0, 0.0), Vector3::new(t, h, d)),
            WardrobeSide::Right => (Vector3::new(w - t, 0.0, 0.0), Vector3::new(t, h, d)),
            WardrobeSide::Top => (Vector3::new(t, h - t, 0.0), Vector3::new(w - 2.0 * t, t, d)),
            WardrobeSide::Bottom => (Vector3::new(t, b, 0.0), Vector3::new(w - 2.0 * t, t, d)),
            WardrobeSide::Back => (
                Vector3::new(t, b + t, 0.0),
                Vector3::new(w - 2.0 * t, h - b - 2.0 * t, t),
            ),
        };

        (self.origin + min + size * 0.5, size)
    }

    pub fn build_side(&self, side: WardrobeSide) -> SceneObject {
        let (center, size) = self.side_geometry(side);
        SceneObject::new_wardrobe_part(
            &format!("{} side", side.label()),
            center,
            size,
            WardrobePart {
                kind: PartKind::Edge(side),
                cluster: None,
            },
        )
        .with_textures(self.textures)
    }

    /// Adds the five sides and returns their picking IDs in [`WardrobeSide::ALL`] order.
    pub fn install(&self, scene: &mut Scene) -> Vec<usize> {
        WardrobeSide::ALL
            .iter()
            .map(|side| scene.add_object(self.build_side(*side)))
            .collect()
    }

    /// Space enclosed by the carcass boards.
    pub fn interior(&self) -> Bounds {
        let (t, b) = (self.board_thickness, self.base_height);
        Bounds::new(
            self.origin + Vector3::new(t, b + t, t),
            self.origin + Vector3::new(self.width - t, self.height - t, self.depth),
        )
    }

    pub fn side_enabled(scene: &Scene, side: WardrobeSide) -> Option<bool> {
        scene
            .find_side(side)
            .and_then(|i| scene.get(i))
            .map(|o| o.flags.enabled)
    }

    pub fn set_side_enabled(scene: &mut Scene, side: WardrobeSide, enabled: bool) -> bool {
        match scene.find_side(side).and_then(|i| scene.get_mut(i)) {
            Some(object) => {
                object.flags.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Inserts a shelf or partition and returns its picking ID.
    ///
    /// `anchor` is the index of the clicked object. Returns `None` when the
    /// region has no gap wider than a board.
    pub fn insert(
        &self,
        scene: &mut Scene,
        clusters: &mut ClusterManager,
        request: InsertRequest,
        anchor: Option<usize>,
    ) -> Option<usize> {
        let interior = self.interior();
        let anchor = anchor
            .and_then(|i| scene.get(i))
            .filter(|o| o.flags.enabled)
            .and_then(|o| o.part().map(|p| (*p, o.bounds())));

        let t = self.board_thickness;
        let (region, parent) = match (request, anchor) {
            (InsertRequest::HorizontalShelf, Some((part, bounds)))
                if part.kind == PartKind::VerticalElement =>
            {
                let right = nearest_boundary(scene, PartKind::VerticalElement, Axis::X, &bounds)
                    .unwrap_or(interior.max.x);
                (
                    Bounds::new(
                        Vector3::new(bounds.max.x, bounds.min.y, interior.min.z),
                        Vector3::new(right, bounds.max.y, interior.max.z),
                    ),
                    part.cluster,
                )
            }
            (InsertRequest::VerticalPartition, Some((part, bounds)))
                if part.kind == PartKind::Shelf =>
            {
                let top = nearest_boundary(scene, PartKind::Shelf, Axis::Y, &bounds)
                    .unwrap_or(interior.max.y);
                (
                    Bounds::new(
                        Vector3::new(bounds.min.x, bounds.max.y, interior.min.z),
                        Vector3::new(bounds.max.x, top, interior.max.z),
                    ),
                    part.cluster,
                )
            }
            _ => (interior, None),
        };

        let (kind, axis) = match request {
            InsertRequest::HorizontalShelf => (PartKind::Shelf, Axis::Y),
            InsertRequest::VerticalPartition => (PartKind::VerticalElement, Axis::X),
        };
        let occupied = occupied_spans(scene, kind, axis, &region);
        let position = largest_gap_center(axis.of(region.min), axis.of(region.max), &occupied, t)?;

        let span = region.size();
        let (center, size) = match axis {
            Axis::Y => (
                Vector3::new(region.center().x, position, region.center().z),
                Vector3::new(span.x, t, span.z),
            ),
            Axis::X => (
                Vector3::new(position, region.center().y, region.center().z),
                Vector3::new(t, span.y, span.z),
            ),
        };

        let cluster = clusters.create(parent);
        let object = SceneObject::new_wardrobe_part(
            &format!("{} #{}", request.label(), cluster.0),
            center,
            size,
            WardrobePart {
                kind,
                cluster: Some(cluster),
            },
        )
        .with_textures(self.textures);

        log::info!("Inserted {} (cluster {:?}, parent {:?})", request.label(), cluster, parent);
        Some(scene.add_object(object))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

impl Axis {
    fn of(self, v: Vector3<f32>) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
        }
    }

    fn other(self, v: Vector3<f32>) -> f32 {
        match self {
            Axis::X => v.y,
            Axis::Y => v.x,
        }
    }
}

fn overlaps(a_min: f32, a_max: f32, b_min: f32, b_max: f32) -> bool {
    a_min < b_max && b_min < a_max
}

/// Low face of the closest enabled part of `kind` beyond `bounds` along `axis`.
fn nearest_boundary(scene: &Scene, kind: PartKind, axis: Axis, bounds: &Bounds) -> Option<f32> {
    scene
        .iter()
        .filter(|o| o.flags.enabled && o.part().map(|p| p.kind) == Some(kind))
        .map(|o| o.bounds())
        .filter(|b| axis.of(b.min) >= axis.of(bounds.max) - 1e-4)
        .filter(|b| {
            overlaps(
                axis.other(b.min),
                axis.other(b.max),
                axis.other(bounds.min),
                axis.other(bounds.max),
            )
        })
        .map(|b| axis.of(b.min))
        .min_by(|a, b| a.total_cmp(b))
}

/// Spans along `axis` already taken by parts of `kind` crossing `region`.
fn occupied_spans(scene: &Scene, kind: PartKind, axis: Axis, region: &Bounds) -> Vec<(f32, f32)> {
    scene
        .iter()
        .filter(|o| o.flags.enabled && o.part().map(|p| p.kind) == Some(kind))
        .map(|o| o.bounds())
        .filter(|b| {
            overlaps(
                axis.other(b.min),
                axis.other(b.max),
                axis.other(region.min),
                axis.other(region.max),
            ) && overlaps(axis.of(b.min), axis.of(b.max), axis.of(region.min), axis.of(region.max))
        })
        .map(|b| (axis.of(b.min), axis.of(b.max)))
        .collect()
}

/// Center of the widest free interval in `[lo, hi]`, or `None` if no gap fits a board.
fn largest_gap_center(lo: f32, hi: f32, occupied: &[(f32, f32)], thickness: f32) -> Option<f32> {
    let mut spans: Vec<(f32, f32)> = occupied.to_vec();
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut best: Option<(f32, f32)> = None;
    let mut cursor = lo;
    for (start, end) in spans.iter().copied().chain(std::iter::once((hi, hi))) {
        let gap = start.min(hi) - cursor;
        if gap > best.map_or(0.0, |(a, b)| b - a) {
            best = Some((cursor, start.min(hi)));
        }
        cursor = cursor.max(end);
    }

    best.filter(|(a, b)| b - a > thickness).map(|(a, b)| (a + b) * 0.5)
}
