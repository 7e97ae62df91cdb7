//! # Interaction Controller
//!
//! Turns the frame's input and the decoded pick into selection changes, drag
//! translations, property-edit transactions, deletions and insert requests.
//!
//! ## States
//!
//! ```text
//!            press on draggable            release
//!   Idle ------------------------> Dragging -------> Idle (selection kept)
//!    |  press on selectable           |
//!    +------------------------> Hover |
//!    ^  press on background           |
//!    +--------------------------------+
//! ```
//!
//! The selection is an index into the scene, so it is tied to the scene
//! revision it was taken at. Any structural change in between drops it.

use cgmath::Vector3;

use crate::{
    config::EditorConfig,
    input::FrameInput,
    scene::{ClusterManager, InsertRequest, Scene},
    units::{mm_to_units, units_to_mm, vec3_equal},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Hover,
    Dragging,
}

/// Selection snapshot shown to the GUI and the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PickState {
    pub selected: Option<usize>,
    pub dragging: bool,
    pub cursor_delta: (f64, f64),
}

/// What a processed pick asks the editor to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickAction {
    None,
    Selected(usize),
    Cleared,
    Insert {
        request: InsertRequest,
        anchor: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Committed,
    Unchanged,
    /// The scene was renumbered after the transaction began.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(usize),
    RefusedEdge,
    NothingSelected,
}

/// Staged edit of the selected object's position and size.
///
/// The GUI mutates `position`/`size`; nothing reaches the scene until
/// [`InteractionController::end_move`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveTransaction {
    index: usize,
    revision: u64,
    committed_position: Vector3<f32>,
    committed_size: Option<Vector3<f32>>,
    pub position: Vector3<f32>,
    pub size: Option<Vector3<f32>>,
}

impl MoveTransaction {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn position_mm(&self) -> [f32; 3] {
        [
            units_to_mm(self.position.x),
            units_to_mm(self.position.y),
            units_to_mm(self.position.z),
        ]
    }

    pub fn set_position_mm(&mut self, mm: [f32; 3]) {
        self.position = Vector3::new(mm_to_units(mm[0]), mm_to_units(mm[1]), mm_to_units(mm[2]));
    }

    pub fn size_mm(&self) -> Option<[f32; 3]> {
        self.size
            .map(|s| [units_to_mm(s.x), units_to_mm(s.y), units_to_mm(s.z)])
    }

    pub fn set_size_mm(&mut self, mm: [f32; 3]) {
        if self.size.is_some() {
            self.size = Some(Vector3::new(mm_to_units(mm[0]), mm_to_units(mm[1]), mm_to_units(mm[2])));
        }
    }
}

#[derive(Debug)]
pub struct InteractionController {
    state: InteractionState,
    selected: Option<usize>,
    selection_revision: u64,
    insert_mode: Option<InsertRequest>,
    drag_sensitivity: f32,
    hover_picking: bool,
    last_delta: (f64, f64),
}

impl InteractionController {
    pub fn new(drag_sensitivity: f32, hover_picking: bool) -> Self {
        Self {
            state: InteractionState::Idle,
            selected: None,
            selection_revision: 0,
            insert_mode: None,
            drag_sensitivity,
            hover_picking,
            last_delta: (0.0, 0.0),
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.drag_sensitivity, config.hover_picking)
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn pick_state(&self) -> PickState {
        PickState {
            selected: self.selected,
            dragging: self.state == InteractionState::Dragging,
            cursor_delta: self.last_delta,
        }
    }

    pub fn hover_picking(&self) -> bool {
        self.hover_picking
    }

    pub fn set_hover_picking(&mut self, enabled: bool) {
        self.hover_picking = enabled;
        if !enabled && self.state == InteractionState::Hover && self.selected.is_none() {
            self.state = InteractionState::Idle;
        }
    }

    pub fn insert_mode(&self) -> Option<InsertRequest> {
        self.insert_mode
    }

    /// Arms insert mode; the next click places the element.
    pub fn request_insert(&mut self, request: InsertRequest) {
        self.clear_selection();
        self.insert_mode = Some(request);
    }

    pub fn cancel_insert(&mut self) {
        self.insert_mode = None;
    }

    /// Selects from outside the viewport, e.g. the element list.
    pub fn select(&mut self, index: usize, scene: &Scene) -> bool {
        if !scene.get(index).is_some_and(|o| o.is_selectable()) {
            return false;
        }
        self.selected = Some(index);
        self.selection_revision = scene.revision();
        self.state = InteractionState::Hover;
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.state = InteractionState::Idle;
    }

    /// Selection if it still refers to the object it was taken on.
    pub fn valid_selection(&self, scene: &Scene) -> Option<usize> {
        self.selected
            .filter(|_| self.selection_revision == scene.revision())
            .filter(|&i| scene.is_valid_id(i))
    }

    /// Drops the selection when the scene was renumbered since it was taken.
    pub fn revalidate(&mut self, scene: &Scene) {
        if self.selected.is_some() && self.valid_selection(scene).is_none() {
            log::debug!("Selection {:?} invalidated by scene change", self.selected);
            self.clear_selection();
        }
    }

    /// Whether this frame needs a readback of the picking target.
    pub fn wants_pick(&self, input: &FrameInput) -> bool {
        input.left.pressed || (self.hover_picking && self.state != InteractionState::Dragging)
    }

    /// Stages this frame's drag translation, or ends the drag on release.
    pub fn update_drag(&mut self, input: &FrameInput, dt: f32, scene: &mut Scene) {
        self.last_delta = input.cursor_delta;
        self.revalidate(scene);

        if self.state != InteractionState::Dragging {
            return;
        }
        if !input.left.down {
            self.state = InteractionState::Idle;
            return;
        }

        let Some(object) = self.selected.and_then(|i| scene.get_mut(i)) else {
            self.state = InteractionState::Idle;
            return;
        };

        let (dx, dy) = input.cursor_delta;
        let scale = self.drag_sensitivity * dt;
        object.translate_pending(Vector3::new(dx as f32 * scale, 0.0, dy as f32 * scale));
    }

    /// Applies the pick decoded this frame.
    pub fn handle_pick(&mut self, input: &FrameInput, pick: Option<usize>, scene: &Scene) -> PickAction {
        let pick = pick.filter(|&i| scene.get(i).is_some_and(|o| o.is_selectable()));

        if input.left.pressed {
            if let Some(request) = self.insert_mode.take() {
                return PickAction::Insert {
                    request,
                    anchor: pick,
                };
            }

            return match pick {
                Some(index) => {
                    self.selected = Some(index);
                    self.selection_revision = scene.revision();
                    let draggable = scene.get(index).is_some_and(|o| o.is_draggable());
                    self.state = if draggable && input.left.down {
                        InteractionState::Dragging
                    } else {
                        InteractionState::Hover
                    };
                    PickAction::Selected(index)
                }
                None => {
                    self.clear_selection();
                    PickAction::Cleared
                }
            };
        }

        if self.hover_picking && self.state != InteractionState::Dragging {
            self.state = match pick {
                Some(_) => InteractionState::Hover,
                None => InteractionState::Idle,
            };
        }
        PickAction::None
    }

    /// Snapshots the selected object's committed position and size.
    pub fn begin_move(&self, scene: &Scene) -> Option<MoveTransaction> {
        let index = self.valid_selection(scene)?;
        let object = scene.get(index)?;
        Some(MoveTransaction {
            index,
            revision: scene.revision(),
            committed_position: object.position(),
            committed_size: object.size(),
            position: object.position(),
            size: object.size(),
        })
    }

    /// Commits the staged values if they differ from the snapshot.
    pub fn end_move(&mut self, tx: MoveTransaction, scene: &mut Scene) -> EditOutcome {
        if tx.revision != scene.revision() {
            return EditOutcome::Stale;
        }
        let Some(object) = scene.get_mut(tx.index) else {
            return EditOutcome::Stale;
        };

        let moved = !vec3_equal(tx.position, tx.committed_position);
        let resized = match (tx.size, tx.committed_size) {
            (Some(new), Some(old)) => !vec3_equal(new, old),
            _ => false,
        };
        if !moved && !resized {
            return EditOutcome::Unchanged;
        }

        if moved {
            object.set_position(tx.position);
            object.mark_start();
        }
        if let (true, Some(size)) = (resized, tx.size) {
            if !object.set_size(size) {
                log::warn!("Rejected size {:?} for '{}'", size, object.name);
            }
        }
        EditOutcome::Committed
    }

    /// Deletes the selection together with every part of its cluster tree.
    pub fn delete_selected(&mut self, scene: &mut Scene, clusters: &mut ClusterManager) -> DeleteOutcome {
        let Some(index) = self.valid_selection(scene) else {
            return DeleteOutcome::NothingSelected;
        };
        let Some(object) = scene.get(index) else {
            return DeleteOutcome::NothingSelected;
        };
        if object.is_edge() {
            log::info!("Refusing to delete wardrobe side '{}'", object.name);
            return DeleteOutcome::RefusedEdge;
        }

        let removed = match object.cluster() {
            Some(root) => {
                let doomed = clusters.collect_for_deletion(root);
                let others: Vec<usize> = scene
                    .iter()
                    .enumerate()
                    .filter(|(i, o)| *i != index && o.cluster().is_some_and(|c| doomed.contains(&c)))
                    .map(|(i, _)| i)
                    .collect();
                let removed = scene.remove_many(&others, index);
                clusters.forget(&doomed);
                removed
            }
            None => usize::from(scene.remove_at(index).is_some()),
        };

        log::info!("Deleted {} object(s)", removed);
        self.clear_selection();
        DeleteOutcome::Deleted(removed)
    }
}
