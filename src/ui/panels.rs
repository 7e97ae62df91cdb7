//! Editor panels
//!
//! Everything the GUI draws each frame: the main menu bar, the settings
//! window with the object panel, the element windows, the new-project modal
//! and the debug overlay. Edits go through the [`Editor`] API so the scene is
//! only ever changed through controller transactions.

use imgui::{Condition, TreeNodeFlags, Ui, WindowFlags};

use crate::{
    config::WardrobeDimensions,
    editor::Editor,
    interaction::{DeleteOutcome, EditOutcome},
    scene::{InsertRequest, WardrobeSide},
};

const NEW_PROJECT_POPUP: &str = "New project";
const ABOUT_POPUP: &str = "About";

/// View toggles owned by the app and applied to the render engine after the GUI ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSettings {
    pub vsync: bool,
    pub wireframe: bool,
    pub wireframe_supported: bool,
    pub show_debug: bool,
}

/// Per-frame figures shown by the debug overlay.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub fps: f32,
    pub resolution: (u32, u32),
    pub adapter: String,
}

/// Edit buffer behind the new-project modal.
#[derive(Debug, Clone, Copy)]
pub struct NewProjectForm {
    pub dimensions: WardrobeDimensions,
    rejected: bool,
}

impl NewProjectForm {
    pub fn new(dimensions: WardrobeDimensions) -> Self {
        Self {
            dimensions,
            rejected: false,
        }
    }

    /// Builds a new project from the form. Unbuildable dimensions keep the form open.
    pub fn submit(&mut self, editor: &mut Editor) -> bool {
        self.rejected = !editor.new_project(self.dimensions);
        !self.rejected
    }

    pub fn rejected(&self) -> bool {
        self.rejected
    }
}

/// GUI state that lives across frames.
pub struct EditorUi {
    form: NewProjectForm,
    open_new_project: bool,
    open_about: bool,
    quit_requested: bool,
}

impl EditorUi {
    pub fn new(dimensions: WardrobeDimensions) -> Self {
        Self {
            form: NewProjectForm::new(dimensions),
            open_new_project: false,
            open_about: false,
            quit_requested: false,
        }
    }

    /// True once after Project > Quit was chosen.
    pub fn take_quit_request(&mut self) -> bool {
        std::mem::take(&mut self.quit_requested)
    }

    pub fn draw(&mut self, ui: &Ui, editor: &mut Editor, view: &mut ViewSettings, stats: &FrameStats) {
        self.main_menu(ui, editor, view);

        // Popups are opened outside the menu so their IDs match the top-level stack.
        if std::mem::take(&mut self.open_new_project) {
            self.form = NewProjectForm::new(editor.dimensions());
            ui.open_popup(NEW_PROJECT_POPUP);
        }
        if std::mem::take(&mut self.open_about) {
            ui.open_popup(ABOUT_POPUP);
        }
        self.new_project_modal(ui, editor);
        about_popup(ui);

        settings_window(ui, editor);
        add_element_window(ui, editor);
        elements_window(ui, editor);

        if view.show_debug {
            debug_overlay(ui, editor, stats);
        }
    }

    fn main_menu(&mut self, ui: &Ui, editor: &mut Editor, view: &mut ViewSettings) {
        ui.main_menu_bar(|| {
            ui.menu("Project", || {
                if ui.menu_item("New project...") {
                    self.open_new_project = true;
                }
                ui.separator();
                if ui.menu_item("Quit") {
                    self.quit_requested = true;
                }
            });

            ui.menu("View", || {
                if ui
                    .menu_item_config("Vsync")
                    .shortcut("V")
                    .selected(view.vsync)
                    .build()
                {
                    view.vsync = !view.vsync;
                }
                if ui
                    .menu_item_config("Wireframe")
                    .shortcut("P")
                    .selected(view.wireframe)
                    .enabled(view.wireframe_supported)
                    .build()
                {
                    view.wireframe = !view.wireframe;
                }
                if ui
                    .menu_item_config("Debug info")
                    .shortcut("F3")
                    .selected(view.show_debug)
                    .build()
                {
                    view.show_debug = !view.show_debug;
                }
                ui.separator();
                let paused = editor.frame_context().light_paused;
                if ui
                    .menu_item_config("Pause light")
                    .shortcut("L")
                    .selected(paused)
                    .build()
                {
                    editor.frame_context_mut().light_paused = !paused;
                }
                let hover = editor.controller().hover_picking();
                if ui.menu_item_config("Hover highlight").selected(hover).build() {
                    editor.set_hover_picking(!hover);
                }
            });

            ui.menu("Help", || {
                if ui.menu_item("About") {
                    self.open_about = true;
                }
            });
        });
    }

    fn new_project_modal(&mut self, ui: &Ui, editor: &mut Editor) {
        let form = &mut self.form;
        ui.modal_popup_config(NEW_PROJECT_POPUP)
            .always_auto_resize(true)
            .build(|| {
                let d = &mut form.dimensions;
                ui.input_float("Width (mm)", &mut d.width).step(10.0).build();
                ui.input_float("Height (mm)", &mut d.height).step(10.0).build();
                ui.input_float("Depth (mm)", &mut d.depth).step(10.0).build();
                ui.input_float("Board thickness (mm)", &mut d.board_thickness)
                    .step(1.0)
                    .build();
                ui.input_float("Base height (mm)", &mut d.base_height)
                    .step(1.0)
                    .build();

                if form.rejected() {
                    ui.text_colored([1.0, 0.4, 0.3, 1.0], "These dimensions leave no room inside.");
                }

                ui.separator();
                if ui.button("Create") && form.submit(editor) {
                    ui.close_current_popup();
                }
                ui.same_line();
                if ui.button("Cancel") {
                    ui.close_current_popup();
                }
            });
    }
}

fn about_popup(ui: &Ui) {
    ui.popup(ABOUT_POPUP, || {
        ui.text(format!("Wardrobe Designer {}", env!("CARGO_PKG_VERSION")));
        ui.separator();
        ui.text("Left click: select, drag to move");
        ui.text("Right drag: orbit, Shift or middle drag: pan");
        ui.text("Wheel: zoom, Shift+C: reset camera");
        ui.text("Delete: remove selection, Esc: cancel");
    });
}

fn settings_window(ui: &Ui, editor: &mut Editor) {
    ui.window("Settings")
        .size([340.0, 440.0], Condition::FirstUseEver)
        .position([10.0, 30.0], Condition::FirstUseEver)
        .build(|| {
            if ui.collapsing_header("Sides", TreeNodeFlags::DEFAULT_OPEN) {
                for side in WardrobeSide::ALL {
                    if let Some(mut enabled) = editor.side_enabled(side) {
                        if ui.checkbox(side.label(), &mut enabled) {
                            editor.set_side_enabled(side, enabled);
                        }
                    }
                }
            }

            if ui.collapsing_header("Object", TreeNodeFlags::DEFAULT_OPEN) {
                object_panel(ui, editor);
            }
        });
}

fn object_panel(ui: &Ui, editor: &mut Editor) {
    let Some(mut tx) = editor.begin_move() else {
        ui.text_disabled("Nothing selected");
        return;
    };
    let Some((name, is_edge)) = editor
        .scene()
        .get(tx.index())
        .map(|o| (o.name.clone(), o.is_edge()))
    else {
        return;
    };
    ui.text(&name);

    let mut changed = false;
    let mut position = tx.position_mm();
    if ui.input_float3("Position (mm)", &mut position).build() {
        tx.set_position_mm(position);
        changed = true;
    }
    if let Some(mut size) = tx.size_mm() {
        if ui.input_float3("Size (mm)", &mut size).build() {
            tx.set_size_mm(size.map(|v| v.max(1.0)));
            changed = true;
        }
    }
    if changed && editor.end_move(tx) == EditOutcome::Stale {
        log::debug!("Discarded edit of '{}': selection changed", name);
    }

    let names: Vec<String> = editor
        .textures()
        .sets()
        .iter()
        .map(|set| set.name.clone())
        .collect();
    if !names.is_empty() {
        let mut current = editor.selected_texture_set().unwrap_or(0);
        if ui.combo_simple_string("Texture", &mut current, &names) {
            editor.apply_texture_set(current);
        }
    }

    ui.separator();
    let _disabled = ui.begin_disabled(is_edge);
    if ui.button("Delete") {
        if let DeleteOutcome::Deleted(n) = editor.delete_selected() {
            log::info!("Deleted '{}' ({} object(s))", name, n);
        }
    }
}

fn add_element_window(ui: &Ui, editor: &mut Editor) {
    ui.window("Add element")
        .size([240.0, 150.0], Condition::FirstUseEver)
        .position([10.0, 480.0], Condition::FirstUseEver)
        .build(|| {
            for request in [InsertRequest::VerticalPartition, InsertRequest::HorizontalShelf] {
                if ui.button(request.label()) {
                    editor.request_insert(request);
                }
            }
            match editor.controller().insert_mode() {
                Some(request) => {
                    ui.text_colored([1.0, 0.6, 0.1, 1.0], format!("Placing: {}", request.label()));
                    ui.text_disabled("Click inside the wardrobe, Esc cancels");
                }
                None => ui.text(format!("Shelves: {}", editor.shelf_count())),
            }
        });
}

fn elements_window(ui: &Ui, editor: &mut Editor) {
    let elements: Vec<(usize, String)> = editor
        .wardrobe_elements()
        .into_iter()
        .map(|(i, name)| (i, name.to_string()))
        .collect();
    let selected = editor.selected();

    ui.window("Wardrobe elements")
        .size([240.0, 300.0], Condition::FirstUseEver)
        .position([360.0, 30.0], Condition::FirstUseEver)
        .build(|| {
            for (index, name) in &elements {
                let label = format!("{}##{}", name, index);
                if ui
                    .selectable_config(&label)
                    .selected(selected == Some(*index))
                    .build()
                {
                    editor.select(*index);
                }
            }
        });
}

fn debug_overlay(ui: &Ui, editor: &Editor, stats: &FrameStats) {
    let [width, _] = ui.io().display_size;
    let statistics = editor.statistics();

    ui.window("Debug")
        .position([width - 10.0, 30.0], Condition::Always)
        .position_pivot([1.0, 0.0])
        .bg_alpha(0.4)
        .flags(
            WindowFlags::NO_DECORATION
                | WindowFlags::ALWAYS_AUTO_RESIZE
                | WindowFlags::NO_SAVED_SETTINGS
                | WindowFlags::NO_FOCUS_ON_APPEARING
                | WindowFlags::NO_NAV
                | WindowFlags::NO_INPUTS,
        )
        .build(|| {
            ui.text(format!("FPS: {:.0}", stats.fps));
            ui.text(format!(
                "Objects: {} ({} enabled, {} parts)",
                statistics.object_count, statistics.enabled_count, statistics.wardrobe_parts
            ));
            let selection = editor
                .selected()
                .and_then(|i| editor.scene().get(i).map(|o| format!("{} [{}]", o.name, i)))
                .unwrap_or_else(|| "none".to_string());
            ui.text(format!("Selection: {}", selection));
            ui.text(format!("Resolution: {}x{}", stats.resolution.0, stats.resolution.1));
            ui.text(format!("Adapter: {}", stats.adapter));
            ui.text(format!("Frame: {}", editor.frame_count()));
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::EditorConfig, render::HeadlessBackend};

    fn editor() -> (Editor, HeadlessBackend) {
        let mut backend = HeadlessBackend::new(64, 64);
        let config = EditorConfig::default().with_demo_scene(false);
        let editor = Editor::new(config, &mut backend).unwrap();
        (editor, backend)
    }

    #[test]
    fn test_new_project_form_rejects_unbuildable() {
        let (mut editor, _backend) = editor();
        let before = editor.dimensions();

        let mut form = NewProjectForm::new(WardrobeDimensions {
            width: 10.0,
            ..WardrobeDimensions::default()
        });
        assert!(!form.submit(&mut editor));
        assert!(form.rejected());
        assert_eq!(editor.dimensions(), before);
    }

    #[test]
    fn test_new_project_form_builds_project() {
        let (mut editor, _backend) = editor();
        let dims = WardrobeDimensions {
            width: 900.0,
            ..WardrobeDimensions::default()
        };

        let mut form = NewProjectForm::new(dims);
        assert!(form.submit(&mut editor));
        assert!(!form.rejected());
        assert_eq!(editor.dimensions(), dims);
    }

    #[test]
    fn test_quit_request_is_taken_once() {
        let mut ui = EditorUi::new(WardrobeDimensions::default());
        assert!(!ui.take_quit_request());
        ui.quit_requested = true;
        assert!(ui.take_quit_request());
        assert!(!ui.take_quit_request());
    }
}
