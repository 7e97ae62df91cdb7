//! ImGui integration
//!
//! Owns the imgui context, its winit platform glue and its wgpu renderer.
//! The app feeds it every window event, builds the GUI once per frame with
//! [`UiManager::update_logic`] and draws it over the scene with
//! [`UiManager::render_display_only`].

use imgui::{Context, FontConfig, FontSource, MouseCursor, Style, StyleColor};
use imgui_wgpu::{Renderer, RendererConfig};
use imgui_winit_support::{HiDpiMode, WinitPlatform};
use std::time::Instant;
use wgpu::{CommandEncoder, Device, Queue, TextureFormat, TextureView};
use winit::{
    event::{Event, WindowEvent},
    window::{Window, WindowId},
};

const FONT_SIZE: f32 = 18.0;

pub struct UiManager {
    context: Context,
    platform: WinitPlatform,
    renderer: Renderer,
    last_frame: Instant,
    /// Cursor shape pushed to the window last, so it is only set on change.
    shown_cursor: Option<MouseCursor>,
}

impl UiManager {
    pub fn new(device: &Device, queue: &Queue, output_color_format: TextureFormat, window: &Window) -> Self {
        let mut context = Context::create();
        context.set_ini_filename(None);
        apply_editor_style(context.style_mut());

        // Locked DPI: one imgui pixel is one physical pixel, matching the picking target.
        let mut platform = WinitPlatform::new(&mut context);
        platform.attach_window(context.io_mut(), window, HiDpiMode::Locked(1.0));

        context.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                size_pixels: FONT_SIZE,
                pixel_snap_h: true,
                ..FontConfig::default()
            }),
        }]);

        let renderer = Renderer::new(
            &mut context,
            device,
            queue,
            RendererConfig {
                texture_format: output_color_format,
                ..RendererConfig::default()
            },
        );
        log::debug!("GUI renderer targets {:?}", output_color_format);

        Self {
            context,
            platform,
            renderer,
            last_frame: Instant::now(),
            shown_cursor: None,
        }
    }

    /// Forwards a window event to imgui.
    pub fn handle_event(&mut self, window: &Window, window_id: WindowId, event: &WindowEvent) {
        let event: Event<()> = Event::WindowEvent {
            window_id,
            event: event.clone(),
        };
        self.platform
            .handle_event(self.context.io_mut(), window, &event);
    }

    /// True while the cursor is over a GUI window or a widget is being dragged.
    pub fn wants_mouse(&self) -> bool {
        self.context.io().want_capture_mouse
    }

    /// True while a text field has focus.
    pub fn wants_keyboard(&self) -> bool {
        self.context.io().want_capture_keyboard
    }

    /// Starts an imgui frame, runs `run_ui` to build it and updates the cursor.
    pub fn update_logic<F>(&mut self, window: &Window, run_ui: F)
    where
        F: FnOnce(&imgui::Ui),
    {
        let now = Instant::now();
        self.context
            .io_mut()
            .update_delta_time(now - self.last_frame);
        self.last_frame = now;

        if let Err(e) = self.platform.prepare_frame(self.context.io_mut(), window) {
            log::warn!("Failed to prepare the GUI frame: {}", e);
            return;
        }

        let ui = self.context.frame();
        run_ui(ui);

        let cursor = ui.mouse_cursor();
        if self.shown_cursor != cursor {
            self.shown_cursor = cursor;
            self.platform.prepare_render(ui, window);
        }
    }

    /// Draws the GUI built by the last [`UiManager::update_logic`] over `color_attachment`.
    pub fn render_display_only(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        color_attachment: &TextureView,
    ) {
        let draw_data = self.context.render();
        if draw_data.display_size[0] <= 0.0 || draw_data.display_size[1] <= 0.0 {
            return;
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("GUI Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_attachment,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Err(e) = self
            .renderer
            .render(draw_data, queue, device, &mut render_pass)
        {
            log::warn!("GUI render failed: {}", e);
        }
    }
}

/// Slightly rounded, translucent panels so the wardrobe stays visible behind them.
fn apply_editor_style(style: &mut Style) {
    style.window_rounding = 4.0;
    style.frame_rounding = 3.0;
    style.grab_rounding = 3.0;
    style.window_border_size = 0.0;
    style[StyleColor::WindowBg][3] = 0.85;
}
