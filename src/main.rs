use env_logger::Env;
use wardrobe_designer::{app::EditorApp, config::EditorConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut config = EditorConfig::default();
    if let Some(dir) = std::env::args().nth(1) {
        log::info!("Loading textures from {}", dir);
        config = config.with_texture_dir(dir);
    }

    if let Err(e) = EditorApp::new(config).run() {
        log::error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}
