use eframe::egui;
use rusty_lens::app::RustyLensApp;
use rusty_lens::config::Settings;

fn main() -> eframe::Result {
    env_logger::init();

    let settings = Settings::load().unwrap_or_else(|e| {
        log::error!("Ignoring settings file: {e:#}");
        Settings::default()
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty Lens – Activation Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(RustyLensApp::new(settings)))),
    )
}
