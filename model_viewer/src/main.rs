// This prevents the console window from appearing on Windows in release mode.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use model_viewer::Config;

fn main() {
    let config = Config::new()
        .with_title("N64 Model Viewer")
        .with_rom_path("n64.dfs");
    model_viewer::run(&config);
}
