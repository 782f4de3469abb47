//! Entry point: logging, CLI flags, exit code.

mod config;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match std::env::current_dir() {
        Ok(dir) => log::info!("Current working directory is: {}", dir.display()),
        Err(err) => log::warn!("Error getting current working directory: {err}"),
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = config::from_args(&args);
    log::info!(
        "Starting courseview. Backend: {:?}, show_fps={}, window_size={}x{}, assets={}",
        config.backends,
        config.show_fps,
        config.width,
        config.height,
        config.assets_dir.display()
    );

    if let Err(err) = platform::run_with_renderer(config) {
        log::error!("Initialization failed: {err:#}");
        std::process::exit(-1);
    }

    log::info!("Graceful shutdown. Bye!");
}
