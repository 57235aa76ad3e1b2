//! Main application entry point (native).

#[cfg(feature = "native")]
fn main() {
    env_logger::init();

    let config = match psicotrain_app::AppConfig::from_args_or_env(std::env::args().nth(1)) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    log::info!("Starting {}", config.title);

    if let Err(e) = pollster::block_on(psicotrain_app::App::run(config)) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "native"))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}
