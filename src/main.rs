mod actor;
mod app;
mod hsm;
mod kinematic;
mod nav;
mod path;
mod scenario;
mod steering;
mod world;

/// Default run length: one simulated minute.
const DEFAULT_TICKS: u64 = 3600;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let scenario_name = args.next().unwrap_or_else(|| "roles".to_string());
    let ticks = match args.next() {
        Some(raw) => match raw.parse::<u64>() {
            Ok(ticks) => ticks,
            Err(_) => {
                log::error!("tick count must be a number, got '{raw}'");
                std::process::exit(1);
            }
        },
        None => DEFAULT_TICKS,
    };

    let cache_dir = std::env::temp_dir().join("beegrove-navcache");
    log::info!("beegrove starting scenario '{scenario_name}' for {ticks} ticks");

    match app::App::new(&scenario_name, &cache_dir, fastrand::u64(..)) {
        Ok(mut app) => app.run(ticks),
        Err(e) => {
            log::error!("could not start scenario: {e}");
            std::process::exit(1);
        }
    }
}
