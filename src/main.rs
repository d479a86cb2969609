use fern::colors::{Color, ColoredLevelConfig};
use std::process;
use warp::Filter;

mod config;
mod routes;

use config::Config;
use db::new_db;
use routes::{handle_rejection, routes};

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = setup_logging(config.log_level) {
        eprintln!("Could not apply logging configuration: {}", e);
        process::exit(1);
    }

    let addr = match config.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            log::error!("{}", e);
            process::exit(1);
        }
    };

    let global_db = match new_db(config.db_file.clone()) {
        Ok(db) => db,
        Err(e) => {
            log::error!("Could not open {}: {}", config.db_file, e);
            process::exit(1);
        }
    };

    let filters = routes(&global_db);

    let cors = warp::cors()
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allow_headers(vec!["content-type", "Authorization"]);

    let cors = match &config.cors_origin {
        Some(origin) => cors.allow_origin(origin.as_str()),
        None => cors.allow_any_origin(),
    };

    let filters = filters
        .with(cors)
        // Before logging for correct status codes
        .recover(handle_rejection)
        .with(warp::log("seminar_api"));

    log::info!("Listening on http://{}", addr);
    warp::serve(filters).run(addr).await;
}

fn setup_logging(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    let colors = ColoredLevelConfig::new().debug(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}{} {}",
                colors.color(record.level()),
                chrono::Local::now().format("[%H:%M:%S]"),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()
}
