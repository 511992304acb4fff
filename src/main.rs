use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use vrudhacare::app;
use vrudhacare::config::AppConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let state = match app::build_state(&config).await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to start: {}", e);
            std::process::exit(1);
        }
    };

    let address = config.server_address();
    log::info!("Server running on {}", address);

    let max_body_size = config.server.max_body_size;
    let cors_config = config.cors.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(app::cors(&cors_config))
            .wrap(Logger::default())
            .configure(app::mount(state.clone(), max_body_size))
    })
    .bind(address)?
    .run()
    .await
}
