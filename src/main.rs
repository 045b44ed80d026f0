use sqlx::postgres::PgPoolOptions;
use warp::Filter;

use recipeshare_sdk::{handlers, routes};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(8080);

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("failed to connect to database");

    let api = routes::routes(pool).recover(handlers::handle_rejection);

    log::info!("listening on 0.0.0.0:{port}");
    warp::serve(api).run(([0, 0, 0, 0], port)).await;
}
