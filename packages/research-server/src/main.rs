use tracing::{error, Level};

mod configuration;
mod controller;
mod error;
mod llm;
mod model;
mod server;

use configuration::{get_configuration, AppState, State};
use error::Error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level(Level::INFO)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = get_configuration()?;
    let state = State::new(config)?;
    let app_state = AppState::new(state);

    server::server_task(&app_state).await
}
