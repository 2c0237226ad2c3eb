use actix_web::{get, web, Responder};

use crate::{
    configuration::{AppState, State},
    error::Error,
    model::ResearchResult,
};

#[get("/research/history")]
async fn index(state: web::Data<AppState<State>>) -> Result<impl Responder, Error> {
    let history: Vec<ResearchResult> = state
        .history
        .lock()
        .map_err(|_| Error::ServerError("history lock poisoned".to_string()))?
        .clone();

    Ok(web::Json(history))
}
