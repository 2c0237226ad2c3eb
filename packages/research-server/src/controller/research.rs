use actix_web::{post, web, Responder};
use chrono::Duration;
use microcap_core::market::MarketData;
use tracing::{info, warn};

use crate::{
    configuration::{AppState, State},
    error::Error,
    llm::StockContext,
    model::{ResearchRequest, ResearchResult},
};

#[post("/research")]
async fn index(
    state: web::Data<AppState<State>>,
    data: web::Json<ResearchRequest>,
) -> Result<impl Responder, Error> {
    let ticker = data.ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(Error::BadRequest("Ticker is required".to_string()));
    }

    let quote = match state.market.latest(&ticker).await {
        Ok(Some(quote)) => quote,
        Ok(None) => {
            return Err(Error::BadRequest(format!(
                "Unable to fetch data for {}",
                ticker
            )))
        }
        Err(e) => {
            warn!("quote lookup for {} failed: {}", ticker, e);
            return Err(Error::BadRequest(format!(
                "Unable to fetch data for {}",
                ticker
            )));
        }
    };

    // The 52-week range is context only; a failed fetch degrades to N/A
    let year_ago = quote.date - Duration::days(365);
    let past_year = match state.market.history(&ticker, year_ago, quote.date).await {
        Ok(quotes) => quotes,
        Err(e) => {
            warn!("history lookup for {} failed: {}", ticker, e);
            Vec::new()
        }
    };
    let year_high = past_year
        .iter()
        .map(|q| q.high.unwrap_or(q.close))
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
    let year_low = past_year
        .iter()
        .map(|q| q.low.unwrap_or(q.close))
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))));

    let context = StockContext {
        ticker: ticker.clone(),
        current_price: quote.close,
        year_high,
        year_low,
        volume: quote.volume,
    };

    info!("running {} research for {}", data.analysis_type, ticker);
    let analysis = state
        .llm
        .research(&context, &data.analysis_type, &data.timeframe)
        .await;

    let result = ResearchResult::from_analysis(&data, &ticker, analysis);
    state
        .history
        .lock()
        .map_err(|_| Error::ServerError("history lock poisoned".to_string()))?
        .push(result.clone());

    Ok(web::Json(result))
}
