use std::{
    env,
    ops::Deref,
    sync::{Arc, Mutex},
};

use microcap_core::market::YahooFinance;
use tracing::warn;

use crate::{error::Error, llm::LlmClient, model::ResearchResult};

/// Shared, reference-counted application state.
#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub api_key: String,
    pub model: String,
    pub completions_url: String,
}

/// Read the server configuration from the environment.
pub fn get_configuration() -> Result<Config, Error> {
    let server_host =
        env::var("RESEARCH_SERVER_HOST").unwrap_or_else(|_| String::from("0.0.0.0"));
    let port = match env::var("RESEARCH_SERVER_PORT") {
        Ok(port) => port
            .parse()
            .map_err(|_| Error::Configuration(format!("invalid port: {}", port)))?,
        Err(_) => 8000,
    };
    let allowed_origins = env::var("RESEARCH_ALLOWED_ORIGINS")
        .unwrap_or_else(|_| String::from("*"))
        .split(',')
        .map(|origin| origin.trim().to_owned())
        .collect();

    let api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        warn!("OPENAI_API_KEY is not set; research requests will return placeholder analyses");
    }
    let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| String::from("gpt-4"));
    let completions_url = env::var("OPENAI_COMPLETIONS_URL")
        .unwrap_or_else(|_| String::from("https://api.openai.com/v1/chat/completions"));

    Ok(Config {
        server_host,
        port,
        allowed_origins,
        api_key,
        model,
        completions_url,
    })
}

#[derive(Debug)]
pub struct State {
    pub config: Config,
    pub market: YahooFinance,
    pub llm: LlmClient,
    /// Past research results, newest last
    pub history: Mutex<Vec<ResearchResult>>,
}

impl State {
    pub fn new(config: Config) -> Result<State, Error> {
        let market = YahooFinance::new()?;
        let llm = LlmClient::new(&config)?;
        Ok(Self {
            config,
            market,
            llm,
            history: Mutex::new(Vec::new()),
        })
    }
}
