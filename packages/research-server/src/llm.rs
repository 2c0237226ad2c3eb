//! LLM completion client and response parsing.
//!
//! Completions are requested as JSON but arrive as free text: models wrap
//! the object in markdown fences or surrounding prose, or drop fields. The
//! parser strips all of that and anything still unusable is replaced by a
//! clearly-marked placeholder analysis - a research request never fails on a
//! malformed completion.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::configuration::Config;
use crate::error::Error;

const REQUEST_TIMEOUT_SECS: u64 = 60;
const MAX_TOKENS: u32 = 2000;

/// Market context assembled for the analyst prompt.
#[derive(Debug, Clone)]
pub struct StockContext {
    pub ticker: String,
    pub current_price: f64,
    pub year_high: Option<f64>,
    pub year_low: Option<f64>,
    pub volume: Option<i64>,
}

/// The analysis object the model is asked to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub recommendation: String,
    pub confidence: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    pub analysis: String,
    pub key_points: Vec<String>,
    pub risks: Vec<String>,
    pub catalysts: Vec<String>,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat-completions client for the research endpoint.
#[derive(Debug)]
pub struct LlmClient {
    client: reqwest::Client,
    model: String,
    url: String,
}

impl LlmClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|_| Error::Configuration("invalid API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            model: config.model.clone(),
            url: config.completions_url.clone(),
        })
    }

    /// Produce an analysis for the given stock. Never fails: an API error or
    /// unusable completion degrades to a placeholder.
    pub async fn research(
        &self,
        context: &StockContext,
        analysis_type: &str,
        timeframe: &str,
    ) -> Analysis {
        let prompt = build_research_prompt(context, analysis_type, timeframe);

        match self.complete(&prompt).await {
            Ok(text) => parse_completion(&text).unwrap_or_else(|| {
                warn!("completion for {} was not parseable as JSON", context.ticker);
                fallback_from_text(context, &text)
            }),
            Err(e) => {
                warn!("completion request for {} failed: {}", context.ticker, e);
                placeholder(
                    context,
                    &format!("Unable to generate detailed analysis due to API error: {}", e),
                )
            }
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, Error> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            temperature: 0.7,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a professional micro-cap stock analyst. Provide detailed, \
                              actionable investment analysis."
                        .to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
        };

        let response = self.client.post(&self.url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!("HTTP {}: {}", status, body)));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Upstream("completion had no content".to_string()))
    }
}

/// Build the analyst prompt for one stock.
pub fn build_research_prompt(context: &StockContext, analysis_type: &str, timeframe: &str) -> String {
    let fmt_opt = |value: Option<f64>| {
        value
            .map(|v| format!("${:.2}", v))
            .unwrap_or_else(|| String::from("N/A"))
    };
    let volume = context
        .volume
        .map(|v| v.to_string())
        .unwrap_or_else(|| String::from("N/A"));

    format!(
        "You are a professional stock analyst specializing in micro-cap stocks. \
         Analyze {ticker} based on the following data:\n\
         \n\
         Stock Data:\n\
         - Current Price: ${price:.2}\n\
         - 52-Week High: {high}\n\
         - 52-Week Low: {low}\n\
         - Volume: {volume}\n\
         \n\
         Analysis Type: {analysis_type}\n\
         Investment Timeframe: {timeframe}\n\
         \n\
         Please provide a comprehensive analysis including:\n\
         1. Overall assessment and recommendation (BUY/HOLD/SELL)\n\
         2. Confidence level (0-100%)\n\
         3. Key strengths (5 bullet points)\n\
         4. Risk factors (5 bullet points)\n\
         5. Potential catalysts (5 bullet points)\n\
         6. Target price estimate\n\
         7. Stop-loss recommendation\n\
         8. Detailed analysis (2-3 paragraphs)\n\
         \n\
         Focus on micro-cap specific factors like liquidity, volatility, growth \
         potential, and execution risk.\n\
         \n\
         Format your response as JSON with the following structure:\n\
         {{\n\
             \"recommendation\": \"BUY/HOLD/SELL\",\n\
             \"confidence\": 85,\n\
             \"target_price\": 25.50,\n\
             \"stop_loss\": 18.00,\n\
             \"analysis\": \"Detailed analysis text...\",\n\
             \"key_points\": [\"Point 1\", \"Point 2\", ...],\n\
             \"risks\": [\"Risk 1\", \"Risk 2\", ...],\n\
             \"catalysts\": [\"Catalyst 1\", \"Catalyst 2\", ...]\n\
         }}",
        ticker = context.ticker,
        price = context.current_price,
        high = fmt_opt(context.year_high),
        low = fmt_opt(context.year_low),
        volume = volume,
        analysis_type = analysis_type,
        timeframe = timeframe,
    )
}

/// Parse a completion into an [`Analysis`].
///
/// Strips markdown code fences, then takes the outermost `{...}` so prose
/// around the object is ignored. `None` when no valid object with all
/// required fields can be found.
pub fn parse_completion(raw: &str) -> Option<Analysis> {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end < start {
        return None;
    }

    serde_json::from_str(&cleaned[start..=end]).ok()
}

/// The completion arrived but was not valid JSON: keep the raw text as the
/// analysis body.
fn fallback_from_text(context: &StockContext, raw: &str) -> Analysis {
    Analysis {
        recommendation: "HOLD".to_string(),
        confidence: 70.0,
        target_price: context.current_price * 1.2,
        stop_loss: context.current_price * 0.85,
        analysis: raw.to_string(),
        key_points: vec![
            "Analysis generated".to_string(),
            "Review recommended".to_string(),
            "Data limitations noted".to_string(),
        ],
        risks: vec![
            "Market volatility".to_string(),
            "Liquidity concerns".to_string(),
            "Execution risk".to_string(),
        ],
        catalysts: vec![
            "Market conditions".to_string(),
            "Company execution".to_string(),
            "Industry trends".to_string(),
        ],
    }
}

/// No completion at all: a clearly-marked placeholder.
fn placeholder(context: &StockContext, note: &str) -> Analysis {
    Analysis {
        recommendation: "HOLD".to_string(),
        confidence: 50.0,
        target_price: context.current_price,
        stop_loss: context.current_price * 0.9,
        analysis: note.to_string(),
        key_points: vec!["Manual research recommended".to_string()],
        risks: vec![
            "API limitations".to_string(),
            "Data unavailable".to_string(),
        ],
        catalysts: vec!["Further research needed".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> StockContext {
        StockContext {
            ticker: "ACME".to_string(),
            current_price: 5.0,
            year_high: Some(7.5),
            year_low: Some(2.1),
            volume: Some(125000),
        }
    }

    const VALID: &str = r#"{
        "recommendation": "BUY",
        "confidence": 82,
        "target_price": 6.5,
        "stop_loss": 4.2,
        "analysis": "Looks strong.",
        "key_points": ["a", "b", "c", "d", "e"],
        "risks": ["a", "b", "c", "d", "e"],
        "catalysts": ["a", "b", "c", "d", "e"]
    }"#;

    #[test]
    fn test_parse_plain_json() {
        let analysis = parse_completion(VALID).unwrap();
        assert_eq!(analysis.recommendation, "BUY");
        assert_eq!(analysis.confidence, 82.0);
        assert_eq!(analysis.key_points.len(), 5);
    }

    #[test]
    fn test_parse_strips_code_fences() {
        let fenced = format!("```json\n{}\n```", VALID);
        assert!(parse_completion(&fenced).is_some());
    }

    #[test]
    fn test_parse_extracts_object_from_prose() {
        let wrapped = format!("Here is my analysis:\n\n{}\n\nLet me know if you need more.", VALID);
        let analysis = parse_completion(&wrapped).unwrap();
        assert_eq!(analysis.target_price, 6.5);
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let partial = r#"{"recommendation": "BUY", "confidence": 82}"#;
        assert!(parse_completion(partial).is_none());
    }

    #[test]
    fn test_parse_rejects_no_object() {
        assert!(parse_completion("I cannot analyze this stock.").is_none());
    }

    #[test]
    fn test_prompt_includes_context() {
        let prompt = build_research_prompt(&context(), "comprehensive", "3months");
        assert!(prompt.contains("ACME"));
        assert!(prompt.contains("$5.00"));
        assert!(prompt.contains("$7.50"));
        assert!(prompt.contains("comprehensive"));
    }

    #[test]
    fn test_prompt_handles_missing_range() {
        let ctx = StockContext {
            year_high: None,
            year_low: None,
            volume: None,
            ..context()
        };
        let prompt = build_research_prompt(&ctx, "comprehensive", "3months");
        assert!(prompt.contains("N/A"));
    }

    #[test]
    fn test_placeholder_is_marked() {
        let analysis = placeholder(&context(), "Unable to generate detailed analysis due to API error: timeout");
        assert_eq!(analysis.recommendation, "HOLD");
        assert_eq!(analysis.confidence, 50.0);
        assert!(analysis.analysis.contains("API error"));
    }

    #[test]
    fn test_fallback_keeps_raw_text() {
        let analysis = fallback_from_text(&context(), "not json at all");
        assert_eq!(analysis.analysis, "not json at all");
        assert_eq!(analysis.target_price, 6.0);
    }
}
