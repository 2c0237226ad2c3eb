//! Request and result models for the research API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::Analysis;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchRequest {
    pub ticker: String,
    #[serde(default = "default_analysis_type")]
    pub analysis_type: String,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
}

fn default_analysis_type() -> String {
    String::from("comprehensive")
}

fn default_timeframe() -> String {
    String::from("3months")
}

/// One stored research run, returned to clients and kept in history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResult {
    pub id: Uuid,
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    pub analysis_type: String,
    pub timeframe: String,
    pub recommendation: String,
    pub confidence: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    pub analysis: String,
    pub key_points: Vec<String>,
    pub risks: Vec<String>,
    pub catalysts: Vec<String>,
}

impl ResearchResult {
    /// Wrap a parsed analysis for storage and response.
    pub fn from_analysis(request: &ResearchRequest, ticker: &str, analysis: Analysis) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticker: ticker.to_string(),
            timestamp: Utc::now(),
            analysis_type: request.analysis_type.clone(),
            timeframe: request.timeframe.clone(),
            recommendation: analysis.recommendation.to_lowercase(),
            confidence: analysis.confidence,
            target_price: analysis.target_price,
            stop_loss: analysis.stop_loss,
            analysis: analysis.analysis,
            key_points: analysis.key_points,
            risks: analysis.risks,
            catalysts: analysis.catalysts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request: ResearchRequest = serde_json::from_str(r#"{"ticker": "ACME"}"#).unwrap();
        assert_eq!(request.ticker, "ACME");
        assert_eq!(request.analysis_type, "comprehensive");
        assert_eq!(request.timeframe, "3months");
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let request: ResearchRequest = serde_json::from_str(r#"{"ticker": "ACME"}"#).unwrap();
        let analysis = Analysis {
            recommendation: "BUY".to_string(),
            confidence: 80.0,
            target_price: 6.0,
            stop_loss: 4.0,
            analysis: "strong pipeline".to_string(),
            key_points: vec![],
            risks: vec![],
            catalysts: vec![],
        };
        let result = ResearchResult::from_analysis(&request, "ACME", analysis);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["recommendation"], "buy");
        assert!(json.get("targetPrice").is_some());
        assert!(json.get("keyPoints").is_some());
    }
}
