//! Gemini generateContent client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{error, info, instrument, warn};

use super::fallback::{format_raw_results, price_from_value, valid_link};
use super::summarizer::{Analysis, Offer, Summarizer, DEFAULT_CURRENCY, OFFER_SOURCE};
use crate::config::Config;
use crate::error::ServiceError;
use crate::metrics;
use crate::search::RawResult;

/// Models tried in order when no `GEMINI_MODEL` override is set first.
const CANDIDATE_MODELS: &[&str] = &["gemini-1.5-pro", "gemini-1.5-flash", "gemini-pro"];

/// Results embedded in the prompt.
const MAX_PROMPT_RESULTS: usize = 10;

const PROBE_PROMPT: &str = "Say 'OK'";

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?m)^```(?:json)?\n|```$").unwrap();
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Shape requested from the model; offers stay untyped until validated.
#[derive(Debug, Deserialize)]
struct ModelAnalysis {
    #[serde(default)]
    offers: Vec<Value>,
    #[serde(default)]
    summary: Option<String>,
}

/// Summarizer backed by Gemini, degrading to raw formatting on any failure.
pub struct GeminiSummarizer {
    http: Client,
    api_key: Option<String>,
    api_base: String,
    candidates: Vec<String>,
    /// Resolved on first use; `None` inside means no model answered
    model: OnceCell<Option<String>>,
}

impl GeminiSummarizer {
    pub fn new(config: &Config) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.gemini_timeout_secs))
            .build()
            .map_err(|e| ServiceError::Internal(format!("Failed to build Gemini client: {e}")))?;

        let mut candidates: Vec<String> = config.gemini_model.iter().cloned().collect();
        for model in CANDIDATE_MODELS {
            if !candidates.iter().any(|c| c == model) {
                candidates.push(model.to_string());
            }
        }

        Ok(Self {
            http,
            api_key: config.gemini_api_key.clone(),
            api_base: config.gemini_api_base.trim_end_matches('/').to_string(),
            candidates,
            model: OnceCell::new(),
        })
    }

    /// The model in use, probing candidates on first call.
    ///
    /// The probe uses the same request shape as the analysis, so a model that
    /// passes it accepts analysis requests too.
    pub async fn model(&self) -> Option<&str> {
        self.model
            .get_or_init(|| self.probe_models())
            .await
            .as_deref()
    }

    async fn probe_models(&self) -> Option<String> {
        if self.api_key.is_none() {
            warn!("Gemini API key not configured");
            return None;
        }

        for model in &self.candidates {
            info!(model = %model, "Trying Gemini model");
            match self.generate(model, PROBE_PROMPT).await {
                Ok(_) => {
                    info!(model = %model, "Gemini initialized");
                    return Some(model.clone());
                }
                Err(e) => warn!(model = %model, error = %e, "Gemini model failed"),
            }
        }

        error!("No Gemini model worked");
        None
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ServiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ServiceError::Summarizer("API key not configured".into()))?;

        let url = format!("{}/v1beta/models/{}:generateContent", self.api_base, model);
        let body = request_body(prompt);

        let start = Instant::now();
        let outcome = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await;
        metrics::record_vendor_latency("gemini", start.elapsed().as_secs_f64() * 1000.0);
        let response = outcome.map_err(|e| ServiceError::Summarizer(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ServiceError::Summarizer(format!(
                "Gemini HTTP {status}: {error_text}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Summarizer(format!("Failed to parse Gemini response: {e}")))?;

        parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| ServiceError::Summarizer("Gemini returned no text".into()))
    }

    async fn try_analyze(&self, model: &str, results: &[RawResult], query: &str) -> Result<Analysis, ServiceError> {
        let prompt = build_prompt(results, query)?;
        info!(model = %model, results = results.len(), "Analyzing with Gemini");
        let text = self.generate(model, &prompt).await?;
        parse_analysis(&text)
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    #[instrument(skip(self, results), fields(summarizer = "gemini"))]
    async fn analyze(&self, results: &[RawResult], query: &str) -> Analysis {
        let Some(model) = self.model().await else {
            warn!("Gemini not available, returning raw results");
            return format_raw_results(results);
        };

        match self.try_analyze(model, results, query).await {
            Ok(analysis) => {
                info!(offers = analysis.offers.len(), "Gemini analyzed offers");
                analysis
            }
            Err(e) => {
                error!(error = %e, "Gemini analysis failed, returning raw results");
                format_raw_results(results)
            }
        }
    }

    fn is_available(&self) -> Option<bool> {
        self.model.get().map(Option::is_some)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Single-turn request; probe and analysis share this shape.
fn request_body(prompt: &str) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![Part { text: prompt }],
        }],
    }
}

fn build_prompt(results: &[RawResult], query: &str) -> Result<String, ServiceError> {
    let shown = &results[..results.len().min(MAX_PROMPT_RESULTS)];
    let results_json = serde_json::to_string_pretty(shown)
        .map_err(|e| ServiceError::Internal(format!("Failed to serialize results: {e}")))?;

    Ok(format!(
        r#"Analiza estos resultados de Google Shopping México para "{query}".

Resultados:
{results_json}

IMPORTANTE:
1. PRIORIZA tiendas mexicanas: Walmart, Soriana, Chedraui, HEB, La Comer, Bodega Aurrera, Liverpool, etc.
2. Solo incluye 1 resultado por tienda/dominio (deduplica por seller/domain)
3. Extrae: title, price (como número), currency, seller, link (URL completa del campo 'url')
4. Normaliza precios a formato numérico (ej: "127.00")
5. Verifica que los links sean válidos (no vacíos)
6. Marca el source como "{OFFER_SOURCE}"
7. SOLO incluye resultados que tengan precio Y link válidos

Retorna SOLO JSON válido en este formato:
{{
  "offers": [
    {{
      "title": "Nombre producto",
      "price": 100.00,
      "currency": "{DEFAULT_CURRENCY}",
      "seller": "Tienda",
      "link": "URL completa",
      "source": "{OFFER_SOURCE}"
    }}
  ],
  "summary": "Resumen breve",
  "total_offers": 5
}}"#
    ))
}

/// Parse model output into an analysis, dropping offers that fail validation.
fn parse_analysis(text: &str) -> Result<Analysis, ServiceError> {
    let text = text.trim();
    let cleaned = if text.starts_with("```") {
        CODE_FENCE.replace_all(text, "").trim().to_string()
    } else {
        text.to_string()
    };

    let parsed: ModelAnalysis = serde_json::from_str(&cleaned)
        .map_err(|e| ServiceError::Summarizer(format!("Gemini returned invalid JSON: {e}")))?;

    let total = parsed.offers.len();
    let offers: Vec<Offer> = parsed.offers.iter().filter_map(offer_from_value).collect();
    if offers.len() < total {
        warn!(dropped = total - offers.len(), "Dropped Gemini offers without valid price or link");
    }

    let summary = parsed
        .summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("Found {} offers", offers.len()));

    Ok(Analysis {
        offers,
        summary,
        ai_generated: true,
    })
}

fn offer_from_value(value: &Value) -> Option<Offer> {
    let text = |key: &str, default: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string())
    };

    let price = price_from_value(value.get("price")?)?;
    let link = valid_link(value.get("link").and_then(Value::as_str)?)?;

    Some(Offer {
        title: text("title", "Unknown Product"),
        price,
        currency: text("currency", DEFAULT_CURRENCY),
        seller: text("seller", "Unknown"),
        link,
        source: text("source", OFFER_SOURCE),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_results() -> Vec<RawResult> {
        (0..12)
            .map(|i| RawResult {
                title: format!("Producto {i}"),
                price: "$10.00".into(),
                url: format!("https://tienda{i}.com.mx/p"),
                desc: None,
                merchant: format!("Tienda{i}"),
            })
            .collect()
    }

    #[test]
    fn test_parse_analysis_strips_code_fences() {
        let text = "```json\n{\"offers\": [{\"title\": \"Leche\", \"price\": 27.5, \"currency\": \"MXN\", \"seller\": \"Walmart\", \"link\": \"https://www.walmart.com.mx/1\", \"source\": \"oxylabs_shopping\"}], \"summary\": \"Una oferta\", \"total_offers\": 1}\n```";

        let analysis = parse_analysis(text).unwrap();
        assert!(analysis.ai_generated);
        assert_eq!(analysis.offers.len(), 1);
        assert_eq!(analysis.offers[0].seller, "Walmart");
        assert_eq!(analysis.summary, "Una oferta");
    }

    #[test]
    fn test_parse_analysis_drops_invalid_offers() {
        let text = r#"{"offers": [
            {"title": "A", "price": "127.00", "seller": "Soriana", "link": "https://www.soriana.com/a"},
            {"title": "B", "price": null, "seller": "HEB", "link": "https://www.heb.com.mx/b"},
            {"title": "C", "price": 10, "seller": "Coppel", "link": ""},
            {"title": "D", "price": 10, "seller": "Oxxo"}
        ]}"#;

        let analysis = parse_analysis(text).unwrap();
        assert_eq!(analysis.offers.len(), 1);
        assert_eq!(analysis.offers[0].price, 127.0);
        assert_eq!(analysis.offers[0].currency, "MXN");
        assert_eq!(analysis.offers[0].source, "oxylabs_shopping");
        assert_eq!(analysis.summary, "Found 1 offers");
    }

    #[test]
    fn test_parse_analysis_rejects_prose() {
        assert!(parse_analysis("Lo siento, no puedo ayudar").is_err());
    }

    #[test]
    fn test_prompt_embeds_at_most_ten_results() {
        let prompt = build_prompt(&sample_results(), "leche lala").unwrap();
        assert!(prompt.contains("\"leche lala\""));
        assert!(prompt.contains("Producto 9"));
        assert!(!prompt.contains("Producto 10"));
    }

    #[test]
    fn test_request_body_has_no_generation_config() {
        let value = serde_json::to_value(request_body(PROBE_PROMPT)).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "Say 'OK'");
        assert!(value.get("generationConfig").is_none());
    }

    #[test]
    fn test_failed_call_still_records_latency() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let config = Config {
            gemini_api_key: Some("test-key".into()),
            gemini_api_base: "http://127.0.0.1:1".into(),
            ..Config::default()
        };
        let summarizer = GeminiSummarizer::new(&config).unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let outcome = ::metrics::with_local_recorder(&recorder, || {
            runtime.block_on(summarizer.generate("gemini-1.5-flash", PROBE_PROMPT))
        });

        assert!(matches!(outcome, Err(ServiceError::Summarizer(_))));
        let rendered = handle.render();
        assert!(rendered.contains("vendor_request_latency_ms"));
        assert!(rendered.contains("vendor=\"gemini\""));
    }

    #[test]
    fn test_configured_model_is_tried_first() {
        let config = Config {
            gemini_model: Some("gemini-2.0-flash".into()),
            ..Config::default()
        };
        let summarizer = GeminiSummarizer::new(&config).unwrap();
        assert_eq!(summarizer.candidates[0], "gemini-2.0-flash");
        assert_eq!(summarizer.candidates.len(), CANDIDATE_MODELS.len() + 1);
    }

    #[tokio::test]
    async fn test_without_key_falls_back_to_raw_results() {
        let summarizer = GeminiSummarizer::new(&Config::default()).unwrap();
        assert_eq!(summarizer.is_available(), None);

        let analysis = summarizer.analyze(&sample_results(), "leche").await;
        assert!(!analysis.ai_generated);
        assert_eq!(analysis.offers.len(), 12);
        assert_eq!(summarizer.is_available(), Some(false));
    }
}
