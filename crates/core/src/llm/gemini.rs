use crate::config::Settings;
use crate::domain::draft::GeneratedDraft;
use crate::llm::error::GenerationError;
use crate::llm::json::{self, Source};
use crate::llm::{ContentGenerator, Provider};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PUBLISHER_BRAND: &str = "TradeNexus";
const PROMO_CHANNEL: &str = "Trade Maven";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// `None` leaves the transport default in place.
    pub timeout: Option<Duration>,
}

impl GeminiConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            api_key: settings.gemini_api_key.clone(),
            base_url: settings.gemini_base_url.clone(),
            model: settings.gemini_model.clone(),
            timeout: settings.gemini_timeout,
        }
    }
}

/// Gemini `generateContent` client with Google Search grounding enabled.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key: config.api_key,
            base_url: config.base_url,
            model: config.model,
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(GeminiConfig::from_settings(settings))
    }

    fn prompt(topic: &str) -> String {
        format!(
            "You are an expert financial analyst and professional trader working for \"{PUBLISHER_BRAND}\".\n\
Your task is to write a high-quality, SEO-optimized trading blog post about: \"{topic}\".\n\n\
CRITICAL REQUIREMENTS:\n\
1. Niche Focus: Focus strictly on Trading, Technical Analysis, Price Action, or Market News (Forex, Crypto, Stocks).\n\
2. Real-time Data: Use the Google Search tool to find the latest price data, news, and sentiment for the topic.\n\
3. Technical Analysis: Include specific support/resistance levels, chart patterns, and RSI/MACD readings where relevant.\n\
4. Channel Mention: You MUST naturally mention the \"{PROMO_CHANNEL}\" YouTube channel at least once in the content as a resource for more video analysis.\n\
5. Structure: The content field must use Markdown formatting (# Headers, ## Subheaders, bullet points).\n\
6. Tone: Professional, analytical, yet accessible.\n\n\
OUTPUT FORMAT:\n\
Return ONLY a raw valid JSON object. Do not wrap it in markdown code blocks.\n\n\
JSON Schema:\n\
{{\n\
  \"title\": \"A catchy, SEO-friendly headline\",\n\
  \"excerpt\": \"A 2-sentence summary for the blog card\",\n\
  \"content\": \"The full blog post in Markdown format. Escape quotes properly.\",\n\
  \"tags\": [\"Array\", \"of\", \"5\", \"SEO\", \"keywords\"],\n\
  \"category\": \"One of: Forex, Crypto, Stocks, Technical Analysis\"\n\
}}"
        )
    }

    async fn generate_content(
        &self,
        api_key: &str,
        req: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key).map_err(|e| GenerationError::Upstream {
            stage: "request",
            detail: format!("invalid api key header: {e}"),
            raw_output: None,
        })?;
        headers.insert("x-goog-api-key", key);

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(req)
            .send()
            .await
            .map_err(|e| GenerationError::Upstream {
                stage: "request",
                detail: e.to_string(),
                raw_output: None,
            })?;

        let status = res.status();
        let text = res.text().await.map_err(|e| GenerationError::Upstream {
            stage: "body",
            detail: e.to_string(),
            raw_output: None,
        })?;
        if !status.is_success() {
            return Err(GenerationError::Upstream {
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
            });
        }

        serde_json::from_str::<GenerateContentResponse>(&text).map_err(|e| {
            GenerationError::Upstream {
                stage: "decode",
                detail: e.to_string(),
                raw_output: Some(text),
            }
        })
    }

    /// Concatenated text parts of the first candidate.
    fn response_text(res: &GenerateContentResponse) -> String {
        res.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn response_sources(res: &GenerateContentResponse) -> Vec<Source> {
        let Some(metadata) = res
            .candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
        else {
            return Vec::new();
        };

        metadata
            .grounding_chunks
            .iter()
            .filter_map(|chunk| chunk.web.as_ref())
            .filter_map(|web| {
                let uri = web.uri.clone()?;
                let title = web.title.clone().unwrap_or_else(|| uri.clone());
                Some(Source { title, uri })
            })
            .collect()
    }

    /// Turns a decoded upstream response into a draft, citing any web sources.
    fn draft_from_response(res: &GenerateContentResponse) -> Result<GeneratedDraft, GenerationError> {
        let text = Self::response_text(res);
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        let mut draft = json::parse_draft(&text)?;
        let sources = Self::response_sources(res);
        if !sources.is_empty() {
            let body = draft.content.take().unwrap_or_default();
            draft.content = Some(json::append_sources(&body, &sources));
        }
        Ok(draft)
    }
}

#[async_trait::async_trait]
impl ContentGenerator for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn generate(&self, topic: &str) -> Result<GeneratedDraft, GenerationError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GenerationError::MissingCredential);
        };

        let req = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart {
                    text: Self::prompt(topic),
                }],
            }],
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
        };

        let res = self.generate_content(api_key, &req).await?;
        let draft = Self::draft_from_response(&res);
        if let Err(err) = &draft {
            tracing::warn!(
                %topic,
                kind = err.kind(),
                raw_output = err.raw_output().unwrap_or_default(),
                "failed to parse generated draft"
            );
        }
        draft
    }
}

#[derive(Debug, Clone, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    tools: Vec<Tool>,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Clone, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Clone, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebSource>,
}

#[derive(Debug, Clone, Deserialize)]
struct WebSource {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_GEMINI_MODEL;
    use httpmock::prelude::*;
    use serde_json::json;

    const MODEL_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    fn client(base_url: String, api_key: Option<&str>) -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            api_key: api_key.map(str::to_string),
            base_url,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            timeout: None,
        })
        .unwrap()
    }

    fn text_response(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }]
        })
    }

    #[test]
    fn prompt_mentions_topic_and_brands() {
        let p = GeminiClient::prompt("Gold Price Analysis");
        assert!(p.contains("\"Gold Price Analysis\""));
        assert!(p.contains("TradeNexus"));
        assert!(p.contains("Trade Maven"));
        assert!(p.contains("\"category\""));
    }

    #[test]
    fn request_enables_google_search() {
        let req = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: "hi".into() }],
            }],
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
        };
        let v = serde_json::to_value(req).unwrap();
        assert_eq!(v["tools"], json!([{"google_search": {}}]));
        assert_eq!(v["contents"][0]["parts"][0]["text"], json!("hi"));
    }

    #[test]
    fn joins_text_parts_and_collects_web_sources() {
        let res: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [{"text": "{\"title\":"}, {"text": "\"Split\"}"}]},
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://example.com/fx", "title": "fxstreet.com"}},
                        {"retrievedContext": {"uri": "ignored"}},
                        {"web": {"uri": "https://example.com/untitled"}}
                    ]
                }
            }]
        }))
        .unwrap();

        let draft = GeminiClient::draft_from_response(&res).unwrap();
        assert_eq!(draft.title.as_deref(), Some("Split"));
        let content = draft.content.unwrap();
        assert!(content.starts_with("### Market Sources & References\n"));
        assert!(content.contains("- [fxstreet.com](https://example.com/fx)"));
        assert!(content
            .contains("- [https://example.com/untitled](https://example.com/untitled)"));
    }

    #[test]
    fn no_candidates_is_empty_response() {
        let res: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            GeminiClient::draft_from_response(&res),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn missing_key_fails_without_calling_upstream() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path(MODEL_PATH);
                then.status(200).json_body(text_response("{}"));
            })
            .await;

        let err = client(server.base_url(), None)
            .generate("Gold Price Analysis")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MissingCredential));
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn generates_draft_from_fenced_response() {
        let server = MockServer::start_async().await;
        let body = "```json\n{\"title\":\"Gold Holds $2,300\",\"excerpt\":\"Bid.\",\"content\":\"# Gold\",\"tags\":[\"Gold\"],\"category\":\"Technical Analysis\"}\n```";
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(MODEL_PATH)
                    .header("x-goog-api-key", "test-key");
                then.status(200).json_body(text_response(body));
            })
            .await;

        let draft = client(server.base_url(), Some("test-key"))
            .generate("Gold Price Analysis")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(draft.title.as_deref(), Some("Gold Holds $2,300"));
        assert_eq!(draft.content.as_deref(), Some("# Gold"));
        assert_eq!(draft.category.as_deref(), Some("Technical Analysis"));
    }

    #[tokio::test]
    async fn non_json_text_is_invalid_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(MODEL_PATH);
                then.status(200).json_body(text_response("not json"));
            })
            .await;

        let err = client(server.base_url(), Some("k"))
            .generate("Bitcoin")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn http_error_is_upstream_error_with_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(MODEL_PATH);
                then.status(400)
                    .json_body(json!({"error": {"code": 400, "status": "INVALID_ARGUMENT"}}));
            })
            .await;

        let err = client(server.base_url(), Some("k"))
            .generate("Bitcoin")
            .await
            .unwrap_err();
        match err {
            GenerationError::Upstream {
                stage, raw_output, ..
            } => {
                assert_eq!(stage, "http");
                assert!(raw_output.unwrap().contains("INVALID_ARGUMENT"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
