//! Vision adapter: sends listing photos to a multimodal chat model and returns
//! its free-text verdict.
//!
//! Failures never propagate as errors. Every client returns a `String`; a
//! failed call comes back as `"image analysis failed: <cause>"` so the scorer
//! only ever sees text.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Listing photos consumed per request.
pub const MAX_IMAGES: usize = 4;
pub const FAILURE_PREFIX: &str = "image analysis failed";
pub const REFERENCE_GAT: &str = "reference_gat_authentic.webp";

const GAT_HINTS: &[&str] = &["gat", "replica", "sneaker", "trainer", "shoe"];

/// What to look at and what it is supposed to be.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisionRequest {
    pub image_urls: Vec<String>,
    #[serde(default = "unknown")]
    pub brand: String,
    #[serde(default = "unknown")]
    pub item_type: String,
}

fn unknown() -> String {
    "unknown".to_string()
}

pub trait VisionClient: Send + Sync {
    fn analyze<'a>(
        &'a self,
        req: &'a VisionRequest,
    ) -> Pin<Box<dyn Future<Output = String> + Send + 'a>>;
    fn provider_name(&self) -> &'static str;
}

pub type DynVisionClient = Arc<dyn VisionClient>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    #[serde(default)]
    pub enabled: bool,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default = "env_marker")]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Directory holding known-authentic reference photos.
    #[serde(default = "default_reference_dir")]
    pub reference_dir: PathBuf,
}

fn env_marker() -> String {
    "ENV".to_string()
}
fn default_model() -> String {
    "gpt-4o".to_string()
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_reference_dir() -> PathBuf {
    PathBuf::from("reference_images")
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: env_marker(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_url: default_api_url(),
            reference_dir: default_reference_dir(),
        }
    }
}

/// Factory.
///
/// * `VISION_TEST_MODE=mock` → deterministic mock client.
/// * `enabled == false` → disabled client.
/// * otherwise the OpenAI-compatible provider.
pub fn build_vision_client(cfg: &VisionConfig) -> DynVisionClient {
    if std::env::var("VISION_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockVision::new(
            "Mock analysis: stitching and label placement look genuine and proper.",
        ));
    }
    if !cfg.enabled {
        return Arc::new(DisabledVision);
    }
    match OpenAiVision::new(cfg.clone()) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            warn!(error = ?e, "vision client init failed, falling back to disabled");
            Arc::new(DisabledVision)
        }
    }
}

/// Brand is Margiela and the item looks like a GAT-style shoe.
pub fn is_margiela_gat(brand: &str, item_type: &str) -> bool {
    let b = brand.to_lowercase();
    let i = item_type.to_lowercase();
    b.contains("margiela") && GAT_HINTS.iter().any(|h| i.contains(h))
}

/// Read a reference image as (base64, media type). Missing files yield `None`.
pub fn load_reference_image(dir: &Path, filename: &str) -> Option<(String, &'static str)> {
    let candidates = [dir.join(filename), PathBuf::from(filename)];
    let path = candidates.iter().find(|p| p.is_file())?;
    let bytes = std::fs::read(path).ok()?;
    let media = match path.extension().and_then(|e| e.to_str()) {
        Some("webp") => "image/webp",
        Some("png") => "image/png",
        _ => "image/jpeg",
    };
    Some((base64::engine::general_purpose::STANDARD.encode(bytes), media))
}

pub fn reference_prompt(brand: &str, item_type: &str) -> String {
    format!(
        "You are an expert fashion authenticator. You are checking {brand} {item_type}.

IMPORTANT: The FIRST image below is a KNOWN AUTHENTIC reference image. Compare ALL subsequent listing images against it.

For Margiela GATs focus on:
- HEEL TAB: authentic is thin, flat and flush with the shoe; fakes are puffy, overstuffed and protrude. This is the most important check.
- Ankle collar: authentic is slim and structured, fake is bloated and rounded
- Back profile: authentic is sleek, fake is bulky
- Suede quality and texture
- Stitching precision
- Label placement and quality inside the shoe

Give a SPECIFIC verdict for the listed item: say \"this looks authentic\" or \"this looks fake\" with concrete visual reasons."
    )
}

pub fn generic_prompt(brand: &str, item_type: &str) -> String {
    format!(
        "You are an expert fashion authenticator specializing in designer brands.

Analyze these listing images for brand: {brand}, item type: {item_type}

Look for:
- Label/tag quality (stitching, font, alignment, material)
- Hardware quality (zippers, buttons, buckles)
- Material quality and texture
- Construction details (seams, stitching patterns)
- Obvious red flags (wrong fonts, poor stitching, cheap materials)
- For Margiela: heel tab on GATs, DWMZ marking on knitwear, label attachment method
- For Supreme x Margiela: label sewn into the seam, not mounted on a separate backing

Be direct about whether each image looks authentic or fake and why."
    )
}

/// OpenAI-compatible chat completions with `image_url` content parts.
pub struct OpenAiVision {
    http: reqwest::Client,
    cfg: VisionConfig,
}

impl OpenAiVision {
    pub fn new(cfg: VisionConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("authlayer/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { http, cfg })
    }

    /// Message content parts: prompt, optional reference image, then at most
    /// [`MAX_IMAGES`] listing images.
    pub fn build_content(&self, req: &VisionRequest) -> Vec<serde_json::Value> {
        let reference = if is_margiela_gat(&req.brand, &req.item_type) {
            load_reference_image(&self.cfg.reference_dir, REFERENCE_GAT)
        } else {
            None
        };

        let prompt = if reference.is_some() {
            reference_prompt(&req.brand, &req.item_type)
        } else {
            generic_prompt(&req.brand, &req.item_type)
        };

        let mut content = vec![serde_json::json!({ "type": "text", "text": prompt })];
        if let Some((b64, media)) = reference {
            content.push(serde_json::json!({
                "type": "image_url",
                "image_url": { "url": format!("data:{media};base64,{b64}") }
            }));
        }
        for url in req.image_urls.iter().take(MAX_IMAGES) {
            content.push(serde_json::json!({
                "type": "image_url",
                "image_url": { "url": url }
            }));
        }
        content
    }

    async fn analyze_impl(&self, req: &VisionRequest) -> Result<String, String> {
        if self.cfg.api_key.is_empty() {
            return Err("missing API key".to_string());
        }
        if req.image_urls.is_empty() {
            return Err("no images supplied".to_string());
        }

        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        let body = serde_json::json!({
            "model": self.cfg.model,
            "max_tokens": self.cfg.max_tokens,
            "messages": [{ "role": "user", "content": self.build_content(req) }],
        });

        let resp = self
            .http
            .post(&self.cfg.api_url)
            .bearer_auth(&self.cfg.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !resp.status().is_success() {
            return Err(format!("provider returned HTTP {}", resp.status().as_u16()));
        }
        let parsed: Resp = resp.json().await.map_err(|e| e.to_string())?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| "empty response".to_string())
    }
}

impl VisionClient for OpenAiVision {
    fn analyze<'a>(
        &'a self,
        req: &'a VisionRequest,
    ) -> Pin<Box<dyn Future<Output = String> + Send + 'a>> {
        Box::pin(async move {
            match self.analyze_impl(req).await {
                Ok(text) => {
                    counter!("vision_requests_total", "outcome" => "ok").increment(1);
                    info!(
                        provider = "openai",
                        images = req.image_urls.len().min(MAX_IMAGES),
                        "vision analysis done"
                    );
                    text
                }
                Err(cause) => {
                    counter!("vision_requests_total", "outcome" => "error").increment(1);
                    warn!(provider = "openai", %cause, "vision analysis failed");
                    format!("{FAILURE_PREFIX}: {cause}")
                }
            }
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Used when vision is switched off in config.
pub struct DisabledVision;

impl VisionClient for DisabledVision {
    fn analyze<'a>(
        &'a self,
        _req: &'a VisionRequest,
    ) -> Pin<Box<dyn Future<Output = String> + Send + 'a>> {
        Box::pin(async { format!("{FAILURE_PREFIX}: vision provider disabled") })
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Returns a fixed text. For tests and local runs.
#[derive(Debug, Clone)]
pub struct MockVision {
    pub fixed: String,
}

impl MockVision {
    pub fn new(fixed: impl Into<String>) -> Self {
        Self {
            fixed: fixed.into(),
        }
    }
}

impl VisionClient for MockVision {
    fn analyze<'a>(
        &'a self,
        _req: &'a VisionRequest,
    ) -> Pin<Box<dyn Future<Output = String> + Send + 'a>> {
        let out = self.fixed.clone();
        Box::pin(async move { out })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(n: usize, brand: &str, item_type: &str) -> VisionRequest {
        VisionRequest {
            image_urls: (0..n).map(|i| format!("https://img/{i}.jpg")).collect(),
            brand: brand.into(),
            item_type: item_type.into(),
        }
    }

    fn client(reference_dir: PathBuf) -> OpenAiVision {
        OpenAiVision::new(VisionConfig {
            enabled: true,
            api_key: "k".into(),
            reference_dir,
            ..VisionConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn margiela_gat_detection() {
        assert!(is_margiela_gat("Maison Margiela", "Replica GAT sneakers"));
        assert!(is_margiela_gat("MM6 Margiela", "trainers"));
        assert!(!is_margiela_gat("Margiela", "hoodie"));
        assert!(!is_margiela_gat("Nike", "sneaker"));
    }

    #[test]
    fn at_most_four_listing_images() {
        let c = client(PathBuf::from("does/not/exist"));
        let content = c.build_content(&req(7, "Supreme", "hoodie"));
        // prompt + 4 images
        assert_eq!(content.len(), 1 + MAX_IMAGES);
        assert!(content[0]["text"]
            .as_str()
            .unwrap()
            .contains("item type: hoodie"));
    }

    #[test]
    fn reference_image_goes_first() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(REFERENCE_GAT), b"RIFF....WEBP").unwrap();
        let c = client(dir.path().to_path_buf());

        let content = c.build_content(&req(2, "Maison Margiela", "GAT sneakers"));
        assert_eq!(content.len(), 1 + 1 + 2);
        assert!(content[0]["text"]
            .as_str()
            .unwrap()
            .contains("KNOWN AUTHENTIC reference"));
        assert!(content[1]["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/webp;base64,"));
    }

    #[tokio::test]
    async fn failures_come_back_as_text() {
        let c = OpenAiVision::new(VisionConfig {
            enabled: true,
            api_key: String::new(),
            ..VisionConfig::default()
        })
        .unwrap();
        let out = c.analyze(&req(1, "Margiela", "GAT")).await;
        assert!(out.starts_with("image analysis failed:"), "{out}");

        let disabled = DisabledVision.analyze(&req(1, "x", "y")).await;
        assert!(disabled.starts_with(FAILURE_PREFIX));
    }
}
