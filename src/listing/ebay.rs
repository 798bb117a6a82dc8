// src/listing/ebay.rs
//! eBay Browse API provider: client-credentials OAuth + `GET item/v1|{id}|0`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{clean_description, item_id_from_url, Listing, ListingError, ListingProvider, Price};

pub const DEFAULT_API_BASE: &str = "https://api.ebay.com/buy/browse/v1";
pub const DEFAULT_IDENTITY_URL: &str = "https://api.ebay.com/identity/v1/oauth2/token";
pub const DEFAULT_SCOPE: &str = "https://api.ebay.com/oauth/api_scope";
pub const DEFAULT_MARKETPLACE: &str = "EBAY_GB";

/// Tokens are refreshed this long before eBay says they expire.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EbayConfig {
    /// "ENV" means: read from EBAY_APP_ID
    #[serde(default = "default_env_marker")]
    pub app_id: String,
    /// "ENV" means: read from EBAY_CERT_ID
    #[serde(default = "default_env_marker")]
    pub cert_id: String,
    #[serde(default = "default_marketplace")]
    pub marketplace_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_identity_url")]
    pub identity_url: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_env_marker() -> String {
    "ENV".to_string()
}
fn default_marketplace() -> String {
    DEFAULT_MARKETPLACE.to_string()
}
fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}
fn default_identity_url() -> String {
    DEFAULT_IDENTITY_URL.to_string()
}
fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for EbayConfig {
    fn default() -> Self {
        Self {
            app_id: default_env_marker(),
            cert_id: default_env_marker(),
            marketplace_id: default_marketplace(),
            api_base: default_api_base(),
            identity_url: default_identity_url(),
            scope: default_scope(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

pub struct EbayProvider {
    http: reqwest::Client,
    cfg: EbayConfig,
    token: Mutex<Option<CachedToken>>,
}

impl EbayProvider {
    pub fn new(cfg: EbayConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("authlayer/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            http,
            cfg,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, ListingError> {
        let mut guard = self.token.lock().await;
        if let Some(tok) = guard.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(tok.access_token.clone());
        }

        #[derive(Deserialize)]
        struct TokenResp {
            access_token: String,
            #[serde(default = "default_expires_in")]
            expires_in: i64,
        }
        fn default_expires_in() -> i64 {
            7200
        }

        let resp = self
            .http
            .post(&self.cfg.identity_url)
            .basic_auth(&self.cfg.app_id, Some(&self.cfg.cert_id))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", self.cfg.scope.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "ebay token request rejected");
            counter!("listing_fetch_errors_total", "kind" => "auth").increment(1);
            return Err(ListingError::Auth(format!("HTTP {}: {}", status.as_u16(), truncate(&body, 200))));
        }

        let body: TokenResp = resp
            .json()
            .await
            .map_err(|e| ListingError::Auth(format!("unreadable token response: {e}")))?;

        let ttl = (body.expires_in - TOKEN_EXPIRY_MARGIN_SECS).max(0);
        let cached = CachedToken {
            access_token: body.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(ttl),
        };
        let out = cached.access_token.clone();
        *guard = Some(cached);
        debug!(ttl_secs = ttl, "ebay token refreshed");
        Ok(out)
    }
}

#[async_trait]
impl ListingProvider for EbayProvider {
    async fn fetch(&self, url_or_id: &str) -> Result<Listing, ListingError> {
        let item_id = item_id_from_url(url_or_id)?;
        let token = self.access_token().await?;

        let url = format!("{}/item/v1|{}|0", self.cfg.api_base.trim_end_matches('/'), item_id);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .header("X-EBAY-C-MARKETPLACE-ID", &self.cfg.marketplace_id)
            .send()
            .await?;

        let status = resp.status();
        match status.as_u16() {
            200..=299 => {}
            404 => {
                counter!("listing_fetch_errors_total", "kind" => "not_found").increment(1);
                return Err(ListingError::NotFound(item_id));
            }
            401 | 403 => {
                // Token revoked early: drop it so the next call re-authenticates.
                *self.token.lock().await = None;
                counter!("listing_fetch_errors_total", "kind" => "auth").increment(1);
                return Err(ListingError::Auth(format!("HTTP {}", status.as_u16())));
            }
            code => {
                let body = resp.text().await.unwrap_or_default();
                counter!("listing_fetch_errors_total", "kind" => "upstream").increment(1);
                return Err(ListingError::Upstream {
                    status: code,
                    body: truncate(&body, 200),
                });
            }
        }

        let text = resp.text().await?;
        let item: ItemPayload =
            serde_json::from_str(&text).map_err(|e| ListingError::Malformed(e.to_string()))?;
        counter!("listing_fetch_total").increment(1);
        Ok(listing_from_item(item, &item_id, url_or_id.trim(), Utc::now()))
    }

    fn name(&self) -> &'static str {
        "ebay"
    }
}

// --- Browse API payload (only the fields we read) ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub seller: Option<SellerPayload>,
    #[serde(default)]
    pub image: Option<ImagePayload>,
    #[serde(default)]
    pub additional_images: Vec<ImagePayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerPayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub feedback_score: u64,
    #[serde(default, deserialize_with = "de_string_or_number")]
    pub feedback_percentage: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    #[serde(default)]
    pub image_url: String,
}

fn de_string_or_number<'de, D: serde::Deserializer<'de>>(
    d: D,
) -> Result<Option<String>, D::Error> {
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match v {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Map the Browse API item into our record. Main image goes first.
pub fn listing_from_item(
    item: ItemPayload,
    item_id: &str,
    item_url: &str,
    fetched_at: DateTime<Utc>,
) -> Listing {
    let seller = item.seller.unwrap_or_default();
    let description = item
        .description
        .or(item.short_description)
        .map(|d| clean_description(&d))
        .unwrap_or_default();

    let mut images: Vec<String> = Vec::with_capacity(item.additional_images.len() + 1);
    if let Some(main) = item.image.filter(|i| !i.image_url.is_empty()) {
        images.push(main.image_url);
    }
    images.extend(
        item.additional_images
            .into_iter()
            .map(|i| i.image_url)
            .filter(|u| !u.is_empty()),
    );

    Listing {
        item_id: item_id.to_string(),
        title: item.title,
        description,
        condition: item.condition,
        price: item.price.unwrap_or_default(),
        seller_username: seller.username,
        feedback_score: seller.feedback_score,
        feedback_percentage: seller.feedback_percentage.unwrap_or_else(|| "0".to_string()),
        images,
        item_url: item_url.to_string(),
        fetched_at,
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "itemId": "v1|389562275934|0",
        "title": "Maison Margiela Replica GAT Sneakers White EU 42",
        "description": "<p>Worn twice.&nbsp;Comes with <b>box</b>.</p>",
        "condition": "Pre-owned",
        "price": { "value": "180.00", "currency": "GBP" },
        "seller": { "username": "archive_uk", "feedbackScore": 7, "feedbackPercentage": "98.9" },
        "image": { "imageUrl": "https://i.ebayimg.com/main.jpg" },
        "additionalImages": [
            { "imageUrl": "https://i.ebayimg.com/heel.jpg" },
            { "imageUrl": "" }
        ]
    }"#;

    #[test]
    fn maps_browse_item() {
        let item: ItemPayload = serde_json::from_str(SAMPLE).unwrap();
        let l = listing_from_item(item, "389562275934", "https://www.ebay.co.uk/itm/389562275934", Utc::now());
        assert_eq!(l.title, "Maison Margiela Replica GAT Sneakers White EU 42");
        assert_eq!(l.description, "Worn twice. Comes with box .");
        assert_eq!(l.price.currency, "GBP");
        assert_eq!(l.seller_username, "archive_uk");
        assert_eq!(l.feedback_score, 7);
        assert_eq!(l.feedback_percentage, "98.9");
        assert_eq!(
            l.images,
            vec![
                "https://i.ebayimg.com/main.jpg".to_string(),
                "https://i.ebayimg.com/heel.jpg".to_string()
            ]
        );
    }

    #[test]
    fn missing_seller_defaults() {
        let item: ItemPayload = serde_json::from_str(r#"{"title":"Tabi boots"}"#).unwrap();
        let l = listing_from_item(item, "1", "1", Utc::now());
        assert_eq!(l.feedback_score, 0);
        assert_eq!(l.feedback_percentage, "0");
        assert!(l.images.is_empty());
        assert!(l.description.is_empty());
    }

    #[test]
    fn numeric_percentage_is_accepted() {
        let item: ItemPayload =
            serde_json::from_str(r#"{"seller":{"feedbackPercentage": 99.1}}"#).unwrap();
        assert_eq!(
            item.seller.unwrap().feedback_percentage.as_deref(),
            Some("99.1")
        );
    }

    #[test]
    fn token_freshness() {
        let now = Utc::now();
        let t = CachedToken {
            access_token: "t".into(),
            expires_at: now + chrono::Duration::seconds(5),
        };
        assert!(t.is_fresh(now));
        assert!(!t.is_fresh(now + chrono::Duration::seconds(6)));
    }
}
