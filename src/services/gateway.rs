use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client as HttpClient;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        EngineHint, GeoPoint, PageMeta, RatingStats, RecommendationCard, RecommendationContext,
        RecommendationPage, RecommendationParams,
    },
};

/// Wire request for the engine's read path
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineRequest {
    pub context: RecommendationContext,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<RecommendationParams>,
}

/// The sole channel to the external recommendation engine.
///
/// `recommend` is the caller-facing read path and fails with typed errors;
/// `notify` is a hint on the secondary action channel whose failure callers
/// log and drop, never propagate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecommendationEngine: Send + Sync {
    /// Fetches one page of recommendations with exactly one engine call
    async fn recommend(&self, request: &EngineRequest) -> AppResult<RecommendationPage>;

    /// Sends a best-effort notification on the secondary action channel
    async fn notify(&self, hint: EngineHint) -> AppResult<()>;
}

/// HTTP client for the hosted recommendation engine
#[derive(Clone)]
pub struct HttpRecommendationGateway {
    http_client: HttpClient,
    api_key: String,
    engine_url: String,
}

impl HttpRecommendationGateway {
    /// Creates a gateway whose every request is bounded by `timeout`
    pub fn new(engine_url: String, api_key: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            engine_url,
        })
    }
}

#[async_trait]
impl RecommendationEngine for HttpRecommendationGateway {
    async fn recommend(&self, request: &EngineRequest) -> AppResult<RecommendationPage> {
        let url = format!("{}/v1/recommendations", self.engine_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GatewayUnavailable(format!(
                "engine returned status {}: {}",
                status, body
            )));
        }

        let raw: Value = response.json().await.map_err(|e| {
            AppError::MalformedGatewayResponse(format!("undecodable engine body: {}", e))
        })?;

        let page = normalize_page(request, raw)?;

        tracing::info!(
            user_id = %request.user_id,
            context = %request.context,
            listings = page.listings.len(),
            "Recommendations fetched"
        );

        Ok(page)
    }

    async fn notify(&self, hint: EngineHint) -> AppResult<()> {
        let url = format!("{}/v1/events", self.engine_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&hint)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::GatewayUnavailable(format!(
                "engine hint returned status {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// Validates a raw engine body and normalizes it into a page.
///
/// `listings` must be an array; anything else is a contract violation.
fn normalize_page(request: &EngineRequest, raw: Value) -> AppResult<RecommendationPage> {
    let listings_raw = raw.get("listings").ok_or_else(|| {
        AppError::MalformedGatewayResponse("response has no listings field".to_string())
    })?;

    let items = listings_raw.as_array().ok_or_else(|| {
        AppError::MalformedGatewayResponse("listings is not an array".to_string())
    })?;

    let listings: Vec<RecommendationCard> = items.iter().map(normalize_card).collect();
    let metadata = normalize_meta(request, raw.get("metadata"), listings.len());

    Ok(RecommendationPage { listings, metadata })
}

/// Normalizes one raw card; absent fields become empty/zero/false
fn normalize_card(raw: &Value) -> RecommendationCard {
    let rating = match raw.get("rating") {
        Some(Value::Number(n)) => RatingStats {
            average: n.as_f64().unwrap_or(0.0),
            count: 0,
        },
        Some(obj) if obj.is_object() => RatingStats {
            average: f64_field(obj, "average"),
            count: obj.get("count").and_then(Value::as_i64).unwrap_or(0),
        },
        _ => RatingStats::default(),
    };

    let location = raw
        .get("location")
        .map(|l| GeoPoint {
            lat: f64_field(l, "lat"),
            lng: f64_field(l, "lng"),
        })
        .unwrap_or(GeoPoint { lat: 0.0, lng: 0.0 });

    let target_id = match str_field(raw, "targetId") {
        id if id.is_empty() => str_field(raw, "id"),
        id => id,
    };

    RecommendationCard {
        target_id,
        title: str_field(raw, "title"),
        description: str_field(raw, "description"),
        images: str_list_field(raw, "images"),
        price: f64_field(raw, "price"),
        rating,
        location,
        amenities: str_list_field(raw, "amenities"),
        available: raw.get("available").and_then(Value::as_bool).unwrap_or(false),
        owner_id: str_field(raw, "ownerId"),
        confidence: raw.get("confidence").and_then(Value::as_f64),
        explanation: raw
            .get("explanation")
            .and_then(Value::as_str)
            .map(str::to_string),
        metadata: raw.get("metadata").filter(|m| m.is_object()).cloned(),
    }
}

/// Normalizes response metadata, defaulting fields the engine left out
fn normalize_meta(request: &EngineRequest, raw: Option<&Value>, listing_count: usize) -> PageMeta {
    let requested_page = request
        .params
        .as_ref()
        .and_then(|p| p.page)
        .unwrap_or(1);

    let meta = raw.and_then(Value::as_object);

    PageMeta {
        context: meta
            .and_then(|m| m.get("context"))
            .and_then(|c| serde_json::from_value(c.clone()).ok())
            .unwrap_or(request.context),
        generated_at: meta
            .and_then(|m| m.get("generatedAt"))
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Utc::now),
        total_count: meta
            .and_then(|m| m.get("totalCount"))
            .and_then(Value::as_u64)
            .unwrap_or(listing_count as u64),
        page: meta
            .and_then(|m| m.get("page"))
            .and_then(Value::as_u64)
            .map(|p| p as u32)
            .unwrap_or(requested_page),
        has_more: meta
            .and_then(|m| m.get("hasMore"))
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

fn str_field(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn f64_field(raw: &Value, key: &str) -> f64 {
    raw.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn str_list_field(raw: &Value, key: &str) -> Vec<String> {
    raw.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request_for(context: RecommendationContext) -> EngineRequest {
        EngineRequest {
            context,
            user_id: Uuid::new_v4(),
            params: None,
        }
    }

    #[test]
    fn test_engine_request_wire_shape() {
        let user_id = Uuid::new_v4();
        let request = EngineRequest {
            context: RecommendationContext::AfterBooking,
            user_id,
            params: Some(RecommendationParams {
                exclude_seen: Some(true),
                ..Default::default()
            }),
        };

        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["context"], "after_booking");
        assert_eq!(wire["userId"], user_id.to_string());
        assert_eq!(wire["params"]["excludeSeen"], true);
    }

    #[test]
    fn test_normalize_page_rejects_non_array_listings() {
        let request = request_for(RecommendationContext::Fyp);

        for bad in [
            json!({"listings": {"0": {}}}),
            json!({"listings": "none"}),
            json!({"listings": 7}),
            json!({"listings": null}),
            json!({"results": []}),
        ] {
            let err = normalize_page(&request, bad).unwrap_err();
            assert!(
                matches!(err, AppError::MalformedGatewayResponse(_)),
                "expected shape violation"
            );
        }
    }

    #[test]
    fn test_normalize_page_accepts_empty_listings() {
        let request = request_for(RecommendationContext::Explore);
        let page = normalize_page(&request, json!({"listings": []})).unwrap();

        assert!(page.listings.is_empty());
        assert_eq!(page.metadata.context, RecommendationContext::Explore);
        assert_eq!(page.metadata.total_count, 0);
        assert_eq!(page.metadata.page, 1);
        assert!(!page.metadata.has_more);
    }

    #[test]
    fn test_normalize_card_full_payload() {
        let raw = json!({
            "targetId": "listing-42",
            "title": "Cliffside cabin",
            "description": "Two nights minimum",
            "images": ["a.jpg", "b.jpg"],
            "price": 180.5,
            "rating": {"average": 4.6, "count": 31},
            "location": {"lat": 59.91, "lng": 10.75},
            "amenities": ["sauna", "wifi"],
            "available": true,
            "ownerId": "host-9",
            "confidence": 0.93,
            "explanation": "Close to places you saved",
            "metadata": {"rank": 1}
        });

        let card = normalize_card(&raw);
        assert_eq!(card.target_id, "listing-42");
        assert_eq!(card.title, "Cliffside cabin");
        assert_eq!(card.images, vec!["a.jpg", "b.jpg"]);
        assert_eq!(card.price, 180.5);
        assert_eq!(card.rating.average, 4.6);
        assert_eq!(card.rating.count, 31);
        assert_eq!(card.location.lat, 59.91);
        assert_eq!(card.amenities, vec!["sauna", "wifi"]);
        assert!(card.available);
        assert_eq!(card.owner_id, "host-9");
        assert_eq!(card.confidence, Some(0.93));
        assert_eq!(
            card.explanation.as_deref(),
            Some("Close to places you saved")
        );
        assert_eq!(card.metadata.unwrap()["rank"], 1);
    }

    #[test]
    fn test_normalize_card_defaults_absent_fields() {
        let card = normalize_card(&json!({"id": "listing-7"}));

        assert_eq!(card.target_id, "listing-7");
        assert_eq!(card.title, "");
        assert_eq!(card.description, "");
        assert!(card.images.is_empty());
        assert_eq!(card.price, 0.0);
        assert_eq!(card.rating, RatingStats::default());
        assert_eq!(card.location, GeoPoint { lat: 0.0, lng: 0.0 });
        assert!(card.amenities.is_empty());
        assert!(!card.available);
        assert_eq!(card.owner_id, "");
        assert_eq!(card.confidence, None);
        assert_eq!(card.explanation, None);
        assert_eq!(card.metadata, None);
    }

    #[test]
    fn test_normalize_card_bare_number_rating() {
        let card = normalize_card(&json!({"targetId": "x", "rating": 3.5}));
        assert_eq!(card.rating.average, 3.5);
        assert_eq!(card.rating.count, 0);
    }

    #[test]
    fn test_normalize_meta_echoes_engine_fields() {
        let request = request_for(RecommendationContext::Fyp);
        let page = normalize_page(
            &request,
            json!({
                "listings": [{"targetId": "a"}],
                "metadata": {
                    "context": "trip",
                    "generatedAt": "2026-03-01T12:00:00Z",
                    "totalCount": 57,
                    "page": 3,
                    "hasMore": true
                }
            }),
        )
        .unwrap();

        assert_eq!(page.metadata.context, RecommendationContext::Trip);
        assert_eq!(page.metadata.total_count, 57);
        assert_eq!(page.metadata.page, 3);
        assert!(page.metadata.has_more);
        assert_eq!(
            page.metadata.generated_at.to_rfc3339(),
            "2026-03-01T12:00:00+00:00"
        );
    }

    #[test]
    fn test_normalize_meta_defaults_to_request_page() {
        let mut request = request_for(RecommendationContext::Explore);
        request.params = Some(RecommendationParams {
            page: Some(4),
            ..Default::default()
        });

        let page = normalize_page(
            &request,
            json!({"listings": [{"targetId": "a"}, {"targetId": "b"}]}),
        )
        .unwrap();

        assert_eq!(page.metadata.page, 4);
        assert_eq!(page.metadata.total_count, 2);
    }
}
