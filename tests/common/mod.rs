#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use wayfare_api::{
    api::AppState,
    db::Cache,
    error::{AppError, AppResult},
    models::{EngineHint, InteractionEvent, PageMeta, Rating, RatingStats, RecommendationPage},
    services::{
        gateway::{EngineRequest, RecommendationEngine},
        stores::{EventStore, PreferenceLedger, RatingDraft, RatingStore, TagCatalog},
        InteractionRecorder, RatingReconciler, WeightPolicy,
    },
};

/// Event store over a plain Vec, append-only like the real one
#[derive(Default)]
pub struct InMemoryEventStore {
    events: Mutex<Vec<InteractionEvent>>,
}

impl InMemoryEventStore {
    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn events_for(&self, user_id: Uuid) -> Vec<InteractionEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: &InteractionEvent) -> AppResult<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn erase_user(&self, user_id: Uuid) -> AppResult<u64> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| e.user_id != user_id);
        Ok((before - events.len()) as u64)
    }
}

/// Ledger over a mutex-held map; each apply_delta call is atomic
#[derive(Default)]
pub struct InMemoryLedger {
    scores: Mutex<HashMap<(Uuid, String), f64>>,
    applied: Mutex<Vec<f64>>,
}

impl InMemoryLedger {
    pub fn score(&self, user_id: Uuid, tag: &str) -> f64 {
        *self
            .scores
            .lock()
            .unwrap()
            .get(&(user_id, tag.to_string()))
            .unwrap_or(&0.0)
    }

    /// Number of apply_delta calls that have landed
    pub fn applied_count(&self) -> usize {
        self.applied.lock().unwrap().len()
    }
}

#[async_trait]
impl PreferenceLedger for InMemoryLedger {
    async fn apply_delta(&self, user_id: Uuid, tags: &[String], delta: f64) -> AppResult<()> {
        {
            let mut scores = self.scores.lock().unwrap();
            for tag in tags {
                *scores.entry((user_id, tag.clone())).or_insert(0.0) += delta;
            }
        }
        self.applied.lock().unwrap().push(delta);
        Ok(())
    }

    async fn read(&self, user_id: Uuid) -> AppResult<HashMap<String, f64>> {
        Ok(self
            .scores
            .lock()
            .unwrap()
            .iter()
            .filter(|((u, _), _)| *u == user_id)
            .map(|((_, tag), score)| (tag.clone(), *score))
            .collect())
    }

    async fn erase_user(&self, user_id: Uuid) -> AppResult<u64> {
        let mut scores = self.scores.lock().unwrap();
        let before = scores.len();
        scores.retain(|(u, _), _| *u != user_id);
        Ok((before - scores.len()) as u64)
    }
}

/// Ledger whose writes always fail, for swallow-on-failure assertions
pub struct FailingLedger;

#[async_trait]
impl PreferenceLedger for FailingLedger {
    async fn apply_delta(&self, _user_id: Uuid, _tags: &[String], _delta: f64) -> AppResult<()> {
        Err(AppError::Persistence(sqlx::Error::PoolClosed))
    }

    async fn read(&self, _user_id: Uuid) -> AppResult<HashMap<String, f64>> {
        Ok(HashMap::new())
    }

    async fn erase_user(&self, _user_id: Uuid) -> AppResult<u64> {
        Ok(0)
    }
}

/// Rating store over a mutex-held map keyed by (user, target)
#[derive(Default)]
pub struct InMemoryRatingStore {
    rows: Mutex<HashMap<(Uuid, Uuid), Rating>>,
}

impl InMemoryRatingStore {
    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn value_of(&self, user_id: Uuid, target_id: Uuid) -> Option<i16> {
        self.rows
            .lock()
            .unwrap()
            .get(&(user_id, target_id))
            .map(|r| r.value)
    }
}

#[async_trait]
impl RatingStore for InMemoryRatingStore {
    async fn upsert(&self, draft: &RatingDraft) -> AppResult<Rating> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();

        let rating = rows
            .entry((draft.user_id, draft.target_id))
            .and_modify(|r| {
                r.value = draft.value;
                r.comment = draft.comment.clone();
                r.trip_id = draft.trip_id;
                r.updated_at = now;
            })
            .or_insert_with(|| Rating {
                id: Uuid::new_v4(),
                user_id: draft.user_id,
                target_id: draft.target_id,
                value: draft.value,
                comment: draft.comment.clone(),
                trip_id: draft.trip_id,
                created_at: now,
                updated_at: now,
            });

        Ok(rating.clone())
    }

    async fn stats_for(&self, target_id: Uuid) -> AppResult<RatingStats> {
        let rows = self.rows.lock().unwrap();
        let values: Vec<f64> = rows
            .values()
            .filter(|r| r.target_id == target_id)
            .map(|r| f64::from(r.value))
            .collect();

        if values.is_empty() {
            return Ok(RatingStats::default());
        }

        Ok(RatingStats {
            average: values.iter().sum::<f64>() / values.len() as f64,
            count: values.len() as i64,
        })
    }

    async fn find(&self, user_id: Uuid, target_id: Uuid) -> AppResult<Rating> {
        self.rows
            .lock()
            .unwrap()
            .get(&(user_id, target_id))
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "no rating for target {} by user {}",
                    target_id, user_id
                ))
            })
    }

    async fn erase_user(&self, user_id: Uuid) -> AppResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|(u, _), _| *u != user_id);
        Ok((before - rows.len()) as u64)
    }
}

/// Fixed target → tags catalog
pub struct StaticCatalog {
    tags: HashMap<Uuid, Vec<String>>,
}

impl StaticCatalog {
    pub fn new(entries: &[(Uuid, &[&str])]) -> Self {
        let tags = entries
            .iter()
            .map(|(id, tags)| (*id, tags.iter().map(|t| t.to_string()).collect()))
            .collect();
        Self { tags }
    }
}

#[async_trait]
impl TagCatalog for StaticCatalog {
    async fn tags_of(&self, target_id: Uuid) -> AppResult<Vec<String>> {
        self.tags
            .get(&target_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("target {} not in catalog", target_id)))
    }
}

/// Engine double: records hints, serves empty pages, optionally fails
pub struct RecordingEngine {
    hints: Mutex<Vec<EngineHint>>,
    fail_notify: bool,
    fail_recommend: bool,
}

impl RecordingEngine {
    pub fn new(fail_notify: bool, fail_recommend: bool) -> Self {
        Self {
            hints: Mutex::new(Vec::new()),
            fail_notify,
            fail_recommend,
        }
    }

    pub fn hint_count(&self) -> usize {
        self.hints.lock().unwrap().len()
    }
}

#[async_trait]
impl RecommendationEngine for RecordingEngine {
    async fn recommend(&self, request: &EngineRequest) -> AppResult<RecommendationPage> {
        if self.fail_recommend {
            return Err(AppError::GatewayUnavailable("engine offline".to_string()));
        }

        Ok(RecommendationPage {
            listings: vec![],
            metadata: PageMeta {
                context: request.context,
                generated_at: Utc::now(),
                total_count: 0,
                page: 1,
                has_more: false,
            },
        })
    }

    async fn notify(&self, hint: EngineHint) -> AppResult<()> {
        if self.fail_notify {
            return Err(AppError::GatewayUnavailable("engine offline".to_string()));
        }

        self.hints.lock().unwrap().push(hint);
        Ok(())
    }
}

#[derive(Default)]
pub struct HarnessOptions {
    pub fail_notify: bool,
    pub fail_recommend: bool,
}

/// Fully wired application over in-memory stores
pub struct Harness {
    pub state: AppState,
    pub events: Arc<InMemoryEventStore>,
    pub ledger: Arc<InMemoryLedger>,
    pub ratings: Arc<InMemoryRatingStore>,
    pub engine: Arc<RecordingEngine>,
}

pub fn harness(tags: &[(Uuid, &[&str])]) -> Harness {
    harness_with(tags, HarnessOptions::default())
}

pub fn harness_with(tags: &[(Uuid, &[&str])], options: HarnessOptions) -> Harness {
    let events = Arc::new(InMemoryEventStore::default());
    let ledger = Arc::new(InMemoryLedger::default());
    let ratings = Arc::new(InMemoryRatingStore::default());
    let catalog = Arc::new(StaticCatalog::new(tags));
    let engine = Arc::new(RecordingEngine::new(
        options.fail_notify,
        options.fail_recommend,
    ));

    let policy = WeightPolicy::new();
    let recorder = Arc::new(InteractionRecorder::new(
        Arc::clone(&events) as Arc<dyn EventStore>,
        Arc::clone(&ledger) as Arc<dyn PreferenceLedger>,
        Arc::clone(&catalog) as Arc<dyn TagCatalog>,
        Arc::clone(&engine) as Arc<dyn RecommendationEngine>,
        policy,
    ));
    let reconciler = Arc::new(RatingReconciler::new(
        Arc::clone(&ratings) as Arc<dyn RatingStore>,
        Arc::clone(&ledger) as Arc<dyn PreferenceLedger>,
        Arc::clone(&catalog) as Arc<dyn TagCatalog>,
        Arc::clone(&engine) as Arc<dyn RecommendationEngine>,
        policy,
    ));

    let state = AppState {
        recorder,
        reconciler,
        engine: Arc::clone(&engine) as Arc<dyn RecommendationEngine>,
        ledger: Arc::clone(&ledger) as Arc<dyn PreferenceLedger>,
        events: Arc::clone(&events) as Arc<dyn EventStore>,
        ratings: Arc::clone(&ratings) as Arc<dyn RatingStore>,
        cache: test_cache(),
    };

    Harness {
        state,
        events,
        ledger,
        ratings,
        engine,
    }
}

/// Cache handle pointing at nothing: reads fail and degrade to misses,
/// queued writes drain into the void. Must be created inside a runtime.
pub fn test_cache() -> Cache {
    let client = redis::Client::open("redis://127.0.0.1:1").unwrap();
    let (cache, _handle) = Cache::new(client);
    cache
}

/// Polls a condition until it holds, panicking after ~1s
pub async fn wait_for<F: Fn() -> bool>(condition: F, what: &str) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {}", what);
}
