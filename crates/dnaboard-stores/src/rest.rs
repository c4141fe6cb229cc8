//! PostgREST-style HTTP store.
//!
//! Talks to a hosted Postgres behind PostgREST:
//!
//! - `POST /rest/v1/rpc/get_due_cards` with `{"p_class_id": ...}`
//! - `GET  /rest/v1/questions` with `in.(...)` / `eq.` filters
//! - `POST /rest/v1/dna_sessions` (upsert on `id`)
//! - `POST|GET /rest/v1/shared_boards`
//!
//! Every request carries the key both as `apikey` and as a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Response, Url};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::instrument;

use dnaboard_core::board::SlotOrigin;
use dnaboard_core::difficulty::Difficulty;
use dnaboard_core::error::StoreError;
use dnaboard_core::interval::Rating;
use dnaboard_core::model::{DueRecord, GeneratorRef, Item, ItemFilter};
use dnaboard_core::session::Session;
use dnaboard_core::share::{SharedBoard, SharedQuestion};
use dnaboard_core::traits::{QuestionPoolStore, SchedulingStore, ShareStore};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP store for a PostgREST backend.
pub struct RestStore {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for RestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStore")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .finish()
    }
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> anyhow::Result<Url> {
        let raw = format!("{}/rest/v1/{path}", self.base_url);
        let url = if params.is_empty() {
            Url::parse(&raw)?
        } else {
            Url::parse_with_params(&raw, params)?
        };
        Ok(url)
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn post(&self, url: Url) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> anyhow::Result<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::Timeout(DEFAULT_TIMEOUT_SECS)
            } else if e.is_connect() {
                StoreError::Unavailable(format!("store not reachable at {}", self.base_url))
            } else {
                StoreError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::AuthenticationFailed(message).into());
        }
        if status == 404 {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::NotFound(message).into());
        }
        if status >= 400 {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, message }.into());
        }
        Ok(response)
    }

    async fn json<T: for<'de> Deserialize<'de>>(response: Response) -> anyhow::Result<T> {
        response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(format!("failed to parse response: {e}")).into())
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Row ids may be integers or strings depending on the table.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Int(i64),
        Text(String),
    }
    Ok(match Id::deserialize(deserializer)? {
        Id::Int(n) => n.to_string(),
        Id::Text(s) => s,
    })
}

fn default_interval() -> u32 {
    1
}

#[derive(Deserialize)]
struct DueRow {
    #[serde(alias = "question_id", deserialize_with = "id_string")]
    id: String,
    topic: String,
    #[serde(default)]
    skill_name: Option<String>,
    #[serde(default)]
    difficulty: Option<Difficulty>,
    question_text: String,
    answer_text: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default = "default_interval", alias = "review_interval")]
    interval: u32,
    #[serde(default)]
    overdue_by: u32,
}

impl From<DueRow> for DueRecord {
    fn from(row: DueRow) -> Self {
        DueRecord {
            item_id: row.id,
            topic: row.topic,
            skill: row.skill_name,
            difficulty: row.difficulty.unwrap_or_default(),
            question: row.question_text,
            answer: row.answer_text,
            image: row.image,
            interval: row.interval,
            overdue_by: row.overdue_by,
        }
    }
}

#[derive(Deserialize)]
struct QuestionRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    topic: String,
    #[serde(default)]
    skill_name: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    difficulty: Option<Difficulty>,
    #[serde(default)]
    generator_strategy: Option<String>,
    #[serde(default)]
    generator_params: Option<serde_json::Value>,
}

impl QuestionRow {
    /// Rows without a registered strategy (e.g. legacy script rows) are
    /// not usable.
    fn into_item(self) -> Option<Item> {
        let Some(strategy) = self.generator_strategy else {
            tracing::warn!(id = %self.id, "question has no generator strategy, skipping");
            return None;
        };
        let params = self
            .generator_params
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
        Some(Item {
            id: self.id,
            domain: self.domain,
            topic: self.topic,
            skill: self.skill_name,
            difficulty: self.difficulty.unwrap_or_default(),
            generator: GeneratorRef::new(strategy, params),
        })
    }
}

#[derive(Serialize)]
struct SessionRow<'a> {
    id: String,
    date: DateTime<Utc>,
    class_id: &'a str,
    results: Vec<ResultRow<'a>>,
}

#[derive(Serialize)]
struct ResultRow<'a> {
    question_id: &'a str,
    topic: &'a str,
    skill_name: Option<&'a str>,
    difficulty: Difficulty,
    origin: SlotOrigin,
    question_text: &'a str,
    answer_text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    score: Option<Rating>,
    review_interval: u32,
}

impl<'a> From<&'a Session> for SessionRow<'a> {
    fn from(session: &'a Session) -> Self {
        SessionRow {
            id: session.id.to_string(),
            date: session.created_at,
            class_id: &session.group_id,
            results: session
                .results
                .iter()
                .map(|r| ResultRow {
                    question_id: &r.item_id,
                    topic: &r.topic,
                    skill_name: r.skill.as_deref(),
                    difficulty: r.difficulty,
                    origin: r.origin,
                    question_text: &r.question,
                    answer_text: &r.answer,
                    image: r.image.as_deref(),
                    score: r.rating,
                    review_interval: r.interval,
                })
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ShareConfig {
    created_at: DateTime<Utc>,
    class_name: String,
    questions: Vec<SharedRow>,
}

#[derive(Serialize, Deserialize)]
struct SharedRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    topic: String,
    #[serde(default)]
    skill_name: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    difficulty: Difficulty,
    question_text: String,
    answer_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    generator_strategy: String,
    #[serde(default)]
    generator_params: serde_json::Value,
}

impl From<&SharedBoard> for ShareConfig {
    fn from(board: &SharedBoard) -> Self {
        ShareConfig {
            created_at: board.created_at,
            class_name: board.name.clone(),
            questions: board
                .questions
                .iter()
                .map(|q| SharedRow {
                    id: q.item.id.clone(),
                    topic: q.item.topic.clone(),
                    skill_name: q.item.skill.clone(),
                    domain: q.item.domain.clone(),
                    difficulty: q.item.difficulty,
                    question_text: q.question.clone(),
                    answer_text: q.answer.clone(),
                    image: q.image.clone(),
                    generator_strategy: q.item.generator.strategy.clone(),
                    generator_params: q.item.generator.params.clone(),
                })
                .collect(),
        }
    }
}

impl From<ShareConfig> for SharedBoard {
    fn from(config: ShareConfig) -> Self {
        SharedBoard {
            name: config.class_name,
            created_at: config.created_at,
            questions: config
                .questions
                .into_iter()
                .map(|row| SharedQuestion {
                    item: Item {
                        id: row.id,
                        domain: row.domain,
                        topic: row.topic,
                        skill: row.skill_name,
                        difficulty: row.difficulty,
                        generator: GeneratorRef::new(row.generator_strategy, row.generator_params),
                    },
                    question: row.question_text,
                    answer: row.answer_text,
                    image: row.image,
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ShareInsert {
    config: ShareConfig,
}

#[derive(Deserialize)]
struct ShareRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    config: ShareConfig,
}

/// `in.("a","b")` with PostgREST quoting.
fn in_list<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    let quoted: Vec<String> = values
        .into_iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

/// Query parameters for a question filter.
fn filter_params(filter: &ItemFilter) -> Vec<(&'static str, String)> {
    let mut params = vec![("select", "*".to_string())];
    if !filter.topics.is_empty() {
        params.push(("topic", in_list(filter.topics.iter().map(String::as_str))));
    }
    if !filter.skills.is_empty() {
        params.push(("skill_name", in_list(filter.skills.iter().map(String::as_str))));
    }
    if let Some(domain) = &filter.domain {
        params.push(("domain", format!("eq.{domain}")));
    }
    if let Some(difficulty) = filter.difficulty {
        params.push(("difficulty", in_list(difficulty.encodings().iter().copied())));
    }
    params
}

// ---------------------------------------------------------------------------
// Store impls
// ---------------------------------------------------------------------------

#[async_trait]
impl SchedulingStore for RestStore {
    fn name(&self) -> &str {
        "rest"
    }

    #[instrument(skip(self))]
    async fn due_items(&self, group_id: &str) -> anyhow::Result<Vec<DueRecord>> {
        let url = self.url("rpc/get_due_cards", &[])?;
        let body = serde_json::json!({ "p_class_id": group_id });
        let response = self.send(self.post(url).json(&body)).await?;
        let rows: Vec<DueRow> = Self::json(response).await?;
        Ok(rows.into_iter().map(DueRecord::from).collect())
    }

    #[instrument(skip(self, session), fields(session = %session.id))]
    async fn record_session(&self, session: &Session) -> anyhow::Result<()> {
        let url = self.url("dna_sessions", &[("on_conflict", "id".to_string())])?;
        let row = SessionRow::from(session);
        let request = self
            .post(url)
            .header("Prefer", "resolution=ignore-duplicates,return=minimal")
            .json(&[row]);
        self.send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl QuestionPoolStore for RestStore {
    fn name(&self) -> &str {
        "rest"
    }

    #[instrument(skip(self, filter))]
    async fn query_items(&self, filter: &ItemFilter) -> anyhow::Result<Vec<Item>> {
        let url = self.url("questions", &filter_params(filter))?;
        let response = self.send(self.get(url)).await?;
        let rows: Vec<QuestionRow> = Self::json(response).await?;
        Ok(rows.into_iter().filter_map(QuestionRow::into_item).collect())
    }
}

#[async_trait]
impl ShareStore for RestStore {
    #[instrument(skip(self, board), fields(name = %board.name))]
    async fn publish(&self, board: &SharedBoard) -> anyhow::Result<String> {
        let url = self.url("shared_boards", &[("select", "id".to_string())])?;
        let insert = ShareInsert {
            config: ShareConfig::from(board),
        };
        let request = self
            .post(url)
            .header("Prefer", "return=representation")
            .json(&[insert]);
        let response = self.send(request).await?;

        #[derive(Deserialize)]
        struct Inserted {
            #[serde(deserialize_with = "id_string")]
            id: String,
        }
        let rows: Vec<Inserted> = Self::json(response).await?;
        rows.into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| StoreError::Malformed("insert returned no rows".into()).into())
    }

    #[instrument(skip(self))]
    async fn load(&self, id: &str) -> anyhow::Result<SharedBoard> {
        let url = self.url(
            "shared_boards",
            &[("select", "*".to_string()), ("id", format!("eq.{id}"))],
        )?;
        let response = self.send(self.get(url)).await?;
        let rows: Vec<ShareRow> = Self::json(response).await?;
        rows.into_iter()
            .next()
            .map(|row| SharedBoard::from(row.config))
            .ok_or_else(|| StoreError::NotFound(format!("shared board {id}")).into())
    }

    #[instrument(skip(self))]
    async fn list(&self) -> anyhow::Result<Vec<(String, SharedBoard)>> {
        let url = self.url(
            "shared_boards",
            &[
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
            ],
        )?;
        let response = self.send(self.get(url)).await?;
        let rows: Vec<ShareRow> = Self::json(response).await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.id, SharedBoard::from(row.config)))
            .collect())
    }
}
