//! Production queue middleware trait and implementations.
//!
//! The external production machine accepts an assembly payload, answers
//! with a correlation id, and later reports completion through the
//! callback webhook.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::CorrelationId;
use domain::mapper::ProductionPayload;
use serde::Deserialize;

use crate::error::FulfillmentError;

/// Trait for the production queue middleware.
#[async_trait]
pub trait ProductionQueue: Send + Sync {
    /// Submits an assembly payload, returning the correlation id the
    /// machine will use in its completion callback.
    async fn submit(&self, payload: &ProductionPayload)
        -> Result<CorrelationId, FulfillmentError>;

    /// Queries the machine-side status of a previous submission.
    async fn query_status(&self, id: &CorrelationId) -> Result<String, FulfillmentError>;
}

#[derive(Debug, Default)]
struct InMemoryQueueState {
    submissions: HashMap<String, ProductionPayload>,
    next_id: u32,
    fail_on_submit: bool,
}

/// In-memory production queue for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductionQueue {
    state: Arc<RwLock<InMemoryQueueState>>,
}

impl InMemoryProductionQueue {
    /// Creates a new in-memory production queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the queue to fail submit calls.
    pub fn set_fail_on_submit(&self, fail: bool) {
        self.state.write().unwrap().fail_on_submit = fail;
    }

    /// Returns the number of accepted submissions.
    pub fn submission_count(&self) -> usize {
        self.state.read().unwrap().submissions.len()
    }

    /// Returns the payload accepted under the given correlation id.
    pub fn payload_for(&self, id: &CorrelationId) -> Option<ProductionPayload> {
        self.state.read().unwrap().submissions.get(id.as_str()).cloned()
    }
}

#[async_trait]
impl ProductionQueue for InMemoryProductionQueue {
    async fn submit(
        &self,
        payload: &ProductionPayload,
    ) -> Result<CorrelationId, FulfillmentError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_submit {
            return Err(FulfillmentError::ProductionQueue(
                "production machine unreachable".to_string(),
            ));
        }

        state.next_id += 1;
        let id = format!("PRD-{:04}", state.next_id);
        state.submissions.insert(id.clone(), payload.clone());

        Ok(CorrelationId::new(id))
    }

    async fn query_status(&self, id: &CorrelationId) -> Result<String, FulfillmentError> {
        let state = self.state.read().unwrap();
        if state.submissions.contains_key(id.as_str()) {
            Ok("QUEUED".to_string())
        } else {
            Err(FulfillmentError::ProductionQueue(format!(
                "unknown submission: {id}"
            )))
        }
    }
}

#[derive(Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: String,
}

/// HTTP-backed production queue client.
#[derive(Clone)]
pub struct HttpProductionQueue {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProductionQueue {
    /// Creates a client against the given middleware base URL.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ProductionQueue for HttpProductionQueue {
    async fn submit(
        &self,
        payload: &ProductionPayload,
    ) -> Result<CorrelationId, FulfillmentError> {
        let response = self
            .client
            .post(format!("{}/productions", self.base_url))
            .json(payload)
            .send()
            .await
            .map_err(|e| FulfillmentError::ProductionQueue(e.to_string()))?
            .error_for_status()
            .map_err(|e| FulfillmentError::ProductionQueue(e.to_string()))?;

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| FulfillmentError::ProductionQueue(e.to_string()))?;

        Ok(CorrelationId::new(body.id))
    }

    async fn query_status(&self, id: &CorrelationId) -> Result<String, FulfillmentError> {
        let response = self
            .client
            .get(format!("{}/productions/{}", self.base_url, id.as_str()))
            .send()
            .await
            .map_err(|e| FulfillmentError::ProductionQueue(e.to_string()))?
            .error_for_status()
            .map_err(|e| FulfillmentError::ProductionQueue(e.to_string()))?;

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| FulfillmentError::ProductionQueue(e.to_string()))?;

        Ok(body.status)
    }
}
