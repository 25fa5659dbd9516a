//! Client for the external content generator and submission scorer.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::debug;

use crate::state::{
    content::{Brief, Question},
    versus::Difficulty,
};

/// Failures of a generator or scorer call.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The request could not be sent or the connection dropped.
    #[error("generator request to `{endpoint}` failed")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// The generator answered with a non-success status.
    #[error("generator returned status {status} for `{endpoint}`")]
    Status { endpoint: String, status: StatusCode },
    /// The response body was not the expected JSON.
    #[error("failed to decode generator response from `{endpoint}`")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// The call did not finish within the configured bound.
    #[error("generator did not answer within {0:?}")]
    Timeout(Duration),
    /// The content decoded but cannot be played.
    #[error("generator returned unusable content: {0}")]
    Malformed(String),
    /// Scripted failure, used by test doubles.
    #[error("generator failure: {0}")]
    Other(String),
}

/// Parameters of a question-set request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    pub topic: String,
    pub difficulty: Difficulty,
    pub count: usize,
}

/// Parameters of a brief request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefRequest {
    pub topic: String,
    pub difficulty: Difficulty,
}

/// One submission handed to the scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub brief: Brief,
    pub answer: String,
    pub time_remaining: u32,
}

#[derive(Debug, Deserialize)]
struct QuestionsResponse {
    questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: u32,
}

/// External generator and scorer.
///
/// Implementations do not apply timeouts; the coordinator bounds every call.
pub trait ContentGenerator: Send + Sync {
    /// Fetch a question set.
    fn questions(
        &self,
        request: QuestionRequest,
    ) -> BoxFuture<'static, Result<Vec<Question>, GeneratorError>>;
    /// Fetch a deployment brief.
    fn brief(&self, request: BriefRequest) -> BoxFuture<'static, Result<Brief, GeneratorError>>;
    /// Score one submission.
    fn score(&self, request: ScoreRequest) -> BoxFuture<'static, Result<u32, GeneratorError>>;
}

/// [`ContentGenerator`] speaking JSON over HTTP: `POST {base}/questions`,
/// `POST {base}/brief` and `POST {base}/score`.
#[derive(Clone)]
pub struct HttpGenerator {
    client: Client,
    base_url: Arc<str>,
}

impl HttpGenerator {
    /// Build a client for the generator rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, GeneratorError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let endpoint = format!("{}/{}", self.base_url, path);
        debug!(%endpoint, "calling generator");

        let response = self
            .client
            .post(&endpoint)
            .json(body)
            .send()
            .await
            .map_err(|source| GeneratorError::Request {
                endpoint: endpoint.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(GeneratorError::Status {
                endpoint,
                status: response.status(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| GeneratorError::Decode { endpoint, source })
    }
}

impl ContentGenerator for HttpGenerator {
    fn questions(
        &self,
        request: QuestionRequest,
    ) -> BoxFuture<'static, Result<Vec<Question>, GeneratorError>> {
        let generator = self.clone();
        Box::pin(async move {
            let response: QuestionsResponse = generator.post("questions", &request).await?;
            Ok(response.questions)
        })
    }

    fn brief(&self, request: BriefRequest) -> BoxFuture<'static, Result<Brief, GeneratorError>> {
        let generator = self.clone();
        Box::pin(async move { generator.post("brief", &request).await })
    }

    fn score(&self, request: ScoreRequest) -> BoxFuture<'static, Result<u32, GeneratorError>> {
        let generator = self.clone();
        Box::pin(async move {
            let response: ScoreResponse = generator.post("score", &request).await?;
            Ok(response.score)
        })
    }
}
