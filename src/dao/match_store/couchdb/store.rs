use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};

use crate::dao::{
    match_store::MatchStore,
    models::MatchEntity,
    storage::{StorageResult, WriteOutcome},
};

use super::{
    config::{CouchConfig, CouchCredentials},
    error::{CouchDaoError, CouchResult},
    models::{CouchMatchDocument, match_doc_id},
};

/// Outcome of a PUT against a document endpoint.
enum PutOutcome {
    Stored,
    Conflict,
}

/// [`MatchStore`] talking to CouchDB over its HTTP API.
#[derive(Clone)]
pub struct CouchMatchStore {
    client: Client,
    database_url: Arc<str>,
    credentials: Option<Arc<CouchCredentials>>,
}

impl CouchMatchStore {
    /// Build the HTTP client and create the match database if needed.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("versus-back/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            database_url: Arc::from(config.database_url()),
            credentials: config.credentials.map(Arc::new),
        };
        store.ensure_database().await?;
        Ok(store)
    }

    /// Request against the database itself (`doc_id = None`) or one document.
    fn request(&self, method: Method, doc_id: Option<&str>) -> (String, RequestBuilder) {
        let url = match doc_id {
            Some(doc_id) => format!("{}/{doc_id}", self.database_url),
            None => self.database_url.to_string(),
        };
        let builder = self.client.request(method, &url);
        let builder = match &self.credentials {
            Some(credentials) => {
                builder.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => builder,
        };
        (url, builder)
    }

    async fn send(&self, method: Method, doc_id: Option<&str>) -> CouchResult<(String, Response)> {
        let (url, builder) = self.request(method, doc_id);
        let response = builder
            .send()
            .await
            .map_err(|source| CouchDaoError::Transport {
                target: url.clone(),
                source,
            })?;
        Ok((url, response))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let (url, response) = self.send(Method::GET, None).await?;
        match response.status() {
            StatusCode::OK => return Ok(()),
            StatusCode::NOT_FOUND => {}
            status => return Err(CouchDaoError::UnexpectedStatus { target: url, status }),
        }

        let (url, created) = self.send(Method::PUT, None).await?;
        match created.status() {
            // 412: another instance created it first.
            status if status.is_success() || status == StatusCode::PRECONDITION_FAILED => Ok(()),
            status => Err(CouchDaoError::UnexpectedStatus { target: url, status }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let (url, response) = self.send(Method::GET, Some(doc_id)).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<T>()
                .await
                .map(Some)
                .map_err(|source| CouchDaoError::Decode {
                    target: url,
                    source,
                }),
            status => Err(CouchDaoError::UnexpectedStatus { target: url, status }),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<PutOutcome>
    where
        T: ?Sized + Serialize,
    {
        let (url, builder) = self.request(Method::PUT, Some(doc_id));
        let response = builder
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::Transport {
                target: url.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Ok(PutOutcome::Conflict),
            status if status.is_success() => Ok(PutOutcome::Stored),
            status => Err(CouchDaoError::UnexpectedStatus { target: url, status }),
        }
    }

    async fn insert_match(&self, entity: MatchEntity) -> CouchResult<()> {
        let code = entity.code.clone();
        let document = CouchMatchDocument::new(entity, None);
        match self.put_document(&document.id, &document).await? {
            PutOutcome::Stored => Ok(()),
            PutOutcome::Conflict => Err(CouchDaoError::DuplicateMatch { code }),
        }
    }

    /// Version check against the current revision, then a `_rev`-guarded PUT.
    /// A concurrent writer between the two steps makes CouchDB answer 409.
    async fn replace_match(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> CouchResult<WriteOutcome> {
        let doc_id = match_doc_id(&entity.code);
        let Some(current) = self.get_document::<CouchMatchDocument>(&doc_id).await? else {
            return Ok(WriteOutcome::Conflict);
        };
        if current.body.version != expected_version {
            return Ok(WriteOutcome::Conflict);
        }

        let document = CouchMatchDocument::new(entity, current.rev);
        Ok(match self.put_document(&doc_id, &document).await? {
            PutOutcome::Stored => WriteOutcome::Written,
            PutOutcome::Conflict => WriteOutcome::Conflict,
        })
    }
}

impl MatchStore for CouchMatchStore {
    fn backend_name(&self) -> &'static str {
        "couch"
    }

    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_match(entity).await.map_err(Into::into) })
    }

    fn find_match(&self, code: String) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = match_doc_id(&code);
            let maybe_doc = store.get_document::<CouchMatchDocument>(&doc_id).await?;
            Ok(maybe_doc.map(|doc| doc.body))
        })
    }

    fn replace_match(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_match(entity, expected_version)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let (url, response) = store.send(Method::GET, None).await?;
            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::UnexpectedStatus {
                    target: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
