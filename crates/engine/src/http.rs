//! [`Remote`] over HTTP.
//!
//! Collection and item URLs are joined onto the configured API root; cursors
//! are requested exactly as the server minted them. Non-2xx answers become
//! [`EngineError`] kinds by status code.
use std::time::Duration;

use api_types::{Id, page::Paginated};
use async_trait::async_trait;
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    ResultEngine,
    error::EngineError,
    remote::{Collection, Cursor, ListQuery, Page, Remote},
};

/// [`Remote`] backed by the REST server.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpRemote {
    pub fn new(base_url: &str, timeout: Duration) -> ResultEngine<Self> {
        // `Url::join` drops the last segment unless the base ends with '/'.
        let mut raw = base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url = Url::parse(&raw)
            .map_err(|err| EngineError::Unknown(format!("invalid base_url: {err}")))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| EngineError::Unknown(format!("cannot build http client: {err}")))?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, collection: Collection) -> ResultEngine<Url> {
        self.base_url
            .join(collection.path())
            .map_err(|err| EngineError::Unknown(format!("invalid base_url: {err}")))
    }

    fn item(&self, collection: Collection, id: Id) -> ResultEngine<Url> {
        self.base_url
            .join(&format!("{}{id}/", collection.path()))
            .map_err(|err| EngineError::Unknown(format!("invalid base_url: {err}")))
    }
}

#[async_trait]
impl Remote for HttpRemote {
    async fn list(&self, collection: Collection, query: &ListQuery) -> ResultEngine<Page<Value>> {
        let request = match query {
            ListQuery::Cursor(cursor) => {
                let url = Url::parse(cursor.as_str()).map_err(|err| {
                    EngineError::Unknown(format!("cursor is not a valid url: {err}"))
                })?;
                self.http.get(url)
            }
            ListQuery::First { .. } => self
                .http
                .get(self.endpoint(collection)?)
                .query(&query.pairs()),
        };

        let res = request.send().await.map_err(transport)?;
        let page: Paginated<Value> = read_json(res, || collection.name().to_string()).await?;

        Ok(Page {
            items: page.results,
            next_cursor: page.next.map(Cursor::new),
            previous_cursor: page.previous.map(Cursor::new),
            total_count: page.count,
        })
    }

    async fn create(&self, collection: Collection, payload: Value) -> ResultEngine<Value> {
        let res = self
            .http
            .post(self.endpoint(collection)?)
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;

        read_json(res, || collection.name().to_string()).await
    }

    async fn update(&self, collection: Collection, id: Id, payload: Value) -> ResultEngine<Value> {
        let res = self
            .http
            .patch(self.item(collection, id)?)
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;

        read_json(res, || format!("{collection}/{id}")).await
    }

    async fn delete(&self, collection: Collection, id: Id) -> ResultEngine<()> {
        let res = self
            .http
            .delete(self.item(collection, id)?)
            .send()
            .await
            .map_err(transport)?;

        if res.status().is_success() {
            return Ok(());
        }
        Err(read_error(res, format!("{collection}/{id}")).await)
    }
}

async fn read_json<T: DeserializeOwned>(
    res: Response,
    target: impl FnOnce() -> String,
) -> ResultEngine<T> {
    if res.status().is_success() {
        return res
            .json::<T>()
            .await
            .map_err(|err| EngineError::Unknown(format!("unexpected response body: {err}")));
    }
    Err(read_error(res, target()).await)
}

async fn read_error(res: Response, target: String) -> EngineError {
    let status = res.status();
    let body = res
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    error_for_status(status, body, target)
}

fn error_for_status(status: StatusCode, body: String, target: String) -> EngineError {
    match status {
        StatusCode::NOT_FOUND => EngineError::NotFound(target),
        StatusCode::CONFLICT => {
            if body.trim().is_empty() {
                EngineError::Conflict(format!("{target} is still referenced"))
            } else {
                EngineError::Conflict(body)
            }
        }
        status => EngineError::transport(Some(status.as_u16()), body),
    }
}

fn transport(err: reqwest::Error) -> EngineError {
    EngineError::transport(err.status().map(|status| status.as_u16()), err.to_string())
}
