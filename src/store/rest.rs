//src/store/rest.rs
use super::{value_children, Error, KeyPath, TreeStore};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error};

/// Client for a remote JSON tree served over HTTP, where every node is
/// reachable at `{base_url}/{path}.json`.
///
/// `POST` creates a child under a server-generated id and answers
/// `{"name": "<id>"}`; `PATCH` merges fields; `DELETE` drops the subtree.
pub struct RestStore {
    http_client: Client,
    base_url: String,
    auth_token: Option<String>,
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http_client: Client::new(),
            base_url,
            auth_token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &KeyPath) -> String {
        format!("{}/{}.json", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, Error> {
        let response = self.authorize(request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            error!(%status, %body, "remote store request failed");
            return Err(Error::Remote {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

impl TreeStore for RestStore {
    async fn push(&self, parent: &KeyPath, value: Value) -> Result<String, Error> {
        let url = self.url(parent);
        debug!(%url, "POST");
        let response = self.send(self.http_client.post(&url).json(&value)).await?;
        let created: PushResponse = response.json().await?;
        // the id comes from the server; refuse anything we could not address
        parent.child(&created.name).map_err(|_| {
            Error::UnexpectedResponse(format!("server returned unusable id '{}'", created.name))
        })?;
        Ok(created.name)
    }

    async fn get(&self, path: &KeyPath) -> Result<Option<Value>, Error> {
        let url = self.url(path);
        debug!(%url, "GET");
        let value: Value = self.send(self.http_client.get(&url)).await?.json().await?;
        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }

    async fn children(&self, path: &KeyPath) -> Result<Vec<(String, Value)>, Error> {
        Ok(value_children(self.get(path).await?))
    }

    async fn update(&self, path: &KeyPath, fields: Map<String, Value>) -> Result<(), Error> {
        let url = self.url(path);
        debug!(%url, fields = fields.len(), "PATCH");
        self.send(self.http_client.patch(&url).json(&fields)).await?;
        Ok(())
    }

    async fn remove(&self, path: &KeyPath) -> Result<(), Error> {
        let url = self.url(path);
        debug!(%url, "DELETE");
        self.send(self.http_client.delete(&url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_urls_end_in_json() {
        let store = RestStore::new("https://journal.example.com/", None);
        let path = KeyPath::parse("exerciseHistory/e1/h1").unwrap();
        assert_eq!(
            store.url(&path),
            "https://journal.example.com/exerciseHistory/e1/h1.json"
        );
    }
}
