//! Thin REST wrappers over the dashboard collections. All of them go through the
//! authenticated pipeline; payload shapes are defined by the backend.

use std::fmt::Display;

use serde_json::Value;

use crate::error::ClientResult;
use crate::request::ApiClient;

#[derive(Clone)]
pub struct Resource {
    client: ApiClient,
    path: String,
}

impl Resource {
    pub fn new(client: ApiClient, path: impl Into<String>) -> Self {
        Self { client, path: path.into().trim_end_matches('/').to_string() }
    }

    pub fn path(&self) -> &str { &self.path }

    fn item(&self, id: impl Display) -> String { format!("{}/{}", self.path, urlencoding::encode(&id.to_string())) }

    /// `GET /collection?k=v&...`
    pub async fn list(&self, query: &[(&str, &str)]) -> ClientResult<Value> {
        self.client.get(&with_query(&self.path, query)).await
    }

    pub async fn get(&self, id: impl Display) -> ClientResult<Value> { self.client.get(&self.item(id)).await }

    pub async fn create(&self, body: Value) -> ClientResult<Value> { self.client.post(&self.path, Some(body)).await }

    pub async fn update(&self, id: impl Display, body: Value) -> ClientResult<Value> {
        self.client.put(&self.item(id), body).await
    }

    pub async fn delete(&self, id: impl Display) -> ClientResult<Value> { self.client.delete(&self.item(id)).await }

    /// `POST /collection/{id}/{action}`, e.g. assigning a task or approving an invoice.
    pub async fn action(&self, id: impl Display, action: &str, body: Option<Value>) -> ClientResult<Value> {
        self.client.post(&format!("{}/{}", self.item(id), action), body).await
    }
}

pub fn with_query(path: &str, query: &[(&str, &str)]) -> String {
    if query.is_empty() { return path.to_string(); }
    let qs = query
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", path, qs)
}

/// The collections the dashboard pages work with.
#[derive(Clone)]
pub struct Resources {
    pub projects: Resource,
    pub batches: Resource,
    pub tasks: Resource,
    pub invoices: Resource,
    pub users: Resource,
}

impl Resources {
    pub fn new(client: &ApiClient) -> Self {
        Self {
            projects: Resource::new(client.clone(), "/api/projects"),
            batches: Resource::new(client.clone(), "/api/batches"),
            tasks: Resource::new(client.clone(), "/api/tasks"),
            invoices: Resource::new(client.clone(), "/api/invoices"),
            users: Resource::new(client.clone(), "/api/users"),
        }
    }
}
