//! Resource controllers: typed façades over the coordinated API client.
//!
//! Every call goes through [`RefreshCoordinator::execute`], so resources get
//! bearer attachment and refresh-and-retry without knowing about either.

pub mod analytics;
pub mod departments;
pub mod packages;
pub mod resellers;
pub mod subscriptions;
pub mod users;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;
use crate::refresh::RefreshCoordinator;
use crate::transport::{ApiRequest, ApiResponse};

/// Body of the member add/remove endpoints (`{"email": ...}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberEmail {
    pub email: String,
}

impl MemberEmail {
    pub fn new(email: impl Into<String>) -> Self {
        Self { email: email.into() }
    }
}

/// List responses arrive either bare or wrapped in a paginated envelope
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Plain(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Plain(items) => items,
            Listing::Paged { results } => results,
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    coordinator: Arc<RefreshCoordinator>,
}

impl ApiClient {
    pub fn new(coordinator: Arc<RefreshCoordinator>) -> Self {
        Self { coordinator }
    }

    pub async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        self.coordinator.execute(&request).await
    }

    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        Ok(self.send(request).await?.json()?)
    }

    pub async fn list<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<Vec<T>> {
        let listing: Listing<T> = self.fetch(request).await?;
        Ok(listing.into_vec())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.fetch(ApiRequest::get(path)).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        self.fetch(ApiRequest::post(path).with_json(body)?).await
    }

    /// POST whose response body is not needed
    pub async fn submit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ClientResult<()> {
        self.send(ApiRequest::post(path).with_json(body)?).await.map(|_| ())
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        self.fetch(ApiRequest::patch(path).with_json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        self.send(ApiRequest::delete(path)).await.map(|_| ())
    }

    /// DELETE with a JSON body, as the membership endpoints expect
    pub async fn delete_with<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ClientResult<()> {
        self.send(ApiRequest::delete(path).with_json(body)?).await.map(|_| ())
    }
}
