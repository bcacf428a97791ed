// Copyright (c) Crawlwatch contributors

// SPDX-License-Identifier: MIT

//! Index Client: a thin blocking HTTP client over the index service's
//! capability contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::document::Document;
use crate::error::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A single hit returned by a path or field search.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    /// Remote document id.
    pub id: String,
    /// Document type (`file` or `directory`).
    #[serde(rename = "type")]
    pub kind: String,
}

/// Response envelope for path/field search.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResults {
    /// Number of matching documents.
    pub count: u64,
    /// The matching documents.
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// Blocking HTTP client for the index service.
///
/// Holds the bearer token (once obtained) and a fixed request timeout; every
/// method distinguishes connection-class failures (for which
/// [`crate::shipper`] retries) from HTTP-status failures (which are not
/// retried) by returning [`Error::Http`] for the former and
/// [`Error::IndexService`] for the latter.
pub struct IndexClient {
    http: reqwest::blocking::Client,
    base_url: String,
    token: Option<String>,
}

impl IndexClient {
    /// Creates a client for `base_url`, with an optional bearer token loaded
    /// from a prior [`IndexClient::load_auth_from_file`] call.
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base_url: base_url.into(),
            token,
        }
    }

    /// Returns whether a connection-class error is retriable under the
    /// Shipper's backoff policy (as opposed to a non-retriable HTTP status).
    #[must_use]
    pub fn is_connection_error(err: &Error) -> bool {
        matches!(err, Error::Http(e) if e.is_connect() || e.is_timeout())
    }

    /// Returns the bearer token currently held, if authenticated.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::blocking::RequestBuilder {
        let mut builder = self.http.request(method, url).timeout(REQUEST_TIMEOUT);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Looks up documents indexed at `path`.
    pub fn search_by_path(&self, endpoint: &str, path: &str) -> Result<SearchResults> {
        let url = format!("{endpoint}/search");
        let response = self
            .request(reqwest::Method::GET, &url)
            .query(&[("path", path)])
            .send()?;
        check_response(response)
    }

    /// Looks up documents by an arbitrary field, defaulting to `name`.
    pub fn search_by_field(&self, endpoint: &str, value: &str, field: &str) -> Result<SearchResults> {
        let url = format!("{endpoint}/search");
        let response = self
            .request(reqwest::Method::GET, &url)
            .query(&[(field, value)])
            .send()?;
        check_response(response)
    }

    /// Creates or updates a single document.
    pub fn create_document(&self, endpoint: &str, document: &Document) -> Result<()> {
        let response = self.request(reqwest::Method::POST, endpoint).json(document).send()?;
        check_response::<Value>(response).map(|_| ())
    }

    /// Submits a bulk batch of documents.
    ///
    /// A non-2xx status is a whole-batch rejection and surfaces as
    /// [`Error::IndexService`]. A 2xx response's body may still carry
    /// individual item failures as a per-item results array; that's the
    /// caller's concern, not this method's — the batch was accepted.
    pub fn create_document_bulk(&self, endpoint: &str, documents: &[Document]) -> Result<Value> {
        let url = format!("{endpoint}/bulk");
        let response = self.request(reqwest::Method::POST, &url).json(documents).send()?;
        check_response(response)
    }

    /// Deletes a document by remote id.
    pub fn delete_document(&self, endpoint: &str, id: &str) -> Result<()> {
        let url = format!("{endpoint}/{id}");
        let response = self.request(reqwest::Method::DELETE, &url).send()?;
        check_response::<Value>(response).map(|_| ())
    }

    /// Creates a location record, returning its remote id.
    pub fn create_location(&self, base_url: &str, name: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Body<'a> {
            name: &'a str,
        }
        #[derive(Deserialize)]
        struct Created {
            id: String,
        }
        let url = format!("{base_url}/locations");
        let response = self.request(reqwest::Method::POST, &url).json(&Body { name }).send()?;
        check_response::<Created>(response).map(|c| c.id)
    }

    /// Creates an agent record, returning its remote id.
    pub fn create_useragent(&self, base_url: &str, name: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Body<'a> {
            name: &'a str,
        }
        #[derive(Deserialize)]
        struct Created {
            id: String,
        }
        let url = format!("{base_url}/agents");
        let response = self.request(reqwest::Method::POST, &url).json(&Body { name }).send()?;
        check_response::<Created>(response).map(|c| c.id)
    }

    /// Returns the display name of the currently authenticated user.
    pub fn get_logged_in_user(&self, base_url: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct Me {
            username: String,
        }
        let url = format!("{base_url}/me");
        let response = self.request(reqwest::Method::GET, &url).send()?;
        check_response::<Me>(response).map(|m| m.username)
    }

    /// Authenticates with username/password, returning and storing a token.
    pub fn login(&mut self, base_url: &str, username: &str, password: &str) -> Result<String> {
        let url = format!("{base_url}/login");
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&LoginRequest { username, password })
            .send()?;
        let login: LoginResponse = check_response(response)?;
        self.token = Some(login.token.clone());
        Ok(login.token)
    }

    /// Returns just the HTTP status code for `url`, used for liveness
    /// checks.
    pub fn get_status_code(&self, url: &str) -> Result<u16> {
        let response = self.request(reqwest::Method::GET, url).send()?;
        Ok(response.status().as_u16())
    }

    /// Returns whether `collection/id` still resolves remotely, used by the
    /// Registrar to verify an id recorded in configuration hasn't been
    /// deleted out from under it.
    pub fn verify_exists(&self, base_url: &str, collection: &str, id: &str) -> Result<bool> {
        let url = format!("{base_url}/{collection}/{id}");
        Ok(self.get_status_code(&url)? == 200)
    }

    /// Looks up `collection` by `name`, returning the first match's id.
    pub fn find_by_name(&self, base_url: &str, collection: &str, name: &str) -> Result<Option<String>> {
        let url = format!("{base_url}/{collection}");
        let response = self.request(reqwest::Method::GET, &url).query(&[("name", name)]).send()?;
        let results: SearchResults = check_response(response)?;
        Ok(results.results.first().map(|hit| hit.id.clone()))
    }

    /// Creates a project record, returning its remote id and the endpoint
    /// to submit its documents to.
    pub fn create_project(&self, base_url: &str, name: &str) -> Result<(String, String)> {
        #[derive(Serialize)]
        struct Body<'a> {
            name: &'a str,
        }
        #[derive(Deserialize)]
        struct Created {
            id: String,
            endpoint: String,
        }
        let url = format!("{base_url}/projects");
        let response = self.request(reqwest::Method::POST, &url).json(&Body { name }).send()?;
        check_response::<Created>(response).map(|c| (c.id, c.endpoint))
    }

    /// Resolves an already-known project id to its document endpoint.
    pub fn get_project_endpoint(&self, base_url: &str, id: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct Project {
            endpoint: String,
        }
        let url = format!("{base_url}/projects/{id}");
        let response = self.request(reqwest::Method::GET, &url).send()?;
        check_response::<Project>(response).map(|p| p.endpoint)
    }
}

/// Checks an HTTP response for success, deserializing the body on success
/// and turning a non-2xx status into [`Error::IndexService`].
fn check_response<T>(response: reqwest::blocking::Response) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(Error::IndexService { status: status.as_u16(), body: truncate(&body) });
    }
    response.json().map_err(Error::Http)
}

fn truncate(body: &str) -> String {
    const MAX: usize = 500;
    if body.len() <= MAX {
        body.to_string()
    } else {
        format!("{}...", &body[..MAX])
    }
}
