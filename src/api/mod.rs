//! Typed HTTP access to the content API.
//!
//! One async function per endpoint, grouped by resource. Every function takes
//! an [`ApiContext`] and returns the decoded payload or an [`ApiError`].

use reqwest::{Client, Method, RequestBuilder, Response, multipart::Form};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;

use crate::error::{ApiError, ApiResult};

pub mod chat;
mod chunk;
pub mod items;
pub mod members;
pub mod memberships;
pub mod routes;
pub mod subscriptions;
pub mod tags;

pub use chunk::{chunked_request, into_partial, split_ids};
pub use routes::Route;

const DEFAULT_MAX_TARGETS: usize = 20;

/// Server-side caps on how many ids one request may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLimits {
    pub max_read_targets: usize,
    pub max_modify_targets: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_read_targets: DEFAULT_MAX_TARGETS,
            max_modify_targets: DEFAULT_MAX_TARGETS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApiContext {
    client: Client,
    base: Url,
    session: Option<String>,
    limits: RequestLimits,
}

impl ApiContext {
    pub fn new(client: Client, host: &Url, session: Option<String>, limits: RequestLimits) -> Self {
        let mut base = host.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self {
            client,
            base,
            session,
            limits,
        }
    }

    /// Context with a default transport, for scripts and tests.
    pub fn connect(host: &str, session: Option<String>) -> ApiResult<Self> {
        let host = Url::parse(host)?;
        let client = Self::default_client()?;
        Ok(Self::new(client, &host, session, RequestLimits::default()))
    }

    pub fn default_client() -> ApiResult<Client> {
        Ok(Client::builder().user_agent(Self::user_agent()).build()?)
    }

    pub fn user_agent() -> &'static str {
        concat!("tessera/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn limits(&self) -> RequestLimits {
        self.limits
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    pub fn set_session(&mut self, session: Option<String>) {
        self.session = session;
    }

    /// Fails before any request is built when no session is established.
    pub fn require_session(&self) -> ApiResult<&str> {
        self.session.as_deref().ok_or(ApiError::Unauthenticated)
    }

    pub fn url(&self, route: &Route) -> ApiResult<Url> {
        Ok(route.to_url(&self.base)?)
    }

    fn request(&self, method: Method, route: &Route) -> ApiResult<RequestBuilder> {
        let url = self.url(route)?;
        debug!(method = %method, url = %url, "Sending API request");
        let builder = self.client.request(method, url);
        Ok(match self.session.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, route: &Route) -> ApiResult<T> {
        let resp = self.request(Method::GET, route)?.send().await?;
        Self::handle(resp).await
    }

    pub async fn get_authed<T: DeserializeOwned>(&self, route: &Route) -> ApiResult<T> {
        self.require_session()?;
        self.get(route).await
    }

    /// GET returning the body as text; `None` on 404 or an empty body.
    pub async fn get_text(&self, route: &Route) -> ApiResult<Option<String>> {
        let resp = self.request(Method::GET, route)?.send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = Self::check(resp).await?;
        let text = resp.text().await?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    /// Authenticated request with an optional JSON body and a JSON reply.
    pub async fn send<B, T>(&self, method: Method, route: &Route, body: Option<&B>) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.require_session()?;
        let mut req = self.request(method, route)?;
        if let Some(body) = body {
            req = req.json(body);
        }
        Self::handle(req.send().await?).await
    }

    /// Authenticated request whose reply body is ignored.
    pub async fn send_unit<B>(&self, method: Method, route: &Route, body: Option<&B>) -> ApiResult<()>
    where
        B: Serialize + ?Sized,
    {
        self.require_session()?;
        let mut req = self.request(method, route)?;
        if let Some(body) = body {
            req = req.json(body);
        }
        Self::check(req.send().await?).await?;
        Ok(())
    }

    pub async fn send_multipart<T: DeserializeOwned>(&self, route: &Route, form: Form) -> ApiResult<T> {
        self.require_session()?;
        let resp = self
            .request(Method::POST, route)?
            .multipart(form)
            .send()
            .await?;
        Self::handle(resp).await
    }

    async fn check(resp: Response) -> ApiResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ApiError::server(status.as_u16(), body))
    }

    async fn handle<T: DeserializeOwned>(resp: Response) -> ApiResult<T> {
        let resp = Self::check(resp).await?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(ApiError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;

    use super::*;

    #[test]
    fn base_gets_trailing_slash() {
        let ctx = ApiContext::connect("https://api.example.org/v2", None).expect("ctx");
        assert_eq!(ctx.base().as_str(), "https://api.example.org/v2/");
        let url = ctx.url(&Route::new("items")).expect("url");
        assert_eq!(url.as_str(), "https://api.example.org/v2/items");
    }

    #[test]
    fn session_guard_rejects_anonymous_context() {
        let ctx = ApiContext::connect("https://api.example.org", None).expect("ctx");
        assert!(matches!(ctx.require_session(), Err(ApiError::Unauthenticated)));

        let ctx = ApiContext::connect("https://api.example.org", Some("t".into())).expect("ctx");
        assert_eq!(ctx.require_session().expect("session"), "t");
    }

    #[tokio::test]
    async fn non_success_status_becomes_server_error() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET").path("/items/broken");
            then.status(503).body("maintenance");
        });

        let ctx = ApiContext::connect(&server.base_url(), None).expect("ctx");
        let err = ctx
            .get::<serde_json::Value>(&Route::new("items/broken"))
            .await
            .expect_err("503 must fail");
        mock.assert();
        assert!(matches!(err, ApiError::Server { status: 503, ref body } if body == "maintenance"));
    }

    #[tokio::test]
    async fn bearer_token_is_attached_when_present() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET")
                .path("/members/current")
                .header("authorization", "Bearer secret");
            then.status(200)
                .header("content-type", "application/json")
                .body("{}");
        });

        let ctx = ApiContext::connect(&server.base_url(), Some("secret".into())).expect("ctx");
        let _: serde_json::Value = ctx
            .get_authed(&Route::new("members/current"))
            .await
            .expect("authed get");
        mock.assert();
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/items");
            then.status(200).body("not json");
        });

        let ctx = ApiContext::connect(&server.base_url(), None).expect("ctx");
        let err = ctx
            .get::<Vec<u32>>(&Route::new("items"))
            .await
            .expect_err("decode must fail");
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
