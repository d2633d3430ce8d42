//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::cache::{KeyValueStore, MemoryStore};
use crate::error::{Error, Result};
use crate::exchanges::AdapterContext;
use crate::model::MarketRegistry;
use crate::transport::{HttpRequest, Transport};

#[derive(Debug, Clone)]
enum Reply {
    Body(String),
    Timeout,
}

struct Route {
    url_fragment: String,
    replies: VecDeque<Reply>,
}

/// A [`Transport`] answering from canned bodies instead of the network.
///
/// Each request is matched against the routes in registration order by url
/// substring. A route's replies are consumed in order and its last reply
/// repeats. Unmatched requests fail with [`Error::Timeout`].
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers requests whose url contains `url_fragment` with `body`.
    pub fn route(self, url_fragment: &str, body: impl Into<String>) -> Self {
        self.push(url_fragment, Reply::Body(body.into()));
        self
    }

    /// Requests whose url contains `url_fragment` time out.
    pub fn route_timeout(self, url_fragment: &str) -> Self {
        self.push(url_fragment, Reply::Timeout);
        self
    }

    fn push(&self, url_fragment: &str, reply: Reply) {
        let mut routes = self.routes.lock().unwrap();
        match routes.iter_mut().find(|r| r.url_fragment == url_fragment) {
            Some(route) => route.replies.push_back(reply),
            None => routes.push(Route {
                url_fragment: url_fragment.to_string(),
                replies: VecDeque::from([reply]),
            }),
        }
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_matching(&self, url_fragment: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.contains(url_fragment))
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<String> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|r| url.contains(&r.url_fragment))
            .ok_or_else(|| Error::Timeout(format!("no scripted reply for {url}")))?;
        let reply = if route.replies.len() > 1 {
            route.replies.pop_front()
        } else {
            route.replies.front().cloned()
        };
        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Timeout) | None => Err(Error::Timeout(format!("scripted timeout for {url}"))),
        }
    }
}

/// Adapter collaborators backed by `transport` and a fresh in-memory store.
pub fn context(transport: &ScriptedTransport) -> (AdapterContext, MemoryStore) {
    let store = MemoryStore::new();
    let context = AdapterContext {
        market: Arc::new(MarketRegistry::new()),
        transport: Arc::new(transport.clone()),
        store: Arc::new(store.clone()) as Arc<dyn KeyValueStore>,
    };
    (context, store)
}
