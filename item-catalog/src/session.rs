//! Server side sessions holding flash messages and the deletion nonce.
//!
//! A session is addressed by a random id carried in the [`SESSION_COOKIE`] cookie. The data
//! itself never leaves the server.

use std::{num::NonZeroUsize, sync::Arc};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use data_encoding::{BASE64, BASE64URL_NOPAD};
use http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use lru::LruCache;
use parking_lot::Mutex;
use rand::RngCore;
use tracing::{debug, trace, warn};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "catalog_session";

/// Default number of sessions kept in memory.
pub const DEFAULT_SESSION_CAPACITY: usize = 10_000;

const SESSION_ID_LEN: usize = 32;
const NONCE_LEN: usize = 32;

#[derive(Debug, Default)]
struct SessionData {
    nonce: Option<String>,
    flashes: Vec<String>,
}

/// All live sessions, bounded in number.
///
/// When the capacity is reached the least recently used session is dropped.
#[derive(Debug, Clone)]
pub struct Sessions {
    inner: Arc<Mutex<LruCache<String, SessionData>>>,
}

impl Sessions {
    /// Create a session map holding at most `capacity` sessions.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Resolve the session named by `id`, or start a new one.
    ///
    /// The boolean is true if a new session was started and the cookie needs to be set.
    pub fn resume_or_start(&self, id: Option<&str>) -> (Session, bool) {
        let mut inner = self.inner.lock();
        if let Some(id) = id {
            if inner.get(id).is_some() {
                trace!("resumed session");
                return (self.session(id.to_string()), false);
            }
        }
        let id = random_token(SESSION_ID_LEN, &BASE64URL_NOPAD);
        if let Some((_, evicted)) = inner.push(id.clone(), SessionData::default()) {
            debug!(flashes = evicted.flashes.len(), "evicted session");
        }
        trace!("started session");
        (self.session(id), true)
    }

    fn session(&self, id: String) -> Session {
        Session {
            id,
            sessions: self.clone(),
        }
    }

    fn with_data<T>(&self, id: &str, f: impl FnOnce(&mut SessionData) -> T) -> T {
        let mut inner = self.inner.lock();
        // recreated if it was evicted while the request was running
        let data = inner.get_or_insert_mut(id.to_string(), SessionData::default);
        f(data)
    }
}

/// Handle to the session of the current request.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    sessions: Sessions,
}

impl Session {
    /// The session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Create a fresh nonce and remember it, replacing any earlier one.
    pub fn create_nonce(&self) -> String {
        let nonce = random_token(NONCE_LEN, &BASE64);
        self.sessions
            .with_data(&self.id, |data| data.nonce = Some(nonce.clone()));
        nonce
    }

    /// Check `provided` against the remembered nonce.
    ///
    /// A remembered nonce is forgotten on every call, whether the check passes or not.
    pub fn use_nonce(&self, provided: &str) -> bool {
        let Some(expected) = self.sessions.with_data(&self.id, |data| data.nonce.take()) else {
            return false;
        };
        if expected.is_empty() || provided.is_empty() {
            return false;
        }
        provided == expected
    }

    /// Queue a message to be shown on the next rendered page.
    pub fn flash(&self, message: impl Into<String>) {
        let message = message.into();
        self.sessions
            .with_data(&self.id, |data| data.flashes.push(message));
    }

    /// Take all queued messages.
    pub fn take_flashes(&self) -> Vec<String> {
        self.sessions
            .with_data(&self.id, |data| std::mem::take(&mut data.flashes))
    }
}

/// Middleware attaching a [`Session`] to every request.
///
/// Sets the session cookie on the response when a new session was started.
pub async fn session_middleware(
    State(sessions): State<Sessions>,
    mut req: Request,
    next: Next,
) -> Response {
    let cookie = session_cookie(req.headers());
    let (session, started) = sessions.resume_or_start(cookie.as_deref());
    req.extensions_mut().insert(session.clone());
    let mut response = next.run(req).await;
    if started {
        let cookie = format!(
            "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
            session.id()
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(err) => warn!(?err, "invalid session cookie"),
        }
    }
    response
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

fn random_token(len: usize, encoding: &data_encoding::Encoding) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    encoding.encode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Sessions::new(4).resume_or_start(None).0
    }

    #[test]
    fn nonce_roundtrip() {
        let session = session();
        let nonce = session.create_nonce();
        assert_eq!(BASE64.decode(nonce.as_bytes()).unwrap().len(), NONCE_LEN);
        assert!(session.use_nonce(&nonce));
        // single use
        assert!(!session.use_nonce(&nonce));
    }

    #[test]
    fn nonce_is_consumed_on_mismatch() {
        let session = session();
        let nonce = session.create_nonce();
        assert!(!session.use_nonce("garbage"));
        assert!(!session.use_nonce(&nonce));
    }

    #[test]
    fn empty_nonce_is_rejected() {
        let session = session();
        assert!(!session.use_nonce(""));
        session.create_nonce();
        assert!(!session.use_nonce(""));
    }

    #[test]
    fn new_nonce_replaces_old() {
        let session = session();
        let first = session.create_nonce();
        let second = session.create_nonce();
        assert_ne!(first, second);
        assert!(!session.use_nonce(&first));
        let third = session.create_nonce();
        assert!(session.use_nonce(&third));
    }

    #[test]
    fn flashes_are_drained() {
        let session = session();
        session.flash("one");
        session.flash("two");
        assert_eq!(session.take_flashes(), ["one", "two"]);
        assert!(session.take_flashes().is_empty());
    }

    #[test]
    fn sessions_are_resumed_by_id() {
        let sessions = Sessions::new(4);
        let (first, started) = sessions.resume_or_start(None);
        assert!(started);
        first.flash("hello");
        let (again, started) = sessions.resume_or_start(Some(first.id()));
        assert!(!started);
        assert_eq!(again.take_flashes(), ["hello"]);

        let (other, started) = sessions.resume_or_start(Some("unknown"));
        assert!(started);
        assert_ne!(other.id(), "unknown");
    }

    #[test]
    fn least_recently_used_session_is_evicted() {
        let sessions = Sessions::new(2);
        let (a, _) = sessions.resume_or_start(None);
        let (b, _) = sessions.resume_or_start(None);
        let (_c, _) = sessions.resume_or_start(None);
        assert!(!sessions.resume_or_start(Some(b.id())).1);
        assert!(sessions.resume_or_start(Some(a.id())).1);
    }

    #[test]
    fn cookie_header_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; catalog_session=abc-123; lang=en"),
        );
        assert_eq!(session_cookie(&headers).as_deref(), Some("abc-123"));
        assert_eq!(session_cookie(&HeaderMap::new()), None);
    }
}
