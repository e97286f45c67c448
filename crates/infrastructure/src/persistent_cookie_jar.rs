use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use orderdesk_application::KeyValueStore;
use orderdesk_core::{AppError, AppResult};
use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Storage key holding the cookies received from the identity authority.
pub const REFRESH_COOKIES_STORAGE_KEY: &str = "refresh_cookies";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ReceivedCookie {
    set_cookie: String,
    origin: String,
}

#[derive(Default)]
struct JarState {
    jar: Jar,
    received: BTreeMap<String, ReceivedCookie>,
}

/// Cookie store for the HTTP client that can outlive the process.
///
/// Every `Set-Cookie` header is kept verbatim next to the URL it came from.
/// [`Self::persist`] writes them to the key/value store and
/// [`Self::restore`] replays them into a fresh jar, so the refresh cookie
/// survives between command invocations.
pub struct PersistentCookieJar {
    storage: Arc<dyn KeyValueStore>,
    state: RwLock<JarState>,
}

impl PersistentCookieJar {
    /// Creates an empty jar over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            state: RwLock::new(JarState::default()),
        }
    }

    /// Replaces the jar contents with the persisted cookies.
    ///
    /// An unreadable entry is discarded.
    pub async fn restore(&self) -> AppResult<usize> {
        let received = match self.storage.get(REFRESH_COOKIES_STORAGE_KEY).await? {
            Some(raw) => match serde_json::from_str::<BTreeMap<String, ReceivedCookie>>(&raw) {
                Ok(received) => received,
                Err(error) => {
                    warn!(error = %error, "discarding unreadable persisted cookies");
                    self.storage.remove(REFRESH_COOKIES_STORAGE_KEY).await?;
                    BTreeMap::new()
                }
            },
            None => BTreeMap::new(),
        };

        let jar = Jar::default();
        for cookie in received.values() {
            match Url::parse(cookie.origin.as_str()) {
                Ok(origin) => jar.add_cookie_str(cookie.set_cookie.as_str(), &origin),
                Err(error) => warn!(error = %error, "skipping cookie with invalid origin"),
            }
        }

        let restored = received.len();
        let mut state = self.write_state()?;
        *state = JarState { jar, received };
        Ok(restored)
    }

    /// Writes the received cookies to storage.
    pub async fn persist(&self) -> AppResult<()> {
        let received = {
            let state = self.read_state()?;
            state.received.clone()
        };
        if received.is_empty() {
            return self.storage.remove(REFRESH_COOKIES_STORAGE_KEY).await;
        }

        let encoded = serde_json::to_string(&received)
            .map_err(|error| AppError::Internal(format!("failed to encode cookies: {error}")))?;
        self.storage.set(REFRESH_COOKIES_STORAGE_KEY, encoded).await
    }

    /// Forgets every cookie in memory and in storage.
    pub async fn clear(&self) -> AppResult<()> {
        {
            let mut state = self.write_state()?;
            *state = JarState::default();
        }
        self.storage.remove(REFRESH_COOKIES_STORAGE_KEY).await
    }

    fn read_state(&self) -> AppResult<std::sync::RwLockReadGuard<'_, JarState>> {
        self.state
            .read()
            .map_err(|_| AppError::Internal("cookie jar lock poisoned".to_owned()))
    }

    fn write_state(&self) -> AppResult<std::sync::RwLockWriteGuard<'_, JarState>> {
        self.state
            .write()
            .map_err(|_| AppError::Internal("cookie jar lock poisoned".to_owned()))
    }
}

impl CookieStore for PersistentCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let headers = cookie_headers.cloned().collect::<Vec<_>>();
        let Ok(mut state) = self.write_state() else {
            warn!("dropping cookies received while the jar lock is poisoned");
            return;
        };

        state.jar.set_cookies(&mut headers.iter(), url);
        for header in &headers {
            let Some((name, set_cookie)) = header.to_str().ok().and_then(|raw| {
                cookie_name(raw).map(|name| (name.to_owned(), raw.to_owned()))
            }) else {
                continue;
            };

            state.received.insert(
                name,
                ReceivedCookie {
                    set_cookie,
                    origin: url.as_str().to_owned(),
                },
            );
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.read_state().ok()?.jar.cookies(url)
    }
}

fn cookie_name(set_cookie: &str) -> Option<&str> {
    let (name, _) = set_cookie.split_once('=')?;
    let name = name.trim();
    (!name.is_empty()).then_some(name)
}
