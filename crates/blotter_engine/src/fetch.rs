use std::sync::{Mutex, MutexGuard, PoisonError};

use blotter_core::{BadResponse, FetchSettings};
use blotter_logging::{blotter_debug, blotter_trace};
use futures_util::future::try_join_all;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
pub use reqwest::Method;

use crate::decode::decode_body;
use crate::error::{FetchError, TransportKind};

/// Owner of the HTTP client shared by every request of a run.
///
/// The client only exists while at least one [`Session`] is alive. Nested
/// calls to [`Scraper::session`] hand out the client that is already open and
/// the outermost session closes it. One scraper serves one run at a time.
#[derive(Debug)]
pub struct Scraper {
    settings: FetchSettings,
    slot: Mutex<SessionSlot>,
}

#[derive(Debug, Default)]
struct SessionSlot {
    client: Option<reqwest::Client>,
    depth: usize,
    generation: u64,
}

impl Scraper {
    pub fn new(settings: FetchSettings) -> Self {
        Self {
            settings,
            slot: Mutex::new(SessionSlot::default()),
        }
    }

    /// Acquires the shared client, opening it if no session is active.
    pub fn session(&self) -> Result<Session<'_>, FetchError> {
        let mut slot = self.lock_slot();
        let client = match slot.client.clone() {
            Some(client) => client,
            None => {
                let client = self.build_client()?;
                slot.generation += 1;
                slot.client = Some(client.clone());
                blotter_debug!("Opened HTTP session #{}", slot.generation);
                client
            }
        };
        slot.depth += 1;
        blotter_trace!("HTTP session depth is now {}", slot.depth);
        Ok(Session {
            scraper: self,
            client,
            generation: slot.generation,
        })
    }

    pub fn is_open(&self) -> bool {
        self.lock_slot().client.is_some()
    }

    pub fn depth(&self) -> usize {
        self.lock_slot().depth
    }

    fn release(&self) {
        let mut slot = self.lock_slot();
        slot.depth = slot.depth.saturating_sub(1);
        if slot.depth == 0 && slot.client.take().is_some() {
            blotter_debug!("Closed HTTP session #{}", slot.generation);
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, SessionSlot> {
        // The slot holds no invariant a panicking holder could break halfway.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(
                self.settings.redirect_limit,
            ))
            .build()
            .map_err(|err| FetchError::Client(err.to_string()))
    }
}

/// Scoped handle on the shared client. Dropping it releases the client.
#[derive(Debug)]
pub struct Session<'a> {
    scraper: &'a Scraper,
    client: reqwest::Client,
    generation: u64,
}

impl Session<'_> {
    /// Identifies the underlying client; equal for nested sessions.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Issues one request and returns the decoded body.
    ///
    /// `GET` puts `params` in the query string, other methods send them as a
    /// urlencoded form. A status of 400 or above is a
    /// [`FetchError::BadResponse`]; everything else that goes wrong is a
    /// [`FetchError::Transport`].
    pub async fn fetch_one(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        let mut parsed = reqwest::Url::parse(url).map_err(|err| {
            FetchError::transport(&method, url, TransportKind::InvalidUrl, err.to_string())
        })?;

        let request = if method == Method::GET {
            if !params.is_empty() {
                parsed.query_pairs_mut().extend_pairs(params);
            }
            self.client.request(method.clone(), parsed)
        } else {
            let form = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params)
                .finish();
            self.client
                .request(method.clone(), parsed)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(form)
        };

        blotter_debug!("Issuing {} request to {}...", method, url);
        let response = request
            .send()
            .await
            .map_err(|err| map_reqwest_error(&method, url, err))?;

        let status = response.status();
        blotter_debug!("Got {} status from {}", status.as_u16(), url);
        if status.as_u16() >= 400 {
            return Err(BadResponse::new(method.as_str(), url, status.as_u16()).into());
        }

        let max_bytes = self.scraper.settings.max_bytes;
        if let Some(declared) = response.content_length() {
            if declared > max_bytes {
                return Err(too_large(&method, url, max_bytes, declared));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| map_reqwest_error(&method, url, err))?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(too_large(&method, url, max_bytes, next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        decode_body(&bytes, content_type.as_deref()).map_err(|err| {
            FetchError::transport(&method, url, TransportKind::Decode, err.to_string())
        })
    }

    pub async fn get(&self, url: &str) -> Result<String, FetchError> {
        self.fetch_one(Method::GET, url, &[]).await
    }

    /// Issues a `GET` for every URL at once.
    ///
    /// Outcomes line up with `urls` whatever order the responses arrive in.
    /// Error statuses are captured per URL; the first transport fault aborts
    /// the whole batch.
    pub async fn fetch_many<S: AsRef<str>>(
        &self,
        urls: &[S],
    ) -> Result<Vec<Result<String, BadResponse>>, FetchError> {
        let requests = urls.iter().map(|url| async move {
            match self.get(url.as_ref()).await {
                Ok(body) => Ok(Ok(body)),
                Err(FetchError::BadResponse(bad)) => Ok(Err(bad)),
                Err(err) => Err(err),
            }
        });
        try_join_all(requests).await
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.scraper.release();
    }
}

fn too_large(method: &Method, url: &str, max_bytes: u64, actual: u64) -> FetchError {
    FetchError::transport(
        method,
        url,
        TransportKind::TooLarge { max_bytes, actual },
        "response too large",
    )
}

fn map_reqwest_error(method: &Method, url: &str, err: reqwest::Error) -> FetchError {
    let kind = if err.is_timeout() {
        TransportKind::Timeout
    } else if err.is_redirect() {
        TransportKind::RedirectLimitExceeded
    } else {
        TransportKind::Network
    };
    FetchError::transport(method, url, kind, err.to_string())
}
