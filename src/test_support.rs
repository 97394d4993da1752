//! Fakes shared by the unit tests

use crate::clock::Clock;
use crate::transport::{Transport, TransportError, TransportResponse};
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Responder = Box<dyn Fn(&str) -> TransportResponse + Send + Sync>;

/// Transport answering from a closure and counting calls
pub(crate) struct FakeTransport {
    responder: Responder,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> TransportResponse + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request with status 200 and `body`
    pub fn ok(body: &str) -> Self {
        let body = body.to_string();
        Self::new(move |_| TransportResponse {
            status: 200,
            body: body.clone(),
        })
    }

    /// Panics on any request
    pub fn unreachable() -> Self {
        Self::new(|url| panic!("Not meant to see this: {}", url))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn fetch(&self, url: &str) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        Ok((self.responder)(url))
    }
}

/// Clock that tests can move forward
pub(crate) struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn at_date(year: i32, month: u32, day: u32) -> Self {
        let now = chrono::NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .unwrap()
            .and_utc();
        Self(Mutex::new(now))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }
}

impl Clock for MutableClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Routes `tracing` output to the test harness; safe to call repeatedly
pub(crate) fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
