//! Past predictions of the signed-in user, fetched once per session and
//! extended locally afterwards.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use shared::{ErrorBody, HistoryItem};
use std::cell::RefCell;
use std::rc::Rc;

use crate::config::ClientConfig;
use crate::identity::{AuthError, Credential, CredentialSource};
use crate::listeners::{Listeners, Subscription};
use crate::prediction::{PredictionError, PredictionResult};
use crate::transport::{ApiRequest, HttpTransport, TransportError, endpoint};

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub id: String,
    pub recorded_at: DateTime<Utc>,
    pub result: PredictionResult,
}

impl HistoryRecord {
    /// Local record for a prediction made during this session.
    pub fn from_prediction(result: PredictionResult) -> Self {
        Self {
            id: format!("local-{}", uuid::Uuid::new_v4()),
            recorded_at: result.produced_at(),
            result,
        }
    }

    pub fn from_item(item: HistoryItem) -> Result<Self, HistoryFetchError> {
        let recorded_at = parse_date(&item.date).ok_or_else(|| {
            HistoryFetchError::Malformed(format!("record {} has date {:?}", item.id, item.date))
        })?;
        let result = PredictionResult::new(item.class, item.confidence, recorded_at).map_err(
            |e| match e {
                PredictionError::Malformed(reason) => {
                    HistoryFetchError::Malformed(format!("record {}: {}", item.id, reason))
                }
                other => HistoryFetchError::Malformed(other.to_string()),
            },
        )?;
        Ok(Self {
            id: item.id,
            recorded_at,
            result,
        })
    }
}

/// ISO-8601 with or without an offset; timestamps without one are UTC.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryFetchError {
    #[error("Could not obtain a credential: {0}")]
    Credential(#[from] AuthError),
    #[error("History service returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Malformed history: {0}")]
    Malformed(String),
}

impl HistoryFetchError {
    pub fn user_message(&self) -> String {
        "Failed to load prediction history.".to_string()
    }
}

pub struct HistoryClient<T> {
    transport: T,
    api_base_url: String,
}

impl<T: HttpTransport> HistoryClient<T> {
    pub fn new(config: &ClientConfig, transport: T) -> Self {
        Self {
            transport,
            api_base_url: config.api_base_url.clone(),
        }
    }

    /// `GET /history`, newest first.
    pub async fn fetch(&self, bearer: &Credential) -> Result<Vec<HistoryRecord>, HistoryFetchError> {
        let url = endpoint(&self.api_base_url, &["history"], &[])?;
        let response = self
            .transport
            .send(ApiRequest::get(url).bearer(bearer.as_str()))
            .await?;

        if !response.is_success() {
            let message = response
                .json::<ErrorBody>()
                .map(|body| body.error)
                .unwrap_or_else(|_| format!("HTTP {}", response.status));
            return Err(HistoryFetchError::Server {
                status: response.status,
                message,
            });
        }

        let items: Vec<HistoryItem> = response
            .json()
            .map_err(|e| HistoryFetchError::Malformed(e.to_string()))?;
        let mut records = items
            .into_iter()
            .map(HistoryRecord::from_item)
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(records)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FetchState {
    #[default]
    NotFetched,
    Fetching,
    Fetched,
    Failed(HistoryFetchError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySnapshot {
    pub state: FetchState,
    pub records: Rc<Vec<HistoryRecord>>,
}

#[derive(Default)]
struct Inner {
    snapshot: HistorySnapshot,
    /// Bumped by `reset`; fetches started under an older epoch are dropped.
    epoch: u64,
    /// Records prepended while a fetch is in flight, newest first. They are
    /// kept ahead of the server list when it lands.
    pending_local: Vec<HistoryRecord>,
}

pub struct HistoryStore<T> {
    client: HistoryClient<T>,
    inner: RefCell<Inner>,
    listeners: Listeners<HistorySnapshot>,
}

impl<T: HttpTransport> HistoryStore<T> {
    pub fn new(client: HistoryClient<T>) -> Self {
        Self {
            client,
            inner: RefCell::new(Inner::default()),
            listeners: Listeners::new(),
        }
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        self.inner.borrow().snapshot.clone()
    }

    pub fn state(&self) -> FetchState {
        self.inner.borrow().snapshot.state.clone()
    }

    pub fn records(&self) -> Rc<Vec<HistoryRecord>> {
        Rc::clone(&self.inner.borrow().snapshot.records)
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&HistorySnapshot) + 'static,
    {
        self.listeners.subscribe(listener)
    }

    /// Fetches only from `NotFetched`. Calls in any other state, including
    /// while a fetch is in flight, return immediately.
    pub async fn fetch_once(&self, credentials: &impl CredentialSource) {
        if self.state() != FetchState::NotFetched {
            log::debug!("History already requested; skipping fetch");
            return;
        }
        self.fetch(credentials).await;
    }

    /// The only way out of `Failed`.
    pub async fn retry(&self, credentials: &impl CredentialSource) {
        if !matches!(self.state(), FetchState::Failed(_)) {
            return;
        }
        log::info!("Retrying history fetch");
        self.fetch(credentials).await;
    }

    async fn fetch(&self, credentials: &impl CredentialSource) {
        let epoch = {
            let mut inner = self.inner.borrow_mut();
            inner.snapshot.state = FetchState::Fetching;
            inner.pending_local.clear();
            inner.epoch
        };
        self.publish();

        let outcome = match credentials.bearer().await {
            Ok(bearer) => self.client.fetch(&bearer).await,
            Err(e) => Err(HistoryFetchError::from(e)),
        };

        {
            let mut inner = self.inner.borrow_mut();
            if inner.epoch != epoch {
                log::debug!("Discarding history fetched for a previous session");
                return;
            }
            let pending = std::mem::take(&mut inner.pending_local);
            match outcome {
                Ok(records) => {
                    log::info!(
                        "Loaded {} history records ({} added locally meanwhile)",
                        records.len(),
                        pending.len()
                    );
                    let mut merged = pending;
                    merged.extend(records);
                    inner.snapshot.records = Rc::new(merged);
                    inner.snapshot.state = FetchState::Fetched;
                }
                Err(e) => {
                    log::error!("Failed to fetch history: {}", e);
                    inner.snapshot.state = FetchState::Failed(e);
                }
            }
        }
        self.publish();
    }

    /// Adds a fresh result at the head without touching the fetch state.
    pub fn prepend(&self, result: PredictionResult) {
        {
            let mut inner = self.inner.borrow_mut();
            let record = HistoryRecord::from_prediction(result);
            if inner.snapshot.state == FetchState::Fetching {
                inner.pending_local.insert(0, record.clone());
            }
            Rc::make_mut(&mut inner.snapshot.records).insert(0, record);
        }
        self.publish();
    }

    /// Starts a new session lifetime: empty, not fetched.
    pub fn reset(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.epoch += 1;
            inner.snapshot = HistorySnapshot::default();
            inner.pending_local.clear();
        }
        self.publish();
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.listeners.notify(&snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTransport, StaticCredential};
    use futures::executor::{LocalPool, block_on};
    use futures::task::LocalSpawnExt;
    use std::cell::Cell;

    type Store = HistoryStore<Rc<FakeTransport>>;

    fn store() -> (Rc<FakeTransport>, Rc<Store>) {
        let transport = Rc::new(FakeTransport::new());
        let config = ClientConfig {
            api_base_url: "http://api.test".to_string(),
            ..ClientConfig::default()
        };
        let store = HistoryStore::new(HistoryClient::new(&config, Rc::clone(&transport)));
        (transport, Rc::new(store))
    }

    fn result(class: &str, confidence: f64) -> PredictionResult {
        PredictionResult::new(class, confidence, Utc::now()).unwrap()
    }

    const TWO_ITEMS: &str = r#"[
        {"id": 1, "date": "2024-03-01T09:30:00", "class": "Mild", "confidence": "0.64"},
        {"id": "2", "date": "2024-05-12T14:00:00Z", "class": "No DR", "confidence": 0.98}
    ]"#;

    #[test]
    fn concurrent_fetches_hit_the_network_once() {
        let (transport, store) = store();
        let gate = transport.reply_when_opened(200, TWO_ITEMS);
        let credentials = Rc::new(StaticCredential::new("tok"));

        let mut pool = LocalPool::new();
        for _ in 0..3 {
            let store = Rc::clone(&store);
            let credentials = Rc::clone(&credentials);
            pool.spawner()
                .spawn_local(async move { store.fetch_once(&*credentials).await })
                .unwrap();
        }
        pool.run_until_stalled();
        assert_eq!(store.state(), FetchState::Fetching);
        assert_eq!(transport.call_count(), 1);

        gate.open();
        pool.run_until_stalled();
        assert_eq!(store.state(), FetchState::Fetched);
        assert_eq!(transport.call_count(), 1);
        assert_eq!(credentials.calls(), 1);

        let request = &transport.requests()[0];
        assert_eq!(request.url, "http://api.test/history");
        assert_eq!(request.bearer.as_deref(), Some("tok"));
    }

    #[test]
    fn fetched_history_is_never_refetched() {
        let (transport, store) = store();
        transport.reply(200, TWO_ITEMS);
        let credentials = StaticCredential::new("tok");

        block_on(store.fetch_once(&credentials));
        block_on(store.fetch_once(&credentials));
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn records_are_newest_first() {
        let (transport, store) = store();
        transport.reply(200, TWO_ITEMS);

        block_on(store.fetch_once(&StaticCredential::new("tok")));

        let records = store.records();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["2", "1"]);
        assert_eq!(records[1].result.confidence(), 0.64);
        assert_eq!(
            records[1].recorded_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn empty_history_is_fetched_not_failed() {
        let (transport, store) = store();
        transport.reply(200, "[]");

        block_on(store.fetch_once(&StaticCredential::new("tok")));

        assert_eq!(store.state(), FetchState::Fetched);
        assert!(store.records().is_empty());
    }

    #[test]
    fn failure_keeps_cached_entries_and_retry_recovers() {
        let (transport, store) = store();
        transport.reply(500, r#"{"error":"database down"}"#);
        transport.reply(200, TWO_ITEMS);
        let credentials = StaticCredential::new("tok");

        store.prepend(result("Severe", 0.81));
        block_on(store.fetch_once(&credentials));

        match store.state() {
            FetchState::Failed(e) => {
                assert_eq!(e.user_message(), "Failed to load prediction history.");
                assert!(e.to_string().contains("database down"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(store.records().len(), 1);

        // Failed is sticky for fetch_once.
        block_on(store.fetch_once(&credentials));
        assert_eq!(transport.call_count(), 1);

        block_on(store.retry(&credentials));
        assert_eq!(store.state(), FetchState::Fetched);
        assert_eq!(store.records().len(), 2);
        assert_eq!(transport.call_count(), 2);
    }

    #[test]
    fn retry_is_ignored_unless_failed() {
        let (transport, store) = store();
        block_on(store.retry(&StaticCredential::new("tok")));
        assert_eq!(store.state(), FetchState::NotFetched);
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn missing_credential_fails_without_network() {
        let (transport, store) = store();
        block_on(store.fetch_once(&StaticCredential::signed_out()));
        assert_eq!(
            store.state(),
            FetchState::Failed(HistoryFetchError::Credential(AuthError::NotSignedIn))
        );
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn malformed_item_fails_the_fetch() {
        let (transport, store) = store();
        transport.reply(
            200,
            r#"[{"id": 1, "date": "yesterday", "class": "Mild", "confidence": 0.5}]"#,
        );
        block_on(store.fetch_once(&StaticCredential::new("tok")));
        assert!(matches!(
            store.state(),
            FetchState::Failed(HistoryFetchError::Malformed(_))
        ));
    }

    #[test]
    fn prepend_puts_new_result_first_in_any_state() {
        let (transport, store) = store();
        transport.reply(200, TWO_ITEMS);
        block_on(store.fetch_once(&StaticCredential::new("tok")));

        store.prepend(result("Moderate", 0.73));

        let records = store.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].result.diagnosis_class(), "Moderate");
        assert_eq!(records[0].result.confidence(), 0.73);
        assert!(records[0].id.starts_with("local-"));
        assert_eq!(records[1].id, "2");
        assert_eq!(store.state(), FetchState::Fetched);
    }

    #[test]
    fn result_added_during_fetch_survives_completion() {
        let (transport, store) = store();
        let gate = transport.reply_when_opened(200, TWO_ITEMS);
        let credentials = Rc::new(StaticCredential::new("tok"));

        let mut pool = LocalPool::new();
        {
            let store = Rc::clone(&store);
            let credentials = Rc::clone(&credentials);
            pool.spawner()
                .spawn_local(async move { store.fetch_once(&*credentials).await })
                .unwrap();
        }
        pool.run_until_stalled();
        assert_eq!(store.state(), FetchState::Fetching);

        store.prepend(result("Moderate", 0.73));
        assert_eq!(store.records().len(), 1);

        gate.open();
        pool.run_until_stalled();

        assert_eq!(store.state(), FetchState::Fetched);
        let records = store.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].result.diagnosis_class(), "Moderate");
        assert!(records[0].id.starts_with("local-"));
        assert_eq!(records[1].id, "2");
        assert_eq!(records[2].id, "1");
    }

    #[test]
    fn stale_fetch_after_reset_is_dropped() {
        let (transport, store) = store();
        let gate = transport.reply_when_opened(200, TWO_ITEMS);
        let credentials = Rc::new(StaticCredential::new("tok"));

        let mut pool = LocalPool::new();
        {
            let store = Rc::clone(&store);
            let credentials = Rc::clone(&credentials);
            pool.spawner()
                .spawn_local(async move { store.fetch_once(&*credentials).await })
                .unwrap();
        }
        pool.run_until_stalled();

        store.reset();
        gate.open();
        pool.run_until_stalled();

        assert_eq!(store.state(), FetchState::NotFetched);
        assert!(store.records().is_empty());
    }

    #[test]
    fn listeners_see_each_transition() {
        let (transport, store) = store();
        transport.reply(200, "[]");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _subscription = store.subscribe(move |snapshot| sink.borrow_mut().push(snapshot.state.clone()));

        block_on(store.fetch_once(&StaticCredential::new("tok")));

        assert_eq!(*seen.borrow(), vec![FetchState::Fetching, FetchState::Fetched]);
    }

    #[test]
    fn dropped_subscription_stops_notifications() {
        let (_, store) = store();
        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        let subscription = store.subscribe(move |_| sink.set(sink.get() + 1));

        store.prepend(result("Mild", 0.5));
        drop(subscription);
        store.prepend(result("Mild", 0.5));

        assert_eq!(count.get(), 1);
    }
}
