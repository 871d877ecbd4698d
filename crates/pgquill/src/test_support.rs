//! Fake clients for unit tests.

use crate::client::{GenericClient, RowStream, StreamingClient};
use crate::error::{DbError, DbResult};
use crate::param::text_hint;
use futures_util::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// One statement received by a [`DummyClient`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub sql: String,
    pub params: Vec<Option<String>>,
}

/// Records every statement and answers with canned results.
///
/// `SELECT` statements sent through `execute` report `select_rows` rows (or
/// fail when it is `None`); other statements report one affected row unless
/// `fail_writes` is set. Row-returning calls yield no rows; streams yield a
/// single error when `fail_stream` is set. `open_streams` counts streams not
/// yet dropped.
#[derive(Clone)]
pub(crate) struct DummyClient {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub select_rows: Option<u64>,
    pub fail_writes: bool,
    pub fail_stream: bool,
    pub delay: Option<Duration>,
    pub open_streams: Arc<AtomicUsize>,
}

impl Default for DummyClient {
    fn default() -> Self {
        Self {
            calls: Arc::default(),
            select_rows: Some(0),
            fail_writes: false,
            fail_stream: false,
            delay: None,
            open_streams: Arc::default(),
        }
    }
}

impl DummyClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_rows(mut self, rows: Option<u64>) -> Self {
        self.select_rows = rows;
        self
    }

    pub fn fail_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn fail_stream(mut self) -> Self {
        self.fail_stream = true;
        self
    }

    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.sql).collect()
    }

    async fn record(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) {
        let call = Call {
            sql: sql.to_string(),
            params: params.iter().map(|p| text_hint(*p)).collect(),
        };
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl GenericClient for DummyClient {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<Vec<Row>> {
        self.record(sql, params).await;
        Ok(vec![])
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        self.record(sql, params).await;
        if sql.starts_with("SELECT") {
            return self
                .select_rows
                .ok_or_else(|| DbError::Other("lookup failed".to_string()));
        }
        if self.fail_writes {
            return Err(DbError::Other("write failed".to_string()));
        }
        Ok(1)
    }
}

impl StreamingClient for DummyClient {
    async fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<RowStream> {
        self.record(sql, params).await;
        let guard = OpenStream::new(self.open_streams.clone());
        let items: Vec<DbResult<Row>> = if self.fail_stream {
            vec![Err(DbError::Other("stream failed".to_string()))]
        } else {
            Vec::new()
        };
        Ok(RowStream::new(futures_util::stream::iter(items).map(
            move |item| {
                guard.hold();
                item
            },
        )))
    }
}

/// Tracks a live stream; decrements the counter when dropped.
struct OpenStream(Arc<AtomicUsize>);

impl OpenStream {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }

    fn hold(&self) {}
}

impl Drop for OpenStream {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) fn text(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|s| Some(s.to_string())).collect()
}
