//! Collection data provider port.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;

use crate::query::{FilterPredicate, PageRequest, SortDirective};
use crate::record::FieldSource;
use crate::validation::{CleanedData, FieldErrors};
use crate::value::RecordId;

/// Storage behind a resource.
///
/// `select` narrows and orders the collection without materializing it;
/// `count` and `paginate` run against that selection. Writes are atomic one
/// record at a time.
#[async_trait]
pub trait CollectionProvider: Send + Sync {
    type Record: FieldSource + Send + Sync;
    type Selection: Send;

    /// Filtered and ordered view of the collection. Predicates whose value
    /// cannot be read as the field's type are skipped.
    async fn select(
        &self,
        filters: &[FilterPredicate],
        sort: Option<&SortDirective>,
        log: &QueryLog,
    ) -> anyhow::Result<Self::Selection>;

    /// Number of records in the selection.
    async fn count(&self, selection: &Self::Selection, log: &QueryLog) -> anyhow::Result<u64>;

    /// Records of the selection inside the page window.
    async fn paginate(
        &self,
        selection: Self::Selection,
        page: &PageRequest,
        log: &QueryLog,
    ) -> anyhow::Result<Vec<Self::Record>>;

    async fn get_by_id(&self, id: RecordId) -> anyhow::Result<Option<Self::Record>>;

    /// Field errors for values that would collide with stored records or
    /// with `pending` items written ahead of `data` in the same request.
    /// `existing` is the record being updated. Nothing is written.
    async fn conflicts(
        &self,
        _data: &CleanedData,
        _pending: &[CleanedData],
        _existing: Option<&Self::Record>,
    ) -> anyhow::Result<FieldErrors> {
        Ok(FieldErrors::new())
    }

    /// Persist a new record; the provider assigns its identifier.
    async fn create(&self, data: CleanedData) -> anyhow::Result<Self::Record>;

    async fn update(&self, record: Self::Record, data: CleanedData)
        -> anyhow::Result<Self::Record>;

    async fn delete(&self, record: Self::Record) -> anyhow::Result<()>;
}

/// One storage operation executed while serving a request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExecutedQuery {
    pub sql: String,
    /// Elapsed seconds, three decimals.
    pub time: String,
}

/// Per-request record of storage operations, kept only in debug mode.
#[derive(Debug, Default)]
pub struct QueryLog {
    enabled: bool,
    entries: Mutex<Vec<ExecutedQuery>>,
}

impl QueryLog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record a statement. `sql` is only rendered when the log is enabled.
    pub fn record(&self, sql: impl FnOnce() -> String, elapsed: Duration) {
        if !self.enabled {
            return;
        }
        self.entries.lock().push(ExecutedQuery {
            sql: sql(),
            time: format!("{:.3}", elapsed.as_secs_f64()),
        });
    }

    pub fn entries(&self) -> Vec<ExecutedQuery> {
        self.entries.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_log_ignores_records() {
        let log = QueryLog::disabled();
        log.record(|| unreachable!("not rendered"), Duration::from_millis(1));
        assert!(log.entries().is_empty());
    }

    #[test]
    fn enabled_log_formats_time() {
        let log = QueryLog::new(true);
        log.record(|| "SELECT 1".to_string(), Duration::from_millis(1500));
        assert_eq!(
            log.entries(),
            vec![ExecutedQuery {
                sql: "SELECT 1".into(),
                time: "1.500".into()
            }]
        );
    }
}
