//! In-memory collection provider over plain mapping records.

use std::time::Instant;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::provider::{CollectionProvider, QueryLog};
use crate::query::{FilterPredicate, Lookup, PageRequest, SortDir, SortDirective};
use crate::record::{FieldSource, MemoryRecord};
use crate::validation::{CleanedData, ID_FIELD};
use crate::value::{json_serialize, FieldValue, RecordId};

/// Records held in a vector in insertion order.
///
/// Identifiers are assigned as the current maximum plus one.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    records: RwLock<Vec<MemoryRecord>>,
}

impl MemoryProvider {
    pub fn new(records: Vec<MemoryRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Load records from a JSON array of flat objects.
    pub fn from_json(data: &Value) -> anyhow::Result<Self> {
        let items = data
            .as_array()
            .ok_or_else(|| anyhow!("dataset must be a JSON array"))?;
        let records = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                MemoryRecord::from_json(item).with_context(|| format!("dataset item {i}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Vec<MemoryRecord> {
        self.records.read().clone()
    }

    fn next_id(records: &[MemoryRecord]) -> RecordId {
        records
            .iter()
            .filter_map(|r| r.record_id())
            .max()
            .unwrap_or(0)
            + 1
    }
}

/// The first non-null value of `field`, used to learn its kind.
fn sample<'a>(records: &'a [MemoryRecord], field: &str) -> Option<&'a FieldValue> {
    records
        .iter()
        .filter_map(|r| r.get(field))
        .find(|v| !v.is_null())
}

fn text_of(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Null => None,
        FieldValue::String(s) => Some(s.clone()),
        other => json_serialize(other).ok().map(|v| match v {
            Value::String(s) => s,
            v => v.to_string(),
        }),
    }
}

/// A predicate whose operand was read as the field's kind.
struct Compiled<'a> {
    predicate: &'a FilterPredicate,
    operands: Vec<FieldValue>,
}

fn compile<'a>(records: &[MemoryRecord], predicate: &'a FilterPredicate) -> Option<Compiled<'a>> {
    let Some(kind) = sample(records, &predicate.field) else {
        // nothing to compare against; text lookups still apply
        return Some(Compiled {
            predicate,
            operands: predicate
                .values()
                .into_iter()
                .map(|s| FieldValue::String(s.to_string()))
                .collect(),
        });
    };
    let text_lookup = matches!(
        predicate.lookup,
        Lookup::Contains | Lookup::IContains | Lookup::StartsWith | Lookup::EndsWith | Lookup::IExact
    );
    let operands = if text_lookup {
        vec![FieldValue::String(predicate.value.clone())]
    } else {
        predicate
            .values()
            .into_iter()
            .map(|raw| kind.parse_like(raw))
            .collect::<Option<Vec<_>>>()?
    };
    Some(Compiled {
        predicate,
        operands,
    })
}

impl Compiled<'_> {
    fn matches(&self, record: &MemoryRecord) -> bool {
        use std::cmp::Ordering::*;

        let Some(current) = record.get(&self.predicate.field) else {
            return false;
        };
        if current.is_null() {
            return false;
        }
        let Some(operand) = self.operands.first() else {
            return false;
        };
        let text = || text_of(current).unwrap_or_default();
        let needle = || text_of(operand).unwrap_or_default();
        match self.predicate.lookup {
            Lookup::Exact => current.sort_cmp(operand) == Equal,
            Lookup::IExact => text().to_lowercase() == needle().to_lowercase(),
            Lookup::Gt => current.sort_cmp(operand) == Greater,
            Lookup::Gte => current.sort_cmp(operand) != Less,
            Lookup::Lt => current.sort_cmp(operand) == Less,
            Lookup::Lte => current.sort_cmp(operand) != Greater,
            Lookup::Contains => text().contains(&needle()),
            Lookup::IContains => text().to_lowercase().contains(&needle().to_lowercase()),
            Lookup::StartsWith => text().starts_with(&needle()),
            Lookup::EndsWith => text().ends_with(&needle()),
            Lookup::In => self.operands.iter().any(|o| current.sort_cmp(o) == Equal),
        }
    }
}

#[async_trait]
impl CollectionProvider for MemoryProvider {
    type Record = MemoryRecord;
    type Selection = Vec<MemoryRecord>;

    async fn select(
        &self,
        filters: &[FilterPredicate],
        sort: Option<&SortDirective>,
        log: &QueryLog,
    ) -> anyhow::Result<Self::Selection> {
        let started = Instant::now();
        let records = self.records.read();

        let compiled: Vec<Compiled<'_>> = filters
            .iter()
            .filter_map(|p| {
                let c = compile(&records, p);
                if c.is_none() {
                    debug!(field = %p.field, lookup = %p.lookup, value = %p.value, "skipping uncoercible filter");
                }
                c
            })
            .collect();

        let mut selected: Vec<MemoryRecord> = records
            .iter()
            .filter(|r| compiled.iter().all(|c| c.matches(r)))
            .cloned()
            .collect();
        drop(records);

        if let Some(sort) = sort {
            let key = |r: &MemoryRecord| r.get(&sort.field).cloned().unwrap_or(FieldValue::Null);
            match sort.dir {
                SortDir::Asc => selected.sort_by(|a, b| key(a).sort_cmp(&key(b))),
                SortDir::Desc => selected.sort_by(|a, b| key(b).sort_cmp(&key(a))),
            }
        }

        log.record(
            || format!("memory scan: {} filters, sort {:?}", compiled.len(), sort),
            started.elapsed(),
        );
        Ok(selected)
    }

    async fn count(&self, selection: &Self::Selection, _log: &QueryLog) -> anyhow::Result<u64> {
        Ok(selection.len() as u64)
    }

    async fn paginate(
        &self,
        selection: Self::Selection,
        page: &PageRequest,
        _log: &QueryLog,
    ) -> anyhow::Result<Vec<Self::Record>> {
        let window = page.window(selection.len());
        Ok(selection
            .into_iter()
            .skip(window.start)
            .take(window.len())
            .collect())
    }

    async fn get_by_id(&self, id: RecordId) -> anyhow::Result<Option<Self::Record>> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|r| r.record_id() == Some(id))
            .cloned())
    }

    async fn create(&self, data: CleanedData) -> anyhow::Result<Self::Record> {
        let mut records = self.records.write();
        let id = Self::next_id(&records);
        let mut record = MemoryRecord::new();
        for (name, value) in data {
            record.set(name, value);
        }
        record.set(ID_FIELD, FieldValue::Int(id));
        records.push(record.clone());
        debug!(id, "memory record created");
        Ok(record)
    }

    async fn update(
        &self,
        record: Self::Record,
        data: CleanedData,
    ) -> anyhow::Result<Self::Record> {
        let id = record
            .record_id()
            .ok_or_else(|| anyhow!("record has no identifier"))?;
        let mut records = self.records.write();
        let stored = records
            .iter_mut()
            .find(|r| r.record_id() == Some(id))
            .ok_or_else(|| anyhow!("record {id} disappeared before update"))?;
        for (name, value) in data {
            if name == ID_FIELD {
                continue;
            }
            stored.set(name, value);
        }
        Ok(stored.clone())
    }

    async fn delete(&self, record: Self::Record) -> anyhow::Result<()> {
        let id = record
            .record_id()
            .ok_or_else(|| anyhow!("record has no identifier"))?;
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.record_id() != Some(id));
        if records.len() == before {
            return Err(anyhow!("record {id} disappeared before delete"));
        }
        Ok(())
    }
}
