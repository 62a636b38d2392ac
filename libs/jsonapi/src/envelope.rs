use serde::Serialize;
use serde_json::{Map, Value};

use crate::provider::ExecutedQuery;

pub const META_KEY: &str = "meta";
pub const QUERIES_KEY: &str = "queries";

/// Pagination block of a list response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub total: u64,
    pub per_page: u64,
    pub page: u64,
}

impl PageMeta {
    pub fn into_map(self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("total".into(), self.total.into());
        m.insert("per_page".into(), self.per_page.into());
        m.insert("page".into(), self.page.into());
        m
    }
}

/// `{ <resource>: <payload>, meta?: {...} }`
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    resource: String,
    payload: Value,
    meta: Option<Map<String, Value>>,
}

impl Envelope {
    pub fn single(resource: impl Into<String>, item: Map<String, Value>) -> Self {
        Self {
            resource: resource.into(),
            payload: Value::Object(item),
            meta: None,
        }
    }

    pub fn many(resource: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            resource: resource.into(),
            payload: Value::Array(items),
            meta: None,
        }
    }

    /// Attach pagination, then static metadata (which may override it), then
    /// the query log when given.
    pub fn with_meta(
        mut self,
        page: PageMeta,
        extra: &Map<String, Value>,
        queries: Option<Vec<ExecutedQuery>>,
    ) -> Self {
        let mut meta = page.into_map();
        for (k, v) in extra {
            meta.insert(k.clone(), v.clone());
        }
        if let Some(queries) = queries {
            let rendered = serde_json::to_value(queries).unwrap_or(Value::Array(Vec::new()));
            meta.insert(QUERIES_KEY.into(), rendered);
        }
        self.meta = Some(meta);
        self
    }

    pub fn into_json(self) -> Value {
        let mut out = Map::new();
        out.insert(self.resource, self.payload);
        if let Some(meta) = self.meta {
            out.insert(META_KEY.into(), Value::Object(meta));
        }
        Value::Object(out)
    }
}
