//! Query-string translation: whitelisted filters, `sort`, `page`/`per_page`.

use std::fmt;
use std::ops::Range;

use crate::descriptor::ResourceDescriptor;

pub const SORT_PARAM: &str = "sort";
pub const PAGE_PARAM: &str = "page";
pub const PER_PAGE_PARAM: &str = "per_page";

/// Separator between a field and its lookup in a filter source expression.
pub const LOOKUP_SEPARATOR: &str = "__";

/// Comparison applied by a filter predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
    Exact,
    IExact,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    IContains,
    StartsWith,
    EndsWith,
    In,
}

impl Lookup {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "exact" => Self::Exact,
            "iexact" => Self::IExact,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "contains" => Self::Contains,
            "icontains" => Self::IContains,
            "startswith" => Self::StartsWith,
            "endswith" => Self::EndsWith,
            "in" => Self::In,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::IExact => "iexact",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Contains => "contains",
            Self::IContains => "icontains",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::In => "in",
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split `population__gte` into (`population`, `Gte`). An expression without a
/// known lookup suffix is an exact match on the whole name.
pub fn split_lookup(expr: &str) -> (&str, Lookup) {
    if let Some((field, suffix)) = expr.rsplit_once(LOOKUP_SEPARATOR) {
        if let Some(lookup) = Lookup::parse(suffix) {
            if !field.is_empty() {
                return (field, lookup);
            }
        }
    }
    (expr, Lookup::Exact)
}

/// A single filter predicate. The value stays raw text; providers coerce it
/// to the field's type and drop the predicate when that fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterPredicate {
    pub field: String,
    pub lookup: Lookup,
    pub value: String,
}

impl FilterPredicate {
    /// Values of an `in` lookup, comma separated.
    pub fn values(&self) -> Vec<&str> {
        match self.lookup {
            Lookup::In => self
                .value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect(),
            _ => vec![self.value.as_str()],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortDirective {
    pub field: String,
    pub dir: SortDir,
}

/// Requested page window; both numbers are at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Positions `[(page-1)*per_page, page*per_page)` clamped to `total`.
    pub fn window(&self, total: usize) -> Range<usize> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX).min(total);
        let len = usize::try_from(self.per_page).unwrap_or(usize::MAX);
        start..start.saturating_add(len).min(total)
    }
}

/// Raw query-string pairs in arrival order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Decode an `application/x-www-form-urlencoded` query string.
    pub fn parse(raw: &str) -> Self {
        Self(
            url::form_urlencoded::parse(raw.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        )
    }

    /// Last value given for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Source-agnostic description of a list request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuerySpec {
    pub filters: Vec<FilterPredicate>,
    pub sort: Option<SortDirective>,
    pub page: PageRequest,
}

fn positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok()).filter(|n| *n >= 1)
}

impl QuerySpec {
    /// Translate raw parameters against the descriptor's whitelists.
    ///
    /// Never fails: unknown parameters are ignored and unparsable paging
    /// values fall back to page 1 and `default_per_page`.
    pub fn translate(
        descriptor: &ResourceDescriptor,
        params: &QueryParams,
        default_per_page: u64,
    ) -> Self {
        let mut filters: Vec<FilterPredicate> = Vec::new();
        for (name, value) in params.iter() {
            let Some(spec) = descriptor.filter_for(name) else {
                continue;
            };
            let (field, lookup) = split_lookup(&spec.source);
            let predicate = FilterPredicate {
                field: field.to_string(),
                lookup,
                value: value.to_string(),
            };
            // a repeated parameter replaces the earlier value
            filters.retain(|p| !(p.field == predicate.field && p.lookup == predicate.lookup));
            filters.push(predicate);
        }

        let sort = params.get(SORT_PARAM).and_then(|raw| {
            let (key, dir) = match raw.strip_prefix('-') {
                Some(rest) => (rest, SortDir::Desc),
                None => (raw, SortDir::Asc),
            };
            descriptor.order_for(key).map(|o| SortDirective {
                field: o.source.clone(),
                dir,
            })
        });

        let page = PageRequest::new(
            positive(params.get(PAGE_PARAM)).unwrap_or(1),
            positive(params.get(PER_PAGE_PARAM)).unwrap_or(default_per_page),
        );

        Self {
            filters,
            sort,
            page,
        }
    }
}
