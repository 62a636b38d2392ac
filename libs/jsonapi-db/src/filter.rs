//! Filter predicates and sort directives → SeaORM conditions and ordering.

use jsonapi::{FilterPredicate, Lookup, SortDir, SortDirective};
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr, Order, SimpleExpr},
    ColumnTrait, Condition, EntityTrait, Iterable, PrimaryKeyToColumn, QueryFilter, QueryOrder,
};
use tracing::debug;

use crate::fields::{Field, FieldMap};

/* ---------- LIKE helpers ---------- */

fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out
}

fn like(pattern: String) -> LikeExpr {
    LikeExpr::new(pattern).escape('\\')
}

fn like_contains(s: &str) -> LikeExpr {
    like(format!("%{}%", like_escape(s)))
}

fn like_starts(s: &str) -> LikeExpr {
    like(format!("{}%", like_escape(s)))
}

fn like_ends(s: &str) -> LikeExpr {
    like(format!("%{}", like_escape(s)))
}

fn lowered<E: EntityTrait>(f: &Field<E>) -> Expr {
    Expr::expr(Func::lower(Expr::col(f.col)))
}

/* ---------- predicate → Condition ---------- */

/// Compile one predicate; `None` when its field is not exposed or its
/// operand does not read as the field's kind.
pub fn predicate_to_condition<E>(p: &FilterPredicate, fmap: &FieldMap<E>) -> Option<SimpleExpr>
where
    E: EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    let Some(f) = fmap.get(&p.field) else {
        debug!(field = %p.field, "filter on unexposed field skipped");
        return None;
    };
    let col = f.col;

    if matches!(
        p.lookup,
        Lookup::IExact | Lookup::Contains | Lookup::IContains | Lookup::StartsWith | Lookup::EndsWith
    ) {
        if !f.kind.is_text() {
            debug!(field = %p.field, lookup = %p.lookup, "text lookup on non-text field skipped");
            return None;
        }
        let s = p.value.as_str();
        return Some(match p.lookup {
            Lookup::IExact => lowered(f).eq(s.to_lowercase()),
            Lookup::Contains => Expr::col(col).like(like_contains(s)),
            Lookup::IContains => lowered(f).like(like_contains(&s.to_lowercase())),
            Lookup::StartsWith => Expr::col(col).like(like_starts(s)),
            _ => Expr::col(col).like(like_ends(s)),
        });
    }

    let mut values = Vec::new();
    for raw in p.values() {
        let Some(v) = f.kind.coerce(raw) else {
            debug!(field = %p.field, value = raw, "operand does not match field kind");
            return None;
        };
        values.push(v);
    }
    if p.lookup == Lookup::In {
        return Some(Expr::col(col).is_in(values));
    }
    let v = values.into_iter().next()?;
    Some(match p.lookup {
        Lookup::Gt => Expr::col(col).gt(v),
        Lookup::Gte => Expr::col(col).gte(v),
        Lookup::Lt => Expr::col(col).lt(v),
        Lookup::Lte => Expr::col(col).lte(v),
        _ => Expr::col(col).eq(v),
    })
}

/// Conjunction of every compilable predicate.
pub fn filters_to_condition<E>(filters: &[FilterPredicate], fmap: &FieldMap<E>) -> Condition
where
    E: EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    filters
        .iter()
        .filter_map(|p| predicate_to_condition(p, fmap))
        .fold(Condition::all(), Condition::add)
}

/// Apply translated list parameters to a plain `Select<E>`.
pub trait QuerySpecExt<E: EntityTrait>: Sized {
    fn apply_filters(self, filters: &[FilterPredicate], fmap: &FieldMap<E>) -> Self;

    /// Order by the directive's field, then by primary key.
    fn apply_sort(self, sort: Option<&SortDirective>, fmap: &FieldMap<E>) -> Self;
}

impl<E> QuerySpecExt<E> for sea_orm::Select<E>
where
    E: EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    fn apply_filters(self, filters: &[FilterPredicate], fmap: &FieldMap<E>) -> Self {
        if filters.is_empty() {
            return self;
        }
        self.filter(filters_to_condition(filters, fmap))
    }

    fn apply_sort(self, sort: Option<&SortDirective>, fmap: &FieldMap<E>) -> Self {
        let mut query = self;
        if let Some(directive) = sort {
            match fmap.get(&directive.field) {
                Some(f) => {
                    let order = match directive.dir {
                        SortDir::Asc => Order::Asc,
                        SortDir::Desc => Order::Desc,
                    };
                    query = query.order_by(f.col, order);
                }
                None => debug!(field = %directive.field, "sort on unexposed field skipped"),
            }
        }
        for pk in E::PrimaryKey::iter() {
            query = query.order_by(pk.into_column(), Order::Asc);
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_escape_handles_wildcards() {
        assert_eq!(like_escape("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(like_escape("大阪"), "大阪");
    }
}
