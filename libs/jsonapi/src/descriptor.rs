//! Static description of an exposed collection.

/// One output key and the record attribute it is read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub output: String,
    pub source: String,
}

impl FieldSpec {
    /// Output key equals the record attribute.
    pub fn plain(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            output: name.clone(),
            source: name,
        }
    }

    /// Output key aliases a differently named attribute.
    pub fn renamed(output: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            source: source.into(),
        }
    }
}

impl From<&str> for FieldSpec {
    fn from(name: &str) -> Self {
        Self::plain(name)
    }
}

impl From<(&str, &str)> for FieldSpec {
    fn from((output, source): (&str, &str)) -> Self {
        Self::renamed(output, source)
    }
}

/// A whitelisted filter: the query parameter name and the source expression
/// it compiles to (`field` or `field__lookup`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterSpec {
    pub param: String,
    pub source: String,
}

impl From<&str> for FilterSpec {
    fn from(name: &str) -> Self {
        Self {
            param: name.to_string(),
            source: name.to_string(),
        }
    }
}

impl From<(&str, &str)> for FilterSpec {
    fn from((param, source): (&str, &str)) -> Self {
        Self {
            param: param.to_string(),
            source: source.to_string(),
        }
    }
}

/// A whitelisted sort key: the alias accepted in `sort=` and the source field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderSpec {
    pub alias: String,
    pub source: String,
}

impl From<&str> for OrderSpec {
    fn from(name: &str) -> Self {
        Self {
            alias: name.to_string(),
            source: name.to_string(),
        }
    }
}

impl From<(&str, &str)> for OrderSpec {
    fn from((alias, source): (&str, &str)) -> Self {
        Self {
            alias: alias.to_string(),
            source: source.to_string(),
        }
    }
}

/// Name, projection and query whitelists of a resource.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    pub filters: Vec<FilterSpec>,
    pub order_fields: Vec<OrderSpec>,
}

impl ResourceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldSpec>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn filters<I, F>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FilterSpec>,
    {
        self.filters.extend(filters.into_iter().map(Into::into));
        self
    }

    pub fn order_fields<I, F>(mut self, order_fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<OrderSpec>,
    {
        self.order_fields
            .extend(order_fields.into_iter().map(Into::into));
        self
    }

    /// Find a filter by parameter name, falling back to the literal source
    /// expression.
    pub fn filter_for(&self, param: &str) -> Option<&FilterSpec> {
        self.filters
            .iter()
            .find(|f| f.param == param)
            .or_else(|| self.filters.iter().find(|f| f.source == param))
    }

    /// Find a sort key by alias, falling back to the literal source name.
    pub fn order_for(&self, key: &str) -> Option<&OrderSpec> {
        self.order_fields
            .iter()
            .find(|o| o.alias == key)
            .or_else(|| self.order_fields.iter().find(|o| o.source == key))
    }
}
