use serde_json::{json, Map, Value};

/// A read filter rendered to the store's query DSL.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    MatchAll,
    /// Exact value equality.
    Term { field: String, value: Value },
    /// Equality against any of several values.
    Terms { field: String, values: Vec<Value> },
    /// Analyzed full-text match.
    Match { field: String, query: String },
    /// Field holds at least one non-null value.
    Exists { field: String },
    /// List field holds at least `min` values.
    MinListLength { field: String, min: usize },
    Bool(BoolSelector),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoolSelector {
    pub must: Vec<Selector>,
    pub must_not: Vec<Selector>,
    pub should: Vec<Selector>,
    pub minimum_should_match: Option<usize>,
}

impl Selector {
    pub fn all() -> Self {
        Selector::MatchAll
    }

    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Selector::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn terms<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Selector::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matching(field: impl Into<String>, query: impl Into<String>) -> Self {
        Selector::Match {
            field: field.into(),
            query: query.into(),
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Selector::Exists {
            field: field.into(),
        }
    }

    pub fn min_list_length(field: impl Into<String>, min: usize) -> Self {
        Selector::MinListLength {
            field: field.into(),
            min,
        }
    }

    /// Renders the `query` clause of a search, count or by-query request.
    pub fn to_query(&self) -> Value {
        match self {
            Selector::MatchAll => json!({ "match_all": {} }),
            Selector::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            Selector::Terms { field, values } => json!({ "terms": { field.as_str(): values } }),
            Selector::Match { field, query } => json!({ "match": { field.as_str(): query } }),
            Selector::Exists { field } => json!({ "exists": { "field": field } }),
            Selector::MinListLength { field, min } => json!({
                "script": {
                    "script": {
                        "source": "doc[params.field].size() >= params.min_count",
                        "params": { "field": field, "min_count": min }
                    }
                }
            }),
            Selector::Bool(clauses) => clauses.to_query(),
        }
    }
}

impl BoolSelector {
    #[must_use]
    pub fn must(mut self, selector: Selector) -> Self {
        self.must.push(selector);
        self
    }

    #[must_use]
    pub fn must_not(mut self, selector: Selector) -> Self {
        self.must_not.push(selector);
        self
    }

    #[must_use]
    pub fn should(mut self, selector: Selector) -> Self {
        self.should.push(selector);
        self
    }

    #[must_use]
    pub fn minimum_should_match(mut self, minimum: usize) -> Self {
        self.minimum_should_match = Some(minimum);
        self
    }

    /// Number of `should` clauses that must hold; the store requires one when
    /// nothing else constrains the match.
    pub fn required_should(&self) -> usize {
        match self.minimum_should_match {
            Some(minimum) => minimum,
            None if self.must.is_empty() && !self.should.is_empty() => 1,
            None => 0,
        }
    }

    fn to_query(&self) -> Value {
        let mut clauses = Map::new();
        for (name, group) in [
            ("must", &self.must),
            ("must_not", &self.must_not),
            ("should", &self.should),
        ] {
            if !group.is_empty() {
                clauses.insert(
                    name.to_string(),
                    Value::Array(group.iter().map(Selector::to_query).collect()),
                );
            }
        }
        if let Some(minimum) = self.minimum_should_match {
            clauses.insert("minimum_should_match".to_string(), json!(minimum));
        }

        json!({ "bool": clauses })
    }
}

impl From<BoolSelector> for Selector {
    fn from(clauses: BoolSelector) -> Self {
        Selector::Bool(clauses)
    }
}

impl Default for Selector {
    fn default() -> Self {
        Selector::MatchAll
    }
}
