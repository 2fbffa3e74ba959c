// Query types and the two filter strategies.
//
// Server-side: clauses that the generated backend can evaluate are rendered
// into its `filter=field||op||value` query convention. Client-side: anything
// else falls back to fetching the collection and filtering in memory. The
// in-memory path only holds up at small collection sizes; it is a
// degradation path, not the design.

use serde::{Deserialize, Serialize};

/// Comparison operators for WHERE clauses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Equal (default).
    #[default]
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Value is in the given list.
    In,
    /// String contains substring.
    Contains,
    StartsWith,
    EndsWith,
}

impl Operator {
    /// The operator token used in the remote filter convention.
    pub fn remote_token(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::In => "in",
            Self::Contains => "cont",
            Self::StartsWith => "starts",
            Self::EndsWith => "ends",
        }
    }
}

/// Logical connector between WHERE clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connector {
    And,
    Or,
}

/// A single WHERE condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereClause {
    pub field: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub operator: Operator,
    /// Connector to the next clause. None means this is the last/only clause.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector: Option<Connector>,
}

impl WhereClause {
    /// Simple equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            operator: Operator::Eq,
            connector: None,
        }
    }

    pub fn and(mut self) -> Self {
        self.connector = Some(Connector::And);
        self
    }

    pub fn or(mut self) -> Self {
        self.connector = Some(Connector::Or);
        self
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Query parameters for `find_many`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindManyQuery {
    pub where_clauses: Vec<WhereClause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
}

// ─── Server-side filter rendering ────────────────────────────────

/// Render a clause as a `field||op||value` filter parameter, or `None` if
/// the value cannot be expressed in the remote convention.
pub fn filter_param(clause: &WhereClause) -> Option<String> {
    let value = match (&clause.operator, &clause.value) {
        (Operator::In, serde_json::Value::Array(items)) => {
            let parts: Option<Vec<String>> = items.iter().map(scalar_token).collect();
            parts?.join(",")
        }
        (_, v) => scalar_token(v)?,
    };
    Some(format!(
        "{}||{}||{}",
        clause.field,
        clause.operator.remote_token(),
        value
    ))
}

fn scalar_token(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Whether a set of clauses can run entirely server-side: every clause
/// renders, and the chain is a plain AND (the remote convention ANDs
/// repeated filter parameters).
pub fn server_side_filters(clauses: &[WhereClause]) -> Option<Vec<String>> {
    if clauses.is_empty() {
        return Some(Vec::new());
    }
    if clauses.iter().any(|c| c.connector == Some(Connector::Or)) {
        return None;
    }
    clauses.iter().map(filter_param).collect()
}

// ─── Client-side evaluation ──────────────────────────────────────

/// Check if a record matches a set of WHERE clauses.
pub fn matches_where(record: &serde_json::Value, clauses: &[WhereClause]) -> bool {
    if clauses.is_empty() {
        return true;
    }

    let mut result = true;
    let mut pending_or = false;

    for clause in clauses {
        let field_val = record
            .get(&clause.field)
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        let clause_match = match_operator(&field_val, &clause.value, &clause.operator);

        if pending_or {
            result = result || clause_match;
        } else {
            result = result && clause_match;
        }

        pending_or = matches!(clause.connector, Some(Connector::Or));
    }

    result
}

fn match_operator(
    field_val: &serde_json::Value,
    target: &serde_json::Value,
    op: &Operator,
) -> bool {
    match op {
        Operator::Eq => field_val == target,
        Operator::Ne => field_val != target,
        Operator::Lt => compare_json(field_val, target).is_some_and(|c| c < 0),
        Operator::Lte => compare_json(field_val, target).is_some_and(|c| c <= 0),
        Operator::Gt => compare_json(field_val, target).is_some_and(|c| c > 0),
        Operator::Gte => compare_json(field_val, target).is_some_and(|c| c >= 0),
        Operator::In => {
            if let serde_json::Value::Array(arr) = target {
                arr.contains(field_val)
            } else {
                false
            }
        }
        Operator::Contains => {
            let fs = field_val.as_str().unwrap_or("");
            let ts = target.as_str().unwrap_or("");
            fs.contains(ts)
        }
        Operator::StartsWith => {
            let fs = field_val.as_str().unwrap_or("");
            let ts = target.as_str().unwrap_or("");
            fs.starts_with(ts)
        }
        Operator::EndsWith => {
            let fs = field_val.as_str().unwrap_or("");
            let ts = target.as_str().unwrap_or("");
            fs.ends_with(ts)
        }
    }
}

/// Compare two JSON values numerically or lexicographically.
fn compare_json(a: &serde_json::Value, b: &serde_json::Value) -> Option<i8> {
    match (a, b) {
        (serde_json::Value::Number(an), serde_json::Value::Number(bn)) => {
            let af = an.as_f64()?;
            let bf = bn.as_f64()?;
            af.partial_cmp(&bf).map(ordering_to_i8)
        }
        (serde_json::Value::String(a_s), serde_json::Value::String(b_s)) => {
            Some(ordering_to_i8(a_s.cmp(b_s)))
        }
        _ => None,
    }
}

fn ordering_to_i8(o: std::cmp::Ordering) -> i8 {
    match o {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }
}

/// Apply sort, offset, and limit to a filtered record set in memory.
pub fn apply_page(records: &mut Vec<serde_json::Value>, query: &FindManyQuery) {
    if let Some(ref sort) = query.sort_by {
        records.sort_by(|a, b| {
            let av = a.get(&sort.field);
            let bv = b.get(&sort.field);
            let cmp = match (av, bv) {
                (Some(av), Some(bv)) => compare_json(av, bv).unwrap_or(0),
                (Some(_), None) => 1,
                (None, Some(_)) => -1,
                (None, None) => 0,
            };
            match sort.direction {
                SortDirection::Asc => cmp.cmp(&0),
                SortDirection::Desc => cmp.cmp(&0).reverse(),
            }
        });
    }

    if let Some(offset) = query.offset {
        if (offset as usize) < records.len() {
            *records = records.split_off(offset as usize);
        } else {
            records.clear();
        }
    }

    if let Some(limit) = query.limit {
        records.truncate(limit as usize);
    }
}
