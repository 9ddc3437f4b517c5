//! Evaluates query ASTs against in-memory documents

use std::cmp::Ordering;

use regex::Regex;
use serde_json::{Number, Value};

use crate::domain::query::{Clause, Condition, Document, Query};
use crate::domain::DomainResult;

/// A query with its regex patterns compiled, ready to test documents.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    clauses: Vec<CompiledClause>,
}

#[derive(Debug, Clone)]
enum CompiledClause {
    Field(String, Vec<Predicate>),
    Or(Vec<CompiledQuery>),
    And(Vec<CompiledQuery>),
}

#[derive(Debug, Clone)]
enum Predicate {
    Eq(Value),
    Ne(Value),
    Cmp(Value, fn(Ordering) -> bool),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    Regex(Regex),
}

impl CompiledQuery {
    pub fn compile(query: &Query) -> DomainResult<Self> {
        let clauses = query
            .iter()
            .map(|(key, clause)| -> DomainResult<CompiledClause> {
                Ok(match clause {
                    Clause::Field(conditions) => CompiledClause::Field(
                        key.clone(),
                        conditions.iter().map(Predicate::compile).collect::<DomainResult<_>>()?,
                    ),
                    Clause::Or(branches) => CompiledClause::Or(compile_all(branches)?),
                    Clause::And(branches) => CompiledClause::And(compile_all(branches)?),
                })
            })
            .collect::<DomainResult<_>>()?;
        Ok(Self { clauses })
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|clause| match clause {
            CompiledClause::Field(field, predicates) => {
                let value = doc.get(field);
                predicates.iter().all(|p| p.test(value))
            }
            CompiledClause::Or(branches) => branches.iter().any(|q| q.matches(doc)),
            CompiledClause::And(branches) => branches.iter().all(|q| q.matches(doc)),
        })
    }
}

fn compile_all(queries: &[Query]) -> DomainResult<Vec<CompiledQuery>> {
    queries.iter().map(CompiledQuery::compile).collect()
}

impl Predicate {
    fn compile(condition: &Condition) -> DomainResult<Self> {
        Ok(match condition {
            Condition::Eq(v) => Self::Eq(v.clone()),
            Condition::Ne(v) => Self::Ne(v.clone()),
            Condition::Gt(v) => Self::Cmp(v.clone(), Ordering::is_gt),
            Condition::Gte(v) => Self::Cmp(v.clone(), Ordering::is_ge),
            Condition::Lt(v) => Self::Cmp(v.clone(), Ordering::is_lt),
            Condition::Lte(v) => Self::Cmp(v.clone(), Ordering::is_le),
            Condition::In(vs) => Self::In(vs.clone()),
            Condition::Nin(vs) => Self::Nin(vs.clone()),
            Condition::Exists(b) => Self::Exists(*b),
            Condition::Regex(pattern) => Self::Regex(pattern.compile()?),
        })
    }

    fn test(&self, value: Option<&Value>) -> bool {
        match self {
            Self::Eq(expected) => values_equal(value, expected),
            Self::Ne(expected) => !values_equal(value, expected),
            Self::Cmp(bound, accept) => {
                let actual = value.unwrap_or(&Value::Null);
                type_rank(actual) == type_rank(bound) && accept(compare(actual, bound))
            }
            Self::In(candidates) => candidates.iter().any(|c| values_equal(value, c)),
            Self::Nin(candidates) => !candidates.iter().any(|c| values_equal(value, c)),
            Self::Exists(expected) => value.is_some() == *expected,
            Self::Regex(re) => matches!(value, Some(Value::String(s)) if re.is_match(s)),
        }
    }
}

/// Missing fields equal `null`; numbers compare by value.
fn values_equal(actual: Option<&Value>, expected: &Value) -> bool {
    let actual = actual.unwrap_or(&Value::Null);
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b) == Ordering::Equal,
        _ => actual == expected,
    }
}

/// Cross-type ordering rank: null, numbers, strings, objects, arrays, booleans.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => {
            let x = a.as_f64().unwrap_or(f64::NAN);
            let y = b.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
    }
}

/// Total order over JSON values, used for sorting and range conditions.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(l, r)| compare(l, r))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Sort key comparison where a missing field sorts like `null`.
pub fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    compare(a.unwrap_or(&Value::Null), b.unwrap_or(&Value::Null))
}
