//! Filter AST: clauses, conditions and regex patterns

use std::collections::BTreeMap;
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::QueryError;

/// JSON object view of a stored record
pub type Document = Map<String, Value>;

pub const OR_KEY: &str = "$or";
pub const AND_KEY: &str = "$and";

const REGEX_KEY: &str = "$regex";
const OPTIONS_KEY: &str = "$options";
const SUPPORTED_REGEX_OPTIONS: &str = "imsx";

/// Regular expression with Mongo-style option letters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub source: String,
    pub options: String,
}

impl Pattern {
    pub fn new(source: impl Into<String>, options: impl Into<String>) -> Result<Self, QueryError> {
        let options = options.into();
        if let Some(bad) = options
            .chars()
            .find(|c| !SUPPORTED_REGEX_OPTIONS.contains(*c))
        {
            return Err(QueryError::UnsupportedRegexOption(bad));
        }
        Ok(Self {
            source: source.into(),
            options,
        })
    }

    /// Case-insensitive pattern, the shape produced by free-text search.
    pub fn case_insensitive(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            options: "i".to_string(),
        }
    }

    fn has(&self, flag: char) -> bool {
        self.options.contains(flag)
    }

    /// Pattern source with its options as an inline flag group, e.g. `(?i)tokyo`.
    pub fn inline(&self) -> String {
        if self.options.is_empty() {
            self.source.clone()
        } else {
            format!("(?{}){}", self.options, self.source)
        }
    }

    pub fn compile(&self) -> Result<Regex, QueryError> {
        RegexBuilder::new(&self.source)
            .case_insensitive(self.has('i'))
            .multi_line(self.has('m'))
            .dot_matches_new_line(self.has('s'))
            .ignore_whitespace(self.has('x'))
            .build()
            .map_err(|e| QueryError::InvalidPattern {
                pattern: self.source.clone(),
                reason: e.to_string(),
            })
    }
}

/// A single constraint on one field
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    Regex(Pattern),
}

/// Value stored under one top-level query key
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Conditions on a field, all of which must hold
    Field(Vec<Condition>),
    /// At least one branch must match
    Or(Vec<Query>),
    /// Every branch must match
    And(Vec<Query>),
}

/// Query: top-level keys are ANDed together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    clauses: BTreeMap<String, Clause>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{$or: branches}`
    pub fn any_of(branches: Vec<Query>) -> Self {
        let mut query = Self::new();
        query.clauses.insert(OR_KEY.to_string(), Clause::Or(branches));
        query
    }

    /// `{field: value}`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().with(field, Condition::Eq(value.into()))
    }

    /// Add (or replace) the conditions on `field` with a single condition.
    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.clauses
            .insert(field.into(), Clause::Field(vec![condition]));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn get(&self, key: &str) -> Option<&Clause> {
        self.clauses.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Clause)> {
        self.clauses.iter()
    }

    /// Shallow key-wise merge; keys of `other` replace ours.
    pub fn merge(mut self, other: Query) -> Query {
        self.clauses.extend(other.clauses);
        self
    }

    /// Parse a Mongo-style JSON filter.
    pub fn from_json(value: &Value) -> Result<Self, QueryError> {
        let Value::Object(map) = value else {
            return Err(QueryError::NotAnObject);
        };

        let mut query = Self::new();
        for (key, value) in map {
            let clause = match key.as_str() {
                OR_KEY => Clause::Or(parse_branches(key, value)?),
                AND_KEY => Clause::And(parse_branches(key, value)?),
                op if op.starts_with('$') => {
                    return Err(QueryError::UnsupportedOperator(op.to_string()))
                }
                _ => Clause::Field(parse_conditions(key, value)?),
            };
            query.clauses.insert(key.clone(), clause);
        }
        Ok(query)
    }

    /// Render back to the Mongo-style JSON shape.
    pub fn to_json(&self) -> Value {
        let map = self
            .clauses
            .iter()
            .map(|(key, clause)| {
                let value = match clause {
                    Clause::Or(branches) | Clause::And(branches) => {
                        Value::Array(branches.iter().map(Query::to_json).collect())
                    }
                    Clause::Field(conditions) => conditions_to_json(conditions),
                };
                (key.clone(), value)
            })
            .collect();
        Value::Object(map)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn parse_branches(key: &str, value: &Value) -> Result<Vec<Query>, QueryError> {
    match value {
        Value::Array(items) if !items.is_empty() => items.iter().map(Query::from_json).collect(),
        _ => Err(QueryError::ExpectedNonEmptyArray(key.to_string())),
    }
}

fn parse_conditions(field: &str, value: &Value) -> Result<Vec<Condition>, QueryError> {
    let Value::Object(ops) = value else {
        return Ok(vec![Condition::Eq(value.clone())]);
    };

    let operator_keys = ops.keys().filter(|k| k.starts_with('$')).count();
    if operator_keys == 0 {
        return Ok(vec![Condition::Eq(value.clone())]);
    }
    if operator_keys != ops.len() {
        return Err(QueryError::MixedOperators(field.to_string()));
    }

    let options = match ops.get(OPTIONS_KEY) {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(invalid_operand(field, OPTIONS_KEY)),
    };
    if ops.contains_key(OPTIONS_KEY) && !ops.contains_key(REGEX_KEY) {
        return Err(QueryError::OptionsWithoutRegex(field.to_string()));
    }

    let mut conditions = Vec::with_capacity(ops.len());
    for (op, operand) in ops {
        let condition = match op.as_str() {
            "$eq" => Condition::Eq(operand.clone()),
            "$ne" => Condition::Ne(operand.clone()),
            "$gt" => Condition::Gt(operand.clone()),
            "$gte" => Condition::Gte(operand.clone()),
            "$lt" => Condition::Lt(operand.clone()),
            "$lte" => Condition::Lte(operand.clone()),
            "$in" => Condition::In(expect_array(field, op, operand)?),
            "$nin" => Condition::Nin(expect_array(field, op, operand)?),
            "$exists" => Condition::Exists(truthy(operand).ok_or_else(|| invalid_operand(field, op))?),
            REGEX_KEY => {
                let Value::String(source) = operand else {
                    return Err(invalid_operand(field, op));
                };
                Condition::Regex(Pattern::new(source.clone(), options.clone())?)
            }
            OPTIONS_KEY => continue,
            other => return Err(QueryError::UnsupportedOperator(other.to_string())),
        };
        conditions.push(condition);
    }
    Ok(conditions)
}

fn expect_array(field: &str, op: &str, operand: &Value) -> Result<Vec<Value>, QueryError> {
    match operand {
        Value::Array(items) => Ok(items.clone()),
        _ => Err(invalid_operand(field, op)),
    }
}

fn truthy(operand: &Value) -> Option<bool> {
    match operand {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        _ => None,
    }
}

fn invalid_operand(field: &str, op: &str) -> QueryError {
    QueryError::InvalidOperand {
        field: field.to_string(),
        operator: op.to_string(),
    }
}

fn conditions_to_json(conditions: &[Condition]) -> Value {
    if let [Condition::Eq(value)] = conditions {
        if !value.is_object() {
            return value.clone();
        }
    }

    let mut ops = Map::new();
    for condition in conditions {
        match condition {
            Condition::Eq(v) => ops.insert("$eq".into(), v.clone()),
            Condition::Ne(v) => ops.insert("$ne".into(), v.clone()),
            Condition::Gt(v) => ops.insert("$gt".into(), v.clone()),
            Condition::Gte(v) => ops.insert("$gte".into(), v.clone()),
            Condition::Lt(v) => ops.insert("$lt".into(), v.clone()),
            Condition::Lte(v) => ops.insert("$lte".into(), v.clone()),
            Condition::In(vs) => ops.insert("$in".into(), Value::Array(vs.clone())),
            Condition::Nin(vs) => ops.insert("$nin".into(), Value::Array(vs.clone())),
            Condition::Exists(b) => ops.insert("$exists".into(), Value::Bool(*b)),
            Condition::Regex(p) => {
                if !p.options.is_empty() {
                    ops.insert(OPTIONS_KEY.into(), Value::String(p.options.clone()));
                }
                ops.insert(REGEX_KEY.into(), Value::String(p.source.clone()))
            }
        };
    }
    Value::Object(ops)
}
