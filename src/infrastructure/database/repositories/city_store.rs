//! SeaORM implementation of CityStore
//!
//! Query ASTs are translated to SQL conditions. Regex conditions use the
//! SQLite `REGEXP` operator, which `init_database` registers on every
//! connection. Projection is applied to the fetched rows.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sea_orm::sea_query::{BinOper, Expr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Value as DbValue,
};
use serde_json::Value;
use tracing::debug;

use crate::domain::city::{City, CityPatch, CityStore, ENTITY};
use crate::domain::query::{
    Clause, Condition as FieldCondition, Document, FindOptions, Pattern, Query, SortOrder,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::city::{self, ColumnKind};

const MAX_SQL_INT: u64 = i64::MAX as u64;

pub struct SeaOrmCityStore {
    db: DatabaseConnection,
}

impl SeaOrmCityStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn db_err(e: DbErr) -> DomainError {
    DomainError::Storage(format!("Database error: {}", e))
}

fn write_err(e: DbErr, name: &str) -> DomainError {
    if e.to_string().contains("UNIQUE") || e.to_string().contains("duplicate") {
        DomainError::duplicate_name(ENTITY, name)
    } else {
        db_err(e)
    }
}

// ── Query translation ───────────────────────────────────────────

fn constant(value: bool) -> SimpleExpr {
    Expr::cust(if value { "1 = 1" } else { "1 = 0" })
}

/// Translate a query AST into a SQL condition.
pub fn to_condition(query: &Query) -> DomainResult<Condition> {
    // An empty sub-condition would be dropped from an enclosing `any`
    if query.is_empty() {
        return Ok(Condition::all().add(constant(true)));
    }

    let mut all = Condition::all();
    for (key, clause) in query.iter() {
        all = match clause {
            Clause::Field(conditions) => {
                let mut field = Condition::all();
                for condition in conditions {
                    field = field.add(field_expr(key, condition)?);
                }
                all.add(field)
            }
            Clause::Or(branches) => {
                let mut any = Condition::any();
                for branch in branches {
                    any = any.add(to_condition(branch)?);
                }
                all.add(any)
            }
            Clause::And(branches) => {
                let mut every = Condition::all();
                for branch in branches {
                    every = every.add(to_condition(branch)?);
                }
                all.add(every)
            }
        };
    }
    Ok(all)
}

/// Bind a JSON operand for a column. `None` means the operand can never
/// equal a value of that column (type mismatch or null on a NOT NULL column).
fn bind(kind: ColumnKind, value: &Value) -> Option<DbValue> {
    match (kind, value) {
        (ColumnKind::Text, Value::String(s)) => Some(s.clone().into()),
        (ColumnKind::Integer, Value::Number(n)) => match n.as_i64() {
            Some(i) => Some(i.into()),
            None => n.as_f64().map(Into::into),
        },
        (ColumnKind::Real, Value::Number(n)) => n.as_f64().map(Into::into),
        (ColumnKind::Timestamp, Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| ts.with_timezone(&Utc).into()),
        _ => None,
    }
}

fn bind_all(kind: ColumnKind, values: &[Value]) -> Vec<DbValue> {
    values.iter().filter_map(|v| bind(kind, v)).collect()
}

/// Outcome of a condition on a field no column backs, which reads as null.
fn matches_missing(condition: &FieldCondition) -> bool {
    match condition {
        FieldCondition::Eq(v) | FieldCondition::Gte(v) | FieldCondition::Lte(v) => v.is_null(),
        FieldCondition::Ne(v) => !v.is_null(),
        FieldCondition::Gt(_) | FieldCondition::Lt(_) | FieldCondition::Regex(_) => false,
        FieldCondition::In(vs) => vs.iter().any(Value::is_null),
        FieldCondition::Nin(vs) => !vs.iter().any(Value::is_null),
        FieldCondition::Exists(expected) => !expected,
    }
}

fn regex_expr(column: city::Column, pattern: &Pattern) -> DomainResult<SimpleExpr> {
    pattern.compile()?;
    Ok(Expr::col(column).binary(BinOper::Custom("REGEXP"), Expr::val(pattern.inline())))
}

fn field_expr(field: &str, condition: &FieldCondition) -> DomainResult<SimpleExpr> {
    let Some(column) = city::Column::for_field(field) else {
        if let FieldCondition::Regex(pattern) = condition {
            pattern.compile()?;
        }
        return Ok(constant(matches_missing(condition)));
    };
    let kind = column.kind();

    Ok(match condition {
        FieldCondition::Eq(v) => bind(kind, v).map_or_else(|| constant(false), |x| column.eq(x)),
        FieldCondition::Ne(v) => bind(kind, v).map_or_else(|| constant(true), |x| column.ne(x)),
        FieldCondition::Gt(v) => bind(kind, v).map_or_else(|| constant(false), |x| column.gt(x)),
        FieldCondition::Gte(v) => bind(kind, v).map_or_else(|| constant(false), |x| column.gte(x)),
        FieldCondition::Lt(v) => bind(kind, v).map_or_else(|| constant(false), |x| column.lt(x)),
        FieldCondition::Lte(v) => bind(kind, v).map_or_else(|| constant(false), |x| column.lte(x)),
        FieldCondition::In(vs) => match bind_all(kind, vs) {
            bound if bound.is_empty() => constant(false),
            bound => column.is_in(bound),
        },
        FieldCondition::Nin(vs) => match bind_all(kind, vs) {
            bound if bound.is_empty() => constant(true),
            bound => column.is_not_in(bound),
        },
        FieldCondition::Exists(expected) => constant(*expected),
        FieldCondition::Regex(pattern) if kind == ColumnKind::Text => regex_expr(column, pattern)?,
        FieldCondition::Regex(pattern) => {
            pattern.compile()?;
            constant(false)
        }
    })
}

#[async_trait]
impl CityStore for SeaOrmCityStore {
    async fn insert(&self, city: City) -> DomainResult<City> {
        let name = city.name.clone();
        let active: city::ActiveModel = city.into();
        let model = active
            .insert(&self.db)
            .await
            .map_err(|e| write_err(e, &name))?;
        Ok(model.into())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<City>> {
        let model = city::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(Into::into))
    }

    async fn find_by_name(&self, name: &str) -> DomainResult<Option<City>> {
        let model = city::Entity::find()
            .filter(city::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(Into::into))
    }

    async fn update(&self, id: &str, patch: CityPatch) -> DomainResult<Option<City>> {
        let Some(mut current) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        current.apply(patch, Utc::now().trunc_subsecs(3));
        let name = current.name.clone();
        let active: city::ActiveModel = current.into();
        let model = active
            .update(&self.db)
            .await
            .map_err(|e| write_err(e, &name))?;
        Ok(Some(model.into()))
    }

    async fn delete(&self, id: &str) -> DomainResult<Option<City>> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let result = city::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok((result.rows_affected > 0).then_some(existing))
    }

    async fn count(&self, query: &Query) -> DomainResult<u64> {
        let condition = to_condition(query)?;
        city::Entity::find()
            .filter(condition)
            .count(&self.db)
            .await
            .map_err(db_err)
    }

    async fn find(&self, query: &Query, options: &FindOptions) -> DomainResult<Vec<Document>> {
        let mut select = city::Entity::find().filter(to_condition(query)?);

        if let Some(sort) = &options.sort {
            if let Some(column) = city::Column::for_field(&sort.field) {
                let order = match sort.order {
                    SortOrder::Asc => Order::Asc,
                    SortOrder::Desc => Order::Desc,
                };
                select = select.order_by(column, order);
            } else {
                debug!(field = %sort.field, "Sort field has no column, using natural order");
            }
        }
        // Natural order breaks ties
        select = select.order_by(Expr::cust("rowid"), Order::Asc);

        // SQLite binds OFFSET/LIMIT as signed 64-bit integers
        if options.skip > 0 {
            select = select.offset(options.skip.min(MAX_SQL_INT));
        }
        if options.limit > 0 {
            select = select.limit(options.limit.min(MAX_SQL_INT));
        }

        let models = select.all(&self.db).await.map_err(db_err)?;
        Ok(models
            .into_iter()
            .map(|m| {
                let doc = City::from(m).to_document();
                match &options.projection {
                    Some(projection) => projection.apply(doc),
                    None => doc,
                }
            })
            .collect())
    }

    async fn ping(&self) -> DomainResult<()> {
        self.db.ping().await.map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::application::{CityRepository, ListQuery};
    use crate::domain::query::{Projection, Sort};
    use crate::domain::NewCity;
    use crate::infrastructure::database::migrator::Migrator;
    use crate::infrastructure::database::{init_database, DatabaseConfig};
    use sea_orm_migration::MigratorTrait;
    use serde_json::json;

    async fn store() -> SeaOrmCityStore {
        let db = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let store = SeaOrmCityStore::new(db);
        let rows = [
            ("1", "Tokyo", 37_400_068, "Japan", 35.6895),
            ("2", "Osaka", 19_281_000, "Japan", 34.6937),
            ("3", "Paris", 11_017_000, "France", 48.8566),
            ("4", "Lyon", 42, "France", 45.764),
        ];
        for (id, name, population, country, latitude) in rows {
            let city = NewCity {
                name: name.into(),
                population,
                country: country.into(),
                latitude,
                longitude: 0.0,
            }
            .into_city(id.into(), Utc::now().trunc_subsecs(3));
            store.insert(city).await.unwrap();
        }
        store
    }

    fn names(docs: &[Document]) -> Vec<&str> {
        docs.iter()
            .filter_map(|d| d.get("name").and_then(Value::as_str))
            .collect()
    }

    async fn find_names(store: &SeaOrmCityStore, filter: Value) -> Vec<String> {
        let query = Query::from_json(&filter).unwrap();
        let options = FindOptions {
            sort: Some(Sort::new("name", SortOrder::Asc)),
            ..Default::default()
        };
        let docs = store.find(&query, &options).await.unwrap();
        names(&docs).into_iter().map(String::from).collect()
    }

    #[tokio::test]
    async fn round_trips_records() {
        let store = store().await;
        let tokyo = store.find_by_name("Tokyo").await.unwrap().unwrap();
        assert_eq!(tokyo.id, "1");
        assert_eq!(store.find_by_id("1").await.unwrap(), Some(tokyo));
        assert!(store.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unique_index_maps_to_duplicate_name() {
        let store = store().await;
        let dup = NewCity {
            name: "Tokyo".into(),
            population: 1,
            country: "X".into(),
            latitude: 0.0,
            longitude: 0.0,
        }
        .into_city("9".into(), Utc::now());
        assert!(matches!(
            store.insert(dup).await,
            Err(DomainError::DuplicateName { .. })
        ));

        let rename = CityPatch {
            name: Some("Paris".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.update("1", rename).await,
            Err(DomainError::DuplicateName { .. })
        ));
    }

    #[tokio::test]
    async fn translates_comparison_and_set_operators() {
        let store = store().await;
        assert_eq!(find_names(&store, json!({"country": "France"})).await, ["Lyon", "Paris"]);
        assert_eq!(
            find_names(&store, json!({"population": {"$gte": 11017000, "$lt": 20000000}})).await,
            ["Osaka", "Paris"]
        );
        assert_eq!(
            find_names(&store, json!({"name": {"$in": ["Lyon", "Tokyo", 5]}})).await,
            ["Lyon", "Tokyo"]
        );
        assert_eq!(
            find_names(&store, json!({"name": {"$nin": ["Lyon"]}, "country": {"$ne": "Japan"}})).await,
            ["Paris"]
        );
        assert_eq!(find_names(&store, json!({"population": "42"})).await, Vec::<String>::new());
    }

    #[tokio::test]
    async fn translates_regex_and_logical_operators() {
        let store = store().await;
        assert_eq!(
            find_names(&store, json!({"name": {"$regex": "^o", "$options": "i"}})).await,
            ["Osaka"]
        );
        assert_eq!(
            find_names(&store, json!({"$or": [{"name": "Lyon"}, {"population": 37400068}]})).await,
            ["Lyon", "Tokyo"]
        );
        assert_eq!(
            find_names(&store, json!({"$and": [{"country": "Japan"}, {"latitude": {"$lt": 35}}]})).await,
            ["Osaka"]
        );
    }

    #[tokio::test]
    async fn unknown_fields_read_as_missing() {
        let store = store().await;
        assert!(find_names(&store, json!({"mayor": "x"})).await.is_empty());
        assert_eq!(find_names(&store, json!({"mayor": {"$exists": false}})).await.len(), 4);
        assert_eq!(find_names(&store, json!({"name": {"$exists": true}})).await.len(), 4);
    }

    #[tokio::test]
    async fn invalid_regex_is_rejected_before_sql() {
        let store = store().await;
        let query = Query::from_json(&json!({"name": {"$regex": "("}})).unwrap();
        assert!(matches!(
            store.count(&query).await,
            Err(DomainError::MalformedInput(_))
        ));
    }

    #[tokio::test]
    async fn oversized_page_returns_empty_page() {
        let repo = CityRepository::new(Arc::new(store().await));

        for (page, limit) in [("99999999999999999999", "10"), ("3", "9223372036854775807")] {
            let result = repo
                .get_all(ListQuery {
                    page: Some(page.into()),
                    limit: Some(limit.into()),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert!(result.data.is_empty());
            let metadata = result.metadata.unwrap();
            assert_eq!(metadata.total_items, 4);
            assert_eq!(metadata.current_page, page.parse::<u64>().unwrap_or(i64::MAX as u64));
        }
    }

    #[tokio::test]
    async fn unbounded_skip_and_limit_are_clamped() {
        let store = store().await;
        let options = FindOptions {
            skip: u64::MAX,
            ..Default::default()
        };
        assert!(store.find(&Query::new(), &options).await.unwrap().is_empty());

        let options = FindOptions {
            limit: u64::MAX,
            ..Default::default()
        };
        assert_eq!(store.find(&Query::new(), &options).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn sorts_paginates_and_projects() {
        let store = store().await;
        let options = FindOptions {
            sort: Some(Sort::new("population", SortOrder::Desc)),
            skip: 1,
            limit: 2,
            projection: Projection::from_json(&json!("name -_id")).ok().flatten(),
        };
        let docs = store.find(&Query::new(), &options).await.unwrap();
        assert_eq!(
            docs.into_iter().map(Value::Object).collect::<Vec<_>>(),
            vec![json!({"name": "Osaka"}), json!({"name": "Paris"})]
        );
    }

    #[tokio::test]
    async fn count_update_delete() {
        let store = store().await;
        let japan = Query::from_json(&json!({"country": "Japan"})).unwrap();
        assert_eq!(store.count(&japan).await.unwrap(), 2);

        let patch = CityPatch {
            country: Some("Nippon".into()),
            ..Default::default()
        };
        let updated = store.update("2", patch).await.unwrap().unwrap();
        assert_eq!(updated.country, "Nippon");
        assert!(updated.updated_at >= updated.created_at);
        assert_eq!(store.count(&japan).await.unwrap(), 1);

        assert_eq!(store.delete("2").await.unwrap().map(|c| c.id), Some("2".into()));
        assert!(store.delete("2").await.unwrap().is_none());
        assert_eq!(store.count(&Query::new()).await.unwrap(), 3);
        store.ping().await.unwrap();
    }
}
