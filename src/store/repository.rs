//! Generic document repository.
//!
//! Every entity store in this crate is a thin wrapper around [`Repository`],
//! which gives any document-shaped type uniform create/find/update/delete
//! semantics over a JSON-per-row table. Lookup misses are a recoverable
//! [`StoreError::NotFound`]; infrastructure failures stay a separate
//! [`StoreError::Unavailable`] so callers can tell the two apart.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use sqlx::{QueryBuilder, Sqlite};

/// A document fields type that can be managed by a [`Repository`].
///
/// The fields type must not declare its own `id` key; the repository assigns
/// one at creation time and owns it thereafter.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection (table) name in the store.
    const COLLECTION: &'static str;
}

/// A persisted document: the repository-assigned id plus the entity fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<T> {
    /// Opaque unique identifier, assigned at creation, immutable thereafter.
    pub id: String,
    #[serde(flatten)]
    pub fields: T,
}

/// Errors from repository operations.
#[derive(Debug)]
pub enum StoreError {
    /// No document matched the filter. A normal negative result.
    NotFound,
    /// A uniqueness constraint was violated.
    Conflict,
    /// A stored document could not be encoded or decoded.
    Corrupted(serde_json::Error),
    /// The underlying store failed. Distinct from `NotFound`; callers may retry.
    Unavailable(sqlx::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "Document not found"),
            StoreError::Conflict => write!(f, "Uniqueness constraint violated"),
            StoreError::Corrupted(e) => write!(f, "Corrupted document: {}", e),
            StoreError::Unavailable(e) => write!(f, "Store unavailable: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::Conflict;
            }
        }
        StoreError::Unavailable(err)
    }
}

/// A value a filter term compares against.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Float(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for FilterValue {
    fn from(v: chrono::DateTime<chrono::Utc>) -> Self {
        // Matches the serde_json representation of DateTime<Utc>.
        FilterValue::Text(v.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Op {
    fn sql(self) -> &'static str {
        match self {
            Op::Eq => " = ",
            Op::Gt => " > ",
            Op::Gte => " >= ",
            Op::Lt => " < ",
            Op::Lte => " <= ",
        }
    }
}

#[derive(Debug, Clone)]
struct Term {
    field: String,
    op: Op,
    value: FilterValue,
}

/// Conjunction of field comparisons. An empty filter matches every document.
///
/// The field `"id"` addresses the primary key column; every other field
/// addresses the JSON path of the same name. Field paths and values are
/// bound as parameters, never interpolated into SQL.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    terms: Vec<Term>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter matching a single document by id.
    pub fn by_id(id: &str) -> Self {
        Self::new().eq("id", id)
    }

    pub fn eq(self, field: &str, value: impl Into<FilterValue>) -> Self {
        self.term(field, Op::Eq, value)
    }

    pub fn gt(self, field: &str, value: impl Into<FilterValue>) -> Self {
        self.term(field, Op::Gt, value)
    }

    pub fn gte(self, field: &str, value: impl Into<FilterValue>) -> Self {
        self.term(field, Op::Gte, value)
    }

    pub fn lt(self, field: &str, value: impl Into<FilterValue>) -> Self {
        self.term(field, Op::Lt, value)
    }

    pub fn lte(self, field: &str, value: impl Into<FilterValue>) -> Self {
        self.term(field, Op::Lte, value)
    }

    fn term(mut self, field: &str, op: Op, value: impl Into<FilterValue>) -> Self {
        self.terms.push(Term {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    /// Append `WHERE ...` (or nothing, for an empty filter) to the builder.
    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        for (i, term) in self.terms.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });

            if term.field == "id" {
                qb.push("id");
            } else {
                qb.push("json_extract(doc, ");
                qb.push_bind(format!("$.{}", term.field));
                qb.push(")");
            }

            qb.push(term.op.sql());
            match &term.value {
                FilterValue::Text(v) => qb.push_bind(v.clone()),
                FilterValue::Int(v) => qb.push_bind(*v),
                FilterValue::Float(v) => qb.push_bind(*v),
                FilterValue::Bool(v) => qb.push_bind(*v),
            };
        }
    }
}

/// A partial field update, applied as a JSON merge patch.
///
/// Field-level last-writer-wins: each named field is replaced wholesale.
/// Setting a field to `null` clears it. The `id` field is immutable; updates
/// naming it are ignored.
#[derive(Debug, Clone, Default)]
pub struct Update {
    patch: serde_json::Map<String, serde_json::Value>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: serde_json::Value) -> Self {
        if field != "id" {
            self.patch.insert(field.to_string(), value);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.patch.is_empty()
    }

    fn to_patch_string(&self) -> String {
        serde_json::Value::Object(self.patch.clone()).to_string()
    }
}

/// Uniform CRUD access to one collection of documents of type `T`.
pub struct Repository<T> {
    pool: SqlitePool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Repository<T> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    fn decode(doc: &str) -> Result<Stored<T>, StoreError> {
        serde_json::from_str(doc).map_err(StoreError::Corrupted)
    }

    /// Assign a fresh id, persist the document, and return the stored
    /// representation. A uniqueness violation surfaces as `Conflict`.
    pub async fn create(&self, fields: T) -> Result<Stored<T>, StoreError> {
        let stored = Stored {
            id: uuid::Uuid::new_v4().to_string(),
            fields,
        };
        let doc = serde_json::to_string(&stored).map_err(StoreError::Corrupted)?;

        sqlx::query(&format!(
            "INSERT INTO {} (id, doc) VALUES (?, ?)",
            T::COLLECTION
        ))
        .bind(&stored.id)
        .bind(&doc)
        .execute(&self.pool)
        .await?;

        Ok(stored)
    }

    /// Return the first document matching the filter, or `NotFound`.
    pub async fn find_one(&self, filter: &Filter) -> Result<Stored<T>, StoreError> {
        let mut qb = QueryBuilder::new(format!("SELECT doc FROM {}", T::COLLECTION));
        filter.push_where(&mut qb);
        qb.push(" LIMIT 1");

        let doc: Option<String> = qb
            .build_query_scalar()
            .fetch_optional(&self.pool)
            .await?;

        match doc {
            Some(doc) => Self::decode(&doc),
            None => Err(StoreError::NotFound),
        }
    }

    /// Return all matching documents, in unspecified order. An empty result
    /// is a normal outcome, never an error.
    pub async fn find_many(&self, filter: &Filter) -> Result<Vec<Stored<T>>, StoreError> {
        let mut qb = QueryBuilder::new(format!("SELECT doc FROM {}", T::COLLECTION));
        filter.push_where(&mut qb);

        let docs: Vec<String> = qb.build_query_scalar().fetch_all(&self.pool).await?;

        docs.iter().map(|doc| Self::decode(doc)).collect()
    }

    /// Atomically apply a partial update to one matching document and return
    /// the post-update representation, or `NotFound`.
    ///
    /// The whole operation is a single SQL statement; concurrent updates on
    /// the same document serialize in the store, never in this process.
    pub async fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
    ) -> Result<Stored<T>, StoreError> {
        let mut qb = QueryBuilder::new(format!("UPDATE {} SET doc = json_patch(doc, ", T::COLLECTION));
        qb.push_bind(update.to_patch_string());
        qb.push(format!(") WHERE id IN (SELECT id FROM {}", T::COLLECTION));
        filter.push_where(&mut qb);
        qb.push(" LIMIT 1) RETURNING doc");

        let doc: Option<String> = qb
            .build_query_scalar()
            .fetch_optional(&self.pool)
            .await?;

        match doc {
            Some(doc) => Self::decode(&doc),
            None => Err(StoreError::NotFound),
        }
    }

    /// Atomically remove one matching document and return its pre-deletion
    /// representation, or `NotFound`.
    pub async fn find_one_and_delete(&self, filter: &Filter) -> Result<Stored<T>, StoreError> {
        let mut qb = QueryBuilder::new(format!(
            "DELETE FROM {} WHERE id IN (SELECT id FROM {}",
            T::COLLECTION,
            T::COLLECTION
        ));
        filter.push_where(&mut qb);
        qb.push(" LIMIT 1) RETURNING doc");

        let doc: Option<String> = qb
            .build_query_scalar()
            .fetch_optional(&self.pool)
            .await?;

        match doc {
            Some(doc) => Self::decode(&doc),
            None => Err(StoreError::NotFound),
        }
    }

    /// Check whether any document matches the filter.
    pub async fn exists(&self, filter: &Filter) -> Result<bool, StoreError> {
        let mut qb = QueryBuilder::new(format!("SELECT EXISTS(SELECT 1 FROM {}", T::COLLECTION));
        filter.push_where(&mut qb);
        qb.push(")");

        let found: bool = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(found)
    }
}
