//! Catalog metadata and scope-filtered introspection views.
//!
//! The catalog itself is an external collaborator; the types here are the
//! minimal metadata surface the access filter consumes. [`SystemViews`]
//! answers the introspection queries — databases, tables, columns, parts
//! and parts-columns — for one identity, applying the snapshot's scope
//! uniformly: a database the identity may not see yields empty results
//! from every deeper surface as well.

use serde::{Deserialize, Serialize};

use crate::access::AccessScope;
use crate::snapshot::ConfigSnapshot;

/// Catalog metadata as supplied by the external catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Top-level catalog entries.
    pub databases: Vec<Database>,
}

/// One database with its creator tag and contained tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    /// Database name, matched against identity allow-lists.
    pub name: String,
    /// Identity that created the database, when the catalog tracks it.
    #[serde(default)]
    pub created_by: Option<String>,
    /// Tables contained in the database.
    #[serde(default)]
    pub tables: Vec<Table>,
}

/// One table with its columns and data parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Column metadata in declaration order.
    #[serde(default)]
    pub columns: Vec<Column>,
    /// On-disk data parts of the table.
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Declared data type.
    pub data_type: String,
}

/// One data part of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// Part name, e.g. `20000101_20000101_1_1_0`.
    pub name: String,
    /// Row count held by the part.
    pub rows: u64,
}

/// Scope-filtered introspection over one catalog for one identity.
#[derive(Debug)]
pub struct SystemViews<'a> {
    catalog: &'a Catalog,
    scope: AccessScope,
}

impl<'a> SystemViews<'a> {
    /// Creates the views for `identity` under the given snapshot.
    #[must_use]
    pub fn new(catalog: &'a Catalog, snapshot: &ConfigSnapshot, identity: &str) -> Self {
        Self {
            catalog,
            scope: snapshot.scope(identity),
        }
    }

    fn database(&self, name: &str) -> Option<&'a Database> {
        self.catalog
            .databases
            .iter()
            .find(|db| db.name == name && self.scope.is_visible(&db.name, db.created_by.as_deref()))
    }

    fn table(&self, database: &str, table: &str) -> Option<&'a Table> {
        self.database(database)?
            .tables
            .iter()
            .find(|t| t.name == table)
    }

    /// Lists the database names visible to the identity.
    #[must_use]
    pub fn databases(&self) -> Vec<&'a str> {
        self.catalog
            .databases
            .iter()
            .filter(|db| self.scope.is_visible(&db.name, db.created_by.as_deref()))
            .map(|db| db.name.as_str())
            .collect()
    }

    /// Lists table names within a database; empty when the database is not
    /// visible.
    #[must_use]
    pub fn tables(&self, database: &str) -> Vec<&'a str> {
        self.database(database)
            .map(|db| db.tables.iter().map(|t| t.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Lists column names of a table; empty when the database is not
    /// visible.
    #[must_use]
    pub fn columns(&self, database: &str, table: &str) -> Vec<&'a str> {
        self.table(database, table)
            .map(|t| t.columns.iter().map(|c| c.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Lists part names of a table; empty when the database is not visible.
    #[must_use]
    pub fn parts(&self, database: &str, table: &str) -> Vec<&'a str> {
        self.table(database, table)
            .map(|t| t.parts.iter().map(|p| p.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Lists one part name per `(part, column)` pair, mirroring the
    /// parts-columns introspection surface.
    #[must_use]
    pub fn parts_columns(&self, database: &str, table: &str) -> Vec<&'a str> {
        self.table(database, table)
            .map(|t| {
                t.parts
                    .iter()
                    .flat_map(|p| t.columns.iter().map(move |_| p.name.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
