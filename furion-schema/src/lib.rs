#![forbid(unsafe_code)]

pub mod macros;
pub mod table;

use std::collections::BTreeMap;

use furion_types::SchemaVersion;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use table::{IndexDef, IndexKind, PrimaryKey, TableDef};

/// Fixed identifier of the dashboard's local database.
pub const FURION_KIT_DATABASE: &str = "furion-kit";
/// The single table of schema version 1.
pub const ROUTING_DIAGNOSIS: &str = "routingDiagnosis";
pub const FURION_KIT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid declaration for table '{table}': {reason}")]
    InvalidDeclaration { table: String, reason: String },
    #[error("schema version 0 is reserved")]
    ZeroVersion,
    #[error("versions must be declared in increasing order ({last} then {next})")]
    VersionNotIncreasing {
        last: SchemaVersion,
        next: SchemaVersion,
    },
    #[error("no upgrade path from {from} to {to}")]
    NoUpgradePath { from: SchemaVersion, to: SchemaVersion },
    #[error("database is at {persisted}, refusing to open at older {requested}")]
    Downgrade {
        persisted: SchemaVersion,
        requested: SchemaVersion,
    },
    #[error("primary key of table '{table}' changed at {version}")]
    PrimaryKeyChanged { table: String, version: SchemaVersion },
    #[error("table '{0}' already exists")]
    TableExists(String),
    #[error("table '{0}' does not exist")]
    MissingTable(String),
    #[error("index '{index}' on table '{table}' already exists")]
    IndexExists { table: String, index: String },
    #[error("index '{index}' on table '{table}' does not exist")]
    MissingIndex { table: String, index: String },
}

/// A schema-altering step of one version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaOp {
    CreateTable(TableDef),
    DropTable(String),
    AddIndex { table: String, index: IndexDef },
    DropIndex { table: String, index: String },
}

/// The table set at some version, rebuilt by applying ops in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchemaLayout {
    version: SchemaVersion,
    tables: BTreeMap<String, TableDef>,
}

impl SchemaLayout {
    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.values()
    }

    /// Apply the ops of `version` on top of the current layout.
    pub fn apply(&mut self, version: SchemaVersion, ops: &[SchemaOp]) -> Result<(), SchemaError> {
        for op in ops {
            match op {
                SchemaOp::CreateTable(def) => {
                    if self.tables.contains_key(&def.name) {
                        return Err(SchemaError::TableExists(def.name.clone()));
                    }
                    self.tables.insert(def.name.clone(), def.clone());
                }
                SchemaOp::DropTable(name) => {
                    self.tables
                        .remove(name)
                        .ok_or_else(|| SchemaError::MissingTable(name.clone()))?;
                }
                SchemaOp::AddIndex { table, index } => {
                    let def = self
                        .tables
                        .get_mut(table)
                        .ok_or_else(|| SchemaError::MissingTable(table.clone()))?;
                    if def.index(&index.name).is_some() {
                        return Err(SchemaError::IndexExists {
                            table: table.clone(),
                            index: index.name.clone(),
                        });
                    }
                    def.indexes.push(index.clone());
                }
                SchemaOp::DropIndex { table, index } => {
                    let def = self
                        .tables
                        .get_mut(table)
                        .ok_or_else(|| SchemaError::MissingTable(table.clone()))?;
                    let before = def.indexes.len();
                    def.indexes.retain(|i| &i.name != index);
                    if def.indexes.len() == before {
                        return Err(SchemaError::MissingIndex {
                            table: table.clone(),
                            index: index.clone(),
                        });
                    }
                }
            }
        }
        self.version = version;
        Ok(())
    }
}

/// Migration table: version -> ordered schema ops.
///
/// Each `declare` lists only the tables that change at that version; unlisted
/// tables carry over and `None` drops a table. The ops are the diff against
/// the previously declared table set.
#[derive(Clone, Debug, Default)]
pub struct Migrations {
    steps: BTreeMap<SchemaVersion, Vec<SchemaOp>>,
    current: BTreeMap<String, TableDef>,
}

impl Migrations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(
        &mut self,
        version: u32,
        tables: &[(&str, Option<&str>)],
    ) -> Result<&mut Self, SchemaError> {
        let version = SchemaVersion(version);
        if version == SchemaVersion::EMPTY {
            return Err(SchemaError::ZeroVersion);
        }
        if let Some(last) = self.latest() {
            if version <= last {
                return Err(SchemaError::VersionNotIncreasing { last, next: version });
            }
        }

        let mut next = self.current.clone();
        let mut ops = Vec::new();
        for (name, decl) in tables {
            match decl {
                None => {
                    if next.remove(*name).is_none() {
                        return Err(SchemaError::MissingTable(name.to_string()));
                    }
                    ops.push(SchemaOp::DropTable(name.to_string()));
                }
                Some(decl) => {
                    let def = TableDef::parse(name, decl)?;
                    match next.get(*name) {
                        None => ops.push(SchemaOp::CreateTable(def.clone())),
                        Some(prev) => {
                            if prev.primary_key != def.primary_key {
                                return Err(SchemaError::PrimaryKeyChanged {
                                    table: name.to_string(),
                                    version,
                                });
                            }
                            ops.extend(index_diff(prev, &def));
                        }
                    }
                    next.insert(name.to_string(), def);
                }
            }
        }

        self.current = next;
        self.steps.insert(version, ops);
        Ok(self)
    }

    pub fn latest(&self) -> Option<SchemaVersion> {
        self.steps.keys().next_back().copied()
    }

    pub fn versions(&self) -> impl Iterator<Item = SchemaVersion> + '_ {
        self.steps.keys().copied()
    }

    /// Steps needed to go from `from` (persisted) to `to` (requested), in order.
    pub fn plan(
        &self,
        from: SchemaVersion,
        to: SchemaVersion,
    ) -> Result<Vec<(SchemaVersion, &[SchemaOp])>, SchemaError> {
        if to == SchemaVersion::EMPTY {
            return Err(SchemaError::ZeroVersion);
        }
        if to < from {
            return Err(SchemaError::Downgrade {
                persisted: from,
                requested: to,
            });
        }
        let known = |v: SchemaVersion| v == SchemaVersion::EMPTY || self.steps.contains_key(&v);
        if !known(from) || !known(to) {
            return Err(SchemaError::NoUpgradePath { from, to });
        }
        Ok(self
            .steps
            .range((std::ops::Bound::Excluded(from), std::ops::Bound::Included(to)))
            .map(|(v, ops)| (*v, ops.as_slice()))
            .collect())
    }

    /// Layout obtained by applying every step up to and including `version`.
    pub fn layout_at(&self, version: SchemaVersion) -> Result<SchemaLayout, SchemaError> {
        let mut layout = SchemaLayout::default();
        for (v, ops) in self.plan(SchemaVersion::EMPTY, version)? {
            layout.apply(v, ops)?;
        }
        Ok(layout)
    }
}

fn index_diff(prev: &TableDef, next: &TableDef) -> Vec<SchemaOp> {
    let mut ops = Vec::new();
    for old in &prev.indexes {
        if next.index(&old.name) != Some(old) {
            ops.push(SchemaOp::DropIndex {
                table: prev.name.clone(),
                index: old.name.clone(),
            });
        }
    }
    for new in &next.indexes {
        if prev.index(&new.name) != Some(new) {
            ops.push(SchemaOp::AddIndex {
                table: next.name.clone(),
                index: new.clone(),
            });
        }
    }
    ops
}

/// Schema of the dashboard database: one `routingDiagnosis` table, no indexes.
pub fn furion_kit_schema() -> Result<Migrations, SchemaError> {
    crate::define_schema! {
        version 1 => {
            routingDiagnosis: "++id",
        },
    }
}
