//! Table declarations in the compact store-string form (`"++id, &slug, *tags"`).

use serde::{Deserialize, Serialize};

use crate::SchemaError;

/// How a table identifies its rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimaryKey {
    /// `++field`: assigned by the store from a per-table counter.
    AutoIncrement(String),
    /// `field`: supplied by the caller.
    Explicit(String),
    /// Empty declaration: key kept outside the record.
    Outbound,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    Plain,
    Unique,     // &field
    MultiEntry, // *field
    Compound,   // [a+b]
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub kind: IndexKind,
}

/// One table of a schema version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub primary_key: PrimaryKey,
    pub indexes: Vec<IndexDef>,
}

impl TableDef {
    /// Parse a declaration. The first entry is the primary key, the rest are indexes.
    pub fn parse(name: &str, decl: &str) -> Result<Self, SchemaError> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid(name, "table name must be non-empty [A-Za-z0-9_]"));
        }

        let mut parts = decl.split(',').map(str::trim);
        let pk = parts.next().unwrap_or("");
        let primary_key = if pk.is_empty() {
            PrimaryKey::Outbound
        } else if let Some(field) = pk.strip_prefix("++") {
            check_field(name, field)?;
            PrimaryKey::AutoIncrement(field.to_string())
        } else {
            check_field(name, pk)?;
            PrimaryKey::Explicit(pk.to_string())
        };

        let mut indexes: Vec<IndexDef> = Vec::new();
        for part in parts.filter(|p| !p.is_empty()) {
            let index = parse_index(name, part)?;
            if indexes.iter().any(|i| i.name == index.name) {
                return Err(invalid(name, &format!("index '{}' declared twice", index.name)));
            }
            indexes.push(index);
        }

        Ok(Self {
            name: name.to_string(),
            primary_key,
            indexes,
        })
    }

    pub fn is_auto_increment(&self) -> bool {
        matches!(self.primary_key, PrimaryKey::AutoIncrement(_))
    }

    /// Field holding the identity inside a record, if any.
    pub fn identity_field(&self) -> Option<&str> {
        match &self.primary_key {
            PrimaryKey::AutoIncrement(f) | PrimaryKey::Explicit(f) => Some(f),
            PrimaryKey::Outbound => None,
        }
    }

    pub fn index(&self, name: &str) -> Option<&IndexDef> {
        self.indexes.iter().find(|i| i.name == name)
    }
}

fn parse_index(table: &str, part: &str) -> Result<IndexDef, SchemaError> {
    let (kind, name) = if let Some(rest) = part.strip_prefix('&') {
        (IndexKind::Unique, rest)
    } else if let Some(rest) = part.strip_prefix('*') {
        (IndexKind::MultiEntry, rest)
    } else if part.starts_with('[') {
        let inner = part
            .strip_prefix('[')
            .and_then(|p| p.strip_suffix(']'))
            .ok_or_else(|| invalid(table, &format!("unterminated compound index '{part}'")))?;
        for field in inner.split('+') {
            check_field(table, field)?;
        }
        return Ok(IndexDef {
            name: part.to_string(),
            kind: IndexKind::Compound,
        });
    } else {
        (IndexKind::Plain, part)
    };
    check_field(table, name)?;
    Ok(IndexDef {
        name: name.to_string(),
        kind,
    })
}

fn check_field(table: &str, field: &str) -> Result<(), SchemaError> {
    let ok = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if ok {
        Ok(())
    } else {
        Err(invalid(table, &format!("bad field name '{field}'")))
    }
}

fn invalid(table: &str, reason: &str) -> SchemaError {
    SchemaError::InvalidDeclaration {
        table: table.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_auto_increment_without_indexes() {
        let t = TableDef::parse("routingDiagnosis", "++id").unwrap();
        assert_eq!(t.primary_key, PrimaryKey::AutoIncrement("id".into()));
        assert!(t.indexes.is_empty());
        assert_eq!(t.identity_field(), Some("id"));
    }

    #[test]
    fn parses_index_kinds() {
        let t = TableDef::parse("docs", "slug, &uri, *tags, [source+detail]").unwrap();
        assert_eq!(t.primary_key, PrimaryKey::Explicit("slug".into()));
        let kinds: Vec<IndexKind> = t.indexes.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![IndexKind::Unique, IndexKind::MultiEntry, IndexKind::Compound]
        );
        assert!(t.index("[source+detail]").is_some());
    }

    #[test]
    fn empty_declaration_is_outbound() {
        let t = TableDef::parse("blobs", "").unwrap();
        assert_eq!(t.primary_key, PrimaryKey::Outbound);
        assert_eq!(t.identity_field(), None);
    }

    #[test]
    fn rejects_bad_declarations() {
        assert!(TableDef::parse("", "++id").is_err());
        assert!(TableDef::parse("t", "++").is_err());
        assert!(TableDef::parse("t", "++id, a, a").is_err());
        assert!(TableDef::parse("t", "++id, [a+b").is_err());
    }
}
