//! Point records: the persistence backends time series are stored in.
//!
//! Only the descriptors are built here. Opening files or connections is the
//! job of whoever consumes the loaded configuration.

use crate::config_tree::{ConfigTree, Setting, SettingList};
use crate::diagnostics::{Diagnostics, Section};
use crate::names::{insert_named, DuplicatePolicy};
use crate::registry::{BuildError, TypeRegistry};
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

/// Records by name. Time series hold the same `Rc` the table does.
pub type RecordTable = BTreeMap<String, Rc<PointRecord>>;

/// SQL dialects an ODBC record knows how to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorType {
    WonderwareMssql,
    Oracle,
}

impl ConnectorType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "wonderware_mssql" => Some(ConnectorType::WonderwareMssql),
            "oracle" => Some(ConnectorType::Oracle),
            _ => None,
        }
    }
}

/// Table and column names for an ODBC historian that has no preset connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuerySyntax {
    pub table: String,
    pub date_column: String,
    pub tag_column: String,
    pub value_column: String,
    pub quality_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum RecordBackend {
    /// Directory of flat files, resolved against the configuration document
    FlatFile { path: PathBuf, read_only: bool },
    Odbc {
        connection: String,
        connector: Option<ConnectorType>,
        query_syntax: Option<QuerySyntax>,
    },
    Database { connection: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointRecord {
    pub name: String,
    #[serde(flatten)]
    pub backend: RecordBackend,
}

impl PointRecord {
    pub fn is_read_only(&self) -> bool {
        matches!(self.backend, RecordBackend::FlatFile { read_only: true, .. })
    }
}

/// What a record constructor may consult besides its own setting.
pub struct RecordContext<'a> {
    /// The entry's `name`, or `Record N` for unnamed entries
    pub name: &'a str,
    pub tree: &'a ConfigTree,
    pub diagnostics: &'a mut Diagnostics,
}

pub(crate) fn create_flat_file_record(
    setting: &Setting<'_>,
    ctx: &mut RecordContext<'_>,
) -> Result<PointRecord, BuildError> {
    let name = ctx.name.to_string();
    let dir: String = setting.get("path")?;
    let read_only = setting.get_or("readonly", false)?;

    Ok(PointRecord {
        name,
        backend: RecordBackend::FlatFile {
            path: ctx.tree.resolve_path(dir),
            read_only,
        },
    })
}

pub(crate) fn create_odbc_record(
    setting: &Setting<'_>,
    ctx: &mut RecordContext<'_>,
) -> Result<PointRecord, BuildError> {
    let name = ctx.name.to_string();
    let connection: String = setting.get("connection")?;

    let query_syntax = if setting.exists("querySyntax") {
        let syntax = setting.child("querySyntax")?;
        Some(QuerySyntax {
            table: syntax.get("Table")?,
            date_column: syntax.get("DateColumn")?,
            tag_column: syntax.get("TagColumn")?,
            value_column: syntax.get("ValueColumn")?,
            quality_column: syntax.get("QualityColumn")?,
        })
    } else {
        None
    };

    let connector = match setting.get_opt::<String>("connectorType")? {
        Some(type_name) => {
            let connector = ConnectorType::from_name(&type_name);
            if connector.is_none() {
                ctx.diagnostics.warning(
                    Section::Records,
                    &name,
                    format!("connector type {} not recognized for record {}", type_name, name),
                );
            }
            connector
        }
        None => {
            ctx.diagnostics.warning(
                Section::Records,
                &name,
                format!("connector type not specified for record {}", name),
            );
            None
        }
    };

    Ok(PointRecord {
        name,
        backend: RecordBackend::Odbc {
            connection,
            connector,
            query_syntax,
        },
    })
}

pub(crate) fn create_database_record(
    setting: &Setting<'_>,
    ctx: &mut RecordContext<'_>,
) -> Result<PointRecord, BuildError> {
    Ok(PointRecord {
        name: ctx.name.to_string(),
        backend: RecordBackend::Database {
            connection: setting.get("connection")?,
        },
    })
}

/// Build every record in the `records` list. Entries that fail are reported and skipped.
pub fn build_point_records(
    list: &SettingList<'_>,
    registry: &TypeRegistry,
    tree: &ConfigTree,
    policy: DuplicatePolicy,
    diagnostics: &mut Diagnostics,
) -> RecordTable {
    let mut table = RecordTable::new();

    for (index, entry) in list.iter().enumerate() {
        // unnamed records still get a stable handle
        let name = entry
            .get_opt::<String>("name")
            .ok()
            .flatten()
            .unwrap_or_else(|| format!("Record {}", index));

        let record = entry
            .get::<String>("type")
            .map_err(BuildError::from)
            .and_then(|discriminator| registry.record_constructor(&discriminator))
            .and_then(|construct| {
                let mut ctx = RecordContext {
                    name: &name,
                    tree,
                    diagnostics: &mut *diagnostics,
                };
                construct(&entry, &mut ctx)
            });

        match record {
            Ok(record) => {
                insert_named(&mut table, name, Rc::new(record), policy, Section::Records, diagnostics);
            }
            Err(e) => diagnostics.entity_error(
                Section::Records,
                &name,
                format!("could not load point record {}: {}", name, e),
            ),
        }
    }

    info!("Built {} point record(s)", table.len());
    table
}
