//! Summarize a catalog, or show a single table or view.

use serde::Serialize;

use crate::catalog::{Catalog, Metadata, Table, View};
use crate::classifier::ObjectName;
use crate::error::{Result, RewindError};

/// One line of the catalog summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    /// Lowercase catalog key.
    pub key: String,
    /// Display name in original casing.
    pub full_name: String,
    /// Column count; zero for views.
    pub columns: usize,
    /// Number of source files referencing the object.
    pub source_files: usize,
    pub comment: Option<String>,
}

/// Result of the inspect command.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InspectReport {
    /// Whole-catalog overview.
    Summary {
        metadata: Metadata,
        tables: Vec<ObjectSummary>,
        views: Vec<ObjectSummary>,
    },
    Table { key: String, table: Table },
    View { key: String, view: View },
}

/// Execute the inspect command. `name` selects one object; tables win over views.
pub fn execute(catalog: &Catalog, name: Option<&str>) -> Result<InspectReport> {
    let Some(raw) = name else {
        return Ok(summarize(catalog));
    };

    let object = ObjectName::parse(raw);
    if let Some(table) = catalog.lookup_table(&object, None) {
        return Ok(InspectReport::Table {
            key: object.key(),
            table: table.clone(),
        });
    }
    if let Some(view) = catalog.lookup_view(&object, None) {
        return Ok(InspectReport::View {
            key: object.key(),
            view: view.clone(),
        });
    }
    Err(RewindError::CatalogError(format!(
        "No table or view named '{}' in catalog",
        raw
    )))
}

fn summarize(catalog: &Catalog) -> InspectReport {
    let tables = catalog
        .tables
        .iter()
        .map(|(key, t)| ObjectSummary {
            key: key.clone(),
            full_name: t.full_name.clone(),
            columns: t.columns.len(),
            source_files: t.source_files.len(),
            comment: t.comment.clone(),
        })
        .collect();
    let views = catalog
        .views
        .iter()
        .map(|(key, v)| ObjectSummary {
            key: key.clone(),
            full_name: v.full_name.clone(),
            columns: 0,
            source_files: v.source_files.len(),
            comment: None,
        })
        .collect();

    InspectReport::Summary {
        metadata: catalog.metadata.clone(),
        tables,
        views,
    }
}
