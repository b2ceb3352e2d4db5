//! Terminal output formatting for all rewind commands.
//! Uses comfy-table for tabular output and colored for
//! status-aware terminal styling.

use colored::Colorize;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use serde::Serialize;

use rewind_core::commands::inspect::{InspectReport, ObjectSummary};
use rewind_core::error::RewindError;
use rewind_core::{ClassifyReport, ReverseReport, ScanProgress, ScanReport, VerifyReport};

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().map(|h| Cell::new(h)).collect::<Vec<_>>());
    table
}

/// Error payload printed to stdout in `--json` mode.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonError {
    error: String,
    exit_code: i32,
}

/// Print an error as JSON on stdout.
pub fn print_json_error(error: &RewindError, exit_code: i32) {
    let payload = JsonError {
        error: error.to_string(),
        exit_code,
    };
    match serde_json::to_string_pretty(&payload) {
        Ok(json) => println!("{}", json),
        Err(_) => eprintln!("{}", error),
    }
}

/// Print one scan progress notification.
pub fn print_scan_progress(progress: &ScanProgress) {
    if let Some(message) = &progress.message {
        println!("{}", message.dimmed());
    }
    if let Some(file) = &progress.file {
        println!(
            "  {} [{}/{}] {}",
            "→".green(),
            progress.current,
            progress.total,
            file
        );
    }
}

/// Print a scan report.
pub fn print_scan_report(report: &ScanReport) {
    if report.files_scanned == 0 {
        println!(
            "{}",
            format!("No SQL files found under {}.", report.root.display()).yellow()
        );
        return;
    }

    let noisy: Vec<_> = report.files.iter().filter(|f| f.parse_errors > 0).collect();
    if !noisy.is_empty() {
        let mut table = new_table(&["File", "Statements", "Applied", "Parse Errors"]);
        for f in noisy {
            table.add_row(vec![
                Cell::new(&f.path),
                Cell::new(f.statements),
                Cell::new(f.applied),
                Cell::new(f.parse_errors.to_string().red()),
            ]);
        }
        println!("{table}");
    }

    println!(
        "{}",
        format!(
            "Scanned {} file(s): {} table(s), {} view(s), {} column(s)",
            report.files_scanned, report.tables, report.views, report.columns
        )
        .green()
        .bold()
    );
    if report.parse_errors > 0 {
        println!(
            "{}",
            format!("{} statement(s) could not be parsed and were skipped", report.parse_errors)
                .yellow()
        );
    }
    match &report.catalog_path {
        Some(path) => println!("Catalog saved to {}", path.display()),
        None => println!("{}", "Catalog not saved (--no-save).".dimmed()),
    }
}

/// Print a reverse report. The combined script is echoed when nothing was written.
pub fn print_reverse_report(report: &ReverseReport, echo_script: bool) {
    if echo_script && !report.script.is_empty() {
        print!("{}", report.script);
    }

    if !report.files.is_empty() && !echo_script {
        let mut table = new_table(&["Unit", "Original", "Rollback"]);
        for f in &report.files {
            table.add_row(vec![
                Cell::new(&f.unit_name),
                Cell::new(&f.original_file_name),
                Cell::new(&f.reverse_file_name),
            ]);
        }
        println!("{table}");
    }

    for path in &report.written {
        println!("  {} {}", "wrote".green(), path.display());
    }

    let s = &report.stats;
    let summary = format!(
        "Reversed {} statement(s) from {} file(s) in {} unit(s): {} reversed, {} skipped, {} manual, {} unsupported",
        s.statements, s.files, s.units, s.reversed, s.skipped, s.manual, s.unsupported
    );
    if s.needs_attention() > 0 {
        eprintln!("{}", summary.yellow().bold());
    } else {
        eprintln!("{}", summary.green().bold());
    }
    if !report.catalog_used {
        eprintln!("{}", "No catalog was used; dropped objects need manual rollback.".dimmed());
    }
}

/// Print classification results, one table per file.
pub fn print_classify_report(report: &ClassifyReport) {
    for file in &report.files {
        println!("{}", file.path.display().to_string().bold());
        if file.statements.is_empty() {
            println!("  {}", "(no statements)".dimmed());
            continue;
        }
        let mut table = new_table(&["#", "Kind", "Search Path", "Statement"]);
        for s in &file.statements {
            let kind = if s.statement.is_recognized() {
                s.kind.cyan().to_string()
            } else {
                s.kind.red().to_string()
            };
            table.add_row(vec![
                Cell::new(s.index),
                Cell::new(kind),
                Cell::new(s.search_path.as_deref().unwrap_or("")),
                Cell::new(&s.preview),
            ]);
        }
        println!("{table}");
    }
    println!(
        "{} statement(s), {} unrecognized",
        report.total_statements, report.unrecognized
    );
}

fn summary_table(title: &str, rows: &[ObjectSummary], with_columns: bool) {
    if rows.is_empty() {
        return;
    }
    println!("{}", title.bold());
    let mut table = if with_columns {
        new_table(&["Key", "Name", "Columns", "Sources", "Comment"])
    } else {
        new_table(&["Key", "Name", "Sources"])
    };
    for r in rows {
        if with_columns {
            table.add_row(vec![
                Cell::new(&r.key),
                Cell::new(&r.full_name),
                Cell::new(r.columns),
                Cell::new(r.source_files),
                Cell::new(r.comment.as_deref().unwrap_or("")),
            ]);
        } else {
            table.add_row(vec![
                Cell::new(&r.key),
                Cell::new(&r.full_name),
                Cell::new(r.source_files),
            ]);
        }
    }
    println!("{table}");
}

/// Print an inspect report.
pub fn print_inspect_report(report: &InspectReport) {
    match report {
        InspectReport::Summary {
            metadata,
            tables,
            views,
        } => {
            let parsed = metadata
                .parsed_at
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "Catalog built {} from {} file(s): {} table(s), {} view(s), {} column(s)",
                parsed,
                metadata.total_files,
                metadata.total_tables,
                metadata.total_views,
                metadata.total_columns
            );
            summary_table("Tables", tables, true);
            summary_table("Views", views, false);
        }
        InspectReport::Table { key, table } => {
            println!("{} {}", "Table".bold(), table.full_name.cyan());
            println!("  key: {}", key);
            if let Some(comment) = &table.comment {
                println!("  comment: {}", comment);
            }
            if let Some(sql) = table.distribution.as_ref().and_then(|d| d.to_sql()) {
                println!("  distribution: {}", sql);
            }
            if let Some(with) = &table.storage_options {
                println!("  storage: {}", with.raw);
            }
            if let Some(group) = &table.placement_group {
                println!("  group: {}", group);
            }

            let mut cols = new_table(&["#", "Column", "Type", "Comment"]);
            for c in table.columns_in_order() {
                let data_type = if c.data_type == "UNKNOWN" {
                    c.data_type.yellow().to_string()
                } else {
                    c.data_type.clone()
                };
                cols.add_row(vec![
                    Cell::new(c.ordinal),
                    Cell::new(&c.name),
                    Cell::new(data_type),
                    Cell::new(c.comment.as_deref().unwrap_or("")),
                ]);
            }
            println!("{cols}");
            if !table.source_files.is_empty() {
                println!("  sources: {}", table.source_files.join(", ").dimmed());
            }
        }
        InspectReport::View { key, view } => {
            println!("{} {}", "View".bold(), view.full_name.cyan());
            println!("  key: {}", key);
            println!("{}", view.definition);
            if !view.source_files.is_empty() {
                println!("  sources: {}", view.source_files.join(", ").dimmed());
            }
        }
    }
}

/// Print a verify report.
pub fn print_verify_report(report: &VerifyReport) {
    if !report.stale {
        println!(
            "{}",
            format!("Catalog is up to date ({} file(s) unchanged).", report.unchanged).green()
        );
        return;
    }

    let mut table = new_table(&["Status", "File"]);
    for f in &report.added {
        table.add_row(vec![Cell::new("Added".yellow()), Cell::new(f)]);
    }
    for f in &report.removed {
        table.add_row(vec![Cell::new("Removed".red()), Cell::new(f)]);
    }
    for m in &report.modified {
        table.add_row(vec![
            Cell::new("Modified".cyan()),
            Cell::new(format!(
                "{} ({:08x} → {:08x})",
                m.path, m.expected_checksum, m.actual_checksum
            )),
        ]);
    }
    println!("{table}");
}
