use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use vgrid_protocol::IssueSeverity;

use crate::types::{CheckResult, LayoutResult};

pub fn print_layout(result: &LayoutResult) {
    println!("Protocol: {}", result.protocol_id);
    println!("Study: {}", result.study_uid);
    println!(
        "Stage: {} ({}x{})",
        result.stage_id, result.rows, result.columns
    );
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Slot"),
        header_cell("Viewport"),
        header_cell("Display set"),
        header_cell("Modality"),
        header_cell("Description"),
        header_cell("Score"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Right);
    for slot in &result.slots {
        let content = if slot.display_sets.is_empty() {
            dim_cell("(empty)")
        } else {
            Cell::new(slot.display_sets.join(", "))
        };
        table.add_row(vec![
            Cell::new(slot.slot),
            Cell::new(&slot.viewport_id),
            content,
            text_cell(slot.modality.as_deref()),
            text_cell(slot.description.as_deref()),
            match slot.score {
                Some(score) => Cell::new(format!("{score:.1}")),
                None => dim_cell("-"),
            },
        ]);
    }
    println!("{table}");
    if !result.issues.is_empty() {
        eprintln!("Issues:");
        for issue in &result.issues {
            eprintln!("- {issue}");
        }
    }
}

pub fn print_check(result: &CheckResult) {
    let report = &result.report;
    println!("Protocol: {}", report.protocol_id);
    if report.issues.is_empty() {
        println!("No issues found.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Severity"),
        header_cell("Code"),
        header_cell("Stage"),
        header_cell("Message"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Center);
    let mut ordered: Vec<_> = report.issues.iter().collect();
    ordered.sort_by_key(|issue| match issue.severity {
        IssueSeverity::Error => 0,
        IssueSeverity::Warning => 1,
    });
    for issue in ordered {
        table.add_row(vec![
            severity_cell(issue.severity),
            Cell::new(&issue.code),
            text_cell(issue.stage.as_deref()),
            Cell::new(&issue.message),
        ]);
    }
    println!("{table}");
    println!(
        "{} error(s), {} warning(s)",
        report.error_count(),
        report.warning_count()
    );
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn severity_cell(severity: IssueSeverity) -> Cell {
    match severity {
        IssueSeverity::Error => Cell::new("ERROR").fg(Color::Red),
        IssueSeverity::Warning => Cell::new("WARN").fg(Color::Yellow),
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn text_cell(value: Option<&str>) -> Cell {
    match value {
        Some(text) => Cell::new(text),
        None => dim_cell("-"),
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
