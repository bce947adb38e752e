use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use evr_model::{SubmissionStatus, ValidationCondition};

use crate::types::ProcessResult;

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn status_cell(status: SubmissionStatus) -> Cell {
    let color = match status {
        SubmissionStatus::Approved | SubmissionStatus::Submitted => Color::Green,
        SubmissionStatus::Draft | SubmissionStatus::Pending => Color::Cyan,
        SubmissionStatus::Processing => Color::Yellow,
        SubmissionStatus::Rejected | SubmissionStatus::Error => Color::Red,
    };
    Cell::new(status.as_str()).fg(color)
}

pub fn print_process_summary(result: &ProcessResult) {
    println!("Submission: {}", result.submission_id);
    println!("Category: {}", result.category);
    println!("Records: {}", result.records);

    let mut stages = Table::new();
    stages.set_header(vec![
        header_cell("Stage"),
        header_cell("Outcome"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut stages);
    for completion in &result.stages {
        let outcome = if completion.passed {
            Cell::new("passed").fg(Color::Green)
        } else {
            Cell::new("failed").fg(Color::Red)
        };
        stages.add_row(vec![
            Cell::new(completion.stage.as_str()),
            outcome,
            status_cell(completion.status),
        ]);
    }
    println!("{stages}");

    if !result.ledger.is_empty() {
        let conditions: Vec<&ValidationCondition> =
            result.ledger.iter().map(|entry| &entry.condition).collect();
        print_conditions(&conditions);
    }

    println!("Final status: {}", result.status.as_str());
}

pub fn print_conditions(conditions: &[&ValidationCondition]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Row"),
        header_cell("Column"),
        header_cell("Condition"),
        header_cell("Description"),
    ]);
    apply_table_style(&mut table);
    if let Some(column) = table.column_mut(0) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    for condition in conditions {
        let row = condition
            .error_row
            .map(|row| row.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(row),
            Cell::new(&condition.header_name),
            Cell::new(condition.kind.as_str()).fg(Color::Red),
            Cell::new(&condition.error_description),
        ]);
    }
    println!("{table}");
}
