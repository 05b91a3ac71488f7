use crate::import::RejectedRow;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
struct RejectedRowView {
    #[tabled(rename = "Line")]
    line: u64,
    #[tabled(rename = "Reason")]
    reason: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

pub fn rejected_table(rows: &[RejectedRow]) -> String {
    let views: Vec<RejectedRowView> = rows
        .iter()
        .map(|r| RejectedRowView {
            line: r.line,
            reason: r.reason.clone(),
        })
        .collect();

    Table::new(views).with(Style::rounded()).to_string()
}
