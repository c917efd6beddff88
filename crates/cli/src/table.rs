// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal ASCII table renderer for CLI list/failure views: fixed column
//! widths computed from content, left/right alignment per column.

use std::io::Write;

pub enum Align {
    Left,
    Right,
}

pub struct Column {
    pub name: &'static str,
    pub align: Align,
}

impl Column {
    pub fn left(name: &'static str) -> Self {
        Self { name, align: Align::Left }
    }

    pub fn right(name: &'static str) -> Self {
        Self { name, align: Align::Right }
    }
}

pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

const SEP: &str = "  ";

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    /// Render header + rows, auto-sizing each column to its widest cell.
    /// The last column is never padded.
    pub fn render(&self, out: &mut impl Write) {
        if self.rows.is_empty() {
            return;
        }

        let widths = self.compute_widths();
        let last = self.columns.len() - 1;

        let header: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                if i == last && matches!(col.align, Align::Left) {
                    col.name.to_string()
                } else {
                    pad(col.name, widths[i], &col.align)
                }
            })
            .collect();
        let _ = writeln!(out, "{}", header.join(SEP));

        for row in &self.rows {
            let cells: Vec<String> = self
                .columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let raw = row.get(i).map(|s| s.as_str()).unwrap_or("");
                    if i == last && matches!(col.align, Align::Left) {
                        raw.to_string()
                    } else {
                        pad(raw, widths[i], &col.align)
                    }
                })
                .collect();
            let _ = writeln!(out, "{}", cells.join(SEP));
        }
    }

    fn compute_widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let max_data = self
                    .rows
                    .iter()
                    .map(|row| row.get(i).map(|s| s.len()).unwrap_or(0))
                    .max()
                    .unwrap_or(0);
                col.name.len().max(max_data)
            })
            .collect()
    }
}

fn pad(text: &str, width: usize, align: &Align) -> String {
    match align {
        Align::Left => format!("{:<width$}", text),
        Align::Right => format!("{:>width$}", text),
    }
}

/// Render a `KillServer` failure report (§4.1 kill algorithm, §8 scenario
/// 2): unfinished sessions and alive clients, each as its own table.
pub fn render_kill_failure(failure: &ats_daemon::protocol::KillFailure, out: &mut impl Write) {
    if !failure.unfinished_sessions.is_empty() {
        let _ = writeln!(out, "unfinished sessions:");
        let mut table = Table::new(vec![
            Column::left("SESSION_ID"),
            Column::left("NAME"),
            Column::left("STATUS"),
            Column::right("SUBMITTED_EPOCH_MS"),
        ]);
        for entry in &failure.unfinished_sessions {
            table.row(vec![
                entry.session_id.as_str().to_string(),
                entry.name.clone(),
                format!("{:?}", entry.status),
                entry.submitted_epoch_ms.to_string(),
            ]);
        }
        table.render(out);
    }

    if !failure.alive_clients.is_empty() {
        let _ = writeln!(out, "alive clients:");
        let mut table = Table::new(vec![Column::left("CLIENT_ID")]);
        for client_id in &failure.alive_clients {
            table.row(vec![client_id.as_str().to_string()]);
        }
        table.render(out);
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
