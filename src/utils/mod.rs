use serde_json::{Map, Value};

/// Render rows as a boxed text table for the console.
/// Rows shorter than the header are padded with empty cells.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return "(none)".to_string();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let border = |left: char, mid: char, right: char| {
        let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{}{}{}", left, segments.join(&mid.to_string()), right)
    };
    let line = |cells: Vec<&str>| {
        let padded: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let cell = cells.get(i).copied().unwrap_or("");
                let pad = w - cell.chars().count();
                format!(" {}{} ", cell, " ".repeat(pad))
            })
            .collect();
        format!("│{}│", padded.join("│"))
    };

    let mut out = vec![border('┌', '┬', '┐'), line(headers.to_vec()), border('├', '┼', '┤')];
    for row in rows {
        out.push(line(row.iter().map(|c| c.as_str()).collect()));
    }
    out.push(border('└', '┴', '┘'));
    out.join("\n")
}

/// Compact one-line JSON for a settings map
pub fn compact_json(map: &Map<String, Value>) -> String {
    serde_json::to_string(map).unwrap_or_default()
}
