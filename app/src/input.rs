//! Roster input loading.
//!
//! Reads the input roster from CSV or Excel and detects the player/squad
//! columns by candidate-name matching. Row order is the file order and is
//! stable across runs.

use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use rostermark_core::RowKey;
use std::path::{Path, PathBuf};

/// Filename stem the input roster is searched by.
pub const INPUT_FILE_STEM: &str = "players_data";

/// Supported input extensions, in search order.
pub const INPUT_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];

/// Recognized player-column headers, most specific first.
const PLAYER_COLUMNS: &[&str] = &["Player", "Name", "Player Name", "player_name"];

/// Recognized squad-column headers.
const SQUAD_COLUMNS: &[&str] = &["Squad", "Team", "Club"];

/// Find the input roster in a folder: any file whose name starts with
/// [`INPUT_FILE_STEM`] and carries a supported extension. Candidates are
/// sorted by name so the pick is deterministic.
pub fn find_input_file(folder: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(folder)
        .with_context(|| format!("reading folder {}", folder.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            let stem_matches = path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s.starts_with(INPUT_FILE_STEM));
            let ext_matches = path
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| {
                    INPUT_EXTENSIONS
                        .iter()
                        .any(|known| ext.eq_ignore_ascii_case(known))
                });
            stem_matches && ext_matches
        })
        .collect();
    candidates.sort();

    candidates.into_iter().next().with_context(|| {
        format!(
            "no input file '{INPUT_FILE_STEM}*' with extensions {INPUT_EXTENSIONS:?} in {}",
            folder.display()
        )
    })
}

/// Load the roster as `(player, squad, index)` keys, in file order.
///
/// Rows with a blank player name are kept (they seed the result table and
/// are skipped at processing time), so indices always line up with the
/// input file.
pub fn load_roster(path: &Path) -> Result<Vec<RowKey>> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let (headers, records) = match extension.as_str() {
        "csv" => read_csv(path)?,
        "xlsx" | "xls" => read_excel(path)?,
        other => bail!("unsupported input type: .{other}"),
    };

    let player_col = detect_column(&headers, PLAYER_COLUMNS)
        .context("could not detect a player column in the input roster")?;
    let squad_col = detect_column(&headers, SQUAD_COLUMNS)
        .context("could not detect a squad column in the input roster")?;
    tracing::info!("Detected player column: {}", headers[player_col]);
    tracing::info!("Detected squad column: {}", headers[squad_col]);

    Ok(records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let player = record.get(player_col).cloned().unwrap_or_default();
            let squad = record.get(squad_col).cloned().unwrap_or_default();
            RowKey::new(player.trim(), squad.trim(), index)
        })
        .collect())
}

fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = reader
        .headers()
        .context("reading roster headers")?
        .iter()
        .map(str::to_string)
        .collect();
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.context("reading roster row")?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok((headers, records))
}

fn read_excel(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("opening {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .context("workbook has no sheets")?
        .context("reading first sheet")?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .context("sheet has no header row")?
        .iter()
        .map(cell_text)
        .collect();
    let records: Vec<Vec<String>> = rows
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    Ok((headers, records))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn detect_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    for candidate in candidates {
        if let Some(position) = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(candidate))
        {
            return Some(position);
        }
    }
    None
}
