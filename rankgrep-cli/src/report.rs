use colored::Colorize;
use rankgrep::SearchReport;
use std::io::{self, Write};
use std::path::Path;

const SEPARATOR: &str = "--------------------------------------------";

/// Writes the ranked matches as a plain-text report. `root` is used for the
/// relative link line; `color` highlights file paths.
pub fn write_report<W: Write>(
    out: &mut W,
    report: &SearchReport,
    root: &Path,
    color: bool,
) -> io::Result<()> {
    if report.file_matches.is_empty() {
        writeln!(out, "No matches found.")?;
        return Ok(());
    }

    for file in &report.file_matches {
        let path = file.path.display().to_string();
        if color {
            writeln!(out, "File: {}", path.blue())?;
        } else {
            writeln!(out, "File: {}", path)?;
        }

        let link = file
            .relative_path(root)
            .to_string_lossy()
            .replace('\\', "/");
        writeln!(out, "File Link: ./{}", link)?;

        writeln!(out, "Matches:")?;
        for m in &file.matches {
            writeln!(
                out,
                " - \"{}\" at line {}, column {}",
                m.text, m.line, m.column
            )?;
        }

        writeln!(
            out,
            "Last Modified: {}",
            humantime::format_rfc3339_seconds(file.last_modified)
        )?;
        writeln!(out, "{}", SEPARATOR)?;
    }

    Ok(())
}

/// Writes the report as pretty-printed JSON
pub fn write_json<W: Write>(out: &mut W, report: &SearchReport) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)
}
