//! Table lifecycle commands: init, reset, stats, restore.

use anyhow::{bail, Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use dialoguer::Confirm;

use gabgab_types::recording::TableStatus;

use crate::state::AppState;

/// Create the recordings table if needed.
///
/// # Examples
///
/// ```bash
/// gabgab init
/// ```
pub async fn init(state: &AppState, json: bool) -> Result<()> {
    let status = state.service.create_table().await?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "table": state.config.table_name,
                "status": status,
                "data_dir": state.data_dir.display().to_string(),
            })
        );
        return Ok(());
    }

    match status {
        TableStatus::Created => println!(
            "  {} Created table '{}'",
            style("+").green().bold(),
            style(&state.config.table_name).cyan()
        ),
        TableStatus::Existing => println!(
            "  {} Table '{}' already exists",
            style("i").blue().bold(),
            style(&state.config.table_name).cyan()
        ),
    }
    Ok(())
}

/// Whether `reset` has to prompt. JSON output is non-interactive, so it
/// only proceeds with an explicit `--yes`.
fn confirmation_required(yes: bool, json: bool) -> Result<bool> {
    if yes {
        return Ok(false);
    }
    if json {
        bail!("reset with --json requires --yes");
    }
    Ok(true)
}

/// Drop and recreate the recordings table, after confirmation.
///
/// # Examples
///
/// ```bash
/// gabgab reset
/// gabgab reset --yes
/// ```
pub async fn reset(state: &AppState, yes: bool, json: bool) -> Result<()> {
    if confirmation_required(yes, json)? {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete every recording in '{}'? This cannot be undone.",
                style(&state.config.table_name).red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    state.service.reset_table().await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"table": state.config.table_name, "reset": true})
        );
    } else {
        println!(
            "  {} Table '{}' recreated empty.",
            style("x").red().bold(),
            state.config.table_name
        );
    }
    Ok(())
}

/// Show row count, version, columns and per-model counts.
pub async fn stats(state: &AppState, json: bool) -> Result<()> {
    let stats = state
        .service
        .stats()
        .await
        .context("Failed to read table statistics")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Table '{}'",
        style("*").bold(),
        style(&state.config.table_name).cyan().bold()
    );
    println!();
    println!("  Rows:    {}", style(stats.row_count).bold());
    println!("  Version: {}", stats.version);
    println!("  Fields:  {}", stats.field_count);
    println!("  Columns: {}", style(stats.columns.join(", ")).dim());
    println!();

    if !stats.recordings_by_model.is_empty() {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Model").fg(Color::White),
            Cell::new("Recordings").fg(Color::White),
        ]);
        for (model, count) in &stats.recordings_by_model {
            table.add_row(vec![
                Cell::new(model).fg(Color::Cyan),
                Cell::new(count).fg(Color::Yellow),
            ]);
        }
        println!("{table}");
        println!();
    }

    println!(
        "  Storage: {}",
        style(state.data_dir.display()).dim()
    );
    println!();
    Ok(())
}

/// Make an earlier version the latest one.
///
/// # Examples
///
/// ```bash
/// gabgab restore 3
/// ```
pub async fn restore(state: &AppState, version: u64, json: bool) -> Result<()> {
    let latest = state
        .service
        .restore_version(version)
        .await
        .with_context(|| format!("Failed to restore version {version}"))?;
    let rows = state.service.count_rows().await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"restored": version, "version": latest, "row_count": rows})
        );
    } else {
        println!(
            "  {} Restored version {} as version {} ({} rows)",
            style("*").green().bold(),
            style(version).bold(),
            latest,
            rows
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_confirmation() {
        assert!(!confirmation_required(true, false).unwrap());
        assert!(!confirmation_required(true, true).unwrap());
        assert!(confirmation_required(false, false).unwrap());
        assert!(confirmation_required(false, true).is_err());
    }
}
