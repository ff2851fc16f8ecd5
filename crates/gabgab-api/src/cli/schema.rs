//! Schema and bulk-update commands: evolve, update.

use anyhow::Result;
use console::style;

use gabgab_types::column::{ColumnValue, ExtraColumn};
use gabgab_types::predicate::Predicate;

use super::Assignment;
use crate::state::AppState;

/// Add nullable columns in place.
///
/// # Examples
///
/// ```bash
/// gabgab evolve quality_score:float processing_time_ms:int
/// ```
pub async fn evolve(state: &AppState, columns: &[ExtraColumn], json: bool) -> Result<()> {
    let version = state.service.evolve_schema(columns).await?;
    let field_count = state.service.schema_field_count().await?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "added": columns,
                "version": version,
                "field_count": field_count,
            })
        );
        return Ok(());
    }

    for column in columns {
        println!(
            "  {} Added column {} ({})",
            style("+").green().bold(),
            style(&column.name).cyan(),
            column.column_type
        );
    }
    println!(
        "  Schema now has {} fields (version {})",
        style(field_count).bold(),
        version
    );
    Ok(())
}

/// Assign values on every matching row.
///
/// # Examples
///
/// ```bash
/// gabgab update --where "quality_score is null" --set quality_score=4.0
/// gabgab update --where "speaker = 'system'" --set model=lfm2.5 --set processing_time_ms=120
/// ```
pub async fn update(
    state: &AppState,
    predicate: &Predicate,
    assignments: Vec<Assignment>,
    json: bool,
) -> Result<()> {
    let values: Vec<(String, ColumnValue)> = assignments.into_iter().map(Into::into).collect();
    let updated = state.service.conditional_update(predicate, &values).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"where": predicate.to_string(), "updated": updated})
        );
    } else if updated == 0 {
        println!(
            "  {} No rows match '{}'.",
            style("i").blue().bold(),
            predicate
        );
    } else {
        println!(
            "  {} Updated {} row{} where {}",
            style("*").green().bold(),
            style(updated).bold(),
            if updated == 1 { "" } else { "s" },
            style(predicate).dim()
        );
    }
    Ok(())
}
