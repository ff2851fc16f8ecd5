//! Recording commands: insert and semantic search.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use serde_json::{Map, Value};
use uuid::Uuid;

use gabgab_types::recording::{FilterMode, NewRecording, SearchOptions};

use super::InsertArgs;
use crate::state::AppState;

const TRANSCRIPT_WIDTH: usize = 60;

/// Insert one recording.
///
/// # Examples
///
/// ```bash
/// gabgab insert -t "Turn on the living room lights" -m kokoro-82m --duration-ms 2500 --speaker user
/// gabgab insert -t "Weather update" -m lfm2.5 --metadata '{"source":"mic"}' --audio clip.wav
/// ```
pub async fn insert(state: &AppState, args: InsertArgs, json: bool) -> Result<()> {
    let mut recording = NewRecording::new(
        args.id.unwrap_or_else(|| Uuid::now_v7().to_string()),
        args.transcript,
        args.model,
        args.duration_ms,
    );
    recording.speaker = args.speaker;

    if let Some(path) = &args.audio {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read audio file {}", path.display()))?;
        recording.audio_bytes = Some(bytes);
    }
    if let Some(raw) = &args.metadata {
        recording.metadata = Some(parse_metadata(raw)?);
    }
    if let Some(raw) = &args.timestamp {
        recording.timestamp = Some(parse_timestamp(raw)?);
    }
    for assignment in args.extra {
        recording.extra.insert(assignment.column, assignment.value);
    }

    let stored = state.service.insert_recording(recording).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stored)?);
    } else {
        println!(
            "  {} Inserted recording {}",
            style("+").green().bold(),
            style(&stored.id).cyan()
        );
        println!("  {}", style(&stored.transcript).dim());
    }
    Ok(())
}

/// Semantic search over transcripts.
///
/// # Examples
///
/// ```bash
/// gabgab search "lighting controls"
/// gabgab search "status report" --speaker system --limit 3 --prefilter
/// ```
pub async fn search(
    state: &AppState,
    query: &str,
    limit: Option<usize>,
    speaker: Option<String>,
    prefilter: bool,
    json: bool,
) -> Result<()> {
    let mut options = SearchOptions::default()
        .with_limit(limit.unwrap_or(state.config.search.default_limit));
    if let Some(speaker) = speaker {
        options = options.with_speaker(speaker);
    }
    if prefilter {
        options = options.with_filter_mode(FilterMode::PreFilter);
    }

    let hits = state.service.semantic_search(query, &options).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!();
        println!(
            "  {} No recordings match '{}'.",
            style("i").blue().bold(),
            style(query).cyan()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Distance").fg(Color::White),
        Cell::new("ID").fg(Color::White),
        Cell::new("Speaker").fg(Color::White),
        Cell::new("Model").fg(Color::White),
        Cell::new("Transcript").fg(Color::White),
    ]);

    for hit in &hits {
        let rec = &hit.recording;
        table.add_row(vec![
            Cell::new(hit.rank).fg(Color::DarkGrey),
            Cell::new(format!("{:.4}", hit.distance)).fg(Color::Yellow),
            Cell::new(&rec.id).fg(Color::Cyan),
            Cell::new(rec.speaker.as_deref().unwrap_or("-")),
            Cell::new(&rec.model).fg(Color::Magenta),
            Cell::new(truncate(&rec.transcript, TRANSCRIPT_WIDTH)).fg(Color::White),
        ]);
    }

    println!();
    println!("  Results for '{}'", style(query).cyan().bold());
    println!();
    println!("{table}");
    println!();
    println!(
        "  {} result{}",
        style(hits.len()).bold(),
        if hits.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

fn parse_metadata(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).context("Metadata is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("Metadata must be a JSON object, got {other}"),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .with_context(|| format!("Invalid RFC 3339 timestamp '{raw}'"))
}

/// Shorten to `max` characters, ending with "...".
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
