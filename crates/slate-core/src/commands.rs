//! Command dispatch: wires the datastore, catalog, layout engine, geometry
//! and renderer together per subcommand.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument};

use crate::assemble::{DRAFT_ID, finals_intervals, preview_intervals, weekly_intervals};
use crate::catalog::Catalog;
use crate::cli::{Command, CompareAction, EventAction};
use crate::config::Config;
use crate::datastore::DataStore;
use crate::geometry::{DayColumn, project};
use crate::layout::resolve;
use crate::render::{GridSpec, Renderer};
use crate::schedule::{CustomEvent, Schedule};
use crate::timeparse::{parse_days, parse_period};

#[instrument(skip(store, cfg, renderer, command))]
pub fn dispatch(
    store: &DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Week { compare } => cmd_week(store, cfg, renderer, compare),
        Command::Finals => cmd_finals(store, cfg, renderer),
        Command::List => cmd_list(store, renderer),
        Command::Pin { crn, catalog } => cmd_pin(store, cfg, &crn, catalog.as_deref()),
        Command::Unpin { crn } => cmd_unpin(store, &crn),
        Command::Event { action } => cmd_event(store, renderer, action),
        Command::Compare { action } => cmd_compare(store, action),
        Command::Preview { day, period } => cmd_preview(store, cfg, renderer, &day, &period),
    }
}

#[instrument(skip(store, cfg, renderer))]
fn cmd_week(
    store: &DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    compare: bool,
) -> anyhow::Result<()> {
    let schedule = store.load_schedule()?;
    let overlays = if compare {
        store.load_active_overlays()?
    } else {
        vec![]
    };

    let mut labels = schedule_labels(&schedule, None);
    for (overlay_id, overlay) in &overlays {
        labels.extend(schedule_labels(overlay, Some(overlay_id)));
    }

    let intervals = weekly_intervals(&schedule, &overlays);
    let index = resolve(&intervals);

    let spec = GridSpec {
        window: cfg.view_window()?,
        slot_minutes: cfg.grid_slot_minutes()?,
        day_width: cfg.grid_day_width()?,
        day_keys: cfg.day_keys()?,
    };
    renderer.print_grid(&index, &labels, &spec)
}

#[instrument(skip(store, cfg, renderer))]
fn cmd_finals(store: &DataStore, cfg: &Config, renderer: &mut Renderer) -> anyhow::Result<()> {
    let sections = store.load_pinned()?;
    let intervals = finals_intervals(&sections);
    if intervals.is_empty() {
        println!("no pinned sections with exam blocks");
        return Ok(());
    }

    // Each exam date becomes one lane, in calendar order.
    let dates: BTreeSet<String> = intervals
        .iter()
        .flat_map(|iv| iv.day_keys.iter().cloned())
        .collect();

    let labels: BTreeMap<String, String> = sections
        .iter()
        .map(|s| (s.crn.clone(), compact_course(&s.course)))
        .collect();

    let index = resolve(&intervals);
    let spec = GridSpec {
        window: cfg.view_window()?,
        slot_minutes: cfg.grid_slot_minutes()?,
        day_width: cfg.grid_day_width()?,
        day_keys: dates.into_iter().collect(),
    };
    renderer.print_grid(&index, &labels, &spec)
}

#[instrument(skip(store, renderer))]
fn cmd_list(store: &DataStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    let sections = store.load_pinned()?;
    let events = store.load_events()?;
    renderer.print_sections_table(&sections)?;
    if !events.is_empty() {
        println!();
        renderer.print_events_table(&events)?;
    }
    Ok(())
}

#[instrument(skip(store, cfg, catalog_override))]
fn cmd_pin(
    store: &DataStore,
    cfg: &Config,
    crn: &str,
    catalog_override: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let catalog_path = match catalog_override {
        Some(path) => path.to_path_buf(),
        None => cfg.catalog_path()?,
    };
    let catalog = Catalog::load(&catalog_path)?;
    let section = catalog
        .find(crn)
        .ok_or_else(|| anyhow!("crn {crn} not found in {}", catalog_path.display()))?;

    store.pin_section(section.clone())?;
    info!(crn, course = %section.course, "pinned section");
    println!("pinned {} {} ({})", section.course, section.title, crn);
    Ok(())
}

#[instrument(skip(store))]
fn cmd_unpin(store: &DataStore, crn: &str) -> anyhow::Result<()> {
    store.unpin_section(crn)?;
    println!("unpinned {crn}");
    Ok(())
}

#[instrument(skip(store, renderer, action))]
fn cmd_event(store: &DataStore, renderer: &mut Renderer, action: EventAction) -> anyhow::Result<()> {
    match action {
        EventAction::Add { name, days, period } => {
            let event = CustomEvent::new(name, parse_days(&days)?, parse_period(&period)?);
            let id = event.id;
            store.add_event(event)?;
            println!("added event {id}");
            Ok(())
        }
        EventAction::Rm { id } => {
            let removed = store.remove_event(&id)?;
            println!("removed event {} ({})", removed.name, removed.id);
            Ok(())
        }
        EventAction::List => {
            let events = store.load_events()?;
            renderer.print_events_table(&events)
        }
    }
}

#[instrument(skip(store, action))]
fn cmd_compare(store: &DataStore, action: CompareAction) -> anyhow::Result<()> {
    match action {
        CompareAction::Import { id, file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let schedule: Schedule = serde_json::from_str(&text)
                .with_context(|| format!("failed to parse schedule {}", file.display()))?;
            store.import_overlay(&id, &schedule)?;
            println!("imported overlay {id}");
            Ok(())
        }
        CompareAction::Rm { id } => {
            store.remove_overlay(&id)?;
            println!("removed overlay {id}");
            Ok(())
        }
        CompareAction::On { id } => {
            store.set_overlay_active(&id, true)?;
            println!("overlay {id} on");
            Ok(())
        }
        CompareAction::Off { id } => {
            store.set_overlay_active(&id, false)?;
            println!("overlay {id} off");
            Ok(())
        }
        CompareAction::List => {
            let active = store.active_overlays()?;
            for overlay_id in store.list_overlays()? {
                let marker = if active.contains(&overlay_id) { "*" } else { " " };
                println!("{marker} {overlay_id}");
            }
            Ok(())
        }
    }
}

#[instrument(skip(store, cfg, renderer))]
fn cmd_preview(
    store: &DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    day: &str,
    period: &str,
) -> anyhow::Result<()> {
    let days = parse_days(day)?;
    if days.len() != 1 {
        return Err(anyhow!("preview takes a single day, got: {day}"));
    }
    let day_key = days.into_iter().next().unwrap_or_default();
    let period = parse_period(period)?;

    let day_keys = cfg.day_keys()?;
    let day_index = day_keys
        .iter()
        .position(|d| *d == day_key)
        .ok_or_else(|| anyhow!("day {day_key} is not in the configured week"))?;

    let events = store.load_events()?;
    let intervals = preview_intervals(&day_key, period, &events);
    let index = resolve(&intervals);

    let placement = index
        .get(DRAFT_ID)
        .and_then(|by_day| by_day.get(&day_key))
        .and_then(|by_period| by_period.get(&period.key()))
        .ok_or_else(|| anyhow!("draft placement missing from index"))?;

    debug!(
        column_index = placement.column_index,
        column_count = placement.column_count,
        "resolved draft placement"
    );

    let rect = project(
        placement,
        cfg.view_window()?,
        DayColumn::nth(day_index, day_keys.len()),
    );
    renderer.print_preview(&day_key, placement, &rect)
}

/// Short labels painted into grid blocks.
fn schedule_labels(schedule: &Schedule, namespace: Option<&str>) -> BTreeMap<String, String> {
    let scoped = |raw: &str, label: String| match namespace {
        Some(ns) => (format!("{ns}-{raw}"), format!("{ns}:{label}")),
        None => (raw.to_string(), label),
    };

    let mut labels = BTreeMap::new();
    for section in &schedule.sections {
        let (id, label) = scoped(&section.crn, compact_course(&section.course));
        labels.insert(id, label);
    }
    for event in &schedule.events {
        let (id, label) = scoped(&event.id.to_string(), event.name.clone());
        labels.insert(id, label);
    }
    labels
}

fn compact_course(course: &str) -> String {
    course.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::compact_course;

    #[test]
    fn course_labels_drop_whitespace() {
        assert_eq!(compact_course("CS 2110"), "CS2110");
        assert_eq!(compact_course("MATH 2551"), "MATH2551");
    }
}
