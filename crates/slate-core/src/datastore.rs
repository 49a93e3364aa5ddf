//! On-disk state: pinned sections, custom events, comparison overlays.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use crate::schedule::{CustomEvent, Schedule, Section};

#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub pinned_path: PathBuf,
    pub events_path: PathBuf,
    pub compare_dir: PathBuf,
    pub compare_active_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let pinned_path = data_dir.join("pinned.data");
        let events_path = data_dir.join("events.data");
        let compare_dir = data_dir.join("compare");
        let compare_active_path = data_dir.join("compare.active");

        if !pinned_path.exists() {
            fs::write(&pinned_path, "")?;
        }
        if !events_path.exists() {
            fs::write(&events_path, "")?;
        }
        if !compare_dir.exists() {
            fs::create_dir_all(&compare_dir)?;
        }
        if !compare_active_path.exists() {
            fs::write(&compare_active_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            pinned = %pinned_path.display(),
            events = %events_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            pinned_path,
            events_path,
            compare_dir,
            compare_active_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_pinned(&self) -> anyhow::Result<Vec<Section>> {
        load_jsonl(&self.pinned_path).context("failed to load pinned.data")
    }

    #[tracing::instrument(skip(self, sections))]
    pub fn save_pinned(&self, sections: &[Section]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.pinned_path, sections).context("failed to save pinned.data")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_events(&self) -> anyhow::Result<Vec<CustomEvent>> {
        load_jsonl(&self.events_path).context("failed to load events.data")
    }

    #[tracing::instrument(skip(self, events))]
    pub fn save_events(&self, events: &[CustomEvent]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.events_path, events).context("failed to save events.data")
    }

    /// The viewer's own schedule, as the views consume it.
    #[tracing::instrument(skip(self))]
    pub fn load_schedule(&self) -> anyhow::Result<Schedule> {
        Ok(Schedule {
            sections: self.load_pinned()?,
            events: self.load_events()?,
        })
    }

    #[tracing::instrument(skip(self, section), fields(crn = %section.crn))]
    pub fn pin_section(&self, section: Section) -> anyhow::Result<()> {
        let mut pinned = self.load_pinned()?;
        if pinned.iter().any(|s| s.crn == section.crn) {
            return Err(anyhow!("crn {} is already pinned", section.crn));
        }
        pinned.push(section);
        pinned.sort_by(|a, b| a.crn.cmp(&b.crn));
        self.save_pinned(&pinned)
    }

    #[tracing::instrument(skip(self))]
    pub fn unpin_section(&self, crn: &str) -> anyhow::Result<()> {
        let mut pinned = self.load_pinned()?;
        let before = pinned.len();
        pinned.retain(|s| s.crn != crn);
        if pinned.len() == before {
            return Err(anyhow!("crn {crn} is not pinned"));
        }
        self.save_pinned(&pinned)
    }

    #[tracing::instrument(skip(self, event), fields(id = %event.id))]
    pub fn add_event(&self, event: CustomEvent) -> anyhow::Result<()> {
        let mut events = self.load_events()?;
        events.push(event);
        self.save_events(&events)
    }

    /// Removes the event whose id starts with `prefix`; ambiguity is an error.
    #[tracing::instrument(skip(self))]
    pub fn remove_event(&self, prefix: &str) -> anyhow::Result<CustomEvent> {
        let mut events = self.load_events()?;
        let matches: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.id.to_string().starts_with(prefix))
            .map(|(idx, _)| idx)
            .collect();

        let idx = match matches.as_slice() {
            [] => return Err(anyhow!("no event matches id prefix {prefix}")),
            [one] => *one,
            _ => return Err(anyhow!("id prefix {prefix} is ambiguous")),
        };

        let removed = events.remove(idx);
        self.save_events(&events)?;
        Ok(removed)
    }

    #[tracing::instrument(skip(self, schedule))]
    pub fn import_overlay(&self, overlay_id: &str, schedule: &Schedule) -> anyhow::Result<()> {
        validate_overlay_id(overlay_id)?;
        let path = self.overlay_path(overlay_id);
        let serialized = serde_json::to_string_pretty(schedule)?;
        write_atomic(&path, &serialized)
            .with_context(|| format!("failed to save overlay {overlay_id}"))?;
        info!(overlay = overlay_id, "imported overlay schedule");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn remove_overlay(&self, overlay_id: &str) -> anyhow::Result<()> {
        validate_overlay_id(overlay_id)?;
        let path = self.overlay_path(overlay_id);
        if !path.exists() {
            return Err(anyhow!("no overlay named {overlay_id}"));
        }
        fs::remove_file(&path)
            .with_context(|| format!("failed to remove {}", path.display()))?;
        self.set_overlay_active(overlay_id, false)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn load_overlay(&self, overlay_id: &str) -> anyhow::Result<Schedule> {
        validate_overlay_id(overlay_id)?;
        let path = self.overlay_path(overlay_id);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("no overlay named {overlay_id}"))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse overlay {}", path.display()))
    }

    #[tracing::instrument(skip(self))]
    pub fn list_overlays(&self) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.compare_dir)
            .with_context(|| format!("failed reading {}", self.compare_dir.display()))?
        {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "data")
                && let Some(stem) = path.file_stem()
            {
                names.push(stem.to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Overlay ids currently toggled on for comparison mode.
    #[tracing::instrument(skip(self))]
    pub fn active_overlays(&self) -> anyhow::Result<Vec<String>> {
        let raw = fs::read_to_string(&self.compare_active_path)
            .with_context(|| format!("failed reading {}", self.compare_active_path.display()))?;
        Ok(raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    #[tracing::instrument(skip(self))]
    pub fn set_overlay_active(&self, overlay_id: &str, active: bool) -> anyhow::Result<()> {
        validate_overlay_id(overlay_id)?;
        if active && !self.overlay_path(overlay_id).exists() {
            return Err(anyhow!("no overlay named {overlay_id}"));
        }

        let mut current = self.active_overlays()?;
        current.retain(|id| id != overlay_id);
        if active {
            current.push(overlay_id.to_string());
            current.sort();
        }

        let payload = if current.is_empty() {
            String::new()
        } else {
            format!("{}\n", current.join("\n"))
        };
        fs::write(&self.compare_active_path, payload)
            .with_context(|| format!("failed writing {}", self.compare_active_path.display()))?;
        debug!(overlay = overlay_id, active, "toggled overlay");
        Ok(())
    }

    /// Loads every active overlay with its schedule, for the weekly view.
    #[tracing::instrument(skip(self))]
    pub fn load_active_overlays(&self) -> anyhow::Result<Vec<(String, Schedule)>> {
        let mut out = Vec::new();
        for overlay_id in self.active_overlays()? {
            let schedule = self.load_overlay(&overlay_id)?;
            out.push((overlay_id, schedule));
        }
        Ok(out)
    }

    fn overlay_path(&self, overlay_id: &str) -> PathBuf {
        self.compare_dir.join(format!("{overlay_id}.data"))
    }
}

/// Overlay ids become file stems and id namespaces; keep them simple.
fn validate_overlay_id(overlay_id: &str) -> anyhow::Result<()> {
    if overlay_id.is_empty() {
        return Err(anyhow!("overlay id cannot be empty"));
    }
    if !overlay_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(anyhow!(
            "overlay id must be alphanumeric or underscore: {overlay_id}"
        ));
    }
    // Uuids would collide with the "{overlay}-{event}" namespacing scheme.
    if Uuid::parse_str(overlay_id).is_ok() {
        return Err(anyhow!("overlay id cannot be a uuid: {overlay_id}"));
    }
    Ok(())
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let item: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(item);
    }

    debug!(count = out.len(), "loaded jsonl records");
    Ok(out)
}

#[tracing::instrument(skip(path, items))]
fn save_jsonl_atomic<T: Serialize>(path: &Path, items: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = items.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for item in items {
        let serialized = serde_json::to_string(item)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

fn write_atomic(path: &Path, payload: &str) -> anyhow::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(payload.as_bytes())?;
    temp.flush()?;
    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use tempfile::tempdir;

    use super::DataStore;
    use crate::layout::Period;
    use crate::schedule::{CustomEvent, Schedule, Section};

    fn store() -> (tempfile::TempDir, DataStore) {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open datastore");
        (temp, store)
    }

    fn section(crn: &str) -> Section {
        Section {
            crn: crn.to_string(),
            course: "CS 0000".to_string(),
            title: "Test".to_string(),
            meetings: vec![],
            exam: None,
        }
    }

    #[test]
    fn pin_unpin_roundtrip() {
        let (_temp, store) = store();
        store.pin_section(section("80123")).expect("pin");
        store.pin_section(section("80001")).expect("pin second");

        let pinned = store.load_pinned().expect("load");
        let crns: Vec<&str> = pinned.iter().map(|s| s.crn.as_str()).collect();
        assert_eq!(crns, vec!["80001", "80123"]);

        assert!(store.pin_section(section("80123")).is_err());

        store.unpin_section("80123").expect("unpin");
        assert_eq!(store.load_pinned().expect("load").len(), 1);
        assert!(store.unpin_section("80123").is_err());
    }

    #[test]
    fn event_prefix_removal() {
        let (_temp, store) = store();
        let days: BTreeSet<String> = ["M".to_string()].into_iter().collect();
        let event = CustomEvent::new("Gym".to_string(), days, Period::new(1020, 1080));
        let id = event.id.to_string();

        store.add_event(event).expect("add");
        assert!(store.remove_event("zzzz").is_err());

        let removed = store.remove_event(&id[..8]).expect("remove by prefix");
        assert_eq!(removed.id.to_string(), id);
        assert!(store.load_events().expect("load").is_empty());
    }

    #[test]
    fn overlay_toggle_flow() {
        let (_temp, store) = store();
        let friend = Schedule {
            sections: vec![section("80456")],
            events: vec![],
        };

        assert!(store.set_overlay_active("alex", true).is_err());

        store.import_overlay("alex", &friend).expect("import");
        assert_eq!(store.list_overlays().expect("list"), vec!["alex"]);

        store.set_overlay_active("alex", true).expect("toggle on");
        let active = store.load_active_overlays().expect("active");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].0, "alex");
        assert_eq!(active[0].1, friend);

        store.set_overlay_active("alex", false).expect("toggle off");
        assert!(store.active_overlays().expect("active").is_empty());

        store.remove_overlay("alex").expect("remove");
        assert!(store.list_overlays().expect("list").is_empty());
    }

    #[test]
    fn overlay_ids_are_validated() {
        let (_temp, store) = store();
        assert!(store.import_overlay("", &Schedule::default()).is_err());
        assert!(store.import_overlay("../evil", &Schedule::default()).is_err());
    }
}
