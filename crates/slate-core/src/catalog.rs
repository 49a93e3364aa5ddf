//! TOML course catalog: the upstream source sections are pinned from.
//!
//! Format:
//!
//! ```toml
//! [[section]]
//! crn = "80123"
//! course = "CS 2110"
//! title = "Computer Organization"
//! meetings = [
//!   { days = "MWF", period = "09:05-09:55", location = "Klaus 1443" },
//!   { days = "T", period = "TBA" },
//! ]
//! exam = { date = "2026-12-08", period = "08:00-10:50" }
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use serde::Deserialize;
use tracing::{debug, info};

use crate::schedule::{ExamBlock, Meeting, Section};
use crate::timeparse::{parse_days, parse_period};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "section")]
    sections: Vec<SectionEntry>,
}

#[derive(Debug, Deserialize)]
struct SectionEntry {
    crn: String,
    course: String,
    title: String,

    #[serde(default)]
    meetings: Vec<MeetingEntry>,

    #[serde(default)]
    exam: Option<ExamEntry>,
}

#[derive(Debug, Deserialize)]
struct MeetingEntry {
    days: String,
    period: String,

    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExamEntry {
    date: chrono::NaiveDate,
    period: String,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    sections: Vec<Section>,
}

impl Catalog {
    #[tracing::instrument(skip(path))]
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        let file: CatalogFile = toml::from_str(&text)
            .with_context(|| format!("failed to parse catalog {}", path.display()))?;

        let mut sections = Vec::with_capacity(file.sections.len());
        for entry in file.sections {
            let crn = entry.crn.clone();
            sections.push(
                convert_section(entry)
                    .with_context(|| format!("invalid catalog section crn {crn}"))?,
            );
        }

        info!(catalog = %path.display(), sections = sections.len(), "loaded catalog");
        Ok(Self { sections })
    }

    pub fn find(&self, crn: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.crn == crn)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }
}

fn convert_section(entry: SectionEntry) -> anyhow::Result<Section> {
    let mut meetings = Vec::with_capacity(entry.meetings.len());
    for meeting in entry.meetings {
        let days = parse_days(&meeting.days)?;
        let period = if meeting.period.eq_ignore_ascii_case("tba") {
            debug!(crn = %entry.crn, "meeting time is TBA");
            None
        } else {
            Some(parse_period(&meeting.period)?)
        };
        meetings.push(Meeting {
            days,
            period,
            location: meeting.location,
        });
    }

    let exam = entry
        .exam
        .map(|e| {
            Ok::<_, anyhow::Error>(ExamBlock {
                date: e.date,
                period: parse_period(&e.period)
                    .map_err(|err| anyhow!("invalid exam period: {err}"))?,
            })
        })
        .transpose()?;

    Ok(Section {
        crn: entry.crn,
        course: entry.course,
        title: entry.title,
        meetings,
        exam,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::Catalog;

    const SAMPLE: &str = r#"
[[section]]
crn = "80123"
course = "CS 2110"
title = "Computer Organization"
meetings = [
  { days = "MWF", period = "09:05-09:55", location = "Klaus 1443" },
  { days = "T", period = "TBA" },
]
exam = { date = "2026-12-08", period = "08:00-10:50" }

[[section]]
crn = "80456"
course = "MATH 2551"
title = "Multivariable Calculus"
meetings = [{ days = "TR", period = "12:30-13:45" }]
"#;

    #[test]
    fn loads_sections_meetings_and_exams() {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(SAMPLE.as_bytes()).expect("write");

        let catalog = Catalog::load(file.path()).expect("load catalog");
        assert_eq!(catalog.sections().len(), 2);

        let cs = catalog.find("80123").expect("cs section");
        assert_eq!(cs.meetings.len(), 2);
        assert!(cs.meetings[1].period.is_none());
        let exam = cs.exam.expect("exam");
        assert_eq!((exam.period.start, exam.period.end), (480, 650));

        assert!(catalog.find("99999").is_none());
    }

    #[test]
    fn rejects_bad_periods() {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(
            br#"
[[section]]
crn = "1"
course = "X"
title = "Y"
meetings = [{ days = "M", period = "25:00-26:00" }]
"#,
        )
        .expect("write");

        assert!(Catalog::load(file.path()).is_err());
    }
}
