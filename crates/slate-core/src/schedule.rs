//! Domain model: pinned sections, custom events, comparison schedules.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::layout::Period;

/// One recurring meeting of a section. `period: None` means the time is TBA
/// and the meeting never reaches the layout engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Meeting {
    pub days: BTreeSet<String>,

    #[serde(default)]
    pub period: Option<Period>,

    #[serde(default)]
    pub location: Option<String>,
}

/// A section's final-exam slot on a concrete calendar date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExamBlock {
    pub date: NaiveDate,
    pub period: Period,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    pub crn: String,
    pub course: String,
    pub title: String,

    #[serde(default)]
    pub meetings: Vec<Meeting>,

    #[serde(default)]
    pub exam: Option<ExamBlock>,
}

impl Section {
    /// Longest scheduled meeting, in minutes. Used to pre-order the finals
    /// view at item granularity.
    pub fn max_meeting_duration(&self) -> u16 {
        self.meetings
            .iter()
            .filter_map(|m| m.period)
            .map(|p| p.duration())
            .max()
            .unwrap_or(0)
    }
}

/// A user-defined recurring event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomEvent {
    pub id: Uuid,
    pub name: String,
    pub days: BTreeSet<String>,
    pub period: Period,
}

impl CustomEvent {
    pub fn new(name: String, days: BTreeSet<String>, period: Period) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            days,
            period,
        }
    }
}

/// Everything one schedule contributes to the grid. The viewer's own
/// schedule and each comparison overlay have the same shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schedule {
    #[serde(default)]
    pub sections: Vec<Section>,

    #[serde(default)]
    pub events: Vec<CustomEvent>,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{Meeting, Section};
    use crate::layout::Period;

    fn days(raw: &[&str]) -> BTreeSet<String> {
        raw.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn max_meeting_duration_skips_tba() {
        let section = Section {
            crn: "80123".to_string(),
            course: "CS 2110".to_string(),
            title: "Computer Organization".to_string(),
            meetings: vec![
                Meeting {
                    days: days(&["M", "W", "F"]),
                    period: Some(Period::new(545, 595)),
                    location: None,
                },
                Meeting {
                    days: days(&["T"]),
                    period: None,
                    location: None,
                },
                Meeting {
                    days: days(&["R"]),
                    period: Some(Period::new(600, 705)),
                    location: None,
                },
            ],
            exam: None,
        };
        assert_eq!(section.max_meeting_duration(), 105);
    }

    #[test]
    fn max_meeting_duration_is_zero_for_all_tba() {
        let section = Section {
            crn: "80124".to_string(),
            course: "CS 4641".to_string(),
            title: "Machine Learning".to_string(),
            meetings: vec![Meeting {
                days: days(&["F"]),
                period: None,
                location: None,
            }],
            exam: None,
        };
        assert_eq!(section.max_meeting_duration(), 0);
    }
}
