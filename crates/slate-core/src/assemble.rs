//! Builds the interval lists each view feeds to the layout engine.
//!
//! This is where validation lives: TBA meetings are dropped here and never
//! reach [`crate::layout::resolve`]. Comparison overlays get their ids
//! namespaced by overlay id so they can never collide with the viewer's own
//! sections and events.

use tracing::debug;

use crate::layout::{PlaceableInterval, Period};
use crate::schedule::{CustomEvent, Schedule, Section};

pub const DRAFT_ID: &str = "draft";

/// Intervals for the weekly view: the viewer's pinned sections and events,
/// plus any toggled-on comparison overlays.
pub fn weekly_intervals(
    schedule: &Schedule,
    overlays: &[(String, Schedule)],
) -> Vec<PlaceableInterval> {
    let mut out = Vec::new();

    push_schedule(&mut out, schedule, None);
    for (overlay_id, overlay) in overlays {
        push_schedule(&mut out, overlay, Some(overlay_id));
    }

    debug!(
        intervals = out.len(),
        overlays = overlays.len(),
        "assembled weekly intervals"
    );
    out
}

fn push_schedule(out: &mut Vec<PlaceableInterval>, schedule: &Schedule, namespace: Option<&str>) {
    let scoped = |raw: &str| match namespace {
        Some(ns) => format!("{ns}-{raw}"),
        None => raw.to_string(),
    };

    for section in &schedule.sections {
        for meeting in &section.meetings {
            let Some(period) = meeting.period else {
                debug!(crn = %section.crn, "skipping TBA meeting");
                continue;
            };
            out.push(PlaceableInterval {
                id: scoped(&section.crn),
                day_keys: meeting.days.clone(),
                period,
            });
        }
    }

    for event in &schedule.events {
        out.push(PlaceableInterval {
            id: scoped(&event.id.to_string()),
            day_keys: event.days.clone(),
            period: event.period,
        });
    }
}

/// Intervals for the finals view: one per section with an exam block, on the
/// exam's calendar date. Sections are pre-ordered by their longest weekly
/// meeting; exam blocks themselves are mostly equal-length, so this coarse
/// ordering is what actually decides ties inside the engine.
pub fn finals_intervals(sections: &[Section]) -> Vec<PlaceableInterval> {
    let mut with_exams: Vec<&Section> = sections.iter().filter(|s| s.exam.is_some()).collect();
    with_exams.sort_by_key(|s| s.max_meeting_duration());

    let mut out = Vec::with_capacity(with_exams.len());
    for section in with_exams {
        let Some(exam) = section.exam else {
            continue;
        };
        out.push(PlaceableInterval::new(
            section.crn.clone(),
            [exam.date.format("%Y-%m-%d").to_string()],
            exam.period,
        ));
    }

    debug!(intervals = out.len(), "assembled finals intervals");
    out
}

/// Intervals for the in-progress draft preview: the draft plus the existing
/// events it might overlap, through the same engine as everything else.
pub fn preview_intervals(
    day_key: &str,
    period: Period,
    events: &[CustomEvent],
) -> Vec<PlaceableInterval> {
    let mut out = Vec::with_capacity(events.len() + 1);

    for event in events {
        if event.days.contains(day_key) {
            out.push(PlaceableInterval::new(
                event.id.to_string(),
                [day_key.to_string()],
                event.period,
            ));
        }
    }
    out.push(PlaceableInterval::new(
        DRAFT_ID,
        [day_key.to_string()],
        period,
    ));

    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::{DRAFT_ID, finals_intervals, preview_intervals, weekly_intervals};
    use crate::layout::Period;
    use crate::schedule::{CustomEvent, ExamBlock, Meeting, Schedule, Section};

    fn days(raw: &[&str]) -> BTreeSet<String> {
        raw.iter().map(|d| d.to_string()).collect()
    }

    fn section(crn: &str, meetings: Vec<Meeting>, exam: Option<ExamBlock>) -> Section {
        Section {
            crn: crn.to_string(),
            course: "CS 0000".to_string(),
            title: "Test".to_string(),
            meetings,
            exam,
        }
    }

    fn meeting(day_list: &[&str], period: Option<Period>) -> Meeting {
        Meeting {
            days: days(day_list),
            period,
            location: None,
        }
    }

    #[test]
    fn tba_meetings_never_reach_the_engine() {
        let schedule = Schedule {
            sections: vec![section(
                "80123",
                vec![
                    meeting(&["M", "W"], Some(Period::new(545, 595))),
                    meeting(&["F"], None),
                ],
                None,
            )],
            events: vec![],
        };

        let intervals = weekly_intervals(&schedule, &[]);
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].id, "80123");
    }

    #[test]
    fn overlay_ids_are_namespaced() {
        let event = CustomEvent {
            id: Uuid::nil(),
            name: "Gym".to_string(),
            days: days(&["T"]),
            period: Period::new(1020, 1080),
        };
        let friend = Schedule {
            sections: vec![section(
                "80456",
                vec![meeting(&["M"], Some(Period::new(600, 650)))],
                None,
            )],
            events: vec![event],
        };

        let intervals = weekly_intervals(
            &Schedule::default(),
            &[("alex".to_string(), friend)],
        );
        let ids: Vec<&str> = intervals.iter().map(|iv| iv.id.as_str()).collect();
        assert!(ids.contains(&"alex-80456"));
        assert!(ids.contains(&format!("alex-{}", Uuid::nil()).as_str()));
    }

    #[test]
    fn finals_are_keyed_by_exam_date_and_preordered() {
        let date = NaiveDate::from_ymd_opt(2026, 12, 8).expect("date");
        let exam = ExamBlock {
            date,
            period: Period::new(480, 650),
        };

        // Long lecture section listed first, short one second; pre-order by
        // max meeting duration must flip them.
        let long = section(
            "1",
            vec![meeting(&["T", "R"], Some(Period::new(600, 705)))],
            Some(exam),
        );
        let short = section(
            "2",
            vec![meeting(&["M", "W", "F"], Some(Period::new(545, 595)))],
            Some(exam),
        );
        let no_exam = section("3", vec![], None);

        let intervals = finals_intervals(&[long, short, no_exam]);
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].id, "2");
        assert_eq!(intervals[1].id, "1");
        assert!(intervals[0].day_keys.contains("2026-12-08"));
    }

    #[test]
    fn preview_includes_only_same_day_events() {
        let monday_event = CustomEvent {
            id: Uuid::new_v4(),
            name: "Club".to_string(),
            days: days(&["M"]),
            period: Period::new(900, 960),
        };
        let tuesday_event = CustomEvent {
            id: Uuid::new_v4(),
            name: "Gym".to_string(),
            days: days(&["T"]),
            period: Period::new(900, 960),
        };

        let intervals = preview_intervals(
            "M",
            Period::new(930, 990),
            &[monday_event.clone(), tuesday_event],
        );
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].id, monday_event.id.to_string());
        assert_eq!(intervals[1].id, DRAFT_ID);
    }
}
