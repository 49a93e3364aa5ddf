//! Terminal output: the day-by-time grid and the listing tables.

use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::Config;
use crate::geometry::{DayColumn, Rect, TimeWindow, project};
use crate::layout::{PlacementInfo, PositionIndex, placements_for_day};
use crate::schedule::{CustomEvent, Section};
use crate::timeparse::{format_minutes, format_period};

/// Shape of the character grid a view renders into.
#[derive(Debug, Clone)]
pub struct GridSpec {
    pub window: TimeWindow,
    pub slot_minutes: u16,
    pub day_width: usize,
    pub day_keys: Vec<String>,
}

const FILL: char = '░';

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    /// Draws the resolved layout as a grid. `labels` maps item ids to the
    /// short text painted into their blocks; unlabelled ids fall back to the
    /// id itself.
    #[tracing::instrument(skip(self, index, labels, spec))]
    pub fn print_grid(
        &mut self,
        index: &PositionIndex,
        labels: &BTreeMap<String, String>,
        spec: &GridSpec,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        for line in grid_lines(index, labels, spec) {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, sections))]
    pub fn print_sections_table(&mut self, sections: &[Section]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "CRN".to_string(),
            "Course".to_string(),
            "Title".to_string(),
            "Meetings".to_string(),
            "Exam".to_string(),
        ];

        let mut rows = Vec::with_capacity(sections.len());
        for section in sections {
            let meetings = section
                .meetings
                .iter()
                .map(|m| {
                    let days: String = m.days.iter().map(String::as_str).collect();
                    match m.period {
                        Some(period) => format!("{days} {}", format_period(period)),
                        None => format!("{days} TBA"),
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");

            let exam = section
                .exam
                .map(|e| format!("{} {}", e.date.format("%Y-%m-%d"), format_period(e.period)))
                .unwrap_or_default();

            rows.push(vec![
                self.paint(&section.crn, "33"),
                section.course.clone(),
                section.title.clone(),
                meetings,
                exam,
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, events))]
    pub fn print_events_table(&mut self, events: &[CustomEvent]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "Id".to_string(),
            "Name".to_string(),
            "Days".to_string(),
            "Period".to_string(),
        ];

        let mut rows = Vec::with_capacity(events.len());
        for event in events {
            let short_id = event.id.to_string()[..8].to_string();
            let days: String = event.days.iter().map(String::as_str).collect();
            rows.push(vec![
                self.paint(&short_id, "33"),
                event.name.clone(),
                days,
                format_period(event.period),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    /// One-line report for the draft preview path.
    #[tracing::instrument(skip(self, placement, rect))]
    pub fn print_preview(
        &mut self,
        day_key: &str,
        placement: &PlacementInfo,
        rect: &Rect,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(
            out,
            "draft {} on {day_key}: column {} of {}",
            format_period(placement.period),
            placement.column_index + 1,
            placement.column_count,
        )?;
        writeln!(
            out,
            "rect: top={:.2}% left={:.2}% width={:.2}% height={:.2}%",
            rect.top, rect.left, rect.width, rect.height
        )?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// Renders the grid into plain text lines, one per time slot plus a header.
pub fn grid_lines(
    index: &PositionIndex,
    labels: &BTreeMap<String, String>,
    spec: &GridSpec,
) -> Vec<String> {
    let rows = usize::from(spec.window.span_minutes().div_ceil(spec.slot_minutes));
    let gutter = format_minutes(0).len() + 1;

    let mut lanes: Vec<Vec<Vec<char>>> = spec
        .day_keys
        .iter()
        .map(|_| vec![vec![' '; spec.day_width]; rows])
        .collect();

    for (lane, day) in spec.day_keys.iter().enumerate() {
        let mut placed = placements_for_day(index, day);
        placed.sort_by_key(|p| (p.period, p.column_index));

        for info in placed {
            // Horizontal fractions come from the projector; the lane itself
            // is the full 100%.
            let rect = project(
                info,
                spec.window,
                DayColumn {
                    width_percent: 100.0,
                    offset_percent: 0.0,
                },
            );
            let label = labels.get(&info.id).unwrap_or(&info.id);
            blit_block(&mut lanes[lane], &rect, label, spec.day_width, rows);
        }
    }

    let mut lines = Vec::with_capacity(rows + 1);

    let mut header = " ".repeat(gutter);
    for day in &spec.day_keys {
        header.push('│');
        header.push_str(&fit_to_width(day, spec.day_width, ' '));
    }
    header.push('│');
    lines.push(header);

    for row in 0..rows {
        let minute = spec.window.start + row as u16 * spec.slot_minutes;
        let mut line = format!("{} ", format_minutes(minute));
        for lane in &lanes {
            line.push('│');
            line.extend(lane[row].iter());
        }
        line.push('│');
        lines.push(line);
    }

    lines
}

/// Paints one block into a lane's character cells: label on the first visible
/// row, fill below, clipped to the window.
fn blit_block(lane: &mut [Vec<char>], rect: &Rect, label: &str, day_width: usize, rows: usize) {
    let row_start = (rect.top / 100.0 * rows as f64).floor().max(0.0) as usize;
    let row_end = ((rect.top + rect.height) / 100.0 * rows as f64).ceil() as usize;
    let row_end = row_end.clamp(row_start, rows);
    if row_start >= rows {
        return;
    }

    let col_start = (rect.left / 100.0 * day_width as f64).round() as usize;
    let col_start = col_start.min(day_width.saturating_sub(1));
    let span = ((rect.width / 100.0 * day_width as f64).floor() as usize).max(1);
    let span = span.min(day_width - col_start);

    let text = fit_to_width(label, span, FILL);
    for (row, lane_row) in lane.iter_mut().enumerate().take(row_end).skip(row_start) {
        let source: Vec<char> = if row == row_start {
            text.chars().collect()
        } else {
            vec![FILL; span]
        };
        for (offset, ch) in source.into_iter().enumerate() {
            lane_row[col_start + offset] = ch;
        }
    }
}

/// Truncates or pads `text` to exactly `width` single-cell characters.
/// Double-width characters are replaced so the cell grid stays aligned.
fn fit_to_width(text: &str, width: usize, pad: char) -> String {
    let mut out = String::with_capacity(width);
    let mut used = 0;
    for ch in text.chars() {
        if used == width {
            break;
        }
        match UnicodeWidthChar::width(ch) {
            Some(1) => out.push(ch),
            _ => out.push('?'),
        }
        used += 1;
    }
    while used < width {
        out.push(pad);
        used += 1;
    }
    out
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{GridSpec, grid_lines};
    use crate::geometry::TimeWindow;
    use crate::layout::{PlaceableInterval, Period, resolve};

    fn spec(day_width: usize) -> GridSpec {
        GridSpec {
            window: TimeWindow::new(480, 720),
            slot_minutes: 60,
            day_width,
            day_keys: vec!["M".to_string(), "T".to_string()],
        }
    }

    fn iv(id: &str, day: &str, start: u16, end: u16) -> PlaceableInterval {
        PlaceableInterval::new(id, [day.to_string()], Period::new(start, end))
    }

    #[test]
    fn lone_block_fills_its_lane() {
        let index = resolve(&[iv("CS2110", "M", 540, 660)]);
        let lines = grid_lines(&index, &BTreeMap::new(), &spec(8));

        // Header plus four hourly rows.
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("M"));
        assert!(lines[1].starts_with("08:00"));

        // 09:00-11:00 block: label row then a fill row.
        assert!(lines[2].contains("CS2110░░"));
        assert!(lines[3].contains("░░░░░░░░"));
        assert!(!lines[4].contains('░'));
    }

    #[test]
    fn overlapping_blocks_split_the_lane() {
        let index = resolve(&[iv("A", "M", 540, 660), iv("B", "M", 540, 660)]);
        let lines = grid_lines(&index, &BTreeMap::new(), &spec(8));

        // Two columns of four characters each inside an eight-wide lane.
        assert!(lines[2].contains("A░░░B░░░"));
    }

    #[test]
    fn labels_override_raw_ids() {
        let mut labels = BTreeMap::new();
        labels.insert("80123".to_string(), "CS2110".to_string());
        let index = resolve(&[iv("80123", "M", 540, 600)]);
        let lines = grid_lines(&index, &labels, &spec(8));
        assert!(lines.iter().any(|line| line.contains("CS2110")));
    }

    #[test]
    fn block_straddling_window_start_is_clipped() {
        let index = resolve(&[iv("EARLY", "M", 420, 540)]);
        let lines = grid_lines(&index, &BTreeMap::new(), &spec(8));
        // Only the 08:00 row shows the block; nothing panics on the
        // off-screen part.
        assert!(lines[1].contains('░') || lines[1].contains("EARLY"));
        assert!(!lines[3].contains('░'));
    }
}
