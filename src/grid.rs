//! Heatmap grid
//!
//! Composes the 7 x 15 day-by-hour grid from the current record set and view
//! state, and renders it as text.

use crate::binding::DataBindingLayer;
use crate::calendar::{hour_range_label, tooltip_date};
use crate::store::SpeedStore;
use crate::types::{DayOfWeek, SpeedRecord, SpeedTier, ViewWindow, FIRST_HOUR, LAST_HOUR, WEEKS_PER_MONTH};
use crate::view_state::ViewStateController;
use serde::Serialize;
use std::fmt::Write;

/// Hover details of a cell with a record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub date: String,
    pub speed: String,
}

impl Tooltip {
    fn from_record(record: &SpeedRecord) -> Self {
        Self {
            date: format!("Date: {}", tooltip_date(&record.timestamp)),
            speed: format!("Speed: {:.2} km/hr", record.speed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell {
    pub day: DayOfWeek,
    pub hour: u32,
    pub tier: SpeedTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    pub is_now: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<Tooltip>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridRow {
    pub hour: u32,
    pub label: String,
    pub cells: Vec<GridCell>,
}

/// Renderable snapshot of the heatmap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapGrid {
    pub semester: String,
    pub month_label: String,
    pub window: ViewWindow,
    pub rows: Vec<GridRow>,
}

impl HeatmapGrid {
    pub fn build<S: SpeedStore>(
        binding: &DataBindingLayer<S>,
        view: &ViewStateController,
    ) -> Self {
        let hover = view.hover_state();
        let rows = (FIRST_HOUR..=LAST_HOUR)
            .map(|hour| GridRow {
                hour,
                label: hour_range_label(hour),
                cells: DayOfWeek::ALL
                    .iter()
                    .map(|&day| {
                        let record = binding.find(day, hour);
                        let hovered = hover.is_some_and(|h| h.day == day && h.hour == hour);
                        GridCell {
                            day,
                            hour,
                            tier: SpeedTier::classify(record.map(|r| r.speed)),
                            speed: record.map(|r| r.speed),
                            record_id: record.map(|r| r.id.clone()),
                            is_now: view.is_current_cell(day, hour),
                            tooltip: record.filter(|_| hovered).map(Tooltip::from_record),
                        }
                    })
                    .collect(),
            })
            .collect();

        Self {
            semester: view.semester().label().to_string(),
            month_label: view.month_label(),
            window: view.window(),
            rows,
        }
    }

    pub fn cell(&self, day: DayOfWeek, hour: u32) -> Option<&GridCell> {
        self.rows
            .iter()
            .find(|row| row.hour == hour)
            .map(|row| &row.cells[day.index()])
    }

    pub fn cells(&self) -> impl Iterator<Item = &GridCell> {
        self.rows.iter().flat_map(|row| row.cells.iter())
    }

    /// Plain-text rendering: header, week selector, one line per hour
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.semester);
        let _ = writeln!(out, "< {} >  [Today]", self.month_label);

        let weeks: Vec<String> = (1..=WEEKS_PER_MONTH)
            .map(|week| {
                if week == self.window.week {
                    format!("[Week {}]", week)
                } else {
                    format!(" Week {} ", week)
                }
            })
            .collect();
        let _ = writeln!(out, "{}", weeks.join(" "));
        out.push('\n');

        let _ = write!(out, "{:<12}", "");
        for day in DayOfWeek::ALL {
            let _ = write!(out, " {:^3}", day.as_str());
        }
        out.push('\n');

        let mut tooltips = Vec::new();
        for row in &self.rows {
            let _ = write!(out, "{:<12}", row.label);
            for cell in &row.cells {
                let glyph = cell.tier.glyph();
                if cell.is_now {
                    let _ = write!(out, " [{}]", glyph);
                } else {
                    let _ = write!(out, "  {} ", glyph);
                }
                if let Some(tooltip) = &cell.tooltip {
                    tooltips.push((cell.day, cell.hour, tooltip));
                }
            }
            out.push('\n');
        }

        for (day, hour, tooltip) in tooltips {
            let _ = writeln!(out, "\n{} {}: {} | {}", day, hour_range_label(hour), tooltip.date, tooltip.speed);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppEvent;
    use crate::store::{MemoryStore, StoreDocument};
    use crate::view_state::FixedClock;
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::mpsc::channel;

    fn setup() -> (DataBindingLayer<MemoryStore>, ViewStateController) {
        let offset = FixedOffset::east_opt(7 * 3600).unwrap();
        let store = MemoryStore::with_documents(
            "slot",
            vec![
                StoreDocument::new("fast", Utc.with_ymd_and_hms(2024, 1, 16, 14, 30, 0).unwrap(), 12.0),
                StoreDocument::new("slow", Utc.with_ymd_and_hms(2024, 1, 17, 16, 0, 0).unwrap(), 6.99),
                StoreDocument::new("mid", Utc.with_ymd_and_hms(2024, 1, 18, 15, 0, 0).unwrap(), 7.0),
            ],
        );
        let (tx, rx) = channel();
        let mut binding = DataBindingLayer::new(store, "slot", offset, tx);

        // Thursday 18 January 2024, 15:20 local
        let now = NaiveDate::from_ymd_opt(2024, 1, 18)
            .unwrap()
            .and_hms_opt(15, 20, 0)
            .unwrap();
        let view = ViewStateController::new(Box::new(FixedClock::new(now)));
        binding.on_window_changed(&view.window());
        for event in rx.try_iter() {
            if let AppEvent::Snapshot(push) = event {
                binding.apply_snapshot(push);
            }
        }
        (binding, view)
    }

    #[test]
    fn test_grid_shape_and_tiers() {
        let (binding, view) = setup();
        let grid = HeatmapGrid::build(&binding, &view);

        assert_eq!(grid.rows.len(), 15);
        assert!(grid.rows.iter().all(|row| row.cells.len() == 7));
        assert_eq!(grid.rows[0].label, "08.01-09.00");

        assert_eq!(grid.cell(DayOfWeek::Tue, 14).unwrap().tier, SpeedTier::Fast);
        assert_eq!(grid.cell(DayOfWeek::Wed, 16).unwrap().tier, SpeedTier::Slow);
        assert_eq!(grid.cell(DayOfWeek::Thu, 15).unwrap().tier, SpeedTier::Moderate);
        assert_eq!(grid.cell(DayOfWeek::Mon, 8).unwrap().tier, SpeedTier::Unknown);
        assert_eq!(grid.cells().filter(|c| c.tier != SpeedTier::Unknown).count(), 3);
    }

    #[test]
    fn test_now_highlight() {
        let (binding, view) = setup();
        let grid = HeatmapGrid::build(&binding, &view);
        let now: Vec<_> = grid.cells().filter(|c| c.is_now).map(|c| (c.day, c.hour)).collect();
        assert_eq!(now, vec![(DayOfWeek::Thu, 15)]);
    }

    #[test]
    fn test_tooltip_only_on_hovered_cell_with_record() {
        let (binding, mut view) = setup();
        view.hover(DayOfWeek::Tue, 14);
        let grid = HeatmapGrid::build(&binding, &view);
        assert_eq!(
            grid.cell(DayOfWeek::Tue, 14).unwrap().tooltip,
            Some(Tooltip {
                date: "Date: 16/01/2024".to_string(),
                speed: "Speed: 12.00 km/hr".to_string(),
            })
        );
        assert_eq!(grid.cells().filter(|c| c.tooltip.is_some()).count(), 1);

        view.hover(DayOfWeek::Mon, 8);
        let grid = HeatmapGrid::build(&binding, &view);
        assert_eq!(grid.cells().filter(|c| c.tooltip.is_some()).count(), 0);

        view.hover(DayOfWeek::Tue, 14);
        view.leave();
        let grid = HeatmapGrid::build(&binding, &view);
        assert_eq!(grid.cells().filter(|c| c.tooltip.is_some()).count(), 0);
    }

    #[test]
    fn test_render_text() {
        let (binding, mut view) = setup();
        view.hover(DayOfWeek::Wed, 16);
        let text = HeatmapGrid::build(&binding, &view).render_text();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "2nd Semester (November - March)");
        assert_eq!(lines[1], "< January 2024 >  [Today]");
        assert!(lines[2].contains("[Week 3]"));
        assert!(lines[4].starts_with("             MON"));
        let row_15 = lines.iter().find(|l| l.starts_with("15.01-16.00")).unwrap();
        assert!(row_15.contains("[M]"));
        assert!(text.contains("WED 16.01-17.00: Date: 17/01/2024 | Speed: 6.99 km/hr"));
    }

    #[test]
    fn test_grid_serializes() {
        let (binding, view) = setup();
        let grid = HeatmapGrid::build(&binding, &view);
        let value = serde_json::to_value(&grid).unwrap();
        assert_eq!(value["month_label"], "January 2024");
        assert_eq!(value["rows"][6]["cells"][1]["tier"], "fast");
        assert_eq!(value["rows"][6]["cells"][1]["day"], "TUE");
        assert!(value["rows"][0]["cells"][0].get("speed").is_none());
    }
}
