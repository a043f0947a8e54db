//! View state
//!
//! The controller is the single source of truth for which week is on screen.
//! It owns the selected window, the hover cell and the current-hour ticker,
//! and derives the semester and month labels from them.

use crate::calendar::{self, to_local};
use crate::types::{BucketKey, DayOfWeek, HoverState, Semester, ViewWindow, WEEKS_PER_MONTH};
use chrono::{Datelike, FixedOffset, NaiveDateTime, Timelike, Utc};
#[cfg(test)]
use std::cell::Cell;
#[cfg(test)]
use std::rc::Rc;

/// Source of the local wall-clock time
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in a fixed UTC offset
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        to_local(&Utc::now(), &self.offset)
    }
}

/// Manually driven clock; clones share the same time
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Rc<Cell<NaiveDateTime>>,
}

#[cfg(test)]
impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        self.now.set(now);
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now.get()
    }
}

/// Navigation state of the heatmap
pub struct ViewStateController {
    clock: Box<dyn Clock>,
    window: ViewWindow,
    current_hour: u32,
    hover: HoverState,
}

impl ViewStateController {
    /// Create a controller positioned on the current week
    pub fn new(clock: Box<dyn Clock>) -> Self {
        let now = clock.now();
        let mut controller = Self {
            clock,
            window: ViewWindow::new(now.year(), now.month0(), 1),
            current_hour: now.hour(),
            hover: None,
        };
        controller.reset_to_today();
        controller
    }

    /// Create a controller on an explicit window
    pub fn with_window(clock: Box<dyn Clock>, window: ViewWindow) -> Self {
        let current_hour = clock.now().hour();
        Self {
            clock,
            window,
            current_hour,
            hover: None,
        }
    }

    pub fn window(&self) -> ViewWindow {
        self.window
    }

    pub fn hover_state(&self) -> HoverState {
        self.hover
    }

    pub fn current_hour(&self) -> u32 {
        self.current_hour
    }

    /// Step one month back (`-1`) or forward (`+1`) and select week 1.
    ///
    /// Returns whether the window changed.
    pub fn change_month(&mut self, delta: i32) -> bool {
        let (year, month) = calendar::shift_month(self.window.year, self.window.month, delta);
        self.replace_window(ViewWindow { year, month, week: 1 })
    }

    /// Select a week of the current month.
    ///
    /// Weeks outside `1..=5` are ignored. The week is not checked against the
    /// month length; a week past the end of the month selects an empty window.
    pub fn change_week(&mut self, week: u32) -> bool {
        if !(1..=WEEKS_PER_MONTH).contains(&week) {
            return false;
        }
        self.replace_window(ViewWindow { week, ..self.window })
    }

    /// Jump to the month and week containing today.
    pub fn reset_to_today(&mut self) -> bool {
        let now = self.clock.now();
        self.current_hour = now.hour();
        self.replace_window(Self::window_containing(&now))
    }

    /// Refresh the current-hour ticker; returns whether the hour rolled over.
    pub fn tick(&mut self) -> bool {
        let hour = self.clock.now().hour();
        let changed = hour != self.current_hour;
        self.current_hour = hour;
        changed
    }

    /// Whether `(day, hour)` is the cell for right now in the selected week
    pub fn is_current_cell(&self, day: DayOfWeek, hour: u32) -> bool {
        let now = self.clock.now();
        DayOfWeek::from(now.weekday()) == day
            && now.hour() == hour
            && Self::window_containing(&now) == self.window
    }

    pub fn semester(&self) -> Semester {
        Semester::from_month(self.window.month)
    }

    pub fn month_label(&self) -> String {
        calendar::month_label(self.window.year, self.window.month)
    }

    pub fn hover(&mut self, day: DayOfWeek, hour: u32) {
        self.hover = Some(BucketKey::new(day, hour));
    }

    pub fn leave(&mut self) {
        self.hover = None;
    }

    fn window_containing(now: &NaiveDateTime) -> ViewWindow {
        ViewWindow {
            year: now.year(),
            month: now.month0(),
            week: calendar::week_of_month(now.date()),
        }
    }

    fn replace_window(&mut self, window: ViewWindow) -> bool {
        let changed = window != self.window;
        self.window = window;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 15, 0)
            .unwrap()
    }

    fn controller_at(now: NaiveDateTime) -> (ViewStateController, FixedClock) {
        let clock = FixedClock::new(now);
        (ViewStateController::new(Box::new(clock.clone())), clock)
    }

    #[test]
    fn test_initial_state_is_today() {
        let (controller, _) = controller_at(at(2026, 10, 16, 9));
        assert_eq!(controller.window(), ViewWindow::new(2026, 9, 3));
        assert_eq!(controller.current_hour(), 9);
        assert_eq!(controller.hover_state(), None);
    }

    #[test]
    fn test_change_month_forward_rolls_year() {
        let clock = FixedClock::new(at(2026, 10, 16, 9));
        let mut controller =
            ViewStateController::with_window(Box::new(clock), ViewWindow::new(2024, 11, 3));
        assert!(controller.change_month(1));
        assert_eq!(controller.window(), ViewWindow::new(2025, 0, 1));
    }

    #[test]
    fn test_change_month_backward_rolls_year() {
        let clock = FixedClock::new(at(2026, 10, 16, 9));
        let mut controller =
            ViewStateController::with_window(Box::new(clock), ViewWindow::new(2024, 0, 2));
        controller.change_month(-1);
        assert_eq!(controller.window(), ViewWindow::new(2023, 11, 1));
    }

    #[test]
    fn test_change_month_all_pairs() {
        for month in 0..12u32 {
            for delta in [-1i32, 1] {
                let clock = FixedClock::new(at(2026, 10, 16, 9));
                let mut controller = ViewStateController::with_window(
                    Box::new(clock),
                    ViewWindow::new(2024, month, 4),
                );
                controller.change_month(delta);
                let window = controller.window();
                assert_eq!(window.month, ((month as i32 + delta + 12) % 12) as u32);
                assert_eq!(window.week, 1);
                let boundary = (month == 11 && delta == 1) || (month == 0 && delta == -1);
                let expected_year = if boundary { 2024 + delta } else { 2024 };
                assert_eq!(window.year, expected_year);
            }
        }
    }

    #[test]
    fn test_change_week_accepts_week_five_in_short_month() {
        let clock = FixedClock::new(at(2026, 10, 16, 9));
        let mut controller =
            ViewStateController::with_window(Box::new(clock), ViewWindow::new(2023, 1, 1));
        assert!(controller.change_week(5));
        assert_eq!(controller.window().week, 5);
        assert!(!controller.change_week(5));
    }

    #[test]
    fn test_change_week_ignores_out_of_range() {
        let (mut controller, _) = controller_at(at(2026, 10, 16, 9));
        for week in [0, 6, 9, u32::MAX] {
            assert!(!controller.change_week(week));
        }
        assert_eq!(controller.window(), ViewWindow::new(2026, 9, 3));
    }

    #[test]
    fn test_reset_to_today_recomputes() {
        let (mut controller, clock) = controller_at(at(2026, 10, 16, 9));
        controller.change_month(1);
        controller.change_month(1);

        clock.set(at(2027, 2, 27, 10));
        assert!(controller.reset_to_today());
        // February 2027 starts on a Monday (offset 1): (27 + 1) / 7 = 4
        assert_eq!(controller.window(), ViewWindow::new(2027, 1, 4));
    }

    #[test]
    fn test_reset_to_today_week_in_range() {
        let (mut controller, clock) = controller_at(at(2026, 1, 1, 9));
        let mut date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        while date.year() == 2026 {
            clock.set(date.and_hms_opt(12, 0, 0).unwrap());
            controller.reset_to_today();
            let window = controller.window();
            assert!((1..=5).contains(&window.week), "{} -> {}", date, window);
            assert_eq!(window.year, date.year());
            assert_eq!(window.month, date.month0());
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_is_current_cell_exactly_one() {
        let (controller, _) = controller_at(at(2026, 10, 16, 14));
        let mut hits = Vec::new();
        for day in DayOfWeek::ALL {
            for hour in 8..=22 {
                if controller.is_current_cell(day, hour) {
                    hits.push((day, hour));
                }
            }
        }
        assert_eq!(hits, vec![(DayOfWeek::Fri, 14)]);
    }

    #[test]
    fn test_is_current_cell_false_for_other_window() {
        let (mut controller, _) = controller_at(at(2026, 10, 16, 14));
        controller.change_week(2);
        for day in DayOfWeek::ALL {
            for hour in 8..=22 {
                assert!(!controller.is_current_cell(day, hour));
            }
        }
    }

    #[test]
    fn test_tick_tracks_hour() {
        let (mut controller, clock) = controller_at(at(2026, 10, 16, 14));
        assert!(!controller.tick());
        clock.set(at(2026, 10, 16, 15));
        assert!(controller.tick());
        assert_eq!(controller.current_hour(), 15);
    }

    #[test]
    fn test_hover_and_leave() {
        let (mut controller, _) = controller_at(at(2026, 10, 16, 14));
        controller.hover(DayOfWeek::Tue, 14);
        assert_eq!(
            controller.hover_state(),
            Some(BucketKey::new(DayOfWeek::Tue, 14))
        );
        controller.leave();
        assert_eq!(controller.hover_state(), None);
    }

    #[test]
    fn test_labels() {
        let (controller, _) = controller_at(at(2026, 10, 16, 14));
        assert_eq!(controller.month_label(), "October 2026");
        assert_eq!(controller.semester(), Semester::First);
    }
}
