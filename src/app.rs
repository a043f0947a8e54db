//! Event loop
//!
//! Every mutation (user commands, snapshot pushes, clock ticks) goes through a
//! single queue and is applied on one thread, in order.

use crate::binding::DataBindingLayer;
use crate::config::HeatmapConfig;
use crate::error::HeatmapError;
use crate::grid::HeatmapGrid;
use crate::store::{DocumentChange, SnapshotPush, SpeedStore, StoreDocument};
use crate::types::{DayOfWeek, ViewWindow, WEEKS_PER_MONTH};
use crate::view_state::{Clock, ViewStateController};
use std::str::FromStr;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Anything the event loop reacts to
#[derive(Debug, Clone)]
pub enum AppEvent {
    Command(Command),
    Snapshot(SnapshotPush),
    Tick,
    Shutdown,
}

/// User input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    PrevMonth,
    NextMonth,
    Today,
    Week(u32),
    Hover(DayOfWeek, u32),
    Leave,
    Put(StoreDocument),
    Delete(String),
    Show,
    Quit,
}

impl FromStr for Command {
    type Err = HeatmapError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let unknown = || HeatmapError::UnknownCommand(line.to_string());

        let command = match word.to_ascii_lowercase().as_str() {
            "prev" | "p" | "<" => Command::PrevMonth,
            "next" | "n" | ">" => Command::NextMonth,
            "today" | "t" => Command::Today,
            "week" | "w" => {
                let week = rest
                    .parse::<u32>()
                    .ok()
                    .filter(|w| (1..=WEEKS_PER_MONTH).contains(w))
                    .ok_or_else(unknown)?;
                Command::Week(week)
            }
            "hover" | "h" => {
                let mut parts = rest.split_whitespace();
                let day = parts
                    .next()
                    .and_then(|d| d.parse::<DayOfWeek>().ok())
                    .ok_or_else(unknown)?;
                let hour = parts
                    .next()
                    .and_then(|h| h.parse::<u32>().ok())
                    .ok_or_else(unknown)?;
                Command::Hover(day, hour)
            }
            "leave" | "l" => Command::Leave,
            "put" => Command::Put(serde_json::from_str(rest)?),
            "delete" | "del" if !rest.is_empty() => Command::Delete(rest.to_string()),
            "show" | "s" | "" => Command::Show,
            "quit" | "q" | "exit" => Command::Quit,
            _ => return Err(unknown()),
        };
        Ok(command)
    }
}

/// Heatmap view wired to a live store
pub struct HeatmapApp<S: SpeedStore> {
    view: ViewStateController,
    binding: DataBindingLayer<S>,
    sender: Sender<AppEvent>,
    receiver: Receiver<AppEvent>,
    tick_interval: Duration,
    running: bool,
}

impl<S: SpeedStore> HeatmapApp<S> {
    /// Create the view on today's week and bind it
    pub fn new(
        store: S,
        clock: Box<dyn Clock>,
        config: &HeatmapConfig,
    ) -> Result<Self, HeatmapError> {
        let view = ViewStateController::new(clock);
        Self::with_view(store, view, config)
    }

    /// Create the view on an explicit window and bind it
    pub fn with_window(
        store: S,
        clock: Box<dyn Clock>,
        window: ViewWindow,
        config: &HeatmapConfig,
    ) -> Result<Self, HeatmapError> {
        let view = ViewStateController::with_window(clock, window);
        Self::with_view(store, view, config)
    }

    fn with_view(
        store: S,
        view: ViewStateController,
        config: &HeatmapConfig,
    ) -> Result<Self, HeatmapError> {
        let offset = config.utc_offset()?;
        let (sender, receiver) = channel();
        let binding = DataBindingLayer::new(store, &config.collection, offset, sender.clone());

        let mut app = Self {
            view,
            binding,
            sender,
            receiver,
            tick_interval: config.tick_interval(),
            running: true,
        };
        let window = app.view.window();
        app.binding.on_window_changed(&window);
        Ok(app)
    }

    /// Queue handle for producers on other threads
    pub fn sender(&self) -> Sender<AppEvent> {
        self.sender.clone()
    }

    pub fn view(&self) -> &ViewStateController {
        &self.view
    }

    pub fn binding(&self) -> &DataBindingLayer<S> {
        &self.binding
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn grid(&self) -> HeatmapGrid {
        HeatmapGrid::build(&self.binding, &self.view)
    }

    /// Apply one event; returns whether the grid needs redrawing.
    pub fn handle(&mut self, event: AppEvent) -> Result<bool, HeatmapError> {
        match event {
            AppEvent::Command(command) => self.handle_command(command),
            AppEvent::Snapshot(push) => Ok(self.binding.apply_snapshot(push)),
            AppEvent::Tick => Ok(self.view.tick()),
            AppEvent::Shutdown => {
                self.shutdown();
                Ok(false)
            }
        }
    }

    fn handle_command(&mut self, command: Command) -> Result<bool, HeatmapError> {
        debug!(?command, "command");
        let window_changed = match command {
            Command::PrevMonth => self.view.change_month(-1),
            Command::NextMonth => self.view.change_month(1),
            Command::Today => self.view.reset_to_today(),
            Command::Week(week) => self.view.change_week(week),
            Command::Hover(day, hour) => {
                self.view.hover(day, hour);
                return Ok(true);
            }
            Command::Leave => {
                self.view.leave();
                return Ok(true);
            }
            Command::Put(document) => {
                let collection = self.binding.collection().to_string();
                self.binding
                    .store_mut()
                    .ingest(&collection, DocumentChange::Upsert(document))?;
                return Ok(false);
            }
            Command::Delete(id) => {
                let collection = self.binding.collection().to_string();
                self.binding
                    .store_mut()
                    .ingest(&collection, DocumentChange::Remove(id))?;
                return Ok(false);
            }
            Command::Show => return Ok(true),
            Command::Quit => {
                self.shutdown();
                return Ok(false);
            }
        };

        if window_changed {
            let window = self.view.window();
            self.binding.on_window_changed(&window);
        }
        Ok(true)
    }

    /// Apply every queued event; returns whether any of them needs a redraw.
    pub fn run_until_idle(&mut self) -> Result<bool, HeatmapError> {
        let mut redraw = false;
        while self.running {
            let Ok(event) = self.receiver.try_recv() else {
                break;
            };
            redraw |= self.handle(event)?;
        }
        Ok(redraw)
    }

    /// Run until shutdown, ticking the clock and calling `render` after each
    /// event that changes the grid. Event errors are logged and skipped.
    pub fn run<F>(&mut self, mut render: F)
    where
        F: FnMut(&HeatmapGrid),
    {
        render(&self.grid());
        let mut next_tick = Instant::now() + self.tick_interval;

        while self.running {
            let timeout = next_tick.saturating_duration_since(Instant::now());
            let event = match self.receiver.recv_timeout(timeout) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => {
                    next_tick = Instant::now() + self.tick_interval;
                    AppEvent::Tick
                }
                Err(RecvTimeoutError::Disconnected) => break,
            };

            match self.handle(event) {
                Ok(true) => render(&self.grid()),
                Ok(false) => {}
                Err(e) => warn!(error = %e, "event failed"),
            }
        }
        self.shutdown();
    }

    /// Tear the view down, releasing the live subscription
    pub fn shutdown(&mut self) {
        if self.running {
            info!("shutting down heatmap view");
        }
        self.running = false;
        self.binding.teardown();
    }
}
