//! Tempo clock generator.
//!
//! The clock owns a [`LookaheadScheduler`]. On every poll it walks forward
//! from the last computed tick in steps of `60 / (tempo * 4)` seconds and,
//! for each division whose tick count lands on the current tick index, emits
//! a rising gate at the tick time and a falling gate half a division later.
//!
//! ## Divisions
//!
//! | Output | Ticks | At 120 BPM |
//! |--------|-------|------------|
//! | `sixteenth` | 1 | every 125 ms |
//! | `eighth` | 2 | every 250 ms |
//! | `quarter` | 4 | every 500 ms |
//!
//! Tempo is read once per tick step, so a tempo change lands on the next tick
//! that has not been computed yet and never moves ticks already emitted.
//! Falling edges are held back until they fall inside a window and are
//! clamped to the division's next rising edge, which keeps every output's
//! timestamps non-decreasing even across abrupt tempo jumps.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use patchbay_core::{
    EventEmitter, LookaheadScheduler, OutputPort, Ports, Unit, UnitContext, UnitError, Value,
    Window,
};

use crate::settings::Settings;

/// Base ticks per quarter-note beat.
pub const TICKS_PER_BEAT: u64 = 4;

/// Default tempo in beats per minute.
pub const DEFAULT_TEMPO: f64 = 120.0;

/// Lowest tempo the clock accepts.
pub const DEFAULT_MIN_TEMPO: f64 = 10.0;

/// Delay between the first poll and the first tick, in seconds.
pub const DEFAULT_LEAD_IN: f64 = 0.1;

/// Clock divisions, expressed in base ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Division {
    /// Every tick (1/16 note).
    Sixteenth,
    /// Every second tick (1/8 note).
    Eighth,
    /// Every fourth tick (1/4 note).
    Quarter,
}

impl Division {
    /// All divisions, in output declaration order.
    pub const ALL: [Division; 3] = [Division::Sixteenth, Division::Eighth, Division::Quarter];

    /// Length of one division in base ticks.
    pub const fn ticks(&self) -> u64 {
        match self {
            Division::Sixteenth => 1,
            Division::Eighth => 2,
            Division::Quarter => 4,
        }
    }

    /// Output port name.
    pub const fn port_name(&self) -> &'static str {
        match self {
            Division::Sixteenth => "sixteenth",
            Division::Eighth => "eighth",
            Division::Quarter => "quarter",
        }
    }

    /// Duration of one division at `tempo` BPM, in seconds.
    pub fn seconds(&self, tempo: f64) -> f64 {
        seconds_per_tick(tempo) * self.ticks() as f64
    }
}

/// Seconds between base ticks at `tempo` BPM.
pub fn seconds_per_tick(tempo: f64) -> f64 {
    60.0 / (tempo * TICKS_PER_BEAT as f64)
}

/// Host-level clock parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockConfig {
    /// Tempo used when settings carry none.
    pub default_tempo: f64,
    /// Floor applied to every tempo change.
    pub min_tempo: f64,
    /// Delay of the first tick after the first poll, in seconds.
    pub lead_in: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            default_tempo: DEFAULT_TEMPO,
            min_tempo: DEFAULT_MIN_TEMPO,
            lead_in: DEFAULT_LEAD_IN,
        }
    }
}

struct Output {
    division: Division,
    emitter: EventEmitter,
    pending_fall: Cell<Option<f64>>,
}

struct TickStream {
    tempo: Cell<f64>,
    min_tempo: f64,
    lead_in: f64,
    next_tick_time: Cell<Option<f64>>,
    next_tick_index: Cell<u64>,
    /// Cleared by `stop`, including from inside an emission.
    running: Cell<bool>,
    outputs: Vec<Output>,
}

impl TickStream {
    fn fill(&self, window: &Window) {
        let mut time = self
            .next_tick_time
            .get()
            .unwrap_or(window.begin + self.lead_in);
        let mut index = self.next_tick_index.get();

        while time < window.end {
            if !self.running.get() {
                return;
            }
            self.release_falls(time, Some(index));
            let step = seconds_per_tick(self.tempo.get());
            for output in &self.outputs {
                if !self.running.get() {
                    return;
                }
                let ticks = output.division.ticks();
                if index % ticks == 0 {
                    output.emitter.emit(time, true);
                    if !self.running.get() {
                        return;
                    }
                    output
                        .pending_fall
                        .set(Some(time + 0.5 * step * ticks as f64));
                }
            }
            index += 1;
            time += step;
        }

        if !self.running.get() {
            return;
        }
        self.release_falls(window.end, None);
        self.next_tick_time.set(Some(time));
        self.next_tick_index.set(index);
    }

    /// Emits held falling edges due before `limit`. When `rising_index` is
    /// set, a division rising at that tick flushes its edge first, clamped
    /// to the rising time.
    fn release_falls(&self, limit: f64, rising_index: Option<u64>) {
        for output in &self.outputs {
            let Some(fall) = output.pending_fall.get() else {
                continue;
            };
            let rises_now = rising_index.is_some_and(|i| i % output.division.ticks() == 0);
            if fall < limit || (rises_now && fall <= limit) {
                output.pending_fall.set(None);
                output.emitter.emit(fall, false);
            } else if rises_now {
                output.pending_fall.set(None);
                output.emitter.emit(limit, false);
            }
        }
    }
}

/// Tempo clock with sixteenth, eighth and quarter gate outputs.
///
/// The clock starts running as soon as it is created.
pub struct Clock {
    ports: Ports,
    stream: Rc<TickStream>,
    scheduler: LookaheadScheduler,
}

impl Clock {
    /// Creates and starts a clock from `settings` (`{ tempo }`).
    pub fn new(
        ctx: &UnitContext,
        config: ClockConfig,
        settings: Option<&Value>,
    ) -> Result<Self, UnitError> {
        let settings = Settings::new(settings)?;
        let tempo = settings.number("tempo", config.default_tempo)?;

        let outputs: Vec<Output> = Division::ALL
            .iter()
            .map(|&division| Output {
                division,
                emitter: EventEmitter::new(),
                pending_fall: Cell::new(None),
            })
            .collect();

        let mut ports = Ports::new();
        for output in &outputs {
            ports.outputs.insert(
                output.division.port_name(),
                OutputPort::Event(output.emitter.clone()),
            )?;
        }

        let stream = Rc::new(TickStream {
            tempo: Cell::new(tempo.max(config.min_tempo)),
            min_tempo: config.min_tempo,
            lead_in: config.lead_in,
            next_tick_time: Cell::new(None),
            next_tick_index: Cell::new(0),
            running: Cell::new(false),
            outputs,
        });

        let clock = Self {
            ports,
            stream,
            scheduler: ctx.reactor.scheduler(),
        };
        clock.start()?;
        Ok(clock)
    }

    /// Resumes ticking. The first tick after a restart lands one lead-in
    /// after the next poll.
    pub fn start(&self) -> Result<(), UnitError> {
        let stream = Rc::clone(&self.stream);
        self.scheduler.start(move |window| stream.fill(window))?;
        self.stream.next_tick_time.set(None);
        self.stream.next_tick_index.set(0);
        self.stream.running.set(true);
        tracing::debug!(tempo = self.tempo(), "clock started");
        Ok(())
    }

    /// Stops ticking. Idempotent.
    pub fn stop(&self) {
        self.stream.running.set(false);
        self.scheduler.stop();
        for output in &self.stream.outputs {
            output.pending_fall.set(None);
        }
    }

    /// Returns true while ticking.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Current tempo in BPM.
    pub fn tempo(&self) -> f64 {
        self.stream.tempo.get()
    }

    /// Sets the tempo, clamped to the configured minimum. Non-finite values
    /// select the minimum.
    pub fn set_tempo(&self, bpm: f64) {
        let bpm = if bpm.is_finite() { bpm } else { self.stream.min_tempo };
        self.stream.tempo.set(bpm.max(self.stream.min_tempo));
    }

    /// Index of the next tick to be computed.
    pub fn next_tick_index(&self) -> u64 {
        self.stream.next_tick_index.get()
    }

    /// Scheduler driving this clock.
    pub fn scheduler(&self) -> &LookaheadScheduler {
        &self.scheduler
    }
}

impl Unit for Clock {
    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn save(&self) -> Option<Value> {
        Some(Value::map().with("tempo", self.tempo()))
    }

    fn teardown(&mut self) {
        self.stop();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
