//! Presentation and diagnostics boundaries.
//!
//! Both interfaces are fire-and-forget: the engine reports into them and
//! never bases control flow on their answers, except for the declared
//! presentation-progress gate read through
//! [`Presentation::progress_pct`].

/// Phase a presentation cue belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseCue {
    /// The wind-up before the activation commits.
    Prepare,
    /// The committed swing/cast leading into dispatch.
    Initiate,
    /// The dispatch instant itself.
    Dispatch,
}

/// Graphics/animation collaborator.
pub trait Presentation {
    /// Starts the cue for a phase; `duration_hint` is the speed-adjusted
    /// phase length in seconds.
    fn play_phase_cue(&mut self, cue: PhaseCue, duration_hint: f32);

    /// Progress of the current cue in percent, `0.0..=100.0`.
    ///
    /// Consulted only when a definition gates dispatch on presentation
    /// progress instead of a fixed delay.
    fn progress_pct(&self) -> f32;

    /// Unwinds any in-flight cues after an interruption.
    fn cancel_cues(&mut self);
}

/// Presentation sink that does nothing. Progress reads as complete so
/// progress-gated definitions still dispatch on hosts without visuals.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresentation;

impl Presentation for NullPresentation {
    fn play_phase_cue(&mut self, _cue: PhaseCue, _duration_hint: f32) {}

    fn progress_pct(&self) -> f32 {
        100.0
    }

    fn cancel_cues(&mut self) {}
}

/// Append-only sink for human-readable activation traces.
///
/// Never consulted for control flow.
pub trait Diagnostics {
    /// Appends one trace line.
    fn note(&mut self, line: &str);
}

/// Diagnostics sink that forwards every line to [`tracing`] at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn note(&mut self, line: &str) {
        tracing::debug!(target: "runecast", "{line}");
    }
}

/// Diagnostics sink that collects lines in memory, for tests.
#[derive(Debug, Clone, Default)]
pub struct BufferDiagnostics {
    lines: Vec<String>,
}

impl BufferDiagnostics {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collected trace lines, oldest first.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl Diagnostics for BufferDiagnostics {
    fn note(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}
