//! Recorder lifecycle state machine

use std::fmt;
use thiserror::Error;

/// Controller phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Microphone acquisition and driver setup in flight
    Starting,
    Recording,
    /// Stop requested; drivers draining or the finalization pipeline running
    Finalizing,
    Destroyed,
}

impl Phase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Recording => "recording",
            Self::Finalizing => "finalizing",
            Self::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while {current}")]
pub struct InvalidStateTransition {
    pub current: Phase,
    pub action: &'static str,
}

/// Recorder lifecycle.
///
/// State machine:
///   IDLE -> STARTING (begin_start)
///   STARTING -> RECORDING (start_succeeded)
///   STARTING -> IDLE (start_failed)
///   RECORDING -> FINALIZING (request_stop)
///   FINALIZING -> IDLE (finish)
///   any -> DESTROYED (destroy), absorbing
#[derive(Debug, Default)]
pub struct Lifecycle {
    phase: Phase,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self { phase: Phase::Idle }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn is_recording(&self) -> bool {
        self.phase == Phase::Recording
    }

    pub fn is_finalizing(&self) -> bool {
        self.phase == Phase::Finalizing
    }

    pub fn is_destroyed(&self) -> bool {
        self.phase == Phase::Destroyed
    }

    fn transition(
        &mut self,
        from: Phase,
        to: Phase,
        action: &'static str,
    ) -> Result<(), InvalidStateTransition> {
        if self.phase != from {
            return Err(InvalidStateTransition {
                current: self.phase,
                action,
            });
        }
        self.phase = to;
        Ok(())
    }

    pub fn begin_start(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(Phase::Idle, Phase::Starting, "start recording")
    }

    pub fn start_succeeded(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(Phase::Starting, Phase::Recording, "enter recording")
    }

    pub fn start_failed(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(Phase::Starting, Phase::Idle, "abandon start")
    }

    pub fn request_stop(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(Phase::Recording, Phase::Finalizing, "stop recording")
    }

    pub fn finish(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(Phase::Finalizing, Phase::Idle, "finish finalization")
    }

    /// Enter the terminal state. Returns the phase that was left, or `None`
    /// if the lifecycle was already destroyed.
    pub fn destroy(&mut self) -> Option<Phase> {
        if self.phase == Phase::Destroyed {
            return None;
        }
        Some(std::mem::replace(&mut self.phase, Phase::Destroyed))
    }
}
