//! Simulation pipeline phases and their user-facing display

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stage of the server-side simulation pipeline.
///
/// Discriminants are the wire codes carried in `simulator_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum StatusPhase {
    Ready = 1,
    Submitted = 2,
    Queued = 3,
    Generating = 4,
    StartingSimulation = 5,
    Simulating = 6,
    Buffering = 7,
    Finished = 8,
}

impl StatusPhase {
    /// All phases in pipeline order
    pub const ALL: [StatusPhase; 8] = [
        StatusPhase::Ready,
        StatusPhase::Submitted,
        StatusPhase::Queued,
        StatusPhase::Generating,
        StatusPhase::StartingSimulation,
        StatusPhase::Simulating,
        StatusPhase::Buffering,
        StatusPhase::Finished,
    ];

    /// Map a wire code to a phase, `None` for codes outside 1..=8.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(StatusPhase::Ready),
            2 => Some(StatusPhase::Submitted),
            3 => Some(StatusPhase::Queued),
            4 => Some(StatusPhase::Generating),
            5 => Some(StatusPhase::StartingSimulation),
            6 => Some(StatusPhase::Simulating),
            7 => Some(StatusPhase::Buffering),
            8 => Some(StatusPhase::Finished),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Display effect associated with entering this phase.
    pub fn display(self) -> StatusDisplay {
        let (message, severity) = match self {
            StatusPhase::Ready => ("Ready to simulate.", Severity::Primary),
            StatusPhase::Submitted => ("Simulation request submitted.", Severity::Primary),
            StatusPhase::Queued => ("Placed into simulation queue.", Severity::Secondary),
            StatusPhase::Generating => ("Generating simulation from tree.", Severity::Info),
            StatusPhase::StartingSimulation => ("Starting simulation.", Severity::Info),
            // Frames replace the overlay while the simulation plays
            StatusPhase::Simulating => return StatusDisplay::Hide,
            StatusPhase::Buffering => ("Buffering simulation frames.", Severity::Warning),
            StatusPhase::Finished => ("Simulation finished.", Severity::Success),
        };
        StatusDisplay::Show(Notification::new(message, severity))
    }

    pub fn is_terminal(self) -> bool {
        self == StatusPhase::Finished
    }
}

impl fmt::Display for StatusPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusPhase::Ready => "READY",
            StatusPhase::Submitted => "SUBMITTED",
            StatusPhase::Queued => "QUEUED",
            StatusPhase::Generating => "GENERATING",
            StatusPhase::StartingSimulation => "STARTING_SIMULATION",
            StatusPhase::Simulating => "SIMULATING",
            StatusPhase::Buffering => "BUFFERING",
            StatusPhase::Finished => "FINISHED",
        };
        f.write_str(name)
    }
}

/// Severity tag of a notification, matching the UI's alert styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Primary,
    Secondary,
    Warning,
    Success,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Primary => "primary",
            Severity::Secondary => "secondary",
            Severity::Warning => "warning",
            Severity::Success => "success",
            Severity::Info => "info",
        }
    }
}

/// A message for the status overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self { message: message.into(), severity }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Warning)
    }
}

/// What the status overlay should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusDisplay {
    Show(Notification),
    Hide,
}

impl StatusDisplay {
    pub fn notification(&self) -> Option<&Notification> {
        match self {
            StatusDisplay::Show(notification) => Some(notification),
            StatusDisplay::Hide => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn every_phase_round_trips_through_its_code() {
        for phase in StatusPhase::ALL {
            assert_eq!(StatusPhase::from_code(phase.code() as i64), Some(phase));
        }
    }

    #[test]
    fn only_simulating_hides_the_overlay() {
        for phase in StatusPhase::ALL {
            let hidden = phase.display() == StatusDisplay::Hide;
            assert_eq!(hidden, phase == StatusPhase::Simulating, "{phase}");
        }
    }

    #[test]
    fn finished_is_the_only_terminal_phase() {
        let terminal: Vec<_> = StatusPhase::ALL.into_iter().filter(|p| p.is_terminal()).collect();
        assert_eq!(terminal, vec![StatusPhase::Finished]);
    }

    #[test]
    fn queued_shows_secondary_message() {
        let display = StatusPhase::Queued.display();
        let notification = display.notification().expect("queued shows a message");
        assert_eq!(notification.message, "Placed into simulation queue.");
        assert_eq!(notification.severity, Severity::Secondary);
    }

    #[test]
    fn severity_serializes_as_ui_tag() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
        assert_eq!(Severity::Secondary.as_str(), "secondary");
    }

    proptest! {
        #[test]
        fn codes_outside_range_are_unknown(code in prop_oneof![i64::MIN..1i64, 9i64..i64::MAX]) {
            prop_assert_eq!(StatusPhase::from_code(code), None);
        }
    }
}
