//! Control surface derived from session status, and keyboard shortcuts.
//!
//! Which buttons are enabled or visible is a pure function of `Status`. A
//! shortcut only fires when the control it maps to is enabled.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::session::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Start,
    Stop,
    Pause,
    Resume,
    ToggleTheme,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Pause => "pause",
            Action::Resume => "resume",
            Action::ToggleTheme => "toggle_theme",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ControlState {
    pub enabled: bool,
    pub visible: bool,
}

impl ControlState {
    const fn shown(enabled: bool) -> Self {
        Self {
            enabled,
            visible: true,
        }
    }

    const HIDDEN: Self = Self {
        enabled: false,
        visible: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub start: ControlState,
    pub pause: ControlState,
    pub resume: ControlState,
    pub stop: ControlState,
    /// Resolution, frame rate, format and mic inputs.
    pub settings_enabled: bool,
}

impl Controls {
    pub fn for_status(status: Status) -> Self {
        match status {
            Status::Idle | Status::Done | Status::Failed => Self {
                start: ControlState::shown(true),
                pause: ControlState::shown(false),
                resume: ControlState::HIDDEN,
                stop: ControlState::shown(false),
                settings_enabled: true,
            },
            Status::AwaitingPermission | Status::Finalizing => Self {
                start: ControlState::shown(false),
                pause: ControlState::shown(false),
                resume: ControlState::HIDDEN,
                stop: ControlState::shown(false),
                settings_enabled: false,
            },
            Status::Recording => Self {
                start: ControlState::shown(false),
                pause: ControlState::shown(true),
                resume: ControlState::HIDDEN,
                stop: ControlState::shown(true),
                settings_enabled: false,
            },
            Status::Paused => Self {
                start: ControlState::shown(false),
                pause: ControlState::HIDDEN,
                resume: ControlState::shown(true),
                stop: ControlState::shown(true),
                settings_enabled: false,
            },
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Start => self.start.enabled,
            Action::Stop => self.stop.enabled,
            Action::Pause => self.pause.enabled,
            Action::Resume => self.resume.enabled,
            Action::ToggleTheme => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Ctrl,
    Shift,
    Alt,
    Super,
}

impl Modifier {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CTRL" | "CONTROL" => Some(Modifier::Ctrl),
            "SHIFT" => Some(Modifier::Shift),
            "ALT" | "OPTION" => Some(Modifier::Alt),
            "SUPER" | "META" | "CMD" => Some(Modifier::Super),
            _ => None,
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Ctrl => write!(f, "Ctrl"),
            Modifier::Shift => write!(f, "Shift"),
            Modifier::Alt => write!(f, "Alt"),
            Modifier::Super => write!(f, "Super"),
        }
    }
}

/// A key combination such as `Ctrl+R`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    /// Sorted, without duplicates.
    pub modifiers: Vec<Modifier>,
    /// Uppercased key name.
    pub key: String,
}

impl Shortcut {
    pub fn ctrl(key: char) -> Self {
        Self {
            modifiers: vec![Modifier::Ctrl],
            key: key.to_ascii_uppercase().to_string(),
        }
    }

    /// The action bound to this combination, if any.
    pub fn action(&self) -> Option<Action> {
        if self.modifiers != [Modifier::Ctrl] {
            return None;
        }
        BINDINGS
            .iter()
            .find(|(key, _)| *key == self.key)
            .map(|(_, action)| *action)
    }
}

const BINDINGS: [(&str, Action); 5] = [
    ("R", Action::Start),
    ("S", Action::Stop),
    ("P", Action::Pause),
    ("E", Action::Resume),
    ("D", Action::ToggleTheme),
];

/// Default bindings as `(combo, action)` for display.
pub fn bindings() -> Vec<(String, Action)> {
    BINDINGS
        .iter()
        .map(|(key, action)| (format!("{}+{}", Modifier::Ctrl, key), *action))
        .collect()
}

impl FromStr for Shortcut {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let (key, mods) = parts
            .split_last()
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| format!("invalid shortcut '{s}'"))?;

        let mut modifiers = mods
            .iter()
            .map(|m| Modifier::parse(m).ok_or_else(|| format!("unknown modifier '{m}'")))
            .collect::<Result<Vec<_>, _>>()?;
        modifiers.sort();
        modifiers.dedup();

        Ok(Self {
            modifiers,
            key: key.to_uppercase(),
        })
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{modifier}+")?;
        }
        write!(f, "{}", self.key)
    }
}

/// Resolve a shortcut against the current controls. `None` when unbound or
/// when the bound control is disabled.
pub fn dispatch(shortcut: &Shortcut, status: Status) -> Option<Action> {
    let action = shortcut.action()?;
    Controls::for_status(status)
        .allows(action)
        .then_some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shortcut() {
        let s: Shortcut = "ctrl+r".parse().unwrap();
        assert_eq!(s, Shortcut::ctrl('r'));
        assert_eq!(s.to_string(), "Ctrl+R");

        let s: Shortcut = "Shift + Ctrl + p".parse().unwrap();
        assert_eq!(s.modifiers, vec![Modifier::Ctrl, Modifier::Shift]);
        assert_eq!(s.key, "P");

        assert!("Ctrl+".parse::<Shortcut>().is_err());
        assert!("Hyper+R".parse::<Shortcut>().is_err());
    }

    #[test]
    fn test_bindings() {
        assert_eq!(Shortcut::ctrl('R').action(), Some(Action::Start));
        assert_eq!(Shortcut::ctrl('S').action(), Some(Action::Stop));
        assert_eq!(Shortcut::ctrl('P').action(), Some(Action::Pause));
        assert_eq!(Shortcut::ctrl('E').action(), Some(Action::Resume));
        assert_eq!(Shortcut::ctrl('D').action(), Some(Action::ToggleTheme));
        assert_eq!(Shortcut::ctrl('X').action(), None);
        assert_eq!("Ctrl+Shift+R".parse::<Shortcut>().unwrap().action(), None);
        assert_eq!("R".parse::<Shortcut>().unwrap().action(), None);
    }

    #[test]
    fn test_controls_per_status() {
        let idle = Controls::for_status(Status::Idle);
        assert!(idle.start.enabled && !idle.stop.enabled && !idle.pause.enabled);
        assert!(!idle.resume.visible);
        assert!(idle.settings_enabled);

        let recording = Controls::for_status(Status::Recording);
        assert!(!recording.start.enabled);
        assert!(recording.pause.enabled && recording.stop.enabled);
        assert!(!recording.settings_enabled);

        let paused = Controls::for_status(Status::Paused);
        assert!(!paused.pause.visible);
        assert!(paused.resume.visible && paused.resume.enabled);

        let finalizing = Controls::for_status(Status::Finalizing);
        assert!(!finalizing.allows(Action::Stop));
        assert!(!finalizing.allows(Action::Start));
    }

    #[test]
    fn test_disabled_control_shortcut_is_noop() {
        assert_eq!(dispatch(&Shortcut::ctrl('S'), Status::Idle), None);
        assert_eq!(dispatch(&Shortcut::ctrl('P'), Status::Paused), None);
        assert_eq!(dispatch(&Shortcut::ctrl('E'), Status::Paused), Some(Action::Resume));
        assert_eq!(dispatch(&Shortcut::ctrl('R'), Status::Recording), None);
        assert_eq!(dispatch(&Shortcut::ctrl('R'), Status::Done), Some(Action::Start));
        assert_eq!(
            dispatch(&Shortcut::ctrl('D'), Status::Finalizing),
            Some(Action::ToggleTheme)
        );
    }

    #[test]
    fn test_bindings_display() {
        let all = bindings();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0], ("Ctrl+R".to_string(), Action::Start));
    }
}
