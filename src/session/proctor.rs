use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::core::time::format_offset;
use crate::schemas::attempt::{Violation, ViolationKind};
use crate::schemas::exam::ExamConfig;

/// Browser-observable signals, synthesized by whatever hosts the engine
/// (stdin driver, replay script, tests). The monitor never touches ambient
/// state itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "kebab-case")]
pub(crate) enum ProctorSignal {
    Visibility { hidden: bool },
    WindowBlur,
    FullscreenChange { active: bool },
    Copy,
    Paste,
    ContextMenu,
    KeyDown { ctrl: bool, shift: bool, key: String },
}

/// Per-detector toggles, lifted straight off the exam configuration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProctorConfig {
    pub(crate) tab_switch_detection: bool,
    pub(crate) fullscreen_mode: bool,
    pub(crate) copy_paste_protection: bool,
    pub(crate) right_click_protection: bool,
}

impl ProctorConfig {
    pub(crate) fn from_exam(config: &ExamConfig) -> Self {
        Self {
            tab_switch_detection: config.enable_tab_switch_detection,
            fullscreen_mode: config.enable_full_screen_mode,
            copy_paste_protection: config.enable_copy_paste_protection,
            right_click_protection: config.enable_right_click_protection,
        }
    }
}

/// Turns observed signals into structured violations. Each detector is
/// independent; a disabled detector ignores its signal family entirely.
#[derive(Debug, Clone)]
pub(crate) struct IntegrityMonitor {
    config: ProctorConfig,
    is_fullscreen: bool,
}

impl IntegrityMonitor {
    pub(crate) fn new(config: ProctorConfig) -> Self {
        Self { config, is_fullscreen: false }
    }

    pub(crate) fn is_fullscreen(&self) -> bool {
        self.is_fullscreen
    }

    /// Records the environment's verdict on a fullscreen request. Denial is
    /// a violation, not a failure; the session continues windowed.
    pub(crate) fn request_fullscreen(
        &mut self,
        granted: bool,
        now: OffsetDateTime,
    ) -> Option<Violation> {
        if !self.config.fullscreen_mode || self.is_fullscreen {
            return None;
        }

        if granted {
            self.is_fullscreen = true;
            None
        } else {
            Some(Violation {
                kind: ViolationKind::FullscreenDenied,
                message: "Failed to enter fullscreen mode - user gesture required".to_string(),
                at: now,
            })
        }
    }

    pub(crate) fn observe(
        &mut self,
        signal: &ProctorSignal,
        now: OffsetDateTime,
    ) -> Option<Violation> {
        match signal {
            ProctorSignal::Visibility { hidden } => {
                if !self.config.tab_switch_detection || !hidden {
                    return None;
                }
                Some(Violation {
                    kind: ViolationKind::TabSwitch,
                    message: format!("Tab switched at {}", format_offset(now)),
                    at: now,
                })
            }
            ProctorSignal::WindowBlur => {
                if !self.config.tab_switch_detection {
                    return None;
                }
                Some(Violation {
                    kind: ViolationKind::FocusLoss,
                    message: format!("Window lost focus at {}", format_offset(now)),
                    at: now,
                })
            }
            ProctorSignal::FullscreenChange { active } => {
                if !self.config.fullscreen_mode {
                    return None;
                }
                let was_fullscreen = self.is_fullscreen;
                self.is_fullscreen = *active;
                if was_fullscreen && !active {
                    Some(Violation {
                        kind: ViolationKind::FullscreenExit,
                        message: "Exited fullscreen mode".to_string(),
                        at: now,
                    })
                } else {
                    None
                }
            }
            ProctorSignal::Copy => {
                if !self.config.copy_paste_protection {
                    return None;
                }
                Some(Violation {
                    kind: ViolationKind::Clipboard,
                    message: "Attempted to copy content".to_string(),
                    at: now,
                })
            }
            ProctorSignal::Paste => {
                if !self.config.copy_paste_protection {
                    return None;
                }
                Some(Violation {
                    kind: ViolationKind::Clipboard,
                    message: "Attempted to paste content".to_string(),
                    at: now,
                })
            }
            ProctorSignal::ContextMenu => {
                if !self.config.right_click_protection {
                    return None;
                }
                Some(Violation {
                    kind: ViolationKind::ContextMenu,
                    message: "Attempted right-click".to_string(),
                    at: now,
                })
            }
            ProctorSignal::KeyDown { ctrl, shift, key } => {
                if !self.config.copy_paste_protection || !is_blocked_shortcut(*ctrl, *shift, key) {
                    return None;
                }
                Some(Violation {
                    kind: ViolationKind::Shortcut,
                    message: format!("Attempted keyboard shortcut: {key}"),
                    at: now,
                })
            }
        }
    }
}

/// Copy/paste/select-all/cut/save shortcuts plus developer-tool shortcuts.
fn is_blocked_shortcut(ctrl: bool, shift: bool, key: &str) -> bool {
    if ctrl && matches!(key.to_lowercase().as_str(), "c" | "v" | "a" | "x" | "s") {
        return true;
    }
    if key == "F12" {
        return true;
    }
    ctrl && shift && matches!(key, "I" | "J")
}
