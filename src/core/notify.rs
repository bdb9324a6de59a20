use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::core::error::NotifyError;
use crate::core::job::JobRecord;

const MAX_LISTED_JOBS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn for_new_jobs(jobs: &[JobRecord]) -> Option<Self> {
        if jobs.is_empty() {
            return None;
        }

        let title = if jobs.len() == 1 {
            "New Job Posted!".to_string()
        } else {
            format!("{} New Jobs Posted!", jobs.len())
        };
        let body = jobs
            .iter()
            .take(MAX_LISTED_JOBS)
            .map(|job| format!("{} at {}", job.title, job.company))
            .collect::<Vec<_>>()
            .join("\n");

        Some(Self { title, body })
    }
}

pub trait Notifier {
    fn permission(&self) -> Permission;
    fn request_permission(&mut self) -> Permission;
    fn send(&mut self, notification: &Notification) -> Result<(), NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn permission(&self) -> Permission {
        (**self).permission()
    }

    fn request_permission(&mut self) -> Permission {
        (**self).request_permission()
    }

    fn send(&mut self, notification: &Notification) -> Result<(), NotifyError> {
        (**self).send(notification)
    }
}

/// Sends at most one notification summarizing `jobs`. Every failure is logged
/// and swallowed; returns whether a notification went out.
pub fn notify_new_jobs<N: Notifier + ?Sized>(notifier: &mut N, jobs: &[JobRecord]) -> bool {
    let Some(notification) = Notification::for_new_jobs(jobs) else {
        return false;
    };

    let mut permission = notifier.permission();
    if permission != Permission::Granted {
        permission = notifier.request_permission();
    }
    if permission != Permission::Granted {
        tracing::debug!(?permission, "Notification permission not granted, skipping");
        return false;
    }

    match notifier.send(&notification) {
        Ok(()) => {
            tracing::info!(title = %notification.title, "Sent new jobs notification");
            true
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to send notification");
            false
        }
    }
}

#[derive(Debug, Clone)]
enum DesktopProgram {
    NotifySend(PathBuf),
    Osascript(PathBuf),
}

/// Desktop notifications through `notify-send` (freedesktop) or `osascript` (macOS).
/// Permission is granted once one of them is found in PATH.
#[derive(Debug, Default)]
pub struct DesktopNotifier {
    program: Option<DesktopProgram>,
    checked: bool,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn locate() -> Option<DesktopProgram> {
        if let Ok(path) = which::which("notify-send") {
            return Some(DesktopProgram::NotifySend(path));
        }
        if let Ok(path) = which::which("osascript") {
            return Some(DesktopProgram::Osascript(path));
        }
        None
    }

    fn command(program: &DesktopProgram, notification: &Notification) -> Command {
        match program {
            DesktopProgram::NotifySend(path) => {
                let mut cmd = Command::new(path);
                cmd.arg("--app-name=jobwatch")
                    .arg(&notification.title)
                    .arg(&notification.body);
                cmd
            }
            DesktopProgram::Osascript(path) => {
                let script = format!(
                    "display notification \"{}\" with title \"{}\"",
                    escape_applescript(&notification.body),
                    escape_applescript(&notification.title)
                );
                let mut cmd = Command::new(path);
                cmd.arg("-e").arg(script);
                cmd
            }
        }
    }
}

fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

impl Notifier for DesktopNotifier {
    fn permission(&self) -> Permission {
        match (self.checked, &self.program) {
            (false, _) => Permission::Unknown,
            (true, Some(_)) => Permission::Granted,
            (true, None) => Permission::Denied,
        }
    }

    fn request_permission(&mut self) -> Permission {
        if !self.checked {
            self.program = Self::locate();
            self.checked = true;
            if self.program.is_none() {
                tracing::warn!("No desktop notification tool found (notify-send, osascript)");
            }
        }
        self.permission()
    }

    fn send(&mut self, notification: &Notification) -> Result<(), NotifyError> {
        let program = self.program.as_ref().ok_or(NotifyError::BinaryNotFound)?;

        let output = Self::command(program, notification)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    NotifyError::BinaryNotFound
                } else {
                    NotifyError::ProcessFailed {
                        exit_code: None,
                        stderr: e.to_string(),
                    }
                }
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(NotifyError::ProcessFailed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        }
    }
}

/// Rings the terminal bell.
#[derive(Debug, Default)]
pub struct BellNotifier;

impl Notifier for BellNotifier {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn send(&mut self, _notification: &Notification) -> Result<(), NotifyError> {
        let mut stdout = std::io::stdout();
        stdout
            .write_all(b"\x07")
            .and_then(|_| stdout.flush())
            .map_err(|e| NotifyError::ProcessFailed {
                exit_code: None,
                stderr: e.to_string(),
            })
    }
}

#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn permission(&self) -> Permission {
        Permission::Denied
    }

    fn request_permission(&mut self) -> Permission {
        Permission::Denied
    }

    fn send(&mut self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::PermissionDenied)
    }
}
