#[cfg(all(unix, not(target_os = "macos")))]
use std::path::Path;
use std::process::Command;

use crate::error::AppError;

/// Shows a file in the platform's file browser. The OS-specific invocation
/// hides behind this trait so the facade can be tested with a double.
pub trait Reveal: Send + Sync {
    fn reveal(&self, path: &str) -> Result<(), AppError>;
}

pub struct SystemReveal;

impl Reveal for SystemReveal {
    fn reveal(&self, path: &str) -> Result<(), AppError> {
        // Fire and forget; the file browser outlives the call.
        reveal_command(path)
            .spawn()
            .map_err(|err| AppError::Reveal(err.to_string()))?;
        Ok(())
    }
}

#[cfg(target_os = "macos")]
fn reveal_command(path: &str) -> Command {
    let mut command = Command::new("open");
    command.arg("-R").arg(path);
    command
}

#[cfg(target_os = "windows")]
fn reveal_command(path: &str) -> Command {
    let mut command = Command::new("explorer");
    command.arg(format!("/select,{path}"));
    command
}

#[cfg(all(unix, not(target_os = "macos")))]
fn reveal_command(path: &str) -> Command {
    // No portable "select in folder" on Linux; open the containing
    // directory instead.
    let parent = Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string());
    let mut command = Command::new("xdg-open");
    command.arg(parent);
    command
}
