//! Generation of the deferred replacement script.
//!
//! The running executable cannot overwrite its own files, so the install
//! step writes a short-lived script that runs after this process exits:
//! wait a grace period, poll the copy until the OS releases the file locks
//! (bounded retries, not a single fixed sleep), relaunch the application,
//! delete itself.

use std::path::{Path, PathBuf};

/// Seconds the script waits before its first copy attempt.
pub(crate) const GRACE_PERIOD_SECS: u32 = 2;
/// Copy attempts before the script gives up.
pub(crate) const COPY_RETRIES: u32 = 15;

/// What the script has to do once the parent process is gone.
#[derive(Debug, Clone)]
pub(crate) enum ReplacePlan {
    /// Copy a single new executable over the installed one.
    ReplaceExe { source: PathBuf, target: PathBuf },
    /// Overlay an extracted archive onto the install directory.
    OverlayDir {
        source_dir: PathBuf,
        target_dir: PathBuf,
        relaunch: PathBuf,
    },
}

impl ReplacePlan {
    pub(crate) fn relaunch_path(&self) -> &Path {
        match self {
            Self::ReplaceExe { target, .. } => target,
            Self::OverlayDir { relaunch, .. } => relaunch,
        }
    }
}

pub(crate) fn script_file_name() -> &'static str {
    if cfg!(windows) {
        "apply_update.bat"
    } else {
        "apply_update.sh"
    }
}

pub(crate) fn render_script(plan: &ReplacePlan) -> String {
    if cfg!(windows) {
        render_batch(plan)
    } else {
        render_sh(plan)
    }
}

pub(crate) fn render_batch(plan: &ReplacePlan) -> String {
    let copy_command = match plan {
        ReplacePlan::ReplaceExe { source, target } => format!(
            "copy /y \"{}\" \"{}\" >nul 2>&1",
            source.display(),
            target.display()
        ),
        ReplacePlan::OverlayDir {
            source_dir,
            target_dir,
            ..
        } => format!(
            "xcopy /e /y /i \"{}\\*\" \"{}\" >nul 2>&1",
            source_dir.display(),
            target_dir.display()
        ),
    };
    let relaunch = plan.relaunch_path().display();
    // ping -n N waits roughly N-1 seconds; the oldest portable batch sleep.
    format!(
        "@echo off\r\n\
         ping -n {grace} 127.0.0.1 >nul\r\n\
         set tries={retries}\r\n\
         :retry\r\n\
         {copy_command}\r\n\
         if not errorlevel 1 goto launch\r\n\
         set /a tries-=1\r\n\
         if %tries% gtr 0 (\r\n\
         \x20\x20ping -n 2 127.0.0.1 >nul\r\n\
         \x20\x20goto retry\r\n\
         )\r\n\
         exit /b 1\r\n\
         :launch\r\n\
         start \"\" \"{relaunch}\"\r\n\
         del \"%~f0\"\r\n",
        grace = GRACE_PERIOD_SECS + 1,
        retries = COPY_RETRIES,
    )
}

pub(crate) fn render_sh(plan: &ReplacePlan) -> String {
    let copy_command = match plan {
        ReplacePlan::ReplaceExe { source, target } => format!(
            "cp -f \"{}\" \"{}\" 2>/dev/null",
            source.display(),
            target.display()
        ),
        ReplacePlan::OverlayDir {
            source_dir,
            target_dir,
            ..
        } => format!(
            "cp -Rf \"{}/.\" \"{}\" 2>/dev/null",
            source_dir.display(),
            target_dir.display()
        ),
    };
    let relaunch = plan.relaunch_path().display();
    format!(
        "#!/bin/sh\n\
         sleep {GRACE_PERIOD_SECS}\n\
         tries={COPY_RETRIES}\n\
         while [ \"$tries\" -gt 0 ]; do\n\
         \x20\x20if {copy_command}; then\n\
         \x20\x20\x20\x20chmod +x \"{relaunch}\" 2>/dev/null\n\
         \x20\x20\x20\x20\"{relaunch}\" >/dev/null 2>&1 &\n\
         \x20\x20\x20\x20break\n\
         \x20\x20fi\n\
         \x20\x20tries=$((tries - 1))\n\
         \x20\x20sleep 1\n\
         done\n\
         rm -- \"$0\"\n"
    )
}
