//! Chromium DevTools Protocol adapter.
//!
//! Owns the Chromium process and exposes each tab as a [`PageDriver`], the narrow
//! surface (script evaluation, navigation, screenshots, key events) the higher
//! layers build their page operations on.

use std::{env, path::PathBuf};

use which::which;

pub mod browser;
pub mod driver;
pub mod keys;

pub use browser::ChromiumBrowser;
pub use config::CdpConfig;
pub use driver::{ChromiumPage, PageDriver};
pub use error::{AdapterError, AdapterErrorKind};
pub use keys::KeyChord;

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by the adapter.
    #[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
    pub enum AdapterErrorKind {
        #[error("browser launch failed")]
        Launch,
        #[error("navigation timed out")]
        NavTimeout,
        #[error("cdp i/o failure")]
        CdpIo,
        #[error("script evaluation failed")]
        Script,
        #[error("invalid input")]
        InvalidInput,
        #[error("internal error")]
        Internal,
    }

    /// Enriched error metadata passed back to higher layers.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
        pub retriable: bool,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self {
                kind,
                hint: None,
                retriable: false,
            }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn retriable(mut self, flag: bool) -> Self {
            self.retriable = flag;
            self
        }

        pub fn cdp_io(err: impl fmt::Display) -> Self {
            Self::new(AdapterErrorKind::CdpIo)
                .with_hint(err.to_string())
                .retriable(true)
        }
    }
}

pub mod config {
    use crate::detect_chrome_executable;
    use serde::{Deserialize, Serialize};
    use std::{env, path::PathBuf, time::Duration};

    /// Configuration for launching and tuning the adapter.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct CdpConfig {
        /// Empty means "let chromiumoxide find one".
        pub executable: PathBuf,
        pub headless: bool,
        pub window_width: u32,
        pub window_height: u32,
        /// Deadline for a navigation to finish loading.
        pub navigation_timeout_ms: u64,
        /// Deadline for one script evaluation.
        pub eval_timeout_ms: u64,
        /// Deadline for one page-context request/response round-trip.
        pub channel_timeout_ms: u64,
        pub extra_args: Vec<String>,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                executable: detect_chrome_executable().unwrap_or_default(),
                headless: resolve_headless_default(),
                window_width: 1280,
                window_height: 1100,
                navigation_timeout_ms: 30_000,
                eval_timeout_ms: 10_000,
                channel_timeout_ms: 45_000,
                extra_args: Vec::new(),
            }
        }
    }

    impl CdpConfig {
        pub fn navigation_timeout(&self) -> Duration {
            Duration::from_millis(self.navigation_timeout_ms)
        }

        pub fn eval_timeout(&self) -> Duration {
            Duration::from_millis(self.eval_timeout_ms)
        }

        pub fn channel_timeout(&self) -> Duration {
            Duration::from_millis(self.channel_timeout_ms)
        }

        pub fn with_headless(mut self, headless: bool) -> Self {
            self.headless = headless;
            self
        }
    }

    fn resolve_headless_default() -> bool {
        // "0", "false", "no", "off" means headful
        match env::var("TABPILOT_HEADLESS") {
            Ok(value) => {
                let lower = value.to_ascii_lowercase();
                !matches!(lower.as_str(), "0" | "false" | "no" | "off")
            }
            Err(_) => true,
        }
    }
}

fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("CHROME_BIN") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    os_specific_chrome_paths()
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/chromium"),
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "freebsd")))]
    {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executable_names_are_not_empty() {
        assert!(!chrome_executable_names().is_empty());
    }

    #[test]
    fn error_display_includes_hint() {
        let err = AdapterError::new(AdapterErrorKind::Script).with_hint("ReferenceError: x");
        assert_eq!(err.to_string(), "script evaluation failed: ReferenceError: x");
        assert!(!err.retriable);
        assert!(AdapterError::cdp_io("socket closed").retriable);
    }

    #[test]
    fn default_config_has_sane_timeouts() {
        let cfg = CdpConfig::default();
        assert_eq!(cfg.navigation_timeout().as_secs(), 30);
        assert!(cfg.eval_timeout_ms > 0);
        assert!(!cfg.with_headless(false).headless);
    }
}
