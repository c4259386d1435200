//! Contains logic for reading the focused window in different environments.
//! [GenericWindowInspector] is the main artifact of this module that abstracts
//! the operations.

#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use std::{path::Path, sync::Arc};

use anyhow::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWindow {
    /// Title of the window. For example 'main.rs - Visual Studio Code' or 'Cats - YouTube -
    /// Chrome'
    pub title: Arc<str>,
    /// Name of the owning application, for example 'code' or 'chrome.exe'
    pub app_name: Arc<str>,
}

/// Intended to serve as a contract windows and linux systems must implement.
#[cfg_attr(test, mockall::automock)]
pub trait WindowInspector {
    /// Returns the focused window, or [None] when nothing is focused.
    fn active_window(&mut self) -> Result<Option<ActiveWindow>>;
}

/// Serves as a cross-compatible WindowInspector implementation.
pub struct GenericWindowInspector {
    inner: Box<dyn WindowInspector>,
}

impl GenericWindowInspector {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win::WindowsWindowInspector;
                Ok(Self {
                    inner: Box::new(WindowsWindowInspector::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::X11WindowInspector;
                Ok(Self {
                    inner: Box::new(X11WindowInspector::new()?),
                })
            }
            else {
                Err(anyhow::anyhow!(
                    "No window inspector was compiled in. Rebuild with the `x11` or `win` feature"
                ))
            }
        }
    }
}

impl WindowInspector for GenericWindowInspector {
    fn active_window(&mut self) -> Result<Option<ActiveWindow>> {
        self.inner.active_window()
    }
}

/// Turns an executable path into an application name: `/usr/bin/code` becomes `code`.
pub fn app_name_from_path(value: &str) -> String {
    Path::new(value)
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| value.to_string())
}
