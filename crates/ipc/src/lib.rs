//! Panestrip IPC Protocol
//!
//! Shared types for daemon-CLI communication over a Unix domain socket.
//! One newline-terminated JSON command per connection, answered by one
//! newline-terminated JSON response.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name of the daemon socket.
pub const SOCKET_NAME: &str = "panestrip.sock";

/// Environment variable overriding the socket path.
pub const SOCKET_ENV: &str = "PANESTRIP_SOCKET";

/// Upper bound on a single IPC message, in bytes.
pub const MAX_IPC_MESSAGE_SIZE: usize = 64 * 1024;

/// Clients must send their command within this many seconds.
pub const IPC_READ_TIMEOUT_SECS: u64 = 5;

/// Socket path: `$PANESTRIP_SOCKET`, else the user runtime dir, else the
/// temp dir.
pub fn socket_path() -> PathBuf {
    if let Some(path) = std::env::var_os(SOCKET_ENV) {
        return PathBuf::from(path);
    }
    directories::BaseDirs::new()
        .and_then(|dirs| dirs.runtime_dir().map(|dir| dir.to_path_buf()))
        .unwrap_or_else(std::env::temp_dir)
        .join(SOCKET_NAME)
}

/// Errors encoding or decoding protocol messages.
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("Message of {0} bytes exceeds the {MAX_IPC_MESSAGE_SIZE} byte limit")]
    TooLarge(usize),

    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Serialize a message as one protocol line, newline included.
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, IpcError> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    if line.len() > MAX_IPC_MESSAGE_SIZE {
        return Err(IpcError::TooLarge(line.len()));
    }
    Ok(line)
}

/// Parse one protocol line. Surrounding whitespace is ignored.
pub fn decode_line<T: for<'de> Deserialize<'de>>(line: &str) -> Result<T, IpcError> {
    if line.len() > MAX_IPC_MESSAGE_SIZE {
        return Err(IpcError::TooLarge(line.len()));
    }
    Ok(serde_json::from_str(line.trim())?)
}

/// A rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IpcRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Phase of a touch or momentum scroll sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpcPhase {
    #[default]
    None,
    Began,
    Changed,
    Ended,
    Cancelled,
}

/// Placement of a window relative to the working area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpcVisibility {
    Visible,
    OffScreenLeft,
    OffScreenRight,
}

/// A managed window as reported by `query_windows`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub window_id: u64,
    pub title: String,
    pub app: String,
    pub column_index: usize,
    pub window_index: usize,
    /// Last frame written to the window.
    pub rect: IpcRect,
    pub visibility: IpcVisibility,
    pub focused: bool,
}

/// Commands that can be sent to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcCommand {
    /// Focus the column to the left.
    FocusLeft,
    /// Focus the column to the right.
    FocusRight,
    /// Focus the window above in the active column.
    FocusUp,
    /// Focus the window below in the active column.
    FocusDown,

    /// Move the focused window into a new column left of the active one.
    MoveToNewColumnLeft,
    /// Move the focused window into a new column right of the active one.
    MoveToNewColumnRight,
    /// Stack the focused window into the column on the left.
    ConsumeIntoColumnLeft,
    /// Stack the focused window into the column on the right.
    ConsumeIntoColumnRight,
    /// Swap the active column with its left neighbour.
    MoveColumnLeft,
    /// Swap the active column with its right neighbour.
    MoveColumnRight,

    /// Set the active column's width as a fraction of the working area.
    SetColumnWidth { proportion: f64 },
    /// Give a window a fixed height in pixels.
    SetWindowHeight { window_id: u64, height: f64 },

    /// Announce a new window.
    AddWindow {
        window_id: u64,
        #[serde(default)]
        title: String,
        #[serde(default)]
        app: String,
        /// Current frame; defaults to an empty rectangle at the origin.
        #[serde(default)]
        rect: Option<IpcRect>,
    },
    /// A window went away.
    RemoveWindow { window_id: u64 },

    /// Inject a scroll event.
    Scroll {
        delta_x: f64,
        delta_y: f64,
        #[serde(default)]
        phase: IpcPhase,
        #[serde(default)]
        momentum_phase: IpcPhase,
        /// Seconds on the daemon clock; the receive time when absent.
        #[serde(default)]
        timestamp: Option<f64>,
        #[serde(default)]
        is_touchpad: bool,
    },
    /// Enter or leave scanning mode.
    SetScanning { active: bool },

    /// Query the current workspace state.
    QueryWorkspace,
    /// Query the focused window.
    QueryFocused,
    /// List all managed windows.
    QueryWindows,

    /// Reload configuration from file.
    Reload,
    /// Stop the daemon.
    Stop,
}

/// Responses from the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IpcResponse {
    /// Command executed successfully.
    Ok,
    /// Command failed.
    Error { message: String },
    /// Whether a scroll event was used by the layout.
    ScrollHandled { consumed: bool },
    WorkspaceState {
        columns: usize,
        windows: usize,
        active_column: usize,
        /// Effective horizontal view offset.
        horizontal_offset: f64,
        /// Effective vertical offset of the active column.
        vertical_offset: f64,
        animating: bool,
        scanning: bool,
    },
    FocusedWindow {
        window_id: Option<u64>,
        column_index: usize,
        window_index: usize,
    },
    WindowList { windows: Vec<WindowInfo> },
}

impl IpcResponse {
    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
