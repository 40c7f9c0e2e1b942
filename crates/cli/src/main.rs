//! panestrip CLI
//!
//! Command-line interface for controlling the panestrip daemon.
//!
//! Each invocation sends one command over the daemon's Unix socket and
//! prints the response.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use panestrip_ipc::{IpcCommand, IpcPhase, IpcRect, IpcResponse, IpcVisibility, MAX_IPC_MESSAGE_SIZE};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// How long to wait for the daemon's answer.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "panestrip-cli")]
#[command(author, version, about = "Control the panestrip layout daemon")]
struct Cli {
    /// Socket path (defaults to $PANESTRIP_SOCKET or the runtime dir)
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Print the raw JSON response
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Move keyboard focus
    Focus {
        #[arg(value_enum)]
        direction: FocusDirection,
    },
    /// Move the focused window into a new column
    MoveToNewColumn {
        #[arg(value_enum)]
        side: Side,
    },
    /// Stack the focused window into the neighbouring column
    Consume {
        #[arg(value_enum)]
        side: Side,
    },
    /// Swap the focused column with its neighbour
    MoveColumn {
        #[arg(value_enum)]
        side: Side,
    },
    /// Set the focused column's width as a fraction of the working area
    SetWidth {
        /// Proportion in (0, 1]
        proportion: f64,
    },
    /// Give a window a fixed height
    SetHeight {
        window_id: u64,
        /// Height in pixels
        height: f64,
    },
    /// Announce a window to the daemon
    Add {
        window_id: u64,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        app: String,
        /// Current frame as x,y,width,height
        #[arg(long, value_parser = parse_rect)]
        rect: Option<IpcRect>,
    },
    /// Remove a window
    Remove { window_id: u64 },
    /// Inject a scroll event
    Scroll {
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        dx: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        dy: f64,
        /// Touch phase; omit for a mouse-wheel tick
        #[arg(long, value_enum, default_value_t = Phase::None)]
        phase: Phase,
        #[arg(long, value_enum, default_value_t = Phase::None)]
        momentum: Phase,
        /// The event comes from a touchpad
        #[arg(long)]
        touchpad: bool,
    },
    /// Enter or leave scanning mode
    Scanning {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Query daemon state
    Query {
        #[arg(value_enum)]
        what: QueryType,
    },
    /// Reload configuration
    Reload,
    /// Stop the daemon
    Stop,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FocusDirection {
    Left,
    Right,
    Up,
    Down,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    None,
    Began,
    Changed,
    Ended,
    Cancelled,
}

impl From<Phase> for IpcPhase {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::None => IpcPhase::None,
            Phase::Began => IpcPhase::Began,
            Phase::Changed => IpcPhase::Changed,
            Phase::Ended => IpcPhase::Ended,
            Phase::Cancelled => IpcPhase::Cancelled,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Toggle {
    On,
    Off,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum QueryType {
    /// Columns, offsets and modes
    Workspace,
    /// The focused window
    Focused,
    /// Every managed window
    Windows,
}

fn parse_rect(s: &str) -> Result<IpcRect, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid number in rect: {}", e))?;
    match parts[..] {
        [x, y, width, height] => Ok(IpcRect { x, y, width, height }),
        _ => Err(format!("expected x,y,width,height, got {} values", parts.len())),
    }
}

fn to_ipc_command(command: Commands) -> IpcCommand {
    match command {
        Commands::Focus { direction } => match direction {
            FocusDirection::Left => IpcCommand::FocusLeft,
            FocusDirection::Right => IpcCommand::FocusRight,
            FocusDirection::Up => IpcCommand::FocusUp,
            FocusDirection::Down => IpcCommand::FocusDown,
        },
        Commands::MoveToNewColumn { side } => match side {
            Side::Left => IpcCommand::MoveToNewColumnLeft,
            Side::Right => IpcCommand::MoveToNewColumnRight,
        },
        Commands::Consume { side } => match side {
            Side::Left => IpcCommand::ConsumeIntoColumnLeft,
            Side::Right => IpcCommand::ConsumeIntoColumnRight,
        },
        Commands::MoveColumn { side } => match side {
            Side::Left => IpcCommand::MoveColumnLeft,
            Side::Right => IpcCommand::MoveColumnRight,
        },
        Commands::SetWidth { proportion } => IpcCommand::SetColumnWidth { proportion },
        Commands::SetHeight { window_id, height } => IpcCommand::SetWindowHeight { window_id, height },
        Commands::Add {
            window_id,
            title,
            app,
            rect,
        } => IpcCommand::AddWindow {
            window_id,
            title,
            app,
            rect,
        },
        Commands::Remove { window_id } => IpcCommand::RemoveWindow { window_id },
        Commands::Scroll {
            dx,
            dy,
            phase,
            momentum,
            touchpad,
        } => IpcCommand::Scroll {
            delta_x: dx,
            delta_y: dy,
            phase: phase.into(),
            momentum_phase: momentum.into(),
            timestamp: None,
            is_touchpad: touchpad,
        },
        Commands::Scanning { state } => IpcCommand::SetScanning {
            active: state == Toggle::On,
        },
        Commands::Query { what } => match what {
            QueryType::Workspace => IpcCommand::QueryWorkspace,
            QueryType::Focused => IpcCommand::QueryFocused,
            QueryType::Windows => IpcCommand::QueryWindows,
        },
        Commands::Reload => IpcCommand::Reload,
        Commands::Stop => IpcCommand::Stop,
    }
}

fn visibility_label(visibility: IpcVisibility) -> &'static str {
    match visibility {
        IpcVisibility::Visible => "visible",
        IpcVisibility::OffScreenLeft => "off-screen left",
        IpcVisibility::OffScreenRight => "off-screen right",
    }
}

/// Human-readable rendering of a response.
fn format_response(response: &IpcResponse) -> String {
    match response {
        IpcResponse::Ok => "ok".to_string(),
        IpcResponse::Error { message } => format!("error: {}", message),
        IpcResponse::ScrollHandled { consumed } => {
            if *consumed {
                "scroll consumed".to_string()
            } else {
                "scroll passed through".to_string()
            }
        }
        IpcResponse::WorkspaceState {
            columns,
            windows,
            active_column,
            horizontal_offset,
            vertical_offset,
            animating,
            scanning,
        } => format!(
            "columns: {}\nwindows: {}\nactive column: {}\nhorizontal offset: {:.1}\nvertical offset: {:.1}\nanimating: {}\nscanning: {}",
            columns, windows, active_column, horizontal_offset, vertical_offset, animating, scanning
        ),
        IpcResponse::FocusedWindow {
            window_id,
            column_index,
            window_index,
        } => match window_id {
            Some(id) => format!("window {} (column {}, row {})", id, column_index, window_index),
            None => "no focused window".to_string(),
        },
        IpcResponse::WindowList { windows } => {
            if windows.is_empty() {
                return "no windows".to_string();
            }
            windows
                .iter()
                .map(|w| {
                    format!(
                        "{}{:>6}  col {} row {}  {:.0},{:.0} {:.0}x{:.0}  {}  {} [{}]",
                        if w.focused { "*" } else { " " },
                        w.window_id,
                        w.column_index,
                        w.window_index,
                        w.rect.x,
                        w.rect.y,
                        w.rect.width,
                        w.rect.height,
                        visibility_label(w.visibility),
                        w.title,
                        w.app
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

/// Send one command and wait for the response line.
async fn send_command(socket: &Path, cmd: &IpcCommand) -> Result<IpcResponse> {
    let stream = UnixStream::connect(socket).await.with_context(|| {
        format!(
            "Failed to connect to daemon at {} (is panestrip running?)",
            socket.display()
        )
    })?;
    let (reader, mut writer) = stream.into_split();

    let line = panestrip_ipc::encode_line(cmd)?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;

    let mut reader = BufReader::new(reader.take(MAX_IPC_MESSAGE_SIZE as u64));
    let mut response = String::new();
    let read = tokio::time::timeout(RESPONSE_TIMEOUT, reader.read_line(&mut response))
        .await
        .context("Timed out waiting for the daemon")??;
    if read == 0 {
        bail!("Daemon closed the connection without responding");
    }

    Ok(panestrip_ipc::decode_line(&response)?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let socket = cli.socket.unwrap_or_else(panestrip_ipc::socket_path);
    let cmd = to_ipc_command(cli.command);

    let response = send_command(&socket, &cmd).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", format_response(&response));
    }

    if matches!(response, IpcResponse::Error { .. }) {
        std::process::exit(1);
    }
    Ok(())
}
