//! panestrip daemon.
//!
//! Hosts the layout engine headlessly. Windows are announced and removed
//! over IPC, scroll input is injected over IPC, and frame writes land in an
//! in-process virtual window store. All layout state is owned by a single
//! event loop; IPC handlers and the tick timer feed it through a channel.

mod config;
mod sink;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use config::{CompiledWindowRule, Config, WindowAction};
use panestrip_core_layout::{
    Axis, ColumnWidth, Direction, EventDisposition, LayoutEngine, Rect, ScrollEvent, ScrollPhase,
    ScrollingSpace, Visibility, WindowHeight,
};
use panestrip_ipc::{
    IpcCommand, IpcPhase, IpcRect, IpcResponse, IpcVisibility, WindowInfo, IPC_READ_TIMEOUT_SECS,
    MAX_IPC_MESSAGE_SIZE,
};
use sink::{DaemonSink, FrameCache, FrameWriter, VirtualWindow, WindowStore};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Events that the daemon event loop processes.
enum DaemonEvent {
    /// An IPC command from a client.
    IpcCommand {
        cmd: IpcCommand,
        responder: oneshot::Sender<IpcResponse>,
    },
    /// Frame tick while anything is moving.
    Tick,
    /// Shutdown signal.
    Shutdown,
}

/// IPC read timeout - clients must send within this period.
const IPC_READ_TIMEOUT: Duration = Duration::from_secs(IPC_READ_TIMEOUT_SECS);

/// Sent when a response cannot be serialized.
const SERIALIZATION_ERROR_LINE: &str = "{\"status\":\"error\",\"message\":\"Internal serialization error\"}\n";

type Engine = LayoutEngine<VirtualWindow, DaemonSink>;

struct AppState {
    engine: Engine,
    store: WindowStore,
    config: Config,
    /// Pre-compiled window rules for efficient matching.
    compiled_rules: Vec<CompiledWindowRule>,
    /// Origin of the engine clock.
    epoch: Instant,
}

impl AppState {
    fn new_with_config(config: Config, sink: DaemonSink, store: WindowStore) -> Self {
        let mut space = ScrollingSpace::new(config.output.working_area());
        config.apply_to_space(&mut space);

        let mut engine = LayoutEngine::new(space, sink, config.engine_options());
        let classifier = engine.classifier_mut();
        classifier.invert_horizontal = config.gestures.invert_horizontal;
        classifier.invert_vertical = config.gestures.invert_vertical;

        Self {
            engine,
            store,
            compiled_rules: config::compile_rules(&config.window_rules),
            config,
            epoch: Instant::now(),
        }
    }

    /// Seconds since the daemon started.
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.config.animation.tick_rate_hz.max(1)))
    }

    fn needs_tick(&self) -> bool {
        self.engine.needs_tick()
    }

    fn tick(&mut self) {
        let now = self.now();
        self.engine.tick(now);
    }

    /// Apply a new configuration to the running engine.
    fn apply_config(&mut self, config: Config) {
        config.apply_to_space(self.engine.space_mut());
        self.engine.set_options(config.engine_options());

        let classifier = self.engine.classifier_mut();
        classifier.invert_horizontal = config.gestures.invert_horizontal;
        classifier.invert_vertical = config.gestures.invert_vertical;

        let cached = self.engine.sink().cache().len();
        if config.frame_cache == self.config.frame_cache {
            self.engine.sink().cache().clear_all();
        } else {
            self.engine
                .sink_mut()
                .set_cache(Arc::new(FrameCache::new(&config.frame_cache)));
        }
        debug!("Dropped {} cached frames", cached);

        self.compiled_rules = config::compile_rules(&config.window_rules);
        self.config = config;
    }

    fn handle_command(&mut self, cmd: IpcCommand) -> IpcResponse {
        let now = self.now();

        match cmd {
            IpcCommand::FocusLeft => self.focus(Direction::Left, now),
            IpcCommand::FocusRight => self.focus(Direction::Right, now),
            IpcCommand::FocusUp => self.focus(Direction::Up, now),
            IpcCommand::FocusDown => self.focus(Direction::Down, now),

            IpcCommand::MoveToNewColumnLeft => {
                self.engine.move_active_window_to_new_column(Direction::Left, now);
                IpcResponse::Ok
            }
            IpcCommand::MoveToNewColumnRight => {
                self.engine.move_active_window_to_new_column(Direction::Right, now);
                IpcResponse::Ok
            }
            IpcCommand::ConsumeIntoColumnLeft => {
                self.engine.consume_into_column(Direction::Left, now);
                IpcResponse::Ok
            }
            IpcCommand::ConsumeIntoColumnRight => {
                self.engine.consume_into_column(Direction::Right, now);
                IpcResponse::Ok
            }
            IpcCommand::MoveColumnLeft => {
                self.engine.move_column(Direction::Left, now);
                IpcResponse::Ok
            }
            IpcCommand::MoveColumnRight => {
                self.engine.move_column(Direction::Right, now);
                IpcResponse::Ok
            }

            IpcCommand::SetColumnWidth { proportion } => {
                if !(proportion > 0.0 && proportion <= 1.0) {
                    return IpcResponse::error(format!("Column width {} is outside (0, 1]", proportion));
                }
                self.engine
                    .set_column_width(ColumnWidth::Proportion(proportion), now);
                IpcResponse::Ok
            }
            IpcCommand::SetWindowHeight { window_id, height } => {
                if !(height.is_finite() && height > 0.0) {
                    return IpcResponse::error(format!("Window height {} must be positive", height));
                }
                match self
                    .engine
                    .set_window_height(window_id, WindowHeight::Fixed(height), now)
                {
                    Ok(()) => IpcResponse::Ok,
                    Err(e) => IpcResponse::error(e.to_string()),
                }
            }

            IpcCommand::AddWindow {
                window_id,
                title,
                app,
                rect,
            } => self.add_window(window_id, title, app, rect, now),
            IpcCommand::RemoveWindow { window_id } => match self.engine.remove_window(window_id, now) {
                Ok(_) => {
                    self.engine.sink().cache().clear(window_id);
                    if let Some(state) = self.store.remove(window_id) {
                        debug!(window_id, writes = state.writes, title = %state.title, "Virtual window closed");
                    }
                    IpcResponse::Ok
                }
                Err(e) => IpcResponse::error(e.to_string()),
            },

            IpcCommand::Scroll {
                delta_x,
                delta_y,
                phase,
                momentum_phase,
                timestamp,
                is_touchpad,
            } => {
                let event = ScrollEvent {
                    delta_x,
                    delta_y,
                    phase: scroll_phase(phase),
                    momentum_phase: scroll_phase(momentum_phase),
                    timestamp: timestamp.unwrap_or(now),
                    is_touchpad,
                };
                let consumed = self.engine.handle_scroll(&event) == EventDisposition::Consumed;
                IpcResponse::ScrollHandled { consumed }
            }
            IpcCommand::SetScanning { active } => {
                self.engine.set_scanning(active, now);
                IpcResponse::Ok
            }

            IpcCommand::QueryWorkspace => {
                let space = self.engine.space();
                IpcResponse::WorkspaceState {
                    columns: space.column_count(),
                    windows: space.window_count(),
                    active_column: space.active_column_index(),
                    horizontal_offset: space.offset(Axis::Horizontal).current(now),
                    vertical_offset: space.offset(Axis::Vertical).current(now),
                    animating: self.engine.needs_tick(),
                    scanning: self.engine.is_scanning(),
                }
            }
            IpcCommand::QueryFocused => {
                let window_id = self.engine.focused_window();
                let (column_index, window_index) = window_id
                    .and_then(|id| self.engine.space().find_window(id))
                    .unwrap_or((0, 0));
                IpcResponse::FocusedWindow {
                    window_id,
                    column_index,
                    window_index,
                }
            }
            IpcCommand::QueryWindows => IpcResponse::WindowList {
                windows: self.window_infos(now),
            },

            IpcCommand::Reload => match Config::load() {
                Ok(mut config) => {
                    for w in config.validate() {
                        warn!("Config: {} - {}", w.field, w.message);
                    }
                    self.apply_config(config);
                    info!("Configuration reloaded");
                    IpcResponse::Ok
                }
                Err(e) => IpcResponse::error(format!("Failed to reload config: {:#}", e)),
            },
            IpcCommand::Stop => {
                info!("Stop requested");
                IpcResponse::Ok
            }
        }
    }

    fn focus(&mut self, direction: Direction, now: f64) -> IpcResponse {
        self.engine.focus(direction, now);
        IpcResponse::Ok
    }

    fn add_window(&mut self, window_id: u64, title: String, app: String, rect: Option<IpcRect>, now: f64) -> IpcResponse {
        if self.engine.window(window_id).is_some() {
            return IpcResponse::error(format!("Window {} is already managed", window_id));
        }

        let rule = config::find_rule(&self.compiled_rules, &title, &app);
        if rule.is_some_and(|rule| rule.action == WindowAction::Ignore) {
            info!(window_id, %title, %app, "Window ignored by rule");
            return IpcResponse::Ok;
        }
        let width = rule.and_then(|rule| rule.column_width);

        let frame = rect.map(to_rect).unwrap_or_default();
        self.store.insert(window_id, title, app, frame);
        match self
            .engine
            .add_window(VirtualWindow::new(window_id, self.store.clone()), width, now)
        {
            Ok(()) => IpcResponse::Ok,
            Err(e) => {
                self.store.remove(window_id);
                IpcResponse::error(e.to_string())
            }
        }
    }

    fn window_infos(&self, now: f64) -> Vec<WindowInfo> {
        let space = self.engine.space();
        let focused = self.engine.focused_window();

        self.engine
            .placements(now)
            .into_iter()
            .filter_map(|placement| {
                let state = self.store.get(placement.window_id)?;
                let window_index = space
                    .find_window(placement.window_id)
                    .map_or(0, |(_, row)| row);
                Some(WindowInfo {
                    window_id: placement.window_id,
                    title: state.title,
                    app: state.app,
                    column_index: placement.column_index,
                    window_index,
                    rect: to_ipc_rect(state.frame),
                    visibility: to_ipc_visibility(placement.visibility),
                    focused: focused == Some(placement.window_id),
                })
            })
            .collect()
    }
}

fn scroll_phase(phase: IpcPhase) -> ScrollPhase {
    match phase {
        IpcPhase::None => ScrollPhase::None,
        IpcPhase::Began => ScrollPhase::Began,
        IpcPhase::Changed => ScrollPhase::Changed,
        IpcPhase::Ended => ScrollPhase::Ended,
        IpcPhase::Cancelled => ScrollPhase::Cancelled,
    }
}

fn to_rect(rect: IpcRect) -> Rect {
    Rect::new(rect.x, rect.y, rect.width, rect.height)
}

fn to_ipc_rect(rect: Rect) -> IpcRect {
    IpcRect {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
    }
}

fn to_ipc_visibility(visibility: Visibility) -> IpcVisibility {
    match visibility {
        Visibility::Visible => IpcVisibility::Visible,
        Visibility::OffScreenLeft => IpcVisibility::OffScreenLeft,
        Visibility::OffScreenRight => IpcVisibility::OffScreenRight,
    }
}

/// Accept clients and dispatch their commands to the event loop.
async fn run_ipc_server(listener: UnixListener, event_tx: mpsc::Sender<DaemonEvent>) {
    loop {
        let stream = match listener.accept().await {
            Ok((stream, _)) => stream,
            Err(e) => {
                error!("Failed to accept client connection: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        debug!("Client connected");

        let event_tx = event_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, event_tx).await {
                warn!("Client handler error: {}", e);
            }
        });
    }
}

fn response_line(response: &IpcResponse) -> String {
    match panestrip_ipc::encode_line(response) {
        Ok(line) => line,
        Err(e) => {
            warn!("Failed to serialize IPC response: {}", e);
            SERIALIZATION_ERROR_LINE.to_string()
        }
    }
}

/// Handle a single client connection.
async fn handle_client<S>(stream: S, event_tx: mpsc::Sender<DaemonEvent>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let limited_reader = reader.take(MAX_IPC_MESSAGE_SIZE as u64);
    let mut reader = BufReader::new(limited_reader);
    let mut line = String::new();

    // Read command (single line of JSON) with timeout and size bound
    let read_result = tokio::time::timeout(IPC_READ_TIMEOUT, reader.read_line(&mut line)).await;
    let bytes_read = match read_result {
        Ok(Ok(n)) => n,
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            // Client did not send in time
            return Ok(());
        }
    };
    if bytes_read == 0 {
        return Ok(());
    }

    debug!("Received command: {}", line.trim());

    let cmd: IpcCommand = match panestrip_ipc::decode_line(&line) {
        Ok(cmd) => cmd,
        Err(e) => {
            let response = IpcResponse::error(format!("Invalid command: {}", e));
            writer.write_all(response_line(&response).as_bytes()).await?;
            return Ok(());
        }
    };

    let is_stop = matches!(cmd, IpcCommand::Stop);

    let (resp_tx, resp_rx) = oneshot::channel();
    if event_tx
        .send(DaemonEvent::IpcCommand {
            cmd,
            responder: resp_tx,
        })
        .await
        .is_err()
    {
        let response = IpcResponse::error("Daemon is shutting down");
        writer.write_all(response_line(&response).as_bytes()).await?;
        return Ok(());
    }

    let response = match resp_rx.await {
        Ok(resp) => resp,
        Err(_) => IpcResponse::error("Failed to get response from daemon"),
    };
    writer.write_all(response_line(&response).as_bytes()).await?;
    writer.flush().await?;

    if is_stop {
        let _ = event_tx.send(DaemonEvent::Shutdown).await;
    }

    Ok(())
}

/// Check if another daemon instance is already listening on the socket.
async fn check_already_running(path: &Path) -> bool {
    UnixStream::connect(path).await.is_ok()
}

/// Bind the IPC socket, replacing a stale socket file.
async fn bind_socket(path: &Path) -> Result<Option<UnixListener>> {
    if path.exists() {
        if check_already_running(path).await {
            return Ok(None);
        }
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove stale socket: {}", path.display()))?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create socket directory: {}", parent.display()))?;
    }
    let listener = UnixListener::bind(path)
        .with_context(|| format!("Failed to bind IPC socket: {}", path.display()))?;
    Ok(Some(listener))
}

fn start_tick_timer(tick_tx: mpsc::Sender<DaemonEvent>, running: Arc<AtomicBool>, period: Duration) -> tokio::task::JoinHandle<()> {
    running.store(true, Ordering::SeqCst);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if !running.load(Ordering::SeqCst) {
                break;
            }
            if tick_tx.send(DaemonEvent::Tick).await.is_err() {
                break;
            }
        }
    })
}

fn log_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (needed for log level)
    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {:#}. Using defaults.", e);
        Config::default()
    });

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level(&config.behavior.log_level))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    for w in config.validate() {
        warn!("Config: {} - {}", w.field, w.message);
    }

    info!("panestrip daemon starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let socket_path = panestrip_ipc::socket_path();
    let Some(listener) = bind_socket(&socket_path).await? else {
        error!("Another panestrip daemon is already running (socket {} is active)", socket_path.display());
        return Ok(());
    };

    let area = config.output.working_area();
    info!(
        "Configuration loaded: working area {}x{} at {},{}, gap={}, default_column_width={}, tick_rate={}Hz",
        area.width,
        area.height,
        area.x,
        area.y,
        config.layout.gap,
        config.layout.default_column_width,
        config.animation.tick_rate_hz
    );

    let store = WindowStore::new();
    let (sink, writer) = sink::frame_pipeline(&config.frame_cache, store.clone());
    let writer_handle = tokio::spawn(FrameWriter::run(writer));
    let mut state = AppState::new_with_config(config, sink, store);

    let (event_tx, mut event_rx) = mpsc::channel::<DaemonEvent>(100);

    let ipc_tx = event_tx.clone();
    let server_handle = tokio::spawn(run_ipc_server(listener, ipc_tx));
    info!("IPC server listening on {}", socket_path.display());

    {
        let shutdown_tx = event_tx.clone();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Ctrl+C received, initiating shutdown...");
                let _ = shutdown_tx.send(DaemonEvent::Shutdown).await;
            }
        });
    }

    info!("Ready. Use panestrip-cli to send commands.");

    let mut tick_timer: Option<tokio::task::JoinHandle<()>> = None;
    let tick_running = Arc::new(AtomicBool::new(false));

    while let Some(event) = event_rx.recv().await {
        match event {
            DaemonEvent::IpcCommand { cmd, responder } => {
                let response = state.handle_command(cmd);
                if responder.send(response).is_err() {
                    debug!("Client disconnected before receiving IPC response");
                }

                if state.needs_tick() && !tick_running.load(Ordering::SeqCst) {
                    tick_timer = Some(start_tick_timer(
                        event_tx.clone(),
                        tick_running.clone(),
                        state.tick_interval(),
                    ));
                }
            }
            DaemonEvent::Tick => {
                state.tick();
                if !state.needs_tick() {
                    tick_running.store(false, Ordering::SeqCst);
                    if let Some(handle) = tick_timer.take() {
                        handle.abort();
                    }
                    debug!("Layout idle");
                }
            }
            DaemonEvent::Shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    if let Some(handle) = tick_timer {
        handle.abort();
    }
    server_handle.abort();

    // Dropping the state drops the last frame sender, which stops the writer.
    drop(state);
    if let Err(e) = writer_handle.await {
        warn!("Frame writer task failed: {}", e);
    }

    if let Err(e) = std::fs::remove_file(&socket_path) {
        warn!("Failed to remove socket {}: {}", socket_path.display(), e);
    }

    info!("panestrip daemon stopped");
    Ok(())
}
