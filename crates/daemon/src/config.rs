//! Configuration management for the panestrip daemon.
//!
//! Configuration is loaded from TOML files in the following locations (in order):
//! 1. The platform config dir (`$XDG_CONFIG_HOME/panestrip/config.toml` on Linux)
//! 2. `~/.config/panestrip/config.toml`
//! 3. `./config.toml` (current directory, for development)
//!
//! `$PANESTRIP_CONFIG` names a file to use instead of the search.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use panestrip_core_layout::{CenteringMode, ColumnWidth, EngineOptions, Rect, ScrollingSpace, SnapStrategy};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "PANESTRIP_CONFIG";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub layout: LayoutConfig,
    pub animation: AnimationConfig,
    pub gestures: GestureConfig,
    pub frame_cache: FrameCacheConfig,
    pub behavior: BehaviorConfig,
    /// Window rules, first match wins.
    pub window_rules: Vec<WindowRule>,
}

/// The working area windows are laid out in, in screen pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1920.0,
            height: 1080.0,
        }
    }
}

impl OutputConfig {
    pub fn working_area(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Layout-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Gap between columns and between stacked windows, in pixels.
    pub gap: f64,

    /// How far beyond the working area off-screen columns are parked.
    pub screen_margin: f64,

    /// Width of new columns as a fraction of the working area.
    pub default_column_width: f64,

    /// Centering mode for focus navigation.
    pub centering_mode: CenteringModeConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            gap: 0.0,
            screen_margin: 100.0,
            default_column_width: 0.8,
            centering_mode: CenteringModeConfig::default(),
        }
    }
}

/// Centering mode configuration (wrapper for serialization).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CenteringModeConfig {
    /// Center the focused column in the working area.
    #[default]
    Center,
    /// Only scroll as far as needed to bring the focused column into view.
    JustInView,
}

impl From<CenteringModeConfig> for CenteringMode {
    fn from(config: CenteringModeConfig) -> Self {
        match config {
            CenteringModeConfig::Center => CenteringMode::Center,
            CenteringModeConfig::JustInView => CenteringMode::JustInView,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Move windows to their new frames with springs after structural changes.
    pub animate_windows: bool,

    /// Frequency of the tick timer while anything is moving.
    pub tick_rate_hz: u32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            animate_windows: true,
            tick_rate_hz: 120,
        }
    }
}

/// Scroll gesture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub enabled: bool,

    /// Map touch deltas 1:1 to pixels instead of normalizing them against
    /// the working area.
    pub one_to_one: bool,

    pub invert_horizontal: bool,
    pub invert_vertical: bool,

    /// Only react to scroll events while scanning mode is held.
    pub require_scanning_mode: bool,

    pub snap_strategy: SnapStrategyConfig,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            one_to_one: true,
            invert_horizontal: false,
            invert_vertical: false,
            require_scanning_mode: false,
            snap_strategy: SnapStrategyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SnapStrategyConfig {
    /// Snap to the point nearest to where the gesture was released.
    #[default]
    Nearest,
    /// Snap to the point nearest to where the fling would come to rest.
    Projected,
}

impl From<SnapStrategyConfig> for SnapStrategy {
    fn from(config: SnapStrategyConfig) -> Self {
        match config {
            SnapStrategyConfig::Nearest => SnapStrategy::Nearest,
            SnapStrategyConfig::Projected => SnapStrategy::Projected,
        }
    }
}

/// Rate limiting and deduplication of frame writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameCacheConfig {
    /// Minimum time between two animated writes to the same window.
    pub min_update_interval_ms: u64,

    /// Position changes below this many pixels are dropped.
    pub position_threshold: f64,

    /// Size changes below this many pixels are dropped.
    pub size_threshold: f64,
}

impl Default for FrameCacheConfig {
    fn default() -> Self {
        Self {
            min_update_interval_ms: 8,
            position_threshold: 0.5,
            size_threshold: 1.0,
        }
    }
}

/// Behavior-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Whether to focus new windows automatically.
    pub focus_new_windows: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            focus_new_windows: true,
        }
    }
}

// ============================================================================
// Window Rules
// ============================================================================

/// A rule for per-window behavior.
///
/// # Example Config
///
/// ```toml
/// [[window_rules]]
/// match_app = "pavucontrol"
/// action = "ignore"
///
/// [[window_rules]]
/// match_title = ".*Picture-in-Picture.*"
/// action = "ignore"
///
/// [[window_rules]]
/// match_app = "kitty|alacritty"
/// column_width = 0.5
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowRule {
    /// Regex pattern to match the window title.
    #[serde(default)]
    pub match_title: Option<String>,

    /// Regex pattern to match the application name.
    #[serde(default)]
    pub match_app: Option<String>,

    #[serde(default)]
    pub action: WindowAction,

    /// Width of the column created for the window, as a proportion.
    #[serde(default)]
    pub column_width: Option<f64>,
}

/// Action to take for a matching window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAction {
    /// Tile the window normally.
    #[default]
    Tile,
    /// Don't manage the window at all.
    Ignore,
}

/// A window rule with its patterns compiled.
#[derive(Debug, Clone)]
pub struct CompiledWindowRule {
    title: Option<Regex>,
    app: Option<Regex>,
    pub action: WindowAction,
    pub column_width: Option<ColumnWidth>,
}

impl CompiledWindowRule {
    pub fn compile(rule: &WindowRule) -> Result<Self, regex::Error> {
        Ok(Self {
            title: rule.match_title.as_deref().map(Regex::new).transpose()?,
            app: rule.match_app.as_deref().map(Regex::new).transpose()?,
            action: rule.action,
            column_width: rule.column_width.map(ColumnWidth::Proportion),
        })
    }

    /// All specified criteria must match. A rule without criteria matches
    /// nothing.
    pub fn matches(&self, title: &str, app: &str) -> bool {
        if self.title.is_none() && self.app.is_none() {
            return false;
        }
        if let Some(ref re) = self.title {
            if !re.is_match(title) {
                return false;
            }
        }
        if let Some(ref re) = self.app {
            if !re.is_match(app) {
                return false;
            }
        }
        true
    }
}

/// Compile every rule, skipping (and logging) invalid patterns.
pub fn compile_rules(rules: &[WindowRule]) -> Vec<CompiledWindowRule> {
    rules
        .iter()
        .enumerate()
        .filter_map(|(i, rule)| match CompiledWindowRule::compile(rule) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::warn!("Invalid regex in window rule {}: {}", i, e);
                None
            }
        })
        .collect()
}

/// First rule matching the window, if any.
pub fn find_rule<'a>(rules: &'a [CompiledWindowRule], title: &str, app: &str) -> Option<&'a CompiledWindowRule> {
    rules.iter().find(|rule| rule.matches(title, app))
}

// ============================================================================
// Validation
// ============================================================================

/// A problem found in the loaded configuration. The offending value has
/// already been replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub message: String,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Load configuration from standard locations.
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self> {
        let paths = config_paths();

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Clamp out-of-range values, returning one warning per fix.
    pub fn validate(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let output = &mut self.output;
        if !(output.width.is_finite() && output.width > 0.0) || !(output.height.is_finite() && output.height > 0.0) {
            warnings.push(ConfigWarning {
                field: "output",
                message: format!("{}x{} is not a usable size, using 1920x1080", output.width, output.height),
            });
            output.width = 1920.0;
            output.height = 1080.0;
        }
        if !output.x.is_finite() || !output.y.is_finite() {
            warnings.push(ConfigWarning {
                field: "output",
                message: "Origin is not finite, using 0,0".to_string(),
            });
            output.x = 0.0;
            output.y = 0.0;
        }

        if !self.layout.gap.is_finite() || self.layout.gap < 0.0 {
            warnings.push(ConfigWarning {
                field: "layout.gap",
                message: format!("{} is not a valid gap, using 0", self.layout.gap),
            });
            self.layout.gap = 0.0;
        }

        if !self.layout.screen_margin.is_finite() || self.layout.screen_margin < 0.0 {
            warnings.push(ConfigWarning {
                field: "layout.screen_margin",
                message: format!("{} is not a valid margin, using 100", self.layout.screen_margin),
            });
            self.layout.screen_margin = 100.0;
        }

        let width = self.layout.default_column_width;
        if !(width > 0.0 && width <= 1.0) {
            let clamped = if width.is_finite() { width.clamp(0.1, 1.0) } else { 0.8 };
            warnings.push(ConfigWarning {
                field: "layout.default_column_width",
                message: format!("{} is outside (0, 1], using {}", width, clamped),
            });
            self.layout.default_column_width = clamped;
        }

        if !(1..=1000).contains(&self.animation.tick_rate_hz) {
            let clamped = self.animation.tick_rate_hz.clamp(1, 1000);
            warnings.push(ConfigWarning {
                field: "animation.tick_rate_hz",
                message: format!("{} is outside 1..=1000, using {}", self.animation.tick_rate_hz, clamped),
            });
            self.animation.tick_rate_hz = clamped;
        }

        let cache = &mut self.frame_cache;
        if !cache.position_threshold.is_finite() || cache.position_threshold < 0.0 {
            warnings.push(ConfigWarning {
                field: "frame_cache.position_threshold",
                message: format!("{} is negative, using 0.5", cache.position_threshold),
            });
            cache.position_threshold = 0.5;
        }
        if !cache.size_threshold.is_finite() || cache.size_threshold < 0.0 {
            warnings.push(ConfigWarning {
                field: "frame_cache.size_threshold",
                message: format!("{} is negative, using 1", cache.size_threshold),
            });
            cache.size_threshold = 1.0;
        }

        let level = self.behavior.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            warnings.push(ConfigWarning {
                field: "behavior.log_level",
                message: format!("Unknown level '{}', using info", self.behavior.log_level),
            });
            self.behavior.log_level = "info".to_string();
        }

        for (i, rule) in self.window_rules.iter_mut().enumerate() {
            if let Some(width) = rule.column_width {
                if !(width > 0.0 && width <= 1.0) {
                    warnings.push(ConfigWarning {
                        field: "window_rules.column_width",
                        message: format!("Rule {}: {} is outside (0, 1], ignoring it", i, width),
                    });
                    rule.column_width = None;
                }
            }
            if rule.match_title.is_none() && rule.match_app.is_none() {
                warnings.push(ConfigWarning {
                    field: "window_rules",
                    message: format!("Rule {} has no match criteria and never applies", i),
                });
            }
            for pattern in [&rule.match_title, &rule.match_app].into_iter().flatten() {
                if let Err(e) = Regex::new(pattern) {
                    warnings.push(ConfigWarning {
                        field: "window_rules",
                        message: format!("Rule {}: invalid pattern '{}': {}", i, pattern, e),
                    });
                }
            }
        }

        warnings
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            animate_windows: self.animation.animate_windows,
            gestures_enabled: self.gestures.enabled,
            require_scanning_mode: self.gestures.require_scanning_mode,
            focus_new_windows: self.behavior.focus_new_windows,
        }
    }

    /// Copy the output, layout and gesture settings onto a scrolling space.
    pub fn apply_to_space(&self, space: &mut ScrollingSpace) {
        space.set_working_area(self.output.working_area());
        space.gap = self.layout.gap;
        space.screen_margin = self.layout.screen_margin;
        space.default_column_width = ColumnWidth::Proportion(self.layout.default_column_width);
        space.centering_mode = self.layout.centering_mode.into();
        space.one_to_one = self.gestures.one_to_one;
        space.snap_strategy = self.gestures.snap_strategy.into();
    }
}

/// Get all possible config file paths in priority order.
pub fn config_paths() -> Vec<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return vec![PathBuf::from(path)];
    }

    let mut paths = Vec::new();

    if let Some(proj_dirs) = ProjectDirs::from("org", "panestrip", "panestrip") {
        paths.push(proj_dirs.config_dir().join("config.toml"));
    }

    if let Some(home) = dirs_home() {
        let unix_style = home.join(".config").join("panestrip").join("config.toml");
        if !paths.contains(&unix_style) {
            paths.push(unix_style);
        }
    }

    paths.push(PathBuf::from("config.toml"));

    paths
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
