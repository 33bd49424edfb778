use crate::geometry::CurveStyle;
use crate::overlay::OverlayConfig;
use crate::repository::DEFAULT_STORAGE_KEY;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub padding: f32,
    pub header_height: f32,
    pub legend_height: f32,
    pub column_header_height: f32,
    pub card_width: f32,
    pub column_gap: f32,
    pub card_gap: f32,
    pub card_padding_x: f32,
    pub card_padding_y: f32,
    pub max_name_chars: usize,
    pub line_height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding: 32.0,
            header_height: 72.0,
            legend_height: 36.0,
            column_header_height: 44.0,
            card_width: 180.0,
            column_gap: 28.0,
            card_gap: 8.0,
            card_padding_x: 12.0,
            card_padding_y: 10.0,
            max_name_chars: 22,
            line_height: 1.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#F5F2EC".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub overlay: OverlayConfig,
    pub storage: StorageConfig,
    pub render: RenderConfig,
    pub toast_millis: u64,
}

impl Config {
    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_millis)
    }
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::paper();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            overlay: OverlayConfig::default(),
            storage: StorageConfig::default(),
            render,
            toast_millis: 2000,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    padding: Option<f32>,
    header_height: Option<f32>,
    legend_height: Option<f32>,
    column_header_height: Option<f32>,
    card_width: Option<f32>,
    column_gap: Option<f32>,
    card_gap: Option<f32>,
    card_padding_x: Option<f32>,
    card_padding_y: Option<f32>,
    max_name_chars: Option<usize>,
    line_height: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct OverlayConfigFile {
    same_column_threshold: Option<f32>,
    min_ltr_offset: Option<f32>,
    min_rtl_drop: Option<f32>,
    min_same_bulge: Option<f32>,
    draw_duration_secs: Option<f32>,
    stagger_secs: Option<f32>,
    stroke_width: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct StorageConfigFile {
    data_dir: Option<PathBuf>,
    key: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    background: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    layout: Option<LayoutConfigFile>,
    overlay: Option<OverlayConfigFile>,
    storage: Option<StorageConfigFile>,
    render: Option<RenderConfigFile>,
    toast_millis: Option<u64>,
}

/// Loads a JSON (or JSON5) config file on top of the defaults. Every key is
/// optional.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        match Theme::from_name(theme_name) {
            Some(theme) => {
                config.render.background = theme.background.clone();
                config.theme = theme;
            }
            None => warn!(theme = theme_name, "unknown theme, keeping default"),
        }
    }

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.padding {
            target.padding = v;
        }
        if let Some(v) = layout.header_height {
            target.header_height = v;
        }
        if let Some(v) = layout.legend_height {
            target.legend_height = v;
        }
        if let Some(v) = layout.column_header_height {
            target.column_header_height = v;
        }
        if let Some(v) = layout.card_width {
            target.card_width = v;
        }
        if let Some(v) = layout.column_gap {
            target.column_gap = v;
        }
        if let Some(v) = layout.card_gap {
            target.card_gap = v;
        }
        if let Some(v) = layout.card_padding_x {
            target.card_padding_x = v;
        }
        if let Some(v) = layout.card_padding_y {
            target.card_padding_y = v;
        }
        if let Some(v) = layout.max_name_chars {
            target.max_name_chars = v.max(1);
        }
        if let Some(v) = layout.line_height {
            target.line_height = v;
        }
    }

    if let Some(overlay) = parsed.overlay {
        let target = &mut config.overlay;
        if let Some(v) = overlay.same_column_threshold {
            target.same_column_threshold = v;
        }
        let curve: &mut CurveStyle = &mut target.curve;
        if let Some(v) = overlay.min_ltr_offset {
            curve.min_ltr_offset = v;
        }
        if let Some(v) = overlay.min_rtl_drop {
            curve.min_rtl_drop = v;
        }
        if let Some(v) = overlay.min_same_bulge {
            curve.min_same_bulge = v;
        }
        if let Some(v) = overlay.draw_duration_secs {
            target.draw_duration_secs = v;
        }
        if let Some(v) = overlay.stagger_secs {
            target.stagger_secs = v;
        }
        if let Some(v) = overlay.stroke_width {
            target.stroke_width = v;
        }
    }

    if let Some(storage) = parsed.storage {
        if let Some(v) = storage.data_dir {
            config.storage.data_dir = Some(v);
        }
        if let Some(v) = storage.key {
            config.storage.key = v;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
        if let Some(v) = render.background {
            config.render.background = v;
        }
    }

    if let Some(v) = parsed.toast_millis {
        config.toast_millis = v;
    }

    Ok(config)
}
