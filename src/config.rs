use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub cols: usize,
    pub cell_width: f32,
    pub cell_height: f32,
    pub card_width: f32,
    pub card_height: f32,
    pub min_canvas_height: f32,
    pub vertical_margin: f32,
    pub horizontal_margin: f32,
    pub hull_padding: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            cols: 5,
            cell_width: 340.0,
            cell_height: 260.0,
            card_width: 260.0,
            card_height: 210.0,
            min_canvas_height: 800.0,
            vertical_margin: 300.0,
            horizontal_margin: 50.0,
            hull_padding: 10.0,
        }
    }
}

impl LayoutConfig {
    pub fn cols(&self) -> usize {
        self.cols.max(1)
    }

    /// Horizontal inset of a card inside its cell.
    pub fn cell_padding(&self) -> f32 {
        ((self.cell_width - self.card_width) / 2.0).max(0.0)
    }

    pub fn geometry(&self) -> GridGeometry {
        GridGeometry {
            cols: self.cols(),
            cell_width: self.cell_width,
            cell_height: self.cell_height,
            card_width: self.card_width,
            min_canvas_height: self.min_canvas_height,
            vertical_margin: self.vertical_margin,
        }
    }
}

/// The layout settings that computed cells and coordinates depend on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridGeometry {
    pub cols: usize,
    pub cell_width: f32,
    pub cell_height: f32,
    pub card_width: f32,
    pub min_canvas_height: f32,
    pub vertical_margin: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
    pub footer_gap: f32,
    pub show_footer: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: Theme::light().background,
            footer_gap: 80.0,
            show_footer: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::light();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    background: Option<String>,
    text_color: Option<String>,
    muted_text_color: Option<String>,
    card_fill: Option<String>,
    card_border: Option<String>,
    soop_accent: Option<String>,
    chzzk_card_fill: Option<String>,
    chzzk_card_border: Option<String>,
    chzzk_accent: Option<String>,
    live_border: Option<String>,
    live_badge_fill: Option<String>,
    off_badge_fill: Option<String>,
    hull_fill_opacity: Option<f32>,
    hull_stroke_width: Option<f32>,
    group_colors: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    cols: Option<usize>,
    cell_width: Option<f32>,
    cell_height: Option<f32>,
    card_width: Option<f32>,
    card_height: Option<f32>,
    min_canvas_height: Option<f32>,
    vertical_margin: Option<f32>,
    horizontal_margin: Option<f32>,
    hull_padding: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    background: Option<String>,
    footer_gap: Option<f32>,
    show_footer: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    render: Option<RenderConfigFile>,
}

/// Load a config file over the defaults. `.json5` files are parsed leniently.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(path)?;
    let is_json5 = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json5"))
        .unwrap_or(false);
    let parsed: ConfigFile = if is_json5 {
        json5::from_str(&contents)?
    } else {
        serde_json::from_str(&contents)?
    };
    apply_config_file(Config::default(), parsed)
}

/// Same as [`load_config`] for an in-memory JSON document.
pub fn config_from_json(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = serde_json::from_str(contents)?;
    apply_config_file(Config::default(), parsed)
}

fn apply_config_file(mut config: Config, parsed: ConfigFile) -> anyhow::Result<Config> {
    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = Theme::by_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("unknown theme '{theme_name}'"))?;
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.background {
            config.render.background = v.clone();
            config.theme.background = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.muted_text_color {
            config.theme.muted_text_color = v;
        }
        if let Some(v) = vars.card_fill {
            config.theme.card_fill = v;
        }
        if let Some(v) = vars.card_border {
            config.theme.card_border = v;
        }
        if let Some(v) = vars.soop_accent {
            config.theme.soop_accent = v;
        }
        if let Some(v) = vars.chzzk_card_fill {
            config.theme.chzzk_card_fill = v;
        }
        if let Some(v) = vars.chzzk_card_border {
            config.theme.chzzk_card_border = v;
        }
        if let Some(v) = vars.chzzk_accent {
            config.theme.chzzk_accent = v;
        }
        if let Some(v) = vars.live_border {
            config.theme.live_border = v;
        }
        if let Some(v) = vars.live_badge_fill {
            config.theme.live_badge_fill = v;
        }
        if let Some(v) = vars.off_badge_fill {
            config.theme.off_badge_fill = v;
        }
        if let Some(v) = vars.hull_fill_opacity {
            config.theme.hull_fill_opacity = v.clamp(0.0, 1.0);
        }
        if let Some(v) = vars.hull_stroke_width {
            config.theme.hull_stroke_width = v;
        }
        if let Some(v) = vars.group_colors.filter(|colors| !colors.is_empty()) {
            config.theme.group_colors = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.cols {
            config.layout.cols = v.max(1);
        }
        if let Some(v) = layout.cell_width {
            config.layout.cell_width = v;
        }
        if let Some(v) = layout.cell_height {
            config.layout.cell_height = v;
        }
        if let Some(v) = layout.card_width {
            config.layout.card_width = v;
        }
        if let Some(v) = layout.card_height {
            config.layout.card_height = v;
        }
        if let Some(v) = layout.min_canvas_height {
            config.layout.min_canvas_height = v;
        }
        if let Some(v) = layout.vertical_margin {
            config.layout.vertical_margin = v;
        }
        if let Some(v) = layout.horizontal_margin {
            config.layout.horizontal_margin = v;
        }
        if let Some(v) = layout.hull_padding {
            config.layout.hull_padding = v;
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
        if let Some(v) = render.footer_gap {
            config.render.footer_gap = v;
        }
        if let Some(v) = render.show_footer {
            config.render.show_footer = v;
        }
    }

    Ok(config)
}
