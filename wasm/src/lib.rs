use serde::{Deserialize, Serialize};
use streamgrid::cache::LAYOUT_CACHE_KEY;
use streamgrid::layout::{Canvas, ChainGroup, PositionEntry};
use streamgrid::theme::Theme;
use streamgrid::{
    Config, KeyValueSlot, LayoutCache, MemorySlot, build_dashboard, parse_entity_document,
    render_with_options,
};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DashboardRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    cols: Option<usize>,
    show_footer: Option<bool>,
}

fn build_config(options: DashboardRenderOptions) -> Config {
    let mut config = Config::default();
    if let Some(theme) = options.theme.as_deref().and_then(Theme::by_name) {
        config.render.background = theme.background.clone();
        config.theme = theme;
    }
    if let Some(font_family) = options.font_family {
        config.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        config.theme.font_size = font_size;
    }
    if let Some(cols) = options.cols {
        config.layout.cols = cols;
    }
    if let Some(show_footer) = options.show_footer {
        config.render.show_footer = show_footer;
    }
    config
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ComputeResult<'a> {
    signature: &'a str,
    cache_hit: bool,
    layout: LayoutView<'a>,
    unclustered: Vec<&'a str>,
    /// Fresh record for the page to store under `layout_v2`; null on a hit.
    record: Option<String>,
}

#[derive(Serialize)]
struct LayoutView<'a> {
    positions: &'a [PositionEntry],
    chain: &'a [ChainGroup],
    canvas: Canvas,
}

fn compute(entities_json: &str, cached_json: Option<String>) -> Result<String, String> {
    let entities = parse_entity_document(entities_json).map_err(|error| error.to_string())?;
    let slot = match cached_json {
        Some(raw) => MemorySlot::with_entry(LAYOUT_CACHE_KEY, raw),
        None => MemorySlot::new(),
    };
    let mut cache = LayoutCache::new(slot);
    let config = Config::default();
    let dashboard = build_dashboard(entities, Some(&mut cache), &config.layout);

    let record = if dashboard.cache_hit {
        None
    } else {
        cache.slot().get(LAYOUT_CACHE_KEY)
    };
    let result = ComputeResult {
        signature: &dashboard.signature,
        cache_hit: dashboard.cache_hit,
        layout: LayoutView {
            positions: &dashboard.layout.positions,
            chain: &dashboard.layout.chain,
            canvas: dashboard.layout.canvas,
        },
        unclustered: dashboard
            .unclustered
            .iter()
            .map(|entity| entity.id.as_str())
            .collect(),
        record,
    };
    serde_json::to_string(&result).map_err(|error| error.to_string())
}

fn render(entities_json: &str, options_json: Option<String>) -> Result<String, String> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<DashboardRenderOptions>(&raw_options)
            .map_err(|error| error.to_string())?
    } else {
        DashboardRenderOptions::default()
    };
    render_with_options(entities_json, &build_config(options)).map_err(|error| error.to_string())
}

#[wasm_bindgen]
pub fn compute_dashboard_layout(
    entities_json: &str,
    cached_json: Option<String>,
) -> Result<String, JsValue> {
    compute(entities_json, cached_json).map_err(|error| JsValue::from_str(&error))
}

#[wasm_bindgen]
pub fn render_dashboard_svg(
    entities_json: &str,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    render(entities_json, options_json).map_err(|error| JsValue::from_str(&error))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTITIES: &str = r#"[
        {"id": "a", "group_name": "X"},
        {"id": "b", "group_name": "X,Y"},
        {"id": "c", "group_name": "Y"},
        {"id": "loose"}
    ]"#;

    #[test]
    fn miss_returns_record_and_hit_reuses_it() {
        let first: serde_json::Value =
            serde_json::from_str(&compute(ENTITIES, None).unwrap()).unwrap();
        assert_eq!(first["signature"], "a|b|c");
        assert_eq!(first["cacheHit"], false);
        assert_eq!(first["unclustered"], serde_json::json!(["loose"]));
        let record = first["record"].as_str().unwrap().to_string();

        let second: serde_json::Value =
            serde_json::from_str(&compute(ENTITIES, Some(record)).unwrap()).unwrap();
        assert_eq!(second["cacheHit"], true);
        assert!(second["record"].is_null());
        assert_eq!(second["layout"], first["layout"]);
    }

    #[test]
    fn stale_record_is_ignored() {
        let stale = r#"{"signature": "a|b", "positions": [], "chain": []}"#;
        let result: serde_json::Value =
            serde_json::from_str(&compute(ENTITIES, Some(stale.to_string())).unwrap()).unwrap();
        assert_eq!(result["cacheHit"], false);
        assert_eq!(result["layout"]["positions"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn renders_with_dark_theme() {
        let svg = render(ENTITIES, Some(r##"{"theme": "dark", "cols": 2}"##.to_string()))
            .expect("dashboard should render");
        assert!(svg.contains("<svg"));
        assert!(svg.contains(&Theme::dark().background));
        assert!(svg.contains("Unclustered (1)"));
    }
}
