pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;

pub use cache::{FileSlot, KeyValueSlot, LayoutCache, MemorySlot, signature};
pub use config::{Config, LayoutConfig, RenderConfig, load_config};
pub use dashboard::{Dashboard, build_dashboard, build_dashboard_uncached};
pub use ir::{Entity, LiveStats, Platform, parse_entity_document};
pub use layout::{DashboardLayout, compute_layout};
pub use render::render_svg;

/// Parse an entity document and render it to SVG without touching any cache.
pub fn render_with_options(input: &str, config: &Config) -> anyhow::Result<String> {
    let entities = parse_entity_document(input)?;
    let dashboard = build_dashboard_uncached(entities, &config.layout);
    Ok(render_svg(
        &dashboard,
        &config.theme,
        &config.layout,
        &config.render,
    ))
}
