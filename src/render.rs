use crate::config::{LayoutConfig, RenderConfig};
use crate::dashboard::Dashboard;
use crate::ir::{Entity, Platform};
use crate::layout::{ChainGroup, Placement};
use crate::theme::Theme;
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

const LABEL_GAP_ABOVE: f32 = 20.0;
const LABEL_GAP_BELOW: f32 = 40.0;
const LABEL_CLEARANCE_X: f32 = 150.0;
const LABEL_CLEARANCE_Y: f32 = 50.0;
const FOOTER_TITLE_HEIGHT: f32 = 48.0;
const CARD_GROUP_LINES: usize = 5;

pub fn render_svg(
    dashboard: &Dashboard,
    theme: &Theme,
    layout_config: &LayoutConfig,
    render_config: &RenderConfig,
) -> String {
    let canvas = dashboard.layout.canvas;
    let margin = layout_config.horizontal_margin;
    let footer = FooterGrid::new(dashboard, layout_config, render_config);
    let inner_width = canvas.width.max(footer.width);
    let width = (inner_width + margin).max(200.0);
    let height = footer.bottom().max(canvas.height).max(200.0);

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{width:.0}\" height=\"{height:.0}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        render_config.background
    ));
    svg.push_str(&format!("<g transform=\"translate({:.2},0)\">", margin / 2.0));

    let colors = group_colors(&dashboard.layout.chain, theme);
    let positions = dashboard.layout.position_map();
    svg.push_str(&hulls_svg(
        &dashboard.layout.chain,
        &positions,
        &colors,
        theme,
        layout_config,
    ));

    let entities = dashboard.entities_by_id();
    let mut card_index = 0usize;
    for (id, placement) in &dashboard.layout.positions {
        // Cached positions can outlive an entity only if the signature lied.
        let Some(entity) = entities.get(id.as_str()) else {
            continue;
        };
        svg.push_str(&card_svg(
            entity,
            placement.x,
            placement.y,
            card_index,
            &colors,
            theme,
            layout_config,
        ));
        card_index += 1;
    }

    if footer.count > 0 {
        let offset = (inner_width - footer.width) / 2.0;
        svg.push_str(&text_svg(
            offset + layout_config.cell_padding(),
            footer.top + FOOTER_TITLE_HEIGHT / 2.0,
            "start",
            16.0,
            "700",
            &theme.muted_text_color,
            &format!("Unclustered ({})", footer.count),
            theme,
        ));
        for (idx, entity) in dashboard.unclustered.iter().enumerate() {
            let (x, y) = footer.card_origin(idx, layout_config);
            svg.push_str(&card_svg(
                entity,
                offset + x,
                y,
                card_index,
                &colors,
                theme,
                layout_config,
            ));
            card_index += 1;
        }
    }

    svg.push_str("</g></svg>");
    svg
}

/// Chain order decides colours, so they stay stable across cache hits.
fn group_colors<'a>(chain: &'a [ChainGroup], theme: &'a Theme) -> HashMap<&'a str, &'a str> {
    chain
        .iter()
        .enumerate()
        .map(|(idx, group)| (group.name.as_str(), theme.group_color(idx)))
        .collect()
}

struct FooterGrid {
    count: usize,
    cols: usize,
    top: f32,
    width: f32,
    height: f32,
}

impl FooterGrid {
    fn new(dashboard: &Dashboard, layout: &LayoutConfig, render: &RenderConfig) -> Self {
        let count = if render.show_footer {
            dashboard.unclustered.len()
        } else {
            0
        };
        let top = if dashboard.layout.is_empty() {
            0.0
        } else {
            dashboard.layout.canvas.height + render.footer_gap
        };
        if count == 0 {
            return Self {
                count,
                cols: 0,
                top,
                width: 0.0,
                height: 0.0,
            };
        }
        let cols = layout.cols().min(count);
        let rows = count.div_ceil(cols);
        Self {
            count,
            cols,
            top,
            width: cols as f32 * layout.cell_width,
            height: FOOTER_TITLE_HEIGHT + rows as f32 * layout.cell_height,
        }
    }

    fn bottom(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        self.top + self.height
    }

    fn card_origin(&self, idx: usize, layout: &LayoutConfig) -> (f32, f32) {
        let col = idx % self.cols.max(1);
        let row = idx / self.cols.max(1);
        (
            col as f32 * layout.cell_width + layout.cell_padding(),
            self.top + FOOTER_TITLE_HEIGHT + row as f32 * layout.cell_height,
        )
    }
}

fn hulls_svg(
    chain: &[ChainGroup],
    positions: &HashMap<&str, &Placement>,
    colors: &HashMap<&str, &str>,
    theme: &Theme,
    config: &LayoutConfig,
) -> String {
    let mut draw_order: Vec<&ChainGroup> = chain.iter().collect();
    draw_order.sort_by(|a, b| b.size().cmp(&a.size()));

    let mut paths = String::new();
    let mut labels = String::new();
    let mut occupied: Vec<(f32, f32)> = Vec::new();
    let pad = config.hull_padding;

    for group in draw_order {
        let mut points: Vec<(f32, f32)> = Vec::new();
        for id in group.member_ids() {
            let Some(pos) = positions.get(id) else {
                continue;
            };
            let (x0, y0) = (pos.x - pad, pos.y - pad);
            let (x1, y1) = (pos.x + config.card_width + pad, pos.y + config.card_height + pad);
            points.extend([(x0, y0), (x1, y0), (x1, y1), (x0, y1)]);
        }
        let hull = convex_hull(&points);
        if hull.len() < 3 {
            continue;
        }
        let color = colors.get(group.name.as_str()).copied().unwrap_or("#999999");
        paths.push_str(&format!(
            "<path class=\"group-hull\" d=\"{} Z\" fill=\"{color}\" fill-opacity=\"{:.2}\" stroke=\"{color}\" stroke-opacity=\"{:.2}\" stroke-width=\"{:.1}\" stroke-linejoin=\"round\"/>",
            points_to_path(&hull),
            theme.hull_fill_opacity,
            (theme.hull_fill_opacity * 2.0).min(1.0),
            theme.hull_stroke_width,
        ));

        let (x, y) = label_anchor(&hull, &occupied);
        occupied.push((x, y));
        labels.push_str(&format!(
            "<text class=\"group-label\" x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"18\" font-weight=\"700\" fill=\"{color}\" stroke=\"{}\" stroke-width=\"4\" paint-order=\"stroke\">{}</text>",
            escape_xml(&theme.font_family),
            theme.background,
            escape_xml(&group.name)
        ));
    }

    paths.push_str(&labels);
    paths
}

/// Label centred over the hull; moved below it when an earlier label is too close.
fn label_anchor(hull: &[(f32, f32)], occupied: &[(f32, f32)]) -> (f32, f32) {
    let top = hull.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
    let bottom = hull.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
    let center_x = hull.iter().map(|p| p.0).sum::<f32>() / hull.len() as f32;
    let above = top - LABEL_GAP_ABOVE;
    if collides(center_x, above, occupied) {
        (center_x, bottom + LABEL_GAP_BELOW)
    } else {
        (center_x, above)
    }
}

fn collides(x: f32, y: f32, occupied: &[(f32, f32)]) -> bool {
    occupied
        .iter()
        .any(|(ox, oy)| (ox - x).abs() < LABEL_CLEARANCE_X && (oy - y).abs() < LABEL_CLEARANCE_Y)
}

/// Convex hull by monotone chain.
pub fn convex_hull(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    fn cross(o: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    }

    let mut lower: Vec<(f32, f32)> = Vec::new();
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<(f32, f32)> = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    if points.is_empty() {
        return String::new();
    }
    let mut d = String::new();
    d.push_str(&format!("M {:.2} {:.2}", points[0].0, points[0].1));
    for point in points.iter().skip(1) {
        d.push_str(&format!(" L {:.2} {:.2}", point.0, point.1));
    }
    d
}

fn card_svg(
    entity: &Entity,
    x: f32,
    y: f32,
    index: usize,
    colors: &HashMap<&str, &str>,
    theme: &Theme,
    config: &LayoutConfig,
) -> String {
    let (w, h) = (config.card_width, config.card_height);
    let stats = entity.stats.unwrap_or_default();
    let (fill, border, accent) = match entity.platform {
        Platform::Soop => (&theme.card_fill, &theme.card_border, &theme.soop_accent),
        Platform::Chzzk => (
            &theme.chzzk_card_fill,
            &theme.chzzk_card_border,
            &theme.chzzk_accent,
        ),
    };
    let (stroke, stroke_width) = if stats.is_live {
        (theme.live_border.as_str(), 3.0)
    } else {
        (border.as_str(), 1.2)
    };

    let mut card = String::new();
    card.push_str(&format!(
        "<a href=\"{}\" target=\"_blank\"><g class=\"card\" data-id=\"{}\">",
        escape_xml(&entity.platform.channel_url(&entity.id)),
        escape_xml(&entity.id)
    ));
    card.push_str(&format!(
        "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" rx=\"14\" ry=\"14\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width:.1}\"/>",
    ));

    // Left column: platform, avatar, badge, names.
    let left_cx = x + 55.0;
    let platform_label = match entity.platform {
        Platform::Soop => "SOOP",
        Platform::Chzzk => "CHZZK",
    };
    card.push_str(&text_svg(
        x + 14.0,
        y + 24.0,
        "start",
        11.0,
        "800",
        accent,
        platform_label,
        theme,
    ));

    let (avatar_cy, avatar_r) = (y + 74.0, 34.0);
    card.push_str(&format!(
        "<circle cx=\"{left_cx:.2}\" cy=\"{avatar_cy:.2}\" r=\"{avatar_r:.2}\" fill=\"{}\"/>",
        theme.avatar_fill
    ));
    if let Some(image) = entity.profile_image.as_deref() {
        card.push_str(&format!(
            "<clipPath id=\"avatar-{index}\"><circle cx=\"{left_cx:.2}\" cy=\"{avatar_cy:.2}\" r=\"{avatar_r:.2}\"/></clipPath>",
        ));
        card.push_str(&format!(
            "<image href=\"{}\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" preserveAspectRatio=\"xMidYMid slice\" clip-path=\"url(#avatar-{index})\"/>",
            escape_xml(image),
            left_cx - avatar_r,
            avatar_cy - avatar_r,
            avatar_r * 2.0,
            avatar_r * 2.0
        ));
    }

    let (badge_fill, badge_text) = if stats.is_live {
        (&theme.live_badge_fill, "LIVE")
    } else {
        (&theme.off_badge_fill, "OFF")
    };
    card.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"60\" height=\"20\" rx=\"10\" ry=\"10\" fill=\"{badge_fill}\"/>",
        left_cx - 30.0,
        y + 116.0
    ));
    card.push_str(&text_svg(
        left_cx,
        y + 130.0,
        "middle",
        11.0,
        "700",
        &theme.badge_text_color,
        badge_text,
        theme,
    ));
    card.push_str(&text_svg(
        left_cx,
        y + 160.0,
        "middle",
        14.0,
        "700",
        &theme.text_color,
        &truncate_chars(&entity.nickname, 10),
        theme,
    ));
    if entity.platform == Platform::Soop {
        card.push_str(&text_svg(
            left_cx,
            y + 178.0,
            "middle",
            11.0,
            "400",
            &theme.muted_text_color,
            &format!("@{}", truncate_chars(&entity.id, 14)),
            theme,
        ));
    }

    // Right column: group list, then stats anchored to the bottom.
    let right_x = x + 120.0;
    let mut line_y = y + 30.0;
    for group in entity.groups.iter().take(CARD_GROUP_LINES) {
        let color = colors
            .get(group.as_str())
            .copied()
            .unwrap_or(theme.muted_text_color.as_str());
        card.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"4\" fill=\"{color}\"/>",
            right_x + 4.0,
            line_y - 4.0
        ));
        card.push_str(&text_svg(
            right_x + 14.0,
            line_y,
            "start",
            12.0,
            "500",
            &theme.text_color,
            &truncate_chars(group, 11),
            theme,
        ));
        line_y += 18.0;
    }
    if entity.groups.len() > CARD_GROUP_LINES {
        card.push_str(&text_svg(
            right_x + 14.0,
            line_y,
            "start",
            11.0,
            "400",
            &theme.muted_text_color,
            &format!("+{} more", entity.groups.len() - CARD_GROUP_LINES),
            theme,
        ));
    }

    let mut stat_rows: Vec<(&str, u64)> = vec![("Fans", stats.fans)];
    if stats.subscribers > 0 {
        stat_rows.push(("Subs", stats.subscribers));
    }
    if stats.is_live {
        stat_rows.push(("Viewers", stats.viewers));
    }
    let mut stat_y = y + h - 18.0;
    for (label, value) in stat_rows {
        card.push_str(&text_svg(
            right_x,
            stat_y,
            "start",
            11.0,
            "400",
            &theme.muted_text_color,
            label,
            theme,
        ));
        card.push_str(&text_svg(
            x + w - 14.0,
            stat_y,
            "end",
            13.0,
            "700",
            &theme.text_color,
            &format_count(value),
            theme,
        ));
        stat_y -= 20.0;
    }

    card.push_str("</g></a>");
    card
}

#[allow(clippy::too_many_arguments)]
fn text_svg(
    x: f32,
    y: f32,
    anchor: &str,
    size: f32,
    weight: &str,
    fill: &str,
    content: &str,
    theme: &Theme,
) -> String {
    format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"{anchor}\" font-family=\"{}\" font-size=\"{size}\" font-weight=\"{weight}\" fill=\"{fill}\">{}</text>",
        escape_xml(&theme.font_family),
        escape_xml(content)
    )
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// `12345` -> `12,345`.
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "invalid PNG size {}x{}",
                render_cfg.width,
                render_cfg.height
            )
        })?;
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
