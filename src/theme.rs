use serde::{Deserialize, Serialize};

/// d3's `schemeCategory10`, the dashboard's categorical group palette.
pub const CATEGORY10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub background: String,
    pub text_color: String,
    pub muted_text_color: String,
    pub card_fill: String,
    pub card_border: String,
    pub soop_accent: String,
    pub chzzk_card_fill: String,
    pub chzzk_card_border: String,
    pub chzzk_accent: String,
    pub live_border: String,
    pub live_badge_fill: String,
    pub off_badge_fill: String,
    pub badge_text_color: String,
    pub avatar_fill: String,
    pub hull_fill_opacity: f32,
    pub hull_stroke_width: f32,
    pub group_colors: Vec<String>,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            font_family: "Pretendard, \"Noto Sans KR\", Inter, system-ui, sans-serif".to_string(),
            font_size: 13.0,
            background: "#F4F6FA".to_string(),
            text_color: "#1C2430".to_string(),
            muted_text_color: "#6B778C".to_string(),
            card_fill: "#FFFFFF".to_string(),
            card_border: "#D7E0F0".to_string(),
            soop_accent: "#0545B1".to_string(),
            chzzk_card_fill: "#F3FFF8".to_string(),
            chzzk_card_border: "#B8F0D2".to_string(),
            chzzk_accent: "#00B870".to_string(),
            live_border: "#FF3B3B".to_string(),
            live_badge_fill: "#FF3B3B".to_string(),
            off_badge_fill: "#9AA5B8".to_string(),
            badge_text_color: "#FFFFFF".to_string(),
            avatar_fill: "#E4E9F2".to_string(),
            hull_fill_opacity: 0.12,
            hull_stroke_width: 20.0,
            group_colors: CATEGORY10.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn dark() -> Self {
        Self {
            background: "#12151C".to_string(),
            text_color: "#E8ECF4".to_string(),
            muted_text_color: "#8C96A8".to_string(),
            card_fill: "#1D222C".to_string(),
            card_border: "#2C3442".to_string(),
            soop_accent: "#5B8CFF".to_string(),
            chzzk_card_fill: "#16231D".to_string(),
            chzzk_card_border: "#1F4A35".to_string(),
            chzzk_accent: "#00FFA3".to_string(),
            off_badge_fill: "#4A5366".to_string(),
            avatar_fill: "#2C3442".to_string(),
            hull_fill_opacity: 0.18,
            ..Self::light()
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim() {
            "light" | "default" => Some(Self::light()),
            "dark" => Some(Self::dark()),
            _ => None,
        }
    }

    /// Colour for the group at `index` in chain order, cycling through the palette.
    pub fn group_color(&self, index: usize) -> &str {
        if self.group_colors.is_empty() {
            return CATEGORY10[index % CATEGORY10.len()];
        }
        &self.group_colors[index % self.group_colors.len()]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_colors_cycle() {
        let theme = Theme::light();
        assert_eq!(theme.group_color(0), "#1f77b4");
        assert_eq!(theme.group_color(10), "#1f77b4");
        assert_eq!(theme.group_color(13), "#d62728");
    }

    #[test]
    fn empty_palette_falls_back() {
        let theme = Theme {
            group_colors: Vec::new(),
            ..Theme::dark()
        };
        assert_eq!(theme.group_color(1), "#ff7f0e");
    }
}
