use crate::dashboard::Dashboard;
use crate::layout::{Canvas, ChainGroup, PositionEntry};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump<'a> {
    pub signature: &'a str,
    pub cache_hit: bool,
    pub canvas: Canvas,
    pub positions: &'a [PositionEntry],
    pub chain: &'a [ChainGroup],
    pub unclustered: Vec<UnclusteredDump<'a>>,
}

#[derive(Debug, Serialize)]
pub struct UnclusteredDump<'a> {
    pub id: &'a str,
    pub platform: &'static str,
    pub nickname: &'a str,
}

impl<'a> LayoutDump<'a> {
    pub fn from_dashboard(dashboard: &'a Dashboard) -> Self {
        let unclustered = dashboard
            .unclustered
            .iter()
            .map(|entity| UnclusteredDump {
                id: &entity.id,
                platform: entity.platform.as_str(),
                nickname: &entity.nickname,
            })
            .collect();

        LayoutDump {
            signature: &dashboard.signature,
            cache_hit: dashboard.cache_hit,
            canvas: dashboard.layout.canvas,
            positions: &dashboard.layout.positions,
            chain: &dashboard.layout.chain,
            unclustered,
        }
    }
}

/// Pretty JSON to `path`, or to stdout when no path is given.
pub fn write_layout_dump(path: Option<&Path>, dashboard: &Dashboard) -> anyhow::Result<()> {
    let dump = LayoutDump::from_dashboard(dashboard);
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::dashboard::build_dashboard_uncached;
    use crate::ir::{Entity, Platform};

    #[test]
    fn dump_lists_positions_as_pairs() {
        let entities = vec![
            Entity::new("a", Platform::Soop).with_groups(["X"]),
            Entity::new("b", Platform::Chzzk).with_nickname("Bee"),
        ];
        let dashboard = build_dashboard_uncached(entities, &LayoutConfig::default());
        let value = serde_json::to_value(LayoutDump::from_dashboard(&dashboard)).unwrap();

        assert_eq!(value["signature"], "a");
        assert_eq!(value["cacheHit"], false);
        assert_eq!(value["positions"][0][0], "a");
        assert_eq!(value["positions"][0][1]["relRow"], 0);
        assert_eq!(value["canvas"]["maxColsUsed"], 1);
        assert_eq!(value["chain"][0]["name"], "X");
        assert_eq!(
            value["unclustered"][0],
            serde_json::json!({"id": "b", "platform": "chzzk", "nickname": "Bee"})
        );
    }

    #[test]
    fn writes_dump_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        let entities = vec![Entity::new("a", Platform::Soop).with_groups(["X"])];
        let dashboard = build_dashboard_uncached(entities, &LayoutConfig::default());
        write_layout_dump(Some(&path), &dashboard).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"finalX\""));
    }
}
