use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, warn};

/// Names of the single-tag fields carried next to the comma separated `group_name`.
pub const SECONDARY_GROUP_FIELDS: [&str; 3] = ["group_1", "group_2", "group_3"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Soop,
    Chzzk,
}

impl Platform {
    /// Missing, empty, `soop` and the legacy `afreeca` token all map to Soop.
    pub fn from_token(token: Option<&str>) -> Self {
        match token.map(str::trim) {
            None | Some("") | Some("soop") | Some("afreeca") => Self::Soop,
            Some(_) => Self::Chzzk,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Soop => "soop",
            Self::Chzzk => "chzzk",
        }
    }

    pub fn channel_url(&self, id: &str) -> String {
        match self {
            Self::Soop => format!("https://www.sooplive.co.kr/{id}"),
            Self::Chzzk => format!("https://chzzk.naver.com/live/{id}"),
        }
    }
}

/// Live metadata reported by the fetch layer. Layout never reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStats {
    pub is_live: bool,
    pub viewers: u64,
    pub fans: u64,
    pub subscribers: u64,
}

/// One entry of the fetch layer's results list, aligned by entity ID.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatusRecord {
    pub id: String,
    #[serde(default)]
    pub is_live: Option<bool>,
    #[serde(default)]
    pub viewers: Option<u64>,
    #[serde(default)]
    pub fans: Option<u64>,
    #[serde(default)]
    pub subscribers: Option<u64>,
}

impl LiveStatusRecord {
    pub fn stats(&self) -> LiveStats {
        let is_live = self.is_live.unwrap_or(false);
        LiveStats {
            is_live,
            viewers: if is_live { self.viewers.unwrap_or(0) } else { 0 },
            fans: self.fans.unwrap_or(0),
            subscribers: self.subscribers.unwrap_or(0),
        }
    }
}

/// A streamer channel as seen by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub id: String,
    pub platform: Platform,
    pub nickname: String,
    pub profile_image: Option<String>,
    /// Trimmed, non-empty and unique; first-seen order is kept for display.
    pub groups: Vec<String>,
    pub stats: Option<LiveStats>,
}

impl Entity {
    pub fn new(id: impl Into<String>, platform: Platform) -> Self {
        let id = id.into();
        Self {
            nickname: id.clone(),
            id,
            platform,
            profile_image: None,
            groups: Vec::new(),
            stats: None,
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags = GroupTags::default();
        for group in groups {
            tags.push(group.as_ref());
        }
        self.groups = tags.into_vec();
        self
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = nickname.into();
        self
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn is_grouped(&self) -> bool {
        !self.groups.is_empty()
    }
}

/// Order-preserving set of normalised group names.
#[derive(Debug, Default)]
struct GroupTags {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl GroupTags {
    fn push(&mut self, raw: &str) {
        let name = raw.trim();
        if name.is_empty() || self.seen.contains(name) {
            return;
        }
        self.seen.insert(name.to_string());
        self.ordered.push(name.to_string());
    }

    fn push_list(&mut self, raw: &str) {
        for part in raw.split(',') {
            self.push(part);
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

/// Resolve the group set from a comma separated primary field plus singleton fields.
pub fn normalize_group_tags<'a, I>(primary: Option<&str>, secondary: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut tags = GroupTags::default();
    if let Some(primary) = primary {
        tags.push_list(primary);
    }
    for tag in secondary {
        tags.push(tag);
    }
    tags.into_vec()
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("entity document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("entity document must be an array of records or an object with an `entities` array")]
    Shape,
}

/// A raw channel row as the list endpoint returns it. Every field is kept as a
/// loose JSON value so one malformed field never rejects the whole row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub platform: Option<Value>,
    #[serde(default)]
    pub nickname: Option<Value>,
    #[serde(default)]
    pub profile_img: Option<Value>,
    #[serde(default)]
    pub group_name: Option<Value>,
    #[serde(default)]
    pub group_1: Option<Value>,
    #[serde(default)]
    pub group_2: Option<Value>,
    #[serde(default)]
    pub group_3: Option<Value>,
}

impl EntityRecord {
    /// Returns `None` when the row has no usable `id`.
    pub fn into_entity(self) -> Option<Entity> {
        let Some(id) = string_field(self.id.as_ref(), "id", "?") else {
            warn!("skipping entity record without a string id");
            return None;
        };
        let id = id.trim().to_string();
        if id.is_empty() {
            warn!("skipping entity record with an empty id");
            return None;
        }

        let platform = Platform::from_token(string_field(self.platform.as_ref(), "platform", &id));
        let nickname = string_field(self.nickname.as_ref(), "nickname", &id)
            .map(str::trim)
            .filter(|nick| !nick.is_empty())
            .unwrap_or(id.as_str())
            .to_string();
        let profile_image = string_field(self.profile_img.as_ref(), "profile_img", &id)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        let primary = string_field(self.group_name.as_ref(), "group_name", &id);
        let secondary = [&self.group_1, &self.group_2, &self.group_3]
            .into_iter()
            .zip(SECONDARY_GROUP_FIELDS)
            .filter_map(|(value, field)| string_field(value.as_ref(), field, &id));
        let groups = normalize_group_tags(primary, secondary);

        Some(Entity {
            id,
            platform,
            nickname,
            profile_image,
            groups,
            stats: None,
        })
    }
}

fn string_field<'a>(value: Option<&'a Value>, field: &str, id: &str) -> Option<&'a str> {
    match value? {
        Value::String(text) => Some(text.as_str()),
        Value::Null => None,
        other => {
            debug!(entity = id, field, value = %other, "ignoring non-string field");
            None
        }
    }
}

/// Decode records into entities, dropping rows without an id and later duplicates.
pub fn entities_from_records(records: Vec<EntityRecord>) -> Vec<Entity> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut entities = Vec::with_capacity(records.len());
    for record in records {
        let Some(entity) = record.into_entity() else {
            continue;
        };
        if !seen.insert(entity.id.clone()) {
            debug!(entity = %entity.id, "dropping duplicate entity record");
            continue;
        }
        entities.push(entity);
    }
    entities
}

/// Parse an entity document: either a bare array of channel rows, or
/// `{"entities": [...], "stats": [...]}` with the live results merged in.
pub fn parse_entity_document(input: &str) -> Result<Vec<Entity>, InputError> {
    let document: Value = serde_json::from_str(input)?;
    let (rows, stats) = match document {
        Value::Array(rows) => (rows, Vec::new()),
        Value::Object(mut map) => {
            let Some(Value::Array(rows)) = map.remove("entities") else {
                return Err(InputError::Shape);
            };
            let stats = match map.remove("stats") {
                Some(Value::Array(stats)) => stats,
                _ => Vec::new(),
            };
            (rows, stats)
        }
        _ => return Err(InputError::Shape),
    };

    let records = rows
        .into_iter()
        .enumerate()
        .filter_map(|(idx, row)| match serde_json::from_value::<EntityRecord>(row) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(index = idx, error = %err, "skipping undecodable entity record");
                None
            }
        })
        .collect();
    let mut entities = entities_from_records(records);

    let results: Vec<LiveStatusRecord> = stats
        .into_iter()
        .filter_map(|row| match serde_json::from_value::<LiveStatusRecord>(row) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(error = %err, "skipping undecodable live status record");
                None
            }
        })
        .collect();
    if !results.is_empty() {
        merge_live_stats(&mut entities, &results);
    }
    Ok(entities)
}

/// Attach live results to entities by trimmed ID. Later results for the same ID win.
pub fn merge_live_stats(entities: &mut [Entity], results: &[LiveStatusRecord]) -> usize {
    let by_id: HashMap<&str, LiveStats> = results
        .iter()
        .map(|record| (record.id.trim(), record.stats()))
        .collect();
    let mut merged = 0;
    for entity in entities.iter_mut() {
        if let Some(stats) = by_id.get(entity.id.as_str()) {
            entity.stats = Some(*stats);
            merged += 1;
        }
    }
    debug!(merged, results = results.len(), "merged live status results");
    merged
}

/// Split into the clustered subset and the unclustered remainder, both sorted
/// by id. The first record of a repeated id wins, whichever side it falls on.
pub fn partition_entities(entities: Vec<Entity>) -> (Vec<Entity>, Vec<Entity>) {
    let mut seen: HashSet<String> = HashSet::new();
    let (mut grouped, mut loose): (Vec<Entity>, Vec<Entity>) = entities
        .into_iter()
        .filter(|entity| {
            let first = seen.insert(entity.id.clone());
            if !first {
                debug!(entity = %entity.id, "dropping duplicate entity");
            }
            first
        })
        .partition(Entity::is_grouped);
    grouped.sort_by(|a, b| a.id.cmp(&b.id));
    loose.sort_by(|a, b| a.id.cmp(&b.id));
    (grouped, loose)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_tokens() {
        assert_eq!(Platform::from_token(None), Platform::Soop);
        assert_eq!(Platform::from_token(Some("afreeca")), Platform::Soop);
        assert_eq!(Platform::from_token(Some(" soop ")), Platform::Soop);
        assert_eq!(Platform::from_token(Some("chzzk")), Platform::Chzzk);
        assert_eq!(Platform::from_token(Some("other")), Platform::Chzzk);
    }

    #[test]
    fn group_tags_are_trimmed_and_deduplicated() {
        let groups = normalize_group_tags(Some(" X, Y ,,X"), [" Y", "", "Z "]);
        assert_eq!(groups, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn non_string_tag_field_is_skipped_alone() {
        let doc = r#"[{"id": "a", "group_name": 42, "group_1": "X", "group_2": ["Y"]}]"#;
        let entities = parse_entity_document(doc).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].groups, vec!["X"]);
    }

    #[test]
    fn records_without_id_are_dropped() {
        let doc =
            r#"[{"group_name": "X"}, {"id": 7, "group_name": "X"}, {"id": "  "}, {"id": "ok"}]"#;
        let entities = parse_entity_document(doc).unwrap();
        let ids: Vec<&str> = entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["ok"]);
        assert!(!entities[0].is_grouped());
        assert_eq!(entities[0].nickname, "ok");
    }

    #[test]
    fn first_duplicate_wins() {
        let doc = r#"[{"id": "a", "nickname": "first"}, {"id": "a", "nickname": "second"}]"#;
        let entities = parse_entity_document(doc).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].nickname, "first");
    }

    #[test]
    fn object_document_merges_stats() {
        let doc = r#"{
            "entities": [{"id": "a", "platform": "chzzk"}, {"id": "b"}],
            "stats": [
                {"id": " a ", "isLive": true, "viewers": 12, "fans": 3400},
                {"id": "b", "isLive": false, "viewers": 99, "fans": null},
                {"bogus": true}
            ]
        }"#;
        let entities = parse_entity_document(doc).unwrap();
        let a = entities.iter().find(|e| e.id == "a").unwrap();
        assert_eq!(a.platform, Platform::Chzzk);
        assert_eq!(
            a.stats,
            Some(LiveStats {
                is_live: true,
                viewers: 12,
                fans: 3400,
                subscribers: 0
            })
        );
        let b = entities.iter().find(|e| e.id == "b").unwrap();
        assert_eq!(b.stats, Some(LiveStats::default()));
    }

    #[test]
    fn rejects_scalar_documents() {
        assert!(matches!(parse_entity_document("42"), Err(InputError::Shape)));
        assert!(matches!(parse_entity_document("{\"rows\": []}"), Err(InputError::Shape)));
        assert!(matches!(parse_entity_document("[1,"), Err(InputError::Json(_))));
    }

    #[test]
    fn partition_sorts_by_id() {
        let entities = vec![
            Entity::new("c", Platform::Soop).with_groups(["X"]),
            Entity::new("b", Platform::Soop),
            Entity::new("a", Platform::Chzzk).with_groups(["Y"]),
        ];
        let (grouped, loose) = partition_entities(entities);
        let ids: Vec<&str> = grouped.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(loose.len(), 1);
        assert_eq!(loose[0].id, "b");
    }

    #[test]
    fn partition_keeps_first_record_of_an_id() {
        let entities = vec![
            Entity::new("a", Platform::Soop).with_nickname("first"),
            Entity::new("a", Platform::Soop).with_groups(["X"]),
            Entity::new("b", Platform::Soop).with_groups(["X"]),
            Entity::new("b", Platform::Chzzk),
        ];
        let (grouped, loose) = partition_entities(entities);
        let grouped_ids: Vec<&str> = grouped.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(grouped_ids, vec!["b"]);
        assert_eq!(grouped[0].platform, Platform::Soop);
        assert_eq!(loose.len(), 1);
        assert_eq!(loose[0].nickname, "first");
    }
}
