use super::*;

/// Build groups from the clustered entities.
///
/// `entities` must be unique by id and sorted by id; member lists then come
/// out ascending by index, which `shared_members` relies on. Groups are
/// returned in name order.
pub fn index_groups(entities: &[&Entity]) -> Vec<Group> {
    let mut by_name: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, entity) in entities.iter().enumerate() {
        for name in &entity.groups {
            by_name.entry(name.as_str()).or_default().push(idx);
        }
    }

    by_name
        .into_iter()
        .map(|(name, members)| {
            let connectivity = members
                .iter()
                .map(|&idx| entities[idx].group_count().saturating_sub(1))
                .sum();
            Group {
                name: name.to_string(),
                members,
                connectivity,
            }
        })
        .collect()
}

/// Number of entities two ascending member lists have in common.
pub fn shared_members(a: &[usize], b: &[usize]) -> usize {
    let (mut i, mut j, mut shared) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                shared += 1;
                i += 1;
                j += 1;
            }
        }
    }
    shared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Platform;

    fn entity(id: &str, groups: &[&str]) -> Entity {
        Entity::new(id, Platform::Soop).with_groups(groups.iter().copied())
    }

    #[test]
    fn scores_count_extra_memberships() {
        let entities = [
            entity("a", &["X"]),
            entity("b", &["X", "Y"]),
            entity("c", &["Y"]),
        ];
        let refs: Vec<&Entity> = entities.iter().collect();
        let groups = index_groups(&refs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "X");
        assert_eq!(groups[0].members, vec![0, 1]);
        assert_eq!(groups[0].connectivity, 1);
        assert_eq!(groups[1].name, "Y");
        assert_eq!(groups[1].members, vec![1, 2]);
        assert_eq!(groups[1].connectivity, 1);
    }

    #[test]
    fn heavily_shared_members_raise_the_score() {
        let entities = [
            entity("a", &["X", "Y", "Z"]),
            entity("b", &["X", "Y"]),
            entity("c", &["X"]),
        ];
        let refs: Vec<&Entity> = entities.iter().collect();
        let groups = index_groups(&refs);
        let x = groups.iter().find(|g| g.name == "X").unwrap();
        assert_eq!(x.size(), 3);
        assert_eq!(x.connectivity, 2 + 1);
        let z = groups.iter().find(|g| g.name == "Z").unwrap();
        assert_eq!(z.connectivity, 2);
    }

    #[test]
    fn ungrouped_entities_form_no_group() {
        let entities = [entity("a", &[]), entity("b", &["X"])];
        let refs: Vec<&Entity> = entities.iter().collect();
        let groups = index_groups(&refs);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec![1]);
    }

    #[test]
    fn counts_shared_members() {
        assert_eq!(shared_members(&[0, 2, 4, 6], &[1, 2, 3, 6]), 2);
        assert_eq!(shared_members(&[], &[1]), 0);
        assert_eq!(shared_members(&[5], &[1, 2]), 0);
    }
}
