use super::*;

/// Group indices ranked by connectivity desc, size desc, name asc.
/// The first entry is the anchor.
pub fn rank_groups(groups: &[Group]) -> Vec<usize> {
    let mut ranked: Vec<usize> = (0..groups.len()).collect();
    ranked.sort_by(|&a, &b| {
        let (ga, gb) = (&groups[a], &groups[b]);
        gb.connectivity
            .cmp(&ga.connectivity)
            .then_with(|| gb.size().cmp(&ga.size()))
            .then_with(|| ga.name.cmp(&gb.name))
    });
    ranked
}

/// Position in `remaining` of the group sharing the most members with
/// `base`. Ties go to the earliest candidate; zero overlap gives `None`.
pub fn best_neighbor(base: &Group, remaining: &[usize], groups: &[Group]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (pos, &candidate) in remaining.iter().enumerate() {
        let overlap = shared_members(&base.members, &groups[candidate].members);
        if overlap == 0 {
            continue;
        }
        if best.is_none_or(|(_, top)| overlap > top) {
            best = Some((pos, overlap));
        }
    }
    best.map(|(pos, _)| pos)
}

/// Order groups into a chain grown from the anchor in both directions.
///
/// Each round extends the top end and then the bottom end with its best
/// overlapping neighbour. A round that extends neither end appends the
/// first remaining group to the bottom, so every round consumes at least
/// one group and disconnected components still get a slot.
pub fn build_chain(groups: &[Group]) -> Chain {
    let mut remaining = rank_groups(groups);
    if remaining.is_empty() {
        return Chain::default();
    }
    let anchor = remaining.remove(0);

    let mut order: VecDeque<usize> = VecDeque::with_capacity(groups.len());
    order.push_back(anchor);
    let mut anchor_pos = 0;
    let (mut top, mut bottom) = (anchor, anchor);

    while !remaining.is_empty() {
        let up = best_neighbor(&groups[top], &remaining, groups).map(|pos| remaining.remove(pos));
        if let Some(group) = up {
            order.push_front(group);
            anchor_pos += 1;
            top = group;
        }

        let down = if remaining.is_empty() {
            None
        } else {
            best_neighbor(&groups[bottom], &remaining, groups).map(|pos| remaining.remove(pos))
        };
        if let Some(group) = down {
            order.push_back(group);
            bottom = group;
        }

        if up.is_none() && down.is_none() && !remaining.is_empty() {
            let orphan = remaining.remove(0);
            trace!(
                group = %groups[orphan].name,
                "no overlapping neighbour, appending orphan group"
            );
            order.push_back(orphan);
            bottom = orphan;
        }
    }

    Chain {
        order: order.into_iter().collect(),
        anchor: anchor_pos,
    }
}
