//! Recommendations from the categories a user favorites most.
//!
//! Categories are searched in parallel on the worker pool but merged strictly
//! in rank order, so the output is deterministic regardless of which search
//! finishes first.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::geo::Coordinate;
use crate::models::NormalizedEvent;
use crate::services::events::EventService;
use crate::services::pool::WorkerPool;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
}

/// Tallies category names in first-seen order.
pub fn tally_categories<I, S>(names: I) -> Vec<CategoryCount>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut tally: Vec<CategoryCount> = Vec::new();
    for name in names {
        let name = name.into();
        match index.get(&name) {
            Some(&position) => tally[position].count += 1,
            None => {
                index.insert(name.clone(), tally.len());
                tally.push(CategoryCount { name, count: 1 });
            }
        }
    }
    tally
}

/// Most frequent first; ties keep first-seen order.
pub fn rank_categories(mut tally: Vec<CategoryCount>) -> Vec<String> {
    // sort_by is stable, which is what breaks ties.
    tally.sort_by(|a, b| b.count.cmp(&a.count));
    tally.into_iter().map(|category| category.name).collect()
}

/// Flattens per-category results in rank order.
///
/// Favorited events and events already emitted by a higher-ranked category are
/// dropped; each category's remainder is ordered by distance.
pub fn merge_recommendations(
    groups: Vec<Vec<NormalizedEvent>>,
    favorite_ids: &HashSet<String>,
) -> Vec<NormalizedEvent> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();
    for group in groups {
        let mut fresh: Vec<NormalizedEvent> = group
            .into_iter()
            .filter(|event| !event.favorite && !favorite_ids.contains(&event.id))
            .filter(|event| seen.insert(event.id.clone()))
            .collect();
        fresh.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        merged.extend(fresh);
    }
    merged
}

#[derive(Clone)]
pub struct Recommender {
    events: EventService,
    pool: Arc<WorkerPool>,
}

impl Recommender {
    pub fn new(events: EventService, pool: Arc<WorkerPool>) -> Self {
        Self { events, pool }
    }

    /// Categories the user favorites, most frequent first.
    pub async fn ranked_categories(&self, favorite_ids: &[String]) -> Vec<String> {
        let mut names = Vec::new();
        for id in favorite_ids {
            match self.events.repository().find_categories_by_event_id(id).await {
                Ok(categories) => names.extend(categories),
                Err(e) => warn!(event_id = %id, error = %e, "failed to load favorite categories"),
            }
        }
        rank_categories(tally_categories(names))
    }

    pub async fn recommend(&self, user_id: &str, coordinate: Coordinate) -> Vec<NormalizedEvent> {
        let favorite_ids = self.events.favorite_ids(user_id).await;
        let ranked = self.ranked_categories(&favorite_ids).await;
        debug!(user_id, categories = ?ranked, "recommendation categories ranked");

        let mut handles = Vec::with_capacity(ranked.len());
        for category in &ranked {
            let events = self.events.clone();
            let keyword = category.clone();
            let user_id = user_id.to_string();
            let handle = self
                .pool
                .submit(async move { events.search(coordinate, Some(&keyword), &user_id).await })
                .await;
            handles.push(handle);
        }

        let mut groups = Vec::with_capacity(handles.len());
        for (category, handle) in ranked.iter().zip(handles) {
            match handle.join().await {
                Ok(events) => groups.push(events),
                Err(e) => {
                    warn!(%category, error = %e, "category search failed, skipping");
                    groups.push(Vec::new());
                }
            }
        }

        let favorite_ids: HashSet<String> = favorite_ids.into_iter().collect();
        merge_recommendations(groups, &favorite_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn event(id: &str, distance: f64) -> NormalizedEvent {
        NormalizedEvent {
            id: id.to_string(),
            name: id.to_string(),
            url: String::new(),
            distance,
            image_url: String::new(),
            address: String::new(),
            categories: BTreeSet::new(),
            favorite: false,
        }
    }

    #[test]
    fn ranks_by_frequency() {
        let tally = tally_categories(["Jazz", "Rock", "Rock"]);
        assert_eq!(rank_categories(tally), vec!["Rock", "Jazz"]);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let tally = tally_categories(["Pop", "Jazz", "Rock", "Jazz", "Pop", "Rock", "Folk"]);
        assert_eq!(rank_categories(tally), vec!["Pop", "Jazz", "Rock", "Folk"]);
    }

    #[test]
    fn merge_orders_by_group_then_distance() {
        let rock = vec![event("r1", 5.0), event("shared", 1.0), event("r2", 3.0)];
        let jazz = vec![event("j1", 0.5), event("shared", 0.1)];

        let merged = merge_recommendations(vec![rock, jazz], &HashSet::new());
        let ids: Vec<_> = merged.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["shared", "r2", "r1", "j1"]);
    }

    #[test]
    fn merge_drops_favorites() {
        let mut flagged = event("flagged", 1.0);
        flagged.favorite = true;
        let group = vec![flagged, event("known", 2.0), event("new", 3.0)];
        let favorites: HashSet<String> = ["known".to_string()].into();

        let merged = merge_recommendations(vec![group], &favorites);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "new");
    }

    proptest! {
        #[test]
        fn merged_output_has_no_duplicates_or_favorites_and_sorted_groups(
            groups in proptest::collection::vec(
                proptest::collection::vec((0u8..20, 0.0f64..100.0), 0..10),
                0..5,
            ),
            favorites in proptest::collection::hash_set(0u8..20, 0..5),
        ) {
            let favorite_ids: HashSet<String> = favorites.iter().map(|id| id.to_string()).collect();
            let groups: Vec<Vec<NormalizedEvent>> = groups
                .iter()
                .map(|group| group.iter().map(|(id, d)| event(&id.to_string(), *d)).collect())
                .collect();

            let merged = merge_recommendations(groups.clone(), &favorite_ids);

            let mut ids = HashSet::new();
            for e in &merged {
                prop_assert!(!favorite_ids.contains(&e.id));
                prop_assert!(ids.insert(e.id.clone()));
            }

            // Each event is attributed to the first group that contained it.
            let mut owner: HashMap<String, usize> = HashMap::new();
            for (index, group) in groups.iter().enumerate() {
                for e in group {
                    owner.entry(e.id.clone()).or_insert(index);
                }
            }
            let owners: Vec<usize> = merged.iter().map(|e| owner[&e.id]).collect();
            prop_assert!(owners.windows(2).all(|w| w[0] <= w[1]));
            for pair in merged.windows(2) {
                if owner[&pair[0].id] == owner[&pair[1].id] {
                    prop_assert!(pair[0].distance <= pair[1].distance);
                }
            }
        }
    }
}
