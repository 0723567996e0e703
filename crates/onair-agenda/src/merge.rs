use std::collections::HashSet;

use crate::item::{ItemKey, Schedulable, ScheduledItem};

/// Concatenate the batches and keep the first occurrence of every item.
///
/// The backend is queried several times with overlapping filters (plain,
/// recurring, open validity window), so the same row usually arrives more
/// than once. Order of first appearance is preserved.
pub fn merge_unique<I>(batches: I) -> Vec<ScheduledItem>
where
    I: IntoIterator<Item = Vec<ScheduledItem>>,
{
    let mut seen: HashSet<ItemKey> = HashSet::new();
    batches
        .into_iter()
        .flatten()
        .filter(|item| seen.insert(item.key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::fixtures::*;

    #[test]
    fn keeps_first_occurrence_in_order() {
        let d = day(2026, 10, 15);
        let a = vec![testimonial("t1", "09:00"), testimonial("t2", "10:00")];
        let b = vec![testimonial("t2", "11:00"), testimonial("t3", "08:00")];
        let merged = merge_unique([a, b]);
        let ids: Vec<_> = merged.iter().map(|i| i.id().as_str()).collect();
        assert_eq!(ids, ["t1", "t2", "t3"]);
        // The first copy of t2 wins.
        assert_eq!(merged[1].schedule().time, "10:00");
        assert_eq!(merge_unique([vec![content("c1", "09:00", d)]]).len(), 1);
    }

    #[test]
    fn repeated_batches_collapse() {
        let a = vec![testimonial("t1", "09:00"), testimonial("t2", "10:00")];
        assert_eq!(merge_unique([a.clone(), a.clone(), a.clone()]), merge_unique([a]));
    }

    #[test]
    fn same_id_in_different_tables_is_kept() {
        let d = day(2026, 10, 15);
        let merged = merge_unique([vec![testimonial("7", "09:00")], vec![content("7", "09:00", d)]]);
        assert_eq!(merged.len(), 2);
    }
}
