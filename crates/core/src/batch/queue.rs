//! Batch queue construction
//!
//! Expands operator-requested (resolution, count) specs into the ordered
//! item queue a run iterates over.

use datacam_domain::{BatchQueue, CaptureJobItem, CaptureJobSpec};
use rand::seq::SliceRandom;

use super::error::{SchedulerError, SchedulerResult};

/// Build the item queue for a batch run.
///
/// Specs with `count == 0` are dropped. Each remaining spec expands into
/// `count` items whose `sequence_index` runs 1..=count with
/// `group_total = count`. Without `randomize`, resolution groups appear in
/// spec order and items within a group in ascending `sequence_index`; with
/// `randomize`, a uniform permutation is applied over the fully expanded
/// list so items from different resolutions interleave.
///
/// # Errors
/// Returns [`SchedulerError::EmptyQueue`] when no spec contributes items.
pub fn build_queue(specs: &[CaptureJobSpec], randomize: bool) -> SchedulerResult<BatchQueue> {
    let mut items: Vec<CaptureJobItem> = specs
        .iter()
        .filter(|spec| spec.count > 0)
        .flat_map(|spec| {
            (1..=spec.count).map(move |sequence_index| CaptureJobItem {
                width: spec.width,
                height: spec.height,
                sequence_index,
                group_total: spec.count,
            })
        })
        .collect();

    if items.is_empty() {
        return Err(SchedulerError::EmptyQueue);
    }

    if randomize {
        items.shuffle(&mut rand::thread_rng());
    }

    Ok(BatchQueue::new(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(width: u32, height: u32, count: u32) -> CaptureJobSpec {
        CaptureJobSpec { width, height, count }
    }

    #[test]
    fn sequential_expansion_preserves_spec_order() {
        let queue = build_queue(&[spec(640, 480, 2), spec(1280, 720, 1)], false).unwrap();

        let expected = [
            CaptureJobItem { width: 640, height: 480, sequence_index: 1, group_total: 2 },
            CaptureJobItem { width: 640, height: 480, sequence_index: 2, group_total: 2 },
            CaptureJobItem { width: 1280, height: 720, sequence_index: 1, group_total: 1 },
        ];
        assert_eq!(queue.items(), expected);
    }

    #[test]
    fn zero_count_specs_are_dropped() {
        let queue =
            build_queue(&[spec(640, 480, 0), spec(1280, 720, 2), spec(1920, 1080, 0)], false)
                .unwrap();
        assert_eq!(queue.len(), 2);
        assert!(queue.items().iter().all(|item| item.width == 1280));
    }

    #[test]
    fn empty_spec_list_is_rejected() {
        assert_eq!(build_queue(&[], false), Err(SchedulerError::EmptyQueue));
        assert_eq!(build_queue(&[], true), Err(SchedulerError::EmptyQueue));
    }

    #[test]
    fn all_zero_counts_are_rejected() {
        assert_eq!(build_queue(&[spec(640, 480, 0)], false), Err(SchedulerError::EmptyQueue));
    }

    #[test]
    fn shuffle_preserves_the_item_multiset() {
        let specs = [spec(640, 480, 5), spec(1280, 720, 4), spec(1920, 1080, 3)];
        let ordered = build_queue(&specs, false).unwrap();
        let shuffled = build_queue(&specs, true).unwrap();

        assert_eq!(shuffled.len(), ordered.len());

        let mut ordered_items = ordered.items().to_vec();
        let mut shuffled_items = shuffled.items().to_vec();
        let key = |item: &CaptureJobItem| (item.width, item.height, item.sequence_index);
        ordered_items.sort_by_key(key);
        shuffled_items.sort_by_key(key);
        assert_eq!(ordered_items, shuffled_items);
    }

    #[test]
    fn shuffle_interleaves_items_not_blocks() {
        // Two resolution groups of 5. A block-level shuffle would always keep
        // each group contiguous; an item-level shuffle almost never does.
        let specs = [spec(640, 480, 5), spec(1280, 720, 5)];
        let trials = 10_000;
        let mut interleaved = 0;

        for _ in 0..trials {
            let queue = build_queue(&specs, true).unwrap();
            let widths: Vec<u32> = queue.items().iter().map(|item| item.width).collect();
            let group_changes =
                widths.windows(2).filter(|pair| pair[0] != pair[1]).count();
            // Contiguous groups change resolution exactly once.
            if group_changes > 1 {
                interleaved += 1;
            }
        }

        // P(contiguous | uniform permutation) = 2 * 5! * 5! / 10! ≈ 0.8%, so
        // interleaving must dominate by an overwhelming margin.
        assert!(
            interleaved > trials * 9 / 10,
            "only {interleaved}/{trials} trials interleaved"
        );
    }
}
