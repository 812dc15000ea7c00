use convene_core::types::{CandidateId, CandidateSlot, ClockTime};

/// End of a run of `item_count` back-to-back blocks starting at `start`.
///
/// Arithmetic wraps on the 24h clock, so a window running past midnight
/// ends early the next day (`23:30 + 2 × 30` is `00:30`).
pub fn compute_end_time(start: ClockTime, item_count: usize, duration_minutes: u32) -> ClockTime {
    start.wrapping_add_minutes(item_count as u64 * duration_minutes as u64)
}

/// Give every candidate a contiguous block in input order; block `i` starts
/// at `start + i × duration_minutes`.
pub fn compute_candidate_slots(
    start: ClockTime,
    candidates: &[CandidateId],
    duration_minutes: u32,
) -> Vec<CandidateSlot> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let block_start = compute_end_time(start, i, duration_minutes);
            CandidateSlot {
                candidate_id: id.clone(),
                start: block_start,
                end: block_start.wrapping_add_minutes(duration_minutes as u64),
            }
        })
        .collect()
}
