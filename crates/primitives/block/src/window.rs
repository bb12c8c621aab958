use std::num::NonZeroUsize;

use crate::BlockId;

/// Plans the scan window: `tip, tip - 1, ..., tip - (window_size - 1)`.
///
/// The window never extends below genesis; for a tip lower than `window_size - 1` it is truncated at `0x0`.
pub fn plan_window(tip: &BlockId, window_size: NonZeroUsize) -> Vec<BlockId> {
    let window_size = window_size.get();
    let ids: Vec<BlockId> = (0..window_size as u64).map_while(|offset| tip.checked_sub(offset)).collect();

    if ids.len() < window_size {
        tracing::warn!(
            tip = %tip,
            requested = window_size,
            planned = ids.len(),
            "Scan window truncated at genesis"
        );
    }
    tracing::debug!(tip = %tip, planned = ids.len(), "Planned scan window");
    ids
}

/// Same as [`plan_window`], with the tip given in its wire form. A malformed tip plans from `0x0`.
pub fn plan_window_from_str(tip: &str, window_size: NonZeroUsize) -> Vec<BlockId> {
    plan_window(&BlockId::parse_lenient(tip), window_size)
}
