//! Per-bristle addressing into the anchor arrays.

use crate::anchors::ANCHOR_STRIDE;
use crate::error::PhysicsError;

/// Offset of each bristle's anchor data, `index[i] == i * 3`.
///
/// Built once and never modified. The dispatcher uses it as the task list so
/// each kernel invocation is told where its inputs live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTable {
    offsets: Vec<u32>,
}

impl IndexTable {
    /// Build the table for `num_bristles` bristles.
    ///
    /// Fails if the last offset does not fit in a `u32`.
    pub fn new(num_bristles: usize) -> Result<Self, PhysicsError> {
        let too_many = || PhysicsError::TooManyBristles(num_bristles);

        // Checked before the table is allocated
        let last = num_bristles.saturating_sub(1);
        last.checked_mul(ANCHOR_STRIDE)
            .and_then(|o| u32::try_from(o).ok())
            .ok_or_else(too_many)?;

        let offsets = (0..num_bristles)
            .map(|i| u32::try_from(i * ANCHOR_STRIDE))
            .collect::<Result<_, _>>()
            .map_err(|_| too_many())?;
        Ok(Self { offsets })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Anchor offset for bristle `index`.
    pub fn get(&self, index: usize) -> Option<usize> {
        self.offsets.get(index).map(|&o| o as usize)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.offsets
    }
}
