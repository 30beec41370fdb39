//! Ordered view of each monitor's virtual desktops
//!
//! The space source reports opaque space IDs per display in its own display
//! order; the directory permutes them into topology order so a space can be
//! addressed as a (monitor index, space index) pair and back.

use anyhow::Result;

use crate::platform::SpaceSource;
use crate::topology::Topology;
use crate::types::{SpaceId, WindowId};

#[derive(Debug, Clone, Default)]
pub struct SpaceDirectory {
    /// Space IDs per display, indexed by topology monitor index
    by_display: Vec<Vec<SpaceId>>,
}

impl SpaceDirectory {
    /// Build from the space source's per-display lists, reordered so
    /// display positions line up with topology monitor indices. Displays
    /// the topology does not know about are dropped; a display with no
    /// space list gets an empty one.
    pub fn new(source_lists: Vec<Vec<SpaceId>>, topology: &Topology) -> Self {
        let by_display = (0..topology.monitor_count())
            .map(|index| {
                topology
                    .source_index_of(index)
                    .and_then(|source| source_lists.get(source))
                    .cloned()
                    .unwrap_or_default()
            })
            .collect();
        Self { by_display }
    }

    pub fn space_id(&self, display_index: usize, space_index: usize) -> Option<SpaceId> {
        self.by_display.get(display_index)?.get(space_index).copied()
    }

    /// Find which (display, index) pair a space ID belongs to
    pub fn locate(&self, id: SpaceId) -> Option<(usize, usize)> {
        self.by_display.iter().enumerate().find_map(|(display, spaces)| {
            spaces.iter().position(|s| *s == id).map(|index| (display, index))
        })
    }

    pub fn space_count(&self, display_index: usize) -> usize {
        self.by_display.get(display_index).map_or(0, Vec::len)
    }

    /// Put the window on the target space unless it is already a member.
    ///
    /// A window legitimately belonging to several spaces ("all desktops")
    /// counts as already correct when any of them is the target; forcing a
    /// move would strip that property. Returns whether a move happened.
    pub fn ensure_window_on(
        &self,
        spaces: &dyn SpaceSource,
        window: WindowId,
        target: SpaceId,
    ) -> Result<bool> {
        let current = spaces.spaces_of(window)?;
        if current.contains(&target) {
            return Ok(false);
        }
        spaces.move_to_space(window, target)?;
        Ok(true)
    }
}
