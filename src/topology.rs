//! Monitor arrangement inference
//!
//! Orders raw monitor frames into stable indices and infers whether two
//! monitors sit side by side or stacked. Everything downstream reasons in
//! window coordinates (top-left origin); the screen source reports
//! Cartesian frames (bottom-left origin) and `flip_to_window_coords` is the
//! single place the two conventions meet.

use crate::types::{Arrangement, Point, Rect};

/// Convert Cartesian screen frames (bottom-left origin, y grows upward)
/// into window coordinates (top-left origin, y grows downward).
///
/// The reference axis is the height of the first frame, which the screen
/// source guarantees is the monitor containing the global origin. A monitor
/// positioned above it ends up with a negative y, matching what the window
/// introspection channels report.
pub fn flip_to_window_coords(frames: &[Rect]) -> Vec<Rect> {
    let Some(reference) = frames.first() else {
        return Vec::new();
    };
    let reference_height = reference.height;
    frames
        .iter()
        .map(|f| Rect::new(f.x, reference_height - (f.y + f.height), f.width, f.height))
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Monitor {
    frame: Rect,
    /// Position of this frame in the screen source's original list
    source_index: usize,
}

/// Ordered view of the current monitors.
///
/// Rebuilt from scratch on every observation and topology change; indices
/// are only meaningful against the topology they were computed from.
#[derive(Debug, Clone)]
pub struct Topology {
    monitors: Vec<Monitor>,
    arrangement: Arrangement,
}

impl Topology {
    /// Build the index ordering from monitor frames in window coordinates.
    ///
    /// Exactly two monitors get arrangement inference: the axis overlap of
    /// the pair, normalized by the smaller extent on that axis, decides
    /// stacked vs side-by-side. Three or more monitors are always ordered
    /// left to right; vertical stacks beyond two displays are not
    /// distinguished.
    pub fn resolve(frames: &[Rect]) -> Self {
        let mut monitors: Vec<Monitor> = frames
            .iter()
            .enumerate()
            .map(|(source_index, frame)| Monitor { frame: *frame, source_index })
            .collect();

        let arrangement = if monitors.len() == 2 {
            let (a, b) = (&monitors[0].frame, &monitors[1].frame);
            let x_ratio = a.overlap_x(b) / a.width.min(b.width);
            let y_ratio = a.overlap_y(b) / a.height.min(b.height);
            if x_ratio > y_ratio {
                Arrangement::Vertical
            } else {
                Arrangement::Horizontal
            }
        } else {
            Arrangement::Horizontal
        };

        match arrangement {
            // Index 0 is the bottom monitor: the greater top-edge y in
            // window coordinates.
            Arrangement::Vertical => {
                monitors.sort_by(|a, b| b.frame.y.total_cmp(&a.frame.y));
            }
            Arrangement::Horizontal => {
                monitors.sort_by(|a, b| a.frame.x.total_cmp(&b.frame.x));
            }
        }

        Self { monitors, arrangement }
    }

    pub fn monitor_count(&self) -> usize {
        self.monitors.len()
    }

    pub fn arrangement(&self) -> Arrangement {
        self.arrangement
    }

    /// First monitor whose frame contains the point, in index order
    pub fn index_of(&self, p: Point) -> Option<usize> {
        self.monitors.iter().position(|m| m.frame.contains(p))
    }

    pub fn geometry_of(&self, index: usize) -> Option<Rect> {
        self.monitors.get(index).map(|m| m.frame)
    }

    /// Position of the indexed monitor in the screen source's original
    /// list, for permuting other per-display platform data into topology
    /// order
    pub fn source_index_of(&self, index: usize) -> Option<usize> {
        self.monitors.get(index).map(|m| m.source_index)
    }

    /// Human-readable monitor name. Directional labels only exist for
    /// exactly two monitors; anything else degrades to generic numbering.
    pub fn label_of(&self, index: usize) -> String {
        if self.monitors.len() == 2 {
            match (self.arrangement, index) {
                (Arrangement::Horizontal, 0) => return "Left".to_string(),
                (Arrangement::Horizontal, 1) => return "Right".to_string(),
                (Arrangement::Vertical, 0) => return "Bottom".to_string(),
                (Arrangement::Vertical, 1) => return "Top".to_string(),
                _ => {}
            }
        }
        format!("Monitor {}", index + 1)
    }
}
