use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A point in window coordinates (top-left origin, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle. Monitor frames and window frames both use
/// this; which coordinate convention applies depends on the source, see
/// `topology::flip_to_window_coords`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Containment is half-open: left/top edges inclusive, right/bottom
    /// exclusive, so adjacent monitors never both claim a shared edge.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left() && p.x < self.right() && p.y >= self.top() && p.y < self.bottom()
    }

    /// Length of the horizontal overlap between two rectangles (0 if disjoint)
    pub fn overlap_x(&self, other: &Rect) -> f64 {
        (self.right().min(other.right()) - self.left().max(other.left())).max(0.0)
    }

    /// Length of the vertical overlap between two rectangles (0 if disjoint)
    pub fn overlap_y(&self, other: &Rect) -> f64 {
        (self.bottom().min(other.bottom()) - self.top().max(other.top())).max(0.0)
    }
}

/// How two monitors are positioned relative to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrangement {
    /// Side by side; indices run left to right
    Horizontal,
    /// Stacked; indices run bottom to top
    Vertical,
}

/// Opaque window identifier understood by the space source.
/// Ephemeral; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

/// Opaque virtual-desktop identifier reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpaceId(pub u64);

/// Opaque handle through which the primary introspection channel can
/// reposition a window. The fallback channel never produces one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MoveHandle(pub u64);

/// Where one window of an app was last observed.
///
/// Windows carry no identity that survives an app restart; the title and
/// the discovery-order index are best-effort matching hints, nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowAssignment {
    #[serde(default)]
    pub window_title: String,
    pub window_index: usize,
    pub monitor_index: usize,
    pub space_index: usize,
}

/// Last observed layout for one application, committed wholesale on every
/// detected change and never partially mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppAssignment {
    pub bundle_identifier: String,
    pub app_name: String,
    /// Monitor holding the plurality of the app's windows at last
    /// observation; equal counts resolve to the lowest monitor index.
    #[serde(rename = "monitorIndex")]
    pub primary_monitor_index: usize,
    pub windows: Vec<WindowAssignment>,
}

/// All saved app layouts, keyed by bundle identifier.
/// BTreeMap keeps the on-disk document's keys sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentDatabase {
    #[serde(default)]
    pub assignments: BTreeMap<String, AppAssignment>,
}

impl AssignmentDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn get(&self, bundle_id: &str) -> Option<&AppAssignment> {
        self.assignments.get(bundle_id)
    }

    pub fn upsert(&mut self, assignment: AppAssignment) {
        self.assignments
            .insert(assignment.bundle_identifier.clone(), assignment);
    }

    pub fn remove(&mut self, bundle_id: &str) -> Option<AppAssignment> {
        self.assignments.remove(bundle_id)
    }

    pub fn clear(&mut self) {
        self.assignments.clear();
    }

    /// Assignments ordered by app name for user-facing listings
    pub fn sorted_by_app_name(&self) -> Vec<&AppAssignment> {
        let mut apps: Vec<_> = self.assignments.values().collect();
        apps.sort_by(|a, b| a.app_name.cmp(&b.app_name));
        apps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(bundle: &str, name: &str) -> AppAssignment {
        AppAssignment {
            bundle_identifier: bundle.to_string(),
            app_name: name.to_string(),
            primary_monitor_index: 0,
            windows: vec![WindowAssignment {
                window_title: "Main".to_string(),
                window_index: 0,
                monitor_index: 0,
                space_index: 1,
            }],
        }
    }

    #[test]
    fn test_rect_contains_half_open() {
        let r = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert!(r.contains(Point::new(0.0, 0.0)));
        assert!(r.contains(Point::new(99.9, 49.9)));
        assert!(!r.contains(Point::new(100.0, 25.0)));
        assert!(!r.contains(Point::new(50.0, 50.0)));
        assert!(!r.contains(Point::new(-0.1, 25.0)));
    }

    #[test]
    fn test_rect_overlap_disjoint_is_zero() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(100.0, 0.0, 100.0, 100.0);
        assert_eq!(a.overlap_x(&b), 0.0);
        assert_eq!(a.overlap_y(&b), 100.0);
    }

    #[test]
    fn test_rect_center() {
        let r = Rect::new(10.0, 20.0, 100.0, 60.0);
        assert_eq!(r.center(), Point::new(60.0, 50.0));
    }

    #[test]
    fn test_database_round_trip_ignores_insertion_order() {
        let mut forward = AssignmentDatabase::new();
        forward.upsert(assignment("com.a.alpha", "Alpha"));
        forward.upsert(assignment("com.b.beta", "Beta"));

        let mut reversed = AssignmentDatabase::new();
        reversed.upsert(assignment("com.b.beta", "Beta"));
        reversed.upsert(assignment("com.a.alpha", "Alpha"));

        let forward_json = serde_json::to_string_pretty(&forward).unwrap();
        let reversed_json = serde_json::to_string_pretty(&reversed).unwrap();
        assert_eq!(forward_json, reversed_json);

        let decoded: AssignmentDatabase = serde_json::from_str(&forward_json).unwrap();
        assert_eq!(decoded, forward);
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(assignment("com.a.alpha", "Alpha")).unwrap();
        assert!(json.get("bundleIdentifier").is_some());
        assert!(json.get("appName").is_some());
        assert!(json.get("monitorIndex").is_some());
        let window = &json["windows"][0];
        assert!(window.get("windowTitle").is_some());
        assert!(window.get("windowIndex").is_some());
        assert!(window.get("spaceIndex").is_some());
    }

    #[test]
    fn test_missing_window_title_defaults_to_empty() {
        let json = r#"{"windowIndex": 2, "monitorIndex": 1, "spaceIndex": 0}"#;
        let w: WindowAssignment = serde_json::from_str(json).unwrap();
        assert_eq!(w.window_title, "");
        assert_eq!(w.window_index, 2);
    }

    #[test]
    fn test_sorted_by_app_name() {
        let mut db = AssignmentDatabase::new();
        db.upsert(assignment("com.z.last", "Anchor"));
        db.upsert(assignment("com.a.first", "Zenith"));
        let names: Vec<_> = db.sorted_by_app_name().iter().map(|a| a.app_name.as_str()).collect();
        assert_eq!(names, vec!["Anchor", "Zenith"]);
    }
}
