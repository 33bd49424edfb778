use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

// ── Attachment side selection ────────────────────────────────────────
/// Horizontal center distance under which two boxes share a column.
pub const SAME_COLUMN_THRESHOLD: f32 = 40.0;

// ── Curve construction ──────────────────────────────────────────────
/// Forward curves push their control point this fraction of the horizontal span.
const LTR_OFFSET_RATIO: f32 = 0.25;
pub const LTR_MIN_OFFSET: f32 = 40.0;
/// Backward curves dip below both endpoints by `span * ratio + base`.
const RTL_DROP_RATIO: f32 = 0.3;
const RTL_DROP_BASE: f32 = 40.0;
pub const RTL_MIN_DROP: f32 = 60.0;
/// Self loops bulge sideways by `rise * ratio + base`.
const SAME_BULGE_RATIO: f32 = 0.5;
const SAME_BULGE_BASE: f32 = 40.0;
pub const SAME_MIN_BULGE: f32 = 70.0;

// ── Length estimate ─────────────────────────────────────────────────
const LTR_LENGTH_SCALE: f32 = 1.1;
const LTR_LENGTH_EXTRA: f32 = 40.0;
const RTL_LENGTH_SCALE: f32 = 1.6;
const RTL_LENGTH_EXTRA: f32 = 80.0;
const SAME_LENGTH_SCALE: f32 = 1.4;
const SAME_LENGTH_EXTRA: f32 = 100.0;
const MIN_LENGTH: f32 = 20.0;

/// Axis-aligned box in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

/// Screen bounds of rendered subjects. `None` means the subject is not
/// currently mounted.
pub trait RectProvider {
    fn bounds_of(&self, subject_id: &str) -> Option<Rect>;
}

impl RectProvider for HashMap<String, Rect> {
    fn bounds_of(&self, subject_id: &str) -> Option<Rect> {
        self.get(subject_id).copied()
    }
}

impl RectProvider for BTreeMap<String, Rect> {
    fn bounds_of(&self, subject_id: &str) -> Option<Rect> {
        self.get(subject_id).copied()
    }
}

impl<T: RectProvider + ?Sized> RectProvider for &T {
    fn bounds_of(&self, subject_id: &str) -> Option<Rect> {
        (**self).bounds_of(subject_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingClass {
    /// Requirement on the left of (or in the same column as) the target.
    Ltr,
    /// Requirement on the right of the target.
    Rtl,
    /// Self loop on a single box.
    Same,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeGeometry {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub routing: RoutingClass,
    pub exit: EdgeSide,
    pub entry: EdgeSide,
}

/// Picks attachment points for an arrow from a requirement's box (`source`)
/// to the selected subject's box (`target`).
pub fn resolve_edge_points(source: &Rect, target: &Rect, threshold: f32) -> EdgeGeometry {
    let source_cx = source.center_x();
    let target_cx = target.center_x();
    let same_column = (source_cx - target_cx).abs() < threshold;

    if same_column || source_cx < target_cx {
        EdgeGeometry {
            x1: source.right(),
            y1: source.center_y(),
            x2: target.left(),
            y2: target.center_y(),
            routing: RoutingClass::Ltr,
            exit: EdgeSide::Right,
            entry: EdgeSide::Left,
        }
    } else {
        EdgeGeometry {
            x1: source.left(),
            y1: source.center_y(),
            x2: target.right(),
            y2: target.center_y(),
            routing: RoutingClass::Rtl,
            exit: EdgeSide::Left,
            entry: EdgeSide::Right,
        }
    }
}

/// Lower bounds for how far curves swing away from the straight line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveStyle {
    pub min_ltr_offset: f32,
    pub min_rtl_drop: f32,
    pub min_same_bulge: f32,
}

impl Default for CurveStyle {
    fn default() -> Self {
        Self {
            min_ltr_offset: LTR_MIN_OFFSET,
            min_rtl_drop: RTL_MIN_DROP,
            min_same_bulge: SAME_MIN_BULGE,
        }
    }
}

/// Quadratic Bézier from `start` through `mid` to `end`; the second half
/// mirrors `control` (SVG `T`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePath {
    pub start: (f32, f32),
    pub control: (f32, f32),
    pub mid: (f32, f32),
    pub end: (f32, f32),
}

impl CurvePath {
    pub fn to_svg_d(&self) -> String {
        format!(
            "M {:.2} {:.2} Q {:.2} {:.2}, {:.2} {:.2} T {:.2} {:.2}",
            self.start.0,
            self.start.1,
            self.control.0,
            self.control.1,
            self.mid.0,
            self.mid.1,
            self.end.0,
            self.end.1
        )
    }
}

pub fn build_curve(
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    routing: RoutingClass,
    style: &CurveStyle,
) -> CurvePath {
    let mx = (x1 + x2) / 2.0;
    let my = (y1 + y2) / 2.0;
    match routing {
        RoutingClass::Ltr => {
            let offset = ((x2 - x1).abs() * LTR_OFFSET_RATIO).max(style.min_ltr_offset);
            CurvePath {
                start: (x1, y1),
                control: (x1 + offset, y1),
                mid: (mx, my),
                end: (x2, y2),
            }
        }
        RoutingClass::Rtl => {
            let drop = ((x2 - x1).abs() * RTL_DROP_RATIO + RTL_DROP_BASE).max(style.min_rtl_drop);
            let cy = y1.max(y2) + drop;
            CurvePath {
                start: (x1, y1),
                control: (x1, cy),
                mid: (mx, cy),
                end: (x2, y2),
            }
        }
        RoutingClass::Same => {
            let side = if x2 > x1 { 1.0 } else { -1.0 };
            let bulge = ((y2 - y1).abs() * SAME_BULGE_RATIO + SAME_BULGE_BASE).max(style.min_same_bulge);
            CurvePath {
                start: (x1, y1),
                control: (mx + side * bulge, y1),
                mid: (mx, my),
                end: (x2, y2),
            }
        }
    }
}

/// Analytic path length used to size the draw-on dash; never measured.
pub fn estimate_length(x1: f32, y1: f32, x2: f32, y2: f32, routing: RoutingClass) -> f32 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    let base = (dx * dx + dy * dy).sqrt();
    let scaled = match routing {
        RoutingClass::Ltr => base * LTR_LENGTH_SCALE + LTR_LENGTH_EXTRA,
        RoutingClass::Rtl => base * RTL_LENGTH_SCALE + RTL_LENGTH_EXTRA,
        RoutingClass::Same => base * SAME_LENGTH_SCALE + SAME_LENGTH_EXTRA,
    };
    scaled.max(MIN_LENGTH)
}

/// When and how long an edge's reveal animation runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawOnTiming {
    pub length: f32,
    pub delay_secs: f32,
    pub duration_secs: f32,
}

pub fn draw_on_timing(index: usize, length: f32, duration_secs: f32, stagger_secs: f32) -> DrawOnTiming {
    DrawOnTiming {
        length,
        delay_secs: index as f32 * stagger_secs,
        duration_secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(x: f32, y: f32) -> Rect {
        Rect::new(x, y, 160.0, 40.0)
    }

    #[test]
    fn forward_reference_exits_right_enters_left() {
        let geo = resolve_edge_points(&card(0.0, 100.0), &card(300.0, 20.0), SAME_COLUMN_THRESHOLD);
        assert_eq!(geo.routing, RoutingClass::Ltr);
        assert_eq!((geo.x1, geo.y1), (160.0, 120.0));
        assert_eq!((geo.x2, geo.y2), (300.0, 40.0));
        assert_eq!((geo.exit, geo.entry), (EdgeSide::Right, EdgeSide::Left));
    }

    #[test]
    fn backward_reference_exits_left_enters_right() {
        let geo = resolve_edge_points(&card(600.0, 0.0), &card(100.0, 80.0), SAME_COLUMN_THRESHOLD);
        assert_eq!(geo.routing, RoutingClass::Rtl);
        assert_eq!((geo.x1, geo.y1), (600.0, 20.0));
        assert_eq!((geo.x2, geo.y2), (260.0, 100.0));
    }

    #[test]
    fn same_column_is_routed_forward() {
        // 30px apart, under the 40px tolerance, even though source is to the right.
        let geo = resolve_edge_points(&card(130.0, 0.0), &card(100.0, 200.0), SAME_COLUMN_THRESHOLD);
        assert_eq!(geo.routing, RoutingClass::Ltr);
        assert_eq!(geo.x1, 290.0);
        assert_eq!(geo.x2, 100.0);
    }

    #[test]
    fn threshold_is_exclusive() {
        let geo = resolve_edge_points(&card(140.0, 0.0), &card(100.0, 0.0), SAME_COLUMN_THRESHOLD);
        assert_eq!(geo.routing, RoutingClass::Rtl);
    }

    #[test]
    fn ltr_curve_has_minimum_offset() {
        let path = build_curve(0.0, 0.0, 100.0, 50.0, RoutingClass::Ltr, &CurveStyle::default());
        assert_eq!(path.control, (40.0, 0.0));
        assert_eq!(path.mid, (50.0, 25.0));
        let wide = build_curve(0.0, 0.0, 400.0, 0.0, RoutingClass::Ltr, &CurveStyle::default());
        assert_eq!(wide.control, (100.0, 0.0));
    }

    #[test]
    fn rtl_curve_dips_below_both_points() {
        let path = build_curve(300.0, 10.0, 100.0, 50.0, RoutingClass::Rtl, &CurveStyle::default());
        // 200 * 0.3 + 40 = 100
        assert_eq!(path.control, (300.0, 150.0));
        assert_eq!(path.mid, (200.0, 150.0));
        let short = build_curve(110.0, 0.0, 100.0, 0.0, RoutingClass::Rtl, &CurveStyle::default());
        assert_eq!(short.control.1, 60.0);
    }

    #[test]
    fn same_curve_bulges_sideways() {
        let path = build_curve(100.0, 0.0, 100.0, 20.0, RoutingClass::Same, &CurveStyle::default());
        assert_eq!(path.control, (30.0, 0.0));
        let tall = build_curve(100.0, 0.0, 120.0, 200.0, RoutingClass::Same, &CurveStyle::default());
        assert_eq!(tall.control, (110.0 + 140.0, 0.0));
    }

    #[test]
    fn svg_path_data_format() {
        let path = build_curve(0.0, 0.0, 100.0, 0.0, RoutingClass::Ltr, &CurveStyle::default());
        assert_eq!(
            path.to_svg_d(),
            "M 0.00 0.00 Q 40.00 0.00, 50.00 0.00 T 100.00 0.00"
        );
    }

    #[test]
    fn length_estimate_per_class() {
        assert_eq!(estimate_length(0.0, 0.0, 30.0, 40.0, RoutingClass::Ltr), 95.0);
        assert_eq!(estimate_length(0.0, 0.0, 30.0, 40.0, RoutingClass::Rtl), 160.0);
        assert_eq!(estimate_length(0.0, 0.0, 30.0, 40.0, RoutingClass::Same), 170.0);
        assert_eq!(estimate_length(5.0, 5.0, 5.0, 5.0, RoutingClass::Ltr), 40.0);
    }

    #[test]
    fn draw_on_delay_is_staggered() {
        let timing = draw_on_timing(3, 120.0, 0.5, 0.07);
        assert!((timing.delay_secs - 0.21).abs() < 1e-6);
        assert_eq!(timing.duration_secs, 0.5);
        assert_eq!(timing.length, 120.0);
    }

    #[test]
    fn rect_provider_for_maps() {
        let mut rects = HashMap::new();
        rects.insert("a".to_string(), card(0.0, 0.0));
        assert_eq!(rects.bounds_of("a"), Some(card(0.0, 0.0)));
        assert_eq!(rects.bounds_of("b"), None);
        let by_ref = &rects;
        assert!(by_ref.bounds_of("a").is_some());
    }
}
