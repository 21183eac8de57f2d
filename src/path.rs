// Connecting path between consecutive step centres.
// Stateless: regenerate from the latest positions whenever the layout changes.

use serde::{Deserialize, Serialize};

use crate::layout::LayoutParams;
use crate::types::Point;

/// Straight line between two step centres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

/// Lazy segment sequence over a borrowed position list. Clone it to restart.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    positions: &'a [Point],
    center_offset: Point,
    next: usize,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        let from = *self.positions.get(self.next)?;
        let to = *self.positions.get(self.next + 1)?;
        self.next += 1;
        Some(Segment {
            from: from.offset(self.center_offset),
            to: to.offset(self.center_offset),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.positions.len().saturating_sub(self.next + 1);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Segments<'_> {}

impl Segments<'_> {
    /// SVG path data, one `M x y L x y ` move/line pair per segment. Empty for fewer than two steps.
    pub fn to_svg_path(&self) -> String {
        self.clone()
            .map(|s| format!("M{} {} L{} {} ", s.from.x, s.from.y, s.to.x, s.to.y))
            .collect()
    }
}

/// Segments joining each position to the next, shifted by `center_offset`.
pub fn build_path(positions: &[Point], center_offset: Point) -> Segments<'_> {
    Segments {
        positions,
        center_offset,
        next: 0,
    }
}

/// Lay out `count` steps with `params` and collect their connecting segments.
pub fn build_path_for(params: &LayoutParams, count: usize) -> Vec<Segment> {
    let positions = params.positions(count);
    build_path(&positions, params.center_offset).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fewer_than_two_positions_is_empty() {
        assert_eq!(build_path(&[], Point::default()).count(), 0);
        assert_eq!(
            build_path(&[Point::new(5.0, 5.0)], Point::default()).count(),
            0
        );
        assert_eq!(build_path(&[], Point::default()).to_svg_path(), "");
    }

    #[test]
    fn two_positions_one_segment() {
        let positions = [Point::new(50.0, 50.0), Point::new(270.0, 50.0)];
        let segments: Vec<Segment> = build_path(&positions, Point::new(70.0, 60.0)).collect();
        assert_eq!(
            segments,
            vec![Segment {
                from: Point::new(120.0, 110.0),
                to: Point::new(340.0, 110.0),
            }]
        );
    }

    #[test]
    fn svg_path_format() {
        let positions = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 20.0),
        ];
        let d = build_path(&positions, Point::new(1.0, 2.0)).to_svg_path();
        assert_eq!(d, "M1 2 L11 2 M11 2 L11 22 ");
    }

    #[test]
    fn segments_restart_on_clone() {
        let positions = [Point::default(), Point::new(1.0, 0.0), Point::new(2.0, 0.0)];
        let mut segments = build_path(&positions, Point::default());
        let fresh = segments.clone();
        segments.next();
        assert_eq!(segments.len(), 1);
        assert_eq!(fresh.len(), 2);
        assert_eq!(fresh.clone().count(), 2);
    }

    #[test]
    fn build_path_for_recomputes_from_layout() {
        let params = LayoutParams::default();
        let segments = build_path_for(&params, 4);
        assert_eq!(segments.len(), 3);
        // Step 3 -> step 4 drops straight down the right column.
        assert_eq!(segments[2].from.x, segments[2].to.x);
    }

    mod property_tests {
        use super::*;

        proptest! {
            /// Each segment ends where the next one starts.
            #[test]
            fn path_is_continuous(count in 0usize..100, columns in 1u32..8) {
                let params = LayoutParams { columns, ..LayoutParams::default() };
                let segments = build_path_for(&params, count);
                prop_assert_eq!(segments.len(), count.saturating_sub(1));
                for pair in segments.windows(2) {
                    prop_assert_eq!(pair[0].to, pair[1].from);
                }
            }
        }
    }
}
