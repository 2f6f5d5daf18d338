//! Clipping primitives: region codes, line/rectangle/triangle clipping, and
//! the eight-way blit symmetry table.
//!
//! The region-code bit layout and the blit symmetry table are bit-exact
//! contracts (nothing here may be "simplified" without breaking a consumer
//! that bakes in these exact values).

use crate::geometry::{Line, Point, Rectangle, Region, Triangle};

bitflags::bitflags! {
    /// Cohen-Sutherland outcode bits. Bit weights are part of the contract:
    /// `ABOVE = 8, BELOW = 4, RIGHT = 2, LEFT = 1`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct OutCode: u8 {
        const ABOVE = 0b1000;
        const BELOW = 0b0100;
        const RIGHT = 0b0010;
        const LEFT  = 0b0001;
    }
}

fn region_code(x: i32, y: i32, clip: &Region) -> OutCode {
    let mut code = OutCode::empty();
    if y > clip.y2 {
        code |= OutCode::ABOVE;
    }
    if y < clip.y1 {
        code |= OutCode::BELOW;
    }
    if x > clip.x2 {
        code |= OutCode::RIGHT;
    }
    if x < clip.x1 {
        code |= OutCode::LEFT;
    }
    code
}

/// Cohen-Sutherland line clip. Divides at the clip edge indicated by the
/// highest-set bit of the outside endpoint (checked in `ABOVE, BELOW, RIGHT,
/// LEFT` order, matching the outcode bit weights). Returns `false` if the
/// line lies entirely outside the clip region.
pub fn clip_line(clip: &Region, line: &mut Line) -> bool {
    let mut code1 = region_code(line.x1, line.y1, clip);
    let mut code2 = region_code(line.x2, line.y2, clip);

    while !(code1.is_empty() && code2.is_empty()) {
        if !(code1 & code2).is_empty() {
            return false;
        }

        let outside_first = !code1.is_empty();
        let (code, x, y, ox, oy) = if outside_first {
            (code1, line.x1, line.y1, line.x2, line.y2)
        } else {
            (code2, line.x2, line.y2, line.x1, line.y1)
        };

        let (nx, ny) = if code.contains(OutCode::ABOVE) {
            (x + (ox - x) * (clip.y2 - y) / (oy - y), clip.y2)
        } else if code.contains(OutCode::BELOW) {
            (x + (ox - x) * (clip.y1 - y) / (oy - y), clip.y1)
        } else if code.contains(OutCode::RIGHT) {
            (clip.x2, y + (oy - y) * (clip.x2 - x) / (ox - x))
        } else {
            (clip.x1, y + (oy - y) * (clip.x1 - x) / (ox - x))
        };

        if outside_first {
            line.x1 = nx;
            line.y1 = ny;
            code1 = region_code(line.x1, line.y1, clip);
        } else {
            line.x2 = nx;
            line.y2 = ny;
            code2 = region_code(line.x2, line.y2, clip);
        }
    }

    true
}

/// Clips `rect` to `clip` in place. Returns `false` (leaving `rect`
/// unmodified) if disjoint.
pub fn clip_rectangle(clip: &Region, rect: &mut Rectangle) -> bool {
    if clip.x1 >= rect.x + rect.w || clip.x2 < rect.x || clip.y1 >= rect.y + rect.h || clip.y2 < rect.y {
        return false;
    }

    if clip.x1 > rect.x {
        rect.w += rect.x - clip.x1;
        rect.x = clip.x1;
    }
    if clip.y1 > rect.y {
        rect.h += rect.y - clip.y1;
        rect.y = clip.y1;
    }
    if clip.x2 < rect.x + rect.w - 1 {
        rect.w = clip.x2 - rect.x + 1;
    }
    if clip.y2 < rect.y + rect.h - 1 {
        rect.h = clip.y2 - rect.y + 1;
    }

    true
}

/// Idempotence holds by construction: once `rect` lies inside `clip`, a
/// second clip against the same region is a no-op. See property test below.
pub fn clip_rectangle_idempotent(clip: &Region, rect: Rectangle) -> bool {
    let mut once = rect;
    if !clip_rectangle(clip, &mut once) {
        return true;
    }
    let mut twice = once;
    clip_rectangle(clip, &mut twice);
    twice == once
}

/// Intersection of two finite segments, if any. Returns the intersection
/// point; for parallel/collinear segments returns `None` (degenerate cases
/// have no bearing on the triangle-clip contract, which only needs the
/// generic crossing point).
fn segment_intersect(a: &Line, b: &Line) -> Option<Point> {
    let (x1, y1, x2, y2) = (a.x1 as f64, a.y1 as f64, a.x2 as f64, a.y2 as f64);
    let (x3, y3, x4, y4) = (b.x1 as f64, b.y1 as f64, b.x2 as f64, b.y2 as f64);

    let denom = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
    if denom.abs() < f64::EPSILON {
        return None;
    }

    let t = ((x1 - x3) * (y3 - y4) - (y1 - y3) * (x3 - x4)) / denom;
    let u = ((x1 - x3) * (y1 - y2) - (y1 - y3) * (x1 - x2)) / denom;

    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
        return None;
    }

    Some(Point::new(
        (x1 + t * (x2 - x1)).round() as i32,
        (y1 + t * (y2 - y1)).round() as i32,
    ))
}

/// Clips `tri` against `clip`, writing up to 6 output vertices into
/// `out_points` and the vertex count into `*n`. Returns `true` iff the
/// resulting polygon has at least 3 vertices.
///
/// Each of the triangle's three edges is clipped independently. An edge
/// entirely outside `clip` is replaced by the intersection of `clip`'s two
/// diagonals with that edge, each snapped to the nearest corner of `clip`
/// along its diagonal. An edge with neither diagonal intersecting is
/// dropped (a "redundant edge").
pub fn clip_triangle(clip: &Region, tri: &Triangle, out_points: &mut [Point; 6], n: &mut usize) -> bool {
    let mut edges = vec![
        Line::new(tri.x1, tri.y1, tri.x2, tri.y2),
        Line::new(tri.x2, tri.y2, tri.x3, tri.y3),
        Line::new(tri.x3, tri.y3, tri.x1, tri.y1),
    ];

    let mut i = 0;
    while i < edges.len() {
        let mut line = edges[i];
        if clip_line(clip, &mut line) {
            edges[i] = line;
            i += 1;
            continue;
        }

        // Edge entirely outside: intersect with each diagonal, snapping the
        // hit to the diagonal's nearer clip-rectangle corner.
        let diag_a = Line::new(clip.x1, clip.y1, clip.x2, clip.y2);
        let diag_b = Line::new(clip.x2, clip.y1, clip.x1, clip.y2);
        let edge = edges[i];

        let p1 = segment_intersect(&diag_a, &edge).map(|p| {
            if p.x <= clip.x1 || p.y <= clip.y1 {
                Point::new(clip.x1, clip.y1)
            } else {
                Point::new(clip.x2, clip.y2)
            }
        });
        let p2 = segment_intersect(&diag_b, &edge).map(|p| {
            if p.x >= clip.x2 || p.y <= clip.y1 {
                Point::new(clip.x2, clip.y1)
            } else {
                Point::new(clip.x1, clip.y2)
            }
        });

        match (p1, p2) {
            (Some(p1), Some(p2)) => {
                edges[i] = Line::new(p1.x, p1.y, p2.x, p2.y);
                i += 1;
            }
            (Some(p), None) | (None, Some(p)) => {
                edges[i] = Line::new(p.x, p.y, p.x, p.y);
                i += 1;
            }
            (None, None) => {
                // Redundant edge: drop it and re-examine the edge that takes its place.
                edges.remove(i);
            }
        }
    }

    if edges.is_empty() {
        *n = 0;
        return false;
    }

    let mut verts: Vec<Point> = Vec::with_capacity(6);
    verts.push(Point::new(edges[0].x1, edges[0].y1));
    if edges[0].x2 != edges[0].x1 || edges[0].y2 != edges[0].y1 {
        verts.push(Point::new(edges[0].x2, edges[0].y2));
    }

    for edge in &edges[1..] {
        let last = *verts.last().unwrap();
        if edge.x1 != last.x || edge.y1 != last.y {
            verts.push(Point::new(edge.x1, edge.y1));
        }
        let last = *verts.last().unwrap();
        if edge.x2 != last.x || edge.y2 != last.y {
            verts.push(Point::new(edge.x2, edge.y2));
        }
    }

    if verts.len() > 1 {
        let first = verts[0];
        let last = *verts.last().unwrap();
        if first.x == last.x && first.y == last.y {
            verts.pop();
        }
    }

    *n = verts.len().min(6);
    for (slot, v) in out_points.iter_mut().zip(verts.iter()) {
        *slot = *v;
    }

    verts.len() >= 3
}

bitflags::bitflags! {
    /// Symmetry operations applied while blitting. 180-degree rotation is
    /// `FLIP_HORIZONTAL | FLIP_VERTICAL`; 270-degree is
    /// `ROTATE90 | FLIP_HORIZONTAL | FLIP_VERTICAL`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct BlitFlags: u8 {
        const NOFX             = 0;
        const FLIP_HORIZONTAL  = 0b001;
        const FLIP_VERTICAL    = 0b010;
        const ROTATE90         = 0b100;
    }
}

/// Adjusts `src` to match the portion of `dst` that survives clipping
/// against `clip`, for each of the eight symmetry operations. `dst` is
/// replaced by its clipped self; `src` is shifted/resized to track it.
///
/// This is the one piece of the blit pipeline the core owns (spec treats
/// per-format pixel transfer as a collaborator); the eight-case table below
/// is the hard contract.
pub fn clip_blit_flipped_rotated(
    clip: &Region,
    src: &mut Rectangle,
    dst: &mut Rectangle,
    flags: BlitFlags,
) {
    let dest = dst.to_region();
    let mut clipped = dest;
    clipped.intersect_region(clip);

    *dst = clipped.to_rectangle();

    match flags {
        BlitFlags::NOFX => {
            src.x += clipped.x1 - dest.x1;
            src.y += clipped.y1 - dest.y1;
        }
        f if f == BlitFlags::FLIP_HORIZONTAL => {
            src.x += dest.x2 - clipped.x2;
            src.y += clipped.y1 - dest.y1;
        }
        f if f == BlitFlags::FLIP_VERTICAL => {
            src.x += clipped.x1 - dest.x1;
            src.y += dest.y2 - clipped.y2;
        }
        f if f == BlitFlags::ROTATE90 => {
            src.x += dest.y2 - clipped.y2;
            src.y += clipped.x1 - dest.x1;
        }
        f if f == (BlitFlags::FLIP_HORIZONTAL | BlitFlags::FLIP_VERTICAL) => {
            // 180 degrees.
            src.x += dest.x2 - clipped.x2;
            src.y += dest.y2 - clipped.y2;
        }
        f if f == (BlitFlags::ROTATE90 | BlitFlags::FLIP_HORIZONTAL | BlitFlags::FLIP_VERTICAL) => {
            // 270 degrees.
            src.x += clipped.y1 - dest.y1;
            src.y += dest.x2 - clipped.x2;
        }
        f if f == (BlitFlags::ROTATE90 | BlitFlags::FLIP_HORIZONTAL) => {
            src.x += clipped.y1 - dest.y1;
            src.y += clipped.x1 - dest.x1;
        }
        f if f == (BlitFlags::ROTATE90 | BlitFlags::FLIP_VERTICAL) => {
            src.x += dest.y2 - clipped.y2;
            src.y += dest.x2 - clipped.x2;
        }
        _ => unreachable!("BlitFlags excludes ROTATE180/ROTATE270 as standalone bits"),
    }

    if flags.contains(BlitFlags::ROTATE90) {
        src.w = dst.h;
        src.h = dst.w;
    } else {
        src.w = dst.w;
        src.h = dst.h;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_line_fully_inside_is_noop() {
        let clip = Region::new(0, 0, 100, 100);
        let mut line = Line::new(10, 10, 50, 50);
        let orig = line;
        assert!(clip_line(&clip, &mut line));
        assert_eq!(line, orig);
    }

    #[test]
    fn clip_line_divides_at_top() {
        let clip = Region::new(0, 0, 100, 100);
        let mut line = Line::new(50, -10, 50, 10);
        assert!(clip_line(&clip, &mut line));
        assert_eq!(line.y1, 0);
    }

    #[test]
    fn clip_line_entirely_outside_fails() {
        let clip = Region::new(0, 0, 10, 10);
        let mut line = Line::new(20, 20, 30, 30);
        assert!(!clip_line(&clip, &mut line));
    }

    #[test]
    fn clip_rectangle_clamps_overhanging_rect() {
        let clip = Region::new(0, 0, 9, 9);
        let mut rect = Rectangle::new(-5, -5, 20, 20);
        assert!(clip_rectangle(&clip, &mut rect));
        assert_eq!(rect, Rectangle::new(0, 0, 10, 10));
    }

    #[test]
    fn clip_rectangle_disjoint_returns_false() {
        let clip = Region::new(0, 0, 9, 9);
        let mut rect = Rectangle::new(100, 100, 5, 5);
        assert!(!clip_rectangle(&clip, &mut rect));
    }

    // Scenario S6: clip = (10,10)-(20,20), triangle entirely outside with
    // both diagonal intersections failing -> 0 vertices, returns false.
    #[test]
    fn clip_triangle_degenerate_scenario_s6() {
        let clip = Region::new(10, 10, 20, 20);
        let tri = Triangle {
            x1: 0,
            y1: 0,
            x2: 5,
            y2: 5,
            x3: 0,
            y3: 5,
        };
        let mut out = [Point::default(); 6];
        let mut n = 0;
        assert!(!clip_triangle(&clip, &tri, &mut out, &mut n));
        assert_eq!(n, 0);
    }

    #[test]
    fn clip_triangle_fully_inside_keeps_three_vertices() {
        let clip = Region::new(0, 0, 100, 100);
        let tri = Triangle {
            x1: 10,
            y1: 10,
            x2: 50,
            y2: 10,
            x3: 10,
            y3: 50,
        };
        let mut out = [Point::default(); 6];
        let mut n = 0;
        assert!(clip_triangle(&clip, &tri, &mut out, &mut n));
        assert_eq!(n, 3);
    }

    #[test]
    fn blit_identity_shifts_source_with_clipped_left_edge() {
        let clip = Region::new(5, 0, 100, 100);
        let mut src = Rectangle::new(0, 0, 20, 20);
        let mut dst = Rectangle::new(0, 0, 20, 20);
        clip_blit_flipped_rotated(&clip, &mut src, &mut dst, BlitFlags::NOFX);
        assert_eq!(dst, Rectangle::new(5, 0, 15, 20));
        assert_eq!(src.x, 5);
        assert_eq!(src.w, 15);
    }

    #[test]
    fn blit_horizontal_flip_shifts_from_the_right() {
        let clip = Region::new(0, 0, 14, 100);
        let mut src = Rectangle::new(0, 0, 20, 20);
        let mut dst = Rectangle::new(0, 0, 20, 20);
        clip_blit_flipped_rotated(&clip, &mut src, &mut dst, BlitFlags::FLIP_HORIZONTAL);
        // dst clipped to width 15 (x:0..14); src shift tracks the far edge.
        assert_eq!(dst.w, 15);
        assert_eq!(src.w, 15);
    }

    proptest::proptest! {
        #[test]
        fn clip_rectangle_is_idempotent(
            cx1 in -50i32..50, cy1 in -50i32..50, cw in 1i32..100, ch in 1i32..100,
            rx in -50i32..50, ry in -50i32..50, rw in 1i32..100, rh in 1i32..100,
        ) {
            let clip = Rectangle::new(cx1, cy1, cw, ch).to_region();
            let rect = Rectangle::new(rx, ry, rw, rh);
            assert!(clip_rectangle_idempotent(&clip, rect));
        }
    }
}
