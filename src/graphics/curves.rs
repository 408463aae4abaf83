//! Flattening of curves and round shapes into polygon points.
//!
//! All functions append to a flat `[x0, y0, x1, y1, ...]` list.

use std::f32::consts::TAU;

use crate::math::{Circle, Ellipse, Rectangle, RoundedRectangle, Shape};

/// Segments used for quadratic and cubic Bézier curves.
pub const CURVE_SEGMENTS: usize = 20;
/// Segments per full turn of an arc.
pub const ARC_SEGMENTS_PER_TURN: f32 = 40.0;
/// Segments per rounded-rectangle corner.
pub const CORNER_SEGMENTS: usize = 20;

/// Append a quadratic Bézier from `(from_x, from_y)`. The start point is not appended.
pub fn quadratic(from: (f32, f32), control: (f32, f32), to: (f32, f32), out: &mut Vec<f32>) {
    for i in 1..=CURVE_SEGMENTS {
        let t = i as f32 / CURVE_SEGMENTS as f32;
        let xa = lerp(from.0, control.0, t);
        let ya = lerp(from.1, control.1, t);
        let xb = lerp(control.0, to.0, t);
        let yb = lerp(control.1, to.1, t);
        out.push(lerp(xa, xb, t));
        out.push(lerp(ya, yb, t));
    }
}

/// Append a cubic Bézier. The start point is not appended.
pub fn bezier(
    from: (f32, f32),
    control1: (f32, f32),
    control2: (f32, f32),
    to: (f32, f32),
    out: &mut Vec<f32>,
) {
    for i in 1..=CURVE_SEGMENTS {
        let t = i as f32 / CURVE_SEGMENTS as f32;
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        out.push(a * from.0 + b * control1.0 + c * control2.0 + d * to.0);
        out.push(a * from.1 + b * control1.1 + c * control2.1 + d * to.1);
    }
}

pub fn arc_segments(sweep: f32) -> usize {
    ((sweep.abs() / TAU).ceil() * ARC_SEGMENTS_PER_TURN) as usize
}

/// Append an arc including its start point.
pub fn arc(cx: f32, cy: f32, radius: f32, start: f32, sweep: f32, out: &mut Vec<f32>) {
    let segments = arc_segments(sweep).max(1);
    for i in 0..=segments {
        let angle = start + sweep * (i as f32 / segments as f32);
        out.push(cx + angle.cos() * radius);
        out.push(cy + angle.sin() * radius);
    }
}

pub fn circle_segments(radius: f32) -> usize {
    ((30.0 * radius.max(0.0).sqrt()).floor() as usize).max(3)
}

pub fn ellipse_segments(width: f32, height: f32) -> usize {
    ((15.0 * (width + height).max(0.0).sqrt()).floor() as usize).max(3)
}

fn ring(cx: f32, cy: f32, rx: f32, ry: f32, segments: usize, out: &mut Vec<f32>) {
    for i in 0..segments {
        let angle = i as f32 / segments as f32 * TAU;
        out.push(cx + angle.sin() * rx);
        out.push(cy + angle.cos() * ry);
    }
}

fn circle(c: &Circle, out: &mut Vec<f32>) {
    ring(c.x, c.y, c.radius, c.radius, circle_segments(c.radius), out);
}

fn ellipse(e: &Ellipse, out: &mut Vec<f32>) {
    let segments = ellipse_segments(e.half_width, e.half_height);
    ring(e.x, e.y, e.half_width, e.half_height, segments, out);
}

fn rectangle(r: &Rectangle, out: &mut Vec<f32>) {
    out.extend_from_slice(&[
        r.left(),
        r.top(),
        r.right(),
        r.top(),
        r.right(),
        r.bottom(),
        r.left(),
        r.bottom(),
    ]);
}

fn rounded_rectangle(rr: &RoundedRectangle, out: &mut Vec<f32>) {
    let r = rr.effective_radius();
    if r <= 0.0 {
        rectangle(&rr.bounds(), out);
        return;
    }
    let (x, y, w, h) = (rr.x, rr.y, rr.width, rr.height);
    // corner centers, clockwise from top-right, each with its start angle
    let corners = [
        (x + w - r, y + r, -TAU / 4.0),
        (x + w - r, y + h - r, 0.0),
        (x + r, y + h - r, TAU / 4.0),
        (x + r, y + r, TAU / 2.0),
    ];
    for (cx, cy, start) in corners {
        for i in 0..=CORNER_SEGMENTS {
            let angle = start + TAU / 4.0 * (i as f32 / CORNER_SEGMENTS as f32);
            out.push(cx + angle.cos() * r);
            out.push(cy + angle.sin() * r);
        }
    }
}

/// Closed outline of any shape.
pub fn outline(shape: &Shape) -> Vec<f32> {
    let mut out = Vec::new();
    match shape {
        Shape::Rectangle(r) => rectangle(r, &mut out),
        Shape::Circle(c) => circle(c, &mut out),
        Shape::Ellipse(e) => ellipse(e, &mut out),
        Shape::RoundedRectangle(rr) => rounded_rectangle(rr, &mut out),
        Shape::Polygon(p) => out.extend_from_slice(&p.points),
    }
    out
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
