//! 几何描述到有序点序列的离散化。
//!
//! 所有函数均为纯函数：相同输入得到相同输出，退化输入返回空序列而不是错误。

use crate::geometry::Point2;
use crate::primitive::{GeometricPrimitive, point_on_circle};

/// 角度比较容差（度）。
pub const ANGLE_TOLERANCE_DEG: f64 = 1e-5;
/// 圆闭合判定容差（图纸单位，X/Y 分别比较）。
pub const CLOSURE_TOLERANCE: f64 = 1e-3;

const FULL_TURN_DEG: f64 = 360.0;
/// 单条圆弧/圆允许的最大步数，超过时视为退化输入。
pub const MAX_PATH_STEPS: f64 = 1_000_000.0;

/// 将几何描述转换为有序点序列。
///
/// `resolution_degrees` 只影响圆弧与圆；不是正的有限值、或步数超过
/// [`MAX_PATH_STEPS`] 时圆弧/圆返回空序列。角度不是有限值的圆弧同样返回空序列。
/// 圆忽略 `is_reversed`：闭合曲线的方向约定固定为从 0° 逆时针。
pub fn generate(
    primitive: &GeometricPrimitive,
    is_reversed: bool,
    resolution_degrees: f64,
) -> Vec<Point2> {
    match primitive {
        GeometricPrimitive::Line { start, end } => {
            if is_reversed {
                vec![end.xy(), start.xy()]
            } else {
                vec![start.xy(), end.xy()]
            }
        }
        GeometricPrimitive::Arc {
            center,
            radius,
            start_angle_deg,
            end_angle_deg,
            ..
        } => {
            if !is_valid_resolution(resolution_degrees) {
                return Vec::new();
            }
            let (start, sweep) = effective_sweep(*start_angle_deg, *end_angle_deg, is_reversed);
            let is_degenerate = !start.is_finite()
                || !sweep.is_finite()
                || exceeds_step_limit(sweep, resolution_degrees);
            if is_degenerate {
                return Vec::new();
            }
            arc_points(center.xy(), *radius, start, sweep, resolution_degrees)
        }
        GeometricPrimitive::Circle { center, radius, .. } => {
            if !is_valid_resolution(resolution_degrees)
                || exceeds_step_limit(FULL_TURN_DEG, resolution_degrees)
            {
                return Vec::new();
            }
            circle_points(center.xy(), *radius, resolution_degrees)
        }
    }
}

/// 返回 `(起始角, 扫掠角)`，扫掠角总是非负（逆时针）。
///
/// 反向时先交换起止角，再计算扫掠，因此反向改变的是扫过的那一侧圆弧，
/// 而不只是点的排列顺序。起止角相差 360° 的整数倍（且不相等）视为整圆。
pub fn effective_sweep(start_angle_deg: f64, end_angle_deg: f64, is_reversed: bool) -> (f64, f64) {
    let (start, end) = if is_reversed {
        (end_angle_deg, start_angle_deg)
    } else {
        (start_angle_deg, end_angle_deg)
    };

    let raw = end - start;
    let sweep = if raw < 0.0 {
        let wrapped = raw.rem_euclid(FULL_TURN_DEG);
        if wrapped < ANGLE_TOLERANCE_DEG || FULL_TURN_DEG - wrapped < ANGLE_TOLERANCE_DEG {
            FULL_TURN_DEG
        } else {
            wrapped
        }
    } else if raw > FULL_TURN_DEG + ANGLE_TOLERANCE_DEG {
        let wrapped = raw.rem_euclid(FULL_TURN_DEG);
        if wrapped < ANGLE_TOLERANCE_DEG {
            FULL_TURN_DEG
        } else {
            wrapped
        }
    } else {
        raw
    };
    (start, sweep)
}

#[inline]
fn is_valid_resolution(resolution_degrees: f64) -> bool {
    resolution_degrees.is_finite() && resolution_degrees > 0.0
}

#[inline]
fn exceeds_step_limit(sweep: f64, resolution_degrees: f64) -> bool {
    sweep / resolution_degrees > MAX_PATH_STEPS
}

fn arc_points(
    center: Point2,
    radius: f64,
    start: f64,
    sweep: f64,
    resolution_degrees: f64,
) -> Vec<Point2> {
    let mut points = Vec::with_capacity(estimated_len(sweep, resolution_degrees) + 1);
    let mut step = 0_u64;
    loop {
        // 按步数相乘而不是累加，避免误差累积；最后一步钳制到终止角。
        let mut offset = step as f64 * resolution_degrees;
        let is_last = offset >= sweep - ANGLE_TOLERANCE_DEG;
        if is_last {
            offset = sweep;
        }
        points.push(point_on_circle(center, radius, start + offset));
        if is_last {
            break;
        }
        step += 1;
    }
    points
}

fn circle_points(center: Point2, radius: f64, resolution_degrees: f64) -> Vec<Point2> {
    let mut points = Vec::with_capacity(estimated_len(FULL_TURN_DEG, resolution_degrees) + 1);
    let mut step = 0_u64;
    loop {
        let angle = step as f64 * resolution_degrees;
        if step > 0 && angle >= FULL_TURN_DEG - ANGLE_TOLERANCE_DEG {
            break;
        }
        points.push(point_on_circle(center, radius, angle));
        step += 1;
    }

    let closing = point_on_circle(center, radius, 0.0);
    if let Some(last) = points.last().copied() {
        let closed = (last.x() - closing.x()).abs() <= CLOSURE_TOLERANCE
            && (last.y() - closing.y()).abs() <= CLOSURE_TOLERANCE;
        if !closed {
            points.push(closing);
        }
    }
    points
}

#[inline]
fn estimated_len(sweep: f64, resolution_degrees: f64) -> usize {
    let steps = (sweep / resolution_degrees).ceil();
    if steps.is_finite() && steps > 0.0 {
        (steps as usize).min(1 << 16)
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point3, Vector3};

    fn assert_point(actual: Point2, x: f64, y: f64) {
        assert!(
            (actual.x() - x).abs() < 1e-9 && (actual.y() - y).abs() < 1e-9,
            "expected ({x}, {y}), got ({}, {})",
            actual.x(),
            actual.y()
        );
    }

    fn angle_of(point: Point2, center: Point2) -> f64 {
        let v = point.as_vec2() - center.as_vec2();
        v.y.atan2(v.x).to_degrees().rem_euclid(360.0)
    }

    fn angle_diff(a: f64, b: f64) -> f64 {
        let diff = (a - b).rem_euclid(360.0);
        diff.min(360.0 - diff)
    }

    fn arc(start: f64, end: f64) -> GeometricPrimitive {
        GeometricPrimitive::Arc {
            center: Point3::new(0.0, 0.0, 0.0),
            radius: 5.0,
            start_angle_deg: start,
            end_angle_deg: end,
            normal: Vector3::Z_AXIS,
        }
    }

    fn unit_circle() -> GeometricPrimitive {
        GeometricPrimitive::Circle {
            center: Point3::new(0.0, 0.0, 0.0),
            radius: 1.0,
            normal: Vector3::Z_AXIS,
        }
    }

    #[test]
    fn line_follows_direction_flag() {
        let line = GeometricPrimitive::Line {
            start: Point3::new(0.0, 0.0, 0.0),
            end: Point3::new(10.0, 0.0, 0.0),
        };
        let forward = generate(&line, false, 15.0);
        assert_eq!(forward, vec![Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)]);

        let reversed = generate(&line, true, 15.0);
        assert_eq!(reversed, vec![Point2::new(10.0, 0.0), Point2::new(0.0, 0.0)]);
    }

    #[test]
    fn reversed_line_is_mirror_of_forward_for_any_resolution() {
        let line = GeometricPrimitive::Line {
            start: Point3::new(-3.5, 2.0, 1.0),
            end: Point3::new(7.25, -1.0, 4.0),
        };
        for resolution in [0.0, -1.0, 0.5, 15.0, f64::NAN] {
            let mut forward = generate(&line, false, resolution);
            forward.reverse();
            assert_eq!(generate(&line, true, resolution), forward);
        }
    }

    #[test]
    fn quarter_arc_has_seven_points() {
        let points = generate(&arc(0.0, 90.0), false, 15.0);
        assert_eq!(points.len(), 7);
        assert_point(points[0], 5.0, 0.0);
        assert_point(points[6], 0.0, 5.0);
        for (i, point) in points.iter().enumerate() {
            let expected = (i as f64 * 15.0).to_radians();
            assert_point(*point, 5.0 * expected.cos(), 5.0 * expected.sin());
        }
    }

    #[test]
    fn arc_endpoint_is_clamped_when_resolution_does_not_divide_sweep() {
        let points = generate(&arc(10.0, 100.0), false, 25.0);
        // 10, 35, 60, 85, 100
        assert_eq!(points.len(), 5);
        let center = Point2::new(0.0, 0.0);
        assert!((angle_of(points[0], center) - 10.0).abs() < 1e-9);
        assert!((angle_of(points[3], center) - 85.0).abs() < 1e-9);
        assert!((angle_of(points[4], center) - 100.0).abs() < ANGLE_TOLERANCE_DEG);
    }

    #[test]
    fn reversed_arc_sweeps_the_complementary_side() {
        let forward = generate(&arc(0.0, 90.0), false, 30.0);
        let reversed = generate(&arc(0.0, 90.0), true, 30.0);
        // 正向 0..90 共 4 点；反向从 90 逆时针扫到 360 共 270°，10 点。
        assert_eq!(forward.len(), 4);
        assert_eq!(reversed.len(), 10);
        assert_point(reversed[0], 0.0, 5.0);
        assert_point(reversed[1], 5.0 * 120f64.to_radians().cos(), 5.0 * 120f64.to_radians().sin());
        assert_point(*reversed.last().unwrap(), 5.0, 0.0);
    }

    #[test]
    fn arc_crossing_zero_degrees_wraps_forward() {
        let points = generate(&arc(350.0, 10.0), false, 5.0);
        assert_eq!(points.len(), 5);
        let center = Point2::new(0.0, 0.0);
        assert!((angle_of(points[0], center) - 350.0).abs() < 1e-9);
        assert!(angle_diff(angle_of(points[2], center), 0.0) < 1e-9);
        assert!((angle_of(points[4], center) - 10.0).abs() < ANGLE_TOLERANCE_DEG);
    }

    #[test]
    fn arc_lands_on_effective_endpoints_for_both_directions() {
        let center = Point2::new(0.0, 0.0);
        for (start, end) in [(0.0, 90.0), (350.0, 10.0), (45.0, 44.0), (-30.0, 200.0), (120.0, 480.5)] {
            for reversed in [false, true] {
                for resolution in [1.0, 7.0, 13.3, 90.0, 400.0] {
                    let points = generate(&arc(start, end), reversed, resolution);
                    let (eff_start, sweep) = effective_sweep(start, end, reversed);
                    let first = angle_of(points[0], center);
                    let last = angle_of(*points.last().unwrap(), center);
                    let expected_first = eff_start.rem_euclid(360.0);
                    let expected_last = (eff_start + sweep).rem_euclid(360.0);
                    assert!(angle_diff(first, expected_first) < 1e-9);
                    assert!(angle_diff(last, expected_last) < ANGLE_TOLERANCE_DEG);
                }
            }
        }
    }

    #[test]
    fn full_turn_arc_is_not_collapsed() {
        let (_, sweep) = effective_sweep(0.0, 360.0, false);
        assert!((sweep - 360.0).abs() < f64::EPSILON);
        let (_, sweep) = effective_sweep(0.0, 360.0, true);
        assert!((sweep - 360.0).abs() < f64::EPSILON);
        let (_, sweep) = effective_sweep(30.0, 30.0, false);
        assert_eq!(sweep, 0.0);
    }

    #[test]
    fn non_positive_resolution_yields_empty_path() {
        assert!(generate(&arc(0.0, 90.0), false, 0.0).is_empty());
        assert!(generate(&arc(0.0, 90.0), true, -5.0).is_empty());
        assert!(generate(&unit_circle(), false, 0.0).is_empty());
        assert!(generate(&unit_circle(), false, f64::INFINITY).is_empty());
    }

    #[test]
    fn non_finite_angles_yield_empty_path() {
        for reversed in [false, true] {
            assert!(generate(&arc(0.0, f64::INFINITY), reversed, 5.0).is_empty());
            assert!(generate(&arc(f64::NEG_INFINITY, 90.0), reversed, 5.0).is_empty());
            assert!(generate(&arc(f64::NAN, 90.0), reversed, 5.0).is_empty());
            assert!(generate(&arc(0.0, f64::NAN), reversed, 5.0).is_empty());
        }
    }

    #[test]
    fn step_count_above_limit_yields_empty_path() {
        assert!(generate(&arc(0.0, 90.0), false, 1e-9).is_empty());
        assert!(generate(&unit_circle(), false, 1e-9).is_empty());
        // 刚好在上限以内仍然离散化
        let fine = FULL_TURN_DEG / MAX_PATH_STEPS;
        assert!(!generate(&arc(0.0, 1.0), false, fine).is_empty());
    }

    #[test]
    fn circle_at_right_angles_ends_on_its_start_point() {
        let points = generate(&unit_circle(), false, 90.0);
        assert_eq!(points.len(), 5);
        assert_point(points[0], 1.0, 0.0);
        assert_point(points[1], 0.0, 1.0);
        assert_point(points[2], -1.0, 0.0);
        assert_point(points[3], 0.0, -1.0);
        assert_point(points[4], 1.0, 0.0);
    }

    #[test]
    fn circle_point_count_and_closure() {
        for resolution in [1.0, 7.0, 45.0, 100.0, 13.7, 360.0, 500.0] {
            let points = generate(&unit_circle(), false, resolution);
            let expected = (360.0_f64 / resolution).ceil() as usize;
            assert!(
                points.len() == expected || points.len() == expected + 1,
                "resolution {resolution}: {} points",
                points.len()
            );
            let first = points[0];
            let last = *points.last().unwrap();
            assert_point(first, 1.0, 0.0);
            assert!((last.x() - first.x()).abs() <= CLOSURE_TOLERANCE);
            assert!((last.y() - first.y()).abs() <= CLOSURE_TOLERANCE);
        }

        let uneven = generate(&unit_circle(), false, 100.0);
        // 0, 100, 200, 300 + 显式补上的 0° 闭合点
        assert_eq!(uneven.len(), 5);
        let last = *uneven.last().unwrap();
        assert!((last.x() - 1.0).abs() <= CLOSURE_TOLERANCE);
        assert!(last.y().abs() <= CLOSURE_TOLERANCE);
    }

    #[test]
    fn circle_ignores_reversal() {
        assert_eq!(
            generate(&unit_circle(), true, 30.0),
            generate(&unit_circle(), false, 30.0)
        );
    }
}
