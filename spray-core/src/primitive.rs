use serde::{Deserialize, Serialize};

use crate::drawing::Entity;
use crate::geometry::{Bounds2D, Point2, Point3, Vector2, Vector3};
use crate::path::effective_sweep;

/// 与文件格式无关的几何描述。角度单位为度，允许未归一化的值。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "primitive_type")]
pub enum GeometricPrimitive {
    Line {
        start: Point3,
        end: Point3,
    },
    Arc {
        center: Point3,
        radius: f64,
        #[serde(rename = "start_angle")]
        start_angle_deg: f64,
        #[serde(rename = "end_angle")]
        end_angle_deg: f64,
        normal: Vector3,
    },
    Circle {
        center: Point3,
        radius: f64,
        normal: Vector3,
    },
}

impl GeometricPrimitive {
    /// 从图纸实体生成快照。
    ///
    /// 线段会被规范化：离原点较近（距离平方）的端点作为起点，距离相等时保留原起点。
    /// 因此调用方不能假设图纸中声明的端点顺序会被保留。
    pub fn snapshot(entity: &Entity) -> Self {
        match entity.as_primitive() {
            GeometricPrimitive::Line { start, end }
                if end.distance_squared_to_origin() < start.distance_squared_to_origin() =>
            {
                GeometricPrimitive::Line {
                    start: end,
                    end: start,
                }
            }
            primitive => primitive,
        }
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            GeometricPrimitive::Line { .. } => "Line",
            GeometricPrimitive::Arc { .. } => "Arc",
            GeometricPrimitive::Circle { .. } => "Circle",
        }
    }

    /// 所有坐标、角度与法向分量必须是有限值，圆弧/圆的半径还必须为正。
    pub fn is_valid(&self) -> bool {
        match self {
            GeometricPrimitive::Line { start, end } => start.is_finite() && end.is_finite(),
            GeometricPrimitive::Arc {
                center,
                radius,
                start_angle_deg,
                end_angle_deg,
                normal,
            } => {
                is_valid_radius(*radius)
                    && center.is_finite()
                    && normal.is_finite()
                    && start_angle_deg.is_finite()
                    && end_angle_deg.is_finite()
            }
            GeometricPrimitive::Circle {
                center,
                radius,
                normal,
            } => is_valid_radius(*radius) && center.is_finite() && normal.is_finite(),
        }
    }

    /// 几何中心：线段取端点中点，圆弧/圆取圆心。
    pub fn anchor(&self) -> Point2 {
        match self {
            GeometricPrimitive::Line { start, end } => start.xy().midpoint(end.xy()),
            GeometricPrimitive::Arc { center, .. } | GeometricPrimitive::Circle { center, .. } => {
                center.xy()
            }
        }
    }

    /// 判断两份快照是否描述同一几何，用于加载配置后回溯来源实体。
    pub fn approx_eq(&self, other: &GeometricPrimitive, tolerance: f64) -> bool {
        match (self, other) {
            (
                GeometricPrimitive::Line { start, end },
                GeometricPrimitive::Line {
                    start: other_start,
                    end: other_end,
                },
            ) => start.abs_diff_eq(*other_start, tolerance) && end.abs_diff_eq(*other_end, tolerance),
            (
                GeometricPrimitive::Arc {
                    center,
                    radius,
                    start_angle_deg,
                    end_angle_deg,
                    normal,
                },
                GeometricPrimitive::Arc {
                    center: other_center,
                    radius: other_radius,
                    start_angle_deg: other_start,
                    end_angle_deg: other_end,
                    normal: other_normal,
                },
            ) => {
                center.abs_diff_eq(*other_center, tolerance)
                    && (radius - other_radius).abs() <= tolerance
                    && (start_angle_deg - other_start).abs() <= tolerance
                    && (end_angle_deg - other_end).abs() <= tolerance
                    && normal.abs_diff_eq(*other_normal, tolerance)
            }
            (
                GeometricPrimitive::Circle {
                    center,
                    radius,
                    normal,
                },
                GeometricPrimitive::Circle {
                    center: other_center,
                    radius: other_radius,
                    normal: other_normal,
                },
            ) => {
                center.abs_diff_eq(*other_center, tolerance)
                    && (radius - other_radius).abs() <= tolerance
                    && normal.abs_diff_eq(*other_normal, tolerance)
            }
            _ => false,
        }
    }

    /// XY 平面内的轴对齐范围，圆弧会计入扫过的象限极值点。
    pub fn bounds(&self) -> Bounds2D {
        let mut bounds = Bounds2D::empty();
        match self {
            GeometricPrimitive::Line { start, end } => {
                bounds.include_point(start.xy());
                bounds.include_point(end.xy());
            }
            GeometricPrimitive::Circle { center, radius, .. } => {
                let radius = radius.abs();
                let center = center.xy();
                bounds.include_point(Point2::new(center.x() - radius, center.y() - radius));
                bounds.include_point(Point2::new(center.x() + radius, center.y() + radius));
            }
            GeometricPrimitive::Arc {
                center,
                radius,
                start_angle_deg,
                end_angle_deg,
                ..
            } => {
                let center = center.xy();
                let radius = radius.abs();
                if radius <= f64::EPSILON {
                    bounds.include_point(center);
                    return bounds;
                }
                // 与离散化使用同一扫掠规则：起止角相同时只有一个点。
                let (start, sweep) = effective_sweep(*start_angle_deg, *end_angle_deg, false);
                let start = start.rem_euclid(360.0);
                let end = start + sweep;
                bounds.include_point(point_on_circle(center, radius, start));
                bounds.include_point(point_on_circle(center, radius, end));
                for quadrant in [0.0, 90.0, 180.0, 270.0, 360.0, 450.0, 540.0, 630.0] {
                    if quadrant > start && quadrant < end {
                        bounds.include_point(point_on_circle(center, radius, quadrant));
                    }
                }
            }
        }
        bounds
    }
}

#[inline]
fn is_valid_radius(radius: f64) -> bool {
    radius.is_finite() && radius > 0.0
}

/// 圆周上给定角度（度）的点，只在 XY 平面计算。
#[inline]
pub(crate) fn point_on_circle(center: Point2, radius: f64, angle_deg: f64) -> Point2 {
    let radians = angle_deg.to_radians();
    center.translate(Vector2::new(radius * radians.cos(), radius * radians.sin()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::{Circle, Line};

    fn line(start: Point3, end: Point3) -> Entity {
        Entity::Line(Line {
            start,
            end,
            layer: "0".to_string(),
        })
    }

    #[test]
    fn line_snapshot_starts_at_endpoint_nearest_origin() {
        let entity = line(Point3::new(10.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0));
        match GeometricPrimitive::snapshot(&entity) {
            GeometricPrimitive::Line { start, end } => {
                assert_eq!(start, Point3::new(1.0, 1.0, 0.0));
                assert_eq!(end, Point3::new(10.0, 0.0, 0.0));
            }
            other => panic!("expected line, got {other:?}"),
        }
    }

    #[test]
    fn line_snapshot_keeps_declared_order_on_tie() {
        let entity = line(Point3::new(0.0, 5.0, 0.0), Point3::new(5.0, 0.0, 0.0));
        assert_eq!(
            GeometricPrimitive::snapshot(&entity),
            GeometricPrimitive::Line {
                start: Point3::new(0.0, 5.0, 0.0),
                end: Point3::new(5.0, 0.0, 0.0),
            }
        );
    }

    #[test]
    fn circle_snapshot_is_verbatim() {
        let entity = Entity::Circle(Circle {
            center: Point3::new(3.0, 4.0, 1.0),
            radius: 2.5,
            normal: Vector3::new(0.0, 0.0, -1.0),
            layer: "0".to_string(),
        });
        assert_eq!(
            GeometricPrimitive::snapshot(&entity),
            GeometricPrimitive::Circle {
                center: Point3::new(3.0, 4.0, 1.0),
                radius: 2.5,
                normal: Vector3::new(0.0, 0.0, -1.0),
            }
        );
    }

    #[test]
    fn arc_bounds_cover_crossed_quadrants() {
        let arc = GeometricPrimitive::Arc {
            center: Point3::new(0.0, 0.0, 0.0),
            radius: 2.0,
            start_angle_deg: 315.0,
            end_angle_deg: 45.0,
            normal: Vector3::Z_AXIS,
        };
        let bounds = arc.bounds();
        assert!((bounds.max().x() - 2.0).abs() < 1e-9);
        assert!((bounds.min().x() - 2.0_f64.sqrt()).abs() < 1e-9);
        assert!((bounds.max().y() - 2.0_f64.sqrt()).abs() < 1e-9);
        assert!((bounds.min().y() + 2.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn arc_with_equal_angles_bounds_a_single_point() {
        let arc = GeometricPrimitive::Arc {
            center: Point3::new(1.0, 1.0, 0.0),
            radius: 2.0,
            start_angle_deg: 90.0,
            end_angle_deg: 90.0,
            normal: Vector3::Z_AXIS,
        };
        let bounds = arc.bounds();
        assert!((bounds.min().x() - 1.0).abs() < 1e-9);
        assert!((bounds.max().x() - 1.0).abs() < 1e-9);
        assert!((bounds.min().y() - 3.0).abs() < 1e-9);
        assert!((bounds.max().y() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn full_turn_arc_bounds_cover_the_whole_circle() {
        let arc = GeometricPrimitive::Arc {
            center: Point3::new(0.0, 0.0, 0.0),
            radius: 1.0,
            start_angle_deg: 45.0,
            end_angle_deg: 405.0,
            normal: Vector3::Z_AXIS,
        };
        let bounds = arc.bounds();
        assert!((bounds.min().x() + 1.0).abs() < 1e-9);
        assert!((bounds.max().x() - 1.0).abs() < 1e-9);
        assert!((bounds.min().y() + 1.0).abs() < 1e-9);
        assert!((bounds.max().y() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_geometry_is_invalid() {
        let arc = |start: f64, end: f64, center: Point3| GeometricPrimitive::Arc {
            center,
            radius: 1.0,
            start_angle_deg: start,
            end_angle_deg: end,
            normal: Vector3::Z_AXIS,
        };
        let origin = Point3::new(0.0, 0.0, 0.0);
        assert!(arc(0.0, 90.0, origin).is_valid());
        assert!(!arc(0.0, f64::INFINITY, origin).is_valid());
        assert!(!arc(f64::NAN, 90.0, origin).is_valid());
        assert!(!arc(0.0, 90.0, Point3::new(f64::NAN, 0.0, 0.0)).is_valid());

        let circle = GeometricPrimitive::Circle {
            center: Point3::new(0.0, f64::INFINITY, 0.0),
            radius: 1.0,
            normal: Vector3::Z_AXIS,
        };
        assert!(!circle.is_valid());

        let line = GeometricPrimitive::Line {
            start: Point3::new(0.0, 0.0, 0.0),
            end: Point3::new(1.0, f64::NAN, 0.0),
        };
        assert!(!line.is_valid());
    }

    #[test]
    fn non_positive_radius_is_invalid() {
        let circle = GeometricPrimitive::Circle {
            center: Point3::new(0.0, 0.0, 0.0),
            radius: 0.0,
            normal: Vector3::Z_AXIS,
        };
        assert!(!circle.is_valid());
    }

    #[test]
    fn serialized_primitive_is_tagged_by_type() {
        let arc = GeometricPrimitive::Arc {
            center: Point3::new(1.0, 2.0, 0.0),
            radius: 5.0,
            start_angle_deg: 0.0,
            end_angle_deg: 90.0,
            normal: Vector3::Z_AXIS,
        };
        let json = serde_json::to_value(arc).unwrap();
        assert_eq!(json["primitive_type"], "Arc");
        assert_eq!(json["center"]["X"], 1.0);
        assert_eq!(json["start_angle"], 0.0);
        assert_eq!(json["end_angle"], 90.0);
        assert_eq!(json["normal"]["Z"], 1.0);
    }
}
