use crate::geometry::{Point2, Vector2};
use crate::primitive::GeometricPrimitive;
use crate::trajectory::Trajectory;

/// 轨迹方向指示箭头，仅用于显示，不影响数据模型。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionIndicator {
    /// 几何中心。
    pub anchor: Point2,
    /// 单位方向向量。
    pub direction: Vector2,
    pub arrow_start: Point2,
    pub arrow_end: Point2,
}

/// 计算方向指示；点数不足、方向为零或箭头退化时返回 `None`（正常情况，不是错误）。
pub fn direction_indicator(trajectory: &Trajectory, arrow_length: f64) -> Option<DirectionIndicator> {
    let points = trajectory.points();
    if points.len() < 2 {
        return None;
    }

    let sample = match trajectory.primitive() {
        GeometricPrimitive::Line { .. } => {
            Vector2::from_points(points[0], points[points.len() - 1])
        }
        GeometricPrimitive::Arc { .. } | GeometricPrimitive::Circle { .. } => {
            Vector2::from_points(points[0], points[1])
        }
    };
    let direction = sample.normalize()?;

    let anchor = trajectory.primitive().anchor();
    let arrow_end = anchor.translate(direction.scale(arrow_length));
    let arrow = Vector2::from_points(anchor, arrow_end);
    let arrow_length_squared = arrow.length_squared();
    if arrow_length_squared.is_nan() || arrow_length_squared <= f64::EPSILON {
        return None;
    }

    Some(DirectionIndicator {
        anchor,
        direction,
        arrow_start: anchor,
        arrow_end,
    })
}
