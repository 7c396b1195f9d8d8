pub mod indicator;
pub mod pass;
pub mod path;
pub mod primitive;
pub mod trajectory;

pub mod geometry {
    use glam::{DVec2, DVec3};
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，轨迹点序列均使用该类型。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn midpoint(self, other: Point2) -> Point2 {
            Self((self.0 + other.0) * 0.5)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量，用于方向指示等显示计算。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        /// 单位化；零长度向量返回 None。
        #[inline]
        pub fn normalize(self) -> Option<Self> {
            let len = self.0.length();
            if len <= f64::EPSILON {
                None
            } else {
                Some(Self(self.0 / len))
            }
        }

        #[inline]
        pub fn scale(self, factor: f64) -> Self {
            Self(self.0 * factor)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 持久化格式中三维坐标统一写作 `{"X":..,"Y":..,"Z":..}`，读取时键名不区分大小写。
    #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
    struct Xyz {
        #[serde(rename = "X", alias = "x")]
        x: f64,
        #[serde(rename = "Y", alias = "y")]
        y: f64,
        #[serde(rename = "Z", alias = "z")]
        z: f64,
    }

    /// 三维点。图纸实体保留 Z 值，轨迹生成只使用 XY 平面。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    #[serde(from = "Xyz", into = "Xyz")]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        /// 投影到 XY 平面。
        #[inline]
        pub fn xy(self) -> Point2 {
            Point2::new(self.0.x, self.0.y)
        }

        /// 到坐标原点的欧氏距离平方。
        #[inline]
        pub fn distance_squared_to_origin(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }

        #[inline]
        pub fn abs_diff_eq(self, other: Point3, tolerance: f64) -> bool {
            self.0.abs_diff_eq(other.0, tolerance)
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    impl From<Xyz> for Point3 {
        fn from(value: Xyz) -> Self {
            Self::new(value.x, value.y, value.z)
        }
    }

    impl From<Point3> for Xyz {
        fn from(value: Point3) -> Self {
            Xyz {
                x: value.x(),
                y: value.y(),
                z: value.z(),
            }
        }
    }

    /// 三维向量，用于圆弧/圆的拉伸方向（法向）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    #[serde(from = "Xyz", into = "Xyz")]
    pub struct Vector3(pub DVec3);

    impl Vector3 {
        /// DXF 默认拉伸方向 (0, 0, 1)。
        pub const Z_AXIS: Vector3 = Vector3(DVec3::Z);

        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }

        #[inline]
        pub fn abs_diff_eq(self, other: Vector3, tolerance: f64) -> bool {
            self.0.abs_diff_eq(other.0, tolerance)
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }
    }

    impl From<DVec3> for Vector3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    impl From<Xyz> for Vector3 {
        fn from(value: Xyz) -> Self {
            Self::new(value.x, value.y, value.z)
        }
    }

    impl From<Vector3> for Xyz {
        fn from(value: Vector3) -> Self {
            Xyz {
                x: value.x(),
                y: value.y(),
                z: value.z(),
            }
        }
    }

    /// 轴对齐边界框，用于估算图纸/轨迹范围。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            self.min.midpoint(self.max)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn point3_uses_uppercase_keys() {
            let json = serde_json::to_value(Point3::new(1.0, 2.0, 3.0)).unwrap();
            assert_eq!(json, serde_json::json!({"X": 1.0, "Y": 2.0, "Z": 3.0}));
        }

        #[test]
        fn point3_reads_keys_case_insensitively() {
            let point: Point3 = serde_json::from_str(r#"{"x": 4.0, "Y": 5.0, "z": -1.5}"#).unwrap();
            assert_eq!(point, Point3::new(4.0, 5.0, -1.5));

            let normal: Vector3 = serde_json::from_str(r#"{"x": 0, "y": 0, "z": 1}"#).unwrap();
            assert_eq!(normal, Vector3::Z_AXIS);
        }

        #[test]
        fn zero_vector_does_not_normalize() {
            assert!(Vector2::new(0.0, 0.0).normalize().is_none());
            let unit = Vector2::new(3.0, 4.0).normalize().expect("non-zero vector");
            assert!((unit.x() - 0.6).abs() < 1e-12);
            assert!((unit.y() - 0.8).abs() < 1e-12);
        }

        #[test]
        fn bounds_grow_with_points() {
            let mut bounds = Bounds2D::empty();
            assert!(bounds.is_empty());
            bounds.include_point(Point2::new(1.0, -2.0));
            bounds.include_point(Point2::new(-3.0, 4.0));
            assert_eq!(bounds.min(), Point2::new(-3.0, -2.0));
            assert_eq!(bounds.max(), Point2::new(1.0, 4.0));
            assert_eq!(bounds.center(), Point2::new(-1.0, 1.0));
        }
    }
}

pub mod drawing {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point3, Vector3};
    use crate::primitive::GeometricPrimitive;

    /// 导入图纸中实体的稳定标识，轨迹仅以此回溯来源实体。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于序列化或日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point3,
        pub end: Point3,
        pub layer: String,
    }

    /// 圆弧实体，角度以度为单位储存（与 DXF 一致），不做归一化。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point3,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
        pub normal: Vector3,
        pub layer: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point3,
        pub radius: f64,
        pub normal: Vector3,
        pub layer: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        Arc(Arc),
        Circle(Circle),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Line(line) => &line.layer,
                Entity::Arc(arc) => &arc.layer,
                Entity::Circle(circle) => &circle.layer,
            }
        }

        #[inline]
        pub fn type_name(&self) -> &'static str {
            match self {
                Entity::Line(_) => "Line",
                Entity::Arc(_) => "Arc",
                Entity::Circle(_) => "Circle",
            }
        }

        /// 按图纸原样取出几何描述，不做端点规范化。
        pub fn as_primitive(&self) -> GeometricPrimitive {
            match self {
                Entity::Line(line) => GeometricPrimitive::Line {
                    start: line.start,
                    end: line.end,
                },
                Entity::Arc(arc) => GeometricPrimitive::Arc {
                    center: arc.center,
                    radius: arc.radius,
                    start_angle_deg: arc.start_angle,
                    end_angle_deg: arc.end_angle,
                    normal: arc.normal,
                },
                Entity::Circle(circle) => GeometricPrimitive::Circle {
                    center: circle.center,
                    radius: circle.radius,
                    normal: circle.normal,
                },
            }
        }

        pub fn bounds(&self) -> Option<Bounds2D> {
            let bounds = self.as_primitive().bounds();
            if bounds.is_empty() { None } else { Some(bounds) }
        }
    }

    /// 导入后的图纸。实体按导入顺序保存，ID 单调递增且不复用。
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct Drawing {
        entities: Vec<(EntityId, Entity)>,
        next_entity_id: u64,
        #[serde(default)]
        skipped: BTreeMap<String, usize>,
    }

    impl Drawing {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_line(
            &mut self,
            start: Point3,
            end: Point3,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::Line(Line {
                start,
                end,
                layer: layer.into(),
            }))
        }

        pub fn add_arc(
            &mut self,
            center: Point3,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            normal: Vector3,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::Arc(Arc {
                center,
                radius,
                start_angle,
                end_angle,
                normal,
                layer: layer.into(),
            }))
        }

        pub fn add_circle(
            &mut self,
            center: Point3,
            radius: f64,
            normal: Vector3,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::Circle(Circle {
                center,
                radius,
                normal,
                layer: layer.into(),
            }))
        }

        pub fn add_entity(&mut self, entity: Entity) -> EntityId {
            let id = self.next_id();
            self.entities.push((id, entity));
            id
        }

        pub fn entity(&self, id: EntityId) -> Option<&Entity> {
            self.entities
                .iter()
                .find(|(entity_id, _)| *entity_id == id)
                .map(|(_, entity)| entity)
        }

        #[inline]
        pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
            self.entities.iter().map(|(id, entity)| (*id, entity))
        }

        #[inline]
        pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
            self.entities.iter().map(|(id, _)| *id)
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.entities.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entities.is_empty()
        }

        /// 记录导入时跳过的实体类型（例如 TEXT、HATCH）。
        pub fn record_skipped(&mut self, kind: impl Into<String>) {
            *self.skipped.entry(kind.into()).or_insert(0) += 1;
        }

        pub fn skipped(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
            self.skipped.iter().map(|(kind, count)| (kind.as_str(), *count))
        }

        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            let mut has = false;
            for (_, entity) in &self.entities {
                if let Some(entity_bounds) = entity.bounds() {
                    bounds.include_bounds(&entity_bounds);
                    has = true;
                }
            }
            if has { Some(bounds) } else { None }
        }

        #[inline]
        fn next_id(&mut self) -> EntityId {
            let id = self.next_entity_id;
            self.next_entity_id += 1;
            EntityId(id)
        }
    }

}

pub mod errors {
    use thiserror::Error;

    /// 喷涂道次管理中可恢复的校验错误，均不应导致进程退出。
    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum PassError {
        #[error("no spray pass is active")]
        NoActivePass,
        #[error("at least one spray pass must remain")]
        CannotRemoveLastPass,
        #[error("cannot move trajectory from position {from} to {to}")]
        InvalidReorderTarget { from: usize, to: usize },
        #[error("spray pass {0} not found")]
        PassNotFound(usize),
        #[error("trajectory {0} not found")]
        TrajectoryNotFound(usize),
    }
}
