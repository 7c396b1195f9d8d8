use crate::drawing::{Entity, EntityId};
use crate::geometry::{Bounds2D, Point2};
use crate::path;
use crate::primitive::GeometricPrimitive;

/// 上/下喷嘴。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NozzleSide {
    Upper,
    Lower,
}

impl NozzleSide {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "upper" => Some(NozzleSide::Upper),
            "lower" => Some(NozzleSide::Lower),
            _ => None,
        }
    }
}

/// 单个喷嘴的开关状态。关闭喷嘴时气/液随之关闭。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NozzleState {
    enabled: bool,
    gas_on: bool,
    liquid_on: bool,
}

impl NozzleState {
    /// 按原样组装（例如从持久化数据恢复），仍然遵守“未启用则气/液关闭”。
    pub fn new(enabled: bool, gas_on: bool, liquid_on: bool) -> Self {
        Self {
            enabled,
            gas_on: enabled && gas_on,
            liquid_on: enabled && liquid_on,
        }
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn gas_on(&self) -> bool {
        self.gas_on
    }

    #[inline]
    pub fn liquid_on(&self) -> bool {
        self.liquid_on
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.gas_on = false;
            self.liquid_on = false;
        }
    }

    /// 喷嘴未启用时拒绝打开气路，返回是否生效。
    pub fn set_gas_on(&mut self, on: bool) -> bool {
        if on && !self.enabled {
            return false;
        }
        self.gas_on = on;
        true
    }

    /// 喷嘴未启用时拒绝打开液路，返回是否生效。
    pub fn set_liquid_on(&mut self, on: bool) -> bool {
        if on && !self.enabled {
            return false;
        }
        self.liquid_on = on;
        true
    }
}

/// 被选中实体的几何快照、生成的点序列以及喷嘴/方向状态。
///
/// `points` 由 `(primitive, is_reversed)` 派生，所有修改入口都会立即重新生成，
/// 因此外部拿到的点序列总是与当前几何和方向一致。
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    primitive: GeometricPrimitive,
    source_entity_id: Option<EntityId>,
    points: Vec<Point2>,
    is_reversed: bool,
    upper: NozzleState,
    lower: NozzleState,
}

impl Trajectory {
    /// 由点击的实体创建轨迹：快照几何、正向生成点序列、喷嘴全部关闭。
    pub fn from_entity(id: EntityId, entity: &Entity, resolution_degrees: f64) -> Self {
        let mut trajectory =
            Self::from_primitive(GeometricPrimitive::snapshot(entity), false, resolution_degrees);
        trajectory.source_entity_id = Some(id);
        trajectory
    }

    /// 由几何描述创建轨迹，没有来源实体（例如从配置文件恢复）。
    pub fn from_primitive(
        primitive: GeometricPrimitive,
        is_reversed: bool,
        resolution_degrees: f64,
    ) -> Self {
        Self {
            points: path::generate(&primitive, is_reversed, resolution_degrees),
            primitive,
            source_entity_id: None,
            is_reversed,
            upper: NozzleState::default(),
            lower: NozzleState::default(),
        }
    }

    #[inline]
    pub fn primitive(&self) -> &GeometricPrimitive {
        &self.primitive
    }

    #[inline]
    pub fn source_entity_id(&self) -> Option<EntityId> {
        self.source_entity_id
    }

    #[inline]
    pub fn references(&self, id: EntityId) -> bool {
        self.source_entity_id == Some(id)
    }

    pub fn set_source_entity_id(&mut self, id: Option<EntityId>) {
        self.source_entity_id = id;
    }

    #[inline]
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    #[inline]
    pub fn is_reversed(&self) -> bool {
        self.is_reversed
    }

    pub fn set_reversed(&mut self, is_reversed: bool, resolution_degrees: f64) {
        self.is_reversed = is_reversed;
        self.regenerate(resolution_degrees);
    }

    pub fn toggle_reversed(&mut self, resolution_degrees: f64) {
        self.set_reversed(!self.is_reversed, resolution_degrees);
    }

    pub fn set_primitive(&mut self, primitive: GeometricPrimitive, resolution_degrees: f64) {
        self.primitive = primitive;
        self.regenerate(resolution_degrees);
    }

    /// 按当前几何与方向重新生成点序列。
    pub fn regenerate(&mut self, resolution_degrees: f64) {
        self.points = path::generate(&self.primitive, self.is_reversed, resolution_degrees);
    }

    /// 点序列是否与给定分辨率下的生成结果一致。
    pub fn is_consistent(&self, resolution_degrees: f64) -> bool {
        self.points == path::generate(&self.primitive, self.is_reversed, resolution_degrees)
    }

    #[inline]
    pub fn nozzle(&self, side: NozzleSide) -> &NozzleState {
        match side {
            NozzleSide::Upper => &self.upper,
            NozzleSide::Lower => &self.lower,
        }
    }

    #[inline]
    pub fn nozzle_mut(&mut self, side: NozzleSide) -> &mut NozzleState {
        match side {
            NozzleSide::Upper => &mut self.upper,
            NozzleSide::Lower => &mut self.lower,
        }
    }

    pub fn set_nozzle(&mut self, side: NozzleSide, state: NozzleState) {
        *self.nozzle_mut(side) = state;
    }

    pub fn bounds(&self) -> Bounds2D {
        self.primitive.bounds()
    }
}
