use std::collections::HashSet;

use crate::drawing::{Drawing, Entity, EntityId};
use crate::errors::PassError;
use crate::geometry::Bounds2D;
use crate::primitive::GeometricPrimitive;
use crate::trajectory::Trajectory;

/// 加载配置后按几何匹配来源实体时使用的容差。
pub const RELINK_TOLERANCE: f64 = 1e-9;

/// 点击实体后的结果：加入道次或从道次移除。
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    Added { index: usize },
    Removed { index: usize, trajectory: Trajectory },
}

/// 喷涂道次：有序轨迹列表，顺序即喷涂执行顺序。
#[derive(Debug, Clone, PartialEq)]
pub struct SprayPass {
    name: String,
    trajectories: Vec<Trajectory>,
}

impl SprayPass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trajectories: Vec::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[inline]
    pub fn trajectories(&self) -> &[Trajectory] {
        &self.trajectories
    }

    #[inline]
    pub fn trajectory(&self, index: usize) -> Option<&Trajectory> {
        self.trajectories.get(index)
    }

    #[inline]
    pub fn trajectory_mut(&mut self, index: usize) -> Option<&mut Trajectory> {
        self.trajectories.get_mut(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// 追加到末尾（喷涂顺序最后）。
    pub fn push(&mut self, trajectory: Trajectory) -> usize {
        self.trajectories.push(trajectory);
        self.trajectories.len() - 1
    }

    /// 引用该实体的轨迹位置。
    pub fn position_of(&self, id: EntityId) -> Option<usize> {
        self.trajectories
            .iter()
            .position(|trajectory| trajectory.references(id))
    }

    #[inline]
    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.position_of(id).is_some()
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.trajectories
            .iter()
            .filter_map(|trajectory| trajectory.source_entity_id())
    }

    /// 已引用则移除，否则快照实体并追加到末尾。
    pub fn toggle_entity(
        &mut self,
        id: EntityId,
        entity: &Entity,
        resolution_degrees: f64,
    ) -> ToggleOutcome {
        if let Some(index) = self.position_of(id) {
            let trajectory = self.trajectories.remove(index);
            return ToggleOutcome::Removed { index, trajectory };
        }
        let index = self.push(Trajectory::from_entity(id, entity, resolution_degrees));
        ToggleOutcome::Added { index }
    }

    pub fn remove(&mut self, index: usize) -> Result<Trajectory, PassError> {
        if index >= self.trajectories.len() {
            return Err(PassError::TrajectoryNotFound(index));
        }
        Ok(self.trajectories.remove(index))
    }

    /// 与相邻位置交换。`to` 必须与 `from` 相邻且在范围内。
    pub fn move_trajectory(&mut self, from: usize, to: usize) -> Result<(), PassError> {
        let len = self.trajectories.len();
        if from >= len {
            return Err(PassError::TrajectoryNotFound(from));
        }
        if to >= len || from.abs_diff(to) != 1 {
            return Err(PassError::InvalidReorderTarget { from, to });
        }
        self.trajectories.swap(from, to);
        Ok(())
    }

    /// 上移一位；已在首位时不做任何事并返回 `false`。
    pub fn move_up(&mut self, index: usize) -> Result<bool, PassError> {
        if index >= self.trajectories.len() {
            return Err(PassError::TrajectoryNotFound(index));
        }
        if index == 0 {
            return Ok(false);
        }
        self.move_trajectory(index, index - 1)?;
        Ok(true)
    }

    /// 下移一位；已在末位时不做任何事并返回 `false`。
    pub fn move_down(&mut self, index: usize) -> Result<bool, PassError> {
        let len = self.trajectories.len();
        if index >= len {
            return Err(PassError::TrajectoryNotFound(index));
        }
        if index + 1 == len {
            return Ok(false);
        }
        self.move_trajectory(index, index + 1)?;
        Ok(true)
    }

    pub fn regenerate(&mut self, resolution_degrees: f64) {
        for trajectory in &mut self.trajectories {
            trajectory.regenerate(resolution_degrees);
        }
    }

    /// 所有轨迹几何的合并范围；空道次返回 `None`。
    pub fn bounds(&self) -> Option<Bounds2D> {
        let mut bounds = Bounds2D::empty();
        for trajectory in &self.trajectories {
            bounds.include_bounds(&trajectory.bounds());
        }
        if bounds.is_empty() { None } else { Some(bounds) }
    }

    /// 为没有来源实体的轨迹按几何重新匹配图纸实体，返回恢复的数量。
    pub fn relink(&mut self, drawing: &Drawing) -> usize {
        let mut taken: HashSet<EntityId> = self.entity_ids().collect();
        let mut relinked = 0;
        for trajectory in &mut self.trajectories {
            if trajectory.source_entity_id().is_some() {
                continue;
            }
            let matched = drawing.entities().find(|(id, entity)| {
                !taken.contains(id)
                    && GeometricPrimitive::snapshot(entity)
                        .approx_eq(trajectory.primitive(), RELINK_TOLERANCE)
            });
            if let Some((id, _)) = matched {
                trajectory.set_source_entity_id(Some(id));
                taken.insert(id);
                relinked += 1;
            }
        }
        relinked
    }
}

/// 根聚合：产品名、有序道次列表与当前道次。
///
/// 只要道次列表非空，`current_pass_index` 必然指向合法位置；每次结构性修改后都会校正。
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    product_name: String,
    spray_passes: Vec<SprayPass>,
    current_pass_index: Option<usize>,
}

impl Configuration {
    /// 新建配置，带一个默认道次并设为当前道次。
    pub fn new(product_name: impl Into<String>, first_pass_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            spray_passes: vec![SprayPass::new(first_pass_name)],
            current_pass_index: Some(0),
        }
    }

    /// 由已有数据组装，越界或缺失的当前道次会被校正。
    pub fn from_parts(
        product_name: impl Into<String>,
        spray_passes: Vec<SprayPass>,
        current_pass_index: Option<usize>,
    ) -> Self {
        let mut configuration = Self {
            product_name: product_name.into(),
            spray_passes,
            current_pass_index,
        };
        configuration.normalize_current_index();
        configuration
    }

    #[inline]
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn set_product_name(&mut self, name: impl Into<String>) {
        self.product_name = name.into();
    }

    #[inline]
    pub fn passes(&self) -> &[SprayPass] {
        &self.spray_passes
    }

    #[inline]
    pub fn pass(&self, index: usize) -> Option<&SprayPass> {
        self.spray_passes.get(index)
    }

    #[inline]
    pub fn pass_count(&self) -> usize {
        self.spray_passes.len()
    }

    #[inline]
    pub fn current_pass_index(&self) -> Option<usize> {
        self.current_pass_index
    }

    /// 持久化使用的整数形式，`-1` 表示没有当前道次。
    pub fn current_pass_index_raw(&self) -> i64 {
        self.current_pass_index.map_or(-1, |index| index as i64)
    }

    pub fn active_pass(&self) -> Result<&SprayPass, PassError> {
        self.current_pass_index
            .and_then(|index| self.spray_passes.get(index))
            .ok_or(PassError::NoActivePass)
    }

    pub fn active_pass_mut(&mut self) -> Result<&mut SprayPass, PassError> {
        self.current_pass_index
            .and_then(|index| self.spray_passes.get_mut(index))
            .ok_or(PassError::NoActivePass)
    }

    /// 在当前道次中切换实体；没有当前道次时不做任何修改。
    pub fn toggle_entity(
        &mut self,
        id: EntityId,
        entity: &Entity,
        resolution_degrees: f64,
    ) -> Result<ToggleOutcome, PassError> {
        let pass = self.active_pass_mut()?;
        Ok(pass.toggle_entity(id, entity, resolution_degrees))
    }

    /// 追加空道次，不改变当前道次（列表原本为空时除外）。
    pub fn add_pass(&mut self, name: impl Into<String>) -> usize {
        self.spray_passes.push(SprayPass::new(name));
        self.normalize_current_index();
        self.spray_passes.len() - 1
    }

    /// 删除道次，至少保留一个。删除当前道次后回到第 0 个道次。
    pub fn remove_pass(&mut self, index: usize) -> Result<SprayPass, PassError> {
        if index >= self.spray_passes.len() {
            return Err(PassError::PassNotFound(index));
        }
        if self.spray_passes.len() <= 1 {
            return Err(PassError::CannotRemoveLastPass);
        }
        let removed = self.spray_passes.remove(index);
        self.current_pass_index = match self.current_pass_index {
            Some(current) if current == index => Some(0),
            Some(current) if current > index => Some(current - 1),
            other => other,
        };
        self.normalize_current_index();
        Ok(removed)
    }

    pub fn rename_pass(&mut self, index: usize, name: impl Into<String>) -> Result<(), PassError> {
        let pass = self
            .spray_passes
            .get_mut(index)
            .ok_or(PassError::PassNotFound(index))?;
        pass.rename(name);
        Ok(())
    }

    pub fn select_pass(&mut self, index: usize) -> Result<(), PassError> {
        if index >= self.spray_passes.len() {
            return Err(PassError::PassNotFound(index));
        }
        self.current_pass_index = Some(index);
        Ok(())
    }

    /// 按给定分辨率重新生成所有轨迹点。
    pub fn regenerate(&mut self, resolution_degrees: f64) {
        for pass in &mut self.spray_passes {
            pass.regenerate(resolution_degrees);
        }
    }

    /// 见 [`SprayPass::relink`]，返回所有道次恢复的数量。
    pub fn relink(&mut self, drawing: &Drawing) -> usize {
        self.spray_passes
            .iter_mut()
            .map(|pass| pass.relink(drawing))
            .sum()
    }

    fn normalize_current_index(&mut self) {
        if self.spray_passes.is_empty() {
            self.current_pass_index = None;
            return;
        }
        match self.current_pass_index {
            Some(index) if index < self.spray_passes.len() => {}
            _ => self.current_pass_index = Some(0),
        }
    }
}
