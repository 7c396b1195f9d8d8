use std::collections::HashSet;

use spray_core::drawing::{Drawing, EntityId};
use spray_core::errors::PassError;
use spray_core::indicator::{DirectionIndicator, direction_indicator};
use spray_core::pass::{Configuration, SprayPass, ToggleOutcome};
use spray_core::trajectory::{NozzleSide, Trajectory};
use tracing::{debug, info, warn};

use crate::errors::EngineError;
use crate::highlight::{HighlightSink, HighlightSynchronizer};

const DEFAULT_RESOLUTION_DEGREES: f64 = 5.0;
const DEFAULT_INDICATOR_LENGTH: f64 = 10.0;

/// 轨迹离散化与显示相关的参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSettings {
    pub resolution_degrees: f64,
    pub indicator_length: f64,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            resolution_degrees: DEFAULT_RESOLUTION_DEGREES,
            indicator_length: DEFAULT_INDICATOR_LENGTH,
        }
    }
}

/// 喷嘴上的三个开关。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NozzleSwitch {
    Enabled,
    Gas,
    Liquid,
}

impl NozzleSwitch {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "enabled" | "enable" => Some(NozzleSwitch::Enabled),
            "gas" => Some(NozzleSwitch::Gas),
            "liquid" => Some(NozzleSwitch::Liquid),
            _ => None,
        }
    }
}

/// 结构性修改通知，供渲染层按需刷新列表、高亮与指示箭头。
#[derive(Debug, Clone, PartialEq)]
pub enum WorkspaceChange {
    DrawingLoaded { entities: usize },
    ConfigurationReplaced,
    PassAdded { index: usize },
    PassRemoved { index: usize },
    PassRenamed { index: usize },
    PassSelected { index: usize },
    TrajectoryAdded { index: usize, entity: EntityId },
    TrajectoryRemoved { index: usize },
    TrajectoryMoved { from: usize, to: usize },
    TrajectoryEdited { index: usize },
}

/// 会话状态：导入的图纸、当前配置、高亮同步与待取走的变更通知。
///
/// 所有操作都在调用线程上同步完成，按调用顺序串行修改状态。
#[derive(Debug)]
pub struct Workspace {
    drawing: Drawing,
    configuration: Configuration,
    settings: PathSettings,
    default_pass_name: String,
    highlight: HighlightSynchronizer,
    inspected: Option<usize>,
    changes: Vec<WorkspaceChange>,
}

impl Workspace {
    pub fn new(
        settings: PathSettings,
        product_name: impl Into<String>,
        default_pass_name: impl Into<String>,
    ) -> Self {
        let default_pass_name = default_pass_name.into();
        let configuration = Configuration::new(product_name, numbered_name(&default_pass_name, 1));
        Self {
            drawing: Drawing::new(),
            configuration,
            settings,
            default_pass_name,
            highlight: HighlightSynchronizer::new(),
            inspected: None,
            changes: Vec::new(),
        }
    }

    #[inline]
    pub fn drawing(&self) -> &Drawing {
        &self.drawing
    }

    #[inline]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    #[inline]
    pub fn settings(&self) -> PathSettings {
        self.settings
    }

    /// 替换图纸并新建配置（旧轨迹引用的实体已不存在）。
    pub fn load_drawing(&mut self, drawing: Drawing, product_name: impl Into<String>) {
        let entities = drawing.len();
        self.drawing = drawing;
        info!(entities, "已导入图纸");
        self.changes.push(WorkspaceChange::DrawingLoaded { entities });
        self.new_configuration(product_name);
    }

    /// 放弃当前配置，新建只含一个默认道次的配置。
    pub fn new_configuration(&mut self, product_name: impl Into<String>) {
        let configuration =
            Configuration::new(product_name, numbered_name(&self.default_pass_name, 1));
        self.replace_configuration(configuration);
    }

    /// 整体替换配置：按当前图纸恢复来源实体并重新生成全部轨迹点。
    pub fn load_configuration(&mut self, mut configuration: Configuration) {
        let relinked = configuration.relink(&self.drawing);
        configuration.regenerate(self.settings.resolution_degrees);
        debug!(relinked, passes = configuration.pass_count(), "已加载喷涂配置");
        self.replace_configuration(configuration);
    }

    fn replace_configuration(&mut self, configuration: Configuration) {
        self.configuration = configuration;
        self.inspected = None;
        self.changes.push(WorkspaceChange::ConfigurationReplaced);
        self.refresh_highlight();
    }

    pub fn set_product_name(&mut self, name: impl Into<String>) {
        self.configuration.set_product_name(name);
    }

    /// 处理一次实体点击：在当前道次中加入或移除对应轨迹。
    pub fn click_entity(&mut self, id: EntityId) -> Result<ToggleOutcome, EngineError> {
        let entity = self
            .drawing
            .entity(id)
            .ok_or(EngineError::EntityNotFound(id.get()))?;
        let outcome = self
            .configuration
            .toggle_entity(id, entity, self.settings.resolution_degrees)?;
        match &outcome {
            ToggleOutcome::Added { index } => {
                debug!(entity = id.get(), index, "轨迹已加入当前道次");
                self.changes.push(WorkspaceChange::TrajectoryAdded {
                    index: *index,
                    entity: id,
                });
            }
            ToggleOutcome::Removed { index, .. } => {
                debug!(entity = id.get(), index, "轨迹已从当前道次移除");
                self.adjust_inspected_after_removal(*index);
                self.changes
                    .push(WorkspaceChange::TrajectoryRemoved { index: *index });
            }
        }
        self.refresh_highlight();
        Ok(outcome)
    }

    /// 追加道次；未给名称时按“默认名 序号”命名。不切换当前道次。
    pub fn add_pass(&mut self, name: Option<&str>) -> usize {
        let name = match name {
            Some(name) => name.to_string(),
            None => numbered_name(
                &self.default_pass_name,
                self.configuration.pass_count() + 1,
            ),
        };
        let index = self.configuration.add_pass(name);
        debug!(index, "已新增道次");
        self.changes.push(WorkspaceChange::PassAdded { index });
        self.refresh_highlight();
        index
    }

    pub fn remove_pass(&mut self, index: usize) -> Result<SprayPass, EngineError> {
        let previous = self.configuration.current_pass_index();
        let removed = self.configuration.remove_pass(index)?;
        if previous != self.configuration.current_pass_index() || previous == Some(index) {
            self.inspected = None;
        }
        debug!(index, name = removed.name(), "已删除道次");
        self.changes.push(WorkspaceChange::PassRemoved { index });
        self.refresh_highlight();
        Ok(removed)
    }

    pub fn rename_pass(&mut self, index: usize, name: &str) -> Result<(), EngineError> {
        self.configuration.rename_pass(index, name)?;
        self.changes.push(WorkspaceChange::PassRenamed { index });
        Ok(())
    }

    /// 切换当前道次，检查新道次的轨迹点是否一致，并重新计算高亮。
    pub fn select_pass(&mut self, index: usize) -> Result<(), EngineError> {
        self.configuration.select_pass(index)?;
        let resolution = self.settings.resolution_degrees;
        let pass = self.configuration.active_pass_mut()?;
        for position in 0..pass.len() {
            if let Some(trajectory) = pass.trajectory_mut(position) {
                if !trajectory.is_consistent(resolution) {
                    warn!(pass = index, position, "轨迹点与几何不一致，已重新生成");
                    trajectory.regenerate(resolution);
                }
            }
        }
        self.inspected = None;
        self.changes.push(WorkspaceChange::PassSelected { index });
        self.refresh_highlight();
        Ok(())
    }

    pub fn move_trajectory_up(&mut self, index: usize) -> Result<bool, EngineError> {
        let moved = self.configuration.active_pass_mut()?.move_up(index)?;
        if moved {
            self.after_move(index, index - 1);
        }
        Ok(moved)
    }

    pub fn move_trajectory_down(&mut self, index: usize) -> Result<bool, EngineError> {
        let moved = self.configuration.active_pass_mut()?.move_down(index)?;
        if moved {
            self.after_move(index, index + 1);
        }
        Ok(moved)
    }

    fn after_move(&mut self, from: usize, to: usize) {
        self.inspected = match self.inspected {
            Some(current) if current == from => Some(to),
            Some(current) if current == to => Some(from),
            other => other,
        };
        self.changes.push(WorkspaceChange::TrajectoryMoved { from, to });
        self.refresh_highlight();
    }

    pub fn remove_trajectory(&mut self, index: usize) -> Result<Trajectory, EngineError> {
        let removed = self.configuration.active_pass_mut()?.remove(index)?;
        self.adjust_inspected_after_removal(index);
        self.changes.push(WorkspaceChange::TrajectoryRemoved { index });
        self.refresh_highlight();
        Ok(removed)
    }

    pub fn set_reversed(&mut self, index: usize, is_reversed: bool) -> Result<(), EngineError> {
        let resolution = self.settings.resolution_degrees;
        self.active_trajectory_mut(index)?
            .set_reversed(is_reversed, resolution);
        self.changes.push(WorkspaceChange::TrajectoryEdited { index });
        Ok(())
    }

    /// 翻转方向，返回翻转后的状态。
    pub fn toggle_reversed(&mut self, index: usize) -> Result<bool, EngineError> {
        let resolution = self.settings.resolution_degrees;
        let trajectory = self.active_trajectory_mut(index)?;
        trajectory.toggle_reversed(resolution);
        let reversed = trajectory.is_reversed();
        self.changes.push(WorkspaceChange::TrajectoryEdited { index });
        Ok(reversed)
    }

    /// 设置喷嘴开关，返回是否生效（喷嘴未启用时不能打开气/液）。
    pub fn set_nozzle(
        &mut self,
        index: usize,
        side: NozzleSide,
        switch: NozzleSwitch,
        on: bool,
    ) -> Result<bool, EngineError> {
        let nozzle = self.active_trajectory_mut(index)?.nozzle_mut(side);
        let applied = match switch {
            NozzleSwitch::Enabled => {
                nozzle.set_enabled(on);
                true
            }
            NozzleSwitch::Gas => nozzle.set_gas_on(on),
            NozzleSwitch::Liquid => nozzle.set_liquid_on(on),
        };
        if applied {
            self.changes.push(WorkspaceChange::TrajectoryEdited { index });
        }
        Ok(applied)
    }

    /// 选择要查看的轨迹（用于显示方向指示）。
    pub fn inspect(&mut self, index: usize) -> Result<(), EngineError> {
        self.active_trajectory(index)?;
        self.inspected = Some(index);
        Ok(())
    }

    #[inline]
    pub fn inspected_index(&self) -> Option<usize> {
        self.inspected
    }

    pub fn inspected_trajectory(&self) -> Option<&Trajectory> {
        let index = self.inspected?;
        self.configuration.active_pass().ok()?.trajectory(index)
    }

    /// 当前查看轨迹的方向指示；没有查看对象或几何退化时为 `None`。
    pub fn direction_indicator(&self) -> Option<DirectionIndicator> {
        let trajectory = self.inspected_trajectory()?;
        direction_indicator(trajectory, self.settings.indicator_length)
    }

    #[inline]
    pub fn highlight_set(&self) -> &HashSet<EntityId> {
        self.highlight.members()
    }

    #[inline]
    pub fn is_highlighted(&self, id: EntityId) -> bool {
        self.highlight.is_highlighted(id)
    }

    /// 将全部实体的高亮状态推送给渲染层。
    pub fn sync_highlights(&self, sink: &mut dyn HighlightSink) {
        self.highlight.reconcile(&self.drawing, sink);
    }

    /// 取走自上次调用以来累计的变更通知。
    pub fn drain_changes(&mut self) -> Vec<WorkspaceChange> {
        std::mem::take(&mut self.changes)
    }

    fn active_trajectory(&self, index: usize) -> Result<&Trajectory, EngineError> {
        self.configuration
            .active_pass()?
            .trajectory(index)
            .ok_or(EngineError::Pass(PassError::TrajectoryNotFound(index)))
    }

    fn active_trajectory_mut(&mut self, index: usize) -> Result<&mut Trajectory, EngineError> {
        self.configuration
            .active_pass_mut()?
            .trajectory_mut(index)
            .ok_or(EngineError::Pass(PassError::TrajectoryNotFound(index)))
    }

    fn adjust_inspected_after_removal(&mut self, removed: usize) {
        self.inspected = match self.inspected {
            Some(current) if current == removed => None,
            Some(current) if current > removed => Some(current - 1),
            other => other,
        };
    }

    fn refresh_highlight(&mut self) {
        let active = self.configuration.active_pass().ok();
        if self.highlight.recompute(active) {
            debug!(members = self.highlight.members().len(), "高亮集合已更新");
        }
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(PathSettings::default(), "Untitled", "Pass")
    }
}

/// 默认道次名称，例如 `Pass 2`。
pub fn numbered_name(base: &str, number: usize) -> String {
    format!("{base} {number}")
}
