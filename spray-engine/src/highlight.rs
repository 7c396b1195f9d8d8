use std::collections::HashSet;

use spray_core::drawing::{Drawing, EntityId};
use spray_core::pass::SprayPass;

/// 渲染层接口：逐个实体告知是否以“选中”样式绘制。
pub trait HighlightSink {
    fn set_highlighted(&mut self, id: EntityId, highlighted: bool);
}

/// 当前道次中被轨迹引用的实体集合。没有当前道次时为空集。
pub fn compute_highlight_set(active_pass: Option<&SprayPass>) -> HashSet<EntityId> {
    active_pass
        .map(|pass| pass.entity_ids().collect())
        .unwrap_or_default()
}

/// 维护当前道次的高亮成员，并与渲染层的高亮状态对账。
///
/// 成员关系只针对当前道次：其他道次引用的实体在切换前都显示为未选中。
#[derive(Debug, Default)]
pub struct HighlightSynchronizer {
    members: HashSet<EntityId>,
}

impl HighlightSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 重新计算成员集合，返回集合是否发生变化。
    pub fn recompute(&mut self, active_pass: Option<&SprayPass>) -> bool {
        let members = compute_highlight_set(active_pass);
        if members == self.members {
            return false;
        }
        self.members = members;
        true
    }

    #[inline]
    pub fn is_highlighted(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }

    #[inline]
    pub fn members(&self) -> &HashSet<EntityId> {
        &self.members
    }

    /// 对图纸中的每个实体调用一次 sink。
    pub fn reconcile(&self, drawing: &Drawing, sink: &mut dyn HighlightSink) {
        for id in drawing.ids() {
            sink.set_highlighted(id, self.members.contains(&id));
        }
    }
}
