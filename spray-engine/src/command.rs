use std::collections::HashMap;

use spray_core::drawing::EntityId;
use spray_core::pass::ToggleOutcome;
use spray_core::trajectory::NozzleSide;

use crate::workspace::{NozzleSwitch, Workspace};

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    /// 按空白拆分一行命令文本，空行返回 None。
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let name = parts.next()?.to_string();
        Some(Self {
            name,
            args: parts.map(str::to_string).collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub workspace: &'a mut Workspace,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(AddPassCommand);
        bus.register(RemovePassCommand);
        bus.register(RenamePassCommand);
        bus.register(SelectPassCommand);
        bus.register(ToggleEntityCommand);
        bus.register(MoveCommand { up: true });
        bus.register(MoveCommand { up: false });
        bus.register(ReverseCommand);
        bus.register(NozzleCommand);
        bus.register(InspectCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

fn arg<'a>(request: &'a CommandRequest, position: usize, label: &str) -> Result<&'a str, CommandResponse> {
    request
        .args
        .get(position)
        .map(String::as_str)
        .ok_or_else(|| CommandResponse::err(format!("{} 缺少参数 <{label}>", request.name)))
}

fn index_arg(request: &CommandRequest, position: usize, label: &str) -> Result<usize, CommandResponse> {
    let raw = arg(request, position, label)?;
    raw.parse::<usize>()
        .map_err(|_| CommandResponse::err(format!("参数 <{label}> 不是有效的序号: {raw}")))
}

fn switch_arg(request: &CommandRequest, position: usize) -> Result<bool, CommandResponse> {
    match arg(request, position, "on|off")? {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(CommandResponse::err(format!("开关状态只能是 on 或 off: {other}"))),
    }
}

struct AddPassCommand;

impl CommandHandler for AddPassCommand {
    fn name(&self) -> &'static str {
        "add_pass"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let name = request.args.join(" ");
        let name = if name.is_empty() { None } else { Some(name.as_str()) };
        let index = context.workspace.add_pass(name);
        CommandResponse::ok(format!("已新增道次 #{index}"))
    }
}

struct RemovePassCommand;

impl CommandHandler for RemovePassCommand {
    fn name(&self) -> &'static str {
        "remove_pass"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let index = match index_arg(request, 0, "pass") {
            Ok(index) => index,
            Err(response) => return response,
        };
        match context.workspace.remove_pass(index) {
            Ok(removed) => CommandResponse::ok(format!("已删除道次 {}", removed.name())),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct RenamePassCommand;

impl CommandHandler for RenamePassCommand {
    fn name(&self) -> &'static str {
        "rename_pass"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let index = match index_arg(request, 0, "pass") {
            Ok(index) => index,
            Err(response) => return response,
        };
        let name = request.args[1..].join(" ");
        if name.is_empty() {
            return CommandResponse::err("rename_pass 缺少参数 <name>");
        }
        match context.workspace.rename_pass(index, &name) {
            Ok(()) => CommandResponse::ok(format!("道次 #{index} 已重命名为 {name}")),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct SelectPassCommand;

impl CommandHandler for SelectPassCommand {
    fn name(&self) -> &'static str {
        "select_pass"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let index = match index_arg(request, 0, "pass") {
            Ok(index) => index,
            Err(response) => return response,
        };
        match context.workspace.select_pass(index) {
            Ok(()) => CommandResponse::ok(format!("当前道次切换为 #{index}")),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct ToggleEntityCommand;

impl CommandHandler for ToggleEntityCommand {
    fn name(&self) -> &'static str {
        "toggle_entity"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let raw = match arg(request, 0, "entity") {
            Ok(raw) => raw,
            Err(response) => return response,
        };
        let Ok(id) = raw.parse::<u64>() else {
            return CommandResponse::err(format!("实体 ID 无效: {raw}"));
        };
        match context.workspace.click_entity(EntityId::new(id)) {
            Ok(ToggleOutcome::Added { index }) => {
                CommandResponse::ok(format!("实体 #{id} 已加入当前道次，位置 {index}"))
            }
            Ok(ToggleOutcome::Removed { index, .. }) => {
                CommandResponse::ok(format!("实体 #{id} 已从当前道次位置 {index} 移除"))
            }
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct MoveCommand {
    up: bool,
}

impl CommandHandler for MoveCommand {
    fn name(&self) -> &'static str {
        if self.up { "move_up" } else { "move_down" }
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let index = match index_arg(request, 0, "trajectory") {
            Ok(index) => index,
            Err(response) => return response,
        };
        let result = if self.up {
            context.workspace.move_trajectory_up(index)
        } else {
            context.workspace.move_trajectory_down(index)
        };
        match result {
            Ok(true) => CommandResponse::ok(format!("轨迹 {index} 已移动")),
            Ok(false) => CommandResponse::ok(format!("轨迹 {index} 已在边界，未移动")),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct ReverseCommand;

impl CommandHandler for ReverseCommand {
    fn name(&self) -> &'static str {
        "reverse"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let index = match index_arg(request, 0, "trajectory") {
            Ok(index) => index,
            Err(response) => return response,
        };
        match context.workspace.toggle_reversed(index) {
            Ok(reversed) => CommandResponse::ok(format!(
                "轨迹 {index} 方向: {}",
                if reversed { "反向" } else { "正向" }
            )),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

fn nozzle_args(
    request: &CommandRequest,
) -> Result<(usize, NozzleSide, NozzleSwitch, bool), CommandResponse> {
    let index = index_arg(request, 0, "trajectory")?;
    let side = arg(request, 1, "upper|lower")?;
    let side = NozzleSide::parse(side)
        .ok_or_else(|| CommandResponse::err(format!("喷嘴只能是 upper 或 lower: {side}")))?;
    let switch = arg(request, 2, "enabled|gas|liquid")?;
    let switch = NozzleSwitch::parse(switch).ok_or_else(|| {
        CommandResponse::err(format!("开关只能是 enabled、gas 或 liquid: {switch}"))
    })?;
    let on = switch_arg(request, 3)?;
    Ok((index, side, switch, on))
}

struct NozzleCommand;

impl CommandHandler for NozzleCommand {
    fn name(&self) -> &'static str {
        "nozzle"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let (index, side, switch, on) = match nozzle_args(request) {
            Ok(parsed) => parsed,
            Err(response) => return response,
        };
        match context.workspace.set_nozzle(index, side, switch, on) {
            Ok(true) => CommandResponse::ok(format!("轨迹 {index} 喷嘴状态已更新")),
            Ok(false) => CommandResponse::err(format!("轨迹 {index} 喷嘴未启用，无法打开气/液")),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct InspectCommand;

impl CommandHandler for InspectCommand {
    fn name(&self) -> &'static str {
        "inspect"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let index = match index_arg(request, 0, "trajectory") {
            Ok(index) => index,
            Err(response) => return response,
        };
        if let Err(err) = context.workspace.inspect(index) {
            return CommandResponse::err(err.to_string());
        }
        match context.workspace.direction_indicator() {
            Some(indicator) => CommandResponse::ok(format!(
                "轨迹 {index} 方向=({:.3}, {:.3})，锚点=({:.2}, {:.2})",
                indicator.direction.x(),
                indicator.direction.y(),
                indicator.anchor.x(),
                indicator.anchor.y()
            )),
            None => CommandResponse::ok(format!("轨迹 {index} 无方向指示")),
        }
    }
}
