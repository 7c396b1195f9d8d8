use anyhow::{Context, bail};
use spray_config::AppConfig;
use spray_core::drawing::EntityId;
use spray_core::pass::SprayPass;
use spray_core::trajectory::{NozzleSide, NozzleState, Trajectory};
use spray_engine::command::{CommandBus, CommandContext, CommandRequest};
use spray_engine::highlight::HighlightSink;
use spray_engine::workspace::{PathSettings, Workspace, numbered_name};
use spray_io::{ConfigurationSaver, DrawingLoader, DxfFacade, JsonConfigurationFacade, load_or_default};
use tracing::{debug, info, warn};

use crate::Args;

/// 收集高亮结果用于打印。
#[derive(Default)]
struct SummarySink {
    highlighted: Vec<u64>,
}

impl HighlightSink for SummarySink {
    fn set_highlighted(&mut self, id: EntityId, highlighted: bool) {
        if highlighted {
            self.highlighted.push(id.get());
        }
    }
}

/// 批处理流程：导入图纸、加载配置、依次执行命令、保存并打印概览。
///
/// 单条命令失败不会中断后续命令，全部执行完后以失败状态结束。
pub fn run(args: &Args, config: &AppConfig) -> anyhow::Result<()> {
    let settings = PathSettings {
        resolution_degrees: config.path.resolution_degrees,
        indicator_length: config.path.indicator_length,
    };
    let pass_name = &config.passes.default_pass_name;
    let product = args
        .product
        .clone()
        .unwrap_or_else(|| config.passes.default_product_name.clone());
    let mut workspace = Workspace::new(settings, product.clone(), pass_name.clone());

    if let Some(path) = &args.drawing {
        let drawing = DxfFacade::new()
            .load(path)
            .with_context(|| format!("导入图纸 {} 失败", path.display()))?;
        workspace.load_drawing(drawing, product.clone());
    }

    let facade = JsonConfigurationFacade::new(settings.resolution_degrees, numbered_name(pass_name, 1));
    if let Some(path) = &args.load {
        let (configuration, error) =
            load_or_default(&facade, path, &product, &numbered_name(pass_name, 1));
        if let Some(err) = error {
            eprintln!("读取喷涂配置失败，已使用默认配置：{err}");
        }
        workspace.load_configuration(configuration);
        if let Some(product) = &args.product {
            workspace.set_product_name(product.clone());
        }
    }

    let failures = run_commands(&mut workspace, &args.commands);

    for change in workspace.drain_changes() {
        debug!(?change, "工作区变更");
    }

    if let Some(path) = &args.save {
        facade
            .save(workspace.configuration(), path)
            .with_context(|| format!("保存喷涂配置 {} 失败", path.display()))?;
        info!(path = %path.display(), "喷涂配置已保存");
        println!("已保存喷涂配置：{}", path.display());
    }

    print_summary(&workspace);

    if failures > 0 {
        bail!("{failures} 条命令执行失败");
    }
    Ok(())
}

fn run_commands(workspace: &mut Workspace, commands: &[String]) -> usize {
    let bus = CommandBus::new();
    let mut context = CommandContext { workspace };
    let mut failures = 0;
    for line in commands {
        let Some(request) = CommandRequest::parse(line) else {
            continue;
        };
        let response = bus.dispatch(&request, &mut context);
        let message = response.message.unwrap_or_default();
        if response.success {
            println!("[命令] {message}");
        } else {
            warn!(command = %request.name, "命令执行失败");
            eprintln!("[失败] {line}: {message}");
            failures += 1;
        }
    }
    failures
}

fn print_summary(workspace: &Workspace) {
    let drawing = workspace.drawing();
    let configuration = workspace.configuration();

    println!("产品：{}", configuration.product_name());
    let skipped: Vec<String> = drawing
        .skipped()
        .map(|(kind, count)| format!("{kind}×{count}"))
        .collect();
    if skipped.is_empty() {
        println!("图纸实体：{}", drawing.len());
    } else {
        println!("图纸实体：{}（跳过：{}）", drawing.len(), skipped.join(", "));
    }

    println!("道次：");
    let current = configuration.current_pass_index();
    for (index, pass) in configuration.passes().iter().enumerate() {
        let marker = if current == Some(index) { '*' } else { ' ' };
        println!("  {marker} [{index}] {} ({} 条轨迹)", pass.name(), pass.len());
    }

    if let Ok(pass) = configuration.active_pass() {
        print_trajectories(pass);
    }

    if let Some(indicator) = workspace.direction_indicator() {
        println!(
            "方向指示：锚点=({:.2}, {:.2}) 方向=({:.3}, {:.3})",
            indicator.anchor.x(),
            indicator.anchor.y(),
            indicator.direction.x(),
            indicator.direction.y()
        );
    }

    let mut sink = SummarySink::default();
    workspace.sync_highlights(&mut sink);
    if sink.highlighted.is_empty() {
        println!("高亮实体：无");
    } else {
        let ids: Vec<String> = sink.highlighted.iter().map(u64::to_string).collect();
        println!("高亮实体：{}", ids.join(", "));
    }
}

fn print_trajectories(pass: &SprayPass) {
    println!("当前道次轨迹：");
    if pass.is_empty() {
        println!("  （空）");
        return;
    }
    for (index, trajectory) in pass.trajectories().iter().enumerate() {
        println!("  {index}. {}", describe_trajectory(trajectory));
    }
}

fn describe_trajectory(trajectory: &Trajectory) -> String {
    let source = trajectory
        .source_entity_id()
        .map(|id| format!("#{}", id.get()))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} 实体={} {} 点数={} 上喷嘴[{}] 下喷嘴[{}]",
        trajectory.primitive().type_name(),
        source,
        if trajectory.is_reversed() { "反向" } else { "正向" },
        trajectory.points().len(),
        describe_nozzle(trajectory.nozzle(NozzleSide::Upper)),
        describe_nozzle(trajectory.nozzle(NozzleSide::Lower)),
    )
}

fn describe_nozzle(nozzle: &NozzleState) -> String {
    if !nozzle.enabled() {
        return "关".to_string();
    }
    let mut parts = vec!["开"];
    if nozzle.gas_on() {
        parts.push("气");
    }
    if nozzle.liquid_on() {
        parts.push("液");
    }
    parts.join(" ")
}
