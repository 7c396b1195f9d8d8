use std::path::Path;

use serde::{Deserialize, Serialize};
use spray_core::pass::{Configuration, SprayPass};
use spray_core::primitive::GeometricPrimitive;
use spray_core::trajectory::{NozzleSide, NozzleState, Trajectory};
use tracing::{debug, warn};

use crate::{ConfigurationLoader, ConfigurationSaver, IoError, read_file};

/// 持久化文档的根对象。
///
/// 点序列与来源实体不写入文件，加载时按几何重新生成。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedConfiguration {
    pub product_name: String,
    #[serde(default)]
    pub spray_passes: Vec<PersistedPass>,
    #[serde(default = "no_current_pass")]
    pub current_pass_index: i64,
}

fn no_current_pass() -> i64 {
    -1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPass {
    pub name: String,
    #[serde(default)]
    pub trajectories: Vec<PersistedTrajectory>,
}

/// 单条轨迹：几何字段（含 `primitive_type` 标签）平铺在同一层。
///
/// 未知的 `primitive_type` 标签（如 `"Spline"`）会让整个文档反序列化失败，
/// 不会被跳过；调用方据此回退到默认配置，而不是加载一份缺了轨迹的配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTrajectory {
    #[serde(flatten)]
    pub primitive: GeometricPrimitive,
    #[serde(default)]
    pub is_reversed: bool,
    #[serde(default)]
    pub upper_nozzle_enabled: bool,
    #[serde(default)]
    pub upper_gas_on: bool,
    #[serde(default)]
    pub upper_liquid_on: bool,
    #[serde(default)]
    pub lower_nozzle_enabled: bool,
    #[serde(default)]
    pub lower_gas_on: bool,
    #[serde(default)]
    pub lower_liquid_on: bool,
}

impl PersistedTrajectory {
    pub fn from_trajectory(trajectory: &Trajectory) -> Self {
        let upper = trajectory.nozzle(NozzleSide::Upper);
        let lower = trajectory.nozzle(NozzleSide::Lower);
        Self {
            primitive: *trajectory.primitive(),
            is_reversed: trajectory.is_reversed(),
            upper_nozzle_enabled: upper.enabled(),
            upper_gas_on: upper.gas_on(),
            upper_liquid_on: upper.liquid_on(),
            lower_nozzle_enabled: lower.enabled(),
            lower_gas_on: lower.gas_on(),
            lower_liquid_on: lower.liquid_on(),
        }
    }

    fn into_trajectory(self, resolution_degrees: f64) -> Trajectory {
        let mut trajectory =
            Trajectory::from_primitive(self.primitive, self.is_reversed, resolution_degrees);
        trajectory.set_nozzle(
            NozzleSide::Upper,
            NozzleState::new(
                self.upper_nozzle_enabled,
                self.upper_gas_on,
                self.upper_liquid_on,
            ),
        );
        trajectory.set_nozzle(
            NozzleSide::Lower,
            NozzleState::new(
                self.lower_nozzle_enabled,
                self.lower_gas_on,
                self.lower_liquid_on,
            ),
        );
        trajectory
    }
}

impl PersistedConfiguration {
    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self {
            product_name: configuration.product_name().to_string(),
            spray_passes: configuration
                .passes()
                .iter()
                .map(|pass| PersistedPass {
                    name: pass.name().to_string(),
                    trajectories: pass
                        .trajectories()
                        .iter()
                        .map(PersistedTrajectory::from_trajectory)
                        .collect(),
                })
                .collect(),
            current_pass_index: configuration.current_pass_index_raw(),
        }
    }

    /// 校验并恢复为领域对象。
    ///
    /// 半径非法时整体失败，不返回部分结果。当前道次越界时回到第 0 个道次，
    /// 没有道次时补一个名为 `default_pass_name` 的空道次。
    pub fn into_configuration(
        self,
        resolution_degrees: f64,
        default_pass_name: &str,
    ) -> Result<Configuration, IoError> {
        let mut passes = Vec::with_capacity(self.spray_passes.len());
        for (pass_index, persisted) in self.spray_passes.into_iter().enumerate() {
            let mut pass = SprayPass::new(persisted.name);
            for (position, trajectory) in persisted.trajectories.into_iter().enumerate() {
                if !trajectory.primitive.is_valid() {
                    return Err(IoError::MalformedConfiguration(format!(
                        "pass {pass_index} trajectory {position}: {} geometry must be finite with a positive radius",
                        trajectory.primitive.type_name()
                    )));
                }
                pass.push(trajectory.into_trajectory(resolution_degrees));
            }
            passes.push(pass);
        }
        if passes.is_empty() {
            passes.push(SprayPass::new(default_pass_name));
        }

        let current = usize::try_from(self.current_pass_index)
            .ok()
            .filter(|index| *index < passes.len());
        if current.is_none() {
            debug!(
                stored = self.current_pass_index,
                "持久化的当前道次无效，已回到第 0 个道次"
            );
        }
        Ok(Configuration::from_parts(self.product_name, passes, current))
    }
}

/// JSON 格式的配置读写。
#[derive(Debug, Clone)]
pub struct JsonConfigurationFacade {
    resolution_degrees: f64,
    default_pass_name: String,
}

impl JsonConfigurationFacade {
    pub fn new(resolution_degrees: f64, default_pass_name: impl Into<String>) -> Self {
        Self {
            resolution_degrees,
            default_pass_name: default_pass_name.into(),
        }
    }

    pub fn from_json_str(&self, source: &str) -> Result<Configuration, IoError> {
        let persisted: PersistedConfiguration = serde_json::from_str(source)
            .map_err(|err| IoError::MalformedConfiguration(err.to_string()))?;
        persisted.into_configuration(self.resolution_degrees, &self.default_pass_name)
    }

    pub fn to_json_string(&self, configuration: &Configuration) -> Result<String, IoError> {
        serde_json::to_string_pretty(&PersistedConfiguration::from_configuration(configuration))
            .map_err(|err| IoError::MalformedConfiguration(err.to_string()))
    }
}

impl ConfigurationLoader for JsonConfigurationFacade {
    fn load(&self, path: &Path) -> Result<Configuration, IoError> {
        let data = read_file(path)?;
        let configuration = self.from_json_str(&data)?;
        debug!(
            path = %path.display(),
            passes = configuration.pass_count(),
            "已读取喷涂配置"
        );
        Ok(configuration)
    }
}

impl ConfigurationSaver for JsonConfigurationFacade {
    fn save(&self, configuration: &Configuration, path: &Path) -> Result<(), IoError> {
        let json = self.to_json_string(configuration)?;
        std::fs::write(path, json).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "已保存喷涂配置");
        Ok(())
    }
}

/// 读取配置；失败时返回全新的默认配置以及失败原因，绝不返回部分数据。
pub fn load_or_default(
    loader: &dyn ConfigurationLoader,
    path: &Path,
    product_name: &str,
    first_pass_name: &str,
) -> (Configuration, Option<IoError>) {
    match loader.load(path) {
        Ok(configuration) => (configuration, None),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "读取喷涂配置失败，使用默认配置");
            (Configuration::new(product_name, first_pass_name), Some(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use spray_core::geometry::{Point3, Vector3};

    use super::*;

    #[test]
    fn trajectory_document_is_flat_and_uses_uppercase_axes() {
        let mut trajectory = Trajectory::from_primitive(
            GeometricPrimitive::Arc {
                center: Point3::new(1.0, 2.0, 0.0),
                radius: 5.0,
                start_angle_deg: 0.0,
                end_angle_deg: 90.0,
                normal: Vector3::Z_AXIS,
            },
            true,
            15.0,
        );
        trajectory.set_nozzle(NozzleSide::Upper, NozzleState::new(true, true, false));

        let value = serde_json::to_value(PersistedTrajectory::from_trajectory(&trajectory)).unwrap();
        assert_eq!(value["primitive_type"], "Arc");
        assert_eq!(value["center"], json!({"X": 1.0, "Y": 2.0, "Z": 0.0}));
        assert_eq!(value["normal"], json!({"X": 0.0, "Y": 0.0, "Z": 1.0}));
        assert_eq!(value["start_angle"], 0.0);
        assert_eq!(value["end_angle"], 90.0);
        assert_eq!(value["is_reversed"], true);
        assert_eq!(value["upper_nozzle_enabled"], true);
        assert_eq!(value["upper_gas_on"], true);
        assert_eq!(value["lower_nozzle_enabled"], false);
        assert!(value.get("points").is_none());
        assert!(value.get("source_entity_id").is_none());
    }

    #[test]
    fn lowercase_axes_and_missing_flags_are_accepted() {
        let source = json!({
            "product_name": "Door",
            "spray_passes": [{
                "name": "Base",
                "trajectories": [{
                    "primitive_type": "Line",
                    "start": {"x": 0.0, "y": 0.0, "z": 0.0},
                    "end": {"X": 10.0, "Y": 0.0, "Z": 0.0}
                }]
            }],
            "current_pass_index": 0
        });
        let facade = JsonConfigurationFacade::new(5.0, "Pass");
        let configuration = facade.from_json_str(&source.to_string()).unwrap();
        let trajectory = configuration.active_pass().unwrap().trajectory(0).unwrap();
        assert!(!trajectory.is_reversed());
        assert_eq!(trajectory.points().len(), 2);
        assert!(trajectory.source_entity_id().is_none());
    }

    #[test]
    fn nozzle_dependency_is_enforced_on_load() {
        let persisted = PersistedTrajectory {
            primitive: GeometricPrimitive::Circle {
                center: Point3::new(0.0, 0.0, 0.0),
                radius: 1.0,
                normal: Vector3::Z_AXIS,
            },
            is_reversed: false,
            upper_nozzle_enabled: false,
            upper_gas_on: true,
            upper_liquid_on: true,
            lower_nozzle_enabled: true,
            lower_gas_on: false,
            lower_liquid_on: true,
        };
        let trajectory = persisted.into_trajectory(90.0);
        assert!(!trajectory.nozzle(NozzleSide::Upper).gas_on());
        assert!(!trajectory.nozzle(NozzleSide::Upper).liquid_on());
        assert!(trajectory.nozzle(NozzleSide::Lower).liquid_on());
    }

    #[test]
    fn current_index_is_normalised() {
        let facade = JsonConfigurationFacade::new(5.0, "Pass");
        let out_of_range = json!({
            "product_name": "Door",
            "spray_passes": [{"name": "A"}, {"name": "B"}],
            "current_pass_index": 7
        });
        let configuration = facade.from_json_str(&out_of_range.to_string()).unwrap();
        assert_eq!(configuration.current_pass_index(), Some(0));

        let selected = json!({
            "product_name": "Door",
            "spray_passes": [{"name": "A"}, {"name": "B"}],
            "current_pass_index": 1
        });
        let configuration = facade.from_json_str(&selected.to_string()).unwrap();
        assert_eq!(configuration.current_pass_index(), Some(1));

        let empty = json!({"product_name": "Door", "spray_passes": [], "current_pass_index": -1});
        let configuration = facade.from_json_str(&empty.to_string()).unwrap();
        assert_eq!(configuration.pass_count(), 1);
        assert_eq!(configuration.passes()[0].name(), "Pass");
        assert_eq!(configuration.current_pass_index(), Some(0));
    }
}
