use std::collections::BTreeMap;
use std::path::Path;

use spray_core::drawing::{Arc, Circle, Drawing, Entity, Line};
use spray_core::geometry::{Point3, Vector3};
use tracing::{debug, info};

use crate::{DrawingLoader, IoError, read_file};

/// ASCII DXF 导入，只读取 `ENTITIES` 段中的 LINE / ARC / CIRCLE。
///
/// 其他实体按类型计数后跳过，其他段整体跳过。
#[derive(Debug, Default, Clone, Copy)]
pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }

    /// 解析内存中的 DXF 文本。
    pub fn parse_str(&self, source: &str) -> Result<Drawing, IoError> {
        DxfParser::new(source)
            .parse()
            .map_err(|err| IoError::InvalidDrawing(err.message))
    }
}

impl DrawingLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Drawing, IoError> {
        let data = read_file(path)?;
        let drawing = self.parse_str(&data)?;
        info!(
            path = %path.display(),
            entities = drawing.len(),
            "DXF 图纸导入完成"
        );
        Ok(drawing)
    }
}

#[derive(Debug)]
struct DxfError {
    message: String,
}

impl DxfError {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl<'a> DxfParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
        }
    }

    fn parse(mut self) -> Result<Drawing, DxfError> {
        let mut drawing = Drawing::new();
        while let Some((code, value)) = self.reader.next_pair()? {
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "意外的组码 {code}（期望 0 表示 SECTION/EOF）"
                )));
            }
            match value.trim() {
                "SECTION" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::invalid("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::invalid(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    match name.trim() {
                        "ENTITIES" => self.parse_entities(&mut drawing)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(DxfError::invalid(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        Ok(drawing)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some(_) => continue,
                None => {
                    return Err(DxfError::invalid("SECTION 未找到 ENDSEC 终止标记"));
                }
            }
        }
        Ok(())
    }

    fn parse_entities(&mut self, drawing: &mut Drawing) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("ENTITIES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.trim() {
                "ENDSEC" => break,
                "LINE" => {
                    let line = self.parse_line()?;
                    drawing.add_entity(line);
                }
                "ARC" => {
                    let arc = self.parse_arc()?;
                    drawing.add_entity(arc);
                }
                "CIRCLE" => {
                    let circle = self.parse_circle()?;
                    drawing.add_entity(circle);
                }
                other => {
                    debug!(kind = other, "跳过不支持的实体");
                    drawing.record_skipped(other);
                    self.skip_entity_body()?;
                }
            }
        }
        Ok(())
    }

    fn parse_line(&mut self) -> Result<Entity, DxfError> {
        let fields = self.read_fields("LINE", &[10, 20, 30, 11, 21, 31])?;
        Ok(Entity::Line(Line {
            start: Point3::new(
                fields.require(10, "起点 X")?,
                fields.require(20, "起点 Y")?,
                fields.optional(30, 0.0),
            ),
            end: Point3::new(
                fields.require(11, "终点 X")?,
                fields.require(21, "终点 Y")?,
                fields.optional(31, 0.0),
            ),
            layer: fields.layer(),
        }))
    }

    fn parse_circle(&mut self) -> Result<Entity, DxfError> {
        let fields = self.read_fields("CIRCLE", &[10, 20, 30, 40, 210, 220, 230])?;
        Ok(Entity::Circle(Circle {
            center: fields.center()?,
            radius: fields.radius()?,
            normal: fields.normal(),
            layer: fields.layer(),
        }))
    }

    fn parse_arc(&mut self) -> Result<Entity, DxfError> {
        let fields = self.read_fields("ARC", &[10, 20, 30, 40, 50, 51, 210, 220, 230])?;
        Ok(Entity::Arc(Arc {
            center: fields.center()?,
            radius: fields.radius()?,
            start_angle: fields.require(50, "起始角")?,
            end_angle: fields.require(51, "终止角")?,
            normal: fields.normal(),
            layer: fields.layer(),
        }))
    }

    /// 读取实体的组码直到下一个 `0` 组码。`accepted` 之外的组码被忽略。
    fn read_fields(
        &mut self,
        kind: &'static str,
        accepted: &[i32],
    ) -> Result<EntityFields, DxfError> {
        let mut fields = EntityFields {
            kind,
            values: BTreeMap::new(),
            layer: None,
        };
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((8, value)) => fields.layer = Some(value.trim().to_string()),
                Some((code, value)) if accepted.contains(&code) => {
                    if fields.values.contains_key(&code) {
                        return Err(DxfError::invalid(format!(
                            "{kind} 遇到重复的组码 {code}"
                        )));
                    }
                    let parsed = parse_f64(&value, &format!("{kind} 组码 {code}"))?;
                    fields.values.insert(code, parsed);
                }
                Some(_) => {}
                None => return Err(DxfError::invalid(format!("{kind} 未正确结束"))),
            }
        }
        Ok(fields)
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }
}

struct EntityFields {
    kind: &'static str,
    values: BTreeMap<i32, f64>,
    layer: Option<String>,
}

impl EntityFields {
    fn require(&self, code: i32, label: &str) -> Result<f64, DxfError> {
        self.values.get(&code).copied().ok_or_else(|| {
            DxfError::invalid(format!("{} 缺少{label}（组码 {code}）", self.kind))
        })
    }

    fn optional(&self, code: i32, default: f64) -> f64 {
        self.values.get(&code).copied().unwrap_or(default)
    }

    fn radius(&self) -> Result<f64, DxfError> {
        let radius = self.require(40, "半径")?;
        if radius <= 0.0 {
            return Err(DxfError::invalid(format!(
                "{} 半径必须为正数（值：{radius}）",
                self.kind
            )));
        }
        Ok(radius)
    }

    fn center(&self) -> Result<Point3, DxfError> {
        Ok(Point3::new(
            self.require(10, "圆心 X")?,
            self.require(20, "圆心 Y")?,
            self.optional(30, 0.0),
        ))
    }

    /// 拉伸方向（组码 210/220/230），缺省为 +Z。
    fn normal(&self) -> Vector3 {
        Vector3::new(
            self.optional(210, 0.0),
            self.optional(220, 0.0),
            self.optional(230, 1.0),
        )
    }

    fn layer(&self) -> String {
        self.layer.clone().unwrap_or_else(|| "0".to_string())
    }
}

struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        let code_line = loop {
            match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    // 容忍文件末尾的空行
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Ok(None),
            }
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(DxfError::invalid(format!(
                    "文件在第 {} 行结束，缺少与组码对应的值行",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DxfError::invalid(format!(
                "第 {} 行的组码 \"{}\" 无法解析为整数",
                self.line_number - 1,
                code_line.trim()
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();
        Ok(Some((code, value)))
    }

    fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "DXF pair 只能回退一次");
        self.buffer = Some(pair);
    }
}

/// `nan`、`inf` 以及溢出为无穷的字面量（如 `1e999`）都视为非法。
fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))?;
    if !value.is_finite() {
        return Err(DxfError::invalid(format!(
            "{context} 不是有限数值（值：\"{raw}\"）"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_reports_dangling_group_code() {
        let mut reader = DxfReader::new("0\nSECTION\n2");
        assert!(reader.next_pair().unwrap().is_some());
        let err = reader.next_pair().unwrap_err();
        assert!(err.message.contains("缺少与组码对应的值行"));
    }

    #[test]
    fn reader_rejects_non_numeric_group_code() {
        let mut reader = DxfReader::new("abc\nLINE\n");
        let err = reader.next_pair().unwrap_err();
        assert!(err.message.contains("无法解析为整数"));
    }

    #[test]
    fn put_back_returns_same_pair() {
        let mut reader = DxfReader::new("0\nLINE\n8\nWALLS\n");
        let pair = reader.next_pair().unwrap().unwrap();
        reader.put_back(pair);
        assert_eq!(reader.next_pair().unwrap(), Some((0, "LINE".to_string())));
        assert_eq!(reader.next_pair().unwrap(), Some((8, "WALLS".to_string())));
        assert_eq!(reader.next_pair().unwrap(), None);
    }

    #[test]
    fn numbers_must_be_finite() {
        assert_eq!(parse_f64(" 12.5 ", "ARC 组码 40").unwrap(), 12.5);
        for raw in ["nan", "inf", "-inf", "1e999"] {
            let err = parse_f64(raw, "ARC 组码 51").unwrap_err();
            assert!(err.message.contains("不是有限数值"), "{raw}: {}", err.message);
        }
    }
}
