// ==========================================
// 合同数据登记系统 - 字段映射器
// ==========================================
// 职责: 表头标签 → 字段 → 列位置
// 匹配规则: 去首尾空白后转大写比较（大小写不敏感）
// ==========================================

use crate::domain::messages::FILE_DEFINITION_ERROR;
use crate::importer::error::{ImportError, ImportResult};
use std::collections::BTreeMap;
use std::fmt::Display;

fn normalize(label: &str) -> String {
    label.trim().to_uppercase()
}

pub struct FieldMapper;

impl FieldMapper {
    /// 解析字段列位置
    ///
    /// # 参数
    /// - `found_headers`: 文件实际表头行
    /// - `declared`: (字段, 表头标签) 声明表
    ///
    /// # 返回
    /// - 字段 → 0 起始列号；文件中不存在的标签直接省略（此阶段不报错）
    /// - 同一标签出现多次时取第一列
    pub fn resolve_positions<F: Copy + Ord>(
        found_headers: &[Option<String>],
        declared: &[(F, &str)],
    ) -> BTreeMap<F, usize> {
        let normalized: Vec<Option<String>> = found_headers
            .iter()
            .map(|h| h.as_deref().map(normalize))
            .collect();

        let mut positions = BTreeMap::new();
        for (field, label) in declared {
            let wanted = normalize(label);
            if let Some(idx) = normalized
                .iter()
                .position(|h| h.as_deref() == Some(wanted.as_str()))
            {
                positions.insert(*field, idx);
            }
        }
        positions
    }

    /// 必填字段的列位置（按必填字段声明顺序）
    ///
    /// # 返回
    /// - Err(FileDefinition): 有必填字段未解析到列
    pub fn mandatory_field_positions<F: Copy + Ord + Display>(
        mandatory: &[F],
        positions: &BTreeMap<F, usize>,
    ) -> ImportResult<Vec<(F, usize)>> {
        let mut result = Vec::with_capacity(mandatory.len());
        let mut missing = Vec::new();
        for field in mandatory {
            match positions.get(field) {
                Some(idx) => result.push((*field, *idx)),
                None => missing.push(field.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(ImportError::FileDefinition(format!(
                "{} [{}]",
                FILE_DEFINITION_ERROR,
                missing.join(", ")
            )));
        }
        Ok(result)
    }

    /// 校验必填表头全部存在（大小写不敏感）
    pub fn check_mandatory_headers(
        found_headers: &[Option<String>],
        mandatory_headers: &[&str],
    ) -> ImportResult<()> {
        let found: Vec<String> = found_headers
            .iter()
            .filter_map(|h| h.as_deref().map(normalize))
            .collect();
        let missing: Vec<&str> = mandatory_headers
            .iter()
            .copied()
            .filter(|h| !found.contains(&normalize(h)))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::FileDefinition(format!(
                "mandatory header(s) missing: [{}]",
                missing.join(", ")
            )))
        }
    }
}
