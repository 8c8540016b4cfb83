// ==========================================
// 合同数据登记系统 - 字段取值校验
// ==========================================
// 日期/金额字段有值但无法解析 → DATA_WARNING（行仍然入暂存并挂到 DPOU）
// ==========================================

use crate::domain::contract::{ContractField, ContractValues, FieldKind};
use crate::domain::messages;
use chrono::{NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// 金额: 可带 € 符号; 支持 1234.56 / 1.234,56 / 1,234.56 / 1234,56
pub fn parse_amount(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned,
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 返回第一个取值无法识别的字段提示；全部合法返回 None
pub fn first_unrecognised_value(values: &ContractValues) -> Option<String> {
    for field in ContractField::ALL {
        let Some(raw) = values.get(field) else {
            continue;
        };
        if raw.trim().is_empty() {
            continue;
        }
        let ok = match field.kind() {
            FieldKind::Text => true,
            FieldKind::Date => parse_date(raw).is_some(),
            FieldKind::Amount => parse_amount(raw).is_some(),
        };
        if !ok {
            return Some(messages::unrecognised_value(field.column(), raw));
        }
    }
    None
}
