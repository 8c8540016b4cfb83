// ==========================================
// 合同数据登记系统 - 行分类器
// ==========================================
// 纯函数: 不写库
// 顺序: 第 1 行 → 表头; 全空 → 空行; 必填缺失 → DATA_ERROR; 其余 → 候选数据行
// ==========================================

use crate::domain::messages;
use crate::domain::types::RowOutcome;

/// 分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowClass {
    Header,
    Empty,
    MissingMandatory,
    /// 结构合法，继续做领域校验
    Candidate,
}

/// 单元格视为缺失: None 或空串（只含空格的单元格算有值）
pub fn is_absent(cell: Option<&Option<String>>) -> bool {
    match cell {
        None | Some(None) => true,
        Some(Some(v)) => v.is_empty(),
    }
}

pub struct RowClassifier<'a> {
    mandatory_positions: &'a [usize],
    mandatory_field_names: &'a [&'a str],
}

impl<'a> RowClassifier<'a> {
    pub fn new(mandatory_positions: &'a [usize], mandatory_field_names: &'a [&'a str]) -> Self {
        Self {
            mandatory_positions,
            mandatory_field_names,
        }
    }

    /// # 参数
    /// - `row_nr`: 1 起始行号
    /// - `cells`: 行单元格
    pub fn classify(&self, row_nr: usize, cells: &[Option<String>]) -> RowClass {
        if row_nr == 1 {
            return RowClass::Header;
        }
        if cells.iter().all(|c| is_absent(Some(c))) {
            return RowClass::Empty;
        }
        if self
            .mandatory_positions
            .iter()
            .any(|pos| is_absent(cells.get(*pos)))
        {
            return RowClass::MissingMandatory;
        }
        RowClass::Candidate
    }

    /// 终态分类对应的结果；候选行返回 None
    pub fn outcome(&self, class: &RowClass) -> Option<RowOutcome> {
        match class {
            RowClass::Header => Some(RowOutcome::Header),
            RowClass::Empty => Some(RowOutcome::Empty),
            RowClass::MissingMandatory => Some(RowOutcome::Error(
                messages::missing_mandatory_fields(self.mandatory_field_names),
            )),
            RowClass::Candidate => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::RowStatus;

    fn row(cells: &[Option<&str>]) -> Vec<Option<String>> {
        cells.iter().map(|c| c.map(str::to_string)).collect()
    }

    #[test]
    fn test_classify_rows() {
        let names = ["contract_nr", "contract_status"];
        let classifier = RowClassifier::new(&[0, 1], &names);

        assert_eq!(classifier.classify(1, &row(&[None, None])), RowClass::Header);
        assert_eq!(classifier.classify(2, &row(&[None, Some(""), None])), RowClass::Empty);
        assert_eq!(
            classifier.classify(3, &row(&[Some("41"), Some(""), Some("IAAS")])),
            RowClass::MissingMandatory
        );
        // 行比必填列短
        assert_eq!(classifier.classify(4, &row(&[Some("41")])), RowClass::MissingMandatory);
        assert_eq!(
            classifier.classify(5, &row(&[Some("41"), Some("Actief")])),
            RowClass::Candidate
        );
    }

    #[test]
    fn test_whitespace_cells_count_as_present() {
        let names = ["contract_nr", "contract_status"];
        let classifier = RowClassifier::new(&[0, 1], &names);

        assert_eq!(
            classifier.classify(2, &row(&[Some("  "), None, None])),
            RowClass::MissingMandatory
        );
        assert_eq!(
            classifier.classify(3, &row(&[Some("41"), Some(" ")])),
            RowClass::Candidate
        );
    }

    #[test]
    fn test_missing_mandatory_message_lists_mandatory_fields() {
        let names = ["contract_nr", "contract_status"];
        let classifier = RowClassifier::new(&[0, 1], &names);
        let outcome = classifier.outcome(&RowClass::MissingMandatory).unwrap();
        assert_eq!(outcome.status(), RowStatus::DataError);
        assert_eq!(
            outcome.message(),
            Some("Missing one or more mandatory fields: [contract_nr, contract_status]")
        );
        assert!(classifier.outcome(&RowClass::Candidate).is_none());
    }
}
