// ==========================================
// 合同数据登记系统 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输出: 按行顺序的单元格序列，缺失单元格 = None
// 表头不在这里解释，由 field_mapper 处理
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use csv::{ReaderBuilder, StringRecord};
use std::fs;
use std::path::Path;

/// 支持的扩展名
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "csv"];

// ==========================================
// SheetRows - 解析结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetRows {
    rows: Vec<Vec<Option<String>>>,
}

impl SheetRows {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    /// 第 1 行（文件为空时返回空切片）
    pub fn header_row(&self) -> &[Option<String>] {
        self.rows.first().map(|r| r.as_slice()).unwrap_or(&[])
    }

    /// (1 起始行号, 单元格)
    pub fn iter_rows(&self) -> impl Iterator<Item = (usize, &[Option<String>])> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i + 1, row.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser {
    fn parse_rows(&self, file_path: &Path) -> ImportResult<SheetRows>;
}

/// 校验文件存在及扩展名，返回小写扩展名
pub fn check_extension(file_path: &Path) -> ImportResult<String> {
    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ImportError::FileFormat(format!(
            "unsupported file extension '{}' (expected .xlsx, .xls or .csv)",
            ext
        )));
    }
    if !file_path.exists() {
        return Err(ImportError::FileFormat(format!(
            "file not found: {}",
            file_path.display()
        )));
    }
    Ok(ext)
}

/// 片段开头连续空行数（\n、\r\n 或单独 \r）
fn leading_blank_lines(segment: &[u8]) -> usize {
    let mut count = 0;
    let mut rest = segment;
    loop {
        rest = match rest {
            [b'\r', b'\n', tail @ ..] | [b'\n', tail @ ..] | [b'\r', tail @ ..] => tail,
            _ => return count,
        };
        count += 1;
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_rows(&self, file_path: &Path) -> ImportResult<SheetRows> {
        let bytes = fs::read(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false) // 表头作为第 1 行返回
            .flexible(true) // 允许行长度不一致
            .from_reader(bytes.as_slice());

        // csv 读取器会跳过空行；按字节区间补回，保持行号与文件一致
        let mut rows: Vec<Vec<Option<String>>> = Vec::new();
        let mut record = StringRecord::new();
        let mut previous_end = 0usize;
        while reader.read_record(&mut record)? {
            let end = reader.position().byte() as usize;
            // CRLF 结尾的记录只吃掉 \r，随后的 \n 不算空行
            let last_terminator = previous_end.checked_sub(1).and_then(|i| bytes.get(i));
            let start = match (last_terminator, bytes.get(previous_end)) {
                (Some(b'\r'), Some(b'\n')) => previous_end + 1,
                _ => previous_end,
            };
            let skipped = bytes.get(start..end).map(leading_blank_lines).unwrap_or(0);
            // 表头之前的空行与 Excel 一致地忽略
            if !rows.is_empty() {
                rows.extend(std::iter::repeat_with(Vec::new).take(skipped));
            }
            rows.push(record.iter().map(non_empty).collect());
            previous_end = end;
        }

        Ok(SheetRows::new(rows))
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

/// 单元格 → 文本
///
/// - 整数值的浮点数输出为整数文本（合同号常被 Excel 存为数字）
/// - 日期输出为 YYYY-MM-DD
fn cell_to_value(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => non_empty(s),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                Some(format!("{}", *f as i64))
            } else {
                Some(f.to_string())
            }
        }
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(_) => cell
            .as_date()
            .map(|d| d.format("%Y-%m-%d").to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => non_empty(s),
    }
}

impl FileParser for ExcelParser {
    fn parse_rows(&self, file_path: &Path) -> ImportResult<SheetRows> {
        let mut workbook = open_workbook_auto(file_path)?;

        // 读取第一个 sheet
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ImportError::FileFormat("workbook has no worksheet".to_string()))??;

        // 使用区域不一定从 A1 开始，补齐前导行列使行号与表格一致
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<Option<String>>> = vec![Vec::new(); row_offset];
        for data_row in range.rows() {
            let mut values: Vec<Option<String>> = vec![None; col_offset];
            values.extend(data_row.iter().map(cell_to_value));
            rows.push(values);
        }

        Ok(SheetRows::new(rows))
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<SheetRows> {
        let path = file_path.as_ref();
        match check_extension(path)?.as_str() {
            "csv" => CsvParser.parse_rows(path),
            _ => ExcelParser.parse_rows(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_csv_parser_keeps_header_and_empty_cells() {
        let temp_file = csv_file(&["Contract nr.,Contract status", "41,Actief", ",", "42,"]);

        let rows = UniversalFileParser.parse(temp_file.path()).unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows.header_row(),
            &[Some("Contract nr.".to_string()), Some("Contract status".to_string())]
        );
        let all: Vec<_> = rows.iter_rows().collect();
        assert_eq!(all[1].0, 2);
        assert_eq!(all[2].1, &[None, None]);
        assert_eq!(all[3].1, &[Some("42".to_string()), None]);
    }

    #[test]
    fn test_csv_parser_keeps_blank_lines_as_empty_rows() {
        let temp_file = csv_file(&["", "h1,h2", "", "a,b", "", "", "c,d", ""]);

        let rows = UniversalFileParser.parse(temp_file.path()).unwrap();

        // 表头前与文件末尾的空行不计
        assert_eq!(rows.len(), 6);
        assert_eq!(rows.header_row(), &[Some("h1".to_string()), Some("h2".to_string())]);
        let all: Vec<_> = rows.iter_rows().collect();
        assert!(all[1].1.is_empty());
        assert_eq!(all[2].0, 3);
        assert_eq!(all[2].1, &[Some("a".to_string()), Some("b".to_string())]);
        assert!(all[3].1.is_empty());
        assert!(all[4].1.is_empty());
        assert_eq!(all[5].0, 6);
        assert_eq!(all[5].1, &[Some("c".to_string()), Some("d".to_string())]);
    }

    #[test]
    fn test_csv_parser_crlf_blank_lines() {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        temp_file.write_all(b"h1,h2\r\na,b\r\n\r\nc,d\r\n").unwrap();
        temp_file.flush().unwrap();

        let rows = UniversalFileParser.parse(temp_file.path()).unwrap();

        let all: Vec<_> = rows.iter_rows().collect();
        assert_eq!(all.len(), 4);
        assert_eq!(all[1].1, &[Some("a".to_string()), Some("b".to_string())]);
        assert!(all[2].1.is_empty());
        assert_eq!(all[3].0, 4);
        assert_eq!(all[3].1, &[Some("c".to_string()), Some("d".to_string())]);
    }

    #[test]
    fn test_leading_blank_lines_counts_crlf_once() {
        assert_eq!(leading_blank_lines(b"\r\n\n\ra,b\n"), 3);
        assert_eq!(leading_blank_lines(b"a,b\n"), 0);
        assert_eq!(leading_blank_lines(b""), 0);
    }

    #[test]
    fn test_unsupported_extension_is_file_format_error() {
        let temp_file = Builder::new().suffix(".txt").tempfile().unwrap();
        let err = UniversalFileParser.parse(temp_file.path()).unwrap_err();
        assert!(matches!(err, ImportError::FileFormat(_)));
    }

    #[test]
    fn test_unreadable_excel_is_file_format_error() {
        let mut temp_file = Builder::new().suffix(".xlsx").tempfile().unwrap();
        writeln!(temp_file, "this is not a workbook").unwrap();
        let err = UniversalFileParser.parse(temp_file.path()).unwrap_err();
        assert!(matches!(err, ImportError::FileFormat(_)));
    }
}
