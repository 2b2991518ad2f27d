// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spreadsheet export of the report table.

use raumbuch_core::ScalarValue;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::error::{Error, Result};
use crate::projection::{AREA_LABEL, LAUFNUMMER};
use crate::table::FinalTable;

/// Worksheet name of the report
pub const SHEET_NAME: &str = "Raumbuch";

/// Render the table as an `.xlsx` workbook. Labels are written as they
/// are, repeats included.
pub fn write_xlsx(table: &FinalTable) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header = Format::new().set_bold();
    let integer = Format::new().set_num_format("0");
    let area = Format::new().set_num_format("0.00");

    for (col, label) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, column(col)?, label, &header)?;
    }

    for (index, cells) in table.rows.iter().enumerate() {
        let row = u32::try_from(index + 1)
            .map_err(|_| Error::Export(format!("too many rows: {}", table.rows.len())))?;

        for (col, (label, cell)) in table.columns.iter().zip(cells).enumerate() {
            let Some(value) = cell else {
                continue;
            };
            let format = match (label.as_str(), value) {
                (LAUFNUMMER, ScalarValue::Integer(_)) => Some(&integer),
                (AREA_LABEL, _) => Some(&area),
                _ => None,
            };
            write_value(worksheet, row, column(col)?, value, format)?;
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    worksheet.autofit();

    Ok(workbook.save_to_buffer()?)
}

fn column(index: usize) -> Result<u16> {
    u16::try_from(index).map_err(|_| Error::Export(format!("too many columns: {}", index + 1)))
}

fn write_value(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &ScalarValue,
    format: Option<&Format>,
) -> Result<()> {
    match (value, format) {
        (ScalarValue::Integer(i), Some(format)) => {
            worksheet.write_number_with_format(row, col, *i as f64, format)?;
        }
        (ScalarValue::Integer(i), None) => {
            worksheet.write_number(row, col, *i as f64)?;
        }
        (ScalarValue::Real(r), Some(format)) => {
            worksheet.write_number_with_format(row, col, *r, format)?;
        }
        (ScalarValue::Real(r), None) => {
            worksheet.write_number(row, col, *r)?;
        }
        (ScalarValue::Boolean(b), _) | (ScalarValue::Logical(Some(b)), _) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        (ScalarValue::Text(text), _) => {
            worksheet.write_string(row, col, text)?;
        }
        (ScalarValue::Logical(None), _) => {
            worksheet.write_string(row, col, value.to_string())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto_from_rs, Data, Reader};
    use std::io::Cursor;

    #[test]
    fn test_write_xlsx_reads_back() {
        let table = FinalTable {
            columns: vec![
                LAUFNUMMER.to_string(),
                "Breite".to_string(),
                "Breite".to_string(),
                "Nutzung".to_string(),
                AREA_LABEL.to_string(),
            ],
            rows: vec![
                vec![
                    Some(ScalarValue::Integer(12)),
                    Some(ScalarValue::Real(3.5)),
                    None,
                    Some(ScalarValue::Text("Büro".into())),
                    Some(ScalarValue::Real(14.0)),
                ],
                vec![None, None, Some(ScalarValue::Boolean(true)), None, None],
            ],
        };

        let bytes = write_xlsx(&table).unwrap();
        assert_eq!(&bytes[..2], b"PK");

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range(SHEET_NAME).unwrap();

        assert_eq!(
            range.get_value((0, 4)),
            Some(&Data::String(AREA_LABEL.to_string()))
        );
        // Export keeps the repeated label
        assert_eq!(range.get_value((0, 2)), Some(&Data::String("Breite".to_string())));
        assert_eq!(range.get_value((1, 0)), Some(&Data::Float(12.0)));
        assert_eq!(range.get_value((1, 3)), Some(&Data::String("Büro".to_string())));
        assert_eq!(range.get_value((1, 4)), Some(&Data::Float(14.0)));
        assert_eq!(range.get_value((2, 2)), Some(&Data::Bool(true)));
        assert!(matches!(range.get_value((2, 0)), None | Some(Data::Empty)));
    }

    #[test]
    fn test_header_only() {
        let table = FinalTable {
            columns: vec![LAUFNUMMER.to_string(), AREA_LABEL.to_string()],
            rows: Vec::new(),
        };
        let bytes = write_xlsx(&table).unwrap();
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range(SHEET_NAME).unwrap();
        assert_eq!(range.height(), 1);
    }
}
