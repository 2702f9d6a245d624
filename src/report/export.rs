use chrono::{Datelike, NaiveDateTime, Timelike};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

use crate::error::Result;
use crate::types::{CellValue, Order};

pub const EXPORT_SHEET: &str = "Pedidos";

/// Write the prepared columns and the given orders to xlsx bytes.
/// Cells go out exactly as preparation left them.
pub fn export_orders(columns: &[String], orders: &[&Order]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    let sheet = workbook.add_worksheet();
    sheet.set_name(EXPORT_SHEET)?;

    for (col, name) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, &header)?;
    }

    for (i, order) in orders.iter().enumerate() {
        let row = i as u32 + 1;
        for (c, cell) in order.cells.iter().enumerate() {
            let col = c as u16;
            match cell {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    sheet.write_string(row, col, s)?;
                }
                CellValue::Number(n) => {
                    sheet.write_number(row, col, *n)?;
                }
                CellValue::Bool(b) => {
                    sheet.write_boolean(row, col, *b)?;
                }
                // Excel cannot hold dates before 1900; those go out as text.
                CellValue::DateTime(dt) => match excel_datetime(dt) {
                    Some(xdt) => {
                        sheet.write_datetime_with_format(row, col, &xdt, &date_format)?;
                    }
                    None => {
                        sheet.write_string(row, col, dt.to_string())?;
                    }
                },
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn excel_datetime(dt: &NaiveDateTime) -> Option<ExcelDateTime> {
    let year = u16::try_from(dt.year()).ok()?;
    ExcelDateTime::from_ymd(year, dt.month() as u8, dt.day() as u8)
        .and_then(|d| d.and_hms(dt.hour() as u16, dt.minute() as u8, dt.second()))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::prepare_orders;
    use crate::report::filter_month;
    use crate::types::RawTable;
    use calamine::{open_workbook_auto_from_rs, Data, Reader};
    use std::io::Cursor;

    fn prepared() -> crate::types::OrderTable {
        let table = RawTable {
            name: "Pedido_Vendas".to_string(),
            headers: vec!["data".into(), "valor_de_venda".into(), "tecnico".into()],
            rows: vec![
                vec![
                    CellValue::Text("2026-01-05".into()),
                    CellValue::Number(1000.0),
                    CellValue::Text("Ana".into()),
                ],
                vec![
                    CellValue::Text("2026-02-01".into()),
                    CellValue::Number(10.0),
                    CellValue::Empty,
                ],
                vec![
                    CellValue::Text("2026-01-20".into()),
                    CellValue::Number(500.0),
                    CellValue::Empty,
                ],
            ],
        };
        prepare_orders(&table).unwrap().0
    }

    fn read_back(bytes: Vec<u8>) -> Vec<Vec<Data>> {
        let mut wb = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        let range = wb.worksheet_range(EXPORT_SHEET).unwrap();
        range.rows().map(|r| r.to_vec()).collect()
    }

    #[test]
    fn exports_month_subset_with_all_prepared_columns() {
        let table = prepared();
        let jan = "01/2026".parse().unwrap();
        let subset = filter_month(&table.orders, jan);
        let rows = read_back(export_orders(&table.columns, &subset).unwrap());

        assert_eq!(rows.len(), 3);
        let header: Vec<String> = rows[0].iter().map(|c| c.to_string()).collect();
        assert_eq!(header, vec!["data", "valor_de_venda", "tecnico", "mes", "lucro_bruto"]);

        assert!(matches!(rows[1][0], Data::DateTime(_)));
        assert_eq!(rows[1][1], Data::Float(1000.0));
        assert_eq!(rows[1][2], Data::String("Ana".into()));
        assert_eq!(rows[1][3], Data::String("01/2026".into()));
        assert_eq!(rows[2][1], Data::Float(500.0));
        assert_eq!(rows[2][2], Data::Empty);
    }

    #[test]
    fn empty_selection_exports_header_only() {
        let table = prepared();
        let rows = read_back(export_orders(&table.columns, &[]).unwrap());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), table.columns.len());
    }
}
