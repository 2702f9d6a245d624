use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use tracing::{debug, warn};

use crate::config::SheetNames;
use crate::error::{AppError, Result};
use crate::types::{CellValue, RawTable};

/// The four source tables. Headers are exactly as found in the sheet;
/// normalization happens in a later step.
#[derive(Debug, Clone)]
pub struct Workbook {
    pub orders: RawTable,
    pub targets: RawTable,
    pub customers: Option<RawTable>,
    pub partners: Option<RawTable>,
}

/// Read the workbook at `path`. A missing file, an unreadable workbook, or a
/// missing orders/targets sheet all fail the load.
pub fn load_workbook(path: &str, sheets: &SheetNames) -> Result<Workbook> {
    if !Path::new(path).is_file() {
        return Err(AppError::SourceMissing(path.to_string()));
    }
    let bytes = std::fs::read(path)?;
    load_workbook_from_bytes(bytes, sheets)
}

/// Same as [`load_workbook`] for an in-memory xlsx/xls/ods payload.
pub fn load_workbook_from_bytes(bytes: Vec<u8>, sheets: &SheetNames) -> Result<Workbook> {
    let mut wb = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    read_sheets(&mut wb, sheets)
}

fn read_sheets<RS: Read + Seek>(wb: &mut Sheets<RS>, sheets: &SheetNames) -> Result<Workbook> {
    let available = wb.sheet_names();
    debug!("Workbook sheets: {available:?}");

    let orders = read_table(wb, &available, &sheets.orders)?
        .ok_or_else(|| AppError::MissingSheet(sheets.orders.clone()))?;
    let targets = read_table(wb, &available, &sheets.targets)?
        .ok_or_else(|| AppError::MissingSheet(sheets.targets.clone()))?;

    let customers = read_table(wb, &available, &sheets.customers)?;
    if customers.is_none() {
        warn!("Customers sheet '{}' not found, skipping", sheets.customers);
    }
    let partners = read_table(wb, &available, &sheets.partners)?;
    if partners.is_none() {
        warn!("Partners sheet '{}' not found, skipping", sheets.partners);
    }

    Ok(Workbook {
        orders,
        targets,
        customers,
        partners,
    })
}

/// First non-empty row is the header. Data rows are cut or padded to the
/// header width; rows with no content at all are skipped.
fn read_table<RS: Read + Seek>(
    wb: &mut Sheets<RS>,
    available: &[String],
    name: &str,
) -> Result<Option<RawTable>> {
    if !available.iter().any(|n| n == name) {
        return Ok(None);
    }
    let range = wb.worksheet_range(name)?;
    let mut rows = range.rows();

    let headers: Vec<String> = match rows.next() {
        Some(r) => r.iter().map(header_text).collect(),
        None => Vec::new(),
    };
    let width = headers.len();

    let rows: Vec<Vec<CellValue>> = rows
        .map(|r| {
            let mut cells: Vec<CellValue> = r.iter().take(width).map(cell_value).collect();
            cells.resize(width, CellValue::Empty);
            cells
        })
        .filter(|cells| !cells.iter().all(CellValue::is_empty))
        .collect();

    debug!("Sheet '{name}': {} columns, {} rows", width, rows.len());

    Ok(Some(RawTable {
        name: name.to_string(),
        headers,
        rows,
    }))
}

fn header_text(cell: &Data) -> String {
    cell_value(cell).label().unwrap_or_default()
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => CellValue::DateTime(ndt),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook as XlsxWorkbook};

    fn sample_xlsx(with_partners: bool) -> Vec<u8> {
        let mut wb = XlsxWorkbook::new();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");

        let orders = wb.add_worksheet();
        orders.set_name("Pedido_Vendas").unwrap();
        orders.write_string(0, 0, "Data").unwrap();
        orders.write_string(0, 1, "Valor de Venda").unwrap();
        orders.write_string(0, 2, "Técnico").unwrap();
        let jan5 = ExcelDateTime::from_ymd(2026, 1, 5).unwrap();
        orders.write_datetime_with_format(1, 0, &jan5, &date_format).unwrap();
        orders.write_number(1, 1, 1000.0).unwrap();
        orders.write_string(1, 2, "Ana").unwrap();
        orders.write_string(2, 0, "2026-01-20").unwrap();
        orders.write_number(2, 1, 500.0).unwrap();
        // Row 3 left blank on purpose; row 4 has only a revenue.
        orders.write_number(4, 1, 10.0).unwrap();

        let targets = wb.add_worksheet();
        targets.set_name("Financeiro_Comercial").unwrap();
        targets.write_string(0, 0, "Mês/Ano").unwrap();
        targets.write_string(0, 1, "Meta do Mês").unwrap();
        targets.write_string(1, 0, "01/2026").unwrap();
        targets.write_number(1, 1, 2000.0).unwrap();

        let customers = wb.add_worksheet();
        customers.set_name("Clientes").unwrap();
        customers.write_string(0, 0, "Nome").unwrap();
        customers.write_string(1, 0, "Loja Centro").unwrap();

        if with_partners {
            let partners = wb.add_worksheet();
            partners.set_name("Tecnicos_Parceiros").unwrap();
            partners.write_string(0, 0, "Nome").unwrap();
            partners.write_string(1, 0, "Ana").unwrap();
        }

        wb.save_to_buffer().unwrap()
    }

    #[test]
    fn reads_all_sheets_with_raw_headers() {
        let wb = load_workbook_from_bytes(sample_xlsx(true), &SheetNames::default()).unwrap();

        assert_eq!(wb.orders.headers, vec!["Data", "Valor de Venda", "Técnico"]);
        assert_eq!(wb.orders.rows.len(), 3, "blank row must be skipped");
        assert!(matches!(wb.orders.rows[0][0], CellValue::DateTime(_)));
        assert_eq!(wb.orders.rows[1][0], CellValue::Text("2026-01-20".into()));
        assert_eq!(wb.orders.rows[0][1], CellValue::Number(1000.0));
        assert_eq!(wb.orders.rows[2][0], CellValue::Empty);
        assert_eq!(wb.orders.rows[2].len(), 3, "short rows are padded");

        assert_eq!(wb.targets.rows.len(), 1);
        assert_eq!(wb.customers.map(|t| t.rows.len()), Some(1));
        assert!(wb.partners.is_some());
    }

    #[test]
    fn optional_sheets_may_be_absent() {
        let wb = load_workbook_from_bytes(sample_xlsx(false), &SheetNames::default()).unwrap();
        assert!(wb.partners.is_none());
        assert!(wb.customers.is_some());
    }

    #[test]
    fn missing_required_sheet_is_fatal() {
        let sheets = SheetNames {
            orders: "Pedidos".to_string(),
            ..SheetNames::default()
        };
        let err = load_workbook_from_bytes(sample_xlsx(true), &sheets).unwrap_err();
        assert!(matches!(err, AppError::MissingSheet(ref s) if s == "Pedidos"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_workbook("/nonexistent/gestao.xlsx", &SheetNames::default()).unwrap_err();
        assert!(matches!(err, AppError::SourceMissing(_)));
    }
}
