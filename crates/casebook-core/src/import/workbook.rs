//! Workbook reading: xlsx sheets to raw rows.
//!
//! The first file row is a banner, the second carries the column headers,
//! and data starts on the third. Columns are located by header name, so
//! column order does not matter; a missing column simply yields empty cells.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use tracing::warn;

use crate::dates::{excel_serial_to_date, INVOICE_DATE_FORMAT, LOSS_DATE_FORMAT};
use crate::error::Result;
use crate::import::SheetRow;

const HEADER_CASE_NO: &str = "ABL SG Case Ref.";
const HEADER_CLIENTS: &str = "Clients/ Brokers";
const HEADER_INSURED: &str = "Insured";
const HEADER_CASE_TITLE: &str = "Case Title";
const HEADER_DATE_OF_LOSS: &str = "Date of loss";
const HEADER_INSURERS: &str = "Insurers";
const HEADER_INVOICE_NO: &str = "Invoice No";
const HEADER_INVOICE_DATE: &str = "Date of Invoice";
const HEADER_ISSUING_OFFICE: &str = "Issuing Office";
const HEADER_STATUS: &str = "Status";
const HEADER_AMOUNT_MYR: &str = "Invoice Amount (MYR)";
const HEADER_AMOUNT_USD: &str = "Invoice Amount (USD)";
const HEADER_FX_RATE: &str = "Fx Rate";
const HEADER_INSURER_AMOUNTS_MYR: &str = "Insurer Amounts (MYR)";
const HEADER_INSURER_AMOUNTS_USD: &str = "Insurer Amounts (USD)";

/// One worksheet's rows.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<SheetRow>,
}

/// Read every sheet of a workbook. A sheet that cannot be read is skipped
/// with a warning; an unopenable workbook is an error.
pub fn read_workbook(path: &Path) -> Result<Vec<Sheet>> {
    let mut workbook = open_workbook_auto(path)?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(error) => {
                warn!(sheet = %name, %error, "sheet unreadable, skipping");
                continue;
            }
        };
        sheets.push(Sheet {
            rows: sheet_rows(&range),
            name,
        });
    }
    Ok(sheets)
}

fn sheet_rows(range: &Range<Data>) -> Vec<SheetRow> {
    // Banner row, then the header row, then data.
    let mut rows = range.rows().skip(1);
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let columns = ColumnMap::from_header(header);
    rows.map(|cells| columns.extract(cells)).collect()
}

/// Header-name to column-index mapping for one sheet.
#[derive(Debug, Default)]
struct ColumnMap {
    case_no: Option<usize>,
    clients: Option<usize>,
    insured: Option<usize>,
    case_title: Option<usize>,
    date_of_loss: Option<usize>,
    insurers: Option<usize>,
    invoice_no: Option<usize>,
    invoice_date: Option<usize>,
    issuing_office: Option<usize>,
    status: Option<usize>,
    amount_myr: Option<usize>,
    amount_usd: Option<usize>,
    fx_rate: Option<usize>,
    insurer_amounts_myr: Option<usize>,
    insurer_amounts_usd: Option<usize>,
}

impl ColumnMap {
    fn from_header(cells: &[Data]) -> Self {
        let mut map = Self::default();
        for (index, cell) in cells.iter().enumerate() {
            match cell_text(cell).trim() {
                HEADER_CASE_NO => map.case_no = Some(index),
                HEADER_CLIENTS => map.clients = Some(index),
                HEADER_INSURED => map.insured = Some(index),
                HEADER_CASE_TITLE => map.case_title = Some(index),
                HEADER_DATE_OF_LOSS => map.date_of_loss = Some(index),
                HEADER_INSURERS => map.insurers = Some(index),
                HEADER_INVOICE_NO => map.invoice_no = Some(index),
                HEADER_INVOICE_DATE => map.invoice_date = Some(index),
                HEADER_ISSUING_OFFICE => map.issuing_office = Some(index),
                HEADER_STATUS => map.status = Some(index),
                HEADER_AMOUNT_MYR => map.amount_myr = Some(index),
                HEADER_AMOUNT_USD => map.amount_usd = Some(index),
                HEADER_FX_RATE => map.fx_rate = Some(index),
                HEADER_INSURER_AMOUNTS_MYR => map.insurer_amounts_myr = Some(index),
                HEADER_INSURER_AMOUNTS_USD => map.insurer_amounts_usd = Some(index),
                _ => {}
            }
        }
        map
    }

    fn extract(&self, cells: &[Data]) -> SheetRow {
        SheetRow {
            case_no: self.text(cells, self.case_no),
            clients: self.text(cells, self.clients),
            insured: self.text(cells, self.insured),
            case_title: self.text(cells, self.case_title),
            date_of_loss: self.date(cells, self.date_of_loss, LOSS_DATE_FORMAT),
            insurers: self.text(cells, self.insurers),
            invoice_no: self.text(cells, self.invoice_no),
            invoice_date: self.date(cells, self.invoice_date, INVOICE_DATE_FORMAT),
            issuing_office: self.text(cells, self.issuing_office),
            status: self.text(cells, self.status),
            amount_myr: self.text(cells, self.amount_myr),
            amount_usd: self.text(cells, self.amount_usd),
            fx_rate: self.text(cells, self.fx_rate),
            insurer_amounts_myr: self.text(cells, self.insurer_amounts_myr),
            insurer_amounts_usd: self.text(cells, self.insurer_amounts_usd),
        }
    }

    fn text(&self, cells: &[Data], column: Option<usize>) -> String {
        column
            .and_then(|index| cells.get(index))
            .map(cell_text)
            .unwrap_or_default()
    }

    /// Like `text`, but a native date cell formats with the given format
    /// instead of ISO.
    fn date(&self, cells: &[Data], column: Option<usize>, format: &str) -> String {
        match column.and_then(|index| cells.get(index)) {
            Some(Data::DateTime(value)) => excel_serial_to_date(value.as_f64())
                .map(|date| date.format(format).to_string())
                .unwrap_or_default(),
            Some(cell) => cell_text(cell),
            None => String::new(),
        }
    }
}

/// Render a cell as text. Blank cells are empty strings, not missing values;
/// whole-number floats drop the trailing `.0` so references like `2024001`
/// survive the spreadsheet's float coercion.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(text) => text.clone(),
        Data::Float(value) => {
            if value.fract() == 0.0 && value.abs() < 1e15 {
                format!("{}", *value as i64)
            } else {
                value.to_string()
            }
        }
        Data::Int(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        Data::DateTime(value) => excel_serial_to_date(value.as_f64())
            .map(|date| date.format(INVOICE_DATE_FORMAT).to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(text) | Data::DurationIso(text) => text.clone(),
    }
}
