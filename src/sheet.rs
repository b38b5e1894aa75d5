// Spreadsheet interchange between the pipelines.
//
// Columns are looked up by header name, so extra columns and reordering are tolerated on input.
// Output always uses the fixed column order below.

use crate::{
    error::{Error, Result},
    models::{Business, Lookup, NOT_AVAILABLE, Owners},
};
use calamine::{Data, Reader, open_workbook_auto};
use rust_xlsxwriter::{Format, Workbook};
use std::{collections::HashMap, path::Path};
use tracing::{debug, trace};

pub const COL_NAME: &str = "Name";
pub const COL_ADDRESS: &str = "Address";
pub const COL_CATEGORY: &str = "Category";
pub const COL_PHONE: &str = "Phone";
pub const COL_WEBSITE: &str = "Website";
pub const COL_WEBSITE_OWNER: &str = "Website Owner";
pub const COL_GOOGLE_OWNER: &str = "Google Owner";
pub const COL_BBB_OWNER: &str = "BBB Owner";

const BASE_COLUMNS: [&str; 5] = [COL_NAME, COL_ADDRESS, COL_CATEGORY, COL_PHONE, COL_WEBSITE];
const OWNER_COLUMNS: [&str; 3] = [COL_WEBSITE_OWNER, COL_GOOGLE_OWNER, COL_BBB_OWNER];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Csv,
    Workbook,
}

fn format_of(path: &Path) -> Result<FileKind> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => Ok(FileKind::Csv),
        Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => Ok(FileKind::Workbook),
        _ => Err(Error::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Header row and the non-blank data rows, from the first sheet of a workbook or from a CSV file
fn read_table(path: &Path) -> Result<Option<(Columns, Vec<Vec<String>>)>> {
    let rows = match format_of(path)? {
        FileKind::Csv => read_csv_rows(path)?,
        FileKind::Workbook => read_workbook_rows(path)?,
    };
    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        return Ok(None);
    };
    let rows = rows
        .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
        .collect();
    Ok(Some((Columns::from_header(&header), rows)))
}

/// Read all business rows from the first sheet of a workbook, or from a CSV file
pub fn read_businesses<P: AsRef<Path>>(path: P) -> Result<Vec<Business>> {
    let path = path.as_ref();
    let (columns, rows) = read_table(path)?
        .filter(|(c, _)| c.has(COL_NAME))
        .ok_or_else(|| Error::MissingColumn {
            path: path.to_path_buf(),
            column: COL_NAME,
        })?;

    let businesses: Vec<Business> = rows.iter().map(|r| columns.business(r)).collect();
    debug!(path = %path.display(), rows = businesses.len(), "Read businesses");
    Ok(businesses)
}

/// Just the non-empty addresses, in row order. Only the Address column is required.
pub fn read_addresses<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let (columns, rows) = read_table(path)?
        .filter(|(c, _)| c.has(COL_ADDRESS))
        .ok_or_else(|| Error::MissingColumn {
            path: path.to_path_buf(),
            column: COL_ADDRESS,
        })?;

    let addresses: Vec<String> = rows
        .iter()
        .filter_map(|r| columns.get_available(r, COL_ADDRESS))
        .map(String::from)
        .collect();
    debug!(path = %path.display(), addresses = addresses.len(), "Read addresses");
    Ok(addresses)
}

/// Write businesses to a workbook or CSV, depending on the file extension.
/// Owner columns are included if any business has been through the owner lookup.
pub fn write_businesses<P: AsRef<Path>>(path: P, businesses: &[Business]) -> Result<()> {
    let path = path.as_ref();
    let with_owners = businesses.iter().any(|b| b.owners.is_some());
    let header = header(with_owners);
    let rows = businesses.iter().map(|b| row(b, with_owners));

    match format_of(path)? {
        FileKind::Csv => {
            let mut w = csv::Writer::from_path(path)?;
            w.write_record(&header)?;
            for r in rows {
                w.write_record(&r)?;
            }
            w.flush()?;
        }
        FileKind::Workbook => {
            let mut wb = Workbook::new();
            let ws = wb.add_worksheet();
            let bold = Format::new().set_bold();
            for (col, h) in header.iter().enumerate() {
                ws.write_string_with_format(0, col as u16, *h, &bold)?;
            }
            for (i, r) in rows.enumerate() {
                for (col, v) in r.iter().enumerate() {
                    ws.write_string(i as u32 + 1, col as u16, v)?;
                }
            }
            ws.autofit();
            wb.save(path)?;
        }
    }
    trace!(path = %path.display(), rows = businesses.len(), "Wrote businesses");
    Ok(())
}

fn header(with_owners: bool) -> Vec<&'static str> {
    let mut h = BASE_COLUMNS.to_vec();
    if with_owners {
        h.extend(OWNER_COLUMNS);
    }
    h
}

fn row(b: &Business, with_owners: bool) -> Vec<String> {
    let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_AVAILABLE.into());
    let mut r = vec![
        b.name.clone(),
        b.address.clone().unwrap_or_default(),
        b.category.clone().unwrap_or_default(),
        or_na(&b.phone),
        or_na(&b.website),
    ];
    if with_owners {
        let o = b.owners.clone().unwrap_or_default();
        r.extend([o.website.to_string(), o.google.to_string(), o.bbb.to_string()]);
    }
    r
}

fn read_csv_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows = Vec::new();
    for rec in rdr.records() {
        rows.push(rec?.iter().map(String::from).collect());
    }
    Ok(rows)
}

fn read_workbook_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut wb = open_workbook_auto(path)?;
    let range = wb
        .worksheet_range_at(0)
        .ok_or_else(|| Error::EmptyWorkbook(path.to_path_buf()))??;
    Ok(range
        .rows()
        .map(|r| r.iter().map(cell_to_string).collect())
        .collect())
}

fn cell_to_string(c: &Data) -> String {
    match c {
        Data::Empty => String::new(),
        // phone numbers without formatting come back as floats
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Header name to column index
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn from_header(header: &[String]) -> Self {
        Self {
            index: header
                .iter()
                .enumerate()
                .map(|(i, h)| (h.trim().to_string(), i))
                .collect(),
        }
    }

    fn has(&self, col: &str) -> bool {
        self.index.contains_key(col)
    }

    fn get<'a>(&self, row: &'a [String], col: &str) -> Option<&'a str> {
        self.index
            .get(col)
            .and_then(|&i| row.get(i))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Like get, but the N/A placeholder also counts as missing
    fn get_available<'a>(&self, row: &'a [String], col: &str) -> Option<&'a str> {
        self.get(row, col).filter(|v| *v != NOT_AVAILABLE)
    }

    fn has_owners(&self) -> bool {
        OWNER_COLUMNS.iter().any(|c| self.has(c))
    }

    fn business(&self, row: &[String]) -> Business {
        let owners = self.has_owners().then(|| {
            let lookup = |col: &str| Lookup::from(self.get(row, col).unwrap_or_default());
            Owners {
                website: lookup(COL_WEBSITE_OWNER),
                google: lookup(COL_GOOGLE_OWNER),
                bbb: lookup(COL_BBB_OWNER),
            }
        });
        Business {
            name: self.get(row, COL_NAME).unwrap_or_default().into(),
            address: self.get_available(row, COL_ADDRESS).map(String::from),
            category: self.get(row, COL_CATEGORY).map(String::from),
            phone: self.get_available(row, COL_PHONE).map(String::from),
            website: self.get_available(row, COL_WEBSITE).map(String::from),
            owners,
        }
    }
}
