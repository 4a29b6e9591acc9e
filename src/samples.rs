//! Placeholder inputs for local runs: a vendor master workbook and minimal PDFs.

use crate::error::{ProcurementError, Result};
use rust_xlsxwriter::{Workbook, XlsxError};

pub const SAMPLE_INVOICE_TEXT: &str = "Dummy Invoice for Cloud Corp. Total: $1000";
pub const SAMPLE_TICKET_TEXT: &str = "Dummy Jira Ticket. Approved by AJohnson.";

/// Header and rows of the sample vendor master sheet.
pub fn sample_master_rows() -> Vec<Vec<&'static str>> {
    vec![
        vec![
            "Service Description",
            "GL Account",
            "Tax Code",
            "Vendor Name",
            "Vendor Code",
        ],
        vec!["Cloud Computing Services", "651001", "I4", "Cloud Corp", "V1001"],
        vec!["Professional Consulting", "652005", "I4", "Consulting LLC", "V1002"],
    ]
}

pub fn sample_master_workbook() -> Result<Vec<u8>> {
    workbook_bytes(&[("Sheet1", sample_master_rows())])
}

/// Writes an in-memory xlsx with one sheet per entry; every cell is a string.
pub fn workbook_bytes(sheets: &[(&str, Vec<Vec<&str>>)]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).map_err(xlsx_err)?;
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                worksheet
                    .write_string(r as u32, c as u16, *value)
                    .map_err(xlsx_err)?;
            }
        }
    }

    workbook.save_to_buffer().map_err(xlsx_err)
}

fn xlsx_err(e: XlsxError) -> ProcurementError {
    ProcurementError::IoError(std::io::Error::other(e.to_string()))
}

/// A single-page PDF showing `text` in Helvetica.
pub fn placeholder_pdf(text: &str) -> Vec<u8> {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)");
    let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", escaped);

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }

    let xref_offset = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
    pdf.push_str("0000000000 65535 f \n");
    for offset in offsets {
        pdf.push_str(&format!("{:010} 00000 n \n", offset));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    ));

    pdf.into_bytes()
}
