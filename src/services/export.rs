//! Report rendering: CSV, spreadsheet, PDF and ZIP bundles of task rows

use std::io::{Cursor, Write};

use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use rust_xlsxwriter::{Format, Workbook};
use sea_orm::ConnectionTrait;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{AppError, Result};
use crate::schemas::DayCounts;
use crate::services::calendar::DayWindow;
use crate::services::reporting::{self, ExportFilter, ExportRow, ReportScope};
use crate::services::uploads::UploadStore;

pub const TASK_HEADERS: [&str; 7] = [
    "Point",
    "Type",
    "Address",
    "Cleaner",
    "Status",
    "Scheduled",
    "Completed",
];

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Rendered file ready to be sent as an attachment
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Formats of the daily admin report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Excel,
    Pdf,
    Zip,
}

impl ReportFormat {
    /// Parse a `format` query value; missing means Excel
    pub fn parse(value: Option<&str>) -> Result<Self> {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("excel") | Some("xlsx") => Ok(ReportFormat::Excel),
            Some("pdf") => Ok(ReportFormat::Pdf),
            Some("zip") | Some("rar") => Ok(ReportFormat::Zip),
            Some(_) => Err(AppError::BadRequest(
                "Invalid format. Use excel, pdf, or zip".to_string(),
            )),
        }
    }
}

/// Formats of the manager task export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskExportFormat {
    Csv,
    Excel,
}

impl TaskExportFormat {
    /// Anything but `csv` is a spreadsheet
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("csv") => TaskExportFormat::Csv,
            _ => TaskExportFormat::Excel,
        }
    }
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map(|t| t.to_rfc3339()).unwrap_or_default()
}

fn row_cells(row: &ExportRow) -> [String; 7] {
    [
        row.point_name.clone(),
        row.point_type.clone(),
        row.address.clone(),
        row.cleaner.clone(),
        row.status.to_string(),
        timestamp(row.scheduled_at),
        timestamp(row.completed_at),
    ]
}

// ============================================================================
// Encoders
// ============================================================================

/// UTF-8 CSV with a byte order mark so spreadsheet apps pick the encoding
pub fn tasks_csv(rows: &[ExportRow]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    let csv_err = |e: csv::Error| AppError::Internal(format!("CSV encoding failed: {}", e));

    writer.write_record(TASK_HEADERS).map_err(csv_err)?;
    for row in rows {
        writer.write_record(row_cells(row)).map_err(csv_err)?;
    }

    let body = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV encoding failed: {}", e)))?;

    let mut out = "\u{feff}".as_bytes().to_vec();
    out.extend(body);
    Ok(out)
}

pub fn tasks_xlsx(rows: &[ExportRow]) -> Result<Vec<u8>> {
    let xlsx_err = |e: rust_xlsxwriter::XlsxError| {
        AppError::Internal(format!("Spreadsheet encoding failed: {}", e))
    };

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Tasks").map_err(xlsx_err)?;

    for (col, title) in TASK_HEADERS.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *title, &header)
            .map_err(xlsx_err)?;
        sheet.set_column_width(col as u16, 22).map_err(xlsx_err)?;
    }

    for (i, row) in rows.iter().enumerate() {
        for (col, value) in row_cells(row).iter().enumerate() {
            sheet
                .write_string((i + 1) as u32, col as u16, value)
                .map_err(xlsx_err)?;
        }
    }

    workbook.save_to_buffer().map_err(xlsx_err)
}

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 18.0;
const LINE: f32 = 5.5;
const COLUMNS: [f32; 5] = [MARGIN, 62.0, 88.0, 122.0, 152.0];

/// Text cursor that starts a new page when it reaches the bottom margin
struct PdfCursor {
    doc: printpdf::PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl PdfCursor {
    fn advance(&mut self, lines: f32) {
        self.y -= LINE * lines;
        if self.y < MARGIN {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn text(&self, text: &str, size: f32, x: f32, font: &IndirectFontRef) {
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }
}

fn clip(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let mut s: String = value.chars().take(max.saturating_sub(1)).collect();
        s.push('~');
        s
    }
}

/// Day summary followed by the task table; photos are listed by path
pub fn report_pdf(window: &DayWindow, counts: &DayCounts, rows: &[ExportRow]) -> Result<Vec<u8>> {
    let pdf_err = |e: printpdf::Error| AppError::Internal(format!("PDF encoding failed: {}", e));

    let (doc, page, layer) = PdfDocument::new(
        format!("FeedbackATM report {}", window.label()),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_err)?;
    let layer = doc.get_page(page).get_layer(layer);

    let mut cursor = PdfCursor {
        doc,
        layer,
        y: PAGE_HEIGHT - MARGIN,
    };

    cursor.text("FeedbackATM report", 18.0, MARGIN, &bold);
    cursor.advance(2.0);
    cursor.text(&format!("Date: {}", window.label()), 10.0, MARGIN, &regular);
    cursor.advance(2.0);

    cursor.text("Summary for the day", 12.0, MARGIN, &bold);
    cursor.advance(1.5);
    for line in [
        format!("Service points: {}", counts.total_points),
        format!("Tasks scheduled: {}", counts.today_total_tasks),
        format!("Completed: {}", counts.today_completed_tasks),
        format!("Not completed: {}", counts.today_pending_tasks),
    ] {
        cursor.text(&line, 10.0, MARGIN, &regular);
        cursor.advance(1.0);
    }
    cursor.advance(1.5);

    cursor.text(&format!("Tasks ({})", rows.len()), 12.0, MARGIN, &bold);
    cursor.advance(1.5);
    for (x, title) in COLUMNS.iter().zip(["Point", "Type", "Cleaner", "Status", "Completed"]) {
        cursor.text(title, 8.0, *x, &bold);
    }
    cursor.advance(1.2);

    for row in rows {
        let cells = [
            clip(&row.point_name, 26),
            row.point_type.clone(),
            clip(&row.cleaner, 18),
            row.status.to_string(),
            row.completed_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
        ];
        for (x, cell) in COLUMNS.iter().zip(cells.iter()) {
            cursor.text(cell, 8.0, *x, &regular);
        }
        cursor.advance(1.0);

        for photo in &row.photos {
            cursor.text(&format!("photo: {}", photo), 7.0, COLUMNS[1], &regular);
            cursor.advance(1.0);
        }
    }

    cursor.doc.save_to_bytes().map_err(pdf_err)
}

/// Spreadsheet, PDF and the referenced photo files in one archive
pub async fn report_zip(
    store: &UploadStore,
    window: &DayWindow,
    counts: &DayCounts,
    rows: &[ExportRow],
) -> Result<Vec<u8>> {
    let xlsx = tasks_xlsx(rows)?;
    let pdf = report_pdf(window, counts, rows)?;

    let mut photos = Vec::new();
    for path in rows.iter().flat_map(|r| r.photos.iter()) {
        let Some(name) = path.rsplit('/').next() else {
            continue;
        };
        if photos.iter().any(|(n, _): &(String, Vec<u8>)| n == name) {
            continue;
        }
        match store.read(path).await? {
            Some(bytes) => photos.push((name.to_string(), bytes)),
            None => tracing::warn!(path = %path, "Photo missing from upload store"),
        }
    }

    let zip_err = |e: zip::result::ZipError| AppError::Internal(format!("ZIP encoding failed: {}", e));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let label = window.label();
    zip.start_file(format!("report_{}.xlsx", label), options)
        .map_err(zip_err)?;
    zip.write_all(&xlsx)?;
    zip.start_file(format!("report_{}.pdf", label), options)
        .map_err(zip_err)?;
    zip.write_all(&pdf)?;

    for (name, bytes) in photos {
        zip.start_file(format!("photos/{}", name), options)
            .map_err(zip_err)?;
        zip.write_all(&bytes)?;
    }

    Ok(zip.finish().map_err(zip_err)?.into_inner())
}

// ============================================================================
// Report builders
// ============================================================================

/// Daily admin report across all companies
pub async fn build_report<C: ConnectionTrait>(
    db: &C,
    store: &UploadStore,
    format: ReportFormat,
    window: &DayWindow,
) -> Result<ExportFile> {
    let rows = reporting::export_rows(
        db,
        ExportFilter {
            company_id: None,
            window: Some(*window),
        },
    )
    .await?;
    let label = window.label();

    let file = match format {
        ReportFormat::Excel => ExportFile {
            file_name: format!("report_{}.xlsx", label),
            content_type: XLSX_CONTENT_TYPE,
            bytes: tasks_xlsx(&rows)?,
        },
        ReportFormat::Pdf => {
            let counts = reporting::day_counts(db, ReportScope::Global, window).await?;
            ExportFile {
                file_name: format!("report_{}.pdf", label),
                content_type: "application/pdf",
                bytes: report_pdf(window, &counts, &rows)?,
            }
        }
        ReportFormat::Zip => {
            let counts = reporting::day_counts(db, ReportScope::Global, window).await?;
            ExportFile {
                file_name: format!("report_{}.zip", label),
                content_type: "application/zip",
                bytes: report_zip(store, window, &counts, &rows).await?,
            }
        }
    };

    tracing::info!(file = %file.file_name, rows = rows.len(), "Report exported");
    Ok(file)
}

/// All tasks of a company (or every company), newest-updated first
pub async fn build_task_export<C: ConnectionTrait>(
    db: &C,
    company_id: Option<i64>,
    format: TaskExportFormat,
    today: &DayWindow,
) -> Result<ExportFile> {
    let rows = reporting::export_rows(
        db,
        ExportFilter {
            company_id,
            window: None,
        },
    )
    .await?;
    let label = today.label();

    Ok(match format {
        TaskExportFormat::Csv => ExportFile {
            file_name: format!("tasks_{}.csv", label),
            content_type: "text/csv; charset=utf-8",
            bytes: tasks_csv(&rows)?,
        },
        TaskExportFormat::Excel => ExportFile {
            file_name: format!("tasks_{}.xlsx", label),
            content_type: XLSX_CONTENT_TYPE,
            bytes: tasks_xlsx(&rows)?,
        },
    })
}
