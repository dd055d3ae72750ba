//! CSV and PDF export of the filtered occurrence list.
//!
//! Rows are streamed from the database into the encoder one at a time, so
//! large result sets are never materialized twice. Export never mutates
//! state beyond the activity entry recorded by the endpoint.

use std::collections::HashMap;
use std::io::BufWriter;
use std::time::Duration;

use futures_util::TryStreamExt;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use sea_orm::EntityTrait;

use crate::db::DbConn;
use crate::error::{AppError, Result};
use crate::models::prelude::*;
use crate::models::{occurrence, user};
use crate::services::occurrences::{filtered_query, OccurrenceFilter};

/// Upper bound on PDF generation; the export is aborted past this.
pub const PDF_EXPORT_TIMEOUT: Duration = Duration::from_secs(30);

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const PAGE_MARGIN_MM: f32 = 15.0;
const LINE_HEIGHT_MM: f32 = 6.0;

/// Reference-data lookups shared by both export formats.
struct ExportContext {
    zones: HashMap<i64, String>,
    types: HashMap<i64, String>,
    reporters: HashMap<i64, String>,
}

impl ExportContext {
    async fn load(db: &DbConn) -> Result<Self> {
        let zones = Zone::find()
            .all(db)
            .await?
            .into_iter()
            .map(|z| (z.id, z.name))
            .collect();
        let types = OccurrenceType::find()
            .all(db)
            .await?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();
        let reporters = User::find()
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        Ok(Self {
            zones,
            types,
            reporters,
        })
    }

    fn zone_name(&self, id: i64) -> &str {
        self.zones.get(&id).map(String::as_str).unwrap_or("?")
    }

    fn type_name(&self, id: i64) -> &str {
        self.types.get(&id).map(String::as_str).unwrap_or("?")
    }

    fn reporter_name(&self, id: i64) -> &str {
        self.reporters.get(&id).map(String::as_str).unwrap_or("?")
    }
}

/// Serialize the filtered occurrence list as CSV. Returns the encoded bytes
/// and the number of data rows written.
pub async fn export_csv(
    db: &DbConn,
    actor: &user::Model,
    filter: &OccurrenceFilter,
) -> Result<(Vec<u8>, u64)> {
    let ctx = ExportContext::load(db).await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "id",
            "date",
            "time",
            "zone",
            "type",
            "location",
            "description",
            "status",
            "reporter",
        ])
        .map_err(csv_error)?;

    let mut count = 0u64;
    let mut rows = filtered_query(actor, filter)?.stream(db).await?;
    while let Some(occ) = rows.try_next().await? {
        writer
            .write_record([
                occ.id.to_string().as_str(),
                occ.date.to_string().as_str(),
                occ.time.format("%H:%M").to_string().as_str(),
                ctx.zone_name(occ.zone_id),
                ctx.type_name(occ.type_id),
                occ.location.as_deref().unwrap_or(""),
                occ.description.as_deref().unwrap_or(""),
                occ.status.as_str(),
                ctx.reporter_name(occ.user_id),
            ])
            .map_err(csv_error)?;
        count += 1;
    }

    writer.flush().map_err(|e| AppError::Internal(e.to_string()))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((bytes, count))
}

/// Render the filtered occurrence list as a PDF report. Returns the encoded
/// bytes and the number of occurrences included.
pub async fn export_pdf(
    db: &DbConn,
    actor: &user::Model,
    filter: &OccurrenceFilter,
    app_name: &str,
) -> Result<(Vec<u8>, u64)> {
    tokio::time::timeout(PDF_EXPORT_TIMEOUT, render_pdf(db, actor, filter, app_name))
        .await
        .map_err(|_| AppError::Internal("PDF export timed out".to_string()))?
}

async fn render_pdf(
    db: &DbConn,
    actor: &user::Model,
    filter: &OccurrenceFilter,
    app_name: &str,
) -> Result<(Vec<u8>, u64)> {
    let ctx = ExportContext::load(db).await?;

    // Stream the rows out of the database first so the non-Send PDF document
    // state below is never held across an await point (keeps the handler
    // future Send). Rows are still pulled one at a time.
    let mut occurrences: Vec<occurrence::Model> = Vec::new();
    let mut rows = filtered_query(actor, filter)?.stream(db).await?;
    while let Some(occ) = rows.try_next().await? {
        occurrences.push(occ);
    }
    drop(rows);

    let (doc, page, layer) = PdfDocument::new(
        format!("{} - Occurrence report", app_name),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "report",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;

    let mut writer = PdfLineWriter {
        doc: &doc,
        layer: doc.get_page(page).get_layer(layer),
        cursor_mm: PAGE_HEIGHT_MM - PAGE_MARGIN_MM,
    };

    writer.write_line(&format!("{} - Occurrence report", app_name), 14.0, &bold);
    writer.advance(LINE_HEIGHT_MM / 2.0);

    let mut count = 0u64;
    for occ in &occurrences {
        writer.write_line(&heading_line(occ, &ctx), 11.0, &bold);
        writer.write_line(&detail_line(occ, &ctx), 10.0, &font);
        if let Some(description) = occ.description.as_deref() {
            if !description.is_empty() {
                writer.write_line(&format!("    {}", description), 10.0, &font);
            }
        }
        writer.advance(LINE_HEIGHT_MM / 2.0);
        count += 1;
    }

    if count == 0 {
        writer.write_line("No occurrences match the selected filters.", 10.0, &font);
    }

    let mut buffer = BufWriter::new(Vec::new());
    doc.save(&mut buffer).map_err(pdf_error)?;
    let bytes = buffer
        .into_inner()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((bytes, count))
}

fn heading_line(occ: &occurrence::Model, ctx: &ExportContext) -> String {
    format!(
        "#{}  {} {}  [{}]  reported by {}",
        occ.id,
        occ.date,
        occ.time.format("%H:%M"),
        occ.status,
        ctx.reporter_name(occ.user_id)
    )
}

fn detail_line(occ: &occurrence::Model, ctx: &ExportContext) -> String {
    let mut line = format!(
        "    Zone: {} | Type: {}",
        ctx.zone_name(occ.zone_id),
        ctx.type_name(occ.type_id)
    );
    if let Some(location) = occ.location.as_deref() {
        if !location.is_empty() {
            line.push_str(&format!(" | Location: {}", location));
        }
    }
    line
}

/// Line-oriented cursor over PDF pages; adds a page when the current one
/// runs out of vertical space.
struct PdfLineWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    cursor_mm: f32,
}

impl PdfLineWriter<'_> {
    fn write_line(&mut self, text: &str, font_size: f32, font: &IndirectFontRef) {
        if self.cursor_mm < PAGE_MARGIN_MM + LINE_HEIGHT_MM {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "report");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.cursor_mm = PAGE_HEIGHT_MM - PAGE_MARGIN_MM;
        }

        self.layer.use_text(
            text,
            font_size,
            Mm(PAGE_MARGIN_MM),
            Mm(self.cursor_mm),
            font,
        );
        self.cursor_mm -= LINE_HEIGHT_MM;
    }

    fn advance(&mut self, mm: f32) {
        self.cursor_mm -= mm;
    }
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Internal(format!("CSV encoding failed: {}", e))
}

fn pdf_error(e: printpdf::Error) -> AppError {
    AppError::Internal(format!("PDF rendering failed: {}", e))
}
