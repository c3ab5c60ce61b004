// src/export/xlsx.rs
//! Minimal SpreadsheetML package writer: inline strings, numeric cells,
//! per-column widths and two alignment styles.

use crate::table::{Cell, NormalizedTable};
use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer as XmlWriter;
use std::io::{Seek, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_OFFICE_DOC: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

/// `cellXfs` indices written by [`styles_xml`].
const STYLE_LEFT: &str = "1";
const STYLE_RIGHT: &str = "2";

/// A sheet ready to be written: its final name and the table it holds.
pub struct Sheet<'a> {
    pub name: String,
    pub table: &'a NormalizedTable,
}

/// Spreadsheet column letters for a zero-based index: 0 -> A, 26 -> AA.
pub fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Display width per column: the longest rendered header or cell, plus two.
pub fn column_widths(table: &NormalizedTable) -> Vec<usize> {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let longest_cell = table
                .rows()
                .iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.to_string().chars().count())
                .max()
                .unwrap_or(0);
            longest_cell.max(header.chars().count()) + 2
        })
        .collect()
}

/// Writes a complete workbook containing `sheets`, in order, to `writer`.
pub fn write_package<W: Write + Seek>(writer: W, sheets: &[Sheet<'_>]) -> Result<W> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts: Vec<(String, Vec<u8>)> = {
        let mut parts = vec![
            ("[Content_Types].xml".to_string(), content_types_xml(sheets.len())?),
            ("_rels/.rels".to_string(), root_rels_xml()?),
            ("xl/workbook.xml".to_string(), workbook_xml(sheets)?),
            ("xl/_rels/workbook.xml.rels".to_string(), workbook_rels_xml(sheets.len())?),
            ("xl/styles.xml".to_string(), styles_xml()?),
        ];
        for (i, sheet) in sheets.iter().enumerate() {
            parts.push((
                format!("xl/worksheets/sheet{}.xml", i + 1),
                worksheet_xml(sheet.table)
                    .with_context(|| format!("rendering sheet {}", sheet.name))?,
            ));
        }
        parts
    };

    for (name, bytes) in parts {
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("starting {}", name))?;
        zip.write_all(&bytes)
            .with_context(|| format!("writing {}", name))?;
    }
    Ok(zip.finish()?)
}

fn new_doc() -> Result<XmlWriter<Vec<u8>>> {
    let mut w = XmlWriter::new(Vec::new());
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(w)
}

fn start(w: &mut XmlWriter<Vec<u8>>, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    w.write_event(Event::Start(
        BytesStart::new(name).with_attributes(attrs.iter().copied()),
    ))?;
    Ok(())
}

fn empty(w: &mut XmlWriter<Vec<u8>>, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    w.write_event(Event::Empty(
        BytesStart::new(name).with_attributes(attrs.iter().copied()),
    ))?;
    Ok(())
}

fn end(w: &mut XmlWriter<Vec<u8>>, name: &str) -> Result<()> {
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn text(w: &mut XmlWriter<Vec<u8>>, value: &str) -> Result<()> {
    w.write_event(Event::Text(BytesText::new(value)))?;
    Ok(())
}

fn content_types_xml(sheet_count: usize) -> Result<Vec<u8>> {
    let mut w = new_doc()?;
    start(
        &mut w,
        "Types",
        &[("xmlns", "http://schemas.openxmlformats.org/package/2006/content-types")],
    )?;
    empty(
        &mut w,
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    empty(&mut w, "Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    empty(
        &mut w,
        "Override",
        &[
            ("PartName", "/xl/workbook.xml"),
            (
                "ContentType",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
            ),
        ],
    )?;
    empty(
        &mut w,
        "Override",
        &[
            ("PartName", "/xl/styles.xml"),
            (
                "ContentType",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml",
            ),
        ],
    )?;
    for i in 1..=sheet_count {
        let part = format!("/xl/worksheets/sheet{}.xml", i);
        empty(
            &mut w,
            "Override",
            &[
                ("PartName", part.as_str()),
                (
                    "ContentType",
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
                ),
            ],
        )?;
    }
    end(&mut w, "Types")?;
    Ok(w.into_inner())
}

fn root_rels_xml() -> Result<Vec<u8>> {
    let mut w = new_doc()?;
    start(&mut w, "Relationships", &[("xmlns", NS_PKG_REL)])?;
    empty(
        &mut w,
        "Relationship",
        &[("Id", "rId1"), ("Type", REL_OFFICE_DOC), ("Target", "xl/workbook.xml")],
    )?;
    end(&mut w, "Relationships")?;
    Ok(w.into_inner())
}

fn workbook_xml(sheets: &[Sheet<'_>]) -> Result<Vec<u8>> {
    let mut w = new_doc()?;
    start(&mut w, "workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_REL)])?;
    start(&mut w, "sheets", &[])?;
    for (i, sheet) in sheets.iter().enumerate() {
        let id = (i + 1).to_string();
        let rid = format!("rId{}", i + 1);
        empty(
            &mut w,
            "sheet",
            &[("name", sheet.name.as_str()), ("sheetId", id.as_str()), ("r:id", rid.as_str())],
        )?;
    }
    end(&mut w, "sheets")?;
    end(&mut w, "workbook")?;
    Ok(w.into_inner())
}

fn workbook_rels_xml(sheet_count: usize) -> Result<Vec<u8>> {
    let mut w = new_doc()?;
    start(&mut w, "Relationships", &[("xmlns", NS_PKG_REL)])?;
    for i in 1..=sheet_count {
        let rid = format!("rId{}", i);
        let target = format!("worksheets/sheet{}.xml", i);
        empty(
            &mut w,
            "Relationship",
            &[("Id", rid.as_str()), ("Type", REL_WORKSHEET), ("Target", target.as_str())],
        )?;
    }
    let styles_rid = format!("rId{}", sheet_count + 1);
    empty(
        &mut w,
        "Relationship",
        &[("Id", styles_rid.as_str()), ("Type", REL_STYLES), ("Target", "styles.xml")],
    )?;
    end(&mut w, "Relationships")?;
    Ok(w.into_inner())
}

/// Three cell formats: default, left-aligned (label column) and right-aligned
/// (period columns).
fn styles_xml() -> Result<Vec<u8>> {
    let mut w = new_doc()?;
    start(&mut w, "styleSheet", &[("xmlns", NS_MAIN)])?;

    start(&mut w, "fonts", &[("count", "1")])?;
    start(&mut w, "font", &[])?;
    empty(&mut w, "sz", &[("val", "11")])?;
    empty(&mut w, "name", &[("val", "Calibri")])?;
    end(&mut w, "font")?;
    end(&mut w, "fonts")?;

    start(&mut w, "fills", &[("count", "2")])?;
    for pattern in ["none", "gray125"] {
        start(&mut w, "fill", &[])?;
        empty(&mut w, "patternFill", &[("patternType", pattern)])?;
        end(&mut w, "fill")?;
    }
    end(&mut w, "fills")?;

    start(&mut w, "borders", &[("count", "1")])?;
    empty(&mut w, "border", &[])?;
    end(&mut w, "borders")?;

    start(&mut w, "cellStyleXfs", &[("count", "1")])?;
    empty(&mut w, "xf", &[("numFmtId", "0"), ("fontId", "0"), ("fillId", "0"), ("borderId", "0")])?;
    end(&mut w, "cellStyleXfs")?;

    start(&mut w, "cellXfs", &[("count", "3")])?;
    empty(
        &mut w,
        "xf",
        &[("numFmtId", "0"), ("fontId", "0"), ("fillId", "0"), ("borderId", "0"), ("xfId", "0")],
    )?;
    for horizontal in ["left", "right"] {
        start(
            &mut w,
            "xf",
            &[
                ("numFmtId", "0"),
                ("fontId", "0"),
                ("fillId", "0"),
                ("borderId", "0"),
                ("xfId", "0"),
                ("applyAlignment", "1"),
            ],
        )?;
        empty(&mut w, "alignment", &[("horizontal", horizontal)])?;
        end(&mut w, "xf")?;
    }
    end(&mut w, "cellXfs")?;

    end(&mut w, "styleSheet")?;
    Ok(w.into_inner())
}

fn worksheet_xml(table: &NormalizedTable) -> Result<Vec<u8>> {
    let mut w = new_doc()?;
    start(&mut w, "worksheet", &[("xmlns", NS_MAIN)])?;

    let widths = column_widths(table);
    if !widths.is_empty() {
        start(&mut w, "cols", &[])?;
        for (i, width) in widths.iter().enumerate() {
            let idx = (i + 1).to_string();
            let width = width.to_string();
            empty(
                &mut w,
                "col",
                &[
                    ("min", idx.as_str()),
                    ("max", idx.as_str()),
                    ("width", width.as_str()),
                    ("customWidth", "1"),
                    ("style", style_for(i)),
                ],
            )?;
        }
        end(&mut w, "cols")?;
    }

    start(&mut w, "sheetData", &[])?;
    let header: Vec<Cell> = table.columns().iter().map(|c| Cell::Text(c.clone())).collect();
    write_row(&mut w, 1, &header)?;
    for (i, row) in table.rows().iter().enumerate() {
        write_row(&mut w, i + 2, row.cells())?;
    }
    end(&mut w, "sheetData")?;

    end(&mut w, "worksheet")?;
    Ok(w.into_inner())
}

fn style_for(column: usize) -> &'static str {
    if column == 0 {
        STYLE_LEFT
    } else {
        STYLE_RIGHT
    }
}

fn write_row(w: &mut XmlWriter<Vec<u8>>, row_number: usize, cells: &[Cell]) -> Result<()> {
    let r = row_number.to_string();
    start(w, "row", &[("r", r.as_str())])?;
    for (col, cell) in cells.iter().enumerate() {
        let reference = format!("{}{}", column_letters(col), row_number);
        let style = style_for(col);
        match cell {
            Cell::Missing => {}
            Cell::Number(v) => {
                start(w, "c", &[("r", reference.as_str()), ("s", style)])?;
                start(w, "v", &[])?;
                text(w, &v.to_string())?;
                end(w, "v")?;
                end(w, "c")?;
            }
            Cell::Text(_) | Cell::Flag(_) => {
                start(
                    w,
                    "c",
                    &[("r", reference.as_str()), ("s", style), ("t", "inlineStr")],
                )?;
                start(w, "is", &[])?;
                start(w, "t", &[])?;
                text(w, &cell.to_string())?;
                end(w, "t")?;
                end(w, "is")?;
                end(w, "c")?;
            }
        }
    }
    end(w, "row")?;
    Ok(())
}
