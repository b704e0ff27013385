use std::io::{Cursor, Write};

use pretty_assertions::assert_eq;
use sheetframe_io::{
    read_excel, read_excel_bytes, read_excel_with_format, sheet_names, CellValue, ErrorKind,
    ReadOptions, WorkbookFormat,
};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

fn build_zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let cursor = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(cursor);
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in entries {
        zip.start_file(*name, options).expect("start_file");
        zip.write_all(bytes).expect("write entry bytes");
    }
    zip.finish().expect("finish").into_inner()
}

fn people_xlsx() -> Vec<u8> {
    let workbook = br#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="People" sheetId="1" r:id="rId1"/><sheet name="Empty" sheetId="2" r:id="rId2"/></sheets></workbook>"#;
    let rels = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/></Relationships>"#;
    let shared = br#"<sst><si><t>name</t></si><si><t>age</t></si><si><t>Alice</t></si><si><t>Bob</t></si></sst>"#;
    let sheet1 = br#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
<row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>25</v></c></row>
<row r="3"><c r="A3" t="s"><v>3</v></c><c r="B3"><v>30</v></c></row>
</sheetData></worksheet>"#;
    let sheet2 = br#"<worksheet><sheetData/></worksheet>"#;

    build_zip_bytes(&[
        ("[Content_Types].xml", b"<Types/>"),
        ("xl/workbook.xml", workbook),
        ("xl/_rels/workbook.xml.rels", rels),
        ("xl/sharedStrings.xml", shared),
        ("xl/worksheets/sheet1.xml", sheet1),
        ("xl/worksheets/sheet2.xml", sheet2),
    ])
}

fn record(id: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = id.to_le_bytes().to_vec();
    out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn bof() -> Vec<u8> {
    let mut payload = 0x0600u16.to_le_bytes().to_vec();
    payload.extend_from_slice(&0x0010u16.to_le_bytes());
    payload.extend_from_slice(&[0; 12]);
    record(0x0809, &payload)
}

fn label(row: u16, col: u16, text: &str) -> Vec<u8> {
    let mut payload = row.to_le_bytes().to_vec();
    payload.extend_from_slice(&col.to_le_bytes());
    payload.extend_from_slice(&15u16.to_le_bytes());
    payload.extend_from_slice(&(text.len() as u16).to_le_bytes());
    payload.push(0);
    payload.extend_from_slice(text.as_bytes());
    record(0x0204, &payload)
}

fn number(row: u16, col: u16, value: f64) -> Vec<u8> {
    let mut payload = row.to_le_bytes().to_vec();
    payload.extend_from_slice(&col.to_le_bytes());
    payload.extend_from_slice(&15u16.to_le_bytes());
    payload.extend_from_slice(&value.to_le_bytes());
    record(0x0203, &payload)
}

fn people_biff() -> Vec<u8> {
    [
        bof(),
        label(0, 0, "name"),
        label(0, 1, "score"),
        label(1, 0, "Alice"),
        number(1, 1, 1.5),
        label(2, 0, "Bob"),
        number(2, 1, 30.0),
        record(0x000A, &[]),
    ]
    .concat()
}

fn ole_wrapped(mut workbook_stream: Vec<u8>) -> Vec<u8> {
    // Keep the stream out of the compound file's mini stream.
    while workbook_stream.len() < 4096 {
        workbook_stream.extend(record(0x00EB, &[0; 512]));
    }
    let mut ole = cfb::CompoundFile::create(Cursor::new(Vec::new())).expect("create cfb");
    {
        let mut stream = ole.create_stream("Workbook").expect("Workbook stream");
        stream
            .write_all(&workbook_stream)
            .expect("write Workbook stream");
    }
    ole.into_inner().into_inner()
}

fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

#[test]
fn reads_name_age_sheet_from_xlsx_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("people.xlsx");
    std::fs::write(&path, people_xlsx()).expect("write fixture");

    let table = read_excel(&path, &ReadOptions::default()).unwrap();
    assert_eq!(table.columns(), &["name".to_string(), "age".to_string()]);
    assert_eq!(
        table.rows(),
        &[
            vec![text("Alice"), CellValue::Int(25)],
            vec![text("Bob"), CellValue::Int(30)],
        ]
    );

    assert_eq!(
        sheet_names(&path, &ReadOptions::default()).unwrap(),
        vec!["People".to_string(), "Empty".to_string()]
    );

    let capped = ReadOptions {
        max_part_bytes: 8,
        ..ReadOptions::default()
    };
    let err = sheet_names(&path, &capped).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Container);
}

#[test]
fn sheet_errors_map_to_kinds() {
    let bytes = people_xlsx();

    let err = read_excel_bytes(&bytes, Some("xlsx"), &ReadOptions::default().with_sheet("Nope"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = read_excel_bytes(&bytes, Some("xlsx"), &ReadOptions::default().with_sheet("Empty"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyInput);
}

#[test]
fn part_cap_is_applied_through_read_options() {
    let options = ReadOptions {
        max_part_bytes: 8,
        ..ReadOptions::default()
    };
    let err = read_excel_bytes(&people_xlsx(), Some("xlsx"), &options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Container);
}

#[test]
fn reads_raw_biff_stream() {
    let table = read_excel_bytes(&people_biff(), Some("xls"), &ReadOptions::default()).unwrap();
    assert_eq!(table.columns(), &["name".to_string(), "score".to_string()]);
    assert_eq!(
        table.rows(),
        &[
            vec![text("Alice"), CellValue::Float(1.5)],
            vec![text("Bob"), CellValue::Int(30)],
        ]
    );
}

#[test]
fn reads_ole_wrapped_xls_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("people.xls");
    std::fs::write(&path, ole_wrapped(people_biff())).expect("write fixture");

    let (format, table) = read_excel_with_format(&path, &ReadOptions::default()).unwrap();
    assert_eq!(format, WorkbookFormat::LegacyOleWrapped);
    assert_eq!(table.shape(), (2, 2));
    assert_eq!(table.rows()[0][1], CellValue::Float(1.5));

    let err = sheet_names(&path, &ReadOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
}

#[test]
fn legacy_error_kinds() {
    let err = read_excel_bytes(
        &[bof(), record(0x000A, &[])].concat(),
        Some("xls"),
        &ReadOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyInput);

    let mut ole = vec![0u8; 2048];
    ole[..4].copy_from_slice(&[0xD0, 0xCF, 0x11, 0xE0]);
    let err = read_excel_bytes(&ole, Some("xls"), &ReadOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // BOF signature at the probed offset, but its payload runs past the buffer.
    ole.truncate(1030);
    ole[512..516].copy_from_slice(&[0x09, 0x08, 0x00, 0x10]);
    let err = read_excel_bytes(&ole, Some("xls"), &ReadOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedRecord);
}
