mod common;

use common::xls_fixture_builder::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sheetframe_model::CellValue;
use sheetframe_xls::{
    import_biff_stream, import_xls_bytes, import_xls_path, ImportError, LegacyLayout,
    MAX_RECORD_BYTES,
};

fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

#[test]
fn imports_shared_strings_and_numbers() {
    let result = import_xls_bytes(&people_stream()).expect("import");

    assert_eq!(result.layout, LegacyLayout::RawRecordStream);
    assert_eq!(result.stream_offset, 0);
    assert!(result.warnings.is_empty(), "warnings: {:?}", result.warnings);
    assert_eq!(result.table.columns(), &["name".to_string(), "age".to_string()]);
    assert_eq!(
        result.table.rows(),
        &[
            vec![text("Alice"), CellValue::Int(25)],
            vec![text("Bob"), CellValue::Int(30)],
        ]
    );
}

#[test]
fn number_records_decode_as_ieee754_doubles() {
    let stream = workbook_stream(&[], &[label(0, 0, "x"), number(1, 0, 1.5)]);
    let result = import_biff_stream(&stream).unwrap();
    assert_eq!(result.table.rows(), &[vec![CellValue::Float(1.5)]]);

    // Reading the same eight bytes as an integer gives a very different value.
    let reinterpreted = u64::from_le_bytes(1.5f64.to_le_bytes()) as f64;
    assert_ne!(reinterpreted, 1.5);
}

#[test]
fn decodes_inline_labels_booleans_and_errors() {
    let stream = workbook_stream(
        &[],
        &[
            label(0, 0, "word"),
            label_utf16(0, 1, "wide"),
            label(0, 2, "flag"),
            label(0, 3, "err"),
            label(1, 0, "caf\u{e9}"),
            label_utf16(1, 1, "tab\there"),
            boolean(1, 2, true),
            error_cell(1, 3, 0x07),
        ],
    );

    let result = import_biff_stream(&stream).unwrap();
    assert_eq!(
        result.table.rows(),
        &[vec![
            text("caf"),
            text("tab\there"),
            CellValue::Bool(true),
            CellValue::Null,
        ]]
    );
}

#[test]
fn biff5_substreams_use_byte_strings() {
    let stream = [
        bof_worksheet_biff5(),
        label_biff5(0, 0, b"h"),
        label_biff5(1, 0, b"v\x01"),
        eof(),
    ]
    .concat();

    let result = import_biff_stream(&stream).unwrap();
    assert_eq!(result.table.columns(), &["h".to_string()]);
    assert_eq!(result.table.rows(), &[vec![text("v")]]);
}

#[test]
fn continued_shared_strings_are_coalesced() {
    let mut stream = bof_globals();
    stream.extend(sst_with_continue(&["key", "continued value"], 4));
    stream.extend(eof());
    stream.extend(bof_worksheet());
    stream.extend(labelsst(0, 0, 0));
    stream.extend(labelsst(1, 0, 1));
    stream.extend(eof());

    let result = import_biff_stream(&stream).unwrap();
    assert_eq!(result.table.columns(), &["key".to_string()]);
    assert_eq!(result.table.rows(), &[vec![text("continued value")]]);
}

#[test]
fn out_of_range_shared_string_leaves_cell_empty() {
    let stream = workbook_stream(
        &["h1", "h2"],
        &[labelsst(0, 0, 0), labelsst(0, 1, 1), labelsst(1, 0, 9), rk_int(1, 1, 3)],
    );

    let result = import_biff_stream(&stream).unwrap();
    assert_eq!(
        result.table.rows(),
        &[vec![CellValue::Null, CellValue::Int(3)]]
    );
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].message.contains("out of range"));
}

#[test]
fn row_and_blank_records_shape_the_table() {
    let stream = workbook_stream(
        &[],
        &[
            row(0),
            row(1),
            row(3),
            label(0, 0, "a"),
            blank(0, 2),
            number(3, 0, 7.0),
        ],
    );

    let result = import_biff_stream(&stream).unwrap();
    assert_eq!(
        result.table.columns(),
        &["a".to_string(), "col_1".to_string(), "col_2".to_string()]
    );
    assert_eq!(
        result.table.rows(),
        &[
            vec![CellValue::Null, CellValue::Null, CellValue::Null],
            vec![CellValue::Int(7), CellValue::Null, CellValue::Null],
        ]
    );
}

#[test]
fn oversized_record_is_skipped_and_walk_continues() {
    let oversized = record(0x00EB, &vec![0u8; MAX_RECORD_BYTES + 1]);
    let stream = workbook_stream(
        &[],
        &[label(0, 0, "n"), oversized, number(1, 0, 2.0)],
    );

    let result = import_biff_stream(&stream).unwrap();
    assert_eq!(result.table.rows(), &[vec![CellValue::Int(2)]]);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].record_id, 0x00EB);
}

#[test]
fn truncated_record_keeps_earlier_rows() {
    let mut stream = workbook_stream(&[], &[label(0, 0, "n"), number(1, 0, 1.0)]);
    // Drop the worksheet EOF and append a NUMBER whose payload is cut short.
    stream.truncate(stream.len() - 4);
    let cut = number(2, 0, 2.0);
    stream.extend_from_slice(&cut[..cut.len() - 3]);

    let result = import_biff_stream(&stream).unwrap();
    assert_eq!(result.table.rows(), &[vec![CellValue::Int(1)]]);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].message.contains("stopping"));
}

#[test]
fn blank_only_sheet_does_not_end_the_walk() {
    let stream = [
        bof_globals(),
        eof(),
        bof_worksheet(),
        row(0),
        blank(0, 0),
        blank(1, 0),
        eof(),
        bof_worksheet(),
        label(0, 0, "name"),
        number(1, 0, 42.0),
        eof(),
    ]
    .concat();

    let result = import_biff_stream(&stream).unwrap();
    assert_eq!(result.table.columns(), &["name".to_string()]);
    assert_eq!(result.table.rows(), &[vec![CellValue::Int(42)]]);
}

#[test]
fn stream_without_cells_is_empty() {
    let stream = [bof_globals(), eof(), bof_worksheet(), eof()].concat();
    assert!(matches!(
        import_biff_stream(&stream).unwrap_err(),
        ImportError::EmptyWorkbook
    ));
}

#[test]
fn stream_must_start_with_bof() {
    let stream = [number(0, 0, 1.0), eof()].concat();
    let err = import_biff_stream(&stream).unwrap_err();
    assert!(
        matches!(
            err,
            ImportError::MalformedRecord {
                offset: 0,
                record_id: Some(0x0203)
            }
        ),
        "unexpected error: {err:?}"
    );
}

#[test]
fn imports_from_a_file_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("people.xls");
    std::fs::write(&path, people_stream()).expect("write fixture");

    let result = import_xls_path(&path).unwrap();
    assert_eq!(result.table.shape(), (2, 2));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn truncation_never_panics_and_keeps_a_prefix(cut in 0usize..400) {
        let stream = people_stream();
        let full = import_biff_stream(&stream).unwrap().table;
        let cut = cut.min(stream.len());

        match import_biff_stream(&stream[..cut]) {
            Ok(result) => {
                let (rows, _) = result.table.shape();
                prop_assert!(rows <= full.rows().len());
                for (got, want) in result.table.rows().iter().zip(full.rows()) {
                    for (g, w) in got.iter().zip(want) {
                        prop_assert!(g == w || g.is_null());
                    }
                }
            }
            Err(ImportError::EmptyWorkbook) | Err(ImportError::MalformedRecord { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
        }
    }
}
