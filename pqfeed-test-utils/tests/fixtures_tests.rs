use parquet::file::reader::{FileReader, SerializedFileReader};
use pqfeed_test_utils::{nested_batch, users_batch, write_batches, write_users_file, writer_props};
use std::fs::File;

#[test]
fn users_file_is_split_into_row_groups() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_users_file(dir.path(), "users.parquet", 12, 5).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[0..4], b"PAR1");
    assert_eq!(&bytes[bytes.len() - 4..], b"PAR1");

    let reader = SerializedFileReader::new(File::open(&path).unwrap()).unwrap();
    let metadata = reader.metadata();
    assert_eq!(metadata.file_metadata().num_rows(), 12);
    let sizes: Vec<i64> = metadata.row_groups().iter().map(|rg| rg.num_rows()).collect();
    assert_eq!(sizes, vec![5, 5, 2]);
}

#[test]
fn users_batch_values_follow_ids() {
    let batch = users_batch(10, 4).unwrap();
    assert_eq!(batch.num_rows(), 4);
    assert_eq!(batch.num_columns(), 6);
    // id 10 is a multiple of five, so its age is null
    assert!(batch.column(4).is_null(0));
    assert!(!batch.column(4).is_null(1));
}

#[test]
fn nested_batch_writes() {
    let dir = tempfile::tempdir().unwrap();
    let batch = nested_batch(8).unwrap();
    let path = write_batches(&dir.path().join("nested.parquet"), &[batch], writer_props(1024)).unwrap();
    let reader = SerializedFileReader::new(File::open(&path).unwrap()).unwrap();
    assert_eq!(reader.metadata().file_metadata().num_rows(), 8);
}

#[test]
fn writing_nothing_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = write_batches(&dir.path().join("empty.parquet"), &[], writer_props(10)).unwrap_err();
    assert!(matches!(err, pqfeed_result::Error::InvalidArgumentError(_)));
}
