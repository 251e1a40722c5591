//! Test the JSON output of every CLI command

use clap::Parser;
use pqfeed::Error;
use pqfeed::cli::{Cli, run};
use pqfeed_test_utils::write_users_file;
use serde_json::Value as Json;
use tempfile::TempDir;

fn run_cli(args: &[&str]) -> pqfeed::Result<String> {
    let cli = Cli::try_parse_from(std::iter::once("pqfeed").chain(args.iter().copied()))
        .expect("arguments parse");
    let mut out = Vec::new();
    run(&cli, &mut out)?;
    Ok(String::from_utf8(out).expect("utf-8 output"))
}

#[test]
fn test_schema_command() {
    let dir = TempDir::new().unwrap();
    let path = write_users_file(dir.path(), "users.parquet", 6, 5).unwrap();

    let output = run_cli(&["schema", path.to_str().unwrap()]).unwrap();
    let json: Json = serde_json::from_str(&output).unwrap();

    let fields = json["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 6);
    assert_eq!(fields[0]["name"], "id");
    assert_eq!(fields[0]["physicalType"], "INT64");
    assert_eq!(fields[0]["repetition"], "required");
    assert_eq!(fields[1]["logicalType"], "STRING");
    assert_eq!(fields[4]["repetition"], "optional");
}

#[test]
fn test_metadata_command() {
    let dir = TempDir::new().unwrap();
    let path = write_users_file(dir.path(), "users.parquet", 12, 5).unwrap();

    let output = run_cli(&["metadata", path.to_str().unwrap()]).unwrap();
    let json: Json = serde_json::from_str(&output).unwrap();

    assert_eq!(json["numRows"], 12);
    assert_eq!(json["numColumns"], 6);
    assert_eq!(json["numRowGroups"], 3);
    assert_eq!(json["rowGroups"][2]["numRows"], 2);
    assert_eq!(json["rowGroups"][0]["columns"][1]["path"], "name");
}

#[test]
fn test_read_command_with_selection() {
    let dir = TempDir::new().unwrap();
    let path = write_users_file(dir.path(), "users.parquet", 12, 5).unwrap();

    let output = run_cli(&[
        "read",
        path.to_str().unwrap(),
        "--columns",
        "name,id",
        "--skip",
        "4",
        "--limit",
        "2",
    ])
    .unwrap();
    let json: Json = serde_json::from_str(&output).unwrap();

    assert_eq!(
        json,
        serde_json::json!([
            {"name": "user-5", "id": 5},
            {"name": "user-6", "id": 6}
        ])
    );
    // Keys keep the requested order.
    assert!(output.find("\"name\"").unwrap() < output.find("\"id\"").unwrap());
}

#[test]
fn test_stream_command_stops_after_max_chunks() {
    let dir = TempDir::new().unwrap();
    let path = write_users_file(dir.path(), "users.parquet", 12, 5).unwrap();

    let output = run_cli(&[
        "stream",
        path.to_str().unwrap(),
        "--chunk-size",
        "5",
        "--columns",
        "id",
        "--max-chunks",
        "2",
    ])
    .unwrap();
    let lines: Vec<Json> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["chunk"], 1);
    assert_eq!(lines[1]["records"].as_array().unwrap().len(), 5);
    assert_eq!(lines[1]["records"][0]["id"], 6);
    assert_eq!(lines[2]["chunks"], 2);
    assert_eq!(lines[2]["rows"], 10);
    assert_eq!(lines[2]["stoppedEarly"], true);
}

#[test]
fn test_errors_are_returned() {
    let dir = TempDir::new().unwrap();
    let path = write_users_file(dir.path(), "users.parquet", 3, 5).unwrap();
    let path = path.to_str().unwrap();

    assert!(matches!(
        run_cli(&["stream", path, "--chunk-size", "0"]),
        Err(Error::InvalidChunkSize(0))
    ));
    assert!(matches!(
        run_cli(&["read", path, "--columns", "bogus"]),
        Err(Error::InvalidColumnSelection { .. })
    ));
    assert!(matches!(
        run_cli(&["schema", dir.path().join("gone.parquet").to_str().unwrap()]),
        Err(Error::FileNotFound(_))
    ));
}
