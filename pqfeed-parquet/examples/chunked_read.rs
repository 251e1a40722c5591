//! Stream a generated users file in chunks and stop once a target row is seen.

use std::convert::Infallible;

use pqfeed_parquet::{ChunkControl, ParquetRegistry, ReadOptions, Value};
use pqfeed_test_utils::write_users_file;

fn main() -> pqfeed_result::Result<()> {
    println!("=== Chunked Read Demo ===\n");

    let dir = std::env::temp_dir().join(format!("pqfeed-demo-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let path = write_users_file(&dir, "users.parquet", 1_000, 250)?;

    let registry = ParquetRegistry::default();
    let metadata = registry.metadata(&path)?;
    println!(
        "{} rows, {} columns, {} row groups, {} bytes",
        metadata.num_rows, metadata.num_columns, metadata.num_row_groups, metadata.file_size
    );

    let sample = registry.read(&path, &ReadOptions::new().with_row_limit(3))?;
    for record in &sample {
        println!("  {}", serde_json::to_string(record).unwrap_or_default());
    }

    let target = 420;
    let summary = registry.read_chunked(&path, 100, |chunk| {
        let found = chunk
            .iter()
            .any(|r| r.get("id").and_then(Value::as_i64) == Some(target));
        Ok::<_, Infallible>(if found {
            ChunkControl::Stop
        } else {
            ChunkControl::Continue
        })
    })?;
    println!(
        "\nfound id {target} after {} chunks ({} rows); decoded {} of {} row groups",
        summary.chunks, summary.rows, summary.row_groups_decoded, metadata.num_row_groups
    );

    registry.close();
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
