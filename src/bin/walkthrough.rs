//! Runs the fixed data-lake walkthrough sequence against an in-memory
//! service: list file systems, create one, upload a small file, list paths,
//! read the file back through the stream accumulator, delete the file system.
//!
//! Run with:
//! ```sh
//! cargo run --bin walkthrough
//! ```

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::StreamExt as _;
use lakestore::{LakeConfig, LakeService, LakeServiceExt, MemoryLake};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error running walkthrough: {err}");
        std::process::exit(1);
    }
}

async fn run() -> lakestore::Result<()> {
    // The in-memory service needs no credentials; a connection string is
    // still honored when present so the sequence mirrors a real deployment.
    if let Ok(config) = LakeConfig::load(Some(Path::new("lakestore.json")))
        && let Ok(parsed) = config.parsed()
        && let Some(account) = parsed.get("AccountName")
    {
        println!("Using account {account}");
    }

    let lake = MemoryLake::new();
    seed(&lake).await?;

    // List file systems
    let mut i = 1;
    let mut file_systems = lake.list_file_systems().await?;
    while let Some(fs) = file_systems.next().await {
        println!("FileSystem {i}: {}", fs?.name);
        i += 1;
    }

    // Create a file system
    let file_system_name = format!("newfilesystem{}", timestamp_millis());
    let create_op = lake.create_file_system(&file_system_name).await?;
    println!("Create filesystem {file_system_name} successfully {create_op}");

    // Upload a file
    let content = b"hello";
    let file_name = format!("newfile{}", timestamp_millis());
    lake.create_file(&file_system_name, &file_name).await?;
    lake.append(&file_system_name, &file_name, 0, content)
        .await?;
    let flush_op = lake
        .flush(&file_system_name, &file_name, content.len() as u64)
        .await?;
    println!("Upload file {file_name} successfully {flush_op}");

    // List paths
    let mut i = 1;
    let mut paths = lake.list_paths(&file_system_name).await?;
    while let Some(path) = paths.next().await {
        let path = path?;
        println!("Path {i}: {}, isDirectory:{}", path.name, path.is_directory);
        i += 1;
    }

    // Read the file's content back, buffered fully into memory
    let downloaded = lake.download_string(&file_system_name, &file_name).await?;
    println!("Downloaded file content {downloaded}");

    // Delete the file system
    lake.delete_file_system(&file_system_name).await?;
    println!("Deleted filesystem");

    Ok(())
}

/// A couple of pre-existing file systems so the first listing is not empty.
async fn seed(lake: &MemoryLake) -> lakestore::Result<()> {
    for name in ["curated", "raw-events"] {
        lake.create_file_system(name).await?;
    }
    lake.upload_bytes("raw-events", "2026/01/events.json", b"{}")
        .await?;
    Ok(())
}

fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
