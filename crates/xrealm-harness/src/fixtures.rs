// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use xrealm_host::{DirectoryHandle, FileSystemHandle, FsResult};

pub const EMPTY_FILE: &str = "empty-file";
pub const TEXT_FILE: &str = "text-file.txt";
pub const TEXT_FILE_CONTENT: &str = "Cross-realm handle payload\nwith a second line\n";
pub const TREE_DIRECTORY: &str = "directory";

/// Creates the standard batch under `root`: an empty file, a file with
/// text, a directory with nested children, then the text file and the
/// directory again.
pub async fn fixture_batch(root: &DirectoryHandle) -> FsResult<Vec<FileSystemHandle>> {
    let empty_file = root.get_file_handle(EMPTY_FILE, true).await?;

    let text_file = root.get_file_handle(TEXT_FILE, true).await?;
    text_file.write(TEXT_FILE_CONTENT).await?;

    let directory = root.get_directory_handle(TREE_DIRECTORY, true).await?;
    populate_tree(&directory).await?;

    let text_file: FileSystemHandle = text_file.into();
    let directory: FileSystemHandle = directory.into();
    Ok(vec![
        empty_file.into(),
        text_file.clone(),
        directory.clone(),
        text_file,
        directory,
    ])
}

// Names are created out of order so sorting in the serializer is exercised.
async fn populate_tree(directory: &DirectoryHandle) -> FsResult<()> {
    for (name, content) in [("zeta.txt", "last"), ("alpha.txt", "first"), ("mid.txt", "")] {
        directory.get_file_handle(name, true).await?.write(content).await?;
    }
    let nested = directory.get_directory_handle("nested", true).await?;
    nested
        .get_file_handle("deep.txt", true)
        .await?
        .write("deep content")
        .await?;
    directory.get_directory_handle("empty-subdirectory", true).await?;
    Ok(())
}
