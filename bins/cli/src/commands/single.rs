//! Single-file upload, delete and URL lookup.

use std::path::Path;

use anyhow::{Context as _, Result};
use console::style;

use depot_core::storage::{FileInput, StorageClient, Uploader};

use super::Context;
use crate::format::format_size;

/// Upload one file and print its URL.
pub async fn upload(ctx: &Context, file: &Path, verbose: bool) -> Result<()> {
    upload_with(&ctx.client()?, file, verbose).await
}

/// Delete one object.
pub async fn delete(ctx: &Context, key: &str) -> Result<()> {
    delete_with(&ctx.client()?, key).await
}

/// Print the public URL of a key.
pub fn url(ctx: &Context, key: &str, verbose: bool) -> Result<()> {
    url_with(&ctx.client()?, key, verbose)
}

pub(super) async fn upload_with(client: &StorageClient, file: &Path, verbose: bool) -> Result<()> {
    let input = FileInput::from_path(file)
        .await
        .with_context(|| format!("cannot read {}", file.display()))?;

    let descriptor = client.upload(input).await?;

    if verbose {
        println!("{} {}", style("Uploaded").green().bold(), file.display());
        println!("  {} {}", style("URL: ").dim(), descriptor.url);
        println!("  {} {}", style("Key: ").dim(), descriptor.key);
        println!("  {} {}", style("Size:").dim(), format_size(descriptor.size));
        println!("  {} {}", style("MIME:").dim(), descriptor.mime_type);
    } else {
        println!("{}", descriptor.url);
    }
    Ok(())
}

pub(super) async fn delete_with(client: &StorageClient, key: &str) -> Result<()> {
    client.delete(key).await?;
    println!("{} {}", style("Deleted").green().bold(), key);
    Ok(())
}

pub(super) fn url_with(client: &StorageClient, key: &str, verbose: bool) -> Result<()> {
    let url = client.url(key)?;

    if verbose {
        println!("  {} {}", style("Key:").dim(), key);
        println!("  {} {}", style("URL:").dim(), url);
    } else {
        println!("{url}");
    }
    Ok(())
}
