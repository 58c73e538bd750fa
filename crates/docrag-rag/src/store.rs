//! Line-delimited chunk store

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use docrag_core::{Error, Passage, Result};
use tracing::info;

/// Write passages as one `{"id": .., "text": ..}` object per line, replacing any previous file
pub fn write_chunks(path: &Path, passages: &[Passage]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    for passage in passages {
        serde_json::to_writer(&mut writer, passage)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    info!(chunks = passages.len(), path = %path.display(), "Saved chunk store");
    Ok(())
}

/// Read the chunk store back in file order
pub fn read_chunks(path: &Path) -> Result<Vec<Passage>> {
    if !path.exists() {
        return Err(Error::ChunkStoreNotFound(path.to_path_buf()));
    }

    let reader = BufReader::new(File::open(path)?);
    let mut passages = Vec::new();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let passage: Passage = serde_json::from_str(&line).map_err(|e| {
            Error::Serialization(format!(
                "{}:{}: {}",
                path.display(),
                line_number + 1,
                e
            ))
        })?;
        passages.push(passage);
    }

    Ok(passages)
}
