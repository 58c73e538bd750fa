//! Exact flat L2 index and its positional id/text mapping

use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use docrag_core::config::{INDEX_FILE_NAME, MAPPING_FILE_NAME};
use docrag_core::{Error, Passage, Result, RetrievedPassage};

const MAGIC: &[u8; 8] = b"DRFLAT01";

/// Brute-force index over fixed-dimension vectors.
///
/// Vectors are stored contiguously; slot `i` is the `i`-th vector added.
/// Distances are squared Euclidean distances.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dimension: usize,
    model_id: String,
    vectors: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dimension: usize, model_id: impl Into<String>) -> Self {
        Self {
            dimension,
            model_id: model_id.into(),
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embedding model the vectors were produced with
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.vectors.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a vector, returning its slot
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        if vector.len() != self.dimension {
            return Err(Error::Embedding(format!(
                "vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimension
            )));
        }
        let slot = self.len();
        self.vectors.extend_from_slice(vector);
        Ok(slot)
    }

    /// The vector stored in `slot`
    pub fn vector(&self, slot: usize) -> Option<&[f32]> {
        let start = slot.checked_mul(self.dimension)?;
        self.vectors.get(start..start + self.dimension)
    }

    /// Exact k-nearest-neighbour search.
    ///
    /// Returns at most `k` `(slot, distance)` pairs, nearest first. Equal
    /// distances are ordered by slot.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(Error::Embedding(format!(
                "query has {} dimensions, index expects {}",
                query.len(),
                self.dimension
            )));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(slot, vector)| (slot, squared_l2(query, vector)))
            .collect();

        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored)
    }

    /// Write the index in its binary layout
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let model = self.model_id.as_bytes();
        writer.write_all(MAGIC)?;
        writer.write_all(&(self.dimension as u32).to_le_bytes())?;
        writer.write_all(&(self.len() as u64).to_le_bytes())?;
        writer.write_all(&(model.len() as u32).to_le_bytes())?;
        writer.write_all(model)?;
        for value in &self.vectors {
            writer.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }

    /// Read an index written by [`FlatL2Index::write_to`]
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 8];
        read_exact(reader, &mut magic)?;
        if &magic != MAGIC {
            return Err(Error::CorruptIndex("unrecognised index header".to_string()));
        }

        let dimension = read_u32(reader)? as usize;
        let count = read_u64(reader)? as usize;
        let model_len = read_u32(reader)? as usize;

        let model = read_bounded(reader, model_len)?;
        let model_id = String::from_utf8(model)
            .map_err(|_| Error::CorruptIndex("model id is not valid UTF-8".to_string()))?;

        let byte_len = count
            .checked_mul(dimension)
            .and_then(|total| total.checked_mul(4))
            .ok_or_else(|| Error::CorruptIndex("index size overflows".to_string()))?;
        let vectors = read_bounded(reader, byte_len)?
            .chunks_exact(4)
            .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            .collect();

        Ok(Self {
            dimension,
            model_id,
            vectors,
        })
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => Error::CorruptIndex("index file is truncated".to_string()),
        _ => Error::Io(e),
    })
}

/// Read exactly `len` bytes, growing the buffer only as data arrives so a
/// corrupt length field cannot trigger a huge allocation.
fn read_bounded<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(Error::CorruptIndex("index file is truncated".to_string()));
    }
    Ok(buf)
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact(reader, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    read_exact(reader, &mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Parallel arrays aligned with the index slots: slot `i` is `ids[i]` / `texts[i]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub ids: Vec<u64>,
    pub texts: Vec<String>,
}

impl Mapping {
    pub fn from_passages(passages: &[Passage]) -> Self {
        Self {
            ids: passages.iter().map(|p| p.id).collect(),
            texts: passages.iter().map(|p| p.text.clone()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Passage id and text stored for `slot`
    pub fn get(&self, slot: usize) -> Option<(u64, &str)> {
        let id = *self.ids.get(slot)?;
        let text = self.texts.get(slot)?;
        Some((id, text.as_str()))
    }
}

/// A loaded index together with its mapping
#[derive(Debug, Clone)]
pub struct VectorIndex {
    index: FlatL2Index,
    mapping: Mapping,
}

impl VectorIndex {
    /// Pair an index with its mapping, checking that the slots line up
    pub fn new(index: FlatL2Index, mapping: Mapping) -> Result<Self> {
        if mapping.ids.len() != mapping.texts.len() {
            return Err(Error::CorruptIndex(format!(
                "mapping has {} ids but {} texts",
                mapping.ids.len(),
                mapping.texts.len()
            )));
        }
        if mapping.len() != index.len() {
            return Err(Error::CorruptIndex(format!(
                "mapping has {} entries but index holds {} vectors",
                mapping.len(),
                index.len()
            )));
        }
        Ok(Self { index, mapping })
    }

    pub fn index(&self) -> &FlatL2Index {
        &self.index
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Search and resolve slots to passages, nearest first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedPassage>> {
        self.index
            .search(query, k)?
            .into_iter()
            .map(|(slot, distance)| {
                let (id, text) = self.mapping.get(slot).ok_or_else(|| {
                    Error::CorruptIndex(format!("slot {} has no mapping entry", slot))
                })?;
                Ok(RetrievedPassage {
                    id,
                    text: text.to_string(),
                    distance,
                })
            })
            .collect()
    }

    /// Write both artifacts into `dir`, replacing earlier ones
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        let index_path = dir.join(INDEX_FILE_NAME);
        let mut writer = BufWriter::new(File::create(&index_path)?);
        self.index.write_to(&mut writer)?;
        writer.flush()?;

        let mapping_path = dir.join(MAPPING_FILE_NAME);
        let mut writer = BufWriter::new(File::create(&mapping_path)?);
        serde_json::to_writer(&mut writer, &self.mapping)?;
        writer.flush()?;

        info!(
            vectors = self.len(),
            dir = %dir.display(),
            "Saved flat index and mapping"
        );
        Ok(())
    }

    /// Load both artifacts from `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let index_path = dir.join(INDEX_FILE_NAME);
        let mapping_path = dir.join(MAPPING_FILE_NAME);

        for path in [&index_path, &mapping_path] {
            if !path.exists() {
                return Err(Error::IndexNotFound(path.clone()));
            }
        }

        let mut reader = BufReader::new(File::open(&index_path)?);
        let index = FlatL2Index::read_from(&mut reader)?;

        let reader = BufReader::new(File::open(&mapping_path)?);
        let mapping: Mapping = serde_json::from_reader(reader)
            .map_err(|e| Error::CorruptIndex(format!("{}: {}", mapping_path.display(), e)))?;

        debug!(
            vectors = index.len(),
            dimension = index.dimension(),
            model = index.model_id(),
            "Loaded flat index"
        );
        Self::new(index, mapping)
    }
}
