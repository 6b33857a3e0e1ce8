use crate::error::{AppError, Result};
use crate::ml::pipeline::TextPipeline;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Leading bytes of every artifact file
const MAGIC: &[u8; 8] = b"SCLFPIPE";

/// Bumped whenever the serialized layout of [`TextPipeline`] changes
pub const FORMAT_VERSION: u32 = 1;

/// Serialize a fitted pipeline to `path`, creating parent directories
pub fn save(pipeline: &TextPipeline, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path).map_err(|e| {
        AppError::Artifact(format!("cannot create {}: {}", path.display(), e))
    })?;
    let mut writer = BufWriter::new(file);

    writer.write_all(MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    bincode::serialize_into(&mut writer, pipeline)?;
    writer.flush()?;

    tracing::info!(path = %path.display(), "Pipeline artifact written");
    Ok(())
}

/// Load and validate a pipeline written by [`save`]
pub fn load(path: &Path) -> Result<TextPipeline> {
    let file = File::open(path)
        .map_err(|e| AppError::Artifact(format!("cannot open {}: {}", path.display(), e)))?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 8];
    reader
        .read_exact(&mut magic)
        .map_err(|_| AppError::Artifact(format!("{} is truncated", path.display())))?;
    if &magic != MAGIC {
        return Err(AppError::Artifact(format!(
            "{} is not a pipeline artifact",
            path.display()
        )));
    }

    let mut version = [0u8; 4];
    reader
        .read_exact(&mut version)
        .map_err(|_| AppError::Artifact(format!("{} is truncated", path.display())))?;
    let version = u32::from_le_bytes(version);
    if version != FORMAT_VERSION {
        return Err(AppError::Artifact(format!(
            "{} has format version {}, expected {}",
            path.display(),
            version,
            FORMAT_VERSION
        )));
    }

    let pipeline: TextPipeline = bincode::deserialize_from(reader)?;
    pipeline.validate()?;
    Ok(pipeline)
}
