//! Raw program file loading.
//!
//! A PBPU program file is a plain byte stream with no header: byte `n`
//! becomes ROM address `n`.

use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest program accepted; ROM address 0xFF is never loaded.
pub const MAX_PROGRAM_LEN: usize = crate::cpu::memory::ROM_SIZE - 1;

/// Load a program file from disk.
///
/// Bytes past `MAX_PROGRAM_LEN` are dropped with a warning.
pub fn load_program<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, ProgramError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| ProgramError::NotFound {
        path: path.to_path_buf(),
        source,
    })?;

    // One byte past the limit tells us whether the file was cut short
    let mut bytes = Vec::with_capacity(MAX_PROGRAM_LEN + 1);
    file.take(MAX_PROGRAM_LEN as u64 + 1)
        .read_to_end(&mut bytes)
        .map_err(|source| ProgramError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    if bytes.len() > MAX_PROGRAM_LEN {
        log::warn!(
            "{} is longer than {} bytes, ignoring the rest",
            path.display(),
            MAX_PROGRAM_LEN
        );
    }

    let program = program_from_bytes(&bytes).map_err(|_| ProgramError::Empty {
        path: path.to_path_buf(),
    })?;
    log::info!("Read {} bytes from {}", program.len(), path.display());

    Ok(program)
}

/// Validate an in-memory program image.
pub fn program_from_bytes(bytes: &[u8]) -> Result<Vec<u8>, ProgramError> {
    if bytes.is_empty() {
        return Err(ProgramError::Empty {
            path: PathBuf::from("<memory>"),
        });
    }

    Ok(bytes[..bytes.len().min(MAX_PROGRAM_LEN)].to_vec())
}

/// Errors that can occur while loading a program.
#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("program not found: {}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("program is empty: {}", path.display())]
    Empty { path: PathBuf },
}
