// gallery-core/src/install/scan.rs
//! Offline scan for pickled payloads that import code-executing callables.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use gallery_common::error::{GalleryError, Result};
use tracing::{debug, warn};

// Upper bound on how much of an artifact is inspected.
const SCAN_LIMIT: u64 = 64 * 1024 * 1024;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const PICKLE_PROTO: u8 = 0x80;

/// `module\ncallable` pairs as they appear after a GLOBAL opcode, plus bare
/// module names pushed for STACK_GLOBAL.
const DANGEROUS_IMPORTS: &[&[u8]] = &[
    b"os\nsystem",
    b"posix\nsystem",
    b"nt\nsystem",
    b"subprocess\n",
    b"builtins\neval",
    b"builtins\nexec",
    b"__builtin__\neval",
    b"__builtin__\nexec",
    b"runpy\n",
    b"webbrowser\n",
    b"\x8c\x02os\x94",
    b"\x8c\x05posix\x94",
    b"\x8c\nsubprocess\x94",
    b"\x8c\x05runpy\x94",
];

fn looks_pickled(header: &[u8]) -> bool {
    header.starts_with(ZIP_MAGIC)
        || (header.len() >= 2 && header[0] == PICKLE_PROTO && (2..=5).contains(&header[1]))
}

/// Rejects pickle (or zip-wrapped pickle) artifacts importing dangerous
/// callables. Anything that is not a pickle passes untouched.
pub fn scan_artifact(path: &Path) -> Result<()> {
    let mut content = Vec::new();
    File::open(path)?.take(SCAN_LIMIT).read_to_end(&mut content)?;
    if !looks_pickled(&content) {
        debug!("{} is not a pickle, nothing to scan", path.display());
        return Ok(());
    }

    for pattern in DANGEROUS_IMPORTS {
        if content.windows(pattern.len()).any(|w| w == *pattern) {
            let shown = String::from_utf8_lossy(pattern).replace('\n', ".");
            warn!("Unsafe import '{}' found in {}", shown.trim(), path.display());
            return Err(GalleryError::IntegrityScan(format!(
                "{} imports unsafe callable '{}'",
                path.display(),
                shown.trim()
            )));
        }
    }
    debug!("Scanned {}: no unsafe imports", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn plain_files_pass() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.gguf");
        std::fs::write(&path, b"GGUF\x03\x00 os\nsystem").unwrap();
        scan_artifact(&path).unwrap();
    }

    #[test]
    fn pickle_with_os_system_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        std::fs::write(&path, b"\x80\x02cos\nsystem\nq\x00X\x02\x00\x00\x00lsq\x01\x85R.").unwrap();
        let err = scan_artifact(&path).unwrap_err();
        assert!(err.is_integrity_error());
    }

    #[test]
    fn benign_pickle_passes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weights.pt");
        std::fs::write(&path, b"\x80\x04ccollections\nOrderedDict\nq\x00)Rq\x01.").unwrap();
        scan_artifact(&path).unwrap();
    }
}
