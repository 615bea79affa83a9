use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the archive holding every converted file.
pub const BUNDLE_NAME: &str = "converted_meshes.zip";

/// Write `files` into a deflated ZIP archive at `dest`.
///
/// Entries are stored under their base name.
pub fn write_bundle(dest: &Path, files: &[PathBuf]) -> Result<(), zip::result::ZipError> {
    let file = File::create(dest)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("no file name in {}", path.display()),
                )
            })?;
        zip.start_file(name, options)?;
        let mut reader = File::open(path)?;
        std::io::copy(&mut reader, &mut zip)?;
    }

    zip.finish()?.flush()?;
    Ok(())
}
