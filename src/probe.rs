//! Presence probes behind the idempotency predicates.
//!
//! Each probe answers one question about on-disk state with a plain boolean.
//! Probes never error: anything unreadable counts as "not present", which
//! at worst re-runs a step that can safely be re-run.
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// FITS files are laid out in fixed-size blocks of 80-byte header cards.
const FITS_BLOCK: usize = 2880;
const FITS_CARD: usize = 80;

/// ANTAB-derived system temperature extension name.
pub const TSYS_EXTENSION: &str = "SYSTEM_TEMPERATURE";

/// ANTAB-derived gain curve extension name.
pub const GAIN_CURVE_EXTENSION: &str = "GAIN_CURVE";

/// Whether a FITS file carries an extension with the given `EXTNAME`.
///
/// Walks the header blocks looking for an `EXTNAME = 'NAME'` card. Data
/// blocks in between cannot contain valid cards, so scanning every block is
/// harmless and avoids tracking NAXIS sizes.
pub fn fits_has_extension(path: &Path, name: &str) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let needle = format!("'{name}'");
    let mut block = [0u8; FITS_BLOCK];
    loop {
        match read_block(&mut file, &mut block) {
            Some(len) if len == FITS_BLOCK => {}
            _ => return false,
        }
        for card in block.chunks(FITS_CARD) {
            if !card.starts_with(b"EXTNAME ") {
                continue;
            }
            let text = String::from_utf8_lossy(card);
            if text.contains(needle.as_str()) {
                return true;
            }
        }
    }
}

fn read_block(file: &mut File, block: &mut [u8]) -> Option<usize> {
    let mut filled = 0;
    while filled < block.len() {
        match file.read(&mut block[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(_) => return None,
        }
    }
    Some(filled)
}

/// Whether any gzipped archive remains in a directory.
pub fn has_gzipped_archives(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.file_name().to_string_lossy().ends_with(".gz"))
}
