use std::io::Write;
use std::path::{Path, PathBuf};

use colored::Colorize;
use tracing::info;

use crate::cli::{open_log, wprintln};
use crate::DjiError;

/// Options for the unscramble subcommand.
pub struct UnscrambleOptions {
    pub file: String,
    /// Output directory; defaults to the input's directory.
    pub out_dir: Option<String>,
    pub mmap: bool,
}

/// Output path: `<dir>/<input file name>.unscrambled`.
pub fn output_path(input: &Path, out_dir: Option<&Path>) -> Result<PathBuf, DjiError> {
    let name = input
        .file_name()
        .ok_or_else(|| DjiError::Argument(format!("{} is not a file path", input.display())))?;
    let mut out_name = name.to_os_string();
    out_name.push(".unscrambled");

    let dir = match out_dir {
        Some(d) => d.to_path_buf(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    Ok(dir.join(out_name))
}

/// Write a copy of the log with every scrambled payload in canonical form.
///
/// The copy has the same length and framing as the input; only payload
/// bytes and a reserved header tag change. The tag lets every other
/// subcommand read the copy directly. Logs older than the scrambling era are
/// copied verbatim.
pub fn execute(opts: &UnscrambleOptions, writer: &mut dyn Write) -> Result<(), DjiError> {
    let input = Path::new(&opts.file);
    let target = output_path(input, opts.out_dir.as_deref().map(Path::new))?;

    let log = open_log(&opts.file, opts.mmap, false)?;
    let scrambled = log.descrambler().is_enabled();
    let bytes = log.unscrambled_bytes();

    std::fs::write(&target, &bytes)
        .map_err(|e| DjiError::Io(format!("Cannot write {}: {}", target.display(), e)))?;
    info!(path = %target.display(), size = bytes.len(), "unscrambled copy written");

    if !scrambled {
        wprintln!(
            writer,
            "{}",
            format!(
                "Format version {} is not scrambled; copy is identical",
                log.header().format_version
            )
            .yellow()
        )?;
    }
    wprintln!(
        writer,
        "Wrote {} bytes to {}",
        bytes.len(),
        target.display().to_string().green()
    )?;
    Ok(())
}
