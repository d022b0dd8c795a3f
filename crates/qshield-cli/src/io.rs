//! File, stdin and passphrase helpers shared by the commands.

use std::io::{BufRead, Read, Write};
use std::path::Path;

use zeroize::Zeroizing;

/// Environment variable consulted for the key-file passphrase.
pub const PASSPHRASE_ENV: &str = "QSHIELD_PASSPHRASE";

/// Environment variable consulted for the new passphrase on relock.
pub const NEW_PASSPHRASE_ENV: &str = "QSHIELD_NEW_PASSPHRASE";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Reads `path`, or all of stdin when `path` is `-`.
pub fn read_input(path: &Path) -> std::result::Result<Vec<u8>, String> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|e| format!("failed to read stdin: {e}"))?;
        return Ok(buf);
    }
    std::fs::read(path).map_err(|e| format!("failed to read {}: {e}", path.display()))
}

/// Reads `path` (or stdin) as UTF-8 text.
pub fn read_text(path: &Path) -> std::result::Result<String, String> {
    String::from_utf8(read_input(path)?)
        .map_err(|_| format!("{} is not valid UTF-8", path.display()))
}

/// Message bytes from `--message` text or an `--in` file.
pub fn message_bytes(
    message: Option<&str>,
    input: Option<&Path>,
) -> std::result::Result<Vec<u8>, String> {
    match (message, input) {
        (Some(text), None) => Ok(text.as_bytes().to_vec()),
        (None, Some(path)) => read_input(path),
        (Some(_), Some(_)) => Err("use either --message or --in, not both".into()),
        (None, None) => Err("no message given; use --message or --in".into()),
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Writes `bytes` to `path` via a temp file and rename so a crash never
/// leaves a half-written file behind. On Unix the file is created with
/// mode 0600.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::result::Result<(), String> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let written = options
        .open(&tmp_path)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|()| std::fs::rename(&tmp_path, path));

    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(format!("failed to write {}: {e}", path.display()));
    }

    tracing::info!(path = %path.display(), "file written");
    Ok(())
}

/// Writes `bytes` to `path`, or to stdout when no path is given.
pub fn write_output(path: Option<&Path>, bytes: &[u8]) -> std::result::Result<(), String> {
    match path {
        Some(path) => write_atomic(path, bytes),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(bytes)
                .and_then(|()| stdout.flush())
                .map_err(|e| format!("failed to write stdout: {e}"))
        }
    }
}

// ---------------------------------------------------------------------------
// Passphrase
// ---------------------------------------------------------------------------

/// Resolves a passphrase from an explicit flag, then `env_var`, then an
/// interactive prompt on stderr/stdin.
///
/// The trailing newline of a prompted line is stripped. An empty
/// result is returned as-is; callers that need a non-empty passphrase
/// reject it.
pub fn read_passphrase(
    explicit: Option<&str>,
    env_var: &str,
    prompt: &str,
) -> std::result::Result<Zeroizing<String>, String> {
    if let Some(pw) = explicit {
        return Ok(Zeroizing::new(pw.to_string()));
    }
    if let Ok(pw) = std::env::var(env_var) {
        return Ok(Zeroizing::new(pw));
    }

    eprint!("{prompt}");
    let _ = std::io::stderr().flush();

    let mut line = Zeroizing::new(String::new());
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| format!("failed to read passphrase: {e}"))?;

    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(line)
}
