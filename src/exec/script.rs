//! # Wrapper-script generation for file-output mode.
//!
//! In file mode the child is launched through a short generated script that
//! redirects stdout and stderr to the log in append mode. The rename/truncate
//! window of rotation is confined to process start, the running child always
//! holds the live log, and both streams stay ordered in one file without the
//! supervisor plumbing pipes.
//!
//! Layout: `<log-dir>/.procvd/<group>.<process>.<sh|cmd>`, names sanitized.
//!
//! Quoting: POSIX embeds values in single quotes with `'` encoded as
//! `'"'"'`; Windows doubles `"` inside a `"..."` literal.

use std::io;
use std::path::{Path, PathBuf};

use crate::config::ResolvedProcess;

/// Directory holding generated wrapper scripts, sibling to the logs.
pub const SCRIPT_DIR: &str = ".procvd";

/// Replaces characters that are invalid in a filename with `_`.
///
/// The reserved set is the cross-platform superset, so generated names are
/// portable between hosts sharing an output directory.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Quotes a value for a POSIX shell script.
pub fn posix_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r#"'"'"'"#))
}

/// Quotes a value for a Windows batch script.
pub fn windows_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Returns the wrapper-script path for a process logging into `log_path`.
pub fn script_path(log_path: &Path, group: &str, process: &str) -> PathBuf {
    let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    let ext = if cfg!(windows) { "cmd" } else { "sh" };
    dir.join(SCRIPT_DIR)
        .join(format!("{}.{}.{}", sanitize(group), sanitize(process), ext))
}

/// Renders the wrapper-script body for `process`, appending to `log_path`.
///
/// Direct executables are `exec`'d with `"$@"` (POSIX) or `%*` (Windows) so
/// runtime-supplied arguments still flow; shell commands run via the
/// platform shell inside the script.
pub fn render(process: &ResolvedProcess, log_path: &Path) -> String {
    if cfg!(windows) {
        render_windows(process, log_path)
    } else {
        render_posix(process, log_path)
    }
}

fn render_posix(process: &ResolvedProcess, log_path: &Path) -> String {
    let log = posix_quote(&log_path.to_string_lossy());
    match &process.shell_command {
        Some(command) => format!(
            "#!/bin/sh\nexec /bin/sh -c {} >> {} 2>&1\n",
            posix_quote(command),
            log
        ),
        None => format!(
            "#!/bin/sh\nexec {} \"$@\" >> {} 2>&1\n",
            posix_quote(&process.executable.to_string_lossy()),
            log
        ),
    }
}

fn render_windows(process: &ResolvedProcess, log_path: &Path) -> String {
    let log = windows_quote(&log_path.to_string_lossy());
    match &process.shell_command {
        Some(command) => format!(
            "@echo off\r\ncmd /d /c {} >> {} 2>&1\r\n",
            windows_quote(command),
            log
        ),
        None => format!(
            "@echo off\r\n{} %* >> {} 2>&1\r\n",
            windows_quote(&process.executable.to_string_lossy()),
            log
        ),
    }
}

/// Writes the wrapper script for `process` and returns its path.
///
/// On POSIX the file is marked executable; failure to set the mode is
/// ignored because the spawn still goes through `/bin/sh`-style execution
/// of the path.
pub fn write_wrapper(process: &ResolvedProcess, log_path: &Path) -> io::Result<PathBuf> {
    let path = script_path(log_path, &process.key.group, &process.key.process);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, render(process, log_path))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755));
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputPolicy, ProcessKey};

    fn process(shell_command: Option<&str>) -> ResolvedProcess {
        ResolvedProcess {
            key: ProcessKey::new("api", "web"),
            executable: PathBuf::from("/opt/bin/web server"),
            display_path: "web".to_string(),
            working_dir: PathBuf::from("/"),
            args: vec![],
            env: vec![],
            shell_command: shell_command.map(str::to_string),
            output: OutputPolicy::Inherit,
        }
    }

    #[test]
    fn sanitize_replaces_reserved_characters() {
        assert_eq!(sanitize("api/web:1"), "api_web_1");
        assert_eq!(sanitize("plain-name_9"), "plain-name_9");
        assert_eq!(sanitize("a\u{0007}b"), "a_b");
    }

    #[test]
    fn posix_quoting_escapes_single_quotes() {
        assert_eq!(posix_quote("it's"), r#"'it'"'"'s'"#);
        assert_eq!(posix_quote("plain"), "'plain'");
    }

    #[test]
    fn windows_quoting_doubles_double_quotes() {
        assert_eq!(windows_quote(r#"say "hi""#), r#""say ""hi""""#);
    }

    #[cfg(unix)]
    #[test]
    fn posix_direct_script_execs_with_args_passthrough() {
        let body = render(&process(None), Path::new("/logs/api/web.log"));
        assert!(body.starts_with("#!/bin/sh\n"));
        assert!(body.contains(r#"exec '/opt/bin/web server' "$@" >> '/logs/api/web.log' 2>&1"#));
    }

    #[cfg(unix)]
    #[test]
    fn posix_shell_script_goes_through_the_shell() {
        let body = render(
            &process(Some("echo 'it works'")),
            Path::new("/logs/api/web.log"),
        );
        assert!(body.contains(r#"exec /bin/sh -c 'echo '"'"'it works'"'"''"#));
    }

    #[test]
    fn script_path_lands_in_dot_procvd() {
        let path = script_path(Path::new("/logs/api/web.log"), "api", "web");
        let expected_ext = if cfg!(windows) { "cmd" } else { "sh" };
        assert_eq!(
            path,
            Path::new("/logs/api")
                .join(SCRIPT_DIR)
                .join(format!("api.web.{expected_ext}"))
        );
    }
}
