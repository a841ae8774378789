/*
 * native.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * NativeRuntime: SystemRuntime implementation backed by std.
 */

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::traits::{CommandOutput, PathKind, RuntimeResult, SystemRuntime};

/// Runtime with full access to the local filesystem and process table.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRuntime;

impl NativeRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl SystemRuntime for NativeRuntime {
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        Ok(std::fs::read(path)?)
    }

    fn file_write(&self, path: &Path, contents: &[u8]) -> RuntimeResult<()> {
        Ok(std::fs::write(path, contents)?)
    }

    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool> {
        Ok(match kind {
            None => path.exists(),
            Some(PathKind::File) => path.is_file(),
            Some(PathKind::Directory) => path.is_dir(),
        })
    }

    fn dir_create(&self, path: &Path, recursive: bool) -> RuntimeResult<()> {
        if recursive {
            std::fs::create_dir_all(path)?;
        } else {
            std::fs::create_dir(path)?;
        }
        Ok(())
    }

    fn dir_list(&self, path: &Path) -> RuntimeResult<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            entries.push(entry?.path());
        }
        entries.sort();
        Ok(entries)
    }

    fn exec_command(
        &self,
        command: &Path,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> RuntimeResult<CommandOutput> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(input) = stdin {
            // Dropping the handle closes the pipe so the child sees EOF.
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input)?;
            }
        }

        let output = child.wait_with_output()?;
        Ok(CommandOutput {
            // Killed by signal → no code; report it as a generic failure.
            code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn env_get(&self, name: &str) -> RuntimeResult<Option<String>> {
        Ok(std::env::var(name).ok())
    }

    fn find_binary(&self, name: &str, env_var: &str) -> Option<PathBuf> {
        if let Ok(Some(path_str)) = self.env_get(env_var) {
            let path = PathBuf::from(path_str);
            if path.is_file() {
                return Some(path);
            }
        }
        which::which(name).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_file_roundtrip() {
        let rt = NativeRuntime::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("button.less");

        rt.file_write(&path, b"@button-color: #333;").unwrap();

        assert!(rt.is_file(&path).unwrap());
        assert!(!rt.is_dir(&path).unwrap());
        assert_eq!(
            rt.file_read_string(&path).unwrap(),
            "@button-color: #333;"
        );
    }

    #[test]
    fn test_native_dir_list_sorted() {
        let rt = NativeRuntime::new();
        let dir = tempfile::tempdir().unwrap();
        rt.file_write(&dir.path().join("card.less"), b"").unwrap();
        rt.file_write(&dir.path().join("alert.less"), b"").unwrap();

        let listed = rt.dir_list(dir.path()).unwrap();
        let names: Vec<_> = listed
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["alert.less", "card.less"]);
    }

    #[test]
    fn test_native_missing_file_is_io_error() {
        let rt = NativeRuntime::new();
        let dir = tempfile::tempdir().unwrap();
        let result = rt.file_read(&dir.path().join("missing.less"));
        assert!(matches!(result, Err(crate::RuntimeError::Io(_))));
    }

    #[test]
    fn test_find_binary_prefers_env_var() {
        let rt = NativeRuntime::new();
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("fake-lessc");
        rt.file_write(&fake, b"").unwrap();

        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("THEMEWEAVE_TEST_FAKE_LESSC", &fake) };
        let found = rt.find_binary("definitely-not-a-real-binary", "THEMEWEAVE_TEST_FAKE_LESSC");
        unsafe { std::env::remove_var("THEMEWEAVE_TEST_FAKE_LESSC") };

        assert_eq!(found, Some(fake));
    }

    #[test]
    fn test_find_binary_missing() {
        let rt = NativeRuntime::new();
        assert!(
            rt.find_binary("definitely-not-a-real-binary-xyz", "THEMEWEAVE_UNSET_VAR_XYZ")
                .is_none()
        );
    }
}
