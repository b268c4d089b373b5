//! Clipboard output
//!
//! Copying goes through an ordered [`ClipboardChain`]. Each backend is tried in
//! turn until one accepts the text; when none does the caller gets
//! [`ParserError::ClipboardUnavailable`] naming everything that was tried.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::config::AppConfig;
use crate::error::{ParserError, Result};

/// A place text can be copied to.
pub trait ClipboardBackend {
    fn name(&self) -> String;
    fn write_text(&self, text: &str) -> Result<()>;
}

/// A clipboard program that reads the text from stdin (`pbcopy`, `wl-copy`, ...).
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    program: String,
    args: Vec<String>,
}

impl CommandClipboard {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Build from a whitespace-split command line; `None` when empty.
    pub fn from_parts(parts: &[String]) -> Option<Self> {
        let (program, args) = parts.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl ClipboardBackend for CommandClipboard {
    fn name(&self) -> String {
        self.program.clone()
    }

    fn write_text(&self, text: &str) -> Result<()> {
        let path = PathBuf::from(&self.program);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ParserError::io(&path, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                drop(stdin);
                // The child may still be running; reap it before reporting.
                let _ = child.kill();
                let _ = child.wait();
                return Err(ParserError::io(&path, e));
            }
        }

        let status = child.wait().map_err(|e| ParserError::io(&path, e))?;
        if status.success() {
            Ok(())
        } else {
            Err(ParserError::io(
                &path,
                std::io::Error::other(format!("exited with {status}")),
            ))
        }
    }
}

/// Writes the text to a file; the last resort when no clipboard program works.
#[derive(Debug, Clone)]
pub struct FileClipboard {
    path: PathBuf,
}

impl FileClipboard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ClipboardBackend for FileClipboard {
    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn write_text(&self, text: &str) -> Result<()> {
        std::fs::write(&self.path, text).map_err(|e| ParserError::io(&self.path, e))
    }
}

/// Ordered list of clipboard backends.
#[derive(Default)]
pub struct ClipboardChain {
    backends: Vec<Box<dyn ClipboardBackend>>,
}

impl ClipboardChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: impl ClipboardBackend + 'static) -> Self {
        self.backends.push(Box::new(backend));
        self
    }

    /// Configured host command first, then the platform clipboard programs,
    /// then the fallback file if one is configured.
    pub fn system(config: &AppConfig) -> Self {
        let mut chain = Self::new();

        if let Some(cmd) = config
            .clipboard_command
            .as_deref()
            .and_then(CommandClipboard::from_parts)
        {
            chain = chain.with_backend(cmd);
        }

        for backend in platform_commands() {
            chain = chain.with_backend(backend);
        }

        if let Some(path) = &config.clipboard_fallback_file {
            chain = chain.with_backend(FileClipboard::new(path));
        }

        chain
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Copy `text` with the first backend that accepts it and return its name.
    pub fn copy(&self, text: &str) -> Result<String> {
        let mut tried = Vec::with_capacity(self.backends.len());

        for backend in &self.backends {
            let name = backend.name();
            match backend.write_text(text) {
                Ok(()) => {
                    tracing::debug!(backend = %name, bytes = text.len(), "copied to clipboard");
                    return Ok(name);
                }
                Err(e) => {
                    tracing::debug!(backend = %name, error = %e, "clipboard backend failed");
                    tried.push(name);
                }
            }
        }

        tracing::warn!(tried = ?tried, "no clipboard backend available");
        Err(ParserError::ClipboardUnavailable { tried })
    }
}

fn platform_commands() -> Vec<CommandClipboard> {
    if cfg!(target_os = "macos") {
        vec![CommandClipboard::new("pbcopy", &[])]
    } else if cfg!(target_os = "windows") {
        vec![CommandClipboard::new("clip.exe", &[])]
    } else {
        vec![
            CommandClipboard::new("wl-copy", &[]),
            CommandClipboard::new("xclip", &["-selection", "clipboard"]),
            CommandClipboard::new("xsel", &["--clipboard", "--input"]),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recording {
        name: &'static str,
        fail: bool,
        seen: Rc<RefCell<Vec<String>>>,
    }

    impl ClipboardBackend for Recording {
        fn name(&self) -> String {
            self.name.to_string()
        }

        fn write_text(&self, text: &str) -> Result<()> {
            self.seen.borrow_mut().push(format!("{}:{}", self.name, text));
            if self.fail {
                Err(ParserError::io(self.name, std::io::Error::other("unavailable")))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_chain_falls_through_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let chain = ClipboardChain::new()
            .with_backend(Recording { name: "host", fail: true, seen: Rc::clone(&seen) })
            .with_backend(Recording { name: "api", fail: false, seen: Rc::clone(&seen) })
            .with_backend(Recording { name: "textarea", fail: false, seen: Rc::clone(&seen) });

        assert_eq!(chain.copy("data").unwrap(), "api");
        assert_eq!(*seen.borrow(), vec!["host:data", "api:data"]);
    }

    #[test]
    fn test_chain_reports_everything_tried() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let chain = ClipboardChain::new()
            .with_backend(Recording { name: "host", fail: true, seen: Rc::clone(&seen) })
            .with_backend(CommandClipboard::new("/nonexistent/ec-parser-clip", &[]));

        match chain.copy("data") {
            Err(ParserError::ClipboardUnavailable { tried }) => {
                assert_eq!(tried, vec!["host", "/nonexistent/ec-parser-clip"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_command_closing_stdin_early_fails_and_falls_through() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let chain = ClipboardChain::new()
            .with_backend(CommandClipboard::new("true", &[]))
            .with_backend(Recording { name: "next", fail: false, seen: Rc::clone(&seen) });

        // Larger than a pipe buffer, so the write cannot finish once `true` exits.
        let text = "x".repeat(1 << 20);
        assert!(CommandClipboard::new("true", &[]).write_text(&text).is_err());
        assert_eq!(chain.copy(&text).unwrap(), "next");
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_empty_chain_is_unavailable() {
        assert!(matches!(
            ClipboardChain::new().copy("x"),
            Err(ParserError::ClipboardUnavailable { .. })
        ));
    }

    #[test]
    fn test_file_fallback_writes_text() {
        let path = std::env::temp_dir().join(format!("ec_parser_clip_{}.txt", std::process::id()));
        let chain = ClipboardChain::new().with_backend(FileClipboard::new(&path));
        let used = chain.copy("hello").unwrap();
        assert!(used.starts_with("file:"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_system_chain_order() {
        let config = AppConfig {
            clipboard_command: Some(vec!["my-clip".to_string(), "--in".to_string()]),
            clipboard_fallback_file: Some(PathBuf::from("/tmp/clip.txt")),
            ..AppConfig::default()
        };
        let chain = ClipboardChain::system(&config);
        assert_eq!(chain.backends.first().unwrap().name(), "my-clip");
        assert_eq!(chain.backends.last().unwrap().name(), "file:/tmp/clip.txt");
        assert_eq!(chain.len(), platform_commands().len() + 2);
    }
}
