//! # Source Transport
//!
//! The resolver never talks to version control directly; it goes through
//! the [`SourceTransport`] trait. This keeps the traversal logic testable
//! (tests inject a scripted transport) and isolates the messy parts of
//! shelling out to `git`.
//!
//! [`GitTransport`] is the production implementation. It uses the system
//! `git` command, which automatically handles:
//! - SSH keys from ~/.ssh/
//! - Git credential helpers
//! - Personal access tokens
//! - Any authentication configured in ~/.gitconfig

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::warn;

use crate::error::{Error, Result};
use crate::source::SourceDescriptor;

/// Flags controlling a single fetch-or-update call.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Forbid network access; fail if no checkout exists yet.
    pub only_local: bool,
    /// Skip updating when a checkout already exists.
    pub checkout_only: bool,
    /// Discard local modifications in an existing checkout.
    pub reset: bool,
    /// Network operations are retried this many additional times.
    pub retries: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            only_local: false,
            checkout_only: false,
            reset: false,
            retries: 2,
        }
    }
}

/// Transport capability consumed by the resolver.
pub trait SourceTransport {
    /// Fetch or update `source` into `destination`.
    ///
    /// Local sources are a no-op. For remote sources a missing checkout
    /// is cloned, an existing one updated, honoring the flags in
    /// `options`.
    fn fetch_or_update(
        &self,
        source: &SourceDescriptor,
        destination: &Path,
        options: &FetchOptions,
    ) -> Result<()>;

    /// Whether `source` needs no fetch at all.
    fn is_local(&self, source: &SourceDescriptor) -> bool {
        source.is_local()
    }

    /// Canonical on-disk location for a remote source's checkout.
    fn canonical_dir(&self, source: &SourceDescriptor) -> PathBuf;
}

/// Production transport, shelling out to the system `git` binary.
pub struct GitTransport {
    cache_root: PathBuf,
}

impl GitTransport {
    pub fn new(cache_root: PathBuf) -> Self {
        Self { cache_root }
    }

    fn clone_shallow(&self, url: &str, rev: &str, destination: &Path) -> Result<()> {
        // git won't clone into an existing non-empty dir
        if destination.exists() {
            fs::remove_dir_all(destination)?;
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        let output = Command::new("git")
            .args(["clone", "--depth=1", "--branch", rev, url])
            .arg(destination)
            .output()
            .map_err(|e| Error::GitClone {
                url: url.to_string(),
                rev: rev.to_string(),
                message: e.to_string(),
                hint: None,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let hint = if stderr.contains("Authentication failed")
                || stderr.contains("Permission denied")
                || stderr.contains("Could not read from remote repository")
            {
                Some(
                    "authentication failed; for private repos make sure an SSH key is \
                     loaded or git credentials / an access token are configured"
                        .to_string(),
                )
            } else {
                None
            };
            return Err(Error::GitClone {
                url: url.to_string(),
                rev: rev.to_string(),
                message: stderr.trim().to_string(),
                hint,
            });
        }
        Ok(())
    }

    fn run_git(&self, url: &str, destination: &Path, args: &[&str]) -> Result<()> {
        let output = Command::new("git")
            .arg("-C")
            .arg(destination)
            .args(args)
            .output()
            .map_err(|e| Error::GitCommand {
                command: args.join(" "),
                url: url.to_string(),
                stderr: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(Error::GitCommand {
                command: args.join(" "),
                url: url.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn update(&self, url: &str, rev: &str, destination: &Path, reset: bool, retries: u32) -> Result<()> {
        with_retry(retries, url, || {
            self.run_git(url, destination, &["fetch", "--depth=1", "origin", rev])
        })?;
        if reset {
            self.run_git(url, destination, &["reset", "--hard", "FETCH_HEAD"])?;
            self.run_git(url, destination, &["clean", "-fd"])?;
        } else {
            self.run_git(url, destination, &["checkout", "--detach", "FETCH_HEAD"])?;
        }
        Ok(())
    }
}

impl SourceTransport for GitTransport {
    fn fetch_or_update(
        &self,
        source: &SourceDescriptor,
        destination: &Path,
        options: &FetchOptions,
    ) -> Result<()> {
        let SourceDescriptor::Git { url, rev } = source else {
            return Ok(());
        };
        let url = url.as_str();
        let checkout_exists = destination.join(".git").exists();

        if checkout_exists && options.checkout_only {
            return Ok(());
        }
        if options.only_local {
            if !checkout_exists {
                return Err(Error::Transport {
                    descriptor: source.to_string(),
                    message: "no local checkout and network access is disabled".to_string(),
                });
            }
            if options.reset {
                self.run_git(url, destination, &["reset", "--hard", "HEAD"])?;
                self.run_git(url, destination, &["clean", "-fd"])?;
            }
            return Ok(());
        }

        if checkout_exists {
            self.update(url, rev, destination, options.reset, options.retries)
        } else {
            with_retry(options.retries, url, || {
                self.clone_shallow(url, rev, destination)
            })
        }
    }

    fn canonical_dir(&self, source: &SourceDescriptor) -> PathBuf {
        self.cache_root.join(source.dir_name())
    }
}

/// Run a network operation up to `retries + 1` times.
fn with_retry<F>(retries: u32, url: &str, mut operation: F) -> Result<()>
where
    F: FnMut() -> Result<()>,
{
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(()) => return Ok(()),
            Err(e) if attempt < retries => {
                attempt += 1;
                warn!(
                    "git operation on {} failed (attempt {}/{}): {}",
                    url,
                    attempt,
                    retries + 1,
                    e
                );
            }
            Err(e) => return Err(e),
        }
    }
}
