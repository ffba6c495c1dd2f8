//! Root filesystem substitution via `chroot(2)`.

use std::path::Path;

use nestbox_common::error::{NestboxError, Result};

/// Confines the calling process to `new_root` and moves its cwd to `/`.
///
/// The working directory is repointed immediately after `chroot(2)`, before
/// any other filesystem access, so the process never keeps a cwd outside
/// the new root.
///
/// # Errors
///
/// Returns an error if `new_root` is not a directory, or if `chroot(2)` or
/// `chdir(2)` fails.
pub fn change_root(new_root: &Path) -> Result<()> {
    if !new_root.is_dir() {
        return Err(NestboxError::setup(
            "root",
            format!("{} is not a directory", new_root.display()),
        ));
    }
    nix::unistd::chroot(new_root).map_err(|e| {
        NestboxError::setup("root", format!("chroot {}: {e}", new_root.display()))
    })?;
    nix::unistd::chdir("/").map_err(|e| NestboxError::setup("root", format!("chdir /: {e}")))?;
    tracing::info!(new_root = %new_root.display(), "root substituted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_root_fails_before_any_syscall() {
        let err = change_root(Path::new("/nonexistent/rootfs")).unwrap_err();
        assert!(matches!(err, NestboxError::Setup { step: "root", .. }));
    }

    #[test]
    fn file_as_root_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(change_root(file.path()).is_err());
    }
}
