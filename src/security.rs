// ABOUTME: Security policy checked before filesystem and process effects
// The policy owns blacklists for reads and writes, a whitelist for process
// execution, and three override flags. Targets are canonicalised before any
// check so `../` hops cannot sidestep a restriction.

use crate::error::{codes, Error};
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct SecurityPolicy {
    /// Paths that may never be read (prefix match on canonical paths).
    pub read_restrict: Vec<PathBuf>,
    /// Paths that may never be written.
    pub write_restrict: Vec<PathBuf>,
    /// Programs that may be executed.
    pub execute_allow: Vec<String>,
    pub no_read: bool,
    pub no_write: bool,
    pub allow_execute_all: bool,
}

impl SecurityPolicy {
    /// A policy refusing writes and execution; reads are unrestricted.
    pub fn read_only() -> Self {
        SecurityPolicy {
            no_write: true,
            ..SecurityPolicy::default()
        }
    }

    pub fn check_read(&self, path: &Path) -> Result<PathBuf, Error> {
        if self.no_read {
            return Err(Error::security(
                codes::SEC_READ,
                format!("reads are disabled by policy: {}", path.display()),
            ));
        }
        let canonical = canonicalize_lenient(path);
        for restricted in &self.read_restrict {
            if prefix_matches(&canonical, restricted) {
                return Err(Error::security(
                    codes::SEC_READ,
                    format!("read of {} denied by policy", canonical.display()),
                ));
            }
        }
        Ok(canonical)
    }

    pub fn check_write(&self, path: &Path) -> Result<PathBuf, Error> {
        if self.no_write {
            return Err(Error::security(
                codes::SEC_WRITE,
                format!("writes are disabled by policy: {}", path.display()),
            ));
        }
        let canonical = canonicalize_lenient(path);
        for restricted in &self.write_restrict {
            if prefix_matches(&canonical, restricted) {
                return Err(Error::security(
                    codes::SEC_WRITE,
                    format!("write to {} denied by policy", canonical.display()),
                ));
            }
        }
        Ok(canonical)
    }

    pub fn check_execute(&self, program: &str) -> Result<(), Error> {
        if self.allow_execute_all {
            return Ok(());
        }
        let basename = Path::new(program)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| program.to_string());
        if self
            .execute_allow
            .iter()
            .any(|allowed| allowed == program || *allowed == basename)
        {
            return Ok(());
        }
        Err(Error::security(
            codes::SEC_EXEC,
            format!("execution of `{program}` denied by policy"),
        ))
    }
}

fn prefix_matches(candidate: &Path, restricted: &Path) -> bool {
    let restricted = canonicalize_lenient(restricted);
    candidate.starts_with(&restricted)
}

/// Canonicalise even when the target does not exist yet: resolve via the
/// filesystem where possible, then normalise the remaining components.
pub fn canonicalize_lenient(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let mut normalised = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalised.pop();
            }
            other => normalised.push(other.as_os_str()),
        }
    }
    normalised
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_read_flag() {
        let policy = SecurityPolicy {
            no_read: true,
            ..Default::default()
        };
        assert!(policy.check_read(Path::new("/tmp/x")).is_err());
    }

    #[test]
    fn test_read_restrict_prefix() {
        let policy = SecurityPolicy {
            read_restrict: vec![PathBuf::from("/etc")],
            ..Default::default()
        };
        assert!(policy.check_read(Path::new("/etc/passwd")).is_err());
        assert!(policy.check_read(Path::new("/tmp/ok")).is_ok());
    }

    #[test]
    fn test_traversal_cannot_escape_restriction() {
        let policy = SecurityPolicy {
            read_restrict: vec![PathBuf::from("/etc")],
            ..Default::default()
        };
        assert!(policy.check_read(Path::new("/tmp/../etc/passwd")).is_err());
    }

    #[test]
    fn test_execute_whitelist() {
        let policy = SecurityPolicy {
            execute_allow: vec!["ls".to_string()],
            ..Default::default()
        };
        assert!(policy.check_execute("ls").is_ok());
        assert!(policy.check_execute("/bin/ls").is_ok());
        assert!(policy.check_execute("rm").is_err());
    }

    #[test]
    fn test_execute_all_flag() {
        let policy = SecurityPolicy {
            allow_execute_all: true,
            ..Default::default()
        };
        assert!(policy.check_execute("anything").is_ok());
    }

    #[test]
    fn test_violations_are_security_class() {
        let policy = SecurityPolicy {
            no_write: true,
            ..Default::default()
        };
        let err = policy.check_write(Path::new("/tmp/x")).unwrap_err();
        assert!(err.class.is_catchable());
        assert_eq!(err.code, "SEC-0002");
    }
}
