//! Maps an id on one backend to the corresponding id on the other side
//! of a profile (spec §4: "D constructs the paired counterpart file
//! through A").
//!
//! A profile binds `local_root` to `remote_root`; every path beneath one
//! root has exactly one counterpart beneath the other, found by
//! stripping the root prefix and re-joining it onto the opposite root.

use syncd_core::domain::errors::EngineError;
use syncd_core::domain::handle::Backend;
use syncd_core::domain::profile::Profile;

/// Computes the id on `backend`'s *opposite* side that corresponds to
/// `id` (which belongs to `backend`).
pub fn counterpart_id(profile: &Profile, backend: Backend, id: &str) -> Result<String, EngineError> {
    match backend {
        Backend::Local => {
            let root = profile.local_root.to_string();
            let rel = relative_to(id, &root)?;
            Ok(join_remote(profile.remote_root.as_str(), &rel))
        }
        Backend::Remote => {
            let root = profile.remote_root.as_str();
            let rel = relative_to(id, root)?;
            Ok(join_local(&profile.local_root.to_string(), &rel))
        }
    }
}

fn relative_to(id: &str, root: &str) -> Result<String, EngineError> {
    let rel = id
        .strip_prefix(root)
        .ok_or_else(|| EngineError::Invariant(format!("{id} is not under root {root}")))?;
    Ok(rel.trim_start_matches(['/', '\\']).to_string())
}

fn join_remote(root: &str, rel: &str) -> String {
    if rel.is_empty() {
        return root.to_string();
    }
    if root == "/" {
        format!("/{rel}")
    } else {
        format!("{root}/{rel}")
    }
}

fn join_local(root: &str, rel: &str) -> String {
    if rel.is_empty() {
        return root.to_string();
    }
    let sep = if root.ends_with('/') { "" } else { "/" };
    format!("{root}{sep}{rel}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use syncd_core::domain::newtypes::{RemotePath, SyncPath};
    use syncd_core::domain::profile::{ConflictPolicy, Direction};

    fn profile() -> Profile {
        Profile {
            name: "docs".into(),
            direction: Direction::Both,
            conflict_policy: ConflictPolicy::Overwrite,
            conflict_window: Duration::from_secs(30),
            ignore: vec![],
            local_root: SyncPath::new("/home/user/docs".into()).unwrap(),
            remote_root: RemotePath::new("/docs".into()).unwrap(),
            active: true,
        }
    }

    #[test]
    fn local_to_remote_root_itself() {
        let p = profile();
        let r = counterpart_id(&p, Backend::Local, "/home/user/docs").unwrap();
        assert_eq!(r, "/docs");
    }

    #[test]
    fn local_to_remote_nested() {
        let p = profile();
        let r = counterpart_id(&p, Backend::Local, "/home/user/docs/a/report.pdf").unwrap();
        assert_eq!(r, "/docs/a/report.pdf");
    }

    #[test]
    fn remote_to_local_nested() {
        let p = profile();
        let r = counterpart_id(&p, Backend::Remote, "/docs/a/report.pdf").unwrap();
        assert_eq!(r, "/home/user/docs/a/report.pdf");
    }

    #[test]
    fn rejects_id_outside_root() {
        let p = profile();
        assert!(counterpart_id(&p, Backend::Local, "/etc/passwd").is_err());
    }
}
