//! Rename-aside naming shared by both `Syncer` backends (spec §4.A
//! `rename`): insert a timestamp suffix between basename and extension.
//!
//! Grounded in the original `remote/remote.go`'s `Rename`, which appends
//! `time.Now().Format(time.Stamp)` (Go's `"Jan _2 15:04:05"` reference
//! layout) before the extension. `syncd-core::filesystem_local` and
//! `syncd-http::syncer` both call this so local and remote rename-aside
//! produce the same naming scheme.

use chrono::Utc;

/// Inserts a timestamp between the basename and extension of a
/// `/`-or-`\`-separated id, e.g. `"report.pdf"` → `"reportJan_2_15:04:05.pdf"`.
pub fn insert_timestamp(id: &str) -> String {
    let (dir, base) = match id.rfind(|c| c == '/' || c == '\\') {
        Some(idx) => (&id[..=idx], &id[idx + 1..]),
        None => ("", id),
    };
    let stamp = Utc::now().format("%b_%e_%H:%M:%S").to_string();
    let (stem, ext) = match base.rfind('.') {
        Some(idx) if idx > 0 => (&base[..idx], Some(&base[idx + 1..])),
        _ => (base, None),
    };
    let new_base = match ext {
        Some(ext) => format!("{stem}{stamp}.{ext}"),
        None => format!("{stem}{stamp}"),
    };
    format!("{dir}{new_base}")
}
