//! Rename a buildpack inside a layer archive.
//!
//! A single forward pass over the tar stream: every entry path has the
//! escaped old id replaced by the escaped new id, and any `buildpack.toml`
//! has its `buildpack.id` patched. Everything else is copied through.
//!
//! Entry names are written into the header verbatim rather than through
//! `tar::Builder::append_data`, which normalizes paths and rejects the
//! absolute `/cnb/buildpacks/...` paths buildpackage layers use.

use std::io::{self, Read};

use bp_rename_core::error::{RenameError, Result};
use tar::{Archive, Builder, Entry, EntryType, Header};

use super::descriptor::BuildpackDescriptor;
use super::{escape_id, DESCRIPTOR_FILE};
use crate::oci::Layer;

/// Size of the `name` and `linkname` header fields.
const NAME_FIELD_LEN: usize = 100;

/// Name used for GNU long-name and long-link records.
const GNU_LONGLINK_NAME: &[u8] = b"././@LongLink";

/// PAX keys written by the rewriter itself rather than copied through.
const REWRITTEN_PAX_KEYS: &[&str] = &["path", "linkpath", "size"];

/// Rewrite one layer, returning a new layer with recomputed identity.
pub fn rewrite_layer(layer: &Layer, old_id: &str, new_id: &str) -> Result<Layer> {
    let tar = rewrite_archive(layer.uncompressed(), old_id, new_id)?;
    let rewritten = Layer::from_tar(tar)?;

    tracing::debug!(
        old_diff_id = %layer.diff_id(),
        new_diff_id = %rewritten.diff_id(),
        "Rewrote buildpack layer"
    );

    Ok(rewritten)
}

/// Rewrite an uncompressed tar stream, renaming `old_id` to `new_id`.
///
/// Returns the complete new archive. Nothing is returned on error.
pub fn rewrite_archive<R: Read>(reader: R, old_id: &str, new_id: &str) -> Result<Vec<u8>> {
    let from = escape_id(old_id);
    let to = escape_id(new_id);

    let mut archive = Archive::new(reader);
    let mut builder = Builder::new(Vec::new());
    let mut count = 0usize;

    let entries = archive
        .entries()
        .map_err(|e| RenameError::Archive(format!("Failed to read archive: {}", e)))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| RenameError::Archive(format!("Failed to read entry: {}", e)))?;

        let path = entry.path_bytes().into_owned();
        let link = entry.link_name_bytes().map(|l| l.into_owned());
        let mut header = entry.header().clone();
        let pax = pax_records(&mut entry).map_err(|e| {
            RenameError::Archive(format!(
                "Failed to read extended header of {}: {}",
                String::from_utf8_lossy(&path),
                e
            ))
        })?;

        let mut content = Vec::new();
        entry.read_to_end(&mut content).map_err(|e| {
            RenameError::Archive(format!(
                "Failed to read {}: {}",
                String::from_utf8_lossy(&path),
                e
            ))
        })?;
        if header.entry_type() != EntryType::GNUSparse && content.len() as u64 != entry.size() {
            return Err(RenameError::Archive(format!(
                "Truncated entry {}: expected {} bytes, read {}",
                String::from_utf8_lossy(&path),
                entry.size(),
                content.len()
            )));
        }

        let new_path = replace_bytes(&path, from.as_bytes(), to.as_bytes());

        if header.entry_type().is_file() && is_descriptor(&path) {
            let mut descriptor = BuildpackDescriptor::decode(&content)?;
            descriptor.buildpack.id = new_id.to_string();
            content = descriptor.encode()?;

            tracing::debug!(
                path = %String::from_utf8_lossy(&new_path),
                id = %new_id,
                "Patched buildpack descriptor"
            );
        }

        // Sparse entries are read back expanded, so they are written as plain files.
        if header.entry_type() == EntryType::GNUSparse {
            header.set_entry_type(EntryType::Regular);
        }
        if !header.entry_type().is_symlink() && !header.entry_type().is_hard_link() {
            header.set_size(content.len() as u64);
        }

        if !pax.is_empty() {
            builder
                .append_pax_extensions(pax.iter().map(|(k, v)| (k.as_str(), v.as_slice())))
                .map_err(|e| RenameError::Archive(format!("Failed to write entry: {}", e)))?;
        }
        append_raw(&mut builder, header, &new_path, link.as_deref(), &content)
            .map_err(|e| RenameError::Archive(format!("Failed to write entry: {}", e)))?;
        count += 1;
    }

    let tar = builder
        .into_inner()
        .map_err(|e| RenameError::Archive(format!("Failed to finish archive: {}", e)))?;

    tracing::debug!(entries = count, old_id, new_id, "Rewrote archive");
    Ok(tar)
}

/// Extended header records of `entry`, minus the ones rewritten here.
fn pax_records<R: Read>(entry: &mut Entry<'_, R>) -> io::Result<Vec<(String, Vec<u8>)>> {
    let mut records = Vec::new();
    // A global header is an entry of its own; its records are its content.
    if entry.header().entry_type().is_pax_global_extensions() {
        return Ok(records);
    }
    let Some(extensions) = entry.pax_extensions()? else {
        return Ok(records);
    };
    for extension in extensions {
        let extension = extension?;
        let key = extension
            .key()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if REWRITTEN_PAX_KEYS.contains(&key) {
            continue;
        }
        records.push((key.to_string(), extension.value_bytes().to_vec()));
    }
    Ok(records)
}

/// Whether `path` names a descriptor file: its last component, ignoring
/// trailing slashes, is `buildpack.toml`.
fn is_descriptor(path: &[u8]) -> bool {
    let end = path.iter().rposition(|b| *b != b'/').map_or(0, |i| i + 1);
    let trimmed = &path[..end];
    let name = trimmed
        .rsplit(|b| *b == b'/')
        .next()
        .unwrap_or(trimmed);
    name == DESCRIPTOR_FILE.as_bytes()
}

/// Replace every non-overlapping occurrence of `from` in `haystack`.
fn replace_bytes(haystack: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    if from.is_empty() {
        return haystack.to_vec();
    }

    let mut out = Vec::with_capacity(haystack.len());
    let mut rest = haystack;
    while let Some(pos) = rest.windows(from.len()).position(|w| w == from) {
        out.extend_from_slice(&rest[..pos]);
        out.extend_from_slice(to);
        rest = &rest[pos + from.len()..];
    }
    out.extend_from_slice(rest);
    out
}

/// Append an entry with its path and link target written as-is.
fn append_raw(
    builder: &mut Builder<Vec<u8>>,
    mut header: Header,
    path: &[u8],
    link: Option<&[u8]>,
    data: &[u8],
) -> io::Result<()> {
    if path.len() > NAME_FIELD_LEN {
        append_long_record(builder, EntryType::GNULongName, path)?;
    }
    fill_field(&mut header.as_old_mut().name, path);
    if let Some(ustar) = header.as_ustar_mut() {
        ustar.prefix = [0; 155];
    }

    if let Some(link) = link {
        if link.len() > NAME_FIELD_LEN {
            append_long_record(builder, EntryType::GNULongLink, link)?;
        }
        fill_field(&mut header.as_old_mut().linkname, link);
    }

    header.set_cksum();
    builder.append(&header, data)
}

/// Emit a GNU `L`/`K` record carrying a name too long for the header.
fn append_long_record(
    builder: &mut Builder<Vec<u8>>,
    kind: EntryType,
    value: &[u8],
) -> io::Result<()> {
    let mut header = Header::new_gnu();
    fill_field(&mut header.as_old_mut().name, GNU_LONGLINK_NAME);
    header.set_mode(0o644);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header.set_size(value.len() as u64 + 1);
    header.set_entry_type(kind);
    header.set_cksum();
    builder.append(&header, value.chain(io::repeat(0).take(1)))
}

/// Copy `value` into a fixed header field, NUL-padding (and truncating).
fn fill_field(field: &mut [u8], value: &[u8]) {
    field.fill(0);
    let len = value.len().min(field.len());
    field[..len].copy_from_slice(&value[..len]);
}
