//! Spool file naming and instruction line format.
//!
//! Both must stay byte-compatible with the offline collector, which expects
//!
//! ```text
//! <root>/<node>/<timestamp>-<instance>-X-<token>-mako-<node>
//! ```
//!
//! and one `mako\t<node>\t<field>...` line per record. The collector ignores
//! the instance and token parts of the name, so they carry our own meaning: the
//! zone the writer runs in and a fresh uuid per batch.

use std::path::{Path, PathBuf};

use core_types::{MAKO_TAG, Record};
use utils::{id_util::generate_random_uuid, time_util::current_instruction_timestamp};

use crate::error::Error;

const SCRATCH_DIR_SUFFIX: &str = ".tmp";

pub fn instruction_file_name(node: &str, timestamp: &str, instance: &str, token: &str) -> String {
    [timestamp, instance, "X", token, MAKO_TAG, node].join("-")
}

pub fn instruction_path(
    root: &Path,
    node: &str,
    timestamp: &str,
    instance: &str,
    token: &str,
) -> PathBuf {
    root.join(node)
        .join(instruction_file_name(node, timestamp, instance, token))
}

/// Storage node ids become a directory name, so they must be a single normal
/// path component.
pub fn validate_node_id(node: &str) -> Result<(), Error> {
    if node.is_empty() || node == "." || node == ".." || node.contains(['/', '\\', '\0']) {
        return Err(Error::InvalidInput(format!(
            "storage node id {:?} is not a valid path component",
            node
        )));
    }
    Ok(())
}

/// Where a file bound for `path` is staged before being renamed into place:
/// same basename inside the sibling `<dir>.tmp` directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ScratchLocation {
    pub dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub scratch_path: PathBuf,
}

impl ScratchLocation {
    pub fn for_path(path: &Path) -> Result<Self, Error> {
        let (Some(dir), Some(basename)) = (path.parent(), path.file_name()) else {
            return Err(Error::InvalidInput(format!(
                "spool path {} has no parent directory or file name",
                path.display()
            )));
        };

        let mut scratch_dir = dir.as_os_str().to_owned();
        scratch_dir.push(SCRATCH_DIR_SUFFIX);
        let scratch_dir = PathBuf::from(scratch_dir);
        let scratch_path = scratch_dir.join(basename);

        Ok(Self {
            dir: dir.to_path_buf(),
            scratch_dir,
            scratch_path,
        })
    }
}

/// One tab separated line per record, each terminated by a newline. Absent
/// fields are written as empty columns.
pub fn format_instruction_lines(node: &str, records: &[Record]) -> String {
    let mut data = records
        .iter()
        .map(|record| format_instruction_line(node, record))
        .collect::<Vec<_>>()
        .join("\n");
    data.push('\n');
    data
}

fn format_instruction_line(node: &str, record: &Record) -> String {
    let mut columns: Vec<&str> = Vec::with_capacity(record.fields.len() + 2);
    columns.push(MAKO_TAG);
    columns.push(node);
    columns.extend(record.fields.iter().map(|f| f.as_deref().unwrap_or("")));
    columns.join("\t")
}

/// Produces a fresh spool path per batch from the configured root and instance.
#[derive(Debug, Clone)]
pub struct InstructionPathBuilder {
    root: PathBuf,
    instance: String,
}

impl InstructionPathBuilder {
    pub fn new(root: impl Into<PathBuf>, instance: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            instance: instance.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn next_path(&self, node: &str) -> PathBuf {
        instruction_path(
            &self.root,
            node,
            &current_instruction_timestamp(),
            &self.instance,
            &generate_random_uuid(),
        )
    }
}
