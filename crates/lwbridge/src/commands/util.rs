//! Shared helpers for command handlers.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use lwbridge_core::Device;

use crate::error::CliError;

/// Read a file, or stdin when the path is `-`.
fn read_source(path: &Path) -> Result<String, CliError> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Read and parse a device description for `--device`.
pub fn read_device(path: &Path) -> Result<Arc<Device>, CliError> {
    let contents = read_source(path)?;
    let device: Device = serde_json::from_str(&contents)?;
    Ok(Arc::new(device))
}

/// Resolve a `--payload` argument: inline text, or `@path` to read a file.
pub fn read_payload(arg: &str) -> Result<String, CliError> {
    match arg.strip_prefix('@') {
        Some(path) => read_source(Path::new(path)),
        None => Ok(arg.to_owned()),
    }
}
