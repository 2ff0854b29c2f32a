//! Resource loading for the built-in macro definitions.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// Name of the built-in macro definitions resource.
pub const BUILTIN_MACROS: &str = "macros.json";

const BUNDLED_MACROS_JSON: &str = include_str!("../resources/macros.json");

/// Opens named resources.
pub trait ResourceLoader: Send + Sync {
    /// A reader over the resource called `name`, or `None` if there is no such resource.
    fn open_resource(&self, name: &str) -> Option<Box<dyn Read + '_>>;
}

/// Resources compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledResources;

impl ResourceLoader for BundledResources {
    fn open_resource(&self, name: &str) -> Option<Box<dyn Read + '_>> {
        match name {
            BUILTIN_MACROS => Some(Box::new(BUNDLED_MACROS_JSON.as_bytes())),
            _ => None,
        }
    }
}

/// Resources read from files in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    /// Serve files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResourceLoader for DirectoryResources {
    fn open_resource(&self, name: &str) -> Option<Box<dyn Read + '_>> {
        match File::open(self.root.join(name)) {
            Ok(file) => Some(Box::new(file)),
            Err(err) => {
                tracing::debug!(name, %err, "resource not found");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_macros_resource() {
        let mut text = String::new();
        BundledResources
            .open_resource(BUILTIN_MACROS)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert!(text.contains("\"if\""));
        assert!(BundledResources.open_resource("nope.json").is_none());
    }

    #[test]
    fn test_directory_resources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(BUILTIN_MACROS), "{}").unwrap();
        let loader = DirectoryResources::new(dir.path());
        let mut text = String::new();
        loader
            .open_resource(BUILTIN_MACROS)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "{}");
        assert!(loader.open_resource("missing.json").is_none());
    }
}
