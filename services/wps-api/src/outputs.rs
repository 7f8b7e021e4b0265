//! Output naming and registration.
//!
//! Output files live on shared storage under the configured output root and
//! are returned by reference. With the deterministic policy the file name is
//! derived from the input basename only, so two executions on inputs with
//! the same basename write to the same file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wps_protocol::Format;

use crate::context::RequestContext;

/// Number of trailing characters stripped from the input basename.
const EXTENSION_LEN: usize = 3;

/// Last `/`-separated segment of a resource path or URL.
pub fn resource_basename(resource: &str) -> &str {
    resource.rsplit('/').next().unwrap_or(resource)
}

/// Input basename without its trailing three characters (the `.nc`).
pub fn output_stem(resource: &str) -> String {
    let basename = resource_basename(resource);
    let keep = basename.chars().count().saturating_sub(EXTENSION_LEN);
    basename.chars().take(keep).collect()
}

/// Output file name for a resource and a per-process suffix.
pub fn output_file_name(resource: &str, suffix: &str) -> String {
    format!("{}{}", output_stem(resource), suffix)
}

/// How output paths are made unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputNaming {
    /// `{root}/{subdir}/{name}`; concurrent executions may collide.
    #[default]
    Deterministic,
    /// `{root}/{subdir}/{request_id}/{name}`.
    RequestScoped,
}

/// Resolves output paths and their public URLs.
#[derive(Debug, Clone)]
pub struct OutputLocator {
    root: PathBuf,
    public_url: String,
    naming: OutputNaming,
}

impl OutputLocator {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>, naming: OutputNaming) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
            naming,
        }
    }

    /// Path an execution writes `file_name` to, under an optional subdirectory.
    pub fn path_for(&self, ctx: &RequestContext, subdir: Option<&str>, file_name: &str) -> PathBuf {
        let mut path = self.root.clone();
        if let Some(subdir) = subdir {
            path.push(subdir);
        }
        if self.naming == OutputNaming::RequestScoped {
            path.push(ctx.request_id.to_string());
        }
        path.push(file_name);
        path
    }

    /// Public URL of a file under the output root.
    ///
    /// Files outside the root are returned as `file://` URLs.
    pub fn public_url(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(relative) => {
                let segments: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                format!("{}/{}", self.public_url, segments.join("/"))
            }
            Err(_) => format!("file://{}", path.display()),
        }
    }

    /// Directory holding stored execute responses.
    pub fn status_dir(&self) -> PathBuf {
        self.root.join("status")
    }

    /// File and URL of the stored execute response for an execution.
    pub fn status_document(&self, ctx: &RequestContext) -> (PathBuf, String) {
        let path = self.status_dir().join(format!("{}.xml", ctx.request_id));
        let url = self.public_url(&path);
        (path, url)
    }
}

/// A file produced by a process.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub format: Format,
}

/// Output slots filled by a process execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessOutputs {
    slots: BTreeMap<String, OutputFile>,
}

impl ProcessOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a file to a named output slot, replacing any previous file.
    pub fn register(&mut self, identifier: impl Into<String>, path: impl Into<PathBuf>, format: Format) {
        self.slots.insert(
            identifier.into(),
            OutputFile {
                path: path.into(),
                format,
            },
        );
    }

    pub fn get(&self, identifier: &str) -> Option<&OutputFile> {
        self.slots.get(identifier)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OutputFile)> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basename() {
        assert_eq!(resource_basename("https://host/data/foo.nc"), "foo.nc");
        assert_eq!(resource_basename("/tmp/foo.nc"), "foo.nc");
        assert_eq!(resource_basename("foo.nc"), "foo.nc");
        assert_eq!(resource_basename("https://host/data/"), "");
    }

    #[test]
    fn test_output_file_names() {
        assert_eq!(
            output_file_name("https://host/data/foo.nc", "_subset_polygon_.nc"),
            "foo_subset_polygon_.nc"
        );
        assert_eq!(
            output_file_name("https://host/data/foo.nc", "_spatial_weighted_average.nc"),
            "foo_spatial_weighted_average.nc"
        );
    }

    #[test]
    fn test_stem_strips_three_chars_regardless_of_extension() {
        assert_eq!(output_stem("data.nc4"), "data.");
        assert_eq!(output_stem("ab"), "");
        assert_eq!(output_stem("é.nc"), "é");
    }

    #[test]
    fn test_deterministic_paths() {
        let locator = OutputLocator::new("/data/out", "http://localhost:8094/outputs/", OutputNaming::Deterministic);
        let a = RequestContext::new("spatial_weighted_average");
        let b = RequestContext::new("spatial_weighted_average");

        let path = locator.path_for(&a, Some("pavics-ncops"), "foo_spatial_weighted_average.nc");
        assert_eq!(path, PathBuf::from("/data/out/pavics-ncops/foo_spatial_weighted_average.nc"));
        assert_eq!(path, locator.path_for(&b, Some("pavics-ncops"), "foo_spatial_weighted_average.nc"));
        assert_eq!(
            locator.public_url(&path),
            "http://localhost:8094/outputs/pavics-ncops/foo_spatial_weighted_average.nc"
        );
    }

    #[test]
    fn test_request_scoped_paths() {
        let locator = OutputLocator::new("/data/out", "http://localhost:8094/outputs", OutputNaming::RequestScoped);
        let ctx = RequestContext::new("subset_polygon");

        let path = locator.path_for(&ctx, None, "foo_subset_polygon_.nc");
        assert_eq!(
            path,
            PathBuf::from(format!("/data/out/{}/foo_subset_polygon_.nc", ctx.request_id))
        );
    }

    #[test]
    fn test_public_url_outside_root() {
        let locator = OutputLocator::new("/data/out", "http://localhost:8094/outputs", OutputNaming::Deterministic);
        assert_eq!(locator.public_url(Path::new("/opt/foo.nc")), "file:///opt/foo.nc");
    }

    #[test]
    fn test_status_document_location() {
        let locator = OutputLocator::new("/data/out", "http://localhost:8094/outputs", OutputNaming::Deterministic);
        let ctx = RequestContext::new("subset_polygon");

        let (path, url) = locator.status_document(&ctx);
        assert_eq!(path, PathBuf::from(format!("/data/out/status/{}.xml", ctx.request_id)));
        assert_eq!(url, format!("http://localhost:8094/outputs/status/{}.xml", ctx.request_id));
    }

    #[test]
    fn test_register_output() {
        let mut outputs = ProcessOutputs::new();
        assert!(outputs.is_empty());

        outputs.register("output_netcdf", "/data/out/foo_subset_polygon_.nc", Format::netcdf());
        outputs.register("output_netcdf", "/data/out/bar_subset_polygon_.nc", Format::netcdf());

        assert_eq!(outputs.len(), 1);
        let file = outputs.get("output_netcdf").unwrap();
        assert_eq!(file.path, PathBuf::from("/data/out/bar_subset_polygon_.nc"));
        assert_eq!(file.format.mime_type, "application/x-netcdf");
    }
}
