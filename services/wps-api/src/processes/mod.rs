//! Process registry and the collaborators processes run against.

pub mod inputs;
pub mod spatial_weighted_average;
pub mod subset_polygon;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use wps_protocol::{ComplexOutputDescription, ExecuteRequest, Format, ProcessDescription};

use crate::compute::GeoCompute;
use crate::context::RequestContext;
use crate::error::ProcessResult;
use crate::geometry::FeatureService;
use crate::materialize::ResourceMaterializer;
use crate::outputs::{OutputLocator, ProcessOutputs};

pub use spatial_weighted_average::SpatialWeightedAverage;
pub use subset_polygon::SubsetPolygon;

/// Identifier of the single output both processes produce.
pub const OUTPUT_NETCDF: &str = "output_netcdf";

/// External collaborators available to a process.
pub struct ProcessEnv {
    pub features: Arc<dyn FeatureService>,
    pub materializer: ResourceMaterializer,
    pub compute: Arc<dyn GeoCompute>,
    pub outputs: OutputLocator,
}

/// A process that can be executed through the WPS endpoint.
#[async_trait]
pub trait Process: Send + Sync {
    fn description(&self) -> &ProcessDescription;

    fn identifier(&self) -> &str {
        &self.description().identifier
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        request: &ExecuteRequest,
        env: &ProcessEnv,
    ) -> ProcessResult<ProcessOutputs>;
}

/// The NetCDF by-reference output declaration.
pub(crate) fn netcdf_output() -> ComplexOutputDescription {
    ComplexOutputDescription::by_reference(OUTPUT_NETCDF, "Output NetCDF", Format::netcdf())
}

/// Create the directory an output file is written into.
pub(crate) async fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) => tokio::fs::create_dir_all(parent).await,
        None => Ok(()),
    }
}

/// Registered processes, in offering order.
#[derive(Clone, Default)]
pub struct ProcessRegistry {
    processes: Vec<Arc<dyn Process>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every process this service offers.
    pub fn standard() -> Self {
        Self::new()
            .with(SpatialWeightedAverage::new())
            .with(SubsetPolygon::new())
    }

    pub fn with(mut self, process: impl Process + 'static) -> Self {
        self.processes.push(Arc::new(process));
        self
    }

    pub fn get(&self, identifier: &str) -> Option<Arc<dyn Process>> {
        self.processes
            .iter()
            .find(|p| p.identifier() == identifier)
            .cloned()
    }

    pub fn descriptions(&self) -> Vec<ProcessDescription> {
        self.processes
            .iter()
            .map(|p| p.description().clone())
            .collect()
    }

    pub fn identifiers(&self) -> Vec<&str> {
        self.processes.iter().map(|p| p.identifier()).collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use super::*;
    use crate::compute::Operation;
    use crate::download::{DownloadError, Downloader};
    use crate::error::ProcessError;
    use crate::geometry::{FeatureGeometry, Geometry};
    use crate::materialize::{DatasetProbe, OpenError};
    use crate::outputs::OutputNaming;

    #[derive(Default)]
    pub struct RecordingFeatures {
        pub calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl FeatureService for RecordingFeatures {
        async fn fetch_geometry(
            &self,
            _ctx: &RequestContext,
            typename: &str,
            feature_ids: &[String],
        ) -> ProcessResult<FeatureGeometry> {
            self.calls
                .lock()
                .unwrap()
                .push((typename.to_string(), feature_ids.to_vec()));
            Ok(FeatureGeometry {
                geometry: Geometry::Polygon {
                    coordinates: vec![vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 0.0]]],
                },
                crs: None,
                feature_ids: feature_ids.to_vec(),
            })
        }
    }

    #[derive(Default)]
    pub struct RecordingCompute {
        pub calls: Mutex<Vec<(Operation, String, PathBuf)>>,
    }

    #[async_trait]
    impl GeoCompute for RecordingCompute {
        async fn run(
            &self,
            _ctx: &RequestContext,
            operation: Operation,
            input: &str,
            output: &Path,
            _geometry: &FeatureGeometry,
        ) -> ProcessResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push((operation, input.to_string(), output.to_path_buf()));
            Ok(())
        }
    }

    /// Probe that only opens local paths.
    pub struct LocalOnlyProbe;

    #[async_trait]
    impl DatasetProbe for LocalOnlyProbe {
        async fn open(&self, resource: &str) -> Result<(), OpenError> {
            if resource.starts_with('/') {
                Ok(())
            } else {
                Err(OpenError::Failed("NetCDF: DAP failure".to_string()))
            }
        }
    }

    #[derive(Default)]
    pub struct RecordingDownloader {
        pub calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Downloader for RecordingDownloader {
        async fn download(&self, url: &str, _target: &Path) -> Result<u64, DownloadError> {
            self.calls.lock().unwrap().push(url.to_string());
            Ok(0)
        }
    }

    pub struct Fixture {
        pub features: Arc<RecordingFeatures>,
        pub compute: Arc<RecordingCompute>,
        pub downloader: Arc<RecordingDownloader>,
        pub env: ProcessEnv,
    }

    pub fn fixture(output_root: &Path, scratch: &Path) -> Fixture {
        let features = Arc::new(RecordingFeatures::default());
        let compute = Arc::new(RecordingCompute::default());
        let downloader = Arc::new(RecordingDownloader::default());
        let env = ProcessEnv {
            features: features.clone(),
            materializer: ResourceMaterializer::new(
                Arc::new(LocalOnlyProbe),
                downloader.clone(),
                scratch,
            ),
            compute: compute.clone(),
            outputs: OutputLocator::new(
                output_root,
                "http://localhost:8094/outputs",
                OutputNaming::Deterministic,
            ),
        };
        Fixture {
            features,
            compute,
            downloader,
            env,
        }
    }

    pub fn execute_request(identifier: &str, data_inputs: &str) -> ExecuteRequest {
        ExecuteRequest {
            identifier: identifier.to_string(),
            inputs: wps_protocol::request::parse_data_inputs(data_inputs).unwrap(),
            store_execute_response: false,
            status: false,
        }
    }

    pub fn missing(err: &ProcessError) -> Option<&str> {
        match err {
            ProcessError::MissingInput(name) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry() {
        let registry = ProcessRegistry::standard();

        assert_eq!(
            registry.identifiers(),
            vec!["spatial_weighted_average", "subset_polygon"]
        );
        assert!(registry.get("subset_polygon").is_some());
        assert!(registry.get("getpoint").is_none());
    }

    #[test]
    fn test_descriptions_declare_netcdf_output() {
        for description in ProcessRegistry::standard().descriptions() {
            let output = description.output(OUTPUT_NETCDF).unwrap();
            assert!(output.as_reference);
            assert_eq!(output.default_format().unwrap(), &Format::netcdf());
            assert!(description.store_supported);
            assert!(description.status_supported);
            assert_eq!(description.inputs.len(), 3);
        }
    }
}
