//! Geospatial computation backend.
//!
//! The averaging and subsetting algorithms live outside this service. The
//! shipped backend runs an external program once per execution:
//!
//! ```text
//! <command...> <operation> --input <input> --output <output> --geometry <geojson-file>
//! ```
//!
//! The geometry is written to a temporary GeoJSON file that is removed when
//! the call returns.

use std::io::Write;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::context::RequestContext;
use crate::error::{ProcessError, ProcessResult};
use crate::geometry::FeatureGeometry;

/// Operations offered by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SpatialWeightedAverage,
    SubsetPolygon,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::SpatialWeightedAverage => "spatial_weighted_average",
            Operation::SubsetPolygon => "subset_polygon",
        }
    }
}

/// Produces a NetCDF file at `output` from `input` restricted to a geometry.
#[async_trait]
pub trait GeoCompute: Send + Sync {
    async fn run(
        &self,
        ctx: &RequestContext,
        operation: Operation,
        input: &str,
        output: &Path,
        geometry: &FeatureGeometry,
    ) -> ProcessResult<()>;
}

/// Backend that shells out to an external program.
pub struct CommandCompute {
    program: String,
    args: Vec<String>,
}

impl CommandCompute {
    /// Build from a command line; the first element is the program.
    pub fn new(command: &[String]) -> anyhow::Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| anyhow::anyhow!("compute command must not be empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Write the geometry to a temporary GeoJSON file on the blocking pool.
    async fn write_geometry(geometry: &FeatureGeometry) -> ProcessResult<tempfile::NamedTempFile> {
        let body = serde_json::to_vec(&geometry.to_geojson())
            .map_err(|e| ProcessError::Compute(format!("failed to encode geometry: {}", e)))?;

        let written = tokio::task::spawn_blocking(move || -> std::io::Result<_> {
            let mut file = tempfile::Builder::new()
                .prefix("geometry-")
                .suffix(".geojson")
                .tempfile()?;
            file.write_all(&body)?;
            file.flush()?;
            Ok(file)
        })
        .await
        .map_err(|e| ProcessError::Compute(format!("geometry writer failed: {}", e)))?;

        Ok(written?)
    }
}

#[async_trait]
impl GeoCompute for CommandCompute {
    async fn run(
        &self,
        ctx: &RequestContext,
        operation: Operation,
        input: &str,
        output: &Path,
        geometry: &FeatureGeometry,
    ) -> ProcessResult<()> {
        let geometry_file = Self::write_geometry(geometry).await?;

        debug!(
            parent: &ctx.span,
            program = %self.program,
            operation = operation.as_str(),
            geometry = %geometry_file.path().display(),
            "Running compute backend"
        );

        let result = Command::new(&self.program)
            .args(&self.args)
            .arg(operation.as_str())
            .arg("--input")
            .arg(input)
            .arg("--output")
            .arg(output)
            .arg("--geometry")
            .arg(geometry_file.path())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ProcessError::Compute(format!("failed to run {}: {}", self.program, e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ProcessError::Compute(format!(
                "{} {} exited with {}: {}",
                self.program,
                operation.as_str(),
                result.status,
                stderr.trim()
            )));
        }

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(ProcessError::Compute(format!(
                "{} produced no file at {}",
                operation.as_str(),
                output.display()
            )));
        }

        info!(
            parent: &ctx.span,
            operation = operation.as_str(),
            output = %output.display(),
            "Computation finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;

    fn geometry() -> FeatureGeometry {
        FeatureGeometry {
            geometry: Geometry::Polygon {
                coordinates: vec![vec![
                    vec![0.0, 0.0],
                    vec![1.0, 0.0],
                    vec![1.0, 1.0],
                    vec![0.0, 0.0],
                ]],
            },
            crs: None,
            feature_ids: vec!["states.4".to_string()],
        }
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(CommandCompute::new(&[]).is_err());
    }

    #[tokio::test]
    async fn test_geometry_file_contents() {
        let file = CommandCompute::write_geometry(&geometry()).await.unwrap();
        let body = std::fs::read_to_string(file.path()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(doc["geometry"]["type"], "Polygon");
        assert!(file.path().to_string_lossy().ends_with(".geojson"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_backend_reports_stderr() {
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo 'no such variable' >&2; exit 3".to_string(),
            "backend".to_string(),
        ];
        let compute = CommandCompute::new(&command).unwrap();
        let ctx = RequestContext::new("subset_polygon");
        let dir = tempfile::tempdir().unwrap();

        let err = compute
            .run(
                &ctx,
                Operation::SubsetPolygon,
                "/tmp/in.nc",
                &dir.path().join("out.nc"),
                &geometry(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::Compute(ref m) if m.contains("no such variable")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_backend_must_produce_output() {
        let command = vec!["true".to_string()];
        let compute = CommandCompute::new(&command).unwrap();
        let ctx = RequestContext::new("subset_polygon");
        let dir = tempfile::tempdir().unwrap();

        let err = compute
            .run(
                &ctx,
                Operation::SpatialWeightedAverage,
                "/tmp/in.nc",
                &dir.path().join("out.nc"),
                &geometry(),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("produced no file"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_backend_writes_output() {
        // `sh -c script name op --input in --output out ...` puts out at $5
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            "touch \"$5\"".to_string(),
            "backend".to_string(),
        ];
        let compute = CommandCompute::new(&command).unwrap();
        let ctx = RequestContext::new("subset_polygon");
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.nc");

        compute
            .run(&ctx, Operation::SubsetPolygon, "/tmp/in.nc", &output, &geometry())
            .await
            .unwrap();

        assert!(output.exists());
    }
}
