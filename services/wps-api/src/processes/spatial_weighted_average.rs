//! Spatial weighted average over a polygon.

use async_trait::async_trait;
use tracing::info;
use wps_protocol::{ExecuteRequest, Format, LiteralInputDescription, ProcessDescription};

use super::inputs::first_value;
use super::{ensure_parent, netcdf_output, Process, ProcessEnv, OUTPUT_NETCDF};
use crate::compute::Operation;
use crate::context::RequestContext;
use crate::error::ProcessResult;
use crate::geometry::split_feature_ids;
use crate::outputs::{output_file_name, ProcessOutputs};

pub const IDENTIFIER: &str = "spatial_weighted_average";

/// Output file suffix.
pub const SUFFIX: &str = "_spatial_weighted_average.nc";

/// Subdirectory of the output root the averages are written to.
pub const OUTPUT_SUBDIR: &str = "pavics-ncops";

pub struct SpatialWeightedAverage {
    description: ProcessDescription,
}

impl SpatialWeightedAverage {
    pub fn new() -> Self {
        Self {
            description: ProcessDescription {
                identifier: IDENTIFIER.to_string(),
                title: "Spatial Weighted Average".to_string(),
                abstract_text: Some("Pending.".to_string()),
                version: "0.1".to_string(),
                inputs: vec![
                    LiteralInputDescription::string("resource", "Resource"),
                    LiteralInputDescription::string("typename", "TypeName"),
                    LiteralInputDescription::string("featureids", "Feature Ids"),
                ],
                outputs: vec![netcdf_output()],
                store_supported: true,
                status_supported: true,
            },
        }
    }
}

impl Default for SpatialWeightedAverage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Process for SpatialWeightedAverage {
    fn description(&self) -> &ProcessDescription {
        &self.description
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        request: &ExecuteRequest,
        env: &ProcessEnv,
    ) -> ProcessResult<ProcessOutputs> {
        let resource = first_value(request, &self.description, "resource")?;
        let typename = first_value(request, &self.description, "typename")?;
        let feature_ids = split_feature_ids(&first_value(request, &self.description, "featureids")?);

        let geometry = env
            .features
            .fetch_geometry(ctx, &typename, &feature_ids)
            .await?;

        let out_file = env.outputs.path_for(
            ctx,
            Some(OUTPUT_SUBDIR),
            &output_file_name(&resource, SUFFIX),
        );
        ensure_parent(&out_file).await?;

        env.compute
            .run(ctx, Operation::SpatialWeightedAverage, &resource, &out_file, &geometry)
            .await?;

        info!(parent: &ctx.span, output = %out_file.display(), "Spatial weighted average ready");

        let mut outputs = ProcessOutputs::new();
        outputs.register(OUTPUT_NETCDF, out_file, Format::netcdf());
        Ok(outputs)
    }
}
