//! Subset of a NetCDF dataset located inside a polygon.
//!
//! The computation backend needs a dataset it can open, so the resource is
//! materialized first: opened in place when possible, otherwise downloaded
//! once into scratch storage.

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

pub const IDENTIFIER: &str = "subset_polygon";

/// Output file suffix.
pub const SUFFIX: &str = "_subset_polygon_.nc";

pub struct SubsetPolygon {
    description: ProcessDescription,
}

impl SubsetPolygon {
    pub fn new() -> Self {
        Self {
            description: ProcessDescription {
                identifier: IDENTIFIER.to_string(),
                title: "Subset polygon".to_string(),
                abstract_text: Some("Pending.".to_string()),
                version: "0.1".to_string(),
                inputs: vec![
                    LiteralInputDescription::string("resource", "Resource")
                        .with_abstract("URL to netCDF file."),
                    LiteralInputDescription::string("typename", "TypeName")
                        .with_abstract("The feature collection."),
                    LiteralInputDescription::string("featureids", "Feature Ids")
                        .with_abstract("The feature IDs."),
                ],
                outputs: vec![netcdf_output()],
                store_supported: true,
                status_supported: true,
            },
        }
    }
}

impl Default for SubsetPolygon {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Process for SubsetPolygon {
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
        let materialized = env.materializer.materialize(ctx, &resource).await?;
        let input = materialized.location();

        let typename = first_value(request, &self.description, "typename")?;
        let feature_ids = split_feature_ids(&first_value(request, &self.description, "featureids")?);

        let geometry = env
            .features
            .fetch_geometry(ctx, &typename, &feature_ids)
            .await?;

        let out_file = env
            .outputs
            .path_for(ctx, None, &output_file_name(&input, SUFFIX));
        ensure_parent(&out_file).await?;

        env.compute
            .run(ctx, Operation::SubsetPolygon, &input, &out_file, &geometry)
            .await?;

        info!(
            parent: &ctx.span,
            output = %out_file.display(),
            downloaded = materialized.was_downloaded(),
            "Polygon subset ready"
        );

        let mut outputs = ProcessOutputs::new();
        outputs.register(OUTPUT_NETCDF, out_file, Format::netcdf());
        Ok(outputs)
    }
}
