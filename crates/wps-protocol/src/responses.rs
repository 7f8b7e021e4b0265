//! WPS 1.0.0 response documents.
//!
//! Documents are assembled with `format!` the same way the capabilities
//! builders of the other OGC services are; every interpolated value goes
//! through XML escaping.

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;

use crate::errors::{exception_element, ExceptionCode};
use crate::namespaces;
use crate::process::ProcessDescription;
use crate::WPS_VERSION;

fn root_attributes(service_url: &str) -> String {
    format!(
        r#"xmlns:wps="{wps}" xmlns:ows="{ows}" xmlns:xlink="{xlink}" xmlns:xsi="{xsi}" service="WPS" version="{version}" xml:lang="en-US" serviceInstance="{url}""#,
        wps = namespaces::WPS,
        ows = namespaces::OWS,
        xlink = namespaces::XLINK,
        xsi = namespaces::XSI,
        version = WPS_VERSION,
        url = escape(service_url),
    )
}

/// GetCapabilities response.
#[derive(Debug, Clone)]
pub struct CapabilitiesDocument {
    pub title: String,
    pub abstract_text: String,
    pub provider_name: String,
    /// Base URL of the KVP endpoint (e.g., "http://localhost:8094/wps").
    pub service_url: String,
    pub processes: Vec<ProcessDescription>,
}

impl CapabilitiesDocument {
    pub fn build(&self) -> String {
        let mut xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<wps:Capabilities {}>
  <ows:ServiceIdentification>
    <ows:Title>{}</ows:Title>
    <ows:Abstract>{}</ows:Abstract>
    <ows:ServiceType>WPS</ows:ServiceType>
    <ows:ServiceTypeVersion>{}</ows:ServiceTypeVersion>
  </ows:ServiceIdentification>
  <ows:ServiceProvider>
    <ows:ProviderName>{}</ows:ProviderName>
  </ows:ServiceProvider>
  <ows:OperationsMetadata>
"#,
            root_attributes(&self.service_url),
            escape(&self.title),
            escape(&self.abstract_text),
            WPS_VERSION,
            escape(&self.provider_name),
        );

        for operation in ["GetCapabilities", "DescribeProcess", "Execute"] {
            xml.push_str(&format!(
                r#"    <ows:Operation name="{}">
      <ows:DCP><ows:HTTP><ows:Get xlink:href="{}?"/></ows:HTTP></ows:DCP>
    </ows:Operation>
"#,
                operation,
                escape(&self.service_url)
            ));
        }

        xml.push_str("  </ows:OperationsMetadata>\n  <wps:ProcessOfferings>\n");
        for process in &self.processes {
            xml.push_str("    ");
            xml.push_str(&process.brief_xml());
            xml.push('\n');
        }
        xml.push_str(
            r#"  </wps:ProcessOfferings>
  <wps:Languages>
    <wps:Default><ows:Language>en-US</ows:Language></wps:Default>
    <wps:Supported><ows:Language>en-US</ows:Language></wps:Supported>
  </wps:Languages>
</wps:Capabilities>"#,
        );
        xml
    }
}

/// DescribeProcess response.
#[derive(Debug, Clone)]
pub struct ProcessDescriptionsDocument {
    pub descriptions: Vec<ProcessDescription>,
}

impl ProcessDescriptionsDocument {
    pub fn build(&self) -> String {
        let mut xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<wps:ProcessDescriptions xmlns:wps="{}" xmlns:ows="{}" xmlns:xsi="{}" service="WPS" version="{}" xml:lang="en-US">
"#,
            namespaces::WPS,
            namespaces::OWS,
            namespaces::XSI,
            WPS_VERSION
        );
        for description in &self.descriptions {
            xml.push_str(&description.description_xml());
        }
        xml.push_str("</wps:ProcessDescriptions>");
        xml
    }
}

/// Execution state reported in an ExecuteResponse.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionStatus {
    Accepted,
    Succeeded,
    Failed { code: ExceptionCode, message: String },
}

impl ExecutionStatus {
    /// Failed status with an OWS exception code.
    pub fn failed(code: ExceptionCode, message: impl Into<String>) -> Self {
        ExecutionStatus::Failed {
            code,
            message: message.into(),
        }
    }

    fn to_xml(&self) -> String {
        match self {
            ExecutionStatus::Accepted => {
                "<wps:ProcessAccepted>Process accepted</wps:ProcessAccepted>".to_string()
            }
            ExecutionStatus::Succeeded => {
                "<wps:ProcessSucceeded>Process succeeded</wps:ProcessSucceeded>".to_string()
            }
            ExecutionStatus::Failed { code, message } => {
                format!(
                    "<wps:ProcessFailed>\n      <wps:ExceptionReport>\n  {}\n      </wps:ExceptionReport>\n    </wps:ProcessFailed>",
                    exception_element(*code, None, message)
                )
            }
        }
    }
}

/// A process output returned by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputReference {
    pub identifier: String,
    pub title: String,
    /// Public URL of the produced file.
    pub href: String,
    pub mime_type: String,
}

/// Execute response document.
#[derive(Debug, Clone)]
pub struct ExecuteResponse {
    pub service_url: String,
    pub process: ProcessDescription,
    pub status: ExecutionStatus,
    pub creation_time: DateTime<Utc>,
    /// Where the stored document can be polled, for stored executions.
    pub status_location: Option<String>,
    pub outputs: Vec<OutputReference>,
}

impl ExecuteResponse {
    /// Create a response for a process in the given state.
    pub fn new(
        service_url: impl Into<String>,
        process: ProcessDescription,
        status: ExecutionStatus,
    ) -> Self {
        Self {
            service_url: service_url.into(),
            process,
            status,
            creation_time: Utc::now(),
            status_location: None,
            outputs: Vec::new(),
        }
    }

    /// Set the status location.
    pub fn with_status_location(mut self, location: impl Into<String>) -> Self {
        self.status_location = Some(location.into());
        self
    }

    /// Add an output reference.
    pub fn with_output(mut self, output: OutputReference) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn build(&self) -> String {
        let status_location = self
            .status_location
            .as_ref()
            .map(|l| format!(r#" statusLocation="{}""#, escape(l)))
            .unwrap_or_default();

        let mut xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<wps:ExecuteResponse {}{}>
  {}
  <wps:Status creationTime="{}">
    {}
  </wps:Status>
"#,
            root_attributes(&self.service_url),
            status_location,
            self.process.brief_xml(),
            self.creation_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.status.to_xml(),
        );

        if !self.outputs.is_empty() {
            xml.push_str("  <wps:ProcessOutputs>\n");
            for output in &self.outputs {
                xml.push_str(&format!(
                    r#"    <wps:Output>
      <ows:Identifier>{}</ows:Identifier>
      <ows:Title>{}</ows:Title>
      <wps:Reference href="{}" mimeType="{}"/>
    </wps:Output>
"#,
                    escape(&output.identifier),
                    escape(&output.title),
                    escape(&output.href),
                    escape(&output.mime_type)
                ));
            }
            xml.push_str("  </wps:ProcessOutputs>\n");
        }

        xml.push_str("</wps:ExecuteResponse>");
        xml
    }
}
