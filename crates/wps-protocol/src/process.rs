//! Process descriptions: what a process accepts and what it returns.

use quick_xml::escape::escape;

use crate::media_types;

/// A data format a complex output can be produced in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    /// MIME type (e.g., "application/x-netcdf").
    pub mime_type: String,

    /// Character encoding, if any.
    pub encoding: Option<String>,

    /// Schema URI, if any.
    pub schema: Option<String>,
}

impl Format {
    /// Create a format from a MIME type.
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            encoding: None,
            schema: None,
        }
    }

    /// The NetCDF format.
    pub fn netcdf() -> Self {
        Self::new(media_types::NETCDF)
    }

    fn to_xml(&self) -> String {
        let mut xml = format!("<MimeType>{}</MimeType>", escape(&self.mime_type));
        if let Some(ref encoding) = self.encoding {
            xml.push_str(&format!("<Encoding>{}</Encoding>", escape(encoding)));
        }
        if let Some(ref schema) = self.schema {
            xml.push_str(&format!("<Schema>{}</Schema>", escape(schema)));
        }
        xml
    }
}

/// Declaration of a literal (string-valued) process input.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralInputDescription {
    pub identifier: String,
    pub title: String,
    pub abstract_text: Option<String>,
    /// XML schema data type name (e.g., "string").
    pub data_type: String,
    pub min_occurs: u32,
    pub max_occurs: u32,
    /// Value substituted when the input is absent from a request.
    pub default: Option<String>,
}

impl LiteralInputDescription {
    /// Declare an optional string input occurring at most once.
    pub fn string(identifier: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            abstract_text: None,
            data_type: "string".to_string(),
            min_occurs: 0,
            max_occurs: 1,
            default: None,
        }
    }

    /// Set the abstract.
    pub fn with_abstract(mut self, abstract_text: impl Into<String>) -> Self {
        self.abstract_text = Some(abstract_text.into());
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    fn to_xml(&self) -> String {
        let mut xml = format!(
            r#"      <Input minOccurs="{}" maxOccurs="{}">
        <ows:Identifier>{}</ows:Identifier>
        <ows:Title>{}</ows:Title>
"#,
            self.min_occurs,
            self.max_occurs,
            escape(&self.identifier),
            escape(&self.title)
        );
        if let Some(ref abstract_text) = self.abstract_text {
            xml.push_str(&format!(
                "        <ows:Abstract>{}</ows:Abstract>\n",
                escape(abstract_text)
            ));
        }
        xml.push_str(&format!(
            r#"        <LiteralData>
          <ows:DataType ows:reference="http://www.w3.org/TR/xmlschema-2/#{0}">{0}</ows:DataType>
          <ows:AnyValue/>
"#,
            escape(&self.data_type)
        ));
        if let Some(ref default) = self.default {
            xml.push_str(&format!(
                "          <DefaultValue>{}</DefaultValue>\n",
                escape(default)
            ));
        }
        xml.push_str("        </LiteralData>\n      </Input>\n");
        xml
    }
}

/// Declaration of a complex (file-valued) process output.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexOutputDescription {
    pub identifier: String,
    pub title: String,
    pub supported_formats: Vec<Format>,
    /// Whether the output is returned as a link instead of inline content.
    pub as_reference: bool,
}

impl ComplexOutputDescription {
    /// Declare an output returned by reference.
    pub fn by_reference(
        identifier: impl Into<String>,
        title: impl Into<String>,
        format: Format,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            supported_formats: vec![format],
            as_reference: true,
        }
    }

    /// The default format (first supported one).
    pub fn default_format(&self) -> Option<&Format> {
        self.supported_formats.first()
    }

    fn to_xml(&self) -> String {
        let mut xml = format!(
            r#"      <Output>
        <ows:Identifier>{}</ows:Identifier>
        <ows:Title>{}</ows:Title>
        <ComplexOutput>
"#,
            escape(&self.identifier),
            escape(&self.title)
        );
        if let Some(default) = self.default_format() {
            xml.push_str(&format!(
                "          <Default><Format>{}</Format></Default>\n",
                default.to_xml()
            ));
        }
        xml.push_str("          <Supported>\n");
        for format in &self.supported_formats {
            xml.push_str(&format!(
                "            <Format>{}</Format>\n",
                format.to_xml()
            ));
        }
        xml.push_str("          </Supported>\n        </ComplexOutput>\n      </Output>\n");
        xml
    }
}

/// Full description of a process, as returned by DescribeProcess.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessDescription {
    pub identifier: String,
    pub title: String,
    pub abstract_text: Option<String>,
    pub version: String,
    pub inputs: Vec<LiteralInputDescription>,
    pub outputs: Vec<ComplexOutputDescription>,
    pub store_supported: bool,
    pub status_supported: bool,
}

impl ProcessDescription {
    /// Look up a declared input.
    pub fn input(&self, identifier: &str) -> Option<&LiteralInputDescription> {
        self.inputs.iter().find(|i| i.identifier == identifier)
    }

    /// Look up a declared output.
    pub fn output(&self, identifier: &str) -> Option<&ComplexOutputDescription> {
        self.outputs.iter().find(|o| o.identifier == identifier)
    }

    /// The `<wps:Process>` element used in Capabilities and ExecuteResponse.
    pub(crate) fn brief_xml(&self) -> String {
        let mut xml = format!(
            r#"<wps:Process wps:processVersion="{}">
      <ows:Identifier>{}</ows:Identifier>
      <ows:Title>{}</ows:Title>
"#,
            escape(&self.version),
            escape(&self.identifier),
            escape(&self.title)
        );
        if let Some(ref abstract_text) = self.abstract_text {
            xml.push_str(&format!(
                "      <ows:Abstract>{}</ows:Abstract>\n",
                escape(abstract_text)
            ));
        }
        xml.push_str("    </wps:Process>");
        xml
    }

    /// The `<ProcessDescription>` element used in DescribeProcess.
    pub(crate) fn description_xml(&self) -> String {
        let mut xml = format!(
            r#"  <ProcessDescription wps:processVersion="{}" storeSupported="{}" statusSupported="{}">
    <ows:Identifier>{}</ows:Identifier>
    <ows:Title>{}</ows:Title>
"#,
            escape(&self.version),
            self.store_supported,
            self.status_supported,
            escape(&self.identifier),
            escape(&self.title)
        );
        if let Some(ref abstract_text) = self.abstract_text {
            xml.push_str(&format!(
                "    <ows:Abstract>{}</ows:Abstract>\n",
                escape(abstract_text)
            ));
        }
        xml.push_str("    <DataInputs>\n");
        for input in &self.inputs {
            xml.push_str(&input.to_xml());
        }
        xml.push_str("    </DataInputs>\n    <ProcessOutputs>\n");
        for output in &self.outputs {
            xml.push_str(&output.to_xml());
        }
        xml.push_str("    </ProcessOutputs>\n  </ProcessDescription>\n");
        xml
    }
}
