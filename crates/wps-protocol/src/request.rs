//! WPS 1.0.0 KVP request parsing.
//!
//! Parameter names are matched case-insensitively as required by OWS
//! Common. `DataInputs` is a `;`-separated list of `identifier=value`
//! pairs where the value is everything after the first `=`, so URLs with
//! query strings survive intact.

use crate::errors::{WpsError, WpsResult};
use crate::WPS_VERSION;

/// Typed WPS request.
#[derive(Debug, Clone, PartialEq)]
pub enum WpsRequest {
    GetCapabilities(GetCapabilitiesRequest),
    DescribeProcess(DescribeProcessRequest),
    Execute(ExecuteRequest),
}

impl WpsRequest {
    /// Operation name, as used in logs and metrics.
    pub fn operation(&self) -> &'static str {
        match self {
            WpsRequest::GetCapabilities(_) => "GetCapabilities",
            WpsRequest::DescribeProcess(_) => "DescribeProcess",
            WpsRequest::Execute(_) => "Execute",
        }
    }
}

/// GetCapabilities request parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetCapabilitiesRequest {
    pub accept_versions: Option<Vec<String>>,
}

/// DescribeProcess request parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DescribeProcessRequest {
    /// Requested process identifiers; `all` selects every process.
    pub identifiers: Vec<String>,
}

impl DescribeProcessRequest {
    /// Whether every registered process was requested.
    pub fn is_all(&self) -> bool {
        self.identifiers.iter().any(|id| id.eq_ignore_ascii_case("all"))
    }
}

/// One `identifier=value` pair from `DataInputs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataInput {
    pub identifier: String,
    pub value: String,
}

/// Execute request parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteRequest {
    /// Process identifier.
    pub identifier: String,

    /// Inputs in request order; an identifier may repeat.
    pub inputs: Vec<DataInput>,

    /// Store the response document and return a status location.
    pub store_execute_response: bool,

    /// Run asynchronously and keep the stored document updated.
    pub status: bool,
}

impl ExecuteRequest {
    /// All values supplied for an input, in request order.
    pub fn values(&self, identifier: &str) -> Vec<&str> {
        self.inputs
            .iter()
            .filter(|i| i.identifier == identifier)
            .map(|i| i.value.as_str())
            .collect()
    }

    /// Whether the request supplies the input at all.
    pub fn has_input(&self, identifier: &str) -> bool {
        self.inputs.iter().any(|i| i.identifier == identifier)
    }
}

/// Raw KVP parameters of a WPS GET request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WpsKvpParams {
    pub service: Option<String>,
    pub request: Option<String>,
    pub version: Option<String>,
    pub accept_versions: Option<String>,
    pub identifier: Option<String>,
    pub data_inputs: Option<String>,
    pub store_execute_response: Option<String>,
    pub status: Option<String>,
}

impl WpsKvpParams {
    /// Collect parameters from decoded query pairs, ignoring unknown keys.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref().to_ascii_lowercase().as_str() {
                "service" => &mut params.service,
                "request" => &mut params.request,
                "version" => &mut params.version,
                "acceptversions" => &mut params.accept_versions,
                "identifier" => &mut params.identifier,
                "datainputs" => &mut params.data_inputs,
                "storeexecuteresponse" => &mut params.store_execute_response,
                "status" => &mut params.status,
                _ => continue,
            };
            *slot = Some(value.into());
        }
        params
    }

    /// Parse into a typed request.
    pub fn into_request(self) -> WpsResult<WpsRequest> {
        match self.service.as_deref() {
            Some(s) if s.eq_ignore_ascii_case("WPS") => {}
            Some(_) => {
                return Err(WpsError::InvalidParameter {
                    param: "service".to_string(),
                    message: "service must be WPS".to_string(),
                })
            }
            None => return Err(WpsError::MissingParameter("service".to_string())),
        }

        let request = self
            .request
            .as_deref()
            .ok_or_else(|| WpsError::MissingParameter("request".to_string()))?;

        if request.eq_ignore_ascii_case("GetCapabilities") {
            let accept_versions = self
                .accept_versions
                .map(|v| split_list(&v));
            if let Some(ref versions) = accept_versions {
                if !versions.iter().any(|v| v == WPS_VERSION) {
                    return Err(WpsError::VersionNegotiationFailed(versions.join(",")));
                }
            }
            return Ok(WpsRequest::GetCapabilities(GetCapabilitiesRequest {
                accept_versions,
            }));
        }

        if request.eq_ignore_ascii_case("DescribeProcess") {
            self.check_version()?;
            let identifiers = self
                .identifier
                .as_deref()
                .map(split_list)
                .filter(|ids| !ids.is_empty())
                .ok_or_else(|| WpsError::MissingParameter("identifier".to_string()))?;
            return Ok(WpsRequest::DescribeProcess(DescribeProcessRequest { identifiers }));
        }

        if request.eq_ignore_ascii_case("Execute") {
            self.check_version()?;
            let identifier = self
                .identifier
                .clone()
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| WpsError::MissingParameter("identifier".to_string()))?;
            let inputs = match self.data_inputs.as_deref() {
                Some(raw) => parse_data_inputs(raw)?,
                None => Vec::new(),
            };
            let store_execute_response =
                parse_bool("storeExecuteResponse", self.store_execute_response.as_deref())?;
            let status = parse_bool("status", self.status.as_deref())?;
            if status && !store_execute_response {
                return Err(WpsError::InvalidParameter {
                    param: "status".to_string(),
                    message: "status=true requires storeExecuteResponse=true".to_string(),
                });
            }
            return Ok(WpsRequest::Execute(ExecuteRequest {
                identifier,
                inputs,
                store_execute_response,
                status,
            }));
        }

        Err(WpsError::OperationNotSupported(request.to_string()))
    }

    fn check_version(&self) -> WpsResult<()> {
        match self.version.as_deref() {
            Some(v) if v != WPS_VERSION => Err(WpsError::VersionNegotiationFailed(v.to_string())),
            _ => Ok(()),
        }
    }
}

/// Parse a `DataInputs` value into ordered pairs.
pub fn parse_data_inputs(raw: &str) -> WpsResult<Vec<DataInput>> {
    raw.split(';')
        .filter(|segment| !segment.trim().is_empty())
        .map(|segment| {
            let (identifier, value) =
                segment
                    .split_once('=')
                    .ok_or_else(|| WpsError::InvalidParameter {
                        param: "DataInputs".to_string(),
                        message: format!("expected identifier=value, got '{}'", segment),
                    })?;
            let identifier = identifier.trim();
            if identifier.is_empty() {
                return Err(WpsError::InvalidParameter {
                    param: "DataInputs".to_string(),
                    message: format!("missing identifier in '{}'", segment),
                });
            }
            Ok(DataInput {
                identifier: identifier.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(param: &str, raw: Option<&str>) -> WpsResult<bool> {
    match raw {
        None => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
        Some(v) => Err(WpsError::InvalidParameter {
            param: param.to_string(),
            message: format!("expected true or false, got '{}'", v),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn execute(pairs: &[(&str, &str)]) -> WpsResult<ExecuteRequest> {
        match WpsKvpParams::from_pairs(pairs.iter().copied()).into_request()? {
            WpsRequest::Execute(req) => Ok(req),
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn test_parse_execute_with_url_input() {
        let req = execute(&[
            ("service", "WPS"),
            ("request", "execute"),
            ("version", "1.0.0"),
            ("identifier", "subset_polygon"),
            (
                "DataInputs",
                "resource=http://x.x.x.x:8083/thredds/dodsC/birdhouse/pr_1hr_197901.nc;typename=usa:states;featureids=states.4",
            ),
        ])
        .unwrap();

        assert_eq!(req.identifier, "subset_polygon");
        assert_eq!(
            req.values("resource"),
            vec!["http://x.x.x.x:8083/thredds/dodsC/birdhouse/pr_1hr_197901.nc"]
        );
        assert_eq!(req.values("typename"), vec!["usa:states"]);
        assert!(!req.store_execute_response);
        assert!(!req.status);
    }

    #[test]
    fn test_value_keeps_everything_after_first_equals() {
        let inputs = parse_data_inputs("resource=http://host/data?file=a.nc&x=1").unwrap();
        assert_eq!(inputs[0].value, "http://host/data?file=a.nc&x=1");
    }

    #[test]
    fn test_repeated_inputs_keep_order() {
        let inputs = parse_data_inputs("resource=a.nc;resource=b.nc;").unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[1].value, "b.nc");
    }

    #[test]
    fn test_malformed_data_inputs() {
        let err = parse_data_inputs("resource").unwrap_err();
        assert!(matches!(err, WpsError::InvalidParameter { .. }));
        assert!(parse_data_inputs("=value").is_err());
    }

    #[test]
    fn test_case_insensitive_keys() {
        let req = execute(&[
            ("SERVICE", "wps"),
            ("Request", "Execute"),
            ("Identifier", "spatial_weighted_average"),
            ("storeExecuteResponse", "TRUE"),
            ("Status", "true"),
        ])
        .unwrap();

        assert!(req.store_execute_response);
        assert!(req.status);
        assert!(req.inputs.is_empty());
    }

    #[test]
    fn test_status_requires_store() {
        let err = execute(&[
            ("service", "WPS"),
            ("request", "Execute"),
            ("identifier", "subset_polygon"),
            ("status", "true"),
        ])
        .unwrap_err();
        assert_eq!(err.locator(), Some("status"));
    }

    #[test]
    fn test_missing_identifier() {
        let err = execute(&[("service", "WPS"), ("request", "Execute")]).unwrap_err();
        assert!(matches!(err, WpsError::MissingParameter(ref p) if p == "identifier"));
    }

    #[test]
    fn test_wrong_service_and_version() {
        let err = WpsKvpParams::from_pairs([("service", "WMS"), ("request", "GetCapabilities")])
            .into_request()
            .unwrap_err();
        assert!(matches!(err, WpsError::InvalidParameter { .. }));

        let err = WpsKvpParams::from_pairs([
            ("service", "WPS"),
            ("request", "DescribeProcess"),
            ("version", "2.0.0"),
            ("identifier", "all"),
        ])
        .into_request()
        .unwrap_err();
        assert!(matches!(err, WpsError::VersionNegotiationFailed(_)));
    }

    #[test]
    fn test_describe_process_identifiers() {
        let req = WpsKvpParams::from_pairs([
            ("service", "WPS"),
            ("request", "DescribeProcess"),
            ("identifier", "subset_polygon, spatial_weighted_average"),
        ])
        .into_request()
        .unwrap();

        let WpsRequest::DescribeProcess(describe) = req else {
            panic!("expected DescribeProcess");
        };
        assert_eq!(describe.identifiers, vec!["subset_polygon", "spatial_weighted_average"]);
        assert!(!describe.is_all());
    }

    #[test]
    fn test_unknown_operation() {
        let err = WpsKvpParams::from_pairs([("service", "WPS"), ("request", "GetMap")])
            .into_request()
            .unwrap_err();
        assert!(matches!(err, WpsError::OperationNotSupported(_)));
        assert_eq!(err.status_code(), 501);
    }
}
