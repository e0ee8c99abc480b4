//! Plain GET whose payload is stored under a configurable property.

use crate::batch::{BatchUnit, HttpStep, Step};
use crate::parameters::{ItemParameters, ParameterDecl, ParameterSet};
use flowunit_http_tools::{HttpToolsError, RequestTemplate};
use reqwest::Method;

const DEFAULT_PROPERTY: &str = "apiResponse";

pub struct Fetch {
    params: ParameterSet,
}

impl Fetch {
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: ParameterSet::new(vec![
                ParameterDecl::endpoint("apiUrl", ""),
                ParameterDecl::string("responseProperty", DEFAULT_PROPERTY),
            ]),
        }
    }
}

impl Default for Fetch {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchUnit for Fetch {
    fn name(&self) -> &'static str {
        "fetch"
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn prepare(&self, item: &ItemParameters<'_>) -> Result<Step, HttpToolsError> {
        let url = item.string("apiUrl")?;
        let property = item.string("responseProperty")?;
        let property = match property.trim() {
            "" => DEFAULT_PROPERTY.to_string(),
            p => p.to_string(),
        };

        let request = RequestTemplate::new(Method::GET, url).resolve(&Default::default())?;
        Ok(Step::Http(
            HttpStep::new(request).without_summary().store_as(property),
        ))
    }
}
