use serde_json::Value;

use super::for_each_schema_mut;
use crate::parse::document::OpenApiDocument;
use crate::parse::parameter::{Parameter, ParameterOrRef};
use crate::parse::response::ResponseOrRef;

/// Header serialization style OpenAPI assumes when `style` is omitted.
const HEADER_STYLE: &str = "simple";

/// Drop `style` and `explode` from parameters and response headers when they
/// spell out the OpenAPI defaults.
pub fn remove_default_parameter_values(doc: &mut OpenApiDocument) {
    if let Some(components) = doc.components.as_mut() {
        components.parameters.values_mut().for_each(strip_parameter);
        components.responses.values_mut().for_each(strip_response);
    }
    for item in doc.paths.values_mut() {
        item.parameters.iter_mut().for_each(strip_parameter);
        for operation in item.operations_mut() {
            operation.parameters.iter_mut().for_each(strip_parameter);
            operation.responses.values_mut().for_each(strip_response);
        }
    }
}

/// Remove `x-try-renaming-on` hints left behind by a skipped rename.
pub fn remove_transient_extensions(doc: &mut OpenApiDocument) {
    for_each_schema_mut(doc, &mut |schema| schema.extensions.rename_hint = None);
}

fn strip_parameter(parameter: &mut ParameterOrRef) {
    let ParameterOrRef::Parameter(parameter) = parameter else {
        return;
    };
    let Parameter {
        location,
        style,
        explode,
        ..
    } = parameter.as_mut();
    let default_style = location.default_style();
    let effective_style = style.as_deref().unwrap_or(default_style);
    if *explode == Some(effective_style == "form") {
        *explode = None;
    }
    if style.as_deref() == Some(default_style) {
        *style = None;
    }
}

fn strip_response(response: &mut ResponseOrRef) {
    let ResponseOrRef::Response(response) = response else {
        return;
    };
    for header in response.headers.values_mut() {
        let Value::Object(header) = header else {
            continue;
        };
        if header.get("style").and_then(Value::as_str) == Some(HEADER_STYLE) {
            header.remove("style");
        }
        if header.get("explode").and_then(Value::as_bool) == Some(false) {
            header.remove("explode");
        }
    }
}
