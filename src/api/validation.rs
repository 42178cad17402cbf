use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::{json, Map, Value};
use validator::ValidationErrors;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub fields: Value,
}

/// Flatten validator output into `field -> messages`.
pub fn field_messages(errors: &ValidationErrors) -> Vec<(String, Vec<String>)> {
    let mut fields: Vec<(String, Vec<String>)> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let messages = errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Validation error in field: {}", field))
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
}

fn bad_request(error: &str, fields: Value) -> actix_web::Error {
    actix_web::error::InternalError::from_response(
        "",
        HttpResponse::BadRequest().json(ErrorResponse {
            error: error.to_string(),
            fields,
        }),
    )
    .into()
}

/// JSON extractor config with the shared `ErrorResponse` body
pub fn json_config() -> actix_web_validator::JsonConfig {
    actix_web_validator::JsonConfig::default().error_handler(|err, _req| match err {
        actix_web_validator::Error::Validate(validation_errors) => {
            let mut fields = Map::new();
            for (field, messages) in field_messages(&validation_errors) {
                fields.insert(field, json!({"errors": messages}));
            }
            bad_request("Validation failed", Value::Object(fields))
        }
        actix_web_validator::Error::Deserialize(de_err) => {
            let err_string = de_err.to_string();
            let message = if err_string.contains("EOF while parsing") {
                "Request body is empty. Expected JSON payload"
            } else if err_string.contains("missing field") {
                "A required field is missing"
            } else if err_string.contains("unknown variant") {
                "Invalid enum value. Check allowed values for this field"
            } else {
                "Invalid JSON format"
            };
            bad_request("Request validation failed", json!({"message": message}))
        }
        _ => bad_request("Validation failed", json!({"message": "Validation error"})),
    })
}

/// Query-string extractor config; bad filters such as an unknown status are 400s.
pub fn query_config() -> actix_web::web::QueryConfig {
    actix_web::web::QueryConfig::default()
        .error_handler(|err, _req| bad_request("Invalid query", json!({"message": err.to_string()})))
}
