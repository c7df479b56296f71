use serde_json::{Map, Value};

use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_optional_string_field(llm, "llm.keyword_model", "keyword_model")?;
        validate_optional_string_field(llm, "llm.answer_model", "answer_model")?;
        validate_optional_string_field(llm, "llm.embedding_model", "embedding_model")?;
        validate_u64_field(
            llm,
            "llm.request_timeout_secs",
            "request_timeout_secs",
            1,
            3_600,
        )?;
    }

    if let Some(retry) = expect_optional_object(root, "retry")? {
        validate_u64_field(retry, "retry.max_attempts", "max_attempts", 1, 10)?;
        validate_f64_field(retry, "retry.min_wait_secs", "min_wait_secs", 0.0, 3_600.0)?;
        validate_f64_field(retry, "retry.max_wait_secs", "max_wait_secs", 0.0, 3_600.0)?;
        validate_f64_field(
            retry,
            "retry.multiplier_secs",
            "multiplier_secs",
            0.0,
            3_600.0,
        )?;

        let min = retry.get("min_wait_secs").and_then(Value::as_f64);
        let max = retry.get("max_wait_secs").and_then(Value::as_f64);
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(ApiError::BadRequest(
                    "Invalid config at 'retry': min_wait_secs exceeds max_wait_secs".to_string(),
                ));
            }
        }
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_optional_string_field(retrieval, "retrieval.collection", "collection")?;
        if !retrieval
            .get("similarity_threshold")
            .is_some_and(Value::is_null)
        {
            validate_f64_field(
                retrieval,
                "retrieval.similarity_threshold",
                "similarity_threshold",
                -1.0,
                2.0,
            )?;
        }
        validate_u64_field(retrieval, "retrieval.max_results", "max_results", 1, 1_000)?;
        validate_u64_field(
            retrieval,
            "retrieval.history_window",
            "history_window",
            0,
            100,
        )?;
    }

    if let Some(storage) = expect_optional_object(root, "storage")? {
        for key in ["courses_db", "vector_db", "sessions_db"] {
            validate_non_empty_string_field(storage, &format!("storage.{}", key), key)?;
        }
    }

    if let Some(assistant) = expect_optional_object(root, "assistant")? {
        validate_optional_string_field(assistant, "assistant.gen_ed_resource", "gen_ed_resource")?;
        validate_u64_field(
            assistant,
            "assistant.history_limit",
            "history_limit",
            1,
            1_000,
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_non_empty_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() && !value.is_null() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
