//! Canonical method and class strings built from bytecode-index records.

use thiserror::Error;

use crate::descriptor::{decode_type, object_name};
use crate::dex::MethodRecord;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("descriptor has no parameter list: {0}")]
    MissingParameterList(String),
    #[error("descriptor has no return type: {0}")]
    MissingReturnType(String),
    #[error("unterminated object type in parameters: {0}")]
    UnterminatedObject(String),
    #[error("array marker without element type in parameters: {0}")]
    DanglingArray(String),
}

/// Formats `<return> <class>.<name>(<params>)`.
///
/// Returns `Ok(None)` for compiler-generated members (any name containing `$`).
pub fn format_method(record: &MethodRecord) -> Result<Option<String>, SignatureError> {
    if record.name.contains('$') {
        return Ok(None);
    }

    let class_name = object_name(&record.declaring_class);
    let (params, ret) = split_descriptor(&record.descriptor)?;
    let params = parameter_types(params)?.join(", ");
    let ret = decode_type(ret);

    Ok(Some(format!("{ret} {class_name}.{}({params})", record.name)))
}

pub fn format_class(descriptor: &str) -> Option<String> {
    let name = object_name(descriptor);
    if name.is_empty() { None } else { Some(name) }
}

fn split_descriptor(descriptor: &str) -> Result<(&str, &str), SignatureError> {
    let missing = || SignatureError::MissingParameterList(descriptor.to_string());
    let inner = descriptor.strip_prefix('(').ok_or_else(missing)?;
    let close = inner.find(')').ok_or_else(missing)?;
    let ret = &inner[close + 1..];
    if ret.is_empty() {
        return Err(SignatureError::MissingReturnType(descriptor.to_string()));
    }
    Ok((&inner[..close], ret))
}

/// Splits a parameter section (`I[Ljava/lang/String;J`) into decoded types.
pub fn parameter_types(params: &str) -> Result<Vec<String>, SignatureError> {
    let mut types = Vec::new();
    let mut rest = params;

    while !rest.is_empty() {
        let body = rest.trim_start_matches('[');
        let dims = rest.len() - body.len();

        let token_len = if body.starts_with('L') {
            let end = body
                .find(';')
                .ok_or_else(|| SignatureError::UnterminatedObject(params.to_string()))?;
            end + 1
        } else {
            match body.chars().next() {
                Some(c) => c.len_utf8(),
                None => return Err(SignatureError::DanglingArray(params.to_string())),
            }
        };

        let (token, tail) = rest.split_at(dims + token_len);
        types.push(decode_type(token));
        rest = tail;
    }

    Ok(types)
}
