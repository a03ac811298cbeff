//! Decoding of single JVM-style type descriptors into readable type names.
//!
//! Only one leading `[` is recognised as the array flag, so `[[I` decodes to
//! `[I[]`.

/// Decodes one type descriptor (`I`, `[I`, `Ljava/lang/String;`, ...) into a
/// readable name (`int`, `int[]`, `java.lang.String`, ...).
pub fn decode_type(descriptor: &str) -> String {
    let (body, is_array) = match descriptor.strip_prefix('[') {
        Some(rest) => (rest, true),
        None => (descriptor, false),
    };

    let mut name = match primitive_name(body) {
        Some(primitive) => primitive.to_string(),
        None => object_name(body),
    };
    if is_array {
        name.push_str("[]");
    }
    name
}

pub fn primitive_name(code: &str) -> Option<&'static str> {
    let name = match code {
        "B" => "byte",
        "C" => "char",
        "D" => "double",
        "F" => "float",
        "J" => "long",
        "S" => "short",
        "I" => "int",
        "V" => "void",
        "Z" => "boolean",
        _ => return None,
    };
    Some(name)
}

/// Object path: strip `L` and `;` when present, then dot the package separators.
pub fn object_name(descriptor: &str) -> String {
    let s = descriptor.strip_prefix('L').unwrap_or(descriptor);
    let s = s.strip_suffix(';').unwrap_or(s);
    s.replace('/', ".")
}
