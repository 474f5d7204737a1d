/// Resolve `value` against the document URL `base`.
///
/// Blank values and values that fail to resolve pass through unchanged.
pub fn absolute_url(base: Option<&str>, value: &str) -> String {
    if value.trim().is_empty() {
        return value.to_string();
    }
    let Some(base) = base else {
        return value.to_string();
    };
    match url::Url::parse(base).and_then(|base| base.join(value.trim())) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => value.to_string(),
    }
}

/// Resolve every candidate URL of a `srcset` list, keeping its descriptor.
pub fn absolute_srcset(base: Option<&str>, value: &str) -> String {
    if value.trim().is_empty() {
        return value.to_string();
    }
    value
        .split(',')
        .map(|candidate| {
            let parts: Vec<&str> = candidate.trim().split(' ').collect();
            match parts.as_slice() {
                [url] => absolute_url(base, url),
                [url, descriptor] => format!("{} {descriptor}", absolute_url(base, url)),
                _ => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rewrite URL-bearing attributes (`src`, `href`, `srcset`) to absolute form.
pub fn transform_attribute(base: Option<&str>, name: &str, value: &str) -> String {
    match name {
        "src" | "href" => absolute_url(base, value),
        "srcset" => absolute_srcset(base, value),
        _ => value.to_string(),
    }
}
