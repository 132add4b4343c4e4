#[macro_export]
macro_rules! debug_if {
    ($cond:expr, $($arg:tt)+) => {
        {
            if $cond {
                tracing::debug!($($arg)+)
            }
        }
    };
}

/// Index list as it appears in a URL path: comma separated, `_all` when empty.
pub(crate) fn format_indices(indices: &[String]) -> String {
    if indices.is_empty() {
        "_all".to_owned()
    } else {
        indices.join(",")
    }
}

/// `/{indices}/{endpoint}`, or `/{endpoint}` when no index is given.
pub(crate) fn indices_path(indices: &[String], endpoint: &str) -> String {
    if indices.is_empty() {
        format!("/{}", endpoint)
    } else {
        format!("/{}/{}", format_indices(indices), endpoint)
    }
}
