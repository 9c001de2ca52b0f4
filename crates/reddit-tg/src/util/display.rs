use std::time::Duration;

/// Formats the duration as a human readable string, e.g. `2 years 3 months`.
pub(crate) fn human_duration(duration: Duration) -> String {
    timeago::Formatter::new()
        .num_items(2)
        .ago("")
        .convert(duration)
        .trim_end()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_duration_is_compact() {
        let day = 24 * 60 * 60;
        let text = human_duration(Duration::from_secs(400 * day));
        assert!(text.starts_with("1 year"), "{text}");
        assert!(!text.ends_with(' '), "{text:?}");
    }
}
