use rand::{distributions::Alphanumeric, Rng};

const TAG_SUFFIX_LEN: usize = 12;

/// Creates a tag of the form `<prefix>-<random alphanumerics>`.
///
/// Used to tell broker sessions and consumers apart in the logs.
pub fn create_consumer_tag(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TAG_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}-{}", prefix, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_creates_unique_tags_with_prefix() {
        let tag1 = create_consumer_tag("sender");
        let tag2 = create_consumer_tag("sender");
        assert!(tag1.starts_with("sender-"));
        assert_eq!(tag1.len(), "sender-".len() + TAG_SUFFIX_LEN);
        assert_ne!(tag1, tag2);
    }
}
