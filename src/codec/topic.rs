use crate::config::TopicLimits;

const TOPIC_SEPARATOR: char = '/';
const MULTI_LEVEL_WILDCARD: char = '#';
const SINGLE_LEVEL_WILDCARD: char = '+';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicError {
    #[error("topic {0:?} contains a wildcard")]
    WildcardNotPermitted(String),
    #[error("topic is {len} bytes, allowed range is {min}..={max}")]
    LengthOutOfRange { len: usize, min: usize, max: usize },
    #[error("topic filter cannot contain # wildcard anywhere but the last level")]
    MultilevelWildcardNotAtEnd,
    #[error("topic filter must have a wildcard in a separate level")]
    InvalidWildcardLevel,
}

fn contains_wildcard(topic: &str) -> bool {
    topic.contains(|x: char| x == SINGLE_LEVEL_WILDCARD || x == MULTI_LEVEL_WILDCARD)
}

/// Topic names are what PUBLISH carries: no wildcards at all.
pub fn check_wildcards(topic: &str) -> Result<(), TopicError> {
    if contains_wildcard(topic) {
        return Err(TopicError::WildcardNotPermitted(topic.to_string()));
    }

    Ok(())
}

pub fn check_length(topic: &str, limits: &TopicLimits) -> Result<(), TopicError> {
    let len = topic.len();
    if len < limits.min || len > limits.max {
        return Err(TopicError::LengthOutOfRange {
            len,
            min: limits.min,
            max: limits.max,
        });
    }

    Ok(())
}

pub fn validate_topic_name(topic: &str, limits: &TopicLimits) -> Result<(), TopicError> {
    check_wildcards(topic)?;
    check_length(topic, limits)
}

/// Topic filters are what SUBSCRIBE and UNSUBSCRIBE carry.
pub fn validate_topic_filter(filter: &str, limits: &TopicLimits) -> Result<(), TopicError> {
    check_length(filter, limits)?;

    // Multi-level wildcards can only be at the end of the filter
    if let Some(pos) = filter.rfind(MULTI_LEVEL_WILDCARD) {
        if pos != filter.len() - 1 {
            return Err(TopicError::MultilevelWildcardNotAtEnd);
        }
    }

    for level in filter.split(TOPIC_SEPARATOR) {
        // Any wildcards on a particular level must be specified on their own
        if contains_wildcard(level) && level.len() > 1 {
            return Err(TopicError::InvalidWildcardLevel);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: TopicLimits = TopicLimits { min: 1, max: 65_535 };

    #[test]
    fn test_topic_name_wildcards() {
        assert_eq!(validate_topic_name("sensors/temp", &LIMITS), Ok(()));
        for topic in ["#", "+", "a/#", "/single/level/+", "sport+"] {
            assert_eq!(
                validate_topic_name(topic, &LIMITS),
                Err(TopicError::WildcardNotPermitted(topic.to_string()))
            );
        }
    }

    #[test]
    fn test_topic_length_bounds() {
        assert_eq!(
            validate_topic_name("", &LIMITS),
            Err(TopicError::LengthOutOfRange { len: 0, min: 1, max: 65_535 })
        );

        let just_right_topic = "a".repeat(65_535);
        assert_eq!(validate_topic_name(&just_right_topic, &LIMITS), Ok(()));

        let too_long_topic = "a".repeat(65_536);
        assert!(matches!(
            validate_topic_name(&too_long_topic, &LIMITS),
            Err(TopicError::LengthOutOfRange { len: 65_536, .. })
        ));

        let narrow = TopicLimits { min: 3, max: 5 };
        assert!(check_length("ab", &narrow).is_err());
        assert!(check_length("abc", &narrow).is_ok());
        assert!(check_length("abcdef", &narrow).is_err());
    }

    #[test]
    fn test_length_counts_utf8_bytes() {
        let narrow = TopicLimits { min: 1, max: 4 };
        // two characters, six bytes
        assert!(check_length("€€", &narrow).is_err());
    }

    #[test]
    fn test_topic_filter_wildcards() {
        for filter in ["/", "a", "+", "+/", "sport/+", "/+", "#", "/#", "sport/#", "a/+/b/#"] {
            assert_eq!(validate_topic_filter(filter, &LIMITS), Ok(()), "{filter}");
        }
    }

    #[test]
    fn test_topic_filter_parse_invalid_filters() {
        assert_eq!(
            validate_topic_filter("#/", &LIMITS),
            Err(TopicError::MultilevelWildcardNotAtEnd)
        );
        assert_eq!(
            validate_topic_filter("sport/#/stats", &LIMITS),
            Err(TopicError::MultilevelWildcardNotAtEnd)
        );
        assert_eq!(
            validate_topic_filter("sport/tennis#", &LIMITS),
            Err(TopicError::InvalidWildcardLevel)
        );
        assert_eq!(
            validate_topic_filter("sport/++", &LIMITS),
            Err(TopicError::InvalidWildcardLevel)
        );
    }
}
