//! Topic layout of the survey bus.

pub const PLAN_PATTERN: &str = "ground/+/plan";
pub const TELEMETRY_PATTERN: &str = "ground/+/telemetry";
pub const DATA_PATTERN: &str = "ground/+/data";
pub const ADVICE_PATTERN: &str = "ai/crops/+/response";

pub fn plan(device_id: &str) -> String {
    format!("ground/{}/plan", device_id)
}

pub fn telemetry(device_id: &str) -> String {
    format!("ground/{}/telemetry", device_id)
}

pub fn data(device_id: &str) -> String {
    format!("ground/{}/data", device_id)
}

pub fn advice_request(device_id: &str) -> String {
    format!("ai/crops/{}/request", device_id)
}

pub fn advice_response(device_id: &str) -> String {
    format!("ai/crops/{}/response", device_id)
}

/// MQTT filter match with `+` (one level) and `#` (rest) wildcards.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let mut pattern_levels = pattern.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (pattern_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(p), Some(t)) if p == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// The device id segment of `ground/<id>/...` and `ai/crops/<id>/...`.
pub fn device_id(topic: &str) -> Option<&str> {
    let levels: Vec<&str> = topic.split('/').collect();
    let id = match levels.as_slice() {
        ["ground", id, _] => *id,
        ["ai", "crops", id, _] => *id,
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_matches_wildcards() {
        assert!(topic_matches(PLAN_PATTERN, "ground/255/plan"));
        assert!(!topic_matches(PLAN_PATTERN, "ground/255/data"));
        assert!(!topic_matches(PLAN_PATTERN, "ground/255/plan/extra"));
        assert!(topic_matches("ground/#", "ground/255/plan"));
        assert!(topic_matches("ai/crops/+/response", "ai/crops/7/response"));
    }

    #[test]
    fn test_device_id_extraction() {
        assert_eq!(device_id("ground/255/telemetry"), Some("255"));
        assert_eq!(device_id("ai/crops/abc/request"), Some("abc"));
        assert_eq!(device_id("ground//data"), None);
        assert_eq!(device_id("other/topic"), None);
    }
}
