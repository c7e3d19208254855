//! Inbound message routing.
//!
//! Classifies an inbound (topic, payload) pair against the device's channel
//! namespace. Matching is exact string comparison, no wildcards. Unknown
//! topics and unrecognized payloads fall through silently; the loop decides
//! what each route means.

use tracing::trace;

use crate::topics::{TopicNamespace, OFF_PAYLOAD, ON_PAYLOAD};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    SetRelay(bool),
    ResetRequested,
    UpdateRequested(String),
}

#[derive(Debug, Default)]
pub struct MessageRouter {
    topics: TopicNamespace,
}

impl MessageRouter {
    pub fn new(topics: TopicNamespace) -> Self {
        Self { topics }
    }

    pub fn route(&self, topic: &str, payload: &str) -> Option<Route> {
        if topic == self.topics.power() {
            match payload {
                ON_PAYLOAD => Some(Route::SetRelay(true)),
                OFF_PAYLOAD => Some(Route::SetRelay(false)),
                other => {
                    trace!("unrecognized power payload {other:?}");
                    None
                }
            }
        } else if topic == self.topics.reset() {
            (payload == ON_PAYLOAD).then_some(Route::ResetRequested)
        } else if topic == self.topics.update() {
            (!payload.is_empty()).then(|| Route::UpdateRequested(payload.to_string()))
        } else {
            trace!("ignoring message on unmatched topic {topic}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topics::DeviceIdentity;

    fn router() -> MessageRouter {
        MessageRouter::new(TopicNamespace::render(
            "",
            &DeviceIdentity::from_override("A1B2C3"),
        ))
    }

    #[test]
    fn power_payloads_map_to_relay_commands() {
        let router = router();
        assert_eq!(
            router.route("A1B2C3/relay/power", "1"),
            Some(Route::SetRelay(true))
        );
        assert_eq!(
            router.route("A1B2C3/relay/power", "0"),
            Some(Route::SetRelay(false))
        );
    }

    #[test]
    fn unrecognized_power_payload_is_ignored() {
        assert_eq!(router().route("A1B2C3/relay/power", "ON"), None);
        assert_eq!(router().route("A1B2C3/relay/power", ""), None);
    }

    #[test]
    fn reset_requires_the_on_payload() {
        let router = router();
        assert_eq!(
            router.route("A1B2C3/system/reset", "1"),
            Some(Route::ResetRequested)
        );
        assert_eq!(router.route("A1B2C3/system/reset", "0"), None);
        assert_eq!(router.route("A1B2C3/system/reset", ""), None);
    }

    #[test]
    fn update_forwards_any_non_empty_location() {
        let router = router();
        assert_eq!(
            router.route("A1B2C3/system/update", "http://fw.lan/image.bin"),
            Some(Route::UpdateRequested("http://fw.lan/image.bin".into()))
        );
        assert_eq!(router.route("A1B2C3/system/update", ""), None);
    }

    #[test]
    fn matching_is_exact_not_prefix() {
        let router = router();
        assert_eq!(router.route("A1B2C3/relay/power/extra", "1"), None);
        assert_eq!(router.route("A1B2C3/relay", "1"), None);
        assert_eq!(router.route("other/topic", "1"), None);
    }
}
