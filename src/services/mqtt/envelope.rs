use serde::Serialize;

use crate::error::Error;

/// Kind of platform event carried by an [`Envelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "camelCase")]
pub enum Event {
    Online,
    Ping,
    RegistDevice,
    RegistGateway,
    ServerTime,
    SystemTime,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceCategory {
    Consumer,
    GateWay,
    Door,
    GateDoor,
    SmartLock,
    Elevator,
}

/// Platform message as published on the broker.
///
/// Serialized as
/// `{"data":..,"event":"..","id":"..","time":<ms>,"ttl":<ms>}`; the topic is
/// only used for routing and is not part of the document.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<'a, D> {
    #[serde(skip)]
    pub topic: &'a str,
    pub data: D,
    pub event: Event,
    pub id: &'a str,
    /// Unix time in milliseconds
    pub time: u64,
    /// Time to live in milliseconds
    pub ttl: u64,
}

impl<'a, D: Serialize> Envelope<'a, D> {
    /// Rejects envelopes with an empty topic or id, or a zero timestamp or
    /// time to live.
    pub fn validate(&self) -> Result<(), Error> {
        if self.topic.is_empty() || self.id.is_empty() || self.time == 0 || self.ttl == 0 {
            return Err(Error::InvalidMessage);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceId<'a> {
    pub device_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration<'a> {
    pub device_id: &'a str,
    pub device_name: &'a str,
    pub device_cate: DeviceCategory,
    pub mqtt_user_name: &'a str,
}

#[cfg(test)]
mod test {
    use super::*;
    use heapless::String;

    #[test]
    fn serializes_compact_document() {
        let envelope = Envelope {
            topic: "/platform/regist",
            data: DeviceRegistration {
                device_id: "dev-1",
                device_name: "Lift A",
                device_cate: DeviceCategory::Elevator,
                mqtt_user_name: "user",
            },
            event: Event::RegistDevice,
            id: "dev-1",
            time: 1_705_285_230_000,
            ttl: 5000,
        };

        let json: String<256> = serde_json_core::to_string(&envelope).unwrap();
        assert_eq!(
            json.as_str(),
            r#"{"data":{"deviceId":"dev-1","deviceName":"Lift A","deviceCate":"Elevator","mqttUserName":"user"},"event":"registDevice","id":"dev-1","time":1705285230000,"ttl":5000}"#
        );
    }

    #[test]
    fn event_names() {
        let names: [(Event, &str); 7] = [
            (Event::Online, "\"online\""),
            (Event::Ping, "\"ping\""),
            (Event::RegistDevice, "\"registDevice\""),
            (Event::RegistGateway, "\"registGateway\""),
            (Event::ServerTime, "\"serverTime\""),
            (Event::SystemTime, "\"systemTime\""),
            (Event::Offline, "\"offline\""),
        ];
        for (event, name) in names {
            let json: String<32> = serde_json_core::to_string(&event).unwrap();
            assert_eq!(json.as_str(), name);
        }
    }

    #[test]
    fn validation() {
        let valid = Envelope {
            topic: "/platform/ping",
            data: DeviceId { device_id: "dev-1" },
            event: Event::Ping,
            id: "dev-1",
            time: 1,
            ttl: 5000,
        };
        assert_eq!(valid.validate(), Ok(()));

        let no_topic = Envelope { topic: "", ..valid.clone() };
        assert_eq!(no_topic.validate(), Err(Error::InvalidMessage));

        let no_id = Envelope { id: "", ..valid.clone() };
        assert_eq!(no_id.validate(), Err(Error::InvalidMessage));

        let no_time = Envelope { time: 0, ..valid.clone() };
        assert_eq!(no_time.validate(), Err(Error::InvalidMessage));

        let no_ttl = Envelope { ttl: 0, ..valid };
        assert_eq!(no_ttl.validate(), Err(Error::InvalidMessage));
    }
}
