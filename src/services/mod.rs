//! Protocol services built on the session engine and link supervisor.
//!
//! Services never touch the transport; every step is a session transaction
//! and the first failing step ends the sequence.

pub mod http;
pub mod mqtt;
pub mod sms;

pub use http::{HttpClient, HttpResponse};
pub use mqtt::{MqttClient, MqttSession};
pub use sms::SmsClient;
