pub mod alarm;
pub mod appsettings;
pub mod assistant;
pub mod nlp;
pub mod registry;
pub mod scheduling;
pub mod tools;

pub use alarm::{Alarm, AlarmId};
pub use assistant::{Assistant, ChatMessage, Sender};
pub use nlp::{ParsedCommand, interpret, parse_time};
pub use registry::AlarmRegistry;
pub use scheduling::{
    AlertSink, GatewayError, LogAlertSink, SchedulingGateway, TaskSchedulingGateway,
};
