pub mod audit_event;
pub mod delivery_job;
pub mod template;

pub use audit_event::AuditEvent;
pub use delivery_job::{DeliveryJob, NewDeliveryJob};
pub use template::MessageTemplate;
