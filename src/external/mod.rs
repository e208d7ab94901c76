pub mod gateway;
pub mod notifier;

pub use gateway::PaymentGateway;
pub use notifier::EventNotifier;
