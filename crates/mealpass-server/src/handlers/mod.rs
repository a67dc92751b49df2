pub mod deliveries;
pub mod login;
pub mod logout;
pub mod queue;
pub mod session;
