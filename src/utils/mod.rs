pub mod functions;
pub mod message;
pub mod response;
