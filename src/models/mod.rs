pub mod common;
pub mod log_record;
pub mod sensor;
pub mod subscriber;
