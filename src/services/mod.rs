pub mod firebase;
pub mod gateway;
pub mod logs;
pub mod memory;
pub mod sensors;
pub mod subscription;
