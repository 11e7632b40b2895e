pub mod about;
pub mod home;
pub mod layout;
pub mod logs;
pub mod state;
