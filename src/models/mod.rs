pub mod common;
pub mod invitation;
pub mod notification;
