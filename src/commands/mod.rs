mod login;
mod logout;
mod send_command;

pub use login::Login;
pub use logout::Logout;
pub use send_command::SendCommand;
