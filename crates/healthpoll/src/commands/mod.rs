pub mod check;
pub mod watch;
