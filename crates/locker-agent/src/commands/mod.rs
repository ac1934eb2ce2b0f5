pub mod dropoff;
pub mod init;
pub mod retry;
pub mod status;
pub mod sync;
