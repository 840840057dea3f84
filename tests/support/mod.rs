#[allow(dead_code)]
pub mod pdf;
#[allow(dead_code)]
pub mod socket_guard;
