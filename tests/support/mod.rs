pub mod portal;
pub mod socket_guard;
