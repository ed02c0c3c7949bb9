#![allow(dead_code)]

pub mod rendered;
pub mod socket_guard;
