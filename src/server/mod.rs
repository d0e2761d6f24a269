//! TCP listener that hands each accepted socket to a [`Connection`](crate::http::connection::Connection).

pub mod listener;
