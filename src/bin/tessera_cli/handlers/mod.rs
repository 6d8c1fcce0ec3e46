#![deny(clippy::all, clippy::pedantic)]

pub mod chat;
pub mod items;
pub mod members;
pub mod tags;
